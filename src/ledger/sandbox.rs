//! In-process sandbox ledger.
//!
//! Implements [`LedgerClient`] without a network: accounts and balances in
//! drops, escrows keyed by `(owner, sequence)` with a finish-after time, and
//! multisigned escrow releases checked against a signer list and quorum.
//! Used by `escrowgate run` in sandbox mode and by the test suites.
//!
//! ## Wire formats
//!
//! - Wallets are Ed25519 key pairs. A wallet's address is the classic
//!   encoding of the first 20 bytes of SHA-256(public key).
//! - Login proofs are JSON: `{"signature": hex, "publicKey": hex}`.
//! - Authorizations are hex-encoded JSON transactions:
//!   `{"TransactionType", "Account", "Owner", "OfferSequence", "Signers": [{"Signer": {...}}]}`.
//!
//! Outcome codes follow the ledger's engine results: `tesSUCCESS`,
//! `tecUNFUNDED`, `tecNO_TARGET`, `tecNO_PERMISSION`, `tefBAD_QUORUM`,
//! `tefBAD_SIGNATURE`, `temINVALID`.

use super::address::{encode_classic_address, is_valid_classic_address};
use super::amount::Drops;
use super::traits::*;
use crate::identity::Identity;
use async_trait::async_trait;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{Ed25519KeyPair, KeyPair, UnparsedPublicKey, ED25519};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime};
use zeroize::Zeroize;

/// Domain prefix for multisign signing data.
const MULTISIGN_PREFIX: &str = "SMT";

const OUTCOME_UNFUNDED: &str = "tecUNFUNDED";
const OUTCOME_NO_TARGET: &str = "tecNO_TARGET";
const OUTCOME_NO_PERMISSION: &str = "tecNO_PERMISSION";
const OUTCOME_BAD_QUORUM: &str = "tefBAD_QUORUM";
const OUTCOME_BAD_SIGNATURE: &str = "tefBAD_SIGNATURE";
const OUTCOME_INVALID: &str = "temINVALID";

/// Address of the account controlled by `public_key`.
pub fn address_for_public_key(public_key: &[u8]) -> Identity {
    let digest = Sha256::digest(public_key);
    let mut account_id = [0u8; 20];
    account_id.copy_from_slice(&digest[..20]);
    Identity::new(encode_classic_address(&account_id))
}

/// Ed25519 wallet understood by the sandbox.
pub struct SandboxWallet {
    key_pair: Ed25519KeyPair,
    address: Identity,
}

impl SandboxWallet {
    /// Generate a wallet from fresh CSPRNG entropy.
    pub fn generate() -> LedgerResult<Self> {
        let mut seed = [0u8; 32];
        SystemRandom::new()
            .fill(&mut seed)
            .map_err(|_| LedgerError::Unavailable("system randomness unavailable".into()))?;
        let wallet = Self::from_seed(&seed);
        seed.zeroize();
        wallet
    }

    pub fn from_seed(seed: &[u8; 32]) -> LedgerResult<Self> {
        let key_pair = Ed25519KeyPair::from_seed_unchecked(seed)
            .map_err(|_| LedgerError::InvalidPayload("invalid Ed25519 seed".into()))?;
        let address = address_for_public_key(key_pair.public_key().as_ref());
        Ok(Self { key_pair, address })
    }

    /// Wallet from a 64-character hex seed.
    pub fn from_seed_hex(seed_hex: &str) -> LedgerResult<Self> {
        let mut bytes = hex::decode(seed_hex.trim())
            .map_err(|e| LedgerError::InvalidPayload(format!("seed is not hex: {}", e)))?;
        if bytes.len() != 32 {
            bytes.zeroize();
            return Err(LedgerError::InvalidPayload("seed must be 32 bytes".into()));
        }
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        bytes.zeroize();
        let wallet = Self::from_seed(&seed);
        seed.zeroize();
        wallet
    }

    pub fn address(&self) -> &Identity {
        &self.address
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key_pair.public_key().as_ref())
    }

    /// Login proof over `challenge`.
    pub fn sign_challenge(&self, challenge: &str) -> String {
        let proof = ChallengeProof {
            signature: hex::encode(self.key_pair.sign(challenge.as_bytes()).as_ref()),
            public_key: self.public_key_hex(),
            message: None,
        };
        // Serializing plain strings cannot fail
        serde_json::to_string(&proof).unwrap_or_default()
    }

    /// Partially signed release transaction carrying only this wallet's
    /// signature.
    pub fn sign_release(&self, action: &ReleaseAction) -> String {
        let signature = self.key_pair.sign(&multisign_data(action, &self.address));
        let blob = TxBlob::from_action(
            action,
            vec![SignerWrapper {
                signer: SignerEntry {
                    account: self.address.to_string(),
                    txn_signature: hex::encode(signature.as_ref()),
                    signing_pub_key: self.public_key_hex(),
                },
            }],
        );
        blob.encode()
    }
}

/// Login proof format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeProof {
    pub signature: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
    /// If present, must equal the challenge being verified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TxBlob {
    transaction_type: String,
    account: String,
    owner: String,
    offer_sequence: u32,
    #[serde(default)]
    signers: Vec<SignerWrapper>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SignerWrapper {
    #[serde(rename = "Signer")]
    signer: SignerEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SignerEntry {
    account: String,
    txn_signature: String,
    signing_pub_key: String,
}

impl TxBlob {
    fn from_action(action: &ReleaseAction, signers: Vec<SignerWrapper>) -> Self {
        Self {
            transaction_type: action.kind.clone(),
            account: action.account.to_string(),
            owner: action.owner.to_string(),
            offer_sequence: action.offer_sequence,
            signers,
        }
    }

    fn decode(payload: &str) -> Option<Self> {
        let bytes = hex::decode(payload.trim()).ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    fn encode(&self) -> String {
        hex::encode(serde_json::to_vec(self).unwrap_or_default())
    }

    fn action(&self) -> ReleaseAction {
        ReleaseAction {
            kind: self.transaction_type.clone(),
            account: Identity::new(&self.account),
            owner: Identity::new(&self.owner),
            offer_sequence: self.offer_sequence,
        }
    }
}

fn multisign_data(action: &ReleaseAction, signer: &Identity) -> Vec<u8> {
    format!(
        "{}:{}:{}:{}:{}:{}",
        MULTISIGN_PREFIX,
        action.kind,
        action.account,
        action.owner,
        action.offer_sequence,
        signer
    )
    .into_bytes()
}

impl SignerEntry {
    /// Key belongs to the account and the signature covers `action`.
    fn signs(&self, action: &ReleaseAction) -> bool {
        let account = Identity::new(&self.account);
        let Ok(key_bytes) = hex::decode(&self.signing_pub_key) else {
            return false;
        };
        address_for_public_key(&key_bytes) == account
            && verify_ed25519(
                &self.signing_pub_key,
                &multisign_data(action, &account),
                &self.txn_signature,
            )
    }
}

fn verify_ed25519(public_key_hex: &str, message: &[u8], signature_hex: &str) -> bool {
    let (Ok(public_key), Ok(signature)) = (hex::decode(public_key_hex), hex::decode(signature_hex))
    else {
        return false;
    };
    UnparsedPublicKey::new(&ED25519, public_key)
        .verify(message, &signature)
        .is_ok()
}

/// Initial sandbox state.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub treasury: Identity,
    pub treasury_balance: Drops,
    /// Accounts allowed to sign treasury releases.
    pub signers: Vec<Identity>,
    /// Signatures required on a treasury release.
    pub quorum: usize,
    /// Delay between escrow creation and earliest release.
    pub finish_after: Duration,
}

#[derive(Debug, Clone)]
struct Escrow {
    amount: Drops,
    destination: Identity,
    finish_after: SystemTime,
}

struct SandboxState {
    balances: HashMap<Identity, Drops>,
    sequences: HashMap<Identity, u32>,
    escrows: HashMap<(Identity, u32), Escrow>,
    forced_lock_outcomes: VecDeque<String>,
    forced_submit_outcomes: VecDeque<String>,
    submit_delay: Duration,
}

/// Sandbox ledger. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SandboxLedger {
    state: Arc<Mutex<SandboxState>>,
    treasury: Identity,
    signers: Arc<BTreeSet<Identity>>,
    quorum: usize,
    finish_after: Duration,
    connected: Arc<AtomicBool>,
    submissions: Arc<AtomicU64>,
}

impl SandboxLedger {
    pub fn new(config: SandboxConfig) -> Self {
        let mut balances = HashMap::new();
        balances.insert(config.treasury.clone(), config.treasury_balance);

        let mut sequences = HashMap::new();
        sequences.insert(config.treasury.clone(), 1);

        Self {
            state: Arc::new(Mutex::new(SandboxState {
                balances,
                sequences,
                escrows: HashMap::new(),
                forced_lock_outcomes: VecDeque::new(),
                forced_submit_outcomes: VecDeque::new(),
                submit_delay: Duration::ZERO,
            })),
            treasury: config.treasury,
            signers: Arc::new(config.signers.into_iter().collect()),
            quorum: config.quorum.max(1),
            finish_after: config.finish_after,
            connected: Arc::new(AtomicBool::new(true)),
            submissions: Arc::new(AtomicU64::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, SandboxState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn ensure_connected(&self) -> LedgerResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Unavailable("sandbox disconnected".into()))
        }
    }

    /// Credit an account, creating it if needed.
    pub fn fund(&self, account: &Identity, amount: Drops) {
        let mut state = self.state();
        let balance = state.balances.entry(account.clone()).or_default();
        *balance = balance.checked_add(amount).unwrap_or(*balance);
        state.sequences.entry(account.clone()).or_insert(1);
    }

    /// Next lock-up reports `outcome` instead of executing.
    pub fn force_next_lock_outcome(&self, outcome: &str) {
        self.state()
            .forced_lock_outcomes
            .push_back(outcome.to_string());
    }

    /// Next submission reports `outcome` instead of executing.
    pub fn force_next_submit_outcome(&self, outcome: &str) {
        self.state()
            .forced_submit_outcomes
            .push_back(outcome.to_string());
    }

    /// Delay every submission by `delay` before it resolves.
    pub fn set_submit_delay(&self, delay: Duration) {
        self.state().submit_delay = delay;
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Number of submissions received, including forced ones.
    pub fn submission_count(&self) -> u64 {
        self.submissions.load(Ordering::SeqCst)
    }

    /// Whether an escrow is still outstanding.
    pub fn has_escrow(&self, owner: &Identity, sequence: u32) -> bool {
        self.state()
            .escrows
            .contains_key(&(owner.clone(), sequence))
    }

    fn apply_release(&self, blob: &TxBlob) -> String {
        let action = blob.action();
        if action.kind != ESCROW_FINISH || action.account != self.treasury {
            return OUTCOME_INVALID.to_string();
        }

        let mut valid_signers = BTreeSet::new();
        for wrapper in &blob.signers {
            if !wrapper.signer.signs(&action) {
                return OUTCOME_BAD_SIGNATURE.to_string();
            }
            let account = Identity::new(&wrapper.signer.account);
            if self.signers.contains(&account) {
                valid_signers.insert(account);
            }
        }
        if valid_signers.len() < self.quorum {
            return OUTCOME_BAD_QUORUM.to_string();
        }

        let mut state = self.state();
        let key = (action.owner.clone(), action.offer_sequence);
        let Some(escrow) = state.escrows.get(&key).cloned() else {
            return OUTCOME_NO_TARGET.to_string();
        };
        if SystemTime::now() < escrow.finish_after {
            return OUTCOME_NO_PERMISSION.to_string();
        }

        state.escrows.remove(&key);
        let balance = state.balances.entry(escrow.destination).or_default();
        *balance = balance.checked_add(escrow.amount).unwrap_or(*balance);
        SUCCESS_OUTCOME.to_string()
    }
}

#[async_trait]
impl LedgerClient for SandboxLedger {
    fn is_valid_identity(&self, identity: &str) -> bool {
        is_valid_classic_address(identity)
    }

    fn verify_signature_proof(&self, challenge: &str, proof: &str, identity: &Identity) -> bool {
        let Ok(proof) = serde_json::from_str::<ChallengeProof>(proof) else {
            return false;
        };
        if proof.message.as_deref().is_some_and(|message| message != challenge) {
            return false;
        }
        let Ok(public_key) = hex::decode(&proof.public_key) else {
            return false;
        };
        if address_for_public_key(&public_key) != *identity {
            return false;
        }
        verify_ed25519(&proof.public_key, challenge.as_bytes(), &proof.signature)
    }

    async fn lock_funds(&self, amount: Drops, destination: &Identity) -> LedgerResult<LockReceipt> {
        self.ensure_connected()?;
        let mut state = self.state();

        if let Some(outcome) = state.forced_lock_outcomes.pop_front() {
            if outcome != SUCCESS_OUTCOME {
                return Err(LedgerError::Rejected { outcome });
            }
        }

        let balance = state
            .balances
            .get(&self.treasury)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(self.treasury.to_string()))?;
        let Some(remaining) = balance.checked_sub(amount) else {
            return Err(LedgerError::Rejected {
                outcome: OUTCOME_UNFUNDED.to_string(),
            });
        };

        let sequence = state.sequences.entry(self.treasury.clone()).or_insert(1);
        let offer_sequence = *sequence;
        *sequence += 1;

        state.balances.insert(self.treasury.clone(), remaining);
        state.escrows.insert(
            (self.treasury.clone(), offer_sequence),
            Escrow {
                amount,
                destination: destination.clone(),
                finish_after: SystemTime::now() + self.finish_after,
            },
        );

        tracing::debug!(
            sequence = offer_sequence,
            amount = %amount,
            destination = %destination,
            "sandbox escrow created"
        );

        Ok(LockReceipt {
            sequence: offer_sequence,
            outcome: SUCCESS_OUTCOME.to_string(),
        })
    }

    /// Blobs carrying a signature that does not verify are undecodable.
    fn decode_authorization(&self, payload: &str) -> Option<AuthorizationDescriptor> {
        let blob = TxBlob::decode(payload)?;
        let action = blob.action();
        if !blob.signers.iter().all(|wrapper| wrapper.signer.signs(&action)) {
            return None;
        }
        Some(AuthorizationDescriptor {
            action: blob.action(),
            signers: blob
                .signers
                .iter()
                .map(|wrapper| Identity::new(&wrapper.signer.account))
                .collect(),
        })
    }

    fn combine_authorizations(&self, payloads: &[String]) -> LedgerResult<CombinedUnit> {
        let mut blobs = payloads.iter().map(|payload| {
            TxBlob::decode(payload)
                .ok_or_else(|| LedgerError::InvalidPayload("undecodable authorization".into()))
        });

        let first = blobs
            .next()
            .ok_or_else(|| LedgerError::InvalidPayload("no authorizations to combine".into()))??;
        let action = first.action();

        let mut signers: Vec<SignerWrapper> = first.signers.clone();
        for blob in blobs {
            let blob = blob?;
            if blob.action() != action {
                return Err(LedgerError::InvalidPayload(
                    "authorizations sign different transactions".into(),
                ));
            }
            signers.extend(blob.signers);
        }

        // Signers are ordered by account and unique
        signers.sort_by(|a, b| a.signer.account.cmp(&b.signer.account));
        signers.dedup_by(|a, b| a.signer.account == b.signer.account);

        Ok(CombinedUnit(TxBlob::from_action(&action, signers).encode()))
    }

    async fn submit_and_await(&self, unit: &CombinedUnit) -> LedgerResult<SubmitOutcome> {
        self.ensure_connected()?;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        let (delay, forced) = {
            let mut state = self.state();
            (state.submit_delay, state.forced_submit_outcomes.pop_front())
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let tx_hash = hex::encode_upper(Sha256::digest(unit.0.as_bytes()));
        let code = match forced {
            Some(outcome) => outcome,
            None => match TxBlob::decode(&unit.0) {
                Some(blob) => self.apply_release(&blob),
                None => OUTCOME_INVALID.to_string(),
            },
        };

        Ok(SubmitOutcome {
            code,
            tx_hash: Some(tx_hash),
        })
    }

    async fn get_balance(&self, identity: &Identity) -> LedgerResult<Drops> {
        self.ensure_connected()?;
        self.state()
            .balances
            .get(identity)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(identity.to_string()))
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(byte: u8) -> SandboxWallet {
        SandboxWallet::from_seed(&[byte; 32]).unwrap()
    }

    fn sandbox(treasury: &SandboxWallet, signers: &[&SandboxWallet], quorum: usize) -> SandboxLedger {
        SandboxLedger::new(SandboxConfig {
            treasury: treasury.address().clone(),
            treasury_balance: Drops::from_xrp(1_000),
            signers: signers.iter().map(|w| w.address().clone()).collect(),
            quorum,
            finish_after: Duration::ZERO,
        })
    }

    #[test]
    fn test_wallet_addresses_are_valid_and_deterministic() {
        let a = wallet(1);
        let b = wallet(1);
        assert_eq!(a.address(), b.address());
        assert!(is_valid_classic_address(a.address().as_str()));
        assert_ne!(wallet(2).address(), a.address());
    }

    #[test]
    fn test_wallet_from_seed_hex() {
        let hex_seed = hex::encode([9u8; 32]);
        let from_hex = SandboxWallet::from_seed_hex(&hex_seed).unwrap();
        assert_eq!(from_hex.address(), wallet(9).address());

        assert!(SandboxWallet::from_seed_hex("abcd").is_err());
        assert!(SandboxWallet::from_seed_hex("not hex").is_err());
    }

    #[test]
    fn test_challenge_proof_verifies_only_for_owner_and_message() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let ledger = sandbox(&treasury, &[], 1);

        let proof = alice.sign_challenge("xrpl-login:abc");
        assert!(ledger.verify_signature_proof("xrpl-login:abc", &proof, alice.address()));
        // Different challenge
        assert!(!ledger.verify_signature_proof("xrpl-login:abd", &proof, alice.address()));
        // Different claimed identity
        assert!(!ledger.verify_signature_proof("xrpl-login:abc", &proof, treasury.address()));
        // Garbage
        assert!(!ledger.verify_signature_proof("xrpl-login:abc", "{}", alice.address()));
        assert!(!ledger.verify_signature_proof("xrpl-login:abc", "sig", alice.address()));
    }

    #[test]
    fn test_proof_with_foreign_message_is_rejected() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let ledger = sandbox(&treasury, &[], 1);

        let mut proof: ChallengeProof =
            serde_json::from_str(&alice.sign_challenge("old-challenge")).unwrap();
        proof.message = Some("old-challenge".to_string());
        let proof = serde_json::to_string(&proof).unwrap();

        assert!(!ledger.verify_signature_proof("new-challenge", &proof, alice.address()));
    }

    #[test]
    fn test_decode_authorization() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let ledger = sandbox(&treasury, &[&alice], 1);

        let action = ReleaseAction::escrow_finish(treasury.address(), 7);
        let descriptor = ledger
            .decode_authorization(&alice.sign_release(&action))
            .unwrap();

        assert_eq!(descriptor.action, action);
        assert_eq!(descriptor.signers, vec![alice.address().clone()]);

        // Signature no longer covers the transaction
        let mut tx: serde_json::Value =
            serde_json::from_slice(&hex::decode(alice.sign_release(&action)).unwrap()).unwrap();
        tx["OfferSequence"] = serde_json::json!(8);
        assert!(ledger
            .decode_authorization(&hex::encode(serde_json::to_vec(&tx).unwrap()))
            .is_none());

        // Key does not belong to the named account
        let mut tx: serde_json::Value =
            serde_json::from_slice(&hex::decode(alice.sign_release(&action)).unwrap()).unwrap();
        tx["Signers"][0]["Signer"]["Account"] = serde_json::json!(treasury.address().as_str());
        assert!(ledger
            .decode_authorization(&hex::encode(serde_json::to_vec(&tx).unwrap()))
            .is_none());

        assert!(ledger.decode_authorization("zz").is_none());
        assert!(ledger
            .decode_authorization(&hex::encode(b"{\"Account\":\"r\"}"))
            .is_none());
    }

    #[tokio::test]
    async fn test_escrow_lock_and_multisigned_release() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let bob = wallet(3);
        let dest = wallet(4);
        let ledger = sandbox(&treasury, &[&alice, &bob], 2);

        let receipt = ledger
            .lock_funds(Drops::from_xrp(50), dest.address())
            .await
            .unwrap();
        assert_eq!(receipt.sequence, 1);
        assert_eq!(
            ledger.get_balance(treasury.address()).await.unwrap(),
            Drops::from_xrp(950)
        );

        let action = ReleaseAction::escrow_finish(treasury.address(), receipt.sequence);
        let unit = ledger
            .combine_authorizations(&[alice.sign_release(&action), bob.sign_release(&action)])
            .unwrap();
        let outcome = ledger.submit_and_await(&unit).await.unwrap();

        assert!(outcome.is_success());
        assert!(outcome.tx_hash.is_some());
        assert_eq!(
            ledger.get_balance(dest.address()).await.unwrap(),
            Drops::from_xrp(50)
        );
        assert!(!ledger.has_escrow(treasury.address(), receipt.sequence));

        // Escrow is gone
        let again = ledger.submit_and_await(&unit).await.unwrap();
        assert_eq!(again.code, OUTCOME_NO_TARGET);
    }

    #[tokio::test]
    async fn test_release_below_quorum() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let bob = wallet(3);
        let ledger = sandbox(&treasury, &[&alice, &bob], 2);

        let receipt = ledger
            .lock_funds(Drops::from_xrp(5), alice.address())
            .await
            .unwrap();
        let action = ReleaseAction::escrow_finish(treasury.address(), receipt.sequence);
        let unit = ledger
            .combine_authorizations(&[alice.sign_release(&action)])
            .unwrap();

        let outcome = ledger.submit_and_await(&unit).await.unwrap();
        assert_eq!(outcome.code, OUTCOME_BAD_QUORUM);
        assert!(ledger.has_escrow(treasury.address(), receipt.sequence));
    }

    #[tokio::test]
    async fn test_release_before_finish_after() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let ledger = SandboxLedger::new(SandboxConfig {
            treasury: treasury.address().clone(),
            treasury_balance: Drops::from_xrp(10),
            signers: vec![alice.address().clone()],
            quorum: 1,
            finish_after: Duration::from_secs(3600),
        });

        let receipt = ledger
            .lock_funds(Drops::from_xrp(1), alice.address())
            .await
            .unwrap();
        let action = ReleaseAction::escrow_finish(treasury.address(), receipt.sequence);
        let unit = ledger
            .combine_authorizations(&[alice.sign_release(&action)])
            .unwrap();

        let outcome = ledger.submit_and_await(&unit).await.unwrap();
        assert_eq!(outcome.code, OUTCOME_NO_PERMISSION);
    }

    #[tokio::test]
    async fn test_lock_rejects_unfunded() {
        let treasury = wallet(1);
        let ledger = sandbox(&treasury, &[], 1);

        let err = ledger
            .lock_funds(Drops::from_xrp(5_000), wallet(2).address())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rejected {
                outcome: OUTCOME_UNFUNDED.to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_forced_outcomes_and_counter() {
        let treasury = wallet(1);
        let ledger = sandbox(&treasury, &[], 1);

        ledger.force_next_lock_outcome("tecNO_DST");
        let err = ledger
            .lock_funds(Drops::from_xrp(1), wallet(2).address())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rejected {
                outcome: "tecNO_DST".to_string()
            }
        );

        ledger.force_next_submit_outcome("tefPAST_SEQ");
        let outcome = ledger
            .submit_and_await(&CombinedUnit("00".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome.code, "tefPAST_SEQ");
        assert_eq!(ledger.submission_count(), 1);
    }

    #[test]
    fn test_combine_rejects_mixed_transactions() {
        let treasury = wallet(1);
        let alice = wallet(2);
        let bob = wallet(3);
        let ledger = sandbox(&treasury, &[&alice, &bob], 2);

        let seven = ReleaseAction::escrow_finish(treasury.address(), 7);
        let eight = ReleaseAction::escrow_finish(treasury.address(), 8);

        assert!(ledger
            .combine_authorizations(&[alice.sign_release(&seven), bob.sign_release(&eight)])
            .is_err());
        assert!(ledger.combine_authorizations(&[]).is_err());
    }

    #[tokio::test]
    async fn test_disconnected_sandbox() {
        let treasury = wallet(1);
        let ledger = sandbox(&treasury, &[], 1);
        ledger.set_connected(false);

        assert!(!ledger.is_connected());
        assert!(matches!(
            ledger.get_balance(treasury.address()).await,
            Err(LedgerError::Unavailable(_))
        ));
    }
}
