//! Challenge-response login.
//!
//! `issue_challenge` stores one unguessable payload per identity;
//! `verify_challenge` consumes it. A challenge is good for exactly one
//! verification attempt: the record is taken out of storage before the
//! proof is checked, so success and failure both use it up.

use super::{Clock, SystemClock};
use crate::error::{EscrowError, EscrowResult};
use crate::identity::Identity;
use crate::ledger::LedgerClient;
use crate::store::{ChallengeRecord, ChallengeStorage, MemoryChallengeStore};
use ring::rand::{SecureRandom, SystemRandom};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const DEFAULT_CHALLENGE_TTL: Duration = Duration::from_secs(5 * 60);

const CHALLENGE_PREFIX: &str = "xrpl-login";

/// A freshly issued challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedChallenge {
    pub payload: String,
    pub ttl: Duration,
    pub expires_at: SystemTime,
}

/// Issues and verifies login challenges.
pub struct ChallengeAuthenticator<L: LedgerClient> {
    ledger: Arc<L>,
    storage: Arc<dyn ChallengeStorage>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    rng: SystemRandom,
}

impl<L: LedgerClient> ChallengeAuthenticator<L> {
    /// In-memory authenticator on the system clock.
    pub fn new(ledger: Arc<L>, ttl: Duration) -> Self {
        Self::with_parts(
            ledger,
            Arc::new(MemoryChallengeStore::new()),
            Arc::new(SystemClock),
            ttl,
        )
    }

    pub fn with_parts(
        ledger: Arc<L>,
        storage: Arc<dyn ChallengeStorage>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> Self {
        Self {
            ledger,
            storage,
            clock,
            ttl,
            rng: SystemRandom::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a challenge for `identity`, replacing any outstanding one.
    pub fn issue_challenge(&self, identity: &Identity) -> EscrowResult<IssuedChallenge> {
        if identity.is_empty() {
            return Err(EscrowError::MissingField("address"));
        }
        if !self.ledger.is_valid_identity(identity.as_str()) {
            return Err(EscrowError::InvalidIdentity(identity.to_string()));
        }

        let mut nonce = [0u8; 16];
        self.rng
            .fill(&mut nonce)
            .map_err(|_| EscrowError::RandomnessUnavailable)?;

        let issued_at = self.clock.now();
        let millis = issued_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let payload = format!(
            "{}:{}:{}:{}",
            CHALLENGE_PREFIX,
            identity,
            millis,
            hex::encode(nonce)
        );
        let expires_at = issued_at + self.ttl;

        let replaced = self.storage.put(ChallengeRecord {
            identity: identity.clone(),
            payload: payload.clone(),
            issued_at,
            expires_at,
        })?;

        tracing::info!(
            address = %identity,
            replaced = replaced.is_some(),
            "challenge issued"
        );

        Ok(IssuedChallenge {
            payload,
            ttl: self.ttl,
            expires_at,
        })
    }

    /// Check `proof` against the outstanding challenge for `identity`.
    pub fn verify_challenge(&self, identity: &Identity, proof: &str) -> EscrowResult<()> {
        if identity.is_empty() {
            return Err(EscrowError::MissingField("address"));
        }
        if proof.trim().is_empty() {
            return Err(EscrowError::MissingField("signature"));
        }

        let record = self
            .storage
            .take(identity)?
            .ok_or(EscrowError::NoActiveChallenge)?;

        if record.is_expired(self.clock.now()) {
            tracing::warn!(address = %identity, "challenge expired");
            return Err(EscrowError::ChallengeExpired);
        }

        if !self
            .ledger
            .verify_signature_proof(&record.payload, proof, identity)
        {
            tracing::warn!(address = %identity, "challenge signature rejected");
            return Err(EscrowError::InvalidSignature);
        }

        Ok(())
    }

    /// Drop expired challenges. Returns how many were dropped.
    pub fn purge_expired(&self) -> EscrowResult<usize> {
        Ok(self.storage.purge_expired(self.clock.now())?)
    }

    pub fn outstanding(&self) -> EscrowResult<usize> {
        Ok(self.storage.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::ManualClock;
    use crate::ledger::{Drops, SandboxConfig, SandboxLedger, SandboxWallet};

    struct Fixture {
        auth: ChallengeAuthenticator<SandboxLedger>,
        clock: Arc<ManualClock>,
        alice: SandboxWallet,
    }

    fn fixture() -> Fixture {
        let treasury = SandboxWallet::from_seed(&[1; 32]).unwrap();
        let ledger = SandboxLedger::new(SandboxConfig {
            treasury: treasury.address().clone(),
            treasury_balance: Drops::from_xrp(100),
            signers: Vec::new(),
            quorum: 1,
            finish_after: Duration::ZERO,
        });
        let clock = Arc::new(ManualClock::default());
        let auth = ChallengeAuthenticator::with_parts(
            Arc::new(ledger),
            Arc::new(MemoryChallengeStore::new()),
            clock.clone(),
            Duration::from_secs(300),
        );
        Fixture {
            auth,
            clock,
            alice: SandboxWallet::from_seed(&[2; 32]).unwrap(),
        }
    }

    #[test]
    fn test_issue_rejects_malformed_identity() {
        let f = fixture();
        assert!(matches!(
            f.auth.issue_challenge(&Identity::new("not-an-address")),
            Err(EscrowError::InvalidIdentity(_))
        ));
        assert!(matches!(
            f.auth.issue_challenge(&Identity::new("")),
            Err(EscrowError::MissingField("address"))
        ));
    }

    #[test]
    fn test_payload_binds_identity_and_is_unique() {
        let f = fixture();
        let first = f.auth.issue_challenge(f.alice.address()).unwrap();
        let second = f.auth.issue_challenge(f.alice.address()).unwrap();

        let prefix = format!("xrpl-login:{}:", f.alice.address());
        assert!(first.payload.starts_with(&prefix));
        assert_ne!(first.payload, second.payload);
        assert_eq!(first.ttl, Duration::from_secs(300));
        // Nonce is 16 bytes of hex
        assert_eq!(first.payload.rsplit(':').next().unwrap().len(), 32);
    }

    #[test]
    fn test_verify_success_consumes_challenge() {
        let f = fixture();
        let issued = f.auth.issue_challenge(f.alice.address()).unwrap();
        let proof = f.alice.sign_challenge(&issued.payload);

        f.auth.verify_challenge(f.alice.address(), &proof).unwrap();
        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), &proof),
            Err(EscrowError::NoActiveChallenge)
        ));
    }

    #[test]
    fn test_failed_verification_consumes_challenge() {
        let f = fixture();
        let issued = f.auth.issue_challenge(f.alice.address()).unwrap();
        let mallory = SandboxWallet::from_seed(&[9; 32]).unwrap();

        let forged = mallory.sign_challenge(&issued.payload);
        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), &forged),
            Err(EscrowError::InvalidSignature)
        ));

        let genuine = f.alice.sign_challenge(&issued.payload);
        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), &genuine),
            Err(EscrowError::NoActiveChallenge)
        ));
    }

    #[test]
    fn test_second_challenge_invalidates_first() {
        let f = fixture();
        let first = f.auth.issue_challenge(f.alice.address()).unwrap();
        let _second = f.auth.issue_challenge(f.alice.address()).unwrap();

        let stale = f.alice.sign_challenge(&first.payload);
        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), &stale),
            Err(EscrowError::InvalidSignature)
        ));
    }

    #[test]
    fn test_expired_challenge() {
        let f = fixture();
        let issued = f.auth.issue_challenge(f.alice.address()).unwrap();
        f.clock.advance(Duration::from_secs(301));

        let proof = f.alice.sign_challenge(&issued.payload);
        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), &proof),
            Err(EscrowError::ChallengeExpired)
        ));
        assert_eq!(f.auth.outstanding().unwrap(), 0);
    }

    #[test]
    fn test_missing_proof_keeps_challenge() {
        let f = fixture();
        f.auth.issue_challenge(f.alice.address()).unwrap();

        assert!(matches!(
            f.auth.verify_challenge(f.alice.address(), "  "),
            Err(EscrowError::MissingField("signature"))
        ));
        assert_eq!(f.auth.outstanding().unwrap(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let f = fixture();
        f.auth.issue_challenge(f.alice.address()).unwrap();

        assert_eq!(f.auth.purge_expired().unwrap(), 0);
        f.clock.advance(Duration::from_secs(600));
        assert_eq!(f.auth.purge_expired().unwrap(), 1);
    }
}
