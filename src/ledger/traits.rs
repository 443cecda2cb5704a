//! Trait abstraction for the ledger client.
//!
//! The approval workflow never talks to a ledger network directly. Everything
//! it needs (address validation, login proof verification, escrow lock-up,
//! authorization decoding, multisign assembly, submission, balances) goes
//! through [`LedgerClient`], so the sandbox ledger and a network client are
//! interchangeable.

use super::amount::Drops;
use crate::identity::Identity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transaction type of an escrow release.
pub const ESCROW_FINISH: &str = "EscrowFinish";

/// Engine result reported for a successful transaction.
pub const SUCCESS_OUTCOME: &str = "tesSUCCESS";

/// The action fields of a release transaction.
///
/// An authorization binds to a proposal through exactly these fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAction {
    pub kind: String,
    pub account: Identity,
    pub owner: Identity,
    pub offer_sequence: u32,
}

impl ReleaseAction {
    /// The escrow release the treasury must perform for an escrow it created
    /// at `offer_sequence`.
    pub fn escrow_finish(treasury: &Identity, offer_sequence: u32) -> Self {
        Self {
            kind: ESCROW_FINISH.to_string(),
            account: treasury.clone(),
            owner: treasury.clone(),
            offer_sequence,
        }
    }

    /// Names of the fields that differ from `expected`.
    pub fn mismatched_fields(&self, expected: &ReleaseAction) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.kind != expected.kind {
            fields.push("TransactionType");
        }
        if self.account != expected.account {
            fields.push("Account");
        }
        if self.owner != expected.owner {
            fields.push("Owner");
        }
        if self.offer_sequence != expected.offer_sequence {
            fields.push("OfferSequence");
        }
        fields
    }
}

/// Decoded view of a partially signed release transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationDescriptor {
    pub action: ReleaseAction,
    /// Accounts that contributed a signature, in blob order.
    pub signers: Vec<Identity>,
}

/// Confirmation that funds were locked in escrow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockReceipt {
    /// Sequence of the lock-up transaction; the escrow's `OfferSequence`.
    pub sequence: u32,
    pub outcome: String,
}

/// A multisigned transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedUnit(pub String);

/// Terminal result of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub code: String,
    pub tx_hash: Option<String>,
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_OUTCOME
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger client errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Network or connection failure.
    Unavailable(String),
    /// The ledger reached a terminal, non-success outcome.
    Rejected { outcome: String },
    /// No terminal outcome within the allowed wait.
    Timeout,
    /// Input could not be turned into a transaction.
    InvalidPayload(String),
    /// Unknown account.
    AccountNotFound(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable(msg) => write!(f, "Ledger unavailable: {}", msg),
            Self::Rejected { outcome } => write!(f, "Transaction rejected: {}", outcome),
            Self::Timeout => write!(f, "Timed out waiting for ledger"),
            Self::InvalidPayload(msg) => write!(f, "Invalid payload: {}", msg),
            Self::AccountNotFound(account) => write!(f, "Account not found: {}", account),
        }
    }
}

impl std::error::Error for LedgerError {}

/// Ledger client operations needed by the approval workflow.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Address format check.
    fn is_valid_identity(&self, identity: &str) -> bool;

    /// Does `proof` attest to exactly `challenge`, signed by `identity`?
    fn verify_signature_proof(&self, challenge: &str, proof: &str, identity: &Identity) -> bool;

    /// Lock `amount` in escrow for `destination`, signed by the treasury.
    async fn lock_funds(&self, amount: Drops, destination: &Identity) -> LedgerResult<LockReceipt>;

    /// Decode a partially signed release transaction. `None` if malformed.
    fn decode_authorization(&self, payload: &str) -> Option<AuthorizationDescriptor>;

    /// Merge partial signatures into one submittable transaction.
    fn combine_authorizations(&self, payloads: &[String]) -> LedgerResult<CombinedUnit>;

    /// Submit and wait for a terminal outcome.
    async fn submit_and_await(&self, unit: &CombinedUnit) -> LedgerResult<SubmitOutcome>;

    async fn get_balance(&self, identity: &Identity) -> LedgerResult<Drops>;

    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escrow_finish_binds_treasury_as_account_and_owner() {
        let treasury = Identity::new("rTreasury");
        let action = ReleaseAction::escrow_finish(&treasury, 7);

        assert_eq!(action.kind, ESCROW_FINISH);
        assert_eq!(action.account, treasury);
        assert_eq!(action.owner, treasury);
        assert_eq!(action.offer_sequence, 7);
    }

    #[test]
    fn test_mismatched_fields() {
        let treasury = Identity::new("rTreasury");
        let expected = ReleaseAction::escrow_finish(&treasury, 7);

        let mut other = expected.clone();
        assert!(other.mismatched_fields(&expected).is_empty());

        other.offer_sequence = 8;
        other.owner = Identity::new("rSomeoneElse");
        assert_eq!(
            other.mismatched_fields(&expected),
            vec!["Owner", "OfferSequence"]
        );
    }

    #[test]
    fn test_submit_outcome_success() {
        let ok = SubmitOutcome {
            code: SUCCESS_OUTCOME.to_string(),
            tx_hash: None,
        };
        let bad = SubmitOutcome {
            code: "tecNO_PERMISSION".to_string(),
            tx_hash: None,
        };
        assert!(ok.is_success());
        assert!(!bad.is_success());
    }

    #[test]
    fn test_ledger_error_display() {
        assert_eq!(
            LedgerError::Rejected {
                outcome: "tefBAD_QUORUM".to_string()
            }
            .to_string(),
            "Transaction rejected: tefBAD_QUORUM"
        );
        assert_eq!(LedgerError::Timeout.to_string(), "Timed out waiting for ledger");
    }
}
