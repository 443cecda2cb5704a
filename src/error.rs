//! Workflow error taxonomy.
//!
//! Every failure the approval workflow can report is an [`EscrowError`]
//! variant, and every variant belongs to exactly one [`ErrorKind`]. The HTTP
//! layer maps kinds to status codes; callers that embed the library match on
//! variants directly.

use crate::ledger::LedgerError;
use crate::store::StoreError;
use serde::Serialize;
use std::fmt;

/// Result type for workflow operations.
pub type EscrowResult<T> = Result<T, EscrowError>;

/// Coarse error classes exposed to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input. Safe to show verbatim.
    Validation,
    /// Missing, invalid or expired credential.
    Auth,
    /// Authenticated, but not allowed to do this.
    Forbidden,
    /// Request conflicts with the current lifecycle state.
    Conflict,
    /// Unknown resource.
    NotFound,
    /// Ledger client failure. Always retryable by the caller.
    Upstream,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validation => "validation",
            Self::Auth => "auth",
            Self::Forbidden => "forbidden",
            Self::Conflict => "conflict",
            Self::NotFound => "not_found",
            Self::Upstream => "upstream",
        };
        f.write_str(name)
    }
}

/// Approval workflow errors.
#[derive(Debug, thiserror::Error)]
pub enum EscrowError {
    #[error("Invalid identity: {0:?}")]
    InvalidIdentity(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    #[error("No active challenge for address")]
    NoActiveChallenge,

    #[error("Challenge expired")]
    ChallengeExpired,

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: requires role {required}")]
    Forbidden { required: &'static str },

    #[error("Amount must be a positive XRP value: {0:?}")]
    InvalidAmount(String),

    #[error("Valid destination address is required: {0:?}")]
    InvalidDestination(String),

    #[error("Proposal not found: {0}")]
    NotFound(String),

    #[error("Proposal not ready for release (status {status})")]
    InvalidTransition { status: &'static str },

    #[error("Proposal already released")]
    AlreadyReleased,

    #[error("Release already in progress for proposal")]
    ReleaseInFlight,

    #[error("Malformed authorization: {0}")]
    MalformedAuthorization(String),

    #[error("Signer mismatch: {0}")]
    SignerMismatch(String),

    #[error("Authorization does not match expected EscrowFinish payload: {0}")]
    PayloadMismatch(String),

    #[error("Verifier has already signed this proposal")]
    DuplicateAuthorization,

    #[error("Ledger rejected transaction: {outcome}")]
    LedgerRejected { outcome: String },

    #[error("Ledger did not reach a terminal outcome in time")]
    LedgerTimeout,

    #[error("Ledger unavailable: {0}")]
    LedgerUnavailable(String),

    #[error("Ledger could not build the transaction: {0}")]
    LedgerInvalidPayload(String),

    #[error("System randomness unavailable")]
    RandomnessUnavailable,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl EscrowError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidIdentity(_)
            | Self::MissingField(_)
            | Self::MalformedRequest(_)
            | Self::InvalidAmount(_)
            | Self::InvalidDestination(_)
            | Self::MalformedAuthorization(_)
            | Self::PayloadMismatch(_) => ErrorKind::Validation,

            Self::NoActiveChallenge
            | Self::ChallengeExpired
            | Self::InvalidSignature
            | Self::Unauthorized => ErrorKind::Auth,

            Self::Forbidden { .. } | Self::SignerMismatch(_) => ErrorKind::Forbidden,

            Self::InvalidTransition { .. }
            | Self::AlreadyReleased
            | Self::ReleaseInFlight
            | Self::DuplicateAuthorization => ErrorKind::Conflict,

            Self::NotFound(_) => ErrorKind::NotFound,

            Self::LedgerRejected { .. }
            | Self::LedgerTimeout
            | Self::LedgerUnavailable(_)
            | Self::LedgerInvalidPayload(_)
            | Self::RandomnessUnavailable
            | Self::Store(_) => ErrorKind::Upstream,
        }
    }

    /// Upstream outcome code, when the ledger produced one.
    pub fn outcome(&self) -> Option<&str> {
        match self {
            Self::LedgerRejected { outcome } => Some(outcome),
            _ => None,
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::LedgerInvalidPayload(_) => false,
            Self::ReleaseInFlight => true,
            _ => self.kind() == ErrorKind::Upstream,
        }
    }
}

impl From<LedgerError> for EscrowError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected { outcome } => Self::LedgerRejected { outcome },
            LedgerError::Timeout => Self::LedgerTimeout,
            LedgerError::InvalidPayload(msg) => Self::LedgerInvalidPayload(msg),
            other => Self::LedgerUnavailable(other.to_string()),
        }
    }
}
