//! Ledger client boundary.
//!
//! - `traits`: the [`LedgerClient`] trait and its value types
//! - `address`: classic address codec
//! - `amount`: XRP amounts held as drops
//! - `retry`: backoff and deadlines for ledger calls
//! - `sandbox`: in-process ledger for local runs and tests

pub mod address;
pub mod amount;
pub mod retry;
pub mod sandbox;
pub mod traits;

pub use address::is_valid_classic_address;
pub use amount::{AmountError, Drops};
pub use retry::{is_ledger_error_retryable, retry_with_backoff, with_deadline, RetryPolicy};
pub use sandbox::{SandboxConfig, SandboxLedger, SandboxWallet};
pub use traits::{
    AuthorizationDescriptor, CombinedUnit, LedgerClient, LedgerError, LedgerResult, LockReceipt,
    ReleaseAction, SubmitOutcome, ESCROW_FINISH, SUCCESS_OUTCOME,
};
