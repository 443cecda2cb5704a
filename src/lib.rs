//! escrowgate - multi-party approval for treasury escrow releases.
//!
//! A treasury locks funds in a ledger escrow and opens a proposal. Approvers
//! each submit a partially signed release; once a quorum has signed, the
//! treasury submits the combined release exactly once.
//!
//! - [`identity`]: addresses and roles
//! - [`auth`]: challenge-response login and bearer sessions
//! - [`proposal`]: proposal registry, authorization collection, release
//! - [`ledger`]: the ledger client boundary and an in-process sandbox
//! - [`service`]: the workflow facade with role gating
//! - [`http`]: the JSON API

pub mod auth;
pub mod error;
pub mod http;
pub mod identity;
pub mod ledger;
pub mod proposal;
pub mod service;
pub mod store;

pub use error::{ErrorKind, EscrowError, EscrowResult};
pub use identity::{Identity, Role, RoleResolver};
pub use service::{EscrowService, ServiceSettings};
