//! Treasury release proposals.
//!
//! A proposal moves strictly forward:
//!
//! ```text
//! Pending --(quorum of authorizations)--> QuorumReady --(ledger success)--> Released
//! ```
//!
//! - `types`: the proposal record and its wire format
//! - `registry`: ownership, snapshots, and the release transition
//! - `collector`: approver authorizations and quorum
//! - `release`: single-flight ledger submission

pub mod collector;
pub mod registry;
pub mod release;
pub mod types;

pub use collector::{AuthorizationCollector, DecodedAuthorization};
pub use registry::ProposalRegistry;
pub use release::{ReleaseCoordinator, ReleaseOutcome, DEFAULT_SUBMIT_TIMEOUT};
pub use types::{parse_proposal_id, Authorization, Proposal, ProposalId, ProposalStatus};
