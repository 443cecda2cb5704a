//! Release coordination.
//!
//! Turns a quorum-ready proposal into one multisigned ledger submission.
//! Only one release per proposal may be outstanding; a concurrent attempt
//! fails fast with `ReleaseInFlight` instead of queueing behind the first.
//! Proposal state advances only on a confirmed ledger success.

use super::registry::{ProposalEntry, ProposalRegistry};
use super::types::{Proposal, ProposalId, ProposalStatus};
use crate::error::{EscrowError, EscrowResult};
use crate::ledger::{with_deadline, LedgerClient};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub proposal: Proposal,
    /// Ledger outcome code, `tesSUCCESS`.
    pub outcome: String,
    pub tx_hash: Option<String>,
}

/// Clears the in-flight flag when the release attempt ends.
struct InFlight<'a> {
    entry: &'a ProposalEntry,
}

impl<'a> InFlight<'a> {
    fn acquire(entry: &'a ProposalEntry) -> EscrowResult<Self> {
        entry
            .release_in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| EscrowError::ReleaseInFlight)?;
        Ok(Self { entry })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.entry.release_in_flight.store(false, Ordering::Release);
    }
}

pub struct ReleaseCoordinator<L: LedgerClient> {
    ledger: Arc<L>,
    registry: Arc<ProposalRegistry>,
    submit_timeout: Duration,
}

impl<L: LedgerClient> ReleaseCoordinator<L> {
    pub fn new(ledger: Arc<L>, registry: Arc<ProposalRegistry>, submit_timeout: Duration) -> Self {
        Self {
            ledger,
            registry,
            submit_timeout,
        }
    }

    /// Release the escrow behind proposal `id`.
    pub async fn release(&self, id: &ProposalId) -> EscrowResult<ReleaseOutcome> {
        let entry = self.registry.entry(id)?;
        let _in_flight = InFlight::acquire(&entry)?;
        let _guard = entry.guard.lock().await;

        let current = entry.snapshot()?;
        match current.status {
            ProposalStatus::Released => return Err(EscrowError::AlreadyReleased),
            ProposalStatus::Pending => {
                return Err(EscrowError::InvalidTransition {
                    status: current.status.name(),
                })
            }
            ProposalStatus::QuorumReady => {}
        }

        // First `required_quorum` authorizations by arrival
        let payloads: Vec<String> = current
            .authorizations
            .iter()
            .take(current.required_quorum)
            .map(|auth| auth.payload.clone())
            .collect();

        let unit = self.ledger.combine_authorizations(&payloads)?;
        let submitted =
            with_deadline(self.submit_timeout, self.ledger.submit_and_await(&unit)).await;

        let outcome = match submitted {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    proposal_id = %id,
                    error = %err,
                    "release submission failed"
                );
                return Err(err.into());
            }
        };

        if !outcome.is_success() {
            tracing::warn!(
                proposal_id = %id,
                outcome = %outcome.code,
                "ledger rejected release"
            );
            return Err(EscrowError::LedgerRejected {
                outcome: outcome.code,
            });
        }

        match self.registry.transition_to_released(id, SystemTime::now()) {
            Ok(proposal) => {
                tracing::info!(
                    proposal_id = %id,
                    tx_hash = outcome.tx_hash.as_deref().unwrap_or(""),
                    "proposal released"
                );
                Ok(ReleaseOutcome {
                    proposal,
                    outcome: outcome.code,
                    tx_hash: outcome.tx_hash,
                })
            }
            Err(err) => {
                tracing::error!(
                    proposal_id = %id,
                    tx_hash = outcome.tx_hash.as_deref().unwrap_or(""),
                    error = %err,
                    "funds released on ledger but proposal state was not updated"
                );
                Err(err)
            }
        }
    }
}
