//! Proposal registry.
//!
//! Each proposal lives in its own [`ProposalEntry`]: an async guard that
//! serializes writers (authorization and release) on that proposal, plus a
//! synchronous lock around the record itself so reads take snapshots
//! without waiting on the guard. The index lock is held only for map
//! access, so work on one proposal never blocks another.

use super::types::{Proposal, ProposalId, ProposalStatus};
use crate::error::{EscrowError, EscrowResult};
use crate::identity::Identity;
use crate::ledger::{Drops, LedgerClient};
use crate::store::StoreError;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use uuid::Uuid;

pub(crate) struct ProposalEntry {
    /// Held by writers for the whole of a mutation, ledger calls included.
    pub(crate) guard: tokio::sync::Mutex<()>,
    /// Set while a release is outstanding.
    pub(crate) release_in_flight: AtomicBool,
    state: RwLock<Proposal>,
}

impl ProposalEntry {
    fn new(proposal: Proposal) -> Self {
        Self {
            guard: tokio::sync::Mutex::new(()),
            release_in_flight: AtomicBool::new(false),
            state: RwLock::new(proposal),
        }
    }

    pub(crate) fn snapshot(&self) -> EscrowResult<Proposal> {
        let state = self
            .state
            .read()
            .map_err(|_| StoreError::Poisoned("proposal"))?;
        Ok(state.clone())
    }

    /// Apply `mutate` atomically. Changes are kept only if it succeeds.
    pub(crate) fn update<F>(&self, mutate: F) -> EscrowResult<Proposal>
    where
        F: FnOnce(&mut Proposal) -> EscrowResult<()>,
    {
        let mut state = self
            .state
            .write()
            .map_err(|_| StoreError::Poisoned("proposal"))?;
        let mut next = state.clone();
        mutate(&mut next)?;
        *state = next.clone();
        Ok(next)
    }
}

#[derive(Default)]
struct Index {
    by_id: HashMap<ProposalId, Arc<ProposalEntry>>,
    order: Vec<ProposalId>,
}

/// Owns every proposal, keyed by id.
#[derive(Default)]
pub struct ProposalRegistry {
    index: RwLock<Index>,
}

impl ProposalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Proposal input checks. Run before any ledger call.
    pub fn validate<L: LedgerClient + ?Sized>(
        ledger: &L,
        amount: Drops,
        destination: &Identity,
    ) -> EscrowResult<()> {
        if amount.is_zero() {
            return Err(EscrowError::InvalidAmount(amount.to_string()));
        }
        if destination.is_empty() || !ledger.is_valid_identity(destination.as_str()) {
            return Err(EscrowError::InvalidDestination(destination.to_string()));
        }
        Ok(())
    }

    /// Record a proposal for an escrow the ledger has already locked.
    pub fn create<L: LedgerClient + ?Sized>(
        &self,
        ledger: &L,
        amount: Drops,
        destination: &Identity,
        sequence: u32,
        required_quorum: usize,
    ) -> EscrowResult<Proposal> {
        Self::validate(ledger, amount, destination)?;

        let proposal = Proposal {
            id: Uuid::new_v4(),
            amount,
            destination: destination.clone(),
            sequence,
            authorizations: Vec::new(),
            required_quorum: required_quorum.max(1),
            status: ProposalStatus::Pending,
            created_at: SystemTime::now(),
            released_at: None,
        };

        let mut index = self
            .index
            .write()
            .map_err(|_| StoreError::Poisoned("proposal index"))?;
        index
            .by_id
            .insert(proposal.id, Arc::new(ProposalEntry::new(proposal.clone())));
        index.order.push(proposal.id);

        Ok(proposal)
    }

    pub(crate) fn entry(&self, id: &ProposalId) -> EscrowResult<Arc<ProposalEntry>> {
        let index = self
            .index
            .read()
            .map_err(|_| StoreError::Poisoned("proposal index"))?;
        index
            .by_id
            .get(id)
            .cloned()
            .ok_or_else(|| EscrowError::NotFound(id.to_string()))
    }

    pub fn get(&self, id: &ProposalId) -> EscrowResult<Proposal> {
        self.entry(id)?.snapshot()
    }

    /// Every proposal, in creation order.
    pub fn list(&self) -> EscrowResult<Vec<Proposal>> {
        let entries: Vec<Arc<ProposalEntry>> = {
            let index = self
                .index
                .read()
                .map_err(|_| StoreError::Poisoned("proposal index"))?;
            index
                .order
                .iter()
                .filter_map(|id| index.by_id.get(id).cloned())
                .collect()
        };
        entries.iter().map(|entry| entry.snapshot()).collect()
    }

    pub fn len(&self) -> EscrowResult<usize> {
        let index = self
            .index
            .read()
            .map_err(|_| StoreError::Poisoned("proposal index"))?;
        Ok(index.order.len())
    }

    pub fn is_empty(&self) -> EscrowResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Mark a quorum-ready proposal as released.
    ///
    /// Callers that also hold ledger state for this proposal must hold its
    /// guard.
    pub fn transition_to_released(
        &self,
        id: &ProposalId,
        released_at: SystemTime,
    ) -> EscrowResult<Proposal> {
        self.entry(id)?.update(|proposal| match proposal.status {
            ProposalStatus::Released => Err(EscrowError::AlreadyReleased),
            ProposalStatus::Pending => Err(EscrowError::InvalidTransition {
                status: proposal.status.name(),
            }),
            ProposalStatus::QuorumReady => {
                proposal.status = ProposalStatus::Released;
                proposal.released_at = Some(released_at);
                Ok(())
            }
        })
    }
}
