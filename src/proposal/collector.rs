//! Authorization collection.
//!
//! Approvers submit partially signed release transactions one at a time.
//! An authorization is accepted only if it decodes, carries exactly the
//! submitting approver's signature, and signs the exact escrow release this
//! proposal needs. Quorum is evaluated in the same atomic step as the append.

use super::registry::ProposalRegistry;
use super::types::{Authorization, Proposal, ProposalId, ProposalStatus};
use crate::error::{EscrowError, EscrowResult};
use crate::identity::Identity;
use crate::ledger::{AuthorizationDescriptor, LedgerClient, ReleaseAction};
use std::sync::Arc;

/// Result of decoding an authorization payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedAuthorization {
    Structured(AuthorizationDescriptor),
    Malformed(&'static str),
}

impl DecodedAuthorization {
    pub fn decode<L: LedgerClient + ?Sized>(ledger: &L, payload: &str) -> Self {
        if payload.trim().is_empty() {
            return Self::Malformed("authorization payload is empty");
        }
        match ledger.decode_authorization(payload.trim()) {
            Some(descriptor) => Self::Structured(descriptor),
            None => Self::Malformed("authorization payload could not be decoded"),
        }
    }
}

pub struct AuthorizationCollector<L: LedgerClient> {
    ledger: Arc<L>,
    registry: Arc<ProposalRegistry>,
    treasury: Identity,
}

impl<L: LedgerClient> AuthorizationCollector<L> {
    pub fn new(ledger: Arc<L>, registry: Arc<ProposalRegistry>, treasury: Identity) -> Self {
        Self {
            ledger,
            registry,
            treasury,
        }
    }

    /// Record `signer`'s authorization on proposal `id`.
    pub async fn submit_authorization(
        &self,
        id: &ProposalId,
        signer: &Identity,
        payload: &str,
    ) -> EscrowResult<Proposal> {
        let entry = self.registry.entry(id)?;
        let _guard = entry.guard.lock().await;

        let current = entry.snapshot()?;
        if current.status == ProposalStatus::Released {
            return Err(EscrowError::AlreadyReleased);
        }

        let descriptor = match DecodedAuthorization::decode(self.ledger.as_ref(), payload) {
            DecodedAuthorization::Structured(descriptor) => descriptor,
            DecodedAuthorization::Malformed(reason) => {
                return Err(EscrowError::MalformedAuthorization(reason.to_string()))
            }
        };

        match descriptor.signers.as_slice() {
            [only] if only == signer => {}
            [] => {
                return Err(EscrowError::SignerMismatch(
                    "authorization carries no signature".to_string(),
                ))
            }
            [other] => {
                return Err(EscrowError::SignerMismatch(format!(
                    "authorization signed by {} but submitted by {}",
                    other, signer
                )))
            }
            many => {
                return Err(EscrowError::SignerMismatch(format!(
                    "authorization carries {} signatures, expected one",
                    many.len()
                )))
            }
        }

        let expected = ReleaseAction::escrow_finish(&self.treasury, current.sequence);
        let mismatched = descriptor.action.mismatched_fields(&expected);
        if !mismatched.is_empty() {
            tracing::warn!(
                proposal_id = %id,
                signer = %signer,
                fields = ?mismatched,
                "authorization does not match escrow release"
            );
            return Err(EscrowError::PayloadMismatch(format!(
                "mismatched {}",
                mismatched.join(", ")
            )));
        }

        let updated = entry.update(|proposal| {
            if proposal.has_signed(signer) {
                return Err(EscrowError::DuplicateAuthorization);
            }
            proposal.authorizations.push(Authorization {
                signer: signer.clone(),
                payload: payload.trim().to_string(),
            });
            if proposal.status == ProposalStatus::Pending && proposal.is_quorum_reached() {
                proposal.status = ProposalStatus::QuorumReady;
            }
            Ok(())
        })?;

        tracing::info!(
            proposal_id = %id,
            signer = %signer,
            count = updated.authorization_count(),
            required = updated.required_quorum,
            status = %updated.status,
            "authorization collected"
        );

        Ok(updated)
    }
}
