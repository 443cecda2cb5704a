//! Approval workflow facade.
//!
//! [`EscrowService`] owns every component and enforces role gating. The
//! HTTP layer is a thin adapter over it; embedders can drive it directly.

use crate::auth::{
    ChallengeAuthenticator, IssuedChallenge, Principal, SessionStore, DEFAULT_CHALLENGE_TTL,
};
use crate::error::{EscrowError, EscrowResult};
use crate::identity::{Identity, Role, RoleResolver};
use crate::ledger::{
    is_ledger_error_retryable, retry_with_backoff, with_deadline, Drops, LedgerClient,
    LockReceipt, RetryPolicy,
};
use crate::proposal::{
    parse_proposal_id, AuthorizationCollector, Proposal, ProposalRegistry, ReleaseCoordinator,
    ReleaseOutcome, DEFAULT_SUBMIT_TIMEOUT,
};
use std::sync::Arc;
use std::time::Duration;

/// Deployment settings the workflow needs.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub treasury: Identity,
    pub approvers: Vec<Identity>,
    pub required_signatures: usize,
    pub challenge_ttl: Duration,
    pub session_ttl: Option<Duration>,
    /// Bound on each lock-up and release submission.
    pub submit_timeout: Duration,
    pub query_retry: RetryPolicy,
}

impl ServiceSettings {
    pub fn new(treasury: Identity, approvers: Vec<Identity>, required_signatures: usize) -> Self {
        Self {
            treasury,
            approvers,
            required_signatures,
            challenge_ttl: DEFAULT_CHALLENGE_TTL,
            session_ttl: None,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            query_retry: RetryPolicy::default(),
        }
    }
}

/// Successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub token: String,
    pub principal: Principal,
}

/// A new proposal and the lock-up that backs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedProposal {
    pub proposal: Proposal,
    pub lock: LockReceipt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasuryBalance {
    pub treasury: Identity,
    pub balance: Drops,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthReport {
    pub ledger_connected: bool,
    pub treasury: Identity,
    pub approver_count: usize,
    pub proposal_count: usize,
    pub session_count: usize,
}

pub struct EscrowService<L: LedgerClient> {
    ledger: Arc<L>,
    roles: RoleResolver,
    challenges: ChallengeAuthenticator<L>,
    sessions: SessionStore,
    registry: Arc<ProposalRegistry>,
    collector: AuthorizationCollector<L>,
    releaser: ReleaseCoordinator<L>,
    settings: ServiceSettings,
}

/// Fails with `Forbidden` unless `principal` acts as `role`.
pub fn require_role(principal: &Principal, role: Role) -> EscrowResult<()> {
    if principal.role == role {
        Ok(())
    } else {
        Err(EscrowError::Forbidden {
            required: role.name(),
        })
    }
}

impl<L: LedgerClient> EscrowService<L> {
    pub fn new(ledger: Arc<L>, settings: ServiceSettings) -> Self {
        let registry = Arc::new(ProposalRegistry::new());
        Self {
            roles: RoleResolver::new(settings.treasury.clone(), settings.approvers.clone()),
            challenges: ChallengeAuthenticator::new(ledger.clone(), settings.challenge_ttl),
            sessions: SessionStore::new(settings.session_ttl),
            collector: AuthorizationCollector::new(
                ledger.clone(),
                registry.clone(),
                settings.treasury.clone(),
            ),
            releaser: ReleaseCoordinator::new(
                ledger.clone(),
                registry.clone(),
                settings.submit_timeout,
            ),
            registry,
            ledger,
            settings,
        }
    }

    /// Replace the authenticator, e.g. to run on a manual clock.
    pub fn with_authenticator(mut self, challenges: ChallengeAuthenticator<L>) -> Self {
        self.challenges = challenges;
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn ledger(&self) -> &Arc<L> {
        &self.ledger
    }

    pub fn resolve_role(&self, identity: &Identity) -> Role {
        self.roles.resolve_role(identity)
    }

    /// Start a login for `address`.
    pub fn login(&self, address: &str) -> EscrowResult<IssuedChallenge> {
        self.challenges.issue_challenge(&Identity::new(address))
    }

    /// Finish a login. Mints a session carrying the identity's current role.
    pub fn verify(&self, address: &str, proof: &str) -> EscrowResult<LoginOutcome> {
        let identity = Identity::new(address);
        self.challenges.verify_challenge(&identity, proof)?;

        let role = self.roles.resolve_role(&identity);
        let token = self.sessions.mint(&identity, role)?;

        tracing::info!(address = %identity, role = %role, "login success");

        Ok(LoginOutcome {
            token,
            principal: Principal { identity, role },
        })
    }

    pub fn authenticate(&self, token: &str) -> EscrowResult<Principal> {
        self.sessions.resolve(token)
    }

    pub fn logout(&self, token: &str) -> EscrowResult<()> {
        let principal = self.sessions.resolve(token)?;
        self.sessions.revoke(token)?;
        tracing::info!(address = %principal.identity, "logout");
        Ok(())
    }

    /// Lock funds for `destination` and open a proposal to release them.
    pub async fn create_proposal(
        &self,
        principal: &Principal,
        amount: &str,
        destination: &str,
    ) -> EscrowResult<CreatedProposal> {
        require_role(principal, Role::Initiator)?;

        let amount = Drops::parse_xrp(amount)
            .map_err(|_| EscrowError::InvalidAmount(amount.trim().to_string()))?;
        let destination = Identity::new(destination);
        ProposalRegistry::validate(self.ledger.as_ref(), amount, &destination)?;

        let lock = with_deadline(
            self.settings.submit_timeout,
            self.ledger.lock_funds(amount, &destination),
        )
        .await
        .map_err(|err| {
            tracing::warn!(
                amount = %amount,
                destination = %destination,
                error = %err,
                "escrow lock-up failed"
            );
            EscrowError::from(err)
        })?;

        let proposal = self.registry.create(
            self.ledger.as_ref(),
            amount,
            &destination,
            lock.sequence,
            self.settings.required_signatures,
        )?;

        tracing::info!(
            proposal_id = %proposal.id,
            amount = %proposal.amount,
            destination = %proposal.destination,
            offer_sequence = proposal.sequence,
            "proposal created"
        );

        Ok(CreatedProposal { proposal, lock })
    }

    pub fn list_proposals(&self, _principal: &Principal) -> EscrowResult<Vec<Proposal>> {
        self.registry.list()
    }

    pub fn get_proposal(&self, _principal: &Principal, id: &str) -> EscrowResult<Proposal> {
        self.registry.get(&parse_proposal_id(id)?)
    }

    /// Add the caller's authorization to proposal `id`.
    pub async fn sign(
        &self,
        principal: &Principal,
        id: &str,
        payload: &str,
    ) -> EscrowResult<Proposal> {
        require_role(principal, Role::Approver)?;
        let id = parse_proposal_id(id)?;
        self.collector
            .submit_authorization(&id, &principal.identity, payload)
            .await
    }

    pub async fn release(&self, principal: &Principal, id: &str) -> EscrowResult<ReleaseOutcome> {
        require_role(principal, Role::Initiator)?;
        let id = parse_proposal_id(id)?;
        self.releaser.release(&id).await
    }

    /// Current treasury balance. Transient ledger failures are retried.
    pub async fn balance(&self, _principal: &Principal) -> EscrowResult<TreasuryBalance> {
        let treasury = &self.settings.treasury;
        let ledger = self.ledger.as_ref();
        let balance = retry_with_backoff(
            self.settings.query_retry,
            move || ledger.get_balance(treasury),
            is_ledger_error_retryable,
        )
        .await?;

        Ok(TreasuryBalance {
            treasury: treasury.clone(),
            balance,
        })
    }

    pub fn health(&self) -> EscrowResult<HealthReport> {
        Ok(HealthReport {
            ledger_connected: self.ledger.is_connected(),
            treasury: self.settings.treasury.clone(),
            approver_count: self.roles.approver_count(),
            proposal_count: self.registry.len()?,
            session_count: self.sessions.len()?,
        })
    }

    /// Drop expired login challenges.
    pub fn purge_expired_challenges(&self) -> EscrowResult<usize> {
        self.challenges.purge_expired()
    }
}
