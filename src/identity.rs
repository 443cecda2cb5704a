//! Identities and role resolution.
//!
//! An identity is an opaque ledger address string supplied by the caller.
//! Its role is a pure function of the address against the deployment's
//! static configuration, recomputed on every login.
//!
//! # Roles
//!
//! - **Initiator** (`TREASURY`): the configured treasury address. Creates and
//!   releases proposals.
//! - **Approver** (`VERIFIER`): any address in the configured approver set.
//!   Submits partial authorizations.
//! - **Observer** (`VIEWER`): everyone else. Read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Ledger address of an actor.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wrap an address, trimming surrounding whitespace.
    pub fn new(address: impl AsRef<str>) -> Self {
        Self(address.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

/// Actor role. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "TREASURY")]
    Initiator,
    #[serde(rename = "VERIFIER")]
    Approver,
    #[serde(rename = "VIEWER")]
    Observer,
}

impl Role {
    /// Wire name of the role.
    pub fn name(&self) -> &'static str {
        match self {
            Role::Initiator => "TREASURY",
            Role::Approver => "VERIFIER",
            Role::Observer => "VIEWER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps identities to roles from static deployment configuration.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    treasury: Identity,
    approvers: BTreeSet<Identity>,
}

impl RoleResolver {
    pub fn new(treasury: Identity, approvers: impl IntoIterator<Item = Identity>) -> Self {
        Self {
            treasury,
            approvers: approvers
                .into_iter()
                .filter(|approver| !approver.is_empty())
                .collect(),
        }
    }

    /// Resolve the role of `identity`. Total and side-effect free.
    pub fn resolve_role(&self, identity: &Identity) -> Role {
        if identity.is_empty() {
            return Role::Observer;
        }
        if !self.treasury.is_empty() && *identity == self.treasury {
            return Role::Initiator;
        }
        if self.approvers.contains(identity) {
            return Role::Approver;
        }
        Role::Observer
    }

    pub fn treasury(&self) -> &Identity {
        &self.treasury
    }

    pub fn approver_count(&self) -> usize {
        self.approvers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const TREASURY: &str = "rTreasuryAddress1111111111111";

    fn resolver() -> RoleResolver {
        RoleResolver::new(
            Identity::new(TREASURY),
            ["rVerifierA", "rVerifierB"].into_iter().map(Identity::new),
        )
    }

    #[test]
    fn test_treasury_is_initiator() {
        assert_eq!(
            resolver().resolve_role(&Identity::new(TREASURY)),
            Role::Initiator
        );
    }

    #[test]
    fn test_configured_approver() {
        let resolver = resolver();
        assert_eq!(
            resolver.resolve_role(&Identity::new("rVerifierA")),
            Role::Approver
        );
        assert_eq!(
            resolver.resolve_role(&Identity::new("rVerifierB")),
            Role::Approver
        );
    }

    #[test]
    fn test_whitespace_is_trimmed() {
        assert_eq!(
            resolver().resolve_role(&Identity::new("  rVerifierA\n")),
            Role::Approver
        );
    }

    #[test]
    fn test_empty_identity_is_observer() {
        assert_eq!(resolver().resolve_role(&Identity::new("")), Role::Observer);
    }

    #[test]
    fn test_empty_treasury_matches_nobody() {
        let resolver = RoleResolver::new(Identity::new(""), Vec::new());
        assert_eq!(resolver.resolve_role(&Identity::new("")), Role::Observer);
    }

    #[test]
    fn test_role_wire_names() {
        assert_eq!(
            serde_json::to_string(&Role::Initiator).unwrap(),
            "\"TREASURY\""
        );
        assert_eq!(Role::Approver.to_string(), "VERIFIER");
        assert_eq!(Role::Observer.name(), "VIEWER");
    }

    proptest! {
        #[test]
        fn prop_unconfigured_identities_are_observers(address in "[a-zA-Z0-9]{0,40}") {
            let identity = Identity::new(&address);
            prop_assume!(identity.as_str() != TREASURY);
            prop_assume!(identity.as_str() != "rVerifierA");
            prop_assume!(identity.as_str() != "rVerifierB");

            prop_assert_eq!(resolver().resolve_role(&identity), Role::Observer);
        }

        #[test]
        fn prop_resolution_is_deterministic(address in "r[a-zA-Z0-9]{24,34}") {
            let resolver = resolver();
            let identity = Identity::new(&address);
            prop_assert_eq!(resolver.resolve_role(&identity), resolver.resolve_role(&identity));
        }
    }
}
