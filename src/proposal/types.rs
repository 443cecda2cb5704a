//! Proposal data model.
//!
//! Wire names follow the treasury API: `offerSequence`, `signatures`
//! (`[{address, tx_blob}]`), `requiredSignatures`, and statuses
//! `PENDING | READY | RELEASED`.

use crate::error::{EscrowError, EscrowResult};
use crate::identity::Identity;
use crate::ledger::Drops;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use uuid::Uuid;

/// Proposal identifier.
pub type ProposalId = Uuid;

/// Parse a proposal id from a path segment. Unparseable ids are unknown ids.
pub fn parse_proposal_id(raw: &str) -> EscrowResult<ProposalId> {
    Uuid::parse_str(raw.trim()).map_err(|_| EscrowError::NotFound(raw.to_string()))
}

/// Lifecycle status. Moves strictly forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProposalStatus {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "READY")]
    QuorumReady,
    #[serde(rename = "RELEASED")]
    Released,
}

impl ProposalStatus {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::QuorumReady => "READY",
            Self::Released => "RELEASED",
        }
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One approver's partially signed release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    #[serde(rename = "address")]
    pub signer: Identity,
    #[serde(rename = "tx_blob")]
    pub payload: String,
}

/// A request to release escrowed funds to a destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub amount: Drops,
    pub destination: Identity,
    /// Sequence of the escrow lock-up. Never changes.
    #[serde(rename = "offerSequence")]
    pub sequence: u32,
    /// In arrival order, at most one per signer.
    #[serde(rename = "signatures")]
    pub authorizations: Vec<Authorization>,
    #[serde(rename = "requiredSignatures")]
    pub required_quorum: usize,
    pub status: ProposalStatus,
    #[serde(with = "timestamp")]
    pub created_at: SystemTime,
    #[serde(with = "optional_timestamp")]
    pub released_at: Option<SystemTime>,
}

impl Proposal {
    pub fn has_signed(&self, signer: &Identity) -> bool {
        self.authorizations.iter().any(|auth| auth.signer == *signer)
    }

    pub fn authorization_count(&self) -> usize {
        self.authorizations.len()
    }

    pub fn is_quorum_reached(&self) -> bool {
        self.authorizations.len() >= self.required_quorum
    }
}

/// RFC 3339 timestamps with millisecond precision.
mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&humantime::format_rfc3339_millis(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_rfc3339_weak(&raw).map_err(serde::de::Error::custom)
    }
}

mod optional_timestamp {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::SystemTime;

    pub fn serialize<S: Serializer>(
        time: &Option<SystemTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(time) => serializer.collect_str(&humantime::format_rfc3339_millis(*time)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<SystemTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| humantime::parse_rfc3339_weak(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}
