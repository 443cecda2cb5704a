//! Storage traits for authentication state.
//!
//! Challenges and sessions live behind [`ChallengeStorage`] and
//! [`SessionStorage`] so the authenticator and session store do not care
//! where records are kept. The only shipped backend is in-memory
//! ([`memory`]); state starts empty on every process start.

pub mod memory;

use crate::identity::{Identity, Role};
use std::time::SystemTime;

pub use memory::{MemoryChallengeStore, MemorySessionStore};

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} store lock poisoned")]
    Poisoned(&'static str),
}

/// An outstanding login challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRecord {
    pub identity: Identity,
    pub payload: String,
    pub issued_at: SystemTime,
    pub expires_at: SystemTime,
}

impl ChallengeRecord {
    pub fn is_expired(&self, now: SystemTime) -> bool {
        now > self.expires_at
    }
}

/// SHA-256 of a bearer token. Sessions are keyed by digest, never by the
/// raw token.
pub type TokenDigest = [u8; 32];

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub identity: Identity,
    pub role: Role,
    pub created_at: SystemTime,
}

/// Challenge storage. At most one record per identity.
pub trait ChallengeStorage: Send + Sync {
    /// Store `record`, returning the record it replaced.
    fn put(&self, record: ChallengeRecord) -> StoreResult<Option<ChallengeRecord>>;

    /// Remove and return the record for `identity`.
    fn take(&self, identity: &Identity) -> StoreResult<Option<ChallengeRecord>>;

    /// Drop every record expired at `now`. Returns how many were dropped.
    fn purge_expired(&self, now: SystemTime) -> StoreResult<usize>;

    fn len(&self) -> StoreResult<usize>;
}

/// Session storage keyed by token digest.
pub trait SessionStorage: Send + Sync {
    fn insert(&self, digest: TokenDigest, record: SessionRecord) -> StoreResult<()>;

    fn get(&self, digest: &TokenDigest) -> StoreResult<Option<SessionRecord>>;

    fn remove(&self, digest: &TokenDigest) -> StoreResult<Option<SessionRecord>>;

    fn len(&self) -> StoreResult<usize>;
}
