//! Bearer-token sessions.
//!
//! Tokens are 32 CSPRNG bytes, hex-encoded. Only the SHA-256 digest of a
//! token is stored. Sessions live until revoked, or until `session_ttl`
//! elapses when one is configured.

use super::{Clock, SystemClock};
use crate::error::{EscrowError, EscrowResult};
use crate::identity::{Identity, Role};
use crate::store::{MemorySessionStore, SessionRecord, SessionStorage, TokenDigest};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

const TOKEN_BYTES: usize = 32;

/// Who a token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub identity: Identity,
    pub role: Role,
}

pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    clock: Arc<dyn Clock>,
    ttl: Option<Duration>,
    rng: SystemRandom,
}

fn digest(token: &str) -> TokenDigest {
    let mut out = [0u8; 32];
    out.copy_from_slice(&Sha256::digest(token.as_bytes()));
    out
}

impl SessionStore {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self::with_parts(
            Arc::new(MemorySessionStore::new()),
            Arc::new(SystemClock),
            ttl,
        )
    }

    pub fn with_parts(
        storage: Arc<dyn SessionStorage>,
        clock: Arc<dyn Clock>,
        ttl: Option<Duration>,
    ) -> Self {
        Self {
            storage,
            clock,
            ttl,
            rng: SystemRandom::new(),
        }
    }

    /// Mint a token for `identity` acting as `role`.
    pub fn mint(&self, identity: &Identity, role: Role) -> EscrowResult<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| EscrowError::RandomnessUnavailable)?;
        let token = hex::encode(bytes);

        self.storage.insert(
            digest(&token),
            SessionRecord {
                identity: identity.clone(),
                role,
                created_at: self.clock.now(),
            },
        )?;

        Ok(token)
    }

    /// Look up the principal behind `token`.
    pub fn resolve(&self, token: &str) -> EscrowResult<Principal> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EscrowError::Unauthorized);
        }

        let key = digest(token);
        let record = self
            .storage
            .get(&key)?
            .ok_or(EscrowError::Unauthorized)?;

        if let Some(ttl) = self.ttl {
            let age = self
                .clock
                .now()
                .duration_since(record.created_at)
                .unwrap_or_default();
            if age > ttl {
                self.storage.remove(&key)?;
                return Err(EscrowError::Unauthorized);
            }
        }

        Ok(Principal {
            identity: record.identity,
            role: record.role,
        })
    }

    /// Revoke one token. Returns whether it existed.
    pub fn revoke(&self, token: &str) -> EscrowResult<bool> {
        Ok(self.storage.remove(&digest(token.trim()))?.is_some())
    }

    pub fn len(&self) -> EscrowResult<usize> {
        Ok(self.storage.len()?)
    }

    pub fn is_empty(&self) -> EscrowResult<bool> {
        Ok(self.len()? == 0)
    }
}
