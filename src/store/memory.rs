//! In-memory storage backends.

use super::*;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Challenges keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct MemoryChallengeStore {
    records: Arc<RwLock<HashMap<Identity, ChallengeRecord>>>,
}

impl MemoryChallengeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChallengeStorage for MemoryChallengeStore {
    fn put(&self, record: ChallengeRecord) -> StoreResult<Option<ChallengeRecord>> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("challenge"))?;
        Ok(records.insert(record.identity.clone(), record))
    }

    fn take(&self, identity: &Identity) -> StoreResult<Option<ChallengeRecord>> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("challenge"))?;
        Ok(records.remove(identity))
    }

    fn purge_expired(&self, now: SystemTime) -> StoreResult<usize> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("challenge"))?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now));
        Ok(before - records.len())
    }

    fn len(&self) -> StoreResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("challenge"))?;
        Ok(records.len())
    }
}

/// Sessions keyed by token digest.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    records: Arc<RwLock<HashMap<TokenDigest, SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemorySessionStore {
    fn insert(&self, digest: TokenDigest, record: SessionRecord) -> StoreResult<()> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?;
        records.insert(digest, record);
        Ok(())
    }

    fn get(&self, digest: &TokenDigest) -> StoreResult<Option<SessionRecord>> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("session"))?;
        Ok(records.get(digest).cloned())
    }

    fn remove(&self, digest: &TokenDigest) -> StoreResult<Option<SessionRecord>> {
        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Poisoned("session"))?;
        Ok(records.remove(digest))
    }

    fn len(&self) -> StoreResult<usize> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Poisoned("session"))?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn challenge(identity: &str, payload: &str, ttl: Duration) -> ChallengeRecord {
        let now = SystemTime::now();
        ChallengeRecord {
            identity: Identity::new(identity),
            payload: payload.to_string(),
            issued_at: now,
            expires_at: now + ttl,
        }
    }

    #[test]
    fn test_put_replaces_prior_challenge() {
        let store = MemoryChallengeStore::new();
        let ttl = Duration::from_secs(60);

        assert!(store.put(challenge("rAlice", "first", ttl)).unwrap().is_none());
        let replaced = store.put(challenge("rAlice", "second", ttl)).unwrap();

        assert_eq!(replaced.unwrap().payload, "first");
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_take_removes() {
        let store = MemoryChallengeStore::new();
        store
            .put(challenge("rAlice", "p", Duration::from_secs(60)))
            .unwrap();

        let alice = Identity::new("rAlice");
        assert!(store.take(&alice).unwrap().is_some());
        assert!(store.take(&alice).unwrap().is_none());
    }

    #[test]
    fn test_purge_expired_keeps_live_records() {
        let store = MemoryChallengeStore::new();
        store
            .put(challenge("rLive", "p", Duration::from_secs(60)))
            .unwrap();
        store
            .put(challenge("rStale", "p", Duration::from_secs(1)))
            .unwrap();

        let later = SystemTime::now() + Duration::from_secs(10);
        assert_eq!(store.purge_expired(later).unwrap(), 1);
        assert!(store.take(&Identity::new("rLive")).unwrap().is_some());
    }

    #[test]
    fn test_sessions_by_digest_and_identity() {
        let store = MemorySessionStore::new();
        let record = |identity: &str| SessionRecord {
            identity: Identity::new(identity),
            role: Role::Approver,
            created_at: SystemTime::now(),
        };

        store.insert([1; 32], record("rAlice")).unwrap();
        store.insert([2; 32], record("rAlice")).unwrap();
        store.insert([3; 32], record("rBob")).unwrap();

        assert_eq!(
            store.get(&[3; 32]).unwrap().unwrap().identity,
            Identity::new("rBob")
        );
        assert_eq!(store.len().unwrap(), 3);
        assert!(store.remove(&[3; 32]).unwrap().is_some());
        assert!(store.get(&[3; 32]).unwrap().is_none());
    }
}
