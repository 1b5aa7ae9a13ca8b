use crate::{
    error::Result,
    nonce::Nonce,
    request::PendingRequest,
    store::RequestStore,
    util::Timestamp,
};
use chrono::Duration;
use std::collections::HashMap;
use std::sync::Mutex;

/// A store that lives in process memory. Fast, simple, and gone the moment
/// the process exits, so only use it if a restart wiping out every pending
/// confirmation is acceptable.
///
/// One lock guards the whole map. Entries are tiny and nothing under the lock
/// does IO, so holding it is never expensive.
#[derive(Debug, Default)]
pub struct MemoryStore {
    requests: Mutex<HashMap<Nonce, PendingRequest>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for MemoryStore {
    fn set(&self, nonce: &Nonce, request: PendingRequest) -> Result<()> {
        self.requests.lock()?.insert(*nonce, request);
        Ok(())
    }

    fn get(&self, nonce: &Nonce) -> Result<Option<PendingRequest>> {
        Ok(self.requests.lock()?.get(nonce).cloned())
    }

    fn delete(&self, nonce: &Nonce) -> Result<()> {
        self.requests.lock()?.remove(nonce);
        Ok(())
    }

    fn take(&self, nonce: &Nonce) -> Result<Option<PendingRequest>> {
        Ok(self.requests.lock()?.remove(nonce))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.requests.lock()?.len())
    }

    fn purge_expired(&self, ttl: &Duration, now: &Timestamp) -> Result<usize> {
        let mut requests = self.requests.lock()?;
        let before = requests.len();
        requests.retain(|_, req| !req.is_expired(ttl, now));
        Ok(before - requests.len())
    }
}
