use crate::{
    error::Result,
    nonce::Nonce,
    request::PendingRequest,
    store::RequestStore,
    util::Timestamp,
};
use chrono::Duration;

/// A store that stores nothing. Use this to switch confirmations off while
/// keeping intake running: writes are accepted and dropped on the floor, and
/// every lookup comes back empty, so every confirmation is a "not found."
#[derive(Debug, Default, Clone)]
pub struct DisabledStore;

impl DisabledStore {
    pub fn new() -> Self {
        Self
    }
}

impl RequestStore for DisabledStore {
    fn set(&self, nonce: &Nonce, _request: PendingRequest) -> Result<()> {
        tracing::debug!(nonce = %nonce.log_id(), "request store disabled, dropping request");
        Ok(())
    }

    fn get(&self, _nonce: &Nonce) -> Result<Option<PendingRequest>> {
        Ok(None)
    }

    fn delete(&self, _nonce: &Nonce) -> Result<()> {
        Ok(())
    }

    fn take(&self, _nonce: &Nonce) -> Result<Option<PendingRequest>> {
        Ok(None)
    }

    fn len(&self) -> Result<usize> {
        Ok(0)
    }

    fn purge_expired(&self, _ttl: &Duration, _now: &Timestamp) -> Result<usize> {
        Ok(0)
    }
}
