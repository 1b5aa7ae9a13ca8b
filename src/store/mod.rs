//! The request store is the only state shared between issuing a nonce and
//! resolving it. Intake writes a [PendingRequest] under a fresh nonce, the
//! confirmation side comes along later (possibly in a different process,
//! possibly after a restart) and takes it back out.
//!
//! There are three backends, all behind the same [RequestStore] trait:
//!
//! - [DisabledStore] turns confirmations off entirely. Writes vanish, reads
//!   come back empty.
//! - [MemoryStore] keeps everything in a locked map for the life of the
//!   process.
//! - [FileStore] keeps one file per request in a directory, written
//!   atomically, so requests survive a restart.
//!
//! Which one you get is a [config](crate::config::StoreConfig) decision made
//! via [open()]; nothing else in the crate cares.

use crate::{
    config::{StoreBackend, StoreConfig},
    error::{Error, Result},
    nonce::Nonce,
    request::PendingRequest,
    util::Timestamp,
};
use chrono::Duration;

mod disabled;
mod file;
mod memory;

pub use disabled::DisabledStore;
pub use file::FileStore;
pub use memory::MemoryStore;

/// Key-value persistence mapping a nonce to the request it was issued for.
///
/// Absence is never an error: `get` and `take` return `Ok(None)` for a nonce
/// that was never set, already taken, or deleted. Errors are reserved for the
/// backend itself falling over.
///
/// All operations on a single nonce are atomic with respect to each other.
pub trait RequestStore: Send + Sync {
    /// Store a request under a nonce. A later `set` with the same nonce wins.
    fn set(&self, nonce: &Nonce, request: PendingRequest) -> Result<()>;

    /// Look up the request for a nonce.
    fn get(&self, nonce: &Nonce) -> Result<Option<PendingRequest>>;

    /// Remove the request for a nonce. Removing something that isn't there is
    /// fine.
    fn delete(&self, nonce: &Nonce) -> Result<()>;

    /// Look up and remove the request for a nonce in one step, such that two
    /// callers racing on the same nonce can't both walk away with it.
    fn take(&self, nonce: &Nonce) -> Result<Option<PendingRequest>>;

    /// How many requests are currently pending.
    fn len(&self) -> Result<usize>;

    /// Whether the store is empty.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Drop every request older than `ttl` as of `now`, returning how many
    /// went away.
    fn purge_expired(&self, ttl: &Duration, now: &Timestamp) -> Result<usize>;
}

/// Build the store the config asks for.
pub fn open(config: &StoreConfig) -> Result<Box<dyn RequestStore>> {
    let store: Box<dyn RequestStore> = match config.backend() {
        StoreBackend::Disabled => Box::new(DisabledStore::new()),
        StoreBackend::Memory => Box::new(MemoryStore::new()),
        StoreBackend::File => {
            let path = config.path().as_ref()
                .ok_or_else(|| Error::ConfigInvalid(String::from("file store requires a path")))?;
            Box::new(FileStore::open(path)?)
        }
    };
    tracing::info!(backend = ?config.backend(), "request store opened");
    Ok(store)
}
