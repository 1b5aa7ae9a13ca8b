use crate::{
    error::{Error, Result},
    nonce::Nonce,
    request::PendingRequest,
    store::RequestStore,
    util::{ser, Timestamp},
};
use chrono::Duration;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Every pending request lives in a file named `<nonce hex><ENTRY_SUFFIX>`.
const ENTRY_SUFFIX: &str = ".pending.yaml";

/// Half-written entries are staged under this prefix before being renamed
/// into place.
const TEMP_PREFIX: &str = ".incoming-";

/// How many write locks nonces get spread across.
const WRITE_STRIPES: usize = 16;

/// What actually gets written to disk. The nonce goes in the body as well as
/// the filename so an entry that was renamed or copied by hand doesn't quietly
/// answer for the wrong nonce.
#[derive(Debug, Serialize, Deserialize)]
struct Entry {
    nonce: Nonce,
    request: PendingRequest,
}

/// A store that keeps one YAML file per pending request in a directory, so
/// requests survive restarts.
///
/// Writes go to a temp file in the same directory, get synced, then get
/// renamed over the real entry. A crash mid-write leaves either the old entry
/// or the new one, never half of one. An in-memory index (loaded on
/// [open][FileStore::open]) answers reads.
///
/// Mutations on a nonce hold that nonce's write stripe across the file work,
/// so they can't interleave with each other. The index lock is only ever held
/// for the map update itself, so a slow disk sync for one request doesn't
/// stall reads or writes for the others. Lock order is stripe, then index.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    index: Mutex<HashMap<Nonce, PendingRequest>>,
    stripes: Vec<Mutex<()>>,
}

impl FileStore {
    /// Open (creating if needed) a store rooted at `dir` and load whatever
    /// entries are already in it.
    ///
    /// Entries that can't be parsed, or whose contents don't match their
    /// filename, are skipped with a warning rather than failing the whole
    /// store. Leftover temp files from an interrupted write are removed.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        for stale in Self::list(&dir, &format!("{}*", TEMP_PREFIX))? {
            tracing::warn!(path = %stale.display(), "removing interrupted write");
            remove_if_exists(&stale)?;
        }

        let mut index = HashMap::new();
        for path in Self::list(&dir, &format!("*{}", ENTRY_SUFFIX))? {
            match Self::load_entry(&path) {
                Ok((nonce, request)) => {
                    index.insert(nonce, request);
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "skipping unreadable request entry");
                }
            }
        }
        tracing::debug!(dir = %dir.display(), entries = index.len(), "file store loaded");
        Ok(Self {
            dir,
            index: Mutex::new(index),
            stripes: (0..WRITE_STRIPES).map(|_| Mutex::new(())).collect(),
        })
    }

    /// The directory this store lives in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn list(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
        let dir_str = dir.to_str()
            .ok_or_else(|| Error::ConfigInvalid(format!("store path is not valid UTF-8: {}", dir.display())))?;
        let full = format!("{}/{}", glob::Pattern::escape(dir_str), pattern);
        let paths = glob::glob(&full)
            .map_err(|e| Error::ConfigInvalid(format!("bad store path: {}", e)))?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!(error = %err, "cannot read store directory entry");
                    None
                }
            })
            .collect();
        Ok(paths)
    }

    fn load_entry(path: &Path) -> Result<(Nonce, PendingRequest)> {
        let name = path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(ENTRY_SUFFIX))
            .ok_or_else(|| Error::StoreCorrupt(format!("unexpected entry name: {}", path.display())))?;
        let nonce = Nonce::decode(name)
            .map_err(|_| Error::StoreCorrupt(format!("entry name is not a nonce: {}", path.display())))?;
        let bytes = fs::read(path)?;
        let entry: Entry = ser::deserialize_human(&bytes)
            .map_err(|e| Error::StoreCorrupt(format!("{}: {}", path.display(), e)))?;
        if entry.nonce != nonce {
            Err(Error::StoreCorrupt(format!("entry does not match its name: {}", path.display())))?;
        }
        Ok((nonce, entry.request))
    }

    fn stripe(&self, nonce: &Nonce) -> &Mutex<()> {
        &self.stripes[usize::from(nonce.as_bytes()[0]) % self.stripes.len()]
    }

    fn entry_path(&self, nonce: &Nonce) -> PathBuf {
        self.dir.join(format!("{}{}", nonce.encode(), ENTRY_SUFFIX))
    }

    fn write_entry(&self, nonce: &Nonce, request: &PendingRequest) -> Result<()> {
        let entry = Entry {
            nonce: *nonce,
            request: request.clone(),
        };
        let serialized = ser::serialize_human(&entry)?;
        let mut tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.dir)?;
        tmp.write_all(serialized.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.entry_path(nonce))
            .map_err(|e| e.error)?;
        self.sync_dir()
    }

    #[cfg(unix)]
    fn sync_dir(&self) -> Result<()> {
        fs::File::open(&self.dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_dir(&self) -> Result<()> {
        Ok(())
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e)?,
    }
}

impl RequestStore for FileStore {
    fn set(&self, nonce: &Nonce, request: PendingRequest) -> Result<()> {
        let _write = self.stripe(nonce).lock()?;
        self.write_entry(nonce, &request)?;
        self.index.lock()?.insert(*nonce, request);
        Ok(())
    }

    fn get(&self, nonce: &Nonce) -> Result<Option<PendingRequest>> {
        Ok(self.index.lock()?.get(nonce).cloned())
    }

    fn delete(&self, nonce: &Nonce) -> Result<()> {
        let _write = self.stripe(nonce).lock()?;
        remove_if_exists(&self.entry_path(nonce))?;
        self.index.lock()?.remove(nonce);
        Ok(())
    }

    fn take(&self, nonce: &Nonce) -> Result<Option<PendingRequest>> {
        let _write = self.stripe(nonce).lock()?;
        if !self.index.lock()?.contains_key(nonce) {
            return Ok(None);
        }
        // file goes first: if removing it fails, the request stays put
        remove_if_exists(&self.entry_path(nonce))?;
        Ok(self.index.lock()?.remove(nonce))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.index.lock()?.len())
    }

    fn purge_expired(&self, ttl: &Duration, now: &Timestamp) -> Result<usize> {
        let candidates = self.index.lock()?
            .iter()
            .filter(|(_, req)| req.is_expired(ttl, now))
            .map(|(nonce, _)| *nonce)
            .collect::<Vec<_>>();
        let mut purged = 0;
        for nonce in &candidates {
            let _write = self.stripe(nonce).lock()?;
            // might have been taken or replaced since we looked
            let still_expired = self.index.lock()?
                .get(nonce)
                .map(|req| req.is_expired(ttl, now))
                .unwrap_or(false);
            if !still_expired {
                continue;
            }
            remove_if_exists(&self.entry_path(nonce))?;
            self.index.lock()?.remove(nonce);
            purged += 1;
        }
        Ok(purged)
    }
}
