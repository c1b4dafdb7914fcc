//! Durable credential storage: two opaque string slots under a directory,
//! one file per slot (`access_token`, `refresh_token`), mirrored by an
//! in-memory cache. Every mutation writes the files first and only then
//! updates the cache, so disk and memory never diverge for longer than one
//! operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{ClientError, ClientResult};
use crate::models::TokenPair;
use crate::tprintln;

const ACCESS_SLOT: &str = "access_token";
const REFRESH_SLOT: &str = "refresh_token";

#[derive(Clone)]
pub struct CredentialStore {
    dir: PathBuf,
    cached: Arc<RwLock<Option<TokenPair>>>,
}

impl CredentialStore {
    /// Open (creating the directory if needed) and read both slots once.
    /// The pair is cached only when both slots are present and non-empty.
    pub fn open(dir: impl AsRef<Path>) -> ClientResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ClientError::io(format!("credential dir {:?}: {}", dir, e)))?;
        let store = Self { dir, cached: Arc::new(RwLock::new(None)) };
        let pair = store.read_disk();
        *store.cached.write() = pair;
        Ok(store)
    }

    fn slot_path(&self, slot: &str) -> PathBuf { self.dir.join(slot) }

    fn read_slot(&self, slot: &str) -> Option<String> {
        match std::fs::read_to_string(self.slot_path(slot)) {
            Ok(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        }
    }

    fn read_disk(&self) -> Option<TokenPair> {
        let access = self.read_slot(ACCESS_SLOT)?;
        let refresh = self.read_slot(REFRESH_SLOT)?;
        Some(TokenPair { access, refresh })
    }

    /// Replace both slots. Disk first, cache second.
    pub fn store(&self, pair: &TokenPair) -> ClientResult<()> {
        for (slot, value) in [(ACCESS_SLOT, &pair.access), (REFRESH_SLOT, &pair.refresh)] {
            std::fs::write(self.slot_path(slot), value)
                .map_err(|e| ClientError::io(format!("write {}: {}", slot, e)))?;
        }
        *self.cached.write() = Some(pair.clone());
        tprintln!("credentials.store dir={:?}", self.dir);
        Ok(())
    }

    /// Remove both slots. Idempotent: missing files are fine.
    pub fn clear(&self) {
        for slot in [ACCESS_SLOT, REFRESH_SLOT] {
            let _ = std::fs::remove_file(self.slot_path(slot));
        }
        *self.cached.write() = None;
        tprintln!("credentials.clear dir={:?}", self.dir);
    }

    /// Cached pair, if any.
    pub fn pair(&self) -> Option<TokenPair> { self.cached.read().clone() }

    /// The persisted refresh token. Reads through to disk so a refresh sees
    /// the latest slot even if another context rotated it.
    pub fn refresh_token(&self) -> Option<String> { self.read_slot(REFRESH_SLOT) }

    /// True when neither slot holds a value (cache and disk agree after any
    /// completed operation).
    pub fn is_empty(&self) -> bool {
        self.cached.read().is_none() && self.read_disk().is_none()
    }
}
