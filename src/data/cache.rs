use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::error::LoadError;
use super::loader::load_file;
use super::model::Table;
use super::schema::LoadOptions;

/// Identity of a loaded source: the canonical path plus how it was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SourceKey {
    path: PathBuf,
    options: LoadOptions,
}

/// Get-or-load cache of immutable tables.
///
/// The lock is held across a load, so each source is read at most once
/// even when several callers ask for it at the same time. Failed loads
/// are not remembered.
#[derive(Debug, Default)]
pub struct TableCache {
    entries: Mutex<HashMap<SourceKey, Arc<Table>>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&self, path: &Path, options: &LoadOptions) -> Result<Arc<Table>, LoadError> {
        let canonical = path.canonicalize().map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let key = SourceKey {
            path: canonical,
            options: *options,
        };

        let mut entries = self.lock();
        if let Some(table) = entries.get(&key) {
            log::debug!("cache hit for {}", key.path.display());
            return Ok(Arc::clone(table));
        }

        log::debug!("cache miss for {}, loading", key.path.display());
        let table = Arc::new(load_file(&key.path, options)?);
        entries.insert(key, Arc::clone(&table));
        Ok(table)
    }

    /// Number of cached sources.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic mid-load never leaves a half-inserted entry, so a poisoned
    // map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<SourceKey, Arc<Table>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
