use crate::{ResolverError, Result};
use oumodules_protocol::{CacheEntry, Code};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

const BUNDLED_SNAPSHOT: &str = include_str!("../data/cache.json");

/// Process-wide store of known codes, injected into the engine.
///
/// Writers may race; `merge` only ever enriches an entry, so a lost update
/// leaves equal or better data behind.
pub trait ModuleCache: Send + Sync {
    fn get(&self, code: &Code) -> Option<CacheEntry>;

    /// Store `entry` unless the cached one is at least as good. Returns
    /// whether the cache changed.
    fn merge(&self, code: &Code, entry: CacheEntry) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<Code, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The snapshot shipped with the crate.
    pub fn bundled() -> Result<Self> {
        Self::from_json_str(BUNDLED_SNAPSHOT)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
            .map_err(|err| ResolverError::InvalidCache(format!("{}: {err}", path.display())))
    }

    /// Parse a `{code: [title, url-or-null]}` document. Keys that are not
    /// valid codes are skipped.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let parsed: HashMap<String, CacheEntry> = serde_json::from_str(raw)?;
        let mut entries = HashMap::with_capacity(parsed.len());
        for (key, entry) in parsed {
            match Code::parse(&key) {
                Ok(code) => {
                    entries.insert(code, entry);
                }
                Err(err) => log::debug!("skipping cache key: {err}"),
            }
        }
        log::info!("loaded {} cached codes", entries.len());
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn from_entries(entries: impl IntoIterator<Item = (Code, CacheEntry)>) -> Self {
        Self {
            entries: RwLock::new(entries.into_iter().collect()),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<Code, CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .iter()
            .map(|(code, entry)| (code.clone(), entry.clone()))
            .collect()
    }

    /// One entry per line, sorted by code, so snapshots diff cleanly.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut lines = vec!["{".to_string()];
        let snapshot = self.snapshot();
        let last = snapshot.len().saturating_sub(1);
        for (idx, (code, entry)) in snapshot.iter().enumerate() {
            let key = serde_json::to_string(code.as_str())?;
            let value = serde_json::to_string(entry)?;
            let comma = if idx == last { "" } else { "," };
            lines.push(format!("  {key}: {value}{comma}"));
        }
        lines.push("}".to_string());
        Ok(lines.join("\n") + "\n")
    }
}

impl ModuleCache for MemoryCache {
    fn get(&self, code: &Code) -> Option<CacheEntry> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(code).cloned()
    }

    fn merge(&self, code: &Code, entry: CacheEntry) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        match entries.get(code) {
            Some(existing) if !entry.supersedes(existing) => false,
            _ => {
                entries.insert(code.clone(), entry);
                true
            }
        }
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
