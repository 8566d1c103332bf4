//! Response cache: normalized keys, TTL, and a durable store of one
//! JSON record per key.
//!
//! The cache has two layers. The in-memory index is the fast path; the
//! durable directory (one file per cache key) is the source of truth.
//! On startup the index is rehydrated from the most recently modified
//! durable records up to the memory capacity. Entries past the TTL are
//! never served — they are deleted wherever they are found.
//!
//! All durable I/O is best-effort: a failed read is a miss, a failed
//! write loses nothing but that record, and a malformed file is deleted
//! on sight. No cache error ever reaches the pipeline.
//!
//! # Key normalization
//!
//! Keys are the Sha256 of a normalized query: lowercased, whitespace
//! collapsed, the fixed punctuation set `.,!?;:` stripped, and a fixed
//! table of area-name spelling aliases applied in declaration order as
//! a single pass of substring replacements. The table intentionally
//! contains no-op and overlapping entries; cached-key stability depends
//! on replaying it literally, so do not "clean it up".

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::config::CacheConfig;
use crate::failure::FailureKind;

/// Area-name spelling aliases applied during normalization, in order.
const AREA_ALIASES: &[(&str, &str)] = &[
    ("t nagar", "t. nagar"),
    ("tnagar", "t. nagar"),
    ("anna nagar", "anna nagar"),
    ("annanagar", "anna nagar"),
    ("adyar", "adyar"),
    ("velachery", "velachery"),
];

/// Punctuation stripped during normalization.
const STRIP_CHARS: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Most durable records loaded back into memory at startup.
const REHYDRATE_LIMIT: usize = 100;

/// One cached response. The durable form of this struct is the on-disk
/// record contract: `query, response, department, sources,
/// timestamp (ISO-8601), cache_key`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cache_key: String,
    pub query: String,
    pub response: String,
    pub department: String,
    #[serde(default)]
    pub sources: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// Cache performance counters.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate_percent: f64,
    pub memory_size: usize,
    pub durable_count: usize,
}

/// TTL response cache with a durable JSON-file-per-key store.
pub struct ResponseCache {
    dir: PathBuf,
    ttl: Duration,
    memory_capacity: usize,
    durable_capacity: usize,
    /// Key → (insertion sequence, entry). The sequence preserves
    /// insertion order for the eviction tie-break.
    memory: HashMap<String, (u64, CacheEntry)>,
    seq: u64,
    hits: u64,
    misses: u64,
    total_requests: u64,
}

impl ResponseCache {
    /// Open the cache: create the durable directory if needed and
    /// rehydrate the memory index from recent records.
    pub fn open(config: &CacheConfig) -> Self {
        if let Err(e) = std::fs::create_dir_all(&config.dir) {
            eprintln!(
                "Warning: could not create cache dir {}: {}",
                config.dir.display(),
                e
            );
        }

        let mut cache = Self {
            dir: config.dir.clone(),
            ttl: Duration::hours(config.ttl_hours),
            memory_capacity: config.memory_capacity,
            durable_capacity: config.durable_capacity,
            memory: HashMap::new(),
            seq: 0,
            hits: 0,
            misses: 0,
            total_requests: 0,
        };
        cache.rehydrate();
        cache
    }

    /// Normalize a query for key derivation.
    ///
    /// Lowercase, collapse whitespace runs, strip `.,!?;:`, then apply
    /// [`AREA_ALIASES`] in order — a single pass of substring
    /// replacements, not recursive normalization.
    pub fn normalize(query: &str) -> String {
        let lowered = query.to_lowercase();
        let collapsed = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
        let mut normalized: String = collapsed.chars().filter(|c| !STRIP_CHARS.contains(c)).collect();

        for (variant, standard) in AREA_ALIASES {
            normalized = normalized.replace(variant, standard);
        }

        normalized
    }

    /// Deterministic key for a query: `civic_query_` + Sha256 hex of
    /// the normalized text.
    pub fn cache_key(query: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(Self::normalize(query).as_bytes());
        format!("civic_query_{:x}", hasher.finalize())
    }

    /// Look up a cached response. Expired entries are deleted from both
    /// layers and reported as absent; a valid durable entry is promoted
    /// into the memory index.
    pub fn lookup(&mut self, query: &str) -> Option<CacheEntry> {
        self.total_requests += 1;
        let key = Self::cache_key(query);

        if let Some(entry) = self.memory.get(&key).map(|(_, e)| e.clone()) {
            if self.is_valid(&entry) {
                self.hits += 1;
                return Some(entry);
            }
            self.memory.remove(&key);
            self.remove_durable(&key);
        }

        if let Some(entry) = self.read_durable(&key) {
            if self.is_valid(&entry) {
                self.hits += 1;
                self.insert_memory(entry.clone());
                return Some(entry);
            }
            self.remove_durable(&key);
        }

        self.misses += 1;
        None
    }

    /// Store a response, overwriting any prior entry for the same key.
    /// The durable write is best-effort and atomic (temp file +
    /// rename), so a concurrent reader never sees a partial record.
    pub fn store(&mut self, query: &str, response: &str, department: &str, sources: &[String]) {
        let entry = CacheEntry {
            cache_key: Self::cache_key(query),
            query: query.to_string(),
            response: response.to_string(),
            department: department.to_string(),
            sources: sources.to_vec(),
            timestamp: Utc::now(),
        };

        self.write_durable(&entry);
        self.insert_memory(entry);

        if self.memory.len() > self.memory_capacity {
            self.evict_memory();
        }
    }

    /// Run both eviction passes: trim the memory index to capacity and
    /// delete the oldest durable records beyond the durable bound.
    /// Idempotent; safe to call at any time.
    pub fn evict(&mut self) {
        self.evict_memory();
        self.evict_durable();
    }

    /// Clear cached entries. With `older_than_hours` only entries
    /// created before the cutoff are removed; without it, everything.
    /// Returns the number of records removed from the durable store.
    pub fn clear(&mut self, older_than_hours: Option<i64>) -> usize {
        match older_than_hours {
            None => {
                self.memory.clear();
                let mut removed = 0;
                for (path, _) in self.durable_files() {
                    if std::fs::remove_file(&path).is_ok() {
                        removed += 1;
                    }
                }
                removed
            }
            Some(hours) => {
                let cutoff = Utc::now() - Duration::hours(hours);
                self.memory.retain(|_, (_, e)| e.timestamp >= cutoff);

                let mut removed = 0;
                for (path, modified) in self.durable_files() {
                    let mtime: DateTime<Utc> = modified.into();
                    if mtime < cutoff && std::fs::remove_file(&path).is_ok() {
                        removed += 1;
                    }
                }
                removed
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        let hit_rate_percent = if self.total_requests > 0 {
            self.hits as f64 / self.total_requests as f64 * 100.0
        } else {
            0.0
        };
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            total_requests: self.total_requests,
            hit_rate_percent,
            memory_size: self.memory.len(),
            durable_count: self.durable_files().len(),
        }
    }

    fn is_valid(&self, entry: &CacheEntry) -> bool {
        Utc::now() < entry.timestamp + self.ttl
    }

    fn insert_memory(&mut self, entry: CacheEntry) {
        self.seq += 1;
        self.memory.insert(entry.cache_key.clone(), (self.seq, entry));
    }

    /// Keep the `memory_capacity` most-recently-created entries.
    /// Equal timestamps keep their insertion order (stable sort over
    /// the sequence numbers).
    fn evict_memory(&mut self) {
        if self.memory.len() <= self.memory_capacity {
            return;
        }
        let mut entries: Vec<(u64, CacheEntry)> = self.memory.drain().map(|(_, v)| v).collect();
        entries.sort_by_key(|(seq, _)| *seq);
        entries.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp));
        entries.truncate(self.memory_capacity);
        for (seq, entry) in entries {
            self.memory.insert(entry.cache_key.clone(), (seq, entry));
        }
    }

    /// Delete oldest-by-modification-time durable records down to the
    /// durable bound.
    fn evict_durable(&mut self) {
        let mut files = self.durable_files();
        if files.len() <= self.durable_capacity {
            return;
        }
        files.sort_by_key(|(_, modified)| *modified);
        let excess = files.len() - self.durable_capacity;
        for (path, _) in files.into_iter().take(excess) {
            if let Err(e) = std::fs::remove_file(&path) {
                eprintln!("Warning: could not evict cache file {}: {}", path.display(), e);
            }
        }
    }

    /// Load the most recently modified valid records into memory, up to
    /// the rehydration limit. Expired and malformed files are deleted.
    fn rehydrate(&mut self) {
        let mut files = self.durable_files();
        files.sort_by(|a, b| b.1.cmp(&a.1));

        let limit = REHYDRATE_LIMIT.min(self.memory_capacity);
        for (path, _) in files.into_iter().take(limit) {
            if let Some(entry) = read_entry_file(&path) {
                if self.is_valid(&entry) {
                    self.insert_memory(entry);
                } else if let Err(e) = std::fs::remove_file(&path) {
                    eprintln!(
                        "Warning: could not remove expired cache file {}: {}",
                        path.display(),
                        e
                    );
                }
            }
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    fn read_durable(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key);
        if !path.exists() {
            return None;
        }
        read_entry_file(&path)
    }

    fn write_durable(&self, entry: &CacheEntry) {
        let path = self.entry_path(&entry.cache_key);
        let tmp = path.with_extension("json.tmp");

        let json = match serde_json::to_string_pretty(entry) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Warning: could not serialize cache entry: {}", e);
                return;
            }
        };

        if let Err(e) = std::fs::write(&tmp, json).and_then(|_| std::fs::rename(&tmp, &path)) {
            let failure = FailureKind::CacheIo(format!("persist {}: {}", path.display(), e));
            eprintln!("Warning: {}", failure);
            let _ = std::fs::remove_file(&tmp);
        }
    }

    fn remove_durable(&self, key: &str) {
        let path = self.entry_path(key);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                eprintln!("Warning: could not remove cache file {}: {}", path.display(), e);
            }
        }
    }

    /// All durable record files with their modification times. Read
    /// errors are skipped — a vanished file is simply not a record.
    fn durable_files(&self) -> Vec<(PathBuf, std::time::SystemTime)> {
        let mut files = Vec::new();
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                eprintln!("Warning: could not read cache dir {}: {}", self.dir.display(), e);
                return files;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                files.push((path, modified));
            }
        }
        files
    }
}

/// Read one durable record. A file that cannot be parsed is deleted —
/// hand-edited or truncated records must not wedge the key forever.
fn read_entry_file(path: &Path) -> Option<CacheEntry> {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                eprintln!("Warning: malformed cache file {}: {}", path.display(), e);
                let _ = std::fs::remove_file(path);
                None
            }
        },
        Err(e) => {
            let failure = FailureKind::CacheIo(format!("read {}: {}", path.display(), e));
            eprintln!("Warning: {}", failure);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(
            ResponseCache::normalize("  Water   SUPPLY\tissue  "),
            "water supply issue"
        );
    }

    #[test]
    fn normalize_strips_punctuation_set() {
        assert_eq!(
            ResponseCache::normalize("No water?! Please, help; now: ok."),
            "no water please help now ok"
        );
    }

    #[test]
    fn normalize_applies_alias_table() {
        assert_eq!(ResponseCache::normalize("tnagar garbage"), "t. nagar garbage");
        assert_eq!(
            ResponseCache::normalize("issue in T. Nagar"),
            "issue in t. nagar"
        );
        assert_eq!(
            ResponseCache::normalize("annanagar power cut"),
            "anna nagar power cut"
        );
    }

    #[test]
    fn normalize_is_idempotent() {
        let inputs = [
            "Water supply issue in Adyar",
            "tnagar!! garbage",
            "  MIXED   Case,  Query?  ",
            "annanagar and t nagar both",
            "",
        ];
        for input in inputs {
            let once = ResponseCache::normalize(input);
            assert_eq!(ResponseCache::normalize(&once), once);
        }
    }

    #[test]
    fn key_is_stable_across_spelling_variants() {
        assert_eq!(
            ResponseCache::cache_key("Garbage in T. Nagar"),
            ResponseCache::cache_key("garbage in tnagar")
        );
        assert_ne!(
            ResponseCache::cache_key("garbage in adyar"),
            ResponseCache::cache_key("garbage in velachery")
        );
    }

    #[test]
    fn key_has_expected_shape() {
        let key = ResponseCache::cache_key("water in adyar");
        assert!(key.starts_with("civic_query_"));
        assert_eq!(key.len(), "civic_query_".len() + 64);
    }
}
