//! Page-scoped candidate cache with a flat legacy store behind it.
//!
//! Records live in one [`PageCache`] per site pattern and are reachable
//! through several alias keys (normalised description, raw description,
//! significant terms). The flat store holds records loaded from older
//! documents keyed by an opaque hash; it is consulted last and written back
//! unchanged.

use super::entry::CacheEntry;
use super::keys::{
    alias_keys, filename_to_pattern, legacy_key, normalize_description, pattern_to_filename,
    site_pattern,
};
use super::learning::LearningLedger;
use crate::config::CacheConfig;
use crate::storage::{
    StorageError, document_stem, json_documents, now_secs, read_document, write_document,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the flat store document.
pub const LEGACY_DOCUMENT: &str = "element_cache.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub records: usize,
    pub expired: usize,
    pub average_score: f64,
    pub total_accesses: u64,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

#[derive(Debug, Clone)]
struct Record {
    entry: CacheEntry,
    primary_key: String,
}

/// Records for one site pattern plus the alias keys pointing at them.
#[derive(Debug, Default)]
struct PageCache {
    records: BTreeMap<u64, Record>,
    keys: BTreeMap<String, u64>,
}

impl PageCache {
    /// Drop records no key points to any more.
    fn prune(&mut self) {
        let live: HashSet<u64> = self.keys.values().copied().collect();
        self.records.retain(|id, _| live.contains(id));
    }

    fn remove_record(&mut self, id: u64) {
        self.records.remove(&id);
        self.keys.retain(|_, v| *v != id);
    }

    fn repoint(&mut self, from: u64, to: u64) {
        for v in self.keys.values_mut() {
            if *v == from {
                *v = to;
            }
        }
        self.records.remove(&from);
    }

    /// One document key per record, records sharing a selector collapsed to
    /// the newest.
    fn persisted(&self) -> BTreeMap<String, CacheEntry> {
        let mut by_selector: HashMap<&str, (u64, &Record)> = HashMap::new();
        for (id, record) in &self.records {
            let keep = match by_selector.get(record.entry.selector.as_str()) {
                Some((_, existing)) => record.entry.created_at >= existing.entry.created_at,
                None => true,
            };
            if keep {
                by_selector.insert(record.entry.selector.as_str(), (*id, record));
            }
        }

        let mut document = BTreeMap::new();
        for (id, record) in by_selector.into_values() {
            let key = if self.keys.get(&record.primary_key) == Some(&id) {
                record.primary_key.clone()
            } else {
                match self.keys.iter().find(|(_, v)| **v == id) {
                    Some((k, _)) => k.clone(),
                    None => continue,
                }
            };
            document.insert(key, record.entry.clone());
        }
        document
    }
}

#[derive(Debug, Clone)]
enum Location {
    Page(String, u64),
    Legacy(String),
}

pub struct CandidateCache {
    dir: PathBuf,
    ttl_secs: u64,
    max_entries: usize,
    fuzzy_threshold: f64,
    save_every: u64,
    immediate_save_score: f64,
    pages: BTreeMap<String, PageCache>,
    legacy: BTreeMap<String, CacheEntry>,
    next_id: u64,
    writes: u64,
    hits: u64,
    misses: u64,
    learning: LearningLedger,
    /// Documents read by `load`
    loaded: BTreeSet<PathBuf>,
}

impl CandidateCache {
    /// Empty cache persisting under `config.dir`. Nothing is read from disk.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            ttl_secs: config.ttl_secs,
            max_entries: config.max_entries.max(1),
            fuzzy_threshold: config.fuzzy_threshold,
            save_every: config.save_every.max(1) as u64,
            immediate_save_score: config.immediate_save_score,
            pages: BTreeMap::new(),
            legacy: BTreeMap::new(),
            next_id: 0,
            writes: 0,
            hits: 0,
            misses: 0,
            learning: LearningLedger::new(),
            loaded: BTreeSet::new(),
        }
    }

    /// Cache loaded from the documents under `config.dir`.
    ///
    /// Unreadable documents are skipped with a warning, expired records are
    /// dropped.
    pub async fn open(config: &CacheConfig) -> Self {
        let mut cache = Self::new(config);
        if let Err(e) = cache.load().await {
            warn!(dir = %cache.dir.display(), error = %e, "failed to load cache directory");
        }
        cache
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Number of distinct records (not keys).
    pub fn len(&self) -> usize {
        self.pages.values().map(|p| p.records.len()).sum::<usize>() + self.legacy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Site patterns with at least one record.
    pub fn page_patterns(&self) -> Vec<String> {
        self.pages
            .iter()
            .filter(|(_, p)| !p.records.is_empty())
            .map(|(k, _)| k.clone())
            .collect()
    }

    /// Look up a record for `description` on the page at `url`.
    ///
    /// Order: exact normalised key, best fuzzy match at or above the fuzzy
    /// threshold, then the flat store under the hashed
    /// `(description, url, strategy)` key. A hit bumps the record's access
    /// counters; expired records are never returned.
    pub fn get(&mut self, description: &str, url: &str, strategy: &str) -> Option<CacheEntry> {
        let Some(location) = self.find(description, url, strategy) else {
            self.misses += 1;
            return None;
        };
        let now = now_secs();
        let entry = self.entry_mut(&location)?;
        entry.touch(now);
        let entry = entry.clone();
        self.hits += 1;
        debug!(description, selector = %entry.selector, "cache hit");
        Some(entry)
    }

    /// Same lookup as [`get`](Self::get) without touching counters or the
    /// record's access data.
    pub fn peek(&self, description: &str, url: &str, strategy: &str) -> Option<CacheEntry> {
        let location = self.find(description, url, strategy)?;
        match location {
            Location::Page(pattern, id) => self
                .pages
                .get(&pattern)
                .and_then(|p| p.records.get(&id))
                .map(|r| r.entry.clone()),
            Location::Legacy(key) => self.legacy.get(&key).cloned(),
        }
    }

    /// Count a lookup that produced nothing usable.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    fn find(&self, description: &str, url: &str, strategy: &str) -> Option<Location> {
        let now = now_secs();
        let pattern = site_pattern(url);
        let normalized = normalize_description(description);
        let ttl = self.ttl_secs;

        if let Some(page) = self.pages.get(&pattern) {
            if let Some(id) = page.keys.get(&normalized).copied() {
                if page
                    .records
                    .get(&id)
                    .is_some_and(|r| !r.entry.is_expired(ttl, now))
                {
                    return Some(Location::Page(pattern, id));
                }
            }

            let mut best: Option<(u64, f64)> = None;
            for (id, record) in &page.records {
                if record.entry.is_expired(ttl, now) {
                    continue;
                }
                let candidate = normalize_description(&record.entry.description);
                let similarity = strsim::normalized_levenshtein(&normalized, &candidate);
                if similarity >= self.fuzzy_threshold
                    && best.is_none_or(|(_, best_sim)| similarity > best_sim)
                {
                    best = Some((*id, similarity));
                }
            }
            if let Some((id, similarity)) = best {
                debug!(description, similarity, "fuzzy cache match");
                return Some(Location::Page(pattern, id));
            }
        }

        let key = legacy_key(description, url, strategy);
        match self.legacy.get(&key) {
            Some(entry) if !entry.is_expired(ttl, now) && entry.matches_page(url) => {
                Some(Location::Legacy(key))
            }
            _ => None,
        }
    }

    fn entry_mut(&mut self, location: &Location) -> Option<&mut CacheEntry> {
        match location {
            Location::Page(pattern, id) => self
                .pages
                .get_mut(pattern)
                .and_then(|p| p.records.get_mut(id))
                .map(|r| &mut r.entry),
            Location::Legacy(key) => self.legacy.get_mut(key),
        }
    }

    /// Store `entry` under all of its description's alias keys, replacing
    /// whatever those keys held.
    ///
    /// Persists every few writes, and immediately for high-scoring entries.
    /// Persistence failures are logged, never returned.
    pub async fn put(&mut self, entry: CacheEntry) {
        let score = entry.score;
        let keys = alias_keys(&entry.description);
        info!(
            description = %entry.description,
            selector = %entry.selector,
            score,
            "cached element"
        );
        self.insert(entry, keys, true);
        self.evict_if_needed();

        self.writes += 1;
        if self.writes % self.save_every == 0 || score >= self.immediate_save_score {
            if let Err(e) = self.flush().await {
                warn!(dir = %self.dir.display(), error = %e, "failed to persist cache");
            }
        }
    }

    fn insert(&mut self, entry: CacheEntry, keys: Vec<String>, overwrite: bool) {
        let id = self.next_id;
        self.next_id += 1;
        let Some(primary_key) = keys.first().cloned() else {
            return;
        };

        let page = self.pages.entry(entry.url_pattern.clone()).or_default();
        page.records.insert(id, Record { entry, primary_key });
        for (i, key) in keys.into_iter().enumerate() {
            if overwrite || i == 0 {
                page.keys.insert(key, id);
            } else {
                page.keys.entry(key).or_insert(id);
            }
        }
        page.prune();
    }

    /// Remove `key` from every page and from the flat store.
    pub fn remove(&mut self, key: &str) -> bool {
        let mut removed = self.legacy.remove(key).is_some();
        for page in self.pages.values_mut() {
            if page.keys.remove(key).is_some() {
                page.prune();
                removed = true;
            }
        }
        removed
    }

    /// Drop the flat-store record for `(description, url, strategy)`.
    pub fn invalidate(&mut self, description: &str, url: &str, strategy: &str) -> bool {
        self.remove(&legacy_key(description, url, strategy))
    }

    /// Forget everything, in memory and on disk.
    ///
    /// Only documents this cache reads or writes are deleted; other files in
    /// the directory are left alone.
    pub async fn clear(&mut self) -> Result<(), StorageError> {
        let owned = self.owned_documents();
        self.pages.clear();
        self.legacy.clear();
        self.learning.clear();
        self.loaded.clear();
        self.hits = 0;
        self.misses = 0;
        self.writes = 0;
        for path in json_documents(&self.dir).await? {
            if owned.contains(&path) {
                tokio::fs::remove_file(&path).await?;
            }
        }
        info!(dir = %self.dir.display(), "cache cleared");
        Ok(())
    }

    fn owned_documents(&self) -> BTreeSet<PathBuf> {
        let mut owned = self.loaded.clone();
        owned.insert(self.dir.join(LEGACY_DOCUMENT));
        for pattern in self.pages.keys() {
            owned.insert(self.page_document(pattern));
        }
        owned
    }

    fn page_document(&self, pattern: &str) -> PathBuf {
        self.dir.join(format!("{}.json", pattern_to_filename(pattern)))
    }

    /// Collapse records sharing description, site pattern, strategy and
    /// selector. The survivor has the higher access count, then the newer
    /// timestamp. Returns the number removed and persists when non-zero.
    pub async fn deduplicate(&mut self) -> Result<usize, StorageError> {
        let mut seen: HashMap<String, (Location, CacheEntry)> = HashMap::new();
        let mut losers: Vec<(Location, Location)> = Vec::new();

        for (location, entry) in self.locations() {
            let identity = entry.identity();
            match seen.get(&identity) {
                Some((kept_at, kept)) => {
                    if entry.outranks(kept) {
                        losers.push((kept_at.clone(), location.clone()));
                        seen.insert(identity, (location, entry));
                    } else {
                        losers.push((location, kept_at.clone()));
                    }
                }
                None => {
                    seen.insert(identity, (location, entry));
                }
            }
        }

        let removed = losers.len();
        for (loser, winner) in losers {
            match (loser, winner) {
                (Location::Page(pattern, from), Location::Page(winner_pattern, to))
                    if pattern == winner_pattern =>
                {
                    if let Some(page) = self.pages.get_mut(&pattern) {
                        page.repoint(from, to);
                    }
                }
                (loser, _) => self.remove_location(&loser),
            }
        }

        if removed > 0 {
            info!(removed, "removed duplicate cache records");
            self.flush().await?;
        }
        Ok(removed)
    }

    pub fn stats(&self) -> CacheStats {
        let now = now_secs();
        let entries: Vec<CacheEntry> = self.locations().into_iter().map(|(_, e)| e).collect();
        let records = entries.len();
        let expired = entries
            .iter()
            .filter(|e| e.is_expired(self.ttl_secs, now))
            .count();
        let (average_score, total_accesses) = if records > 0 {
            (
                entries.iter().map(|e| e.score).sum::<f64>() / records as f64,
                entries.iter().map(|e| e.access_count).sum(),
            )
        } else {
            (0.0, 0)
        };
        let lookups = self.hits + self.misses;
        CacheStats {
            records,
            expired,
            average_score,
            total_accesses,
            hits: self.hits,
            misses: self.misses,
            hit_rate: if lookups > 0 {
                self.hits as f64 / lookups as f64
            } else {
                0.0
            },
        }
    }

    pub fn record_success(&mut self, description: &str, strategy: &str) {
        self.learning.record_success(description, strategy);
    }

    pub fn record_failure(&mut self, description: &str, strategy: &str) {
        self.learning.record_failure(description, strategy);
    }

    /// Historical success ratio of `strategy` for `description`, 0.5 if
    /// never seen.
    pub fn strategy_confidence(&self, description: &str, strategy: &str) -> f64 {
        self.learning.confidence(description, strategy)
    }

    /// Write one document per site pattern plus the flat store document.
    pub async fn flush(&self) -> Result<(), StorageError> {
        for (pattern, page) in &self.pages {
            if page.records.is_empty() {
                continue;
            }
            let document = page.persisted();
            let path = self.page_document(pattern);
            write_document(&path, &document).await?;
            info!(path = %path.display(), records = document.len(), "page cache saved");
        }
        if !self.legacy.is_empty() {
            write_document(&self.dir.join(LEGACY_DOCUMENT), &self.legacy).await?;
        }
        Ok(())
    }

    async fn load(&mut self) -> Result<(), StorageError> {
        let now = now_secs();
        for path in json_documents(&self.dir).await? {
            let is_legacy = path.file_name().and_then(|n| n.to_str()) == Some(LEGACY_DOCUMENT);
            let document: BTreeMap<String, CacheEntry> = match read_document(&path).await {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable cache document");
                    continue;
                }
            };

            self.loaded.insert(path.clone());

            if is_legacy {
                let before = self.legacy.len();
                self.legacy.extend(
                    document
                        .into_iter()
                        .filter(|(_, e)| !e.is_expired(self.ttl_secs, now)),
                );
                debug!(loaded = self.legacy.len() - before, "flat store loaded");
                continue;
            }

            let pattern = dominant_pattern(&document)
                .unwrap_or_else(|| filename_to_pattern(&document_stem(&path)));
            let mut loaded = 0;
            for (key, mut entry) in document {
                if entry.is_expired(self.ttl_secs, now) {
                    continue;
                }
                entry.url_pattern = pattern.clone();
                let mut keys = vec![key];
                keys.extend(alias_keys(&entry.description));
                self.insert(entry, keys, false);
                loaded += 1;
            }
            info!(path = %path.display(), pattern = %pattern, loaded, "page cache loaded");
        }
        Ok(())
    }

    fn locations(&self) -> Vec<(Location, CacheEntry)> {
        let mut out = Vec::new();
        for (pattern, page) in &self.pages {
            for (id, record) in &page.records {
                out.push((Location::Page(pattern.clone(), *id), record.entry.clone()));
            }
        }
        for (key, entry) in &self.legacy {
            out.push((Location::Legacy(key.clone()), entry.clone()));
        }
        out
    }

    fn remove_location(&mut self, location: &Location) {
        match location {
            Location::Page(pattern, id) => {
                if let Some(page) = self.pages.get_mut(pattern) {
                    page.remove_record(*id);
                }
            }
            Location::Legacy(key) => {
                self.legacy.remove(key);
            }
        }
    }

    /// Over capacity: drop the least-accessed, least-recently-used tenth.
    fn evict_if_needed(&mut self) {
        if self.len() <= self.max_entries {
            return;
        }
        let mut ranked = self.locations();
        ranked.sort_by(|(_, a), (_, b)| {
            a.access_count
                .cmp(&b.access_count)
                .then(a.last_accessed_at.total_cmp(&b.last_accessed_at))
        });
        let to_remove = (self.max_entries / 10).max(1);
        for (location, entry) in ranked.into_iter().take(to_remove) {
            debug!(selector = %entry.selector, "evicting cache record");
            self.remove_location(&location);
        }
    }
}

/// Most common `url_pattern` among a document's records (ties go to the
/// lexicographically smallest).
fn dominant_pattern(document: &BTreeMap<String, CacheEntry>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for entry in document.values() {
        if !entry.url_pattern.is_empty() {
            *counts.entry(entry.url_pattern.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(p, _)| p.to_string())
}
