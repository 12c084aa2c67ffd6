//! Self-learning inventory of a page's interactive elements.
//!
//! A sweep records every visible interactive node once, with a selector that
//! should survive reloads. Lookups score descriptors against a description
//! and re-resolve the winner live. The catalog is an alternate entry point;
//! the resolver never consults it.

use super::descriptor::{ElementDescriptor, classify_element, element_confidence};
use crate::cache::keys::{page_pattern, pattern_to_filename};
use crate::config::DiscoveryConfig;
use crate::storage::{
    StorageError, document_stem, json_documents, now_secs, read_document, write_document,
};
use pinpoint_common::{DomError, DomProvider, NodeHandle};
use pinpoint_core::selector::catalog_selector;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Broad selector groups swept in order.
pub const DISCOVERY_GROUPS: &[&str] = &[
    "input, button, textarea, select, a[href]",
    r#"[role="button"], [role="menuitem"], [role="option"], [role="combobox"]"#,
    "[onclick], [tabindex]",
    r#"div[class*="button"], div[class*="menu"], span[class*="button"]"#,
];

/// Attributes copied onto every descriptor.
const RECORDED_ATTRIBUTES: &[&str] = &[
    "id",
    "class",
    "role",
    "type",
    "name",
    "aria-label",
    "title",
    "placeholder",
];

/// Sources tried for a descriptor's text; the longest wins.
const TEXT_SOURCES: &[&str] = &["aria-label", "title", "value", "placeholder"];

const DISCOVERY_METHOD: &str = "auto_discovery";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_pages: usize,
    pub total_elements: usize,
    pub element_types: BTreeMap<String, usize>,
    pub pages: Vec<String>,
}

/// Outcome of [`DiscoveryCatalog::find_by_description`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogMatch {
    pub node: NodeHandle,
    /// Catalog key of the matched descriptor
    pub key: String,
    pub score: f64,
    pub descriptor: ElementDescriptor,
}

/// Descriptors of one page and the document they persist to.
#[derive(Debug, Default)]
struct PageCatalog {
    stem: String,
    elements: BTreeMap<String, ElementDescriptor>,
}

pub struct DiscoveryCatalog {
    enabled: bool,
    dir: PathBuf,
    max_elements: usize,
    min_score: f64,
    /// Keyed by page pattern
    pages: BTreeMap<String, PageCatalog>,
}

impl DiscoveryCatalog {
    /// Empty catalog persisting under `config.dir`.
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self {
            enabled: config.enabled,
            dir: config.dir.clone(),
            max_elements: config.max_elements,
            min_score: config.min_score,
            pages: BTreeMap::new(),
        }
    }

    /// Catalog with every persisted page loaded. Nothing is read when
    /// discovery is disabled.
    pub async fn open(config: &DiscoveryConfig) -> Self {
        let mut catalog = Self::new(config);
        if !catalog.enabled {
            return catalog;
        }
        if let Err(e) = catalog.load_all().await {
            warn!(dir = %catalog.dir.display(), error = %e, "failed to load page catalogs");
        }
        catalog
    }

    /// When false, sweeps and lookups do nothing.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Descriptors recorded for the page at `url`, if it has been swept.
    pub fn page(&self, url: &str) -> Option<&BTreeMap<String, ElementDescriptor>> {
        self.pages.get(&page_pattern(url)).map(|p| &p.elements)
    }

    /// Read every `*.json` catalog under the directory. Returns the number of
    /// pages loaded; unreadable documents are skipped.
    ///
    /// A document's page pattern comes from its descriptors, falling back
    /// to the file stem for documents that predate the field.
    pub async fn load_all(&mut self) -> Result<usize, StorageError> {
        let mut loaded = 0;
        for path in json_documents(&self.dir).await? {
            match read_document::<BTreeMap<String, ElementDescriptor>>(&path).await {
                Ok(elements) => {
                    let stem = document_stem(&path);
                    let pattern = recorded_pattern(&elements).unwrap_or_else(|| stem.clone());
                    self.pages.insert(pattern, PageCatalog { stem, elements });
                    loaded += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable page catalog");
                }
            }
        }
        debug!(loaded, "page catalogs loaded");
        Ok(loaded)
    }

    /// Sweep the page and record its interactive elements.
    ///
    /// Skipped (returns `false`) when discovery is disabled, or when the page
    /// is already catalogued and `force` is unset; a forced sweep replaces
    /// the page's catalog.
    pub async fn discover(&mut self, page: &dyn DomProvider, force: bool) -> Result<bool, DomError> {
        if !self.enabled {
            debug!("discovery disabled, not sweeping");
            return Ok(false);
        }
        let url = page.current_url().await?;
        let pattern = page_pattern(&url);
        if !force && self.pages.contains_key(&pattern) {
            return Ok(false);
        }

        info!(page = %pattern, "discovering page structure");
        let start = Instant::now();
        let mut elements = BTreeMap::new();
        let mut seen: HashSet<NodeHandle> = HashSet::new();

        'groups: for group in DISCOVERY_GROUPS {
            let nodes = match page.query_all(group).await {
                Ok(nodes) => nodes,
                Err(e) => {
                    debug!(selector = group, error = %e, "discovery selector failed");
                    continue;
                }
            };
            for node in nodes {
                if elements.len() >= self.max_elements {
                    break 'groups;
                }
                if !seen.insert(node) {
                    continue;
                }
                if !page.is_visible(node).await.unwrap_or(false) {
                    continue;
                }
                match describe(page, node, &pattern).await {
                    Ok(Some(descriptor)) => {
                        let key = format!("{}_{}", descriptor.element_type, elements.len());
                        elements.insert(key, descriptor);
                    }
                    Ok(None) => {}
                    Err(e) => debug!(%node, error = %e, "failed to describe element"),
                }
            }
        }

        info!(
            elements = elements.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "discovery finished"
        );
        let stem = self.stem_for(&pattern);
        let path = self.dir.join(format!("{stem}.json"));
        if let Err(e) = write_document(&path, &elements).await {
            warn!(path = %path.display(), error = %e, "failed to save page catalog");
        }
        self.pages.insert(pattern, PageCatalog { stem, elements });
        Ok(true)
    }

    /// Best catalogued element for `description` on the current page, if it
    /// is still present and visible.
    ///
    /// Sweeps the page first when it has never been catalogued.
    pub async fn find_by_description(
        &mut self,
        page: &dyn DomProvider,
        description: &str,
    ) -> Result<Option<CatalogMatch>, DomError> {
        if !self.enabled {
            return Ok(None);
        }
        let url = page.current_url().await?;
        let pattern = page_pattern(&url);
        if !self.pages.contains_key(&pattern) {
            self.discover(page, false).await?;
        }
        let Some(catalog) = self.pages.get_mut(&pattern) else {
            return Ok(None);
        };

        let mut best: Option<(&String, f64)> = None;
        for (key, descriptor) in &catalog.elements {
            let score = descriptor.matches_description(description);
            if score >= self.min_score && best.is_none_or(|(_, s)| score > s) {
                best = Some((key, score));
            }
        }
        let Some((key, score)) = best.map(|(key, s)| (key.clone(), s)) else {
            debug!(description, "no catalogued element matches");
            return Ok(None);
        };
        let Some(descriptor) = catalog.elements.get_mut(&key) else {
            return Ok(None);
        };

        let node = match page.query_one(&descriptor.selector).await {
            Ok(node) => node,
            Err(e) => {
                debug!(selector = %descriptor.selector, error = %e, "catalogued selector failed");
                return Ok(None);
            }
        };
        match node {
            Some(node) if page.is_visible(node).await.unwrap_or(false) => {
                descriptor.access_count += 1;
                descriptor.last_seen_at = now_secs();
                debug!(description, selector = %descriptor.selector, score, "catalog match");
                Ok(Some(CatalogMatch {
                    node,
                    key,
                    score,
                    descriptor: descriptor.clone(),
                }))
            }
            _ => Ok(None),
        }
    }

    pub fn statistics(&self) -> CatalogStats {
        let mut element_types: BTreeMap<String, usize> = BTreeMap::new();
        for descriptor in self.pages.values().flat_map(|p| p.elements.values()) {
            *element_types.entry(descriptor.element_type.clone()).or_default() += 1;
        }
        CatalogStats {
            total_pages: self.pages.len(),
            total_elements: self.pages.values().map(|p| p.elements.len()).sum(),
            element_types,
            pages: self.pages.keys().cloned().collect(),
        }
    }

    /// Document stem for `pattern`. Patterns whose readable stem is taken by
    /// another page get a hash suffix.
    fn stem_for(&self, pattern: &str) -> String {
        if let Some(existing) = self.pages.get(pattern) {
            return existing.stem.clone();
        }
        let stem = pattern_to_filename(pattern);
        let taken = self
            .pages
            .iter()
            .any(|(other, p)| other != pattern && p.stem == stem);
        if taken {
            let digest = format!("{:x}", md5::compute(pattern.as_bytes()));
            format!("{stem}_{}", &digest[..8])
        } else {
            stem
        }
    }
}

/// Most common non-empty `url_pattern` among a document's descriptors.
fn recorded_pattern(elements: &BTreeMap<String, ElementDescriptor>) -> Option<String> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for descriptor in elements.values() {
        if !descriptor.url_pattern.is_empty() {
            *counts.entry(descriptor.url_pattern.as_str()).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(p, _)| p.to_string())
}

/// Descriptor for `node`, or `None` when it carries no text, id or class.
async fn describe(
    page: &dyn DomProvider,
    node: NodeHandle,
    url_pattern: &str,
) -> Result<Option<ElementDescriptor>, DomError> {
    let mut attributes = BTreeMap::new();
    for name in RECORDED_ATTRIBUTES {
        let value = page.attribute(node, name).await?.unwrap_or_default();
        attributes.insert(name.to_string(), value.trim().to_string());
    }

    let text_content = descriptor_text(page, node).await?;
    let id = &attributes["id"];
    let class = &attributes["class"];
    if text_content.is_empty() && id.is_empty() && class.is_empty() {
        return Ok(None);
    }

    let tag_name = page.tag_name(node).await?;
    let element_type = classify_element(&tag_name, &attributes["role"], class);
    let confidence = element_confidence(&text_content, &attributes, &element_type);
    let selector = catalog_selector(page, node).await;

    Ok(Some(ElementDescriptor {
        selector,
        text_content,
        attributes,
        element_type,
        confidence,
        discovery_method: DISCOVERY_METHOD.into(),
        last_seen_at: now_secs(),
        access_count: 0,
        url_pattern: url_pattern.to_string(),
    }))
}

/// Longest candidate text longer than two characters.
async fn descriptor_text(page: &dyn DomProvider, node: NodeHandle) -> Result<String, DomError> {
    let mut candidates = vec![page.text(node).await?];
    for name in TEXT_SOURCES {
        if let Some(value) = page.attribute(node, name).await? {
            candidates.push(value);
        }
    }
    Ok(candidates
        .into_iter()
        .map(|t| t.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|t| t.chars().count() > 2)
        .max_by_key(|t| t.chars().count())
        .unwrap_or_default())
}
