//! Search index shards and the merged index.
//!
//! A shard file looks like:
//!
//! ```text
//! var searchData=
//! [
//!   ['entity_10',['Entity',['../classECS_1_1Entity.html',1,'ECS::Entity'],
//!                          ['../classECS_1_1Entity.html#a20f7',1,'ECS::Entity::Entity()']]],
//!   ...
//! ];
//! ```
//!
//! Each entry pairs an anchor key with a display label and one or more
//! links. Keys end in `_<n>`, the entry's ordinal; the part before it is the
//! sort stem.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info};

use crate::error::DocsError;
use crate::html::decode_entities;
use crate::parser::{self, Node};

/// One destination of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Link {
    /// Page URL relative to the `search/` directory, with an optional
    /// `#anchor`.
    pub url: String,
    /// Generator flag; `1` for a regular link.
    pub flag: i64,
    /// Scope or signature shown next to the label, entities decoded.
    pub scope: String,
}

impl Link {
    /// The URL without its `#anchor`.
    #[must_use]
    pub fn page(&self) -> &str {
        self.url.split_once('#').map_or(&self.url, |(page, _)| page)
    }

    /// The `#anchor` part, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        self.url.split_once('#').map(|(_, anchor)| anchor)
    }
}

/// An entry of the index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchEntry {
    pub key: String,
    /// Display label, entities decoded.
    pub label: String,
    pub links: Vec<Link>,
}

impl SearchEntry {
    /// The key without its trailing `_<n>` ordinal.
    #[must_use]
    pub fn stem(&self) -> &str {
        key_stem(&self.key)
    }
}

fn key_stem(key: &str) -> &str {
    match key.rsplit_once('_') {
        Some((stem, ordinal))
            if !ordinal.is_empty() && ordinal.bytes().all(|b| b.is_ascii_digit()) =>
        {
            stem
        }
        _ => key,
    }
}

/// A property a shard breaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShardIssue {
    EmptyLabel { key: String },
    DuplicateKey { key: String },
    Unsorted { key: String, previous: String },
}

impl fmt::Display for ShardIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardIssue::EmptyLabel { key } => write!(f, "{key}: empty label"),
            ShardIssue::DuplicateKey { key } => write!(f, "{key}: duplicate key"),
            ShardIssue::Unsorted { key, previous } => {
                write!(f, "{key}: sorts before the previous entry {previous}")
            }
        }
    }
}

/// A link whose page does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokenLink {
    pub key: String,
    pub url: String,
    /// Where the page was looked for, or `None` if the URL leaves the
    /// documentation root.
    pub path: Option<PathBuf>,
}

impl fmt::Display for BrokenLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{}: {} (missing {})", self.key, self.url, path.display()),
            None => write!(f, "{}: {} (outside the documentation root)", self.key, self.url),
        }
    }
}

// ── Shards ──────────────────────────────────────────────────────────────────

/// One generated shard file. Immutable once parsed; a regenerated shard is
/// parsed again rather than patched.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchShard {
    variable: String,
    category: Option<String>,
    bucket: Option<String>,
    entries: Vec<SearchEntry>,
}

impl SearchShard {
    /// Parse the text of a shard.
    ///
    /// # Errors
    ///
    /// Returns a [`DocsError`] with line and column if the text is not a
    /// well-formed shard.
    pub fn parse(text: &str) -> Result<Self, DocsError> {
        let doc = parser::parse(text)?;
        let items = doc
            .root
            .as_array()
            .ok_or_else(|| doc.root.error("expected the list of entries"))?;
        let entries = items.iter().map(entry).collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            variable: doc.variable,
            category: None,
            bucket: None,
            entries,
        })
    }

    /// Read and parse a shard file. `all_4.js` has category `all` and
    /// bucket `4`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DocsError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| DocsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut shard = Self::parse(&text)?;
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            match stem.rsplit_once('_') {
                Some((category, bucket)) => {
                    shard.category = Some(category.to_string());
                    shard.bucket = Some(bucket.to_string());
                }
                None => shard.category = Some(stem.to_string()),
            }
        }
        debug!(
            path = %path.display(),
            entries = shard.entries.len(),
            "shard loaded"
        );
        Ok(shard)
    }

    /// Name of the top-level variable, normally `searchData`.
    #[must_use]
    pub fn variable(&self) -> &str {
        &self.variable
    }

    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    #[must_use]
    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    #[must_use]
    pub fn entries(&self) -> &[SearchEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every label is non-empty, keys are unique and entries are sorted by
    /// key stem. Returns the violations in file order.
    #[must_use]
    pub fn validate(&self) -> Vec<ShardIssue> {
        let mut issues = Vec::new();
        let mut seen = HashSet::new();
        let mut previous: Option<&SearchEntry> = None;
        for entry in &self.entries {
            if entry.label.trim().is_empty() {
                issues.push(ShardIssue::EmptyLabel {
                    key: entry.key.clone(),
                });
            }
            if !seen.insert(entry.key.as_str()) {
                issues.push(ShardIssue::DuplicateKey {
                    key: entry.key.clone(),
                });
            }
            if let Some(prev) = previous
                && entry.stem() < prev.stem()
            {
                issues.push(ShardIssue::Unsorted {
                    key: entry.key.clone(),
                    previous: prev.key.clone(),
                });
            }
            previous = Some(entry);
        }
        issues
    }
}

fn entry(node: &Node) -> Result<SearchEntry, DocsError> {
    let shape = "expected ['key', ['label', link...]]";
    let [key, body] = node.as_array().ok_or_else(|| node.error(shape))? else {
        return Err(node.error(shape));
    };
    let key = key.as_str().ok_or_else(|| key.error("expected the entry key"))?;
    let (label, links) = body
        .as_array()
        .and_then(|items| items.split_first())
        .ok_or_else(|| body.error("expected ['label', link...]"))?;
    let label = label
        .as_str()
        .ok_or_else(|| label.error("expected the entry label"))?;
    if links.is_empty() {
        return Err(body.error(format!("entry {key} has no links")));
    }
    Ok(SearchEntry {
        key: key.to_string(),
        label: decode_entities(label),
        links: links.iter().map(link).collect::<Result<_, _>>()?,
    })
}

fn link(node: &Node) -> Result<Link, DocsError> {
    let shape = "expected ['url', flag, 'scope']";
    let items = node.as_array().ok_or_else(|| node.error(shape))?;
    let (url, flag, scope) = match items {
        [url, flag] => (url, flag, None),
        [url, flag, scope] => (url, flag, Some(scope)),
        _ => return Err(node.error(shape)),
    };
    let url = url.as_str().ok_or_else(|| url.error("expected the link URL"))?;
    let flag = flag
        .as_int()
        .ok_or_else(|| flag.error("expected the link flag"))?;
    let scope = match scope {
        Some(scope) => scope
            .as_str()
            .ok_or_else(|| scope.error("expected the link scope"))?,
        None => "",
    };
    Ok(Link {
        url: url.to_string(),
        flag,
        scope: decode_entities(scope),
    })
}

// ── Merged index ────────────────────────────────────────────────────────────

/// Every shard of a documentation build joined by key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchIndex {
    entries: BTreeMap<String, SearchEntry>,
}

impl SearchIndex {
    /// Join `shards`. An entry whose key appears in several shards keeps the
    /// first label and gains the links it did not have yet.
    #[must_use]
    pub fn merge<'a>(shards: impl IntoIterator<Item = &'a SearchShard>) -> Self {
        let mut entries: BTreeMap<String, SearchEntry> = BTreeMap::new();
        let mut shard_count = 0;
        for shard in shards {
            shard_count += 1;
            for entry in shard.entries() {
                match entries.get_mut(&entry.key) {
                    Some(existing) => {
                        for link in &entry.links {
                            if !existing.links.contains(link) {
                                existing.links.push(link.clone());
                            }
                        }
                    }
                    None => {
                        entries.insert(entry.key.clone(), entry.clone());
                    }
                }
            }
        }
        info!(shards = shard_count, entries = entries.len(), "search index merged");
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SearchEntry> {
        self.entries.get(key)
    }

    /// Every entry, in key order.
    pub fn entries(&self) -> impl Iterator<Item = &SearchEntry> {
        self.entries.values()
    }

    /// Entries whose label contains `query`, ignoring case, in key order.
    /// An empty query matches everything.
    #[must_use]
    pub fn search(&self, query: &str) -> Vec<&SearchEntry> {
        let query = query.to_lowercase();
        self.entries
            .values()
            .filter(|entry| entry.label.to_lowercase().contains(&query))
            .collect()
    }

    /// Links whose page is missing under `doc_root`. URLs are relative to
    /// `doc_root/search`.
    #[must_use]
    pub fn check_links(&self, doc_root: &Path) -> Vec<BrokenLink> {
        let mut broken = Vec::new();
        let mut checked = 0;
        for entry in self.entries.values() {
            for link in &entry.links {
                checked += 1;
                let path = resolve(doc_root, link.page());
                if path.as_ref().is_some_and(|p| p.is_file()) {
                    continue;
                }
                broken.push(BrokenLink {
                    key: entry.key.clone(),
                    url: link.url.clone(),
                    path,
                });
            }
        }
        info!(
            root = %doc_root.display(),
            links = checked,
            broken = broken.len(),
            "links checked"
        );
        broken
    }
}

/// Resolve `page` against `doc_root/search` without touching the file
/// system. `None` if it climbs above `doc_root`.
fn resolve(doc_root: &Path, page: &str) -> Option<PathBuf> {
    let mut parts: Vec<&str> = vec!["search"];
    for part in Path::new(page).components() {
        match part {
            Component::Normal(name) => parts.push(name.to_str()?),
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::CurDir => {}
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    let mut path = doc_root.to_path_buf();
    path.extend(parts);
    Some(path)
}
