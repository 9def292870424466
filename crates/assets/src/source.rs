use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use portalspace_common::WorldUrl;

use crate::WorldDocument;

/// Errors from fetching a world document.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("world not found: {0}")]
    NotFound(WorldUrl),
    #[error("malformed world document {url}: {reason}")]
    Malformed { url: WorldUrl, reason: String },
}

/// Fetches world documents by URL.
///
/// Implementations may block; the streaming controller calls them from its
/// single mutation timeline and never retries a failed fetch itself.
pub trait DocumentSource {
    fn fetch(&self, url: &WorldUrl) -> Result<WorldDocument, FetchError>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn fetch(&self, url: &WorldUrl) -> Result<WorldDocument, FetchError> {
        (**self).fetch(url)
    }
}

/// Serves documents from a directory tree.
///
/// `worlds/a.json` and `file://worlds/a.json` both resolve to
/// `<root>/worlds/a.json`; URLs escaping the root are treated as missing.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a world URL onto a path below the root, if it stays inside it.
    pub fn resolve(&self, url: &WorldUrl) -> Option<PathBuf> {
        let raw = url.as_str();
        let raw = raw.strip_prefix("file://").unwrap_or(raw);
        if raw.contains("://") {
            return None;
        }
        let relative = Path::new(raw.trim_start_matches('/'));
        let mut path = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => path.push(part),
                Component::CurDir => {}
                _ => return None,
            }
        }
        Some(path)
    }

    /// URLs of every `*.json` document directly under `dir` (relative to
    /// the root), sorted.
    pub fn list(&self, dir: impl AsRef<Path>) -> Result<Vec<WorldUrl>, FetchError> {
        let base = dir.as_ref();
        let mut urls = Vec::new();
        for entry in std::fs::read_dir(self.root.join(base))? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    let rel = base.join(name);
                    let rel = rel.to_string_lossy().replace('\\', "/");
                    let rel = rel.trim_start_matches("./").to_string();
                    if let Ok(url) = WorldUrl::parse(rel) {
                        urls.push(url);
                    }
                }
            }
        }
        urls.sort();
        Ok(urls)
    }
}

impl DocumentSource for DirectorySource {
    fn fetch(&self, url: &WorldUrl) -> Result<WorldDocument, FetchError> {
        let path = self
            .resolve(url)
            .ok_or_else(|| FetchError::NotFound(url.clone()))?;
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::NotFound(url.clone()));
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(%url, path = %path.display(), "fetched world document");
        WorldDocument::from_json(url, &text)
    }
}

/// In-memory document table, for tests and embedding shells.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: BTreeMap<WorldUrl, WorldDocument>,
    fetches: std::cell::Cell<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: WorldUrl, document: WorldDocument) {
        self.documents.insert(url, document);
    }

    pub fn remove(&mut self, url: &WorldUrl) -> Option<WorldDocument> {
        self.documents.remove(url)
    }

    /// Number of fetch calls served or refused so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.get()
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&self, url: &WorldUrl) -> Result<WorldDocument, FetchError> {
        self.fetches.set(self.fetches.get() + 1);
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::NotFound(url.clone()))
    }
}
