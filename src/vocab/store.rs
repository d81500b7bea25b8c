//! Vocabulary storage: in-memory scopes and the archive-backed cache.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;
use walkdir::WalkDir;

use super::{Term, Vocabulary, VocabularyRef};
use crate::error::{CheckError, Result};

/// One `authority:scope` held in memory.
#[derive(Debug, Clone, Default)]
pub struct ScopeVocabulary {
    authority: String,
    scope: String,
    collections: BTreeMap<String, Vec<Term>>,
}

impl ScopeVocabulary {
    pub fn new(authority: &str, scope: &str) -> Self {
        Self {
            authority: authority.to_string(),
            scope: scope.to_string(),
            collections: BTreeMap::new(),
        }
    }

    /// Add a term, keeping the collection ordered by name.
    pub fn with_term(mut self, collection: &str, term: Term) -> Self {
        self.insert_term(collection, term);
        self
    }

    /// Declare a collection with no terms.
    pub fn with_collection(mut self, collection: &str) -> Self {
        self.collections.entry(collection.to_string()).or_default();
        self
    }

    pub fn insert_term(&mut self, collection: &str, term: Term) {
        let terms = self.collections.entry(collection.to_string()).or_default();
        let pos = terms.partition_point(|t| t.name < term.name);
        terms.insert(pos, term);
    }

    /// Load `<root>/<authority>/<scope>/<collection>/<term>` files.
    ///
    /// Each term file is a JSON object; a missing `name` defaults to the
    /// file name. Hidden files and `MANIFEST` files are skipped.
    pub fn load(root: &Path, authority: &str, scope: &str) -> Result<Self> {
        let scope_dir = root.join(authority).join(scope);
        if !scope_dir.is_dir() {
            return Err(CheckError::Lookup(format!(
                "vocabulary not found: '{}:{}' (looked in {})",
                authority,
                scope,
                scope_dir.display()
            )));
        }

        let mut vocab = Self::new(authority, scope);
        let walker = WalkDir::new(&scope_dir)
            .min_depth(1)
            .max_depth(2)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e.file_name().to_str().unwrap_or_default()));

        for entry in walker {
            let entry = entry.map_err(|e| CheckError::Io {
                path: scope_dir.clone(),
                source: e.into(),
            })?;

            if entry.depth() == 1 {
                if entry.file_type().is_dir() {
                    let collection = entry.file_name().to_string_lossy();
                    vocab = vocab.with_collection(&collection);
                }
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            if !entry.file_type().is_file() || file_name.starts_with("MANIFEST") {
                continue;
            }

            let collection = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let term = read_term(entry.path())?;
            vocab.insert_term(&collection, term);
        }

        debug!(
            authority,
            scope,
            collections = vocab.collections.len(),
            "loaded vocabulary archive"
        );
        Ok(vocab)
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn read_term(path: &Path) -> Result<Term> {
    let content = fs::read_to_string(path).map_err(|source| CheckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut value: Value = serde_json::from_str(&content).map_err(|source| CheckError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if let Value::Object(map) = &mut value {
        if !map.contains_key("name") {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            map.insert("name".to_string(), Value::String(stem));
        }
    }

    serde_json::from_value(value).map_err(|source| CheckError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

impl Vocabulary for ScopeVocabulary {
    fn authority(&self) -> &str {
        &self.authority
    }

    fn scope(&self) -> &str {
        &self.scope
    }

    fn collection_names(&self) -> Vec<&str> {
        self.collections.keys().map(String::as_str).collect()
    }

    fn collection(&self, name: &str) -> Option<&[Term]> {
        self.collections.get(name).map(Vec::as_slice)
    }
}

/// Resolves vocabulary references, caching every loaded scope.
///
/// Scopes are either inserted up front or read lazily from an archive root.
#[derive(Default)]
pub struct VocabularyStore {
    root: Option<PathBuf>,
    cache: RwLock<HashMap<(String, String), Arc<ScopeVocabulary>>>,
}

impl VocabularyStore {
    /// An empty store with no archive behind it.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that loads scopes from `root` on first use.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn insert(&self, vocabulary: ScopeVocabulary) {
        let key = (vocabulary.authority.clone(), vocabulary.scope.clone());
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(vocabulary));
    }

    pub fn with(self, vocabulary: ScopeVocabulary) -> Self {
        self.insert(vocabulary);
        self
    }

    /// The vocabulary for `reference`, loading it from the archive if needed.
    pub fn load(&self, reference: &VocabularyRef) -> Result<Arc<dyn Vocabulary>> {
        let key = (reference.authority.clone(), reference.scope.clone());

        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(vocab) = cache.get(&key) {
                debug!(vocabulary = %reference, "vocabulary cache hit");
                let vocab: Arc<dyn Vocabulary> = vocab.clone();
                return Ok(vocab);
            }
        }

        let root = self.root.as_deref().ok_or_else(|| {
            CheckError::Lookup(format!(
                "vocabulary not found: '{}:{}'",
                reference.authority, reference.scope
            ))
        })?;

        let vocab = Arc::new(ScopeVocabulary::load(
            root,
            &reference.authority,
            &reference.scope,
        )?);
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert_with(|| vocab.clone());
        let vocab: Arc<dyn Vocabulary> = vocab;
        Ok(vocab)
    }
}

impl std::fmt::Debug for VocabularyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let loaded = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("VocabularyStore")
            .field("root", &self.root)
            .field("loaded", &loaded)
            .finish()
    }
}
