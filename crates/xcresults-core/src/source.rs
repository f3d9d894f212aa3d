//! The document-retrieval seam.

use hashbrown::HashMap;
use serde_json::Value;
use xcresults_error::SourceError;
use xcresults_types::RecordId;

/// Retrieves raw record documents from a bundle.
///
/// `id == None` asks for the root `ActionsInvocationRecord`. Implementations
/// may block; the core never retries a failed call.
pub trait DocumentSource {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError>;
}

impl<S: DocumentSource + ?Sized> DocumentSource for &mut S {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError> {
        (**self).fetch(id)
    }
}

impl<S: DocumentSource + ?Sized> DocumentSource for Box<S> {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError> {
        (**self).fetch(id)
    }
}

/// Documents held in memory, keyed by identifier.
///
/// Counts every fetch so callers can observe caching behaviour.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    root: Option<Value>,
    documents: HashMap<RecordId, Value>,
    fetches: HashMap<Option<RecordId>, usize>,
}

impl MemorySource {
    #[must_use]
    pub fn new(root: Value) -> Self {
        Self {
            root: Some(root),
            ..Self::default()
        }
    }

    pub fn insert(&mut self, id: RecordId, document: Value) {
        self.documents.insert(id, document);
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<Value> {
        self.documents.remove(id)
    }

    #[must_use]
    pub fn contains(&self, id: &RecordId) -> bool {
        self.documents.contains_key(id)
    }

    /// Total number of `fetch` calls.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.values().sum()
    }

    /// Number of `fetch` calls for one identifier.
    #[must_use]
    pub fn fetches_of(&self, id: &RecordId) -> usize {
        self.fetches.get(&Some(id.clone())).copied().unwrap_or(0)
    }
}

impl DocumentSource for MemorySource {
    fn fetch(&mut self, id: Option<&RecordId>) -> Result<Value, SourceError> {
        *self.fetches.entry(id.cloned()).or_insert(0) += 1;
        match id {
            None => self
                .root
                .clone()
                .ok_or_else(|| SourceError::not_found("<root>")),
            Some(id) => self
                .documents
                .get(id)
                .cloned()
                .ok_or_else(|| SourceError::not_found(id.as_str())),
        }
    }
}
