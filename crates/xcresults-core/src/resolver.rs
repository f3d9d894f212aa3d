//! Reference Resolver: identifier → decoded [`Record`], cached per run.
//!
//! The cache is the arena: records are shared as `Rc<Record>` and nothing in
//! the graph owns its children, so cyclic references cannot create cyclic
//! ownership. Failed identifiers are remembered too, so a document is
//! requested from the source at most once per run.

use std::rc::Rc;

use hashbrown::HashMap;
use tracing::{debug, trace};
use xcresults_error::{ConvertError, ErrorKind, Result, SourceError};
use xcresults_types::{DecodeError, Record, RecordId, RecordKind, RecordPath, Reference};

use crate::source::DocumentSource;

/// Identifier used in errors about the root document.
pub const ROOT_ID: &str = "<root>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolverStats {
    /// Calls made to the document source.
    pub fetches: usize,
    /// Resolutions served from the cache.
    pub cache_hits: usize,
    /// Identifiers whose resolution failed.
    pub failures: usize,
}

#[derive(Debug, Clone)]
struct Failure {
    kind: ErrorKind,
    reason: String,
}

pub struct Resolver<S> {
    source: S,
    root: Option<Rc<Record>>,
    cache: HashMap<RecordId, Rc<Record>>,
    failed: HashMap<RecordId, Failure>,
    stats: ResolverStats,
}

impl<S: DocumentSource> Resolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            root: None,
            cache: HashMap::new(),
            failed: HashMap::new(),
            stats: ResolverStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> ResolverStats {
        self.stats
    }

    #[must_use]
    pub fn is_cached(&self, id: &RecordId) -> bool {
        self.cache.contains_key(id)
    }

    #[must_use]
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn into_source(self) -> S {
        self.source
    }

    /// Resolve the bundle's root `ActionsInvocationRecord`.
    pub fn resolve_root(&mut self) -> Result<Rc<Record>> {
        if let Some(root) = &self.root {
            self.stats.cache_hits += 1;
            return Ok(Rc::clone(root));
        }
        let path = RecordPath::root().to_string();
        self.stats.fetches += 1;
        let document = self
            .source
            .fetch(None)
            .map_err(|err| source_failure(ROOT_ID, &path, &err))?;
        let record = Record::decode_as(&document, &[RecordKind::ActionInvocation])
            .map_err(|err| decode_failure(ROOT_ID, &path, err))?;
        let record = Rc::new(record);
        debug!(kind = %record.kind(), "resolved root record");
        self.root = Some(Rc::clone(&record));
        Ok(record)
    }

    /// Resolve `reference` into a record whose kind must be in `expected`.
    ///
    /// Idempotent: a second call for the same identifier returns the cached
    /// record (or the cached failure) without touching the source.
    pub fn resolve(
        &mut self,
        reference: &Reference,
        expected: &[RecordKind],
        path: &RecordPath,
    ) -> Result<Rc<Record>> {
        let id = &reference.id;
        let rendered = path.to_string();

        if let Some(record) = self.cache.get(id) {
            self.stats.cache_hits += 1;
            trace!(id = %id, "record cache hit");
            let record = Rc::clone(record);
            return check_kind(id, &rendered, record, expected);
        }
        if let Some(failure) = self.failed.get(id) {
            self.stats.cache_hits += 1;
            return Err(rebuild_failure(id.as_str(), &rendered, failure));
        }

        self.stats.fetches += 1;
        let outcome = self
            .source
            .fetch(Some(id))
            .map_err(|err| source_failure(id.as_str(), &rendered, &err))
            .and_then(|document| {
                Record::decode(&document).map_err(|err| decode_failure(id.as_str(), &rendered, err))
            });

        match outcome {
            Ok(record) => {
                let record = Rc::new(record);
                debug!(
                    id = %id,
                    kind = %record.kind(),
                    target_type = reference.target_type.as_deref().unwrap_or("-"),
                    "resolved record"
                );
                self.cache.insert(id.clone(), Rc::clone(&record));
                check_kind(id, &rendered, record, expected)
            }
            Err(err) => {
                self.stats.failures += 1;
                self.failed.insert(
                    id.clone(),
                    Failure {
                        kind: err.kind(),
                        reason: failure_reason(&err),
                    },
                );
                Err(err)
            }
        }
    }
}

fn check_kind(
    id: &RecordId,
    path: &str,
    record: Rc<Record>,
    expected: &[RecordKind],
) -> Result<Rc<Record>> {
    if expected.contains(&record.kind()) {
        return Ok(record);
    }
    let wanted = expected
        .iter()
        .map(|kind| kind.type_name())
        .collect::<Vec<_>>()
        .join(" | ");
    Err(ConvertError::resolution(
        id.as_str(),
        path,
        format!("expected {wanted}, found {}", record.kind()),
    ))
}

fn source_failure(id: &str, path: &str, err: &SourceError) -> ConvertError {
    ConvertError::resolution(id, path, err.to_string())
}

/// A missing type tag or missing structural field is a malformed bundle;
/// a tag outside the expected set is a resolution failure.
fn decode_failure(id: &str, path: &str, err: DecodeError) -> ConvertError {
    match err {
        DecodeError::UnknownType(_) | DecodeError::UnexpectedType { .. } => {
            ConvertError::resolution(id, path, err.to_string())
        }
        other => other.into_convert_error(path),
    }
}

fn failure_reason(err: &ConvertError) -> String {
    match err {
        ConvertError::Resolution { reason, .. }
        | ConvertError::Projection { reason, .. }
        | ConvertError::MalformedBundle { reason, .. } => reason.clone(),
        other => other.to_string(),
    }
}

fn rebuild_failure(id: &str, path: &str, failure: &Failure) -> ConvertError {
    match failure.kind {
        ErrorKind::Projection => ConvertError::projection(path, failure.reason.clone()),
        ErrorKind::MalformedBundle => ConvertError::malformed(path, failure.reason.clone()),
        _ => ConvertError::resolution(id, path, failure.reason.clone()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::source::MemorySource;

    fn s(value: &str) -> serde_json::Value {
        json!({"_type": {"_name": "String"}, "_value": value})
    }

    fn summary_doc(name: &str) -> serde_json::Value {
        json!({
            "_type": {"_name": "ActionTestSummary"},
            "name": s(name),
            "testStatus": s("Success")
        })
    }

    fn source_with(id: &str, doc: serde_json::Value) -> MemorySource {
        let mut source = MemorySource::new(json!({
            "_type": {"_name": "ActionsInvocationRecord"},
            "actions": {"_values": []}
        }));
        source.insert(RecordId::new(id).unwrap(), doc);
        source
    }

    fn reference(id: &str) -> Reference {
        Reference::new(RecordId::new(id).unwrap())
    }

    #[test]
    fn resolution_is_cached() {
        let mut resolver = Resolver::new(source_with("0~a", summary_doc("testA()")));
        let path = RecordPath::root();

        let first = resolver
            .resolve(&reference("0~a"), &[RecordKind::TestSummary], &path)
            .unwrap();
        let second = resolver
            .resolve(&reference("0~a"), &[RecordKind::TestSummary], &path)
            .unwrap();

        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(resolver.stats().fetches, 1);
        assert_eq!(resolver.stats().cache_hits, 1);
        let source = resolver.into_source();
        assert_eq!(source.fetches_of(&RecordId::new("0~a").unwrap()), 1);
    }

    #[test]
    fn missing_document_is_resolution_error_and_not_refetched() {
        let mut resolver = Resolver::new(source_with("0~a", summary_doc("testA()")));
        let path = RecordPath::root().field("summaryRef");

        let err = resolver
            .resolve(&reference("0~gone"), &[RecordKind::TestSummary], &path)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(err.to_string().contains("0~gone"));

        let again = resolver
            .resolve(&reference("0~gone"), &[RecordKind::TestSummary], &path)
            .unwrap_err();
        assert_eq!(again.kind(), ErrorKind::Resolution);
        assert_eq!(resolver.stats().fetches, 1);
        assert_eq!(resolver.stats().failures, 1);
    }

    #[test]
    fn kind_mismatch_is_resolution_error() {
        let mut resolver = Resolver::new(source_with("0~a", summary_doc("testA()")));
        let err = resolver
            .resolve(
                &reference("0~a"),
                &[RecordKind::TestAttachment],
                &RecordPath::root(),
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
        assert!(resolver.is_cached(&RecordId::new("0~a").unwrap()));
    }

    #[test]
    fn missing_type_tag_is_malformed_bundle() {
        let mut resolver = Resolver::new(source_with("0~a", json!({"name": s("x")})));
        let err = resolver
            .resolve(&reference("0~a"), &[RecordKind::TestSummary], &RecordPath::root())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedBundle);
    }

    #[test]
    fn root_is_cached_and_checked() {
        let mut resolver = Resolver::new(source_with("0~a", summary_doc("x")));
        let a = resolver.resolve_root().unwrap();
        let b = resolver.resolve_root().unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(resolver.stats().fetches, 1);

        let mut wrong_root = Resolver::new(MemorySource::new(summary_doc("x")));
        assert_eq!(
            wrong_root.resolve_root().unwrap_err().kind(),
            ErrorKind::Resolution
        );

        let mut no_root = Resolver::new(MemorySource::default());
        assert_eq!(no_root.resolve_root().unwrap_err().kind(), ErrorKind::Resolution);
    }
}
