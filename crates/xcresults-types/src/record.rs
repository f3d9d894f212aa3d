//! Source-side records.
//!
//! The bundle is a graph of JSON documents linked by opaque identifiers. Each
//! document decodes into exactly one [`Record`] variant; a tag outside the
//! closed [`RecordKind`] set is a decode error, never a dynamic fallback.
//!
//! Child lists are kept as [`ChildSlot`]s: an inline child is decoded eagerly,
//! a `Reference` is left for the resolver, and an undecodable element is kept
//! with its error so the walker can decide whether it is fatal.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use xcresults_error::ConvertError;

use crate::value::{
    self, array_field, as_reference, f64_field, i64_field, owned_string, reference_field,
    required_array, type_name,
};

/// Opaque, non-empty record identifier (e.g. `0~3mH1...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, DecodeError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DecodeError::BadValue {
                field: "id",
                detail: "reference identifier is empty".to_owned(),
            });
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A link to another document plus the type the linking record expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reference {
    pub id: RecordId,
    pub target_type: Option<String>,
}

impl Reference {
    #[must_use]
    pub fn new(id: RecordId) -> Self {
        Self {
            id,
            target_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("record has no `_type._name` tag")]
    MissingTypeTag,

    #[error("unknown record type `{0}`")]
    UnknownType(String),

    #[error("expected {expected}, found `{found}`")]
    UnexpectedType { expected: String, found: String },

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` is malformed: {detail}")]
    BadValue { field: &'static str, detail: String },
}

impl DecodeError {
    /// Classify a decode failure of an inline (already retrieved) record.
    ///
    /// Structural problems are `MalformedBundle`; a present but unusable
    /// value is a `Projection` failure.
    #[must_use]
    pub fn into_convert_error(self, path: &str) -> ConvertError {
        match self {
            Self::BadValue { .. } => ConvertError::projection(path, self.to_string()),
            Self::MissingTypeTag
            | Self::UnknownType(_)
            | Self::UnexpectedType { .. }
            | Self::MissingField(_) => ConvertError::malformed(path, self.to_string()),
        }
    }
}

/// Closed set of record kinds the walker understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    ActionInvocation,
    TestPlanRunSummaries,
    TestableSummary,
    TestSummaryGroup,
    TestMetadata,
    TestSummary,
    TestAttachment,
}

impl RecordKind {
    pub const ALL: [Self; 7] = [
        Self::ActionInvocation,
        Self::TestPlanRunSummaries,
        Self::TestableSummary,
        Self::TestSummaryGroup,
        Self::TestMetadata,
        Self::TestSummary,
        Self::TestAttachment,
    ];

    /// Kinds accepted in a `tests` / `subtests` slot.
    pub const TEST_NODES: [Self; 3] = [Self::TestSummaryGroup, Self::TestMetadata, Self::TestSummary];

    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::ActionInvocation => "ActionsInvocationRecord",
            Self::TestPlanRunSummaries => "ActionTestPlanRunSummaries",
            Self::TestableSummary => "ActionTestableSummary",
            Self::TestSummaryGroup => "ActionTestSummaryGroup",
            Self::TestMetadata => "ActionTestMetadata",
            Self::TestSummary => "ActionTestSummary",
            Self::TestAttachment => "ActionTestAttachment",
        }
    }

    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

fn describe_kinds(kinds: &[RecordKind]) -> String {
    kinds
        .iter()
        .map(|kind| kind.type_name())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// A child list element.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildSlot {
    Inline(Box<Record>),
    Linked(Reference),
    Undecodable(DecodeError),
}

impl ChildSlot {
    fn decode(node: &Value, expected: &[RecordKind]) -> Self {
        match as_reference(node) {
            Ok(Some(reference)) => Self::Linked(reference),
            Ok(None) => match Record::decode_as(node, expected) {
                Ok(record) => Self::Inline(Box::new(record)),
                Err(err) => Self::Undecodable(err),
            },
            Err(err) => Self::Undecodable(err),
        }
    }

    fn decode_all(nodes: &[Value], expected: &[RecordKind]) -> Vec<Self> {
        nodes
            .iter()
            .map(|node| Self::decode(node, expected))
            .collect()
    }
}

/// One decoded document (or inline object) from the bundle.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    ActionInvocation(ActionsInvocation),
    TestPlanRunSummaries(TestPlanRunSummaries),
    TestableSummary(TestableSummary),
    TestSummaryGroup(TestSummaryGroup),
    TestMetadata(TestMetadata),
    TestSummary(TestSummary),
    TestAttachment(TestAttachment),
}

impl Record {
    #[must_use]
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::ActionInvocation(_) => RecordKind::ActionInvocation,
            Self::TestPlanRunSummaries(_) => RecordKind::TestPlanRunSummaries,
            Self::TestableSummary(_) => RecordKind::TestableSummary,
            Self::TestSummaryGroup(_) => RecordKind::TestSummaryGroup,
            Self::TestMetadata(_) => RecordKind::TestMetadata,
            Self::TestSummary(_) => RecordKind::TestSummary,
            Self::TestAttachment(_) => RecordKind::TestAttachment,
        }
    }

    /// Decode any known record kind.
    pub fn decode(node: &Value) -> Result<Self, DecodeError> {
        Self::decode_as(node, &RecordKind::ALL)
    }

    /// Decode a record whose tag must be one of `expected`.
    pub fn decode_as(node: &Value, expected: &[RecordKind]) -> Result<Self, DecodeError> {
        let tag = type_name(node).ok_or(DecodeError::MissingTypeTag)?;
        let kind =
            RecordKind::from_type_name(tag).ok_or_else(|| DecodeError::UnknownType(tag.to_owned()))?;
        if !expected.contains(&kind) {
            return Err(DecodeError::UnexpectedType {
                expected: describe_kinds(expected),
                found: tag.to_owned(),
            });
        }
        Ok(match kind {
            RecordKind::ActionInvocation => Self::ActionInvocation(ActionsInvocation::decode(node)?),
            RecordKind::TestPlanRunSummaries => {
                Self::TestPlanRunSummaries(TestPlanRunSummaries::decode(node)?)
            }
            RecordKind::TestableSummary => Self::TestableSummary(TestableSummary::decode(node)?),
            RecordKind::TestSummaryGroup => Self::TestSummaryGroup(TestSummaryGroup::decode(node)?),
            RecordKind::TestMetadata => Self::TestMetadata(TestMetadata::decode(node)?),
            RecordKind::TestSummary => Self::TestSummary(TestSummary::decode(node)?),
            RecordKind::TestAttachment => Self::TestAttachment(TestAttachment::decode(node)),
        })
    }
}

/// Root document: `ActionsInvocationRecord`.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionsInvocation {
    pub actions: Vec<ActionRecord>,
}

impl ActionsInvocation {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let actions = required_array(node, "actions")?
            .iter()
            .map(ActionRecord::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { actions })
    }
}

/// One scheme action (build, test, ...) embedded in the invocation record.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRecord {
    pub title: Option<String>,
    pub started_time: Option<String>,
    pub run_destination: Option<String>,
    /// `actionResult.testsRef`; absent for actions that ran no tests.
    pub tests_ref: Option<Reference>,
}

impl ActionRecord {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let run_destination = node
            .get("runDestination")
            .and_then(|destination| owned_string(destination, "displayName"));
        let tests_ref = match node.get("actionResult") {
            Some(result) => reference_field(result, "testsRef")?,
            None => None,
        };
        Ok(Self {
            title: owned_string(node, "title"),
            started_time: owned_string(node, "startedTime"),
            run_destination,
            tests_ref,
        })
    }
}

/// `ActionTestPlanRunSummaries`, the target of an action's `testsRef`.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlanRunSummaries {
    pub summaries: Vec<TestPlanRunSummary>,
}

impl TestPlanRunSummaries {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let summaries = required_array(node, "summaries")?
            .iter()
            .map(|summary| TestPlanRunSummary {
                name: owned_string(summary, "name"),
                testables: ChildSlot::decode_all(
                    array_field(summary, "testableSummaries"),
                    &[RecordKind::TestableSummary],
                ),
            })
            .collect();
        Ok(Self { summaries })
    }
}

/// One test plan configuration run.
#[derive(Debug, Clone, PartialEq)]
pub struct TestPlanRunSummary {
    pub name: Option<String>,
    pub testables: Vec<ChildSlot>,
}

/// `ActionTestableSummary`: one test bundle target.
#[derive(Debug, Clone, PartialEq)]
pub struct TestableSummary {
    pub name: Option<String>,
    pub target_name: Option<String>,
    pub identifier: Option<String>,
    /// Whether the record carried a `tests` list at all.
    pub has_tests: bool,
    pub tests: Vec<ChildSlot>,
}

impl TestableSummary {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let has_tests = node
            .get("tests")
            .is_some_and(|tests| tests.get(value::VALUES).is_some());
        Ok(Self {
            name: owned_string(node, "name"),
            target_name: owned_string(node, "targetName"),
            identifier: owned_string(node, "identifier"),
            has_tests,
            tests: ChildSlot::decode_all(array_field(node, "tests"), &RecordKind::TEST_NODES),
        })
    }
}

/// `ActionTestSummaryGroup`: a suite level (bundle, class, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummaryGroup {
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub duration: Option<f64>,
    pub subtests: Vec<ChildSlot>,
}

impl TestSummaryGroup {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            name: owned_string(node, "name"),
            identifier: owned_string(node, "identifier"),
            duration: f64_field(node, "duration")?,
            subtests: ChildSlot::decode_all(array_field(node, "subtests"), &RecordKind::TEST_NODES),
        })
    }
}

/// `ActionTestMetadata`: a leaf in the test tree, optionally linking to its
/// full summary.
#[derive(Debug, Clone, PartialEq)]
pub struct TestMetadata {
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub test_status: Option<String>,
    pub duration: Option<f64>,
    pub summary_ref: Option<Reference>,
}

impl TestMetadata {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            name: owned_string(node, "name"),
            identifier: owned_string(node, "identifier"),
            test_status: owned_string(node, "testStatus"),
            duration: f64_field(node, "duration")?,
            summary_ref: reference_field(node, "summaryRef")?,
        })
    }

    /// View the metadata as a summary with no activities.
    #[must_use]
    pub fn to_summary(&self) -> TestSummary {
        TestSummary {
            name: self.name.clone(),
            identifier: self.identifier.clone(),
            test_status: self.test_status.clone(),
            duration: self.duration,
            activities: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// `ActionTestSummary`: the full result of one test case execution.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub test_status: Option<String>,
    pub duration: Option<f64>,
    pub activities: Vec<ActivitySummary>,
    pub failures: Vec<FailureSummary>,
}

impl TestSummary {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let activities = array_field(node, "activitySummaries")
            .iter()
            .map(ActivitySummary::decode)
            .collect::<Result<Vec<_>, _>>()?;
        let failures = array_field(node, "failureSummaries")
            .iter()
            .map(FailureSummary::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: owned_string(node, "name"),
            identifier: owned_string(node, "identifier"),
            test_status: owned_string(node, "testStatus"),
            duration: f64_field(node, "duration")?,
            activities,
            failures,
        })
    }
}

/// `ActionTestActivitySummary`
#[derive(Debug, Clone, PartialEq)]
pub struct ActivitySummary {
    pub title: Option<String>,
    pub activity_type: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    pub attachments: Vec<ChildSlot>,
    pub subactivities: Vec<ActivitySummary>,
}

impl ActivitySummary {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        let subactivities = array_field(node, "subactivities")
            .iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            title: owned_string(node, "title"),
            activity_type: owned_string(node, "activityType"),
            start: owned_string(node, "start"),
            finish: owned_string(node, "finish"),
            attachments: ChildSlot::decode_all(
                array_field(node, "attachments"),
                &[RecordKind::TestAttachment],
            ),
            subactivities,
        })
    }

    /// Display title, falling back to the activity type.
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.activity_type.as_deref())
    }
}

/// `ActionTestFailureSummary`
#[derive(Debug, Clone, PartialEq)]
pub struct FailureSummary {
    pub message: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<i64>,
    pub attachments: Vec<ChildSlot>,
}

impl FailureSummary {
    fn decode(node: &Value) -> Result<Self, DecodeError> {
        Ok(Self {
            message: owned_string(node, "message"),
            file_name: owned_string(node, "fileName"),
            line_number: i64_field(node, "lineNumber")?,
            attachments: ChildSlot::decode_all(
                array_field(node, "attachments"),
                &[RecordKind::TestAttachment],
            ),
        })
    }
}

/// `ActionTestAttachment`. Every field is optional at decode time; the walker
/// decides whether the attachment is usable.
#[derive(Debug, Clone, PartialEq)]
pub struct TestAttachment {
    pub filename: Option<String>,
    pub name: Option<String>,
    pub uniform_type_identifier: Option<String>,
    pub payload_ref: Result<Option<Reference>, DecodeError>,
    pub timestamp: Option<String>,
}

impl TestAttachment {
    fn decode(node: &Value) -> Self {
        Self {
            filename: owned_string(node, "filename"),
            name: owned_string(node, "name"),
            uniform_type_identifier: owned_string(node, "uniformTypeIdentifier"),
            payload_ref: reference_field(node, "payloadRef"),
            timestamp: owned_string(node, "timestamp"),
        }
    }
}
