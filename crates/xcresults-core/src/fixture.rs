//! Synthetic bundles in the `xcresulttool get --format json` shape.
//!
//! Used by unit tests, the integration suite and the CLI tests. Builders
//! return plain [`Value`]s so callers can tweak any field with
//! [`with_field`] before handing them to a [`BundleBuilder`].

use serde_json::{Map, Value, json};
use xcresults_types::RecordId;

use crate::source::MemorySource;

/// A valid `startedTime` for actions.
pub const DEFAULT_START: &str = "2023-02-27T10:15:30.000+0000";

const USER_ACTIVITY: &str = "com.apple.dt.xctest.activity-type.userCreated";

// ── Scalars ─────────────────────────────────────────────────────────────

#[must_use]
pub fn string(value: &str) -> Value {
    json!({"_type": {"_name": "String"}, "_value": value})
}

#[must_use]
pub fn double(value: f64) -> Value {
    json!({"_type": {"_name": "Double"}, "_value": value.to_string()})
}

#[must_use]
pub fn int(value: i64) -> Value {
    json!({"_type": {"_name": "Int"}, "_value": value.to_string()})
}

#[must_use]
pub fn date(value: &str) -> Value {
    json!({"_type": {"_name": "Date"}, "_value": value})
}

#[must_use]
pub fn array(items: Vec<Value>) -> Value {
    json!({"_type": {"_name": "Array"}, "_values": items})
}

#[must_use]
pub fn reference(id: &str) -> Value {
    json!({
        "_type": {"_name": "Reference"},
        "id": string(id),
    })
}

/// An object tagged `type_name` with the given fields.
#[must_use]
pub fn typed(type_name: &str, fields: Vec<(&str, Value)>) -> Value {
    let mut object = Map::new();
    object.insert("_type".to_owned(), json!({"_name": type_name}));
    for (name, value) in fields {
        object.insert(name.to_owned(), value);
    }
    Value::Object(object)
}

/// `node` with `field` set (or replaced).
#[must_use]
pub fn with_field(mut node: Value, field: &str, value: Value) -> Value {
    if let Value::Object(object) = &mut node {
        object.insert(field.to_owned(), value);
    }
    node
}

/// `node` with `field` removed.
#[must_use]
pub fn without_field(mut node: Value, field: &str) -> Value {
    if let Value::Object(object) = &mut node {
        object.remove(field);
    }
    node
}

// ── Records ─────────────────────────────────────────────────────────────

/// `ActionTestSummary` document.
#[must_use]
pub fn test_summary(name: &str, status: Option<&str>, duration: Option<f64>) -> Value {
    let mut fields = vec![
        ("name", string(name)),
        ("identifier", string(&format!("Tests/{name}"))),
    ];
    if let Some(status) = status {
        fields.push(("testStatus", string(status)));
    }
    if let Some(duration) = duration {
        fields.push(("duration", double(duration)));
    }
    typed("ActionTestSummary", fields)
}

#[must_use]
pub fn with_activities(summary: Value, activities: Vec<Value>) -> Value {
    with_field(summary, "activitySummaries", array(activities))
}

#[must_use]
pub fn with_failures(summary: Value, failures: Vec<Value>) -> Value {
    with_field(summary, "failureSummaries", array(failures))
}

/// `ActionTestMetadata` leaf, optionally linking its summary document.
#[must_use]
pub fn metadata(name: &str, status: Option<&str>, summary_ref: Option<&str>) -> Value {
    let mut fields = vec![
        ("name", string(name)),
        ("identifier", string(&format!("Tests/{name}"))),
    ];
    if let Some(status) = status {
        fields.push(("testStatus", string(status)));
    }
    if let Some(id) = summary_ref {
        fields.push(("summaryRef", reference(id)));
    }
    typed("ActionTestMetadata", fields)
}

#[must_use]
pub fn group(name: &str, subtests: Vec<Value>) -> Value {
    typed(
        "ActionTestSummaryGroup",
        vec![
            ("name", string(name)),
            ("identifier", string(name)),
            ("subtests", array(subtests)),
        ],
    )
}

#[must_use]
pub fn testable(name: &str, tests: Vec<Value>) -> Value {
    typed(
        "ActionTestableSummary",
        vec![
            ("name", string(name)),
            ("targetName", string(name)),
            ("tests", array(tests)),
        ],
    )
}

/// A testable whose record carries no `tests` list.
#[must_use]
pub fn testable_without_tests(name: &str) -> Value {
    typed(
        "ActionTestableSummary",
        vec![("name", string(name)), ("targetName", string(name))],
    )
}

#[must_use]
pub fn activity(title: &str, attachments: Vec<Value>, subactivities: Vec<Value>) -> Value {
    typed(
        "ActionTestActivitySummary",
        vec![
            ("title", string(title)),
            ("activityType", string(USER_ACTIVITY)),
            ("attachments", array(attachments)),
            ("subactivities", array(subactivities)),
        ],
    )
}

/// `activity` with `start` and `finish` dates.
#[must_use]
pub fn timed_activity(title: &str, start: &str, finish: &str, subactivities: Vec<Value>) -> Value {
    let node = activity(title, Vec::new(), subactivities);
    let node = with_field(node, "start", date(start));
    with_field(node, "finish", date(finish))
}

#[must_use]
pub fn failure(message: &str, file: &str, line: i64, attachments: Vec<Value>) -> Value {
    typed(
        "ActionTestFailureSummary",
        vec![
            ("message", string(message)),
            ("fileName", string(file)),
            ("lineNumber", int(line)),
            ("attachments", array(attachments)),
        ],
    )
}

/// Inline `ActionTestAttachment` with a payload reference.
#[must_use]
pub fn attachment(filename: &str, uti: Option<&str>, payload_id: &str) -> Value {
    let mut fields = vec![
        ("filename", string(filename)),
        ("payloadRef", reference(payload_id)),
    ];
    if let Some(uti) = uti {
        fields.push(("uniformTypeIdentifier", string(uti)));
    }
    typed("ActionTestAttachment", fields)
}

// ── Bundle ──────────────────────────────────────────────────────────────

/// Assembles a root `ActionsInvocationRecord` and its linked documents.
#[derive(Debug, Clone, Default)]
pub struct BundleBuilder {
    actions: Vec<Value>,
    documents: Vec<(String, Value)>,
    next_id: usize,
}

impl BundleBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under an explicit identifier.
    pub fn document(&mut self, id: &str, document: Value) -> &mut Self {
        self.documents.push((id.to_owned(), document));
        self
    }

    /// Register a test summary document and return its generated identifier.
    pub fn summary_doc(&mut self, summary: Value) -> String {
        let id = self.fresh_id("summary");
        self.documents.push((id.clone(), summary));
        id
    }

    /// Add a test action whose plan run holds `testables`; returns the
    /// identifier of the generated `ActionTestPlanRunSummaries` document.
    pub fn action(
        &mut self,
        run_destination: &str,
        started_time: Option<&str>,
        testables: Vec<Value>,
    ) -> String {
        let id = self.fresh_id("tests");
        let plans = typed(
            "ActionTestPlanRunSummaries",
            vec![(
                "summaries",
                array(vec![typed(
                    "ActionTestPlanRunSummary",
                    vec![
                        ("name", string("Test Scheme Action")),
                        ("testableSummaries", array(testables)),
                    ],
                )]),
            )],
        );
        self.documents.push((id.clone(), plans));
        self.action_with_ref(run_destination, started_time, &id);
        id
    }

    /// Add a test action pointing at `tests_id`, which may not exist.
    pub fn action_with_ref(
        &mut self,
        run_destination: &str,
        started_time: Option<&str>,
        tests_id: &str,
    ) -> &mut Self {
        let mut fields = vec![
            ("title", string("Test")),
            (
                "runDestination",
                typed(
                    "ActionRunDestinationRecord",
                    vec![("displayName", string(run_destination))],
                ),
            ),
            (
                "actionResult",
                typed("ActionResult", vec![("testsRef", reference(tests_id))]),
            ),
        ];
        if let Some(started) = started_time {
            fields.push(("startedTime", date(started)));
        }
        self.actions.push(typed("ActionRecord", fields));
        self
    }

    /// Add an action that ran no tests (no `testsRef`).
    pub fn build_only_action(&mut self, title: &str) -> &mut Self {
        self.actions.push(typed(
            "ActionRecord",
            vec![
                ("title", string(title)),
                ("actionResult", typed("ActionResult", Vec::new())),
            ],
        ));
        self
    }

    #[must_use]
    pub fn root(&self) -> Value {
        typed(
            "ActionsInvocationRecord",
            vec![("actions", array(self.actions.clone()))],
        )
    }

    /// Every registered document (not the root), keyed by identifier.
    #[must_use]
    pub fn documents(&self) -> Vec<(String, Value)> {
        self.documents.clone()
    }

    #[must_use]
    pub fn build(&self) -> MemorySource {
        let mut source = MemorySource::new(self.root());
        for (id, document) in &self.documents {
            if let Ok(id) = RecordId::new(id.as_str()) {
                source.insert(id, document.clone());
            }
        }
        source
    }

    fn fresh_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("0~{prefix}-{}", self.next_id)
    }
}
