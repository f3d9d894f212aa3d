//! Allure 2 result model.
//!
//! Field names follow the Allure JSON files (`*-result.json`,
//! `*-container.json`); in-memory-only fields are `#[serde(skip)]`.

use serde::{Deserialize, Serialize};

use crate::record::RecordId;
use crate::warning::Warning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Passed,
    Failed,
    Broken,
    Skipped,
    Unknown,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Broken => "broken",
            Self::Skipped => "skipped",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatusDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub link_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Reference to externally stored attachment content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    /// File name of the content inside the report directory.
    pub source: String,
    #[serde(rename = "type")]
    pub media_type: String,
    /// Bundle identifier of the payload to export into `source`.
    #[serde(skip)]
    pub payload: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Step {
    pub fn new(name: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.into(),
            status,
            status_details: None,
            stage: Stage::Finished,
            start: None,
            stop: None,
            steps: Vec::new(),
            attachments: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    /// Instance id; also the result file name stem.
    pub uuid: String,
    /// Historic id: groups retries and parameterized variants.
    pub history_id: String,
    /// Stable id: content hash of the full name.
    pub test_case_id: String,
    pub name: String,
    pub full_name: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_details: Option<StatusDetails>,
    #[serde(default)]
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<i64>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl TestResult {
    #[must_use]
    pub fn stable_id(&self) -> &str {
        &self.test_case_id
    }

    #[must_use]
    pub fn historic_id(&self) -> &str {
        &self.history_id
    }

    /// First value of the named label.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|label| label.name == name)
            .map(|label| label.value.as_str())
    }

    /// `stop - start` when both are known.
    #[must_use]
    pub fn duration_ms(&self) -> Option<i64> {
        Some(self.stop? - self.start?)
    }

    /// Every attachment on the result and its steps, depth first.
    #[must_use]
    pub fn all_attachments(&self) -> Vec<&Attachment> {
        fn collect<'a>(steps: &'a [Step], out: &mut Vec<&'a Attachment>) {
            for step in steps {
                out.extend(step.attachments.iter());
                collect(&step.steps, out);
            }
        }
        let mut out: Vec<&Attachment> = self.attachments.iter().collect();
        collect(&self.steps, &mut out);
        out
    }

    /// Mutable counterpart of [`Self::all_attachments`].
    pub fn for_each_attachment_mut(&mut self, mut visit: impl FnMut(&mut Attachment)) {
        fn walk(steps: &mut [Step], visit: &mut impl FnMut(&mut Attachment)) {
            for step in steps {
                step.attachments.iter_mut().for_each(&mut *visit);
                walk(&mut step.steps, visit);
            }
        }
        self.attachments.iter_mut().for_each(&mut visit);
        walk(&mut self.steps, &mut visit);
    }
}

/// A suite grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub uuid: String,
    pub name: String,
    /// Uuids of nested containers and of results directly under this node.
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(skip)]
    pub parent: Option<String>,
}

/// Everything a conversion run hands to the writer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversion {
    /// Pre-order traversal order.
    pub containers: Vec<Container>,
    /// Traversal order.
    pub results: Vec<TestResult>,
    pub warnings: Vec<Warning>,
}

impl Conversion {
    #[must_use]
    pub fn attachment_count(&self) -> usize {
        self.results
            .iter()
            .map(|result| result.all_attachments().len())
            .sum()
    }

    #[must_use]
    pub fn container(&self, uuid: &str) -> Option<&Container> {
        self.containers.iter().find(|container| container.uuid == uuid)
    }
}
