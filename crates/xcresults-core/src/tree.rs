//! The materialized, reference-free view of one bundle.
//!
//! Built once by the walker, read once by the projector. Children appear in
//! source encounter order; every node keeps the rendered path it was found at.

use xcresults_types::{RecordId, Warning};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedTree {
    pub actions: Vec<ResolvedAction>,
    /// Non-fatal findings from the walk, in encounter order.
    pub warnings: Vec<Warning>,
}

impl ResolvedTree {
    /// Number of test leaves in the tree.
    #[must_use]
    pub fn test_count(&self) -> usize {
        self.actions
            .iter()
            .flat_map(|action| &action.plans)
            .flat_map(|plan| &plan.testables)
            .map(|testable| count_tests(&testable.nodes))
            .sum()
    }
}

fn count_tests(nodes: &[TestNode]) -> usize {
    nodes
        .iter()
        .map(|node| match node {
            TestNode::Group(group) => count_tests(&group.children),
            TestNode::Test(_) => 1,
        })
        .sum()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAction {
    /// Position in the invocation's `actions` list.
    pub index: usize,
    pub title: Option<String>,
    pub started_time: Option<String>,
    pub run_destination: Option<String>,
    pub plans: Vec<ResolvedPlan>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlan {
    pub name: Option<String>,
    pub testables: Vec<ResolvedTestable>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTestable {
    pub name: Option<String>,
    pub target_name: Option<String>,
    pub path: String,
    pub nodes: Vec<TestNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TestNode {
    Group(ResolvedGroup),
    Test(ResolvedTest),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGroup {
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub path: String,
    pub children: Vec<TestNode>,
}

/// One executed test case, merged from its metadata and full summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTest {
    /// Identifier of the `ActionTestSummary` document, when it was linked.
    pub summary_id: Option<RecordId>,
    pub path: String,
    pub name: Option<String>,
    pub identifier: Option<String>,
    pub test_status: Option<String>,
    /// Seconds.
    pub duration: Option<f64>,
    pub activities: Vec<ResolvedActivity>,
    pub failures: Vec<ResolvedFailure>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedActivity {
    pub title: Option<String>,
    pub activity_type: Option<String>,
    pub start: Option<String>,
    pub finish: Option<String>,
    pub path: String,
    pub attachments: Vec<ResolvedAttachment>,
    pub children: Vec<ResolvedActivity>,
}

impl ResolvedActivity {
    #[must_use]
    pub fn display_title(&self) -> Option<&str> {
        self.title.as_deref().or(self.activity_type.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFailure {
    pub message: Option<String>,
    pub file_name: Option<String>,
    pub line_number: Option<i64>,
    pub attachments: Vec<ResolvedAttachment>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAttachment {
    pub filename: String,
    pub name: Option<String>,
    pub uniform_type_identifier: Option<String>,
    pub payload: RecordId,
}
