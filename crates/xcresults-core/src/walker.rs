//! Graph Walker: depth-first materialization of the bundle.
//!
//! Field order per record: actions → test plan summaries → testable
//! summaries → test groups / summaries → activities → attachments.
//!
//! Required children (test plan summaries, testables, test nodes, linked test
//! summaries) abort the walk when they fail to resolve. Attachments are
//! optional: a failure becomes a warning and the attachment is omitted.
//!
//! The resolver cache alone does not bound recursion on a cyclic bundle, so
//! the walker keeps the identifiers open on the current path and cuts any
//! branch that re-enters one of them.

use std::rc::Rc;

use smallvec::SmallVec;
use tracing::{debug, info, warn};
use xcresults_error::{ConvertError, Result};
use xcresults_types::record::{ActivitySummary, FailureSummary, TestMetadata, TestSummary};
use xcresults_types::{
    ChildSlot, Record, RecordId, RecordKind, RecordPath, Reference, Warning, WarningKind,
};

use crate::resolver::Resolver;
use crate::source::DocumentSource;
use crate::tree::{
    ResolvedAction, ResolvedActivity, ResolvedAttachment, ResolvedFailure, ResolvedGroup,
    ResolvedPlan, ResolvedTest, ResolvedTestable, ResolvedTree, TestNode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Requirement {
    Required,
    /// Failures become warnings of this kind.
    Optional(WarningKind),
}

pub struct GraphWalker<'r, S> {
    resolver: &'r mut Resolver<S>,
    open: SmallVec<[RecordId; 8]>,
    warnings: Vec<Warning>,
}

impl<'r, S: DocumentSource> GraphWalker<'r, S> {
    pub fn new(resolver: &'r mut Resolver<S>) -> Self {
        Self {
            resolver,
            open: SmallVec::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolve the root and everything reachable from it.
    pub fn walk(mut self) -> Result<ResolvedTree> {
        let root = self.resolver.resolve_root()?;
        let root_path = RecordPath::root();
        let Record::ActionInvocation(invocation) = root.as_ref() else {
            return Err(unexpected(&root_path, &root));
        };

        let mut actions = Vec::with_capacity(invocation.actions.len());
        for (index, action) in invocation.actions.iter().enumerate() {
            let path = root_path.index("actions", index);
            let Some(tests_ref) = &action.tests_ref else {
                debug!(path = %path, title = ?action.title, "action ran no tests");
                continue;
            };
            let plans = self.walk_plans(tests_ref, &path)?;
            actions.push(ResolvedAction {
                index,
                title: action.title.clone(),
                started_time: action.started_time.clone(),
                run_destination: action.run_destination.clone(),
                plans,
            });
        }

        let tree = ResolvedTree {
            actions,
            warnings: self.warnings,
        };
        let stats = self.resolver.stats();
        info!(
            actions = tree.actions.len(),
            tests = tree.test_count(),
            warnings = tree.warnings.len(),
            fetches = stats.fetches,
            cache_hits = stats.cache_hits,
            "bundle graph materialized"
        );
        Ok(tree)
    }

    fn walk_plans(&mut self, tests_ref: &Reference, path: &RecordPath) -> Result<Vec<ResolvedPlan>> {
        let path = path.reference("testsRef", tests_ref.id.as_str());
        let Some(record) = self.enter(
            tests_ref,
            &[RecordKind::TestPlanRunSummaries],
            &path,
            Requirement::Required,
        )?
        else {
            return Ok(Vec::new());
        };
        let Record::TestPlanRunSummaries(run) = record.as_ref() else {
            return Err(unexpected(&path, &record));
        };

        let mut plans = Vec::with_capacity(run.summaries.len());
        for (index, summary) in run.summaries.iter().enumerate() {
            let summary_path = path.index("summaries", index);
            let mut testables = Vec::with_capacity(summary.testables.len());
            for (slot_index, slot) in summary.testables.iter().enumerate() {
                let slot_path = summary_path.index("testableSummaries", slot_index);
                let testable = self.visit_slot(
                    slot,
                    &[RecordKind::TestableSummary],
                    &slot_path,
                    Requirement::Required,
                    |walker, record, path| walker.walk_testable(record, path),
                )?;
                testables.extend(testable);
            }
            plans.push(ResolvedPlan {
                name: summary.name.clone(),
                testables,
            });
        }

        self.leave(&tests_ref.id);
        Ok(plans)
    }

    fn walk_testable(&mut self, record: &Record, path: &RecordPath) -> Result<ResolvedTestable> {
        let Record::TestableSummary(testable) = record else {
            return Err(unexpected(path, record));
        };
        if !testable.has_tests {
            let label = testable
                .name
                .as_deref()
                .or(testable.target_name.as_deref())
                .unwrap_or("<unnamed>");
            self.warn(
                WarningKind::EmptyTestable,
                path,
                format!("no tests found for '{label}'"),
            );
        }

        let mut nodes = Vec::with_capacity(testable.tests.len());
        for (index, slot) in testable.tests.iter().enumerate() {
            self.walk_test_slot(slot, &path.index("tests", index), &mut nodes)?;
        }
        Ok(ResolvedTestable {
            name: testable.name.clone(),
            target_name: testable.target_name.clone(),
            path: path.to_string(),
            nodes,
        })
    }

    fn walk_test_slot(
        &mut self,
        slot: &ChildSlot,
        path: &RecordPath,
        out: &mut Vec<TestNode>,
    ) -> Result<()> {
        let node = self.visit_slot(
            slot,
            &RecordKind::TEST_NODES,
            path,
            Requirement::Required,
            |walker, record, path| walker.walk_test_node(record, path),
        )?;
        out.extend(node.flatten());
        Ok(())
    }

    fn walk_test_node(&mut self, record: &Record, path: &RecordPath) -> Result<Option<TestNode>> {
        match record {
            Record::TestSummaryGroup(group) => {
                let mut children = Vec::with_capacity(group.subtests.len());
                for (index, slot) in group.subtests.iter().enumerate() {
                    self.walk_test_slot(slot, &path.index("subtests", index), &mut children)?;
                }
                Ok(Some(TestNode::Group(ResolvedGroup {
                    name: group.name.clone(),
                    identifier: group.identifier.clone(),
                    path: path.to_string(),
                    children,
                })))
            }
            Record::TestMetadata(metadata) => self.walk_metadata(metadata, path),
            Record::TestSummary(summary) => {
                let test = self.resolve_test(summary, None, None, path)?;
                Ok(Some(TestNode::Test(test)))
            }
            other => Err(unexpected(path, other)),
        }
    }

    /// A metadata leaf either links its full summary (required) or stands in
    /// for it.
    fn walk_metadata(
        &mut self,
        metadata: &TestMetadata,
        path: &RecordPath,
    ) -> Result<Option<TestNode>> {
        let Some(summary_ref) = &metadata.summary_ref else {
            let test = self.resolve_test(&metadata.to_summary(), Some(metadata), None, path)?;
            return Ok(Some(TestNode::Test(test)));
        };

        let summary_path = path.reference("summaryRef", summary_ref.id.as_str());
        let Some(record) = self.enter(
            summary_ref,
            &[RecordKind::TestSummary],
            &summary_path,
            Requirement::Required,
        )?
        else {
            return Ok(None);
        };
        let Record::TestSummary(summary) = record.as_ref() else {
            return Err(unexpected(&summary_path, &record));
        };
        let test = self.resolve_test(summary, Some(metadata), Some(&summary_ref.id), &summary_path);
        self.leave(&summary_ref.id);
        Ok(Some(TestNode::Test(test?)))
    }

    fn resolve_test(
        &mut self,
        summary: &TestSummary,
        metadata: Option<&TestMetadata>,
        summary_id: Option<&RecordId>,
        path: &RecordPath,
    ) -> Result<ResolvedTest> {
        let mut activities = Vec::with_capacity(summary.activities.len());
        for (index, activity) in summary.activities.iter().enumerate() {
            activities.push(self.resolve_activity(activity, &path.index("activitySummaries", index))?);
        }
        let mut failures = Vec::with_capacity(summary.failures.len());
        for (index, failure) in summary.failures.iter().enumerate() {
            failures.push(self.resolve_failure(failure, &path.index("failureSummaries", index))?);
        }

        let fallback = |pick: fn(&TestMetadata) -> Option<String>| metadata.and_then(pick);
        Ok(ResolvedTest {
            summary_id: summary_id.cloned(),
            path: path.to_string(),
            name: summary.name.clone().or_else(|| fallback(|m| m.name.clone())),
            identifier: summary
                .identifier
                .clone()
                .or_else(|| fallback(|m| m.identifier.clone())),
            test_status: summary
                .test_status
                .clone()
                .or_else(|| fallback(|m| m.test_status.clone())),
            duration: summary.duration.or_else(|| metadata.and_then(|m| m.duration)),
            activities,
            failures,
        })
    }

    fn resolve_activity(
        &mut self,
        activity: &ActivitySummary,
        path: &RecordPath,
    ) -> Result<ResolvedActivity> {
        let attachments = self.resolve_attachments(&activity.attachments, path)?;
        let mut children = Vec::with_capacity(activity.subactivities.len());
        for (index, child) in activity.subactivities.iter().enumerate() {
            children.push(self.resolve_activity(child, &path.index("subactivities", index))?);
        }
        Ok(ResolvedActivity {
            title: activity.title.clone(),
            activity_type: activity.activity_type.clone(),
            start: activity.start.clone(),
            finish: activity.finish.clone(),
            path: path.to_string(),
            attachments,
            children,
        })
    }

    fn resolve_failure(
        &mut self,
        failure: &FailureSummary,
        path: &RecordPath,
    ) -> Result<ResolvedFailure> {
        Ok(ResolvedFailure {
            message: failure.message.clone(),
            file_name: failure.file_name.clone(),
            line_number: failure.line_number,
            attachments: self.resolve_attachments(&failure.attachments, path)?,
        })
    }

    fn resolve_attachments(
        &mut self,
        slots: &[ChildSlot],
        path: &RecordPath,
    ) -> Result<Vec<ResolvedAttachment>> {
        let mut attachments = Vec::with_capacity(slots.len());
        for (index, slot) in slots.iter().enumerate() {
            let attachment = self.visit_slot(
                slot,
                &[RecordKind::TestAttachment],
                &path.index("attachments", index),
                Requirement::Optional(WarningKind::AttachmentUnresolved),
                |walker, record, path| Ok(walker.resolve_attachment(record, path)),
            )?;
            attachments.extend(attachment.flatten());
        }
        Ok(attachments)
    }

    fn resolve_attachment(&mut self, record: &Record, path: &RecordPath) -> Option<ResolvedAttachment> {
        let Record::TestAttachment(attachment) = record else {
            self.warn(
                WarningKind::AttachmentUnresolved,
                path,
                format!("expected an attachment, found {}", record.kind()),
            );
            return None;
        };
        let Some(filename) = attachment.filename.clone().or_else(|| attachment.name.clone()) else {
            self.warn(
                WarningKind::AttachmentUnresolved,
                path,
                "attachment has neither filename nor name",
            );
            return None;
        };
        match &attachment.payload_ref {
            Ok(Some(reference)) => Some(ResolvedAttachment {
                filename,
                name: attachment.name.clone(),
                uniform_type_identifier: attachment.uniform_type_identifier.clone(),
                payload: reference.id.clone(),
            }),
            Ok(None) => {
                self.warn(
                    WarningKind::AttachmentUnresolved,
                    path,
                    format!("attachment '{filename}' has no payload reference"),
                );
                None
            }
            Err(err) => {
                self.warn(
                    WarningKind::AttachmentUnresolved,
                    path,
                    format!("attachment '{filename}' payload reference is malformed: {err}"),
                );
                None
            }
        }
    }

    /// Open a child slot and hand the record to `visit`.
    ///
    /// `Ok(None)` means the branch was cut (cycle) or an optional child was
    /// dropped with a warning.
    fn visit_slot<T>(
        &mut self,
        slot: &ChildSlot,
        expected: &[RecordKind],
        path: &RecordPath,
        requirement: Requirement,
        visit: impl FnOnce(&mut Self, &Record, &RecordPath) -> Result<T>,
    ) -> Result<Option<T>> {
        match slot {
            ChildSlot::Inline(record) => visit(self, record.as_ref(), path).map(Some),
            ChildSlot::Linked(reference) => {
                let linked_path = path.reference("ref", reference.id.as_str());
                let Some(record) = self.enter(reference, expected, &linked_path, requirement)? else {
                    return Ok(None);
                };
                let outcome = visit(self, record.as_ref(), &linked_path);
                self.leave(&reference.id);
                outcome.map(Some)
            }
            ChildSlot::Undecodable(err) => match requirement {
                Requirement::Required => Err(err.clone().into_convert_error(&path.to_string())),
                Requirement::Optional(kind) => {
                    self.warn(kind, path, err.to_string());
                    Ok(None)
                }
            },
        }
    }

    /// Resolve `reference` and mark it open on the current path.
    fn enter(
        &mut self,
        reference: &Reference,
        expected: &[RecordKind],
        path: &RecordPath,
        requirement: Requirement,
    ) -> Result<Option<Rc<Record>>> {
        if self.open.contains(&reference.id) {
            self.warn(
                WarningKind::CycleDetected,
                path,
                format!(
                    "record {} is already open on this path; branch skipped",
                    reference.id
                ),
            );
            return Ok(None);
        }
        match self.resolver.resolve(reference, expected, path) {
            Ok(record) => {
                self.open.push(reference.id.clone());
                Ok(Some(record))
            }
            Err(err) => match requirement {
                Requirement::Required => Err(err),
                Requirement::Optional(kind) => {
                    self.warn(kind, path, err.to_string());
                    Ok(None)
                }
            },
        }
    }

    fn leave(&mut self, id: &RecordId) {
        debug_assert_eq!(self.open.last(), Some(id));
        self.open.pop();
    }

    fn warn(&mut self, kind: WarningKind, path: &RecordPath, message: impl Into<String>) {
        let warning = Warning::new(kind, path.to_string(), message);
        warn!(kind = %warning.kind, path = %warning.path, "{}", warning.message);
        self.warnings.push(warning);
    }
}

fn unexpected(path: &RecordPath, record: &Record) -> ConvertError {
    ConvertError::malformed(
        path.to_string(),
        format!("unexpected {} record", record.kind()),
    )
}
