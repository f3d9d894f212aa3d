//! Model Projector: [`ResolvedTree`] → Allure containers and results.
//!
//! Containers are emitted in pre-order, one per testable and one per nested
//! group; a container's children are its nested group containers and the
//! results directly under it, in source order. Results come out in traversal
//! order. Every id is derived from names and
//! positions in the tree (see [`crate::identity`]), never from clocks or
//! randomness.

use hashbrown::HashMap;
use tracing::{debug, info, warn};
use xcresults_error::{ConvertError, Result};
use xcresults_types::{
    Attachment, Container, Conversion, Label, Link, Parameter, Stage, Status, StatusDetails, Step,
    TestResult, Warning, WarningKind,
};

use crate::directives::{self, Directive};
use crate::identity;
use crate::media;
use crate::status::resolve_status;
use crate::timing;
use crate::tree::{
    ResolvedActivity, ResolvedAttachment, ResolvedFailure, ResolvedTest, ResolvedTree, TestNode,
};

/// Label value for every result produced from an xcresult bundle.
pub const FRAMEWORK: &str = "xctest";

/// Parameter name carrying a leaf's parameterization suffix.
pub const ARGUMENTS_PARAMETER: &str = "arguments";

/// Project a resolved tree onto the report model.
///
/// Fails on the first test whose status, name or suite cannot be mapped; no
/// partial conversion is returned.
pub fn project(tree: &ResolvedTree) -> Result<Conversion> {
    let mut projector = Projector::default();
    for action in &tree.actions {
        let action_path = format!("root > actions[{}]", action.index);
        let action_start = projector.date(action.started_time.as_deref(), &action_path);
        for (plan_index, plan) in action.plans.iter().enumerate() {
            for (testable_index, testable) in plan.testables.iter().enumerate() {
                let name = testable
                    .name
                    .as_deref()
                    .or(testable.target_name.as_deref())
                    .ok_or_else(|| {
                        ConvertError::projection(&testable.path, "testable has neither name nor targetName")
                    })?;
                let scope = ActionScope {
                    run_destination: action.run_destination.as_deref(),
                    target: testable.target_name.as_deref(),
                    start: action_start,
                };
                let position = format!("{}/{plan_index}/{testable_index}", action.index);
                projector.project_suite(&scope, &[], name, &position, &testable.nodes, None)?;
            }
        }
    }

    let mut warnings = tree.warnings.clone();
    warnings.append(&mut projector.warnings);
    let conversion = Conversion {
        containers: projector.containers,
        results: projector.results,
        warnings,
    };
    info!(
        containers = conversion.containers.len(),
        results = conversion.results.len(),
        attachments = conversion.attachment_count(),
        warnings = conversion.warnings.len(),
        "projection complete"
    );
    Ok(conversion)
}

/// Per-action context inherited by every result under a testable.
struct ActionScope<'t> {
    run_destination: Option<&'t str>,
    target: Option<&'t str>,
    /// Fallback start anchor (the action's `startedTime`).
    start: Option<i64>,
}

#[derive(Default)]
struct Projector {
    containers: Vec<Container>,
    results: Vec<TestResult>,
    warnings: Vec<Warning>,
    /// Occurrences of each stable id seen so far.
    occurrences: HashMap<String, usize>,
}

impl Projector {
    fn project_suite<'t>(
        &mut self,
        scope: &ActionScope<'t>,
        parents: &[&'t str],
        name: &'t str,
        position: &str,
        nodes: &'t [TestNode],
        parent: Option<&str>,
    ) -> Result<String> {
        let mut suite = Vec::with_capacity(parents.len() + 1);
        suite.extend_from_slice(parents);
        suite.push(name);

        let uuid = identity::container_uuid(position);
        let slot = self.containers.len();
        self.containers.push(Container {
            uuid: uuid.clone(),
            name: suite.join(" / "),
            children: Vec::new(),
            parent: parent.map(str::to_owned),
        });

        for (index, node) in nodes.iter().enumerate() {
            match node {
                TestNode::Group(group) => {
                    let group_name = group
                        .name
                        .as_deref()
                        .or(group.identifier.as_deref())
                        .ok_or_else(|| {
                            ConvertError::projection(&group.path, "test group has neither name nor identifier")
                        })?;
                    let child_position = format!("{position}/{index}");
                    let child = self.project_suite(
                        scope,
                        &suite,
                        group_name,
                        &child_position,
                        &group.children,
                        Some(&uuid),
                    )?;
                    self.containers[slot].children.push(child);
                }
                TestNode::Test(test) => {
                    let result = self.project_test(scope, &suite, test)?;
                    self.containers[slot].children.push(result.uuid.clone());
                    self.results.push(result);
                }
            }
        }
        Ok(uuid)
    }

    fn project_test(
        &mut self,
        scope: &ActionScope<'_>,
        suite: &[&str],
        test: &ResolvedTest,
    ) -> Result<TestResult> {
        let leaf = test
            .name
            .as_deref()
            .or(test.identifier.as_deref())
            .ok_or_else(|| ConvertError::projection(&test.path, "test has neither name nor identifier"))?;
        let status = resolve_status(test.test_status.as_deref(), &test.path)?;

        let package = suite.join(".");
        let full_name = identity::full_name(&package, leaf);
        let test_case_id = identity::stable_id(&full_name);
        let history_id = identity::historic_id(&package, leaf);
        let occurrence = self.occurrences.entry(test_case_id.clone()).or_insert(0);
        let uuid = identity::instance_uuid(&test_case_id, *occurrence);
        *occurrence += 1;

        let mut steps = StepBuilder::new(&uuid);
        let step_list = steps.build(&test.activities);
        let failure_attachments: Vec<Attachment> = test
            .failures
            .iter()
            .flat_map(|failure| &failure.attachments)
            .map(|attachment| steps.attachment(attachment))
            .collect();
        self.warnings.append(&mut steps.warnings);

        let anchor = steps.anchor.or(scope.start);
        let (start, stop) = match timing::interval(anchor, test.duration) {
            Some((start, stop)) => (Some(start), Some(stop)),
            None => {
                let duration_ms = test.duration.and_then(timing::duration_to_ms);
                let missing = match (anchor.is_some(), duration_ms.is_some()) {
                    (false, false) => "start anchor and duration",
                    (false, true) => "start anchor",
                    _ => "duration",
                };
                let mut message =
                    format!("'{leaf}' has no usable {missing}; start/stop left unknown");
                if let Some(ms) = duration_ms.filter(|_| anchor.is_none()) {
                    message.push_str(&format!(" (recorded duration {ms} ms)"));
                }
                self.warn(WarningKind::TimingUnknown, &test.path, message);
                (None, None)
            }
        };

        let status_details = failure_details(&test.failures).or_else(|| {
            (status == Status::Failed)
                .then(|| last_failed(&step_list))
                .flatten()
        });

        let mut labels = vec![
            Label::new("suite", suite.join(" / ")),
            Label::new("package", package.as_str()),
        ];
        if suite.len() > 1 {
            if let Some(class) = suite.last() {
                labels.push(Label::new("testClass", *class));
            }
        }
        labels.push(Label::new("testMethod", leaf));
        if let Some(target) = scope.target {
            labels.push(Label::new("target", target));
        }
        if let Some(destination) = scope.run_destination {
            labels.push(Label::new("runDestination", destination));
        }
        labels.push(Label::new("framework", FRAMEWORK));
        labels.append(&mut steps.labels);

        let parameters = identity::split_parameterization(leaf)
            .1
            .map(|args| Parameter {
                name: ARGUMENTS_PARAMETER.to_owned(),
                value: args.to_owned(),
            })
            .into_iter()
            .collect();

        debug!(uuid = %uuid, full_name = %full_name, status = status.as_str(), "projected result");
        Ok(TestResult {
            uuid,
            history_id,
            test_case_id,
            name: steps.name.take().unwrap_or_else(|| leaf.to_owned()),
            full_name,
            status,
            status_details,
            stage: Stage::Finished,
            start,
            stop,
            labels,
            links: steps.links,
            parameters,
            steps: step_list,
            attachments: failure_attachments,
        })
    }

    fn date(&mut self, raw: Option<&str>, path: &str) -> Option<i64> {
        let raw = raw?;
        let parsed = timing::parse_date(raw);
        if parsed.is_none() {
            self.warn(WarningKind::InvalidDate, path, format!("unparseable date `{raw}`"));
        }
        parsed
    }

    fn warn(&mut self, kind: WarningKind, path: &str, message: String) {
        push_warning(&mut self.warnings, kind, path, message);
    }
}

/// Turns one test's activity tree into steps, collecting the directives and
/// start anchor found along the way.
struct StepBuilder {
    result_uuid: String,
    attachments: usize,
    name: Option<String>,
    labels: Vec<Label>,
    links: Vec<Link>,
    anchor: Option<i64>,
    warnings: Vec<Warning>,
}

impl StepBuilder {
    fn new(result_uuid: &str) -> Self {
        Self {
            result_uuid: result_uuid.to_owned(),
            attachments: 0,
            name: None,
            labels: Vec::new(),
            links: Vec::new(),
            anchor: None,
            warnings: Vec::new(),
        }
    }

    fn build(&mut self, activities: &[ResolvedActivity]) -> Vec<Step> {
        let mut steps = Vec::with_capacity(activities.len());
        for activity in activities {
            let Some(title) = activity.display_title() else {
                continue;
            };
            if let Some(directive) = Directive::parse(title) {
                self.apply(directive);
                continue;
            }
            if directives::is_start_anchor(title) {
                let start = self.date(activity.start.as_deref(), &activity.path);
                self.anchor = self.anchor.or(start);
                continue;
            }
            steps.push(self.step(title, activity));
        }
        steps
    }

    fn step(&mut self, title: &str, activity: &ResolvedActivity) -> Step {
        let mut step = Step::new(title, Status::Passed);
        if activity.start.is_some() && activity.finish.is_some() {
            let start = self.date(activity.start.as_deref(), &activity.path);
            let stop = self.date(activity.finish.as_deref(), &activity.path);
            if let (Some(start), Some(stop)) = (start, stop) {
                step.start = Some(start);
                step.stop = Some(stop);
            }
        }
        step.steps = self.build(&activity.children);
        step.attachments = activity
            .attachments
            .iter()
            .map(|attachment| self.attachment(attachment))
            .collect();

        if directives::is_assertion_failure(title, activity.activity_type.as_deref()) {
            step.status = Status::Failed;
            step.status_details = Some(StatusDetails {
                message: Some(title.to_owned()),
                trace: None,
            });
        } else if let Some(details) = last_failed(&step.steps) {
            step.status = Status::Failed;
            step.status_details = Some(details);
        }
        step
    }

    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::Name(name) => self.name = Some(name),
            Directive::Label(label) => self.labels.push(label),
            Directive::Link(link) => self.links.push(link),
        }
    }

    fn attachment(&mut self, attachment: &ResolvedAttachment) -> Attachment {
        let media_type = media::media_type(
            attachment.uniform_type_identifier.as_deref(),
            &attachment.filename,
        );
        let extension = media::extension(&attachment.filename)
            .map(str::to_ascii_lowercase)
            .or_else(|| media::extension_for(media_type).map(str::to_owned));
        let source =
            identity::attachment_source(&self.result_uuid, self.attachments, extension.as_deref());
        self.attachments += 1;
        Attachment {
            name: attachment
                .name
                .clone()
                .unwrap_or_else(|| attachment.filename.clone()),
            source,
            media_type: media_type.to_owned(),
            payload: attachment.payload.clone(),
        }
    }

    fn date(&mut self, raw: Option<&str>, path: &str) -> Option<i64> {
        let raw = raw?;
        let parsed = timing::parse_date(raw);
        if parsed.is_none() {
            push_warning(
                &mut self.warnings,
                WarningKind::InvalidDate,
                path,
                format!("unparseable date `{raw}`"),
            );
        }
        parsed
    }
}

/// Details of the last failed step in `steps`, if any.
fn last_failed(steps: &[Step]) -> Option<StatusDetails> {
    steps
        .iter()
        .rev()
        .find(|step| step.status == Status::Failed)
        .map(|step| step.status_details.clone().unwrap_or_default())
}

/// First failure summary: its message, and `file:line` as the trace.
fn failure_details(failures: &[ResolvedFailure]) -> Option<StatusDetails> {
    let failure = failures.first()?;
    let trace = failure.file_name.as_ref().map(|file| match failure.line_number {
        Some(line) => format!("{file}:{line}"),
        None => file.clone(),
    });
    Some(StatusDetails {
        message: failure.message.clone(),
        trace,
    })
}

fn push_warning(warnings: &mut Vec<Warning>, kind: WarningKind, path: &str, message: String) {
    let warning = Warning::new(kind, path, message);
    warn!(kind = %warning.kind, path = %warning.path, "{}", warning.message);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use xcresults_error::ErrorKind;
    use xcresults_types::RecordId;

    use super::*;
    use crate::tree::{ResolvedAction, ResolvedGroup, ResolvedPlan, ResolvedTestable};

    const START: &str = "2023-02-27T10:15:30.000+0000";

    fn test(name: &str, status: Option<&str>, duration: Option<f64>) -> ResolvedTest {
        ResolvedTest {
            summary_id: None,
            path: format!("root > {name}"),
            name: Some(name.to_owned()),
            identifier: None,
            test_status: status.map(str::to_owned),
            duration,
            activities: Vec::new(),
            failures: Vec::new(),
        }
    }

    fn activity(title: &str, children: Vec<ResolvedActivity>) -> ResolvedActivity {
        ResolvedActivity {
            title: Some(title.to_owned()),
            activity_type: None,
            start: None,
            finish: None,
            path: format!("root > {title}"),
            attachments: Vec::new(),
            children,
        }
    }

    fn tree(started: Option<&str>, nodes: Vec<TestNode>) -> ResolvedTree {
        ResolvedTree {
            actions: vec![ResolvedAction {
                index: 0,
                title: Some("Test".to_owned()),
                started_time: started.map(str::to_owned),
                run_destination: Some("iPhone 15".to_owned()),
                plans: vec![ResolvedPlan {
                    name: Some("Plan".to_owned()),
                    testables: vec![ResolvedTestable {
                        name: Some("AppTests".to_owned()),
                        target_name: Some("AppTests".to_owned()),
                        path: "root > testable".to_owned(),
                        nodes,
                    }],
                }],
            }],
            warnings: Vec::new(),
        }
    }

    fn group(name: &str, children: Vec<TestNode>) -> TestNode {
        TestNode::Group(ResolvedGroup {
            name: Some(name.to_owned()),
            identifier: None,
            path: format!("root > {name}"),
            children,
        })
    }

    #[test]
    fn groups_become_nested_containers() {
        let tree = tree(
            Some(START),
            vec![group(
                "LoginTests",
                vec![TestNode::Test(test("testLogin()", Some("Success"), Some(1.0)))],
            )],
        );
        let conversion = project(&tree).unwrap();

        assert_eq!(conversion.containers.len(), 2);
        let [outer, inner] = &conversion.containers[..] else {
            panic!("expected two containers");
        };
        assert_eq!(outer.name, "AppTests");
        assert_eq!(outer.children, [inner.uuid.clone()]);
        assert_eq!(inner.name, "AppTests / LoginTests");
        assert_eq!(inner.parent.as_deref(), Some(outer.uuid.as_str()));

        let result = &conversion.results[0];
        assert_eq!(inner.children, [result.uuid.clone()]);
        assert_eq!(result.full_name, "AppTests.LoginTests.testLogin()");
        assert_eq!(result.label("package"), Some("AppTests.LoginTests"));
        assert_eq!(result.label("suite"), Some("AppTests / LoginTests"));
        assert_eq!(result.label("testClass"), Some("LoginTests"));
        assert_eq!(result.label("testMethod"), Some("testLogin()"));
        assert_eq!(result.label("runDestination"), Some("iPhone 15"));
        assert_eq!(result.label("framework"), Some("xctest"));
        assert_eq!(result.duration_ms(), Some(1000));
    }

    #[test]
    fn start_anchor_activity_sets_start_and_is_consumed() {
        let mut leaf = test("testA()", Some("Success"), Some(0.25));
        let mut anchor = activity("Start Test at 2023-02-27 10:15:31.000", vec![]);
        anchor.start = Some("2023-02-27T10:15:31.000+0000".to_owned());
        leaf.activities = vec![anchor, activity("Tap", vec![])];

        let conversion = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap();
        let result = &conversion.results[0];
        let anchor_ms = timing::parse_date("2023-02-27T10:15:31.000+0000").unwrap();
        assert_eq!(result.start, Some(anchor_ms));
        assert_eq!(result.stop, Some(anchor_ms + 250));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].name, "Tap");
    }

    #[test]
    fn missing_anchor_leaves_timing_unknown_with_warning() {
        let conversion = project(&tree(
            None,
            vec![TestNode::Test(test("testA()", Some("Success"), Some(1.0)))],
        ))
        .unwrap();
        let result = &conversion.results[0];
        assert_eq!((result.start, result.stop), (None, None));
        assert_eq!(conversion.warnings.len(), 1);
        assert_eq!(conversion.warnings[0].kind, WarningKind::TimingUnknown);
        assert!(
            conversion.warnings[0].message.contains("recorded duration 1000 ms"),
            "{}",
            conversion.warnings[0].message
        );
    }

    #[test]
    fn missing_duration_leaves_timing_unknown() {
        let conversion = project(&tree(
            Some(START),
            vec![TestNode::Test(test("testA()", Some("Skipped"), None))],
        ))
        .unwrap();
        let result = &conversion.results[0];
        assert_eq!(result.status, Status::Skipped);
        assert_eq!(result.start, None);
        assert!(conversion.warnings[0].message.contains("duration"));
    }

    #[test]
    fn directives_rename_label_and_link() {
        let mut leaf = test("testA()", Some("Success"), Some(1.0));
        leaf.activities = vec![
            activity("allure.name:Readable name", vec![]),
            activity("allure.label.feature:Auth", vec![]),
            activity("allure.link.issue-1[issue]:https://tracker/1", vec![]),
            activity("Step one", vec![]),
        ];
        let conversion = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap();
        let result = &conversion.results[0];
        assert_eq!(result.name, "Readable name");
        assert_eq!(result.full_name, "AppTests.testA()");
        assert_eq!(result.label("feature"), Some("Auth"));
        assert_eq!(result.labels.last().map(|l| l.name.as_str()), Some("feature"));
        assert_eq!(result.links.len(), 1);
        assert_eq!(result.links[0].link_type.as_deref(), Some("issue"));
        assert_eq!(result.steps.len(), 1);
    }

    #[test]
    fn assertion_failure_marks_enclosing_steps_failed() {
        let mut leaf = test("testA()", Some("Failure"), Some(1.0));
        leaf.activities = vec![activity(
            "Outer",
            vec![
                activity("Inner ok", vec![]),
                activity("Middle", vec![activity("Assertion Failure: 1 != 2", vec![])]),
            ],
        )];
        let conversion = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap();
        let result = &conversion.results[0];
        let outer = &result.steps[0];
        assert_eq!(outer.status, Status::Failed);
        assert_eq!(outer.steps[0].status, Status::Passed);
        assert_eq!(outer.steps[1].status, Status::Failed);
        assert_eq!(outer.steps[1].steps[0].status, Status::Failed);
        let message = outer.status_details.as_ref().and_then(|d| d.message.as_deref());
        assert_eq!(message, Some("Assertion Failure: 1 != 2"));
        assert_eq!(
            result.status_details.as_ref().and_then(|d| d.message.as_deref()),
            Some("Assertion Failure: 1 != 2")
        );
    }

    #[test]
    fn failure_summary_supplies_details_and_attachments() {
        let mut leaf = test("testA()", Some("Failure"), Some(1.0));
        leaf.failures = vec![ResolvedFailure {
            message: Some("XCTAssertTrue failed".to_owned()),
            file_name: Some("/src/LoginTests.swift".to_owned()),
            line_number: Some(42),
            attachments: vec![ResolvedAttachment {
                filename: "Screenshot.heic".to_owned(),
                name: None,
                uniform_type_identifier: Some("public.heic".to_owned()),
                payload: RecordId::new("0~payload").unwrap(),
            }],
        }];
        let conversion = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap();
        let result = &conversion.results[0];
        let details = result.status_details.as_ref().unwrap();
        assert_eq!(details.message.as_deref(), Some("XCTAssertTrue failed"));
        assert_eq!(details.trace.as_deref(), Some("/src/LoginTests.swift:42"));
        assert_eq!(result.attachments.len(), 1);
        assert_eq!(result.attachments[0].name, "Screenshot.heic");
        assert_eq!(result.attachments[0].media_type, "image/heic");
        assert!(result.attachments[0].source.ends_with("-attachment.heic"));
    }

    #[test]
    fn parameterized_leaf_gets_arguments_parameter() {
        let conversion = project(&tree(
            Some(START),
            vec![
                TestNode::Test(test("testSum [1, 2]", Some("Success"), Some(0.1))),
                TestNode::Test(test("testSum [3, 4]", Some("Success"), Some(0.1))),
            ],
        ))
        .unwrap();
        let [a, b] = &conversion.results[..] else {
            panic!("expected two results");
        };
        assert_eq!(a.parameters[0].name, "arguments");
        assert_eq!(a.parameters[0].value, "1, 2");
        assert_eq!(a.history_id, b.history_id);
        assert_ne!(a.test_case_id, b.test_case_id);
    }

    #[test]
    fn retries_share_ids_but_not_uuids() {
        let conversion = project(&tree(
            Some(START),
            vec![
                TestNode::Test(test("testFlaky()", Some("Failure"), Some(0.1))),
                TestNode::Test(test("testFlaky()", Some("Success"), Some(0.1))),
            ],
        ))
        .unwrap();
        let [a, b] = &conversion.results[..] else {
            panic!("expected two results");
        };
        assert_eq!(a.test_case_id, b.test_case_id);
        assert_eq!(a.history_id, b.history_id);
        assert_ne!(a.uuid, b.uuid);
    }

    #[test]
    fn unrecognized_status_fails_projection() {
        let err = project(&tree(
            Some(START),
            vec![TestNode::Test(test("testA()", Some("Flaky"), Some(1.0)))],
        ))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Projection);
        assert_eq!(err.path(), Some("root > testA()"));
    }

    #[test]
    fn unnamed_test_fails_projection() {
        let mut leaf = test("x", Some("Success"), Some(1.0));
        leaf.name = None;
        let err = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Projection);
    }

    #[test]
    fn invalid_step_date_is_a_warning() {
        let mut leaf = test("testA()", Some("Success"), Some(1.0));
        let mut step = activity("Tap", vec![]);
        step.start = Some("not a date".to_owned());
        step.finish = Some(START.to_owned());
        leaf.activities = vec![step];
        let conversion = project(&tree(Some(START), vec![TestNode::Test(leaf)])).unwrap();
        let result = &conversion.results[0];
        assert_eq!(result.steps[0].start, None);
        assert_eq!(conversion.warnings.len(), 1);
        assert_eq!(conversion.warnings[0].kind, WarningKind::InvalidDate);
        assert_eq!(conversion.warnings[0].path, "root > Tap");
    }
}
