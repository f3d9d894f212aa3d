//! Report directives embedded in activity titles.
//!
//! A test can annotate its own result by running an activity whose title is
//! one of:
//!
//! - `allure.name:<display name>`
//! - `allure.label.<name>:<value>`
//! - `allure.link.<name>[<type>]:<url>` (the `[<type>]` part is optional)
//!
//! Directive activities are consumed and never become steps.

use std::sync::LazyLock;

use regex::Regex;
use xcresults_types::{Label, Link};

/// Title prefix of the activity that anchors a test's start time.
pub const START_ANCHOR_PREFIX: &str = "Start Test at";

/// Title prefix of an XCTest assertion failure activity.
pub const ASSERTION_FAILURE_PREFIX: &str = "Assertion Failure:";

/// `activityType` of an XCTest assertion failure activity.
pub const ASSERTION_FAILURE_TYPE: &str = "com.apple.dt.xctest.activity-type.testAssertionFailure";

struct Patterns {
    name: Regex,
    label: Regex,
    link: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    name: Regex::new(r"^allure\.name:(?P<name>.*)$").expect("name directive pattern compiles"),
    label: Regex::new(r"^allure\.label\.(?P<name>.*?):(?P<value>.*)$")
        .expect("label directive pattern compiles"),
    link: Regex::new(r"^allure\.link\.(?P<name>.*?)(?:\[(?P<type>.*)\])?:(?P<url>.*)$")
        .expect("link directive pattern compiles"),
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Name(String),
    Label(Label),
    Link(Link),
}

impl Directive {
    /// Parse an activity title; `None` for ordinary titles.
    #[must_use]
    pub fn parse(title: &str) -> Option<Self> {
        if !title.starts_with("allure.") {
            return None;
        }
        let patterns = &*PATTERNS;
        if let Some(caps) = patterns.name.captures(title) {
            return Some(Self::Name(caps["name"].trim().to_owned()));
        }
        if let Some(caps) = patterns.label.captures(title) {
            return Some(Self::Label(Label::new(&caps["name"], caps["value"].trim())));
        }
        if let Some(caps) = patterns.link.captures(title) {
            return Some(Self::Link(Link {
                name: caps["name"].to_owned(),
                url: caps["url"].trim().to_owned(),
                link_type: caps
                    .name("type")
                    .map(|m| m.as_str().to_owned())
                    .filter(|kind| !kind.is_empty()),
            }));
        }
        None
    }
}

/// `Start Test at ...` activities carry the test start time.
#[must_use]
pub fn is_start_anchor(title: &str) -> bool {
    title.starts_with(START_ANCHOR_PREFIX)
}

#[must_use]
pub fn is_assertion_failure(title: &str, activity_type: Option<&str>) -> bool {
    title.starts_with(ASSERTION_FAILURE_PREFIX) || activity_type == Some(ASSERTION_FAILURE_TYPE)
}
