use proptest::prelude::*;
use serde_json::Value;
use xcresults_core::fixture::{self, BundleBuilder};
use xcresults_core::convert;

const STATUSES: [&str; 6] = [
    "Success",
    "Failure",
    "Expected Failure",
    "Skipped",
    "Mixed",
    "Unknown",
];

#[derive(Debug, Clone)]
struct CaseShape {
    group: usize,
    name: String,
    status: usize,
    millis: u32,
    linked: bool,
}

fn case_strategy() -> impl Strategy<Value = CaseShape> {
    (
        0_usize..3,
        "test[A-D]{1,2}( \\[[0-9]\\])?",
        0_usize..STATUSES.len(),
        0_u32..5_000,
        any::<bool>(),
    )
        .prop_map(|(group, name, status, millis, linked)| CaseShape {
            group,
            name,
            status,
            millis,
            linked,
        })
}

fn bundle_for(cases: &[CaseShape]) -> BundleBuilder {
    let mut bundle = BundleBuilder::new();
    let mut groups: Vec<Vec<Value>> = vec![Vec::new(); 3];
    for case in cases {
        let status = STATUSES[case.status];
        let seconds = f64::from(case.millis) / 1000.0;
        let leaf = if case.linked {
            let id = bundle.summary_doc(fixture::test_summary(&case.name, Some(status), Some(seconds)));
            fixture::metadata(&case.name, Some(status), Some(&id))
        } else {
            fixture::with_field(
                fixture::metadata(&case.name, Some(status), None),
                "duration",
                fixture::double(seconds),
            )
        };
        groups[case.group].push(leaf);
    }
    let tests = groups
        .into_iter()
        .enumerate()
        .map(|(index, subtests)| fixture::group(&format!("Group{index}"), subtests))
        .collect();
    bundle.action(
        "Mac",
        Some(fixture::DEFAULT_START),
        vec![fixture::testable("Props", tests)],
    );
    bundle
}

proptest! {
    #[test]
    fn prop_conversion_is_deterministic(cases in prop::collection::vec(case_strategy(), 0..24)) {
        let bundle = bundle_for(&cases);
        let first = convert(bundle.build()).unwrap();
        let second = convert(bundle.build()).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.results.len(), cases.len());
    }

    #[test]
    fn prop_every_result_belongs_to_exactly_one_container(
        cases in prop::collection::vec(case_strategy(), 0..24),
    ) {
        let conversion = convert(bundle_for(&cases).build()).unwrap();
        let mut uuids: Vec<&str> = conversion.results.iter().map(|r| r.uuid.as_str()).collect();
        uuids.sort_unstable();
        let mut owned: Vec<&str> = conversion
            .containers
            .iter()
            .flat_map(|container| container.children.iter().map(String::as_str))
            .filter(|child| uuids.binary_search(child).is_ok())
            .collect();
        owned.sort_unstable();
        prop_assert_eq!(owned, uuids.clone());
        uuids.dedup();
        prop_assert_eq!(uuids.len(), conversion.results.len());
    }

    #[test]
    fn prop_nested_containers_are_listed_by_their_parent(
        cases in prop::collection::vec(case_strategy(), 0..24),
    ) {
        let conversion = convert(bundle_for(&cases).build()).unwrap();
        for container in &conversion.containers {
            let listed_by: Vec<&str> = conversion
                .containers
                .iter()
                .filter(|other| other.children.contains(&container.uuid))
                .map(|other| other.uuid.as_str())
                .collect();
            match &container.parent {
                Some(parent) => prop_assert_eq!(listed_by, vec![parent.as_str()]),
                None => prop_assert!(listed_by.is_empty()),
            }
        }
    }

    #[test]
    fn prop_same_full_name_shares_historic_and_stable_id(
        cases in prop::collection::vec(case_strategy(), 1..24),
    ) {
        let conversion = convert(bundle_for(&cases).build()).unwrap();
        for a in &conversion.results {
            for b in &conversion.results {
                if a.full_name == b.full_name {
                    prop_assert_eq!(&a.test_case_id, &b.test_case_id);
                    prop_assert_eq!(&a.history_id, &b.history_id);
                }
            }
        }
    }

    #[test]
    fn prop_results_follow_source_order(cases in prop::collection::vec(case_strategy(), 0..24)) {
        let conversion = convert(bundle_for(&cases).build()).unwrap();
        let mut expected: Vec<(usize, &str)> = Vec::new();
        for group in 0..3 {
            expected.extend(
                cases
                    .iter()
                    .filter(|case| case.group == group)
                    .map(|case| (group, case.name.as_str())),
            );
        }
        let actual: Vec<(usize, &str)> = conversion
            .results
            .iter()
            .map(|result| {
                let group = result
                    .label("testClass")
                    .and_then(|class| class.strip_prefix("Group"))
                    .and_then(|index| index.parse().ok())
                    .unwrap_or(usize::MAX);
                (group, result.label("testMethod").unwrap_or_default())
            })
            .collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn prop_duration_round_trips_millis(cases in prop::collection::vec(case_strategy(), 1..12)) {
        let conversion = convert(bundle_for(&cases).build()).unwrap();
        let mut expected: Vec<i64> = Vec::new();
        for group in 0..3 {
            expected.extend(
                cases
                    .iter()
                    .filter(|case| case.group == group)
                    .map(|case| i64::from(case.millis)),
            );
        }
        let actual: Vec<i64> = conversion
            .results
            .iter()
            .filter_map(|result| result.duration_ms())
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
