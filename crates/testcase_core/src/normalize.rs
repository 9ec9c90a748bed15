//! crates/testcase_core/src/normalize.rs
//!
//! Coerces engine output into the canonical test case schema. Never fails.

use std::collections::HashSet;

use crate::domain::{DraftTestCase, Priority, Severity, TestCase, TestStatus};

/// Normalizes drafts in order.
///
/// Supplied ids are kept when non-blank and unique; everything else receives
/// the next free `TC_NNN` id. `actual_result` always starts empty.
pub fn normalize(drafts: Vec<DraftTestCase>) -> Vec<TestCase> {
    let supplied: Vec<Option<String>> = drafts
        .iter()
        .map(|d| {
            d.test_id
                .as_deref()
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
        })
        .collect();

    let mut taken: HashSet<String> = HashSet::new();
    let mut keep = Vec::with_capacity(supplied.len());
    for id in &supplied {
        keep.push(matches!(id, Some(id) if taken.insert(id.clone())));
    }

    let mut counter = 0usize;
    let mut next_free_id = |taken: &mut HashSet<String>| loop {
        counter += 1;
        let candidate = format!("TC_{:03}", counter);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
    };

    drafts
        .into_iter()
        .zip(supplied.into_iter().zip(keep))
        .map(|(draft, (id, kept))| {
            let test_id = match id {
                Some(id) if kept => id,
                _ => next_free_id(&mut taken),
            };
            canonical(test_id, draft)
        })
        .collect()
}

fn canonical(test_id: String, draft: DraftTestCase) -> TestCase {
    let text = |value: Option<String>| value.map(|v| v.trim().to_string()).unwrap_or_default();

    TestCase {
        test_id,
        status: draft
            .status
            .as_deref()
            .map(TestStatus::coerce)
            .unwrap_or_default(),
        priority: Priority::coerce(draft.priority.as_deref().unwrap_or_default()),
        severity: Severity::coerce(draft.severity.as_deref().unwrap_or_default()),
        module: text(draft.module),
        test_scenario: text(draft.test_scenario),
        preconditions: text(draft.preconditions),
        steps: text(draft.steps),
        test_data: text(draft.test_data),
        expected_result: text(draft.expected_result),
        actual_result: String::new(),
        edge_cases: text(draft.edge_cases),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_id(id: Option<&str>) -> DraftTestCase {
        DraftTestCase {
            test_id: id.map(str::to_string),
            ..DraftTestCase::default()
        }
    }

    fn ids(cases: &[TestCase]) -> Vec<&str> {
        cases.iter().map(|c| c.test_id.as_str()).collect()
    }

    #[test]
    fn missing_ids_are_assigned_in_order() {
        let cases = normalize(vec![with_id(None), with_id(Some("  ")), with_id(None)]);
        assert_eq!(ids(&cases), vec!["TC_001", "TC_002", "TC_003"]);
    }

    #[test]
    fn supplied_ids_are_kept_and_never_collide() {
        let cases = normalize(vec![
            with_id(None),
            with_id(Some("TC_001")),
            with_id(Some("LOGIN-7")),
            with_id(Some("LOGIN-7")),
        ]);
        assert_eq!(ids(&cases), vec!["TC_002", "TC_001", "LOGIN-7", "TC_003"]);

        let unique: HashSet<&str> = ids(&cases).into_iter().collect();
        assert_eq!(unique.len(), cases.len());
    }

    #[test]
    fn schema_drift_is_coerced_not_rejected() {
        let draft = DraftTestCase {
            priority: Some("Blocker!!".to_string()),
            severity: Some("meh".to_string()),
            status: Some("Passed".to_string()),
            module: Some("  Auth  ".to_string()),
            ..DraftTestCase::default()
        };
        let case = normalize(vec![draft]).remove(0);
        assert_eq!(case.priority, Priority::Low);
        assert_eq!(case.severity, Severity::Trivial);
        assert_eq!(case.status, TestStatus::Pass);
        assert_eq!(case.module, "Auth");
        assert!(case.actual_result.is_empty());
        assert!(case.steps.is_empty());
    }

    #[test]
    fn missing_status_defaults_to_pending() {
        let case = normalize(vec![DraftTestCase::default()]).remove(0);
        assert_eq!(case.status, TestStatus::Pending);
    }
}
