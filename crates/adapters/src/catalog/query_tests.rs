// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    equals = { Condition::eq("name", "login"), "name EQ 'login'" },
    escapes_quotes = { Condition::eq("name", "it's"), r"name EQ 'it\'s'" },
    escapes_backslash = { Condition::eq("package", r"a\b"), r"package EQ 'a\\b'" },
    reference = { Condition::refers_to("scm_repository", "5"), "scm_repository EQ {id EQ 5}" },
    logical_name = {
        Condition::refers_to_logical_name("list_root", "list_node.test_type"),
        "list_root EQ {logical_name EQ 'list_node.test_type'}"
    },
    id_in = {
        Condition::id_in(&[EntityId::new("1"), EntityId::new("2")]),
        "id IN 1,2"
    },
)]
fn condition_rendering(condition: Condition, expected: &str) {
    assert_eq!(condition.to_string(), expected);
}

#[test]
fn query_joins_conditions_and_quotes() {
    let query = EntityQuery::new("tests")
        .filter(Condition::eq("name", "login"))
        .filter(Condition::eq("package", "suite"));
    assert_eq!(
        query.render().as_deref(),
        Some("\"name EQ 'login';package EQ 'suite'\"")
    );
}

#[test]
fn query_without_conditions_renders_nothing() {
    assert_eq!(EntityQuery::new("tests").render(), None);
}
