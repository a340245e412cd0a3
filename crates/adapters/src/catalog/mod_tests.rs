// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[yare::parameterized(
    all_duplicates = { 409, vec![DUPLICATE_ERROR_CODE, DUPLICATE_ERROR_CODE], true },
    single_duplicate = { 409, vec![DUPLICATE_ERROR_CODE], true },
    mixed_codes = { 409, vec![DUPLICATE_ERROR_CODE, "platform.field_validation"], false },
    empty_error_list = { 409, vec![], true },
    wrong_status = { 400, vec![DUPLICATE_ERROR_CODE], false },
)]
fn duplicate_conflict_classification(status: u16, codes: Vec<&str>, expected: bool) {
    let errors = codes
        .into_iter()
        .map(|code| RemoteError::new(code, "x"))
        .collect();
    assert_eq!(
        CatalogError::request(status, errors).is_duplicate_conflict(),
        expected
    );
}

#[test]
fn transport_errors_are_never_duplicates() {
    assert!(!CatalogError::Transport("timeout".into()).is_duplicate_conflict());
    assert!(!CatalogError::Auth("denied".into()).is_duplicate_conflict());
}

#[test]
fn request_message_joins_sub_errors() {
    let err = CatalogError::request(
        409,
        vec![
            RemoteError::duplicate("test a"),
            RemoteError::new("platform.other", "b"),
        ],
    );
    assert_eq!(
        err.to_string(),
        "catalog request failed (409): platform.duplicate_entity_error: test a; platform.other: b"
    );
}

#[test]
fn entity_reads_flattened_fields() {
    let entity: Entity = serde_json::from_value(json!({
        "id": "1001",
        "type": "test",
        "name": "login",
        "scm_repository": {"type": "scm_repository", "id": "5"},
    }))
    .unwrap();

    assert_eq!(entity.id, "1001");
    assert_eq!(entity.str_field("name"), Some("login"));
    assert_eq!(entity.ref_id("scm_repository"), Some("5"));
    assert_eq!(entity.ref_id("name"), None);
}

#[test]
fn paged_list_defaults_total_count() {
    let page: PagedList<ListItem> = serde_json::from_value(json!({
        "data": [{"id": "2", "logical_name": "list_node.testing_tool_type.uft"}]
    }))
    .unwrap();
    assert_eq!(page.total_count, None);
    assert_eq!(page.data[0].logical_name, "list_node.testing_tool_type.uft");
}

#[test]
fn static_catalog_hands_out_its_client() {
    assert!(StaticCatalog(Some(FakeCatalogClient::new())).client().is_some());
    assert!(StaticCatalog::<FakeCatalogClient>(None).client().is_none());
}
