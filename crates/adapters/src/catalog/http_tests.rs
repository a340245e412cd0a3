// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn settings(location: &str) -> CatalogSettings {
    CatalogSettings {
        location: location.to_string(),
        shared_space: 1001,
        client_id: "ci_client".to_string(),
        client_secret: "secret".to_string(),
        timeout_secs: 5,
    }
}

/// Serve one canned response per connection, recording `METHOD target`
/// and the body of each request.
async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<(String, String)>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = Arc::clone(&seen);

    tokio::spawn(async move {
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            let header_end = loop {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
            let content_length = head
                .lines()
                .find_map(|l| {
                    let (name, value) = l.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = stream.read(&mut chunk).await.unwrap();
                buf.extend_from_slice(&chunk[..n]);
            }
            let request_line = head.lines().next().unwrap_or_default();
            let target: Vec<&str> = request_line.split(' ').take(2).collect();
            let request_body = String::from_utf8_lossy(&buf[header_end..]).to_string();
            recorded.lock().push((target.join(" "), request_body));

            let response = format!(
                "HTTP/1.1 {status} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nset-cookie: LWSSO_COOKIE_KEY=abc; Path=/\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
    });

    (format!("http://{addr}"), seen)
}

#[yare::parameterized(
    valid = { "https://octane.example.com", 1001, "id", true },
    bad_url = { "not a url", 1001, "id", false },
    bad_scheme = { "ftp://octane.example.com", 1001, "id", false },
    zero_space = { "https://octane.example.com", 0, "id", false },
    empty_client = { "https://octane.example.com", 1001, " ", false },
)]
fn settings_validation(location: &str, shared_space: u64, client_id: &str, ok: bool) {
    let mut s = settings(location);
    s.shared_space = shared_space;
    s.client_id = client_id.to_string();
    assert_eq!(s.validate().is_ok(), ok);
}

#[test]
fn collection_url_includes_space_and_workspace() {
    let client = HttpCatalogClient::new(settings("https://octane.example.com/")).unwrap();
    let url = client.collection_url(1002, "tests").unwrap();
    assert_eq!(
        url.as_str(),
        "https://octane.example.com/api/shared_spaces/1001/workspaces/1002/tests"
    );
}

#[test]
fn query_url_carries_query_fields_and_limit() {
    let client = HttpCatalogClient::new(settings("https://octane.example.com")).unwrap();
    let query = EntityQuery::new("tests")
        .filter(Condition::eq("name", "a b"))
        .fields(&["id", "name"])
        .limit(100);

    let url = client.query_url(1002, &query).unwrap();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    assert_eq!(
        pairs,
        vec![
            ("query".to_string(), "\"name EQ 'a b'\"".to_string()),
            ("fields".to_string(), "id,name".to_string()),
            ("limit".to_string(), "100".to_string()),
        ]
    );
}

#[test]
fn error_body_with_error_list() {
    let body = br#"{"errors":[{"error_code":"platform.duplicate_entity_error","description":"dup"}]}"#;
    assert!(request_error(409, body).is_duplicate_conflict());
}

#[yare::parameterized(
    empty_error_list = { r#"{"errors":[]}"#, true },
    no_error_list = { "", false },
    plain_text = { "Conflict", false },
    other_code = { r#"{"errors":[{"error_code":"platform.field_validation","description":"x"}]}"#, false },
)]
fn conflict_without_duplicate_codes(body: &str, expected: bool) {
    assert_eq!(request_error(409, body.as_bytes()).is_duplicate_conflict(), expected);
}

#[test]
fn error_body_with_single_error() {
    let body = br#"{"error_code":"platform.duplicate_entity_error","description":"dup"}"#;
    let err = request_error(409, body);
    assert!(err.is_duplicate_conflict());
}

#[test]
fn error_body_that_is_not_json_keeps_text() {
    let err = request_error(502, b"Bad Gateway");
    match err {
        CatalogError::Request {
            status,
            errors,
            message,
        } => {
            assert_eq!(status, 502);
            assert!(errors.is_none());
            assert_eq!(message, "Bad Gateway");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn signs_in_before_first_request() {
    let (base, seen) = serve(vec![
        (200, "{}"),
        (409, r#"{"errors":[{"error_code":"platform.duplicate_entity_error","description":"dup"}]}"#),
    ])
    .await;
    let client = HttpCatalogClient::new(settings(&base)).unwrap();

    let err = client
        .post_entities(1002, "tests", &serde_json::json!({"data": [{"name": "a"}]}))
        .await
        .unwrap_err();

    assert!(err.is_duplicate_conflict());
    let seen = seen.lock().clone();
    assert_eq!(seen[0].0, "POST /authentication/sign_in");
    assert!(seen[0].1.contains("\"client_id\":\"ci_client\""));
    assert_eq!(seen[1].0, "POST /api/shared_spaces/1001/workspaces/1002/tests");
    assert_eq!(seen[1].1, r#"{"data":[{"name":"a"}]}"#);
}

#[tokio::test]
async fn expired_session_is_renewed_once() {
    let (base, seen) = serve(vec![
        (200, "{}"),
        (401, "{}"),
        (200, "{}"),
        (200, r#"{"total_count":1,"data":[{"id":"2","logical_name":"list_node.testing_tool_type.uft"}]}"#),
    ])
    .await;
    let client = HttpCatalogClient::new(settings(&base)).unwrap();

    let page = client
        .query_list_items(1002, "list_node.testing_tool_type", 0, 100)
        .await
        .unwrap();

    assert_eq!(page.data[0].id, "2");
    let targets: Vec<String> = seen.lock().iter().map(|(t, _)| t.clone()).collect();
    assert_eq!(targets.len(), 4);
    assert_eq!(targets[2], "POST /authentication/sign_in");
    assert!(targets[3].starts_with("GET /api/shared_spaces/1001/workspaces/1002/list_nodes?query="));
}

#[tokio::test]
async fn rejected_sign_in_is_auth_error() {
    let (base, _seen) = serve(vec![(401, r#"{"error_code":"auth"}"#)]).await;
    let client = HttpCatalogClient::new(settings(&base)).unwrap();

    let err = client
        .delete_entities(1002, "scm_resource_files", &[EntityId::new("1")])
        .await
        .unwrap_err();

    assert!(matches!(err, CatalogError::Auth(_)));
}
