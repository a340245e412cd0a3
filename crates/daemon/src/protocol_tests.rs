// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Protocol unit tests

use super::*;
use std::time::Duration;
use tsync_core::test_support::result_with_new_tests;

#[test]
fn enqueue_request_carries_optional_result() {
    let request = Request::Enqueue {
        project: "folder/uft".to_string(),
        build: 12,
        result: Some(Box::new(result_with_new_tests(2))),
    };

    let encoded = encode(&request).expect("encode failed");
    let decoded: Request = decode(&encoded).expect("decode failed");

    assert_eq!(request, decoded);
}

#[test]
fn enqueue_without_result_omits_field() {
    let request = Request::Enqueue {
        project: "uft".to_string(),
        build: 3,
        result: None,
    };

    let json: serde_json::Value = serde_json::from_slice(&encode(&request).unwrap()).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"type": "Enqueue", "project": "uft", "build": 3})
    );
}

#[test]
fn status_response_lists_queue() {
    let response = Response::Status {
        uptime_secs: 3600,
        queue_size: 1,
        items: vec![QueueEntry {
            id: 4,
            project: "uft".to_string(),
            build: 9,
            fail_count: 2,
        }],
    };

    let encoded = encode(&response).expect("encode failed");
    let decoded: Response = decode(&encoded).expect("decode failed");

    assert_eq!(response, decoded);
}

#[test]
fn unit_variants_are_tagged() {
    let encoded = encode(&Request::Ping).unwrap();
    assert_eq!(std::str::from_utf8(&encoded).unwrap(), r#"{"type":"Ping"}"#);
}

#[tokio::test]
async fn message_is_length_prefixed() {
    let mut buf = Vec::new();
    write_message(&mut buf, b"{}").await.unwrap();

    assert_eq!(&buf[..4], &[0, 0, 0, 2]);
    assert_eq!(&buf[4..], b"{}");

    let mut reader = buf.as_slice();
    assert_eq!(read_message(&mut reader).await.unwrap(), b"{}");
}

#[tokio::test]
async fn oversized_length_is_rejected() {
    let len = (MAX_MESSAGE_SIZE as u32 + 1).to_be_bytes();
    let mut reader = &len[..];

    let err = read_message(&mut reader).await.unwrap_err();

    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn eof_before_length_is_connection_closed() {
    let mut reader: &[u8] = &[];

    let err = read_message(&mut reader).await.unwrap_err();

    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn request_and_response_cross_a_stream() {
    let (mut client, mut server) = tokio::io::duplex(1024);

    write_request(&mut client, &Request::Status, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let request = read_request(&mut server, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(request, Request::Status);

    write_response(&mut server, &Response::Pong, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let response = read_response(&mut client, DEFAULT_TIMEOUT).await.unwrap();
    assert_eq!(response, Response::Pong);
}

#[tokio::test(start_paused = true)]
async fn silent_peer_times_out() {
    let (_client, mut server) = tokio::io::duplex(64);

    let err = read_request(&mut server, Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Timeout));
}

#[test]
fn queue_entry_from_item() {
    let item = tsync_storage::QueueItem {
        id: 7,
        project_name: "uft".to_string(),
        build_number: 2,
        fail_count: 1,
    };

    assert_eq!(
        QueueEntry::from(&item),
        QueueEntry {
            id: 7,
            project: "uft".to_string(),
            build: 2,
            fail_count: 1,
        }
    );
}
