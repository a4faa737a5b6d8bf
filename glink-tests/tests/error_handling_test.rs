/// Error handling integration tests
///
/// Transport failures, timeouts, remote errors and configuration checks.

use futures::StreamExt;
use glink_client::{ClientConfig, ClientError, ConceptService, IteratorState, ThingType};
use glink_proto::{transaction_request::Req, transaction_response::Res, GetTypeRes, TransactionResponse};
use glink_test_utils::{init_tracing, MockServer};
use std::time::Duration;
use tonic::Status;

#[tokio::test]
async fn test_channel_failure_fails_pending_calls() {
    init_tracing();
    let (service, server) = MockServer::new()
        .with_entity_type("person", "entity")
        .with_thing(&[0x01], "person")
        .with_thing(&[0x02], "person")
        .silence_label("stuck")
        .start_service();

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    sequence.next().await.unwrap().unwrap();

    let stuck = tokio::spawn({
        let service = service.clone();
        async move { service.get_type("stuck").await }
    });
    server.wait_for_requests(2).await;

    server.fail(Status::unavailable("connection reset"));

    let err = stuck.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(err.is_transport());

    // The second person was delivered before the failure
    assert!(sequence.next().await.unwrap().is_ok());
    let after = sequence.next().await;
    assert!(after.is_none() || matches!(after, Some(Err(ClientError::Transport(_)))));

    let err = service.get_type("person").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(service.transceiver().is_closed());
}

#[tokio::test]
async fn test_open_iterator_fails_on_stream_end() {
    let (service, server) = MockServer::new()
        .with_entity_type("person", "entity")
        .silence_label("person")
        .start_service();

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    server.wait_for_requests(1).await;
    server.shutdown();

    match sequence.next().await {
        Some(Err(ClientError::Transport(_))) => {}
        other => panic!("expected transport error, got {:?}", other),
    }
    assert_eq!(sequence.state(), IteratorState::Exhausted);
    assert!(sequence.next().await.is_none());
}

#[tokio::test]
async fn test_deadline_status_maps_to_timeout() {
    let (service, server) = MockServer::new().silence_label("stuck").start_service();

    let stuck = tokio::spawn({
        let service = service.clone();
        async move { service.get_type("stuck").await }
    });
    server.wait_for_requests(1).await;
    server.fail(Status::deadline_exceeded("transaction deadline"));

    let err = stuck.await.unwrap().unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.is_transport());
}

#[tokio::test]
async fn test_request_timeout() {
    let config = ClientConfig::default().with_request_timeout(Duration::from_millis(50));
    let (transceiver, _server) = MockServer::new()
        .silence_label("stuck")
        .start_with(config);
    let service = ConceptService::new(transceiver);

    let err = service.get_type("stuck").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(err.code(), "TIMEOUT");

    // The channel itself is still usable
    assert!(service.get_type("entity").await.unwrap().is_some());
}

#[tokio::test]
async fn test_timed_out_iterators_release_their_tokens() {
    let config = ClientConfig::default().with_request_timeout(Duration::from_millis(30));
    let (transceiver, server) = MockServer::new()
        .with_entity_type("person", "entity")
        .silence_label("person")
        .start_with(config);
    let service = ConceptService::new(transceiver);

    for _ in 0..5 {
        let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
        match sequence.next().await {
            Some(Err(ClientError::Timeout(_))) => {}
            other => panic!("expected timeout, got {:?}", other),
        }
        assert_eq!(sequence.state(), IteratorState::Closed);
    }

    assert_eq!(service.transceiver().pending(), 0);
    server.wait_for_requests(10).await;
    assert_eq!(server.count_matching(|r| matches!(r, Req::IterClose(_))), 5);
    assert!(service.get_type("entity").await.unwrap().is_some());
}

#[tokio::test]
async fn test_late_response_is_dropped_not_misdelivered() {
    let config = ClientConfig::default().with_request_timeout(Duration::from_millis(50));
    let (transceiver, server) = MockServer::new()
        .with_entity_type("slow", "entity")
        .with_relation_type("next", "relation")
        .delay_label("slow", Duration::from_millis(120))
        .start_with(config);
    let service = ConceptService::new(transceiver);

    let err = service.get_entity_type("slow").await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert_eq!(service.transceiver().pending(), 0);

    tokio::time::sleep(Duration::from_millis(100)).await;

    let next = service.get_type("next").await.unwrap().unwrap();
    assert_eq!(next.relation_type().unwrap().label(), "next");
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn test_unknown_response_ids_are_ignored() {
    let (service, server) = MockServer::new().start_service();

    server.inject(TransactionResponse::new(
        vec![0u8; 16],
        Res::GetType(GetTypeRes { r#type: None }),
    ));
    server.inject(TransactionResponse::new(
        vec![1, 2, 3],
        Res::GetType(GetTypeRes { r#type: None }),
    ));

    assert!(service.get_type("entity").await.unwrap().is_some());
    assert!(!service.transceiver().is_closed());
}

#[tokio::test]
async fn test_remote_error_on_iterator_open() {
    let (service, _server) = MockServer::new().start_service();

    let mut sequence = ThingType::new("ghost").get_instances(&service).unwrap();
    match sequence.next().await {
        Some(Err(ClientError::Remote { code, .. })) => assert_eq!(code, "TYPE_NOT_FOUND"),
        other => panic!("expected remote error, got {:?}", other),
    }
    assert_eq!(sequence.state(), IteratorState::Exhausted);
    assert_eq!(service.transceiver().pending(), 0);
}

#[tokio::test]
async fn test_metadata_attached_to_every_request() {
    let config = ClientConfig::default()
        .with_batch_size(1)
        .with_metadata("trace-id", "abc123")
        .with_metadata("span-id", "7");
    let (transceiver, server) = MockServer::new()
        .with_entity_type("person", "entity")
        .with_thing(&[0x01], "person")
        .with_thing(&[0x02], "person")
        .with_thing(&[0x03], "person")
        .start_with(config);
    let service = ConceptService::new(transceiver);

    service.get_type("person").await.unwrap();
    service.put_entity_type("city").await.unwrap();
    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    sequence.next().await.unwrap().unwrap();
    sequence.next().await.unwrap().unwrap();
    sequence.close();

    let requests = server.wait_for_requests(5).await;
    assert!(requests
        .iter()
        .any(|r| matches!(r.req, Some(Req::IterContinue(_)))));
    assert!(requests.iter().any(|r| matches!(r.req, Some(Req::IterClose(_)))));
    for request in requests {
        assert_eq!(request.metadata.get("trace-id").map(String::as_str), Some("abc123"));
        assert_eq!(request.metadata.get("span-id").map(String::as_str), Some("7"));
    }
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let (out_tx, _out_rx) = tokio::sync::mpsc::unbounded_channel();
    let inbound = futures::stream::empty::<Result<TransactionResponse, Status>>();

    let err = glink_client::Transceiver::new(
        out_tx,
        inbound,
        ClientConfig::default().with_batch_size(0),
    )
    .err()
    .unwrap();
    assert!(matches!(err, ClientError::InvalidConfig(_)));
}

#[tokio::test]
async fn test_close_fails_fast() {
    let (service, server) = MockServer::new().start_service();
    service.transceiver().close();

    let err = service.get_type("entity").await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
    assert!(ThingType::new("thing").get_instances(&service).is_err());
    assert_eq!(server.request_count(), 0);
}
