/// Lazy iterator integration tests
///
/// Ordering, exhaustion, batching and cancellation of server cursors.

use futures::{StreamExt, TryStreamExt};
use glink_client::{ClientConfig, ConceptService, IteratorState, Thing, ThingType};
use glink_proto::{transaction_request::Req, transaction_response::Res, TransactionResponse};
use glink_test_utils::{init_tracing, subtype_item, MockServer, ServerHandle};
use proptest::prelude::*;
use std::time::Duration;

fn iid(i: usize) -> Vec<u8> {
    vec![0x01, (i >> 8) as u8, i as u8]
}

/// Server with `count` instances of `person`, iterated in `batch_size` batches
fn people(count: usize, batch_size: u32) -> (ConceptService, ServerHandle) {
    let mut server = MockServer::new().with_entity_type("person", "entity");
    for i in 0..count {
        server = server.with_thing(&iid(i), "person");
    }
    let (transceiver, handle) =
        server.start_with(ClientConfig::default().with_batch_size(batch_size));
    (ConceptService::new(transceiver), handle)
}

fn is_close(req: &Req) -> bool {
    matches!(req, Req::IterClose(_))
}

fn is_continue(req: &Req) -> bool {
    matches!(req, Req::IterContinue(_))
}

#[tokio::test]
async fn test_fragments_in_order_then_exhausted() {
    init_tracing();
    let (service, server) = people(5, 50);

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    for i in 0..5 {
        let thing = sequence.next().await.unwrap().unwrap();
        assert_eq!(thing.iid().as_bytes(), iid(i).as_slice());
    }

    assert!(sequence.next().await.is_none());
    assert_eq!(sequence.state(), IteratorState::Exhausted);
    assert!(sequence.next().await.is_none());
    assert!(sequence.next().await.is_none());

    drop(sequence);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.count_matching(is_close), 0);
    assert_eq!(service.transceiver().pending(), 0);
}

#[tokio::test]
async fn test_empty_iterator() {
    let (service, _server) = people(0, 50);

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    assert!(sequence.next().await.is_none());
    assert_eq!(sequence.state(), IteratorState::Exhausted);
}

#[tokio::test]
async fn test_continue_requested_per_batch_on_demand() {
    let (service, server) = people(7, 3);

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();

    for _ in 0..3 {
        sequence.next().await.unwrap().unwrap();
    }
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.count_matching(is_continue), 0);

    sequence.next().await.unwrap().unwrap();
    assert_eq!(server.count_matching(is_continue), 1);

    let rest: Vec<Thing> = sequence.try_collect().await.unwrap();
    assert_eq!(rest.len(), 3);
    assert_eq!(server.count_matching(is_continue), 2);
}

#[tokio::test]
async fn test_close_after_partial_consumption() {
    let (service, server) = people(10, 4);

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    sequence.next().await.unwrap().unwrap();
    sequence.next().await.unwrap().unwrap();

    sequence.close();
    sequence.close();
    assert_eq!(sequence.state(), IteratorState::Closed);
    assert!(sequence.next().await.is_none());

    drop(sequence);
    server.wait_for_requests(2).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(server.count_matching(is_close), 1);
    assert_eq!(server.count_matching(is_continue), 0);
    assert_eq!(service.transceiver().pending(), 0);
}

#[tokio::test]
async fn test_fragments_after_close_are_discarded() {
    let (service, server) = people(3, 50);

    let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
    sequence.next().await.unwrap().unwrap();
    let open_id = server.requests()[0].id.clone();

    sequence.close();
    for label in ["late-1", "late-2"] {
        server.inject(TransactionResponse::new(
            open_id.clone(),
            Res::IterItem(subtype_item(label)),
        ));
    }

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(sequence.next().await.is_none());
    assert_eq!(server.count_matching(is_close), 1);
}

#[tokio::test]
async fn test_never_pulled_sequence_closed_on_drop() {
    let (service, server) = people(3, 1);

    let sequence = ThingType::new("person").get_instances(&service).unwrap();
    drop(sequence);

    let requests = server.wait_for_requests(2).await;
    assert!(matches!(requests[0].req, Some(Req::OpenTypeIter(_))));
    assert!(matches!(requests[1].req, Some(Req::IterClose(_))));
    assert_eq!(requests[0].id, requests[1].id);
}

#[tokio::test]
async fn test_sequences_are_independent() {
    let (service, server) = people(4, 2);
    let person = ThingType::new("person");

    let mut first = person.get_instances(&service).unwrap();
    let mut second = person.get_instances(&service).unwrap();

    let a = first.next().await.unwrap().unwrap();
    let b = second.next().await.unwrap().unwrap();
    assert_eq!(a, b);

    first.close();
    let rest: Vec<Thing> = second.try_collect().await.unwrap();
    assert_eq!(rest.len(), 3);

    let opens: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| matches!(r.req, Some(Req::OpenTypeIter(_))))
        .collect();
    assert_eq!(opens.len(), 2);
    assert_ne!(opens[0].id, opens[1].id);
}

#[tokio::test]
async fn test_unbatched_server() {
    let mut server = MockServer::new()
        .with_entity_type("person", "entity")
        .without_batching();
    for i in 0..20 {
        server = server.with_thing(&iid(i), "person");
    }
    let (service, handle) = server.start_service();

    let all: Vec<Thing> = ThingType::new("person")
        .get_instances(&service)
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(all.len(), 20);
    assert_eq!(handle.count_matching(is_continue), 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_iteration_yields_every_fragment_once_in_order(
        count in 0usize..120,
        batch_size in 1u32..16,
    ) {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (received, continues) = runtime.block_on(async move {
            let (service, server) = people(count, batch_size);
            let things: Vec<Thing> = ThingType::new("person")
                .get_instances(&service)
                .unwrap()
                .try_collect()
                .await
                .unwrap();
            (things, server.count_matching(is_continue))
        });

        prop_assert_eq!(received.len(), count);
        for (i, thing) in received.iter().enumerate() {
            let expected_iid = iid(i);
            prop_assert_eq!(thing.iid().as_bytes(), expected_iid.as_slice());
        }

        let batches = count.div_ceil(batch_size as usize).max(1);
        prop_assert_eq!(continues, batches - 1);
    }

    #[test]
    fn prop_close_after_any_prefix_sends_one_close(
        count in 1usize..40,
        consumed in 0usize..40,
        batch_size in 1u32..8,
    ) {
        let consumed = consumed % count;
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (closes, state) = runtime.block_on(async move {
            let (service, server) = people(count, batch_size);
            let mut sequence = ThingType::new("person").get_instances(&service).unwrap();
            for _ in 0..consumed {
                sequence.next().await.unwrap().unwrap();
            }
            sequence.close();
            let after = sequence.next().await;
            assert!(after.is_none());
            let state = sequence.state();
            drop(sequence);
            tokio::time::sleep(Duration::from_millis(5)).await;
            (server.count_matching(is_close), state)
        });

        prop_assert_eq!(closes, 1);
        prop_assert_eq!(state, IteratorState::Closed);
    }
}
