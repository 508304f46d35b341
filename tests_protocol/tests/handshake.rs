//! Readiness handshake and pre-ready queuing
//!
//! Traffic issued before the handshake completes is queued and flushed
//! when the peer's `__ready` arrives. The flush drains newest-first; that
//! ordering is long-standing observable behavior and is asserted here on
//! purpose rather than papered over.

use channel::{HandlerFault, Params, Query, RequestHandle};
use serde_json::{json, Value};
use tests_protocol::{linked_channels, ValueSink};

type HandlerResult = Result<Value, HandlerFault>;

#[test]
fn test_roles_start_in_the_documented_states() {
    let (_pair, host, guest) = linked_channels();
    assert!(!host.is_ready());
    assert!(guest.is_ready());
}

#[test]
fn test_handshake_completes_both_sides() {
    let (pair, host, guest) = linked_channels();
    pair.pump(&host, &guest).unwrap();
    assert!(host.is_ready());
    assert!(guest.is_ready());
    assert_eq!(pair.queued_to_a(), 0);
    assert_eq!(pair.queued_to_b(), 0);
}

#[test]
fn test_pre_ready_queries_are_delivered_after_handshake() {
    let (pair, host, guest) = linked_channels();

    let seen = ValueSink::new();
    let sink = seen.clone();
    guest
        .bind(
            "record",
            move |_req: Option<&RequestHandle>, params: Params| -> HandlerResult {
                let mut record = sink.recorder();
                let value = params.into_json();
                record(value.clone());
                Ok(value)
            },
        )
        .unwrap();

    let results = ValueSink::new();
    let mut record_first = results.recorder();
    let mut record_second = results.recorder();
    host.query(
        Query::new("record")
            .with_params("first")
            .on_success(move |v| record_first(v)),
    )
    .unwrap();
    host.query(
        Query::new("record")
            .with_params("second")
            .on_success(move |v| record_second(v)),
    )
    .unwrap();

    assert_eq!(host.pending_messages(), 2);
    pair.pump(&host, &guest).unwrap();

    // both arrive, newest first: the pending queue drains from the back
    assert_eq!(seen.values(), vec![json!("second"), json!("first")]);
    // both responses came home regardless of flush order
    assert_eq!(results.len(), 2);
    assert_eq!(host.open_transactions(), 0);
}

#[test]
fn test_guest_traffic_never_queues() {
    let (pair, host, guest) = linked_channels();

    let seen = ValueSink::new();
    let sink = seen.clone();
    host.bind(
        "from.guest",
        move |_req: Option<&RequestHandle>, params: Params| -> HandlerResult {
            let mut record = sink.recorder();
            record(params.into_json());
            Ok(Value::Null)
        },
    )
    .unwrap();

    guest.notify("from.guest", Params::from("early")).unwrap();
    assert_eq!(guest.pending_messages(), 0);

    pair.pump(&host, &guest).unwrap();
    assert_eq!(seen.values(), vec![json!("early")]);
}

#[test]
fn test_handshake_survives_both_sides_racing() {
    // both constructions already happened in linked_channels(), so both
    // pings are in flight at once; the pong path must still converge
    let (pair, host, guest) = linked_channels();
    pair.pump(&host, &guest).unwrap();
    assert!(host.is_ready());
    assert!(guest.is_ready());

    // and the link still works end to end
    let seen = ValueSink::new();
    let sink = seen.clone();
    guest
        .bind(
            "after",
            move |_req: Option<&RequestHandle>, params: Params| -> HandlerResult {
                let mut record = sink.recorder();
                record(params.into_json());
                Ok(Value::Null)
            },
        )
        .unwrap();
    host.notify("after", Params::from(true)).unwrap();
    pair.pump(&host, &guest).unwrap();
    assert_eq!(seen.values(), vec![json!(true)]);
}
