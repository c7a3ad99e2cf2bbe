//! Integration tests for sink-redirect.
//!
//! Every scenario runs against `MockServer`; no sound server is needed.
//! The live PulseAudio test lives in the backend module and is `#[ignore]`d.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use sink_redirect::server::{EventKind, Facility, MockTrace, ServerEvent};
use sink_redirect::{
    MockServer, RedirectConfig, RedirectError, RedirectEvent, RedirectStats, RetryPolicy, SinkId,
    SinkInfo, SinkRedirect, StreamId, DEFAULT_REASSIGNER_CLIENT,
};

const TARGET: &str = "alsa_output.usb-headset.analog-stereo";

fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(5))
}

fn new_stream(index: u32) -> ServerEvent {
    ServerEvent::new(Facility::SinkInput, EventKind::New, index)
}

fn server_with_target() -> MockServer {
    MockServer::new().with_sinks(vec![
        SinkInfo::new(0, "alsa_output.pci-0000_00_1f.3.analog-stereo"),
        SinkInfo::new(5, TARGET),
    ])
}

fn position(trace: &[MockTrace], wanted: &MockTrace) -> usize {
    trace
        .iter()
        .position(|entry| entry == wanted)
        .unwrap_or_else(|| panic!("{wanted:?} missing from trace"))
}

#[test]
fn test_three_streams_moved_in_order() {
    let server = server_with_target().with_events([new_stream(10), new_stream(11), new_stream(12)]);

    let session = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(fast_retry())
        .start(Arc::new(server.clone()))
        .unwrap();
    assert_eq!(session.sink().id, SinkId::new(5));

    let (result, stats) = session.run_and_join();
    assert!(matches!(
        result,
        Err(RedirectError::ListenerDisconnected { .. })
    ));

    let target = SinkId::new(5);
    assert_eq!(
        server.moves(),
        vec![
            (StreamId::new(10), target),
            (StreamId::new(11), target),
            (StreamId::new(12), target),
        ]
    );
    assert_eq!(
        stats,
        RedirectStats {
            streams_dispatched: 3,
            moves_completed: 3,
            moves_failed: 0,
        }
    );

    // Each move happens after the notification that announced its stream
    let trace = server.trace();
    for index in [10, 11, 12] {
        let delivered = position(&trace, &MockTrace::EventDelivered(new_stream(index)));
        let moved = position(
            &trace,
            &MockTrace::MoveAttempted {
                client_name: DEFAULT_REASSIGNER_CLIENT.to_string(),
                stream: StreamId::new(index),
                sink: target,
                succeeded: true,
            },
        );
        assert!(delivered < moved, "stream {index} moved before announced");
    }

    // Moves only ever go through the reassigner's connection
    assert_eq!(
        server.move_clients(),
        vec![DEFAULT_REASSIGNER_CLIENT.to_string(); 3]
    );
}

#[test]
fn test_only_new_playback_streams_are_moved() {
    let server = server_with_target().with_events([
        ServerEvent::new(Facility::SinkInput, EventKind::Change, 3),
        new_stream(4),
        ServerEvent::new(Facility::SinkInput, EventKind::Remove, 4),
        ServerEvent::new(Facility::Sink, EventKind::New, 9),
        ServerEvent::new(Facility::Client, EventKind::New, 2),
        new_stream(7),
    ]);

    let session = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(fast_retry())
        .start(Arc::new(server.clone()))
        .unwrap();
    let (_, stats) = session.run_and_join();

    let target = SinkId::new(5);
    assert_eq!(
        server.moves(),
        vec![(StreamId::new(4), target), (StreamId::new(7), target)]
    );
    assert_eq!(stats.streams_dispatched, 2);
}

#[test]
fn test_missing_sink_starts_nothing() {
    let server = server_with_target().with_events([new_stream(10)]);

    let result = SinkRedirect::builder()
        .target_sink("alsa_output.does-not-exist")
        .retry_policy(fast_retry())
        .start(Arc::new(server.clone()));

    match result {
        Err(RedirectError::SinkNotFound { name }) => {
            assert_eq!(name, "alsa_output.does-not-exist");
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("session started without a sink"),
    }

    // Only the listener connection was opened; no reassigner, no subscription
    assert_eq!(server.connect_attempts(), 1);
    assert!(server.subscriptions().is_empty());
    assert!(server.move_attempts().is_empty());
}

#[test]
fn test_sink_name_must_match_exactly() {
    let server = server_with_target();

    let result = SinkRedirect::builder()
        .target_sink("alsa_output.usb-headset")
        .retry_policy(fast_retry())
        .start(Arc::new(server));

    assert!(matches!(result, Err(RedirectError::SinkNotFound { .. })));
}

#[test]
fn test_connection_flaps_then_succeeds() {
    let server = server_with_target()
        .fail_connects(4)
        .with_events([new_stream(21)]);

    let session = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(fast_retry())
        .start(Arc::new(server.clone()))
        .unwrap();
    let (_, stats) = session.run_and_join();

    // Four failures plus the listener's success, then the reassigner's
    assert_eq!(server.connect_attempts(), 6);
    assert_eq!(server.moves(), vec![(StreamId::new(21), SinkId::new(5))]);
    assert_eq!(stats.moves_completed, 1);
}

#[test]
fn test_connection_exhausted_after_five_failures() {
    let server = server_with_target().fail_connects(5);

    let result = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(fast_retry())
        .start(Arc::new(server.clone()));

    assert!(matches!(
        result,
        Err(RedirectError::ConnectionExhausted { attempts: 5, .. })
    ));
    assert_eq!(server.connect_attempts(), 5);
    assert!(server.connected_clients().is_empty());
    assert!(server.subscriptions().is_empty());
}

#[test]
fn test_backoff_between_attempts() {
    let backoff = Duration::from_millis(20);
    let server = server_with_target().fail_connects(2);

    let session = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(RetryPolicy::new(5, backoff))
        .start(Arc::new(server.clone()))
        .unwrap();
    drop(session);

    let times = server.connect_times();
    assert!(times.len() >= 3);
    for pair in times[..3].windows(2) {
        assert!(pair[1].duration_since(pair[0]) >= backoff);
    }
}

#[test]
fn test_failed_move_does_not_stop_later_moves() {
    let server = server_with_target()
        .fail_moves_of(StreamId::new(31))
        .with_events([new_stream(30), new_stream(31), new_stream(32)]);

    let events = Arc::new(Mutex::new(Vec::new()));
    let events_clone = Arc::clone(&events);

    let session = SinkRedirect::builder()
        .target_sink(TARGET)
        .retry_policy(fast_retry())
        .on_event(move |event| events_clone.lock().unwrap().push(event))
        .start(Arc::new(server.clone()))
        .unwrap();
    let (_, stats) = session.run_and_join();

    let target = SinkId::new(5);
    assert_eq!(
        server.move_attempts(),
        vec![
            (StreamId::new(30), target),
            (StreamId::new(31), target),
            (StreamId::new(32), target),
        ]
    );
    assert_eq!(stats.moves_completed, 2);
    assert_eq!(stats.moves_failed, 1);

    let events = events.lock().unwrap();
    assert!(matches!(events[0], RedirectEvent::SinkResolved { .. }));
    assert!(events.iter().any(|e| matches!(
        e,
        RedirectEvent::MoveFailed { stream, .. } if *stream == StreamId::new(31)
    )));
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, RedirectEvent::StreamMoved { .. }))
            .count(),
        2
    );
}

#[test]
fn test_custom_client_names() {
    let server = server_with_target();
    let config = RedirectConfig {
        target_sink_name: TARGET.to_string(),
        retry: fast_retry(),
        listener_client_name: "watcher".to_string(),
        reassigner_client_name: "mover".to_string(),
    };

    let session = SinkRedirect::builder()
        .config(config)
        .start(Arc::new(server.clone()))
        .unwrap();
    let (result, stats) = session.run_and_join();

    assert!(result.is_err());
    assert_eq!(stats, RedirectStats::default());
    assert_eq!(
        server.connected_clients(),
        vec!["watcher".to_string(), "mover".to_string()]
    );
}

#[test]
fn test_moves_use_configured_reassigner_client() {
    let server = server_with_target().with_events([new_stream(40), new_stream(41)]);
    let config = RedirectConfig {
        target_sink_name: TARGET.to_string(),
        retry: fast_retry(),
        listener_client_name: "watcher".to_string(),
        reassigner_client_name: "mover".to_string(),
    };

    let session = SinkRedirect::builder()
        .config(config)
        .start(Arc::new(server.clone()))
        .unwrap();
    let (_, stats) = session.run_and_join();

    assert_eq!(stats.moves_completed, 2);
    assert_eq!(
        server.move_clients(),
        vec!["mover".to_string(), "mover".to_string()]
    );
}
