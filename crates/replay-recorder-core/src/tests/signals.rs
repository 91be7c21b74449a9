use crate::{
    RecStatus, RecorderError,
    signals::{
        EngineState, OutputSignal, SignalKind, SignalQueue, SignalSynchronizer, Subsystem,
    },
    tests::fake_engine::RecordedStatus,
};

use std::{sync::Arc, time::Duration};

use uuid::Uuid;

fn synchronizer() -> (Arc<SignalSynchronizer>, Arc<RecordedStatus>, Uuid) {
    let status = Arc::new(RecordedStatus::default());
    let synchronizer = Arc::new(SignalSynchronizer::new(status.clone()));
    let session = Uuid::new_v4();
    synchronizer.begin_session(session);
    (synchronizer, status, session)
}

/// WHAT: A Start signal moves the engine to Recording and can be awaited
/// WHY: The buffer controller blocks on this to confirm recording began
#[tokio::test(start_paused = true)]
async fn given_start_signal_when_awaiting_start_queue_then_signal_returned_and_state_recording() {
    // Given: A synchronizer with an active session
    let (synchronizer, status, session) = synchronizer();
    let sink = synchronizer.sink(session);

    // When: The engine reports Starting then Start
    sink.emit(OutputSignal::recording(SignalKind::Starting));
    sink.emit(OutputSignal::recording(SignalKind::Start));
    let signal = synchronizer
        .await_signal(SignalQueue::Start, Duration::from_secs(30))
        .await
        .unwrap();

    // Then: The Start signal is returned, state and status follow
    assert_eq!(signal.kind, SignalKind::Start);
    assert_eq!(synchronizer.state(), EngineState::Recording);
    assert_eq!(
        status.updates(),
        vec![RecStatus::ReadyToRecord, RecStatus::ReadyToRecord]
    );
}

/// WHAT: Signals for other subsystems are ignored entirely
/// WHY: Only the recording output drives the state machine
#[tokio::test(start_paused = true)]
async fn given_streaming_signal_when_handled_then_state_and_queues_unchanged() {
    // Given: A synchronizer with an active session
    let (synchronizer, status, session) = synchronizer();

    // When: A streaming Start signal arrives
    synchronizer.handle_signal(
        session,
        OutputSignal {
            subsystem: Subsystem::Streaming,
            kind: SignalKind::Start,
            code: 0,
            error: None,
        },
    );

    // Then: Nothing changes and nothing is queued
    assert_eq!(synchronizer.state(), EngineState::Offline);
    assert!(status.updates().is_empty());
    let result = synchronizer
        .await_signal(SignalQueue::Start, Duration::from_secs(1))
        .await;
    assert!(matches!(result, Err(RecorderError::SignalTimeout { .. })));
}

/// WHAT: Signals from a previous engine session are dropped
/// WHY: Callbacks from a torn-down session must not corrupt the new one
#[tokio::test(start_paused = true)]
async fn given_stale_session_when_signal_arrives_then_ignored() {
    // Given: A sink bound to an old session
    let (synchronizer, status, old_session) = synchronizer();
    let stale_sink = synchronizer.sink(old_session);
    synchronizer.begin_session(Uuid::new_v4());

    // When: The stale sink emits a Start signal
    stale_sink.emit(OutputSignal::recording(SignalKind::Start));

    // Then: State and status are untouched
    assert_eq!(synchronizer.state(), EngineState::Offline);
    assert!(status.updates().is_empty());
}

/// WHAT: Waiting without a signal fails with SignalTimeout naming the queue
/// WHY: An unconfirmed start must surface as a hard error
#[tokio::test(start_paused = true)]
async fn given_no_signal_when_awaiting_wrote_then_timeout_error() {
    // Given: A synchronizer with nothing queued
    let (synchronizer, _status, _session) = synchronizer();

    // When: Waiting on the wrote queue
    let result = synchronizer
        .await_signal(SignalQueue::Wrote, Duration::from_secs(30))
        .await;

    // Then: Timeout error for the wrote queue
    match result {
        Err(RecorderError::SignalTimeout { queue, .. }) => assert_eq!(queue, SignalQueue::Wrote),
        other => panic!("expected timeout, got {:?}", other),
    }
}

/// WHAT: Extra queued signals are discarded after a successful wait
/// WHY: A stale Start must not satisfy the next wait
#[tokio::test(start_paused = true)]
async fn given_two_queued_starts_when_awaiting_once_then_second_discarded() {
    // Given: Two Start signals queued
    let (synchronizer, _status, session) = synchronizer();
    let sink = synchronizer.sink(session);
    sink.emit(OutputSignal::recording(SignalKind::Start));
    sink.emit(OutputSignal::recording(SignalKind::Start));

    // When: Awaiting twice
    let first = synchronizer
        .await_signal(SignalQueue::Start, Duration::from_secs(30))
        .await;
    let second = synchronizer
        .await_signal(SignalQueue::Start, Duration::from_secs(30))
        .await;

    // Then: Only the first wait succeeds
    assert!(first.is_ok());
    assert!(matches!(second, Err(RecorderError::SignalTimeout { .. })));
}

/// WHAT: Stop signals report WaitingForHost and Wrote is queued without a state change
/// WHY: The UI follows every transition, the wrote queue confirms the file
#[tokio::test(start_paused = true)]
async fn given_stop_sequence_when_handled_then_offline_and_wrote_queued() {
    // Given: A recording engine
    let (synchronizer, status, session) = synchronizer();
    let sink = synchronizer.sink(session);
    sink.emit(OutputSignal::recording(SignalKind::Starting));
    sink.emit(OutputSignal::recording(SignalKind::Start));

    // When: The engine stops and writes the file
    sink.emit(OutputSignal::recording(SignalKind::Stopping));
    sink.emit(OutputSignal::recording(SignalKind::Stop));
    sink.emit(OutputSignal::recording(SignalKind::Wrote));

    // Then: Offline, last status WaitingForHost, wrote signal available
    assert_eq!(synchronizer.state(), EngineState::Offline);
    assert_eq!(status.last(), Some(RecStatus::WaitingForHost));
    assert_eq!(status.updates().len(), 4);
    let wrote = synchronizer
        .await_signal(SignalQueue::Wrote, Duration::from_secs(30))
        .await
        .unwrap();
    assert_eq!(wrote.kind, SignalKind::Wrote);
}

/// WHAT: Ending a session clears queued signals and resets state
/// WHY: Shutdown must not leak confirmations into the next session
#[tokio::test(start_paused = true)]
async fn given_queued_signal_when_session_ends_then_queue_empty() {
    // Given: A queued Start
    let (synchronizer, _status, session) = synchronizer();
    synchronizer
        .sink(session)
        .emit(OutputSignal::recording(SignalKind::Start));

    // When: The session ends
    synchronizer.end_session();

    // Then: Nothing left to await, state is Offline
    assert_eq!(synchronizer.state(), EngineState::Offline);
    let result = synchronizer
        .await_signal(SignalQueue::Start, Duration::from_secs(1))
        .await;
    assert!(result.is_err());
}

/// WHAT: Only the forward cycle of engine states is legal
/// WHY: Skipped transitions indicate a confused engine and are logged
#[test]
fn given_engine_states_when_checking_transitions_then_only_cycle_allowed() {
    // Given/When/Then: Forward cycle is legal, skips are not
    assert!(EngineState::Offline.can_transition_to(EngineState::Starting));
    assert!(EngineState::Starting.can_transition_to(EngineState::Recording));
    assert!(EngineState::Recording.can_transition_to(EngineState::Stopping));
    assert!(EngineState::Stopping.can_transition_to(EngineState::Offline));
    assert!(!EngineState::Offline.can_transition_to(EngineState::Recording));
    assert!(!EngineState::Recording.can_transition_to(EngineState::Offline));
    assert_eq!(EngineState::on_signal(SignalKind::Wrote), None);
}
