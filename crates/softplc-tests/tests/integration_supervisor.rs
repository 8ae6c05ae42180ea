// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Supervisor Integration Tests
//!
//! Drives scripted sources through the supervisor on a paused tokio clock.
//!
//! ## Test Categories
//!
//! - Happy path: transitions, snapshot cadence, timestamps
//! - Failure path: connect and poll timeouts, retry timing, indefinite retries
//! - Shutdown from every waiting state
//! - Isolation between healthy and failing sources

use std::time::Duration;

use softplc_core::{Duration as PlcDuration, SourceEvent, SourceState, VariableValue};
use softplc_modbus::{DataType, ModbusTcpConfig, RegisterArea, RegisterMapping};
use softplc_tests::prelude::*;

use softplc_core::SourceState::{Backoff, Connected, Connecting, Polling, Stopped};

const MS_100: Duration = Duration::from_millis(100);

// =============================================================================
// Happy Path
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_healthy_source_polls_on_schedule() {
    init_test_logging();
    let harness = SupervisorHarness::new();
    let mut snapshots = harness.store.subscribe();

    let mock = MockSourceConfig::new("press-1", MockBehavior::Healthy);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(450)).await;

    assert_eq!(
        harness.recorder.states_of("press-1"),
        vec![Connecting, Connected, Polling]
    );

    let instants = harness.recorder.snapshot_instants("press-1");
    assert_eq!(instants.len(), 5);
    assert!(gaps(&instants).iter().all(|gap| *gap == MS_100));
    assert_eq!(harness.store.snapshot_count("press-1"), 5);
    assert_eq!(probe.connects(), 1);
    assert_eq!(probe.polls(), 5);

    let mut received = Vec::new();
    while let Ok(snapshot) = snapshots.try_recv() {
        received.push(snapshot);
    }
    let sequences: Vec<u64> = received.iter().map(|s| s.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    assert!(received.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    assert!(received.iter().all(|s| s.protocol == "mock" && s.values.len() == 1));

    let status = harness.supervisor.status("press-1").unwrap();
    assert_eq!(status.state, Polling);
    assert_eq!(status.polls_ok, 5);
    assert_eq!(status.consecutive_failures, 0);
    assert_eq!(status.endpoint, "mock://press-1");

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_latest_values_reach_store() {
    let harness = SupervisorHarness::new();
    harness
        .supervisor
        .spawn(MockSourceConfig::new("press-1", MockBehavior::Healthy).validated())
        .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    let values = harness.store.source_values("press-1");
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].0, "count");

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

// =============================================================================
// Failure Path
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_hanging_connect_times_out_then_waits_retry_interval() {
    init_test_logging();
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("hang", MockBehavior::HangingConnect).with_timing(50, 100, 200);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(1100)).await;

    let connecting = harness.recorder.entries_into("hang", Connecting);
    let backoff = harness.recorder.entries_into("hang", Backoff);
    assert_eq!(connecting.len(), 5);
    assert_eq!(backoff.len(), 5);

    for (entered, failed) in connecting.iter().zip(&backoff) {
        assert_eq!(*failed - *entered, Duration::from_millis(50));
    }
    for (failed, retried) in backoff.iter().zip(connecting.iter().skip(1)) {
        assert_eq!(*retried - *failed, Duration::from_millis(200));
    }

    assert_eq!(probe.connects(), 5);
    assert_eq!(probe.polls(), 0);
    assert_eq!(harness.store.snapshot_count("hang"), 0);
    assert_eq!(harness.recorder.snapshot_count("hang"), 0);

    let status = harness.supervisor.status("hang").unwrap();
    assert_eq!(status.state, Backoff);
    assert_eq!(status.connect_attempts, 5);
    assert_eq!(status.consecutive_failures, 5);
    assert!(status.last_error.is_some());

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_backoff_event_carries_retry_delay() {
    let harness = SupervisorHarness::new();
    harness
        .supervisor
        .spawn(
            MockSourceConfig::new("refused", MockBehavior::FailingConnect)
                .with_timing(50, 100, 300)
                .validated(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(10)).await;

    let backoff = harness
        .recorder
        .events_of("refused")
        .into_iter()
        .find(|r| r.event.new_state() == Some(Backoff))
        .unwrap();

    match backoff.event {
        SourceEvent::StateChanged {
            from,
            error,
            retry_in_ms,
            ..
        } => {
            assert_eq!(from, Connecting);
            assert!(error.unwrap().contains("connection refused"));
            assert_eq!(retry_in_ms, Some(300));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_failing_source_retries_indefinitely() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("refused", MockBehavior::FailingConnect).with_timing(50, 100, 100);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(10_050)).await;

    assert_eq!(probe.connects(), 101);
    assert_eq!(harness.supervisor.status("refused").unwrap().connect_attempts, 101);
    assert_eq!(harness.store.snapshot_count("refused"), 0);
    assert!(!harness.recorder.states_of("refused").contains(&Polling));

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_exponential_backoff_grows_to_cap() {
    let harness = SupervisorHarness::with_settings(SupervisorSettings::with_backoff(
        BackoffPolicy::exponential(2.0, Duration::from_secs(1)),
    ));
    harness
        .supervisor
        .spawn(
            MockSourceConfig::new("refused", MockBehavior::FailingConnect)
                .with_timing(50, 100, 100)
                .validated(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(2600)).await;

    let attempts = harness.recorder.entries_into("refused", Connecting);
    assert_eq!(
        gaps(&attempts),
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
            Duration::from_millis(1000),
        ]
    );

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_poll_failure_reconnects() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("flaky", MockBehavior::PollFailsOn(3));
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(450)).await;

    assert_eq!(
        harness.recorder.states_of("flaky"),
        vec![Connecting, Connected, Polling, Backoff, Connecting, Connected, Polling]
    );
    assert_eq!(probe.connects(), 2);
    assert_eq!(probe.closes(), 1);

    let status = harness.supervisor.status("flaky").unwrap();
    assert_eq!(status.polls_failed, 1);
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_error.is_none());

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_hanging_poll_times_out_into_backoff() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("slow", MockBehavior::PollHangsOn(2)).with_timing(50, 100, 200);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;

    // Poll 1 at 0ms succeeds, poll 2 starts at 100ms and hangs.
    let polling = harness.recorder.entries_into("slow", Polling);
    let backoff = harness.recorder.entries_into("slow", Backoff);
    assert_eq!(polling.len(), 1);
    assert_eq!(backoff.len(), 1);
    assert_eq!(backoff[0] - polling[0], Duration::from_millis(150));

    assert_eq!(probe.polls(), 2);
    assert_eq!(probe.closes(), 1);
    assert_eq!(harness.store.snapshot_count("slow"), 1);
    assert_eq!(harness.recorder.snapshot_count("slow"), 1);

    let status = harness.supervisor.status("slow").unwrap();
    assert_eq!(status.state, Backoff);
    assert_eq!(status.polls_ok, 1);
    assert_eq!(status.polls_failed, 1);
    assert!(status.last_error.unwrap().contains("timed out"));

    // Reconnects after the retry interval and polls again at once.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(probe.connects(), 2);
    assert_eq!(harness.store.snapshot_count("slow"), 2);

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_modbus_source_reads_all_registers_after_timed_out_poll() {
    let device = SimulatedDevice::new();
    device.set_holding(0, 0x42F6);
    device.set_holding(1, 0xE979);
    device.set_coil(5, true);
    // Two reads per poll: the third read is the first one of poll 2.
    device.hang_on_read(3);

    let mut modbus = ModbusTcpConfig::new("press-1", "sim")
        .with_register(RegisterMapping::new("temperature", RegisterArea::Holding, 0, DataType::Float32))
        .with_register(RegisterMapping::new("running", RegisterArea::Coil, 5, DataType::Bool));
    modbus.timeout = PlcDuration::from_millis(50);
    modbus.poll_interval = PlcDuration::from_millis(100);
    modbus.retry_interval = PlcDuration::from_millis(200);

    let harness = SupervisorHarness::new();
    let mut snapshots = harness.store.subscribe();
    let config = ValidatedConfig::new(Box::new(SimulatedModbusConfig::new(modbus, device.clone())))
        .unwrap();
    harness.supervisor.spawn(config).unwrap();

    // Polls at 0ms and 100ms (times out at 150ms), reconnect at 350ms, polls at 350ms and 450ms.
    tokio::time::sleep(Duration::from_millis(500)).await;

    let status = harness.supervisor.status("press-1").unwrap();
    assert_eq!(status.state, Polling);
    assert_eq!(status.polls_failed, 1);
    assert_eq!(status.polls_ok, 3);

    let mut received = Vec::new();
    while let Ok(snapshot) = snapshots.try_recv() {
        received.push(snapshot);
    }
    assert_eq!(received.len(), 3);
    for snapshot in &received {
        let names: Vec<&str> = snapshot.values.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["temperature", "running"]);
        assert_eq!(snapshot.values[1], VariableValue::new("running", true));
    }
    assert_eq!(harness.store.source_values("press-1").len(), 2);
    assert_eq!(device.reads(), 7);

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_shutdown_from_polling() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("press-1", MockBehavior::Healthy);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert_eq!(harness.supervisor.status("press-1").unwrap().state, Polling);

    let grace = Duration::from_secs(1);
    let report = harness.supervisor.shutdown(grace).await;

    assert!(report.is_clean());
    assert_eq!(report.stopped, vec!["press-1".to_string()]);
    assert!(report.elapsed <= grace);
    assert_eq!(probe.closes(), 1);
    assert_eq!(harness.supervisor.status("press-1").unwrap().state, Stopped);
    assert_eq!(harness.recorder.states_of("press-1").last(), Some(&Stopped));
    assert!(!harness.supervisor.is_running());

    let published = harness.store.snapshot_count("press-1");
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(harness.store.snapshot_count("press-1"), published);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_hanging_connect() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("hang", MockBehavior::HangingConnect).with_timing(5_000, 100, 200);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.supervisor.status("hang").unwrap().state, Connecting);

    let report = harness.supervisor.shutdown(Duration::from_secs(1)).await;

    assert!(report.is_clean());
    assert_eq!(harness.recorder.states_of("hang"), vec![Connecting, Stopped]);
    assert_eq!(probe.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_hanging_poll() {
    let harness = SupervisorHarness::new();
    let mock = MockSourceConfig::new("slow", MockBehavior::PollHangsOn(1)).with_timing(5_000, 100, 200);
    let probe = mock.probe();
    harness.supervisor.spawn(mock.validated()).unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.supervisor.status("slow").unwrap().state, Polling);
    assert_eq!(probe.polls(), 1);

    let started = tokio::time::Instant::now();
    let report = harness.supervisor.shutdown(Duration::from_secs(1)).await;

    assert!(report.is_clean());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(
        harness.recorder.states_of("slow"),
        vec![Connecting, Connected, Polling, Stopped]
    );
    assert_eq!(probe.closes(), 1);
    assert_eq!(harness.store.snapshot_count("slow"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_interrupts_backoff() {
    let harness = SupervisorHarness::new();
    harness
        .supervisor
        .spawn(
            MockSourceConfig::new("refused", MockBehavior::FailingConnect)
                .with_timing(50, 100, 60_000)
                .validated(),
        )
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(harness.supervisor.status("refused").unwrap().state, Backoff);

    let started = tokio::time::Instant::now();
    let report = harness.supervisor.shutdown(Duration::from_secs(1)).await;

    assert!(report.is_clean());
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(harness.recorder.states_of("refused"), vec![Connecting, Backoff, Stopped]);
}

#[tokio::test(start_paused = true)]
async fn test_second_shutdown_is_empty() {
    let harness = SupervisorHarness::new();
    harness
        .supervisor
        .spawn(MockSourceConfig::new("press-1", MockBehavior::Healthy).validated())
        .unwrap();

    let first = harness.supervisor.shutdown(Duration::from_secs(1)).await;
    let second = harness.supervisor.shutdown(Duration::from_secs(1)).await;

    assert_eq!(first.total(), 1);
    assert_eq!(second.total(), 0);
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_failing_sources_do_not_disturb_healthy_ones() {
    init_test_logging();
    let harness = SupervisorHarness::new();

    let healthy = MockSourceConfig::new("healthy", MockBehavior::Healthy);
    let healthy_probe = healthy.probe();
    let flaky = MockSourceConfig::new("flaky", MockBehavior::PollFailsOn(3));
    let flaky_probe = flaky.probe();

    let failed = harness.supervisor.spawn_all(vec![
        healthy.validated(),
        flaky.validated(),
        MockSourceConfig::new("refused", MockBehavior::FailingConnect).validated(),
        MockSourceConfig::new("hang", MockBehavior::HangingConnect).validated(),
    ]);
    assert!(failed.is_empty());

    tokio::time::sleep(Duration::from_millis(950)).await;

    let instants = harness.recorder.snapshot_instants("healthy");
    assert_eq!(instants.len(), 10);
    assert!(gaps(&instants).iter().all(|gap| *gap == MS_100));
    assert_eq!(healthy_probe.connects(), 1);
    assert_eq!(
        harness.recorder.states_of("healthy"),
        vec![Connecting, Connected, Polling]
    );

    assert_eq!(harness.store.snapshot_count("flaky"), 8);
    assert_eq!(flaky_probe.closes(), 1);
    assert_eq!(harness.store.snapshot_count("refused"), 0);
    assert_eq!(harness.store.snapshot_count("hang"), 0);

    let states: Vec<(String, SourceState)> = harness
        .supervisor
        .statuses()
        .into_iter()
        .map(|s| (s.name, s.state))
        .collect();
    assert_eq!(
        states,
        vec![
            ("flaky".to_string(), Polling),
            ("hang".to_string(), Backoff),
            ("healthy".to_string(), Polling),
            ("refused".to_string(), Backoff),
        ]
    );

    let report = harness.supervisor.shutdown(Duration::from_secs(1)).await;
    assert!(report.is_clean());
    assert_eq!(report.stopped.len(), 4);
    assert_eq!(healthy_probe.closes(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_spawn_leaves_original_running() {
    let harness = SupervisorHarness::new();
    let original = MockSourceConfig::new("press-1", MockBehavior::Healthy);
    let probe = original.probe();

    let failed = harness.supervisor.spawn_all(vec![
        original.validated(),
        MockSourceConfig::new("press-1", MockBehavior::FailingConnect).validated(),
    ]);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0, "press-1");

    tokio::time::sleep(Duration::from_millis(150)).await;
    assert_eq!(harness.supervisor.len(), 1);
    assert_eq!(probe.connects(), 1);
    assert_eq!(harness.store.snapshot_count("press-1"), 2);

    harness.supervisor.shutdown(Duration::from_secs(1)).await;
}
