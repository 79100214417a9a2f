use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::{sleep_until, Instant};

use super::*;
use crate::clock::ManualClock;
use crate::config::BlendConfig;
use crate::transport::{event_channel, CallLog, EventSink, RadioOp, RadioState, RecordingTransport};
use crate::types::Platform;

use RadioOp::{StartAdvertise, StartScan, StopAdvertise, StopScan};

struct Harness {
    scheduler: EpochScheduler,
    log: CallLog,
    sink: EventSink,
    clock: Arc<ManualClock>,
    t0: Instant,
}

fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, h, m, s).unwrap()
}

fn params(scan: f64, epoch: f64) -> EpochParameters {
    BlendConfig {
        scan_duration_seconds: scan,
        epoch_duration_seconds: epoch,
        window_size_minutes: 5,
        retirement_grace_seconds: 3,
    }
    .parameters()
    .unwrap()
}

fn harness(scan: f64, epoch: f64) -> Harness {
    let (transport, log) = RecordingTransport::new();
    let (sink, events) = event_channel();
    let clock = Arc::new(ManualClock::new(at(10, 2, 30)));
    let scheduler = EpochScheduler::builder(params(scan, epoch))
        .clock(clock.clone())
        .spawn(transport, events);

    Harness {
        scheduler,
        log,
        sink,
        clock,
        t0: Instant::now(),
    }
}

impl Harness {
    async fn phase(&self) -> Phase {
        self.scheduler.status().await.unwrap().phase
    }

    async fn sleep_until_secs(&self, secs: f64) {
        sleep_until(self.t0 + Duration::from_secs_f64(secs)).await;
    }

    /// Offsets from the start of the test, in milliseconds, for one operation.
    fn times_of(&self, op: RadioOp) -> Vec<u128> {
        self.log
            .calls()
            .iter()
            .filter(|c| c.op == op)
            .map(|c| (c.at - self.t0).as_millis())
            .collect()
    }
}

#[tokio::test(start_paused = true)]
async fn test_first_epoch_transport_calls() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);
    assert_eq!(h.log.ops(), vec![StartScan]);

    h.sleep_until_secs(1.5).await;
    assert_eq!(h.log.ops(), vec![StartScan, StopScan, StartAdvertise]);
    assert_eq!(h.phase().await, Phase::Advertising);

    h.sleep_until_secs(10.5).await;
    assert_eq!(
        h.log.ops(),
        vec![StartScan, StopScan, StartAdvertise, StopAdvertise, StartScan]
    );
    assert_eq!(h.times_of(StopAdvertise), vec![10_000]);
    assert_eq!(h.phase().await, Phase::Scanning);
}

#[tokio::test(start_paused = true)]
async fn test_epochs_repeat_at_epoch_duration() {
    let h = harness(0.5, 3.0);
    h.scheduler.start();
    h.sleep_until_secs(9.2).await;

    assert_eq!(h.times_of(StartScan), vec![0, 3_000, 6_000, 9_000]);
    assert_eq!(h.times_of(StartAdvertise), vec![500, 3_500, 6_500]);
    assert_eq!(h.times_of(StopAdvertise), vec![3_000, 6_000, 9_000]);

    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.epochs_completed, 3);
    assert!(status.is_scanning && !status.is_advertising);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_scan_takes_effect_at_boundary() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.sleep_until_secs(0.5).await;
    h.scheduler.stop();

    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.phase, Phase::Scanning);
    assert!(!status.schedule_running);
    assert!(status.is_scanning);

    h.sleep_until_secs(30.0).await;
    assert_eq!(h.phase().await, Phase::Stopped);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan]);
    assert_eq!(h.log.count(StartAdvertise), 0);
    assert_eq!(h.times_of(StopScan), vec![1_000]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_advertise_takes_effect_at_boundary() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.sleep_until_secs(4.0).await;
    h.scheduler.stop();
    assert_eq!(h.phase().await, Phase::Advertising);

    h.sleep_until_secs(30.0).await;
    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.phase, Phase::Stopped);
    assert_eq!(status.epochs_completed, 1);
    assert!(!status.is_scanning && !status.is_advertising);
    assert_eq!(
        h.log.ops(),
        vec![StartScan, StopScan, StartAdvertise, StopAdvertise]
    );
}

#[tokio::test(start_paused = true)]
async fn test_repeated_start_is_idempotent() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.start();
    h.sleep_until_secs(0.5).await;
    h.scheduler.start();

    assert_eq!(h.phase().await, Phase::Scanning);
    assert_eq!(h.log.ops(), vec![StartScan]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_stopped_is_noop() {
    let h = harness(1.0, 10.0);
    h.scheduler.stop();
    h.scheduler.exit_background();

    assert_eq!(h.phase().await, Phase::Stopped);
    h.sleep_until_secs(20.0).await;
    assert!(h.log.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_start_revokes_pending_stop() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.stop();
    h.scheduler.start();

    h.sleep_until_secs(1.5).await;
    assert_eq!(h.phase().await, Phase::Advertising);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan, StartAdvertise]);
}

#[tokio::test(start_paused = true)]
async fn test_restart_after_stop() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.stop();
    h.sleep_until_secs(2.0).await;
    assert_eq!(h.phase().await, Phase::Stopped);

    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan, StartScan]);
    assert_eq!(h.times_of(StartScan), vec![0, 2_000]);
}

#[tokio::test(start_paused = true)]
async fn test_background_suspends_schedule() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.enter_background();

    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.phase, Phase::Background);
    assert!(status.is_scanning && status.is_advertising);
    assert_eq!(h.log.ops(), vec![StartScan, StartAdvertise]);

    h.sleep_until_secs(120.0).await;
    assert_eq!(h.log.ops(), vec![StartScan, StartAdvertise]);

    h.scheduler.enter_background();
    assert_eq!(h.phase().await, Phase::Background);
    assert_eq!(h.log.ops().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_background_from_advertise_starts_scan() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.sleep_until_secs(2.0).await;
    h.scheduler.enter_background();

    assert_eq!(h.phase().await, Phase::Background);
    assert_eq!(
        h.log.ops(),
        vec![StartScan, StopScan, StartAdvertise, StartScan]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exit_background_resumes_schedule() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.enter_background();
    h.sleep_until_secs(50.0).await;
    h.scheduler.exit_background();

    assert_eq!(h.phase().await, Phase::Scanning);
    assert_eq!(
        h.log.ops(),
        vec![StartScan, StartAdvertise, StopScan, StopAdvertise, StartScan]
    );

    h.sleep_until_secs(51.5).await;
    assert_eq!(h.phase().await, Phase::Advertising);
    assert_eq!(h.times_of(StartAdvertise), vec![0, 51_000]);
}

#[tokio::test(start_paused = true)]
async fn test_background_ignored_while_stopped() {
    let h = harness(1.0, 10.0);
    h.scheduler.enter_background();

    assert_eq!(h.phase().await, Phase::Stopped);
    assert!(h.log.ops().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_pending_stop_honored_when_entering_background() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.stop();
    h.scheduler.enter_background();

    assert_eq!(h.phase().await, Phase::Stopped);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan]);
}

#[tokio::test(start_paused = true)]
async fn test_stop_in_background_applies_on_exit() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.enter_background();
    h.scheduler.stop();
    assert_eq!(h.phase().await, Phase::Background);

    h.scheduler.exit_background();
    assert_eq!(h.phase().await, Phase::Stopped);
    assert_eq!(
        h.log.ops(),
        vec![StartScan, StartAdvertise, StopScan, StopAdvertise]
    );
}

#[tokio::test(start_paused = true)]
async fn test_discoveries_while_scanning_are_aggregated() {
    let h = harness(5.0, 10.0);
    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);
    h.sink.discovered("nodeA", Platform::Apple);
    h.sink.discovered("nodeA", Platform::Apple);
    h.sink.discovered("0aff", Platform::Android);
    h.scheduler.status().await;

    let window = h.scheduler.read_latest_window().await.unwrap();
    assert_eq!(window.window_start, at(10, 0, 0));
    assert_eq!(window.apple_count, 1);
    assert_eq!(window.android_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_discoveries_while_advertising_are_dropped() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.sleep_until_secs(2.0).await;
    assert_eq!(h.phase().await, Phase::Advertising);

    h.sink.discovered("nodeA", Platform::Apple);
    h.scheduler.status().await;
    assert!(h.scheduler.read_latest_window().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_discoveries_while_stopped_are_dropped() {
    let h = harness(1.0, 10.0);
    h.sink.discovered("nodeA", Platform::Apple);
    h.scheduler.status().await;
    assert!(h.scheduler.read_latest_window().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_discoveries_in_background_are_aggregated() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.enter_background();
    h.sleep_until_secs(5.0).await;

    h.sink.discovered("nodeB", Platform::Android);
    h.scheduler.status().await;

    let window = h.scheduler.read_latest_window().await.unwrap();
    assert_eq!(window.android_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_window_keys_follow_wall_clock() {
    let h = harness(5.0, 10.0);
    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);

    h.clock.set(at(10, 4, 59));
    h.sink.discovered("nodeA", Platform::Apple);
    h.scheduler.status().await;
    h.clock.set(at(10, 5, 1));
    h.sink.discovered("nodeB", Platform::Apple);
    h.scheduler.status().await;

    // 10:00 is closed but still within its grace period.
    let first = h.scheduler.read_latest_window().await.unwrap();
    let again = h.scheduler.read_latest_window().await.unwrap();
    assert_eq!(first, again);
    assert_eq!(first.window_start, at(10, 0, 0));

    h.clock.set(at(10, 5, 4));
    let retired = h.scheduler.read_latest_window().await.unwrap();
    assert_eq!(retired.window_start, at(10, 0, 0));

    let live = h.scheduler.read_latest_window().await.unwrap();
    assert_eq!(live.window_start, at(10, 5, 0));
    assert_eq!(live.apple_count, 1);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_radio_does_not_break_schedule() {
    let h = harness(1.0, 10.0);
    h.log.set_state(RadioState::PoweredOff);
    h.sink.state_changed(RadioState::PoweredOff);
    h.scheduler.start();

    let status = h.scheduler.status().await.unwrap();
    assert_eq!(status.radio_state, RadioState::PoweredOff);
    assert_eq!(status.phase, Phase::Scanning);

    h.sleep_until_secs(1.5).await;
    assert_eq!(h.phase().await, Phase::Advertising);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan, StartAdvertise]);
}

#[tokio::test(start_paused = true)]
async fn test_closed_event_stream_keeps_scheduler_alive() {
    let h = harness(1.0, 10.0);
    drop(h.sink);
    h.scheduler.start();

    sleep_until(h.t0 + Duration::from_millis(1500)).await;
    assert_eq!(
        h.scheduler.status().await.unwrap().phase,
        Phase::Advertising
    );
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_stops_radio_and_returns_windows() {
    let h = harness(5.0, 10.0);
    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);
    h.sink.discovered("nodeA", Platform::Apple);
    h.scheduler.status().await;

    let handle = h.scheduler.handle();
    let windows = h.scheduler.shutdown().await;

    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].apple_count, 1);
    assert_eq!(h.log.ops(), vec![StartScan, StopScan]);
    assert!(handle.status().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_drain_closed_windows_through_handle() {
    let h = harness(5.0, 10.0);
    h.scheduler.start();
    assert_eq!(h.phase().await, Phase::Scanning);
    h.sink.discovered("nodeA", Platform::Apple);
    h.scheduler.status().await;

    let handle = h.scheduler.handle();
    assert!(handle.drain_closed_windows().await.is_empty());

    h.clock.advance_secs(600);
    let closed = handle.drain_closed_windows().await;
    assert_eq!(closed.len(), 1);
    assert!(handle.read_latest_window().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_from_background_stops_both_radios() {
    let h = harness(1.0, 10.0);
    h.scheduler.start();
    h.scheduler.enter_background();
    assert_eq!(h.phase().await, Phase::Background);

    let handle = h.scheduler.handle();
    assert!(h.scheduler.shutdown().await.is_empty());

    assert_eq!(
        h.log.ops(),
        vec![StartScan, StartAdvertise, StopScan, StopAdvertise]
    );
    assert!(handle.status().await.is_none());
}
