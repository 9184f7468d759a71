//! End-to-end engine flows against the public API: real ticker task, real
//! durable store, in-memory recorder and cue.

use std::path::Path;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use focuslog::audio::CompletionCue;
use focuslog::identity::SharedIdentity;
use focuslog::session::{SessionRecord, SessionSink};
use focuslog::store::PersistenceBridge;
use focuslog::timer::{TimerEngine, TimerMode};

#[derive(Default)]
struct RecordingSink {
    records: Mutex<Vec<SessionRecord>>,
}

impl RecordingSink {
    fn submitted(&self) -> Vec<SessionRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl SessionSink for RecordingSink {
    fn submit(&self, record: SessionRecord) {
        self.records.lock().unwrap().push(record);
    }
}

#[derive(Default)]
struct CountingCue {
    plays: AtomicUsize,
}

impl CompletionCue for CountingCue {
    fn play(&self) {
        self.plays.fetch_add(1, Ordering::SeqCst);
    }
}

fn build_engine(state_dir: &Path) -> (TimerEngine, Arc<RecordingSink>, Arc<CountingCue>) {
    let bridge = Arc::new(PersistenceBridge::open(state_dir.to_path_buf()).unwrap());
    let sink = Arc::new(RecordingSink::default());
    let cue = Arc::new(CountingCue::default());
    let identity = Arc::new(SharedIdentity::from_user_id(Some("user-1".into())));
    let engine = TimerEngine::new(bridge, sink.clone(), identity, cue.clone())
        .with_tick_interval(Duration::from_millis(5));
    (engine, sink, cue)
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test]
async fn countdown_runs_to_completion_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, sink, cue) = build_engine(dir.path());
    engine.hydrate().await;
    engine.set_duration(1).await;
    engine.set_category("Deep work").await;
    engine.start().await.unwrap();

    // 60 ticks at 5ms, with margin.
    sleep_ms(700).await;

    let snapshot = engine.snapshot().await;
    assert!(!snapshot.is_active, "countdown should deactivate on finish");
    assert_eq!(snapshot.display_seconds, 60, "clock resets to the target");

    let records = sink.submitted();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].category, "Deep work");
    assert_eq!(records[0].duration_minutes, 1);
    assert_eq!(cue.plays.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pomodoro_cycles_segments_and_records_each() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, sink, cue) = build_engine(dir.path());
    engine.hydrate().await;
    engine.set_mode(TimerMode::Pomodoro).await;
    engine.set_pomodoro_config(1, 1, false).await;
    engine.start().await.unwrap();

    // Long enough for the focus segment and the following break to complete.
    sleep_ms(800).await;

    let snapshot = engine.snapshot().await;
    assert!(snapshot.is_active, "pomodoro keeps running across segments");

    let records = sink.submitted();
    assert!(records.len() >= 2, "each completed segment is recorded");
    assert!(records.iter().all(|r| r.duration_minutes == 1));
    assert!(cue.plays.load(Ordering::SeqCst) >= 2);

    engine.stop().await;
    assert!(!engine.snapshot().await.is_active);
    engine.shutdown().await;
}

#[tokio::test]
async fn paused_run_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    {
        let (engine, _sink, _cue) = build_engine(dir.path());
        engine.hydrate().await;
        engine.set_mode(TimerMode::Stopwatch).await;
        engine.set_category("Reading").await;
        engine.start().await.unwrap();
        sleep_ms(100).await;
        engine.pause().await;
        engine.shutdown().await;
    }

    let (engine, _sink, _cue) = build_engine(dir.path());
    engine.hydrate().await;

    let snapshot = engine.snapshot().await;
    assert!(snapshot.ready);
    assert!(snapshot.is_active && snapshot.is_paused);
    assert_eq!(snapshot.mode, TimerMode::Stopwatch);
    assert_eq!(snapshot.category, "Reading");
    assert!(snapshot.display_seconds > 0, "elapsed time is restored");

    // Paused on restore: the clock must not be ticking.
    let frozen = snapshot.display_seconds;
    sleep_ms(60).await;
    assert_eq!(engine.snapshot().await.display_seconds, frozen);
}
