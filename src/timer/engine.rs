use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    audio::CompletionCue,
    identity::{Identity, IdentityProvider},
    session::{SessionDraft, SessionSink},
    store::{PersistenceBridge, RestoredState},
};

use super::{ClockDisplay, EngineCore, ModeStates, TickOutcome, TimerMode};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSnapshot {
    /// False until the one-time restore has been applied; consumers must not
    /// render timer state before this flips.
    pub ready: bool,
    pub is_active: bool,
    pub is_paused: bool,
    pub mode: TimerMode,
    pub category: String,
    pub clock: ClockDisplay,
    pub display_seconds: u64,
    pub modes: ModeStates,
}

/// Single authority over the running clock. Owns the state machine, the one
/// tick source, and the collaborators that completion events fan out to.
///
/// The ticker is an abortable task; start/resume spawn it (aborting any
/// predecessor first) and pause/stop/shutdown abort it, so at most one tick
/// source is ever alive.
#[derive(Clone)]
pub struct TimerEngine {
    core: Arc<Mutex<EngineCore>>,
    bridge: Arc<PersistenceBridge>,
    sink: Arc<dyn SessionSink>,
    identity: Arc<dyn IdentityProvider>,
    cue: Arc<dyn CompletionCue>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    tick_interval: Duration,
}

impl TimerEngine {
    pub fn new(
        bridge: Arc<PersistenceBridge>,
        sink: Arc<dyn SessionSink>,
        identity: Arc<dyn IdentityProvider>,
        cue: Arc<dyn CompletionCue>,
    ) -> Self {
        Self {
            core: Arc::new(Mutex::new(EngineCore::new())),
            bridge,
            sink,
            identity,
            cue,
            ticker: Arc::new(Mutex::new(None)),
            tick_interval: Duration::from_secs(1),
        }
    }

    /// Shrink the tick interval; tests drive minutes of clock time in
    /// milliseconds with this.
    pub fn with_tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    /// One-time restore from the durable store. Must complete before the
    /// engine reports ready. A run that was active when the process last
    /// exited picks its clock back up from the restored value.
    pub async fn hydrate(&self) -> RestoredState {
        let restored = self.bridge.restore();
        let resume_ticking = {
            let mut core = self.core.lock().await;
            core.modes.timer = restored.timer.clone();
            core.modes.stopwatch = restored.stopwatch.clone();
            core.modes.pomodoro = restored.pomodoro.clone();
            core.state.current_mode = restored.mode;
            core.state.is_active = restored.is_active;
            core.state.is_paused = restored.is_paused;
            core.state.has_finished = false;
            if core.state.is_active {
                core.state.run_id = Some(Uuid::new_v4());
                core.state.started_at = Some(Utc::now());
            }
            core.state.hydrated = true;
            core.state.is_active && !core.state.is_paused
        };
        if resume_ticking {
            self.spawn_ticker().await;
        }
        restored
    }

    pub async fn is_ready(&self) -> bool {
        self.core.lock().await.state.hydrated
    }

    pub async fn snapshot(&self) -> EngineSnapshot {
        let core = self.core.lock().await;
        EngineSnapshot {
            ready: core.state.hydrated,
            is_active: core.state.is_active,
            is_paused: core.state.is_paused,
            mode: core.state.current_mode,
            category: core.modes.category(core.state.current_mode).to_owned(),
            clock: core.modes.clock(core.state.current_mode),
            display_seconds: core.display_seconds(),
            modes: core.modes.clone(),
        }
    }

    pub async fn can_start(&self) -> bool {
        self.core.lock().await.can_start()
    }

    pub async fn start(&self) -> Result<()> {
        {
            let mut core = self.core.lock().await;
            if core.state.is_active {
                return Ok(());
            }
            core.start(Utc::now())?;
            self.persist(&core);
            if let Some(run_id) = core.state.run_id {
                info!("run {run_id} started in {:?} mode", core.state.current_mode);
            }
        }
        self.spawn_ticker().await;
        Ok(())
    }

    pub async fn pause(&self) {
        {
            let mut core = self.core.lock().await;
            core.pause();
            self.persist(&core);
        }
        self.cancel_ticker().await;
    }

    pub async fn resume(&self) {
        let ticking = {
            let mut core = self.core.lock().await;
            core.resume();
            self.persist(&core);
            core.state.is_active && !core.state.is_paused
        };
        if ticking {
            self.spawn_ticker().await;
        }
    }

    /// Ends the current run: credits the time actually spent, resets the
    /// current mode's clock, and hands the draft to the recorder. The save is
    /// detached; its outcome never reaches back into timer state.
    pub async fn stop(&self) {
        let draft = {
            let mut core = self.core.lock().await;
            let draft = core.stop(Utc::now());
            self.persist(&core);
            draft
        };
        self.cancel_ticker().await;
        self.record(draft);
    }

    pub async fn set_mode(&self, mode: TimerMode) {
        let mut core = self.core.lock().await;
        if core.set_mode(mode) {
            self.persist(&core);
        } else {
            warn!("ignoring switch to {mode:?} while the clock is running");
        }
    }

    pub async fn set_duration(&self, minutes: u32) {
        let mut core = self.core.lock().await;
        core.set_duration(minutes);
        self.persist(&core);
    }

    pub async fn set_category(&self, category: &str) {
        let mut core = self.core.lock().await;
        core.set_category(category);
        self.persist(&core);
    }

    pub async fn set_pomodoro_config(
        &self,
        focus_minutes: u32,
        break_minutes: u32,
        is_break: bool,
    ) {
        let mut core = self.core.lock().await;
        core.set_pomodoro_config(focus_minutes, break_minutes, is_break);
        self.persist(&core);
    }

    pub async fn set_clock_display(&self, mode: TimerMode, clock: ClockDisplay) {
        let mut core = self.core.lock().await;
        core.set_clock_display(mode, clock);
        self.persist(&core);
    }

    /// Aborts the tick source. A dangling tick after teardown would replay
    /// finish logic against stale state.
    pub async fn shutdown(&self) {
        self.cancel_ticker().await;
    }

    fn persist(&self, core: &EngineCore) {
        self.bridge.save_flags(core.state.is_active, core.state.is_paused);
        self.bridge.save_mode(core.state.current_mode);
        self.bridge.save_modes(&core.modes);
    }

    fn record(&self, draft: SessionDraft) {
        match self.identity.current() {
            Identity::User(user_id) => self.sink.submit(draft.into_record(user_id)),
            Identity::Resolving => {
                warn!(
                    "identity still resolving; {:?} session not recorded",
                    draft.mode
                );
            }
            Identity::Anonymous => {
                info!("no signed-in user; {:?} session not recorded", draft.mode);
            }
        }
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let engine = self.clone();
        let tick_interval = self.tick_interval;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(tick_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; consume it so
            // the clock first moves a full interval after starting.
            interval.tick().await;

            loop {
                interval.tick().await;

                let outcome = {
                    let mut core = engine.core.lock().await;
                    if !core.state.is_active || core.state.is_paused {
                        break;
                    }
                    let outcome = core.tick(Utc::now());
                    engine.persist(&core);
                    outcome
                };

                if let TickOutcome::Finished(event) = outcome {
                    engine.cue.play();
                    engine.record(event.draft);
                    if event.engine_stopped {
                        break;
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::NullCue;
    use crate::identity::SharedIdentity;
    use crate::session::SessionRecord;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct MemorySink {
        records: StdMutex<Vec<SessionRecord>>,
    }

    impl MemorySink {
        fn submitted(&self) -> Vec<SessionRecord> {
            self.records.lock().unwrap().clone()
        }
    }

    impl SessionSink for MemorySink {
        fn submit(&self, record: SessionRecord) {
            self.records.lock().unwrap().push(record);
        }
    }

    struct Fixture {
        engine: TimerEngine,
        sink: Arc<MemorySink>,
        identity: Arc<SharedIdentity>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let bridge = Arc::new(PersistenceBridge::open(dir.path().to_path_buf()).unwrap());
        let sink = Arc::new(MemorySink::default());
        let identity = Arc::new(SharedIdentity::from_user_id(Some("user-1".into())));
        let engine = TimerEngine::new(
            bridge,
            sink.clone(),
            identity.clone(),
            Arc::new(NullCue),
        )
        .with_tick_interval(Duration::from_millis(10));
        Fixture {
            engine,
            sink,
            identity,
            _dir: dir,
        }
    }

    async fn sleep_ms(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test]
    async fn hydrate_flips_ready_once() {
        let f = fixture();
        assert!(!f.engine.is_ready().await);
        f.engine.hydrate().await;
        assert!(f.engine.is_ready().await);
    }

    #[tokio::test]
    async fn ticker_advances_the_stopwatch() {
        let f = fixture();
        f.engine.hydrate().await;
        f.engine.set_mode(TimerMode::Stopwatch).await;
        f.engine.start().await.unwrap();
        sleep_ms(100).await;

        let snapshot = f.engine.snapshot().await;
        assert!(snapshot.is_active);
        assert!(snapshot.display_seconds > 0);
        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn pause_halts_the_clock() {
        let f = fixture();
        f.engine.hydrate().await;
        f.engine.set_mode(TimerMode::Stopwatch).await;
        f.engine.start().await.unwrap();
        sleep_ms(60).await;
        f.engine.pause().await;

        let frozen = f.engine.snapshot().await.display_seconds;
        sleep_ms(60).await;
        assert_eq!(f.engine.snapshot().await.display_seconds, frozen);

        f.engine.resume().await;
        sleep_ms(60).await;
        assert!(f.engine.snapshot().await.display_seconds > frozen);
        f.engine.shutdown().await;
    }

    #[tokio::test]
    async fn stop_submits_exactly_one_record() {
        let f = fixture();
        f.engine.hydrate().await;
        f.engine.set_mode(TimerMode::Stopwatch).await;
        f.engine.set_category("Writing").await;
        f.engine.start().await.unwrap();
        sleep_ms(50).await;
        f.engine.stop().await;

        let records = f.sink.submitted();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].user_id, "user-1");
        assert_eq!(records[0].category, "Writing");
        assert_eq!(records[0].duration_minutes, 0);

        let snapshot = f.engine.snapshot().await;
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.display_seconds, 0);
    }

    #[tokio::test]
    async fn anonymous_stop_skips_the_save() {
        let f = fixture();
        f.identity.set(Identity::Anonymous);
        f.engine.hydrate().await;
        f.engine.set_mode(TimerMode::Stopwatch).await;
        f.engine.start().await.unwrap();
        sleep_ms(30).await;
        f.engine.stop().await;

        assert!(f.sink.submitted().is_empty());
        // Timer state is unaffected by the skipped save.
        assert!(!f.engine.snapshot().await.is_active);
    }

    #[tokio::test]
    async fn resolving_identity_is_treated_as_anonymous() {
        let f = fixture();
        f.identity.set(Identity::Resolving);
        f.engine.hydrate().await;
        f.engine.set_mode(TimerMode::Stopwatch).await;
        f.engine.start().await.unwrap();
        f.engine.stop().await;

        assert!(f.sink.submitted().is_empty());
    }

    #[tokio::test]
    async fn countdown_completion_stops_and_credits_full_duration() {
        let f = fixture();
        f.engine.hydrate().await;
        f.engine.set_duration(1).await;
        f.engine.start().await.unwrap();

        // 60 ticks at 10ms, with margin.
        sleep_ms(900).await;

        let snapshot = f.engine.snapshot().await;
        assert!(!snapshot.is_active);
        assert_eq!(snapshot.display_seconds, 60);

        let records = f.sink.submitted();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].duration_minutes, 1);
    }

    #[tokio::test]
    async fn hydrated_active_run_resumes_ticking() {
        let dir = tempfile::tempdir().unwrap();
        {
            let bridge = PersistenceBridge::open(dir.path().to_path_buf()).unwrap();
            bridge.save_flags(true, false);
            bridge.save_mode(TimerMode::Stopwatch);
        }

        let bridge = Arc::new(PersistenceBridge::open(dir.path().to_path_buf()).unwrap());
        let engine = TimerEngine::new(
            bridge,
            Arc::new(MemorySink::default()),
            Arc::new(SharedIdentity::from_user_id(None)),
            Arc::new(NullCue),
        )
        .with_tick_interval(Duration::from_millis(10));

        engine.hydrate().await;
        sleep_ms(80).await;

        let snapshot = engine.snapshot().await;
        assert!(snapshot.is_active);
        assert!(snapshot.display_seconds > 0);
        engine.shutdown().await;
    }

    #[tokio::test]
    async fn mode_switch_is_ignored_while_running() {
        let f = fixture();
        f.engine.hydrate().await;
        f.engine.start().await.unwrap();
        f.engine.set_mode(TimerMode::Pomodoro).await;
        assert_eq!(f.engine.snapshot().await.mode, TimerMode::Timer);
        f.engine.shutdown().await;
    }
}
