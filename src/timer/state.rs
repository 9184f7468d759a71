use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionDraft;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum TimerMode {
    Timer,
    Stopwatch,
    Pomodoro,
}

impl Default for TimerMode {
    fn default() -> Self {
        TimerMode::Timer
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum ClockDisplay {
    Digital,
    Analog,
}

impl Default for ClockDisplay {
    fn default() -> Self {
        ClockDisplay::Digital
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CountdownState {
    pub duration_minutes: u32,
    pub time_left_seconds: u32,
    pub category: String,
    pub clock: ClockDisplay,
}

impl Default for CountdownState {
    fn default() -> Self {
        Self {
            duration_minutes: 25,
            time_left_seconds: 25 * 60,
            category: "Focus".into(),
            clock: ClockDisplay::Digital,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopwatchState {
    pub elapsed_seconds: u64,
    pub category: String,
    pub clock: ClockDisplay,
}

impl Default for StopwatchState {
    fn default() -> Self {
        Self {
            elapsed_seconds: 0,
            category: "Focus".into(),
            clock: ClockDisplay::Digital,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroState {
    pub focus_seconds: u32,
    pub break_seconds: u32,
    pub is_break: bool,
    pub time_left_seconds: u32,
    pub category: String,
    pub clock: ClockDisplay,
}

impl Default for PomodoroState {
    fn default() -> Self {
        Self {
            focus_seconds: 25 * 60,
            break_seconds: 5 * 60,
            is_break: false,
            time_left_seconds: 25 * 60,
            category: "Focus".into(),
            clock: ClockDisplay::Digital,
        }
    }
}

impl PomodoroState {
    /// Configured length of the segment the clock is currently in.
    pub fn segment_seconds(&self) -> u32 {
        if self.is_break {
            self.break_seconds
        } else {
            self.focus_seconds
        }
    }
}

/// One state record per mode. Modes that are not current keep their progress
/// untouched; switching back resumes from wherever they were left.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModeStates {
    pub timer: CountdownState,
    pub stopwatch: StopwatchState,
    pub pomodoro: PomodoroState,
}

impl ModeStates {
    pub fn category(&self, mode: TimerMode) -> &str {
        match mode {
            TimerMode::Timer => &self.timer.category,
            TimerMode::Stopwatch => &self.stopwatch.category,
            TimerMode::Pomodoro => &self.pomodoro.category,
        }
    }

    pub fn set_category(&mut self, mode: TimerMode, category: &str) {
        match mode {
            TimerMode::Timer => self.timer.category = category.to_owned(),
            TimerMode::Stopwatch => self.stopwatch.category = category.to_owned(),
            TimerMode::Pomodoro => self.pomodoro.category = category.to_owned(),
        }
    }

    pub fn clock(&self, mode: TimerMode) -> ClockDisplay {
        match mode {
            TimerMode::Timer => self.timer.clock,
            TimerMode::Stopwatch => self.stopwatch.clock,
            TimerMode::Pomodoro => self.pomodoro.clock,
        }
    }

    pub fn set_clock(&mut self, mode: TimerMode, clock: ClockDisplay) {
        match mode {
            TimerMode::Timer => self.timer.clock = clock,
            TimerMode::Stopwatch => self.stopwatch.clock = clock,
            TimerMode::Pomodoro => self.pomodoro.clock = clock,
        }
    }

    /// Put the given mode's clock back to its configured starting value.
    pub fn reset_clock(&mut self, mode: TimerMode) {
        match mode {
            TimerMode::Timer => {
                self.timer.time_left_seconds = self.timer.duration_minutes.saturating_mul(60);
            }
            TimerMode::Stopwatch => self.stopwatch.elapsed_seconds = 0,
            TimerMode::Pomodoro => {
                self.pomodoro.time_left_seconds = self.pomodoro.segment_seconds();
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineState {
    pub is_active: bool,
    pub is_paused: bool,
    pub current_mode: TimerMode,
    /// One-shot latch: set before any completion side effect runs, so a
    /// redundant tick at the zero boundary cannot fire the transition twice.
    pub has_finished: bool,
    /// Flips true once restore() has been applied; consumers must not render
    /// timer state before this.
    pub hydrated: bool,
    pub run_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            is_active: false,
            is_paused: false,
            current_mode: TimerMode::Timer,
            has_finished: false,
            hydrated: false,
            run_id: None,
            started_at: None,
        }
    }
}

/// Outcome of a single one-second tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// The tick arrived while inactive or paused; nothing advanced.
    Skipped,
    Advanced,
    Finished(FinishEvent),
}

/// A countdown reached zero naturally.
#[derive(Debug)]
pub struct FinishEvent {
    pub draft: SessionDraft,
    /// True when the completion deactivated the engine (plain countdown).
    /// Pomodoro rolls into the next segment and keeps running.
    pub engine_stopped: bool,
}

fn minutes_rounded(seconds: u64) -> u32 {
    (seconds as f64 / 60.0).round() as u32
}

/// The timer state machine proper: single-threaded, no interior clock. The
/// async layer owns the tick source and calls in once per elapsed second.
#[derive(Debug, Clone, Default)]
pub struct EngineCore {
    pub state: EngineState,
    pub modes: ModeStates,
}

impl EngineCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Why `start()` is currently rejected, if it is.
    pub fn start_blocker(&self) -> Option<&'static str> {
        match self.state.current_mode {
            TimerMode::Timer => {
                let t = &self.modes.timer;
                if t.duration_minutes == 0 {
                    Some("duration must be greater than zero")
                } else if t.category.is_empty() {
                    Some("category must not be empty")
                } else {
                    None
                }
            }
            TimerMode::Stopwatch => {
                if self.modes.stopwatch.category.is_empty() {
                    Some("category must not be empty")
                } else {
                    None
                }
            }
            TimerMode::Pomodoro => {
                let p = &self.modes.pomodoro;
                if p.focus_seconds == 0 || p.break_seconds == 0 {
                    Some("focus and break lengths must be greater than zero")
                } else if p.category.is_empty() {
                    Some("category must not be empty")
                } else {
                    None
                }
            }
        }
    }

    pub fn can_start(&self) -> bool {
        self.start_blocker().is_none()
    }

    /// Idempotent while already active.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.state.is_active {
            return Ok(());
        }
        if let Some(reason) = self.start_blocker() {
            bail!("{reason}");
        }
        self.state.is_active = true;
        self.state.is_paused = false;
        self.state.has_finished = false;
        self.state.run_id = Some(Uuid::new_v4());
        self.state.started_at = Some(now);
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.state.is_active {
            self.state.is_paused = true;
        }
    }

    pub fn resume(&mut self) {
        if self.state.is_active {
            self.state.is_paused = false;
            self.state.has_finished = false;
        }
    }

    /// Advance the current mode's clock by one second. The finish transition
    /// fires only on the 1 -> 0 crossing, so a tick that lands while the clock
    /// already reads zero cannot re-trigger it.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.state.is_active || self.state.is_paused {
            return TickOutcome::Skipped;
        }
        match self.state.current_mode {
            TimerMode::Timer => {
                let crossed = {
                    let t = &mut self.modes.timer;
                    let before = t.time_left_seconds;
                    t.time_left_seconds = before.saturating_sub(1);
                    before == 1
                };
                if crossed {
                    self.finish_countdown(now)
                } else {
                    TickOutcome::Advanced
                }
            }
            TimerMode::Stopwatch => {
                self.modes.stopwatch.elapsed_seconds += 1;
                TickOutcome::Advanced
            }
            TimerMode::Pomodoro => {
                let crossed = {
                    let p = &mut self.modes.pomodoro;
                    let before = p.time_left_seconds;
                    p.time_left_seconds = before.saturating_sub(1);
                    before == 1
                };
                if crossed {
                    self.finish_pomodoro(now)
                } else {
                    TickOutcome::Advanced
                }
            }
        }
    }

    fn finish_countdown(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state.has_finished {
            return TickOutcome::Advanced;
        }
        self.state.has_finished = true;

        let t = &mut self.modes.timer;
        let draft = SessionDraft {
            mode: TimerMode::Timer,
            category: t.category.clone(),
            // Natural completion credits the full configured duration.
            duration_minutes: t.duration_minutes,
            started_at: self.state.started_at.unwrap_or(now),
        };
        t.time_left_seconds = t.duration_minutes.saturating_mul(60);
        self.state.is_active = false;
        self.state.is_paused = false;
        self.state.run_id = None;
        self.state.started_at = None;
        TickOutcome::Finished(FinishEvent {
            draft,
            engine_stopped: true,
        })
    }

    fn finish_pomodoro(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state.has_finished {
            return TickOutcome::Advanced;
        }
        self.state.has_finished = true;

        let p = &mut self.modes.pomodoro;
        let draft = SessionDraft {
            mode: TimerMode::Pomodoro,
            category: p.category.clone(),
            // The segment that just completed, before the break flip.
            duration_minutes: minutes_rounded(u64::from(p.segment_seconds())),
            started_at: self.state.started_at.unwrap_or(now),
        };
        p.is_break = !p.is_break;
        p.time_left_seconds = p.segment_seconds();
        // The next segment is a fresh countdown with its own completion.
        self.state.has_finished = false;
        self.state.started_at = Some(now);
        TickOutcome::Finished(FinishEvent {
            draft,
            engine_stopped: false,
        })
    }

    /// Always callable. Credits the time actually spent in the current run
    /// (not the configured target), resets the current mode's clock, and
    /// deactivates. The caller decides whether the draft gets recorded.
    pub fn stop(&mut self, now: DateTime<Utc>) -> SessionDraft {
        let started_at = self.state.started_at.unwrap_or(now);
        let draft = match self.state.current_mode {
            TimerMode::Timer => {
                let t = &self.modes.timer;
                let total = u64::from(t.duration_minutes.saturating_mul(60));
                let used = total.saturating_sub(u64::from(t.time_left_seconds));
                SessionDraft {
                    mode: TimerMode::Timer,
                    category: t.category.clone(),
                    duration_minutes: minutes_rounded(used),
                    started_at,
                }
            }
            TimerMode::Stopwatch => SessionDraft {
                mode: TimerMode::Stopwatch,
                category: self.modes.stopwatch.category.clone(),
                duration_minutes: minutes_rounded(self.modes.stopwatch.elapsed_seconds),
                started_at,
            },
            TimerMode::Pomodoro => {
                let p = &self.modes.pomodoro;
                let total = u64::from(p.segment_seconds());
                let used = total.saturating_sub(u64::from(p.time_left_seconds));
                SessionDraft {
                    mode: TimerMode::Pomodoro,
                    category: p.category.clone(),
                    duration_minutes: minutes_rounded(used),
                    started_at,
                }
            }
        };
        self.modes.reset_clock(self.state.current_mode);
        self.state.is_active = false;
        self.state.is_paused = false;
        self.state.run_id = None;
        self.state.started_at = None;
        draft
    }

    /// Rejected while a clock is running; returns whether the switch applied.
    pub fn set_mode(&mut self, mode: TimerMode) -> bool {
        if self.state.is_active {
            return false;
        }
        self.state.current_mode = mode;
        true
    }

    /// Countdown mode only. Zero is accepted as the "not yet configured"
    /// sentinel and keeps `start()` disabled.
    pub fn set_duration(&mut self, minutes: u32) {
        match self.state.current_mode {
            TimerMode::Timer => {
                self.modes.timer.duration_minutes = minutes;
                self.modes.timer.time_left_seconds = minutes.saturating_mul(60);
            }
            TimerMode::Stopwatch | TimerMode::Pomodoro => {}
        }
    }

    pub fn set_category(&mut self, category: &str) {
        self.modes.set_category(self.state.current_mode, category);
    }

    pub fn set_pomodoro_config(&mut self, focus_minutes: u32, break_minutes: u32, is_break: bool) {
        let p = &mut self.modes.pomodoro;
        p.focus_seconds = focus_minutes.saturating_mul(60);
        p.break_seconds = break_minutes.saturating_mul(60);
        p.is_break = is_break;
        p.time_left_seconds = p.segment_seconds();
    }

    pub fn set_clock_display(&mut self, mode: TimerMode, clock: ClockDisplay) {
        self.modes.set_clock(mode, clock);
    }

    /// Seconds shown on the current mode's clock face.
    pub fn display_seconds(&self) -> u64 {
        match self.state.current_mode {
            TimerMode::Timer => u64::from(self.modes.timer.time_left_seconds),
            TimerMode::Stopwatch => self.modes.stopwatch.elapsed_seconds,
            TimerMode::Pomodoro => u64::from(self.modes.pomodoro.time_left_seconds),
        }
    }
}
