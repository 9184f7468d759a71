//! Durable per-user key/value mirror of the engine state, restored once at
//! startup. A missing or malformed key falls back to that field's default
//! without affecting the others.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::timer::{CountdownState, ModeStates, PomodoroState, StopwatchState, TimerMode};

/// Pixel position of the floating timer overlay. Presentational only; kept
/// across reloads so the overlay stays where the user dragged it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OverlayPosition {
    pub x: f64,
    pub y: f64,
}

/// One JSON value per key, one file per key.
pub struct KvStore {
    dir: PathBuf,
}

impl KvStore {
    pub fn open(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create state directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// `None` on a missing key or unparseable content; parse failures are
    /// logged and treated the same as absence.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let contents = fs::read_to_string(self.path_for(key)).ok()?;
        match serde_json::from_str(&contents) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding malformed state for key {key}: {err}");
                None
            }
        }
    }

    /// Best-effort: a failed write is logged, never surfaced.
    pub fn write<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_string_pretty(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!("failed to serialize state for key {key}: {err}");
                return;
            }
        };
        if let Err(err) = fs::write(self.path_for(key), serialized) {
            warn!("failed to persist state for key {key}: {err}");
        }
    }
}

const KEY_IS_ACTIVE: &str = "is_active";
const KEY_IS_PAUSED: &str = "is_paused";
const KEY_TIMER_MODE: &str = "timer_mode";
const KEY_TIMER_STATE: &str = "timer_state";
const KEY_STOPWATCH_STATE: &str = "stopwatch_state";
const KEY_POMODORO_STATE: &str = "pomodoro_state";
const KEY_OVERLAY_POSITION: &str = "overlay_position";

/// Everything the bridge tracks, with defaults already applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoredState {
    pub is_active: bool,
    pub is_paused: bool,
    pub mode: TimerMode,
    pub timer: CountdownState,
    pub stopwatch: StopwatchState,
    pub pomodoro: PomodoroState,
    pub overlay: OverlayPosition,
}

/// Mirrors engine and mode state to the durable store and restores it on
/// startup. The transient run fields (finish latch, run id) are deliberately
/// not tracked; a restored engine is never mid-finish.
pub struct PersistenceBridge {
    store: KvStore,
}

impl PersistenceBridge {
    pub fn new(store: KvStore) -> Self {
        Self { store }
    }

    pub fn open(dir: PathBuf) -> Result<Self> {
        Ok(Self::new(KvStore::open(dir)?))
    }

    pub fn restore(&self) -> RestoredState {
        RestoredState {
            is_active: self.store.read(KEY_IS_ACTIVE).unwrap_or_default(),
            is_paused: self.store.read(KEY_IS_PAUSED).unwrap_or_default(),
            mode: self.store.read(KEY_TIMER_MODE).unwrap_or_default(),
            timer: self.store.read(KEY_TIMER_STATE).unwrap_or_default(),
            stopwatch: self.store.read(KEY_STOPWATCH_STATE).unwrap_or_default(),
            pomodoro: self.store.read(KEY_POMODORO_STATE).unwrap_or_default(),
            overlay: self.store.read(KEY_OVERLAY_POSITION).unwrap_or_default(),
        }
    }

    pub fn save_flags(&self, is_active: bool, is_paused: bool) {
        self.store.write(KEY_IS_ACTIVE, &is_active);
        self.store.write(KEY_IS_PAUSED, &is_paused);
    }

    pub fn save_mode(&self, mode: TimerMode) {
        self.store.write(KEY_TIMER_MODE, &mode);
    }

    pub fn save_modes(&self, modes: &ModeStates) {
        self.store.write(KEY_TIMER_STATE, &modes.timer);
        self.store.write(KEY_STOPWATCH_STATE, &modes.stopwatch);
        self.store.write(KEY_POMODORO_STATE, &modes.pomodoro);
    }

    pub fn save_overlay(&self, overlay: OverlayPosition) {
        self.store.write(KEY_OVERLAY_POSITION, &overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge_in(dir: &tempfile::TempDir) -> PersistenceBridge {
        PersistenceBridge::open(dir.path().to_path_buf()).unwrap()
    }

    #[test]
    fn restore_defaults_on_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let restored = bridge_in(&dir).restore();
        assert_eq!(restored, RestoredState::default());
        assert_eq!(restored.timer.duration_minutes, 25);
    }

    #[test]
    fn tracked_fields_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge_in(&dir);

        let mut modes = ModeStates::default();
        modes.timer.duration_minutes = 50;
        modes.timer.time_left_seconds = 3000;
        modes.stopwatch.elapsed_seconds = 77;
        modes.pomodoro.is_break = true;
        bridge.save_modes(&modes);
        bridge.save_flags(true, true);
        bridge.save_mode(TimerMode::Pomodoro);
        bridge.save_overlay(OverlayPosition { x: 120.0, y: 48.5 });

        let restored = bridge_in(&dir).restore();
        assert!(restored.is_active && restored.is_paused);
        assert_eq!(restored.mode, TimerMode::Pomodoro);
        assert_eq!(restored.timer.duration_minutes, 50);
        assert_eq!(restored.stopwatch.elapsed_seconds, 77);
        assert!(restored.pomodoro.is_break);
        assert_eq!(restored.overlay, OverlayPosition { x: 120.0, y: 48.5 });
    }

    #[test]
    fn malformed_key_falls_back_alone() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge_in(&dir);

        let mut modes = ModeStates::default();
        modes.stopwatch.elapsed_seconds = 42;
        bridge.save_modes(&modes);
        std::fs::write(dir.path().join("timer_state.json"), "{not json").unwrap();

        let restored = bridge.restore();
        assert_eq!(restored.timer, CountdownState::default());
        assert_eq!(restored.stopwatch.elapsed_seconds, 42);
    }

    #[test]
    fn mode_serializes_as_lowercase_tag() {
        let dir = tempfile::tempdir().unwrap();
        let bridge = bridge_in(&dir);
        bridge.save_mode(TimerMode::Stopwatch);

        let raw = std::fs::read_to_string(dir.path().join("timer_mode.json")).unwrap();
        assert_eq!(raw.trim(), "\"stopwatch\"");
    }
}
