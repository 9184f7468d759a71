pub mod engine;
pub mod format;
pub mod state;

pub use engine::{EngineSnapshot, TimerEngine};
pub use format::format_clock;
pub use state::{
    ClockDisplay, CountdownState, EngineCore, EngineState, FinishEvent, ModeStates, PomodoroState,
    StopwatchState, TickOutcome, TimerMode,
};
