pub mod audio;
pub mod config;
pub mod identity;
pub mod session;
pub mod store;
pub mod timer;

use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use anyhow::Result;

use audio::{ChimeCue, CompletionCue, NullCue};
use config::AppConfig;
use identity::SharedIdentity;
use session::{HttpSessionSink, SessionApi};
use store::{OverlayPosition, PersistenceBridge};
use timer::TimerEngine;

/// The wired application: the engine plus everything the consuming UI layer
/// needs a handle on. Built once at startup and passed around by reference;
/// there is no ambient global state.
pub struct App {
    pub config: AppConfig,
    pub engine: TimerEngine,
    pub api: Arc<SessionApi>,
    pub identity: Arc<SharedIdentity>,
    bridge: Arc<PersistenceBridge>,
    overlay: RwLock<OverlayPosition>,
}

impl App {
    pub async fn bootstrap() -> Result<Self> {
        let data_dir = config::data_dir()?;
        std::fs::create_dir_all(&data_dir)?;
        let config = AppConfig::load(&data_dir.join("config.json"));
        Self::bootstrap_with(config, data_dir.join("state")).await
    }

    /// Wiring split out so tests and alternative shells can point the app at
    /// their own config and state directory. Hydration happens here: by the
    /// time this returns, the engine is ready and a previously active run has
    /// resumed ticking.
    pub async fn bootstrap_with(config: AppConfig, state_dir: PathBuf) -> Result<Self> {
        let bridge = Arc::new(PersistenceBridge::open(state_dir)?);
        let api = Arc::new(SessionApi::new(config.api_base_url.clone()));
        let identity = Arc::new(SharedIdentity::from_user_id(config.user_id.clone()));
        let cue: Arc<dyn CompletionCue> = if config.chime_enabled {
            Arc::new(ChimeCue::new())
        } else {
            Arc::new(NullCue)
        };
        let sink = Arc::new(HttpSessionSink::new(api.clone()));

        let engine = TimerEngine::new(bridge.clone(), sink, identity.clone(), cue);
        let restored = engine.hydrate().await;

        Ok(Self {
            config,
            engine,
            api,
            identity,
            bridge,
            overlay: RwLock::new(restored.overlay),
        })
    }

    pub fn overlay_position(&self) -> OverlayPosition {
        *self.overlay.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_overlay_position(&self, position: OverlayPosition) {
        *self.overlay.write().unwrap_or_else(|e| e.into_inner()) = position;
        self.bridge.save_overlay(position);
    }
}
