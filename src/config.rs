use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Base URL of the session log endpoint.
    pub api_base_url: String,
    /// Signed-in user, if any. Sign-in itself happens outside this crate.
    pub user_id: Option<String>,
    pub chime_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000/api".into(),
            user_id: None,
            chime_enabled: true,
        }
    }
}

impl AppConfig {
    /// A missing file means defaults; unparseable content is logged and
    /// replaced by defaults rather than failing startup.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring malformed config {}: {err}", path.display());
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }
}

pub fn data_dir() -> Result<PathBuf> {
    let base = dirs::data_dir().context("no data directory available on this platform")?;
    Ok(base.join("focuslog"))
}
