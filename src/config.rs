use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::controllers::call::ResubmitPolicy;
use crate::error::Result;
use crate::utils::normalize_url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub session_ttl_secs: u64,
    pub resubmit_policy: ResubmitPolicy,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 15,
            session_ttl_secs: 8 * 60 * 60,
            resubmit_policy: ResubmitPolicy::Discard,
        }
    }
}

impl Settings {
    pub fn default_path() -> Option<PathBuf> {
        let base = BaseDirs::new()?;
        Some(base.config_dir().join("agentline.toml"))
    }

    /// Loads from the default location, falling back to defaults.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(_) => return Self::default(),
        };
        match toml::from_str::<Settings>(&text) {
            Ok(mut settings) => {
                settings.base_url = normalize_url(&settings.base_url);
                settings
            }
            Err(e) => {
                log::warn!("ignoring unreadable settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text = toml::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = normalize_url(base_url);
        self
    }
}
