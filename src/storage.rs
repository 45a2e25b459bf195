use directories::ProjectDirs;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::session::Session;

/// Where the single session record lives between runs.
pub trait SessionStorage: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;
    /// `None` erases the record.
    fn save(&self, session: Option<&Session>) -> Result<()>;
}

fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Session record kept as a small TOML file.
#[derive(Debug, Clone)]
pub struct TomlSessionFile {
    path: PathBuf,
}

impl TomlSessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_path() -> Option<PathBuf> {
        let proj = ProjectDirs::from("com", "example", "Agentline")?;
        Some(proj.data_dir().join("session.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStorage for TomlSessionFile {
    fn load(&self) -> Result<Option<Session>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(toml::from_str::<Session>(&text)?))
    }

    // Written to a sibling file and renamed so readers never see half a record.
    fn save(&self, session: Option<&Session>) -> Result<()> {
        match session {
            Some(session) => {
                ensure_dir(&self.path)?;
                let text = toml::to_string_pretty(session)?;
                let tmp = self.path.with_extension("toml.tmp");
                fs::write(&tmp, text)?;
                fs::rename(&tmp, &self.path)?;
            }
            None => match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            },
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStorage {
    slot: Mutex<Option<Session>>,
}

impl SessionStorage for MemorySessionStorage {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    fn save(&self, session: Option<&Session>) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = session.cloned();
        Ok(())
    }
}
