pub mod history;
pub mod knowledge;
pub mod profile;

pub use history::{Exchange, History};
pub use knowledge::Knowledge;
pub use profile::Profile;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const KNOWLEDGE_FILE: &str = "knowledge.json";
pub const HISTORY_FILE: &str = "history.json";
pub const PROFILE_FILE: &str = "profile.json";

/// Directory-backed storage for the persistent records. Each record lives in
/// its own pretty-printed JSON file so users can inspect or edit it by hand.
/// A file that fails to parse is treated as absent rather than bringing the
/// whole app down.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.exists() {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create data directory at {}", dir.display()))?;
        }
        Ok(Store { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_knowledge(&self) -> Result<Knowledge> {
        Ok(self
            .read_record(KNOWLEDGE_FILE)?
            .unwrap_or_else(Knowledge::seeded))
    }

    pub fn save_knowledge(&self, knowledge: &Knowledge) -> Result<()> {
        self.write_record(KNOWLEDGE_FILE, knowledge)
    }

    pub fn load_history(&self) -> Result<History> {
        Ok(self.read_record(HISTORY_FILE)?.unwrap_or_default())
    }

    pub fn save_history(&self, history: &History) -> Result<()> {
        self.write_record(HISTORY_FILE, history)
    }

    pub fn load_profile(&self) -> Result<Profile> {
        Ok(self.read_record(PROFILE_FILE)?.unwrap_or_default())
    }

    pub fn save_profile(&self, profile: &Profile) -> Result<()> {
        self.write_record(PROFILE_FILE, profile)
    }

    fn read_record<T: DeserializeOwned>(&self, file: &str) -> Result<Option<T>> {
        let path = self.dir.join(file);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match serde_json::from_str(&content) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Ignoring malformed {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn write_record<T: Serialize>(&self, file: &str, record: &T) -> Result<()> {
        let path = self.dir.join(file);
        let content = serde_json::to_string_pretty(record)
            .with_context(|| format!("Failed to serialize {}", file))?;

        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        Ok(())
    }
}
