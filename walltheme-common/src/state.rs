use serde::{Serialize, Deserialize};
use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Result, Context};
use crate::theme::ThemeRecord;

/// Severity of an apply run or a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: String,
    pub level: Level,
    pub detail: Option<String>,
}

/// What the last apply run did, kept for `walltheme status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedState {
    pub wallpaper: String,
    pub theme: ThemeRecord,
    pub level: Level,
    pub summary: String,
    pub steps: Vec<StepRecord>,
    pub applied_at: chrono::DateTime<chrono::Utc>,
}

impl AppliedState {
    pub fn save(&self, state_file: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = state_file.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create state directory: {:?}", parent))?;
        }

        let json = serde_json::to_string_pretty(self)
            .with_context(|| "Failed to serialize state to JSON")?;

        fs::write(state_file, json)
            .with_context(|| format!("Failed to write state file: {:?}", state_file))?;

        log::debug!("State saved to {:?}", state_file);
        Ok(())
    }

    /// `Ok(None)` when nothing has been applied yet.
    pub fn load(state_file: &Path) -> Result<Option<Self>> {
        if !state_file.exists() {
            log::info!("No state file found at {:?}", state_file);
            return Ok(None);
        }

        let json = fs::read_to_string(state_file)
            .with_context(|| format!("Failed to read state file: {:?}", state_file))?;

        let state: Self = serde_json::from_str(&json)
            .with_context(|| "Failed to deserialize state from JSON")?;

        log::debug!("State loaded from {:?}", state_file);
        Ok(Some(state))
    }

    pub fn get_state_file() -> PathBuf {
        dirs::state_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join("walltheme")
            .join("state.json")
    }

    pub fn age(&self) -> chrono::Duration {
        chrono::Utc::now() - self.applied_at
    }
}
