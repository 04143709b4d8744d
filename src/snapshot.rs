//! Named session snapshots on disk.
//!
//! Stored as `<data_dir>/revu/sessions/<name>.json`.

use crate::store::Role;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// One turn of a saved conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotTurn {
    pub role: Role,
    pub content: String,
    /// Reply cut short by cancellation; shown but never sent back to the model
    #[serde(default)]
    pub interrupted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub name: String,
    pub system_prompt: String,
    pub turns: Vec<SnapshotTurn>,
    pub model: String,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(
        name: impl Into<String>,
        system_prompt: impl Into<String>,
        turns: Vec<SnapshotTurn>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            system_prompt: system_prompt.into(),
            turns,
            model: model.into(),
            saved_at: Utc::now(),
        }
    }
}

/// Directory of saved snapshots
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store rooted at an explicit directory
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create session directory: {}", dir.display()))?;
        Ok(Self { dir })
    }

    /// Store under the user's data directory
    pub fn open_default() -> Result<Self> {
        let base = dirs::data_dir().context("Could not determine data directory")?;
        Self::new(base.join("revu").join("sessions"))
    }

    fn path_for(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    pub fn save(&self, snapshot: &SessionSnapshot) -> Result<PathBuf> {
        let path = self.path_for(&snapshot.name)?;
        atomic_write(&path, snapshot)?;
        Ok(path)
    }

    /// Load a snapshot by name; `None` if it was never saved
    pub fn load(&self, name: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let snapshot = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(Some(snapshot))
    }

    /// Names of all saved snapshots, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|e| e == "json")
                && let Some(stem) = path.file_stem()
            {
                names.push(stem.to_string_lossy().to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty()
        || name.starts_with('.')
        || name
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
    {
        bail!("Invalid session name: {name:?}");
    }
    Ok(())
}

/// Atomic write using temp file + rename
fn atomic_write<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    let mut file = fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&temp_path, path).with_context(|| {
        format!(
            "Failed to rename {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}
