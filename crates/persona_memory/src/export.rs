//! Session persistence: plain JSON, one folder per chat and per persona.

use crate::turn::Turn;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use persona_core::MentalState;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const FOLDER_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Everything a host needs to persist one persona's session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub persona_name: String,
    pub mental_state: MentalState,
    pub turns: Vec<Turn>,
}

#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub chat_dir: PathBuf,
    pub record: PathBuf,
    pub projected: Option<PathBuf>,
}

/// Write `record` (and optionally its projection) under `root`, stamped now.
pub fn export_session(
    root: &Path,
    record: &SessionRecord,
    projected: Option<&[Turn]>,
) -> Result<ExportPaths> {
    export_session_at(root, record, projected, Local::now())
}

/// Layout: `<root>/chat - <date>/<persona> - <date>/<persona>.json`.
pub fn export_session_at(
    root: &Path,
    record: &SessionRecord,
    projected: Option<&[Turn]>,
    at: DateTime<Local>,
) -> Result<ExportPaths> {
    let date = at.format(FOLDER_DATE_FORMAT).to_string();
    let name = if record.persona_name.trim().is_empty() {
        "Unknown"
    } else {
        record.persona_name.as_str()
    };

    let chat_dir = root.join(format!("chat - {}", date));
    let persona_dir = chat_dir.join(format!("{} - {}", name, date));
    fs::create_dir_all(&persona_dir)
        .with_context(|| format!("Failed to create export folder: {}", persona_dir.display()))?;

    let record_path = persona_dir.join(format!("{}.json", name));
    write_json(&record_path, record)?;
    tracing::info!("Saved record: {}", record_path.display());

    let projected_path = match projected {
        Some(turns) => {
            let path = persona_dir.join(format!("{}.projected.json", name));
            write_json(&path, &turns)?;
            tracing::info!("Saved projection: {}", path.display());
            Some(path)
        }
        None => None,
    };

    Ok(ExportPaths {
        chat_dir,
        record: record_path,
        projected: projected_path,
    })
}

pub fn load_record(path: &Path) -> Result<SessionRecord> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read record: {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Failed to parse record: {}", path.display()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize record")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
