use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::analytics;
use crate::models::{Snapshot, Summary, TeacherAssignment};

const SUMMARY_FILE: &str = "summary.json";
const TEACHERS_FILE: &str = "teachers.json";
const SNAPSHOT_FILE: &str = "snapshot.json";

/// JSON files holding the session state between invocations.
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn init(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create state directory {}", self.dir.display()))
    }

    pub fn load_summary(&self) -> anyhow::Result<Summary> {
        let mut summary: Summary = self.read(SUMMARY_FILE)?.unwrap_or_default();
        summary.recalculate_all();
        Ok(summary)
    }

    pub fn save_summary(&self, summary: &Summary) -> anyhow::Result<()> {
        self.write(SUMMARY_FILE, summary)
    }

    pub fn load_teachers(&self) -> anyhow::Result<TeacherAssignment> {
        Ok(self.read(TEACHERS_FILE)?.unwrap_or_default())
    }

    pub fn save_teachers(&self, teachers: &TeacherAssignment) -> anyhow::Result<()> {
        self.write(TEACHERS_FILE, teachers)
    }

    pub fn load_snapshot(&self) -> anyhow::Result<Option<Snapshot>> {
        self.read(SNAPSHOT_FILE)
    }

    pub fn save_snapshot(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        self.write(SNAPSHOT_FILE, snapshot)
    }

    /// Loads the trend baseline, capturing and saving it first when none
    /// exists yet and `summary` has data.
    pub fn observe_snapshot(&self, summary: &Summary) -> anyhow::Result<Option<Snapshot>> {
        let mut snapshot = self.load_snapshot()?;
        if analytics::observe_snapshot(&mut snapshot, summary) {
            if let Some(captured) = &snapshot {
                self.save_snapshot(captured)?;
            }
        }
        Ok(snapshot)
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> anyhow::Result<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            debug!(file = %path.display(), "no saved state");
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(Some(value))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> anyhow::Result<()> {
        self.init()?;
        let path = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace {}", path.display()))?;
        debug!(file = %path.display(), "saved state");
        Ok(())
    }
}
