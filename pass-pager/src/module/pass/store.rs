//! Persisted tracker state
//!
//! One JSON object keyed by object id. Records keep the on-disk string
//! form of their instants; the window is parsed on demand, so a load/save
//! round trip rewrites exactly what was read and entries of other objects
//! are carried along untouched.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

use super::window::{Milestone, PassWindow};
use crate::error::{PassError, PassResult};

/// On-disk form of one object's window. Missing fields default to empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassRecord {
    pub pass_prealert: String,
    pub pass_start: String,
    pub pass_peak: String,
    pub pass_end: String,
    pub sent_pre: bool,
    pub sent_start: bool,
    pub sent_peak: bool,
    pub sent_end: bool,
}

impl PassRecord {
    pub fn from_window(window: &PassWindow) -> Self {
        Self {
            pass_prealert: format_instant(window.prealert_at),
            pass_start: format_instant(window.start_at),
            pass_peak: format_instant(window.peak_at),
            pass_end: format_instant(window.end_at),
            sent_pre: window.is_sent(Milestone::Prealert),
            sent_start: window.is_sent(Milestone::Start),
            sent_peak: window.is_sent(Milestone::Peak),
            sent_end: window.is_sent(Milestone::End),
        }
    }

    /// No window tracked.
    pub fn is_idle(&self) -> bool {
        self.pass_start.trim().is_empty()
    }

    /// The tracked window, `None` when idle.
    pub fn window(&self) -> PassResult<Option<PassWindow>> {
        if self.is_idle() {
            return Ok(None);
        }

        let prealert = parse_instant("pass_prealert", &self.pass_prealert)?;
        let start = parse_instant("pass_start", &self.pass_start)?;
        let peak = parse_instant("pass_peak", &self.pass_peak)?;
        let end = parse_instant("pass_end", &self.pass_end)?;

        if !(prealert < start && start <= peak && peak <= end) {
            return Err(PassError::StateCorruption(format!(
                "instants out of order: {} / {} / {} / {}",
                self.pass_prealert, self.pass_start, self.pass_peak, self.pass_end
            )));
        }

        let flags = [
            (Milestone::Prealert, self.sent_pre),
            (Milestone::Start, self.sent_start),
            (Milestone::Peak, self.sent_peak),
            (Milestone::End, self.sent_end),
        ];
        let window = flags
            .into_iter()
            .filter(|(_, sent)| *sent)
            .fold(PassWindow::new(prealert, start, peak, end), |w, (m, _)| w.with_sent(m));

        Ok(Some(window))
    }
}

fn format_instant(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// RFC 3339 with offset, or a naive ISO-8601 timestamp read as UTC.
fn parse_instant(field: &str, value: &str) -> PassResult<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|e| PassError::StateCorruption(format!("{} = '{}': {}", field, value, e)))
}

/// Whole persisted state: object id -> record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackerState {
    objects: BTreeMap<String, PassRecord>,
}

impl TrackerState {
    /// Default state with an empty record for `object_id`.
    pub fn with_object(object_id: &str) -> Self {
        let mut state = Self::default();
        state.reset(object_id);
        state
    }

    pub fn record(&self, object_id: &str) -> Option<&PassRecord> {
        self.objects.get(object_id)
    }

    pub fn window(&self, object_id: &str) -> PassResult<Option<PassWindow>> {
        match self.objects.get(object_id) {
            Some(record) => record.window(),
            None => Ok(None),
        }
    }

    /// Track `window` for `object_id`, or clear it with `None`.
    pub fn set_window(&mut self, object_id: &str, window: Option<&PassWindow>) {
        let record = window.map(PassRecord::from_window).unwrap_or_default();
        self.objects.insert(object_id.to_string(), record);
    }

    pub fn reset(&mut self, object_id: &str) {
        self.set_window(object_id, None);
    }

    fn len(&self) -> usize {
        self.objects.len()
    }
}

/// File-backed store. Loading never fails: a missing or unreadable file is
/// replaced by the default state.
pub struct StateStore {
    path: PathBuf,
    object_id: String,
}

impl StateStore {
    pub fn new<P: AsRef<Path>>(path: P, object_id: impl Into<String>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            object_id: object_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn default_state(&self) -> TrackerState {
        TrackerState::with_object(&self.object_id)
    }

    /// Read the state, recreating the file with defaults if it is missing
    /// or cannot be parsed. Records without the tracked object get an
    /// empty entry for it.
    pub async fn load(&self) -> TrackerState {
        if !self.path.exists() {
            info!("State file {:?} not found, creating defaults", self.path);
            return self.reset_to_default().await;
        }

        let mut state = match self.read().await {
            Ok(state) => state,
            Err(e) => {
                let error = PassError::StateCorruption(format!("{:#}", e));
                warn!("{} in {:?}, resetting to defaults", error, self.path);
                return self.reset_to_default().await;
            }
        };

        if state.record(&self.object_id).is_none() {
            debug!("No record for {} in state, adding an empty one", self.object_id);
            state.reset(&self.object_id);
        }

        debug!("Loaded state for {} objects from {:?}", state.len(), self.path);
        state
    }

    async fn read(&self) -> Result<TrackerState> {
        let content = fs::read_to_string(&self.path)
            .await
            .context("Failed to read state file")?;
        let state = serde_json::from_str(&content).context("Failed to parse state file")?;
        Ok(state)
    }

    async fn reset_to_default(&self) -> TrackerState {
        let state = self.default_state();
        if let Err(e) = self.save(&state).await {
            warn!("Failed to write default state to {:?}: {:#}", self.path, e);
        }
        state
    }

    /// Write the state atomically: temp file, then rename over the target.
    pub async fn save(&self, state: &TrackerState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .await
                    .context("Failed to create state directory")?;
            }
        }

        let content = serde_json::to_string_pretty(state).context("Failed to serialize state")?;
        let tmp_path = self.tmp_path();

        fs::write(&tmp_path, content)
            .await
            .context("Failed to write temporary state file")?;
        fs::rename(&tmp_path, &self.path)
            .await
            .context("Failed to replace state file")?;

        debug!("Saved state to {:?}", self.path);
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "state".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}
