//! Model health status: the JSON resource, the indicator derived from it, and
//! a background loader that never lets a stale read win.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Deserialize;
use strum::Display;
use thiserror::Error;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelStatus {
    pub generated_at: Option<String>,
    pub summary: StatusSummary,
    pub results: Vec<ModelResult>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatusSummary {
    pub total: Option<u64>,
    pub passed: Option<u64>,
    pub failed: Option<u64>,
}

impl StatusSummary {
    pub fn total(&self) -> u64 {
        self.total.unwrap_or(0)
    }

    pub fn passed(&self) -> u64 {
        self.passed.unwrap_or(0)
    }

    pub fn failed(&self) -> u64 {
        self.failed.unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelResult {
    pub provider: String,
    pub model: String,
    pub success: bool,
    pub status: serde_json::Value,
    pub response: Option<String>,
}

impl ModelResult {
    pub fn badge(&self) -> &'static str {
        if self.success {
            "OK"
        } else {
            "FAIL"
        }
    }

    pub fn status_text(&self) -> String {
        match &self.status {
            serde_json::Value::Null => String::new(),
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }

    pub fn response_text(&self) -> &str {
        self.response.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Indicator {
    Ok,
    Warn,
    Fail,
}

impl Indicator {
    pub fn from_summary(summary: &StatusSummary) -> Self {
        let total = summary.total();
        let failed = summary.failed();
        if total == 0 {
            Indicator::Warn
        } else if failed == 0 {
            Indicator::Ok
        } else if failed < total {
            Indicator::Warn
        } else {
            Indicator::Fail
        }
    }
}

pub fn meta_line(status: &ModelStatus) -> String {
    format!(
        "Last updated: {} | Total: {} | Passed: {} | Failed: {}",
        status.generated_at.as_deref().unwrap_or("unknown"),
        status.summary.total(),
        status.summary.passed(),
        status.summary.failed(),
    )
}

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("{} not found", .path.display())]
    Missing { path: PathBuf },
    #[error("reading {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid status JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

pub fn read_status(path: &Path) -> Result<ModelStatus, StatusError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            StatusError::Missing {
                path: path.to_path_buf(),
            }
        } else {
            StatusError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(serde_json::from_str(&raw)?)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPurpose {
    /// Startup read that only feeds the indicator.
    Prefetch,
    /// Read triggered by opening the status modal.
    Full,
}

#[derive(Debug)]
pub struct StatusMessage {
    pub token: u64,
    pub purpose: LoadPurpose,
    pub result: Result<ModelStatus, StatusError>,
}

/// Runs status reads off the UI thread. Only the most recently issued
/// request may update the panel.
#[derive(Debug)]
pub struct StatusLoader {
    tx: Sender<StatusMessage>,
    rx: Receiver<StatusMessage>,
    latest: u64,
}

impl Default for StatusLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusLoader {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx, latest: 0 }
    }

    pub fn latest_token(&self) -> u64 {
        self.latest
    }

    pub fn request(&mut self, path: PathBuf, purpose: LoadPurpose) -> u64 {
        self.latest += 1;
        let token = self.latest;
        let tx = self.tx.clone();
        tracing::debug!(token, ?purpose, path = %path.display(), "status load requested");
        let spawned = thread::Builder::new()
            .name("status-loader".into())
            .spawn(move || {
                let result = read_status(&path);
                let _ = tx.send(StatusMessage {
                    token,
                    purpose,
                    result,
                });
            });
        if let Err(err) = spawned {
            tracing::error!(?err, "failed to spawn status loader thread");
        }
        token
    }

    /// Drains finished reads and keeps the one matching the latest token.
    pub fn drain(&self) -> Option<StatusMessage> {
        let mut current = None;
        while let Ok(message) = self.rx.try_recv() {
            if message.token == self.latest {
                current = Some(message);
            } else {
                tracing::debug!(token = message.token, latest = self.latest, "dropping stale status");
            }
        }
        current
    }
}

/// What the status modal and the toolbar indicator show.
#[derive(Debug, Clone, Default)]
pub struct StatusPanel {
    pub indicator: Option<Indicator>,
    pub meta: String,
    pub rows: Vec<ModelResult>,
    pub loading: bool,
}

impl StatusPanel {
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.meta = "Loading...".to_string();
    }

    pub fn apply(&mut self, message: StatusMessage) {
        self.loading = false;
        match (message.purpose, message.result) {
            (LoadPurpose::Prefetch, Ok(status)) => {
                self.indicator = Some(Indicator::from_summary(&status.summary));
            }
            (LoadPurpose::Prefetch, Err(StatusError::Missing { path })) => {
                tracing::info!(path = %path.display(), "no model status published");
            }
            (LoadPurpose::Prefetch, Err(err)) => {
                tracing::warn!(%err, "status prefetch failed");
                self.indicator = Some(Indicator::Fail);
            }
            (LoadPurpose::Full, Ok(status)) => {
                self.indicator = Some(Indicator::from_summary(&status.summary));
                self.meta = meta_line(&status);
                self.rows = status.results;
            }
            (LoadPurpose::Full, Err(err)) => {
                tracing::error!(%err, "status load failed");
                self.indicator = Some(Indicator::Fail);
                self.meta = format!("Failed to load model status: {err}");
                self.rows.clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use assert_matches::assert_matches;
    use tempfile::TempDir;

    use super::*;

    const STATUS_JSON: &str = r#"{
        "generated_at": "2024-05-01 12:00:00",
        "summary": {"total": 3, "passed": 2, "failed": 1},
        "results": [
            {"provider": "alpha", "model": "m1", "success": true, "status": 200, "response": "pong"},
            {"provider": "beta", "model": "m2", "success": false, "status": "timeout"}
        ]
    }"#;

    fn summary(total: u64, failed: u64) -> StatusSummary {
        StatusSummary {
            total: Some(total),
            passed: Some(total.saturating_sub(failed)),
            failed: Some(failed),
        }
    }

    fn wait_for(loader: &StatusLoader) -> StatusMessage {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(message) = loader.drain() {
                return message;
            }
            assert!(Instant::now() < deadline, "status loader timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn indicator_follows_failure_ratio() {
        assert_eq!(Indicator::from_summary(&summary(0, 0)), Indicator::Warn);
        assert_eq!(Indicator::from_summary(&summary(4, 0)), Indicator::Ok);
        assert_eq!(Indicator::from_summary(&summary(4, 1)), Indicator::Warn);
        assert_eq!(Indicator::from_summary(&summary(4, 4)), Indicator::Fail);
        assert_eq!(Indicator::from_summary(&StatusSummary::default()), Indicator::Warn);
    }

    #[test]
    fn meta_line_defaults_missing_fields() {
        let status: ModelStatus = serde_json::from_str("{}").expect("empty object parses");
        assert_eq!(
            meta_line(&status),
            "Last updated: unknown | Total: 0 | Passed: 0 | Failed: 0"
        );
    }

    #[test]
    fn rows_render_badges_and_status_values() {
        let status: ModelStatus = serde_json::from_str(STATUS_JSON).expect("fixture parses");
        let rows: Vec<_> = status
            .results
            .iter()
            .map(|row| (row.badge(), row.status_text(), row.response_text().to_string()))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("OK", "200".to_string(), "pong".to_string()),
                ("FAIL", "timeout".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn loader_reads_status_file_in_background() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("model-status.json");
        fs::write(&path, STATUS_JSON)?;

        let mut loader = StatusLoader::new();
        let token = loader.request(path, LoadPurpose::Full);
        let message = wait_for(&loader);
        assert_eq!(message.token, token);

        let mut panel = StatusPanel::default();
        panel.begin_load();
        panel.apply(message);
        assert!(!panel.loading);
        assert_eq!(panel.indicator, Some(Indicator::Warn));
        assert_eq!(
            panel.meta,
            "Last updated: 2024-05-01 12:00:00 | Total: 3 | Passed: 2 | Failed: 1"
        );
        assert_eq!(panel.rows.len(), 2);
        Ok(())
    }

    #[test]
    fn stale_results_are_discarded() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let path = temp.path().join("model-status.json");
        fs::write(&path, STATUS_JSON)?;

        let mut loader = StatusLoader::new();
        let first = loader.request(path.clone(), LoadPurpose::Prefetch);
        let second = loader.request(path, LoadPurpose::Full);
        assert!(second > first);
        thread::sleep(Duration::from_millis(50));
        let message = wait_for(&loader);
        assert_eq!(message.token, second);
        assert_eq!(message.purpose, LoadPurpose::Full);
        Ok(())
    }

    #[test]
    fn failed_full_load_reports_message_and_fail() {
        let mut panel = StatusPanel {
            rows: vec![ModelResult::default()],
            ..StatusPanel::default()
        };
        let err = read_status(Path::new("/nonexistent/model-status.json")).unwrap_err();
        assert_matches!(err, StatusError::Missing { .. });
        panel.apply(StatusMessage {
            token: 1,
            purpose: LoadPurpose::Full,
            result: Err(err),
        });
        assert_eq!(panel.indicator, Some(Indicator::Fail));
        assert!(panel.meta.starts_with("Failed to load model status: "));
        assert!(panel.rows.is_empty());
    }

    #[test]
    fn prefetch_of_missing_file_leaves_indicator_alone() {
        let mut panel = StatusPanel::default();
        panel.apply(StatusMessage {
            token: 1,
            purpose: LoadPurpose::Prefetch,
            result: Err(StatusError::Missing {
                path: PathBuf::from("model-status.json"),
            }),
        });
        assert_eq!(panel.indicator, None);

        panel.apply(StatusMessage {
            token: 2,
            purpose: LoadPurpose::Prefetch,
            result: serde_json::from_str::<ModelStatus>("not json").map_err(StatusError::from),
        });
        assert_eq!(panel.indicator, Some(Indicator::Fail));
    }
}
