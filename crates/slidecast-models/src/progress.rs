//! Render progress for polling.
//!
//! Each render job owns one [`RenderProgress`] value. The renderer mutates it
//! as it walks through the script; pollers read snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Render lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Nothing has started yet
    #[default]
    Idle,
    /// Render accepted, no section processed yet
    Starting,
    /// Working on section `current` of `total` (1-based)
    ProcessingSection { current: usize, total: usize },
    /// All clips built, encoding the final file
    Encoding,
    /// Video written successfully
    Complete,
    /// Render failed
    Error,
}

impl RenderStatus {
    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderStatus::Complete | RenderStatus::Error)
    }
}

impl fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderStatus::Idle => write!(f, "idle"),
            RenderStatus::Starting => write!(f, "starting"),
            RenderStatus::ProcessingSection { current, total } => {
                write!(f, "Processing section {}/{}", current, total)
            }
            RenderStatus::Encoding => write!(f, "Encoding video"),
            RenderStatus::Complete => write!(f, "complete"),
            RenderStatus::Error => write!(f, "error"),
        }
    }
}

/// Progress snapshot of a single render.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderProgress {
    /// Percentage in 0..=100
    pub value: f64,
    /// Current lifecycle state
    pub status: RenderStatus,
    /// Failure message when `status` is `Error`
    pub error: Option<String>,
    /// When the progress was last updated
    pub updated_at: DateTime<Utc>,
}

impl Default for RenderProgress {
    fn default() -> Self {
        Self {
            value: 0.0,
            status: RenderStatus::Idle,
            error: None,
            updated_at: Utc::now(),
        }
    }
}

impl RenderProgress {
    /// Reset to the start of a new render.
    pub fn start(&mut self) {
        self.value = 0.0;
        self.status = RenderStatus::Starting;
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Enter section `index` (0-based) of `total`.
    pub fn section(&mut self, index: usize, total: usize) {
        let value = if total == 0 {
            0.0
        } else {
            (index as f64 / total as f64) * 100.0
        };
        self.advance_to(value);
        self.status = RenderStatus::ProcessingSection {
            current: index + 1,
            total,
        };
    }

    /// All sections rendered; final encode running.
    pub fn encoding(&mut self) {
        self.status = RenderStatus::Encoding;
        self.updated_at = Utc::now();
    }

    /// Mark render as completed.
    pub fn complete(&mut self) {
        self.advance_to(100.0);
        self.status = RenderStatus::Complete;
    }

    /// Mark render as failed with an error message.
    ///
    /// The value is left where the failure happened.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = RenderStatus::Error;
        self.error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Status string as shown to pollers.
    pub fn status_text(&self) -> String {
        self.status.to_string()
    }

    fn advance_to(&mut self, value: f64) {
        self.value = self.value.max(value.clamp(0.0, 100.0));
        self.updated_at = Utc::now();
    }
}
