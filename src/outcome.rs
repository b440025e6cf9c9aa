//! The single, terminal result of a capture session and its wire form.
//!
//! When the overlay runs as its own process, the outcome leaves through the
//! exit code plus one JSON line on stdout.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const EXIT_ACCEPTED: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_CANCELLED: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Accepted {
        /// Fixed-name file the OCR step reads.
        path: PathBuf,
        archive_path: PathBuf,
        size: (u32, u32),
        /// Advisory only; a blank capture is still saved.
        blank: bool,
    },
    Cancelled {
        reason: String,
    },
    Failed {
        error: String,
    },
}

impl CaptureOutcome {
    pub fn cancelled(reason: impl Into<String>) -> Self {
        CaptureOutcome::Cancelled { reason: reason.into() }
    }

    pub fn failed(error: impl ToString) -> Self {
        CaptureOutcome::Failed { error: error.to_string() }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, CaptureOutcome::Accepted { .. })
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            CaptureOutcome::Accepted { .. } => EXIT_ACCEPTED,
            CaptureOutcome::Failed { .. } => EXIT_FAILED,
            CaptureOutcome::Cancelled { .. } => EXIT_CANCELLED,
        }
    }

    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload.trim())
    }
}
