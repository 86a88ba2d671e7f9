//! Session phases and change notifications

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the session is in its lifecycle.
///
/// `NoFolder` → `FolderLoaded` (no file) → `Segmented` (file, channel,
/// mask and curve all current). `NoRelevantChannel` replaces `Segmented`
/// when the selected file has no recognized channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    NoFolder,
    FolderLoaded,
    NoRelevantChannel,
    Segmented,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoFolder => write!(f, "no folder"),
            Self::FolderLoaded => write!(f, "folder loaded"),
            Self::NoRelevantChannel => write!(f, "no relevant channel"),
            Self::Segmented => write!(f, "segmented"),
        }
    }
}

/// What a command handler changed, for the presentation layer to redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionChange {
    FolderLoaded {
        folder: PathBuf,
        files: Vec<String>,
    },
    FileLoaded {
        index: usize,
        file: String,
        channels: Vec<String>,
    },
    NoRelevantChannel {
        file: String,
    },
    ChannelSelected {
        index: usize,
        channel: String,
        layer_name: String,
    },
    ThresholdRange {
        min: i64,
        max: i64,
        value: i64,
    },
    Segmented {
        threshold: i64,
        aspect_ratio: u32,
        rows: usize,
        flagged: usize,
    },
    /// Image, mask and curve layers must be removed.
    Cleared,
    ResultsFolderSet {
        folder: PathBuf,
    },
    ExportAvailability {
        enabled: bool,
    },
    Exported {
        table: PathBuf,
        mask: PathBuf,
    },
    TablesMerged {
        rows: usize,
        curves: Vec<String>,
        preselected: Vec<String>,
    },
    /// Non-fatal message for the user.
    Notification {
        message: String,
    },
}

impl SessionChange {
    pub fn notify(message: impl Into<String>) -> Self {
        Self::Notification {
            message: message.into(),
        }
    }
}
