use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use url::Url;

/// What the server should produce for a URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DownloadMode {
    #[default]
    Video,
    Audio,
}

impl DownloadMode {
    pub fn extension(self) -> &'static str {
        match self {
            DownloadMode::Video => "mp4",
            DownloadMode::Audio => "mp3",
        }
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMode::Video => write!(f, "video"),
            DownloadMode::Audio => write!(f, "audio"),
        }
    }
}

/// One download attempt as submitted by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: Url,
    pub mode: DownloadMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DownloadPhase {
    #[default]
    Idle,
    InProgress,
    Done,
    Failed,
}

/// Fully assembled payload plus the name it should be saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    pub file_name: String,
    pub data: Bytes,
}

/// Replaces the last `.ext` of `name` with the extension for `mode`.
///
/// A leading dot is part of the name, not a suffix, so `.hidden` becomes
/// `.hidden.mp4`.
pub fn output_file_name(name: &str, mode: DownloadMode) -> String {
    let stem = match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    };
    format!("{}.{}", stem, mode.extension())
}
