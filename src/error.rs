// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::metadata::MetadataKey;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VidmetaError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Unsupported or corrupt file: {key} is {}", .value.as_deref().unwrap_or("missing"))]
    UnsupportedMedia {
        key: MetadataKey,
        value: Option<String>,
    },
    #[error("ffprobe not found (set ffprobe_path with `vidmeta config set ffprobe_path <path>`)")]
    ProbeUnavailable,
    #[error("ffprobe failed: {0}")]
    ProbeFailed(String),
    #[error("Invalid file filter {pattern:?}: {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Config error: {0}")]
    Config(#[from] confy::ConfyError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

pub type Result<T> = std::result::Result<T, VidmetaError>;
