// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::capability::Capability;
use crate::error::{Result, VidmetaError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

/// The fixed set of fields the inspector asks a metadata source for.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    Duration,
    VideoRotation,
    VideoWidth,
    VideoHeight,
    Date,
    Bitrate,
    FrameRate,
    SampleRate,
}

impl MetadataKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetadataKey::Duration => "duration",
            MetadataKey::VideoRotation => "video_rotation",
            MetadataKey::VideoWidth => "video_width",
            MetadataKey::VideoHeight => "video_height",
            MetadataKey::Date => "date",
            MetadataKey::Bitrate => "bitrate",
            MetadataKey::FrameRate => "frame_rate",
            MetadataKey::SampleRate => "sample_rate",
        }
    }

    /// Keys that only exist on some capability tiers.
    pub fn required_capability(&self) -> Option<Capability> {
        match self {
            MetadataKey::FrameRate => Some(Capability::FrameRate),
            MetadataKey::SampleRate => Some(Capability::SampleRate),
            _ => None,
        }
    }
}

impl fmt::Display for MetadataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait MetadataSource {
    fn extract(&self, key: MetadataKey) -> Option<String>;
}

/// In-memory source, used for replays from JSON and in tests.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct MapSource {
    pub values: BTreeMap<MetadataKey, String>,
}

#[cfg(test)]
impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MetadataKey, value: &str) -> Self {
        self.values.insert(key, value.to_string());
        self
    }
}

impl MetadataSource for MapSource {
    fn extract(&self, key: MetadataKey) -> Option<String> {
        self.values.get(&key).cloned()
    }
}

#[derive(Deserialize, Debug, Default)]
struct ProbeOutput {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize, Debug, Default)]
struct ProbeFormat {
    duration: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Deserialize, Debug, Default)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
    #[serde(default)]
    side_data_list: Vec<ProbeSideData>,
}

#[derive(Deserialize, Debug, Default)]
struct ProbeSideData {
    rotation: Option<f64>,
}

/// Open handle on one probed file. Dropping it releases the handle.
#[derive(Debug)]
pub struct FfprobeRetriever {
    path: PathBuf,
    probe: ProbeOutput,
}

impl FfprobeRetriever {
    pub fn open(ffprobe_path: &Path, video_path: &Path) -> Result<Self> {
        tracing::debug!(
            "Probing {} with {}",
            video_path.display(),
            ffprobe_path.display()
        );

        let output = Command::new(ffprobe_path)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(video_path)
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidmetaError::ProbeUnavailable
                } else {
                    VidmetaError::ProbeFailed(format!("Failed to execute ffprobe: {}", e))
                }
            })?;

        if !output.status.success() {
            let error_output = String::from_utf8_lossy(&output.stderr);
            return Err(VidmetaError::ProbeFailed(error_output.trim().to_string()));
        }

        Self::from_json(video_path, &String::from_utf8_lossy(&output.stdout))
    }

    pub fn from_json(video_path: &Path, json: &str) -> Result<Self> {
        let probe: ProbeOutput = serde_json::from_str(json)
            .map_err(|e| VidmetaError::ProbeFailed(format!("Invalid ffprobe output: {}", e)))?;
        tracing::trace!("Opened metadata handle for {}", video_path.display());
        Ok(Self {
            path: video_path.to_path_buf(),
            probe,
        })
    }

    fn stream(&self, codec_type: &str) -> Option<&ProbeStream> {
        self.probe
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some(codec_type))
    }
}

impl MetadataSource for FfprobeRetriever {
    fn extract(&self, key: MetadataKey) -> Option<String> {
        match key {
            MetadataKey::Duration => self
                .probe
                .format
                .duration
                .as_deref()
                .and_then(seconds_to_millis)
                .map(|ms| ms.to_string()),
            MetadataKey::VideoRotation => self.stream("video").map(|s| stream_rotation(s).to_string()),
            MetadataKey::VideoWidth => self.stream("video")?.width.map(|w| w.to_string()),
            MetadataKey::VideoHeight => self.stream("video")?.height.map(|h| h.to_string()),
            MetadataKey::Date => self
                .probe
                .format
                .tags
                .get("creation_time")
                .map(|raw| capture_date_from_iso(raw)),
            MetadataKey::Bitrate => self.probe.format.bit_rate.clone(),
            MetadataKey::FrameRate => {
                let stream = self.stream("video")?;
                stream
                    .avg_frame_rate
                    .as_deref()
                    .and_then(rational_to_decimal)
                    .or_else(|| stream.r_frame_rate.as_deref().and_then(rational_to_decimal))
            }
            MetadataKey::SampleRate => self.stream("audio")?.sample_rate.clone(),
        }
    }
}

impl Drop for FfprobeRetriever {
    fn drop(&mut self) {
        tracing::trace!("Released metadata handle for {}", self.path.display());
    }
}

/// `"12.3456"` seconds to `12345` milliseconds, truncating, without going
/// through floating point.
fn seconds_to_millis(value: &str) -> Option<u64> {
    let value = value.trim();
    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    if whole.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let seconds: u64 = whole.parse().ok()?;
    let millis: String = fraction.chars().chain("000".chars()).take(3).collect();
    let millis: u64 = millis.parse().ok()?;
    seconds.checked_mul(1000)?.checked_add(millis)
}

fn stream_rotation(stream: &ProbeStream) -> i64 {
    let degrees = stream
        .tags
        .get("rotate")
        .and_then(|r| r.trim().parse::<f64>().ok())
        // Display matrix rotation is counter-clockwise, the rotate tag clockwise.
        .or_else(|| {
            stream
                .side_data_list
                .iter()
                .find_map(|d| d.rotation)
                .map(|r| -r)
        })
        .unwrap_or(0.0);
    (degrees.round() as i64).rem_euclid(360)
}

/// ISO 8601 creation time to the compact `yyyyMMddTHHmmss.SSSZ` form.
/// Values that are not ISO 8601 are passed through untouched.
fn capture_date_from_iso(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw.trim()) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%Y%m%dT%H%M%S%.3fZ")
            .to_string(),
        Err(_) => raw.to_string(),
    }
}

fn rational_to_decimal(value: &str) -> Option<String> {
    let rate = match value.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => value.trim().parse().ok()?,
    };
    if rate <= 0.0 || !rate.is_finite() {
        return None;
    }
    let formatted = format!("{:.2}", rate);
    Some(
        formatted
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string(),
    )
}

/// Configured ffprobe, else whatever is on PATH.
pub fn resolve_ffprobe(configured: &str) -> Result<PathBuf> {
    if !configured.trim().is_empty() {
        return Ok(PathBuf::from(configured));
    }
    which::which("ffprobe").map_err(|_| VidmetaError::ProbeUnavailable)
}
