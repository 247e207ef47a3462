// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::capability::{Capabilities, Capability};
use crate::config::VidmetaConfig;
use crate::error::{Result, VidmetaError};
use crate::format::{self, DatePolicy};
use crate::metadata::{self, FfprobeRetriever, MapSource, MetadataKey, MetadataSource};
use crate::permission;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Everything shown for one selected file. Built once, rendered once.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MediaReport {
    pub file_name: String,
    pub file_path: String,
    pub size_bytes: u64,
    pub capture_date: Option<String>,
    pub duration_ms: u64,
    pub rotation_degrees: i64,
    pub width_px: u32,
    pub height_px: u32,
    pub bit_rate: Option<String>,
    pub frame_rate: Option<String>,
    pub sample_rate: Option<String>,
    pub capabilities: Capabilities,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    pub date_policy: DatePolicy,
    pub pad_seconds: bool,
}

impl From<&VidmetaConfig> for RenderOptions {
    fn from(cfg: &VidmetaConfig) -> Self {
        Self {
            date_policy: cfg.date_fallback,
            pad_seconds: cfg.pad_seconds,
        }
    }
}

/// Formatted strings alongside the raw values, for `--json`.
#[derive(Serialize, Debug)]
pub struct FormattedReport<'a> {
    #[serde(flatten)]
    pub report: &'a MediaReport,
    pub size: String,
    pub date: String,
    pub duration: String,
    pub resolution: String,
}

fn required<T: FromStr>(source: &dyn MetadataSource, key: MetadataKey) -> Result<T> {
    let value = source.extract(key);
    match value.as_deref().map(|v| v.trim().parse::<T>()) {
        Some(Ok(parsed)) => Ok(parsed),
        _ => {
            tracing::warn!("Required metadata field {} is {:?}", key, value);
            Err(VidmetaError::UnsupportedMedia { key, value })
        }
    }
}

fn optional(
    source: &dyn MetadataSource,
    key: MetadataKey,
    capabilities: &Capabilities,
) -> Option<String> {
    match key.required_capability() {
        Some(capability) if !capabilities.supports(capability) => None,
        _ => source.extract(key),
    }
}

fn display_or_null(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("null")
}

impl MediaReport {
    /// File facts come from the filesystem, media facts from `source`.
    pub fn collect(
        path: &Path,
        source: &dyn MetadataSource,
        capabilities: Capabilities,
    ) -> Result<Self> {
        let size_bytes = fs::metadata(path)?.len();
        Self::from_parts(path, size_bytes, source, capabilities)
    }

    pub fn from_parts(
        path: &Path,
        size_bytes: u64,
        source: &dyn MetadataSource,
        capabilities: Capabilities,
    ) -> Result<Self> {
        let duration_ms = required::<u64>(source, MetadataKey::Duration)?;
        let rotation_degrees = required::<i64>(source, MetadataKey::VideoRotation)?;
        let width_px = required::<u32>(source, MetadataKey::VideoWidth)?;
        let height_px = required::<u32>(source, MetadataKey::VideoHeight)?;

        Ok(Self {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            file_path: path.to_string_lossy().to_string(),
            size_bytes,
            capture_date: source.extract(MetadataKey::Date),
            duration_ms,
            rotation_degrees,
            width_px,
            height_px,
            bit_rate: source.extract(MetadataKey::Bitrate),
            frame_rate: optional(source, MetadataKey::FrameRate, &capabilities),
            sample_rate: optional(source, MetadataKey::SampleRate, &capabilities),
            capabilities,
        })
    }

    /// Probe `path` with ffprobe and build the report. The probe handle is
    /// released before this returns, on success and on failure.
    pub fn inspect(path: &Path, cfg: &VidmetaConfig) -> Result<Self> {
        let ffprobe = metadata::resolve_ffprobe(&cfg.ffprobe_path)?;
        let retriever = FfprobeRetriever::open(&ffprobe, path)?;
        Self::collect_and_release(path, retriever, cfg.capabilities())
    }

    /// Takes ownership of `source` so it is dropped before the result is
    /// handed back.
    fn collect_and_release<S: MetadataSource>(
        path: &Path,
        source: S,
        capabilities: Capabilities,
    ) -> Result<Self> {
        let report = Self::collect(path, &source, capabilities);
        drop(source);
        report
    }

    pub fn resolution(&self) -> String {
        format!("{} x {}", self.width_px, self.height_px)
    }

    pub fn render(&self, options: &RenderOptions) -> String {
        TextReport {
            report: self,
            options,
        }
        .to_string()
    }

    /// Text layout, or pretty JSON of [`FormattedReport`] when `json` is set.
    pub fn output(&self, options: &RenderOptions, json: bool) -> Result<String> {
        if json {
            let mut out = serde_json::to_string_pretty(&self.formatted(options))?;
            out.push('\n');
            Ok(out)
        } else {
            Ok(self.render(options))
        }
    }

    pub fn formatted(&self, options: &RenderOptions) -> FormattedReport<'_> {
        FormattedReport {
            report: self,
            size: format::format_size(self.size_bytes),
            date: format::format_date(self.capture_date.as_deref(), options.date_policy),
            duration: format::format_duration_with(self.duration_ms, options.pad_seconds),
            resolution: self.resolution(),
        }
    }
}

struct TextReport<'a> {
    report: &'a MediaReport,
    options: &'a RenderOptions,
}

impl fmt::Display for TextReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = self.report;
        writeln!(f, "File")?;
        writeln!(f, "Name: {}", report.file_name)?;
        writeln!(f, "Location: {}", report.file_path)?;
        writeln!(f, "Size: {}", format::format_size(report.size_bytes))?;
        writeln!(
            f,
            "Date: {}",
            format::format_date(report.capture_date.as_deref(), self.options.date_policy)
        )?;
        writeln!(f)?;

        writeln!(f, "Media")?;
        writeln!(
            f,
            "Duration: {}",
            format::format_duration_with(report.duration_ms, self.options.pad_seconds)
        )?;
        writeln!(f, "Rotation: {}", report.rotation_degrees)?;
        writeln!(f, "Resolution: {}", report.resolution())?;
        writeln!(f, "Bit rate: {}", display_or_null(&report.bit_rate))?;

        if report.capabilities.supports(Capability::FrameRate) {
            writeln!(f, "Frame rate: {}", display_or_null(&report.frame_rate))?;
        }
        if report.capabilities.supports(Capability::SampleRate) {
            writeln!(f, "Sample rate: {}", display_or_null(&report.sample_rate))?;
        }
        Ok(())
    }
}

/// A recorded probe: file facts plus the raw metadata values, rendered
/// without touching the file or running ffprobe.
#[derive(Deserialize, Debug, Clone)]
pub struct RecordedProbe {
    pub file_path: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub metadata: MapSource,
}

impl RecordedProbe {
    pub fn into_report(self, cfg: &VidmetaConfig) -> Result<MediaReport> {
        MediaReport::from_parts(
            Path::new(&self.file_path),
            self.size_bytes,
            &self.metadata,
            cfg.capabilities(),
        )
    }
}

/// Readability check, probe and render for one chosen file.
pub fn inspect_and_render(path: &Path, cfg: &VidmetaConfig, json: bool) -> Result<String> {
    permission::ensure_readable(path)?;
    let report = MediaReport::inspect(path, cfg)?;
    report.output(&RenderOptions::from(cfg), json)
}
