// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::capability::{Capabilities, CapabilityTier};
use crate::format::DatePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_FILE_FILTER: &str = r".*\.(mp4|mkv)$";

fn default_file_filter() -> String {
    DEFAULT_FILE_FILTER.to_string()
}

fn default_max_depth() -> usize {
    3
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VidmetaConfig {
    #[serde(default)]
    pub ffprobe_path: String,
    #[serde(default)]
    pub start_directory: String,
    #[serde(default = "default_file_filter")]
    pub file_filter: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub capability_tier: CapabilityTier,
    #[serde(default)]
    pub date_fallback: DatePolicy,
    #[serde(default)]
    pub pad_seconds: bool,
    pub allow_storage_read: Option<bool>,
}

impl Default for VidmetaConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: String::new(),
            start_directory: String::new(),
            file_filter: default_file_filter(),
            max_depth: default_max_depth(),
            capability_tier: CapabilityTier::default(),
            date_fallback: DatePolicy::default(),
            pad_seconds: false,
            allow_storage_read: None,
        }
    }
}

impl VidmetaConfig {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities::from_tier(self.capability_tier)
    }

    pub fn start_directory(&self) -> PathBuf {
        if !self.start_directory.trim().is_empty() {
            return PathBuf::from(&self.start_directory);
        }
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
    }
}

pub fn load_config() -> Result<VidmetaConfig, confy::ConfyError> {
    if let Ok(config_path) = std::env::var("VIDMETA_CONFIG_PATH") {
        confy::load_path(&config_path)
    } else {
        confy::load("vidmeta", "config")
    }
}

pub fn load_config_or_default() -> VidmetaConfig {
    match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!("Could not load config, using defaults: {}", e);
            VidmetaConfig::default()
        }
    }
}

pub fn store_config(config: &VidmetaConfig) -> Result<(), confy::ConfyError> {
    if let Ok(config_path) = std::env::var("VIDMETA_CONFIG_PATH") {
        confy::store_path(&config_path, config)
    } else {
        confy::store("vidmeta", "config", config)
    }
}

pub fn get_config_path() -> Result<PathBuf, confy::ConfyError> {
    if let Ok(config_path) = std::env::var("VIDMETA_CONFIG_PATH") {
        Ok(PathBuf::from(config_path))
    } else {
        confy::get_configuration_file_path("vidmeta", "config")
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, String> {
    value
        .parse::<bool>()
        .map_err(|_| format!("Invalid boolean value for {}: {}", field, value))
}

pub fn set_config_field(cfg: &mut VidmetaConfig, field: &str, value: &str) -> Result<(), String> {
    match field {
        "ffprobe_path" => cfg.ffprobe_path = value.to_string(),
        "start_directory" => cfg.start_directory = value.to_string(),
        "file_filter" => {
            regex::Regex::new(value)
                .map_err(|e| format!("Invalid regular expression for file_filter: {}", e))?;
            cfg.file_filter = value.to_string();
        }
        "max_depth" => {
            cfg.max_depth = value
                .parse::<usize>()
                .map_err(|_| format!("Invalid number value for max_depth: {}", value))?;
        }
        "capability_tier" => cfg.capability_tier = value.parse()?,
        "date_fallback" => cfg.date_fallback = value.parse()?,
        "pad_seconds" => cfg.pad_seconds = parse_bool(field, value)?,
        "allow_storage_read" => cfg.allow_storage_read = Some(parse_bool(field, value)?),
        _ => return Err(format!("Unknown field: {}", field)),
    }
    Ok(())
}

pub fn unset_config_field(cfg: &mut VidmetaConfig, field: &str) -> Result<(), String> {
    let defaults = VidmetaConfig::default();
    match field {
        "ffprobe_path" => cfg.ffprobe_path = defaults.ffprobe_path,
        "start_directory" => cfg.start_directory = defaults.start_directory,
        "file_filter" => cfg.file_filter = defaults.file_filter,
        "max_depth" => cfg.max_depth = defaults.max_depth,
        "capability_tier" => cfg.capability_tier = defaults.capability_tier,
        "date_fallback" => cfg.date_fallback = defaults.date_fallback,
        "pad_seconds" => cfg.pad_seconds = defaults.pad_seconds,
        "allow_storage_read" => cfg.allow_storage_read = None,
        _ => return Err(format!("Unknown field: {}", field)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = VidmetaConfig::default();
        assert_eq!(cfg.file_filter, r".*\.(mp4|mkv)$");
        assert_eq!(cfg.max_depth, 3);
        assert_eq!(cfg.capability_tier, CapabilityTier::Modern);
        assert_eq!(cfg.date_fallback, DatePolicy::Now);
        assert!(!cfg.pad_seconds);
        assert_eq!(cfg.allow_storage_read, None);
    }

    #[test]
    fn test_set_and_unset_fields() {
        let mut cfg = VidmetaConfig::default();
        set_config_field(&mut cfg, "capability_tier", "legacy").unwrap();
        set_config_field(&mut cfg, "date_fallback", "unknown").unwrap();
        set_config_field(&mut cfg, "pad_seconds", "true").unwrap();
        set_config_field(&mut cfg, "allow_storage_read", "false").unwrap();
        set_config_field(&mut cfg, "max_depth", "1").unwrap();
        assert_eq!(cfg.capability_tier, CapabilityTier::Legacy);
        assert_eq!(cfg.date_fallback, DatePolicy::Unknown);
        assert!(cfg.pad_seconds);
        assert_eq!(cfg.allow_storage_read, Some(false));
        assert_eq!(cfg.max_depth, 1);

        unset_config_field(&mut cfg, "allow_storage_read").unwrap();
        unset_config_field(&mut cfg, "capability_tier").unwrap();
        assert_eq!(cfg.allow_storage_read, None);
        assert_eq!(cfg.capability_tier, CapabilityTier::Modern);
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut cfg = VidmetaConfig::default();
        assert!(set_config_field(&mut cfg, "pad_seconds", "yes").is_err());
        assert!(set_config_field(&mut cfg, "max_depth", "-1").is_err());
        assert!(set_config_field(&mut cfg, "file_filter", "(unclosed").is_err());
        assert!(set_config_field(&mut cfg, "nonexistent", "x").is_err());
        assert!(unset_config_field(&mut cfg, "nonexistent").is_err());
        assert_eq!(cfg, VidmetaConfig::default());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: VidmetaConfig = toml_like(r#"{ "ffprobe_path": "/usr/bin/ffprobe" }"#);
        assert_eq!(cfg.ffprobe_path, "/usr/bin/ffprobe");
        assert_eq!(cfg.file_filter, DEFAULT_FILE_FILTER);
        assert_eq!(cfg.max_depth, 3);
    }

    fn toml_like(json: &str) -> VidmetaConfig {
        serde_json::from_str(json).unwrap()
    }
}
