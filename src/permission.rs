// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use crate::config::{self, VidmetaConfig};
use crate::error::{Result, VidmetaError};
use dialoguer::Confirm;
use std::fs::File;
use std::io::IsTerminal;
use std::path::Path;

pub const PERMISSION_NOTICE: &str = "Allow external storage reading";
pub const PERMISSION_PROMPT: &str = "Allow vidmeta to read media files?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Consent is remembered in the config. A stored `false` is not asked again;
/// the user has to flip it with `vidmeta config set allow_storage_read true`.
pub fn check(cfg: &VidmetaConfig) -> PermissionStatus {
    if cfg.capability_tier.skips_permission_check() {
        return PermissionStatus::Granted;
    }
    match cfg.allow_storage_read {
        Some(true) => PermissionStatus::Granted,
        Some(false) => PermissionStatus::Denied,
        None => PermissionStatus::Undetermined,
    }
}

/// Ask on the terminal. `None` means nobody could be asked (no terminal or
/// the prompt failed); that counts as a denial but is not remembered.
pub fn prompt_for_consent() -> Option<bool> {
    if !std::io::stdin().is_terminal() {
        tracing::info!("No terminal to ask for storage access");
        return None;
    }
    match Confirm::new()
        .with_prompt(PERMISSION_PROMPT)
        .default(true)
        .interact()
    {
        Ok(granted) => Some(granted),
        Err(e) => {
            tracing::warn!("Permission prompt failed: {}", e);
            None
        }
    }
}

pub fn record_decision(cfg: &mut VidmetaConfig, granted: bool) {
    cfg.allow_storage_read = Some(granted);
    if let Err(e) = config::store_config(cfg) {
        tracing::warn!("Could not save storage permission decision: {}", e);
    }
}

/// The file itself must be readable by this process.
pub fn ensure_readable(path: &Path) -> Result<()> {
    match File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Err(
            VidmetaError::PermissionDenied(format!("cannot read {}", path.display())),
        ),
        Err(e) => Err(VidmetaError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilityTier;

    #[test]
    fn test_check_follows_stored_consent() {
        let mut cfg = VidmetaConfig::default();
        assert_eq!(check(&cfg), PermissionStatus::Undetermined);
        cfg.allow_storage_read = Some(true);
        assert_eq!(check(&cfg), PermissionStatus::Granted);
        cfg.allow_storage_read = Some(false);
        assert_eq!(check(&cfg), PermissionStatus::Denied);
    }

    #[test]
    fn test_legacy_tier_is_pre_granted() {
        let cfg = VidmetaConfig {
            capability_tier: CapabilityTier::Legacy,
            allow_storage_read: Some(false),
            ..VidmetaConfig::default()
        };
        assert_eq!(check(&cfg), PermissionStatus::Granted);
    }

    #[test]
    fn test_ensure_readable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mp4");
        std::fs::write(&path, b"data").unwrap();
        assert!(ensure_readable(&path).is_ok());
        assert!(matches!(
            ensure_readable(&dir.path().join("missing.mp4")),
            Err(VidmetaError::Io(_))
        ));
    }
}
