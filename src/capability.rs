// vidmeta (video metadata inspector)
// Copyright (C) 2025 Andrew Nissen

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Optional fields that only some tiers can report.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    FrameRate,
    SampleRate,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityTier {
    /// No gated fields, and the storage permission check is skipped.
    Legacy,
    Standard,
    #[default]
    Modern,
}

impl CapabilityTier {
    pub fn skips_permission_check(&self) -> bool {
        *self == CapabilityTier::Legacy
    }
}

impl fmt::Display for CapabilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityTier::Legacy => write!(f, "legacy"),
            CapabilityTier::Standard => write!(f, "standard"),
            CapabilityTier::Modern => write!(f, "modern"),
        }
    }
}

impl FromStr for CapabilityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(CapabilityTier::Legacy),
            "standard" => Ok(CapabilityTier::Standard),
            "modern" => Ok(CapabilityTier::Modern),
            other => Err(format!(
                "Invalid capability_tier value: {} (expected legacy, standard or modern)",
                other
            )),
        }
    }
}

/// Snapshot of what the current tier supports, taken once per report.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    pub frame_rate: bool,
    pub sample_rate: bool,
}

impl Capabilities {
    pub fn from_tier(tier: CapabilityTier) -> Self {
        Self {
            frame_rate: tier >= CapabilityTier::Standard,
            sample_rate: tier >= CapabilityTier::Modern,
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::FrameRate => self.frame_rate,
            Capability::SampleRate => self.sample_rate,
        }
    }
}
