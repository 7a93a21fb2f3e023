//! Configuration types for Agora

use crate::constants::{MIN_SPEAK_INTERVAL_MS, typing};
use crate::types::DiscussionSettings;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base configuration that all components can use
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseConfig {
    pub log_level: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Typing indicator store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TypingConfig {
    /// Age after which an indicator is dropped (ms)
    pub expiration_ms: u64,
    /// Interval between expiry sweeps (ms)
    pub sweep_interval_ms: u64,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            expiration_ms: typing::DEFAULT_EXPIRATION_MS,
            sweep_interval_ms: typing::DEFAULT_SWEEP_INTERVAL_MS,
        }
    }
}

impl TypingConfig {
    pub fn expiration(&self) -> Duration {
        Duration::from_millis(self.expiration_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

/// Speak scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Floor applied to any interval that reaches the scheduler (ms)
    pub min_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            min_interval_ms: MIN_SPEAK_INTERVAL_MS,
        }
    }
}

/// Everything needed to stand up one discussion context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionConfig {
    pub discussion_id: String,
    pub settings: DiscussionSettings,
    pub typing: TypingConfig,
    pub scheduler: SchedulerConfig,
}

impl DiscussionConfig {
    pub fn new(discussion_id: impl Into<String>) -> Self {
        Self {
            discussion_id: discussion_id.into(),
            ..Default::default()
        }
    }
}
