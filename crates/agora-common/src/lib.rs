//! Agora Common - Shared utilities and types
//!
//! This crate provides the error type, configuration structs,
//! constants and plain data types shared by all Agora components.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items
pub use config::{BaseConfig, DiscussionConfig, SchedulerConfig, TypingConfig};
pub use constants::*;
pub use error::{AgoraError, Result};
pub use types::{
    AgentMessage, DiscussionMember, DiscussionSettings, DiscussionStatus, MessageType,
    ModerationStyle, SpeakRequest, TypingStatus,
};
