//! Shared data types for discussions

use crate::constants::{DEFAULT_MAX_ROUNDS, DEFAULT_SPEAK_INTERVAL_MS, DEFAULT_TEMPERATURE};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An agent's participation record within a discussion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionMember {
    /// Member record id
    pub id: String,
    /// Discussion this member belongs to
    pub discussion_id: String,
    /// Agent persona taking part
    pub agent_id: String,
    /// Whether the scheduler may speak on this member's behalf
    pub is_auto_reply: bool,
    /// When the agent joined
    pub joined_at: DateTime<Utc>,
}

impl DiscussionMember {
    /// Create a member joining now
    pub fn new(discussion_id: &str, agent_id: &str, is_auto_reply: bool) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            discussion_id: discussion_id.to_string(),
            agent_id: agent_id.to_string(),
            is_auto_reply,
            joined_at: Utc::now(),
        }
    }
}

/// Lifecycle status of a discussion as seen by the surrounding application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionStatus {
    Active,
    #[default]
    Paused,
    Completed,
}

/// Per-member activity shown next to a participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypingStatus {
    /// Composing visible text
    Typing,
    /// Generating a reply that is not yet visible
    Thinking,
}

/// How strictly the moderator keeps agents on topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModerationStyle {
    Strict,
    #[default]
    Relaxed,
}

/// Shared discussion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscussionSettings {
    /// Rounds before the discussion pauses itself; 0 means unlimited
    pub max_rounds: u32,
    /// Sampling temperature for generated replies
    pub temperature: f32,
    /// Pacing interval between speakers (ms)
    pub interval: u64,
    pub moderation_style: ModerationStyle,
    pub focus_topics: Vec<String>,
    pub allow_conflict: bool,
}

impl Default for DiscussionSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            temperature: DEFAULT_TEMPERATURE,
            interval: DEFAULT_SPEAK_INTERVAL_MS,
            moderation_style: ModerationStyle::Relaxed,
            focus_topics: Vec::new(),
            allow_conflict: true,
        }
    }
}

/// Kind of message produced in a discussion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Action,
    System,
}

/// A request, emitted by the scheduler, asking the collaborator to produce a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeakRequest {
    /// Pre-filled content; empty when the collaborator must generate it
    pub content: String,
    /// Agent that should speak
    pub agent_id: String,
    /// Member record of that agent
    pub member_id: String,
    pub message_type: MessageType,
    /// Message this reply follows up on
    pub reply_to: Option<String>,
}

/// A message produced by an agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: String,
    pub discussion_id: String,
    pub agent_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub reply_to: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AgentMessage {
    /// Create a message authored now
    pub fn new(
        discussion_id: &str,
        agent_id: &str,
        content: String,
        message_type: MessageType,
        reply_to: Option<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            discussion_id: discussion_id.to_string(),
            agent_id: agent_id.to_string(),
            content,
            message_type,
            reply_to,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults_fill_missing_fields() {
        let settings: DiscussionSettings =
            serde_json::from_str(r#"{"interval": 1500, "moderation_style": "strict"}"#).unwrap();
        assert_eq!(settings.interval, 1500);
        assert_eq!(settings.moderation_style, ModerationStyle::Strict);
        assert_eq!(settings.max_rounds, DEFAULT_MAX_ROUNDS);
        assert!(settings.allow_conflict);
    }

    #[test]
    fn test_message_type_serializes_lowercase() {
        let json = serde_json::to_string(&MessageType::Action).unwrap();
        assert_eq!(json, "\"action\"");
    }

    #[test]
    fn test_new_members_get_distinct_ids() {
        let a = DiscussionMember::new("d1", "skeptic", true);
        let b = DiscussionMember::new("d1", "skeptic", true);
        assert_ne!(a.id, b.id);
        assert_eq!(a.agent_id, b.agent_id);
    }
}
