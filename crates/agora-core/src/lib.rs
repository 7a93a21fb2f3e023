//! Agora Core - discussion control for multi-agent chats
//!
//! This crate provides the coordination layer of a multi-agent discussion:
//! - Typing indicator store with background expiry
//! - Member registry mirroring discussion participants
//! - Speak scheduler choosing whose turn it is and pacing replies
//! - Discussion control service owning the run/pause state machine
//! - Shared, validated discussion settings
//! - Inline action directive parsing and built-in agent personas

pub mod actions;
pub mod context;
pub mod control;
pub mod members;
pub mod personas;
pub mod scheduler;
pub mod settings;
pub mod typing;

// Re-export key types for convenience
pub use actions::{ActionDirective, ParsedContent, parse_actions};
pub use context::DiscussionContext;
pub use control::{ControlEvent, DiscussionControlService, MessageSender, RunState};
pub use members::MemberRegistry;
pub use personas::{AgentPersona, PersonaCatalog};
pub use scheduler::SpeakScheduler;
pub use settings::{SettingsStore, validate_settings};
pub use typing::{TypingEvent, TypingIndicator, TypingIndicatorStore};
