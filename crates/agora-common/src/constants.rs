//! Common constants used across Agora

/// Default pacing interval between scheduler ticks (ms)
pub const DEFAULT_SPEAK_INTERVAL_MS: u64 = 3_000;

/// Smallest interval the scheduler will ever arm a timer with (ms)
pub const MIN_SPEAK_INTERVAL_MS: u64 = 100;

/// Default number of rounds before a discussion pauses itself
pub const DEFAULT_MAX_ROUNDS: u32 = 20;

/// Default sampling temperature handed to the message collaborator
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Accepted temperature range
pub const MIN_TEMPERATURE: f32 = 0.0;
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Typing indicator defaults
pub mod typing {
    /// Age after which an indicator is considered stale (ms)
    pub const DEFAULT_EXPIRATION_MS: u64 = 5_000;
    /// How often the expiry sweep runs (ms)
    pub const DEFAULT_SWEEP_INTERVAL_MS: u64 = 200_000;
}

/// Broadcast channel capacities
pub mod channels {
    pub const SPEAK_REQUEST_CAPACITY: usize = 256;
    pub const TYPING_EVENT_CAPACITY: usize = 256;
    pub const CONTROL_EVENT_CAPACITY: usize = 256;
}
