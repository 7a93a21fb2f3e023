//! Shared discussion settings with validation at the update boundary

use agora_common::{AgoraError, DiscussionSettings, MAX_TEMPERATURE, MIN_TEMPERATURE, Result};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Check settings before they can reach the scheduler
pub fn validate_settings(settings: &DiscussionSettings) -> Result<()> {
    if settings.interval == 0 {
        return Err(AgoraError::InvalidSettings(
            "interval must be greater than zero".to_string(),
        ));
    }
    if !settings.temperature.is_finite()
        || !(MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&settings.temperature)
    {
        return Err(AgoraError::InvalidSettings(format!(
            "temperature {} is outside {}..={}",
            settings.temperature, MIN_TEMPERATURE, MAX_TEMPERATURE
        )));
    }
    if settings.focus_topics.iter().any(|t| t.trim().is_empty()) {
        return Err(AgoraError::InvalidSettings(
            "focus topics must not be blank".to_string(),
        ));
    }
    Ok(())
}

/// Read/write settings record; every subscriber sees updates immediately
pub struct SettingsStore {
    sender: watch::Sender<DiscussionSettings>,
}

impl SettingsStore {
    pub fn new(initial: DiscussionSettings) -> Result<Self> {
        validate_settings(&initial)?;
        let (sender, _) = watch::channel(initial);
        Ok(Self { sender })
    }

    pub fn get(&self) -> DiscussionSettings {
        self.sender.borrow().clone()
    }

    /// Replace the settings; the stored value is untouched on rejection
    pub fn update(&self, settings: DiscussionSettings) -> Result<()> {
        if let Err(e) = validate_settings(&settings) {
            warn!("Rejected settings update: {}", e);
            return Err(e);
        }
        self.sender.send_replace(settings);
        debug!("Discussion settings updated");
        Ok(())
    }

    /// Edit a copy of the current settings and commit it if valid
    pub fn modify<F>(&self, edit: F) -> Result<DiscussionSettings>
    where
        F: FnOnce(&mut DiscussionSettings),
    {
        let mut settings = self.get();
        edit(&mut settings);
        self.update(settings.clone())?;
        Ok(settings)
    }

    pub fn watch(&self) -> watch::Receiver<DiscussionSettings> {
        self.sender.subscribe()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        let (sender, _) = watch::channel(DiscussionSettings::default());
        Self { sender }
    }
}
