//! Explicit per-discussion context
//!
//! Bundles the typing store, settings, scheduler and control service for one
//! discussion so callers pass a single handle around instead of reaching for
//! process-wide instances.

use crate::control::{DiscussionControlService, MessageSender};
use crate::scheduler::SpeakScheduler;
use crate::settings::SettingsStore;
use crate::typing::TypingIndicatorStore;
use agora_common::{DiscussionConfig, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::info;

pub struct DiscussionContext {
    discussion_id: String,
    typing: Arc<TypingIndicatorStore>,
    settings: Arc<SettingsStore>,
    control: DiscussionControlService,
    shut_down: AtomicBool,
}

impl DiscussionContext {
    /// Build and wire every component. Must be called inside a tokio runtime.
    pub fn new(config: DiscussionConfig, sender: Arc<dyn MessageSender>) -> Result<Self> {
        let settings = Arc::new(SettingsStore::new(config.settings.clone())?);
        let typing = Arc::new(TypingIndicatorStore::new(&config.typing));
        let scheduler = Arc::new(SpeakScheduler::new(
            &config.scheduler,
            config.settings.interval,
        ));
        let control = DiscussionControlService::new(
            scheduler,
            Arc::clone(&settings),
            sender,
            Some(Arc::clone(&typing)),
        );

        info!("Discussion context {} initialised", config.discussion_id);
        Ok(Self {
            discussion_id: config.discussion_id,
            typing,
            settings,
            control,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn discussion_id(&self) -> &str {
        &self.discussion_id
    }

    pub fn control(&self) -> &DiscussionControlService {
        &self.control
    }

    pub fn typing(&self) -> &Arc<TypingIndicatorStore> {
        &self.typing
    }

    pub fn settings(&self) -> &Arc<SettingsStore> {
        &self.settings
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Pause everything and release timers; safe to call more than once
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.control.teardown();
        self.typing.destroy();
        info!("Discussion context {} shut down", self.discussion_id);
    }
}

impl Drop for DiscussionContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}
