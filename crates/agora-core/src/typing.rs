//! Typing indicator store
//!
//! Holds the ephemeral "typing"/"thinking" status of each discussion member,
//! drops stale entries on a background sweep and broadcasts a snapshot to
//! subscribers whenever the mapping changes.

use agora_common::{TypingConfig, TypingStatus, channels};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Current status of one member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypingIndicator {
    pub member_id: String,
    pub status: TypingStatus,
    /// Wall-clock time of the last update
    pub timestamp: DateTime<Utc>,
}

/// Change notification carrying the mapping after the change
#[derive(Debug, Clone)]
pub struct TypingEvent {
    pub indicators: HashMap<String, TypingIndicator>,
}

struct Entry {
    indicator: TypingIndicator,
    updated_at: Instant,
}

struct StoreInner {
    entries: Mutex<HashMap<String, Entry>>,
    event_sender: broadcast::Sender<TypingEvent>,
    expiration: Duration,
}

impl StoreInner {
    fn snapshot(&self, entries: &HashMap<String, Entry>) -> HashMap<String, TypingIndicator> {
        entries
            .iter()
            .map(|(id, entry)| (id.clone(), entry.indicator.clone()))
            .collect()
    }

    fn notify(&self, entries: &HashMap<String, Entry>) {
        let _ = self.event_sender.send(TypingEvent {
            indicators: self.snapshot(entries),
        });
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| now.saturating_duration_since(entry.updated_at) < self.expiration);
        let removed = before - entries.len();

        if removed > 0 {
            debug!("Expired {} typing indicator(s)", removed);
            self.notify(&entries);
        }
        removed
    }
}

/// Per-member typing indicator store
///
/// Must be created inside a tokio runtime: construction spawns the expiry sweep.
pub struct TypingIndicatorStore {
    inner: Arc<StoreInner>,
    sweep_task: Mutex<Option<JoinHandle<()>>>,
}

impl TypingIndicatorStore {
    /// Create a store and start its expiry sweep
    pub fn new(config: &TypingConfig) -> Self {
        let (event_sender, _) = broadcast::channel(channels::TYPING_EVENT_CAPACITY);
        let inner = Arc::new(StoreInner {
            entries: Mutex::new(HashMap::new()),
            event_sender,
            expiration: config.expiration(),
        });

        let sweep_task = tokio::spawn(Self::sweep_loop(
            Arc::downgrade(&inner),
            config.sweep_interval(),
        ));

        Self {
            inner,
            sweep_task: Mutex::new(Some(sweep_task)),
        }
    }

    async fn sweep_loop(inner: Weak<StoreInner>, period: Duration) {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            inner.sweep();
        }
    }

    /// Set or clear a member's status. Always notifies subscribers.
    pub fn update_status(&self, member_id: &str, status: Option<TypingStatus>) {
        let mut entries = self.inner.entries.lock();
        match status {
            Some(status) => {
                trace!("Member {} is now {:?}", member_id, status);
                entries.insert(
                    member_id.to_string(),
                    Entry {
                        indicator: TypingIndicator {
                            member_id: member_id.to_string(),
                            status,
                            timestamp: Utc::now(),
                        },
                        updated_at: Instant::now(),
                    },
                );
            }
            None => {
                entries.remove(member_id);
            }
        }
        self.inner.notify(&entries);
    }

    /// Independent copy of the current mapping
    pub fn indicators(&self) -> HashMap<String, TypingIndicator> {
        let entries = self.inner.entries.lock();
        self.inner.snapshot(&entries)
    }

    pub fn status(&self, member_id: &str) -> Option<TypingStatus> {
        self.inner
            .entries
            .lock()
            .get(member_id)
            .map(|entry| entry.indicator.status)
    }

    /// Remove one member's status; silent when there is none
    pub fn clear_status(&self, member_id: &str) {
        let mut entries = self.inner.entries.lock();
        if entries.remove(member_id).is_some() {
            self.inner.notify(&entries);
        }
    }

    /// Remove every status; silent when already empty
    pub fn clear_all(&self) {
        let mut entries = self.inner.entries.lock();
        if !entries.is_empty() {
            entries.clear();
            self.inner.notify(&entries);
        }
    }

    /// Run one expiry pass now, returning how many entries were dropped
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TypingEvent> {
        self.inner.event_sender.subscribe()
    }

    /// Stop the sweep and drop all state
    pub fn destroy(&self) {
        if let Some(task) = self.sweep_task.lock().take() {
            task.abort();
            debug!("Typing indicator sweep stopped");
        }
        self.inner.entries.lock().clear();
    }
}

impl Drop for TypingIndicatorStore {
    fn drop(&mut self) {
        if let Some(task) = self.sweep_task.get_mut().take() {
            task.abort();
        }
    }
}
