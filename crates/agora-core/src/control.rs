//! Discussion control service
//!
//! Owns the run/pause state of a discussion. Member and status updates from
//! the surrounding application are pushed into the [`SpeakScheduler`], and
//! every request the scheduler emits is relayed to a [`MessageSender`] on its
//! own task. A slow or failing sender never holds up or stops the timer.

use crate::members::MemberRegistry;
use crate::scheduler::SpeakScheduler;
use crate::settings::SettingsStore;
use crate::typing::TypingIndicatorStore;
use agora_common::{
    AgentMessage, AgoraError, DiscussionMember, DiscussionSettings, DiscussionStatus, Result,
    SpeakRequest, TypingStatus, channels,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Produces (and persists) the actual message for a speak request
#[async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_message(&self, request: SpeakRequest) -> Result<Option<AgentMessage>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunState {
    Running,
    #[default]
    Paused,
}

/// Side channel for everything the control service wants the UI to know
#[derive(Debug, Clone)]
pub enum ControlEvent {
    StateChanged(RunState),
    MessageSent(AgentMessage),
    SendFailed { agent_id: String, error: String },
    RoundLimitReached { rounds: u32 },
}

#[derive(Default)]
struct ControlState {
    run_state: RunState,
    discussion_status: DiscussionStatus,
    registry: MemberRegistry,
    torn_down: bool,
}

struct ControlInner {
    scheduler: Arc<SpeakScheduler>,
    settings: Arc<SettingsStore>,
    typing: Option<Arc<TypingIndicatorStore>>,
    sender: Arc<dyn MessageSender>,
    state: Mutex<ControlState>,
    /// member_id -> sends not yet settled
    in_flight: Mutex<HashMap<String, usize>>,
    event_sender: broadcast::Sender<ControlEvent>,
}

impl ControlInner {
    fn emit(&self, event: ControlEvent) {
        let _ = self.event_sender.send(event);
    }

    /// Keeps the scheduler timer in step with the run state
    fn transition(&self, state: &mut ControlState, target: RunState) {
        match target {
            RunState::Running => self.scheduler.run(),
            RunState::Paused => self.scheduler.pause(),
        }
        if state.run_state != target {
            state.run_state = target;
            info!("Discussion control is now {:?}", target);
            self.emit(ControlEvent::StateChanged(target));
        }
    }

    fn reconcile(&self, state: &mut ControlState) {
        if state.torn_down {
            return;
        }
        let should_run = state.discussion_status == DiscussionStatus::Active
            && state.registry.has_auto_reply()
            && !self.scheduler.round_limit_reached();
        let target = if should_run {
            RunState::Running
        } else {
            RunState::Paused
        };
        self.transition(state, target);
    }

    fn apply_settings(&self, settings: &DiscussionSettings) {
        self.scheduler.set_interval(settings.interval);
        self.scheduler.set_round_limit(Some(settings.max_rounds));
        self.check_round_limit();
    }

    fn check_round_limit(&self) {
        if !self.scheduler.round_limit_reached() {
            return;
        }
        let mut state = self.state.lock();
        if state.run_state == RunState::Running {
            let rounds = self.scheduler.rounds_completed();
            info!("Round limit of {} reached; pausing discussion", rounds);
            self.transition(&mut state, RunState::Paused);
            self.emit(ControlEvent::RoundLimitReached { rounds });
        }
    }

    fn begin_send(&self, member_id: &str) {
        let mut in_flight = self.in_flight.lock();
        *in_flight.entry(member_id.to_string()).or_insert(0) += 1;
        if let Some(typing) = &self.typing {
            typing.update_status(member_id, Some(TypingStatus::Thinking));
        }
    }

    /// The indicator stays up until the member's last overlapping send settles
    fn finish_send(&self, member_id: &str) {
        let mut in_flight = self.in_flight.lock();
        let Some(count) = in_flight.get_mut(member_id) else {
            return;
        };
        *count -= 1;
        if *count == 0 {
            in_flight.remove(member_id);
            if let Some(typing) = &self.typing {
                typing.clear_status(member_id);
            }
        }
    }

    fn pending_sends(&self) -> usize {
        self.in_flight.lock().values().sum()
    }

    async fn dispatch(self: Arc<Self>, request: SpeakRequest) {
        let agent_id = request.agent_id.clone();
        let member_id = request.member_id.clone();

        let outcome = self.sender.send_message(request).await;

        // Settle before publishing so listeners never see a stale pending count
        self.finish_send(&member_id);

        match outcome {
            Ok(Some(message)) => {
                debug!("Message {} sent for {}", message.id, agent_id);
                self.scheduler.observe_message(&message);
                self.emit(ControlEvent::MessageSent(message));
            }
            Ok(None) => debug!("Sender produced no message for {}", agent_id),
            Err(e) => {
                let failure = AgoraError::SendMessageFailed {
                    agent_id: agent_id.clone(),
                    reason: e.to_string(),
                };
                error!("{}", failure);
                self.emit(ControlEvent::SendFailed {
                    agent_id,
                    error: e.to_string(),
                });
            }
        }
    }

    async fn relay_loop(self: Arc<Self>, mut requests: broadcast::Receiver<SpeakRequest>) {
        loop {
            match requests.recv().await {
                Ok(request) => {
                    self.begin_send(&request.member_id);
                    tokio::spawn(Arc::clone(&self).dispatch(request));
                    self.check_round_limit();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Relay fell behind; {} speak request(s) dropped", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    async fn settings_loop(self: Arc<Self>, mut updates: watch::Receiver<DiscussionSettings>) {
        while updates.changed().await.is_ok() {
            let settings = updates.borrow_and_update().clone();
            self.apply_settings(&settings);
        }
    }
}

/// Run/pause state machine wiring members, settings and the scheduler together
pub struct DiscussionControlService {
    inner: Arc<ControlInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl DiscussionControlService {
    /// Create the service and start relaying. Must be called inside a tokio runtime.
    pub fn new(
        scheduler: Arc<SpeakScheduler>,
        settings: Arc<SettingsStore>,
        sender: Arc<dyn MessageSender>,
        typing: Option<Arc<TypingIndicatorStore>>,
    ) -> Self {
        let (event_sender, _) = broadcast::channel(channels::CONTROL_EVENT_CAPACITY);
        let requests = scheduler.subscribe();
        let settings_updates = settings.watch();

        let inner = Arc::new(ControlInner {
            scheduler,
            settings,
            typing,
            sender,
            state: Mutex::new(ControlState::default()),
            in_flight: Mutex::new(HashMap::new()),
            event_sender,
        });
        inner.apply_settings(&inner.settings.get());

        let tasks = vec![
            tokio::spawn(Arc::clone(&inner).relay_loop(requests)),
            tokio::spawn(Arc::clone(&inner).settings_loop(settings_updates)),
        ];

        Self {
            inner,
            tasks: Mutex::new(tasks),
        }
    }

    /// Mirror the external member list and re-evaluate whether to run
    pub fn set_members(&self, members: Vec<DiscussionMember>) {
        let mut state = self.inner.state.lock();
        if state.registry.replace(members) {
            self.inner.scheduler.set_members(state.registry.members());
        }
        self.inner.reconcile(&mut state);
    }

    /// A member joined the discussion (or its record changed)
    pub fn add_member(&self, member: DiscussionMember) {
        let mut state = self.inner.state.lock();
        state.registry.upsert(member);
        self.inner.scheduler.set_members(state.registry.members());
        self.inner.reconcile(&mut state);
    }

    /// A member left the discussion. Returns the removed record.
    pub fn remove_member(&self, member_id: &str) -> Option<DiscussionMember> {
        let mut state = self.inner.state.lock();
        let removed = state.registry.remove(member_id)?;
        self.inner.scheduler.set_members(state.registry.members());
        self.inner.reconcile(&mut state);
        Some(removed)
    }

    pub fn set_auto_reply(&self, member_id: &str, is_auto_reply: bool) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.registry.set_auto_reply(member_id, is_auto_reply)?;
        self.inner.scheduler.set_members(state.registry.members());
        self.inner.reconcile(&mut state);
        Ok(())
    }

    /// Follow the discussion's own status (active runs, anything else pauses)
    pub fn set_discussion_status(&self, status: DiscussionStatus) {
        let mut state = self.inner.state.lock();
        state.discussion_status = status;
        self.inner.reconcile(&mut state);
    }

    /// User-initiated pause/resume, independent of the discussion status.
    /// Resuming after the round limit starts a fresh batch of rounds.
    pub fn handle_status_change(&self, is_active: bool) {
        let mut state = self.inner.state.lock();
        if state.torn_down {
            return;
        }
        if is_active {
            if self.inner.scheduler.round_limit_reached() {
                self.inner.scheduler.reset_rounds();
            }
            self.inner.transition(&mut state, RunState::Running);
        } else {
            self.inner.transition(&mut state, RunState::Paused);
        }
    }

    /// Record a message created outside the scheduler (e.g. a human post or
    /// a manually prompted agent)
    pub fn observe_message(&self, message: &AgentMessage) {
        let is_member = self
            .inner
            .state
            .lock()
            .registry
            .find_by_agent(&message.agent_id)
            .is_some();
        if is_member {
            self.inner.scheduler.record_spoken(&message.agent_id);
        }
        self.inner.scheduler.observe_message(message);
    }

    /// Validate, store and apply new settings
    pub fn update_settings(&self, settings: DiscussionSettings) -> Result<()> {
        self.inner.settings.update(settings.clone())?;
        self.inner.apply_settings(&settings);
        Ok(())
    }

    pub fn settings(&self) -> DiscussionSettings {
        self.inner.settings.get()
    }

    pub fn run_state(&self) -> RunState {
        self.inner.state.lock().run_state
    }

    pub fn is_running(&self) -> bool {
        self.run_state() == RunState::Running
    }

    pub fn members(&self) -> Vec<DiscussionMember> {
        self.inner.state.lock().registry.members().to_vec()
    }

    pub fn message_counter(&self) -> u64 {
        self.inner.scheduler.message_counter()
    }

    /// Requests relayed to the sender that have not settled yet
    pub fn pending_sends(&self) -> usize {
        self.inner.pending_sends()
    }

    pub fn scheduler(&self) -> &Arc<SpeakScheduler> {
        &self.inner.scheduler
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.inner.event_sender.subscribe()
    }

    /// Force the paused state and stop relaying. In-flight sends finish on
    /// their own.
    pub fn teardown(&self) {
        for task in self.tasks.lock().drain(..) {
            task.abort();
        }
        let mut state = self.inner.state.lock();
        if !state.torn_down {
            self.inner.transition(&mut state, RunState::Paused);
            state.torn_down = true;
            debug!("Discussion control torn down");
        }
    }
}

impl Drop for DiscussionControlService {
    fn drop(&mut self) {
        self.teardown();
    }
}
