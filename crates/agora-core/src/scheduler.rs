//! Speak scheduler
//!
//! Decides whose turn it is among the auto-reply members of a discussion and
//! paces requests with a repeating timer. Every tick that finds an eligible
//! member emits exactly one [`SpeakRequest`] and bumps the message counter.
//!
//! Selection is least-recently-spoken, with ties broken by member order. A
//! fresh discussion therefore goes round-robin in join order. With two or more
//! eligible agents the agent named in the previous request is never picked
//! again directly, even if outside messages reshuffled the order meanwhile.

use agora_common::{
    AgentMessage, DiscussionMember, MessageType, SchedulerConfig, SpeakRequest, channels,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
struct Speaker {
    member_id: String,
    agent_id: String,
}

#[derive(Debug, Default)]
struct SchedulerState {
    speakers: Vec<Speaker>,
    /// agent_id -> turn number of its last turn
    last_spoken: HashMap<String, u64>,
    /// Agent named in the most recent request
    last_emitted: Option<String>,
    turn: u64,
    spoken_this_round: HashSet<String>,
    rounds_completed: u32,
    round_limit: Option<u32>,
    reply_to: Option<String>,
    interval: Duration,
}

impl SchedulerState {
    fn select_next(&self) -> Option<&Speaker> {
        let skip = if self.speakers.len() >= 2 {
            self.last_emitted.as_deref()
        } else {
            None
        };
        self.speakers
            .iter()
            .enumerate()
            .filter(|(_, speaker)| Some(speaker.agent_id.as_str()) != skip)
            .min_by_key(|(index, speaker)| {
                let last = self.last_spoken.get(&speaker.agent_id).copied().unwrap_or(0);
                (last, *index)
            })
            .map(|(_, speaker)| speaker)
    }

    fn mark_spoken(&mut self, agent_id: &str) {
        self.turn += 1;
        self.last_spoken.insert(agent_id.to_string(), self.turn);
    }

    fn complete_turn(&mut self, agent_id: &str) {
        self.mark_spoken(agent_id);
        self.last_emitted = Some(agent_id.to_string());
        self.spoken_this_round.insert(agent_id.to_string());

        let everyone_spoke = self
            .speakers
            .iter()
            .all(|s| self.spoken_this_round.contains(&s.agent_id));
        if everyone_spoke {
            self.rounds_completed += 1;
            self.spoken_this_round.clear();
            debug!("Round {} completed", self.rounds_completed);
        }
    }

    fn round_limit_reached(&self) -> bool {
        self.round_limit
            .is_some_and(|limit| self.rounds_completed >= limit)
    }
}

struct SchedulerInner {
    state: Mutex<SchedulerState>,
    request_sender: broadcast::Sender<SpeakRequest>,
    counter: watch::Sender<u64>,
}

impl SchedulerInner {
    /// One timer firing. Selection, counting and emission happen without
    /// yielding, so a pause can never land halfway through.
    fn tick(&self) -> Option<SpeakRequest> {
        let mut state = self.state.lock();

        if state.round_limit_reached() {
            trace!("Round limit reached; skipping tick");
            return None;
        }

        let Some(speaker) = state.select_next().cloned() else {
            trace!("No eligible members; skipping tick");
            return None;
        };

        state.complete_turn(&speaker.agent_id);
        let request = SpeakRequest {
            content: String::new(),
            agent_id: speaker.agent_id,
            member_id: speaker.member_id,
            message_type: MessageType::Text,
            reply_to: state.reply_to.clone(),
        };

        self.counter.send_modify(|count| *count += 1);
        let receivers = self.request_sender.send(request.clone()).unwrap_or(0);
        debug!(
            "Requested message from {} ({} receiver(s))",
            request.agent_id, receivers
        );

        Some(request)
    }
}

/// Picks the next speaker and paces speak requests
pub struct SpeakScheduler {
    inner: Arc<SchedulerInner>,
    timer: Mutex<Option<JoinHandle<()>>>,
    min_interval: Duration,
}

impl SpeakScheduler {
    pub fn new(config: &SchedulerConfig, interval_ms: u64) -> Self {
        let (request_sender, _) = broadcast::channel(channels::SPEAK_REQUEST_CAPACITY);
        let (counter, _) = watch::channel(0);
        let min_interval = Duration::from_millis(config.min_interval_ms.max(1));

        let state = SchedulerState {
            interval: Duration::from_millis(interval_ms).max(min_interval),
            ..Default::default()
        };

        Self {
            inner: Arc::new(SchedulerInner {
                state: Mutex::new(state),
                request_sender,
                counter,
            }),
            timer: Mutex::new(None),
            min_interval,
        }
    }

    /// Replace the member snapshot. Only auto-reply members are kept, and an
    /// agent listed twice keeps its first membership.
    pub fn set_members(&self, members: &[DiscussionMember]) {
        let mut seen = HashSet::new();
        let speakers: Vec<Speaker> = members
            .iter()
            .filter(|m| m.is_auto_reply)
            .filter(|m| seen.insert(m.agent_id.clone()))
            .map(|m| Speaker {
                member_id: m.id.clone(),
                agent_id: m.agent_id.clone(),
            })
            .collect();

        trace!("Scheduler now has {} eligible speaker(s)", speakers.len());
        self.inner.state.lock().speakers = speakers;
    }

    /// Start ticking; does nothing when already running
    pub fn run(&self) {
        let mut timer = self.timer.lock();
        if timer.is_some() {
            return;
        }
        let period = self.inner.state.lock().interval;
        *timer = Some(self.spawn_timer(period));
        info!("Speak scheduler running every {:?}", period);
    }

    /// Stop ticking; safe to call when already paused
    pub fn pause(&self) {
        if let Some(task) = self.timer.lock().take() {
            task.abort();
            info!("Speak scheduler paused");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    fn spawn_timer(&self, period: Duration) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let start = Instant::now() + period;

        tokio::spawn(async move {
            let mut ticker = time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                inner.tick();
            }
        })
    }

    /// Change the pacing interval, restarting a running timer
    pub fn set_interval(&self, interval_ms: u64) {
        let period = Duration::from_millis(interval_ms).max(self.min_interval);
        {
            let mut state = self.inner.state.lock();
            if state.interval == period {
                return;
            }
            state.interval = period;
        }

        let mut timer = self.timer.lock();
        if let Some(task) = timer.take() {
            task.abort();
            *timer = Some(self.spawn_timer(period));
        }
        debug!("Speak interval set to {:?}", period);
    }

    pub fn interval(&self) -> Duration {
        self.inner.state.lock().interval
    }

    /// Stop emitting once this many rounds have completed. `None` or `Some(0)`
    /// means no limit.
    pub fn set_round_limit(&self, limit: Option<u32>) {
        self.inner.state.lock().round_limit = limit.filter(|n| *n > 0);
    }

    pub fn rounds_completed(&self) -> u32 {
        self.inner.state.lock().rounds_completed
    }

    pub fn round_limit_reached(&self) -> bool {
        self.inner.state.lock().round_limit_reached()
    }

    /// Start counting rounds from zero again; the message counter is untouched
    pub fn reset_rounds(&self) {
        let mut state = self.inner.state.lock();
        state.rounds_completed = 0;
        state.spoken_this_round.clear();
    }

    /// Count a message sent outside the scheduler as that agent's turn
    pub fn record_spoken(&self, agent_id: &str) {
        self.inner.state.lock().mark_spoken(agent_id);
    }

    /// Remember the latest message so the next request replies to it
    pub fn observe_message(&self, message: &AgentMessage) {
        self.inner.state.lock().reply_to = Some(message.id.clone());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SpeakRequest> {
        self.inner.request_sender.subscribe()
    }

    pub fn message_counter(&self) -> u64 {
        *self.inner.counter.borrow()
    }

    pub fn watch_counter(&self) -> watch::Receiver<u64> {
        self.inner.counter.subscribe()
    }

    /// Fire one tick immediately, independent of the timer
    pub fn tick_now(&self) -> Option<SpeakRequest> {
        self.inner.tick()
    }
}

impl Drop for SpeakScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.timer.get_mut().take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_common::DiscussionMember;

    fn member(agent_id: &str, is_auto_reply: bool) -> DiscussionMember {
        let mut m = DiscussionMember::new("d1", agent_id, is_auto_reply);
        m.id = format!("member-{}", agent_id);
        m
    }

    fn scheduler(interval_ms: u64) -> SpeakScheduler {
        SpeakScheduler::new(&SchedulerConfig::default(), interval_ms)
    }

    fn drain(rx: &mut broadcast::Receiver<SpeakRequest>) -> Vec<String> {
        let mut agents = Vec::new();
        while let Ok(request) = rx.try_recv() {
            agents.push(request.agent_id);
        }
        agents
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_members_alternate_over_three_ticks() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(3_500)).await;

        assert_eq!(drain(&mut rx), vec!["a", "b", "a"]);
        assert_eq!(scheduler.message_counter(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_double_speak_with_three_members() {
        let scheduler = scheduler(500);
        scheduler.set_members(&[member("a", true), member("b", true), member("c", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(10_250)).await;

        let agents = drain(&mut rx);
        assert_eq!(agents.len(), 20);
        for pair in agents.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(&agents[..6], &["a", "b", "c", "a", "b", "c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_only_auto_reply_members_speak() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", false), member("b", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(2_500)).await;

        assert_eq!(drain(&mut rx), vec!["b", "b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_stops_emission() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(2_500)).await;
        scheduler.pause();
        let count = scheduler.message_counter();

        time::sleep(Duration::from_millis(60_000)).await;
        assert_eq!(drain(&mut rx).len(), 2);
        assert_eq!(scheduler.message_counter(), count);

        scheduler.run();
        time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_and_pause_are_idempotent() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        scheduler.run();
        assert!(scheduler.is_running());
        time::sleep(Duration::from_millis(2_500)).await;
        // A second timer would have doubled the emissions
        assert_eq!(drain(&mut rx).len(), 2);

        scheduler.pause();
        scheduler.pause();
        assert!(!scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_members_never_emit() {
        let scheduler = scheduler(1_000);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(5_500)).await;

        assert!(drain(&mut rx).is_empty());
        assert_eq!(scheduler.message_counter(), 0);
        assert!(scheduler.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_members_reappearing_mid_run() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        time::sleep(Duration::from_millis(1_500)).await;
        scheduler.set_members(&[]);
        time::sleep(Duration::from_millis(3_000)).await;
        assert_eq!(drain(&mut rx), vec!["a"]);

        scheduler.set_members(&[member("b", true)]);
        time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(drain(&mut rx), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_counter_is_monotonic() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        let mut counter = scheduler.watch_counter();

        scheduler.run();
        let mut last = 0;
        for _ in 0..5 {
            counter.changed().await.unwrap();
            let value = *counter.borrow_and_update();
            assert_eq!(value, last + 1);
            last = value;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_floored() {
        let scheduler = scheduler(0);
        assert_eq!(scheduler.interval(), Duration::from_millis(100));

        scheduler.set_members(&[member("a", true)]);
        let mut rx = scheduler.subscribe();
        scheduler.run();
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(drain(&mut rx).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_interval_restarts_running_timer() {
        let scheduler = scheduler(10_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        let mut rx = scheduler.subscribe();

        scheduler.run();
        scheduler.set_interval(1_000);
        assert!(scheduler.is_running());
        time::sleep(Duration::from_millis(2_500)).await;
        assert_eq!(drain(&mut rx).len(), 2);
    }

    #[tokio::test]
    async fn test_round_limit_stops_emission() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);
        scheduler.set_round_limit(Some(2));

        for _ in 0..4 {
            assert!(scheduler.tick_now().is_some());
        }
        assert_eq!(scheduler.rounds_completed(), 2);
        assert!(scheduler.round_limit_reached());
        assert!(scheduler.tick_now().is_none());
        assert_eq!(scheduler.message_counter(), 4);

        scheduler.reset_rounds();
        assert!(scheduler.tick_now().is_some());
    }

    #[tokio::test]
    async fn test_record_spoken_moves_agent_to_back() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true), member("c", true)]);

        scheduler.record_spoken("a");
        let request = scheduler.tick_now().unwrap();
        assert_eq!(request.agent_id, "b");
        assert_eq!(scheduler.message_counter(), 1);
    }

    #[tokio::test]
    async fn test_outside_message_never_repeats_last_requested_agent() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true), member("b", true)]);

        assert_eq!(scheduler.tick_now().unwrap().agent_id, "a");
        scheduler.record_spoken("b");
        assert_eq!(scheduler.tick_now().unwrap().agent_id, "b");
        assert_eq!(scheduler.tick_now().unwrap().agent_id, "a");
    }

    #[tokio::test]
    async fn test_single_speaker_may_repeat() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true)]);

        assert_eq!(scheduler.tick_now().unwrap().agent_id, "a");
        assert_eq!(scheduler.tick_now().unwrap().agent_id, "a");
    }

    #[tokio::test]
    async fn test_reply_to_follows_observed_message() {
        let scheduler = scheduler(1_000);
        scheduler.set_members(&[member("a", true)]);
        assert_eq!(scheduler.tick_now().unwrap().reply_to, None);

        let message = AgentMessage::new("d1", "a", "hello".to_string(), MessageType::Text, None);
        scheduler.observe_message(&message);
        assert_eq!(scheduler.tick_now().unwrap().reply_to, Some(message.id));
    }

    #[tokio::test]
    async fn test_duplicate_agents_collapse() {
        let scheduler = scheduler(1_000);
        let first = member("a", true);
        let mut second = member("a", true);
        second.id = "member-a-2".to_string();
        scheduler.set_members(&[first, second, member("b", true)]);

        let r1 = scheduler.tick_now().unwrap();
        let r2 = scheduler.tick_now().unwrap();
        let r3 = scheduler.tick_now().unwrap();
        assert_eq!(r1.member_id, "member-a");
        assert_eq!(r2.agent_id, "b");
        assert_eq!(r3.member_id, "member-a");
    }
}
