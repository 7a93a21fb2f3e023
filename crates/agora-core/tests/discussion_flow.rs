use agora_common::{
    AgentMessage, DiscussionConfig, DiscussionMember, DiscussionStatus, MessageType, Result,
    SpeakRequest,
};
use agora_core::{ControlEvent, DiscussionContext, MessageSender, parse_actions};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;

/// Stores every message it produces, like the chat's message list would
#[derive(Default)]
struct TranscriptSender {
    transcript: Mutex<Vec<AgentMessage>>,
}

#[async_trait]
impl MessageSender for TranscriptSender {
    async fn send_message(&self, request: SpeakRequest) -> Result<Option<AgentMessage>> {
        let turn = self.transcript.lock().len() + 1;
        let content = format!(
            "Turn {} from {}.\n\n```action\n{{\"type\": \"react\", \"emoji\": \"+1\"}}\n```",
            turn, request.agent_id
        );
        let message = AgentMessage::new(
            "panel",
            &request.agent_id,
            content,
            MessageType::Text,
            request.reply_to,
        );
        self.transcript.lock().push(message.clone());
        Ok(Some(message))
    }
}

fn member(agent_id: &str, is_auto_reply: bool) -> DiscussionMember {
    let mut m = DiscussionMember::new("panel", agent_id, is_auto_reply);
    m.id = format!("member-{}", agent_id);
    m
}

fn config(interval: u64, max_rounds: u32) -> DiscussionConfig {
    let mut config = DiscussionConfig::new("panel");
    config.settings.interval = interval;
    config.settings.max_rounds = max_rounds;
    config
}

#[tokio::test(start_paused = true)]
async fn two_agents_alternate_and_thread_replies() {
    let sender = Arc::new(TranscriptSender::default());
    let context = DiscussionContext::new(config(1_000, 0), sender.clone()).unwrap();
    let control = context.control();

    control.set_members(vec![member("a", true), member("b", true)]);
    control.set_discussion_status(DiscussionStatus::Active);
    time::sleep(Duration::from_millis(3_500)).await;

    let transcript = sender.transcript.lock().clone();
    let speakers: Vec<_> = transcript.iter().map(|m| m.agent_id.as_str()).collect();
    assert_eq!(speakers, vec!["a", "b", "a"]);
    assert_eq!(control.message_counter(), 3);

    // Each reply points at the message before it
    assert_eq!(transcript[0].reply_to, None);
    assert_eq!(transcript[1].reply_to.as_deref(), Some(transcript[0].id.as_str()));
    assert_eq!(transcript[2].reply_to.as_deref(), Some(transcript[1].id.as_str()));

    let parsed = parse_actions(&transcript[2].content);
    assert_eq!(parsed.text, "Turn 3 from a.");
    assert_eq!(parsed.actions[0].kind, "react");

    context.shutdown();
}

#[tokio::test(start_paused = true)]
async fn round_limit_ends_the_discussion() {
    let sender = Arc::new(TranscriptSender::default());
    let context = DiscussionContext::new(config(500, 3), sender.clone()).unwrap();
    let mut events = context.control().subscribe();

    context.control().set_members(vec![
        member("a", true),
        member("b", true),
        member("human", false),
        member("c", true),
    ]);
    context
        .control()
        .set_discussion_status(DiscussionStatus::Active);

    time::sleep(Duration::from_millis(30_000)).await;

    assert_eq!(sender.transcript.lock().len(), 9);
    assert!(!context.control().is_running());
    assert!(
        sender
            .transcript
            .lock()
            .iter()
            .all(|m| m.agent_id != "human")
    );

    let mut saw_limit = false;
    while let Ok(event) = events.try_recv() {
        if matches!(event, ControlEvent::RoundLimitReached { rounds: 3 }) {
            saw_limit = true;
        }
    }
    assert!(saw_limit);
}

#[tokio::test(start_paused = true)]
async fn live_settings_change_repaces_the_discussion() {
    let sender = Arc::new(TranscriptSender::default());
    let context = DiscussionContext::new(config(10_000, 0), sender.clone()).unwrap();

    context.control().set_members(vec![member("a", true), member("b", true)]);
    context
        .control()
        .set_discussion_status(DiscussionStatus::Active);

    // Updating through the shared store reaches the running scheduler too
    context.settings().modify(|s| s.interval = 1_000).unwrap();
    time::sleep(Duration::from_millis(4_500)).await;

    assert_eq!(sender.transcript.lock().len(), 4);
}
