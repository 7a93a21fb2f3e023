//! Offline message collaborator for the CLI
//!
//! Composes persona-flavoured replies from templates instead of calling a
//! model, with a short random delay to stand in for generation time.

use agora_common::{
    AgentMessage, AgoraError, DiscussionSettings, MessageType, ModerationStyle, Result,
    SpeakRequest,
};
use agora_core::{AgentPersona, MessageSender, PersonaCatalog};
use async_trait::async_trait;
use rand::Rng;
use rand::seq::SliceRandom;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

const MODERATOR_LINES: &[&str] = &[
    "Let's keep our focus on {focus}. Who can add something concrete about {topic}?",
    "Good points so far. Before we move on, how does {focus} change the picture on {topic}?",
    "I'd like to hear a different angle on {topic}, particularly around {focus}.",
];

const CRITIC_LINES: &[&str] = &[
    "I'm not convinced. What evidence do we actually have that {topic} works as promised?",
    "That argument assumes a lot about {focus}. What happens if that assumption fails?",
    "Before we agree, who pays the cost of {topic} and have we asked them?",
];

const GENTLE_CRITIC_LINES: &[&str] = &[
    "I see the appeal, though I'd like more data on {focus} before committing to {topic}.",
    "Could we test {topic} on a small scale first and look at {focus}?",
];

const GENERAL_LINES: &[&str] = &[
    "Building on that: {topic} could work if we get {focus} right from the start.",
    "From my side, the key question about {topic} is how it affects {focus}.",
    "There's precedent worth noting here: similar efforts on {focus} taught us a lot.",
    "If we break {topic} into steps, {focus} is where I'd start.",
];

pub struct ScriptedSender {
    catalog: PersonaCatalog,
    topic: String,
    discussion_id: String,
    settings: DiscussionSettings,
    turns: AtomicU64,
}

impl ScriptedSender {
    pub fn new(
        catalog: PersonaCatalog,
        topic: String,
        discussion_id: String,
        settings: DiscussionSettings,
    ) -> Self {
        Self {
            catalog,
            topic,
            discussion_id,
            settings,
            turns: AtomicU64::new(0),
        }
    }

    fn lines_for(&self, persona: &AgentPersona) -> &'static [&'static str] {
        if persona.is_moderator {
            MODERATOR_LINES
        } else if persona.role == "critic" && !self.settings.allow_conflict {
            GENTLE_CRITIC_LINES
        } else if persona.role == "critic" {
            CRITIC_LINES
        } else {
            GENERAL_LINES
        }
    }

    fn focus(&self, turn: u64) -> &str {
        let topics = &self.settings.focus_topics;
        if topics.is_empty() {
            "the details"
        } else {
            &topics[(turn as usize) % topics.len()]
        }
    }

    /// Low temperatures always pick the first template
    fn compose(&self, persona: &AgentPersona, turn: u64) -> String {
        let lines = self.lines_for(persona);
        let template = if self.settings.temperature < 0.3 {
            lines[0]
        } else {
            lines.choose(&mut rand::thread_rng()).copied().unwrap_or(lines[0])
        };

        let mut content = template
            .replace("{topic}", &self.topic)
            .replace("{focus}", self.focus(turn));

        if persona.is_moderator && self.settings.moderation_style == ModerationStyle::Strict {
            content.push_str(&format!(
                "\n\n```action\n{{\"type\": \"summarize\", \"turn\": {}}}\n```",
                turn
            ));
        }
        content
    }

    fn think_time(&self) -> Duration {
        let ceiling = (self.settings.interval / 2).max(20);
        Duration::from_millis(rand::thread_rng().gen_range(10..=ceiling))
    }
}

#[async_trait]
impl MessageSender for ScriptedSender {
    async fn send_message(&self, request: SpeakRequest) -> Result<Option<AgentMessage>> {
        let persona = self.catalog.get(&request.agent_id).ok_or_else(|| {
            AgoraError::Agent(format!("No persona for agent {}", request.agent_id))
        })?;
        let turn = self.turns.fetch_add(1, Ordering::SeqCst) + 1;

        let delay = self.think_time();
        debug!("{} thinking for {:?}", persona.name, delay);
        tokio::time::sleep(delay).await;

        let content = if request.content.is_empty() {
            self.compose(persona, turn)
        } else {
            request.content
        };

        Ok(Some(AgentMessage::new(
            &self.discussion_id,
            &request.agent_id,
            content,
            request.message_type,
            request.reply_to,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_core::parse_actions;

    fn sender(settings: DiscussionSettings) -> ScriptedSender {
        ScriptedSender::new(
            PersonaCatalog::builtin(),
            "night buses".to_string(),
            "d1".to_string(),
            settings,
        )
    }

    fn request(agent_id: &str) -> SpeakRequest {
        SpeakRequest {
            content: String::new(),
            agent_id: agent_id.to_string(),
            member_id: format!("member-{}", agent_id),
            message_type: MessageType::Text,
            reply_to: Some("previous".to_string()),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_reply_mentions_topic_and_keeps_thread() {
        let settings = DiscussionSettings {
            temperature: 0.0,
            focus_topics: vec!["safety".to_string()],
            ..Default::default()
        };
        let message = sender(settings)
            .send_message(request("skeptic"))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(message.agent_id, "skeptic");
        assert_eq!(message.reply_to.as_deref(), Some("previous"));
        assert!(message.content.contains("night buses"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_strict_moderator_attaches_summary_action() {
        let settings = DiscussionSettings {
            moderation_style: ModerationStyle::Strict,
            ..Default::default()
        };
        let message = sender(settings)
            .send_message(request("moderator"))
            .await
            .unwrap()
            .unwrap();

        let parsed = parse_actions(&message.content);
        assert_eq!(parsed.actions.len(), 1);
        assert_eq!(parsed.actions[0].kind, "summarize");
        assert_eq!(parsed.actions[0].params["turn"], 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_agent_is_an_error() {
        let result = sender(DiscussionSettings::default())
            .send_message(request("stranger"))
            .await;
        assert!(matches!(result, Err(AgoraError::Agent(_))));
    }
}
