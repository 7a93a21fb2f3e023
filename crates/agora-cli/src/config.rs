//! Discussion files
//!
//! A discussion is described in TOML:
//!
//! ```toml
//! topic = "Should the city close the old bridge to cars?"
//!
//! [[members]]
//! persona = "moderator"
//!
//! [[members]]
//! persona = "skeptic"
//! auto_reply = true
//!
//! [settings]
//! interval = 1500
//! max_rounds = 3
//! ```

use agora_common::{
    BaseConfig, DiscussionConfig, DiscussionMember, DiscussionSettings, SchedulerConfig,
    TypingConfig,
};
use agora_core::{AgentPersona, PersonaCatalog, validate_settings};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    /// Persona id, built-in or declared under `[[personas]]`
    pub persona: String,
    #[serde(default = "default_auto_reply")]
    pub auto_reply: bool,
}

fn default_auto_reply() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussionFile {
    pub topic: String,
    #[serde(default)]
    pub discussion_id: Option<String>,
    #[serde(flatten)]
    pub base: BaseConfig,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
    #[serde(default)]
    pub personas: Vec<AgentPersona>,
    #[serde(default)]
    pub settings: DiscussionSettings,
    #[serde(default)]
    pub typing: TypingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl DiscussionFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read discussion file {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("Invalid discussion file {}", path.display()))
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let file: DiscussionFile = toml::from_str(raw)?;
        Ok(file)
    }

    /// Built-in personas plus any declared in the file
    pub fn catalog(&self) -> Result<PersonaCatalog> {
        let mut catalog = PersonaCatalog::builtin();
        for persona in &self.personas {
            catalog.insert(persona.clone())?;
        }
        Ok(catalog)
    }

    pub fn validate(&self, catalog: &PersonaCatalog) -> Result<()> {
        if self.topic.trim().is_empty() {
            bail!("topic must not be empty");
        }
        if self.members.is_empty() {
            bail!("a discussion needs at least one member");
        }

        let mut seen = HashSet::new();
        for entry in &self.members {
            if catalog.get(&entry.persona).is_none() {
                bail!("unknown persona '{}'", entry.persona);
            }
            if !seen.insert(entry.persona.as_str()) {
                bail!("persona '{}' joins the discussion twice", entry.persona);
            }
        }

        validate_settings(&self.settings)?;
        Ok(())
    }

    pub fn discussion_id(&self) -> String {
        self.discussion_id
            .clone()
            .unwrap_or_else(|| "cli-discussion".to_string())
    }

    pub fn discussion_config(&self) -> DiscussionConfig {
        DiscussionConfig {
            discussion_id: self.discussion_id(),
            settings: self.settings.clone(),
            typing: self.typing.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    pub fn members(&self) -> Vec<DiscussionMember> {
        let discussion_id = self.discussion_id();
        self.members
            .iter()
            .map(|entry| DiscussionMember::new(&discussion_id, &entry.persona, entry.auto_reply))
            .collect()
    }
}
