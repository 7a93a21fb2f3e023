//! Agent personas that can join a discussion

use agora_common::{AgoraError, Result};
use serde::{Deserialize, Serialize};

/// A configured AI persona
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersona {
    pub id: String,
    pub name: String,
    pub role: String,
    /// Short description of how the persona argues
    pub personality: String,
    /// System prompt handed to the model
    pub prompt: String,
    /// Role tag only; the scheduler treats moderators like everyone else
    #[serde(default)]
    pub is_moderator: bool,
}

impl AgentPersona {
    fn builtin(id: &str, name: &str, role: &str, personality: &str, prompt: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            personality: personality.to_string(),
            prompt: prompt.to_string(),
            is_moderator: false,
        }
    }
}

/// Lookup table of personas available to a discussion
#[derive(Debug, Clone, Default)]
pub struct PersonaCatalog {
    personas: Vec<AgentPersona>,
}

impl PersonaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The personas shipped with Agora
    pub fn builtin() -> Self {
        let mut moderator = AgentPersona::builtin(
            "moderator",
            "Chair",
            "moderator",
            "Keeps the discussion on topic and summarises progress",
            "You are Chair, the moderator of a panel discussion. Keep speakers on the agreed topics, \
             summarise points of agreement and disagreement, and invite quieter voices in.",
        );
        moderator.is_moderator = true;

        Self {
            personas: vec![
                moderator,
                AgentPersona::builtin(
                    "skeptic",
                    "Quinn",
                    "critic",
                    "Questions assumptions and asks for evidence",
                    "You are Quinn, a careful skeptic. Probe every claim for evidence, point out \
                     hidden assumptions, and concede only when the argument holds up.",
                ),
                AgentPersona::builtin(
                    "optimist",
                    "Sunny",
                    "advocate",
                    "Looks for opportunities and builds on ideas",
                    "You are Sunny, an optimist. Look for what could go right, build on other \
                     speakers' ideas, and propose concrete next steps.",
                ),
                AgentPersona::builtin(
                    "historian",
                    "Clio",
                    "historian",
                    "Brings precedent and historical context",
                    "You are Clio, a historian. Relate the topic to historical precedent and \
                     explain what earlier attempts teach us.",
                ),
                AgentPersona::builtin(
                    "engineer",
                    "Ada",
                    "engineer",
                    "Focuses on feasibility, cost and trade-offs",
                    "You are Ada, a pragmatic engineer. Assess feasibility, estimate effort and \
                     spell out the trade-offs of each proposal.",
                ),
            ],
        }
    }

    /// Add a persona; ids must be unique
    pub fn insert(&mut self, persona: AgentPersona) -> Result<()> {
        if self.get(&persona.id).is_some() {
            return Err(AgoraError::Agent(format!(
                "Persona {} already exists",
                persona.id
            )));
        }
        self.personas.push(persona);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&AgentPersona> {
        self.personas.iter().find(|p| p.id == id)
    }

    pub fn list(&self) -> &[AgentPersona] {
        &self.personas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_has_one_moderator() {
        let catalog = PersonaCatalog::builtin();
        assert_eq!(catalog.list().len(), 5);
        let moderators: Vec<_> = catalog.list().iter().filter(|p| p.is_moderator).collect();
        assert_eq!(moderators.len(), 1);
        assert_eq!(moderators[0].id, "moderator");
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut catalog = PersonaCatalog::builtin();
        let duplicate = catalog.get("skeptic").cloned().unwrap();
        assert!(catalog.insert(duplicate).is_err());

        let mut custom = catalog.get("engineer").cloned().unwrap();
        custom.id = "architect".to_string();
        catalog.insert(custom).unwrap();
        assert!(catalog.get("architect").is_some());
    }
}
