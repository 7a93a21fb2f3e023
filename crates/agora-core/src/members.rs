//! Registry mirroring the participants of a discussion

use agora_common::{AgoraError, DiscussionMember, Result};
use tracing::debug;

/// Current set of discussion members, in join order
#[derive(Debug, Clone, Default)]
pub struct MemberRegistry {
    members: Vec<DiscussionMember>,
}

impl MemberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole member list. Returns whether anything changed.
    pub fn replace(&mut self, members: Vec<DiscussionMember>) -> bool {
        if self.members == members {
            return false;
        }
        debug!("Member list updated: {} member(s)", members.len());
        self.members = members;
        true
    }

    /// Insert a member or overwrite the record with the same id
    pub fn upsert(&mut self, member: DiscussionMember) {
        match self.members.iter_mut().find(|m| m.id == member.id) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
    }

    pub fn remove(&mut self, member_id: &str) -> Option<DiscussionMember> {
        let index = self.members.iter().position(|m| m.id == member_id)?;
        Some(self.members.remove(index))
    }

    /// Toggle whether the scheduler may speak for a member
    pub fn set_auto_reply(&mut self, member_id: &str, is_auto_reply: bool) -> Result<()> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.id == member_id)
            .ok_or_else(|| AgoraError::Agent(format!("Member {} not found", member_id)))?;
        member.is_auto_reply = is_auto_reply;
        Ok(())
    }

    pub fn find_by_agent(&self, agent_id: &str) -> Option<&DiscussionMember> {
        self.members.iter().find(|m| m.agent_id == agent_id)
    }

    pub fn members(&self) -> &[DiscussionMember] {
        &self.members
    }

    pub fn has_auto_reply(&self) -> bool {
        self.members.iter().any(|m| m.is_auto_reply)
    }
}
