// Session module - append-only conversation state

use crate::moonshot::{ChatMessage, Role, ToolCall};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

/// Session errors
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to save session: {0}")]
    SaveFailed(String),

    #[error("Failed to load session: {0}")]
    LoadFailed(String),
}

/// One entry in the dialogue history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Project the turn into its wire message form.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage {
            role: self.role,
            content: self.content.clone(),
            tool_calls: self.tool_calls.clone(),
            tool_call_id: self.tool_call_id.clone(),
        }
    }
}

/// Ordered dialogue history for one chat session.
///
/// Turns are append-only while a dispatch is in flight; `clear` exists for
/// driver-level resets between exchanges (the REPL's `/clear`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    turns: Vec<ConversationTurn>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    /// New session opened with a system prompt.
    pub fn with_system(prompt: impl Into<String>) -> Self {
        let mut session = Self::new();
        session.push(Role::System, Some(prompt.into()), None, None);
        session
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(Role::User, Some(content.into()), None, None);
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.push(Role::Assistant, Some(content.into()), None, None);
    }

    /// Record the tool call the model requested.
    pub fn push_assistant_tool_calls(&mut self, content: Option<String>, calls: Vec<ToolCall>) {
        self.push(Role::Assistant, content, Some(calls), None);
    }

    /// Record a tool result tagged with the originating call id.
    pub fn push_tool(&mut self, tool_call_id: impl Into<String>, content: impl Into<String>) {
        self.push(
            Role::Tool,
            Some(content.into()),
            None,
            Some(tool_call_id.into()),
        );
    }

    fn push(
        &mut self,
        role: Role,
        content: Option<String>,
        tool_calls: Option<Vec<ToolCall>>,
        tool_call_id: Option<String>,
    ) {
        self.turns.push(ConversationTurn {
            role,
            content,
            tool_calls,
            tool_call_id,
            timestamp: Utc::now(),
        });
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Reset the history, keeping the session identity.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Project the full ordered history into wire messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.turns.iter().map(|t| t.to_message()).collect()
    }

    /// Persist the transcript as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| SessionError::SaveFailed(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| SessionError::SaveFailed(e.to_string()))?;
        fs::write(path, content).map_err(|e| SessionError::SaveFailed(e.to_string()))?;

        info!(path = %path.display(), turns = self.turns.len(), "session saved");
        Ok(())
    }

    /// Load a previously saved transcript.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content =
            fs::read_to_string(path).map_err(|e| SessionError::LoadFailed(e.to_string()))?;
        let session: Session =
            serde_json::from_str(&content).map_err(|e| SessionError::LoadFailed(e.to_string()))?;

        debug!(path = %path.display(), turns = session.turns.len(), "session loaded");
        Ok(session)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
