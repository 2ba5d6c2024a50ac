//! Request-scoped data model.
//!
//! Everything here is built fresh from caller data for a single planning
//! request and never outlives it. Only [`Decision`] is assembled in steps
//! (by the [normalizer](crate::normalize)) before it is returned.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::catalog::ActionDescriptor;

/// Author of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user.
    User,
    /// The assistant (this service or the agent runtime calling it).
    Assistant,
}

impl Role {
    /// Lowercase wire name of the role.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A media attachment carried by a conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    /// Attachment identifier.
    pub id: String,
    /// Where the attachment can be fetched.
    pub url: String,
    /// Display title.
    pub title: String,
    /// Origin of the attachment (upload, web, ...).
    pub source: String,
    /// Short description.
    pub description: String,
    /// Extracted text content.
    pub text: String,
    /// MIME type, when known.
    #[serde(
        rename = "contentType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
}

impl Media {
    /// Create an attachment that only carries an id and a URL.
    #[must_use]
    pub fn from_url(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            title: String::new(),
            source: String::new(),
            description: String::new(),
            text: String::new(),
            content_type: None,
        }
    }
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Who wrote the message.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// Attachments in the order they were sent.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Media>,
}

impl ConversationTurn {
    /// Create a user turn.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    /// Create an assistant turn.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    /// Attach a media item.
    #[must_use]
    pub fn with_attachment(mut self, media: Media) -> Self {
        self.attachments.push(media);
        self
    }

    /// Whether the turn was written by the user.
    #[must_use]
    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// URL of the first attachment, if any.
    #[must_use]
    pub fn first_attachment_url(&self) -> Option<&str> {
        self.attachments.first().map(|m| m.url.as_str())
    }
}

/// One previously executed action and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Name of the executed action.
    pub action: String,
    /// What the step was asked to do.
    pub detail: String,
    /// What happened.
    pub result: String,
}

impl StepRecord {
    /// Create a step record.
    #[must_use]
    pub fn new(
        action: impl Into<String>,
        detail: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            action: action.into(),
            detail: detail.into(),
            result: result.into(),
        }
    }
}

/// Blockchain the assistant operates on.
///
/// Only changes the background framing of contracts, never the decision
/// logic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Solana mainnet.
    #[default]
    Solana,
    /// BNB Smart Chain.
    Bsc,
}

impl Chain {
    /// Lowercase wire name of the chain.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Solana => "solana",
            Self::Bsc => "bsc",
        }
    }

    /// Resolve an optional caller-supplied selector.
    ///
    /// Absent selectors resolve to `default`; unknown ones also resolve to
    /// `default`, with a warning.
    #[must_use]
    pub fn resolve(selector: Option<&str>, default: Self) -> Self {
        match selector {
            None => default,
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                warn!(chain = raw, fallback = %default, "unknown chain selector");
                default
            }),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "solana" | "sol" => Ok(Self::Solana),
            "bsc" | "bnb" => Ok(Self::Bsc),
            other => Err(format!("unknown chain '{other}'")),
        }
    }
}

/// The standing goal of the current planning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskState {
    /// Natural-language task definition.
    pub task_definition: String,
    /// Set by the caller; see [`Regime::select`](crate::regime::Regime::select).
    pub switched_task: bool,
    /// Chain whose background framing is used.
    pub chain: Chain,
}

/// The unit of output: what to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Canonical action name, always a member of the offered catalog.
    pub action: String,
    /// Parameters for the action.
    pub parameters: Map<String, Value>,
    /// Short natural-language rationale.
    pub explanation: String,
}

/// A planning request as received at the service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    /// Ordered conversation, oldest first.
    pub chat_history: Vec<ConversationTurn>,
    /// The declared task.
    pub task_definition: String,
    /// Caller-declared domain actions. `None` selects the default domain
    /// toolkit; `null` entries are discarded.
    #[serde(default, alias = "available_actions")]
    pub actions: Option<Vec<Option<ActionDescriptor>>>,
    /// Previously executed steps, oldest first.
    #[serde(default)]
    pub past_steps: Vec<StepRecord>,
    /// See [`TaskState::switched_task`].
    #[serde(default)]
    pub switched_task: bool,
    /// Optional chain selector (`solana` | `bsc`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

impl PlanRequest {
    /// Create a request with an empty step history and default actions.
    #[must_use]
    pub fn new(chat_history: Vec<ConversationTurn>, task_definition: impl Into<String>) -> Self {
        Self {
            chat_history,
            task_definition: task_definition.into(),
            actions: None,
            past_steps: Vec::new(),
            switched_task: false,
            chain: None,
        }
    }

    /// Set the caller-declared actions.
    #[must_use]
    pub fn with_actions(mut self, actions: Vec<Option<ActionDescriptor>>) -> Self {
        self.actions = Some(actions);
        self
    }

    /// Set the past steps.
    #[must_use]
    pub fn with_past_steps(mut self, steps: Vec<StepRecord>) -> Self {
        self.past_steps = steps;
        self
    }

    /// Set the switched-task flag.
    #[must_use]
    pub const fn with_switched_task(mut self, switched: bool) -> Self {
        self.switched_task = switched;
        self
    }

    /// Set the chain selector.
    #[must_use]
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    /// True iff the most recent turn was written by the user.
    #[must_use]
    pub fn has_new_user_message(&self) -> bool {
        self.chat_history.last().is_some_and(ConversationTurn::is_user)
    }

    /// Task state derived from the request.
    #[must_use]
    pub fn task_state(&self, default_chain: Chain) -> TaskState {
        TaskState {
            task_definition: self.task_definition.clone(),
            switched_task: self.switched_task,
            chain: Chain::resolve(self.chain.as_deref(), default_chain),
        }
    }
}

/// Request for a list of high-level instructions.
///
/// The latest turn is the user prompt; earlier turns are the history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstructionRequest {
    /// Ordered conversation, oldest first. Must not be empty.
    pub chat_history: Vec<ConversationTurn>,
    /// Caller-declared domain actions, default toolkit when absent.
    #[serde(default, alias = "available_actions")]
    pub actions: Option<Vec<Option<ActionDescriptor>>>,
    /// Optional chain selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

/// Ordered high-level instructions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionPlan {
    /// Instructions in execution order.
    pub instruction_list: Vec<String>,
}

/// Request to pick the action for one step of an existing plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRequest {
    /// Ordered conversation, oldest first. Must not be empty.
    pub chat_history: Vec<ConversationTurn>,
    /// The plan, one instruction per entry.
    pub plan: Vec<String>,
    /// The plan entry to act on now.
    pub current_step: String,
    /// Caller-declared domain actions, default toolkit when absent.
    #[serde(default, alias = "available_actions")]
    pub actions: Option<Vec<Option<ActionDescriptor>>>,
    /// Optional chain selector.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
}

/// Action chosen for one plan step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepAction {
    /// Canonical action name.
    pub action: String,
    /// Parameters for the action.
    pub parameters: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_has_new_user_message() {
        let mut request = PlanRequest::new(
            vec![ConversationTurn::user("hi"), ConversationTurn::assistant("hello")],
            "greet",
        );
        assert!(!request.has_new_user_message());

        request.chat_history.push(ConversationTurn::user("buy SOL"));
        assert!(request.has_new_user_message());

        request.chat_history.clear();
        assert!(!request.has_new_user_message());
    }

    #[test]
    fn test_chain_resolve() {
        assert_eq!(Chain::resolve(None, Chain::Solana), Chain::Solana);
        assert_eq!(Chain::resolve(Some("BSC"), Chain::Solana), Chain::Bsc);
        assert_eq!(Chain::resolve(Some(" solana "), Chain::Bsc), Chain::Solana);
        assert_eq!(Chain::resolve(Some("ethereum"), Chain::Solana), Chain::Solana);
    }

    #[test]
    fn test_plan_request_deserialize_defaults() {
        let request: PlanRequest = serde_json::from_value(json!({
            "chat_history": [{"role": "user", "content": "buy 1 SOL of BONK"}],
            "task_definition": "buy BONK"
        }))
        .unwrap();

        assert!(request.actions.is_none());
        assert!(request.past_steps.is_empty());
        assert!(!request.switched_task);
        assert!(request.chain.is_none());
        assert!(request.chat_history[0].attachments.is_empty());
    }

    #[test]
    fn test_plan_request_keeps_null_actions() {
        let request: PlanRequest = serde_json::from_value(json!({
            "chat_history": [],
            "task_definition": "t",
            "actions": [null, {"name": "SWAP_TOKEN", "description": "swap", "parameter_schema": {}}]
        }))
        .unwrap();

        let actions = request.actions.unwrap();
        assert_eq!(actions.len(), 2);
        assert!(actions[0].is_none());
    }

    #[test]
    fn test_media_content_type_rename() {
        let turn: ConversationTurn = serde_json::from_value(json!({
            "role": "user",
            "content": "logo",
            "attachments": [{
                "id": "1", "url": "https://img/1.png", "title": "", "source": "",
                "description": "", "text": "", "contentType": "image/png"
            }]
        }))
        .unwrap();

        assert_eq!(turn.first_attachment_url(), Some("https://img/1.png"));
        assert_eq!(turn.attachments[0].content_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_step_request_shape() {
        let request: StepRequest = serde_json::from_value(json!({
            "chat_history": [{"role": "user", "content": "swap then send"}],
            "plan": ["swap 1 SOL to USDC", "send USDC to alice"],
            "current_step": "swap 1 SOL to USDC"
        }))
        .unwrap();
        assert_eq!(request.plan.len(), 2);
        assert!(request.actions.is_none());
    }

    #[test]
    fn test_unknown_role_rejected() {
        let err = serde_json::from_value::<ConversationTurn>(json!({
            "role": "system",
            "content": "x"
        }));
        assert!(err.is_err());
    }
}
