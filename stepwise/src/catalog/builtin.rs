//! Universal control actions present in every catalog.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::ActionDescriptor;

/// End the task with a closing message.
pub const WRAP_UP: &str = "WRAP_UP";
/// Reply conversationally without acting.
pub const GENERAL_CHAT: &str = "GENERAL_CHAT";
/// Redeclare the task from the user's latest message.
pub const SWITCH_TASK: &str = "SWITCH_TASK";

/// Parameters of [`WRAP_UP`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WrapUpParams {
    /// The message to wrap up the process
    pub message: String,
}

/// Parameters of [`GENERAL_CHAT`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct GeneralChatParams {
    /// The message to reply to the user
    pub message: String,
}

/// Parameters of [`SWITCH_TASK`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SwitchTaskParams {
    /// The new task definition, restated from the user's latest message
    pub task_definition: String,
}

/// The `WRAP_UP` descriptor.
#[must_use]
pub fn wrap_up() -> ActionDescriptor {
    ActionDescriptor::for_params::<WrapUpParams>(
        WRAP_UP,
        "Wrap up the process for previous steps when the user's request is completed \
         or it is unable to be completed",
    )
}

/// The `GENERAL_CHAT` descriptor.
#[must_use]
pub fn general_chat() -> ActionDescriptor {
    ActionDescriptor::for_params::<GeneralChatParams>(
        GENERAL_CHAT,
        "Reply to the user's message. This action is triggered when the user's message \
         is not related to the crypto market.",
    )
}

/// The `SWITCH_TASK` descriptor.
#[must_use]
pub fn switch_task() -> ActionDescriptor {
    ActionDescriptor::for_params::<SwitchTaskParams>(
        SWITCH_TASK,
        "Abandon the current task and declare a new one, when the user's latest message \
         asks for something the current task definition does not cover",
    )
}

/// Control actions for a call, in catalog order.
#[must_use]
pub fn universal_actions(switched_task: bool) -> Vec<ActionDescriptor> {
    let mut actions = vec![wrap_up(), general_chat()];
    if !switched_task {
        actions.push(switch_task());
    }
    actions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_up_schema_requires_message() {
        let schema = wrap_up().parameter_schema;
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"][0], "message");
        assert!(schema["properties"]["message"].is_object());
        assert!(schema.get("$schema").is_none());
    }

    #[test]
    fn test_switch_task_only_before_switch() {
        assert_eq!(universal_actions(true).len(), 2);
        let names: Vec<_> = universal_actions(false).into_iter().map(|a| a.name).collect();
        assert_eq!(names, vec![WRAP_UP, GENERAL_CHAT, SWITCH_TASK]);
    }
}
