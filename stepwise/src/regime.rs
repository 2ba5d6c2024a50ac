//! Planning regime selection.
//!
//! Each request is planned under exactly one [`Regime`]. The choice depends
//! only on `switched_task` and on whether the latest turn is a user message:
//!
//! | `switched_task` | new user message | regime                         |
//! |-----------------|------------------|--------------------------------|
//! | `true`          | any              | [`Regime::FirstStep`]          |
//! | `false`         | `true`           | [`Regime::SwitchOrContinue`]   |
//! | `false`         | `false`          | [`Regime::LoopContinuation`]   |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::PlanRequest;

/// The planning strategy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// The task was just declared: plan its first action, no history to weigh.
    FirstStep,
    /// No new user input: plan strictly from the task and past steps.
    LoopContinuation,
    /// A new user message arrived mid-task: decide whether it still belongs
    /// to the task and what happens to a pending last step.
    SwitchOrContinue,
}

impl Regime {
    /// Select the regime from the two deciding flags.
    #[must_use]
    pub const fn select(switched_task: bool, has_new_user_message: bool) -> Self {
        match (switched_task, has_new_user_message) {
            (true, _) => Self::FirstStep,
            (false, true) => Self::SwitchOrContinue,
            (false, false) => Self::LoopContinuation,
        }
    }

    /// Select the regime for a request.
    #[must_use]
    pub fn for_request(request: &PlanRequest) -> Self {
        Self::select(request.switched_task, request.has_new_user_message())
    }

    /// Whether the regime's contract receives the past-step history.
    #[must_use]
    pub const fn uses_past_steps(&self) -> bool {
        !matches!(self, Self::FirstStep)
    }

    /// Whether the regime's contract receives the latest user message.
    #[must_use]
    pub const fn uses_new_message(&self) -> bool {
        !matches!(self, Self::LoopContinuation)
    }

    /// Snake-case name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstStep => "first_step",
            Self::LoopContinuation => "loop_continuation",
            Self::SwitchOrContinue => "switch_or_continue",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
