//! Stepwise decides the next action of a task-driven agent.
//!
//! Given a conversation, a declared task, the actions an agent can take and
//! the steps it has already executed, a [`Planner`](planner::Planner) picks
//! exactly one next action with its parameters and a short rationale. The
//! decision is produced by a reasoning [`Oracle`](oracle::Oracle) under a
//! regime-specific prompt contract and then normalized before it is
//! returned.
//!
//! ```rust,ignore
//! use stepwise::prelude::*;
//!
//! let model = OpenAIClient::from_env()?.completion_model("gpt-4o");
//! let planner = Planner::new(LlmOracle::new(model));
//! let request = PlanRequest::new(vec![ConversationTurn::user("buy 1 SOL of BONK")], "buy BONK")
//!     .with_switched_task(true);
//! let decision = planner.plan(&request).await?;
//! ```

pub mod catalog;
pub mod contract;
pub mod error;
pub mod normalize;
pub mod oracle;
pub mod planner;
pub mod prelude;
pub mod providers;
pub mod regime;
pub mod telemetry;
pub mod types;

pub use error::{Error, LlmError, OracleError, Result};
