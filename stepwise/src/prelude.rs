//! Commonly used types, for glob import.

pub use crate::catalog::{ActionCatalog, ActionDescriptor};
pub use crate::contract::{ContractId, ContractSpec, render_contract};
pub use crate::error::{Error, LlmError, OracleError, Result};
pub use crate::oracle::{LlmOracle, Oracle, StaticOracle};
pub use crate::planner::{Planner, PlannerConfig};
pub use crate::providers::{FromEnv, MockModel, Model, OpenAIClient};
pub use crate::regime::Regime;
pub use crate::types::{
    Chain, ConversationTurn, Decision, InstructionPlan, InstructionRequest, Media, PlanRequest,
    Role, StepAction, StepRecord, StepRequest,
};
