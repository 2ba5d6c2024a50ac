//! The orchestration driver.
//!
//! [`Planner`] runs one planning request end to end:
//!
//! ```text
//! PlanRequest
//!   -> ActionCatalog::build          (domain actions + control actions)
//!   -> Regime::for_request           (first step | loop | switch-or-continue)
//!   -> render_contract + inputs      (regime-specific fields)
//!   -> Oracle::invoke                (bounded by the oracle timeout)
//!   -> DecisionNormalizer::normalize (quotes, aliases, decimals, catalog)
//!   -> Decision
//! ```
//!
//! At most one oracle call is made per request and it is never retried.
//! The planner holds no per-request state, so one instance serves
//! concurrent requests.

pub mod history;

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{Instrument, debug, info, warn};

use crate::catalog::{ActionCatalog, ActionDescriptor, SWITCH_TASK, domain};
use crate::contract::{
    ContractId, ContractInputs, ContractOutput, ContractSpec, fields, render_contract,
};
use crate::error::{Error, OracleError, Result};
use crate::normalize::{DecisionNormalizer, normalize_parameters};
use crate::oracle::Oracle;
use crate::regime::Regime;
use crate::telemetry::PlanTelemetry;
use crate::types::{
    Chain, ConversationTurn, Decision, InstructionPlan, InstructionRequest, PlanRequest,
    StepAction, StepRequest, TaskState,
};

/// Default bound on a single oracle call.
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Planner configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Bound on a single oracle call; expiry is an oracle failure.
    pub oracle_timeout: Duration,
    /// Chain used when a request carries no valid selector.
    pub default_chain: Chain,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            oracle_timeout: DEFAULT_ORACLE_TIMEOUT,
            default_chain: Chain::default(),
        }
    }
}

impl PlannerConfig {
    /// Set the oracle timeout.
    #[must_use]
    pub const fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Set the default chain.
    #[must_use]
    pub const fn with_default_chain(mut self, chain: Chain) -> Self {
        self.default_chain = chain;
        self
    }
}

/// Plans the next action of an agent over an [`Oracle`].
#[derive(Debug, Clone)]
pub struct Planner<O> {
    oracle: O,
    config: PlannerConfig,
}

impl<O: Oracle> Planner<O> {
    /// Create a planner with the default configuration.
    #[must_use]
    pub fn new(oracle: O) -> Self {
        Self::with_config(oracle, PlannerConfig::default())
    }

    /// Create a planner with an explicit configuration.
    #[must_use]
    pub const fn with_config(oracle: O, config: PlannerConfig) -> Self {
        Self { oracle, config }
    }

    /// The planner configuration.
    #[must_use]
    pub const fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// The backing oracle.
    #[must_use]
    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    /// Decide the next action for a request.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidRequest`] for a blank task definition.
    /// - [`Error::Oracle`] when the oracle fails, times out or answers
    ///   outside the contract.
    /// - [`Error::CatalogViolation`] when the chosen action was not offered.
    /// - [`Error::Normalization`] when a parameter cannot be rendered.
    pub async fn plan(&self, request: &PlanRequest) -> Result<Decision> {
        let mut telemetry = PlanTelemetry::new();
        let result = self
            .plan_inner(request, &mut telemetry)
            .instrument(PlanTelemetry::request_span("plan"))
            .await;
        finish(&mut telemetry, &result, |d| d.action.as_str());
        result
    }

    async fn plan_inner(
        &self,
        request: &PlanRequest,
        telemetry: &mut PlanTelemetry,
    ) -> Result<Decision> {
        if request.task_definition.trim().is_empty() {
            return Err(Error::invalid_request("task_definition must not be empty"));
        }

        let state = request.task_state(self.config.default_chain);
        let regime = Regime::for_request(request);
        telemetry.record_regime(regime);

        let mut catalog = catalog_for(request.actions.as_deref(), state.switched_task);
        // No new user message means nothing to switch to.
        if regime == Regime::LoopContinuation {
            catalog = catalog.without(SWITCH_TASK);
        }
        telemetry.record_catalog(catalog.len());

        let contract = render_contract(regime.into(), state.chain);
        let inputs = assemble_inputs(regime, request, &state, &catalog)?;
        let output = self.invoke(&contract, &inputs, telemetry).await?;

        if regime == Regime::SwitchOrContinue {
            info!(
                same_task = output.text(fields::SAME_TASK).unwrap_or_default(),
                pending_step = output.text(fields::PENDING_STEP).unwrap_or_default(),
                task_status = output.text(fields::TASK_STATUS).unwrap_or_default(),
                "switch_or_continue judgments"
            );
        }

        let raw = Decision {
            action: required_text(&output, fields::ACTION)?,
            parameters: required_mapping(&output, fields::PARAMETERS)?,
            explanation: required_text(&output, fields::EXPLANATION)?,
        };
        let decision = DecisionNormalizer::new(&catalog).normalize(raw)?;

        if regime.uses_past_steps()
            && let Some(last) = request.past_steps.last()
            && last.action == decision.action
            && !history::looks_pending(last)
        {
            warn!(
                action = %decision.action,
                "decision repeats a last step that does not look pending"
            );
        }

        Ok(decision)
    }

    /// Break the latest user prompt into high-level instructions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty chat history and
    /// [`Error::Oracle`] when the oracle fails.
    pub async fn plan_instructions(
        &self,
        request: &InstructionRequest,
    ) -> Result<InstructionPlan> {
        let mut telemetry = PlanTelemetry::new();
        let result = self
            .plan_instructions_inner(request, &mut telemetry)
            .instrument(PlanTelemetry::request_span("plan_instructions"))
            .await;
        finish(&mut telemetry, &result, |_| "instruction_list");
        result
    }

    async fn plan_instructions_inner(
        &self,
        request: &InstructionRequest,
        telemetry: &mut PlanTelemetry,
    ) -> Result<InstructionPlan> {
        let (prompt, earlier) = split_prompt(&request.chat_history)?;
        let chain = Chain::resolve(request.chain.as_deref(), self.config.default_chain);
        let catalog = catalog_for(request.actions.as_deref(), true);
        telemetry.record_catalog(catalog.len());

        let contract = render_contract(ContractId::InstructionPlan, chain);
        let inputs = ContractInputs::new()
            .with(fields::ACTION_LIST, catalog.oracle_view().to_string())
            .with(fields::CHAT_HISTORY, history::flatten_history(earlier))
            .with(fields::USER_PROMPT, history::message_text(prompt));
        contract.check_inputs(&inputs)?;

        let output = self.invoke(&contract, &inputs, telemetry).await?;
        let instruction_list = output
            .text_list(fields::INSTRUCTION_LIST)
            .ok_or_else(|| OracleError::malformed(fields::INSTRUCTION_LIST, "missing"))?;

        Ok(InstructionPlan { instruction_list })
    }

    /// Pick the action and parameters for one step of an existing plan.
    ///
    /// The result goes through the same normalization as [`plan`](Self::plan).
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] for an empty chat history or a blank
    /// current step, and the [`plan`](Self::plan) errors otherwise.
    pub async fn execute_step(&self, request: &StepRequest) -> Result<StepAction> {
        let mut telemetry = PlanTelemetry::new();
        let result = self
            .execute_step_inner(request, &mut telemetry)
            .instrument(PlanTelemetry::request_span("execute_step"))
            .await;
        finish(&mut telemetry, &result, |s| s.action.as_str());
        result
    }

    async fn execute_step_inner(
        &self,
        request: &StepRequest,
        telemetry: &mut PlanTelemetry,
    ) -> Result<StepAction> {
        if request.current_step.trim().is_empty() {
            return Err(Error::invalid_request("current_step must not be empty"));
        }
        let (prompt, earlier) = split_prompt(&request.chat_history)?;
        let chain = Chain::resolve(request.chain.as_deref(), self.config.default_chain);
        let catalog = catalog_for(request.actions.as_deref(), true);
        telemetry.record_catalog(catalog.len());

        let contract = render_contract(ContractId::StepExecution, chain);
        let inputs = ContractInputs::new()
            .with(fields::CHAT_HISTORY, history::flatten_history(earlier))
            .with(fields::USER_PROMPT, history::message_text(prompt))
            .with(fields::PLAN, history::render_plan(&request.plan))
            .with(fields::CURRENT_STEP, request.current_step.as_str())
            .with(fields::ACTION_LIST, catalog.oracle_view().to_string());
        contract.check_inputs(&inputs)?;

        let output = self.invoke(&contract, &inputs, telemetry).await?;
        let normalizer = DecisionNormalizer::new(&catalog);
        let action = normalizer.normalize_action(&required_text(&output, fields::ACTION)?)?;
        let parameters = normalize_parameters(required_mapping(&output, fields::PARAMETERS)?)?;

        Ok(StepAction { action, parameters })
    }

    /// Invoke the oracle once under the configured timeout.
    async fn invoke(
        &self,
        contract: &ContractSpec,
        inputs: &ContractInputs,
        telemetry: &mut PlanTelemetry,
    ) -> Result<ContractOutput> {
        let started = Instant::now();
        let timeout = self.config.oracle_timeout;

        let output = tokio::time::timeout(timeout, self.oracle.invoke(contract, inputs))
            .instrument(PlanTelemetry::oracle_span(contract.id))
            .await
            .map_err(|_| {
                warn!(
                    contract = %contract.id,
                    timeout_ms = timeout.as_millis(),
                    "oracle timed out"
                );
                OracleError::Timeout { timeout }
            })??;

        telemetry.record_oracle(started.elapsed(), output.usage.as_ref());
        Ok(output)
    }
}

/// Assemble the contract inputs for a regime.
///
/// # Errors
///
/// Returns [`Error::Contract`] if the assembled set does not match the
/// regime's contract, and [`Error::Json`] if the step history cannot be
/// serialized.
pub fn assemble_inputs(
    regime: Regime,
    request: &PlanRequest,
    state: &TaskState,
    catalog: &ActionCatalog,
) -> Result<ContractInputs> {
    let mut inputs = ContractInputs::new()
        .with(fields::CHAT_HISTORY, history::flatten_history(&request.chat_history))
        .with(fields::TASK_DEFINITION, state.task_definition.as_str())
        .with(fields::AVAILABLE_ACTIONS, catalog.oracle_view().to_string());

    if regime.uses_new_message() {
        inputs.insert(fields::NEW_MESSAGE, history::new_message(&request.chat_history));
    }
    if regime.uses_past_steps() {
        inputs.insert(fields::PAST_STEPS, history::render_steps(&request.past_steps)?);
    }
    if regime == Regime::SwitchOrContinue {
        inputs.insert(fields::LAST_STEP, history::render_last_step(&request.past_steps)?);
    }

    render_contract(regime.into(), state.chain).check_inputs(&inputs)?;
    Ok(inputs)
}

/// Catalog from caller actions, or the default toolkit when none were sent.
fn catalog_for(
    actions: Option<&[Option<ActionDescriptor>]>,
    switched_task: bool,
) -> ActionCatalog {
    match actions {
        Some(actions) => ActionCatalog::build(actions.iter().cloned(), switched_task),
        None => ActionCatalog::build(
            domain::default_actions().into_iter().map(Some),
            switched_task,
        ),
    }
}

/// Latest turn as the prompt, earlier turns as history.
fn split_prompt(
    turns: &[ConversationTurn],
) -> Result<(&ConversationTurn, &[ConversationTurn])> {
    turns
        .split_last()
        .ok_or_else(|| Error::invalid_request("chat_history must not be empty"))
}

fn required_text(output: &ContractOutput, name: &'static str) -> Result<String> {
    output
        .text(name)
        .map(ToString::to_string)
        .ok_or_else(|| OracleError::malformed(name, "missing").into())
}

fn required_mapping(
    output: &ContractOutput,
    name: &'static str,
) -> Result<Map<String, Value>> {
    output
        .mapping(name)
        .cloned()
        .ok_or_else(|| OracleError::malformed(name, "missing").into())
}

fn finish<T>(telemetry: &mut PlanTelemetry, result: &Result<T>, label: impl FnOnce(&T) -> &str) {
    match result {
        Ok(value) => telemetry.complete_ok(label(value)),
        Err(err) => telemetry.complete_err(err),
    }
    let metrics = telemetry.metrics();
    debug!(
        outcome = ?metrics.outcome,
        total_tokens = metrics.total_tokens(),
        "plan_metrics"
    );
}

#[cfg(test)]
mod tests;
