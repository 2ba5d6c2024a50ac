//! Structured prompt contracts.
//!
//! A contract declares the input fields the oracle receives, the output
//! fields it must return, and the instruction text that carries the
//! planning policy. There is one contract per [`Regime`] plus the two
//! supplementary contracts used for instruction planning and plan-step
//! execution.
//!
//! Contracts are built by the pure function [`render_contract`], which
//! composes the chain background with the fixed policy text at call time.

pub mod policy;

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, OracleError, Result};
use crate::providers::TokenUsage;
use crate::regime::Regime;
use crate::types::Chain;

/// Identifies a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractId {
    /// [`Regime::FirstStep`].
    FirstStep,
    /// [`Regime::LoopContinuation`].
    LoopContinuation,
    /// [`Regime::SwitchOrContinue`].
    SwitchOrContinue,
    /// Turn a user prompt into a list of high-level instructions.
    InstructionPlan,
    /// Pick the action for one step of an existing plan.
    StepExecution,
}

impl ContractId {
    /// Snake-case name used in prompts and logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::FirstStep => "first_step",
            Self::LoopContinuation => "loop_continuation",
            Self::SwitchOrContinue => "switch_or_continue",
            Self::InstructionPlan => "instruction_plan",
            Self::StepExecution => "step_execution",
        }
    }
}

impl From<Regime> for ContractId {
    fn from(regime: Regime) -> Self {
        match regime {
            Regime::FirstStep => Self::FirstStep,
            Regime::LoopContinuation => Self::LoopContinuation,
            Regime::SwitchOrContinue => Self::SwitchOrContinue,
        }
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of a contract field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Free text.
    Text,
    /// A JSON object.
    Mapping,
    /// An ordered list of strings.
    TextList,
}

impl FieldKind {
    /// Type hint shown to the oracle.
    #[must_use]
    pub const fn hint(&self) -> &'static str {
        match self {
            Self::Text => "string",
            Self::Mapping => "JSON object",
            Self::TextList => "JSON array of strings",
        }
    }
}

/// One declared field of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// What the field holds.
    pub description: &'static str,
    /// Value shape.
    pub kind: FieldKind,
    /// Reasoning scaffolding: logged, never part of a returned decision.
    pub scaffolding: bool,
}

impl FieldSpec {
    const fn text(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Text,
            scaffolding: false,
        }
    }

    const fn scaffold(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            kind: FieldKind::Text,
            scaffolding: true,
        }
    }
}

/// Field names shared between contracts and the driver.
pub mod fields {
    /// Flattened chat history.
    pub const CHAT_HISTORY: &str = "chat_history";
    /// Task definition.
    pub const TASK_DEFINITION: &str = "task_definition";
    /// Catalog shown to the oracle.
    pub const AVAILABLE_ACTIONS: &str = "available_actions";
    /// Latest user message.
    pub const NEW_MESSAGE: &str = "new_message";
    /// Past steps, oldest first.
    pub const PAST_STEPS: &str = "past_steps";
    /// Most recent past step.
    pub const LAST_STEP: &str = "last_step";
    /// Catalog shown to the oracle by the supplementary contracts.
    pub const ACTION_LIST: &str = "action_list";
    /// Latest user prompt for the supplementary contracts.
    pub const USER_PROMPT: &str = "user_prompt";
    /// Plan instructions.
    pub const PLAN: &str = "plan";
    /// Current plan step.
    pub const CURRENT_STEP: &str = "current_step";
    /// Same-task judgment.
    pub const SAME_TASK: &str = "same_task";
    /// Pending-step judgment.
    pub const PENDING_STEP: &str = "pending_step";
    /// Task completion judgment.
    pub const TASK_STATUS: &str = "task_status";
    /// Chosen action.
    pub const ACTION: &str = "action";
    /// Action parameters.
    pub const PARAMETERS: &str = "parameters";
    /// Rationale.
    pub const EXPLANATION: &str = "explanation";
    /// Instruction list.
    pub const INSTRUCTION_LIST: &str = "instruction_list";
}

const CHAT_HISTORY: FieldSpec = FieldSpec::text(
    fields::CHAT_HISTORY,
    "Chat history, one 'role: content' line per message",
);
const TASK_DEFINITION: FieldSpec = FieldSpec::text(fields::TASK_DEFINITION, "Task definition");
const AVAILABLE_ACTIONS: FieldSpec = FieldSpec::text(
    fields::AVAILABLE_ACTIONS,
    "List of actions you can take, as function definitions",
);
const NEW_MESSAGE: FieldSpec =
    FieldSpec::text(fields::NEW_MESSAGE, "The latest message from the user");
const PAST_STEPS: FieldSpec = FieldSpec::text(
    fields::PAST_STEPS,
    "Past actions taken and their results, oldest first",
);
const LAST_STEP: FieldSpec = FieldSpec::text(
    fields::LAST_STEP,
    "The most recent past step, or 'none' when no step was taken",
);
const ACTION_LIST: FieldSpec = FieldSpec::text(fields::ACTION_LIST, "The list of actions");
const USER_PROMPT: FieldSpec = FieldSpec::text(fields::USER_PROMPT, "The user prompt");
const PLAN: FieldSpec = FieldSpec::text(fields::PLAN, "The plan to take");
const CURRENT_STEP: FieldSpec =
    FieldSpec::text(fields::CURRENT_STEP, "The current step in the plan");

const SAME_TASK: FieldSpec = FieldSpec::scaffold(
    fields::SAME_TASK,
    "\"yes\" or \"no\": does the latest user message belong to the declared task, with a short reason",
);
const PENDING_STEP: FieldSpec = FieldSpec::scaffold(
    fields::PENDING_STEP,
    "\"repeat\", \"skip\" or \"ignore\" for the last step, with a short reason",
);
const TASK_STATUS: FieldSpec = FieldSpec::scaffold(
    fields::TASK_STATUS,
    "Whether the task is fully satisfied by the past steps, with a short reason",
);
const ACTION: FieldSpec = FieldSpec::text(
    fields::ACTION,
    "Name of the action to take, exactly as listed in the actions",
);
const PARAMETERS: FieldSpec = FieldSpec {
    name: fields::PARAMETERS,
    description: "Parameters for the action, following its parameter schema",
    kind: FieldKind::Mapping,
    scaffolding: false,
};
const EXPLANATION: FieldSpec = FieldSpec::text(
    fields::EXPLANATION,
    "Explanation of the action and parameters in natural language",
);
const INSTRUCTION_LIST: FieldSpec = FieldSpec {
    name: fields::INSTRUCTION_LIST,
    description: "A list of instructions to take",
    kind: FieldKind::TextList,
    scaffolding: false,
};

const FIRST_STEP_INPUTS: &[FieldSpec] =
    &[CHAT_HISTORY, TASK_DEFINITION, AVAILABLE_ACTIONS, NEW_MESSAGE];
const LOOP_INPUTS: &[FieldSpec] = &[CHAT_HISTORY, TASK_DEFINITION, AVAILABLE_ACTIONS, PAST_STEPS];
const SWITCH_INPUTS: &[FieldSpec] = &[
    CHAT_HISTORY,
    TASK_DEFINITION,
    AVAILABLE_ACTIONS,
    NEW_MESSAGE,
    PAST_STEPS,
    LAST_STEP,
];
const INSTRUCTION_INPUTS: &[FieldSpec] = &[ACTION_LIST, CHAT_HISTORY, USER_PROMPT];
const STEP_INPUTS: &[FieldSpec] = &[CHAT_HISTORY, USER_PROMPT, PLAN, CURRENT_STEP, ACTION_LIST];

const DECISION_OUTPUTS: &[FieldSpec] = &[ACTION, PARAMETERS, EXPLANATION];
const SWITCH_OUTPUTS: &[FieldSpec] = &[
    SAME_TASK,
    PENDING_STEP,
    TASK_STATUS,
    ACTION,
    PARAMETERS,
    EXPLANATION,
];
const INSTRUCTION_OUTPUTS: &[FieldSpec] = &[INSTRUCTION_LIST];
const STEP_OUTPUTS: &[FieldSpec] = &[ACTION, PARAMETERS];

/// A fully rendered contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContractSpec {
    /// Which contract this is.
    pub id: ContractId,
    /// Chain whose background was composed in.
    pub chain: Chain,
    /// Background, task statement and guidelines.
    pub instructions: String,
    /// Declared inputs, in prompt order.
    pub inputs: &'static [FieldSpec],
    /// Declared outputs, in the order the oracle should produce them.
    pub outputs: &'static [FieldSpec],
}

/// Render a contract for a chain.
#[must_use]
pub fn render_contract(id: ContractId, chain: Chain) -> ContractSpec {
    let (inputs, outputs) = match id {
        ContractId::FirstStep => (FIRST_STEP_INPUTS, DECISION_OUTPUTS),
        ContractId::LoopContinuation => (LOOP_INPUTS, DECISION_OUTPUTS),
        ContractId::SwitchOrContinue => (SWITCH_INPUTS, SWITCH_OUTPUTS),
        ContractId::InstructionPlan => (INSTRUCTION_INPUTS, INSTRUCTION_OUTPUTS),
        ContractId::StepExecution => (STEP_INPUTS, STEP_OUTPUTS),
    };

    let instructions = format!(
        "{}\n\n{}\n\n# Guidelines\n{}",
        policy::background(chain),
        policy::task_statement(id),
        policy::guidelines(id),
    );

    ContractSpec {
        id,
        chain,
        instructions,
        inputs,
        outputs,
    }
}

impl ContractSpec {
    /// Whether the contract declares an input field.
    #[must_use]
    pub fn has_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|f| f.name == name)
    }

    /// Whether the contract declares an output field.
    #[must_use]
    pub fn has_output(&self, name: &str) -> bool {
        self.outputs.iter().any(|f| f.name == name)
    }

    /// Check that `inputs` supplies exactly the declared input fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Contract`] naming the first missing or undeclared field.
    pub fn check_inputs(&self, inputs: &ContractInputs) -> Result<()> {
        if let Some(missing) = self.inputs.iter().find(|f| inputs.get(f.name).is_none()) {
            return Err(Error::contract(format!(
                "{} requires input '{}'",
                self.id, missing.name
            )));
        }
        if let Some(extra) = inputs.names().find(|name| !self.has_input(name)) {
            return Err(Error::contract(format!(
                "{} does not accept input '{extra}'",
                self.id
            )));
        }
        Ok(())
    }

    /// Decode raw oracle fields into the declared outputs.
    ///
    /// Scalars are accepted where text is expected, and JSON text is
    /// accepted where an object or list is expected. Undeclared fields are
    /// dropped.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError::MalformedOutput`] when a declared field is
    /// missing or cannot be coerced to its kind.
    pub fn decode_outputs(
        &self,
        mut raw: Map<String, Value>,
    ) -> std::result::Result<ContractOutput, OracleError> {
        let mut decoded = Map::new();
        for field in self.outputs {
            let value = raw
                .remove(field.name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| OracleError::malformed(field.name, "missing"))?;
            let value = coerce(field, value)?;
            decoded.insert(field.name.to_string(), value);
        }
        Ok(ContractOutput::new(decoded))
    }
}

fn coerce(field: &FieldSpec, value: Value) -> std::result::Result<Value, OracleError> {
    match (field.kind, value) {
        (FieldKind::Text, Value::String(s)) => Ok(Value::String(s)),
        (FieldKind::Text, v @ (Value::Number(_) | Value::Bool(_))) => {
            Ok(Value::String(v.to_string()))
        }
        (FieldKind::Mapping, v @ Value::Object(_)) => Ok(v),
        (FieldKind::TextList, Value::Array(items)) => Ok(Value::Array(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => Value::String(s),
                    other => Value::String(other.to_string()),
                })
                .collect(),
        )),
        (FieldKind::Mapping | FieldKind::TextList, Value::String(text)) => {
            let parsed: Value = serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
                OracleError::malformed(field.name, format!("expected {}: {e}", field.kind.hint()))
            })?;
            if parsed.is_string() {
                return Err(OracleError::malformed(
                    field.name,
                    format!("expected {}", field.kind.hint()),
                ));
            }
            coerce(field, parsed)
        }
        (kind, other) => Err(OracleError::malformed(
            field.name,
            format!("expected {}, got {}", kind.hint(), json_type(&other)),
        )),
    }
}

/// Strip a surrounding markdown code fence, if present.
pub(crate) fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    // Drop a language tag such as `json` on the opening fence line.
    match body.find('\n') {
        Some(pos) if !body[..pos].trim().contains(['{', '[']) => body[pos + 1..].trim(),
        _ => body.trim(),
    }
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Text inputs assembled for one contract invocation, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractInputs {
    fields: Vec<(&'static str, String)>,
}

impl ContractInputs {
    /// Create an empty input set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value.
    pub fn insert(&mut self, name: &'static str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.fields.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.fields.push((name, value));
        }
    }

    /// Builder-style [`insert`](Self::insert).
    #[must_use]
    pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Field names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|(n, _)| *n)
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Decoded output fields of one contract invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContractOutput {
    fields: Map<String, Value>,
    /// Token usage reported by the model, when available.
    pub usage: Option<TokenUsage>,
}

impl ContractOutput {
    /// Wrap decoded fields.
    #[must_use]
    pub const fn new(fields: Map<String, Value>) -> Self {
        Self {
            fields,
            usage: None,
        }
    }

    /// Attach token usage.
    #[must_use]
    pub const fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// A text field.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// A mapping field.
    #[must_use]
    pub fn mapping(&self, name: &str) -> Option<&Map<String, Value>> {
        self.fields.get(name).and_then(Value::as_object)
    }

    /// A text-list field.
    #[must_use]
    pub fn text_list(&self, name: &str) -> Option<Vec<String>> {
        self.fields.get(name).and_then(Value::as_array).map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()
        })
    }

    /// Remove and return a field.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        self.fields.remove(name)
    }

    /// All fields.
    #[must_use]
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_regime_contract_inputs() {
        let first = render_contract(ContractId::FirstStep, Chain::Solana);
        assert!(first.has_input(fields::NEW_MESSAGE));
        assert!(!first.has_input(fields::PAST_STEPS));
        assert!(!first.has_input(fields::LAST_STEP));

        let looped = render_contract(ContractId::LoopContinuation, Chain::Solana);
        assert!(looped.has_input(fields::PAST_STEPS));
        assert!(!looped.has_input(fields::NEW_MESSAGE));
        assert!(!looped.has_output(fields::PENDING_STEP));
        assert!(!looped.has_output(fields::SAME_TASK));

        let switch = render_contract(ContractId::SwitchOrContinue, Chain::Solana);
        for name in [fields::NEW_MESSAGE, fields::PAST_STEPS, fields::LAST_STEP] {
            assert!(switch.has_input(name));
        }
    }

    #[test]
    fn test_switch_scaffolding_precedes_action() {
        let switch = render_contract(ContractId::SwitchOrContinue, Chain::Solana);
        let names: Vec<_> = switch.outputs.iter().map(|f| f.name).collect();
        let action_pos = names.iter().position(|n| *n == fields::ACTION).unwrap();
        for scaffold in [fields::SAME_TASK, fields::PENDING_STEP, fields::TASK_STATUS] {
            assert!(names.iter().position(|n| *n == scaffold).unwrap() < action_pos);
        }
        assert!(switch.outputs.iter().filter(|f| f.scaffolding).count() == 3);
    }

    #[test]
    fn test_render_is_pure_per_chain() {
        let sol = render_contract(ContractId::FirstStep, Chain::Solana);
        let bsc = render_contract(ContractId::FirstStep, Chain::Bsc);
        assert_ne!(sol.instructions, bsc.instructions);
        assert_eq!(sol, render_contract(ContractId::FirstStep, Chain::Solana));
        assert!(sol.instructions.ends_with(policy::guidelines(ContractId::FirstStep)));
    }

    #[test]
    fn test_check_inputs_exact_set() {
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);
        let inputs = ContractInputs::new()
            .with(fields::CHAT_HISTORY, "user: hi\n")
            .with(fields::TASK_DEFINITION, "greet")
            .with(fields::AVAILABLE_ACTIONS, "[]")
            .with(fields::NEW_MESSAGE, "hi");
        assert!(contract.check_inputs(&inputs).is_ok());

        let extra = inputs.clone().with(fields::PAST_STEPS, "[]");
        assert!(matches!(contract.check_inputs(&extra), Err(Error::Contract(_))));

        let mut missing = ContractInputs::new();
        missing.insert(fields::CHAT_HISTORY, "");
        assert!(matches!(contract.check_inputs(&missing), Err(Error::Contract(_))));
    }

    #[test]
    fn test_inputs_insert_replaces() {
        let mut inputs = ContractInputs::new();
        inputs.insert(fields::PLAN, "a");
        inputs.insert(fields::PLAN, "b");
        assert_eq!(inputs.len(), 1);
        assert_eq!(inputs.get(fields::PLAN), Some("b"));
    }

    #[test]
    fn test_decode_outputs_parses_json_text_parameters() {
        let contract = render_contract(ContractId::StepExecution, Chain::Solana);
        let output = contract
            .decode_outputs(raw(json!({
                "action": "SWAP_TOKEN",
                "parameters": "```json\n{\"inputTokenSymbol\": \"SOL\"}\n```",
                "extra": "dropped"
            })))
            .unwrap();

        assert_eq!(output.text(fields::ACTION), Some("SWAP_TOKEN"));
        assert_eq!(
            output.mapping(fields::PARAMETERS).unwrap()["inputTokenSymbol"],
            "SOL"
        );
        assert!(output.fields().get("extra").is_none());
    }

    #[test]
    fn test_decode_outputs_rejects_missing_and_malformed() {
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);

        let missing = contract.decode_outputs(raw(json!({"action": "WRAP_UP", "parameters": {}})));
        assert!(matches!(
            missing,
            Err(OracleError::MalformedOutput { ref field, .. }) if field == "explanation"
        ));

        let bad = contract.decode_outputs(raw(json!({
            "action": "WRAP_UP",
            "parameters": "not json",
            "explanation": "done"
        })));
        assert!(matches!(
            bad,
            Err(OracleError::MalformedOutput { ref field, .. }) if field == "parameters"
        ));

        let list = contract.decode_outputs(raw(json!({
            "action": "WRAP_UP",
            "parameters": [1, 2],
            "explanation": "done"
        })));
        assert!(list.is_err());
    }

    #[test]
    fn test_decode_instruction_list() {
        let contract = render_contract(ContractId::InstructionPlan, Chain::Bsc);
        let output = contract
            .decode_outputs(raw(json!({"instruction_list": "[\"check balance\", \"swap\"]"})))
            .unwrap();
        assert_eq!(
            output.text_list(fields::INSTRUCTION_LIST),
            Some(vec!["check balance".to_string(), "swap".to_string()])
        );
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1} "), "{\"a\":1}");
    }
}
