use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{Level, debug, warn};

use super::Oracle;
use crate::contract::{ContractInputs, ContractOutput, ContractSpec, strip_code_fence};
use crate::error::OracleError;
use crate::providers::{ChatMessage, GenerateOptions, Model};

const MAX_PROMPT_LOG_CHARS: usize = 4_000;
const MAX_REPLY_LOG_CHARS: usize = 2_000;

/// Oracle backed by a chat model answering in JSON mode.
#[derive(Debug, Clone)]
pub struct LlmOracle<M> {
    model: M,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl<M: Model> LlmOracle<M> {
    /// Wrap a model.
    #[must_use]
    pub const fn new(model: M) -> Self {
        Self {
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Cap the reply length.
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The wrapped model.
    #[must_use]
    pub const fn model(&self) -> &M {
        &self.model
    }

    fn options(&self) -> GenerateOptions {
        let mut options = GenerateOptions::new().json_object();
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        options
    }
}

/// System prompt: contract instructions, field declarations and reply format.
pub(super) fn build_system_prompt(contract: &ContractSpec) -> String {
    let mut system = String::new();
    system.push_str(contract.instructions.trim());

    system.push_str("\n\n# Input fields\n");
    for field in contract.inputs {
        system.push_str(&format!("- {}: {}\n", field.name, field.description));
    }

    system.push_str("\n# Output fields\n");
    for field in contract.outputs {
        system.push_str(&format!(
            "- {} ({}): {}\n",
            field.name,
            field.kind.hint(),
            field.description
        ));
    }

    let keys: Vec<_> = contract.outputs.iter().map(|f| f.name).collect();
    system.push_str(&format!(
        "\nReply with ONLY one JSON object with exactly these keys, in this order: {}.",
        keys.join(", ")
    ));
    system
}

/// User prompt: each input under its own heading.
pub(super) fn build_user_prompt(contract: &ContractSpec, inputs: &ContractInputs) -> String {
    contract
        .inputs
        .iter()
        .map(|field| {
            let value = inputs.get(field.name).unwrap_or_default();
            format!("## {}\n{}\n", field.name, value.trim_end())
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a model reply into raw output fields.
pub(super) fn parse_reply(text: &str) -> Result<Map<String, Value>, OracleError> {
    let body = strip_code_fence(text);
    if let Ok(Value::Object(map)) = serde_json::from_str(body) {
        return Ok(map);
    }
    let json = extract_json(body)
        .ok_or_else(|| OracleError::unparseable(truncate_for_log(text, MAX_REPLY_LOG_CHARS)))?;
    match serde_json::from_str(json) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(OracleError::unparseable("reply is not a JSON object")),
        Err(e) => Err(OracleError::unparseable(e.to_string())),
    }
}

fn extract_json(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

pub(crate) fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let char_count = input.chars().count();
    if char_count <= max_chars {
        return input.to_string();
    }
    let mut preview: String = input.chars().take(max_chars).collect();
    preview.push_str(&format!("... [truncated, total_chars={char_count}]"));
    preview
}

#[async_trait]
impl<M: Model> Oracle for LlmOracle<M> {
    async fn invoke(
        &self,
        contract: &ContractSpec,
        inputs: &ContractInputs,
    ) -> Result<ContractOutput, OracleError> {
        let system = build_system_prompt(contract);
        let user = build_user_prompt(contract, inputs);

        if tracing::enabled!(Level::DEBUG) {
            debug!(
                contract = %contract.id,
                provider = self.model.provider(),
                model = self.model.model_id(),
                system_prompt = %truncate_for_log(&system, MAX_PROMPT_LOG_CHARS),
                user_prompt = %truncate_for_log(&user, MAX_PROMPT_LOG_CHARS),
                "oracle prompts"
            );
        }

        let response = self
            .model
            .generate(
                vec![ChatMessage::system(system), ChatMessage::user(user)],
                self.options(),
            )
            .await?;

        debug!(
            contract = %contract.id,
            provider = self.model.provider(),
            reply = %truncate_for_log(response.text(), MAX_REPLY_LOG_CHARS),
            "oracle reply"
        );

        let raw = parse_reply(response.text()).inspect_err(|e| {
            warn!(contract = %contract.id, error = %e, "oracle reply is not a JSON object");
        })?;

        let mut output = contract.decode_outputs(raw)?;
        if let Some(usage) = response.token_usage {
            output = output.with_usage(usage);
        }
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{ContractId, fields, render_contract};
    use crate::error::LlmError;
    use crate::providers::{MessageRole, MockModel};
    use crate::types::Chain;

    fn first_step_inputs() -> ContractInputs {
        ContractInputs::new()
            .with(fields::CHAT_HISTORY, "user: buy BONK\n")
            .with(fields::TASK_DEFINITION, "buy BONK")
            .with(fields::AVAILABLE_ACTIONS, "[]")
            .with(fields::NEW_MESSAGE, "buy BONK")
    }

    #[test]
    fn test_system_prompt_declares_fields() {
        let contract = render_contract(ContractId::SwitchOrContinue, Chain::Bsc);
        let system = build_system_prompt(&contract);
        assert!(system.contains("BNB"));
        assert!(system.contains("- last_step:"));
        assert!(system.contains("- parameters (JSON object):"));
        assert!(system.contains(
            "same_task, pending_step, task_status, action, parameters, explanation"
        ));
    }

    #[test]
    fn test_user_prompt_follows_declared_order() {
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);
        let user = build_user_prompt(&contract, &first_step_inputs());
        let history = user.find("## chat_history").unwrap();
        let message = user.find("## new_message").unwrap();
        assert!(history < message);
    }

    #[test]
    fn test_parse_reply_variants() {
        assert!(parse_reply(r#"{"action": "WRAP_UP"}"#).is_ok());
        assert!(parse_reply("```json\n{\"action\": \"WRAP_UP\"}\n```").is_ok());
        assert!(parse_reply("Sure! {\"action\": \"WRAP_UP\"} hope that helps").is_ok());
        assert!(matches!(
            parse_reply("no json here"),
            Err(OracleError::Unparseable(_))
        ));
        assert!(parse_reply("[1, 2]").is_err());
    }

    #[test]
    fn test_options_carry_sampling_settings() {
        let options = LlmOracle::new(MockModel::new())
            .with_temperature(0.3)
            .with_max_tokens(256)
            .options();
        assert_eq!(options.temperature, Some(0.3));
        assert_eq!(options.max_tokens, Some(256));
        assert_eq!(options.response_format.unwrap()["type"], "json_object");

        let defaults = LlmOracle::new(MockModel::new()).options();
        assert!(defaults.temperature.is_none());
        assert!(defaults.max_tokens.is_none());
    }

    #[test]
    fn test_truncate_for_log() {
        assert_eq!(truncate_for_log("short", 10), "short");
        let long = truncate_for_log(&"x".repeat(20), 5);
        assert!(long.starts_with("xxxxx..."));
        assert!(long.ends_with("total_chars=20]"));
    }

    #[tokio::test]
    async fn test_invoke_decodes_model_reply() {
        let oracle = LlmOracle::new(MockModel::always(
            r#"{"action": "SWAP_TOKEN", "parameters": {"inputTokenSymbol": "SOL"}, "explanation": "buy"}"#,
        ))
        .with_temperature(0.0);
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);

        let output = oracle.invoke(&contract, &first_step_inputs()).await.unwrap();
        assert_eq!(output.text(fields::ACTION), Some("SWAP_TOKEN"));
        assert!(output.usage.is_some());

        let requests = oracle.model().requests();
        assert_eq!(requests[0][0].role, MessageRole::System);
        assert!(requests[0][1].content.contains("## task_definition\nbuy BONK"));
    }

    #[tokio::test]
    async fn test_invoke_propagates_model_error() {
        let oracle = LlmOracle::new(MockModel::new().with_error(LlmError::network("refused")));
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);
        let result = oracle.invoke(&contract, &first_step_inputs()).await;
        assert!(matches!(result, Err(OracleError::Model(_))));
    }

    #[tokio::test]
    async fn test_invoke_rejects_missing_field() {
        let oracle = LlmOracle::new(MockModel::always(r#"{"action": "WRAP_UP"}"#));
        let contract = render_contract(ContractId::FirstStep, Chain::Solana);
        let result = oracle.invoke(&contract, &first_step_inputs()).await;
        assert!(matches!(result, Err(OracleError::MalformedOutput { .. })));
    }
}
