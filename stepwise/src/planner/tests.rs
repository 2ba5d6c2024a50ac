use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};

use super::*;
use crate::catalog::{CREATE_TOKEN, GENERAL_CHAT, LAUNCH_TOKEN, WRAP_UP};
use crate::oracle::StaticOracle;
use crate::types::{Media, StepRecord};

fn decision_output(action: &str, parameters: Value, explanation: &str) -> Value {
    json!({
        "action": action,
        "parameters": parameters,
        "explanation": explanation,
    })
}

fn planner(oracle: &Arc<StaticOracle>) -> Planner<Arc<StaticOracle>> {
    Planner::new(Arc::clone(oracle))
}

fn catalog_names(available_actions: &str) -> Vec<String> {
    let view: Value = serde_json::from_str(available_actions).unwrap();
    view.as_array()
        .unwrap()
        .iter()
        .map(|a| a["function"]["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_first_step_after_task_declared() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        "SWAP_TOKEN",
        json!({"inputTokenSymbol": "SOL", "outputTokenSymbol": "TOKEN", "inputTokenAmount": 1}),
        "Buy TOKEN with 1 SOL",
    )));
    let request = PlanRequest::new(vec![ConversationTurn::user("buy 1 SOL of TOKEN")], "buy TOKEN")
        .with_switched_task(true)
        .with_past_steps(vec![StepRecord::new("ANALYZE_TOKEN", "check TOKEN", "ok")]);

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, "SWAP_TOKEN");
    assert_eq!(decision.parameters["inputTokenAmount"], 1);

    let calls = oracle.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].contract, ContractId::FirstStep);
    assert!(calls[0].inputs.get(fields::PAST_STEPS).is_none());
    assert!(calls[0].inputs.get(fields::LAST_STEP).is_none());
    assert_eq!(
        calls[0].inputs.get(fields::NEW_MESSAGE),
        Some("buy 1 SOL of TOKEN")
    );
    let names = catalog_names(calls[0].inputs.get(fields::AVAILABLE_ACTIONS).unwrap());
    assert!(!names.iter().any(|n| n == SWITCH_TASK));
}

#[tokio::test]
async fn test_plan_renders_numbers_as_plain_decimals() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        "'SWAP_TOKEN'",
        json!({
            "inputTokenSymbol": "SOL",
            "inputTokenAmount": 1.2345678901234567e-20,
            "route": {"maxSupply": 1e30, "hops": [0.5, 2]},
        }),
        "Swap dust",
    )));
    let request = PlanRequest::new(vec![ConversationTurn::user("swap the dust")], "swap dust")
        .with_switched_task(true);

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, "SWAP_TOKEN");
    assert_eq!(
        decision.parameters["inputTokenAmount"],
        "0.000000000000000000012345678901234567"
    );
    assert_eq!(
        decision.parameters["route"]["maxSupply"],
        format!("1{}", "0".repeat(30))
    );
    assert_eq!(decision.parameters["route"]["hops"], json!(["0.5", 2]));
    assert_eq!(decision.parameters["inputTokenSymbol"], "SOL");
}

#[tokio::test]
async fn test_loop_continuation_without_new_message() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        WRAP_UP,
        json!({"message": "Bought TOKEN"}),
        "The swap succeeded",
    )));
    let request = PlanRequest::new(
        vec![
            ConversationTurn::user("buy 1 SOL of TOKEN"),
            ConversationTurn::assistant("Swapping now"),
        ],
        "buy TOKEN",
    )
    .with_past_steps(vec![StepRecord::new("SWAP_TOKEN", "buy TOKEN", "tx confirmed")]);

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, WRAP_UP);

    let call = &oracle.calls()[0];
    assert_eq!(call.contract, ContractId::LoopContinuation);
    assert!(call.inputs.get(fields::NEW_MESSAGE).is_none());
    assert!(call.inputs.get(fields::LAST_STEP).is_none());
    assert!(call.inputs.get(fields::PAST_STEPS).unwrap().contains("tx confirmed"));
    assert!(!call.outputs.contains(&fields::PENDING_STEP));
    assert!(!call.outputs.contains(&fields::SAME_TASK));
    let names = catalog_names(call.inputs.get(fields::AVAILABLE_ACTIONS).unwrap());
    assert!(!names.iter().any(|n| n == SWITCH_TASK));
}

#[tokio::test]
async fn test_loop_continuation_rejects_switch_task() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        SWITCH_TASK,
        json!({"task_definition": "something else"}),
        "switch",
    )));
    let request = PlanRequest::new(vec![ConversationTurn::assistant("done")], "buy TOKEN")
        .with_past_steps(vec![StepRecord::new("SWAP_TOKEN", "buy", "ok")]);

    let err = planner(&oracle).plan(&request).await.unwrap_err();
    assert!(matches!(err, Error::CatalogViolation { .. }));
}

#[tokio::test]
async fn test_pending_step_confirmed_is_retried() {
    let oracle = Arc::new(StaticOracle::new().with_output(json!({
        "same_task": "yes, the user confirms the limit order",
        "pending_step": "repeat, the user agreed",
        "task_status": "not complete",
        "action": "AUTO_TASK",
        "parameters": {"outputTokenSymbol": "BONK", "priceCondition": "below", "priceTarget": 0.00002},
        "explanation": "Create the confirmed limit order"
    })));
    let request = PlanRequest::new(
        vec![
            ConversationTurn::user("buy BONK when it drops below 0.00002"),
            ConversationTurn::assistant("Please confirm the limit order"),
            ConversationTurn::user("yes"),
        ],
        "buy BONK with a limit order",
    )
    .with_past_steps(vec![StepRecord::new(
        "AUTO_TASK",
        "pending confirmation",
        "awaiting user",
    )]);

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, "AUTO_TASK");
    assert_ne!(decision.action, WRAP_UP);
    assert_eq!(decision.parameters["priceTarget"], "0.00002");
    assert!(decision.parameters.get("pending_step").is_none());

    let call = &oracle.calls()[0];
    assert_eq!(call.contract, ContractId::SwitchOrContinue);
    assert_eq!(call.inputs.get(fields::NEW_MESSAGE), Some("yes"));
    assert!(call.inputs.get(fields::LAST_STEP).unwrap().contains("awaiting user"));
    assert_eq!(&call.outputs[..3], &[fields::SAME_TASK, fields::PENDING_STEP, fields::TASK_STATUS]);

    let contract = render_contract(ContractId::SwitchOrContinue, Chain::Solana);
    assert!(contract.instructions.contains("retry that same step"));
}

#[tokio::test]
async fn test_launch_token_returned_as_create_token() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        LAUNCH_TOKEN,
        json!({"name": "Moon", "symbol": "MOON", "buyAmountSol": 1.69e-6}),
        "Launch MOON",
    )));
    let request = PlanRequest::new(
        vec![ConversationTurn::user("launch MOON").with_attachment(Media::from_url("1", "https://img/moon.png"))],
        "launch MOON",
    )
    .with_switched_task(true);

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, CREATE_TOKEN);
    assert_eq!(decision.parameters["buyAmountSol"], "0.00000169");

    let call = &oracle.calls()[0];
    assert_eq!(call.inputs.get(fields::NEW_MESSAGE), Some("launch MOON https://img/moon.png"));
    let names = catalog_names(call.inputs.get(fields::AVAILABLE_ACTIONS).unwrap());
    assert!(names.iter().any(|n| n == LAUNCH_TOKEN));
    assert!(!names.iter().any(|n| n == CREATE_TOKEN));
}

#[tokio::test]
async fn test_unoffered_action_fails() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        "DELETE_WALLET",
        json!({}),
        "Delete it",
    )));
    let request = PlanRequest::new(vec![ConversationTurn::user("delete my wallet")], "cleanup")
        .with_switched_task(true);

    match planner(&oracle).plan(&request).await {
        Err(Error::CatalogViolation { action, offered }) => {
            assert_eq!(action, "DELETE_WALLET");
            assert!(offered.iter().any(|n| n == WRAP_UP));
        }
        other => panic!("expected a catalog violation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_declared_actions_replace_default_toolkit() {
    let oracle = Arc::new(StaticOracle::new().with_output(decision_output(
        GENERAL_CHAT,
        json!({"message": "hello"}),
        "greeting",
    )));
    let request = PlanRequest::new(vec![ConversationTurn::user("hi")], "chat")
        .with_actions(vec![None])
        .with_switched_task(true);

    planner(&oracle).plan(&request).await.unwrap();
    let names = catalog_names(
        oracle.calls()[0]
            .inputs
            .get(fields::AVAILABLE_ACTIONS)
            .unwrap(),
    );
    assert_eq!(names, vec![WRAP_UP, GENERAL_CHAT]);
}

#[tokio::test]
async fn test_default_toolkit_when_actions_omitted() {
    let oracle = Arc::new(StaticOracle::new().with_output(json!({
        "same_task": "yes",
        "pending_step": "ignore",
        "task_status": "not started",
        "action": "WALLET_PORTFOLIO",
        "parameters": {},
        "explanation": "check balance"
    })));
    let request = PlanRequest::new(vec![ConversationTurn::user("what do I hold?")], "portfolio");

    let decision = planner(&oracle).plan(&request).await.unwrap();
    assert_eq!(decision.action, "WALLET_PORTFOLIO");
    let names = catalog_names(
        oracle.calls()[0]
            .inputs
            .get(fields::AVAILABLE_ACTIONS)
            .unwrap(),
    );
    assert!(names.iter().any(|n| n == "SWAP_TOKEN"));
    assert!(names.iter().any(|n| n == SWITCH_TASK));
}

#[tokio::test]
async fn test_oracle_timeout_is_oracle_error() {
    let oracle = Arc::new(
        StaticOracle::new()
            .with_delay(Duration::from_secs(5))
            .with_output(decision_output(WRAP_UP, json!({}), "late")),
    );
    let config = PlannerConfig::default().with_oracle_timeout(Duration::from_millis(20));
    let request = PlanRequest::new(vec![ConversationTurn::user("hi")], "chat");

    let err = Planner::with_config(Arc::clone(&oracle), config)
        .plan(&request)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Oracle error: no answer within 20ms");
    assert!(matches!(
        err,
        Error::Oracle(OracleError::Timeout { timeout }) if timeout == Duration::from_millis(20)
    ));
}

#[tokio::test]
async fn test_oracle_failure_not_retried() {
    let oracle = Arc::new(
        StaticOracle::new()
            .with_error(OracleError::unparseable("garbage"))
            .with_output(decision_output(WRAP_UP, json!({}), "never reached")),
    );
    let request = PlanRequest::new(vec![ConversationTurn::user("hi")], "chat");

    let err = planner(&oracle).plan(&request).await.unwrap_err();
    assert!(matches!(err, Error::Oracle(OracleError::Unparseable(_))));
    assert_eq!(oracle.calls().len(), 1);
}

#[tokio::test]
async fn test_blank_task_rejected_before_oracle() {
    let oracle = Arc::new(StaticOracle::new());
    let request = PlanRequest::new(vec![ConversationTurn::user("hi")], "  ");

    let err = planner(&oracle).plan(&request).await.unwrap_err();
    assert!(err.is_client_error());
    assert!(oracle.calls().is_empty());
}

#[test]
fn test_assemble_inputs_per_regime() {
    let request = PlanRequest::new(vec![ConversationTurn::user("hi")], "chat")
        .with_past_steps(vec![StepRecord::new("GENERAL_CHAT", "reply", "sent")]);
    let state = request.task_state(Chain::Bsc);
    let catalog = ActionCatalog::build(Vec::new(), false);

    for regime in [
        Regime::FirstStep,
        Regime::LoopContinuation,
        Regime::SwitchOrContinue,
    ] {
        let inputs = assemble_inputs(regime, &request, &state, &catalog).unwrap();
        let contract = render_contract(regime.into(), state.chain);
        assert_eq!(inputs.len(), contract.inputs.len());
    }
}

#[tokio::test]
async fn test_plan_instructions() {
    let oracle = Arc::new(StaticOracle::new().with_output(json!({
        "instruction_list": ["Check the SOL balance", "Swap 1 SOL to USDC"]
    })));
    let request = InstructionRequest {
        chat_history: vec![
            ConversationTurn::user("hello"),
            ConversationTurn::assistant("hi"),
            ConversationTurn::user("swap 1 SOL to USDC"),
        ],
        actions: None,
        chain: None,
    };

    let plan = planner(&oracle).plan_instructions(&request).await.unwrap();
    assert_eq!(plan.instruction_list.len(), 2);

    let call = &oracle.calls()[0];
    assert_eq!(call.contract, ContractId::InstructionPlan);
    assert_eq!(call.inputs.get(fields::USER_PROMPT), Some("swap 1 SOL to USDC"));
    assert_eq!(
        call.inputs.get(fields::CHAT_HISTORY),
        Some("user: hello\nassistant: hi\n")
    );
}

#[tokio::test]
async fn test_plan_instructions_requires_history() {
    let oracle = Arc::new(StaticOracle::new());
    let request = InstructionRequest {
        chat_history: Vec::new(),
        actions: None,
        chain: None,
    };
    let err = planner(&oracle).plan_instructions(&request).await.unwrap_err();
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn test_execute_step_decodes_parameters() {
    let oracle = Arc::new(StaticOracle::new().with_output(json!({
        "action": "\"SEND_TOKEN\"",
        "parameters": "{\"tokenSymbol\": \"USDC\", \"recipient\": \"alice\", \"amount\": 2.50}"
    })));
    let request = StepRequest {
        chat_history: vec![ConversationTurn::user("swap then send to alice")],
        plan: vec!["Swap 1 SOL to USDC".into(), "Send USDC to alice".into()],
        current_step: "Send USDC to alice".into(),
        actions: None,
        chain: Some("bsc".into()),
    };

    let step = planner(&oracle).execute_step(&request).await.unwrap();
    assert_eq!(step.action, "SEND_TOKEN");
    assert_eq!(step.parameters["amount"], "2.5");

    let call = &oracle.calls()[0];
    assert_eq!(call.contract, ContractId::StepExecution);
    assert_eq!(
        call.inputs.get(fields::PLAN),
        Some("1. Swap 1 SOL to USDC\n2. Send USDC to alice")
    );
    assert_eq!(call.inputs.get(fields::CHAT_HISTORY), Some(""));
}

#[tokio::test]
async fn test_execute_step_rejects_unoffered_action() {
    let oracle = Arc::new(StaticOracle::new().with_output(json!({
        "action": "DELETE_WALLET",
        "parameters": {}
    })));
    let request = StepRequest {
        chat_history: vec![ConversationTurn::user("go")],
        plan: vec!["go".into()],
        current_step: "go".into(),
        actions: None,
        chain: None,
    };
    let err = planner(&oracle).execute_step(&request).await.unwrap_err();
    assert!(matches!(err, Error::CatalogViolation { .. }));
}
