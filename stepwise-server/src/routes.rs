//! Route handlers.
//!
//! Each planning route runs inside an `http_request` span carrying a fresh
//! request id, and writes exactly one `plan_exchange` event pairing the
//! serialized request with the serialized reply or error.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use serde::Serialize;
use serde_json::{Value, json};
use stepwise::types::{
    Decision, InstructionPlan, InstructionRequest, PlanRequest, StepAction, StepRequest,
};
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::AppState;
use crate::error::ApiError;

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// `POST /plan`
///
/// # Errors
///
/// See [`ApiError`].
pub async fn plan(
    State(state): State<AppState>,
    payload: Result<Json<PlanRequest>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    let result = state
        .planner()
        .plan(&request)
        .instrument(info_span!("http_request", %request_id, route = "/plan"))
        .await;
    log_exchange(request_id, "/plan", &request, &result);
    Ok(Json(result?))
}

/// `POST /plan-instruction`
///
/// # Errors
///
/// See [`ApiError`].
pub async fn plan_instruction(
    State(state): State<AppState>,
    payload: Result<Json<InstructionRequest>, JsonRejection>,
) -> Result<Json<InstructionPlan>, ApiError> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    let result = state
        .planner()
        .plan_instructions(&request)
        .instrument(info_span!("http_request", %request_id, route = "/plan-instruction"))
        .await;
    log_exchange(request_id, "/plan-instruction", &request, &result);
    Ok(Json(result?))
}

/// `POST /execute-action`
///
/// # Errors
///
/// See [`ApiError`].
pub async fn execute_action(
    State(state): State<AppState>,
    payload: Result<Json<StepRequest>, JsonRejection>,
) -> Result<Json<StepAction>, ApiError> {
    let Json(request) = payload?;
    let request_id = Uuid::new_v4();
    let result = state
        .planner()
        .execute_step(&request)
        .instrument(info_span!("http_request", %request_id, route = "/execute-action"))
        .await;
    log_exchange(request_id, "/execute-action", &request, &result);
    Ok(Json(result?))
}

fn log_exchange<Req, Resp>(
    request_id: Uuid,
    route: &'static str,
    request: &Req,
    result: &stepwise::Result<Resp>,
) where
    Req: Serialize,
    Resp: Serialize,
{
    let request = to_json(request);
    match result {
        Ok(response) => info!(
            %request_id,
            route,
            %request,
            response = %to_json(response),
            "plan_exchange"
        ),
        Err(err) => info!(
            %request_id,
            route,
            %request,
            error = %err,
            "plan_exchange"
        ),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|err| format!("<unserializable: {err}>"))
}
