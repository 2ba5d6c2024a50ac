//! HTTP boundary for the [`stepwise`] planner.
//!
//! Exposes the planner over three JSON endpoints plus a health check:
//!
//! | Route | Body | Reply |
//! |-------|------|-------|
//! | `POST /plan` | [`PlanRequest`](stepwise::types::PlanRequest) | [`Decision`](stepwise::types::Decision) |
//! | `POST /plan-instruction` | [`InstructionRequest`](stepwise::types::InstructionRequest) | [`InstructionPlan`](stepwise::types::InstructionPlan) |
//! | `POST /execute-action` | [`StepRequest`](stepwise::types::StepRequest) | [`StepAction`](stepwise::types::StepAction) |
//! | `GET /health` | | `{"status":"ok"}` |
//!
//! Failures are answered with `{"detail": "<message>"}`; see [`ApiError`].

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use stepwise::oracle::Oracle;
use stepwise::planner::{Planner, PlannerConfig};

pub use config::Args;
pub use error::ApiError;

/// Planner type shared by every handler.
pub type SharedPlanner = Planner<Arc<dyn Oracle>>;

/// State shared by all routes.
#[derive(Clone)]
pub struct AppState {
    planner: Arc<SharedPlanner>,
}

impl AppState {
    /// Build the state around an oracle.
    #[must_use]
    pub fn new(oracle: impl Oracle + 'static, config: PlannerConfig) -> Self {
        let oracle: Arc<dyn Oracle> = Arc::new(oracle);
        Self {
            planner: Arc::new(Planner::with_config(oracle, config)),
        }
    }

    /// The shared planner.
    #[must_use]
    pub fn planner(&self) -> &SharedPlanner {
        &self.planner
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", self.planner.config())
            .finish_non_exhaustive()
    }
}

/// The service router.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/plan", post(routes::plan))
        .route("/plan-instruction", post(routes::plan_instruction))
        .route("/execute-action", post(routes::execute_action))
        .with_state(state)
}
