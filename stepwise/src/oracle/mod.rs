//! The reasoning oracle.
//!
//! An [`Oracle`] takes a rendered [`ContractSpec`] and its text inputs and
//! returns the contract's output fields. It is the only non-deterministic
//! component of the planner; everything before and after it is pure.
//!
//! - [`LlmOracle`] prompts a [`Model`](crate::providers::Model) for a JSON
//!   object and decodes it against the contract.
//! - [`StaticOracle`] replays scripted outputs and records what it was asked,
//!   for tests and dry runs.

mod llm;

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};

pub use llm::LlmOracle;

use crate::contract::{ContractId, ContractInputs, ContractOutput, ContractSpec};
use crate::error::OracleError;

/// A component that fills a contract's output fields.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Invoke the oracle under a contract.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] when the backing model fails or its answer
    /// does not satisfy the contract's output shape.
    async fn invoke(
        &self,
        contract: &ContractSpec,
        inputs: &ContractInputs,
    ) -> Result<ContractOutput, OracleError>;
}

#[async_trait]
impl<O: Oracle + ?Sized> Oracle for std::sync::Arc<O> {
    async fn invoke(
        &self,
        contract: &ContractSpec,
        inputs: &ContractInputs,
    ) -> Result<ContractOutput, OracleError> {
        (**self).invoke(contract, inputs).await
    }
}

/// One recorded [`StaticOracle`] invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Contract the oracle was invoked under.
    pub contract: ContractId,
    /// Output fields the contract declared.
    pub outputs: Vec<&'static str>,
    /// Inputs as supplied.
    pub inputs: ContractInputs,
}

/// An oracle that replays scripted raw outputs.
///
/// Each raw output is decoded against the invoking contract exactly like a
/// model answer would be.
#[derive(Debug, Default)]
pub struct StaticOracle {
    replies: Mutex<VecDeque<Result<Map<String, Value>, OracleError>>>,
    delay: Option<Duration>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl StaticOracle {
    /// Create an oracle with no scripted output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw output. Non-object values are queued as unparseable.
    #[must_use]
    pub fn with_output(self, raw: Value) -> Self {
        let entry = match raw {
            Value::Object(map) => Ok(map),
            other => Err(OracleError::unparseable(other.to_string())),
        };
        self.lock_replies().push_back(entry);
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, error: OracleError) -> Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every invocation so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn lock_replies(
        &self,
    ) -> std::sync::MutexGuard<'_, VecDeque<Result<Map<String, Value>, OracleError>>> {
        self.replies.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Oracle for StaticOracle {
    async fn invoke(
        &self,
        contract: &ContractSpec,
        inputs: &ContractInputs,
    ) -> Result<ContractOutput, OracleError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                contract: contract.id,
                outputs: contract.outputs.iter().map(|f| f.name).collect(),
                inputs: inputs.clone(),
            });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.lock_replies().pop_front();
        let raw = next.ok_or_else(|| OracleError::unparseable("no scripted output left"))??;
        contract.decode_outputs(raw)
    }
}
