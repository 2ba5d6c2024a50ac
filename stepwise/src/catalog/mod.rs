//! Action catalog construction.
//!
//! An [`ActionCatalog`] is everything the oracle may choose from for one
//! planning call: the caller's domain actions plus the universal control
//! actions (`WRAP_UP`, `GENERAL_CHAT` and, for a task that has not been
//! switched yet, `SWITCH_TASK`).
//!
//! Names are held in canonical form. A small alias table renames some
//! actions when the catalog is shown to the oracle; the
//! [normalizer](crate::normalize) maps them back with [`canonical_name`].

pub mod builtin;
pub mod domain;

use std::collections::HashSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub use builtin::{GENERAL_CHAT, SWITCH_TASK, WRAP_UP};
pub use domain::CREATE_TOKEN;

/// Oracle-facing label for [`CREATE_TOKEN`].
pub const LAUNCH_TOKEN: &str = "LAUNCH_TOKEN";

/// `(canonical, display)` pairs.
const DISPLAY_ALIASES: &[(&str, &str)] = &[(CREATE_TOKEN, LAUNCH_TOKEN)];

/// Names callers may not declare themselves.
const RESERVED_NAMES: &[&str] = &[WRAP_UP, GENERAL_CHAT, SWITCH_TASK, LAUNCH_TOKEN];

/// Name under which an action is presented to the oracle.
#[must_use]
pub fn display_name(canonical: &str) -> &str {
    DISPLAY_ALIASES
        .iter()
        .find(|(c, _)| *c == canonical)
        .map_or(canonical, |(_, d)| d)
}

/// Canonical name for a name produced by the oracle.
#[must_use]
pub fn canonical_name(display: &str) -> &str {
    DISPLAY_ALIASES
        .iter()
        .find(|(_, d)| *d == display)
        .map_or(display, |(c, _)| c)
}

/// Description of one action the oracle may choose.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDescriptor {
    /// Unique action identifier.
    pub name: String,
    /// What the action does.
    pub description: String,
    /// JSON Schema of the action parameters.
    #[serde(default, alias = "parameters")]
    pub parameter_schema: Value,
}

impl ActionDescriptor {
    /// Create a descriptor from an explicit schema.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameter_schema: Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameter_schema,
        }
    }

    /// Create a descriptor whose schema is derived from a parameter type.
    #[must_use]
    pub fn for_params<T: JsonSchema>(
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let mut schema = schemars::schema_for!(T).to_value();
        if let Some(object) = schema.as_object_mut() {
            object.remove("$schema");
        }
        Self::new(name, description, schema)
    }

    /// Function-calling shape shown to the oracle, under the display name.
    #[must_use]
    pub fn oracle_view(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": display_name(&self.name),
                "description": self.description,
                "parameters": self.parameter_schema,
            }
        })
    }
}

/// The deduplicated, ordered set of actions offered for one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionCatalog {
    actions: Vec<ActionDescriptor>,
}

impl ActionCatalog {
    /// Build the catalog for a call.
    ///
    /// `None` entries are skipped. Caller entries that reuse a reserved name
    /// or repeat an earlier name are dropped. The universal actions are
    /// appended last; `SWITCH_TASK` only while `switched_task` is false.
    #[must_use]
    pub fn build<I>(actions: I, switched_task: bool) -> Self
    where
        I: IntoIterator<Item = Option<ActionDescriptor>>,
    {
        let mut seen = HashSet::new();
        let mut catalog = Vec::new();

        for action in actions.into_iter().flatten() {
            if RESERVED_NAMES.contains(&action.name.as_str()) {
                warn!(action = %action.name, "dropping caller action with reserved name");
                continue;
            }
            if !seen.insert(action.name.clone()) {
                warn!(action = %action.name, "dropping duplicate caller action");
                continue;
            }
            catalog.push(action);
        }

        catalog.extend(builtin::universal_actions(switched_task));
        debug!(size = catalog.len(), switched_task, "action catalog built");

        Self { actions: catalog }
    }

    /// The catalog without one action.
    #[must_use]
    pub fn without(mut self, name: &str) -> Self {
        self.actions.retain(|a| a.name != name);
        self
    }

    /// Actions in catalog order, canonical names.
    #[must_use]
    pub fn actions(&self) -> &[ActionDescriptor] {
        &self.actions
    }

    /// Number of actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the catalog is empty. Never true for a built catalog.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Whether a canonical action name is offered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }

    /// Look up an action by canonical name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ActionDescriptor> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Canonical names in catalog order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.actions.iter().map(|a| a.name.clone()).collect()
    }

    /// Names as the oracle sees them.
    #[must_use]
    pub fn display_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| display_name(&a.name)).collect()
    }

    /// The catalog as a JSON array of function definitions.
    #[must_use]
    pub fn oracle_view(&self) -> Value {
        Value::Array(self.actions.iter().map(ActionDescriptor::oracle_view).collect())
    }
}
