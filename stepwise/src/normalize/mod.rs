//! Decision normalization.
//!
//! The oracle's raw answer is never trusted as-is. [`DecisionNormalizer`]
//! turns it into an authoritative [`Decision`]:
//!
//! 1. Strip one stray leading and trailing quote from `action` and
//!    `explanation`.
//! 2. Map a display alias back to its canonical action name.
//! 3. Render every floating-point parameter as plain decimal text.
//! 4. Reject an action that was not in the offered catalog.
//!
//! Applying the normalizer to its own output changes nothing.

pub mod numeric;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::{ActionCatalog, canonical_name};
use crate::error::{Error, Result};
use crate::types::Decision;

pub use numeric::{plain, render_decimals};

/// Normalizes raw oracle decisions against the catalog they were offered.
#[derive(Debug, Clone, Copy)]
pub struct DecisionNormalizer<'a> {
    catalog: &'a ActionCatalog,
}

impl<'a> DecisionNormalizer<'a> {
    /// Create a normalizer for one catalog.
    #[must_use]
    pub const fn new(catalog: &'a ActionCatalog) -> Self {
        Self { catalog }
    }

    /// Normalize a raw decision.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogViolation`] when the action is not offered and
    /// [`Error::Normalization`] when a parameter cannot be rendered.
    pub fn normalize(&self, raw: Decision) -> Result<Decision> {
        let action = self.normalize_action(&raw.action)?;
        let parameters = normalize_parameters(raw.parameters)?;
        let explanation = strip_quotes(&raw.explanation).to_string();

        Ok(Decision {
            action,
            parameters,
            explanation,
        })
    }

    /// Canonical, catalog-checked action name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CatalogViolation`] when the action is not offered.
    pub fn normalize_action(&self, raw: &str) -> Result<String> {
        let unquoted = strip_quotes(raw.trim()).trim();
        let action = canonical_name(unquoted);
        if action != unquoted {
            debug!(display = unquoted, canonical = action, "reversed action alias");
        }

        if self.catalog.contains(action) {
            Ok(action.to_string())
        } else {
            warn!(action, "oracle chose an action outside the offered catalog");
            Err(Error::catalog_violation(action, self.catalog.names()))
        }
    }
}

/// Render numeric leaves of a parameter mapping.
///
/// # Errors
///
/// Returns [`Error::Normalization`] naming the first leaf that cannot be
/// rendered.
pub fn normalize_parameters(mut parameters: Map<String, Value>) -> Result<Map<String, Value>> {
    let mut path = String::from("/parameters");
    for (key, value) in &mut parameters {
        let len = path.len();
        numeric::push_segment(&mut path, key);
        render_decimals(value, &mut path)?;
        path.truncate(len);
    }
    Ok(parameters)
}

/// Remove one leading and one trailing `"` or `'`, if present.
#[must_use]
pub fn strip_quotes(text: &str) -> &str {
    let text = text.strip_prefix(['"', '\'']).unwrap_or(text);
    text.strip_suffix(['"', '\'']).unwrap_or(text)
}
