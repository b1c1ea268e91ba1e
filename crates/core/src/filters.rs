//! Active catalog filters
//!
//! A sparse record of optional predicates. Absence of a field means
//! "unconstrained", not "empty string". Tool calls replace the whole
//! record rather than merging into it.

use serde::{Deserialize, Serialize};

/// The current set of catalog constraints implied by the most recent
/// search or recommend tool call (or an explicit user filter action).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveFilters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wine_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grape_variety: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_price: Option<f64>,
}

impl ActiveFilters {
    /// True when no predicate is set.
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.region.is_none()
            && self.wine_type.is_none()
            && self.color.is_none()
            && self.grape_variety.is_none()
            && self.style.is_none()
            && self.vintage.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
    }

    /// Parse filters out of tool call arguments. Unknown fields are
    /// ignored; present fields must have the right JSON type.
    pub fn from_arguments(args: &serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(args.clone())
            .map_err(|e| crate::Error::Validation(format!("invalid filter shape: {e}")))
    }
}
