//! Wine catalog records
//!
//! The catalog is read-only from this core's point of view: records are
//! produced by the catalog store and never mutated here. Prices are held
//! as raw numbers; currency formatting happens only at the response
//! boundary via [`Wine::display_price`].

use serde::{Deserialize, Serialize};

/// A wine catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wine {
    pub id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub name: String,
    pub winery: String,
    pub region: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grape_variety: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vintage: Option<i32>,
    pub wine_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Retail price in GBP
    pub price_retail: f64,
    /// Trade price in GBP
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_trade: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottle_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasting_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub food_pairings: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub critic_scores: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drinking_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supplier: Option<String>,
    pub is_active: bool,
}

impl Wine {
    /// Retail price formatted for the voice/UI boundary, e.g. `£45.00`.
    pub fn display_price(&self) -> String {
        format_gbp(self.price_retail)
    }

    /// Trade price formatted for the voice/UI boundary, if present.
    pub fn display_trade_price(&self) -> Option<String> {
        self.price_trade.map(format_gbp)
    }
}

/// Format a GBP amount with the currency symbol.
pub fn format_gbp(amount: f64) -> String {
    format!("£{amount:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_wine(id: i64, price: f64) -> Wine {
        Wine {
            id,
            slug: None,
            name: format!("Wine {id}"),
            winery: "Test Winery".into(),
            region: "Bordeaux".into(),
            country: "France".into(),
            grape_variety: Some("Merlot".into()),
            vintage: Some(2018),
            wine_type: "red".into(),
            style: Some("bold".into()),
            color: Some("red".into()),
            price_retail: price,
            price_trade: None,
            bottle_size: Some("750ml".into()),
            tasting_notes: None,
            food_pairings: None,
            critic_scores: None,
            drinking_window: None,
            image_url: None,
            supplier: None,
            is_active: true,
        }
    }

    #[test]
    fn test_display_price_is_boundary_only() {
        let wine = sample_wine(1, 45.0);
        assert_eq!(wine.display_price(), "£45.00");
        // Raw value stays numeric for filtering and sorting.
        assert_eq!(wine.price_retail, 45.0);
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let wine = sample_wine(1, 45.0);
        let json = serde_json::to_value(&wine).unwrap();
        assert!(json.get("price_trade").is_none());
        assert_eq!(json["name"], "Wine 1");
    }
}
