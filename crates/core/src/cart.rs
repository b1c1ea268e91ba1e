//! Cart item types
//!
//! The cart has an independent lifetime from the voice session: it is
//! durable, keyed by wine id, and never cleared by session teardown.

use serde::{Deserialize, Serialize};

use crate::wine::Wine;

/// A selected item in the cart.
///
/// `price` is a snapshot captured at add-time; subsequent catalog price
/// changes do not retroactively alter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub wine_id: i64,
    pub name: String,
    pub winery: String,
    pub price: f64,
    pub quantity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl CartItem {
    /// Build a single-quantity item from a catalog record.
    pub fn from_wine(wine: &Wine) -> Self {
        Self {
            wine_id: wine.id,
            name: wine.name.clone(),
            winery: wine.winery.clone(),
            price: wine.price_retail,
            quantity: 1,
            image_url: wine.image_url.clone(),
        }
    }

    /// Line total for this item.
    pub fn line_total(&self) -> f64 {
        self.price * self.quantity as f64
    }
}
