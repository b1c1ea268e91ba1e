//! Core types for the sommelier voice shop
//!
//! This crate provides the domain types shared across all other crates:
//! - Wine catalog records and active filter predicates
//! - Tool call events emitted by the voice service
//! - Derived shopping UI state (featured wine, discussed shelf)
//! - Cart item types
//! - Error taxonomy

pub mod cart;
pub mod error;
pub mod filters;
pub mod shop_state;
pub mod tool_call;
pub mod wine;

pub use cart::CartItem;
pub use error::{Error, Result};
pub use filters::ActiveFilters;
pub use shop_state::{DiscussedWines, ShopState, UiState, DEFAULT_DISCUSSED_CAPACITY};
pub use tool_call::{ToolCallEvent, ToolName};
pub use wine::Wine;
