//! Rating data module.
//!
//! This module provides:
//! - Rating event types and filters (polarity, role)
//! - Point-in-time visibility rules
//! - The ordered, indexed rating store
//! - CSV adapters for ratings and feature tables

mod loader;
mod store;
mod types;
mod view;

pub use loader::{parse_timestamp, DataLoader, RatingRecord};
pub use store::RatingStore;
pub use types::{EdgeColor, Polarity, RatingEvent, Role, UserId, WeightClass, WindowCount};
pub use view::{TemporalView, VisibilityPolicy};
