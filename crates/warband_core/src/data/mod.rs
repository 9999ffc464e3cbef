//! Data structures for static game configuration.
//!
//! Promotions and unit types are deserialized from RON. The shipped tables
//! are embedded at compile time; callers that read files hand the text to
//! the `from_ron_str` constructors.
//!
//! **Note:** This module contains no IO.

mod promotion_data;
mod unit_data;

pub use promotion_data::{PromotionData, PromotionTable, MAX_BONUS_MAGNITUDE};
pub use unit_data::{UnitType, UnitTypeTable, MAX_UNIT_STRENGTH};
