//! Promotion acquisition.
//!
//! This is the only write path into a unit's promotion list. All checks run
//! before the unit is touched, so a rejected request leaves it unchanged.

use crate::components::Unit;
use crate::data::{PromotionData, PromotionTable};
use crate::error::{GameError, PromotionRejection, Result};

/// Check whether `unit` may acquire promotion `id` right now.
///
/// # Errors
///
/// Returns [`GameError::InvalidPromotion`] naming the first failed check.
pub fn check_promotion<'t>(table: &'t PromotionTable, unit: &Unit, id: &str) -> Result<&'t PromotionData> {
    let promotion = table
        .get(id)
        .ok_or_else(|| GameError::invalid_promotion(id, PromotionRejection::Unknown))?;
    if unit.has_promotion(id) {
        return Err(GameError::invalid_promotion(id, PromotionRejection::AlreadyHeld));
    }
    if !promotion.allows(unit.category) {
        return Err(GameError::invalid_promotion(
            id,
            PromotionRejection::IneligibleCategory,
        ));
    }
    if !promotion.prerequisites_met(&unit.promotions) {
        return Err(GameError::invalid_promotion(
            id,
            PromotionRejection::PrerequisitesUnmet,
        ));
    }
    Ok(promotion)
}

/// Validate and append a promotion to the unit.
///
/// # Errors
///
/// Returns [`GameError::InvalidPromotion`] if the unit may not take it; the
/// unit is not modified in that case.
pub fn acquire_promotion(table: &PromotionTable, unit: &mut Unit, id: &str) -> Result<()> {
    let promotion = check_promotion(table, unit, id)?;
    unit.promotions.push(promotion.id.clone());
    tracing::debug!(unit = %unit.key, promotion = %promotion.name, "Promotion acquired");
    Ok(())
}

/// Promotions the unit could acquire right now, in table order.
#[must_use]
pub fn available_promotions<'t>(table: &'t PromotionTable, unit: &Unit) -> Vec<&'t PromotionData> {
    table
        .iter()
        .filter(|p| check_promotion(table, unit, &p.id).is_ok())
        .collect()
}
