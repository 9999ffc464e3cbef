//! Data validation utilities.
//!
//! Loads `promotions.ron` and `units.ron` from a directory, runs the table
//! validation the game applies at load time, then cross-checks the two.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use warband_core::data::{PromotionTable, UnitTypeTable};
use warband_core::error::GameError;

/// File name of the promotion table.
pub const PROMOTIONS_FILE: &str = "promotions.ron";
/// File name of the unit type table.
pub const UNITS_FILE: &str = "units.ron";

/// Error type for data validation.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// A required data file is missing.
    #[error("Data file not found: {}", .0.display())]
    Missing(PathBuf),
    /// A data file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A data file failed to parse or validate.
    #[error("{}: {source}", path.display())]
    Data {
        /// File that failed.
        path: PathBuf,
        /// Parse or validation error.
        #[source]
        source: GameError,
    },
}

/// Summary of a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// Promotion table version.
    pub promotions_version: u32,
    /// Number of promotions.
    pub promotions: usize,
    /// Unit type table version.
    pub units_version: u32,
    /// Number of unit types.
    pub unit_types: usize,
    /// Non-fatal findings.
    pub warnings: Vec<String>,
}

fn read(path: &Path) -> Result<String, ValidationError> {
    if !path.exists() {
        return Err(ValidationError::Missing(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Promotions no unit type in the table can ever take.
fn unused_promotions(promotions: &PromotionTable, units: &UnitTypeTable) -> Vec<String> {
    let categories: BTreeSet<_> = units.iter().map(|u| u.category).collect();
    promotions
        .iter()
        .filter(|p| !categories.iter().any(|&c| p.allows(c)))
        .map(|p| format!("promotion '{}' is not available to any unit type", p.id))
        .collect()
}

/// Validate the promotion and unit type tables in a directory.
///
/// # Errors
///
/// Returns the first file that is missing, unreadable, malformed or
/// inconsistent. Validation errors list every problem in that file.
pub fn validate_data_directory(dir: &Path) -> Result<ValidationReport, ValidationError> {
    let promotions_path = dir.join(PROMOTIONS_FILE);
    let units_path = dir.join(UNITS_FILE);

    let promotions = PromotionTable::from_ron_str(
        &promotions_path.display().to_string(),
        &read(&promotions_path)?,
    )
    .map_err(|source| ValidationError::Data {
        path: promotions_path.clone(),
        source,
    })?;
    tracing::debug!(count = promotions.len(), "Promotion table valid");

    let units = UnitTypeTable::from_ron_str(&units_path.display().to_string(), &read(&units_path)?)
        .map_err(|source| ValidationError::Data {
            path: units_path.clone(),
            source,
        })?;
    tracing::debug!(count = units.len(), "Unit type table valid");

    units
        .check_promotions(&promotions)
        .map_err(|source| ValidationError::Data {
            path: units_path,
            source,
        })?;

    let warnings = unused_promotions(&promotions, &units);
    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    Ok(ValidationReport {
        promotions_version: promotions.version(),
        promotions: promotions.len(),
        units_version: units.version(),
        unit_types: units.len(),
        warnings,
    })
}
