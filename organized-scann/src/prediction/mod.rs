//! Maintenance-time estimation and maintenance pattern analysis
//!
//! Both models are trained on demand from the motorcycles currently stored.
//! A motorcycle contributes a sample when it has a year and a non-blank
//! brand; its label is the number of days between entry and forecast
//! availability.

mod clustering;
mod regression;

pub use clustering::{analyze_patterns, ClusterSummary, PatternReport, CLUSTER_COUNT};
pub use regression::{estimate, Confidence, Estimate, LinearModel, MAX_PREDICTED_DAYS};

use thiserror::Error;

use crate::error::Error;
use crate::models::Motorcycle;

/// Reliability weight for a manufacturer (case-insensitive)
pub fn brand_factor(brand: &str) -> f64 {
    match brand.trim().to_ascii_uppercase().as_str() {
        "HONDA" => 1.0,
        "YAMAHA" => 1.1,
        "SUZUKI" => 1.2,
        "KAWASAKI" => 1.3,
        "BMW" => 1.5,
        _ => 1.4,
    }
}

/// One training observation
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub year: f64,
    pub brand: String,
    pub brand_factor: f64,
    pub days: f64,
}

impl Sample {
    pub fn new(year: i32, brand: &str, days: f64) -> Self {
        Self {
            year: f64::from(year),
            brand: brand.trim().to_ascii_uppercase(),
            brand_factor: brand_factor(brand),
            days,
        }
    }

    /// Sample for a stored motorcycle, if it carries a year and a brand
    pub fn from_motorcycle(motorcycle: &Motorcycle) -> Option<Self> {
        let year = motorcycle.year.filter(|y| *y > 0)?;
        let brand = motorcycle.brand.as_deref().filter(|b| !b.trim().is_empty())?;
        Some(Self::new(year, brand, motorcycle.maintenance_days()))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictionError {
    #[error(
        "Not enough data: {needed} motorcycles with year and brand are required, found {found}"
    )]
    InsufficientData { needed: usize, found: usize },

    #[error("Estimated maintenance time of {days:.0} days is outside the supported range")]
    OutOfRange { days: f64 },
}

impl From<PredictionError> for Error {
    fn from(err: PredictionError) -> Self {
        Error::BadRequest(err.to_string())
    }
}

/// Round to two decimal places
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
