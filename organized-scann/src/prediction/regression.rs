//! Least-squares estimate of days in maintenance

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{brand_factor, round2, PredictionError, Sample};

/// Relative tolerance below which the normal equations are treated as singular
const SINGULAR_EPSILON: f64 = 1e-9;

/// Longest estimate served, in days (one century)
pub const MAX_PREDICTED_DAYS: f64 = 36_500.0;

/// How far an estimate sits from the historical average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    /// Classify `value` by its z-score against `labels`
    pub fn of(value: f64, labels: &[f64]) -> Self {
        if labels.is_empty() {
            return Self::Low;
        }
        let n = labels.len() as f64;
        let mean = labels.iter().sum::<f64>() / n;
        let variance = labels.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        if std_dev == 0.0 {
            return Self::High;
        }

        match (value - mean).abs() / std_dev {
            z if z < 1.0 => Self::High,
            z if z < 2.0 => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// `days = intercept + year_coef * year + brand_coef * brand_factor`
///
/// When the samples do not determine both slopes the model degrades to the
/// mean label (both coefficients zero).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub year_coef: f64,
    pub brand_coef: f64,
}

impl LinearModel {
    /// Fit by ordinary least squares
    ///
    /// # Errors
    ///
    /// Fails when there are no samples.
    pub fn fit(samples: &[Sample]) -> Result<Self, PredictionError> {
        if samples.is_empty() {
            return Err(PredictionError::InsufficientData {
                needed: 1,
                found: 0,
            });
        }

        let n = samples.len() as f64;
        let mean_x1 = samples.iter().map(|s| s.year).sum::<f64>() / n;
        let mean_x2 = samples.iter().map(|s| s.brand_factor).sum::<f64>() / n;
        let mean_y = samples.iter().map(|s| s.days).sum::<f64>() / n;

        // Centered sums of squares and cross products
        let (mut s11, mut s12, mut s22, mut s1y, mut s2y) = (0.0, 0.0, 0.0, 0.0, 0.0);
        for s in samples {
            let (d1, d2, dy) = (s.year - mean_x1, s.brand_factor - mean_x2, s.days - mean_y);
            s11 += d1 * d1;
            s12 += d1 * d2;
            s22 += d2 * d2;
            s1y += d1 * dy;
            s2y += d2 * dy;
        }

        let det = s11 * s22 - s12 * s12;
        if det.abs() <= SINGULAR_EPSILON * (s11 * s22).max(f64::MIN_POSITIVE) {
            tracing::debug!(samples = samples.len(), "Singular design, using mean estimate");
            return Ok(Self {
                intercept: mean_y,
                year_coef: 0.0,
                brand_coef: 0.0,
            });
        }

        let year_coef = (s22 * s1y - s12 * s2y) / det;
        let brand_coef = (s11 * s2y - s12 * s1y) / det;
        Ok(Self {
            intercept: mean_y - year_coef * mean_x1 - brand_coef * mean_x2,
            year_coef,
            brand_coef,
        })
    }

    pub fn predict(&self, year: f64, brand_factor: f64) -> f64 {
        self.intercept + self.year_coef * year + self.brand_coef * brand_factor
    }
}

/// Estimated maintenance duration for a motorcycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
    pub predicted_days: f64,
    pub estimated_completion_date: DateTime<Utc>,
    pub confidence: Confidence,
}

/// Train on `samples` and estimate days in maintenance for `year`/`brand`
///
/// The estimate is never negative and is rounded to two decimals.
///
/// # Errors
///
/// Fails without samples, and when the fitted model extrapolates beyond
/// [`MAX_PREDICTED_DAYS`].
pub fn estimate(
    samples: &[Sample],
    year: i32,
    brand: &str,
    now: DateTime<Utc>,
) -> Result<Estimate, PredictionError> {
    let model = LinearModel::fit(samples)?;
    let days = model.predict(f64::from(year), brand_factor(brand)).max(0.0);

    if !days.is_finite() || days > MAX_PREDICTED_DAYS {
        return Err(PredictionError::OutOfRange { days });
    }

    let completion = TimeDelta::try_milliseconds((days * 86_400_000.0).round() as i64)
        .and_then(|offset| now.checked_add_signed(offset))
        .ok_or(PredictionError::OutOfRange { days })?;

    let labels: Vec<f64> = samples.iter().map(|s| s.days).collect();

    Ok(Estimate {
        predicted_days: round2(days),
        estimated_completion_date: completion,
        confidence: Confidence::of(days, &labels),
    })
}
