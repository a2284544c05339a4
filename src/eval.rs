//! Prediction error metrics.
//!
//! Signed percentage error and symmetric MAPE, computed per sample and over
//! whole validation series, plus the summary statistics logged after
//! evaluation.

/// Guard against division by zero for targets at exactly zero.
const EPS: f32 = 1e-8;

/// Signed percentage error of one prediction: `(p - a) / (a + eps) * 100`.
pub fn error_percentage(predicted: f32, actual: f32) -> f32 {
    (predicted - actual) / (actual + EPS) * 100.0
}

/// Symmetric mean absolute percentage error of one prediction, in `[0, 200]`.
///
/// Defined as `200 * |p - a| / (|p| + |a|)`, with 0 when both values are zero.
pub fn smape(predicted: f32, actual: f32) -> f32 {
    let denom = predicted.abs() + actual.abs();
    if denom == 0.0 {
        0.0
    } else {
        200.0 * (predicted - actual).abs() / denom
    }
}

/// Per-sample signed percentage errors over paired series.
pub fn error_percentage_series(predicted: &[f32], actual: &[f32]) -> Vec<f32> {
    predicted
        .iter()
        .zip(actual.iter())
        .map(|(&p, &a)| error_percentage(p, a))
        .collect()
}

/// Per-sample sMAPE over paired series.
pub fn smape_series(predicted: &[f32], actual: &[f32]) -> Vec<f32> {
    predicted
        .iter()
        .zip(actual.iter())
        .map(|(&p, &a)| smape(p, a))
        .collect()
}

/// Summary statistics of a metric series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSummary {
    pub mean: f32,
    pub std: f32,
    pub max: f32,
    pub min: f32,
}

impl SeriesSummary {
    /// Compute mean, population standard deviation and extrema.
    ///
    /// Returns all zeros for an empty series.
    pub fn from_values(values: &[f32]) -> Self {
        if values.is_empty() {
            return Self {
                mean: 0.0,
                std: 0.0,
                max: 0.0,
                min: 0.0,
            };
        }
        let n = values.len() as f32;
        let mean = values.iter().sum::<f32>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
        let max = values.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min = values.iter().cloned().fold(f32::INFINITY, f32::min);
        Self {
            mean,
            std: variance.sqrt(),
            max,
            min,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_percentage_signed() {
        assert!((error_percentage(110.0, 100.0) - 10.0).abs() < 1e-4);
        assert!((error_percentage(90.0, 100.0) + 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_error_percentage_zero_target_is_finite() {
        let err = error_percentage(1.0, 0.0);
        assert!(err.is_finite());
    }

    #[test]
    fn test_smape_both_zero() {
        assert_eq!(smape(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_smape_bounds() {
        // Opposite-sign values hit the 200 ceiling.
        assert!((smape(1.0, -1.0) - 200.0).abs() < 1e-4);
        assert_eq!(smape(5.0, 5.0), 0.0);
        let v = smape(110.0, 100.0);
        assert!(v > 0.0 && v < 200.0);
    }

    #[test]
    fn test_smape_symmetric() {
        assert_eq!(smape(80.0, 100.0), smape(100.0, 80.0));
    }

    #[test]
    fn test_series_helpers() {
        let predicted = [110.0, 90.0];
        let actual = [100.0, 100.0];
        let errors = error_percentage_series(&predicted, &actual);
        assert_eq!(errors.len(), 2);
        assert!(errors[0] > 0.0 && errors[1] < 0.0);

        let smapes = smape_series(&predicted, &actual);
        assert!((smapes[0] - smapes[1]).abs() < 0.5);
    }

    #[test]
    fn test_summary_population_std() {
        let summary = SeriesSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((summary.mean - 5.0).abs() < 1e-5);
        assert!((summary.std - 2.0).abs() < 1e-5);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.min, 2.0);
    }

    #[test]
    fn test_summary_empty_series() {
        let summary = SeriesSummary::from_values(&[]);
        assert_eq!(summary.mean, 0.0);
        assert_eq!(summary.std, 0.0);
    }
}
