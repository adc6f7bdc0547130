//! Small summary statistics used by the trainer and the reports.

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Root mean squared error between aligned slices.
///
/// Returns NaN for empty or mismatched input so callers' finiteness checks
/// catch it.
pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return f64::NAN;
    }
    let sse: f64 = predicted.iter().zip(actual).map(|(p, a)| (p - a) * (p - a)).sum();
    (sse / predicted.len() as f64).sqrt()
}

/// Mean absolute error between aligned slices (NaN on empty/mismatch).
pub fn mae(predicted: &[f64], actual: &[f64]) -> f64 {
    if predicted.is_empty() || predicted.len() != actual.len() {
        return f64::NAN;
    }
    predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum::<f64>() / predicted.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rmse_and_mae_of_known_residuals() {
        let p = [1.0, 2.0, 3.0, 4.0];
        let a = [1.0, 0.0, 3.0, 6.0];
        assert!((rmse(&p, &a) - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!((mae(&p, &a) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[10.0, 20.0]), Some(15.0));
        assert!(rmse(&[], &[]).is_nan());
        assert!(rmse(&[1.0], &[1.0, 2.0]).is_nan());
    }
}
