use ndarray::ArrayView1;

/// Mean of the present values, `None` when there are none.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(statrs::statistics::Statistics::mean(values))
    }
}

/// Mean over an iterator of optional values, skipping the missing ones.
pub fn mean_of<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let present: Vec<f64> = values.into_iter().flatten().collect();
    mean(&present)
}

/// Rounds to one decimal place, halves away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Pearson correlation coefficient. `None` for mismatched lengths, fewer than two
/// points or a zero-variance input.
pub fn pearson(x: &ArrayView1<'_, f64>, y: &ArrayView1<'_, f64>) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let x_mean = x.mean()?;
    let y_mean = y.mean()?;

    let numerator: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(&xi, &yi)| (xi - x_mean) * (yi - y_mean))
        .sum();
    let x_spread = x.iter().map(|&xi| (xi - x_mean).powi(2)).sum::<f64>().sqrt();
    let y_spread = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum::<f64>().sqrt();

    if x_spread > 0.0 && y_spread > 0.0 {
        Some(numerator / (x_spread * y_spread))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn mean_skips_missing_values() {
        assert_eq!(mean_of([Some(70.0), None, Some(74.0)]), Some(72.0));
        assert_eq!(mean_of([None, None]), None);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn round1_rounds_halves_away_from_zero() {
        assert_eq!(round1(72.25), 72.3);
        assert_eq!(round1(-0.05), -0.1);
        assert_eq!(round1(41.400000000000006), 41.4);
    }

    #[test]
    fn pearson_detects_perfect_and_flat_series() {
        let x = array![1.0, 2.0, 3.0, 4.0];
        let y = array![2.0, 4.0, 6.0, 8.0];
        let r = pearson(&x.view(), &y.view()).unwrap();
        assert!((r - 1.0).abs() < 1e-12);

        let flat = array![5.0, 5.0, 5.0, 5.0];
        assert_eq!(pearson(&x.view(), &flat.view()), None);
    }
}
