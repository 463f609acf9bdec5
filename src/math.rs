//! Robust statistics primitives shared by the normalization and filtering stages.

/// Three quartiles of a sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quartiles {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
}

impl Quartiles {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

pub fn arithmetic_mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Sample standard deviation; zero for fewer than two observations.
pub fn standard_deviation(x: &[f64]) -> f64 {
    if x.len() < 2 {
        return 0.0;
    }
    let mean = arithmetic_mean(x);
    let variance = x.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (x.len() - 1) as f64;
    variance.sqrt()
}

/// Linearly interpolated quantile of a sorted sample.
fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        sorted[lower] + (position - lower as f64) * (sorted[upper] - sorted[lower])
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    quartiles(values).map(|q| q.median)
}

pub fn quartiles(values: &[f64]) -> Option<Quartiles> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap());
    Some(Quartiles {
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
    })
}

/// Quantile of a weighted sample of `(value, weight)` pairs.
///
/// Returns the first value whose cumulative weight reaches `q` of the total.
pub fn weighted_quantile(samples: &[(f64, f64)], q: f64) -> Option<f64> {
    let total: f64 = samples.iter().map(|(_, w)| w).sum();
    if samples.is_empty() || total <= 0.0 {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let target = q * total;
    let mut cumulative = 0.0;
    for (value, weight) in &sorted {
        cumulative += weight;
        if cumulative >= target {
            return Some(*value);
        }
    }
    sorted.last().map(|(value, _)| *value)
}

pub fn weighted_median(samples: &[(f64, f64)]) -> Option<f64> {
    weighted_quantile(samples, 0.5)
}
