// src/metrics.rs
//
// Small running-statistics helpers for response times and the batch
// simulation harness.
// - OnlineStats: Welford running mean/variance + min/max.
// - percentile / p05_p50_p95: linear-interpolated quantiles of a sample.

#[derive(Debug, Clone, Copy)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl Default for OnlineStats {
    fn default() -> Self {
        Self {
            n: 0,
            mean: 0.0,
            m2: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl OnlineStats {
    /// Adds a sample if finite. Non-finite samples are ignored.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.n += 1;
        self.min = self.min.min(x);
        self.max = self.max.max(x);

        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        self.m2 += delta * (x - self.mean);
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn min(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.min
        }
    }

    pub fn max(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.max
        }
    }

    /// Sample variance (divide by n-1).
    pub fn variance_sample(&self) -> f64 {
        if self.n <= 1 {
            0.0
        } else {
            self.m2 / ((self.n as f64) - 1.0)
        }
    }

    pub fn stddev_sample(&self) -> f64 {
        self.variance_sample().sqrt()
    }
}

/// Quantile `p01` ∈ [0, 1] of an ascending slice. NaN for an empty slice.
pub fn percentile(sorted: &[f64], p01: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let idx = p01.clamp(0.0, 1.0) * (sorted.len().saturating_sub(1) as f64);
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        return sorted[lo];
    }
    let w = idx - (lo as f64);
    sorted[lo] * (1.0 - w) + sorted[hi] * w
}

pub fn p05_p50_p95(mut xs: Vec<f64>) -> (f64, f64, f64) {
    xs.retain(|x| x.is_finite());
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    (
        percentile(&xs, 0.05),
        percentile(&xs, 0.50),
        percentile(&xs, 0.95),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welford_matches_closed_form() {
        let mut s = OnlineStats::default();
        for x in [0.3, 0.4, 0.5, f64::NAN, 0.6] {
            s.add(x);
        }
        assert_eq!(s.n(), 4);
        assert!((s.mean() - 0.45).abs() < 1e-12);
        // Sample variance of {0.3, 0.4, 0.5, 0.6} = 0.05 / 3.
        assert!((s.variance_sample() - 0.05 / 3.0).abs() < 1e-12);
        assert_eq!(s.min(), 0.3);
        assert_eq!(s.max(), 0.6);
    }

    #[test]
    fn percentile_interpolates() {
        let xs = [0.0, 10.0];
        assert_eq!(percentile(&xs, 0.5), 5.0);
        assert!(percentile(&[], 0.5).is_nan());
        let (p05, p50, p95) = p05_p50_p95(vec![3.0, 1.0, 2.0]);
        assert!((p50 - 2.0).abs() < 1e-12);
        assert!(p05 < p50 && p50 < p95);
    }
}
