use serde::{Deserialize, Serialize};

/// Streaming mean and standard deviation (Welford).
#[derive(Debug, Default)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccumulatorReport {
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals - 1) as f64).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

/// Stored series whose report discards an initial transient.
#[derive(Debug, Default)]
pub struct TimeSeries {
    vals: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    /// Index where the stationary part of the series starts.
    pub i_equil: usize,
}

impl TimeSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    pub fn report(&self) -> TimeSeriesReport {
        let i_equil = equilibration_index(&self.vals);
        let tail = &self.vals[i_equil..];
        TimeSeriesReport {
            mean: mean(tail),
            std_dev: variance(tail).sqrt(),
            sem: blocking_sem(tail),
            i_equil,
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn variance(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    vals.iter().map(|&val| (val - mean).powi(2)).sum::<f64>() / (vals.len() - 1) as f64
}

/// Standard error of the mean of a correlated series (Flyvbjerg-Petersen blocking).
fn blocking_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut sem2_ests = Vec::new();
    let mut sem2_errs = Vec::new();

    while blocks.len() >= 2 {
        let n_blocks = blocks.len() as f64;
        let sem2_est = variance(&blocks) / n_blocks;
        sem2_ests.push(sem2_est);
        sem2_errs.push(sem2_est * (2.0 / (n_blocks - 1.0)).sqrt());

        blocks = blocks
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
    }

    // First blocking level that is statistically compatible with every coarser one.
    for (level, &sem2_est) in sem2_ests.iter().enumerate() {
        let max_low = sem2_ests[level..]
            .iter()
            .zip(&sem2_errs[level..])
            .map(|(est, err)| est - err)
            .fold(f64::NEG_INFINITY, f64::max);
        if sem2_est > max_low {
            return sem2_est.sqrt();
        }
    }

    sem2_ests.last().copied().unwrap_or(f64::NAN).sqrt()
}

/// Start of the stationary part of a series (marginal standard error rule),
/// searched over the cut points `0, 1, 2, 4, ..., n / 2`.
fn equilibration_index(vals: &[f64]) -> usize {
    let n_vals = vals.len();
    if n_vals < 4 {
        return 0;
    }

    let mut min_mse = f64::INFINITY;
    let mut opt_i_equil = 0;
    let n_cuts = n_vals.ilog2();
    let candidates = std::iter::once(0).chain((1..=n_cuts).rev().map(|k| n_vals >> k));

    for i_equil in candidates {
        let tail = &vals[i_equil..];
        let n_tail = tail.len();
        if n_tail < 2 {
            continue;
        }
        let mse = variance(tail) * (n_tail - 1) as f64 / (n_tail * n_tail) as f64;
        if mse < min_mse {
            min_mse = mse;
            opt_i_equil = i_equil;
        }
    }

    opt_i_equil
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_matches_direct_formulas() {
        let vals = [1.0, 2.0, 4.0, 7.0];
        let mut acc = Accumulator::new();
        vals.iter().for_each(|&val| acc.add(val));
        let report = acc.report();
        assert!((report.mean - 3.5).abs() < 1e-12);
        assert!((report.std_dev - variance(&vals).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_accumulator_reports_nan() {
        let report = Accumulator::new().report();
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn transient_is_discarded() {
        let mut series = TimeSeries::new();
        for i in 0..64 {
            series.push(100.0 - f64::from(i));
        }
        for i in 0..448 {
            series.push(if i % 2 == 0 { 1.0 } else { -1.0 });
        }
        let report = series.report();
        assert!(report.i_equil >= 64);
        assert!(report.mean.abs() < 0.1);
        assert!(report.sem.is_finite());
    }

    #[test]
    fn short_series_do_not_panic() {
        let mut series = TimeSeries::new();
        assert!(series.report().mean.is_nan());
        series.push(3.0);
        let report = series.report();
        assert_eq!(report.mean, 3.0);
        assert_eq!(report.i_equil, 0);
    }
}
