//! Simulated uncertainty intervals.
//!
//! Future trend uncertainty comes from sampling new changepoints past the
//! end of history: their count is Poisson with the historical changepoint
//! rate, locations are uniform, magnitudes are Laplace with the mean
//! absolute fitted change as scale. Observation noise is Gaussian with the
//! fitted residual scale. All draws are seeded per sample or per date from
//! a `SeedHierarchy`, so the result does not depend on thread scheduling.

use rand::Rng;
use rand_distr::{Distribution, Normal, Poisson};
use rayon::prelude::*;

use crate::rng::SeedHierarchy;

/// Inputs to the simulation, all in scaled units.
#[derive(Debug, Clone)]
pub struct SimulationInput<'a> {
    /// Scaled time for each predicted date (ascending).
    pub t: &'a [f64],
    /// Point trend at each `t`.
    pub trend: &'a [f64],
    /// Sum of seasonal components at each `t`.
    pub seasonal: &'a [f64],
    /// Scaled time of the last observation.
    pub t_end: f64,
    /// Number of fitted changepoints per unit of scaled time.
    pub changepoint_rate: f64,
    /// Mean absolute fitted rate change (Laplace scale).
    pub mean_abs_delta: f64,
    /// Residual standard deviation.
    pub sigma: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub trend_lower: f64,
    pub trend_upper: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct SimulationSettings {
    pub samples: usize,
    pub interval_width: f64,
    pub seeds: SeedHierarchy,
}

/// Laplace(0, scale) via the inverse CDF.
fn laplace<R: Rng>(rng: &mut R, scale: f64) -> f64 {
    let u: f64 = rng.gen_range(-0.5..0.5);
    -scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
}

/// Linear-interpolated quantile of an ascending slice.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Future changepoints `(location, delta)` for one simulated path.
fn sample_changepoints(
    input: &SimulationInput<'_>,
    t_max: f64,
    seeds: &SeedHierarchy,
    sample: u64,
) -> Vec<(f64, f64)> {
    let span = t_max - input.t_end;
    let expected = input.changepoint_rate * span;
    if span <= 0.0 || expected <= 0.0 {
        return Vec::new();
    }
    let Ok(poisson) = Poisson::new(expected) else {
        return Vec::new();
    };
    let mut rng = seeds.rng_for("changepoints", sample);
    let count = poisson.sample(&mut rng) as usize;
    let scale = input.mean_abs_delta + 1e-8;
    let mut cps: Vec<(f64, f64)> = (0..count)
        .map(|_| {
            let at = input.t_end + rng.gen::<f64>() * span;
            (at, laplace(&mut rng, scale))
        })
        .collect();
    cps.sort_by(|a, b| a.0.total_cmp(&b.0));
    cps
}

/// Lower/upper bounds for trend and prediction at every input point.
pub fn simulate(input: &SimulationInput<'_>, settings: &SimulationSettings) -> Vec<Interval> {
    let n = input.t.len();
    if settings.samples == 0 {
        return (0..n)
            .map(|i| {
                let yhat = input.trend[i] + input.seasonal[i];
                Interval {
                    trend_lower: input.trend[i],
                    trend_upper: input.trend[i],
                    lower: yhat,
                    upper: yhat,
                }
            })
            .collect();
    }

    let t_max = input.t.last().copied().unwrap_or(input.t_end);
    let paths: Vec<Vec<(f64, f64)>> = (0..settings.samples as u64)
        .into_par_iter()
        .map(|s| sample_changepoints(input, t_max, &settings.seeds, s))
        .collect();

    let lo_q = (1.0 - settings.interval_width) / 2.0;
    let hi_q = 1.0 - lo_q;
    let noise = Normal::new(0.0, input.sigma.max(0.0)).ok();

    (0..n)
        .into_par_iter()
        .map(|i| {
            let t = input.t[i];
            let mut trends: Vec<f64> = paths
                .iter()
                .map(|cps| {
                    let extra: f64 = cps
                        .iter()
                        .take_while(|(at, _)| *at < t)
                        .map(|(at, delta)| delta * (t - at))
                        .sum();
                    input.trend[i] + extra
                })
                .collect();

            let mut rng = settings.seeds.rng_for("noise", i as u64);
            let mut yhats: Vec<f64> = trends
                .iter()
                .map(|tr| {
                    let eps = noise.map_or(0.0, |d| d.sample(&mut rng));
                    tr + input.seasonal[i] + eps
                })
                .collect();

            trends.sort_by(f64::total_cmp);
            yhats.sort_by(f64::total_cmp);
            Interval {
                trend_lower: quantile(&trends, lo_q),
                trend_upper: quantile(&trends, hi_q),
                lower: quantile(&yhats, lo_q),
                upper: quantile(&yhats, hi_q),
            }
        })
        .collect()
}
