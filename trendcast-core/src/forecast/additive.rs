//! Additive decomposition model: piecewise-linear trend plus Fourier
//! seasonalities, fitted by penalised least squares.
//!
//! `y(t) = trend(t) + Σ seasonal_k(t) + ε`, with
//! `trend(t) = m + k·t + Σ δ_j (t - s_j)+` over changepoints `s_j`.
//!
//! Values are divided by `max |y|` and time is mapped onto `[0, 1]` before
//! fitting. Gaussian priors on every coefficient turn the MAP estimate into
//! a ridge regression; the first pass estimates the noise variance that
//! sets the second pass's penalties.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::features::{changepoints, trend_row, Seasonality, TimeScale};
use super::linalg::Design;
use super::model::{check_input, FitError, ForecastModel};
use super::result::{ForecastPoint, Prediction};
use super::uncertainty::{simulate, SimulationInput, SimulationSettings};
use crate::domain::series::ForecastInput;
use crate::rng::SeedHierarchy;

/// Prior scale for the intercept and base slope; effectively unpenalised.
const BASE_PRIOR_SCALE: f64 = 5.0;
const MIN_VARIANCE: f64 = 1e-10;
/// Floor for the estimated noise variance, as a share of the total variance.
const MIN_NOISE_SHARE: f64 = 1e-4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// Enabled when the history is long and dense enough.
    #[default]
    Auto,
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    pub n_changepoints: usize,
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub yearly: SeasonalityMode,
    pub weekly: SeasonalityMode,
    pub interval_width: f64,
    pub uncertainty_samples: usize,
    pub seed: u64,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self {
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            yearly: SeasonalityMode::Auto,
            weekly: SeasonalityMode::Auto,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
struct Fitted {
    scale: TimeScale,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    beta: Vec<f64>,
    sigma: f64,
}

impl Fitted {
    fn trend_width(&self) -> usize {
        2 + self.changepoints.len()
    }

    fn trend_at(&self, t: f64) -> f64 {
        trend_row(t, &self.changepoints)
            .zip(&self.beta[..self.trend_width()])
            .map(|(x, b)| x * b)
            .sum()
    }

    fn seasonal_at(&self, date: NaiveDate) -> Vec<f64> {
        let mut offset = self.trend_width();
        self.seasonalities
            .iter()
            .map(|s| {
                let coefs = &self.beta[offset..offset + s.width()];
                offset += s.width();
                s.features(date).zip(coefs).map(|(x, b)| x * b).sum()
            })
            .collect()
    }

    fn mean_abs_delta(&self) -> f64 {
        let deltas = &self.beta[2..self.trend_width()];
        if deltas.is_empty() {
            0.0
        } else {
            deltas.iter().map(|d| d.abs()).sum::<f64>() / deltas.len() as f64
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AdditiveModel {
    config: AdditiveConfig,
    fitted: Option<Fitted>,
}

impl AdditiveModel {
    pub fn new(config: AdditiveConfig) -> Self {
        Self {
            config,
            fitted: None,
        }
    }

    pub fn config(&self) -> &AdditiveConfig {
        &self.config
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Names of the seasonal components chosen by the last fit.
    pub fn seasonality_names(&self) -> Vec<String> {
        self.fitted
            .as_ref()
            .map(|f| f.seasonalities.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default()
    }

    fn select_seasonalities(&self, dates: &[NaiveDate]) -> Vec<Seasonality> {
        let span = match (dates.first(), dates.last()) {
            (Some(a), Some(b)) => (*b - *a).num_days(),
            _ => 0,
        };
        let min_gap = dates
            .windows(2)
            .map(|w| (w[1] - w[0]).num_days())
            .min()
            .unwrap_or(i64::MAX);

        let wanted = |mode: SeasonalityMode, auto: bool| match mode {
            SeasonalityMode::Auto => auto,
            SeasonalityMode::Enabled => true,
            SeasonalityMode::Disabled => false,
        };

        let mut out = Vec::new();
        if wanted(self.config.yearly, span >= 730) {
            out.push(Seasonality::yearly());
        }
        if wanted(self.config.weekly, span >= 14 && min_gap < 7) {
            out.push(Seasonality::weekly());
        }
        out
    }

    fn penalties(&self, n_cps: usize, seasonal_width: usize, variance: f64) -> Vec<f64> {
        let prior = |scale: f64| variance / (scale * scale);
        let mut p = vec![prior(BASE_PRIOR_SCALE); 2];
        p.extend(std::iter::repeat(prior(self.config.changepoint_prior_scale)).take(n_cps));
        p.extend(
            std::iter::repeat(prior(self.config.seasonality_prior_scale)).take(seasonal_width),
        );
        p
    }
}

fn mean_squared(residuals: impl Iterator<Item = f64>, n: usize) -> f64 {
    residuals.map(|r| r * r).sum::<f64>() / n.max(1) as f64
}

impl ForecastModel for AdditiveModel {
    fn name(&self) -> &str {
        "additive"
    }

    fn fit(&mut self, input: &ForecastInput) -> Result<(), FitError> {
        self.fitted = None;
        check_input(input)?;

        let dates = input.timestamps();
        let n = dates.len();
        let y_scale = input
            .values()
            .iter()
            .fold(0.0_f64, |acc, v| acc.max(v.abs()));
        let y: Vec<f64> = input.values().iter().map(|v| v / y_scale).collect();

        let scale = TimeScale::new(dates[0], dates[n - 1]);
        let t: Vec<f64> = dates.iter().map(|d| scale.t(*d)).collect();
        let cps = changepoints(&t, self.config.n_changepoints, self.config.changepoint_range);
        let seasonalities = self.select_seasonalities(dates);
        let seasonal_width: usize = seasonalities.iter().map(Seasonality::width).sum();

        let design = Design::from_rows(
            dates
                .iter()
                .zip(&t)
                .map(|(date, ti)| {
                    trend_row(*ti, &cps)
                        .chain(seasonalities.iter().flat_map(|s| s.features(*date)))
                        .collect()
                })
                .collect(),
        );

        // Pass one: the total variance bounds the noise from above.
        let mean = y.iter().sum::<f64>() / n as f64;
        let total_var = mean_squared(y.iter().map(|v| v - mean), n).max(MIN_VARIANCE);
        let beta0 = design.ridge_solve(&y, &self.penalties(cps.len(), seasonal_width, total_var))?;
        let noise_var = mean_squared(
            design.apply(&beta0).iter().zip(&y).map(|(f, v)| v - f),
            n,
        )
        .max(total_var * MIN_NOISE_SHARE);

        // Pass two: penalties from the estimated noise.
        let beta = design.ridge_solve(&y, &self.penalties(cps.len(), seasonal_width, noise_var))?;
        if beta.iter().any(|b| !b.is_finite()) {
            return Err(FitError::Singular);
        }
        let sigma = mean_squared(design.apply(&beta).iter().zip(&y).map(|(f, v)| v - f), n).sqrt();

        debug!(
            rows = n,
            changepoints = cps.len(),
            seasonalities = seasonalities.len(),
            sigma,
            "additive model fitted"
        );

        self.fitted = Some(Fitted {
            scale,
            y_scale,
            changepoints: cps,
            seasonalities,
            beta,
            sigma,
        });
        Ok(())
    }

    fn predict(&self, dates: &[NaiveDate]) -> Result<Prediction, FitError> {
        let fitted = self.fitted.as_ref().ok_or(FitError::NotFitted)?;

        let t: Vec<f64> = dates.iter().map(|d| fitted.scale.t(*d)).collect();
        let trend: Vec<f64> = t.iter().map(|ti| fitted.trend_at(*ti)).collect();
        let seasonal: Vec<Vec<f64>> = dates.iter().map(|d| fitted.seasonal_at(*d)).collect();
        let seasonal_sum: Vec<f64> = seasonal.iter().map(|s| s.iter().sum()).collect();

        let intervals = simulate(
            &SimulationInput {
                t: &t,
                trend: &trend,
                seasonal: &seasonal_sum,
                t_end: 1.0,
                changepoint_rate: fitted.changepoints.len() as f64,
                mean_abs_delta: fitted.mean_abs_delta(),
                sigma: fitted.sigma,
            },
            &SimulationSettings {
                samples: self.config.uncertainty_samples,
                interval_width: self.config.interval_width,
                seeds: SeedHierarchy::new(self.config.seed),
            },
        );

        let ys = fitted.y_scale;
        let points = dates
            .iter()
            .enumerate()
            .map(|(i, date)| ForecastPoint {
                date: *date,
                predicted: (trend[i] + seasonal_sum[i]) * ys,
                lower: intervals[i].lower * ys,
                upper: intervals[i].upper * ys,
                trend: trend[i] * ys,
                trend_lower: intervals[i].trend_lower * ys,
                trend_upper: intervals[i].trend_upper * ys,
                seasonal: seasonal[i].iter().map(|s| s * ys).collect(),
            })
            .collect();

        Ok(Prediction {
            seasonalities: fitted.seasonalities.iter().map(|s| s.name.clone()).collect(),
            points,
        })
    }
}
