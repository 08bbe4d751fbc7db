//! Hyperbolic rate-duration model fitting.
//!
//! The two-parameter model `rate = asymptote + capacity / duration` covers both
//! Critical Power / W' (power output in watts) and Critical Metabolic Rate / M'
//! (deoxygenation rate in %/s). It provides:
//! - The asymptote: the highest rate sustainable indefinitely
//! - The capacity: the finite reserve available beyond the asymptote
//! - Time-to-exhaustion predictions at any rate beyond the asymptote
//!
//! Parameters are estimated with a Levenberg-Marquardt least-squares solver
//! using the model's analytic partial derivatives.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::kind::ModelKind;

/// A single timed exhaustion effort.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    /// Effort duration in seconds.
    pub duration_secs: f64,
    /// Mean rate held for the effort (watts or %/s).
    pub rate: f64,
}

impl Trial {
    /// Create a trial from a duration and the rate held over it.
    pub fn new(duration_secs: f64, rate: f64) -> Self {
        Self {
            duration_secs,
            rate,
        }
    }
}

/// Fitted hyperbolic model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    /// Critical threshold rate (CP in watts, CMR in %/s).
    pub asymptote: f64,
    /// Finite reserve capacity (W' in joules, M' in %).
    pub capacity: f64,
}

impl FittedModel {
    /// Create a model from explicit parameters, e.g. operator input.
    pub fn new(asymptote: f64, capacity: f64) -> Self {
        Self {
            asymptote,
            capacity,
        }
    }

    /// Evaluate the model at the given duration in seconds.
    pub fn evaluate(&self, duration_secs: f64) -> f64 {
        self.asymptote + self.capacity / duration_secs
    }

    /// Model with the reserve expressed as a positive quantity for simulation.
    ///
    /// Deoxygenation rates are negative, so a fitted M' comes out negative and
    /// has to be inverted before it can act as a depletable reserve.
    pub fn reserve_for(self, kind: ModelKind) -> Self {
        match kind {
            ModelKind::Power => self,
            ModelKind::Oxygenation => Self {
                capacity: self.capacity.abs(),
                ..self
            },
        }
    }

    /// Predict time to exhaustion at given rate.
    /// Returns None if rate <= asymptote (theoretically infinite).
    pub fn time_to_exhaustion(&self, rate: f64) -> Option<Duration> {
        if rate.is_nan() || rate <= self.asymptote || self.capacity <= 0.0 {
            return None;
        }

        Duration::try_from_secs_f64(self.capacity / (rate - self.asymptote)).ok()
    }

    /// Predict sustainable rate for given duration.
    pub fn rate_at_duration(&self, duration: Duration) -> Option<f64> {
        let secs = duration.as_secs_f64();
        if secs <= 0.0 {
            return None;
        }

        Some(self.evaluate(secs))
    }

    /// Remaining reserve after holding `rate` for `duration` from full.
    /// Returns negative if the reserve would be exhausted.
    pub fn remaining_after(&self, rate: f64, duration: Duration) -> f64 {
        if rate <= self.asymptote {
            return self.capacity; // No depletion at or below the asymptote
        }

        self.capacity - (rate - self.asymptote) * duration.as_secs_f64()
    }
}

/// Result of a hyperbolic fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperbolicFit {
    /// Fitted parameters.
    pub model: FittedModel,
    /// Parameter covariance `[asymptote, capacity]`, absent with only two trials.
    pub covariance: Option<[[f64; 2]; 2]>,
    /// Sum of squared residuals at the solution.
    pub residual_sum_squares: f64,
    /// Model fit quality (R² value, 0-1).
    pub r_squared: f64,
    /// Solver iterations used.
    pub iterations: usize,
}

impl HyperbolicFit {
    /// One-sigma standard errors of `(asymptote, capacity)`.
    pub fn standard_errors(&self) -> Option<(f64, f64)> {
        self.covariance
            .map(|cov| (cov[0][0].max(0.0).sqrt(), cov[1][1].max(0.0).sqrt()))
    }
}

/// Model fitting errors.
#[derive(Debug, Error, PartialEq)]
pub enum FitError {
    /// Fewer than two distinct durations in the trial set.
    #[error("Insufficient data (need at least 2 distinct trial durations, got {distinct})")]
    InsufficientData { distinct: usize },

    /// A trial has a non-positive or non-finite duration, or a non-finite rate.
    #[error("Invalid trial at index {index}: duration must be positive and values finite")]
    InvalidTrial { index: usize },

    /// Solver exhausted its iteration budget without converging.
    #[error("Fit did not converge after {iterations} iterations")]
    NonConvergence { iterations: usize },

    /// Normal equations are singular; trial durations are too similar.
    #[error("Singular fit: trial durations are too similar to separate asymptote and capacity")]
    SingularFit,
}

const INITIAL_DAMPING: f64 = 1e-3;
const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e16;
const SINGULARITY_THRESHOLD: f64 = 1e-12;

/// Levenberg-Marquardt fitter for the hyperbolic model.
#[derive(Debug, Clone)]
pub struct HyperbolicFitter {
    /// Iteration budget (default: 200).
    max_iterations: usize,
    /// Relative cost-reduction tolerance.
    ftol: f64,
    /// Relative step-size tolerance.
    xtol: f64,
    /// Starting `(asymptote, capacity)`.
    initial_guess: (f64, f64),
}

impl HyperbolicFitter {
    /// Create with default settings.
    pub fn new() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1.5e-8,
            xtol: 1.5e-8,
            initial_guess: (1.0, 1.0),
        }
    }

    /// Set the iteration budget.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set convergence tolerances.
    pub fn with_tolerances(mut self, ftol: f64, xtol: f64) -> Self {
        self.ftol = ftol;
        self.xtol = xtol;
        self
    }

    /// Set the starting point of the solver.
    pub fn with_initial_guess(mut self, asymptote: f64, capacity: f64) -> Self {
        self.initial_guess = (asymptote, capacity);
        self
    }

    /// Fit the model to a trial set.
    pub fn fit(&self, trials: &[Trial]) -> Result<HyperbolicFit, FitError> {
        for (index, trial) in trials.iter().enumerate() {
            if !trial.duration_secs.is_finite()
                || trial.duration_secs <= 0.0
                || !trial.rate.is_finite()
            {
                return Err(FitError::InvalidTrial { index });
            }
        }

        let distinct = distinct_durations(trials);
        if distinct < 2 {
            return Err(FitError::InsufficientData { distinct });
        }

        // The Jacobian of a + c/t does not depend on the parameters, so JᵀJ is fixed.
        let normal = NormalMatrix::from_trials(trials);
        if normal.is_singular() {
            return Err(FitError::SingularFit);
        }

        let mut params = self.initial_guess;
        let mut cost = sum_squares(trials, params);
        let mut damping = INITIAL_DAMPING;

        for iteration in 1..=self.max_iterations {
            let gradient = gradient(trials, params);
            let Some(step) = normal.damped(damping).solve(gradient) else {
                damping *= 10.0;
                continue;
            };

            let candidate = (params.0 + step.0, params.1 + step.1);
            if !candidate.0.is_finite() || !candidate.1.is_finite() {
                return Err(FitError::NonConvergence {
                    iterations: iteration,
                });
            }

            let step_small = norm(step) <= self.xtol * (self.xtol + norm(params));
            let candidate_cost = sum_squares(trials, candidate);

            if candidate_cost <= cost {
                let reduction = cost - candidate_cost;
                let converged =
                    candidate_cost == 0.0 || reduction <= self.ftol * cost || step_small;
                params = candidate;
                cost = candidate_cost;
                damping = (damping / 10.0).max(MIN_DAMPING);

                debug!(iteration, cost, damping, "accepted step");

                if converged {
                    return Ok(self.finish(trials, &normal, params, cost, iteration));
                }
            } else {
                // Steps this small cannot improve on the current point.
                if step_small {
                    return Ok(self.finish(trials, &normal, params, cost, iteration));
                }
                damping = (damping * 10.0).min(MAX_DAMPING);
            }
        }

        Err(FitError::NonConvergence {
            iterations: self.max_iterations,
        })
    }

    fn finish(
        &self,
        trials: &[Trial],
        normal: &NormalMatrix,
        params: (f64, f64),
        cost: f64,
        iterations: usize,
    ) -> HyperbolicFit {
        let n = trials.len();
        let mean = trials.iter().map(|t| t.rate).sum::<f64>() / n as f64;
        let ss_tot: f64 = trials.iter().map(|t| (t.rate - mean).powi(2)).sum();

        let r_squared = if ss_tot > 0.0 {
            1.0 - cost / ss_tot
        } else {
            0.0
        };

        let covariance = if n > 2 {
            let s_squared = cost / (n - 2) as f64;
            normal.inverse().map(|inv| {
                [
                    [inv[0][0] * s_squared, inv[0][1] * s_squared],
                    [inv[1][0] * s_squared, inv[1][1] * s_squared],
                ]
            })
        } else {
            None
        };

        debug!(
            asymptote = params.0,
            capacity = params.1,
            r_squared,
            iterations,
            "hyperbolic fit converged"
        );

        HyperbolicFit {
            model: FittedModel::new(params.0, params.1),
            covariance,
            residual_sum_squares: cost,
            r_squared,
            iterations,
        }
    }
}

impl Default for HyperbolicFitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Symmetric 2x2 matrix `[[a, b], [b, d]]`.
#[derive(Debug, Clone, Copy)]
struct NormalMatrix {
    a: f64,
    b: f64,
    d: f64,
}

impl NormalMatrix {
    /// JᵀJ for the Jacobian rows `[1, 1/t]`.
    fn from_trials(trials: &[Trial]) -> Self {
        let mut m = Self {
            a: 0.0,
            b: 0.0,
            d: 0.0,
        };
        for trial in trials {
            let x = 1.0 / trial.duration_secs;
            m.a += 1.0;
            m.b += x;
            m.d += x * x;
        }
        m
    }

    fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.b
    }

    /// Scale-free singularity test on the normalised determinant.
    fn is_singular(&self) -> bool {
        let scale = self.a * self.d;
        scale.is_nan() || scale <= 0.0 || self.determinant() / scale < SINGULARITY_THRESHOLD
    }

    /// Marquardt damping of the diagonal.
    fn damped(&self, damping: f64) -> Self {
        Self {
            a: self.a * (1.0 + damping),
            b: self.b,
            d: self.d * (1.0 + damping),
        }
    }

    fn solve(&self, rhs: (f64, f64)) -> Option<(f64, f64)> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some((
            (self.d * rhs.0 - self.b * rhs.1) / det,
            (self.a * rhs.1 - self.b * rhs.0) / det,
        ))
    }

    fn inverse(&self) -> Option<[[f64; 2]; 2]> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        Some([
            [self.d / det, -self.b / det],
            [-self.b / det, self.a / det],
        ])
    }
}

fn distinct_durations(trials: &[Trial]) -> usize {
    let mut durations: Vec<f64> = trials.iter().map(|t| t.duration_secs).collect();
    durations.sort_by(f64::total_cmp);
    durations.dedup();
    durations.len()
}

fn sum_squares(trials: &[Trial], (asymptote, capacity): (f64, f64)) -> f64 {
    trials
        .iter()
        .map(|t| (t.rate - (asymptote + capacity / t.duration_secs)).powi(2))
        .sum()
}

/// Jᵀr with residuals `r = observed - predicted`.
fn gradient(trials: &[Trial], (asymptote, capacity): (f64, f64)) -> (f64, f64) {
    trials.iter().fold((0.0, 0.0), |(ga, gc), t| {
        let x = 1.0 / t.duration_secs;
        let residual = t.rate - (asymptote + capacity * x);
        (ga + residual, gc + residual * x)
    })
}

fn norm((x, y): (f64, f64)) -> f64 {
    x.hypot(y)
}
