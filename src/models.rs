//! Data models and types for the solver API.
//!
//! This module contains the public data structures used to configure the
//! solver and receive results. Everything is serializable so configurations
//! can come from JSON files or be embedded in larger service payloads.

use crate::solver::SolverError;
use serde::{Deserialize, Serialize};

/// Tuning parameters for the parallel tempering solver.
///
/// Every field has a default, so partial configurations deserialize cleanly:
///
/// ```no_run
/// use ptsa_core::PtsaConfig;
///
/// let config: PtsaConfig = serde_json::from_str(r#"{"number_of_states": 8}"#).unwrap();
/// assert_eq!(config.number_of_states, 8);
/// assert_eq!(config.cooling_rate, 0.95);
/// ```
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct PtsaConfig {
    /// Number of annealing chains in the population.
    pub number_of_states: usize,
    /// Reserved for an outer restart harness; the core ignores it.
    pub number_of_repeats: usize,
    /// Number of worker threads. The effective count is capped by the
    /// number of chains so no worker idles at the epoch barrier.
    pub number_of_concurrent_threads: usize,
    /// Lower bound of the initial temperature ladder. Must be positive.
    pub min_temperature: f64,
    /// Upper bound of the initial temperature ladder.
    pub max_temperature: f64,
    /// First shape parameter of the Beta distribution used to draw initial
    /// temperatures. `a = b = 1` gives a uniform ladder.
    pub temp_beta_a: f64,
    /// Second shape parameter of the Beta distribution.
    pub temp_beta_b: f64,
    /// Probability that a chain uses the segment-shuffle operator instead
    /// of the segment-insert operator.
    pub probability_of_shuffle: f64,
    /// Probability that a chain starts from the nearest-neighbor tour
    /// instead of a uniformly random permutation.
    pub probability_of_heuristic: f64,
    /// Upper bound on operator segment length, as a fraction of the cycle.
    /// Must lie in `(0, 0.3]`; larger segments destabilize the search.
    pub max_length_percent_of_cycle: f64,
    /// Per-epoch probability of running the state-exchange sweep.
    pub swap_states_probability: f64,
    /// Diversity threshold for exchange pruning. Adjacent chains whose
    /// tours share a fraction of directed edges of at least
    /// `1 - 1/closeness` do not exchange. Must be at least 1; the value 1
    /// disables exchanges entirely.
    pub closeness: f64,
    /// Multiplicative per-epoch cooling factor in `(0, 1]`.
    pub cooling_rate: f64,
    /// Metropolis steps every chain runs between exchange phases.
    /// `None` picks `max(256, 2 * N)` so barrier overhead stays small.
    pub steps_per_epoch: Option<usize>,
    /// Optional cap on the number of epochs. Useful for reproducible runs
    /// that should not depend on wall-clock speed.
    pub max_epochs: Option<u64>,
    /// Master RNG seed. Chains derive their own independent streams from
    /// it. `None` seeds from OS entropy.
    pub seed: Option<u64>,
}

impl Default for PtsaConfig {
    fn default() -> Self {
        Self {
            number_of_states: 20,
            number_of_repeats: 20,
            number_of_concurrent_threads: 1,
            min_temperature: 0.1,
            max_temperature: 50.0,
            temp_beta_a: 1.0,
            temp_beta_b: 1.0,
            probability_of_shuffle: 0.1,
            probability_of_heuristic: 0.7,
            max_length_percent_of_cycle: 0.3,
            swap_states_probability: 0.1,
            closeness: 1.5,
            cooling_rate: 0.95,
            steps_per_epoch: None,
            max_epochs: None,
            seed: None,
        }
    }
}

impl PtsaConfig {
    /// Checks every field against its documented range.
    ///
    /// Runs before any chain is built, so a bad configuration never does
    /// partial work.
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.number_of_states == 0 {
            return Err(SolverError::InvalidConfiguration(
                "number_of_states must be at least 1".to_string(),
            ));
        }
        if self.number_of_concurrent_threads == 0 {
            return Err(SolverError::InvalidConfiguration(
                "number_of_concurrent_threads must be at least 1".to_string(),
            ));
        }
        if !(self.min_temperature > 0.0 && self.min_temperature.is_finite()) {
            return Err(SolverError::InvalidConfiguration(format!(
                "min_temperature must be positive and finite, got {}",
                self.min_temperature
            )));
        }
        if !(self.max_temperature >= self.min_temperature && self.max_temperature.is_finite()) {
            return Err(SolverError::InvalidConfiguration(format!(
                "max_temperature must be finite and at least min_temperature, got {}",
                self.max_temperature
            )));
        }
        if !(self.temp_beta_a > 0.0 && self.temp_beta_a.is_finite())
            || !(self.temp_beta_b > 0.0 && self.temp_beta_b.is_finite())
        {
            return Err(SolverError::InvalidConfiguration(format!(
                "temp_beta_a and temp_beta_b must be positive and finite, got {} and {}",
                self.temp_beta_a, self.temp_beta_b
            )));
        }
        for (name, value) in [
            ("probability_of_shuffle", self.probability_of_shuffle),
            ("probability_of_heuristic", self.probability_of_heuristic),
            ("swap_states_probability", self.swap_states_probability),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(SolverError::InvalidConfiguration(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        if !(self.max_length_percent_of_cycle > 0.0 && self.max_length_percent_of_cycle <= 0.3) {
            return Err(SolverError::InvalidConfiguration(format!(
                "max_length_percent_of_cycle must lie in (0, 0.3], got {}",
                self.max_length_percent_of_cycle
            )));
        }
        if !(self.closeness >= 1.0) {
            return Err(SolverError::InvalidConfiguration(format!(
                "closeness must be at least 1, got {}",
                self.closeness
            )));
        }
        if !(self.cooling_rate > 0.0 && self.cooling_rate <= 1.0) {
            return Err(SolverError::InvalidConfiguration(format!(
                "cooling_rate must lie in (0, 1], got {}",
                self.cooling_rate
            )));
        }
        if self.steps_per_epoch == Some(0) {
            return Err(SolverError::InvalidConfiguration(
                "steps_per_epoch must be at least 1 when set".to_string(),
            ));
        }
        if self.max_epochs == Some(0) {
            return Err(SolverError::InvalidConfiguration(
                "max_epochs must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// The best tour found by a solver run.
#[derive(Serialize, Debug, Clone)]
pub struct SolverResult {
    /// Visiting order of the cities; a permutation of `0..N`.
    pub tour: Vec<usize>,
    /// Length of the cycle through `tour`, including the closing edge.
    pub length: f64,
    /// Number of epochs every chain completed before the run stopped.
    pub epochs_completed: u64,
    /// Wall-clock duration of the run in seconds.
    pub elapsed_seconds: f64,
}
