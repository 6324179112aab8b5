//! # Ptsa-Core: Parallel Tempering for the Asymmetric TSP
//!
//! This crate computes approximate solutions to the asymmetric traveling
//! salesman problem. A population of simulated-annealing chains runs at
//! different temperatures and periodically exchanges states, so cold chains
//! refine good tours while hot chains keep exploring. Given an N x N
//! non-negative distance matrix and a wall-clock budget, the solver returns
//! the shortest Hamiltonian cycle it discovered.
//!
//! ## Quick Example
//!
//! ```no_run
//! use ptsa_core::{run_solver, PtsaConfig};
//!
//! let distance_matrix = vec![
//!     vec![0.0, 1.0, 2.0, 3.0],
//!     vec![1.0, 0.0, 4.0, 5.0],
//!     vec![2.0, 4.0, 0.0, 6.0],
//!     vec![3.0, 5.0, 6.0, 0.0],
//! ];
//!
//! let config = PtsaConfig {
//!     number_of_states: 8,
//!     number_of_concurrent_threads: 2,
//!     ..PtsaConfig::default()
//! };
//!
//! match run_solver(&distance_matrix, 5, &config) {
//!     Ok(result) => {
//!         println!("best tour: {:?}", result.tour);
//!         println!("length: {}", result.length);
//!     }
//!     Err(e) => eprintln!("error: {e}"),
//! }
//! ```
//!
//! Problem loading, result reporting, and benchmarking live outside this
//! crate; the core consumes a matrix plus a configuration and returns a
//! tour with its length.

use crate::algorithms::parallel_tempering::ParallelTempering;
use crate::algorithms::Solver;
use crate::solver::DistanceMatrix;
use std::time::Duration;

pub use models::{PtsaConfig, SolverResult};
pub use solver::SolverError;

pub mod algorithms;
pub mod models;
pub mod solver;

/// Runs the parallel tempering solver against a distance matrix.
///
/// `distance_matrix` must be square with at least two cities and finite,
/// non-negative off-diagonal entries; entries on the diagonal are ignored.
/// `time_limit_seconds` is the wall-clock budget and must be at least 1.
/// Workers stop starting new epochs once the deadline passes; a budget too
/// small for a single epoch still yields the best initial tour.
///
/// # Errors
///
/// Returns [`SolverError::InvalidConfiguration`] or
/// [`SolverError::InvalidMatrix`] when the inputs are rejected by
/// validation. No partial work happens in that case, and nothing inside
/// the optimization loops can fail afterwards.
pub fn run_solver(
    distance_matrix: &[Vec<f64>],
    time_limit_seconds: u64,
    config: &PtsaConfig,
) -> Result<SolverResult, SolverError> {
    config.validate()?;
    if time_limit_seconds == 0 {
        return Err(SolverError::InvalidConfiguration(
            "time_limit_seconds must be at least 1".to_string(),
        ));
    }
    let matrix = DistanceMatrix::from_rows(distance_matrix)?;
    let solver = ParallelTempering::new(config, Duration::from_secs(time_limit_seconds));
    solver.solve(&matrix)
}
