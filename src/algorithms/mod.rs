//! Optimization algorithms for the tour search.
//!
//! All algorithms implement the [`Solver`] trait for a consistent interface.
//! Currently one algorithm is available:
//!
//! - **Parallel tempering**: a population of simulated-annealing chains at
//!   different temperatures, advanced concurrently with periodic state
//!   exchanges between neighboring temperatures. Cold chains exploit while
//!   hot chains explore.
//!
//! To add a new algorithm, create a module here, implement [`Solver`] for
//! its struct, and dispatch to it from the crate entry point.

use crate::models::SolverResult;
use crate::solver::{DistanceMatrix, SolverError};

pub mod parallel_tempering;

/// A trait that all solver algorithms implement.
///
/// Implementations receive a validated distance matrix, run until their stop
/// conditions fire, and return the best tour they observed. Stop conditions
/// and tuning parameters are captured at construction time.
pub trait Solver {
    /// Runs the algorithm against `matrix` and returns the best tour found.
    fn solve(&self, matrix: &DistanceMatrix) -> Result<SolverResult, SolverError>;
}
