//! Parallel tempering over a population of annealing chains.
//!
//! Each chain owns a tour, a temperature, and one of two transition
//! operators. Chains advance independently for a fixed number of Metropolis
//! steps (an epoch), then meet at a barrier where a coordinator attempts
//! state exchanges between neighboring temperatures, folds local bests into
//! the shared global best, and cools every chain once. The run stops when
//! the wall-clock deadline passes or an optional epoch cap is reached.

use crate::algorithms::Solver;
use crate::models::{PtsaConfig, SolverResult};
use crate::solver::{DistanceMatrix, SolverError, Tour};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Temperatures never drop below this, keeping `1/tau` finite.
const TEMP_FLOOR: f64 = 1e-12;

/// How often a step resamples before giving up when every draw produced a
/// move that would leave the cycle unchanged.
const NO_OP_RETRIES: usize = 8;

/// Below this exponent `exp` underflows to zero, so the draw is skipped.
const MIN_ACCEPT_EXPONENT: f64 = -700.0;

/// The transition operator assigned to a chain for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransitionKind {
    /// Move a contiguous segment to another position in the cycle.
    Insert,
    /// Re-permute a contiguous segment in place.
    Shuffle,
}

/// One simulated-annealing chain.
///
/// Owns its tour, temperature, operator kind, RNG stream, and local best.
/// Between exchange barriers a chain is touched by exactly one worker
/// thread; at the barrier the coordinator may swap its tour with a
/// neighbor's, while the local best and RNG always stay put.
struct Chain {
    tour: Tour,
    temperature: f64,
    kind: TransitionKind,
    rng: StdRng,
    best_order: Vec<usize>,
    best_length: f64,
}

impl Chain {
    fn new(tour: Tour, temperature: f64, kind: TransitionKind, rng: StdRng) -> Self {
        let best_order = tour.order().to_vec();
        let best_length = tour.length();
        Self {
            tour,
            temperature,
            kind,
            rng,
            best_order,
            best_length,
        }
    }

    /// One Metropolis step: propose a neighbor with the chain's operator,
    /// accept or reject, and track bests on acceptance.
    fn step(&mut self, matrix: &DistanceMatrix, max_segment: usize, global: &GlobalBest) {
        let changed = match self.kind {
            TransitionKind::Insert => self.step_insert(matrix, max_segment),
            TransitionKind::Shuffle => self.step_shuffle(matrix, max_segment),
        };
        if changed && self.update_local_best() {
            global.offer(&self.best_order, self.best_length);
        }
    }

    fn step_insert(&mut self, matrix: &DistanceMatrix, max_segment: usize) -> bool {
        let n = self.tour.size();
        for _ in 0..NO_OP_RETRIES {
            let len = self.rng.random_range(1..=max_segment);
            let l = self.rng.random_range(0..=(n - 1 - len));
            let r = l + len - 1;
            let rem_len = n - len;
            let pos = self.rng.random_range(0..=rem_len);
            if pos % rem_len == l {
                // Splicing into the gap left by the removal reproduces the
                // same cycle.
                continue;
            }
            let delta = self.tour.insert_delta(l, r, pos, matrix);
            if self.accept(delta) {
                let new_length = self.tour.length() + delta;
                self.tour.apply_insert(l, r, pos, new_length);
                return true;
            }
            return false;
        }
        false
    }

    fn step_shuffle(&mut self, matrix: &DistanceMatrix, max_segment: usize) -> bool {
        let n = self.tour.size();
        if max_segment < 2 {
            // A single city cannot be reordered in place.
            return false;
        }
        for _ in 0..NO_OP_RETRIES {
            let len = self.rng.random_range(1..=max_segment);
            if len < 2 {
                continue;
            }
            let l = self.rng.random_range(0..=(n - 1 - len));
            let r = l + len - 1;
            let mut replacement = self.tour.order()[l..=r].to_vec();
            replacement.shuffle(&mut self.rng);
            if replacement == self.tour.order()[l..=r] {
                continue;
            }
            let delta = self.tour.shuffle_delta(l, r, &replacement, matrix);
            if self.accept(delta) {
                let new_length = self.tour.length() + delta;
                self.tour.apply_shuffle(l, r, &replacement, new_length);
                return true;
            }
            return false;
        }
        false
    }

    /// Metropolis criterion. Improvements always pass; a worsening move of
    /// `delta` passes with probability `exp(-delta / tau)`.
    fn accept(&mut self, delta: f64) -> bool {
        if delta <= 0.0 {
            return true;
        }
        let tau = self.temperature.max(TEMP_FLOOR);
        let exponent = -delta / tau;
        if exponent < MIN_ACCEPT_EXPONENT {
            return false;
        }
        self.rng.random::<f64>() < exponent.exp()
    }

    /// Records the current tour as the local best if it improves on it.
    fn update_local_best(&mut self) -> bool {
        if self.tour.length() < self.best_length {
            self.best_length = self.tour.length();
            self.best_order.clear();
            self.best_order.extend_from_slice(self.tour.order());
            true
        } else {
            false
        }
    }

    fn cool(&mut self, rate: f64) {
        self.temperature = (self.temperature * rate).max(TEMP_FLOOR);
    }
}

/// Best tour observed across all chains.
///
/// Reads go through an atomic copy of the length bits so the hot loop can
/// compare without locking; the tour itself sits behind a mutex that is
/// only taken on improvement, with the comparison re-checked under the
/// lock. Cycle lengths are non-negative, so their bit patterns order the
/// same way the floats do.
struct GlobalBest {
    length_bits: AtomicU64,
    best: Mutex<(Vec<usize>, f64)>,
}

impl GlobalBest {
    fn new(order: Vec<usize>, length: f64) -> Self {
        Self {
            length_bits: AtomicU64::new(length.to_bits()),
            best: Mutex::new((order, length)),
        }
    }

    fn length(&self) -> f64 {
        f64::from_bits(self.length_bits.load(Ordering::Acquire))
    }

    fn offer(&self, order: &[usize], length: f64) {
        if length >= self.length() {
            return;
        }
        let mut guard = self.best.lock().unwrap();
        if length < guard.1 {
            guard.0.clear();
            guard.0.extend_from_slice(order);
            guard.1 = length;
            self.length_bits.store(length.to_bits(), Ordering::Release);
        }
    }

    fn into_inner(self) -> (Vec<usize>, f64) {
        self.best.into_inner().unwrap()
    }
}

/// Parallel tempering solver for the asymmetric traveling salesman problem.
///
/// Construction captures the tuning parameters and the wall-clock budget;
/// [`Solver::solve`] builds the population, runs the epoch protocol across
/// worker threads, and returns the global best.
pub struct ParallelTempering {
    number_of_states: usize,
    number_of_threads: usize,
    min_temperature: f64,
    max_temperature: f64,
    temp_beta_a: f64,
    temp_beta_b: f64,
    probability_of_shuffle: f64,
    probability_of_heuristic: f64,
    max_length_percent_of_cycle: f64,
    swap_states_probability: f64,
    closeness: f64,
    cooling_rate: f64,
    steps_per_epoch: Option<usize>,
    max_epochs: Option<u64>,
    seed: Option<u64>,
    time_limit: Duration,
}

impl ParallelTempering {
    /// Creates a solver from a validated configuration and a time budget.
    pub fn new(config: &PtsaConfig, time_limit: Duration) -> Self {
        Self {
            number_of_states: config.number_of_states,
            number_of_threads: config.number_of_concurrent_threads,
            min_temperature: config.min_temperature,
            max_temperature: config.max_temperature,
            temp_beta_a: config.temp_beta_a,
            temp_beta_b: config.temp_beta_b,
            probability_of_shuffle: config.probability_of_shuffle,
            probability_of_heuristic: config.probability_of_heuristic,
            max_length_percent_of_cycle: config.max_length_percent_of_cycle,
            swap_states_probability: config.swap_states_probability,
            closeness: config.closeness,
            cooling_rate: config.cooling_rate,
            steps_per_epoch: config.steps_per_epoch,
            max_epochs: config.max_epochs,
            seed: config.seed,
            time_limit,
        }
    }

    /// Draws the initial temperature ladder: Beta-distributed samples mapped
    /// affinely onto `[min_temperature, max_temperature]`, sorted ascending.
    /// The sorted order fixes the exchange adjacency for the whole run.
    fn init_temperatures(&self, k: usize, rng: &mut StdRng) -> Result<Vec<f64>, SolverError> {
        let beta = Beta::new(self.temp_beta_a, self.temp_beta_b).map_err(|e| {
            SolverError::InvalidConfiguration(format!("temperature beta parameters: {e}"))
        })?;
        let span = self.max_temperature - self.min_temperature;
        let mut temperatures: Vec<f64> = (0..k)
            .map(|_| self.min_temperature + span * beta.sample(rng))
            .collect();
        temperatures.sort_by(f64::total_cmp);
        Ok(temperatures)
    }

    /// Builds the chain population: Beta-ladder temperatures, Bernoulli
    /// operator assignment, and initial tours that are either the shared
    /// nearest-neighbor heuristic or a fresh random permutation. Tours are
    /// cloned per chain; chains never alias.
    fn init_chains(
        &self,
        matrix: &DistanceMatrix,
        master_seed: u64,
        master_rng: &mut StdRng,
    ) -> Result<Vec<Chain>, SolverError> {
        let n = matrix.dim();
        let k = self.number_of_states;
        let temperatures = self.init_temperatures(k, master_rng)?;
        let nearest_neighbor = matrix.nearest_neighbor_tour();
        let mut chains = Vec::with_capacity(k);
        for (index, temperature) in temperatures.into_iter().enumerate() {
            let kind = if master_rng.random::<f64>() < self.probability_of_shuffle {
                TransitionKind::Shuffle
            } else {
                TransitionKind::Insert
            };
            let order = if master_rng.random::<f64>() < self.probability_of_heuristic {
                nearest_neighbor.clone()
            } else {
                let mut order: Vec<usize> = (0..n).collect();
                order.shuffle(master_rng);
                order
            };
            let rng = StdRng::seed_from_u64(master_seed.wrapping_add(1 + index as u64));
            chains.push(Chain::new(
                Tour::from_order(order, matrix),
                temperature,
                kind,
                rng,
            ));
        }
        Ok(chains)
    }

    /// Runs the per-epoch coordinator work while every worker waits at the
    /// barrier: an optional exchange sweep over adjacent pairs in ascending
    /// order, then one global-best scan and one cooling step per chain.
    ///
    /// A pair exchanges tours with probability
    /// `min(1, exp((L_i - L_j) * (1/tau_i - 1/tau_j)))`, and is skipped
    /// when the tours share a fraction of directed edges of at least
    /// `1 - 1/closeness`. A swap moves tour ownership only; local bests and
    /// RNG streams stay with their chain.
    fn run_exchange_phase(
        &self,
        chains: &[Mutex<Chain>],
        global: &GlobalBest,
        coordinator_rng: &Mutex<StdRng>,
    ) {
        let mut rng = coordinator_rng.lock().unwrap();
        let k = chains.len();
        if k > 1 && rng.random::<f64>() < self.swap_states_probability {
            let min_shared = 1.0 - 1.0 / self.closeness;
            let mut accepted = 0usize;
            for i in 0..k - 1 {
                // Ascending order matters: a swap at (i, i+1) changes what
                // the (i+1, i+2) proposal sees.
                let mut left = chains[i].lock().unwrap();
                let mut right = chains[i + 1].lock().unwrap();
                if left.tour.shared_edge_fraction(&right.tour) >= min_shared {
                    continue;
                }
                let exponent = (left.tour.length() - right.tour.length())
                    * (1.0 / left.temperature.max(TEMP_FLOOR)
                        - 1.0 / right.temperature.max(TEMP_FLOOR));
                if exponent >= 0.0 || rng.random::<f64>() < exponent.exp() {
                    std::mem::swap(&mut left.tour, &mut right.tour);
                    accepted += 1;
                }
            }
            debug!("exchange sweep: swapped {accepted} of {} pairs", k - 1);
        }
        for slot in chains {
            let mut chain = slot.lock().unwrap();
            // An exchanged-in tour may beat the chain's own history.
            chain.update_local_best();
            global.offer(&chain.best_order, chain.best_length);
            chain.cool(self.cooling_rate);
        }
    }
}

impl Solver for ParallelTempering {
    fn solve(&self, matrix: &DistanceMatrix) -> Result<SolverResult, SolverError> {
        let start = Instant::now();
        let deadline = start + self.time_limit;
        let n = matrix.dim();
        let k = self.number_of_states;
        let workers = self.number_of_threads.min(k);
        let steps_per_epoch = self.steps_per_epoch.unwrap_or_else(|| 256.max(2 * n));
        let max_segment =
            ((self.max_length_percent_of_cycle * n as f64).floor() as usize).clamp(1, n - 1);

        let master_seed = self.seed.unwrap_or_else(|| rand::rng().random());
        let mut master_rng = StdRng::seed_from_u64(master_seed);
        let chains = self.init_chains(matrix, master_seed, &mut master_rng)?;

        // Seed the global best with the best initial tour. If the budget is
        // too small for even one epoch, this is what the caller gets back.
        let best_initial = chains
            .iter()
            .min_by(|a, b| a.tour.length().total_cmp(&b.tour.length()))
            .expect("population is non-empty");
        let global = GlobalBest::new(best_initial.tour.order().to_vec(), best_initial.tour.length());

        let chains: Vec<Mutex<Chain>> = chains.into_iter().map(Mutex::new).collect();
        let coordinator_rng = Mutex::new(StdRng::seed_from_u64(
            master_seed.wrapping_add(1 + k as u64),
        ));
        let barrier = Barrier::new(workers);
        let stop = AtomicBool::new(false);
        let epochs_completed = AtomicU64::new(0);

        info!(
            "parallel tempering: {n} cities, {k} chains, {workers} workers, {steps_per_epoch} steps per epoch"
        );

        thread::scope(|scope| {
            for worker in 0..workers {
                let chains = &chains;
                let global = &global;
                let barrier = &barrier;
                let stop = &stop;
                let epochs_completed = &epochs_completed;
                let coordinator_rng = &coordinator_rng;
                scope.spawn(move || loop {
                    for index in (worker..k).step_by(workers) {
                        let mut chain = chains[index].lock().unwrap();
                        for _ in 0..steps_per_epoch {
                            chain.step(matrix, max_segment, global);
                        }
                    }
                    if barrier.wait().is_leader() {
                        self.run_exchange_phase(chains, global, coordinator_rng);
                        let done = epochs_completed.fetch_add(1, Ordering::Relaxed) + 1;
                        let out_of_time = Instant::now() >= deadline;
                        let out_of_epochs = self.max_epochs.is_some_and(|cap| done >= cap);
                        if out_of_time || out_of_epochs {
                            stop.store(true, Ordering::Relaxed);
                        }
                    }
                    // Second rendezvous: the stop decision is made exactly
                    // once per epoch, so workers cannot disagree about the
                    // deadline and leave each other stranded at the barrier.
                    barrier.wait();
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                });
            }
        });

        let epochs = epochs_completed.load(Ordering::Relaxed);
        let (tour, length) = global.into_inner();
        let elapsed = start.elapsed();
        info!(
            "finished after {epochs} epochs in {:.2}s with best length {length:.3}",
            elapsed.as_secs_f64()
        );
        Ok(SolverResult {
            tour,
            length,
            epochs_completed: epochs,
            elapsed_seconds: elapsed.as_secs_f64(),
        })
    }
}
