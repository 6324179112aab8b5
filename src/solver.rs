//! Core data structures for the tour search.
//!
//! This module contains the distance matrix and tour representations shared
//! by the optimization algorithms. Both are built for the hot loop: the
//! matrix is a contiguous row-major array with O(1) lookups shared read-only
//! across worker threads, and the tour caches its cycle length so moves can
//! be evaluated through edge-level deltas instead of full recomputation.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during solver operation.
///
/// All validation happens synchronously before any worker thread starts, so
/// the optimization loops themselves never produce errors.
#[derive(Error, Debug, Serialize)]
pub enum SolverError {
    /// A configuration value is out of range, such as a probability outside
    /// `[0, 1]`, a non-positive temperature bound, or a zero thread count.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// The distance matrix is unusable: non-square, fewer than two cities,
    /// or an off-diagonal entry that is negative or not finite.
    #[error("invalid distance matrix: {0}")]
    InvalidMatrix(String),
}

/// Immutable N x N distance matrix with O(1) lookup.
///
/// Stored row-major in a single contiguous allocation so every worker thread
/// can share one reference without copying. Diagonal entries are never read;
/// a Hamiltonian cycle has no self-edges.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Builds a matrix from row vectors, validating shape and entries.
    ///
    /// Requires at least two cities, square shape, and finite non-negative
    /// off-diagonal entries.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, SolverError> {
        let dim = rows.len();
        if dim < 2 {
            return Err(SolverError::InvalidMatrix(format!(
                "need at least 2 cities, got {dim}"
            )));
        }
        let mut data = Vec::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(SolverError::InvalidMatrix(format!(
                    "row {i} has {} entries, expected {dim}",
                    row.len()
                )));
            }
            for (j, &value) in row.iter().enumerate() {
                if i != j && (!value.is_finite() || value < 0.0) {
                    return Err(SolverError::InvalidMatrix(format!(
                        "entry ({i}, {j}) must be finite and non-negative, got {value}"
                    )));
                }
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    /// Number of cities.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Distance of the directed edge `from -> to`.
    #[inline]
    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.data[from * self.dim + to]
    }

    /// Total length of the directed cycle visiting `order` and closing back
    /// to its first city.
    pub fn cycle_length(&self, order: &[usize]) -> f64 {
        let n = order.len();
        let mut total = 0.0;
        for i in 0..n {
            total += self.get(order[i], order[(i + 1) % n]);
        }
        total
    }

    /// Greedy nearest-neighbor tour starting from city 0.
    ///
    /// Ties are broken towards the smallest city index. The result seeds the
    /// heuristic part of the initial population.
    pub fn nearest_neighbor_tour(&self) -> Vec<usize> {
        let mut tour = Vec::with_capacity(self.dim);
        let mut visited = vec![false; self.dim];
        tour.push(0);
        visited[0] = true;
        let mut current = 0;
        for _ in 1..self.dim {
            let mut next = current;
            let mut best = f64::INFINITY;
            for city in 0..self.dim {
                if !visited[city] && self.get(current, city) < best {
                    best = self.get(current, city);
                    next = city;
                }
            }
            visited[next] = true;
            tour.push(next);
            current = next;
        }
        tour
    }
}

/// A candidate solution: a permutation of the cities plus its cached cycle
/// length.
///
/// Mutations take the new total length from the caller. The caller obtains
/// it from the corresponding `*_delta` method, so an accepted move costs
/// O(segment) instead of O(N).
#[derive(Debug, Clone)]
pub struct Tour {
    order: Vec<usize>,
    length: f64,
}

impl Tour {
    pub fn from_order(order: Vec<usize>, matrix: &DistanceMatrix) -> Self {
        let length = matrix.cycle_length(&order);
        Self { order, length }
    }

    pub fn size(&self) -> usize {
        self.order.len()
    }

    pub fn at(&self, i: usize) -> usize {
        self.order[i]
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Cost change from removing the segment `[l..=r]` and reinserting it
    /// before position `pos` of the remaining sequence.
    ///
    /// Exactly three directed edges are removed and three are added. All
    /// indices wrap modulo the cycle, and `pos` is interpreted modulo the
    /// remaining length, so inserting at the very end is the same splice as
    /// inserting at the front of the remaining cycle.
    pub fn insert_delta(&self, l: usize, r: usize, pos: usize, matrix: &DistanceMatrix) -> f64 {
        let n = self.order.len();
        let seg_len = r - l + 1;
        let rem_len = n - seg_len;
        let prev_l = self.order[(l + n - 1) % n];
        let next_r = self.order[(r + 1) % n];
        let head = self.order[l];
        let tail = self.order[r];
        // Index into the tour as it looks with the segment removed.
        let rem = |i: usize| {
            let i = i % rem_len;
            if i < l {
                self.order[i]
            } else {
                self.order[i + seg_len]
            }
        };
        let before = rem(pos + rem_len - 1);
        let after = rem(pos);
        let removed =
            matrix.get(prev_l, head) + matrix.get(tail, next_r) + matrix.get(before, after);
        let added = matrix.get(prev_l, next_r) + matrix.get(before, head) + matrix.get(tail, after);
        added - removed
    }

    /// Moves the segment `[l..=r]` so it sits before position `pos` of the
    /// remaining sequence. `pos` must be at most `size() - (r - l + 1)`, and
    /// `new_length` must come from `insert_delta` for the same move.
    pub fn apply_insert(&mut self, l: usize, r: usize, pos: usize, new_length: f64) {
        let segment: Vec<usize> = self.order.drain(l..=r).collect();
        self.order.splice(pos..pos, segment);
        self.length = new_length;
    }

    /// Cost change from replacing the segment `[l..=r]` with `replacement`,
    /// a permutation of the same cities.
    ///
    /// The two boundary edges change and the internal edges of the segment
    /// are recomputed, so evaluation is O(segment length).
    pub fn shuffle_delta(
        &self,
        l: usize,
        r: usize,
        replacement: &[usize],
        matrix: &DistanceMatrix,
    ) -> f64 {
        let n = self.order.len();
        let prev_l = self.order[(l + n - 1) % n];
        let next_r = self.order[(r + 1) % n];
        let mut removed = matrix.get(prev_l, self.order[l]);
        for i in l..r {
            removed += matrix.get(self.order[i], self.order[i + 1]);
        }
        removed += matrix.get(self.order[r], next_r);
        let mut added = matrix.get(prev_l, replacement[0]);
        for pair in replacement.windows(2) {
            added += matrix.get(pair[0], pair[1]);
        }
        added += matrix.get(replacement[replacement.len() - 1], next_r);
        added - removed
    }

    /// Overwrites the segment `[l..=r]` with `replacement`. `new_length`
    /// must come from `shuffle_delta` for the same move.
    pub fn apply_shuffle(&mut self, l: usize, r: usize, replacement: &[usize], new_length: f64) {
        self.order[l..=r].copy_from_slice(replacement);
        self.length = new_length;
    }

    /// Fraction of directed edges this tour shares with `other`.
    ///
    /// Rotation-invariant, deterministic, O(N). Used as the similarity
    /// surrogate when deciding whether two chains are too close for a state
    /// exchange to be worthwhile.
    pub fn shared_edge_fraction(&self, other: &Tour) -> f64 {
        let n = self.order.len();
        let mut successor = vec![0usize; n];
        for i in 0..n {
            successor[other.order[i]] = other.order[(i + 1) % n];
        }
        let shared = (0..n)
            .filter(|&i| successor[self.order[i]] == self.order[(i + 1) % n])
            .count();
        shared as f64 / n as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn random_matrix(n: usize, rng: &mut ChaCha8Rng) -> DistanceMatrix {
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| {
                        if i == j {
                            0.0
                        } else {
                            rng.random_range(1..100) as f64
                        }
                    })
                    .collect()
            })
            .collect();
        DistanceMatrix::from_rows(&rows).unwrap()
    }

    fn random_tour(n: usize, matrix: &DistanceMatrix, rng: &mut ChaCha8Rng) -> Tour {
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);
        Tour::from_order(order, matrix)
    }

    #[test]
    fn nearest_neighbor_breaks_ties_towards_smallest_index() {
        let rows = vec![vec![1.0; 4]; 4];
        let matrix = DistanceMatrix::from_rows(&rows).unwrap();
        assert_eq!(matrix.nearest_neighbor_tour(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn nearest_neighbor_follows_closest_city() {
        let rows = vec![
            vec![0.0, 5.0, 1.0, 9.0],
            vec![5.0, 0.0, 2.0, 1.0],
            vec![1.0, 2.0, 0.0, 7.0],
            vec![9.0, 1.0, 7.0, 0.0],
        ];
        let matrix = DistanceMatrix::from_rows(&rows).unwrap();
        assert_eq!(matrix.nearest_neighbor_tour(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn insert_delta_matches_full_recomputation() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let n = 12;
        let matrix = random_matrix(n, &mut rng);
        for _ in 0..300 {
            let tour = random_tour(n, &matrix, &mut rng);
            let len = rng.random_range(1..=n / 2);
            let l = rng.random_range(0..=(n - 1 - len));
            let r = l + len - 1;
            let rem_len = n - len;
            let pos = rng.random_range(0..=rem_len);
            if pos % rem_len == l {
                continue;
            }
            let delta = tour.insert_delta(l, r, pos, &matrix);
            let mut moved = tour.clone();
            moved.apply_insert(l, r, pos, tour.length() + delta);
            let recomputed = matrix.cycle_length(moved.order());
            assert!(
                (moved.length() - recomputed).abs() < 1e-9,
                "insert({l}, {r}, {pos}): cached {} vs recomputed {recomputed}",
                moved.length()
            );
        }
    }

    #[test]
    fn shuffle_delta_matches_full_recomputation() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let n = 10;
        let matrix = random_matrix(n, &mut rng);
        for _ in 0..300 {
            let tour = random_tour(n, &matrix, &mut rng);
            let len = rng.random_range(2..=n - 1);
            let l = rng.random_range(0..=(n - 1 - len));
            let r = l + len - 1;
            let mut replacement = tour.order()[l..=r].to_vec();
            replacement.shuffle(&mut rng);
            let delta = tour.shuffle_delta(l, r, &replacement, &matrix);
            let mut shuffled = tour.clone();
            shuffled.apply_shuffle(l, r, &replacement, tour.length() + delta);
            let recomputed = matrix.cycle_length(shuffled.order());
            assert!(
                (shuffled.length() - recomputed).abs() < 1e-9,
                "shuffle({l}, {r}): cached {} vs recomputed {recomputed}",
                shuffled.length()
            );
        }
    }

    #[test]
    fn insert_round_trip_restores_tour_exactly() {
        // Integer distances keep every delta sum exact, so the round trip
        // must restore the cached length bit-for-bit.
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let n = 9;
        let matrix = random_matrix(n, &mut rng);
        for _ in 0..200 {
            let original = random_tour(n, &matrix, &mut rng);
            let len = rng.random_range(1..=n / 2);
            let l = rng.random_range(0..=(n - 1 - len));
            let r = l + len - 1;
            let rem_len = n - len;
            let pos = rng.random_range(0..rem_len);
            if pos == l {
                continue;
            }
            let mut tour = original.clone();
            let delta = tour.insert_delta(l, r, pos, &matrix);
            tour.apply_insert(l, r, pos, tour.length() + delta);
            // The moved segment now starts at `pos`; putting it back before
            // position `l` of the remainder undoes the move.
            let inv_l = pos;
            let inv_r = pos + len - 1;
            let inv_delta = tour.insert_delta(inv_l, inv_r, l, &matrix);
            tour.apply_insert(inv_l, inv_r, l, tour.length() + inv_delta);
            assert_eq!(tour.order(), original.order());
            assert_eq!(tour.length(), original.length());
        }
    }

    #[test]
    fn shared_edge_fraction_of_identical_tours_is_one() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let matrix = random_matrix(8, &mut rng);
        let tour = random_tour(8, &matrix, &mut rng);
        assert_eq!(tour.shared_edge_fraction(&tour.clone()), 1.0);
    }

    #[test]
    fn shared_edge_fraction_sees_reversed_tour_as_disjoint() {
        let rows = vec![vec![1.0; 5]; 5];
        let matrix = DistanceMatrix::from_rows(&rows).unwrap();
        let forward = Tour::from_order(vec![0, 1, 2, 3, 4], &matrix);
        let backward = Tour::from_order(vec![4, 3, 2, 1, 0], &matrix);
        // Directed edges all flip, so none are shared.
        assert_eq!(forward.shared_edge_fraction(&backward), 0.0);
    }
}
