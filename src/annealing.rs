//! Simulated annealing over item order and rotation.
//!
//! A solution is an ordered, rotated item list. Its energy is
//! `1 - utilization` of a full First-Fit pack, so every evaluation is one
//! complete packing run. Neighbours either swap two items or re-rotate one.

use std::ops::ControlFlow;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::model::{Item, Rotation};
use crate::packer::{Strategy, run_to_completion};
use crate::types::Dimensions;

/// Tuning for the annealing walk.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnnealingConfig {
    /// Starting temperature.
    pub initial_temperature: f64,
    /// Geometric factor applied after each iteration.
    pub cooling_rate: f64,
    /// Iterations between cooperative yields.
    pub yield_batch: usize,
}

impl AnnealingConfig {
    pub const DEFAULT_INITIAL_TEMPERATURE: f64 = 1.0;
    pub const DEFAULT_COOLING_RATE: f64 = 0.99;
    pub const DEFAULT_YIELD_BATCH: usize = 10;
}

impl Default for AnnealingConfig {
    fn default() -> Self {
        Self {
            initial_temperature: Self::DEFAULT_INITIAL_TEMPERATURE,
            cooling_rate: Self::DEFAULT_COOLING_RATE,
            yield_batch: Self::DEFAULT_YIELD_BATCH,
        }
    }
}

/// One line of the annealing log.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnnealingRecord {
    pub iteration: usize,
    /// Utilization of the solution held after this iteration.
    pub utilization_percent: f64,
    /// Temperature the acceptance decision was made at.
    pub temperature: f64,
    pub accepted: bool,
    pub best_utilization_percent: f64,
}

/// Best solution found plus the full log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptimizationResult {
    pub items: Vec<Item>,
    pub history: Vec<AnnealingRecord>,
    pub best_utilization_percent: f64,
}

/// Energy of an ordering: unused volume fraction after a First-Fit pack.
pub fn energy(items: &[Item], container: Dimensions, support_threshold: f64) -> f64 {
    let state = run_to_completion(
        Strategy::FirstFit,
        items.to_vec(),
        container,
        support_threshold,
        None,
    );
    1.0 - state.utilization()
}

struct Annealer<'r, R: Rng> {
    container: Dimensions,
    support_threshold: f64,
    cooling_rate: f64,
    current: Vec<Item>,
    current_energy: f64,
    best: Vec<Item>,
    best_energy: f64,
    temperature: f64,
    iteration: usize,
    rng: &'r mut R,
}

impl<'r, R: Rng> Annealer<'r, R> {
    fn new(
        items: Vec<Item>,
        container: Dimensions,
        support_threshold: f64,
        config: &AnnealingConfig,
        rng: &'r mut R,
    ) -> Self {
        let current_energy = energy(&items, container, support_threshold);
        Self {
            container,
            support_threshold,
            cooling_rate: config.cooling_rate,
            best: items.clone(),
            best_energy: current_energy,
            current: items,
            current_energy,
            temperature: config.initial_temperature,
            iteration: 0,
            rng,
        }
    }

    fn neighbor(&mut self) -> Vec<Item> {
        let mut next = self.current.clone();
        let len = next.len();
        if len == 0 {
            return next;
        }
        if len >= 2 && self.rng.gen_bool(0.5) {
            let a = self.rng.gen_range(0..len);
            let mut b = self.rng.gen_range(0..len - 1);
            if b >= a {
                b += 1;
            }
            next.swap(a, b);
        } else {
            let idx = self.rng.gen_range(0..len);
            let current = usize::from(next[idx].rotation.index());
            let mut pick = self.rng.gen_range(0..Rotation::ALL.len() - 1);
            if pick >= current {
                pick += 1;
            }
            next[idx] = next[idx].rotated(Rotation::ALL[pick]);
        }
        next
    }

    fn iterate(&mut self) -> AnnealingRecord {
        let candidate = self.neighbor();
        let candidate_energy = energy(&candidate, self.container, self.support_threshold);
        let temperature = self.temperature;

        let delta = candidate_energy - self.current_energy;
        let accepted = if delta <= 0.0 {
            true
        } else {
            let p = (-delta / temperature).exp();
            self.rng.gen_bool(p.clamp(0.0, 1.0))
        };

        if accepted {
            self.current = candidate;
            self.current_energy = candidate_energy;
            if self.current_energy < self.best_energy {
                self.best = self.current.clone();
                self.best_energy = self.current_energy;
            }
        }

        self.temperature *= self.cooling_rate;
        let record = AnnealingRecord {
            iteration: self.iteration,
            utilization_percent: (1.0 - self.current_energy) * 100.0,
            temperature,
            accepted,
            best_utilization_percent: (1.0 - self.best_energy) * 100.0,
        };
        self.iteration += 1;
        record
    }

    fn finish(self, history: Vec<AnnealingRecord>) -> OptimizationResult {
        let best_utilization_percent = (1.0 - self.best_energy) * 100.0;
        info!(
            iterations = history.len(),
            best_utilization_percent, "annealing finished"
        );
        OptimizationResult {
            items: self.best,
            history,
            best_utilization_percent,
        }
    }
}

/// Searches item orders and rotations for a better First-Fit packing.
///
/// # Parameter
/// * `items` - Starting order (also the first best solution)
/// * `container` - Container dimensions
/// * `iterations` - Number of neighbour evaluations
/// * `support_threshold` - Passed through to every evaluation pack
/// * `rng` - Random source; seed it for reproducible runs
pub fn optimize<R: Rng>(
    items: Vec<Item>,
    container: Dimensions,
    iterations: usize,
    support_threshold: f64,
    rng: &mut R,
) -> OptimizationResult {
    optimize_with_progress(
        items,
        container,
        iterations,
        support_threshold,
        &AnnealingConfig::default(),
        rng,
        |_| ControlFlow::Continue(()),
    )
}

/// Like `optimize`, reporting every record through `on_record`.
///
/// Returning `ControlFlow::Break` from `on_record` ends the search after that
/// iteration; the result then holds the best solution seen so far.
pub fn optimize_with_progress<R: Rng>(
    items: Vec<Item>,
    container: Dimensions,
    iterations: usize,
    support_threshold: f64,
    config: &AnnealingConfig,
    rng: &mut R,
    mut on_record: impl FnMut(&AnnealingRecord) -> ControlFlow<()>,
) -> OptimizationResult {
    let mut annealer = Annealer::new(items, container, support_threshold, config, rng);
    let mut history = Vec::new();
    for _ in 0..iterations {
        let record = annealer.iterate();
        history.push(record);
        if on_record(&record).is_break() {
            break;
        }
    }
    annealer.finish(history)
}

/// Async form of `optimize_with_progress` for single-threaded hosts.
///
/// Hands control back to the scheduler every `config.yield_batch` iterations.
/// Dropping the future between yields stops the search.
pub async fn optimize_cooperative<R: Rng>(
    items: Vec<Item>,
    container: Dimensions,
    iterations: usize,
    support_threshold: f64,
    config: &AnnealingConfig,
    rng: &mut R,
    mut on_record: impl FnMut(&AnnealingRecord) -> ControlFlow<()>,
) -> OptimizationResult {
    let batch = config.yield_batch.max(1);
    let mut annealer = Annealer::new(items, container, support_threshold, config, rng);
    let mut history = Vec::new();
    for i in 0..iterations {
        let record = annealer.iterate();
        history.push(record);
        if on_record(&record).is_break() {
            break;
        }
        if (i + 1) % batch == 0 {
            tokio::task::yield_now().await;
        }
    }
    annealer.finish(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{GeneratorConfig, generate_items};
    use crate::types::Vec3;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn fixture(seed: u64) -> (Vec3, Vec<Item>) {
        let container = Vec3::new(60.0, 40.0, 30.0);
        let config = GeneratorConfig {
            item_count: 12,
            min_side: 5.0,
            ..GeneratorConfig::default()
        };
        let items = generate_items(container, &config, &mut StdRng::seed_from_u64(seed));
        (container, items)
    }

    #[test]
    fn best_energy_never_increases() {
        let (container, items) = fixture(11);
        let result = optimize(items, container, 60, 0.6, &mut StdRng::seed_from_u64(5));

        assert_eq!(result.history.len(), 60);
        for pair in result.history.windows(2) {
            assert!(pair[1].best_utilization_percent >= pair[0].best_utilization_percent);
        }
        let last = result.history.last().unwrap();
        assert!((last.best_utilization_percent - result.best_utilization_percent).abs() < 1e-9);
    }

    #[test]
    fn result_is_no_worse_than_the_start() {
        let (container, items) = fixture(21);
        let start = (1.0 - energy(&items, container, 0.6)) * 100.0;
        let result = optimize(items, container, 40, 0.6, &mut StdRng::seed_from_u64(8));

        assert!(result.best_utilization_percent + 1e-9 >= start);
        let replay = (1.0 - energy(&result.items, container, 0.6)) * 100.0;
        assert!((replay - result.best_utilization_percent).abs() < 1e-9);
    }

    #[test]
    fn result_is_a_rotated_permutation() {
        let (container, items) = fixture(3);
        let result = optimize(items.clone(), container, 50, 0.6, &mut StdRng::seed_from_u64(4));

        let mut ids: Vec<usize> = result.items.iter().map(|i| i.id).collect();
        ids.sort_unstable();
        let mut expected: Vec<usize> = items.iter().map(|i| i.id).collect();
        expected.sort_unstable();
        assert_eq!(ids, expected);

        for item in &result.items {
            assert_eq!(item.dims, item.rotation.apply(item.original_dims));
        }
    }

    #[test]
    fn temperature_cools_geometrically() {
        let (container, items) = fixture(1);
        let result = optimize(items, container, 3, 0.6, &mut StdRng::seed_from_u64(2));
        let temps: Vec<f64> = result.history.iter().map(|r| r.temperature).collect();
        assert!((temps[0] - 1.0).abs() < 1e-12);
        assert!((temps[1] - 0.99).abs() < 1e-12);
        assert!((temps[2] - 0.9801).abs() < 1e-12);
    }

    #[test]
    fn seeded_runs_repeat() {
        let (container, items) = fixture(9);
        let a = optimize(items.clone(), container, 30, 0.6, &mut StdRng::seed_from_u64(77));
        let b = optimize(items, container, 30, 0.6, &mut StdRng::seed_from_u64(77));
        assert_eq!(a, b);
    }

    #[test]
    fn single_item_only_rotates() {
        let container = Vec3::new(10.0, 10.0, 10.0);
        let items = vec![Item::new(1, (10.0, 5.0, 2.0)).unwrap()];
        let result = optimize(items, container, 20, 0.6, &mut StdRng::seed_from_u64(1));
        assert_eq!(result.items.len(), 1);
        assert!((result.best_utilization_percent - 10.0).abs() < 1e-9);
    }

    #[test]
    fn rotation_move_always_changes_the_rotation() {
        let container = Vec3::new(10.0, 10.0, 10.0);
        let items = vec![Item::new(1, (4.0, 3.0, 2.0)).unwrap()];
        let mut rng = StdRng::seed_from_u64(6);
        let mut annealer =
            Annealer::new(items, container, 0.6, &AnnealingConfig::default(), &mut rng);

        for rotation in Rotation::ALL {
            annealer.current = vec![annealer.current[0].rotated(rotation)];
            for _ in 0..30 {
                let moved = annealer.neighbor();
                assert_ne!(moved[0].rotation, rotation);
            }
        }
    }

    #[test]
    fn break_from_callback_ends_the_search() {
        let (container, items) = fixture(5);
        let mut calls = 0;
        let result = optimize_with_progress(
            items,
            container,
            100,
            0.6,
            &AnnealingConfig::default(),
            &mut StdRng::seed_from_u64(3),
            |_| {
                calls += 1;
                if calls == 4 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            },
        );
        assert_eq!(calls, 4);
        assert_eq!(result.history.len(), 4);
        let last = result.history.last().unwrap();
        assert!((last.best_utilization_percent - result.best_utilization_percent).abs() < 1e-9);
    }

    #[tokio::test]
    async fn cooperative_run_matches_blocking_run() {
        let (container, items) = fixture(17);
        let config = AnnealingConfig {
            yield_batch: 4,
            ..AnnealingConfig::default()
        };

        let blocking = optimize_with_progress(
            items.clone(),
            container,
            25,
            0.6,
            &config,
            &mut StdRng::seed_from_u64(12),
            |_| ControlFlow::Continue(()),
        );
        let mut seen = 0;
        let cooperative = optimize_cooperative(
            items,
            container,
            25,
            0.6,
            &config,
            &mut StdRng::seed_from_u64(12),
            |_| {
                seen += 1;
                ControlFlow::Continue(())
            },
        )
        .await;

        assert_eq!(seen, 25);
        assert_eq!(blocking, cooperative);
    }
}
