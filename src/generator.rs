//! Synthetic item sets by recursive guillotine cuts of the container.
//!
//! The produced items tile the container exactly, so a perfect packer would
//! reach 100% utilization. Useful for demos and for exercising the engine.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::{ValidationError, validate_dimension};
use crate::model::Item;
use crate::types::{Axis, Dimensions, Vec3};

/// Settings for item generation and the follow-up optimizer run.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct GeneratorConfig {
    /// Number of items to aim for.
    pub item_count: usize,
    /// No generated side is shorter than this.
    pub min_side: f64,
    /// Iteration budget for the annealing optimizer.
    pub optimizer_iterations: usize,
}

impl GeneratorConfig {
    pub const DEFAULT_ITEM_COUNT: usize = 20;
    pub const DEFAULT_MIN_SIDE: f64 = 300.0;
    pub const DEFAULT_OPTIMIZER_ITERATIONS: usize = 200;
    /// Upper bound for `item_count` accepted from callers.
    pub const MAX_ITEM_COUNT: usize = 10_000;
    /// Upper bound for annealing iterations; each one is a full packing run.
    pub const MAX_OPTIMIZER_ITERATIONS: usize = 100_000;

    /// Attempts allowed per requested item before giving up.
    const ATTEMPTS_PER_ITEM: usize = 50;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.item_count == 0 {
            return Err(ValidationError::InvalidConfiguration(
                "item count must be at least 1".to_string(),
            ));
        }
        if self.item_count > Self::MAX_ITEM_COUNT {
            return Err(ValidationError::InvalidConfiguration(format!(
                "item count must be at most {}",
                Self::MAX_ITEM_COUNT
            )));
        }
        if self.optimizer_iterations == 0 {
            return Err(ValidationError::InvalidConfiguration(
                "optimizer iterations must be at least 1".to_string(),
            ));
        }
        if self.optimizer_iterations > Self::MAX_OPTIMIZER_ITERATIONS {
            return Err(ValidationError::InvalidConfiguration(format!(
                "optimizer iterations must be at most {}",
                Self::MAX_OPTIMIZER_ITERATIONS
            )));
        }
        validate_dimension(self.min_side, "Minimum side length")
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            item_count: Self::DEFAULT_ITEM_COUNT,
            min_side: Self::DEFAULT_MIN_SIDE,
            optimizer_iterations: Self::DEFAULT_OPTIMIZER_ITERATIONS,
        }
    }
}

/// Cuts the container into roughly `config.item_count` boxes.
///
/// Each round picks a random box and a random axis whose extent is at least
/// twice `min_side`, then cuts it at a random offset that leaves both halves
/// at least `min_side` long. Stops at the target count or when the attempt
/// budget runs out or no box can be cut any more, in which case fewer items
/// are returned.
///
/// Items are numbered from 1 and start unrotated.
pub fn generate_items<R: Rng>(
    container: Dimensions,
    config: &GeneratorConfig,
    rng: &mut R,
) -> Vec<Item> {
    let mut boxes: Vec<Vec3> = vec![container];
    let max_attempts = config
        .item_count
        .max(1)
        .saturating_mul(GeneratorConfig::ATTEMPTS_PER_ITEM);
    let splittable = |dims: &Vec3| {
        Axis::ALL
            .into_iter()
            .any(|axis| dims.get(axis) >= 2.0 * config.min_side)
    };
    let mut attempts = 0;

    while boxes.len() < config.item_count && attempts < max_attempts {
        attempts += 1;

        let index = rng.gen_range(0..boxes.len());
        let target = boxes[index];
        let eligible: Vec<Axis> = Axis::ALL
            .into_iter()
            .filter(|&axis| target.get(axis) >= 2.0 * config.min_side)
            .collect();
        if eligible.is_empty() {
            if !boxes.iter().any(&splittable) {
                break;
            }
            continue;
        }

        let axis = eligible[rng.gen_range(0..eligible.len())];
        let extent = target.get(axis);
        let cut = if extent - config.min_side > config.min_side {
            rng.gen_range(config.min_side..=extent - config.min_side)
        } else {
            config.min_side
        };

        boxes.swap_remove(index);
        boxes.push(target.with(axis, cut));
        boxes.push(target.with(axis, extent - cut));
    }

    if boxes.len() < config.item_count {
        warn!(
            requested = config.item_count,
            generated = boxes.len(),
            attempts,
            "stopped before reaching the item count"
        );
    } else {
        debug!(generated = boxes.len(), attempts, "generated items");
    }

    boxes
        .into_iter()
        .enumerate()
        .map(|(idx, dims)| Item::from_dims(idx + 1, dims))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn config(count: usize, min_side: f64) -> GeneratorConfig {
        GeneratorConfig {
            item_count: count,
            min_side,
            ..GeneratorConfig::default()
        }
    }

    #[test]
    fn items_tile_the_container() {
        let container = Vec3::new(5870.0, 2330.0, 2200.0);
        let mut rng = StdRng::seed_from_u64(7);
        let items = generate_items(container, &config(20, 300.0), &mut rng);

        assert_eq!(items.len(), 20);
        let total: f64 = items.iter().map(|i| i.volume()).sum();
        assert!((total - container.volume()).abs() / container.volume() < 1e-9);
        for item in &items {
            for axis in Axis::ALL {
                assert!(item.dims.get(axis) >= 300.0 - 1e-9);
            }
            assert_eq!(item.dims, item.original_dims);
        }
    }

    #[test]
    fn ids_are_sequential() {
        let mut rng = StdRng::seed_from_u64(1);
        let items = generate_items(Vec3::new(100.0, 100.0, 100.0), &config(5, 10.0), &mut rng);
        let ids: Vec<usize> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn same_seed_same_items() {
        let container = Vec3::new(100.0, 80.0, 60.0);
        let a = generate_items(container, &config(12, 5.0), &mut StdRng::seed_from_u64(99));
        let b = generate_items(container, &config(12, 5.0), &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn returns_fewer_items_when_no_cut_is_possible() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = generate_items(Vec3::new(10.0, 10.0, 10.0), &config(8, 6.0), &mut rng);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].dims, Vec3::new(10.0, 10.0, 10.0));
    }

    #[test]
    fn huge_item_count_stops_once_nothing_can_be_cut() {
        let mut rng = StdRng::seed_from_u64(3);
        let items = generate_items(
            Vec3::new(10.0, 10.0, 10.0),
            &config(usize::MAX, 6.0),
            &mut rng,
        );
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn validate_rejects_counts_above_the_limits() {
        let at_limit = config(GeneratorConfig::MAX_ITEM_COUNT, 10.0);
        assert!(at_limit.validate().is_ok());
        assert!(config(GeneratorConfig::MAX_ITEM_COUNT + 1, 10.0).validate().is_err());
        assert!(config(usize::MAX, 10.0).validate().is_err());

        let too_many_iterations = GeneratorConfig {
            optimizer_iterations: GeneratorConfig::MAX_OPTIMIZER_ITERATIONS + 1,
            ..GeneratorConfig::default()
        };
        assert!(too_many_iterations.validate().is_err());
    }

    #[test]
    fn validate_rejects_degenerate_settings() {
        assert!(GeneratorConfig::default().validate().is_ok());
        assert!(config(0, 10.0).validate().is_err());
        assert!(config(5, 0.0).validate().is_err());
        let no_iterations = GeneratorConfig {
            optimizer_iterations: 0,
            ..GeneratorConfig::default()
        };
        assert!(no_iterations.validate().is_err());
    }
}
