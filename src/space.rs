//! Empty maximal spaces (EMS) and the partitioner that keeps them exact.
//!
//! The active set is a list of pairwise non-redundant boxes covering all free
//! volume of the container. Placing an item consumes every active space it
//! cuts and replaces each with up to six guillotine remainders. Remainders that
//! are swallowed by another space are pruned.
//!
//! Spaces are never mutated. Every status change is recorded by appending a
//! copy to the history, so the genealogy of any space can be replayed through
//! `parent_ids`.

use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;

use crate::geometry::{contains, intersects};
use crate::types::{Axis, BoundingBox, Dimensions, Vec3};

/// Lifecycle status of a space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SpaceStatus {
    Active,
    Consumed,
    Pruned,
}

/// Monotonic id source for spaces, owned by one packing run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SpaceIdSequence {
    next: u64,
}

impl SpaceIdSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out the next id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Number of ids handed out so far.
    pub fn issued(&self) -> u64 {
        self.next
    }
}

/// An empty maximal space.
///
/// # Fields
/// * `bounds` - Min/max corner of the free box
/// * `volume` - Product of the three spans
/// * `id` - Unique within one packing run
/// * `parent_ids` - Spaces this one was cut from (empty for the root)
/// * `created_step` - Step counter value at creation
/// * `status` - Status at the time this record was written
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Space {
    pub bounds: BoundingBox,
    pub volume: f64,
    pub id: u64,
    pub parent_ids: Vec<u64>,
    pub created_step: usize,
    pub status: SpaceStatus,
}

impl Space {
    /// Creates a new active space.
    pub fn new(bounds: BoundingBox, id: u64, parent_ids: Vec<u64>, created_step: usize) -> Self {
        Self {
            bounds,
            volume: bounds.volume(),
            id,
            parent_ids,
            created_step,
            status: SpaceStatus::Active,
        }
    }

    /// Copy of this record carrying another status.
    pub fn with_status(&self, status: SpaceStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }

    /// Free extents (width, depth, height).
    pub fn dimensions(&self) -> Vec3 {
        self.bounds.dimensions()
    }

    /// The corner an item is placed at.
    pub fn min_corner(&self) -> Vec3 {
        self.bounds.min
    }

    /// Floor level of the space (Z1).
    pub fn floor_z(&self) -> f64 {
        self.bounds.min.z
    }
}

/// Builds the root space spanning the whole container.
///
/// The root takes the next id from `ids` and is created at step 0.
pub fn create_container(dims: Dimensions, ids: &mut SpaceIdSequence) -> Space {
    Space::new(
        BoundingBox::from_position_and_dims(Vec3::zero(), dims),
        ids.next_id(),
        Vec::new(),
        0,
    )
}

/// Result of splitting the active set around one placed item.
#[derive(Clone, Debug, Default)]
pub struct SplitOutcome {
    /// The next active set: intact spaces followed by surviving remainders.
    pub active: Vec<Space>,
    /// Records to append to the history, in the order they happened.
    pub history: Vec<Space>,
}

/// Splits the active set around `item_box`.
///
/// 1. Spaces disjoint from the item stay intact; intersected ones are consumed.
/// 2. Every consumed space yields one remainder per item face lying strictly
///    inside it.
/// 3. A remainder contained in an intact space or in another remainder is
///    pruned. Of two identical remainders the later one is pruned.
/// 4. Survivors join the intact spaces as the next active set.
///
/// New ids come from `ids`, new spaces are stamped with `step`.
pub fn split_spaces(
    active: &[Space],
    item_box: &BoundingBox,
    step: usize,
    ids: &mut SpaceIdSequence,
) -> SplitOutcome {
    let (intersected, intact): (Vec<&Space>, Vec<&Space>) = active
        .iter()
        .partition(|space| intersects(&space.bounds, item_box));

    let mut history: Vec<Space> = intersected
        .iter()
        .map(|space| space.with_status(SpaceStatus::Consumed))
        .collect();

    let candidates: Vec<Space> = intersected
        .iter()
        .flat_map(|space| {
            remainders(&space.bounds, item_box)
                .into_iter()
                .map(move |bounds| (bounds, space.id))
        })
        .map(|(bounds, parent)| Space::new(bounds, ids.next_id(), vec![parent], step))
        .collect();

    let mut pruned = vec![false; candidates.len()];
    for i in 0..candidates.len() {
        let bounds = &candidates[i].bounds;
        let in_intact = intact.iter().any(|space| contains(bounds, &space.bounds));
        let in_sibling = candidates.iter().enumerate().any(|(j, other)| {
            j != i
                && !pruned[j]
                && contains(bounds, &other.bounds)
                && (j < i || !contains(&other.bounds, bounds))
        });
        pruned[i] = in_intact || in_sibling;
    }

    let mut next_active: Vec<Space> = intact.into_iter().cloned().collect();
    for (candidate, is_pruned) in candidates.into_iter().zip(pruned) {
        if is_pruned {
            history.push(candidate.with_status(SpaceStatus::Pruned));
        } else {
            history.push(candidate.clone());
            next_active.push(candidate);
        }
    }

    debug!(
        consumed = intersected.len(),
        active = next_active.len(),
        step,
        "split active spaces"
    );
    debug_assert!(
        is_exact_partition(&next_active, item_box),
        "active spaces overlap the item or are redundant"
    );

    SplitOutcome {
        active: next_active,
        history,
    }
}

/// Remainders of `space` around `item`, one per face strictly inside.
fn remainders(space: &BoundingBox, item: &BoundingBox) -> Vec<BoundingBox> {
    let mut out = Vec::with_capacity(6);
    for axis in Axis::ALL {
        if item.min.get(axis) > space.min.get(axis) {
            out.push(space.with_max(axis, item.min.get(axis)));
        }
        if item.max.get(axis) < space.max.get(axis) {
            out.push(space.with_min(axis, item.max.get(axis)));
        }
    }
    out
}

/// Checks the active-set invariants against one item box.
///
/// No active space may cut the item, and none may lie inside another.
pub fn is_exact_partition(active: &[Space], item_box: &BoundingBox) -> bool {
    let clear = active
        .iter()
        .all(|space| !intersects(&space.bounds, item_box));
    let non_redundant = active.iter().enumerate().all(|(i, a)| {
        active
            .iter()
            .enumerate()
            .all(|(j, b)| i == j || !contains(&a.bounds, &b.bounds))
    });
    clear && non_redundant
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bb(min: (f64, f64, f64), max: (f64, f64, f64)) -> BoundingBox {
        BoundingBox::new(Vec3::from(min), Vec3::from(max))
    }

    fn root(dims: (f64, f64, f64)) -> (Space, SpaceIdSequence) {
        let mut ids = SpaceIdSequence::new();
        let space = create_container(Vec3::from(dims), &mut ids);
        (space, ids)
    }

    #[test]
    fn root_space_spans_container() {
        let (space, ids) = root((10.0, 20.0, 30.0));
        assert_eq!(space.id, 0);
        assert!(space.parent_ids.is_empty());
        assert_eq!(space.status, SpaceStatus::Active);
        assert!((space.volume - 6000.0).abs() < 1e-9);
        assert_eq!(ids.issued(), 1);
    }

    #[test]
    fn corner_item_leaves_three_remainders() {
        let (space, mut ids) = root((10.0, 10.0, 10.0));
        let item = bb((0.0, 0.0, 0.0), (4.0, 5.0, 6.0));

        let outcome = split_spaces(&[space], &item, 1, &mut ids);

        assert_eq!(outcome.active.len(), 3);
        let expected = [
            bb((4.0, 0.0, 0.0), (10.0, 10.0, 10.0)),
            bb((0.0, 5.0, 0.0), (10.0, 10.0, 10.0)),
            bb((0.0, 0.0, 6.0), (10.0, 10.0, 10.0)),
        ];
        for (space, bounds) in outcome.active.iter().zip(expected) {
            assert_eq!(space.bounds, bounds);
            assert_eq!(space.parent_ids, vec![0]);
            assert_eq!(space.created_step, 1);
        }
        assert_eq!(outcome.history[0].status, SpaceStatus::Consumed);
        assert_eq!(outcome.history[0].id, 0);
        assert_eq!(outcome.history.len(), 4);
    }

    #[test]
    fn centred_item_yields_six_remainders() {
        let (space, mut ids) = root((9.0, 9.0, 9.0));
        let item = bb((3.0, 3.0, 3.0), (6.0, 6.0, 6.0));

        let outcome = split_spaces(&[space], &item, 1, &mut ids);
        assert_eq!(outcome.active.len(), 6);
        assert!(outcome.active.iter().all(|s| (s.volume - 243.0).abs() < 1e-9));
    }

    #[test]
    fn item_filling_container_empties_active_set() {
        let (space, mut ids) = root((5.0, 5.0, 5.0));
        let outcome = split_spaces(&[space.clone()], &space.bounds, 1, &mut ids);

        assert!(outcome.active.is_empty());
        assert_eq!(outcome.history.len(), 1);
        assert_eq!(outcome.history[0].status, SpaceStatus::Consumed);
    }

    #[test]
    fn remainders_inside_intact_space_are_pruned() {
        let mut ids = SpaceIdSequence::new();
        let a = Space::new(bb((2.0, 0.0, 0.0), (10.0, 10.0, 10.0)), ids.next_id(), vec![], 0);
        let b = Space::new(bb((0.0, 1.0, 0.0), (10.0, 10.0, 10.0)), ids.next_id(), vec![], 0);
        let item = bb((2.0, 0.0, 0.0), (3.0, 1.0, 1.0));

        let outcome = split_spaces(&[a, b.clone()], &item, 2, &mut ids);

        // The +Y remainder of `a` lies inside `b`.
        let pruned: Vec<_> = outcome
            .history
            .iter()
            .filter(|s| s.status == SpaceStatus::Pruned)
            .collect();
        assert_eq!(pruned.len(), 1);
        assert!(outcome.active.contains(&b));
        assert_eq!(outcome.active.len(), 3);
        assert!(is_exact_partition(&outcome.active, &item));
    }

    #[test]
    fn identical_remainders_keep_only_the_first() {
        let mut ids = SpaceIdSequence::new();
        // Two overlapping spaces whose +Z remainders coincide.
        let a = Space::new(bb((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)), ids.next_id(), vec![], 0);
        let b = Space::new(bb((0.0, 0.0, 0.0), (4.0, 4.0, 4.0)), ids.next_id(), vec![], 0);
        let item = bb((0.0, 0.0, 0.0), (4.0, 4.0, 2.0));

        let outcome = split_spaces(&[a, b], &item, 1, &mut ids);

        assert_eq!(outcome.active.len(), 1);
        assert_eq!(outcome.active[0].parent_ids, vec![0]);
        assert_eq!(outcome.active[0].bounds, bb((0.0, 0.0, 2.0), (4.0, 4.0, 4.0)));
    }

    #[test]
    fn disjoint_item_is_a_no_op() {
        let (space, mut ids) = root((10.0, 10.0, 10.0));
        let item = bb((20.0, 0.0, 0.0), (21.0, 1.0, 1.0));

        let outcome = split_spaces(&[space.clone()], &item, 1, &mut ids);
        assert_eq!(outcome.active, vec![space]);
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn sequence_is_threaded_not_global() {
        let mut first = SpaceIdSequence::new();
        let mut second = SpaceIdSequence::new();
        let a = create_container(Vec3::new(1.0, 1.0, 1.0), &mut first);
        let b = create_container(Vec3::new(2.0, 2.0, 2.0), &mut second);
        assert_eq!(a.id, b.id);
    }
}
