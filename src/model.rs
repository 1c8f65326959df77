//! Data models for the packing engine.
//!
//! This module defines the item-side data structures:
//! - `Rotation`: One of the six axis permutations of an item
//! - `Item`: A cuboid waiting to be packed
//! - `PlacedItem`: An item committed at a position, with its support record
//!
//! All structures implement the traits from the `types` module.

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use utoipa::ToSchema;

use crate::error::{ValidationError, validate_dimensions_3d};
use crate::types::{BoundingBox, Dimensional, Vec3};

/// Colour palette used for the display attribute of items.
const PALETTE: [&str; 10] = [
    "#4e79a7", "#f28e2b", "#e15759", "#76b7b2", "#59a14f", "#edc948", "#b07aa1", "#ff9da7",
    "#9c755f", "#bab0ac",
];

/// Returns the display colour for an item id.
///
/// Purely cosmetic; placement never looks at it.
pub fn display_color(id: usize) -> String {
    PALETTE[id % PALETTE.len()].to_string()
}

/// One of the six orthogonal orientations of a cuboid.
///
/// The variant names list which original extent ends up on the
/// width/depth/height axes, e.g. `Dhw` puts the original depth on X,
/// the original height on Y and the original width on Z.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Rotation {
    #[default]
    Wdh,
    Whd,
    Dwh,
    Dhw,
    Hwd,
    Hdw,
}

impl Rotation {
    pub const ALL: [Rotation; 6] = [
        Rotation::Wdh,
        Rotation::Whd,
        Rotation::Dwh,
        Rotation::Dhw,
        Rotation::Hwd,
        Rotation::Hdw,
    ];

    /// Index of the rotation (0..6).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Rotation for an index, `None` outside 0..6.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    /// Applies the permutation to original dimensions.
    pub fn apply(self, dims: Vec3) -> Vec3 {
        let Vec3 { x: w, y: d, z: h } = dims;
        match self {
            Rotation::Wdh => Vec3::new(w, d, h),
            Rotation::Whd => Vec3::new(w, h, d),
            Rotation::Dwh => Vec3::new(d, w, h),
            Rotation::Dhw => Vec3::new(d, h, w),
            Rotation::Hwd => Vec3::new(h, w, d),
            Rotation::Hdw => Vec3::new(h, d, w),
        }
    }
}

impl From<Rotation> for u8 {
    fn from(rotation: Rotation) -> Self {
        rotation.index()
    }
}

impl TryFrom<u8> for Rotation {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Rotation::from_index(value).ok_or_else(|| {
            ValidationError::InvalidConfiguration(format!(
                "rotation index must be between 0 and 5, got: {}",
                value
            ))
        })
    }
}

/// A cuboid to be packed.
///
/// # Fields
/// * `id` - Unique identification number of the item
/// * `dims` - Current (rotated) dimensions (width, depth, height)
/// * `original_dims` - Dimensions before any rotation
/// * `rotation` - Permutation mapping `original_dims` onto `dims`
/// * `color` - Display attribute, irrelevant to placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": 1,
    "dims": {"x": 2000.0, "y": 1000.0, "z": 1000.0},
    "original_dims": {"x": 2000.0, "y": 1000.0, "z": 1000.0},
    "rotation": 0,
    "color": "#4e79a7"
}))]
pub struct Item {
    pub id: usize,
    pub dims: Vec3,
    pub original_dims: Vec3,
    #[schema(value_type = u8, minimum = 0, maximum = 5)]
    #[serde(default)]
    pub rotation: Rotation,
    #[serde(default)]
    pub color: String,
}

impl Item {
    /// Creates an unrotated item with validation.
    ///
    /// # Examples
    /// ```
    /// use ems_pack::model::Item;
    ///
    /// assert!(Item::new(1, (10.0, 20.0, 30.0)).is_ok());
    /// assert!(Item::new(1, (-10.0, 20.0, 30.0)).is_err());
    /// ```
    pub fn new(id: usize, dims: (f64, f64, f64)) -> Result<Self, ValidationError> {
        validate_dimensions_3d(dims, "Item")?;
        Ok(Self::from_dims(id, Vec3::from(dims)))
    }

    /// Creates an unrotated item from already validated dimensions.
    pub(crate) fn from_dims(id: usize, dims: Vec3) -> Self {
        Self {
            id,
            dims,
            original_dims: dims,
            rotation: Rotation::Wdh,
            color: display_color(id),
        }
    }

    /// Re-validates an item received from outside (e.g. deserialized).
    ///
    /// The current dimensions are recomputed from the original ones so an
    /// inconsistent payload cannot smuggle in mismatched extents.
    pub fn validated(self) -> Result<Self, ValidationError> {
        validate_dimensions_3d(self.original_dims.as_tuple(), "Item")?;
        Ok(self.rotated(self.rotation))
    }

    /// Returns a new item with `rotation` applied to the original dimensions.
    pub fn rotated(&self, rotation: Rotation) -> Self {
        Self {
            dims: rotation.apply(self.original_dims),
            rotation,
            ..self.clone()
        }
    }

    /// Calculates the volume of the item.
    pub fn volume(&self) -> f64 {
        self.dims.volume()
    }

    /// Current height (Z extent).
    pub fn height(&self) -> f64 {
        self.dims.z
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Vec3 {
        self.dims
    }
}

/// What an item rests on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Supporter {
    Floor,
    Item(usize),
}

/// An item committed at a position in the container.
///
/// Created exactly once when a placement succeeds and never moved afterwards.
///
/// # Fields
/// * `item` - The placed item (with the rotation it was placed in)
/// * `position` - Min corner (x, y, z) in the container
/// * `supporters` - Items (or the floor) the base rests on
/// * `support_ratio` - Supported fraction of the base footprint
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PlacedItem {
    pub item: Item,
    pub position: Vec3,
    pub supporters: Vec<Supporter>,
    pub support_ratio: f64,
}

impl PlacedItem {
    /// Returns the top Z coordinate of the placed item.
    pub fn top_z(&self) -> f64 {
        self.position.z + self.item.dims.z
    }

    /// Calculates the bounding box of the placed item.
    #[inline]
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_position_and_dims(self.position, self.item.dims)
    }
}

impl Dimensional for PlacedItem {
    fn dimensions(&self) -> Vec3 {
        self.item.dims
    }
}
