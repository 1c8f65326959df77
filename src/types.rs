//! Common types and traits for 3D geometry.
//!
//! This module defines the value types shared by the partitioner, the
//! support validator and the placement policy: vectors, axes, axis-aligned
//! boxes and footprint rectangles.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Global numerical tolerance for floating-point comparisons.
///
/// Used for dimension validation and for detecting a floor-level placement.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// Tolerance for matching a top face against a candidate Z level.
///
/// Measured contact, so it is deliberately coarse (one unit).
pub const SUPPORT_HEIGHT_TOLERANCE: f64 = 1.0;

/// Slack applied when comparing a support ratio against its threshold.
pub const SUPPORT_RATIO_EPSILON: f64 = 1e-3;

/// Represents a 3D vector or point in space.
///
/// Used for positions and dimensions. For dimensions `x` is the width,
/// `y` the depth and `z` the height.
///
/// # Examples
/// ```
/// use ems_pack::types::Vec3;
///
/// let position = Vec3::new(1.0, 2.0, 3.0);
/// let dimensions = Vec3::new(10.0, 20.0, 30.0);
/// assert_eq!((position + dimensions).z, 33.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Dimensions are plain vectors: width, depth, height.
pub type Dimensions = Vec3;

impl Vec3 {
    /// Creates a new 3D vector.
    ///
    /// # Parameters
    /// * `x` - X component (width)
    /// * `y` - Y component (depth)
    /// * `z` - Z component (height)
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Creates a zero vector (origin).
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Converts to tuple format.
    #[inline]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.x, self.y, self.z)
    }

    /// Creates from tuple format.
    #[inline]
    pub const fn from_tuple(tuple: (f64, f64, f64)) -> Self {
        Self::new(tuple.0, tuple.1, tuple.2)
    }

    /// Returns the component along `axis`.
    #[inline]
    pub const fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Returns a copy with the component along `axis` replaced.
    #[inline]
    pub fn with(mut self, axis: Axis, value: f64) -> Self {
        match axis {
            Axis::X => self.x = value,
            Axis::Y => self.y = value,
            Axis::Z => self.z = value,
        }
        self
    }

    /// Calculates the volume (product of all components).
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Calculates the base area (X × Y product).
    #[inline]
    pub fn base_area(&self) -> f64 {
        self.x * self.y
    }

    /// Checks if all components are positive and finite.
    #[inline]
    pub fn is_valid_dimension(&self) -> bool {
        Axis::ALL.iter().all(|&axis| {
            let value = self.get(axis);
            value > 0.0 && value.is_finite()
        })
    }

    /// Checks if the vector fits within another vector (component-wise <=).
    ///
    /// No tolerance: free-space extents are derived from exact coordinates.
    #[inline]
    pub fn fits_within(&self, container: &Self) -> bool {
        self.x <= container.x && self.y <= container.y && self.z <= container.z
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Self;

    #[inline]
    fn mul(self, scalar: f64) -> Self::Output {
        Self::new(self.x * scalar, self.y * scalar, self.z * scalar)
    }
}

impl From<(f64, f64, f64)> for Vec3 {
    #[inline]
    fn from(tuple: (f64, f64, f64)) -> Self {
        Self::from_tuple(tuple)
    }
}

impl From<Vec3> for (f64, f64, f64) {
    #[inline]
    fn from(vec: Vec3) -> Self {
        vec.as_tuple()
    }
}

/// One of the three fixed orthogonal axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];
}

/// Trait for objects with 3D dimensions.
pub trait Dimensional {
    /// Returns the dimensions of the object.
    fn dimensions(&self) -> Vec3;

    /// Calculates the volume.
    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }

    /// Calculates the base area.
    fn base_area(&self) -> f64 {
        self.dimensions().base_area()
    }

    /// Checks if this object fits inside free extents `available`.
    fn fits_in(&self, available: &Vec3) -> bool {
        self.dimensions().fits_within(available)
    }
}

/// Represents an Axis-Aligned Bounding Box (AABB).
///
/// Serves both as the bounds of an empty maximal space and as the box of a
/// placed item.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum corner (position)
    pub min: Vec3,
    /// Maximum corner (position + dimensions)
    pub max: Vec3,
}

impl BoundingBox {
    /// Creates a new bounding box.
    #[inline]
    pub const fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Creates a bounding box from position and dimensions.
    #[inline]
    pub fn from_position_and_dims(position: Vec3, dims: Vec3) -> Self {
        Self {
            min: position,
            max: position + dims,
        }
    }

    /// Returns a copy with the lower bound on `axis` moved to `value`.
    #[inline]
    pub fn with_min(self, axis: Axis, value: f64) -> Self {
        Self::new(self.min.with(axis, value), self.max)
    }

    /// Returns a copy with the upper bound on `axis` moved to `value`.
    #[inline]
    pub fn with_max(self, axis: Axis, value: f64) -> Self {
        Self::new(self.min, self.max.with(axis, value))
    }

    /// Returns the dimensions (width, depth, height).
    #[inline]
    pub fn dimensions(&self) -> Vec3 {
        self.max - self.min
    }

    /// Product of the three spans.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.dimensions().volume()
    }

    /// Projection onto the XY plane.
    #[inline]
    pub fn footprint(&self) -> Rect2 {
        Rect2::new(self.min.x, self.min.y, self.max.x, self.max.y)
    }

    /// Returns the top (Z maximum).
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.max.z
    }
}

/// Axis-aligned rectangle on the footprint (XY) plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect2 {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl Rect2 {
    #[inline]
    pub const fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    #[inline]
    pub fn area(&self) -> f64 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }
}
