//! Single-container 3-D packing with Empty Maximal Spaces.
//!
//! Items are placed one per step into the lowest fitting free space, free
//! space is tracked as a set of overlapping maximal cuboids, and a simulated
//! annealing search reorders and rotates items to raise utilization.

pub mod annealing;
pub mod api;
pub mod benchmark;
pub mod config;
pub mod error;
pub mod generator;
pub mod geometry;
pub mod model;
pub mod packer;
pub mod space;
pub mod support;
pub mod types;
