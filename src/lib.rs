//! Spatial containers specialised for Pareto-optimal frontier management.
//!
//! Three layered abstractions are built on top of a family of interchangeable
//! spatial-indexing trees:
//!
//! - [`index`] — a family of spatial containers (linear scan, kd-tree, R-tree,
//!   R*-tree, quadtree) sharing one [`index::SpatialIndex`] contract.
//! - [`front`] — a [`front::Front`] is a spatial container that automatically
//!   keeps only the non-dominated points under a per-dimension optimisation
//!   direction.
//! - [`archive`] — an [`archive::Archive`] is a bounded stack of fronts
//!   layered by dominance rank.

#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused_extern_crates)]
#![warn(variant_size_differences)]
#![warn(clippy::similar_names)]
#![warn(clippy::print_stdout)]
#![warn(clippy::use_debug)]

/// Point and direction-vector algebra, and the dominance relation.
pub mod point;

/// Shared error taxonomy for points, indices, fronts and archives.
pub mod error;

/// The spatial-index trait and its five backends.
pub mod index;

/// Pareto fronts: dominance-filtered spatial containers.
pub mod front;

/// Quality indicators computed over a front (hypervolume, IGD, ...).
pub mod indicators;

/// Layered-front archives with bounded capacity.
pub mod archive;

pub use error::{ArchiveError, FrontError, IndexError, PointError};
pub use point::{Direction, Point, PointN};
