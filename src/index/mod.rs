//! The spatial-index contract (spec §4.2) and its five interchangeable
//! backends (spec §4.3).

use std::fmt;

use crate::error::IndexError;
use crate::point::{Direction, Point, Scalar};

pub mod linear;
pub mod kd_tree;
pub mod quadtree;
pub mod rtree;
pub mod rstar;

pub use linear::LinearIndex;
pub use kd_tree::KdTreeIndex;
pub use quadtree::QuadtreeIndex;
pub use rtree::RTreeIndex;
pub use rstar::RStarTreeIndex;

/// Opaque handle to a single stored element, returned by
/// [`SpatialIndex::insert`] and accepted by [`SpatialIndex::erase_one`] to
/// remove exactly that element and no other duplicate at the same point.
///
/// This is the Rust-shaped stand-in for spec.md §4.2's C++-flavoured
/// "`insert` returns iterator" / "`erase(iterator)`" pair: a borrowed
/// iterator cannot be held across the mutation that would invalidate it
/// (spec.md §5), so the identity it would have pointed at is carried
/// instead, as the element's insertion sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(u64);

impl ElementId {
    pub(crate) fn from_seq(seq: u64) -> Self {
        Self(seq)
    }

    pub(crate) fn seq(self) -> u64 {
        self.0
    }
}

/// A `(point, value)` pair stored in an index.
///
/// `seq` is a monotonically increasing insertion stamp used to break ties
/// among equally-ranked candidates (nearest-neighbour ties, split
/// distributions): stable insertion order, per spec §4.3.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<T, V> {
    /// The element's coordinates.
    pub point: Point<T>,
    /// The user-supplied payload.
    pub value: V,
    /// Insertion sequence number, used for stable tie-breaking.
    pub seq: u64,
}

impl<T, V> Element<T, V> {
    /// Constructs a new element.
    pub fn new(point: Point<T>, value: V, seq: u64) -> Self {
        Self { point, value, seq }
    }
}

/// An axis-aligned closed box in ℝᵈ.
#[derive(Debug, Clone, PartialEq)]
pub struct Aabb<T> {
    /// Per-axis lower bound (inclusive).
    pub min: Vec<T>,
    /// Per-axis upper bound (inclusive).
    pub max: Vec<T>,
}

impl<T: Scalar> Aabb<T> {
    /// Constructs a box from explicit corners.
    pub fn new(min: Vec<T>, max: Vec<T>) -> Self {
        debug_assert_eq!(min.len(), max.len());
        Self { min, max }
    }

    /// The degenerate box containing only `p`.
    pub fn from_point(p: &Point<T>) -> Self {
        Self {
            min: p.as_slice().to_vec(),
            max: p.as_slice().to_vec(),
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.min.len()
    }

    /// Whether `p` lies within the box (borders included).
    pub fn contains_point(&self, p: &Point<T>) -> bool {
        (0..self.dim()).all(|k| self.min[k] <= p[k] && p[k] <= self.max[k])
    }

    /// Whether `self` and `other` overlap (borders included).
    pub fn intersects(&self, other: &Aabb<T>) -> bool {
        (0..self.dim()).all(|k| self.min[k] <= other.max[k] && other.min[k] <= self.max[k])
    }

    /// The minimum box enclosing both `self` and `other`.
    pub fn union(&self, other: &Aabb<T>) -> Aabb<T> {
        let min = (0..self.dim())
            .map(|k| if self.min[k] < other.min[k] { self.min[k] } else { other.min[k] })
            .collect();
        let max = (0..self.dim())
            .map(|k| if self.max[k] > other.max[k] { self.max[k] } else { other.max[k] })
            .collect();
        Aabb { min, max }
    }

    /// Grows `self` to also enclose `p`, in place.
    pub fn enlarge_to_contain(&mut self, p: &Point<T>) {
        for k in 0..self.dim() {
            if p[k] < self.min[k] {
                self.min[k] = p[k];
            }
            if p[k] > self.max[k] {
                self.max[k] = p[k];
            }
        }
    }

    /// The d-dimensional volume (hyper-area) of the box.
    pub fn area(&self) -> f64 {
        (0..self.dim())
            .map(|k| (self.max[k].as_f64() - self.min[k].as_f64()).max(0.0))
            .product()
    }

    /// The sum of edge lengths (used by R*-tree split-axis selection).
    pub fn perimeter(&self) -> f64 {
        (0..self.dim())
            .map(|k| (self.max[k].as_f64() - self.min[k].as_f64()).max(0.0))
            .sum()
    }

    /// Area of the overlap between `self` and `other` (0 if disjoint).
    pub fn overlap_area(&self, other: &Aabb<T>) -> f64 {
        let mut acc = 1.0;
        for k in 0..self.dim() {
            let lo = if self.min[k] > other.min[k] { self.min[k] } else { other.min[k] };
            let hi = if self.max[k] < other.max[k] { self.max[k] } else { other.max[k] };
            let span = (hi.as_f64() - lo.as_f64()).max(0.0);
            acc *= span;
        }
        acc
    }

    /// Center of the box.
    pub fn center(&self) -> Point<f64> {
        Point::from_vec(
            (0..self.dim())
                .map(|k| (self.min[k].as_f64() + self.max[k].as_f64()) / 2.0)
                .collect(),
        )
    }
}

/// A predicate over a single point, used by [`SpatialIndex::satisfies`].
/// A query is the conjunction of a slice of predicates.
#[derive(Debug, Clone)]
pub enum Predicate<T> {
    /// Axis `k`'s coordinate is `<= value`.
    AxisLe(usize, T),
    /// Axis `k`'s coordinate is `>= value`.
    AxisGe(usize, T),
    /// Axis `k`'s coordinate equals `value`.
    AxisEq(usize, T),
    /// The stored point is dominated by `reference` under `direction`.
    DominatedBy(Point<T>, Direction),
    /// The stored point dominates `reference` under `direction`.
    Dominates(Point<T>, Direction),
}

impl<T: Scalar> Predicate<T> {
    /// Evaluates the predicate against `p`.
    pub fn test(&self, p: &Point<T>) -> bool {
        match self {
            Predicate::AxisLe(k, v) => p[*k] <= *v,
            Predicate::AxisGe(k, v) => p[*k] >= *v,
            Predicate::AxisEq(k, v) => p[*k] == *v,
            Predicate::DominatedBy(reference, direction) => reference.dominates(p, direction),
            Predicate::Dominates(reference, direction) => p.dominates(reference, direction),
        }
    }
}

fn satisfies_all<T: Scalar>(predicates: &[Predicate<T>], p: &Point<T>) -> bool {
    predicates.iter().all(|pred| pred.test(p))
}

/// Uniform contract implemented by every spatial-index backend (spec §4.2).
///
/// Iteration is lazy: implementations return boxed iterators that materialise
/// matching elements on demand. Per spec §5, mutating the index invalidates
/// all outstanding iterators — the borrow checker enforces this structurally
/// since every query borrows `&self` and every mutator takes `&mut self`.
pub trait SpatialIndex<T: Scalar, V>: fmt::Debug {
    /// Builds an index from a batch of elements (expected O(n log n)).
    fn bulk_load(dimensions: usize, elements: Vec<Element<T, V>>) -> Result<Self, IndexError>
    where
        Self: Sized;

    /// Dimension of points stored in this index.
    fn dimensions(&self) -> usize;

    /// Number of stored elements (duplicates counted individually).
    fn size(&self) -> usize;

    /// Whether the index holds no elements.
    fn empty(&self) -> bool {
        self.size() == 0
    }

    /// Removes every element.
    fn clear(&mut self);

    /// Inserts `(p, v)`; duplicates of an existing point are permitted.
    /// Returns a handle identifying exactly this element, for use with
    /// [`SpatialIndex::erase_one`].
    fn insert(&mut self, p: Point<T>, v: V) -> Result<ElementId, IndexError>;

    /// Removes every element stored at exactly `p`. Returns the count removed.
    fn erase(&mut self, p: &Point<T>) -> Result<usize, IndexError>;

    /// Removes exactly the element identified by `id`, leaving any other
    /// element at the same point untouched. Returns whether an element with
    /// that id was present.
    fn erase_one(&mut self, id: ElementId) -> Result<bool, IndexError>;

    /// All elements stored at exactly `p`.
    fn find<'a>(&'a self, p: &Point<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a>;

    /// Whether any element is stored at exactly `p`.
    fn contains(&self, p: &Point<T>) -> bool {
        self.find(p).next().is_some()
    }

    /// The `k` nearest elements to `p` by Euclidean distance, increasing,
    /// ties broken by insertion order.
    fn nearest<'a>(&'a self, p: &Point<T>, k: usize) -> Result<Vec<&'a Element<T, V>>, IndexError>;

    /// Elements whose point lies within `bbox` (borders included).
    fn range<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a>;

    /// Elements whose point lies outside `bbox`.
    fn disjoint<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a>;

    /// Elements whose point satisfies every predicate in `predicates`.
    fn satisfies<'a>(
        &'a self,
        predicates: &'a [Predicate<T>],
    ) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a>;

    /// Iterates over every stored element.
    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a>;
}

/// Checks `p`'s dimension against the index's.
pub(crate) fn check_dim<T>(index_dim: usize, p: &Point<T>) -> Result<(), IndexError> {
    if p.dim() != index_dim {
        Err(IndexError::DimensionMismatch(crate::error::PointError::DimensionMismatch {
            expected: index_dim,
            actual: p.dim(),
        }))
    } else {
        Ok(())
    }
}
