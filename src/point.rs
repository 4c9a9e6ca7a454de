//! Points, direction vectors and the dominance relation (spec §4.1).

use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Sub};

use crate::error::PointError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Numeric element type usable as a point coordinate.
///
/// Implemented for the common integer and floating-point primitives. Distances
/// are always reported as `f64`, matching the source's "distance type is `T`
/// if `T` is floating, else double" rule for the floating case and giving a
/// single consistent return type otherwise.
pub trait Scalar:
    Copy
    + PartialOrd
    + Default
    + fmt::Debug
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
    /// Converts to `f64` for distance computations.
    fn as_f64(self) -> f64;
}

macro_rules! impl_scalar {
    ($($t:ty),*) => {
        $(impl Scalar for $t {
            fn as_f64(self) -> f64 { self as f64 }
        })*
    };
}

impl_scalar!(i16, i32, i64, u16, u32, u64, isize, usize, f32, f64);

/// A per-axis optimisation direction: `true` minimises that axis, `false`
/// maximises it. A single boolean broadcasts to every axis.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    /// Same direction on every axis.
    All(bool),
    /// One direction per axis.
    PerAxis(Vec<bool>),
}

impl Direction {
    /// Minimise every axis (the default direction).
    pub fn minimise_all() -> Self {
        Direction::All(true)
    }

    /// Maximise every axis.
    pub fn maximise_all() -> Self {
        Direction::All(false)
    }

    /// Returns whether axis `k` is minimised.
    pub fn minimises(&self, k: usize) -> bool {
        match self {
            Direction::All(b) => *b,
            Direction::PerAxis(v) => v[k],
        }
    }

    /// Number of axes this direction is explicit about, or `None` if it
    /// broadcasts to any dimension.
    pub fn len(&self) -> Option<usize> {
        match self {
            Direction::All(_) => None,
            Direction::PerAxis(v) => Some(v.len()),
        }
    }

    /// Checks the direction is compatible with dimension `dim`.
    pub fn check_dim(&self, dim: usize) -> Result<(), PointError> {
        match self.len() {
            Some(n) if n != dim => Err(PointError::DimensionMismatch {
                expected: dim,
                actual: n,
            }),
            _ => Ok(()),
        }
    }
}

impl From<bool> for Direction {
    fn from(b: bool) -> Self {
        Direction::All(b)
    }
}

impl From<Vec<bool>> for Direction {
    fn from(v: Vec<bool>) -> Self {
        Direction::PerAxis(v)
    }
}

/// Compares two equal-length coordinate slices under `direction`.
///
/// Returns `(weakly_better_or_equal_everywhere, strictly_better_somewhere)`.
fn compare_slices<T: Scalar>(a: &[T], b: &[T], direction: &Direction) -> (bool, bool) {
    debug_assert_eq!(a.len(), b.len(), "point dimensions must match");
    let mut no_worse_everywhere = true;
    let mut strictly_better_somewhere = false;
    for (k, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let minimise = direction.minimises(k);
        let better = if minimise { *x < *y } else { *x > *y };
        let worse = if minimise { *x > *y } else { *x < *y };
        if worse {
            no_worse_everywhere = false;
        }
        if better {
            strictly_better_somewhere = true;
        }
    }
    (no_worse_everywhere, strictly_better_somewhere)
}

fn dominates_slice<T: Scalar>(a: &[T], b: &[T], direction: &Direction) -> bool {
    let (no_worse, strictly_better) = compare_slices(a, b, direction);
    no_worse && strictly_better
}

fn strongly_dominates_slice<T: Scalar>(a: &[T], b: &[T], direction: &Direction) -> bool {
    for (k, (x, y)) in a.iter().zip(b.iter()).enumerate() {
        let minimise = direction.minimises(k);
        let strictly_better = if minimise { *x < *y } else { *x > *y };
        if !strictly_better {
            return false;
        }
    }
    true
}

fn euclidean_slice<T: Scalar>(a: &[T], b: &[T]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x.as_f64() - y.as_f64();
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Distance from `p` to the hyperbox weakly dominated by `anchor` under
/// `direction`: each axis is clamped to the improving side before the L2 norm,
/// so axes where `p` already lies in the dominated region contribute zero.
fn distance_to_dominated_box_slice<T: Scalar>(anchor: &[T], p: &[T], direction: &Direction) -> f64 {
    anchor
        .iter()
        .zip(p.iter())
        .enumerate()
        .map(|(k, (a, x))| {
            let gap = if direction.minimises(k) {
                a.as_f64() - x.as_f64()
            } else {
                x.as_f64() - a.as_f64()
            };
            gap.max(0.0).powi(2)
        })
        .sum::<f64>()
        .sqrt()
}

fn quadrant_slice<T: Scalar>(p: &[T], pivot: &[T]) -> u64 {
    let mut mask = 0u64;
    for (k, (x, q)) in p.iter().zip(pivot.iter()).enumerate() {
        if *x <= *q {
            mask |= 1 << k;
        }
    }
    mask
}

/// A dynamically-dimensioned point in ℝᵈ.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point<T> {
    coords: Vec<T>,
}

impl<T: Scalar> Point<T> {
    /// Constructs a zero-filled point of dimension `n`.
    pub fn zeros(n: usize) -> Self {
        Self {
            coords: vec![T::default(); n],
        }
    }

    /// Constructs a point of dimension `n` with every coordinate set to `v`.
    pub fn uniform(n: usize, v: T) -> Self {
        Self {
            coords: vec![v; n],
        }
    }

    /// Constructs a point from an explicit coordinate vector.
    pub fn from_vec(coords: Vec<T>) -> Self {
        Self { coords }
    }

    /// Constructs a point from a slice.
    pub fn from_slice(coords: &[T]) -> Self {
        Self {
            coords: coords.to_vec(),
        }
    }

    /// Number of dimensions.
    pub fn dim(&self) -> usize {
        self.coords.len()
    }

    /// Coordinate slice.
    pub fn as_slice(&self) -> &[T] {
        &self.coords
    }

    /// Positional get; panics (via slice indexing) if `k` is out of range.
    pub fn get(&self, k: usize) -> T {
        self.coords[k]
    }

    /// Positional set.
    pub fn set(&mut self, k: usize, v: T) {
        self.coords[k] = v;
    }

    /// Iterates over the coordinates.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.coords.iter()
    }

    fn check_same_dim(&self, other: &Self) -> Result<(), PointError> {
        if self.dim() != other.dim() {
            Err(PointError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            })
        } else {
            Ok(())
        }
    }

    /// `self` weakly dominates `other` under `direction`: no worse on every
    /// axis, strictly better on at least one.
    pub fn dominates(&self, other: &Self, direction: &Direction) -> bool {
        debug_assert!(self.check_same_dim(other).is_ok());
        dominates_slice(&self.coords, &other.coords, direction)
    }

    /// `self` strongly dominates `other`: strictly better on every axis.
    pub fn strongly_dominates(&self, other: &Self, direction: &Direction) -> bool {
        debug_assert!(self.check_same_dim(other).is_ok());
        strongly_dominates_slice(&self.coords, &other.coords, direction)
    }

    /// Neither point dominates the other (per the documented contract: this
    /// compares `self` against `other`, not `other` against itself).
    pub fn non_dominates(&self, other: &Self, direction: &Direction) -> bool {
        !self.dominates(other, direction) && !other.dominates(self, direction)
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        debug_assert!(self.check_same_dim(other).is_ok());
        euclidean_slice(&self.coords, &other.coords)
    }

    /// Distance from `self` to the hyperbox weakly dominated by `anchor`
    /// under `direction` (§4.1).
    pub fn distance_to_dominated_box(&self, anchor: &Self, direction: &Direction) -> f64 {
        debug_assert!(self.check_same_dim(anchor).is_ok());
        distance_to_dominated_box_slice(&anchor.coords, &self.coords, direction)
    }

    /// Quadrant of `self` relative to `pivot`: bit `k` is set iff
    /// `self[k] <= pivot[k]`.
    pub fn quadrant(&self, pivot: &Self) -> u64 {
        debug_assert!(self.check_same_dim(pivot).is_ok());
        quadrant_slice(&self.coords, &pivot.coords)
    }
}

impl<T> Index<usize> for Point<T> {
    type Output = T;
    fn index(&self, k: usize) -> &T {
        &self.coords[k]
    }
}

impl<T> IndexMut<usize> for Point<T> {
    fn index_mut(&mut self, k: usize) -> &mut T {
        &mut self.coords[k]
    }
}

macro_rules! impl_elementwise_op {
    ($trait:ident, $method:ident) => {
        impl<T: Scalar> $trait for Point<T> {
            type Output = Point<T>;
            fn $method(self, rhs: Self) -> Point<T> {
                assert_eq!(self.dim(), rhs.dim(), "point dimensions must match");
                Point {
                    coords: self
                        .coords
                        .iter()
                        .zip(rhs.coords.iter())
                        .map(|(a, b)| a.$method(*b))
                        .collect(),
                }
            }
        }

        impl<T: Scalar> $trait<T> for Point<T> {
            type Output = Point<T>;
            fn $method(self, rhs: T) -> Point<T> {
                Point {
                    coords: self.coords.iter().map(|a| a.$method(rhs)).collect(),
                }
            }
        }
    };
}

impl_elementwise_op!(Add, add);
impl_elementwise_op!(Sub, sub);
impl_elementwise_op!(Mul, mul);
impl_elementwise_op!(Div, div);

impl<T: fmt::Display> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, c) in self.coords.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", c)?;
        }
        write!(f, ")")
    }
}

impl std::str::FromStr for Point<f64> {
    type Err = PointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s.trim().trim_start_matches('(').trim_end_matches(')');
        let coords: Vec<f64> = inner
            .split(',')
            .filter(|tok| !tok.trim().is_empty())
            .map(|tok| tok.trim().parse::<f64>().unwrap_or(f64::NAN))
            .collect();
        Ok(Point::from_vec(coords))
    }
}

/// A compile-time-dimensioned point in ℝᴰ, convertible to/from [`Point<T>`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PointN<T, const D: usize> {
    coords: [T; D],
}

impl<T: Scalar, const D: usize> PointN<T, D> {
    /// Constructs a zero-filled point.
    pub fn zeros() -> Self {
        Self { coords: [T::default(); D] }
    }

    /// Constructs a point with every coordinate set to `v`.
    pub fn uniform(v: T) -> Self {
        Self { coords: [v; D] }
    }

    /// Constructs a point from a fixed-size array.
    pub fn new(coords: [T; D]) -> Self {
        Self { coords }
    }

    /// Number of dimensions (`D`).
    pub fn dim(&self) -> usize {
        D
    }

    /// Coordinate slice.
    pub fn as_slice(&self) -> &[T] {
        &self.coords
    }

    /// `self` weakly dominates `other` under `direction`.
    pub fn dominates(&self, other: &Self, direction: &Direction) -> bool {
        dominates_slice(&self.coords, &other.coords, direction)
    }

    /// `self` strongly dominates `other`.
    pub fn strongly_dominates(&self, other: &Self, direction: &Direction) -> bool {
        strongly_dominates_slice(&self.coords, &other.coords, direction)
    }

    /// Neither point dominates the other.
    pub fn non_dominates(&self, other: &Self, direction: &Direction) -> bool {
        !self.dominates(other, direction) && !other.dominates(self, direction)
    }

    /// Euclidean distance to `other`.
    pub fn distance(&self, other: &Self) -> f64 {
        euclidean_slice(&self.coords, &other.coords)
    }

    /// Distance from `self` to the hyperbox weakly dominated by `anchor`.
    pub fn distance_to_dominated_box(&self, anchor: &Self, direction: &Direction) -> f64 {
        distance_to_dominated_box_slice(&anchor.coords, &self.coords, direction)
    }

    /// Quadrant of `self` relative to `pivot`.
    pub fn quadrant(&self, pivot: &Self) -> u64 {
        quadrant_slice(&self.coords, &pivot.coords)
    }
}

impl<T, const D: usize> Index<usize> for PointN<T, D> {
    type Output = T;
    fn index(&self, k: usize) -> &T {
        &self.coords[k]
    }
}

impl<T: Scalar, const D: usize> From<PointN<T, D>> for Point<T> {
    fn from(p: PointN<T, D>) -> Self {
        Point::from_vec(p.coords.to_vec())
    }
}

impl<T: Scalar, const D: usize> TryFrom<Point<T>> for PointN<T, D> {
    type Error = PointError;

    fn try_from(p: Point<T>) -> Result<Self, Self::Error> {
        if p.dim() != D {
            return Err(PointError::DimensionMismatch {
                expected: D,
                actual: p.dim(),
            });
        }
        let mut coords = [T::default(); D];
        coords.copy_from_slice(p.as_slice());
        Ok(Self { coords })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dominance_is_antisymmetric_and_irreflexive() {
        let dir = Direction::minimise_all();
        let a = Point::from_vec(vec![1, 0]);
        let b = Point::from_vec(vec![2, 1]);
        assert!(a.dominates(&b, &dir));
        assert!(!b.dominates(&a, &dir));
        assert!(!a.dominates(&a, &dir));
    }

    #[test]
    fn weak_dominance_allows_ties_on_some_axes() {
        let dir = Direction::minimise_all();
        let a = Point::from_vec(vec![1, 0]);
        let b = Point::from_vec(vec![1, 1]);
        assert!(a.dominates(&b, &dir));
        assert!(!a.strongly_dominates(&b, &dir));
    }

    #[test]
    fn non_dominated_pair() {
        let dir = Direction::minimise_all();
        let a = Point::from_vec(vec![1, 0]);
        let b = Point::from_vec(vec![0, 1]);
        assert!(!a.dominates(&b, &dir));
        assert!(!b.dominates(&a, &dir));
        assert!(a.non_dominates(&b, &dir));
    }

    #[test]
    fn dimension_zero_points_dominate_nothing() {
        let dir = Direction::minimise_all();
        let a: Point<i32> = Point::from_vec(vec![]);
        let b: Point<i32> = Point::from_vec(vec![]);
        assert!(!a.dominates(&b, &dir));
        assert!(a.non_dominates(&b, &dir));
    }

    #[test]
    fn distance_to_dominated_box_clamps_improving_side() {
        let dir = Direction::minimise_all();
        let anchor = Point::from_vec(vec![2.0, 2.0]);
        // p already inside the dominated box on both axes: distance is 0
        let inside = Point::from_vec(vec![3.0, 3.0]);
        assert_eq!(inside.distance_to_dominated_box(&anchor, &dir), 0.0);
        // p outside on one axis
        let outside = Point::from_vec(vec![0.0, 3.0]);
        assert_eq!(outside.distance_to_dominated_box(&anchor, &dir), 2.0);
    }

    #[test]
    fn quadrant_bitmask() {
        let pivot = Point::from_vec(vec![5, 5]);
        let p = Point::from_vec(vec![3, 7]);
        // axis 0: 3 <= 5 -> bit 0 set; axis 1: 7 <= 5 false -> bit 1 clear
        assert_eq!(p.quadrant(&pivot), 0b01);
    }

    #[test]
    fn point_n_roundtrips_through_point() {
        let p3 = PointN::<i32, 3>::new([1, 2, 3]);
        let dynamic: Point<i32> = p3.into();
        let back: PointN<i32, 3> = dynamic.try_into().unwrap();
        assert_eq!(back, p3);
    }

    #[test]
    fn display_format() {
        let p = Point::from_vec(vec![1, 2, 3]);
        assert_eq!(p.to_string(), "(1, 2, 3)");
    }
}
