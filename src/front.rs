//! The Pareto front (spec §4.4, Component H): a spatial index plus a
//! direction vector, maintaining the invariant that no two stored points are
//! in a dominance relation.

use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;

use crate::error::FrontError;
use crate::index::{Element, Predicate, SpatialIndex};
use crate::indicators;
use crate::point::{Direction, Point, Scalar};

/// Outcome of [`Front::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome<T, V> {
    /// The point was non-dominated and is now stored.
    Inserted,
    /// The point was dominated by an existing element, which is returned.
    Rejected(Element<T, V>),
}

/// A Pareto front backed by a generic spatial index `I`.
///
/// `I` is a static type parameter — per spec.md §9's guidance to "dispatch
/// statically where possible, dynamically only at the front boundary" — so
/// callers pick the backend once, at the type level, and every query after
/// that is monomorphised. Only the per-element iterators [`SpatialIndex`]
/// returns are boxed.
#[derive(Debug)]
pub struct Front<T, V, I> {
    index: I,
    direction: Direction,
    generation: u64,
    hv_cache: RefCell<Option<(u64, f64)>>,
    uniformity_cache: RefCell<Option<(u64, (f64, f64, f64))>>,
    _marker: PhantomData<fn() -> (T, V)>,
}

impl<T: Scalar + Clone, V: Clone, I: SpatialIndex<T, V>> Front<T, V, I> {
    /// Wraps `index` with `direction`, which must either broadcast or name
    /// exactly `index.dimensions()` axes.
    pub fn new(index: I, direction: Direction) -> Result<Self, FrontError> {
        direction
            .check_dim(index.dimensions())
            .map_err(|e| FrontError::Index(crate::error::IndexError::DimensionMismatch(e)))?;
        Ok(Self {
            index,
            direction,
            generation: 0,
            hv_cache: RefCell::new(None),
            uniformity_cache: RefCell::new(None),
            _marker: PhantomData,
        })
    }

    /// The front's direction vector.
    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// Monotonically increasing mutation counter (spec §5, Testable
    /// Property 7): bumped by every successful `insert`/`erase`/`clear`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Read access to the underlying index, for direct range/nearest queries.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// Number of stored (pairwise non-dominated) elements.
    pub fn size(&self) -> usize {
        self.index.size()
    }

    /// Whether the front holds no elements.
    pub fn is_empty(&self) -> bool {
        self.index.empty()
    }

    fn bump(&mut self) {
        self.generation += 1;
    }

    /// The dominance-filtered insert protocol (spec §4.4):
    /// 1. Reject if any stored element dominates `p`.
    /// 2. Otherwise erase every element `p` dominates.
    /// 3. Insert `(p, v)` and invalidate indicator caches.
    pub fn insert(&mut self, p: Point<T>, v: V) -> Result<InsertOutcome<T, V>, FrontError> {
        let blocker = self
            .index
            .satisfies(&[Predicate::Dominates(p.clone(), self.direction.clone())])
            .next()
            .cloned();
        if let Some(blocker) = blocker {
            return Ok(InsertOutcome::Rejected(blocker));
        }

        let dominated: Vec<Point<T>> = self
            .index
            .satisfies(&[Predicate::DominatedBy(p.clone(), self.direction.clone())])
            .map(|e| e.point.clone())
            .collect();
        for dp in &dominated {
            self.index.erase(dp)?;
        }
        self.index.insert(p, v)?;
        self.bump();
        Ok(InsertOutcome::Inserted)
    }

    /// Removes every element stored at exactly `p`, invalidating caches if
    /// anything was actually removed.
    pub fn erase(&mut self, p: &Point<T>) -> Result<usize, FrontError> {
        let removed = self.index.erase(p)?;
        if removed > 0 {
            self.bump();
        }
        Ok(removed)
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.index.clear();
        self.bump();
    }

    /// Whether some stored element dominates `p`.
    pub fn dominates(&self, p: &Point<T>) -> bool {
        self.index
            .satisfies(&[Predicate::Dominates(p.clone(), self.direction.clone())])
            .next()
            .is_some()
    }

    /// Whether `p` dominates some stored element.
    pub fn is_dominated_by(&self, p: &Point<T>) -> bool {
        self.index
            .satisfies(&[Predicate::DominatedBy(p.clone(), self.direction.clone())])
            .next()
            .is_some()
    }

    /// Whether `p` is incomparable to every stored element.
    pub fn non_dominated_with(&self, p: &Point<T>) -> bool {
        !self.dominates(p) && !self.is_dominated_by(p)
    }

    fn componentwise_extreme(&self, minimise_wants: impl Fn(bool, T, T) -> bool) -> Result<Point<T>, FrontError> {
        let mut iter = self.index.iter();
        let first = iter.next().ok_or(FrontError::EmptyFront)?;
        let dim = first.point.dim();
        let mut acc: Vec<T> = first.point.as_slice().to_vec();
        for e in iter {
            for k in 0..dim {
                let candidate = e.point[k];
                if minimise_wants(self.direction.minimises(k), candidate, acc[k]) {
                    acc[k] = candidate;
                }
            }
        }
        Ok(Point::from_vec(acc))
    }

    /// The componentwise best point across the front.
    pub fn ideal(&self) -> Result<Point<T>, FrontError> {
        self.componentwise_extreme(|minimise, candidate, best| {
            if minimise {
                candidate < best
            } else {
                candidate > best
            }
        })
    }

    /// The componentwise worst point among the front's non-dominated points.
    pub fn nadir(&self) -> Result<Point<T>, FrontError> {
        self.componentwise_extreme(|minimise, candidate, best| {
            if minimise {
                candidate > best
            } else {
                candidate < best
            }
        })
    }

    /// The componentwise worst point across the underlying index; equal to
    /// [`Front::nadir`] as long as the front invariant holds.
    pub fn worst(&self) -> Result<Point<T>, FrontError> {
        self.nadir()
    }

    fn points(&self) -> Vec<Point<T>> {
        self.index.iter().map(|e| e.point.clone()).collect()
    }

    /// Hypervolume of the front w.r.t. `reference` (or, if `None`, the
    /// front's own [`Front::nadir`]). Cached on the no-reference path.
    pub fn hypervolume(&self, reference: Option<&Point<T>>) -> Result<f64, FrontError> {
        let use_cache = reference.is_none();
        if use_cache {
            if let Some((gen, value)) = *self.hv_cache.borrow() {
                if gen == self.generation {
                    return Ok(value);
                }
            }
        }
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        let owned_nadir;
        let reference_point = match reference {
            Some(r) => r,
            None => {
                owned_nadir = self.nadir()?;
                &owned_nadir
            }
        };
        let value = indicators::hypervolume(&points, &self.direction, reference_point);
        if use_cache {
            *self.hv_cache.borrow_mut() = Some((self.generation, value));
        }
        Ok(value)
    }

    /// Monte-Carlo hypervolume estimate: `(estimate, 95% confidence half-width)`.
    pub fn hypervolume_monte_carlo(
        &self,
        reference: Option<&Point<T>>,
        samples: usize,
    ) -> Result<(f64, f64), FrontError> {
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        let owned_nadir;
        let reference_point = match reference {
            Some(r) => r,
            None => {
                owned_nadir = self.nadir()?;
                &owned_nadir
            }
        };
        Ok(indicators::hypervolume_monte_carlo(&points, &self.direction, reference_point, samples))
    }

    /// Inverted generational distance against `reference_set`.
    pub fn igd(&self, reference_set: &[Point<T>]) -> Result<f64, FrontError> {
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        Ok(indicators::igd(&points, reference_set))
    }

    /// Generational distance against `reference_set`.
    pub fn gd(&self, reference_set: &[Point<T>]) -> Result<f64, FrontError> {
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        Ok(indicators::gd(&points, reference_set))
    }

    /// IGD⁺ against `reference_set` (distance-to-dominated-box instead of
    /// Euclidean distance).
    pub fn igd_plus(&self, reference_set: &[Point<T>]) -> Result<f64, FrontError> {
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        Ok(indicators::igd_plus(&points, reference_set, &self.direction))
    }

    /// The additive epsilon indicator against `reference_set`.
    pub fn epsilon_indicator(&self, reference_set: &[Point<T>]) -> Result<f64, FrontError> {
        let points = self.points();
        if points.is_empty() {
            return Err(FrontError::EmptyFront);
        }
        Ok(indicators::epsilon_indicator(&points, reference_set, &self.direction))
    }

    /// `(min, mean, stddev)` of nearest-neighbour gaps between the front's
    /// points. Cached like [`Front::hypervolume`].
    pub fn uniformity(&self) -> Result<(f64, f64, f64), FrontError> {
        if let Some((gen, value)) = *self.uniformity_cache.borrow() {
            if gen == self.generation {
                return Ok(value);
            }
        }
        let points = self.points();
        if points.len() < 2 {
            return Err(FrontError::EmptyFront);
        }
        let value = indicators::uniformity(&points);
        *self.uniformity_cache.borrow_mut() = Some((self.generation, value));
        Ok(value)
    }

    /// `(|self dominated by some of `other`|, |`other` dominated by some of self|)`.
    pub fn cardinality_vs(&self, other: &[Point<T>]) -> (usize, usize) {
        indicators::cardinality_vs(&self.points(), other, &self.direction)
    }

    /// The C-metric `C(self, other)`: fraction of `other` dominated by this front.
    pub fn c_metric(&self, other: &[Point<T>]) -> f64 {
        indicators::c_metric(&self.points(), other, &self.direction)
    }

    /// Conflict between objectives `axis_i` and `axis_j` across this front.
    pub fn conflict(&self, axis_i: usize, axis_j: usize) -> f64 {
        indicators::conflict(&self.points(), axis_i, axis_j)
    }
}

/// The text form (spec §6): one element per line, point then value.
impl<T, V, I> fmt::Display for Front<T, V, I>
where
    T: Scalar + Clone + fmt::Display,
    V: Clone + fmt::Display,
    I: SpatialIndex<T, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in self.index.iter() {
            writeln!(f, "{} {}", e.point, e.value)?;
        }
        Ok(())
    }
}
