//! Linear (flat-vector) index: the correctness oracle (spec §4.3, Component G).
//!
//! All queries are O(n). Grounded on the teacher's `ListParetoFront`
//! (`pareto_pq/list.rs`), generalised from "Pareto front storage" to the full
//! [`super::SpatialIndex`] contract.

use crate::error::IndexError;
use crate::point::{Point, Scalar};

use super::{check_dim, satisfies_all, Aabb, Element, ElementId, Predicate, SpatialIndex};

/// Flat-vector spatial index; exists as a reference oracle and a
/// degenerate-small-front fallback.
#[derive(Debug, Clone)]
pub struct LinearIndex<T, V> {
    dimensions: usize,
    elements: Vec<Element<T, V>>,
    next_seq: u64,
}

impl<T: Scalar, V> LinearIndex<T, V> {
    /// Constructs an empty index over `dimensions`-dimensional points.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            elements: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<T: Scalar, V> SpatialIndex<T, V> for LinearIndex<T, V> {
    fn bulk_load(dimensions: usize, elements: Vec<Element<T, V>>) -> Result<Self, IndexError> {
        for e in &elements {
            check_dim(dimensions, &e.point)?;
        }
        let next_seq = elements.iter().map(|e| e.seq + 1).max().unwrap_or(0);
        Ok(Self {
            dimensions,
            elements,
            next_seq,
        })
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn size(&self) -> usize {
        self.elements.len()
    }

    fn clear(&mut self) {
        self.elements.clear();
    }

    fn insert(&mut self, p: Point<T>, v: V) -> Result<ElementId, IndexError> {
        check_dim(self.dimensions, &p)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.elements.push(Element::new(p, v, seq));
        Ok(ElementId::from_seq(seq))
    }

    fn erase(&mut self, p: &Point<T>) -> Result<usize, IndexError> {
        check_dim(self.dimensions, p)?;
        let before = self.elements.len();
        self.elements.retain(|e| e.point != *p);
        Ok(before - self.elements.len())
    }

    fn erase_one(&mut self, id: ElementId) -> Result<bool, IndexError> {
        let before = self.elements.len();
        self.elements.retain(|e| e.seq != id.seq());
        Ok(self.elements.len() < before)
    }

    fn find<'a>(&'a self, p: &Point<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let p = p.clone();
        Box::new(self.elements.iter().filter(move |e| e.point == p))
    }

    fn nearest<'a>(&'a self, p: &Point<T>, k: usize) -> Result<Vec<&'a Element<T, V>>, IndexError> {
        check_dim(self.dimensions, p)?;
        if k == 0 {
            return Err(IndexError::InvalidArgument("k must be > 0".to_string()));
        }
        if self.elements.is_empty() {
            return Err(IndexError::EmptyIndex);
        }
        let mut ranked: Vec<(f64, u64, &Element<T, V>)> = self
            .elements
            .iter()
            .map(|e| (e.point.distance(p), e.seq, e))
            .collect();
        ranked.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        Ok(ranked.into_iter().take(k).map(|(_, _, e)| e).collect())
    }

    fn range<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let bbox = bbox.clone();
        Box::new(self.elements.iter().filter(move |e| bbox.contains_point(&e.point)))
    }

    fn disjoint<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let bbox = bbox.clone();
        Box::new(self.elements.iter().filter(move |e| !bbox.contains_point(&e.point)))
    }

    fn satisfies<'a>(
        &'a self,
        predicates: &'a [Predicate<T>],
    ) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        Box::new(
            self.elements
                .iter()
                .filter(move |e| satisfies_all(predicates, &e.point)),
        )
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        Box::new(self.elements.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elt(coords: Vec<i32>, v: i32, seq: u64) -> Element<i32, i32> {
        Element::new(Point::from_vec(coords), v, seq)
    }

    #[test]
    fn insert_and_find() {
        let mut idx = LinearIndex::<i32, i32>::new(2);
        idx.insert(Point::from_vec(vec![1, 2]), 10).unwrap();
        idx.insert(Point::from_vec(vec![1, 2]), 11).unwrap();
        let found: Vec<_> = idx.find(&Point::from_vec(vec![1, 2])).collect();
        assert_eq!(found.len(), 2);
    }

    #[test]
    fn erase_removes_all_matching() {
        let mut idx = LinearIndex::<i32, i32>::new(2);
        idx.insert(Point::from_vec(vec![1, 2]), 10).unwrap();
        idx.insert(Point::from_vec(vec![1, 2]), 11).unwrap();
        idx.insert(Point::from_vec(vec![3, 3]), 12).unwrap();
        let removed = idx.erase(&Point::from_vec(vec![1, 2])).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(idx.size(), 1);
    }

    #[test]
    fn nearest_orders_by_distance_then_insertion() {
        let mut idx = LinearIndex::<i32, i32>::new(2);
        idx.insert(Point::from_vec(vec![1, 5]), 0).unwrap();
        idx.insert(Point::from_vec(vec![2, 3]), 0).unwrap();
        idx.insert(Point::from_vec(vec![3, 1]), 0).unwrap();
        let got = idx.nearest(&Point::from_vec(vec![0, 0]), 2).unwrap();
        assert_eq!(got[0].point, Point::from_vec(vec![2, 3]));
        assert_eq!(got[1].point, Point::from_vec(vec![3, 1]));
    }

    #[test]
    fn nearest_on_empty_errors() {
        let idx = LinearIndex::<i32, i32>::new(2);
        assert_eq!(
            idx.nearest(&Point::from_vec(vec![0, 0]), 1),
            Err(IndexError::EmptyIndex)
        );
    }

    #[test]
    fn range_query() {
        let mut idx = LinearIndex::<i32, i32>::new(2);
        idx.insert(Point::from_vec(vec![1, 5]), 0).unwrap();
        idx.insert(Point::from_vec(vec![2, 3]), 0).unwrap();
        idx.insert(Point::from_vec(vec![3, 1]), 0).unwrap();
        let bbox = Aabb::new(vec![0, 0], vec![3, 3]);
        let mut found: Vec<_> = idx.range(&bbox).map(|e| e.point.clone()).collect();
        found.sort_by_key(|p| p[0]);
        assert_eq!(
            found,
            vec![Point::from_vec(vec![2, 3]), Point::from_vec(vec![3, 1])]
        );
    }

    #[test]
    fn erase_one_removes_only_the_identified_duplicate() {
        let mut idx = LinearIndex::<i32, i32>::new(2);
        let first = idx.insert(Point::from_vec(vec![1, 2]), 10).unwrap();
        idx.insert(Point::from_vec(vec![1, 2]), 11).unwrap();
        assert!(idx.erase_one(first).unwrap());
        let remaining: Vec<_> = idx.find(&Point::from_vec(vec![1, 2])).map(|e| e.value).collect();
        assert_eq!(remaining, vec![11]);
        assert!(!idx.erase_one(first).unwrap());
    }

    #[test]
    fn bulk_load_rejects_dimension_mismatch() {
        let elements = vec![elt(vec![1, 2, 3], 0, 0)];
        assert!(LinearIndex::<i32, i32>::bulk_load(2, elements).is_err());
    }
}
