//! Quadtree index (spec §4.3, Component F).
//!
//! Each internal node has `2^d` children, indexed by the quadrant
//! (`Point::quadrant`) of a point relative to the node's pivot — the first
//! point inserted into that node, chosen the way the teacher's
//! `naive_kd_tree.rs` picks its first-inserted node as an implicit split
//! point, generalised here from a binary (1-bit) split to a `2^d`-ary one.
//! Split threshold is a small per-leaf capacity.

use crate::error::IndexError;
use crate::point::{Point, Scalar};

use super::{check_dim, satisfies_all, Aabb, Element, ElementId, Predicate, SpatialIndex};

const DEFAULT_LEAF_CAPACITY: usize = 8;

#[derive(Debug)]
enum NodeKind<T, V> {
    Leaf(Vec<Element<T, V>>),
    Internal {
        pivot: Point<T>,
        children: Vec<Option<Box<Node<T, V>>>>,
    },
}

#[derive(Debug)]
struct Node<T, V> {
    kind: NodeKind<T, V>,
}

impl<T: Scalar, V> Node<T, V> {
    fn empty_leaf() -> Self {
        Node {
            kind: NodeKind::Leaf(Vec::new()),
        }
    }
}

/// Quadtree spatial index.
#[derive(Debug)]
pub struct QuadtreeIndex<T, V> {
    dimensions: usize,
    root: Node<T, V>,
    size: usize,
    next_seq: u64,
    leaf_capacity: usize,
}

impl<T: Scalar + Clone, V: Clone> QuadtreeIndex<T, V> {
    /// Constructs an empty index with the default leaf capacity.
    pub fn new(dimensions: usize) -> Self {
        Self::with_leaf_capacity(dimensions, DEFAULT_LEAF_CAPACITY)
    }

    /// Constructs an empty index with an explicit leaf capacity.
    pub fn with_leaf_capacity(dimensions: usize, leaf_capacity: usize) -> Self {
        Self {
            dimensions,
            root: Node::empty_leaf(),
            size: 0,
            next_seq: 0,
            leaf_capacity: leaf_capacity.max(1),
        }
    }

    fn insert_rec(node: &mut Node<T, V>, elt: Element<T, V>, dims: usize, leaf_capacity: usize) {
        match &mut node.kind {
            NodeKind::Internal { pivot, children } => {
                let q = elt.point.quadrant(pivot) as usize;
                match &mut children[q] {
                    Some(child) => Self::insert_rec(child, elt, dims, leaf_capacity),
                    slot @ None => {
                        let mut leaf = Node::empty_leaf();
                        Self::insert_rec(&mut leaf, elt, dims, leaf_capacity);
                        *slot = Some(Box::new(leaf));
                    }
                }
            }
            NodeKind::Leaf(elements) => {
                elements.push(elt);
                if elements.len() > leaf_capacity {
                    let pivot = elements[0].point.clone();
                    let drained = std::mem::take(elements);
                    let distinct_quadrants = drained
                        .iter()
                        .map(|e| e.point.quadrant(&pivot))
                        .collect::<std::collections::HashSet<_>>()
                        .len();
                    if distinct_quadrants <= 1 {
                        // all land in the same quadrant as the pivot; splitting would not terminate
                        *elements = drained;
                        return;
                    }
                    let mut children: Vec<Option<Box<Node<T, V>>>> =
                        (0..1usize << dims).map(|_| None).collect();
                    for e in drained {
                        let q = e.point.quadrant(&pivot) as usize;
                        match &mut children[q] {
                            Some(child) => Self::insert_rec(child, e, dims, leaf_capacity),
                            slot @ None => {
                                let mut leaf = Node::empty_leaf();
                                Self::insert_rec(&mut leaf, e, dims, leaf_capacity);
                                *slot = Some(Box::new(leaf));
                            }
                        }
                    }
                    node.kind = NodeKind::Internal { pivot, children };
                }
            }
        }
    }

    fn rec_collect_all<'a>(node: &'a Node<T, V>, out: &mut Vec<&'a Element<T, V>>) {
        match &node.kind {
            NodeKind::Leaf(elements) => out.extend(elements.iter()),
            NodeKind::Internal { children, .. } => {
                for c in children.iter().flatten() {
                    Self::rec_collect_all(c, out);
                }
            }
        }
    }

    fn rebuild_from(&mut self, elements: Vec<Element<T, V>>) {
        self.size = elements.len();
        self.root = Node::empty_leaf();
        let dims = self.dimensions;
        let cap = self.leaf_capacity;
        for e in elements {
            Self::insert_rec(&mut self.root, e, dims, cap);
        }
    }
}

impl<T: Scalar + Clone, V: Clone> SpatialIndex<T, V> for QuadtreeIndex<T, V> {
    fn bulk_load(dimensions: usize, elements: Vec<Element<T, V>>) -> Result<Self, IndexError> {
        for e in &elements {
            check_dim(dimensions, &e.point)?;
        }
        let next_seq = elements.iter().map(|e| e.seq + 1).max().unwrap_or(0);
        let mut idx = Self::new(dimensions);
        idx.next_seq = next_seq;
        idx.rebuild_from(elements);
        Ok(idx)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn size(&self) -> usize {
        self.size
    }

    fn clear(&mut self) {
        self.root = Node::empty_leaf();
        self.size = 0;
    }

    fn insert(&mut self, p: Point<T>, v: V) -> Result<ElementId, IndexError> {
        check_dim(self.dimensions, &p)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        Self::insert_rec(
            &mut self.root,
            Element::new(p, v, seq),
            self.dimensions,
            self.leaf_capacity,
        );
        self.size += 1;
        Ok(ElementId::from_seq(seq))
    }

    fn erase(&mut self, p: &Point<T>) -> Result<usize, IndexError> {
        check_dim(self.dimensions, p)?;
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        let before = all.len();
        let kept: Vec<Element<T, V>> = all.into_iter().filter(|e| e.point != *p).cloned().collect();
        let removed = before - kept.len();
        self.rebuild_from(kept);
        Ok(removed)
    }

    fn erase_one(&mut self, id: ElementId) -> Result<bool, IndexError> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        let before = all.len();
        let kept: Vec<Element<T, V>> = all.into_iter().filter(|e| e.seq != id.seq()).cloned().collect();
        let found = kept.len() < before;
        if found {
            self.rebuild_from(kept);
        }
        Ok(found)
    }

    fn find<'a>(&'a self, p: &Point<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        let target = p.clone();
        Box::new(all.into_iter().filter(move |e| e.point == target))
    }

    fn nearest<'a>(&'a self, p: &Point<T>, k: usize) -> Result<Vec<&'a Element<T, V>>, IndexError> {
        check_dim(self.dimensions, p)?;
        if k == 0 {
            return Err(IndexError::InvalidArgument("k must be > 0".to_string()));
        }
        if self.size == 0 {
            return Err(IndexError::EmptyIndex);
        }
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        all.sort_by(|a, b| {
            a.point
                .distance(p)
                .partial_cmp(&b.point.distance(p))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
        Ok(all.into_iter().take(k).collect())
    }

    fn range<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        let bbox = bbox.clone();
        Box::new(all.into_iter().filter(move |e| bbox.contains_point(&e.point)))
    }

    fn disjoint<'a>(&'a self, bbox: &Aabb<T>) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        let bbox = bbox.clone();
        Box::new(all.into_iter().filter(move |e| !bbox.contains_point(&e.point)))
    }

    fn satisfies<'a>(
        &'a self,
        predicates: &'a [Predicate<T>],
    ) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        Box::new(all.into_iter().filter(move |e| satisfies_all(predicates, &e.point)))
    }

    fn iter<'a>(&'a self) -> Box<dyn Iterator<Item = &'a Element<T, V>> + 'a> {
        let mut all = Vec::new();
        Self::rec_collect_all(&self.root, &mut all);
        Box::new(all.into_iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_find_2d() {
        let mut idx: QuadtreeIndex<i32, i32> = QuadtreeIndex::with_leaf_capacity(2, 2);
        for i in 0..20 {
            idx.insert(Point::from_vec(vec![i, -i]), i).unwrap();
        }
        assert_eq!(idx.size(), 20);
        assert!(idx.contains(&Point::from_vec(vec![5, -5])));
    }

    #[test]
    fn range_query_matches_brute_force() {
        let mut idx: QuadtreeIndex<i32, i32> = QuadtreeIndex::with_leaf_capacity(2, 2);
        for i in 0..20 {
            idx.insert(Point::from_vec(vec![i, i]), i).unwrap();
        }
        let bbox = Aabb::new(vec![5, 5], vec![10, 10]);
        let mut found: Vec<_> = idx.range(&bbox).map(|e| e.point[0]).collect();
        found.sort_unstable();
        assert_eq!(found, (5..=10).collect::<Vec<_>>());
    }

    #[test]
    fn erase_removes_point() {
        let mut idx: QuadtreeIndex<i32, i32> = QuadtreeIndex::with_leaf_capacity(2, 2);
        for i in 0..10 {
            idx.insert(Point::from_vec(vec![i, i]), i).unwrap();
        }
        assert_eq!(idx.erase(&Point::from_vec(vec![3, 3])).unwrap(), 1);
        assert_eq!(idx.size(), 9);
    }

    #[test]
    fn erase_one_removes_only_the_identified_duplicate() {
        let mut idx: QuadtreeIndex<i32, i32> = QuadtreeIndex::with_leaf_capacity(2, 2);
        let first = idx.insert(Point::from_vec(vec![1, 2]), 10).unwrap();
        idx.insert(Point::from_vec(vec![1, 2]), 11).unwrap();
        assert!(idx.erase_one(first).unwrap());
        assert_eq!(idx.size(), 1);
        let remaining: Vec<_> = idx.find(&Point::from_vec(vec![1, 2])).map(|e| e.value).collect();
        assert_eq!(remaining, vec![11]);
        assert!(!idx.erase_one(first).unwrap());
    }

    #[test]
    fn exact_duplicate_run_past_leaf_capacity_does_not_overflow_the_stack() {
        let mut idx: QuadtreeIndex<i32, i32> = QuadtreeIndex::with_leaf_capacity(2, 4);
        for i in 0..500 {
            idx.insert(Point::from_vec(vec![7, 7]), i).unwrap();
        }
        assert_eq!(idx.size(), 500);
        assert_eq!(idx.find(&Point::from_vec(vec![7, 7])).count(), 500);
    }
}
