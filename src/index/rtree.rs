//! R-tree index with quadratic split (spec §4.3, Component C).
//!
//! Grounded on the teacher's boxed-child-link node shape
//! (`pareto_pq/naive_kd_tree.rs`'s `Node`/`attach_left`/`attach_right`),
//! generalised from a binary tree to an n-ary bounding-box tree. Insert
//! descends by minimum-area-enlargement; on leaf overflow a quadratic split
//! picks the two seed children maximising wasted area and distributes the
//! rest greedily by minimum group enlargement.

use crate::error::IndexError;
use crate::point::{Point, Scalar};

use super::{check_dim, satisfies_all, Aabb, Element, ElementId, Predicate, SpatialIndex};

/// Branch-factor bounds: every non-root node holds between `min` and `max`
/// children, with `2 <= min <= ceil(max/2)` (spec §3).
#[derive(Debug, Clone, Copy)]
pub struct BranchFactor {
    /// Minimum children per non-root node.
    pub min: usize,
    /// Maximum children per node.
    pub max: usize,
}

impl Default for BranchFactor {
    fn default() -> Self {
        Self { min: 4, max: 8 }
    }
}

#[derive(Debug)]
enum NodeKind<T, V> {
    Leaf(Vec<Element<T, V>>),
    Internal(Vec<Child<T, V>>),
}

#[derive(Debug)]
struct Child<T, V> {
    bounds: Aabb<T>,
    node: Box<Node<T, V>>,
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

    fn bounds(&self) -> Option<Aabb<T>> {
        match &self.kind {
            NodeKind::Leaf(elements) => elements
                .iter()
                .map(|e| Aabb::from_point(&e.point))
                .reduce(|a, b| a.union(&b)),
            NodeKind::Internal(children) => {
                children.iter().map(|c| c.bounds.clone()).reduce(|a, b| a.union(&b))
            }
        }
    }
}

/// Picks the pair of items whose combined bounding box wastes the most area
/// (the quadratic-split seed heuristic). Returns `(seed_a, seed_b, rest)`.
fn quadratic_seeds<T: Scalar, E: Clone>(
    mut items: Vec<E>,
    bbox_of: impl Fn(&E) -> Aabb<T>,
) -> (E, E, Vec<E>) {
    let mut best = (0usize, 1usize, f64::MIN);
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let bi = bbox_of(&items[i]);
            let bj = bbox_of(&items[j]);
            let waste = bi.union(&bj).area() - bi.area() - bj.area();
            if waste > best.2 {
                best = (i, j, waste);
            }
        }
    }
    let (i, j, _) = best;
    let b = items.remove(j);
    let a = items.remove(i);
    (a, b, items)
}

/// Greedily distributes `rest` between the two seed groups, minimising each
/// assignment's bounding-box enlargement, while forcing items to whichever
/// group would otherwise fall below `branch.min`.
fn distribute<T: Scalar, E: Clone>(
    seed_a: E,
    seed_b: E,
    rest: Vec<E>,
    branch: BranchFactor,
    bbox_of: impl Fn(&E) -> Aabb<T>,
) -> (Vec<E>, Vec<E>) {
    let mut bbox_a = bbox_of(&seed_a);
    let mut bbox_b = bbox_of(&seed_b);
    let mut group_a = vec![seed_a];
    let mut group_b = vec![seed_b];
    let mut remaining = rest;

    while !remaining.is_empty() {
        if group_a.len() + remaining.len() <= branch.min {
            for item in remaining.drain(..) {
                bbox_a = bbox_a.union(&bbox_of(&item));
                group_a.push(item);
            }
            break;
        }
        if group_b.len() + remaining.len() <= branch.min {
            for item in remaining.drain(..) {
                bbox_b = bbox_b.union(&bbox_of(&item));
                group_b.push(item);
            }
            break;
        }
        let item = remaining.remove(0);
        let bb = bbox_of(&item);
        let enlarge_a = bbox_a.union(&bb).area() - bbox_a.area();
        let enlarge_b = bbox_b.union(&bb).area() - bbox_b.area();
        let goes_to_a = enlarge_a < enlarge_b || (enlarge_a == enlarge_b && bbox_a.area() <= bbox_b.area());
        if goes_to_a {
            bbox_a = bbox_a.union(&bb);
            group_a.push(item);
        } else {
            bbox_b = bbox_b.union(&bb);
            group_b.push(item);
        }
    }
    (group_a, group_b)
}

/// R-tree spatial index.
#[derive(Debug)]
pub struct RTreeIndex<T, V> {
    dimensions: usize,
    root: Node<T, V>,
    size: usize,
    next_seq: u64,
    branch: BranchFactor,
}

impl<T: Scalar + Clone, V: Clone> RTreeIndex<T, V> {
    /// Constructs an empty index with the default branch factor.
    pub fn new(dimensions: usize) -> Self {
        Self::with_branch_factor(dimensions, BranchFactor::default())
    }

    /// Constructs an empty index with an explicit branch factor.
    pub fn with_branch_factor(dimensions: usize, branch: BranchFactor) -> Self {
        Self {
            dimensions,
            root: Node::empty_leaf(),
            size: 0,
            next_seq: 0,
            branch,
        }
    }

    fn area_enlargement(bounds: &Aabb<T>, p: &Point<T>) -> f64 {
        let mut grown = bounds.clone();
        grown.enlarge_to_contain(p);
        grown.area() - bounds.area()
    }

    /// Inserts `elt` into `node`, returning a split sibling if `node` overflowed.
    fn insert_rec(node: &mut Node<T, V>, elt: Element<T, V>, branch: BranchFactor) -> Option<Node<T, V>> {
        match &mut node.kind {
            NodeKind::Leaf(elements) => {
                elements.push(elt);
                if elements.len() > branch.max {
                    Some(Self::split_leaf(elements, branch))
                } else {
                    None
                }
            }
            NodeKind::Internal(children) => {
                let elt_point = elt.point.clone();
                let best = children
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (Self::area_enlargement(&c.bounds, &elt_point), c.bounds.area(), i))
                    .min_by(|a, b| {
                        a.0.partial_cmp(&b.0)
                            .unwrap_or(std::cmp::Ordering::Equal)
                            .then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
                    })
                    .map(|(_, _, i)| i)
                    .expect("internal node always has at least `min` children");

                let split = Self::insert_rec(&mut children[best].node, elt, branch);
                children[best].bounds.enlarge_to_contain(&elt_point);
                if let Some(sibling) = split {
                    let sibling_bounds = sibling.bounds().expect("split sibling is non-empty");
                    children.push(Child {
                        bounds: sibling_bounds,
                        node: Box::new(sibling),
                    });
                }
                if children.len() > branch.max {
                    Some(Self::split_internal(children, branch))
                } else {
                    None
                }
            }
        }
    }

    fn split_leaf(elements: &mut Vec<Element<T, V>>, branch: BranchFactor) -> Node<T, V> {
        let taken = std::mem::take(elements);
        let (seed_a, seed_b, rest) = quadratic_seeds(taken, |e: &Element<T, V>| Aabb::from_point(&e.point));
        let (group_a, group_b) =
            distribute(seed_a, seed_b, rest, branch, |e: &Element<T, V>| Aabb::from_point(&e.point));
        *elements = group_a;
        Node {
            kind: NodeKind::Leaf(group_b),
        }
    }

    fn split_internal(children: &mut Vec<Child<T, V>>, branch: BranchFactor) -> Node<T, V> {
        let taken = std::mem::take(children);
        let (seed_a, seed_b, rest) = quadratic_seeds(taken, |c: &Child<T, V>| c.bounds.clone());
        let (group_a, group_b) = distribute(seed_a, seed_b, rest, branch, |c: &Child<T, V>| c.bounds.clone());
        *children = group_a;
        Node {
            kind: NodeKind::Internal(group_b),
        }
    }

    fn rec_collect_all<'a>(node: &'a Node<T, V>, out: &mut Vec<&'a Element<T, V>>) {
        match &node.kind {
            NodeKind::Leaf(elements) => out.extend(elements.iter()),
            NodeKind::Internal(children) => {
                for c in children {
                    Self::rec_collect_all(&c.node, out);
                }
            }
        }
    }

    fn rec_collect_range<'a>(node: &'a Node<T, V>, bbox: &Aabb<T>, out: &mut Vec<&'a Element<T, V>>) {
        match &node.kind {
            NodeKind::Leaf(elements) => {
                out.extend(elements.iter().filter(|e| bbox.contains_point(&e.point)));
            }
            NodeKind::Internal(children) => {
                for c in children {
                    if c.bounds.intersects(bbox) {
                        Self::rec_collect_range(&c.node, bbox, out);
                    }
                }
            }
        }
    }

    /// Rebuilds the whole tree from a flat element list; used by `erase` (spec
    /// §4.3 asks for ancestor shrink + orphan reinsertion on erase — this
    /// crate instead does a full rebuild, a pragmatic simplification recorded
    /// in DESIGN.md) and as the basis of `bulk_load`.
    fn rebuild_from(&mut self, elements: Vec<Element<T, V>>) {
        self.size = elements.len();
        self.root = Node::empty_leaf();
        for e in elements {
            self.insert_one(e);
        }
    }

    fn insert_one(&mut self, elt: Element<T, V>) {
        let split = Self::insert_rec(&mut self.root, elt, self.branch);
        if let Some(sibling) = split {
            let old_root = std::mem::replace(&mut self.root, Node::empty_leaf());
            let old_bounds = old_root.bounds().unwrap_or_else(|| Aabb::new(vec![], vec![]));
            let sibling_bounds = sibling.bounds().unwrap_or_else(|| Aabb::new(vec![], vec![]));
            self.root = Node {
                kind: NodeKind::Internal(vec![
                    Child {
                        bounds: old_bounds,
                        node: Box::new(old_root),
                    },
                    Child {
                        bounds: sibling_bounds,
                        node: Box::new(sibling),
                    },
                ]),
            };
        }
    }
}

impl<T: Scalar + Clone, V: Clone> SpatialIndex<T, V> for RTreeIndex<T, V> {
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
        self.insert_one(Element::new(p, v, seq));
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
        let mut out = Vec::new();
        Self::rec_collect_range(&self.root, bbox, &mut out);
        Box::new(out.into_iter())
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
    fn insert_and_find() {
        let mut idx: RTreeIndex<i32, i32> = RTreeIndex::with_branch_factor(2, BranchFactor { min: 2, max: 4 });
        for i in 0..20 {
            idx.insert(Point::from_vec(vec![i, i * 2]), i).unwrap();
        }
        assert_eq!(idx.size(), 20);
        assert!(idx.contains(&Point::from_vec(vec![5, 10])));
    }

    #[test]
    fn range_query_matches_brute_force() {
        let mut idx: RTreeIndex<i32, i32> = RTreeIndex::with_branch_factor(2, BranchFactor { min: 2, max: 4 });
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
        let mut idx: RTreeIndex<i32, i32> = RTreeIndex::with_branch_factor(2, BranchFactor { min: 2, max: 4 });
        for i in 0..10 {
            idx.insert(Point::from_vec(vec![i, i]), i).unwrap();
        }
        assert_eq!(idx.erase(&Point::from_vec(vec![3, 3])).unwrap(), 1);
        assert_eq!(idx.size(), 9);
        assert!(!idx.contains(&Point::from_vec(vec![3, 3])));
    }

    #[test]
    fn bulk_load_then_nearest() {
        let elements = vec![
            Element::new(Point::from_vec(vec![1, 5]), 0, 0),
            Element::new(Point::from_vec(vec![2, 3]), 0, 1),
            Element::new(Point::from_vec(vec![3, 1]), 0, 2),
        ];
        let idx = RTreeIndex::<i32, i32>::bulk_load(2, elements).unwrap();
        let got = idx.nearest(&Point::from_vec(vec![0, 0]), 2).unwrap();
        assert_eq!(got[0].point, Point::from_vec(vec![2, 3]));
        assert_eq!(got[1].point, Point::from_vec(vec![3, 1]));
    }

    #[test]
    fn erase_one_removes_only_the_identified_duplicate() {
        let mut idx: RTreeIndex<i32, i32> = RTreeIndex::with_branch_factor(2, BranchFactor { min: 2, max: 4 });
        let first = idx.insert(Point::from_vec(vec![1, 2]), 10).unwrap();
        idx.insert(Point::from_vec(vec![1, 2]), 11).unwrap();
        assert!(idx.erase_one(first).unwrap());
        assert_eq!(idx.size(), 1);
        let remaining: Vec<_> = idx.find(&Point::from_vec(vec![1, 2])).map(|e| e.value).collect();
        assert_eq!(remaining, vec![11]);
        assert!(!idx.erase_one(first).unwrap());
    }
}
