//! Property-based cross-cutting tests (spec §8, Testable Properties 1-2):
//! dominance algebra invariants, and agreement between the linear oracle and
//! every tree-backed index over the same insert sequence.

use proptest::prelude::*;

use pareto_space::index::{Aabb, KdTreeIndex, LinearIndex, QuadtreeIndex, RStarTreeIndex, RTreeIndex, SpatialIndex};
use pareto_space::{Direction, Point};

const DIM: usize = 3;

fn arb_point() -> impl Strategy<Value = Point<i32>> {
    prop::collection::vec(-20i32..20, DIM).prop_map(Point::from_vec)
}

fn arb_points(max_len: usize) -> impl Strategy<Value = Vec<Point<i32>>> {
    prop::collection::vec(arb_point(), 0..max_len)
}

proptest! {
    #[test]
    fn dominance_is_irreflexive_and_antisymmetric(p in arb_point(), q in arb_point()) {
        let dir = Direction::minimise_all();
        prop_assert!(!p.dominates(&p, &dir));
        if p != q {
            prop_assert!(!(p.dominates(&q, &dir) && q.dominates(&p, &dir)));
        }
    }

    #[test]
    fn strong_dominance_implies_weak_dominance(p in arb_point(), q in arb_point()) {
        let dir = Direction::minimise_all();
        if p.strongly_dominates(&q, &dir) {
            prop_assert!(p.dominates(&q, &dir));
        }
    }

    #[test]
    fn exactly_one_relation_holds_for_distinct_points(p in arb_point(), q in arb_point()) {
        let dir = Direction::minimise_all();
        if p != q {
            let forward = p.dominates(&q, &dir);
            let backward = q.dominates(&p, &dir);
            let neither = p.non_dominates(&q, &dir);
            prop_assert_eq!(neither, !forward && !backward);
            prop_assert!(!(forward && backward));
        }
    }

    #[test]
    fn dominance_is_transitive(a in arb_point(), b in arb_point(), c in arb_point()) {
        let dir = Direction::minimise_all();
        if a.dominates(&b, &dir) && b.dominates(&c, &dir) {
            prop_assert!(a.dominates(&c, &dir));
        }
    }

    #[test]
    fn all_backends_agree_with_the_linear_oracle(points in arb_points(60), query in arb_point()) {
        let mut linear: LinearIndex<i32, usize> = LinearIndex::new(DIM);
        let mut kd: KdTreeIndex<i32, usize> = KdTreeIndex::new(DIM);
        let mut quad: QuadtreeIndex<i32, usize> = QuadtreeIndex::new(DIM);
        let mut rtree: RTreeIndex<i32, usize> = RTreeIndex::new(DIM);
        let mut rstar: RStarTreeIndex<i32, usize> = RStarTreeIndex::new(DIM);

        for (i, p) in points.iter().enumerate() {
            linear.insert(p.clone(), i).unwrap();
            kd.insert(p.clone(), i).unwrap();
            quad.insert(p.clone(), i).unwrap();
            rtree.insert(p.clone(), i).unwrap();
            rstar.insert(p.clone(), i).unwrap();
        }

        prop_assert_eq!(linear.size(), kd.size());
        prop_assert_eq!(linear.size(), quad.size());
        prop_assert_eq!(linear.size(), rtree.size());
        prop_assert_eq!(linear.size(), rstar.size());

        let mut expected: Vec<i32> = linear.find(&query).map(|e| e.value as i32).collect();
        expected.sort_unstable();
        for (name, found) in [
            ("kd", kd.find(&query).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("quad", quad.find(&query).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("rtree", rtree.find(&query).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("rstar", rstar.find(&query).map(|e| e.value as i32).collect::<Vec<_>>()),
        ] {
            let mut found = found;
            found.sort_unstable();
            prop_assert_eq!(&expected, &found, "find mismatch for backend {}", name);
        }

        let bbox = Aabb::new(vec![-10, -10, -10], vec![10, 10, 10]);
        let mut expected_range: Vec<i32> = linear.range(&bbox).map(|e| e.value as i32).collect();
        expected_range.sort_unstable();
        for (name, found) in [
            ("kd", kd.range(&bbox).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("quad", quad.range(&bbox).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("rtree", rtree.range(&bbox).map(|e| e.value as i32).collect::<Vec<_>>()),
            ("rstar", rstar.range(&bbox).map(|e| e.value as i32).collect::<Vec<_>>()),
        ] {
            let mut found = found;
            found.sort_unstable();
            prop_assert_eq!(&expected_range, &found, "range mismatch for backend {}", name);
        }

        if !points.is_empty() {
            let expected_nearest: Vec<usize> = linear.nearest(&query, 3).unwrap().iter().map(|e| e.value).collect();
            for (name, nearest) in [
                ("kd", kd.nearest(&query, 3).unwrap()),
                ("quad", quad.nearest(&query, 3).unwrap()),
                ("rtree", rtree.nearest(&query, 3).unwrap()),
                ("rstar", rstar.nearest(&query, 3).unwrap()),
            ] {
                let values: Vec<usize> = nearest.iter().map(|e| e.value).collect();
                prop_assert_eq!(&expected_nearest, &values, "nearest mismatch for backend {}", name);
            }
        }
    }
}
