//! Quality indicators over a set of points (spec §4.5).
//!
//! Free functions operating on plain point slices, kept independent of
//! [`crate::front::Front`] so they can be exercised directly in tests and
//! reused by the archive. `Front` wraps the zero-argument forms
//! (`hypervolume`, `uniformity`) with `(generation, value)` caching; the
//! comparison indicators (IGD, GD, epsilon, C-metric, ...) take an explicit
//! second point set and are not cached, since there is no single "current"
//! value to keep warm.

use crate::point::{Direction, Point, Scalar};

fn to_f64<T: Scalar>(p: &Point<T>) -> Point<f64> {
    Point::from_vec(p.iter().map(|c| c.as_f64()).collect())
}

/// Flips every maximised axis so the whole problem reads as "minimise
/// everywhere, reference weakly dominates every point" — the frame the
/// hypervolume and epsilon-indicator math below is written against.
fn normalize(p: &Point<f64>, direction: &Direction) -> Point<f64> {
    Point::from_vec(
        (0..p.dim())
            .map(|k| if direction.minimises(k) { p[k] } else { -p[k] })
            .collect(),
    )
}

/// Recursive hypervolume slicing (the HSO algorithm in low dimension; the
/// same recursive-slice structure underlies WFG at higher dimension — this
/// crate uses one engine for both, pruning dominated points from the active
/// set at each level the way WFG's limited-set reduction does, without
/// WFG's further dimension-reduction optimisations).
fn hv_recursive(mut points: Vec<Point<f64>>, reference: &Point<f64>) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let dim = reference.dim();
    if dim == 1 {
        let best = points.iter().map(|p| p[0]).fold(f64::INFINITY, f64::min);
        return (reference[0] - best).max(0.0);
    }

    points.sort_by(|a, b| a[0].partial_cmp(&b[0]).unwrap_or(std::cmp::Ordering::Equal));
    let mut hv = 0.0;
    let mut active: Vec<Point<f64>> = Vec::new();
    for i in 0..points.len() {
        let projected = Point::from_vec(points[i].iter().skip(1).copied().collect());
        active.push(projected);
        prune_dominated(&mut active);

        let next_x = if i + 1 < points.len() { points[i + 1][0] } else { reference[0] };
        let width = (next_x - points[i][0]).max(0.0);
        if width <= 0.0 {
            continue;
        }
        let sub_reference = Point::from_vec(reference.iter().skip(1).copied().collect());
        hv += width * hv_recursive(active.clone(), &sub_reference);
    }
    hv
}

/// Drops points weakly dominated by another point in `points` (minimisation
/// on every remaining axis, per the normalised frame `hv_recursive` works in).
fn prune_dominated(points: &mut Vec<Point<f64>>) {
    let keep: Vec<bool> = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            !points.iter().enumerate().any(|(j, q)| {
                i != j && (0..p.dim()).all(|k| q[k] <= p[k]) && (0..p.dim()).any(|k| q[k] < p[k])
            })
        })
        .collect();
    let mut it = keep.into_iter();
    points.retain(|_| it.next().unwrap());
}

/// Lebesgue measure of the union of boxes between each point and `reference`,
/// evaluated under `direction`. `reference` must weakly dominate every point.
pub fn hypervolume<T: Scalar>(points: &[Point<T>], direction: &Direction, reference: &Point<T>) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let norm_ref = normalize(&to_f64(reference), direction);
    let norm_points: Vec<Point<f64>> = points.iter().map(|p| normalize(&to_f64(p), direction)).collect();
    hv_recursive(norm_points, &norm_ref)
}

/// Monte-Carlo hypervolume estimate: returns `(estimate, 95% half-width)`.
pub fn hypervolume_monte_carlo<T: Scalar>(
    points: &[Point<T>],
    direction: &Direction,
    reference: &Point<T>,
    samples: usize,
) -> (f64, f64) {
    use rand::Rng;

    if points.is_empty() || samples == 0 {
        return (0.0, 0.0);
    }
    let dim = reference.dim();
    let norm_ref = normalize(&to_f64(reference), direction);
    let norm_points: Vec<Point<f64>> = points.iter().map(|p| normalize(&to_f64(p), direction)).collect();

    let mut lo = vec![f64::INFINITY; dim];
    for p in &norm_points {
        for k in 0..dim {
            lo[k] = lo[k].min(p[k]);
        }
    }
    let box_volume: f64 = (0..dim).map(|k| (norm_ref[k] - lo[k]).max(0.0)).product();
    if box_volume <= 0.0 {
        return (0.0, 0.0);
    }

    let mut rng = rand::thread_rng();
    let mut hits = 0usize;
    for _ in 0..samples {
        let sample: Vec<f64> = (0..dim)
            .map(|k| {
                if norm_ref[k] > lo[k] {
                    rng.gen_range(lo[k]..norm_ref[k])
                } else {
                    lo[k]
                }
            })
            .collect();
        let dominated = norm_points
            .iter()
            .any(|p| (0..dim).all(|k| p[k] <= sample[k]));
        if dominated {
            hits += 1;
        }
    }
    let p_hat = hits as f64 / samples as f64;
    let estimate = p_hat * box_volume;
    let half_width = 1.96 * (p_hat * (1.0 - p_hat) / samples as f64).sqrt() * box_volume;
    (estimate, half_width)
}

fn nearest_distance(p: &Point<f64>, pool: &[Point<f64>]) -> f64 {
    pool.iter().map(|q| p.distance(q)).fold(f64::INFINITY, f64::min)
}

/// Inverted generational distance: mean distance from each `reference_set`
/// point to its nearest point in `front`.
pub fn igd<T: Scalar>(front: &[Point<T>], reference_set: &[Point<T>]) -> f64 {
    if reference_set.is_empty() || front.is_empty() {
        return 0.0;
    }
    let front_f: Vec<Point<f64>> = front.iter().map(to_f64).collect();
    reference_set.iter().map(|r| nearest_distance(&to_f64(r), &front_f)).sum::<f64>() / reference_set.len() as f64
}

/// Generational distance: mean distance from each `front` point to its
/// nearest point in `reference_set`.
pub fn gd<T: Scalar>(front: &[Point<T>], reference_set: &[Point<T>]) -> f64 {
    if reference_set.is_empty() || front.is_empty() {
        return 0.0;
    }
    let reference_f: Vec<Point<f64>> = reference_set.iter().map(to_f64).collect();
    front.iter().map(|p| nearest_distance(&to_f64(p), &reference_f)).sum::<f64>() / front.len() as f64
}

/// Like [`igd`] but using distance-to-dominated-box instead of Euclidean
/// distance, per spec.
pub fn igd_plus<T: Scalar>(front: &[Point<T>], reference_set: &[Point<T>], direction: &Direction) -> f64 {
    if reference_set.is_empty() || front.is_empty() {
        return 0.0;
    }
    reference_set
        .iter()
        .map(|r| {
            front
                .iter()
                .map(|f| r.distance_to_dominated_box(f, direction))
                .fold(f64::INFINITY, f64::min)
        })
        .sum::<f64>()
        / reference_set.len() as f64
}

/// The minimum additive `epsilon` such that every `reference_set` point is
/// weakly dominated by some `front` point after subtracting `epsilon` from
/// every minimised axis (adding it on maximised axes).
pub fn epsilon_indicator<T: Scalar>(front: &[Point<T>], reference_set: &[Point<T>], direction: &Direction) -> f64 {
    if front.is_empty() || reference_set.is_empty() {
        return f64::INFINITY;
    }
    reference_set
        .iter()
        .map(|y| {
            front
                .iter()
                .map(|x| {
                    (0..y.dim())
                        .map(|k| {
                            if direction.minimises(k) {
                                x[k].as_f64() - y[k].as_f64()
                            } else {
                                y[k].as_f64() - x[k].as_f64()
                            }
                        })
                        .fold(f64::MIN, f64::max)
                })
                .fold(f64::INFINITY, f64::min)
        })
        .fold(f64::MIN, f64::max)
}

/// `(min, mean, stddev)` of each point's nearest-neighbour distance.
pub fn uniformity<T: Scalar>(points: &[Point<T>]) -> (f64, f64, f64) {
    if points.len() < 2 {
        return (0.0, 0.0, 0.0);
    }
    let pts: Vec<Point<f64>> = points.iter().map(to_f64).collect();
    let gaps: Vec<f64> = pts
        .iter()
        .enumerate()
        .map(|(i, p)| {
            pts.iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, q)| p.distance(q))
                .fold(f64::INFINITY, f64::min)
        })
        .collect();
    let min = gaps.iter().cloned().fold(f64::INFINITY, f64::min);
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    (min, mean, variance.sqrt())
}

/// `(|a dominated by some b|, |b dominated by some a|)`.
pub fn cardinality_vs<T: Scalar>(a: &[Point<T>], b: &[Point<T>], direction: &Direction) -> (usize, usize) {
    let a_dominated = a
        .iter()
        .filter(|pa| b.iter().any(|pb| pb.dominates(pa, direction)))
        .count();
    let b_dominated = b
        .iter()
        .filter(|pb| a.iter().any(|pa| pa.dominates(pb, direction)))
        .count();
    (a_dominated, b_dominated)
}

/// The C-metric `C(a, b)`: the fraction of `b`'s points dominated by at
/// least one point of `a`.
pub fn c_metric<T: Scalar>(a: &[Point<T>], b: &[Point<T>], direction: &Direction) -> f64 {
    if b.is_empty() {
        return 0.0;
    }
    let dominated = b.iter().filter(|pb| a.iter().any(|pa| pa.dominates(pb, direction))).count();
    dominated as f64 / b.len() as f64
}

/// Conflict between objectives `axis_i` and `axis_j` across `points`: the
/// negated Pearson correlation coefficient, so values near `1` mean a sharp
/// trade-off and values near `-1` mean the objectives move together.
pub fn conflict<T: Scalar>(points: &[Point<T>], axis_i: usize, axis_j: usize) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let xs: Vec<f64> = points.iter().map(|p| p[axis_i].as_f64()).collect();
    let ys: Vec<f64> = points.iter().map(|p| p[axis_j].as_f64()).collect();
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let cov: f64 = xs.iter().zip(ys.iter()).map(|(x, y)| (x - mean_x) * (y - mean_y)).sum();
    let var_x: f64 = xs.iter().map(|x| (x - mean_x).powi(2)).sum();
    let var_y: f64 = ys.iter().map(|y| (y - mean_y).powi(2)).sum();
    if var_x <= 0.0 || var_y <= 0.0 {
        return 0.0;
    }
    let correlation = cov / (var_x.sqrt() * var_y.sqrt());
    -correlation
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(coords: Vec<f64>) -> Point<f64> {
        Point::from_vec(coords)
    }

    #[test]
    fn hypervolume_matches_worked_example() {
        let dir = Direction::minimise_all();
        let front = vec![p(vec![1.0, 5.0]), p(vec![2.0, 2.0]), p(vec![3.0, 1.0])];
        let reference = p(vec![5.0, 6.0]);
        let hv = hypervolume(&front, &dir, &reference);
        assert!((hv - 15.0).abs() < 1e-9, "expected 15.0, got {hv}");
    }

    #[test]
    fn hypervolume_three_d_is_nonnegative_and_monotone() {
        let dir = Direction::minimise_all();
        let reference = p(vec![10.0, 10.0, 10.0]);
        let small = vec![p(vec![1.0, 1.0, 1.0])];
        let bigger = vec![p(vec![1.0, 1.0, 1.0]), p(vec![2.0, 0.5, 3.0])];
        let hv_small = hypervolume(&small, &dir, &reference);
        let hv_bigger = hypervolume(&bigger, &dir, &reference);
        assert!(hv_small > 0.0);
        assert!(hv_bigger >= hv_small);
    }

    #[test]
    fn igd_is_zero_for_identical_sets() {
        let a = vec![p(vec![1.0, 5.0]), p(vec![3.0, 1.0])];
        assert_eq!(igd(&a, &a), 0.0);
    }

    #[test]
    fn igd_matches_nearest_neighbour_definition() {
        let front = vec![p(vec![1.0, 5.0]), p(vec![3.0, 1.0])];
        let reference = vec![p(vec![1.0, 5.0]), p(vec![2.0, 3.0]), p(vec![3.0, 1.0])];
        let expected = (0.0 + 5.0_f64.sqrt() + 0.0) / 3.0;
        assert!((igd(&front, &reference) - expected).abs() < 1e-9);
    }

    #[test]
    fn epsilon_indicator_is_zero_when_front_covers_reference() {
        let dir = Direction::minimise_all();
        let front = vec![p(vec![1.0, 1.0])];
        let reference = vec![p(vec![1.0, 1.0])];
        assert_eq!(epsilon_indicator(&front, &reference, &dir), 0.0);
    }

    #[test]
    fn c_metric_full_coverage() {
        let dir = Direction::minimise_all();
        let a = vec![p(vec![0.0, 0.0])];
        let b = vec![p(vec![1.0, 1.0]), p(vec![2.0, 2.0])];
        assert_eq!(c_metric(&a, &b, &dir), 1.0);
    }

    #[test]
    fn uniformity_on_two_points() {
        let points = vec![p(vec![0.0, 0.0]), p(vec![3.0, 4.0])];
        let (min, mean, stddev) = uniformity(&points);
        assert!((min - 5.0).abs() < 1e-9);
        assert!((mean - 5.0).abs() < 1e-9);
        assert!(stddev.abs() < 1e-9);
    }
}
