//! Polygon simplification using the Ramer-Douglas-Peucker algorithm.
//!
//! Contours arrive as closed rings of hundreds or thousands of pixel
//! positions. Detectors reduce them to a handful of vertices with a
//! tolerance proportional to the ring's perimeter, so a page outline
//! collapses to its four corners at any image scale.

use crate::types::{Point, Polyline};

/// Perimeter of a closed ring (the closing edge from last to first point
/// is included).
#[must_use]
pub fn closed_perimeter(points: &[Point]) -> f64 {
    match points {
        [] | [_] => 0.0,
        [first, .., last] => {
            let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
            open + last.distance(*first)
        }
    }
}

/// Simplify an open polyline; both endpoints are always kept.
///
/// Points within `tolerance` pixels of the line between their endpoints
/// are removed. Polylines with fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified polyline"]
pub fn simplify_open(polyline: &Polyline, tolerance: f64) -> Polyline {
    let points = polyline.points();
    if points.len() < 3 {
        return polyline.clone();
    }

    let mut kept = vec![false; points.len()];
    kept[0] = true;
    kept[points.len() - 1] = true;
    rdp(points, 0, points.len() - 1, tolerance, &mut kept);

    Polyline::new(collect_kept(points, &kept))
}

/// Simplify a closed ring.
///
/// The ring is split at two mutually distant vertices, both of which are
/// kept, and each half is simplified as an open polyline. Rings with
/// fewer than 3 points are returned unchanged.
#[must_use = "returns the simplified ring"]
pub fn simplify_closed(ring: &Polyline, tolerance: f64) -> Polyline {
    let points = ring.points();
    let n = points.len();
    if n < 3 {
        return ring.clone();
    }

    let (a, b) = split_pair(points);

    // Rotate so the first split vertex is at index 0 and close the ring
    // by repeating it at the end.
    let mut rotated: Vec<Point> = points[a..].iter().chain(&points[..a]).copied().collect();
    rotated.push(points[a]);
    let k = (b + n - a) % n;

    let mut kept = vec![false; n + 1];
    kept[0] = true;
    kept[k] = true;
    kept[n] = true;
    rdp(&rotated, 0, k, tolerance, &mut kept);
    rdp(&rotated, k, n, tolerance, &mut kept);

    Polyline::new(collect_kept(&rotated[..n], &kept[..n]))
}

/// Simplify a closed ring with a tolerance of `epsilon` times its
/// perimeter.
#[must_use = "returns the simplified ring"]
pub fn simplify_closed_relative(ring: &Polyline, epsilon: f64) -> Polyline {
    let tolerance = epsilon * closed_perimeter(ring.points());
    simplify_closed(ring, tolerance)
}

/// Two vertices far apart on the ring: start from the first vertex and
/// alternate "farthest from the current one" a few times.
fn split_pair(points: &[Point]) -> (usize, usize) {
    const ITERATIONS: usize = 3;

    let farthest = |from: usize| {
        let origin = points[from];
        let mut best = from;
        let mut best_dist = 0.0;
        for (i, p) in points.iter().enumerate() {
            let d = origin.distance_squared(*p);
            if d > best_dist {
                best_dist = d;
                best = i;
            }
        }
        best
    };

    let mut a = 0;
    let mut b = farthest(a);
    for _ in 1..ITERATIONS {
        let next = farthest(b);
        if next == a {
            break;
        }
        a = b;
        b = next;
    }
    if a == b {
        // All points coincide.
        b = points.len() / 2;
    }
    (a, b)
}

fn collect_kept(points: &[Point], kept: &[bool]) -> Vec<Point> {
    points
        .iter()
        .zip(kept)
        .filter(|&(_, k)| *k)
        .map(|(&p, _)| p)
        .collect()
}

/// Ramer-Douglas-Peucker over `points[start..=end]`.
///
/// Finds the point between two kept endpoints that is farthest from the
/// segment joining them. If that distance exceeds `tolerance`, the point
/// is kept and both sub-ranges are processed. Pending ranges live on an
/// explicit stack because contour rings can be long.
fn rdp(points: &[Point], start: usize, end: usize, tolerance: f64, kept: &mut [bool]) {
    let mut pending = vec![(start, end)];

    while let Some((start, end)) = pending.pop() {
        if end <= start + 1 {
            continue;
        }

        let mut max_dist = 0.0;
        let mut max_idx = start;
        for i in (start + 1)..end {
            let d = perpendicular_distance(points[i], points[start], points[end]);
            if d > max_dist {
                max_dist = d;
                max_idx = i;
            }
        }

        if max_dist > tolerance {
            kept[max_idx] = true;
            pending.push((max_idx, end));
            pending.push((start, max_idx));
        }
    }
}

/// Perpendicular distance from point `p` to the line defined by `a` and `b`.
///
/// Uses the formula: |cross(b-a, p-a)| / |b-a|.
/// When `a` and `b` coincide, returns the distance from `p` to `a`.
fn perpendicular_distance(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let length_sq = dx.mul_add(dx, dy * dy);

    if length_sq == 0.0 {
        return p.distance(a);
    }

    let cross = dx.mul_add(a.y - p.y, -(dy * (a.x - p.x)));
    cross.abs() / length_sq.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every integer position along the outline of a `w` x `h` rectangle
    /// with its top-left corner at (`x0`, `y0`), clockwise, starting at
    /// `start` steps past the top-left corner.
    fn rect_ring(x0: f64, y0: f64, w: u32, h: u32, start: usize) -> Polyline {
        let mut pts = Vec::new();
        for i in 0..w {
            pts.push(Point::new(x0 + f64::from(i), y0));
        }
        for i in 0..h {
            pts.push(Point::new(x0 + f64::from(w), y0 + f64::from(i)));
        }
        for i in 0..w {
            pts.push(Point::new(x0 + f64::from(w - i), y0 + f64::from(h)));
        }
        for i in 0..h {
            pts.push(Point::new(x0, y0 + f64::from(h - i)));
        }
        pts.rotate_left(start);
        Polyline::new(pts)
    }

    #[test]
    fn perimeter_of_unit_square() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        assert!((closed_perimeter(&square) - 4.0).abs() < 1e-12);
        assert!(closed_perimeter(&square[..1]).abs() < f64::EPSILON);
    }

    #[test]
    fn open_collinear_points_collapse_to_endpoints() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(3.0, 3.0),
            Point::new(4.0, 4.0),
        ]);
        let result = simplify_open(&pl, 0.1);
        assert_eq!(result.points(), &[Point::new(0.0, 0.0), Point::new(4.0, 4.0)]);
    }

    #[test]
    fn open_zigzag_retains_peaks() {
        let pl = Polyline::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 5.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 5.0),
            Point::new(8.0, 0.0),
        ]);
        assert_eq!(simplify_open(&pl, 1.0).len(), 5);
        assert_eq!(simplify_open(&pl, 10.0).len(), 2);
    }

    #[test]
    fn closed_rectangle_ring_collapses_to_corners() {
        for start in [0, 7, 45, 100] {
            let ring = rect_ring(10.0, 20.0, 60, 40, start);
            let simplified = simplify_closed_relative(&ring, 0.01);
            assert_eq!(simplified.len(), 4, "start {start}: {simplified:?}");
            for corner in [
                Point::new(10.0, 20.0),
                Point::new(70.0, 20.0),
                Point::new(70.0, 60.0),
                Point::new(10.0, 60.0),
            ] {
                assert!(simplified.points().contains(&corner), "start {start}");
            }
        }
    }

    #[test]
    fn closed_tiny_rings_unchanged() {
        let pl = Polyline::new(vec![Point::new(0.0, 0.0), Point::new(3.0, 0.0)]);
        assert_eq!(simplify_closed(&pl, 1.0), pl);
    }

    #[test]
    fn closed_coincident_points_do_not_panic() {
        let pl = Polyline::new(vec![Point::new(2.0, 2.0); 6]);
        let simplified = simplify_closed(&pl, 0.5);
        assert!(simplified.len() <= 6);
    }

    #[test]
    fn long_ring_does_not_exhaust_stack() {
        let ring = rect_ring(0.0, 0.0, 20_000, 20_000, 3);
        let simplified = simplify_closed(&ring, 0.5);
        assert_eq!(simplified.len(), 4);
    }

    #[test]
    fn perpendicular_distance_diagonal_segment() {
        let d = perpendicular_distance(
            Point::new(2.0, -1.0),
            Point::new(0.0, 0.0),
            Point::new(4.0, 2.0),
        );
        let expected = 8.0 / 20.0_f64.sqrt();
        assert!((d - expected).abs() < 1e-10, "got {d}, expected {expected}");
    }

    #[test]
    fn perpendicular_distance_coincident_endpoints() {
        let d = perpendicular_distance(
            Point::new(3.0, 4.0),
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
        );
        assert!((d - 5.0).abs() < 1e-10);
    }
}
