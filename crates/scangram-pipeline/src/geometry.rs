//! Polygon predicates and measurements used by detectors and scorers.
//!
//! Area, convex hull and point containment delegate to `geo`; the
//! convexity test is a direct turn-sign check because it must treat
//! collinear vertices and degenerate rings exactly the way the convexity
//! filter expects.

use geo::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Area, ConvexHull};

use crate::types::Point;

fn to_coord(p: Point) -> geo::Coord<f64> {
    geo::Coord { x: p.x, y: p.y }
}

/// Closed `geo` polygon from a ring of points.
fn to_polygon(ring: &[Point]) -> geo::Polygon<f64> {
    let exterior: Vec<geo::Coord<f64>> = ring.iter().copied().map(to_coord).collect();
    geo::Polygon::new(geo::LineString::new(exterior), Vec::new())
}

/// Unsigned area enclosed by a ring.
#[must_use]
pub fn polygon_area(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    to_polygon(ring).unsigned_area()
}

/// Whether the ring turns the same way at every vertex.
///
/// Collinear vertices (zero turn) are tolerated. A ring with no turn at
/// all, or with fewer than three vertices, is not convex.
#[must_use]
pub fn is_convex(ring: &[Point]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }

    let mut orientation = 0.0_f64;
    for i in 0..n {
        let a = ring[i];
        let b = ring[(i + 1) % n];
        let c = ring[(i + 2) % n];
        let cross = (b.x - a.x).mul_add(c.y - b.y, -((b.y - a.y) * (c.x - b.x)));
        if cross == 0.0 {
            continue;
        }
        if orientation == 0.0 {
            orientation = cross.signum();
        } else if cross.signum() != orientation {
            return false;
        }
    }
    orientation != 0.0
}

/// Convex hull of a point set as a ring (no repeated closing point).
#[must_use]
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let multi: geo::MultiPoint<f64> = points
        .iter()
        .map(|p| geo::Point::new(p.x, p.y))
        .collect();
    let hull = multi.convex_hull();
    let mut ring: Vec<Point> = hull
        .exterior()
        .coords()
        .map(|c| Point::new(c.x, c.y))
        .collect();
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

/// Whether `p` lies inside the ring or on its boundary.
#[must_use]
pub fn contains_or_touches(ring: &[Point], p: Point) -> bool {
    if ring.len() < 3 {
        return false;
    }
    to_polygon(ring).coordinate_position(&to_coord(p)) != CoordPos::Outside
}

/// Axis-aligned bounds of a point set as `(min, max)` corners.
#[must_use]
pub fn bounding_box(points: &[Point]) -> Option<(Point, Point)> {
    let first = *points.first()?;
    Some(points.iter().skip(1).fold((first, first), |(lo, hi), p| {
        (
            Point::new(lo.x.min(p.x), lo.y.min(p.y)),
            Point::new(hi.x.max(p.x), hi.y.max(p.y)),
        )
    }))
}
