//! # Geometry on the unit sphere
//!
//! Footprints and satellite streaks are compared directly on the celestial sphere, as unit
//! vectors, so there is no projection distortion near the poles and no special case at
//! RA = 0°/360°.
//!
//! ## Primitives
//!
//! - [`GreatCircleArc`]: the shorter great-circle path between two points.
//! - [`SphericalPolygon`]: a closed footprint lying within the hemisphere centred on its
//!   vertex centroid. Built either from an ordered ring (convex or not, either orientation)
//!   or as the convex hull of unordered corners.
//! - [`Streak`]: every point within a half-width of an arc (a spherical capsule: a band
//!   along the arc with round caps at both ends).
//!
//! ## Streak / footprint intersection
//!
//! ```text
//! distance(footprint, arc) = 0                      if an arc endpoint is inside
//!                                                   or the arc crosses an edge
//!                          = min( d(endpoint, edge), d(vertex, arc) )   otherwise
//!
//! intersects  ⇔  distance ≤ half_width
//! ```
//!
//! For two arcs that do not cross, the smallest separation is always reached at an
//! endpoint of one of them, which is why the endpoint/vertex distances are sufficient.
//! Arcs are assumed shorter than half a great circle.

use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

use crate::constants::{Degree, Radian, RADEG};
use crate::conversion::unit_vector_from_radec_deg;

/// Below this norm a cross product is treated as zero (coincident or antipodal points).
const DEGENERATE: f64 = 1e-15;

/// Angle between two unit vectors, accurate at small and large separations.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> Radian {
    a.cross(b).norm().atan2(a.dot(b))
}

/// Spherical cap enclosing a shape, used to discard far-apart pairs before the exact test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingCap {
    pub center: Vector3<f64>,
    pub radius: Radian,
}

impl BoundingCap {
    /// Cap centred on the normalised mean of `points` and reaching the farthest of them.
    pub fn around(points: &[Vector3<f64>]) -> Self {
        let sum: Vector3<f64> = points.iter().sum();
        let center = match sum.try_normalize(DEGENERATE) {
            Some(center) => center,
            None => {
                return BoundingCap {
                    center: Vector3::z(),
                    radius: std::f64::consts::PI,
                }
            }
        };
        let radius = points
            .iter()
            .map(|p| angle_between(&center, p))
            .fold(0.0, f64::max);
        BoundingCap { center, radius }
    }

    pub fn may_overlap(&self, other: &BoundingCap) -> bool {
        angle_between(&self.center, &other.center) <= self.radius + other.radius
    }
}

/// Shorter great-circle arc from `a` to `b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GreatCircleArc {
    pub a: Vector3<f64>,
    pub b: Vector3<f64>,
}

impl GreatCircleArc {
    pub fn new(a: Vector3<f64>, b: Vector3<f64>) -> Self {
        GreatCircleArc { a, b }
    }

    pub fn from_radec_deg(start: (Degree, Degree), end: (Degree, Degree)) -> Self {
        GreatCircleArc::new(
            unit_vector_from_radec_deg(start.0, start.1),
            unit_vector_from_radec_deg(end.0, end.1),
        )
    }

    /// Unit normal of the arc's plane, or `None` for a zero-length arc.
    fn pole(&self) -> Option<Vector3<f64>> {
        let n = self.a.cross(&self.b);
        let norm = n.norm();
        (norm > DEGENERATE).then(|| n / norm)
    }

    pub fn length(&self) -> Radian {
        angle_between(&self.a, &self.b)
    }

    /// Whether `p`, a point on this arc's great circle, lies between the endpoints.
    fn spans(&self, pole: &Vector3<f64>, p: &Vector3<f64>) -> bool {
        self.a.cross(p).dot(pole) >= -DEGENERATE && p.cross(&self.b).dot(pole) >= -DEGENERATE
    }

    /// Angular distance from `p` to the nearest point of the arc.
    pub fn distance_to_point(&self, p: &Vector3<f64>) -> Radian {
        let endpoints = angle_between(&self.a, p).min(angle_between(&self.b, p));

        let Some(pole) = self.pole() else {
            return endpoints;
        };

        // Foot of the perpendicular from p onto the great circle
        let foot = p - pole * p.dot(&pole);
        if foot.norm() <= DEGENERATE {
            // p is a pole of the arc: every point of the arc is 90° away
            return FRAC_PI_2;
        }

        if self.spans(&pole, &foot) {
            p.dot(&pole).abs().min(1.0).asin()
        } else {
            endpoints
        }
    }

    /// Whether the two arcs cross or touch.
    pub fn intersects(&self, other: &GreatCircleArc) -> bool {
        let (Some(n1), Some(n2)) = (self.pole(), other.pole()) else {
            return false;
        };

        let line = n1.cross(&n2);
        let norm = line.norm();
        if norm <= DEGENERATE {
            // Same great circle: overlap shows up as a zero endpoint distance
            return false;
        }

        let candidate = line / norm;
        [candidate, -candidate]
            .iter()
            .any(|x| self.spans(&n1, x) && other.spans(&n2, x))
    }

    /// Smallest angular distance between two arcs.
    pub fn distance_to_arc(&self, other: &GreatCircleArc) -> Radian {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(&other.a)
            .min(self.distance_to_point(&other.b))
            .min(other.distance_to_point(&self.a))
            .min(other.distance_to_point(&self.b))
    }
}

/// Gnomonic projection onto the plane tangent to the unit sphere at `center`.
struct TangentPlane {
    center: Vector3<f64>,
    e1: Vector3<f64>,
    e2: Vector3<f64>,
}

impl TangentPlane {
    fn at(center: Vector3<f64>) -> Self {
        let helper = if center.x.abs() < 0.9 {
            Vector3::x()
        } else {
            Vector3::y()
        };
        let e1 = center.cross(&helper).normalize();
        let e2 = center.cross(&e1);
        TangentPlane { center, e1, e2 }
    }

    /// Plane coordinates of `v`, or `None` in the hemisphere opposite the tangent point.
    fn project(&self, v: &Vector3<f64>) -> Option<(f64, f64)> {
        let d = v.dot(&self.center);
        if d <= 0.0 {
            return None;
        }
        let w = v / d;
        Some((w.dot(&self.e1), w.dot(&self.e2)))
    }
}

/// Whether appending `next` to the chain makes a clockwise or straight turn.
fn turns_clockwise<T>(chain: &[((f64, f64), T)], next: (f64, f64)) -> bool {
    let (o, a) = (chain[chain.len() - 2].0, chain[chain.len() - 1].0);
    (a.0 - o.0) * (next.1 - o.1) - (a.1 - o.1) * (next.0 - o.0) <= DEGENERATE
}

/// Closed polygon on the sphere, vertices in order (the last one joins the first).
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalPolygon {
    vertices: Vec<Vector3<f64>>,
}

impl SphericalPolygon {
    /// Build from (ra, dec) vertices in degrees, kept in the given order. Callers check the
    /// vertex count and finiteness beforehand.
    pub fn from_radec_deg(vertices: &[[Degree; 2]]) -> Self {
        SphericalPolygon {
            vertices: vertices
                .iter()
                .map(|[ra, dec]| unit_vector_from_radec_deg(*ra, *dec))
                .collect(),
        }
    }

    /// Convex hull of (ra, dec) points in degrees, counter-clockwise seen from outside.
    ///
    /// The input order does not matter. Points are projected gnomonically about their
    /// centroid, where great circles are straight lines, and hulled with the monotone chain
    /// algorithm. Collinear boundary points are dropped.
    ///
    /// `None` when fewer than three points are left on the hull, or when the points do not
    /// fit in the hemisphere centred on their centroid.
    pub fn convex_hull_radec_deg(points: &[[Degree; 2]]) -> Option<Self> {
        let points: Vec<Vector3<f64>> = points
            .iter()
            .map(|[ra, dec]| unit_vector_from_radec_deg(*ra, *dec))
            .collect();
        let center = points.iter().sum::<Vector3<f64>>().try_normalize(DEGENERATE)?;
        let plane = TangentPlane::at(center);

        let mut projected = points
            .iter()
            .map(|v| plane.project(v).map(|xy| (xy, *v)))
            .collect::<Option<Vec<_>>>()?;
        projected.sort_by(|(a, _), (b, _)| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        projected.dedup_by(|(a, _), (b, _)| a == b);
        if projected.len() < 3 {
            return None;
        }

        let mut hull: Vec<((f64, f64), Vector3<f64>)> = Vec::with_capacity(projected.len() + 1);
        for &point in &projected {
            while hull.len() >= 2 && turns_clockwise(&hull, point.0) {
                hull.pop();
            }
            hull.push(point);
        }
        let lower = hull.len() + 1;
        for &point in projected.iter().rev().skip(1) {
            while hull.len() >= lower && turns_clockwise(&hull, point.0) {
                hull.pop();
            }
            hull.push(point);
        }
        // The chain ends where it started
        hull.pop();

        (hull.len() >= 3).then(|| SphericalPolygon {
            vertices: hull.into_iter().map(|(_, v)| v).collect(),
        })
    }

    pub fn vertices(&self) -> &[Vector3<f64>] {
        &self.vertices
    }

    pub fn edges(&self) -> impl Iterator<Item = GreatCircleArc> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| GreatCircleArc::new(self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Point-in-polygon test.
    ///
    /// The polygon and `p` are projected gnomonically onto the plane tangent at the vertex
    /// centroid. The gnomonic projection maps great circles to straight lines, so the
    /// planar even-odd crossing rule on the projected vertices is exact. Points in the
    /// hemisphere opposite the centroid are outside. Points exactly on the boundary may go
    /// either way; the distance functions treat them as touching.
    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        let sum: Vector3<f64> = self.vertices.iter().sum();
        let Some(center) = sum.try_normalize(DEGENERATE) else {
            return false;
        };
        let plane = TangentPlane::at(center);

        let Some((px, py)) = plane.project(p) else {
            return false;
        };
        let Some(projected) = self
            .vertices
            .iter()
            .map(|v| plane.project(v))
            .collect::<Option<Vec<_>>>()
        else {
            return false;
        };

        let n = projected.len();
        let mut inside = false;
        for i in 0..n {
            let (xi, yi) = projected[i];
            let (xj, yj) = projected[(i + n - 1) % n];
            if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
                inside = !inside;
            }
        }
        inside
    }

    pub fn bounding_cap(&self) -> BoundingCap {
        BoundingCap::around(&self.vertices)
    }

    /// Smallest angular distance between the polygon's region and `arc`; zero on overlap.
    pub fn distance_to_arc(&self, arc: &GreatCircleArc) -> Radian {
        if self.contains(&arc.a) || self.contains(&arc.b) {
            return 0.0;
        }
        self.edges()
            .map(|edge| edge.distance_to_arc(arc))
            .fold(f64::INFINITY, f64::min)
    }
}

/// A satellite trail: the arc between the two exposure endpoints, widened by
/// `half_width` on every side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Streak {
    pub arc: GreatCircleArc,
    pub half_width: Radian,
}

impl Streak {
    pub fn new(arc: GreatCircleArc, half_width: Radian) -> Self {
        Streak { arc, half_width }
    }

    pub fn from_radec_deg(
        start: (Degree, Degree),
        end: (Degree, Degree),
        half_width: Degree,
    ) -> Self {
        Streak::new(GreatCircleArc::from_radec_deg(start, end), half_width * RADEG)
    }

    pub fn contains(&self, p: &Vector3<f64>) -> bool {
        self.arc.distance_to_point(p) <= self.half_width
    }

    pub fn bounding_cap(&self) -> BoundingCap {
        let cap = BoundingCap::around(&[self.arc.a, self.arc.b]);
        BoundingCap {
            radius: cap.radius + self.half_width,
            ..cap
        }
    }

    pub fn intersects(&self, polygon: &SphericalPolygon) -> bool {
        polygon.distance_to_arc(&self.arc) <= self.half_width
    }
}
