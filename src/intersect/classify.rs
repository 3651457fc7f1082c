// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Ray-cast classification of triangle fragments against the other mesh

use super::segment::point_in_triangle;
use nalgebra::{Point3, Vector3};

/// Where a fragment sits relative to the other mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Inside,
    Outside,
    /// On the intersection boundary, or an ambiguous silhouette cast that is
    /// conservatively kept rather than resolved.
    Border,
}

/// Classify a fragment by its centroid: a point on the other surface is
/// Border; otherwise crossing parity of a ray cast along the fragment normal
/// decides (odd = inside).
///
/// A silhouette-grazing cast can produce a noisy parity. The tie-break is a
/// second cast along a fixed perturbed direction; if the parities disagree
/// the fragment is tagged Border and the caller reports a warning.
pub fn classify_fragment(
    centroid: &Point3<f64>,
    normal: &Vector3<f64>,
    other_tris: &[[Point3<f64>; 3]],
    plane_tol: f64,
    ray_eps: f64,
) -> (Classification, bool) {
    if on_surface(centroid, other_tris, plane_tol) {
        return (Classification::Border, false);
    }

    let first = crossing_parity(centroid, normal, other_tris, ray_eps);
    let second = crossing_parity(centroid, &perturbed(normal), other_tris, ray_eps);

    if first != second {
        return (Classification::Border, true);
    }
    if first {
        (Classification::Inside, false)
    } else {
        (Classification::Outside, false)
    }
}

fn perturbed(dir: &Vector3<f64>) -> Vector3<f64> {
    // Any fixed direction not parallel to `dir` works; the offset only has
    // to move the ray off the silhouette.
    let axis = if dir.x.abs() < 0.9 {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        Vector3::new(0.0, 1.0, 0.0)
    };
    (dir + dir.cross(&axis) * 1e-3).normalize()
}

fn on_surface(point: &Point3<f64>, tris: &[[Point3<f64>; 3]], plane_tol: f64) -> bool {
    for tri in tris {
        let cross = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
        let len = cross.norm();
        if len < plane_tol {
            continue;
        }
        let normal = cross / len;
        let dist = normal.dot(&(point - tri[0]));
        if dist.abs() < plane_tol && point_in_triangle(point, tri, &normal, plane_tol) {
            return true;
        }
    }
    false
}

/// Odd number of forward ray-surface crossings?
///
/// Hits are collected by distance and deduplicated so a ray passing through
/// a shared edge or vertex counts as one crossing, not one per facet.
fn crossing_parity(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tris: &[[Point3<f64>; 3]],
    ray_eps: f64,
) -> bool {
    let mut hits: Vec<f64> = tris
        .iter()
        .filter_map(|tri| ray_hit_distance(origin, direction, tri, ray_eps))
        .collect();
    hits.sort_by(|a, b| a.total_cmp(b));
    hits.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
    hits.len() % 2 == 1
}

/// Moller-Trumbore, returning the distance of a forward hit.
fn ray_hit_distance(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
    ray_eps: f64,
) -> Option<f64> {
    let edge1 = tri[1] - tri[0];
    let edge2 = tri[2] - tri[0];
    let h = direction.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() < ray_eps {
        return None;
    }

    let f = 1.0 / a;
    let s = origin - tri[0];
    let u = f * s.dot(&h);
    if !(0.0..=1.0).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * direction.dot(&q);
    if v < 0.0 || u + v > 1.0 {
        return None;
    }

    let t = f * edge2.dot(&q);
    if t > ray_eps {
        Some(t)
    } else {
        None
    }
}

/// Fragment edge lying along any intersection segment, within tolerance.
/// Used to tag fragments produced directly on a cut.
pub fn edge_on_any_segment(
    tri: &[Point3<f64>; 3],
    segments: &[[Point3<f64>; 2]],
    tol: f64,
) -> bool {
    for i in 0..3 {
        let a = tri[i];
        let b = tri[(i + 1) % 3];
        for seg in segments {
            if dist_point_segment(&a, seg) < tol && dist_point_segment(&b, seg) < tol {
                return true;
            }
        }
    }
    false
}

fn dist_point_segment(p: &Point3<f64>, seg: &[Point3<f64>; 2]) -> f64 {
    let d = seg[1] - seg[0];
    let len2 = d.norm_squared();
    if len2 == 0.0 {
        return (p - seg[0]).norm();
    }
    let t = ((p - seg[0]).dot(&d) / len2).clamp(0.0, 1.0);
    (p - (seg[0] + d * t)).norm()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::primitives;

    fn cube_tris() -> Vec<[Point3<f64>; 3]> {
        let cube = primitives::unit_cube(1e-8);
        cube.active().map(|(_, t)| t.points(&cube.nodes)).collect()
    }

    #[test]
    fn test_point_inside_cube() {
        let tris = cube_tris();
        let (c, ambiguous) = classify_fragment(
            &Point3::new(0.5, 0.5, 0.5),
            &Vector3::new(0.0, 0.0, 1.0),
            &tris,
            1e-7,
            1e-9,
        );
        assert_eq!(c, Classification::Inside);
        assert!(!ambiguous);
    }

    #[test]
    fn test_point_outside_cube() {
        let tris = cube_tris();
        let (c, _) = classify_fragment(
            &Point3::new(2.0, 2.0, 2.0),
            &Vector3::new(0.0, 0.0, 1.0),
            &tris,
            1e-7,
            1e-9,
        );
        assert_eq!(c, Classification::Outside);
    }

    #[test]
    fn test_point_on_cube_face_is_border() {
        let tris = cube_tris();
        let (c, _) = classify_fragment(
            &Point3::new(0.5, 0.5, 1.0),
            &Vector3::new(0.0, 0.0, 1.0),
            &tris,
            1e-7,
            1e-9,
        );
        assert_eq!(c, Classification::Border);
    }

    #[test]
    fn test_edge_on_segment_detection() {
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let on = [[Point3::new(-1.0, 0.0, 0.0), Point3::new(2.0, 0.0, 0.0)]];
        let off = [[Point3::new(0.0, 0.5, 1.0), Point3::new(1.0, 0.5, 1.0)]];
        assert!(edge_on_any_segment(&tri, &on, 1e-7));
        assert!(!edge_on_any_segment(&tri, &off, 1e-7));
    }
}
