// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Pairwise triangle-triangle intersection segments

use nalgebra::{Point3, Vector3};

/// Outcome of intersecting one triangle pair.
#[derive(Debug, Clone)]
pub enum TriTriResult {
    /// No intersection inside either triangle.
    None,
    /// Planes are near-coincident; resolved by tolerance at a higher level.
    Coplanar,
    /// The 3D segment shared by both triangles.
    Segment([Point3<f64>; 2]),
}

/// Compute the intersection segment of two triangles: the line of
/// intersection of their planes restricted to both triangles.
///
/// Near-parallel planes fall out as `None` or `Coplanar` depending on
/// whether the second triangle lies within `tol` of the first plane.
pub fn tri_tri_segment(
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
    tol: f64,
) -> TriTriResult {
    let na = plane_normal(tri_a);
    let nb = plane_normal(tri_b);

    if na.cross(&nb).norm() < tol {
        let d = na.dot(&tri_a[0].coords);
        let coplanar = tri_b
            .iter()
            .all(|p| (na.dot(&p.coords) - d).abs() < tol);
        return if coplanar {
            TriTriResult::Coplanar
        } else {
            TriTriResult::None
        };
    }

    let mut points: Vec<Point3<f64>> = Vec::new();
    collect_edge_crossings(tri_a, tri_b, &nb, tol, &mut points);
    collect_edge_crossings(tri_b, tri_a, &na, tol, &mut points);
    dedup_points(&mut points, tol);

    if points.len() < 2 {
        return TriTriResult::None;
    }

    // With more than two candidates (shared vertices, grazing contact) keep
    // the farthest pair; the span covers every candidate on the common line.
    let (mut pi, mut pj, mut best) = (0, 1, 0.0);
    for i in 0..points.len() {
        for j in (i + 1)..points.len() {
            let d = (points[i] - points[j]).norm();
            if d > best {
                best = d;
                pi = i;
                pj = j;
            }
        }
    }
    if best < tol {
        return TriTriResult::None;
    }
    TriTriResult::Segment([points[pi], points[pj]])
}

fn plane_normal(tri: &[Point3<f64>; 3]) -> Vector3<f64> {
    let cross = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
    let len = cross.norm();
    if len > 0.0 {
        cross / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    }
}

/// Clip each edge of `edges_of` against the plane of `target`, keeping
/// crossing points that land inside `target`.
fn collect_edge_crossings(
    edges_of: &[Point3<f64>; 3],
    target: &[Point3<f64>; 3],
    target_normal: &Vector3<f64>,
    tol: f64,
    out: &mut Vec<Point3<f64>>,
) {
    let d = target_normal.dot(&target[0].coords);
    for i in 0..3 {
        let start = edges_of[i];
        let end = edges_of[(i + 1) % 3];
        let sd = target_normal.dot(&start.coords) - d;
        let ed = target_normal.dot(&end.coords) - d;

        if sd * ed > 0.0 || (sd - ed).abs() < tol * tol {
            continue;
        }

        let t = sd / (sd - ed);
        let hit = start + (end - start) * t;
        if point_in_triangle(&hit, target, target_normal, tol) {
            out.push(hit);
        }
    }
}

/// Projected barycentric point-in-triangle test, dropping the dominant axis
/// of the normal.
pub(crate) fn point_in_triangle(
    point: &Point3<f64>,
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    tol: f64,
) -> bool {
    let (px, py) = project_2d(point, normal);
    let (v0x, v0y) = project_2d(&tri[0], normal);
    let (v1x, v1y) = project_2d(&tri[1], normal);
    let (v2x, v2y) = project_2d(&tri[2], normal);

    let denom = (v1y - v2y) * (v0x - v2x) + (v2x - v1x) * (v0y - v2y);
    if denom.abs() < 1e-300 {
        return false;
    }

    let a = ((v1y - v2y) * (px - v2x) + (v2x - v1x) * (py - v2y)) / denom;
    let b = ((v2y - v0y) * (px - v2x) + (v0x - v2x) * (py - v2y)) / denom;
    let c = 1.0 - a - b;

    a >= -tol && b >= -tol && c >= -tol
}

pub(crate) fn project_2d(p: &Point3<f64>, normal: &Vector3<f64>) -> (f64, f64) {
    let ax = normal.x.abs();
    let ay = normal.y.abs();
    let az = normal.z.abs();
    if ax > ay && ax > az {
        (p.y, p.z)
    } else if ay > az {
        (p.x, p.z)
    } else {
        (p.x, p.y)
    }
}

fn dedup_points(points: &mut Vec<Point3<f64>>, tol: f64) {
    let mut unique: Vec<Point3<f64>> = Vec::with_capacity(points.len());
    for &p in points.iter() {
        if !unique.iter().any(|q| (p - q).norm() < tol) {
            unique.push(p);
        }
    }
    *points = unique;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disjoint_triangles() {
        let a = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = [
            Point3::new(5.0, 0.0, 1.0),
            Point3::new(6.0, 0.0, 1.0),
            Point3::new(5.0, 1.0, 2.0),
        ];
        assert!(matches!(tri_tri_segment(&a, &b, 1e-7), TriTriResult::None));
    }

    #[test]
    fn test_crossing_triangles_yield_segment() {
        // Vertical triangle stabbing through a horizontal one.
        let a = [
            Point3::new(-1.0, -1.0, 0.0),
            Point3::new(2.0, -1.0, 0.0),
            Point3::new(0.0, 2.0, 0.0),
        ];
        let b = [
            Point3::new(0.2, 0.2, -1.0),
            Point3::new(0.8, 0.2, 1.0),
            Point3::new(0.2, 0.8, 1.0),
        ];
        match tri_tri_segment(&a, &b, 1e-7) {
            TriTriResult::Segment([p, q]) => {
                assert!(p.z.abs() < 1e-9);
                assert!(q.z.abs() < 1e-9);
                assert!((p - q).norm() > 1e-6);
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_coplanar_triangles() {
        let a = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = [
            Point3::new(0.2, 0.2, 0.0),
            Point3::new(1.2, 0.2, 0.0),
            Point3::new(0.2, 1.2, 0.0),
        ];
        assert!(matches!(
            tri_tri_segment(&a, &b, 1e-7),
            TriTriResult::Coplanar
        ));
    }

    #[test]
    fn test_parallel_offset_planes() {
        let a = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = [
            Point3::new(0.0, 0.0, 1.0),
            Point3::new(1.0, 0.0, 1.0),
            Point3::new(0.0, 1.0, 1.0),
        ];
        assert!(matches!(tri_tri_segment(&a, &b, 1e-7), TriTriResult::None));
    }
}
