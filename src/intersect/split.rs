// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Re-triangulation of a triangle cut by intersection segments

use super::segment::project_2d;
use nalgebra::{Point3, Vector3};

/// Split a triangle along the given intersection segments.
///
/// Each segment's supporting line (restricted to fragments it actually
/// touches) becomes a constrained edge; the returned fan of sub-triangles
/// covers the original triangle area within tolerance. Fragments below the
/// degeneracy threshold are dropped. An empty segment list returns the
/// triangle unchanged.
pub fn split_by_segments(
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    segments: &[[Point3<f64>; 2]],
    tol: f64,
    degen_area: f64,
) -> Vec<[Point3<f64>; 3]> {
    let mut fragments: Vec<Vec<Point3<f64>>> = vec![tri.to_vec()];

    for seg in segments {
        let (s0x, s0y) = project_2d(&seg[0], normal);
        let (s1x, s1y) = project_2d(&seg[1], normal);
        let dx = s1x - s0x;
        let dy = s1y - s0y;
        if (dx * dx + dy * dy).sqrt() < tol {
            continue;
        }

        let seg_min = (s0x.min(s1x) - tol, s0y.min(s1y) - tol);
        let seg_max = (s0x.max(s1x) + tol, s0y.max(s1y) + tol);

        let mut next: Vec<Vec<Point3<f64>>> = Vec::with_capacity(fragments.len() + 2);
        for frag in fragments {
            if !frag_overlaps_2d(&frag, normal, seg_min, seg_max) {
                next.push(frag);
                continue;
            }

            let side = |p: &Point3<f64>| -> f64 {
                let (px, py) = project_2d(p, normal);
                dx * (py - s0y) - dy * (px - s0x)
            };

            let sides: Vec<f64> = frag.iter().map(|p| side(p)).collect();
            let has_pos = sides.iter().any(|&s| s > tol);
            let has_neg = sides.iter().any(|&s| s < -tol);
            if !(has_pos && has_neg) {
                next.push(frag);
                continue;
            }

            let (pos, neg) = clip_both_sides(&frag, &sides);
            if pos.len() >= 3 {
                next.push(pos);
            }
            if neg.len() >= 3 {
                next.push(neg);
            }
        }
        fragments = next;
    }

    let mut out = Vec::new();
    for frag in fragments {
        fan_triangulate(&frag, degen_area, &mut out);
    }
    out
}

fn frag_overlaps_2d(
    frag: &[Point3<f64>],
    normal: &Vector3<f64>,
    seg_min: (f64, f64),
    seg_max: (f64, f64),
) -> bool {
    let mut min = (f64::INFINITY, f64::INFINITY);
    let mut max = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in frag {
        let (x, y) = project_2d(p, normal);
        min.0 = min.0.min(x);
        min.1 = min.1.min(y);
        max.0 = max.0.max(x);
        max.1 = max.1.max(y);
    }
    min.0 <= seg_max.0 && max.0 >= seg_min.0 && min.1 <= seg_max.1 && max.1 >= seg_min.1
}

/// Split a convex polygon by the zero level of precomputed per-vertex side
/// values, interpolating crossing points on spanning edges.
fn clip_both_sides(
    frag: &[Point3<f64>],
    sides: &[f64],
) -> (Vec<Point3<f64>>, Vec<Point3<f64>>) {
    let n = frag.len();
    let mut pos: Vec<Point3<f64>> = Vec::with_capacity(n + 1);
    let mut neg: Vec<Point3<f64>> = Vec::with_capacity(n + 1);

    for i in 0..n {
        let j = (i + 1) % n;
        let (pi, si) = (frag[i], sides[i]);
        let (pj, sj) = (frag[j], sides[j]);

        if si >= 0.0 {
            pos.push(pi);
        }
        if si <= 0.0 {
            neg.push(pi);
        }

        if (si > 0.0 && sj < 0.0) || (si < 0.0 && sj > 0.0) {
            let t = si / (si - sj);
            let hit = pi + (pj - pi) * t;
            pos.push(hit);
            neg.push(hit);
        }
    }

    (pos, neg)
}

fn fan_triangulate(poly: &[Point3<f64>], degen_area: f64, out: &mut Vec<[Point3<f64>; 3]>) {
    if poly.len() < 3 {
        return;
    }
    for i in 1..poly.len() - 1 {
        let tri = [poly[0], poly[i], poly[i + 1]];
        let area = (tri[1] - tri[0]).cross(&(tri[2] - tri[0])).norm() / 2.0;
        if area >= degen_area {
            out.push(tri);
        }
    }
}
