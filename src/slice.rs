// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Slicing engine: planar and conical cross-sections through a mesh
//!
//! Cuts a flattened mesh by a sequence of planes, chains the resulting edge
//! segments into closed loops, and reports per-station wetted and theoretical
//! areas plus their running totals for area-rule analysis.

use crate::error::MeshError;
use crate::geom::{MeshState, TMesh};
use crate::report::Reporter;
use crate::settings::Settings;
use anyhow::Result;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// How cutting planes are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SliceStyle {
    /// Parallel cuts along the slicing normal.
    Planar,
    /// Cuts averaged over an azimuthal sweep of planes tilted off the normal
    /// by a fixed angle, for Mach-cone area ruling.
    ConicalFan,
}

/// Configuration for one slicing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SliceParams {
    pub style: SliceStyle,
    pub count: usize,
    /// Cone half-angle in degrees, used by [`SliceStyle::ConicalFan`].
    pub angle_deg: f64,
    /// Number of azimuthal planes averaged per station for a conical fan.
    pub cone_sections: usize,
    pub normal: Vector3<f64>,
    /// Derive the station range from the mesh's extent along the normal.
    pub auto_bounds: bool,
    pub start: f64,
    pub end: f64,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            style: SliceStyle::Planar,
            count: 10,
            angle_deg: 0.0,
            cone_sections: 1,
            normal: Vector3::x(),
            auto_bounds: true,
            start: 0.0,
            end: 0.0,
        }
    }
}

/// Cross-section at one station.
#[derive(Debug, Clone)]
pub struct Slice {
    /// Signed distance of the cutting plane from the origin along the normal.
    pub station: f64,
    /// Closed polygon loops in the cutting plane. Open chains are excluded.
    pub loops: Vec<Vec<Point3<f64>>>,
    /// Actual cross-sectional area enclosed by the loops.
    pub wetted_area: f64,
    /// Bounding-envelope area at this station.
    pub theo_area: f64,
    pub cum_wetted_area: f64,
    pub cum_theo_area: f64,
    /// Loops fan-triangulated for display or export.
    pub mesh: TMesh,
}

/// Cut `mesh` at `params.count` stations and return the slices in increasing
/// station order. Stations sit at cell midpoints under auto bounds, and on an
/// inclusive linspace over the explicit range otherwise.
pub fn slice(
    mesh: &TMesh,
    params: &SliceParams,
    settings: &Settings,
    reporter: &mut Reporter,
) -> Result<Vec<Slice>> {
    mesh.validate()?;
    mesh.require_flattened()?;
    if params.count == 0 {
        return Ok(Vec::new());
    }

    let n = params.normal;
    if n.norm() <= f64::EPSILON {
        return Err(MeshError::UnsupportedConfig("slice normal must be nonzero".into()).into());
    }
    let n = n.normalize();
    if params.style == SliceStyle::ConicalFan && params.cone_sections == 0 {
        return Err(
            MeshError::UnsupportedConfig("conical fan needs at least one section".into()).into(),
        );
    }

    let (u, v) = plane_basis(&n);
    let bbox = mesh.bounding_box();
    let (lo, hi) = bbox.extent_along(&n);

    let stations: Vec<f64> = if params.auto_bounds {
        // Midpoint stations never graze the end faces of the mesh.
        let h = (hi - lo) / params.count as f64;
        (0..params.count)
            .map(|k| lo + (k as f64 + 0.5) * h)
            .collect()
    } else if params.count == 1 {
        vec![params.start]
    } else {
        let h = (params.end - params.start) / (params.count - 1) as f64;
        (0..params.count).map(|k| params.start + k as f64 * h).collect()
    };

    // Theoretical area is the bounding envelope's cross-section normal to
    // the slicing direction.
    let (ulo, uhi) = bbox.extent_along(&u);
    let (vlo, vhi) = bbox.extent_along(&v);
    let theo_area = (uhi - ulo) * (vhi - vlo);

    let tris: Vec<[Point3<f64>; 3]> = mesh.active().map(|(_, t)| t.points(&mesh.nodes)).collect();

    let cut: Vec<(Vec<Vec<Point3<f64>>>, f64, usize)> = stations
        .par_iter()
        .map(|&station| match params.style {
            SliceStyle::Planar => {
                let origin = Point3::from(n * station);
                let (loops, open) = cut_plane(&tris, &origin, &n, settings);
                let area = loops_area(&loops, &n).abs();
                (loops, area, open)
            }
            SliceStyle::ConicalFan => {
                let origin = Point3::from(n * station);
                let a = params.angle_deg.to_radians();
                let mut area = 0.0;
                let mut loops = Vec::new();
                let mut open = 0;
                for s in 0..params.cone_sections {
                    let phi = 2.0 * std::f64::consts::PI * s as f64 / params.cone_sections as f64;
                    let m = (n * a.cos() + (u * phi.cos() + v * phi.sin()) * a.sin()).normalize();
                    let (l, o) = cut_plane(&tris, &origin, &m, settings);
                    // Project each tilted cut back onto the station plane.
                    area += loops_area(&l, &m).abs() * m.dot(&n).abs();
                    open += o;
                    loops.extend(l);
                }
                area /= params.cone_sections as f64;
                (loops, area, open)
            }
        })
        .collect();

    let open_total: usize = cut.iter().map(|(_, _, o)| o).sum();
    if open_total > 0 {
        reporter.warn(format!(
            "{} open section chains could not be closed and were excluded from area",
            open_total
        ));
    }

    let mut slices = Vec::with_capacity(params.count);
    let mut cum_wet = 0.0;
    let mut cum_theo = 0.0;
    for (station, (loops, wetted_area, _)) in stations.into_iter().zip(cut) {
        cum_wet += wetted_area;
        cum_theo += theo_area;
        let mesh = loops_to_mesh(&loops, settings.weld_eps);
        slices.push(Slice {
            station,
            loops,
            wetted_area,
            theo_area,
            cum_wetted_area: cum_wet,
            cum_theo_area: cum_theo,
            mesh,
        });
    }
    Ok(slices)
}

/// Numerically integrate wetted slice areas over station spacing. With
/// uniformly spaced stations this approximates the enclosed volume.
pub fn integrate_slice_volume(slices: &[Slice]) -> f64 {
    if slices.len() < 2 {
        return 0.0;
    }
    let mut volume = 0.0;
    for i in 0..slices.len() {
        let h = if i == 0 {
            slices[1].station - slices[0].station
        } else {
            slices[i].station - slices[i - 1].station
        };
        volume += slices[i].wetted_area * h;
    }
    volume
}

/// Two orthonormal directions spanning the plane perpendicular to `n`.
fn plane_basis(n: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    let seed = if n.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    let u = n.cross(&seed).normalize();
    let v = n.cross(&u);
    (u, v)
}

/// Intersect every triangle with the plane and chain the resulting segments
/// into loops. Returns (closed loops, open chain count).
fn cut_plane(
    tris: &[[Point3<f64>; 3]],
    origin: &Point3<f64>,
    normal: &Vector3<f64>,
    settings: &Settings,
) -> (Vec<Vec<Point3<f64>>>, usize) {
    let mut segments = Vec::new();
    for tri in tris {
        if let Some(seg) = plane_tri_segment(tri, origin, normal, settings.plane_tol) {
            segments.push(seg);
        }
    }
    chain_loops(segments, settings.chain_eps)
}

/// Segment where the plane crosses one triangle, if any. Triangles lying in
/// the plane contribute nothing. The segment is directed so that, looking
/// down the plane normal, material lies to its left: outer boundaries chain
/// counterclockwise and cavity boundaries clockwise.
fn plane_tri_segment(
    tri: &[Point3<f64>; 3],
    origin: &Point3<f64>,
    normal: &Vector3<f64>,
    tol: f64,
) -> Option<[Point3<f64>; 2]> {
    let d = [
        normal.dot(&(tri[0] - origin)),
        normal.dot(&(tri[1] - origin)),
        normal.dot(&(tri[2] - origin)),
    ];
    if d.iter().all(|x| x.abs() <= tol) {
        return None;
    }

    let mut pts: Vec<Point3<f64>> = Vec::new();
    let mut push = |p: Point3<f64>| {
        if pts.iter().all(|q| (q - p).norm() > tol) {
            pts.push(p);
        }
    };
    for i in 0..3 {
        let j = (i + 1) % 3;
        if d[i].abs() <= tol {
            push(tri[i]);
        } else if (d[i] > tol && d[j] < -tol) || (d[i] < -tol && d[j] > tol) {
            let t = d[i] / (d[i] - d[j]);
            push(tri[i] + (tri[j] - tri[i]) * t);
        }
    }
    if pts.len() >= 2 {
        // The cut line is parallel to normal x facet-normal; walking that
        // way keeps the facet's back side (the material) on the left.
        let facet = (tri[1] - tri[0]).cross(&(tri[2] - tri[0]));
        let dir = normal.cross(&facet);
        if (pts[1] - pts[0]).dot(&dir) < 0.0 {
            pts.swap(0, 1);
        }
        Some([pts[0], pts[1]])
    } else {
        None
    }
}

/// Greedy head-to-tail chaining of directed segments. A chain whose ends
/// meet within `eps` closes into a loop; anything left dangling is counted
/// but discarded. Reversed segments are accepted as a fallback so a chain
/// on an inconsistently wound mesh still closes.
fn chain_loops(
    mut segments: Vec<[Point3<f64>; 2]>,
    eps: f64,
) -> (Vec<Vec<Point3<f64>>>, usize) {
    let mut loops = Vec::new();
    let mut open = 0;

    while let Some([a, b]) = segments.pop() {
        let mut chain = vec![a, b];
        loop {
            let tail = chain[chain.len() - 1];
            let head = chain[0];
            if chain.len() > 2 && (tail - head).norm() <= eps {
                chain.pop();
                loops.push(chain);
                break;
            }
            let next = segments
                .iter()
                .position(|[p, _]| (*p - tail).norm() <= eps)
                .or_else(|| {
                    segments
                        .iter()
                        .position(|[_, q]| (*q - tail).norm() <= eps)
                });
            match next {
                Some(idx) => {
                    let [p, q] = segments.swap_remove(idx);
                    if (p - tail).norm() <= eps {
                        chain.push(q);
                    } else {
                        chain.push(p);
                    }
                }
                None => {
                    open += 1;
                    break;
                }
            }
        }
    }
    (loops, open)
}

/// Signed shoelace area summed over all loops, measured in the plane
/// perpendicular to `normal`. Cavity loops wind opposite the outer boundary
/// and subtract their enclosed area.
fn loops_area(loops: &[Vec<Point3<f64>>], normal: &Vector3<f64>) -> f64 {
    let (u, v) = plane_basis(normal);
    let mut total = 0.0;
    for lp in loops {
        let mut twice = 0.0;
        for i in 0..lp.len() {
            let a = &lp[i];
            let b = &lp[(i + 1) % lp.len()];
            let (ax, ay) = (a.coords.dot(&u), a.coords.dot(&v));
            let (bx, by) = (b.coords.dot(&u), b.coords.dot(&v));
            twice += ax * by - bx * ay;
        }
        total += twice / 2.0;
    }
    total
}

/// Fan-triangulate each loop about its centroid.
fn loops_to_mesh(loops: &[Vec<Point3<f64>>], weld_eps: f64) -> TMesh {
    let mut mesh = TMesh::new(weld_eps);
    for lp in loops {
        if lp.len() < 3 {
            continue;
        }
        let centroid = Point3::from(
            lp.iter().map(|p| p.coords).sum::<Vector3<f64>>() / lp.len() as f64,
        );
        for i in 0..lp.len() {
            mesh.add_tri(centroid, lp[i], lp[(i + 1) % lp.len()]);
        }
    }
    mesh.set_state(MeshState::Flattened);
    mesh
}
