// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Cross-section curves and lofted surface construction
//!
//! A closed tagged-variant curve family replaces the authoring subsystem's
//! class hierarchy. Every variant tessellates to an ordered ring of points in
//! the YZ plane; rings lofted along X become the triangle soup the rest of
//! the kernel consumes.

use crate::error::MeshError;
use crate::geom::TMesh;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

const EXPONENT_MIN: f64 = 0.2;
const EXPONENT_MAX: f64 = 5.0;

/// Cross-section shape families, dispatched through [`XSecCurve::tessellate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum XSecCurve {
    /// Degenerate section used to close a body at a nose or tail.
    Point,
    Circle {
        diameter: f64,
    },
    Ellipse {
        width: f64,
        height: f64,
    },
    /// Superellipse with exponents `m` (horizontal) and `n` (vertical),
    /// clamped to [0.2, 5.0].
    SuperEllipse {
        width: f64,
        height: f64,
        m: f64,
        n: f64,
    },
    /// Rectangle with corner arcs. The radius is clamped to half the smaller
    /// dimension.
    RoundedRect {
        width: f64,
        height: f64,
        radius: f64,
    },
    /// Four-quadrant cubic Bezier blend. `max_width_loc` places the widest
    /// point as a fraction of the half-height, in [-1, 1]; the strength
    /// parameters scale the tangents at the top and bottom apex.
    GeneralFuse {
        width: f64,
        height: f64,
        max_width_loc: f64,
        top_str: f64,
        bot_str: f64,
    },
    /// Closed unity-scale profile resampled and scaled to width/height.
    FileDefined {
        width: f64,
        height: f64,
        points: Vec<[f64; 2]>,
    },
}

impl XSecCurve {
    /// Ordered ring of `n` points in the YZ plane at x = 0, traversed
    /// counter-clockwise looking down +X.
    pub fn tessellate(&self, n: usize) -> Vec<Point3<f64>> {
        match self {
            XSecCurve::Point => vec![Point3::origin(); n],
            XSecCurve::Circle { diameter } => {
                let r = diameter / 2.0;
                ring(n, |t| (r * t.cos(), r * t.sin()))
            }
            XSecCurve::Ellipse { width, height } => {
                let (a, b) = (width / 2.0, height / 2.0);
                ring(n, |t| (a * t.cos(), b * t.sin()))
            }
            XSecCurve::SuperEllipse {
                width,
                height,
                m,
                n: nexp,
            } => {
                let (a, b) = (width / 2.0, height / 2.0);
                let m = m.clamp(EXPONENT_MIN, EXPONENT_MAX);
                let nexp = nexp.clamp(EXPONENT_MIN, EXPONENT_MAX);
                ring(n, |t| {
                    let c = t.cos();
                    let s = t.sin();
                    (
                        a * c.abs().powf(2.0 / m) * c.signum(),
                        b * s.abs().powf(2.0 / nexp) * s.signum(),
                    )
                })
            }
            XSecCurve::RoundedRect {
                width,
                height,
                radius,
            } => rounded_rect_ring(*width, *height, *radius, n),
            XSecCurve::GeneralFuse {
                width,
                height,
                max_width_loc,
                top_str,
                bot_str,
            } => general_fuse_ring(*width, *height, *max_width_loc, *top_str, *bot_str, n),
            XSecCurve::FileDefined {
                width,
                height,
                points,
            } => resample_profile(points, *width, *height, n),
        }
    }
}

fn ring(n: usize, f: impl Fn(f64) -> (f64, f64)) -> Vec<Point3<f64>> {
    (0..n)
        .map(|k| {
            let t = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
            let (y, z) = f(t);
            Point3::new(0.0, y, z)
        })
        .collect()
}

/// Walk the perimeter of a rounded rectangle at uniform arc length.
fn rounded_rect_ring(width: f64, height: f64, radius: f64, n: usize) -> Vec<Point3<f64>> {
    let w = width / 2.0;
    let h = height / 2.0;
    let r = radius.clamp(0.0, w.min(h));

    // Straight runs and corner arcs, counter-clockwise from the right edge
    // midpoint.
    let straight_v = 2.0 * (h - r);
    let straight_h = 2.0 * (w - r);
    let arc = std::f64::consts::FRAC_PI_2 * r;
    let perimeter = 2.0 * straight_v + 2.0 * straight_h + 4.0 * arc;

    // Piecewise segments: (length, evaluator over local s in [0, len]).
    type Seg = (f64, Box<dyn Fn(f64) -> (f64, f64)>);
    let corner = move |cy: f64, cz: f64, start: f64| -> Box<dyn Fn(f64) -> (f64, f64)> {
        Box::new(move |s| {
            let a = start + if r > 0.0 { s / r } else { 0.0 };
            (cy + r * a.cos(), cz + r * a.sin())
        })
    };
    let pi = std::f64::consts::PI;
    let segs: Vec<Seg> = vec![
        (h - r, Box::new(move |s| (w, s))),
        (arc, corner(w - r, h - r, 0.0)),
        (straight_h, Box::new(move |s| (w - r - s, h))),
        (arc, corner(-(w - r), h - r, pi / 2.0)),
        (straight_v, Box::new(move |s| (-w, h - r - s))),
        (arc, corner(-(w - r), -(h - r), pi)),
        (straight_h, Box::new(move |s| (-(w - r) + s, -h))),
        (arc, corner(w - r, -(h - r), 1.5 * pi)),
        (h - r, Box::new(move |s| (w, -(h - r) + s))),
    ];

    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let mut s = perimeter * k as f64 / n as f64;
        let mut yz = (w, 0.0);
        for (idx, (len, eval)) in segs.iter().enumerate() {
            if s <= *len || idx == segs.len() - 1 {
                yz = eval(s.min(*len));
                break;
            }
            s -= len;
        }
        out.push(Point3::new(0.0, yz.0, yz.1));
    }
    out
}

/// Cubic Bezier through the four apex points with controllable tangent
/// strengths, one quadrant at a time.
fn general_fuse_ring(
    width: f64,
    height: f64,
    max_width_loc: f64,
    top_str: f64,
    bot_str: f64,
    n: usize,
) -> Vec<Point3<f64>> {
    let w = width / 2.0;
    let h = height / 2.0;
    let zm = max_width_loc.clamp(-1.0, 1.0) * h;

    let top = (0.0, h);
    let right = (w, zm);
    let bot = (0.0, -h);
    let left = (-w, zm);

    // Tangent strengths: vertical at the side points, horizontal at the
    // apexes, the latter scaled by the caller's strength parameters.
    let ts = top_str * w;
    let bs = bot_str * w;
    let vs_up = (h - zm) / 2.0;
    let vs_dn = (h + zm) / 2.0;

    // Each quadrant is (p0, c0, c1, p1) for a cubic Bezier, counter-clockwise
    // from the right side point.
    let quads: [[(f64, f64); 4]; 4] = [
        [right, (w, zm + vs_up), (ts, h), top],
        [top, (-ts, h), (-w, zm + vs_up), left],
        [left, (-w, zm - vs_dn), (-bs, -h), bot],
        [bot, (bs, -h), (w, zm - vs_dn), right],
    ];

    let cubic = |q: &[(f64, f64); 4], u: f64| -> (f64, f64) {
        let omu = 1.0 - u;
        let w0 = omu * omu * omu;
        let w1 = 3.0 * omu * omu * u;
        let w2 = 3.0 * omu * u * u;
        let w3 = u * u * u;
        (
            w0 * q[0].0 + w1 * q[1].0 + w2 * q[2].0 + w3 * q[3].0,
            w0 * q[0].1 + w1 * q[1].1 + w2 * q[2].1 + w3 * q[3].1,
        )
    };

    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let t = 4.0 * k as f64 / n as f64;
        let q = (t as usize).min(3);
        let (y, z) = cubic(&quads[q], t - q as f64);
        out.push(Point3::new(0.0, y, z));
    }
    out
}

/// Resample a closed polyline profile to `n` points at uniform arc length.
fn resample_profile(points: &[[f64; 2]], width: f64, height: f64, n: usize) -> Vec<Point3<f64>> {
    if points.len() < 3 {
        return Vec::new();
    }
    let scaled: Vec<(f64, f64)> = points
        .iter()
        .map(|[y, z]| (y * width, z * height))
        .collect();

    let mut lengths = Vec::with_capacity(scaled.len());
    let mut total = 0.0;
    for i in 0..scaled.len() {
        let a = scaled[i];
        let b = scaled[(i + 1) % scaled.len()];
        let l = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        lengths.push(l);
        total += l;
    }
    if total == 0.0 {
        return vec![Point3::origin(); n];
    }

    let mut out = Vec::with_capacity(n);
    for k in 0..n {
        let mut s = total * k as f64 / n as f64;
        let mut i = 0;
        while i < lengths.len() - 1 && s > lengths[i] {
            s -= lengths[i];
            i += 1;
        }
        let a = scaled[i];
        let b = scaled[(i + 1) % scaled.len()];
        let u = if lengths[i] > 0.0 { s / lengths[i] } else { 0.0 };
        out.push(Point3::new(
            0.0,
            a.0 + u * (b.0 - a.0),
            a.1 + u * (b.1 - a.1),
        ));
    }
    out
}

/// One station of a lofted body: a curve placed at an X station.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XSec {
    pub x: f64,
    pub curve: XSecCurve,
}

/// Skin consecutive cross-section rings into a closed surface mesh.
///
/// End rings are capped with centroid fans; degenerate facets produced by
/// point sections collapse in the node store and are skipped.
pub fn loft(sections: &[XSec], pts_per_ring: usize, weld_eps: f64) -> Result<TMesh, MeshError> {
    if sections.len() < 2 {
        return Err(MeshError::UnsupportedConfig(
            "loft needs at least two cross-sections".into(),
        ));
    }
    if pts_per_ring < 3 {
        return Err(MeshError::UnsupportedConfig(
            "loft needs at least three points per ring".into(),
        ));
    }

    let rings: Vec<Vec<Point3<f64>>> = sections
        .iter()
        .map(|s| {
            s.curve
                .tessellate(pts_per_ring)
                .into_iter()
                .map(|p| p + Vector3::new(s.x, 0.0, 0.0))
                .collect()
        })
        .collect();

    let mut mesh = TMesh::new(weld_eps);
    let mut add = |a: Point3<f64>, b: Point3<f64>, c: Point3<f64>| {
        let i = mesh.add_tri(a, b, c);
        if mesh.tris[i].nodes[0] == mesh.tris[i].nodes[1]
            || mesh.tris[i].nodes[1] == mesh.tris[i].nodes[2]
            || mesh.tris[i].nodes[0] == mesh.tris[i].nodes[2]
        {
            mesh.tris.pop();
        }
    };

    for w in rings.windows(2) {
        let (r0, r1) = (&w[0], &w[1]);
        for k in 0..pts_per_ring {
            let k1 = (k + 1) % pts_per_ring;
            add(r0[k], r1[k1], r1[k]);
            add(r0[k], r0[k1], r1[k1]);
        }
    }

    // Caps, wound to face outward along -X and +X.
    let cap = |ring: &[Point3<f64>]| -> Point3<f64> {
        Point3::from(ring.iter().map(|p| p.coords).sum::<Vector3<f64>>() / ring.len() as f64)
    };
    let first = &rings[0];
    let c0 = cap(first);
    for k in 0..pts_per_ring {
        add(c0, first[(k + 1) % pts_per_ring], first[k]);
    }
    let last = &rings[rings.len() - 1];
    let c1 = cap(last);
    for k in 0..pts_per_ring {
        add(c1, last[k], last[(k + 1) % pts_per_ring]);
    }

    if mesh.is_empty() {
        return Err(MeshError::EmptyMesh);
    }
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::watertight::is_watertight;
    use approx::assert_relative_eq;

    #[test]
    fn test_circle_ring_radius() {
        let ring = XSecCurve::Circle { diameter: 2.0 }.tessellate(32);
        assert_eq!(ring.len(), 32);
        for p in &ring {
            assert_relative_eq!((p.y * p.y + p.z * p.z).sqrt(), 1.0, epsilon = 1e-12);
            assert_eq!(p.x, 0.0);
        }
    }

    #[test]
    fn test_superellipse_with_exponent_two_is_ellipse() {
        let se = XSecCurve::SuperEllipse {
            width: 2.0,
            height: 1.0,
            m: 2.0,
            n: 2.0,
        }
        .tessellate(16);
        let el = XSecCurve::Ellipse {
            width: 2.0,
            height: 1.0,
        }
        .tessellate(16);
        for (a, b) in se.iter().zip(&el) {
            assert_relative_eq!(a.y, b.y, epsilon = 1e-12);
            assert_relative_eq!(a.z, b.z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rounded_rect_zero_radius_hits_extents() {
        let ring = XSecCurve::RoundedRect {
            width: 2.0,
            height: 1.0,
            radius: 0.0,
        }
        .tessellate(64);
        let ymax = ring.iter().map(|p| p.y.abs()).fold(0.0_f64, f64::max);
        let zmax = ring.iter().map(|p| p.z.abs()).fold(0.0_f64, f64::max);
        assert_relative_eq!(ymax, 1.0, epsilon = 1e-9);
        assert_relative_eq!(zmax, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_loft_cylinder_is_watertight() {
        let sections = [
            XSec {
                x: 0.0,
                curve: XSecCurve::Circle { diameter: 1.0 },
            },
            XSec {
                x: 2.0,
                curve: XSecCurve::Circle { diameter: 1.0 },
            },
        ];
        let mesh = loft(&sections, 24, 1e-8).unwrap();
        assert!(is_watertight(&mesh));
    }

    #[test]
    fn test_loft_is_outward_oriented() {
        use crate::massprop::{integrate, Density, MassModel};
        use crate::report::Reporter;
        use crate::settings::Settings;

        let sections = [
            XSec {
                x: 0.0,
                curve: XSecCurve::Circle { diameter: 2.0 },
            },
            XSec {
                x: 3.0,
                curve: XSecCurve::Circle { diameter: 2.0 },
            },
        ];
        let mut mesh = loft(&sections, 48, 1e-8).unwrap();
        mesh.flatten();

        let mut reporter = Reporter::new();
        let prop = integrate(
            &mesh,
            MassModel::Solid,
            &Density::Uniform(1.0),
            &[],
            &Settings::default(),
            &mut reporter,
        )
        .unwrap();
        // Signed-tetra mass of an outward skin is positive and close to
        // the analytic cylinder volume.
        assert!(prop.mass > 0.0);
        assert_relative_eq!(prop.mass, 3.0 * std::f64::consts::PI, epsilon = 0.05);
    }

    #[test]
    fn test_loft_with_point_ends_is_watertight() {
        let sections = [
            XSec {
                x: 0.0,
                curve: XSecCurve::Point,
            },
            XSec {
                x: 1.0,
                curve: XSecCurve::Circle { diameter: 1.0 },
            },
            XSec {
                x: 2.0,
                curve: XSecCurve::Point,
            },
        ];
        let mesh = loft(&sections, 16, 1e-8).unwrap();
        assert!(is_watertight(&mesh));
    }

    #[test]
    fn test_file_profile_resamples_to_count() {
        let square = XSecCurve::FileDefined {
            width: 1.0,
            height: 1.0,
            points: vec![[0.5, 0.5], [-0.5, 0.5], [-0.5, -0.5], [0.5, -0.5]],
        };
        assert_eq!(square.tessellate(20).len(), 20);
    }

    #[test]
    fn test_loft_rejects_single_section() {
        let sections = [XSec {
            x: 0.0,
            curve: XSecCurve::Circle { diameter: 1.0 },
        }];
        assert!(loft(&sections, 16, 1e-8).is_err());
    }
}
