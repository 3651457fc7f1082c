// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Mass-property integrator
//!
//! Accumulates surface or solid mass, center of gravity, and the symmetric
//! inertia tensor about the reference origin, with optional discrete point
//! masses folded in. Products of inertia are stored as plain integrals
//! (`ixy = ∫xy dm`); the diagonal terms are `ixx = ∫(y² + z²) dm` and so on.

use crate::error::MeshError;
use crate::geom::TMesh;
use crate::report::Reporter;
use crate::settings::Settings;
use crate::watertight::is_watertight;
use anyhow::Result;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// How surface triangles contribute mass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MassModel {
    /// Enclosed volume integrated by signed tetrahedra against the origin.
    /// Requires a closed mesh for a meaningful result.
    Solid,
    /// Thin shell: each facet contributes area × thickness × density.
    Shell { thickness: f64 },
}

/// Density field over the mesh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Density {
    Uniform(f64),
    /// One value per active triangle, in triangle order.
    PerTri(Vec<f64>),
}

/// A discrete mass not derived from the surface (engines, fuel, payload).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointMass {
    pub mass: f64,
    pub position: Point3<f64>,
}

/// Symmetric inertia tensor components about some reference point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyz: f64,
}

/// Integration result. `inertia` is taken about the origin; callers must
/// check `mass` (or `cg`) before using the center of gravity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProp {
    pub mass: f64,
    pub cg: Option<Point3<f64>>,
    pub inertia: Inertia,
}

impl MassProp {
    /// Re-express the inertia tensor about the center of gravity via the
    /// parallel-axis theorem. `None` when the total mass is zero.
    pub fn inertia_about_cg(&self) -> Option<Inertia> {
        let cg = self.cg?;
        let m = self.mass;
        Some(Inertia {
            ixx: self.inertia.ixx - m * (cg.y * cg.y + cg.z * cg.z),
            iyy: self.inertia.iyy - m * (cg.x * cg.x + cg.z * cg.z),
            izz: self.inertia.izz - m * (cg.x * cg.x + cg.y * cg.y),
            ixy: self.inertia.ixy - m * cg.x * cg.y,
            ixz: self.inertia.ixz - m * cg.x * cg.z,
            iyz: self.inertia.iyz - m * cg.y * cg.z,
        })
    }
}

/// Integrate mass properties over a flattened mesh plus discrete point
/// masses.
pub fn integrate(
    mesh: &TMesh,
    model: MassModel,
    density: &Density,
    point_masses: &[PointMass],
    _settings: &Settings,
    reporter: &mut Reporter,
) -> Result<MassProp> {
    mesh.validate()?;
    mesh.require_flattened()?;
    validate_density(density, mesh.active_count())?;
    for pm in point_masses {
        if !pm.mass.is_finite() || pm.mass < 0.0 {
            return Err(MeshError::InvalidPointMass(pm.mass).into());
        }
    }

    let mut acc = Accumulator::default();
    match model {
        MassModel::Solid => {
            if !is_watertight(mesh) {
                reporter.warn("solid mass integration over a non-watertight mesh");
            }
            let rho = solid_density(density, reporter);
            integrate_solid(mesh, rho, &mut acc);
        }
        MassModel::Shell { thickness } => {
            if !thickness.is_finite() || thickness < 0.0 {
                return Err(MeshError::UnsupportedConfig(format!(
                    "shell thickness must be finite and non-negative (got {thickness})"
                ))
                .into());
            }
            integrate_shell(mesh, thickness, density, &mut acc);
        }
    }

    for pm in point_masses {
        acc.add_point(pm.mass, &pm.position);
    }
    Ok(acc.finish())
}

fn validate_density(density: &Density, tri_count: usize) -> Result<(), MeshError> {
    match density {
        Density::Uniform(d) => {
            if !d.is_finite() || *d < 0.0 {
                return Err(MeshError::InvalidDensity(*d));
            }
        }
        Density::PerTri(values) => {
            if values.len() != tri_count {
                return Err(MeshError::UnsupportedConfig(format!(
                    "per-triangle density has {} values for {} triangles",
                    values.len(),
                    tri_count
                )));
            }
            for &d in values {
                if !d.is_finite() || d < 0.0 {
                    return Err(MeshError::InvalidDensity(d));
                }
            }
        }
    }
    Ok(())
}

/// Solid integration uses one density for the whole enclosed volume. A
/// per-triangle field collapses to its mean with a warning.
fn solid_density(density: &Density, reporter: &mut Reporter) -> f64 {
    match density {
        Density::Uniform(d) => *d,
        Density::PerTri(values) => {
            reporter.warn("per-triangle density is not supported by the solid model; using mean");
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
    }
}

#[derive(Default)]
struct Accumulator {
    mass: f64,
    moment: [f64; 3],
    inertia: Inertia,
}

impl Accumulator {
    fn add_point(&mut self, m: f64, p: &Point3<f64>) {
        self.mass += m;
        self.moment[0] += m * p.x;
        self.moment[1] += m * p.y;
        self.moment[2] += m * p.z;
        self.inertia.ixx += m * (p.y * p.y + p.z * p.z);
        self.inertia.iyy += m * (p.x * p.x + p.z * p.z);
        self.inertia.izz += m * (p.x * p.x + p.y * p.y);
        self.inertia.ixy += m * p.x * p.y;
        self.inertia.ixz += m * p.x * p.z;
        self.inertia.iyz += m * p.y * p.z;
    }

    fn finish(self) -> MassProp {
        let cg = if self.mass > 0.0 {
            Some(Point3::new(
                self.moment[0] / self.mass,
                self.moment[1] / self.mass,
                self.moment[2] / self.mass,
            ))
        } else {
            None
        };
        MassProp {
            mass: self.mass,
            cg,
            inertia: self.inertia,
        }
    }
}

/// Divergence-theorem volume integration: each facet spans a signed
/// tetrahedron against the origin, and the tetrahedron second moments are
/// evaluated in closed form.
fn integrate_solid(mesh: &TMesh, rho: f64, acc: &mut Accumulator) {
    for (_, tri) in mesh.active() {
        let [a, b, c] = tri.points(&mesh.nodes);
        let vol = a.coords.dot(&b.coords.cross(&c.coords)) / 6.0;
        let m = rho * vol;

        acc.mass += m;
        acc.moment[0] += m * (a.x + b.x + c.x) / 4.0;
        acc.moment[1] += m * (a.y + b.y + c.y) / 4.0;
        acc.moment[2] += m * (a.z + b.z + c.z) / 4.0;

        let sq = |xa: f64, xb: f64, xc: f64| {
            xa * xa + xb * xb + xc * xc + xa * xb + xa * xc + xb * xc
        };
        let xx = sq(a.x, b.x, c.x) / 10.0;
        let yy = sq(a.y, b.y, c.y) / 10.0;
        let zz = sq(a.z, b.z, c.z) / 10.0;
        let mixed = |xa: f64, xb: f64, xc: f64, ya: f64, yb: f64, yc: f64| {
            (2.0 * (xa * ya + xb * yb + xc * yc)
                + xa * yb
                + xa * yc
                + xb * ya
                + xb * yc
                + xc * ya
                + xc * yb)
                / 20.0
        };
        let xy = mixed(a.x, b.x, c.x, a.y, b.y, c.y);
        let xz = mixed(a.x, b.x, c.x, a.z, b.z, c.z);
        let yz = mixed(a.y, b.y, c.y, a.z, b.z, c.z);

        acc.inertia.ixx += m * (yy + zz);
        acc.inertia.iyy += m * (xx + zz);
        acc.inertia.izz += m * (xx + yy);
        acc.inertia.ixy += m * xy;
        acc.inertia.ixz += m * xz;
        acc.inertia.iyz += m * yz;
    }
}

/// Thin-shell integration. Each facet's lamina is exactly equivalent to four
/// point masses: one twelfth of the facet mass at each vertex and the
/// remaining three quarters at the centroid.
fn integrate_shell(mesh: &TMesh, thickness: f64, density: &Density, acc: &mut Accumulator) {
    for (seq, (_, tri)) in mesh.active().enumerate() {
        let rho = match density {
            Density::Uniform(d) => *d,
            Density::PerTri(values) => values[seq],
        };
        let m = tri.area * thickness * rho;
        if m == 0.0 {
            continue;
        }
        let [a, b, c] = tri.points(&mesh.nodes);
        let centroid = tri.centroid(&mesh.nodes);
        acc.add_point(m / 12.0, &a);
        acc.add_point(m / 12.0, &b);
        acc.add_point(m / 12.0, &c);
        acc.add_point(3.0 * m / 4.0, &centroid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::primitives;
    use approx::assert_relative_eq;

    fn integrate_cube(model: MassModel, density: Density) -> MassProp {
        let cube = primitives::unit_cube(1e-8);
        let mut reporter = Reporter::new();
        integrate(
            &cube,
            model,
            &density,
            &[],
            &Settings::default(),
            &mut reporter,
        )
        .unwrap()
    }

    #[test]
    fn test_solid_unit_cube_matches_analytic() {
        let mp = integrate_cube(MassModel::Solid, Density::Uniform(1.0));
        assert_relative_eq!(mp.mass, 1.0, epsilon = 1e-12);
        let cg = mp.cg.unwrap();
        assert_relative_eq!(cg.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(cg.y, 0.5, epsilon = 1e-12);
        assert_relative_eq!(cg.z, 0.5, epsilon = 1e-12);

        let i = mp.inertia_about_cg().unwrap();
        assert_relative_eq!(i.ixx, 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(i.iyy, 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(i.izz, 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(i.ixy, 0.0, epsilon = 1e-12);
        assert_relative_eq!(i.ixz, 0.0, epsilon = 1e-12);
        assert_relative_eq!(i.iyz, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_shell_unit_cube_mass_and_cg() {
        let mp = integrate_cube(
            MassModel::Shell { thickness: 0.01 },
            Density::Uniform(1.0),
        );
        assert_relative_eq!(mp.mass, 0.06, epsilon = 1e-12);
        let cg = mp.cg.unwrap();
        assert_relative_eq!(cg.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_mass_has_undefined_cg() {
        let mp = integrate_cube(MassModel::Solid, Density::Uniform(0.0));
        assert_eq!(mp.mass, 0.0);
        assert!(mp.cg.is_none());
        assert!(mp.inertia_about_cg().is_none());
    }

    #[test]
    fn test_negative_density_rejected() {
        let cube = primitives::unit_cube(1e-8);
        let mut reporter = Reporter::new();
        let r = integrate(
            &cube,
            MassModel::Solid,
            &Density::Uniform(-1.0),
            &[],
            &Settings::default(),
            &mut reporter,
        );
        assert!(r.is_err());
    }

    #[test]
    fn test_point_mass_shifts_cg() {
        let cube = primitives::unit_cube(1e-8);
        let mut reporter = Reporter::new();
        let pm = PointMass {
            mass: 1.0,
            position: Point3::new(1.5, 0.5, 0.5),
        };
        let mp = integrate(
            &cube,
            MassModel::Solid,
            &Density::Uniform(1.0),
            &[pm],
            &Settings::default(),
            &mut reporter,
        )
        .unwrap();
        assert_relative_eq!(mp.mass, 2.0, epsilon = 1e-12);
        assert_relative_eq!(mp.cg.unwrap().x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_open_mesh_warns_for_solid_model() {
        let open = primitives::open_cube(1e-8);
        let mut reporter = Reporter::new();
        let _ = integrate(
            &open,
            MassModel::Solid,
            &Density::Uniform(1.0),
            &[],
            &Settings::default(),
            &mut reporter,
        )
        .unwrap();
        assert!(reporter.warning_count() >= 1);
    }
}
