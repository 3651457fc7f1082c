// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! End-to-end pipeline tests: loft, boolean combine, audit, slice, integrate.

use aeromesh::geom::primitives;
use aeromesh::{
    audit_and_repair, integrate, intersect, is_watertight, loft, slice, BoolMode, Density,
    MassModel, MeshInfo, Reporter, Settings, SliceParams, TriSoup, XSec, XSecCurve,
};
use approx::assert_relative_eq;
use nalgebra::{Point3, Vector3};

fn mesh_volume(mesh: &aeromesh::TMesh) -> f64 {
    let mut v = 0.0;
    for (_, t) in mesh.active() {
        let p = t.points(&mesh.nodes);
        v += p[0].coords.dot(&p[1].coords.cross(&p[2].coords)) / 6.0;
    }
    v.abs()
}

#[test]
fn disjoint_union_keeps_every_triangle() {
    let a = primitives::unit_cube(1e-8);
    let b = primitives::box_mesh(
        Point3::new(10.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
        1e-8,
    );
    let mut reporter = Reporter::new();
    let combined = intersect(&a, &b, BoolMode::Union, &Settings::default(), &mut reporter).unwrap();

    assert_eq!(combined.active_count(), a.active_count() + b.active_count());
    assert_eq!(combined.active().filter(|(_, t)| t.border).count(), 0);
    assert!(is_watertight(&combined));
}

#[test]
fn identical_cube_intersection_is_one_cube() {
    let a = primitives::unit_cube(1e-8);
    let b = primitives::unit_cube(1e-8);
    let mut reporter = Reporter::new();
    let combined = intersect(
        &a,
        &b,
        BoolMode::IntersectionOnly,
        &Settings::default(),
        &mut reporter,
    )
    .unwrap();

    assert_relative_eq!(mesh_volume(&combined), 1.0, epsilon = 1e-6);
}

#[test]
fn slice_areas_integrate_to_cube_volume() {
    let cube = primitives::unit_cube(1e-8);
    let params = SliceParams {
        count: 20,
        ..SliceParams::default()
    };
    let mut reporter = Reporter::new();
    let slices = slice(&cube, &params, &Settings::default(), &mut reporter).unwrap();

    let volume = aeromesh::slice::integrate_slice_volume(&slices);
    assert_relative_eq!(volume, 1.0, epsilon = 1e-9);
    assert!(slices
        .windows(2)
        .all(|w| w[0].cum_wetted_area <= w[1].cum_wetted_area));
}

#[test]
fn repair_is_idempotent_on_lofted_body() {
    let sections = [
        XSec {
            x: 0.0,
            curve: XSecCurve::Point,
        },
        XSec {
            x: 1.0,
            curve: XSecCurve::Ellipse {
                width: 1.0,
                height: 0.6,
            },
        },
        XSec {
            x: 3.0,
            curve: XSecCurve::Circle { diameter: 0.8 },
        },
        XSec {
            x: 4.0,
            curve: XSecCurve::Point,
        },
    ];
    let mut body = loft(&sections, 24, 1e-8).unwrap();
    assert!(is_watertight(&body));

    let settings = Settings::default();
    let mut reporter = Reporter::new();
    let first = audit_and_repair(&mut body, true, &settings, &mut reporter).unwrap();
    assert_eq!(first, MeshInfo::default());
    let second = audit_and_repair(&mut body, true, &settings, &mut reporter).unwrap();
    assert_eq!(second, MeshInfo::default());
}

#[test]
fn lofted_body_slices_agree_with_solid_mass() {
    let sections = [
        XSec {
            x: 0.0,
            curve: XSecCurve::Circle { diameter: 1.0 },
        },
        XSec {
            x: 5.0,
            curve: XSecCurve::Circle { diameter: 1.0 },
        },
    ];
    let body = loft(&sections, 48, 1e-8).unwrap();

    let settings = Settings::default();
    let mut reporter = Reporter::new();
    let params = SliceParams {
        count: 40,
        ..SliceParams::default()
    };
    let slices = slice(&body, &params, &settings, &mut reporter).unwrap();
    let sliced_volume = aeromesh::slice::integrate_slice_volume(&slices);

    let mp = integrate(
        &body,
        MassModel::Solid,
        &Density::Uniform(1.0),
        &[],
        &settings,
        &mut reporter,
    )
    .unwrap();

    // Both measure the same faceted cylinder, so they agree tightly; the
    // analytic cylinder volume only to tessellation accuracy.
    assert_relative_eq!(sliced_volume, mp.mass, epsilon = 1e-6);
    let analytic = std::f64::consts::PI * 0.25 * 5.0;
    assert!((mp.mass - analytic).abs() / analytic < 0.02);

    let cg = mp.cg.unwrap();
    assert_relative_eq!(cg.x, 2.5, epsilon = 1e-9);
    assert_relative_eq!(cg.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(cg.z, 0.0, epsilon = 1e-9);
}

#[test]
fn boolean_result_flows_into_slicing() {
    let a = primitives::unit_cube(1e-8);
    let b = primitives::box_mesh(
        Point3::new(0.5, 0.25, 0.25),
        Vector3::new(1.0, 0.5, 0.5),
        1e-8,
    );
    let settings = Settings::default();
    let mut reporter = Reporter::new();
    let combined = intersect(&a, &b, BoolMode::Union, &settings, &mut reporter).unwrap();

    let params = SliceParams {
        count: 30,
        ..SliceParams::default()
    };
    let slices = slice(&combined, &params, &settings, &mut reporter).unwrap();
    let volume = aeromesh::slice::integrate_slice_volume(&slices);
    let expected = 1.0 + 0.25 - 0.125;
    assert!(
        (volume - expected).abs() < 0.02,
        "sliced union volume {volume} vs {expected}"
    );
}

#[test]
fn soup_round_trips_through_the_kernel() {
    let cube = primitives::unit_cube(1e-8);
    let soup = TriSoup::from_tmesh(&cube);
    soup.validate().unwrap();
    assert_eq!(soup.faces.len(), 12);
    assert_eq!(soup.points.len(), 8);

    let back = soup.to_tmesh(cube.nodes.weld_eps()).unwrap();
    assert_eq!(back.active_count(), 12);
    assert_relative_eq!(mesh_volume(&back), 1.0, epsilon = 1e-12);
}

#[test]
fn transforms_apply_before_boolean() {
    let a = primitives::unit_cube(1e-8);
    let mut b = primitives::unit_cube(1e-8);
    // Push B out of overlap entirely.
    b.set_transform(nalgebra::Matrix4::new_translation(&Vector3::new(
        5.0, 0.0, 0.0,
    )));

    let mut reporter = Reporter::new();
    let combined = intersect(&a, &b, BoolMode::Union, &Settings::default(), &mut reporter).unwrap();
    assert_eq!(combined.active_count(), 24);

    let bb = combined.bounding_box();
    assert_relative_eq!(bb.max.x, 6.0, epsilon = 1e-12);
}
