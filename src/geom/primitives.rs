// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Fixture meshes used by tests and host applications

use super::TMesh;
use nalgebra::{Point3, Vector3};

/// Axis-aligned box mesh with outward-facing triangles.
pub fn box_mesh(min: Point3<f64>, size: Vector3<f64>, weld_eps: f64) -> TMesh {
    let max = min + size;
    let p = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    let faces: [[usize; 3]; 12] = [
        // z+ and z-
        [4, 5, 6],
        [4, 6, 7],
        [1, 0, 3],
        [1, 3, 2],
        // x+ and x-
        [5, 1, 2],
        [5, 2, 6],
        [0, 4, 7],
        [0, 7, 3],
        // y+ and y-
        [7, 6, 2],
        [7, 2, 3],
        [0, 1, 5],
        [0, 5, 4],
    ];

    let mut mesh = TMesh::new(weld_eps);
    for f in faces {
        mesh.add_tri(p[f[0]], p[f[1]], p[f[2]]);
    }
    mesh
}

/// Unit cube spanning [0,1]^3.
pub fn unit_cube(weld_eps: f64) -> TMesh {
    box_mesh(
        Point3::new(0.0, 0.0, 0.0),
        Vector3::new(1.0, 1.0, 1.0),
        weld_eps,
    )
}

/// Unit cube with one triangle left out, for open-boundary tests.
pub fn open_cube(weld_eps: f64) -> TMesh {
    let closed = unit_cube(weld_eps);
    let keep: Vec<[Point3<f64>; 3]> = closed
        .active()
        .skip(1)
        .map(|(_, t)| t.points(&closed.nodes))
        .collect();
    let mut mesh = TMesh::new(weld_eps);
    for [a, b, c] in keep {
        mesh.add_tri(a, b, c);
    }
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_is_closed_count() {
        let cube = unit_cube(1e-8);
        assert_eq!(cube.active_count(), 12);
        assert_eq!(cube.nodes.len(), 8);
        assert!((cube.surface_area() - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_open_cube_drops_one() {
        let open = open_cube(1e-8);
        assert_eq!(open.active_count(), 11);
    }
}
