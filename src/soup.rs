// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Triangle-soup exchange structure shared with file-format adapters
//!
//! The kernel never opens files. Adapters produce or consume a `TriSoup`
//! (node positions plus index triples) and the kernel converts it to or from
//! a welded `TMesh`.

use crate::error::MeshError;
use crate::geom::TMesh;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Ordered triangle soup: the only structure crossing the adapter boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriSoup {
    pub points: Vec<[f64; 3]>,
    pub faces: Vec<[usize; 3]>,
}

impl TriSoup {
    /// Fail fast on malformed input: empty soup, non-finite coordinates,
    /// out-of-range indices.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.faces.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        for (i, p) in self.points.iter().enumerate() {
            if p.iter().any(|c| !c.is_finite()) {
                return Err(MeshError::NonFiniteCoordinate(i));
            }
        }
        let len = self.points.len();
        for (i, f) in self.faces.iter().enumerate() {
            for &n in f {
                if n >= len {
                    return Err(MeshError::InvalidNodeIndex { tri: i, node: n, len });
                }
            }
        }
        Ok(())
    }

    /// Build a welded surface mesh. Duplicate soup points within the weld
    /// epsilon collapse into one node.
    pub fn to_tmesh(&self, weld_eps: f64) -> Result<TMesh, MeshError> {
        self.validate()?;
        let mut mesh = TMesh::new(weld_eps);
        for f in &self.faces {
            let p0 = self.points[f[0]];
            let p1 = self.points[f[1]];
            let p2 = self.points[f[2]];
            mesh.add_tri(
                Point3::new(p0[0], p0[1], p0[2]),
                Point3::new(p1[0], p1[1], p1[2]),
                Point3::new(p2[0], p2[1], p2[2]),
            );
        }
        Ok(mesh)
    }

    /// Export the active triangles of a mesh. Node ordering follows the
    /// store; face ordering follows the active triangle order, so exported
    /// numbering is reproducible.
    pub fn from_tmesh(mesh: &TMesh) -> Self {
        let points: Vec<[f64; 3]> = mesh
            .nodes
            .points()
            .iter()
            .map(|p| [p.x, p.y, p.z])
            .collect();
        let faces: Vec<[usize; 3]> = mesh.active().map(|(_, t)| t.nodes).collect();
        Self { points, faces }
    }
}
