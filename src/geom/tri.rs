// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Triangle primitive: facet with derived normal/area, classification tags,
//! and the split list produced by the intersection pass

use super::{BoundingBox, NodeStore};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Tri-state classification of a triangle relative to the other mesh in a
/// boolean operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriTag {
    Unknown,
    Inside,
    Outside,
}

/// A 3-vertex facet. Holds indices into the owning mesh's node store.
#[derive(Debug, Clone)]
pub struct Tri {
    /// Node indices, counter-clockwise when viewed from outside.
    pub nodes: [usize; 3],
    /// Outward unit normal, recomputed after any vertex change.
    pub normal: Vector3<f64>,
    /// Facet area, derived.
    pub area: f64,
    pub tag: TriTag,
    /// Lies on an intersection boundary between two meshes.
    pub border: bool,
    /// Parent replaced by its split list; skipped by all iteration and
    /// removed by the next compaction pass.
    pub retired: bool,
    /// Arena indices of the sub-triangles that replace this one.
    pub split: Vec<usize>,
}

impl Tri {
    pub fn new(nodes: [usize; 3], store: &NodeStore) -> Self {
        let (normal, area) = derive_normal_area(
            &store.get(nodes[0]),
            &store.get(nodes[1]),
            &store.get(nodes[2]),
        );
        Self {
            nodes,
            normal,
            area,
            tag: TriTag::Unknown,
            border: false,
            retired: false,
            split: Vec::new(),
        }
    }

    /// Recompute the derived normal and area after a vertex change.
    pub fn recompute(&mut self, store: &NodeStore) {
        let (normal, area) = derive_normal_area(
            &store.get(self.nodes[0]),
            &store.get(self.nodes[1]),
            &store.get(self.nodes[2]),
        );
        self.normal = normal;
        self.area = area;
    }

    pub fn points(&self, store: &NodeStore) -> [Point3<f64>; 3] {
        [
            store.get(self.nodes[0]),
            store.get(self.nodes[1]),
            store.get(self.nodes[2]),
        ]
    }

    pub fn centroid(&self, store: &NodeStore) -> Point3<f64> {
        let p = self.points(store);
        Point3::new(
            (p[0].x + p[1].x + p[2].x) / 3.0,
            (p[0].y + p[1].y + p[2].y) / 3.0,
            (p[0].z + p[1].z + p[2].z) / 3.0,
        )
    }

    pub fn bbox(&self, store: &NodeStore) -> BoundingBox {
        let p = self.points(store);
        BoundingBox::from_points(p.iter())
    }

    /// Degenerate triangles are eligible for removal.
    pub fn is_degenerate(&self, area_threshold: f64) -> bool {
        self.area < area_threshold
    }
}

fn derive_normal_area(
    p0: &Point3<f64>,
    p1: &Point3<f64>,
    p2: &Point3<f64>,
) -> (Vector3<f64>, f64) {
    let cross = (p1 - p0).cross(&(p2 - p0));
    let len = cross.norm();
    let area = len / 2.0;
    let normal = if len > 0.0 {
        cross / len
    } else {
        Vector3::new(0.0, 0.0, 1.0)
    };
    (normal, area)
}
