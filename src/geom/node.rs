// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Deduplicated node pool shared by a mesh's triangles

use ahash::AHashMap;
use nalgebra::{Matrix4, Point3};

/// Quantized grid key used to bucket nearby points for welding.
#[derive(Debug, Hash, PartialEq, Eq, Clone, Copy)]
struct CellKey {
    x: i64,
    y: i64,
    z: i64,
}

impl CellKey {
    fn from_point(p: &Point3<f64>, inv_cell: f64) -> Self {
        Self {
            x: (p.x * inv_cell).floor() as i64,
            y: (p.y * inv_cell).floor() as i64,
            z: (p.z * inv_cell).floor() as i64,
        }
    }
}

/// 3D point pool with epsilon-distance deduplication.
///
/// Triangles hold indices into this store, never copies. Two nodes within
/// `weld_eps` of each other are the same node during any dedup pass.
#[derive(Debug, Clone)]
pub struct NodeStore {
    points: Vec<Point3<f64>>,
    cells: AHashMap<CellKey, Vec<usize>>,
    weld_eps: f64,
}

impl NodeStore {
    pub fn new(weld_eps: f64) -> Self {
        Self {
            points: Vec::new(),
            cells: AHashMap::new(),
            weld_eps,
        }
    }

    pub fn weld_eps(&self) -> f64 {
        self.weld_eps
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Point3<f64> {
        self.points[index]
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// Add a point, returning the index of an existing node if one lies
    /// within the weld epsilon.
    pub fn add(&mut self, p: Point3<f64>) -> usize {
        // Cell size is the weld epsilon, so a match can only be in the
        // point's own cell or one of its 26 neighbors.
        let inv_cell = 1.0 / self.weld_eps;
        let key = CellKey::from_point(&p, inv_cell);

        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let neighbor = CellKey {
                        x: key.x + dx,
                        y: key.y + dy,
                        z: key.z + dz,
                    };
                    if let Some(bucket) = self.cells.get(&neighbor) {
                        for &idx in bucket {
                            if (self.points[idx] - p).norm() < self.weld_eps {
                                return idx;
                            }
                        }
                    }
                }
            }
        }

        let idx = self.points.len();
        self.points.push(p);
        self.cells.entry(key).or_default().push(idx);
        idx
    }

    /// Transform every node in place.
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        for p in &mut self.points {
            *p = matrix.transform_point(p);
        }
        self.rebuild_index();
    }

    fn rebuild_index(&mut self) {
        let inv_cell = 1.0 / self.weld_eps;
        self.cells.clear();
        for (idx, p) in self.points.iter().enumerate() {
            let key = CellKey::from_point(p, inv_cell);
            self.cells.entry(key).or_default().push(idx);
        }
    }

}

/// Weak node-to-triangle back-reference index, rebuilt on demand for
/// adjacency and merge queries. Never an ownership edge.
pub fn back_refs(node_count: usize, tris: impl Iterator<Item = (usize, [usize; 3])>) -> Vec<Vec<usize>> {
    let mut refs = vec![Vec::new(); node_count];
    for (tri_idx, nodes) in tris {
        for &n in &nodes {
            refs[n].push(tri_idx);
        }
    }
    refs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_dedups_within_epsilon() {
        let mut store = NodeStore::new(1e-6);
        let a = store.add(Point3::new(0.0, 0.0, 0.0));
        let b = store.add(Point3::new(0.0, 0.0, 1e-8));
        let c = store.add(Point3::new(1.0, 0.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_store_is_debug_printable() {
        let mut store = NodeStore::new(1e-6);
        store.add(Point3::new(1.0, 2.0, 3.0));
        let dump = format!("{:?}", store);
        assert!(dump.contains("NodeStore"));
    }

    #[test]
    fn test_back_refs() {
        let tris = vec![(0usize, [0usize, 1, 2]), (1, [1, 2, 3])];
        let refs = back_refs(4, tris.into_iter());
        assert_eq!(refs[0], vec![0]);
        assert_eq!(refs[1], vec![0, 1]);
        assert_eq!(refs[3], vec![1]);
    }
}
