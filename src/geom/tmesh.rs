// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Surface mesh: triangle arena plus node store for one logical part

use super::{BoundingBox, NodeStore, Tri, TriTag};
use crate::error::MeshError;
use nalgebra::{Matrix4, Point3};

/// Lifecycle of a surface mesh through the trim pipeline.
///
/// Slicing and mass integration are only well-defined once all split lists
/// have been resolved into the active triangle set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshState {
    Raw,
    Trimmed,
    Flattened,
}

/// An owned collection of triangles and nodes representing one part.
///
/// Triangles live in an arena addressed by stable indices. A split parent is
/// retired and its children appended; [`TMesh::flatten`] resolves the arena
/// back into a plain list, with children taking their parent's place in the
/// original triangle order so downstream numbering is reproducible.
#[derive(Debug, Clone)]
pub struct TMesh {
    pub nodes: NodeStore,
    pub tris: Vec<Tri>,
    state: MeshState,
    transform: Matrix4<f64>,
    self_intersects: Option<bool>,
}

impl TMesh {
    pub fn new(weld_eps: f64) -> Self {
        Self {
            nodes: NodeStore::new(weld_eps),
            tris: Vec::new(),
            state: MeshState::Raw,
            transform: Matrix4::identity(),
            self_intersects: None,
        }
    }

    pub fn state(&self) -> MeshState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: MeshState) {
        self.state = state;
    }

    /// Add a triangle by vertex positions, welding into the node store.
    /// Returns the arena index.
    pub fn add_tri(&mut self, p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>) -> usize {
        let n0 = self.nodes.add(p0);
        let n1 = self.nodes.add(p1);
        let n2 = self.nodes.add(p2);
        self.add_tri_indices([n0, n1, n2])
    }

    /// Add a triangle by node indices already in the store.
    pub fn add_tri_indices(&mut self, nodes: [usize; 3]) -> usize {
        let idx = self.tris.len();
        self.tris.push(Tri::new(nodes, &self.nodes));
        self.self_intersects = None;
        idx
    }

    /// Active (non-retired) triangles with their arena indices.
    pub fn active(&self) -> impl Iterator<Item = (usize, &Tri)> {
        self.tris.iter().enumerate().filter(|(_, t)| !t.retired)
    }

    pub fn active_count(&self) -> usize {
        self.tris.iter().filter(|t| !t.retired).count()
    }

    pub fn is_empty(&self) -> bool {
        self.active_count() == 0
    }

    pub fn surface_area(&self) -> f64 {
        self.active().map(|(_, t)| t.area).sum()
    }

    /// Retire a parent triangle in favor of child fragments already appended
    /// to the arena.
    pub(crate) fn retire(&mut self, parent: usize, children: Vec<usize>) {
        self.tris[parent].retired = true;
        self.tris[parent].split = children;
    }

    /// Any retired parents whose split lists have not been resolved yet?
    pub fn pending_splits(&self) -> bool {
        self.tris.iter().any(|t| t.retired)
    }

    /// Fail unless this mesh is safe for derived outputs (slicing, mass
    /// integration): no pending split lists.
    pub fn require_flattened(&self) -> Result<(), MeshError> {
        if self.pending_splits() {
            return Err(MeshError::PendingSplits);
        }
        Ok(())
    }

    /// Resolve all split lists: each retired parent is replaced in place by
    /// its surviving children, preserving the original triangle order.
    /// No-op on an already-flattened mesh.
    pub fn flatten(&mut self) {
        if self.state == MeshState::Flattened && !self.pending_splits() {
            return;
        }

        // Children are appended after their parents, so any index that
        // appears in a split list is not a root.
        let mut is_child = vec![false; self.tris.len()];
        for tri in &self.tris {
            for &c in &tri.split {
                if c < is_child.len() {
                    is_child[c] = true;
                }
            }
        }

        let mut order = Vec::with_capacity(self.tris.len());
        for root in 0..self.tris.len() {
            if !is_child[root] {
                Self::emit_in_order(&self.tris, root, &mut order);
            }
        }

        let mut flat: Vec<Tri> = order
            .into_iter()
            .map(|i| {
                let mut t = self.tris[i].clone();
                t.split = Vec::new();
                t
            })
            .collect();
        for t in &mut flat {
            t.recompute(&self.nodes);
        }
        self.tris = flat;
        self.state = MeshState::Flattened;
    }

    fn emit_in_order(tris: &[Tri], idx: usize, out: &mut Vec<usize>) {
        let tri = &tris[idx];
        if tri.retired {
            for &c in &tri.split {
                Self::emit_in_order(tris, c, out);
            }
        } else {
            out.push(idx);
        }
    }

    /// Drop retired triangles without order bookkeeping. Used after repair
    /// passes that retire without splitting.
    pub(crate) fn compact(&mut self) {
        self.tris.retain(|t| !t.retired);
    }

    /// Remove triangles not matching the predicate by retiring them, then
    /// compacting. Returns the number removed.
    pub(crate) fn retain_tris(&mut self, mut keep: impl FnMut(&Tri) -> bool) -> usize {
        let before = self.active_count();
        for tri in &mut self.tris {
            if !tri.retired && !keep(tri) {
                tri.retired = true;
            }
        }
        self.compact();
        self.self_intersects = None;
        before - self.active_count()
    }

    /// Merge another mesh's active triangles into this one, welding shared
    /// nodes across the seam.
    pub fn merge(&mut self, other: &TMesh) {
        let pts: Vec<[Point3<f64>; 3]> = other.active().map(|(_, t)| t.points(&other.nodes)).collect();
        for p in pts {
            self.add_tri(p[0], p[1], p[2]);
        }
    }

    /// Associated rigid transform, applied at commit time.
    pub fn set_transform(&mut self, transform: Matrix4<f64>) {
        self.transform = transform;
    }

    pub fn transform(&self) -> &Matrix4<f64> {
        &self.transform
    }

    /// Bake the pending transform into the node store and reset it to
    /// identity. Derived triangle data is recomputed.
    pub fn apply_transform(&mut self) {
        if self.transform == Matrix4::identity() {
            return;
        }
        let m = self.transform;
        self.nodes.transform(&m);
        for tri in &mut self.tris {
            tri.recompute(&self.nodes);
        }
        self.transform = Matrix4::identity();
        self.self_intersects = None;
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for (_, tri) in self.active() {
            for p in tri.points(&self.nodes) {
                bbox.expand_to_include(&p);
            }
        }
        bbox
    }

    /// Tessellation refinement: each iteration splits every active triangle
    /// into four by edge midpoints.
    pub fn refine(&mut self, iterations: usize) {
        for _ in 0..iterations {
            let parents: Vec<(usize, [Point3<f64>; 3])> = self
                .active()
                .map(|(i, t)| (i, t.points(&self.nodes)))
                .collect();
            for (idx, [p0, p1, p2]) in parents {
                let m01 = nalgebra::center(&p0, &p1);
                let m12 = nalgebra::center(&p1, &p2);
                let m20 = nalgebra::center(&p2, &p0);
                let children = vec![
                    self.add_tri(p0, m01, m20),
                    self.add_tri(m01, p1, m12),
                    self.add_tri(m20, m12, p2),
                    self.add_tri(m01, m12, m20),
                ];
                self.retire(idx, children);
            }
            self.flatten_preserving_state();
        }
        self.self_intersects = None;
    }

    fn flatten_preserving_state(&mut self) {
        let state = self.state;
        self.flatten();
        self.state = state;
    }

    /// Reset every triangle's classification tags.
    pub(crate) fn clear_tags(&mut self) {
        for tri in &mut self.tris {
            tri.tag = TriTag::Unknown;
            tri.border = false;
        }
    }

    /// Fail fast on malformed input: empty mesh, non-finite coordinates,
    /// inconsistent node indices.
    pub fn validate(&self) -> Result<(), MeshError> {
        if self.is_empty() {
            return Err(MeshError::EmptyMesh);
        }
        for (i, p) in self.nodes.points().iter().enumerate() {
            if !p.x.is_finite() || !p.y.is_finite() || !p.z.is_finite() {
                return Err(MeshError::NonFiniteCoordinate(i));
            }
        }
        let len = self.nodes.len();
        for (i, tri) in self.tris.iter().enumerate() {
            for &n in &tri.nodes {
                if n >= len {
                    return Err(MeshError::InvalidNodeIndex { tri: i, node: n, len });
                }
            }
        }
        Ok(())
    }

    /// Whether any two non-adjacent triangles of this mesh intersect.
    /// Computed lazily and cached until the mesh is mutated.
    pub fn self_intersects(&mut self, plane_tol: f64) -> bool {
        if let Some(flag) = self.self_intersects {
            return flag;
        }
        let flag = self.compute_self_intersects(plane_tol);
        self.self_intersects = Some(flag);
        flag
    }

    fn compute_self_intersects(&self, plane_tol: f64) -> bool {
        use crate::intersect::segment::{tri_tri_segment, TriTriResult};

        let entries: Vec<(usize, [Point3<f64>; 3], BoundingBox)> = self
            .active()
            .map(|(i, t)| (i, t.points(&self.nodes), t.bbox(&self.nodes)))
            .collect();

        for (ai, (_, pa, ba)) in entries.iter().enumerate() {
            for (_, pb, bb) in entries.iter().skip(ai + 1) {
                if !ba.overlaps(bb) {
                    continue;
                }
                // Triangles sharing a node are adjacent, not intersecting.
                let shared = pa.iter().any(|p| pb.iter().any(|q| (p - q).norm() < plane_tol));
                if shared {
                    continue;
                }
                if let TriTriResult::Segment(_) = tri_tri_segment(pa, pb, plane_tol) {
                    return true;
                }
            }
        }
        false
    }
}
