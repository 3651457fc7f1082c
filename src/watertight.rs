// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Watertightness audit and repair
//!
//! A closed manifold has every edge shared by exactly two triangles. This
//! pass removes degenerate facets, stitches open sub-meshes whose boundary
//! loops coincide within tolerance, and optionally deletes open patches that
//! cannot be matched. Running it again on a repaired mesh is a no-op.

use crate::geom::{back_refs, TMesh};
use crate::report::Reporter;
use crate::settings::Settings;
use ahash::{AHashMap, AHashSet};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Per-operation repair counters, returned to the caller and never stored on
/// the mesh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshInfo {
    /// Pairs of coincident open boundary loops stitched together.
    pub open_merged: usize,
    /// Open patches deleted under watertight enforcement.
    pub open_deleted: usize,
    /// Degenerate triangles removed.
    pub degen_deleted: usize,
    /// Boundary loops left unmatched after the merge pass.
    pub open_loops: usize,
}

/// Every edge shared by exactly two triangles.
pub fn is_watertight(mesh: &TMesh) -> bool {
    !mesh.is_empty() && edge_counts(mesh).values().all(|&c| c == 2)
}

/// Audit the mesh, repair what can be repaired, and report the rest.
///
/// Degenerate triangles are always removed. Coincident open boundary loops
/// are stitched by welding one loop's nodes onto the other's. Remaining open
/// patches are reported, and deleted outright when `enforce` is set.
pub fn audit_and_repair(
    mesh: &mut TMesh,
    enforce: bool,
    settings: &Settings,
    reporter: &mut Reporter,
) -> Result<MeshInfo> {
    let mut info = MeshInfo::default();
    if mesh.is_empty() {
        return Ok(info);
    }
    mesh.validate()?;
    mesh.require_flattened()?;

    info.degen_deleted = mesh.retain_tris(|t| !t.is_degenerate(settings.degen_area));
    if mesh.is_empty() {
        reporter.warn("all triangles were degenerate; mesh is now empty");
        return Ok(info);
    }

    let non_manifold = edge_counts(mesh).values().filter(|&&c| c > 2).count();
    if non_manifold > 0 {
        reporter.error(format!(
            "{} non-manifold edges shared by more than two triangles",
            non_manifold
        ));
    }

    let loops = boundary_loops(mesh);
    if loops.len() >= 2 {
        let mut consumed = vec![false; loops.len()];
        for i in 0..loops.len() {
            if consumed[i] {
                continue;
            }
            for j in (i + 1)..loops.len() {
                if consumed[j] {
                    continue;
                }
                if loops_coincide(mesh, &loops[i], &loops[j], settings.chain_eps) {
                    stitch(mesh, &loops[i], &loops[j], settings.chain_eps);
                    consumed[i] = true;
                    consumed[j] = true;
                    info.open_merged += 1;
                    break;
                }
            }
        }
    }

    if info.open_merged > 0 {
        // Stitching can collapse a sliver triangle whose boundary nodes both
        // map to the same target node; sweep those out before re-auditing.
        info.degen_deleted += mesh.retain_tris(|t| !t.is_degenerate(settings.degen_area));
    }

    let remaining = boundary_loops(mesh);
    info.open_loops = remaining.len();
    if !remaining.is_empty() {
        reporter.warn(format!(
            "{} open boundary loops could not be matched",
            remaining.len()
        ));
        if enforce {
            info.open_deleted = delete_open_patches(mesh);
            reporter.warn(format!(
                "{} open patches deleted to enforce watertightness",
                info.open_deleted
            ));
        }
    }
    Ok(info)
}

/// Occurrence count per undirected edge over the active triangles.
fn edge_counts(mesh: &TMesh) -> AHashMap<(usize, usize), usize> {
    let mut counts = AHashMap::new();
    for (_, tri) in mesh.active() {
        for k in 0..3 {
            let a = tri.nodes[k];
            let b = tri.nodes[(k + 1) % 3];
            let key = (a.min(b), a.max(b));
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Chains of boundary edges (edges used by exactly one triangle), each
/// returned as an ordered node walk. Closed walks do not repeat their first
/// node at the end.
fn boundary_loops(mesh: &TMesh) -> Vec<Vec<usize>> {
    let mut edges: Vec<(usize, usize)> = edge_counts(mesh)
        .into_iter()
        .filter(|&(_, c)| c == 1)
        .map(|(e, _)| e)
        .collect();
    edges.sort_unstable();

    let mut adj: AHashMap<usize, Vec<usize>> = AHashMap::new();
    for (i, &(a, b)) in edges.iter().enumerate() {
        adj.entry(a).or_default().push(i);
        adj.entry(b).or_default().push(i);
    }

    let mut used = vec![false; edges.len()];
    let mut loops = Vec::new();
    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let (a, b) = edges[start];
        let mut walk = vec![a, b];
        loop {
            let tail = walk[walk.len() - 1];
            if walk.len() > 2 && tail == walk[0] {
                walk.pop();
                break;
            }
            let next = adj
                .get(&tail)
                .and_then(|ids| ids.iter().copied().find(|&i| !used[i]));
            match next {
                Some(i) => {
                    used[i] = true;
                    let (p, q) = edges[i];
                    walk.push(if p == tail { q } else { p });
                }
                None => break,
            }
        }
        loops.push(walk);
    }
    loops
}

/// True when every node of each loop has a counterpart in the other loop
/// within `tol`.
fn loops_coincide(mesh: &TMesh, a: &[usize], b: &[usize], tol: f64) -> bool {
    let covered = |from: &[usize], onto: &[usize]| {
        from.iter().all(|&m| {
            let p = mesh.nodes.get(m);
            onto.iter().any(|&k| (mesh.nodes.get(k) - p).norm() <= tol)
        })
    };
    covered(a, b) && covered(b, a)
}

/// Weld loop `merge` onto loop `keep`: every triangle referencing a node of
/// `merge` is remapped to the nearest node of `keep`.
fn stitch(mesh: &mut TMesh, keep: &[usize], merge: &[usize], tol: f64) {
    let mut map: AHashMap<usize, usize> = AHashMap::new();
    for &m in merge {
        let p = mesh.nodes.get(m);
        let mut best = None;
        let mut best_d = tol;
        for &k in keep {
            let d = (mesh.nodes.get(k) - p).norm();
            if d <= best_d {
                best_d = d;
                best = Some(k);
            }
        }
        if let Some(k) = best {
            map.insert(m, k);
        }
    }

    let refs = back_refs(mesh.nodes.len(), mesh.active().map(|(i, t)| (i, t.nodes)));
    let mut touched = AHashSet::new();
    for (&m, _) in &map {
        touched.extend(refs[m].iter().copied());
    }
    for &i in &touched {
        for n in &mut mesh.tris[i].nodes {
            if let Some(&k) = map.get(n) {
                *n = k;
            }
        }
        let store = &mesh.nodes;
        mesh.tris[i].recompute(store);
    }
}

/// Delete every triangle belonging to a connected component that still has
/// boundary edges. Returns the number of components removed.
fn delete_open_patches(mesh: &mut TMesh) -> usize {
    let n = mesh.nodes.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    let tri_nodes: Vec<[usize; 3]> = mesh.active().map(|(_, t)| t.nodes).collect();
    for nodes in &tri_nodes {
        for k in 1..3 {
            let a = find(&mut parent, nodes[0]);
            let b = find(&mut parent, nodes[k]);
            if a != b {
                parent[a] = b;
            }
        }
    }

    let mut open_roots = AHashSet::new();
    for (a, _) in edge_counts(mesh).into_iter().filter(|&(_, c)| c == 1) {
        let r = find(&mut parent, a.0);
        open_roots.insert(r);
    }

    let roots: Vec<usize> = (0..n).map(|i| find(&mut parent, i)).collect();
    let removed = open_roots.len();
    mesh.retain_tris(|t| !open_roots.contains(&roots[t.nodes[0]]));
    removed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::primitives;
    use nalgebra::Point3;

    fn half_box_shell(x0: f64, x1: f64) -> Vec<[Point3<f64>; 3]> {
        // Cap at x0 plus the four side strips; open square boundary at x1.
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        vec![
            [p(x0, 0.0, 0.0), p(x0, 1.0, 0.0), p(x0, 1.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x0, 1.0, 1.0), p(x0, 0.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 0.0), p(x1, 1.0, 0.0)],
            [p(x0, 0.0, 0.0), p(x1, 1.0, 0.0), p(x0, 1.0, 0.0)],
            [p(x0, 0.0, 1.0), p(x1, 0.0, 1.0), p(x1, 1.0, 1.0)],
            [p(x0, 0.0, 1.0), p(x1, 1.0, 1.0), p(x0, 1.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 0.0), p(x1, 0.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 1.0), p(x0, 0.0, 1.0)],
            [p(x0, 1.0, 0.0), p(x1, 1.0, 0.0), p(x1, 1.0, 1.0)],
            [p(x0, 1.0, 0.0), p(x1, 1.0, 1.0), p(x0, 1.0, 1.0)],
        ]
    }

    #[test]
    fn test_closed_cube_is_all_zero() {
        let mut cube = primitives::unit_cube(1e-8);
        let mut reporter = Reporter::new();
        let info = audit_and_repair(&mut cube, true, &Settings::default(), &mut reporter).unwrap();
        assert_eq!(info, MeshInfo::default());
        assert!(is_watertight(&cube));
        assert_eq!(reporter.warning_count(), 0);
    }

    #[test]
    fn test_degenerate_triangle_removed() {
        let mut cube = primitives::unit_cube(1e-8);
        cube.add_tri(
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(3.0, 0.0, 0.0),
            Point3::new(4.0, 0.0, 0.0),
        );
        let mut reporter = Reporter::new();
        let info = audit_and_repair(&mut cube, false, &Settings::default(), &mut reporter).unwrap();
        assert_eq!(info.degen_deleted, 1);
        assert_eq!(cube.active_count(), 12);
    }

    #[test]
    fn test_open_cube_reports_one_loop() {
        let mut open = primitives::open_cube(1e-8);
        let mut reporter = Reporter::new();
        let info = audit_and_repair(&mut open, false, &Settings::default(), &mut reporter).unwrap();
        assert_eq!(info.open_loops, 1);
        assert_eq!(info.open_deleted, 0);
        assert!(!is_watertight(&open));
    }

    #[test]
    fn test_enforced_repair_is_idempotent() {
        let mut open = primitives::open_cube(1e-8);
        let mut reporter = Reporter::new();
        let settings = Settings::default();
        let info = audit_and_repair(&mut open, true, &settings, &mut reporter).unwrap();
        assert_eq!(info.open_deleted, 1);

        let again = audit_and_repair(&mut open, true, &settings, &mut reporter).unwrap();
        assert_eq!(again, MeshInfo::default());
    }

    #[test]
    fn test_stitch_with_sliver_stays_idempotent() {
        // Right half's boundary ring carries an extra node just off one
        // corner. Stitching maps it and the corner to the same target node,
        // collapsing the sliver triangle between them.
        let x0 = 1.0;
        let x1 = 0.5 + 1e-7;
        let p = |x: f64, y: f64, z: f64| Point3::new(x, y, z);
        let mut right = crate::geom::TMesh::new(1e-8);
        for [a, b, c] in [
            [p(x0, 0.0, 0.0), p(x0, 1.0, 0.0), p(x0, 1.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x0, 1.0, 1.0), p(x0, 0.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 0.0), p(x1, 5e-7, 0.0)],
            [p(x0, 0.0, 0.0), p(x1, 5e-7, 0.0), p(x1, 1.0, 0.0)],
            [p(x0, 0.0, 0.0), p(x1, 1.0, 0.0), p(x0, 1.0, 0.0)],
            [p(x0, 0.0, 1.0), p(x1, 0.0, 1.0), p(x1, 1.0, 1.0)],
            [p(x0, 0.0, 1.0), p(x1, 1.0, 1.0), p(x0, 1.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 0.0), p(x1, 0.0, 1.0)],
            [p(x0, 0.0, 0.0), p(x1, 0.0, 1.0), p(x0, 0.0, 1.0)],
            [p(x0, 1.0, 0.0), p(x1, 1.0, 0.0), p(x1, 1.0, 1.0)],
            [p(x0, 1.0, 0.0), p(x1, 1.0, 1.0), p(x0, 1.0, 1.0)],
        ] {
            right.add_tri(a, b, c);
        }

        let mut mesh = crate::geom::TMesh::new(1e-8);
        for [a, b, c] in half_box_shell(0.0, 0.5) {
            mesh.add_tri(a, b, c);
        }
        mesh.merge(&right);

        let mut reporter = Reporter::new();
        let settings = Settings::default();
        let info = audit_and_repair(&mut mesh, false, &settings, &mut reporter).unwrap();
        assert_eq!(info.open_merged, 1);
        assert_eq!(info.degen_deleted, 1);
        assert!(is_watertight(&mesh));

        let again = audit_and_repair(&mut mesh, false, &settings, &mut reporter).unwrap();
        assert_eq!(again, MeshInfo::default());
    }

    #[test]
    fn test_non_manifold_edges_reported() {
        let mut cube = primitives::unit_cube(1e-8);
        // Duplicate one face triangle so its edges are shared three ways.
        let p = cube
            .active()
            .next()
            .map(|(_, t)| t.points(&cube.nodes))
            .unwrap();
        cube.add_tri(p[0], p[1], p[2]);
        let mut reporter = Reporter::new();
        let _ = audit_and_repair(&mut cube, false, &Settings::default(), &mut reporter).unwrap();
        assert!(reporter.has_errors());
    }

    #[test]
    fn test_coincident_halves_are_stitched() {
        let mut mesh = crate::geom::TMesh::new(1e-8);
        for [a, b, c] in half_box_shell(0.0, 0.5) {
            mesh.add_tri(a, b, c);
        }
        // Second half offset past the weld epsilon so its boundary ring
        // keeps its own nodes.
        let mut right = crate::geom::TMesh::new(1e-8);
        for [a, b, c] in half_box_shell(1.0, 0.5 + 1e-7) {
            right.add_tri(a, b, c);
        }
        mesh.merge(&right);
        assert!(!is_watertight(&mesh));

        let mut reporter = Reporter::new();
        let info = audit_and_repair(&mut mesh, false, &Settings::default(), &mut reporter).unwrap();
        assert_eq!(info.open_merged, 1);
        assert_eq!(info.open_loops, 0);
        assert!(is_watertight(&mesh));
    }
}
