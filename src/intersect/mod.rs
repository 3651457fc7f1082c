// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Intersection and trim engine: boolean-combines two surface meshes
//!
//! Pairwise-intersects triangles across the meshes, splits cut triangles
//! along their intersection segments, classifies surviving fragments by
//! ray-cast crossing parity, and commits the survivors into a single
//! flattened mesh in deterministic order.

pub mod classify;
pub mod segment;
pub mod split;

pub use classify::Classification;
pub use segment::TriTriResult;

use crate::geom::{BoundingBox, Bvh, MeshState, TMesh, TriTag};
use crate::report::Reporter;
use crate::settings::Settings;
use anyhow::Result;
use nalgebra::Point3;
use rayon::prelude::*;

/// Which side of each triangle's classification survives the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolMode {
    Union,
    IntersectionOnly,
    Subtract,
}

/// Boolean-combine two meshes into one flattened result.
///
/// Both inputs must validate; their pending rigid transforms are applied to
/// working copies before cutting. Border fragments are committed from mesh A
/// only, so coincident skins are not doubled.
pub fn intersect(
    mesh_a: &TMesh,
    mesh_b: &TMesh,
    mode: BoolMode,
    settings: &Settings,
    reporter: &mut Reporter,
) -> Result<TMesh> {
    mesh_a.validate()?;
    mesh_b.validate()?;

    let mut a = mesh_a.clone();
    let mut b = mesh_b.clone();
    a.apply_transform();
    b.apply_transform();
    a.clear_tags();
    b.clear_tags();

    let (seg_a, seg_b, coplanar_pairs) = compute_segments(&a, &b, settings);
    let cut_count: usize = seg_a.iter().filter(|s| !s.is_empty()).count()
        + seg_b.iter().filter(|s| !s.is_empty()).count();
    reporter.info(format!("{} triangles received intersection segments", cut_count));
    if coplanar_pairs > 0 {
        reporter.warn(format!(
            "{} coincident triangle pairs resolved by tolerance",
            coplanar_pairs
        ));
    }

    trim(&mut a, &seg_a, settings);
    trim(&mut b, &seg_b, settings);

    let b_tris: Vec<[Point3<f64>; 3]> = b.active().map(|(_, t)| t.points(&b.nodes)).collect();
    let a_tris: Vec<[Point3<f64>; 3]> = a.active().map(|(_, t)| t.points(&a.nodes)).collect();
    let flat_a: Vec<[Point3<f64>; 2]> = seg_a.iter().flatten().copied().collect();
    let flat_b: Vec<[Point3<f64>; 2]> = seg_b.iter().flatten().copied().collect();

    let ambiguous_a = tag_mesh(&mut a, &b_tris, &b.bounding_box(), &flat_a, settings);
    let ambiguous_b = tag_mesh(&mut b, &a_tris, &a.bounding_box(), &flat_b, settings);
    let ambiguous = ambiguous_a + ambiguous_b;
    if ambiguous > 0 {
        reporter.warn(format!(
            "{} silhouette ray casts were ambiguous; fragments kept as border",
            ambiguous
        ));
    }

    Ok(commit(&a, &b, mode, settings))
}

/// Broad phase plus segment computation. Returns, for each active triangle
/// of each mesh, the intersection segments it received, in triangle order.
fn compute_segments(
    a: &TMesh,
    b: &TMesh,
    settings: &Settings,
) -> (
    Vec<Vec<[Point3<f64>; 2]>>,
    Vec<Vec<[Point3<f64>; 2]>>,
    usize,
) {
    let tol = settings.plane_tol;

    let a_entries: Vec<([Point3<f64>; 3], BoundingBox)> = a
        .active()
        .map(|(_, t)| (t.points(&a.nodes), t.bbox(&a.nodes)))
        .collect();
    let b_entries: Vec<([Point3<f64>; 3], BoundingBox)> = b
        .active()
        .map(|(_, t)| (t.points(&b.nodes), t.bbox(&b.nodes)))
        .collect();

    let bvh_b = Bvh::build(
        b_entries
            .iter()
            .enumerate()
            .map(|(j, (_, bb))| (j, *bb))
            .collect(),
    );

    // Pair tests are independent; the per-triangle collect preserves index
    // order so the commit stays deterministic.
    let pair_hits: Vec<Vec<(usize, TriTriResult)>> = a_entries
        .par_iter()
        .map(|(pa, ba)| {
            let mut hits = Vec::new();
            let mut candidates = bvh_b.query(&ba.inflated(tol));
            candidates.sort_unstable();
            for j in candidates {
                let r = segment::tri_tri_segment(pa, &b_entries[j].0, tol);
                if !matches!(r, TriTriResult::None) {
                    hits.push((j, r));
                }
            }
            hits
        })
        .collect();

    let mut seg_a = vec![Vec::new(); a_entries.len()];
    let mut seg_b = vec![Vec::new(); b_entries.len()];
    let mut coplanar = 0usize;

    for (i, hits) in pair_hits.into_iter().enumerate() {
        for (j, r) in hits {
            match r {
                TriTriResult::Segment(s) => {
                    seg_a[i].push(s);
                    seg_b[j].push(s);
                }
                TriTriResult::Coplanar => coplanar += 1,
                TriTriResult::None => {}
            }
        }
    }

    (seg_a, seg_b, coplanar)
}

/// Split every cut triangle, retiring parents in favor of their fragments,
/// then flatten so children occupy their parent's position.
fn trim(mesh: &mut TMesh, segments: &[Vec<[Point3<f64>; 2]>], settings: &Settings) {
    let parents: Vec<(usize, [Point3<f64>; 3])> = mesh
        .active()
        .map(|(i, t)| (i, t.points(&mesh.nodes)))
        .collect();

    let mut any_split = false;
    for (seq, (parent, pts)) in parents.into_iter().enumerate() {
        let segs = &segments[seq];
        if segs.is_empty() {
            continue;
        }
        let normal = mesh.tris[parent].normal;
        let frags = split::split_by_segments(
            &pts,
            &normal,
            segs,
            settings.plane_tol,
            settings.degen_area,
        );
        if frags.len() <= 1 {
            continue;
        }
        let children: Vec<usize> = frags
            .into_iter()
            .map(|[p0, p1, p2]| mesh.add_tri(p0, p1, p2))
            .collect();
        mesh.retire(parent, children);
        any_split = true;
    }

    if any_split {
        mesh.set_state(MeshState::Trimmed);
    }
    mesh.flatten();
}

/// Classify every active triangle against the other mesh. Returns the number
/// of ambiguous silhouette casts.
fn tag_mesh(
    mesh: &mut TMesh,
    other_tris: &[[Point3<f64>; 3]],
    other_bbox: &BoundingBox,
    other_segments: &[[Point3<f64>; 2]],
    settings: &Settings,
) -> usize {
    let snapshot: Vec<(usize, [Point3<f64>; 3], Point3<f64>, nalgebra::Vector3<f64>)> = mesh
        .active()
        .map(|(i, t)| (i, t.points(&mesh.nodes), t.centroid(&mesh.nodes), t.normal))
        .collect();

    let query_bbox = other_bbox.inflated(settings.plane_tol);
    let tags: Vec<(usize, Classification, bool, bool)> = snapshot
        .par_iter()
        .map(|(i, pts, centroid, normal)| {
            let tri_bbox = BoundingBox::from_points(pts.iter());
            // A triangle clear of the other mesh's bounds cannot be inside it.
            if !tri_bbox.overlaps(&query_bbox) {
                return (*i, Classification::Outside, false, false);
            }
            let (c, ambiguous) = classify::classify_fragment(
                centroid,
                normal,
                other_tris,
                settings.plane_tol,
                settings.ray_eps,
            );
            let on_cut = classify::edge_on_any_segment(pts, other_segments, settings.chain_eps);
            (*i, c, ambiguous, on_cut)
        })
        .collect();

    let mut ambiguous_count = 0;
    for (i, c, ambiguous, on_cut) in tags {
        let tri = &mut mesh.tris[i];
        tri.tag = match c {
            Classification::Inside => TriTag::Inside,
            Classification::Outside => TriTag::Outside,
            Classification::Border => TriTag::Unknown,
        };
        tri.border = matches!(c, Classification::Border) || on_cut;
        if ambiguous {
            ambiguous_count += 1;
        }
    }
    ambiguous_count
}

/// Flatten both meshes' surviving triangles into the combined mesh, mesh A
/// first, preserving triangle order.
fn commit(a: &TMesh, b: &TMesh, mode: BoolMode, settings: &Settings) -> TMesh {
    let keep = |tag: TriTag, on_boundary: bool, from_a: bool| -> bool {
        if on_boundary {
            // Coincident skins survive once, from mesh A.
            return from_a;
        }
        match mode {
            BoolMode::Union => tag == TriTag::Outside,
            BoolMode::IntersectionOnly => tag == TriTag::Inside,
            BoolMode::Subtract => {
                if from_a {
                    tag == TriTag::Outside
                } else {
                    tag == TriTag::Inside
                }
            }
        }
    };

    let mut combined = TMesh::new(settings.weld_eps);
    for (mesh, from_a) in [(a, true), (b, false)] {
        for (_, tri) in mesh.active() {
            let on_boundary = tri.tag == TriTag::Unknown && tri.border;
            if keep(tri.tag, on_boundary, from_a) {
                let mut p = tri.points(&mesh.nodes);
                // Subtract keeps mesh B fragments as interior caps; reverse
                // their winding so the result surface is consistently oriented.
                if !from_a && mode == BoolMode::Subtract {
                    p.swap(1, 2);
                }
                let idx = combined.add_tri(p[0], p[1], p[2]);
                combined.tris[idx].tag = tri.tag;
                combined.tris[idx].border = tri.border;
            }
        }
    }
    combined.set_state(MeshState::Flattened);
    combined
}
