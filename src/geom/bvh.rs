// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Bounding volume hierarchy used by the intersection broad phase

use super::BoundingBox;

/// BVH node
#[derive(Debug, Clone)]
struct BvhNode {
    bbox: BoundingBox,
    left: Option<Box<BvhNode>>,
    right: Option<Box<BvhNode>>,
    tri_indices: Vec<usize>,
}

impl BvhNode {
    fn leaf(bbox: BoundingBox, tri_indices: Vec<usize>) -> Self {
        Self {
            bbox,
            left: None,
            right: None,
            tri_indices,
        }
    }

    fn internal(bbox: BoundingBox, left: Box<BvhNode>, right: Box<BvhNode>) -> Self {
        Self {
            bbox,
            left: Some(left),
            right: Some(right),
            tri_indices: Vec::new(),
        }
    }

    fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }
}

/// Median-split hierarchy over per-triangle bounding boxes.
pub struct Bvh {
    root: BvhNode,
}

impl Bvh {
    /// Build from (triangle index, bounding box) pairs.
    pub fn build(tris: Vec<(usize, BoundingBox)>) -> Self {
        if tris.is_empty() {
            return Self {
                root: BvhNode::leaf(BoundingBox::empty(), Vec::new()),
            };
        }
        Self {
            root: Self::build_recursive(tris, 0),
        }
    }

    fn build_recursive(mut tris: Vec<(usize, BoundingBox)>, depth: usize) -> BvhNode {
        const MAX_DEPTH: usize = 32;
        const MIN_TRIS: usize = 4;

        if tris.len() <= MIN_TRIS || depth >= MAX_DEPTH {
            let bbox = Self::union_of(&tris);
            let indices: Vec<usize> = tris.iter().map(|(i, _)| *i).collect();
            return BvhNode::leaf(bbox, indices);
        }

        let bbox = Self::union_of(&tris);
        let size = bbox.size();
        let axis = if size.x >= size.y && size.x >= size.z {
            0
        } else if size.y >= size.z {
            1
        } else {
            2
        };

        tris.sort_by(|(_, a), (_, b)| {
            let ca = a.center();
            let cb = b.center();
            let (ka, kb) = match axis {
                0 => (ca.x, cb.x),
                1 => (ca.y, cb.y),
                _ => (ca.z, cb.z),
            };
            ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal)
        });

        let mid = tris.len() / 2;
        let right_tris = tris.split_off(mid);
        let left = Box::new(Self::build_recursive(tris, depth + 1));
        let right = Box::new(Self::build_recursive(right_tris, depth + 1));
        let bbox = left.bbox.union(&right.bbox);
        BvhNode::internal(bbox, left, right)
    }

    fn union_of(tris: &[(usize, BoundingBox)]) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for (_, b) in tris {
            bbox = bbox.union(b);
        }
        bbox
    }

    /// Indices of triangles whose bounds overlap the query box.
    pub fn query(&self, bbox: &BoundingBox) -> Vec<usize> {
        let mut out = Vec::new();
        Self::query_recursive(&self.root, bbox, &mut out);
        out
    }

    fn query_recursive(node: &BvhNode, bbox: &BoundingBox, out: &mut Vec<usize>) {
        if !node.bbox.overlaps(bbox) {
            return;
        }
        if node.is_leaf() {
            out.extend_from_slice(&node.tri_indices);
        } else {
            if let Some(ref left) = node.left {
                Self::query_recursive(left, bbox, out);
            }
            if let Some(ref right) = node.right {
                Self::query_recursive(right, bbox, out);
            }
        }
    }
}
