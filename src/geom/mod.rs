// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Mesh data model: node store, triangle primitive, surface mesh, spatial
//! acceleration

mod bbox;
mod bvh;
mod node;
pub mod primitives;
mod tmesh;
mod tri;

pub use bbox::BoundingBox;
pub use bvh::Bvh;
pub use node::{back_refs, NodeStore};
pub use tmesh::{MeshState, TMesh};
pub use tri::{Tri, TriTag};
