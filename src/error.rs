// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Error taxonomy for the mesh kernel

use thiserror::Error;

/// Structural failures that abort the requested operation.
///
/// Geometric ambiguities are not errors; they are resolved by tolerance
/// tie-breaks and surfaced through the [`crate::report::Reporter`].
#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh contains no triangles")]
    EmptyMesh,

    #[error("non-finite coordinate at node {0}")]
    NonFiniteCoordinate(usize),

    #[error("triangle {tri} references node {node} outside store of {len}")]
    InvalidNodeIndex { tri: usize, node: usize, len: usize },

    #[error("operation requires a flattened mesh with no pending splits")]
    PendingSplits,

    #[error("density must be finite and non-negative (got {0})")]
    InvalidDensity(f64),

    #[error("point mass must be finite (mass {0})")]
    InvalidPointMass(f64),

    #[error("unsupported configuration: {0}")]
    UnsupportedConfig(String),
}
