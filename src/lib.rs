// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Aeromesh kernel
//!
//! A triangulated-surface kernel for vehicle analysis: boolean
//! intersection/trim of independently authored meshes, planar and conical
//! slicing for area-rule work, watertightness audit and repair, and
//! mass-property integration. Cross-section curves lofted along an axis
//! provide the initial geometry; the triangle-soup exchange structure is the
//! interface to file-format adapters.

pub mod error;
pub mod geom;
pub mod intersect;
pub mod massprop;
pub mod report;
pub mod settings;
pub mod slice;
pub mod soup;
pub mod watertight;
pub mod xsec;

pub use error::MeshError;
pub use geom::{BoundingBox, MeshState, NodeStore, TMesh, Tri, TriTag};
pub use intersect::{intersect, BoolMode};
pub use massprop::{integrate, Density, MassModel, MassProp, PointMass};
pub use report::{Notice, Reporter, Severity};
pub use settings::Settings;
pub use slice::{slice, Slice, SliceParams, SliceStyle};
pub use soup::TriSoup;
pub use watertight::{audit_and_repair, is_watertight, MeshInfo};
pub use xsec::{loft, XSec, XSecCurve};
