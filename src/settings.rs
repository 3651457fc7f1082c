// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Aeromesh Team

//! Tolerance and configuration bundle passed into each engine call

use serde::{Deserialize, Serialize};

/// Descriptor for one named, bounded scalar setting.
///
/// A host parameter framework persists settings by name; the bounds here are
/// the documented legal range for each knob.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ParamBound {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

/// Tolerances and thresholds shared by the intersection, slicing, repair, and
/// mass-property engines.
///
/// Passed explicitly into each call rather than read from process-wide state,
/// so isolated runs never interfere.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Settings {
    /// Two nodes closer than this are the same node during dedup passes.
    pub weld_eps: f64,
    /// Near-coincident plane tolerance for the intersection broad phase.
    pub plane_tol: f64,
    /// Triangles with area below this are degenerate and eligible for removal.
    pub degen_area: f64,
    /// Endpoint matching distance when chaining slice segments into loops.
    pub chain_eps: f64,
    /// Minimum ray parameter for crossing counts during classification.
    pub ray_eps: f64,
}

const BOUNDS: [ParamBound; 5] = [
    ParamBound {
        name: "weld_eps",
        min: 1e-12,
        max: 1e-2,
    },
    ParamBound {
        name: "plane_tol",
        min: 1e-12,
        max: 1e-2,
    },
    ParamBound {
        name: "degen_area",
        min: 0.0,
        max: 1e-3,
    },
    ParamBound {
        name: "chain_eps",
        min: 1e-12,
        max: 1e-2,
    },
    ParamBound {
        name: "ray_eps",
        min: 1e-15,
        max: 1e-6,
    },
];

impl Settings {
    /// Documented bounds for every setting, in field order.
    pub fn bounds() -> &'static [ParamBound] {
        &BOUNDS
    }

    /// Clamp every field into its documented range.
    pub fn clamped(self) -> Self {
        Self {
            weld_eps: self.weld_eps.clamp(BOUNDS[0].min, BOUNDS[0].max),
            plane_tol: self.plane_tol.clamp(BOUNDS[1].min, BOUNDS[1].max),
            degen_area: self.degen_area.clamp(BOUNDS[2].min, BOUNDS[2].max),
            chain_eps: self.chain_eps.clamp(BOUNDS[3].min, BOUNDS[3].max),
            ray_eps: self.ray_eps.clamp(BOUNDS[4].min, BOUNDS[4].max),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            weld_eps: 1e-8,
            plane_tol: 1e-7,
            degen_area: 1e-10,
            chain_eps: 1e-6,
            ray_eps: 1e-9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_within_bounds() {
        let s = Settings::default();
        let c = s.clamped();
        assert_eq!(s.weld_eps, c.weld_eps);
        assert_eq!(s.degen_area, c.degen_area);
    }

    #[test]
    fn test_clamp_out_of_range() {
        let s = Settings {
            weld_eps: 1.0,
            ..Settings::default()
        }
        .clamped();
        assert_eq!(s.weld_eps, 1e-2);
    }

    #[test]
    fn test_serde_round_trip() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(s.weld_eps, back.weld_eps);
        assert_eq!(s.chain_eps, back.chain_eps);
    }
}
