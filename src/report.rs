//! Serializable output record for one pipeline run.
//!
//! Geometry is flattened to plain `[x, y]` sequences so consumers of the JSON
//! report never depend on geometry library types.

use serde::Serialize;

use crate::infra::AssetRole;
use crate::skeleton::{BlockRole, GenerationBest};

/// Which road-skeleton strategy produced the final layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Voronoi,
    Grid,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub skeleton: SkeletonReport,
    pub subdivision: SubdivisionReport,
    pub infrastructure: InfrastructureReport,
}

/// Road skeleton stage: blocks, chosen grid parameters (grid strategy only),
/// search history, and the fallback diagnostic when the Voronoi strategy was
/// abandoned.
#[derive(Debug, Clone, Serialize)]
pub struct SkeletonReport {
    pub strategy: Strategy,
    /// Why the Voronoi strategy was abandoned; `None` when it succeeded or
    /// was never attempted against a grid-only configuration.
    pub fallback_reason: Option<String>,
    pub spacing: Option<f64>,
    pub angle: Option<f64>,
    pub history: Vec<GenerationBest>,
    pub blocks: Vec<BlockRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlockRecord {
    pub rings: Vec<Vec<[f64; 2]>>,
    pub role: BlockRole,
    pub area: f64,
    pub elevation: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionReport {
    pub lots: Vec<LotRecord>,
    pub parks: Vec<Vec<[f64; 2]>>,
    pub lot_count: usize,
    pub average_width: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LotRecord {
    pub width: f64,
    pub rings: Vec<Vec<[f64; 2]>>,
    /// Setback-eroded buildable shape; absent when the erosion emptied it.
    pub footprint: Option<Vec<Vec<[f64; 2]>>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InfrastructureReport {
    pub assets: Vec<AssetRecord>,
    /// Utility edges as endpoint coordinate pairs, tree edges first.
    pub edges: Vec<[[f64; 2]; 2]>,
    pub transformers: Vec<[f64; 2]>,
    pub drainage: Vec<DrainageRecord>,
    pub road_rings: Vec<Vec<[f64; 2]>>,
    pub unreachable_assets: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetRecord {
    pub position: [f64; 2],
    pub role: AssetRole,
}

#[derive(Debug, Clone, Serialize)]
pub struct DrainageRecord {
    pub start: [f64; 2],
    pub direction: [f64; 2],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_to_nested_json() {
        let report = PlanReport {
            skeleton: SkeletonReport {
                strategy: Strategy::Grid,
                fallback_reason: Some("no road line network produced".into()),
                spacing: Some(25.0),
                angle: Some(15.0),
                history: Vec::new(),
                blocks: vec![BlockRecord {
                    rings: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]],
                    role: BlockRole::Commercial,
                    area: 0.5,
                    elevation: 30.0,
                }],
            },
            subdivision: SubdivisionReport {
                lots: Vec::new(),
                parks: Vec::new(),
                lot_count: 0,
                average_width: 0.0,
            },
            infrastructure: InfrastructureReport {
                assets: vec![AssetRecord { position: [1.0, 2.0], role: AssetRole::Treatment }],
                edges: Vec::new(),
                transformers: Vec::new(),
                drainage: Vec::new(),
                road_rings: Vec::new(),
                unreachable_assets: 0,
            },
        };

        let json: serde_json::Value = serde_json::to_value(&report).unwrap();
        assert_eq!(json["skeleton"]["strategy"], "grid");
        assert_eq!(json["skeleton"]["blocks"][0]["role"], "commercial");
        assert_eq!(json["infrastructure"]["assets"][0]["role"], "treatment");
        assert_eq!(json["infrastructure"]["assets"][0]["position"][1], 2.0);
    }
}
