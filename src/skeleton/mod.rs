pub(crate) mod genetic;
pub(crate) mod grid;
pub(crate) mod voronoi;

pub use genetic::{GenerationBest, GridParams};

use geo::{Area, Centroid, MultiPolygon};
use serde::Serialize;

use crate::geom::elevation::elevation_at;

/// Closed set of roles a block can take. Assigned once by the orchestrator
/// (or the Voronoi strategy's ranking) and never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockRole {
    Treatment,
    Service,
    Commercial,
    Park,
    Unclassified,
}

/// A polygonal block produced by a skeleton strategy.
#[derive(Debug, Clone)]
pub struct Block {
    pub polygon: MultiPolygon<f64>,
    pub area: f64,
    /// Grid strategy: usable area over nominal cell area. Voronoi: raw area.
    pub quality: f64,
    /// Synthetic terrain height at the block centroid, used only for ranking.
    pub elevation: f64,
    pub role: BlockRole,
}

impl Block {
    pub(crate) fn new(polygon: MultiPolygon<f64>, quality: f64) -> Self {
        let area = polygon.unsigned_area();
        // Degenerate shapes without a centroid rank last (never treatment).
        let elevation = polygon.centroid()
            .map(|p| elevation_at(p.0))
            .unwrap_or(f64::INFINITY);
        Self { polygon, area, quality, elevation, role: BlockRole::Unclassified }
    }
}

/// Split blocks into service and commercial bands by elevation.
///
/// Blocks are ranked by centroid elevation ascending; area is accumulated from
/// the lowest block upward until it reaches 10% of the total — that band is
/// service land (its lowest member is later promoted to the treatment
/// facility by the orchestrator), everything above is commercial.
///
/// Returned service blocks stay sorted ascending by elevation.
pub(crate) fn split_service_commercial(mut blocks: Vec<Block>) -> (Vec<Block>, Vec<Block>) {
    const SERVICE_AREA_SHARE: f64 = 0.10;

    blocks.sort_by(|a, b| a.elevation.total_cmp(&b.elevation));
    let total_area: f64 = blocks.iter().map(|b| b.area).sum();

    let mut service = Vec::new();
    let mut commercial = Vec::new();
    let mut cumulative = 0.0;

    for mut block in blocks {
        if cumulative < SERVICE_AREA_SHARE * total_area {
            cumulative += block.area;
            block.role = BlockRole::Service;
            service.push(block);
        } else {
            block.role = BlockRole::Commercial;
            commercial.push(block);
        }
    }

    (service, commercial)
}
