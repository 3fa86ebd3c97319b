//! Pipeline orchestration: site assembly, road skeleton with strategy
//! fallback, block classification, lot subdivision, and utility planning.
//!
//! Stages run strictly forward; each consumes the previous stage's output and
//! produces new values. The only fatal failures are malformed input and
//! invalid configuration — everything downstream degrades (strategy fallback,
//! solver fallback, largest-component restriction) and is surfaced through
//! the report diagnostics.

use std::time::Duration;

use geo::{BooleanOps, Centroid, MultiPolygon};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};

use crate::config::PlanConfig;
use crate::error::PlanError;
use crate::geom::{exterior_rings, polygon_from_ring, ring_coords, union_all};
use crate::infra::{build_network, Asset, AssetRole};
use crate::report::{
    AssetRecord, BlockRecord, DrainageRecord, InfrastructureReport, LotRecord, PlanReport,
    SkeletonReport, Strategy, SubdivisionReport,
};
use crate::skeleton::voronoi::{self, RoadStyle};
use crate::skeleton::{genetic, grid, split_service_commercial, Block, BlockRole, GenerationBest};
use crate::subdivision::{subdivide_block, LotConfig, SubdividedBlock};

/// Floor for the heuristic park-gate spacing on the Voronoi path, metres.
const MIN_HEURISTIC_SPACING: f64 = 20.0;

/// Road skeleton stage output, shared by both strategies.
struct Skeleton {
    strategy: Strategy,
    fallback_reason: Option<String>,
    spacing: Option<f64>,
    angle: Option<f64>,
    history: Vec<GenerationBest>,
    road_polygon: Option<MultiPolygon<f64>>,
    treatment: Option<Block>,
    service: Vec<Block>,
    commercial: Vec<Block>,
}

/// Run the full pipeline over boundary rings and an optional water exclusion.
///
/// A pure function of (rings, config): the configured seed drives every
/// stochastic stage.
pub fn run(
    config: &PlanConfig,
    boundaries: &[Vec<[f64; 2]>],
    exclusion: &[Vec<[f64; 2]>],
) -> Result<PlanReport, PlanError> {
    config.validate()?;
    if boundaries.is_empty() {
        return Err(PlanError::EmptyInput);
    }
    // Exclusion rings continue the boundary index space in error reports.
    validate_rings(boundaries, 0)?;
    validate_rings(exclusion, boundaries.len())?;

    let land = union_all(boundaries.iter().map(|r| polygon_from_ring(r)).collect());
    let water = union_all(exclusion.iter().map(|r| polygon_from_ring(r)).collect());
    let water = (!water.0.is_empty()).then_some(water);
    let site = match &water {
        Some(water) => land.difference(water),
        None => land.clone(),
    };
    info!(
        boundaries = boundaries.len(),
        exclusions = exclusion.len(),
        "site assembled"
    );

    let skeleton = build_skeleton(config, &land, water.as_ref(), &site);
    info!(
        strategy = ?skeleton.strategy,
        commercial = skeleton.commercial.len(),
        service = skeleton.service.len(),
        "road skeleton complete"
    );

    // Park gate spacing: the optimized grid spacing, or a heuristic derived
    // from the mean commercial block area on the Voronoi path.
    let gate_spacing = skeleton.spacing.unwrap_or_else(|| {
        heuristic_spacing(&skeleton.commercial)
    });

    let lot_config = LotConfig {
        min_width: config.lot_width_min,
        max_width: config.lot_width_max,
        target_width: config.lot_width_target,
        setback: config.setback,
        time_limit: Duration::from_millis(config.solver_time_limit_ms),
    };

    let mut lots = Vec::new();
    let mut parks = Vec::new();
    for block in &skeleton.commercial {
        match subdivide_block(block, gate_spacing, &lot_config) {
            SubdividedBlock::Park(polygon) => parks.push(polygon),
            SubdividedBlock::Lots(block_lots) => lots.extend(block_lots),
        }
    }
    info!(lots = lots.len(), parks = parks.len(), "subdivision complete");

    // Assets: lot centroids, service blocks, and the treatment facility.
    // Roads never become assets.
    let mut assets = Vec::new();
    for lot in &lots {
        if let Some(centroid) = lot.polygon.centroid() {
            assets.push(Asset { centroid: centroid.0, role: AssetRole::Lot });
        }
    }
    for block in &skeleton.service {
        if let Some(centroid) = block.polygon.centroid() {
            assets.push(Asset { centroid: centroid.0, role: AssetRole::Service });
        }
    }
    if let Some(block) = &skeleton.treatment {
        if let Some(centroid) = block.polygon.centroid() {
            assets.push(Asset { centroid: centroid.0, role: AssetRole::Treatment });
        }
    }

    let network = build_network(
        &assets,
        config.max_edge_distance,
        config.redundancy_ratio,
        config.seed,
    );
    info!(
        edges = network.edges.len(),
        transformers = network.transformers.len(),
        unreachable = network.unreachable_assets,
        "utility network complete"
    );

    Ok(assemble_report(skeleton, lots, parks, assets, network))
}

fn validate_rings(rings: &[Vec<[f64; 2]>], offset: usize) -> Result<(), PlanError> {
    for (index, ring) in rings.iter().enumerate() {
        if ring.len() < 3 {
            return Err(PlanError::InvalidBoundary {
                index: offset + index,
                points: ring.len(),
            });
        }
    }
    Ok(())
}

/// Try the Voronoi strategy, fall back to the genetic grid search on failure
/// or when no commercial land comes out of the classification.
fn build_skeleton(
    config: &PlanConfig,
    land: &MultiPolygon<f64>,
    water: Option<&MultiPolygon<f64>>,
    site: &MultiPolygon<f64>,
) -> Skeleton {
    let style = RoadStyle {
        main_width: config.main_road_width,
        internal_width: config.internal_road_width,
        sidewalk_width: config.sidewalk_width,
        turning_radius: config.turning_radius,
        min_block_area: config.min_block_area,
    };
    let mut rng = StdRng::seed_from_u64(config.seed);

    let fallback_reason = match voronoi::generate(site, config.voronoi_seeds, &style, &mut rng) {
        Ok(network) if !network.commercial_blocks.is_empty() => {
            let (treatment, service) = promote_treatment(network.service_blocks);
            return Skeleton {
                strategy: Strategy::Voronoi,
                fallback_reason: None,
                spacing: None,
                angle: None,
                history: Vec::new(),
                road_polygon: Some(network.road_polygon),
                treatment,
                service,
                commercial: network.commercial_blocks,
            };
        }
        Ok(_) => "no commercial blocks after classification".to_string(),
        Err(reason) => reason.to_string(),
    };
    warn!(reason = %fallback_reason, "voronoi strategy abandoned; falling back to grid search");

    let (best, history) = genetic::optimize(
        &genetic::GeneticConfig {
            spacing_bounds: (config.spacing_min, config.spacing_max),
            angle_bounds: (config.rotation_min, config.rotation_max),
            population_size: config.population_size,
            generations: config.generations,
            seed: config.seed,
        },
        land,
        water,
    );

    // Materialize blocks from the winning candidate.
    let evaluation = grid::evaluate(land, water, best.spacing, best.angle);
    let blocks: Vec<Block> = evaluation.cells.into_iter()
        .map(|cell| Block::new(cell.usable, cell.ratio))
        .collect();
    let (service, commercial) = split_service_commercial(blocks);
    let (treatment, service) = promote_treatment(service);

    Skeleton {
        strategy: Strategy::Grid,
        fallback_reason: Some(fallback_reason),
        spacing: Some(best.spacing),
        angle: Some(best.angle),
        history,
        road_polygon: None,
        treatment,
        service,
        commercial,
    }
}

/// The lowest service block becomes the treatment facility. Relies on the
/// classification returning service blocks sorted ascending by elevation.
fn promote_treatment(mut service: Vec<Block>) -> (Option<Block>, Vec<Block>) {
    if service.is_empty() {
        return (None, service);
    }
    let mut treatment = service.remove(0);
    treatment.role = BlockRole::Treatment;
    (Some(treatment), service)
}

/// Heuristic park-gate spacing for organically shaped blocks.
fn heuristic_spacing(commercial: &[Block]) -> f64 {
    if commercial.is_empty() {
        return MIN_HEURISTIC_SPACING;
    }
    let mean_area: f64 = commercial.iter().map(|b| b.area).sum::<f64>() / commercial.len() as f64;
    (0.7 * mean_area.sqrt()).max(MIN_HEURISTIC_SPACING)
}

fn assemble_report(
    skeleton: Skeleton,
    lots: Vec<crate::subdivision::Lot>,
    parks: Vec<MultiPolygon<f64>>,
    assets: Vec<Asset>,
    network: crate::infra::UtilityNetwork,
) -> PlanReport {
    let block_records = skeleton.treatment.iter()
        .chain(&skeleton.service)
        .chain(&skeleton.commercial)
        .map(|block| BlockRecord {
            rings: exterior_rings(&block.polygon),
            role: block.role,
            area: block.area,
            elevation: block.elevation,
        })
        .collect();

    let lot_count = lots.len();
    let average_width = if lot_count == 0 {
        0.0
    } else {
        lots.iter().map(|l| l.width).sum::<f64>() / lot_count as f64
    };
    let lot_records = lots.into_iter()
        .map(|lot| LotRecord {
            width: lot.width,
            rings: exterior_rings(&lot.polygon),
            footprint: lot.footprint.as_ref().map(exterior_rings),
        })
        .collect();
    let park_rings = parks.iter()
        .flat_map(|park| park.0.iter().map(|poly| ring_coords(poly.exterior())))
        .collect();

    let asset_records = assets.iter()
        .map(|asset| AssetRecord {
            position: [asset.centroid.x, asset.centroid.y],
            role: asset.role,
        })
        .collect();
    let edge_records = network.edges.iter()
        .map(|edge| {
            let a = assets[edge.a].centroid;
            let b = assets[edge.b].centroid;
            [[a.x, a.y], [b.x, b.y]]
        })
        .collect();
    let drainage_records = network.drainage.iter()
        .map(|d| DrainageRecord {
            start: [d.start.x, d.start.y],
            direction: [d.direction.x, d.direction.y],
        })
        .collect();
    let road_rings = skeleton.road_polygon.as_ref()
        .map(exterior_rings)
        .unwrap_or_default();

    PlanReport {
        skeleton: SkeletonReport {
            strategy: skeleton.strategy,
            fallback_reason: skeleton.fallback_reason,
            spacing: skeleton.spacing,
            angle: skeleton.angle,
            history: skeleton.history,
            blocks: block_records,
        },
        subdivision: SubdivisionReport {
            lots: lot_records,
            parks: park_rings,
            lot_count,
            average_width,
        },
        infrastructure: InfrastructureReport {
            assets: asset_records,
            edges: edge_records,
            transformers: network.transformers.iter().map(|c| [c.x, c.y]).collect(),
            drainage: drainage_records,
            road_rings,
            unreachable_assets: network.unreachable_assets,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::rect_polygon;

    #[test]
    fn empty_boundaries_are_fatal() {
        let result = run(&PlanConfig::default(), &[], &[]);
        assert!(matches!(result, Err(PlanError::EmptyInput)));
    }

    #[test]
    fn short_rings_are_fatal_with_their_index() {
        let good = vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        let bad = vec![[0.0, 0.0], [1.0, 1.0]];

        let result = run(&PlanConfig::default(), &[good.clone(), bad.clone()], &[]);
        assert!(matches!(
            result,
            Err(PlanError::InvalidBoundary { index: 1, points: 2 })
        ));

        // Exclusion rings continue the index space.
        let result = run(&PlanConfig::default(), &[good], &[bad]);
        assert!(matches!(
            result,
            Err(PlanError::InvalidBoundary { index: 1, points: 2 })
        ));
    }

    #[test]
    fn invalid_config_is_rejected_before_any_stage() {
        let mut config = PlanConfig::default();
        config.redundancy_ratio = 2.0;
        let ring = vec![[0.0, 0.0], [100.0, 0.0], [100.0, 100.0], [0.0, 100.0]];
        assert!(matches!(
            run(&config, &[ring], &[]),
            Err(PlanError::InvalidConfig(_))
        ));
    }

    #[test]
    fn heuristic_spacing_has_a_floor() {
        // Mean area 400 gives 0.7 * 20 = 14, clamped up to 20.
        let small = vec![Block::new(
            geo::MultiPolygon(vec![rect_polygon(0.0, 0.0, 20.0, 20.0)]),
            1.0,
        )];
        assert_eq!(heuristic_spacing(&small), 20.0);

        // Mean area 10000 gives 0.7 * 100 = 70.
        let large = vec![Block::new(
            geo::MultiPolygon(vec![rect_polygon(0.0, 0.0, 100.0, 100.0)]),
            1.0,
        )];
        assert!((heuristic_spacing(&large) - 70.0).abs() < 1e-9);
        assert_eq!(heuristic_spacing(&[]), 20.0);
    }

    #[test]
    fn promoted_treatment_is_the_lowest_service_block() {
        let blocks: Vec<Block> = (0..3)
            .map(|i| Block::new(
                geo::MultiPolygon(vec![rect_polygon(i as f64 * 50.0, 0.0, i as f64 * 50.0 + 10.0, 10.0)]),
                1.0,
            ))
            .collect();
        let lowest = blocks[0].elevation;
        let mut sorted = blocks;
        sorted.sort_by(|a, b| a.elevation.total_cmp(&b.elevation));

        let (treatment, rest) = promote_treatment(sorted);
        let treatment = treatment.unwrap();
        assert_eq!(treatment.role, BlockRole::Treatment);
        assert_eq!(treatment.elevation, lowest);
        assert_eq!(rest.len(), 2);
    }
}
