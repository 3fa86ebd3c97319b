use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// All named, bounded parameters for one pipeline run.
///
/// Every invocation of the pipeline is a pure function of (site polygons,
/// config); there is no process-global state, and the random `seed` makes the
/// genetic search, the Voronoi scatter, and the clustering reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlanConfig {
    /// Grid spacing bounds for the genetic search, metres.
    #[serde(default = "PlanConfig::default_spacing_min")]
    pub spacing_min: f64,
    #[serde(default = "PlanConfig::default_spacing_max")]
    pub spacing_max: f64,

    /// Grid rotation bounds, degrees.
    #[serde(default = "PlanConfig::default_rotation_min")]
    pub rotation_min: f64,
    #[serde(default = "PlanConfig::default_rotation_max")]
    pub rotation_max: f64,

    /// Lot width bounds and preferred width, metres.
    #[serde(default = "PlanConfig::default_lot_width_min")]
    pub lot_width_min: f64,
    #[serde(default = "PlanConfig::default_lot_width_target")]
    pub lot_width_target: f64,
    #[serde(default = "PlanConfig::default_lot_width_max")]
    pub lot_width_max: f64,

    /// Inward erosion applied to each lot to derive its buildable footprint.
    #[serde(default = "PlanConfig::default_setback")]
    pub setback: f64,

    /// Genetic search population size and generation count.
    #[serde(default = "PlanConfig::default_population_size")]
    pub population_size: usize,
    #[serde(default = "PlanConfig::default_generations")]
    pub generations: usize,

    /// Per-block budget for the width solver, milliseconds.
    #[serde(default = "PlanConfig::default_solver_time_limit_ms")]
    pub solver_time_limit_ms: u64,

    /// Fraction of extra non-tree edges added to the utility MST.
    #[serde(default = "PlanConfig::default_redundancy_ratio")]
    pub redundancy_ratio: f64,

    /// Seed points scattered for the Voronoi road strategy.
    #[serde(default = "PlanConfig::default_voronoi_seeds")]
    pub voronoi_seeds: usize,

    /// Maximum centroid distance for candidate utility edges, metres.
    #[serde(default = "PlanConfig::default_max_edge_distance")]
    pub max_edge_distance: f64,

    /// Road cross-section parameters, metres.
    #[serde(default = "PlanConfig::default_main_road_width")]
    pub main_road_width: f64,
    #[serde(default = "PlanConfig::default_internal_road_width")]
    pub internal_road_width: f64,
    #[serde(default = "PlanConfig::default_sidewalk_width")]
    pub sidewalk_width: f64,

    /// Dilate-then-erode radius used to round road junctions.
    #[serde(default = "PlanConfig::default_turning_radius")]
    pub turning_radius: f64,

    /// Blocks below this area are discarded by the Voronoi strategy, m².
    #[serde(default = "PlanConfig::default_min_block_area")]
    pub min_block_area: f64,

    /// Random seed shared by every stochastic stage.
    #[serde(default = "PlanConfig::default_seed")]
    pub seed: u64,
}

impl PlanConfig {
    const fn default_spacing_min() -> f64 { 20.0 }
    const fn default_spacing_max() -> f64 { 40.0 }
    const fn default_rotation_min() -> f64 { 0.0 }
    const fn default_rotation_max() -> f64 { 90.0 }
    const fn default_lot_width_min() -> f64 { 5.0 }
    const fn default_lot_width_target() -> f64 { 6.0 }
    const fn default_lot_width_max() -> f64 { 8.0 }
    const fn default_setback() -> f64 { 1.5 }
    const fn default_population_size() -> usize { 24 }
    const fn default_generations() -> usize { 20 }
    const fn default_solver_time_limit_ms() -> u64 { 500 }
    const fn default_redundancy_ratio() -> f64 { 0.15 }
    const fn default_voronoi_seeds() -> usize { 30 }
    const fn default_max_edge_distance() -> f64 { 150.0 }
    const fn default_main_road_width() -> f64 { 12.0 }
    const fn default_internal_road_width() -> f64 { 7.0 }
    const fn default_sidewalk_width() -> f64 { 2.0 }
    const fn default_turning_radius() -> f64 { 4.0 }
    const fn default_min_block_area() -> f64 { 400.0 }
    const fn default_seed() -> u64 { 42 }

    /// Check parameter bounds up front, before any stage runs.
    pub fn validate(&self) -> Result<(), PlanError> {
        let fail = |msg: &str| Err(PlanError::InvalidConfig(msg.to_string()));

        if !(self.spacing_min > 0.0 && self.spacing_min <= self.spacing_max) {
            return fail("spacing bounds must satisfy 0 < spacing_min <= spacing_max");
        }
        if self.rotation_min > self.rotation_max {
            return fail("rotation bounds must satisfy rotation_min <= rotation_max");
        }
        if !(self.lot_width_min > 0.0
            && self.lot_width_min <= self.lot_width_target
            && self.lot_width_target <= self.lot_width_max)
        {
            return fail("lot widths must satisfy 0 < min <= target <= max");
        }
        if self.setback < 0.0 {
            return fail("setback must be non-negative");
        }
        if self.population_size < 2 {
            return fail("population_size must be at least 2");
        }
        if !(0.0..=1.0).contains(&self.redundancy_ratio) {
            return fail("redundancy_ratio must lie in [0, 1]");
        }
        if self.voronoi_seeds < 3 {
            return fail("voronoi_seeds must be at least 3");
        }
        if self.max_edge_distance <= 0.0 {
            return fail("max_edge_distance must be positive");
        }
        Ok(())
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        // serde_json round-trip of `{}` would give the same result; spelled out
        // so `Default` works without a serde dependency at the call site.
        Self {
            spacing_min: Self::default_spacing_min(),
            spacing_max: Self::default_spacing_max(),
            rotation_min: Self::default_rotation_min(),
            rotation_max: Self::default_rotation_max(),
            lot_width_min: Self::default_lot_width_min(),
            lot_width_target: Self::default_lot_width_target(),
            lot_width_max: Self::default_lot_width_max(),
            setback: Self::default_setback(),
            population_size: Self::default_population_size(),
            generations: Self::default_generations(),
            solver_time_limit_ms: Self::default_solver_time_limit_ms(),
            redundancy_ratio: Self::default_redundancy_ratio(),
            voronoi_seeds: Self::default_voronoi_seeds(),
            max_edge_distance: Self::default_max_edge_distance(),
            main_road_width: Self::default_main_road_width(),
            internal_road_width: Self::default_internal_road_width(),
            sidewalk_width: Self::default_sidewalk_width(),
            turning_radius: Self::default_turning_radius(),
            min_block_area: Self::default_min_block_area(),
            seed: Self::default_seed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PlanConfig::default().validate().is_ok());
    }

    #[test]
    fn inverted_lot_widths_are_rejected() {
        let mut config = PlanConfig::default();
        config.lot_width_min = 9.0; // above max
        assert!(matches!(config.validate(), Err(PlanError::InvalidConfig(_))));
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: PlanConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.population_size, 24);
        assert_eq!(config.seed, 42);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<PlanConfig>("{\"bogus\": 1}").is_err());
    }
}
