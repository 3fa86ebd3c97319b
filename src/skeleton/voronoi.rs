//! Organic road layout from a Voronoi partition of scattered seeds.
//!
//! Seeds are scattered uniformly over the site bounding box and triangulated;
//! each seed's Voronoi cell is rebuilt from the circumcenters of its adjacent
//! Delaunay faces. Cell boundary edges become the road centerlines, which are
//! buffered by road class, unioned, and smoothed with a dilate-then-erode
//! pass so junctions respect a vehicle turning clearance.

use ahash::AHashMap;
use geo::{Area, BooleanOps, BoundingRect, Centroid, Coord, LineString, MultiLineString,
    MultiPolygon, Point};
use rand::{rngs::StdRng, Rng};
use spade::{DelaunayTriangulation, Point2, Triangulation};
use tracing::debug;

use crate::error::RoadGenFailure;
use crate::geom::{dilate, dist, erode, midpoint, segment_buffer, union_all};
use crate::skeleton::{split_service_commercial, Block};

/// A segment this close to the site centroid is a main road.
const MAIN_CENTER_DISTANCE: f64 = 100.0;
/// A segment longer than this is a main road regardless of position.
const MAIN_MIN_LENGTH: f64 = 400.0;

/// Road cross-section and block filtering parameters.
#[derive(Debug, Clone, Copy)]
pub(crate) struct RoadStyle {
    pub main_width: f64,
    pub internal_width: f64,
    pub sidewalk_width: f64,
    pub turning_radius: f64,
    pub min_block_area: f64,
}

/// Successful output of the Voronoi strategy. The lowest service block is
/// promoted to the treatment facility by the orchestrator, not here.
#[derive(Debug, Clone)]
pub(crate) struct RoadNetwork {
    pub road_polygon: MultiPolygon<f64>,
    pub service_blocks: Vec<Block>,
    pub commercial_blocks: Vec<Block>,
}

/// Generate an organic road network over the site.
pub(crate) fn generate(
    site: &MultiPolygon<f64>,
    seed_count: usize,
    style: &RoadStyle,
    rng: &mut StdRng,
) -> Result<RoadNetwork, RoadGenFailure> {
    let bounds = site.bounding_rect().ok_or(RoadGenFailure::Construction)?;
    if bounds.width() < 1e-9 || bounds.height() < 1e-9 {
        return Err(RoadGenFailure::Construction);
    }

    // Scatter seeds and triangulate.
    let mut triangulation: DelaunayTriangulation<Point2<f64>> = DelaunayTriangulation::new();
    for _ in 0..seed_count {
        let x = rng.random_range(bounds.min().x..bounds.max().x);
        let y = rng.random_range(bounds.min().y..bounds.max().y);
        triangulation.insert(Point2::new(x, y)).map_err(|_| RoadGenFailure::Construction)?;
    }
    if triangulation.num_vertices() < 3 {
        return Err(RoadGenFailure::Construction);
    }

    // Collect deduplicated Voronoi cell boundary segments.
    let mut segments: AHashMap<(i64, i64, i64, i64), (Coord<f64>, Coord<f64>)> = AHashMap::new();
    for vertex in triangulation.vertices() {
        let cell = cell_circumcenters(vertex);
        if cell.len() < 2 { continue }
        for k in 0..cell.len() {
            let a = cell[k];
            let b = cell[(k + 1) % cell.len()];
            if dist(a, b) < 1e-6 { continue }
            segments.entry(segment_key(a, b)).or_insert((a, b));
        }
    }
    if segments.is_empty() {
        return Err(RoadGenFailure::EmptyLineNetwork);
    }

    // Keep only the portions of the line network inside the site. Hash order
    // is not stable across runs, so sort by key to keep the run reproducible.
    let mut ordered: Vec<_> = segments.into_iter().collect();
    ordered.sort_by_key(|(key, _)| *key);
    let network = MultiLineString(
        ordered.into_iter()
            .map(|(_, (a, b))| LineString(vec![a, b]))
            .collect(),
    );
    let clipped = site.clip(&network, false);

    let site_centroid = site.centroid().unwrap_or_else(|| Point::new(bounds.center().x, bounds.center().y));
    let main_half = (style.main_width + 2.0 * style.sidewalk_width) / 2.0;
    let internal_half = style.internal_width / 2.0;

    // Buffer each segment by its class half-width (squared caps).
    let mut corridors = Vec::new();
    for line in &clipped.0 {
        for pair in line.0.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            let length = dist(a, b);
            let is_main = dist(midpoint(a, b), site_centroid.0) < MAIN_CENTER_DISTANCE
                || length > MAIN_MIN_LENGTH;
            let half = if is_main { main_half } else { internal_half };
            if let Some(rect) = segment_buffer(a, b, half) {
                corridors.push(rect);
            }
        }
    }
    if corridors.is_empty() {
        return Err(RoadGenFailure::EmptyLineNetwork);
    }

    let road_union = union_all(corridors);

    // Round sharp junctions: dilate then erode by the turning radius.
    let dilated = dilate(&road_union, style.turning_radius);
    let road_polygon = erode(&dilated, style.turning_radius).unwrap_or(road_union);

    // Blocks are what remains of the site after the roads are carved out.
    let blocks: Vec<Block> = site.difference(&road_polygon).0
        .into_iter()
        .map(|poly| {
            let mp = MultiPolygon(vec![poly]);
            let area = mp.unsigned_area();
            Block::new(mp, area)
        })
        .filter(|block| block.area >= style.min_block_area)
        .collect();

    if blocks.is_empty() {
        return Err(RoadGenFailure::NoBlocks);
    }
    debug!(blocks = blocks.len(), "voronoi strategy produced block set");

    let (service_blocks, commercial_blocks) = split_service_commercial(blocks);
    Ok(RoadNetwork { road_polygon, service_blocks, commercial_blocks })
}

/// Stable key for an undirected segment, rounded to millimetres.
fn segment_key(a: Coord<f64>, b: Coord<f64>) -> (i64, i64, i64, i64) {
    let pa = ((a.x * 1e3).round() as i64, (a.y * 1e3).round() as i64);
    let pb = ((b.x * 1e3).round() as i64, (b.y * 1e3).round() as i64);
    if pa <= pb { (pa.0, pa.1, pb.0, pb.1) } else { (pb.0, pb.1, pa.0, pa.1) }
}

/// Voronoi cell of one seed: circumcenters of its adjacent inner faces,
/// sorted by angle around the seed.
fn cell_circumcenters(vertex: spade::handles::VertexHandle<Point2<f64>>) -> Vec<Coord<f64>> {
    let generator = vertex.position();
    let mut unique: AHashMap<(i64, i64), Coord<f64>> = AHashMap::new();

    for edge in vertex.out_edges() {
        let face = edge.face();
        if face.is_outer() { continue }

        // Walk the three corners of the Delaunay face.
        let mut corners = Vec::with_capacity(3);
        if let Some(start) = face.adjacent_edge() {
            let mut current = start;
            loop {
                corners.push(current.from().position());
                current = current.next();
                if current == start || corners.len() > 3 { break }
            }
        }
        if corners.len() != 3 { continue }

        if let Some(center) = circumcenter(corners[0], corners[1], corners[2]) {
            let key = ((center.x * 1e6).round() as i64, (center.y * 1e6).round() as i64);
            unique.insert(key, center);
        }
    }

    let mut cell: Vec<Coord<f64>> = unique.into_values().collect();
    cell.sort_by(|a, b| {
        let angle_a = (a.y - generator.y).atan2(a.x - generator.x);
        let angle_b = (b.y - generator.y).atan2(b.x - generator.x);
        angle_a.total_cmp(&angle_b)
    });
    cell
}

/// Circumcenter of a triangle, or None for near-degenerate triangles.
fn circumcenter(p1: Point2<f64>, p2: Point2<f64>, p3: Point2<f64>) -> Option<Coord<f64>> {
    let d = 2.0 * (p1.x * (p2.y - p3.y) + p2.x * (p3.y - p1.y) + p3.x * (p1.y - p2.y));
    if d.abs() < 1e-12 { return None }

    let s1 = p1.x * p1.x + p1.y * p1.y;
    let s2 = p2.x * p2.x + p2.y * p2.y;
    let s3 = p3.x * p3.x + p3.y * p3.y;
    Some(Coord {
        x: (s1 * (p2.y - p3.y) + s2 * (p3.y - p1.y) + s3 * (p1.y - p2.y)) / d,
        y: (s1 * (p3.x - p2.x) + s2 * (p1.x - p3.x) + s3 * (p2.x - p1.x)) / d,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::rect_polygon;
    use rand::SeedableRng;

    fn style() -> RoadStyle {
        RoadStyle {
            main_width: 12.0,
            internal_width: 7.0,
            sidewalk_width: 2.0,
            // Skip the smoothing pass in unit tests; covered separately.
            turning_radius: 0.0,
            min_block_area: 200.0,
        }
    }

    #[test]
    fn generates_blocks_and_roads_for_a_large_site() {
        let site = MultiPolygon(vec![rect_polygon(0.0, 0.0, 500.0, 500.0)]);
        let mut rng = StdRng::seed_from_u64(1);

        let network = generate(&site, 40, &style(), &mut rng).unwrap();
        assert!(network.road_polygon.unsigned_area() > 0.0);
        assert!(!network.commercial_blocks.is_empty());
        assert!(!network.service_blocks.is_empty());

        // Service band sits below the commercial band.
        let max_service = network.service_blocks.iter()
            .map(|b| b.elevation).fold(f64::NEG_INFINITY, f64::max);
        let min_commercial = network.commercial_blocks.iter()
            .map(|b| b.elevation).fold(f64::INFINITY, f64::min);
        assert!(max_service <= min_commercial);
    }

    #[test]
    fn degenerate_site_fails_construction() {
        let sliver = MultiPolygon(vec![rect_polygon(0.0, 0.0, 0.0, 100.0)]);
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(
            generate(&sliver, 10, &style(), &mut rng).unwrap_err(),
            RoadGenFailure::Construction,
        );
    }

    #[test]
    fn generation_is_deterministic_for_a_fixed_seed() {
        let site = MultiPolygon(vec![rect_polygon(0.0, 0.0, 500.0, 500.0)]);
        let a = generate(&site, 30, &style(), &mut StdRng::seed_from_u64(9)).unwrap();
        let b = generate(&site, 30, &style(), &mut StdRng::seed_from_u64(9)).unwrap();
        assert_eq!(a.commercial_blocks.len(), b.commercial_blocks.len());
        assert!((a.road_polygon.unsigned_area() - b.road_polygon.unsigned_area()).abs() < 1e-9);
    }

    #[test]
    fn circumcenter_of_right_triangle_is_hypotenuse_midpoint() {
        let c = circumcenter(
            Point2::new(0.0, 0.0),
            Point2::new(4.0, 0.0),
            Point2::new(0.0, 3.0),
        ).unwrap();
        assert!((c.x - 2.0).abs() < 1e-12 && (c.y - 1.5).abs() < 1e-12);
    }

    #[test]
    fn circumcenter_rejects_collinear_points() {
        assert!(circumcenter(
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
        ).is_none());
    }
}
