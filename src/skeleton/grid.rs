//! Rotated-grid candidate evaluation for the genetic strategy.
//!
//! A candidate is a (spacing, angle) pair. The evaluation lays an axis-aligned
//! square grid over the land bounding box extended by its diagonal (so every
//! rotation still covers the land), rotates the whole grid about the land
//! centroid, and classifies each cell by how much usable land it covers.

use geo::{Area, BooleanOps, BoundingRect, Centroid, MultiPolygon, Point, Rotate};

use crate::geom::{dist, rect_polygon};

/// Cell ratio above which a cell counts as residential land.
const RESIDENTIAL_RATIO: f64 = 0.65;
/// Cell ratio above which a cell is a penalized fragment (and below which it
/// is discarded outright).
const FRAGMENT_RATIO: f64 = 0.10;

/// One usable grid cell: the clipped usable shape and its coverage ratio.
#[derive(Debug, Clone)]
pub(crate) struct GridCell {
    pub usable: MultiPolygon<f64>,
    pub ratio: f64,
}

/// Result of evaluating a single (spacing, angle) candidate.
#[derive(Debug, Clone, Default)]
pub(crate) struct GridEvaluation {
    pub cells: Vec<GridCell>,
    pub residential_area: f64,
    pub fragments: usize,
}

/// Evaluate a rotated grid candidate against the land (minus exclusion).
pub(crate) fn evaluate(
    land: &MultiPolygon<f64>,
    exclusion: Option<&MultiPolygon<f64>>,
    spacing: f64,
    angle: f64,
) -> GridEvaluation {
    let mut eval = GridEvaluation::default();

    let Some(bounds) = land.bounding_rect() else { return eval };
    if spacing <= 0.0 { return eval }

    let diagonal = dist(bounds.min(), bounds.max());
    let pivot = land.centroid()
        .unwrap_or_else(|| Point::new(bounds.center().x, bounds.center().y));

    // Snap the extension to a whole number of cells so the grid stays
    // anchored at the land's bounding-box corner for every candidate.
    let extension = (diagonal / spacing).ceil() * spacing;
    let min_x = bounds.min().x - extension;
    let min_y = bounds.min().y - extension;
    let cols = (((bounds.max().x + extension) - min_x) / spacing).ceil() as i64;
    let rows = (((bounds.max().y + extension) - min_y) / spacing).ceil() as i64;
    let nominal_area = spacing * spacing;

    for col in 0..cols {
        for row in 0..rows {
            let x = min_x + col as f64 * spacing;
            let y = min_y + row as f64 * spacing;
            let cell = rect_polygon(x, y, x + spacing, y + spacing)
                .rotate_around_point(angle, pivot);

            let covered = land.intersection(&MultiPolygon(vec![cell]));
            if covered.0.is_empty() { continue }

            let usable = match exclusion {
                Some(water) => covered.difference(water),
                None => covered,
            };

            let ratio = usable.unsigned_area() / nominal_area;
            if ratio > RESIDENTIAL_RATIO {
                eval.residential_area += usable.unsigned_area();
                eval.cells.push(GridCell { usable, ratio });
            } else if ratio > FRAGMENT_RATIO {
                eval.fragments += 1;
            }
            // ratio <= FRAGMENT_RATIO: discarded.
        }
    }

    eval
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::rect_polygon;

    fn square_land(side: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![rect_polygon(0.0, 0.0, side, side)])
    }

    #[test]
    fn unrotated_grid_tiles_a_square_exactly() {
        // 100x100 land, spacing 25, no rotation: 16 full cells, no fragments.
        let eval = evaluate(&square_land(100.0), None, 25.0, 0.0);
        assert_eq!(eval.cells.len(), 16);
        assert_eq!(eval.fragments, 0);
        assert!((eval.residential_area - 100.0 * 100.0).abs() < 1e-6);
        assert!(eval.cells.iter().all(|c| (c.ratio - 1.0).abs() < 1e-9));
    }

    #[test]
    fn misaligned_grid_produces_fragments() {
        // Spacing 30 over 100x100 leaves 10m strips: cells covering the strip
        // have ratio 1/3, which lands in the fragment band.
        let eval = evaluate(&square_land(100.0), None, 30.0, 0.0);
        assert!(eval.fragments > 0);
        assert!(!eval.cells.is_empty());
        assert!(eval.residential_area < 100.0 * 100.0);
    }

    #[test]
    fn exclusion_is_subtracted_from_usable_area() {
        let land = square_land(100.0);
        let water = MultiPolygon(vec![rect_polygon(0.0, 0.0, 100.0, 50.0)]);
        let with = evaluate(&land, Some(&water), 25.0, 0.0);
        let without = evaluate(&land, None, 25.0, 0.0);
        assert!(with.residential_area < without.residential_area);
        // Cells fully inside the water strip disappear below the discard band.
        assert!(with.cells.len() < without.cells.len());
    }

    #[test]
    fn rotation_keeps_cells_on_land() {
        let eval = evaluate(&square_land(100.0), None, 25.0, 45.0);
        assert!(!eval.cells.is_empty());
        // Every kept cell must genuinely overlap the land.
        assert!(eval.cells.iter().all(|c| c.usable.unsigned_area() > 0.0));
    }

    #[test]
    fn empty_land_evaluates_to_nothing() {
        let eval = evaluate(&MultiPolygon(vec![]), None, 25.0, 0.0);
        assert!(eval.cells.is_empty());
        assert_eq!(eval.fragments, 0);
    }
}
