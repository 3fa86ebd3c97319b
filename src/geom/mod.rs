pub(crate) mod elevation;

use geo::{Area, BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Euclidean distance between two coordinates.
#[inline]
pub(crate) fn dist(a: Coord<f64>, b: Coord<f64>) -> f64 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Midpoint of a segment.
#[inline]
pub(crate) fn midpoint(a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    Coord { x: (a.x + b.x) / 2.0, y: (a.y + b.y) / 2.0 }
}

/// Convert the exterior ring of every polygon into a plain coordinate sequence.
pub(crate) fn exterior_rings(mp: &MultiPolygon<f64>) -> Vec<Vec<[f64; 2]>> {
    mp.0.iter().map(|poly| ring_coords(poly.exterior())).collect()
}

/// Flatten a ring into `[x, y]` pairs.
pub(crate) fn ring_coords(ring: &LineString<f64>) -> Vec<[f64; 2]> {
    ring.0.iter().map(|c| [c.x, c.y]).collect()
}

/// Build a polygon from a plain coordinate ring (geo closes the ring itself).
pub(crate) fn polygon_from_ring(ring: &[[f64; 2]]) -> Polygon<f64> {
    let coords = ring.iter()
        .map(|p| Coord { x: p[0], y: p[1] })
        .collect::<Vec<_>>();
    Polygon::new(LineString(coords), vec![])
}

/// Axis-aligned rectangle polygon from corner coordinates.
pub(crate) fn rect_polygon(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Polygon<f64> {
    Polygon::new(
        LineString(vec![
            Coord { x: min_x, y: min_y },
            Coord { x: max_x, y: min_y },
            Coord { x: max_x, y: max_y },
            Coord { x: min_x, y: max_y },
            Coord { x: min_x, y: min_y },
        ]),
        vec![],
    )
}

/// Oriented rectangle covering a segment widened by `half_width`, with squared
/// caps (the rectangle extends `half_width` past both endpoints along the axis).
pub(crate) fn segment_buffer(a: Coord<f64>, b: Coord<f64>, half_width: f64) -> Option<Polygon<f64>> {
    let len = dist(a, b);
    if len < 1e-9 || half_width <= 0.0 { return None }

    let ux = (b.x - a.x) / len;
    let uy = (b.y - a.y) / len;
    let (ax, ay) = (a.x - ux * half_width, a.y - uy * half_width);
    let (bx, by) = (b.x + ux * half_width, b.y + uy * half_width);
    let (px, py) = (-uy * half_width, ux * half_width);

    Some(Polygon::new(
        LineString(vec![
            Coord { x: ax + px, y: ay + py },
            Coord { x: bx + px, y: by + py },
            Coord { x: bx - px, y: by - py },
            Coord { x: ax - px, y: ay - py },
            Coord { x: ax + px, y: ay + py },
        ]),
        vec![],
    ))
}

/// Union a list of polygons into one MultiPolygon.
/// This method may be slow for large numbers of complex polygons.
pub(crate) fn union_all(polys: Vec<Polygon<f64>>) -> MultiPolygon<f64> {
    polys.into_iter()
        .map(|p| MultiPolygon(vec![p]))
        .reduce(|a, b| a.union(&b))
        .unwrap_or_else(|| MultiPolygon(vec![]))
}

/// Erode a shape inward by `distance`. Returns None when the erosion empties it.
pub(crate) fn erode(mp: &MultiPolygon<f64>, distance: f64) -> Option<MultiPolygon<f64>> {
    if mp.0.is_empty() { return None }
    if distance <= 0.0 { return Some(mp.clone()) }
    let out = geo_buffer::buffer_multi_polygon(mp, -distance);
    (out.unsigned_area() > 1e-9).then_some(out)
}

/// Dilate a shape outward by `distance`.
pub(crate) fn dilate(mp: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if mp.0.is_empty() || distance <= 0.0 { return mp.clone() }
    geo_buffer::buffer_multi_polygon(mp, distance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rect_polygon_has_expected_area() {
        let rect = rect_polygon(0.0, 0.0, 10.0, 5.0);
        assert_relative_eq!(rect.unsigned_area(), 50.0);
    }

    #[test]
    fn segment_buffer_is_rectangle_with_caps() {
        // Horizontal segment of length 10, half width 2: (10 + 2*2) x 4 rectangle.
        let poly = segment_buffer(
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 10.0, y: 0.0 },
            2.0,
        ).unwrap();
        assert!((poly.unsigned_area() - 56.0).abs() < 1e-9);
    }

    #[test]
    fn segment_buffer_rejects_degenerate_input() {
        let p = Coord { x: 1.0, y: 1.0 };
        assert!(segment_buffer(p, p, 2.0).is_none());
        assert!(segment_buffer(p, Coord { x: 2.0, y: 1.0 }, 0.0).is_none());
    }

    #[test]
    fn union_all_merges_overlapping_squares() {
        let merged = union_all(vec![
            rect_polygon(0.0, 0.0, 2.0, 2.0),
            rect_polygon(1.0, 0.0, 3.0, 2.0),
        ]);
        assert!((merged.unsigned_area() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn erode_empties_small_shapes() {
        let small = MultiPolygon(vec![rect_polygon(0.0, 0.0, 1.0, 1.0)]);
        assert!(erode(&small, 2.0).is_none());

        let big = MultiPolygon(vec![rect_polygon(0.0, 0.0, 10.0, 10.0)]);
        let inner = erode(&big, 1.0).unwrap();
        assert!((inner.unsigned_area() - 64.0).abs() < 1e-6);
    }

    #[test]
    fn dist_and_midpoint() {
        let a = Coord { x: 0.0, y: 0.0 };
        let b = Coord { x: 3.0, y: 4.0 };
        assert_relative_eq!(dist(a, b), 5.0);
        let m = midpoint(a, b);
        assert_relative_eq!(m.x, 1.5);
        assert_relative_eq!(m.y, 2.0);
    }
}
