//! Synthetic terrain proxy.
//!
//! A deterministic, strictly monotonic plane over the site coordinates. It is
//! used only to *rank* blocks (lowest block hosts the treatment facility, the
//! next-lowest band becomes service land); it is not a terrain model.

use geo::Coord;

const BASE_M: f64 = 30.0;
const GRADIENT_X: f64 = 0.012;
const GRADIENT_Y: f64 = 0.007;

/// Height of the synthetic terrain plane at a coordinate.
#[inline]
pub(crate) fn elevation_at(c: Coord<f64>) -> f64 {
    BASE_M + GRADIENT_X * c.x + GRADIENT_Y * c.y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plane_is_monotonic_in_both_axes() {
        let origin = elevation_at(Coord { x: 0.0, y: 0.0 });
        assert!(elevation_at(Coord { x: 10.0, y: 0.0 }) > origin);
        assert!(elevation_at(Coord { x: 0.0, y: 10.0 }) > origin);
        assert!(elevation_at(Coord { x: -10.0, y: 0.0 }) < origin);
    }

    #[test]
    fn plane_is_deterministic() {
        let c = Coord { x: 123.4, y: 567.8 };
        assert_eq!(elevation_at(c), elevation_at(c));
    }
}
