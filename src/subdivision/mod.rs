//! Constrained lot subdivision.
//!
//! Widths are solved as a bounded integer problem at centimetre resolution:
//! a prefix-contiguous set of slots, each within `[min, max]`, summing to the
//! block extent exactly, minimizing total deviation from the target width.
//! The search is bounded by an explicit deadline; on timeout or infeasibility
//! it falls back to deterministic uniform division.

use std::time::{Duration, Instant};

use geo::{Area, BooleanOps, BoundingRect, MultiPolygon};
use tracing::debug;

use crate::geom::{erode, rect_polygon};
use crate::skeleton::Block;

/// Fixed-point resolution: widths are solved in whole centimetres.
const CM: f64 = 100.0;

/// Blocks covering less than this share of the nominal cell area become
/// green space instead of lots.
const PARK_RATIO: f64 = 0.6;

/// Lot width bounds and clipping parameters for one subdivision pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LotConfig {
    pub min_width: f64,
    pub max_width: f64,
    pub target_width: f64,
    pub setback: f64,
    pub time_limit: Duration,
}

/// A sellable lot: solver width, clipped shape, and the setback-eroded
/// buildable footprint (absent when the erosion empties the shape).
#[derive(Debug, Clone)]
pub struct Lot {
    pub width: f64,
    pub polygon: MultiPolygon<f64>,
    pub footprint: Option<MultiPolygon<f64>>,
}

/// Outcome of subdividing one commercial block.
#[derive(Debug, Clone)]
pub(crate) enum SubdividedBlock {
    Park(MultiPolygon<f64>),
    Lots(Vec<Lot>),
}

/// Partition `total_length` into consecutive lot widths within
/// `[min_w, max_w]`, minimizing total deviation from `target_w`.
///
/// Returns `[]` for degenerate input without invoking the solver. On timeout
/// or infeasibility, falls back to uniform division.
pub fn solve_widths(
    total_length: f64,
    min_w: f64,
    max_w: f64,
    target_w: f64,
    time_limit: Duration,
) -> Vec<f64> {
    if total_length <= 0.0 || min_w <= 0.0 || total_length < min_w {
        return Vec::new();
    }

    let total = (total_length * CM).round() as i64;
    let min = (min_w * CM).round() as i64;
    let max = ((max_w * CM).round() as i64).max(min);
    let target = ((target_w * CM).round() as i64).clamp(min, max);

    let deadline = Instant::now() + time_limit;
    let max_slots = (total_length / min_w).ceil() as i64 + 1;

    // For a fixed slot count the minimum total deviation is |total - n*target|
    // whenever n*min <= total <= n*max, so scanning feasible counts finds the
    // exact optimum of the slot model.
    let mut best: Option<(i64, Vec<i64>)> = None;
    for count in 1..=max_slots {
        if Instant::now() >= deadline { break }
        if count * min > total { break }
        if count * max < total { continue }

        let deviation = (total - count * target).abs();
        if best.as_ref().is_some_and(|(d, _)| *d <= deviation) { continue }
        best = Some((deviation, distribute(total, count, min, max, target)));
        if deviation == 0 { break }
    }

    match best {
        Some((_, widths)) => widths.into_iter().map(|w| w as f64 / CM).collect(),
        None => {
            debug!(total_length, "width solver fell back to uniform division");
            uniform_fallback(total_length, target_w)
        }
    }
}

/// Witness assignment for a feasible slot count: start every slot at the
/// target and push the remainder into the earliest slots, bounded per slot.
fn distribute(total: i64, count: i64, min: i64, max: i64, target: i64) -> Vec<i64> {
    let mut widths = vec![target; count as usize];
    let mut remainder = total - count * target;
    for width in widths.iter_mut() {
        if remainder == 0 { break }
        let adjust = if remainder > 0 {
            remainder.min(max - target)
        } else {
            remainder.max(min - target)
        };
        *width += adjust;
        remainder -= adjust;
    }
    debug_assert_eq!(remainder, 0, "distribute must consume the full remainder");
    widths
}

/// Deterministic fallback: `floor(length / target)` equal lots.
fn uniform_fallback(total_length: f64, target_w: f64) -> Vec<f64> {
    let count = ((total_length / target_w).floor() as usize).max(1);
    vec![total_length / count as f64; count]
}

/// Subdivide one commercial block into lots, or hand it back as a park when
/// it covers too little of its nominal grid cell.
pub(crate) fn subdivide_block(block: &Block, spacing: f64, config: &LotConfig) -> SubdividedBlock {
    let ratio = block.area / (spacing * spacing);
    if ratio < PARK_RATIO {
        return SubdividedBlock::Park(block.polygon.clone());
    }

    let Some(bounds) = block.polygon.bounding_rect() else {
        return SubdividedBlock::Park(block.polygon.clone());
    };

    let widths = solve_widths(
        bounds.width(),
        config.min_width,
        config.max_width,
        config.target_width,
        config.time_limit,
    );
    if widths.is_empty() {
        return SubdividedBlock::Park(block.polygon.clone());
    }

    // Sweep the cutting coordinate left to right and clip vertical strips.
    let mut lots = Vec::with_capacity(widths.len());
    let mut cursor = bounds.min().x;
    for width in widths {
        let strip = MultiPolygon(vec![rect_polygon(
            cursor,
            bounds.min().y,
            cursor + width,
            bounds.max().y,
        )]);
        cursor += width;

        let clipped = block.polygon.intersection(&strip);
        if clipped.unsigned_area() < 1e-9 { continue }

        let footprint = erode(&clipped, config.setback);
        lots.push(Lot { width, polygon: clipped, footprint });
    }
    SubdividedBlock::Lots(lots)
}
