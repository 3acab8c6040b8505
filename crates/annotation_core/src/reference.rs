//! crates/annotation_core/src/reference.rs
//!
//! Text encoding of a highlight's geometry: `p=<page>;rects=x,y,w,h|x,y,w,h`.
//!
//! Coordinates are rounded to 4 decimal places on the way out. Decoding never
//! fails: a missing or malformed page falls back to page 1 and any rectangle
//! segment that does not hold exactly four finite numbers is dropped.

use crate::domain::{Anchor, Geometry, Rect};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static PAGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"p=(\d+)").expect("page pattern is a valid regex"));

const RECTS_MARKER: &str = "rects=";
const SCALE: f64 = 10_000.0;

/// Encodes a page number and its rectangles into an anchor reference.
///
/// Rectangles with a non-finite coordinate are left out, since they could never
/// be read back.
pub fn encode(page: u32, rects: &[Rect]) -> String {
    let encoded = rects
        .iter()
        .filter(|r| r.is_finite())
        .map(|r| {
            [r.x, r.y, r.w, r.h]
                .iter()
                .map(|n| format_coordinate(*n))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("|");
    format!("p={};{}{}", page, RECTS_MARKER, encoded)
}

/// Decodes an anchor reference. Worst case is `{ page: 1, rects: [] }`.
pub fn decode(reference: &str) -> Geometry {
    let page = PAGE_PATTERN
        .captures(reference)
        .and_then(|caps| caps[1].parse::<u32>().ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1);

    let rects = match reference.split_once(RECTS_MARKER) {
        Some((_, tail)) if !tail.is_empty() => tail.split('|').filter_map(parse_rect).collect(),
        _ => Vec::new(),
    };

    Geometry { page, rects }
}

fn parse_rect(segment: &str) -> Option<Rect> {
    let values = segment
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()
        .filter(|values| values.len() == 4 && values.iter().all(|v| v.is_finite()));

    match values {
        Some(v) => Some(Rect::new(v[0], v[1], v[2], v[3])),
        None => {
            debug!(segment, "Discarding malformed rectangle segment");
            None
        }
    }
}

fn format_coordinate(value: f64) -> String {
    let rounded = (value * SCALE).round() / SCALE;
    if rounded == 0.0 {
        // Also folds -0 into 0.
        "0".to_string()
    } else {
        rounded.to_string()
    }
}

impl Anchor {
    /// Page and rectangles this anchor points at.
    pub fn geometry(&self) -> Geometry {
        decode(&self.reference)
    }
}
