//! Screen rectangles covered by an overlay range.
//!
//! Each covered node contributes its own rectangle; a node the range only
//! partly covers is sliced in proportion to the characters covered.

use super::OverlayRange;
use crate::geometry::{Point, Rect};
use crate::overlay::PageOverlay;

/// Rectangles of the nodes covered by `range`, one per node.
pub fn range_rects(overlay: &PageOverlay, range: &OverlayRange) -> Vec<Rect> {
    let (first, last) = (range.start.node_index, range.end.node_index);
    if first > last {
        return Vec::new();
    }

    let mut rects = Vec::new();
    for (index, node) in overlay.nodes.iter().enumerate().take(last + 1).skip(first) {
        let len = node.char_len();
        if len == 0 {
            continue;
        }
        let from = if index == first { range.start.offset.min(len) } else { 0 };
        let to = if index == last { range.end.offset.min(len) } else { len };
        if to <= from {
            continue;
        }

        let local = node.local_rect();
        let per_char = local.width / len as f32;
        let slice = Rect::new(
            local.x + per_char * from as f32,
            local.y,
            per_char * (to - from) as f32,
            local.height,
        );
        if slice.is_empty() {
            continue;
        }
        rects.push(slice.rotated_about(Point::new(node.left, node.top), node.angle));
    }
    rects
}

/// Union of `rects`, if there are any.
pub fn bounding_rect(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(*first, |acc, r| acc.union(r)))
}
