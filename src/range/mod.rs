//! Translation of selections between the overlay and the logical tree.
//!
//! Both representations share one coordinate space: a
//! [`SelectionEndpoint`] names a character by page, MCID and offset within
//! the marked-content sequence. Endpoints resolve to overlay positions
//! through the start offset stored on each node, and to logical text spans
//! through the offset stored on each span.

mod mapper;
mod rects;

pub use mapper::{
    endpoint_at, endpoint_in_span, map_range, range_on_page, resolve_endpoint, spans_in_range,
};
pub use rects::{bounding_rect, range_rects};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::McidKey;
use crate::overlay::PageOverlay;

/// A character position in `(page, mcid, offset)` space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SelectionEndpoint {
    /// Page index
    pub page: u32,
    /// Marked Content ID on that page
    pub mcid: u32,
    /// Character offset within the sequence
    pub offset: usize,
}

impl SelectionEndpoint {
    /// Create an endpoint.
    pub fn new(page: u32, mcid: u32, offset: usize) -> Self {
        Self { page, mcid, offset }
    }

    /// Key of the sequence the endpoint is in.
    pub fn key(&self) -> McidKey {
        McidKey::new(self.page, self.mcid)
    }
}

/// A selection between two endpoints, tagged with a free-form kind
/// (`"align"` for the paired-view highlight).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionRange {
    /// Start of the range
    pub start: SelectionEndpoint,
    /// End of the range (exclusive offset)
    pub end: SelectionEndpoint,
    /// Purpose of the range
    #[serde(default)]
    pub kind: String,
}

impl SelectionRange {
    /// Create a range of kind `kind`.
    pub fn new(start: SelectionEndpoint, end: SelectionEndpoint, kind: impl Into<String>) -> Self {
        Self {
            start,
            end,
            kind: kind.into(),
        }
    }

    /// Pages the range touches, first to last.
    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        let first = self.start.page.min(self.end.page);
        let last = self.start.page.max(self.end.page);
        first..=last
    }
}

/// Position inside an overlay: a node and a character offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayPosition {
    /// Index into [`PageOverlay::nodes`]
    pub node_index: usize,
    /// Character offset within the node's text
    pub offset: usize,
}

/// One page's share of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayRange {
    /// Page index
    pub page: u32,
    /// Start position
    pub start: OverlayPosition,
    /// End position (exclusive)
    pub end: OverlayPosition,
}

/// Access to overlays that have finished rendering.
pub trait OverlayLookup {
    /// The page's overlay, if it has finished rendering.
    fn rendered_overlay(&self, page: u32) -> Option<&PageOverlay>;
}

impl OverlayLookup for BTreeMap<u32, PageOverlay> {
    fn rendered_overlay(&self, page: u32) -> Option<&PageOverlay> {
        self.get(&page)
    }
}
