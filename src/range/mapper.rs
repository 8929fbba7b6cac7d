//! Endpoint resolution and cross-page range splitting.

use super::{OverlayLookup, OverlayPosition, OverlayRange, SelectionEndpoint, SelectionRange};
use crate::overlay::PageOverlay;
use crate::reconstruct::{ReconstructedDocument, TextSpan};

/// Find the node and in-node offset of `endpoint` in `overlay`.
///
/// Nodes of the endpoint's sequence are scanned in order; the first whose
/// half-open interval `[start, start + len)` covers the offset wins. An
/// offset equal to the end of the sequence's text resolves to the end of its
/// last node.
pub fn resolve_endpoint(overlay: &PageOverlay, endpoint: &SelectionEndpoint) -> Option<OverlayPosition> {
    if overlay.page != endpoint.page {
        return None;
    }
    let mut last = None;
    for (node_index, node) in overlay.nodes_for(endpoint.key()) {
        let len = node.char_len();
        if endpoint.offset >= node.start_offset && endpoint.offset < node.start_offset + len {
            return Some(OverlayPosition {
                node_index,
                offset: endpoint.offset - node.start_offset,
            });
        }
        last = Some((node_index, node.start_offset, len));
    }
    match last {
        Some((node_index, start, len)) if endpoint.offset == start + len => Some(OverlayPosition {
            node_index,
            offset: len,
        }),
        _ => None,
    }
}

/// Map a selection onto every rendered page it touches.
///
/// Both endpoints must resolve, otherwise nothing is mapped. The first leg
/// runs from the start to the end of the start page's last tagged node;
/// intermediate pages are covered from their first to their last tagged
/// node; the final leg ends at the original end. Pages in between that are
/// not rendered are skipped.
pub fn map_range<L>(overlays: &L, range: &SelectionRange) -> Option<Vec<OverlayRange>>
where
    L: OverlayLookup + ?Sized,
{
    if range.start.page > range.end.page {
        log::warn!(
            "Selection ends on page {} before it starts on page {}",
            range.end.page,
            range.start.page
        );
        return None;
    }

    for endpoint in [&range.start, &range.end] {
        let Some(overlay) = overlays.rendered_overlay(endpoint.page) else {
            log::warn!("Page {} text layer is not rendered", endpoint.page);
            return None;
        };
        if resolve_endpoint(overlay, endpoint).is_none() {
            log::warn!(
                "Failed to find {}/{} offset {} in the text layer",
                endpoint.page,
                endpoint.mcid,
                endpoint.offset
            );
            return None;
        }
    }

    Some(
        range
            .pages()
            .filter_map(|page| range_on_page(overlays, range, page))
            .collect(),
    )
}

/// The part of `range` that lies on `page`, if the page is rendered.
///
/// Unlike [`map_range`] this does not need the other pages of the range.
pub fn range_on_page<L>(overlays: &L, range: &SelectionRange, page: u32) -> Option<OverlayRange>
where
    L: OverlayLookup + ?Sized,
{
    if !range.pages().contains(&page) {
        return None;
    }
    let Some(overlay) = overlays.rendered_overlay(page) else {
        log::debug!("Page {} not rendered yet", page);
        return None;
    };

    let start = if range.start.page == page {
        resolve_endpoint(overlay, &range.start)?
    } else {
        OverlayPosition {
            node_index: overlay.first_tagged()?,
            offset: 0,
        }
    };
    let end = if range.end.page == page {
        resolve_endpoint(overlay, &range.end)?
    } else {
        let node_index = overlay.last_tagged()?;
        OverlayPosition {
            node_index,
            offset: overlay.nodes[node_index].char_len(),
        }
    };

    Some(OverlayRange { page, start, end })
}

/// The endpoint at `position` in `overlay`, if the node is tagged.
pub fn endpoint_at(overlay: &PageOverlay, position: OverlayPosition) -> Option<SelectionEndpoint> {
    let node = overlay.nodes.get(position.node_index)?;
    let owner = node.owner?;
    if position.offset > node.char_len() {
        return None;
    }
    Some(SelectionEndpoint::new(
        owner.page,
        owner.mcid,
        node.start_offset + position.offset,
    ))
}

/// The endpoint `offset` characters into a logical text span's source fragment.
pub fn endpoint_in_span(span: &TextSpan, offset: usize) -> Option<SelectionEndpoint> {
    if offset > span.source_len {
        return None;
    }
    Some(SelectionEndpoint::new(
        span.key.page,
        span.key.mcid,
        span.start_offset + offset,
    ))
}

/// Logical spans covered by `range`, in document order.
///
/// Spans are matched on the offsets of their source fragments, so a span
/// whose line-break hyphen was dropped still owns the hyphen's offset.
pub fn spans_in_range<'d>(document: &'d ReconstructedDocument, range: &SelectionRange) -> Vec<&'d TextSpan> {
    let spans = document.arena().spans();

    let start = spans.iter().position(|s| {
        s.key == range.start.key()
            && range.start.offset >= s.start_offset
            && range.start.offset < s.source_end()
    });
    let end = spans.iter().position(|s| {
        s.key == range.end.key()
            && range.end.offset > s.start_offset
            && range.end.offset <= s.source_end()
    });

    match (start, end) {
        (Some(start), Some(end)) if start <= end => spans[start..=end].to_vec(),
        (Some(_), Some(_)) => Vec::new(),
        _ => {
            log::warn!("Selection does not resolve in the reconstructed document");
            Vec::new()
        },
    }
}
