//! Highlight bookkeeping.
//!
//! Ranges are indexed under every page they touch so that a page can be
//! redrawn on its own once its overlay has rendered. Redrawing replaces a
//! page's marks wholesale.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::Rect;
use crate::range::{bounding_rect, range_on_page, range_rects, OverlayLookup, SelectionRange};

/// Page → ranges touching that page, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct HighlightIndex {
    pages: BTreeMap<u32, IndexSet<SelectionRange>>,
}

impl HighlightIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Index `range` under every page it touches. Returns those pages.
    pub fn add(&mut self, range: SelectionRange) -> BTreeSet<u32> {
        let pages: BTreeSet<u32> = range.pages().collect();
        for page in &pages {
            self.pages.entry(*page).or_default().insert(range.clone());
        }
        pages
    }

    /// Remove `range` from every page it touches. Returns the pages it was
    /// actually removed from.
    pub fn remove(&mut self, range: &SelectionRange) -> BTreeSet<u32> {
        let mut touched = BTreeSet::new();
        for page in range.pages() {
            let Some(set) = self.pages.get_mut(&page) else {
                continue;
            };
            if set.shift_remove(range) {
                touched.insert(page);
            }
            if set.is_empty() {
                self.pages.remove(&page);
            }
        }
        touched
    }

    /// Remove everything. Returns the pages that had ranges.
    pub fn clear(&mut self) -> BTreeSet<u32> {
        let pages = self.pages.keys().copied().collect();
        self.pages.clear();
        pages
    }

    /// Ranges on `page`, in insertion order.
    pub fn ranges_on(&self, page: u32) -> impl Iterator<Item = &SelectionRange> {
        self.pages.get(&page).into_iter().flatten()
    }

    /// Pages with at least one range.
    pub fn pages(&self) -> BTreeSet<u32> {
        self.pages.keys().copied().collect()
    }

    /// True if nothing is highlighted.
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// One range drawn on one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighlightMark {
    /// The highlighted range
    pub range: SelectionRange,
    /// Rectangles of the covered nodes
    pub rects: Vec<Rect>,
}

/// Everything drawn on a page's highlight layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageHighlights {
    /// Page index
    pub page: u32,
    /// Marks in index order
    pub marks: Vec<HighlightMark>,
    /// Area to scroll into view, if the page starts the first highlight
    pub scroll_into_view: Option<Rect>,
}

/// Highlight index plus the paired-view ("aligned") range and the marks
/// currently drawn on each page.
#[derive(Debug, Clone, Default)]
pub struct HighlightManager {
    index: HighlightIndex,
    aligned: Option<SelectionRange>,
    drawn: BTreeMap<u32, PageHighlights>,
}

impl HighlightManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// The index of active ranges.
    pub fn index(&self) -> &HighlightIndex {
        &self.index
    }

    /// Add a range; returns the pages needing a redraw.
    pub fn add(&mut self, range: SelectionRange) -> BTreeSet<u32> {
        self.index.add(range)
    }

    /// Add several ranges.
    pub fn add_all(&mut self, ranges: impl IntoIterator<Item = SelectionRange>) -> BTreeSet<u32> {
        ranges.into_iter().flat_map(|r| self.index.add(r)).collect()
    }

    /// Remove a range; returns the pages needing a redraw.
    pub fn remove(&mut self, range: &SelectionRange) -> BTreeSet<u32> {
        if self.aligned.as_ref() == Some(range) {
            self.aligned = None;
        }
        self.index.remove(range)
    }

    /// Remove several ranges.
    pub fn remove_all<'r>(&mut self, ranges: impl IntoIterator<Item = &'r SelectionRange>) -> BTreeSet<u32> {
        ranges.into_iter().flat_map(|r| self.remove(r)).collect()
    }

    /// Remove every range; returns the pages that had any.
    pub fn clear(&mut self) -> BTreeSet<u32> {
        self.aligned = None;
        self.index.clear()
    }

    /// The current aligned range.
    pub fn aligned(&self) -> Option<&SelectionRange> {
        self.aligned.as_ref()
    }

    /// Replace the aligned range. Returns the pages of both the old and the
    /// new range.
    pub fn set_aligned(&mut self, range: Option<SelectionRange>) -> BTreeSet<u32> {
        let mut pages = match self.aligned.take() {
            Some(previous) => self.index.remove(&previous),
            None => BTreeSet::new(),
        };
        if let Some(range) = range {
            pages.extend(self.index.add(range.clone()));
            self.aligned = Some(range);
        }
        pages
    }

    /// Redraw `page` from scratch. Returns `None` while the page's overlay
    /// has not rendered.
    pub fn refresh<L>(&mut self, page: u32, overlays: &L) -> Option<&PageHighlights>
    where
        L: OverlayLookup + ?Sized,
    {
        let Some(overlay) = overlays.rendered_overlay(page) else {
            log::debug!("Skipping highlight refresh of unrendered page {}", page);
            return None;
        };

        let mut drawn = PageHighlights {
            page,
            ..Default::default()
        };
        for (i, range) in self.index.ranges_on(page).enumerate() {
            let Some(leg) = range_on_page(overlays, range, page) else {
                log::debug!("Highlight does not resolve on page {}", page);
                continue;
            };
            let rects = range_rects(overlay, &leg);
            if i == 0 && range.start.page == page {
                drawn.scroll_into_view = bounding_rect(&rects);
            }
            drawn.marks.push(HighlightMark {
                range: range.clone(),
                rects,
            });
        }

        self.drawn.insert(page, drawn);
        self.drawn.get(&page)
    }

    /// Marks last drawn on `page`.
    pub fn drawn(&self, page: u32) -> Option<&PageHighlights> {
        self.drawn.get(&page)
    }
}
