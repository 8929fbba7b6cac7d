//! A document session: overlays, highlights, validation marks and the
//! reconstructed document of one open document.
//!
//! The session is single-threaded. Its state lives in `RefCell`s, and no
//! borrow is held across an `.await`, so overlapping futures on the same
//! session are safe as long as they are driven from one thread.

mod page_view;
mod source;

pub use page_view::{PageView, RenderingState};
pub use source::{DocumentDump, DocumentSource, InMemorySource};

use std::cell::{Cell, Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::SessionConfig;
use crate::content::{group_by_mcid, McidKey, McidRun};
use crate::error::{Error, Result};
use crate::geometry::Viewport;
use crate::highlight::{HighlightManager, PageHighlights};
use crate::overlay::{
    annotation_marks, FixedAdvanceMeasurer, OverlayRenderTask, PageOverlay, Severity, TextMeasurer,
};
use crate::range::{
    endpoint_at, map_range, spans_in_range, OverlayLookup, OverlayPosition, OverlayRange,
    SelectionRange,
};
use crate::reconstruct::{reconstruct, FigureProducer, ReconstructedDocument, TextSpan};

impl OverlayLookup for BTreeMap<u32, PageView> {
    fn rendered_overlay(&self, page: u32) -> Option<&PageOverlay> {
        self.get(&page)?.overlay()
    }
}

/// Clears the in-flight flag when an extraction ends, however it ends.
struct ExtractionGuard<'a>(&'a Cell<bool>);

impl<'a> ExtractionGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for ExtractionGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// One open document.
pub struct DocumentSession<S: DocumentSource> {
    source: S,
    config: SessionConfig,
    pages: RefCell<BTreeMap<u32, PageView>>,
    highlights: RefCell<HighlightManager>,
    problems: RefCell<HashMap<McidKey, Severity>>,
    document: RefCell<Option<ReconstructedDocument>>,
    selection: RefCell<Option<SelectionRange>>,
    measurer: RefCell<Box<dyn TextMeasurer>>,
    figures: Option<Box<dyn FigureProducer>>,
    extracting: Cell<bool>,
}

impl<S: DocumentSource> DocumentSession<S> {
    /// Open a session over `source`.
    pub fn new(source: S, config: SessionConfig) -> Self {
        Self {
            source,
            config,
            pages: RefCell::new(BTreeMap::new()),
            highlights: RefCell::new(HighlightManager::new()),
            problems: RefCell::new(HashMap::new()),
            document: RefCell::new(None),
            selection: RefCell::new(None),
            measurer: RefCell::new(Box::new(FixedAdvanceMeasurer::default())),
            figures: None,
            extracting: Cell::new(false),
        }
    }

    /// Measure overlay text with `measurer`.
    pub fn with_measurer(mut self, measurer: Box<dyn TextMeasurer>) -> Self {
        *self.measurer.get_mut() = measurer;
        self
    }

    /// Substitute figures during reconstruction.
    pub fn with_figures(mut self, producer: Box<dyn FigureProducer>) -> Self {
        self.figures = Some(producer);
        self
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> u32 {
        self.source.page_count()
    }

    /// Rendering state of `page`.
    pub fn rendering_state(&self, page: u32) -> RenderingState {
        self.pages
            .borrow()
            .get(&page)
            .map(PageView::state)
            .unwrap_or_default()
    }

    // --- overlays ---

    /// Fetch the page's text and create its overlay nodes.
    ///
    /// The returned task can be canceled until [`render_page`](Self::render_page)
    /// starts measuring it.
    pub async fn prepare_page(&self, page: u32, viewport: &Viewport) -> Result<OverlayRenderTask> {
        let content = self.source.page_text_content(page).await?;
        let problems: HashMap<McidKey, Severity> = self
            .problems
            .borrow()
            .iter()
            .filter(|(key, _)| key.page == page)
            .map(|(key, severity)| (*key, *severity))
            .collect();

        let task = OverlayRenderTask::new(page, &content, viewport, &self.config.overlay)
            .with_problems(problems);
        self.pages
            .borrow_mut()
            .entry(page)
            .or_insert_with(|| PageView::new(page))
            .start();
        Ok(task)
    }

    /// Wait out the task's deferral, measure it, store the overlay and
    /// redraw the page's highlights.
    pub async fn render_page(&self, task: OverlayRenderTask) -> Result<()> {
        let page = task.page();
        if let Err(e) = task.ready().await {
            if let Some(view) = self.pages.borrow_mut().get_mut(&page) {
                view.reset();
            }
            return Err(e);
        }

        let overlay = {
            let mut measurer = self.measurer.borrow_mut();
            task.measure(&mut **measurer)?
        };
        log::debug!("Page {} overlay rendered with {} nodes", page, overlay.nodes.len());

        self.pages
            .borrow_mut()
            .entry(page)
            .or_insert_with(|| PageView::new(page))
            .finish(overlay);
        self.refresh_highlights([page]);
        Ok(())
    }

    /// Prepare and render `page` in one go.
    pub async fn render(&self, page: u32, viewport: &Viewport) -> Result<()> {
        let task = self.prepare_page(page, viewport).await?;
        self.render_page(task).await
    }

    /// Resolves once `page` has finished rendering.
    ///
    /// Fails with [`Error::Canceled`] if the session goes away first.
    pub async fn when_rendered(&self, page: u32) -> Result<()> {
        let rx = {
            let mut pages = self.pages.borrow_mut();
            let view = pages.entry(page).or_insert_with(|| PageView::new(page));
            if view.state() == RenderingState::Finished {
                return Ok(());
            }
            view.rendered()
        };
        rx.await.map_err(|_| Error::Canceled)
    }

    /// Run `observer` once, the next time `page` finishes rendering.
    ///
    /// Observers run while the page is being stored and must not call back
    /// into the session.
    pub fn subscribe_once(&self, page: u32, observer: impl FnOnce(&PageOverlay) + 'static) {
        self.pages
            .borrow_mut()
            .entry(page)
            .or_insert_with(|| PageView::new(page))
            .subscribe_once(observer);
    }

    /// The rendered overlay of `page`.
    pub fn overlay(&self, page: u32) -> Option<Ref<'_, PageOverlay>> {
        Ref::filter_map(self.pages.borrow(), |pages| pages.rendered_overlay(page)).ok()
    }

    // --- reconstruction ---

    /// Reconstruct the document and return its markup.
    ///
    /// Returns `Ok(None)` without doing anything if an extraction is already
    /// in flight. Fails with [`Error::MissingStructureTree`] for untagged
    /// documents.
    pub async fn extract_document(&self) -> Result<Option<String>> {
        let Some(_guard) = ExtractionGuard::acquire(&self.extracting) else {
            log::debug!("Extraction already in progress");
            return Ok(None);
        };

        let mut runs: HashMap<McidKey, McidRun> = HashMap::new();
        for page in 0..self.source.page_count() {
            let content = self.source.page_text_content(page).await?;
            runs.extend(group_by_mcid(&content));
        }
        let tree = self
            .source
            .struct_tree()
            .await?
            .ok_or(Error::MissingStructureTree)?;

        let mut document = reconstruct(
            &tree,
            &runs,
            &self.config.reconstruction,
            self.figures.as_deref(),
        )
        .await;
        for (key, severity) in self.problems.borrow().iter() {
            document.mark_class(*key, severity.class_name());
        }

        let markup = document.to_markup();
        log::info!(
            "Reconstructed {} pages into {} bytes of markup",
            self.source.page_count(),
            markup.len()
        );
        self.document.replace(Some(document));
        Ok(Some(markup))
    }

    /// The last reconstructed document.
    pub fn document(&self) -> Option<Ref<'_, ReconstructedDocument>> {
        Ref::filter_map(self.document.borrow(), Option::as_ref).ok()
    }

    /// Logical spans covered by `range` in the last reconstructed document.
    pub fn reflow_spans(&self, range: &SelectionRange) -> Vec<TextSpan> {
        match self.document.borrow().as_ref() {
            Some(doc) => spans_in_range(doc, range).into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    // --- selection & highlights ---

    /// Select `range` in the overlays.
    ///
    /// Both endpoints must resolve in rendered overlays, otherwise nothing
    /// changes and `None` is returned.
    pub fn set_selection(&self, range: SelectionRange) -> Option<Vec<OverlayRange>> {
        let legs = map_range(&*self.pages.borrow(), &range)?;
        self.selection.replace(Some(range));
        Some(legs)
    }

    /// The current selection.
    pub fn selection(&self) -> Option<SelectionRange> {
        self.selection.borrow().clone()
    }

    /// The selection between two overlay positions of rendered pages.
    pub fn selection_from_overlay(
        &self,
        start: (u32, OverlayPosition),
        end: (u32, OverlayPosition),
    ) -> Option<SelectionRange> {
        let pages = self.pages.borrow();
        let start = endpoint_at(pages.rendered_overlay(start.0)?, start.1)?;
        let end = endpoint_at(pages.rendered_overlay(end.0)?, end.1)?;
        Some(SelectionRange::new(start, end, ""))
    }

    /// Highlight `range`; rendered pages are redrawn.
    pub fn add_highlight(&self, range: SelectionRange) -> BTreeSet<u32> {
        let pages = self.highlights.borrow_mut().add(range);
        self.refresh_highlights(pages.iter().copied());
        pages
    }

    /// Remove a highlight.
    pub fn remove_highlight(&self, range: &SelectionRange) -> BTreeSet<u32> {
        let pages = self.highlights.borrow_mut().remove(range);
        self.refresh_highlights(pages.iter().copied());
        pages
    }

    /// Remove every highlight; returns the pages that had any.
    pub fn clear_highlights(&self) -> BTreeSet<u32> {
        let pages = self.highlights.borrow_mut().clear();
        self.refresh_highlights(pages.iter().copied());
        pages
    }

    /// Replace the aligned-view highlight.
    pub fn set_aligned(&self, range: Option<SelectionRange>) -> BTreeSet<u32> {
        let pages = self.highlights.borrow_mut().set_aligned(range);
        self.refresh_highlights(pages.iter().copied());
        pages
    }

    /// Highlights currently drawn on `page`.
    pub fn page_highlights(&self, page: u32) -> Option<PageHighlights> {
        self.highlights.borrow().drawn(page).cloned()
    }

    fn refresh_highlights(&self, pages: impl IntoIterator<Item = u32>) {
        let views = self.pages.borrow();
        let mut highlights = self.highlights.borrow_mut();
        for page in pages {
            highlights.refresh(page, &*views);
        }
    }

    // --- validation ---

    /// Mark the sequence `mcid` (`"page/mcid"`) with a validation problem.
    ///
    /// Every logical span of the sequence gets the severity's class, and a
    /// rendered overlay of its page gets annotation marks. Returns how many
    /// spans and overlay nodes were marked; malformed ids mark nothing.
    pub fn mark_validation_error(&self, mcid: &str, problem_type: &str) -> usize {
        let key: McidKey = match mcid.parse() {
            Ok(key) => key,
            Err(e) => {
                log::warn!("{}", e);
                return 0;
            },
        };
        let severity = Severity::from_problem_type(problem_type);
        self.problems.borrow_mut().insert(key, severity);

        let mut marked = 0;
        if let Some(document) = self.document.borrow_mut().as_mut() {
            marked += document.mark_class(key, severity.class_name());
        }

        let mut pages = self.pages.borrow_mut();
        if let Some(overlay) = pages.get_mut(&key.page).and_then(PageView::overlay_mut) {
            overlay.clear_annotations(key);
            let problems = HashMap::from([(key, severity)]);
            let marks = annotation_marks(&overlay.nodes, &problems, self.config.overlay.annotation_opacity);
            marked += marks.len();
            overlay.annotations.extend(marks);
        }
        marked
    }

    /// Validation problems recorded so far.
    pub fn validation_marks(&self) -> HashMap<McidKey, Severity> {
        self.problems.borrow().clone()
    }
}
