//! Per-page rendering state and one-shot "rendered" notification.

use tokio::sync::oneshot;

use crate::overlay::PageOverlay;

/// Where a page is in its overlay lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderingState {
    /// Nothing rendered yet
    #[default]
    Initial,
    /// A render task has been prepared
    Running,
    /// The overlay is available
    Finished,
}

type RenderedObserver = Box<dyn FnOnce(&PageOverlay)>;

/// One page of a session.
#[derive(Default)]
pub struct PageView {
    page: u32,
    state: RenderingState,
    overlay: Option<PageOverlay>,
    observers: Vec<RenderedObserver>,
    waiters: Vec<oneshot::Sender<()>>,
}

impl std::fmt::Debug for PageView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageView")
            .field("page", &self.page)
            .field("state", &self.state)
            .field("overlay", &self.overlay.as_ref().map(|o| o.nodes.len()))
            .field("observers", &self.observers.len())
            .field("waiters", &self.waiters.len())
            .finish()
    }
}

impl PageView {
    /// Create the view of `page`.
    pub fn new(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Page index.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Current state.
    pub fn state(&self) -> RenderingState {
        self.state
    }

    /// The overlay, once rendering has finished.
    pub fn overlay(&self) -> Option<&PageOverlay> {
        match self.state {
            RenderingState::Finished => self.overlay.as_ref(),
            _ => None,
        }
    }

    /// Mutable overlay, once rendering has finished.
    pub fn overlay_mut(&mut self) -> Option<&mut PageOverlay> {
        match self.state {
            RenderingState::Finished => self.overlay.as_mut(),
            _ => None,
        }
    }

    /// Run `observer` the next time the page finishes rendering, then drop it.
    pub fn subscribe_once(&mut self, observer: impl FnOnce(&PageOverlay) + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// A receiver completed the next time the page finishes rendering.
    pub fn rendered(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.waiters.push(tx);
        rx
    }

    /// Mark a render as started.
    pub fn start(&mut self) {
        self.state = RenderingState::Running;
    }

    /// Store the finished overlay and notify observers and waiters.
    pub fn finish(&mut self, overlay: PageOverlay) {
        self.overlay = Some(overlay);
        self.state = RenderingState::Finished;
        if let Some(overlay) = &self.overlay {
            for observer in self.observers.drain(..) {
                observer(overlay);
            }
        }
        for waiter in self.waiters.drain(..) {
            // The waiter may have stopped listening.
            let _ = waiter.send(());
        }
    }

    /// Drop the overlay, e.g. after a canceled render.
    pub fn reset(&mut self) {
        self.overlay = None;
        self.state = RenderingState::Initial;
    }
}
