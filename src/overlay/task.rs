//! Deferred, cancelable overlay rendering.
//!
//! Nodes are created as soon as a task is constructed. The measurement pass
//! waits for the configured delay first; canceling before it starts rejects
//! the task with [`Error::Canceled`] and no measurement work happens. Once
//! measurement has begun it runs to completion, there is no mid-pass
//! cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use super::builder::{annotation_marks, create_nodes, measure_nodes};
use super::layer::build_layer;
use super::measure::TextMeasurer;
use super::{PageOverlay, PositionedTextNode, Severity};
use crate::config::{OverlayConfig, DEFAULT_PART_ROLE};
use crate::content::{McidKey, PageStruct, TextContent};
use crate::error::{Error, Result};
use crate::geometry::Viewport;
use crate::structure::RoleResolver;

#[derive(Debug, Default)]
struct CancelState {
    canceled: AtomicBool,
    notify: Notify,
}

/// Handle used to cancel an [`OverlayRenderTask`] from elsewhere.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<CancelState>);

impl CancelHandle {
    /// Cancel the task. Has no effect once measurement has started.
    pub fn cancel(&self) {
        self.0.canceled.store(true, Ordering::SeqCst);
        // notify_one stores a permit, so a task that has not started waiting
        // yet still wakes up.
        self.0.notify.notify_one();
    }

    /// True once [`cancel`](Self::cancel) was called.
    pub fn is_canceled(&self) -> bool {
        self.0.canceled.load(Ordering::SeqCst)
    }
}

/// Rendering of one page's overlay, split around the deferral point.
#[derive(Debug)]
pub struct OverlayRenderTask {
    page: u32,
    nodes: Vec<PositionedTextNode>,
    structs: HashMap<String, PageStruct>,
    roles: RoleResolver,
    problems: HashMap<McidKey, Severity>,
    delay: Option<Duration>,
    annotation_opacity: f32,
    cancel: CancelHandle,
}

impl OverlayRenderTask {
    /// Create the page's nodes now; measurement happens in [`run`](Self::run).
    pub fn new(page: u32, content: &TextContent, viewport: &Viewport, config: &OverlayConfig) -> Self {
        let nodes = create_nodes(content, viewport, config.max_nodes);
        log::debug!("Created {} overlay nodes for page {}", nodes.len(), page);
        Self {
            page,
            nodes,
            structs: content.structs.clone(),
            roles: RoleResolver::new(&content.role_map, DEFAULT_PART_ROLE),
            problems: HashMap::new(),
            delay: config.render_delay,
            annotation_opacity: config.annotation_opacity,
            cancel: CancelHandle::default(),
        }
    }

    /// Attach validation problems to draw on the annotation layer.
    pub fn with_problems(mut self, problems: HashMap<McidKey, Severity>) -> Self {
        self.problems = problems;
        self
    }

    /// Override the measurement delay.
    pub fn with_delay(mut self, delay: Option<Duration>) -> Self {
        self.delay = delay;
        self
    }

    /// Page this task renders.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Nodes created so far (unmeasured until the task runs).
    pub fn nodes(&self) -> &[PositionedTextNode] {
        &self.nodes
    }

    /// A handle that can cancel this task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Cancel this task.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait out the deferral, failing with [`Error::Canceled`] if the task is
    /// canceled first.
    pub async fn ready(&self) -> Result<()> {
        if self.cancel.is_canceled() {
            return Err(Error::Canceled);
        }
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {},
                _ = self.cancel.0.notify.notified() => {},
            }
        }
        if self.cancel.is_canceled() {
            log::debug!("Overlay render for page {} canceled", self.page);
            return Err(Error::Canceled);
        }
        Ok(())
    }

    /// Run the measurement pass and produce the finished overlay.
    ///
    /// Fails with [`Error::Canceled`] if the task was canceled; callers that
    /// deferred should await [`ready`](Self::ready) first.
    pub fn measure(mut self, measurer: &mut dyn TextMeasurer) -> Result<PageOverlay> {
        if self.cancel.is_canceled() {
            return Err(Error::Canceled);
        }
        measure_nodes(&mut self.nodes, measurer);
        let annotations = annotation_marks(&self.nodes, &self.problems, self.annotation_opacity);
        let layer = build_layer(&self.nodes, &self.structs, &self.roles);
        Ok(PageOverlay {
            page: self.page,
            nodes: self.nodes,
            annotations,
            layer,
        })
    }

    /// Wait for the deferral and measure.
    pub async fn run(self, measurer: &mut dyn TextMeasurer) -> Result<PageOverlay> {
        self.ready().await?;
        self.measure(measurer)
    }
}
