//! Reflow reconstruction from the structure tree.
//!
//! Walks the document's structure tree and produces a logical tree whose
//! text spans point back into the page text by `(page, mcid, offset)`.
//! The result is kept in a [`LogicalArena`] and can be serialized to
//! markup, marked with validation classes, and queried by range (see
//! [`crate::range`]).

mod arena;
mod builder;
mod figures;
mod markup;
mod scripts;

pub use arena::{canonical_pdf_id, ElementId, LogicalArena, LogicalElement, LogicalNode, TextSpan};
pub use builder::Reconstructor;
pub use figures::FigureProducer;
pub use markup::escape_html;
pub use scripts::{BaselineTracker, ScriptKind};

use std::collections::HashMap;

use crate::config::ReconstructionConfig;
use crate::content::{McidKey, McidRun};
use crate::structure::StructTreeRoot;

/// Result of one reconstruction pass.
#[derive(Debug, Clone)]
pub struct ReconstructedDocument {
    arena: LogicalArena,
    failed_figure_pages: Vec<u32>,
}

impl ReconstructedDocument {
    pub(crate) fn new(arena: LogicalArena, failed_figure_pages: Vec<u32>) -> Self {
        Self {
            arena,
            failed_figure_pages,
        }
    }

    /// The logical tree.
    pub fn arena(&self) -> &LogicalArena {
        &self.arena
    }

    /// Pages whose figure job failed, ascending.
    pub fn failed_figure_pages(&self) -> &[u32] {
        &self.failed_figure_pages
    }

    /// Serialize the tree to markup.
    pub fn to_markup(&self) -> String {
        markup::write_document(&self.arena)
    }

    /// Add `class` to every span of `key`; returns the number of spans marked.
    pub fn mark_class(&mut self, key: McidKey, class: &str) -> usize {
        self.arena.for_each_span_mut(key, |span| {
            let already = span
                .class
                .as_deref()
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class));
            if already {
                return;
            }
            span.class = Some(match span.class.take() {
                Some(existing) => format!("{} {}", existing, class),
                None => class.to_string(),
            });
        })
    }

    /// Spans of `key`, in document order.
    pub fn spans_for(&self, key: McidKey) -> Vec<&TextSpan> {
        self.arena
            .spans()
            .into_iter()
            .filter(|span| span.key == key)
            .collect()
    }
}

/// Run one reconstruction pass.
pub async fn reconstruct(
    tree: &StructTreeRoot,
    runs: &HashMap<McidKey, McidRun>,
    config: &ReconstructionConfig,
    figures: Option<&dyn FigureProducer>,
) -> ReconstructedDocument {
    let reconstructor = Reconstructor::new(tree, runs, config);
    match figures {
        Some(producer) => reconstructor.with_figures(producer).run().await,
        None => reconstructor.run().await,
    }
}
