//! The reconstruction pass.
//!
//! The structure tree is walked with an explicit stack. Children are pushed
//! in reverse so they are processed before any remaining siblings of their
//! parent, and each new node is appended to its reconstructed parent, which
//! keeps sibling order equal to source order.

use std::collections::HashMap;

use super::arena::{canonical_pdf_id, ElementId, LogicalArena, LogicalNode, TextSpan};
use super::figures::{resolve_pages, FigureProducer, PageFigures, PendingFigure};
use super::scripts::{BaselineTracker, ScriptKind};
use super::ReconstructedDocument;
use crate::config::ReconstructionConfig;
use crate::content::{McidKey, McidRun, TextFragment};
use crate::structure::{RoleResolver, StructChild, StructElem, StructTreeRoot};

/// One unit of pending work.
#[derive(Debug, Clone, Copy)]
enum WorkItem<'t> {
    Element { elem: &'t StructElem, parent: ElementId },
    Mcr { key: McidKey, parent: ElementId },
}

/// Open sub/superscript wrapper and the element it was opened in.
#[derive(Debug, Clone, Copy)]
struct ScriptWrapper {
    kind: ScriptKind,
    element: ElementId,
    parent: ElementId,
}

/// Baseline state of one block-level element.
#[derive(Debug, Default)]
struct BlockScripts {
    tracker: BaselineTracker,
    wrapper: Option<ScriptWrapper>,
}

/// Builds a [`ReconstructedDocument`] from a structure tree and grouped
/// page text.
pub struct Reconstructor<'a> {
    tree: &'a StructTreeRoot,
    config: &'a ReconstructionConfig,
    roles: RoleResolver,
    runs: &'a HashMap<McidKey, McidRun>,
    figures: Option<&'a dyn FigureProducer>,
    arena: LogicalArena,
    scripts: HashMap<ElementId, BlockScripts>,
    emptied_by_drop: Vec<ElementId>,
    figure_cache: HashMap<u32, PageFigures>,
}

impl<'a> Reconstructor<'a> {
    /// Create a reconstructor over `runs`, the text of every page grouped
    /// by marked-content sequence.
    pub fn new(
        tree: &'a StructTreeRoot,
        runs: &'a HashMap<McidKey, McidRun>,
        config: &'a ReconstructionConfig,
    ) -> Self {
        Self {
            tree,
            config,
            roles: RoleResolver::new(&tree.role_map, &config.default_part_role),
            runs,
            figures: None,
            arena: LogicalArena::new(),
            scripts: HashMap::new(),
            emptied_by_drop: Vec::new(),
            figure_cache: HashMap::new(),
        }
    }

    /// Substitute figures with markup from `producer`.
    pub fn with_figures(mut self, producer: &'a dyn FigureProducer) -> Self {
        self.figures = Some(producer);
        self
    }

    /// Run the pass to completion.
    pub async fn run(mut self) -> ReconstructedDocument {
        let mut stack: Vec<WorkItem<'a>> = Vec::new();
        let root = self.arena.root();
        let tree = self.tree;
        push_children(&mut stack, &tree.children, root);

        let mut failed_pages = Vec::new();
        loop {
            let pending = self.drain(&mut stack);
            if pending.is_empty() {
                break;
            }
            let Some(producer) = self.figures else {
                break;
            };
            resolve_pages(producer, &pending, &mut self.figure_cache).await;

            // Figures are settled in source order; children of failed ones
            // are queued so that the first failure is expanded first.
            for figure in pending.iter().rev() {
                let outcome = self.figure_cache.get(&figure.page);
                match outcome.and_then(|o| o.markup_for(&figure.pdf_id)) {
                    Some(markup) => {
                        let markup = markup.to_string();
                        self.arena
                            .append(figure.element, LogicalNode::Image { markup });
                    },
                    None => {
                        if let Some(PageFigures::Failed) = outcome {
                            if !failed_pages.contains(&figure.page) {
                                failed_pages.push(figure.page);
                            }
                        } else {
                            log::debug!("No markup for figure {} on page {}", figure.pdf_id, figure.page);
                        }
                        self.arena
                            .set_attribute(figure.element, "data-figure", "unavailable");
                        if let Some(alt) = &figure.source.alt {
                            self.arena.set_attribute(figure.element, "aria-label", alt.as_str());
                        }
                        push_children(&mut stack, &figure.source.children, figure.element);
                    },
                }
            }
        }

        self.prune_emptied();
        failed_pages.sort_unstable();
        log::debug!("Reconstructed {} logical elements", self.arena.len());
        ReconstructedDocument::new(self.arena, failed_pages)
    }

    /// Process the stack until it is empty, returning the figures deferred
    /// on the way, in source order.
    fn drain<'t>(&mut self, stack: &mut Vec<WorkItem<'t>>) -> Vec<PendingFigure<'t>> {
        let mut pending = Vec::new();
        while let Some(item) = stack.pop() {
            match item {
                WorkItem::Element { elem, parent } => {
                    if let Some(figure) = self.visit_element(elem, parent, stack) {
                        pending.push(figure);
                    }
                },
                WorkItem::Mcr { key, parent } => self.visit_mcr(key, parent),
            }
        }
        pending
    }

    fn visit_element<'t>(
        &mut self,
        elem: &'t StructElem,
        parent: ElementId,
        stack: &mut Vec<WorkItem<'t>>,
    ) -> Option<PendingFigure<'t>> {
        if self.is_hyphen_fragment(elem) {
            log::debug!("Dropping hyphenated fragment element {}", elem.pdf_id);
            self.emptied_by_drop.push(parent);
            return None;
        }

        let tag = self.roles.output_tag(&elem.struct_type);

        if tag == "table" && self.config.merge_split_tables {
            if let Some(existing) = self.continued_table(elem, parent) {
                log::debug!("Merging table {} into previous table", elem.pdf_id);
                push_children(stack, &elem.children, existing);
                return None;
            }
        }

        let block = self.roles.is_block(&elem.struct_type);
        let id = self
            .arena
            .create(parent, &tag, Some(elem.pdf_id.as_str()), block);
        if tag == "a" {
            if let Some(uri) = &elem.uri {
                self.arena.set_attribute(id, "href", uri.as_str());
            }
        }

        if self.figures.is_some() && self.roles.resolve(&elem.struct_type) == "Figure" {
            if let (Some(page), Some(pdf_id)) = (elem.page, canonical_pdf_id(&elem.pdf_id)) {
                return Some(PendingFigure {
                    element: id,
                    pdf_id,
                    page,
                    source: elem,
                });
            }
        }

        push_children(stack, &elem.children, id);
        None
    }

    fn visit_mcr(&mut self, key: McidKey, parent: ElementId) {
        let runs = self.runs;
        let Some(run) = runs.get(&key) else {
            log::debug!("No text for marked content {}", key);
            return;
        };
        for piece in &run.fragments {
            let text = self.displayed_text(&piece.fragment);
            if text.is_empty() {
                continue;
            }
            let span = LogicalNode::Text(TextSpan {
                key,
                start_offset: piece.start_offset,
                text,
                source_len: piece.fragment.char_len(),
                class: None,
            });
            let target = self.script_target(parent, &piece.fragment);
            self.arena.append(target, span);
        }
    }

    /// Text of a fragment as shown in the reflowed document.
    fn displayed_text(&self, fragment: &TextFragment) -> String {
        let text = fragment.text.as_str();
        if self.config.join_hyphenated_words && fragment.eol_hyphen {
            if let Some(stripped) = text
                .strip_suffix('-')
                .or_else(|| text.strip_suffix('\u{ad}'))
            {
                return stripped.to_string();
            }
        }
        text.to_string()
    }

    /// Element a fragment's span goes into: `parent`, or a sub/sup wrapper
    /// inside it.
    ///
    /// The baseline is tracked per enclosing block, so a script tagged in
    /// its own inline child still compares against the surrounding line.
    fn script_target(&mut self, parent: ElementId, fragment: &TextFragment) -> ElementId {
        if !self.config.detect_scripts {
            return parent;
        }
        let block = self.enclosing_block(parent);
        let state = self.scripts.entry(block).or_default();
        let Some(kind) = state.tracker.classify(fragment) else {
            state.wrapper = None;
            return parent;
        };

        let last_is_wrapper = |arena: &LogicalArena, wrapper: ElementId| {
            arena
                .get(parent)
                .and_then(|p| p.children.last())
                .is_some_and(|last| matches!(last, LogicalNode::Element { id } if *id == wrapper))
        };
        if let Some(wrapper) = state.wrapper {
            if wrapper.kind == kind
                && wrapper.parent == parent
                && last_is_wrapper(&self.arena, wrapper.element)
            {
                return wrapper.element;
            }
        }

        let element = self.arena.create(parent, kind.tag(), None, false);
        state.wrapper = Some(ScriptWrapper {
            kind,
            element,
            parent,
        });
        element
    }

    /// Nearest block-level element at or above `id`, else the root.
    fn enclosing_block(&self, id: ElementId) -> ElementId {
        let root = self.arena.root();
        let mut current = id;
        while current != root {
            match self.arena.get(current) {
                Some(elem) if elem.block => return current,
                Some(elem) => current = elem.parent.unwrap_or(root),
                None => break,
            }
        }
        root
    }

    /// An element whose only content is a line-break hyphen fragment.
    fn is_hyphen_fragment(&self, elem: &StructElem) -> bool {
        match elem.children.as_slice() {
            [StructChild::MarkedContentRef { mcid, page }] => self
                .runs
                .get(&McidKey::new(*page, *mcid))
                .is_some_and(McidRun::is_hyphen_artifact),
            _ => false,
        }
    }

    /// The existing table `elem` continues, if any.
    ///
    /// The parent's most recent child element must be a table whose last
    /// row has as many cells as the first row of `elem`.
    fn continued_table(&self, elem: &StructElem, parent: ElementId) -> Option<ElementId> {
        let existing = self.arena.last_child_element(parent)?;
        if self.arena.get(existing)?.tag != "table" {
            return None;
        }
        let new_cells = self.first_row_cells(elem)?;
        let last_row = *self.arena.descendants_with_tag(existing, "tr").last()?;
        let existing_cells = self.arena.get(last_row)?.child_elements().count();
        (new_cells == existing_cells).then_some(existing)
    }

    /// Cell count of the first row of a table structure element, looking
    /// through row groups.
    fn first_row_cells(&self, table: &StructElem) -> Option<usize> {
        let mut stack: Vec<&StructElem> = table.child_elements().collect();
        stack.reverse();
        while let Some(elem) = stack.pop() {
            match self.roles.output_tag(&elem.struct_type).as_str() {
                "tr" => return Some(elem.child_elements().count()),
                "thead" | "tbody" | "tfoot" => {
                    let mut children: Vec<&StructElem> = elem.child_elements().collect();
                    children.reverse();
                    stack.extend(children);
                },
                _ => {},
            }
        }
        None
    }

    /// Remove parents left without children by hyphen drops, walking up.
    fn prune_emptied(&mut self) {
        let root = self.arena.root();
        for mut id in std::mem::take(&mut self.emptied_by_drop) {
            while id != root {
                let Some(elem) = self.arena.get(id) else {
                    break;
                };
                if !elem.children.is_empty() {
                    break;
                }
                let parent = elem.parent.unwrap_or(root);
                self.arena.detach(id);
                id = parent;
            }
        }
    }
}

fn push_children<'t>(stack: &mut Vec<WorkItem<'t>>, children: &'t [StructChild], parent: ElementId) {
    for child in children.iter().rev() {
        stack.push(match child {
            StructChild::Element(elem) => WorkItem::Element {
                elem: elem.as_ref(),
                parent,
            },
            StructChild::MarkedContentRef { mcid, page } => WorkItem::Mcr {
                key: McidKey::new(*page, *mcid),
                parent,
            },
        });
    }
}
