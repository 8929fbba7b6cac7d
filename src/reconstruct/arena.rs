//! Arena of reconstructed logical elements.
//!
//! Elements live in a flat vector and refer to each other by [`ElementId`].
//! Structure element ids are canonicalized once, when the element is
//! inserted, so later lookups never have to guess at id variants.

use indexmap::IndexMap;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

use crate::content::McidKey;

/// Index of an element in a [`LogicalArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ElementId(pub usize);

/// Canonical form of a structure element id.
///
/// Revisions of an element share the id prefix before the first `_`
/// (`"12R"` and `"12R_3"` are the same element). Surrounding whitespace is
/// ignored; an empty id has no canonical form.
pub fn canonical_pdf_id(pdf_id: &str) -> Option<String> {
    let base = pdf_id.trim().split('_').next().unwrap_or_default().trim();
    if base.is_empty() {
        None
    } else {
        Some(base.to_string())
    }
}

/// A run of marked-content text placed in the logical tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSpan {
    /// Sequence the text comes from
    pub key: McidKey,
    /// Characters of the sequence preceding this span
    pub start_offset: usize,
    /// Text as shown in the reflowed document
    pub text: String,
    /// Length in characters of the source fragment, which can exceed the
    /// displayed text when a line-break hyphen was removed
    pub source_len: usize,
    /// Validation class, if any
    pub class: Option<String>,
}

impl TextSpan {
    /// Length of the displayed text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Offset just past the span's source fragment within its sequence.
    pub fn source_end(&self) -> usize {
        self.start_offset + self.source_len
    }
}

/// A child of a logical element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LogicalNode {
    /// A nested element
    Element {
        /// The element's id
        id: ElementId,
    },
    /// Marked-content text
    Text(TextSpan),
    /// Generated figure markup, inserted verbatim
    Image {
        /// Markup produced by the figure producer
        markup: String,
    },
}

/// A reconstructed element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalElement {
    /// Output tag name
    pub tag: String,
    /// Canonical structure element id, if the element came from one
    pub pdf_id: Option<String>,
    /// Attributes in insertion order (`pdfid`, `href`, ...)
    pub attributes: IndexMap<String, String>,
    /// Placed at block level
    pub block: bool,
    /// Parent element, `None` only for the root
    pub parent: Option<ElementId>,
    /// Children in document order
    pub children: Vec<LogicalNode>,
}

impl LogicalElement {
    /// Ids of child elements, in order.
    pub fn child_elements(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children.iter().filter_map(|child| match child {
            LogicalNode::Element { id } => Some(*id),
            _ => None,
        })
    }
}

/// Flat storage for one reconstruction pass.
///
/// Only the elements are serialized; the pdf-id index is rebuilt when an
/// arena is deserialized.
#[derive(Debug, Clone, Serialize)]
pub struct LogicalArena {
    elements: Vec<LogicalElement>,
    #[serde(skip)]
    by_pdf_id: HashMap<String, ElementId>,
}

impl Default for LogicalArena {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de> Deserialize<'de> for LogicalArena {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Stored {
            elements: Vec<LogicalElement>,
        }

        let stored = Stored::deserialize(deserializer)?;
        if stored.elements.is_empty() {
            return Err(de::Error::custom("logical arena has no root element"));
        }
        let mut arena = Self {
            elements: stored.elements,
            by_pdf_id: HashMap::new(),
        };
        arena.reindex();
        Ok(arena)
    }
}

impl LogicalArena {
    /// Create an arena holding just the root container.
    pub fn new() -> Self {
        Self {
            elements: vec![LogicalElement {
                tag: "div".to_string(),
                pdf_id: None,
                attributes: IndexMap::new(),
                block: true,
                parent: None,
                children: Vec::new(),
            }],
            by_pdf_id: HashMap::new(),
        }
    }

    /// The root container.
    pub fn root(&self) -> ElementId {
        ElementId(0)
    }

    /// Number of elements, root included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if only the root exists.
    pub fn is_empty(&self) -> bool {
        self.elements.len() == 1
    }

    /// Element by id.
    pub fn get(&self, id: ElementId) -> Option<&LogicalElement> {
        self.elements.get(id.0)
    }

    /// Mutable element by id.
    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut LogicalElement> {
        self.elements.get_mut(id.0)
    }

    /// Element created for a structure element id (any revision of it).
    pub fn by_pdf_id(&self, pdf_id: &str) -> Option<ElementId> {
        canonical_pdf_id(pdf_id).and_then(|id| self.by_pdf_id.get(&id).copied())
    }

    /// Create an element and append it to `parent`.
    ///
    /// An unknown parent falls back to the root.
    pub fn create(&mut self, parent: ElementId, tag: &str, pdf_id: Option<&str>, block: bool) -> ElementId {
        let parent = if parent.0 < self.elements.len() {
            parent
        } else {
            log::warn!("Unknown parent element {:?}, attaching to root", parent);
            self.root()
        };
        let id = ElementId(self.elements.len());
        let canonical = pdf_id.and_then(canonical_pdf_id);

        let mut attributes = IndexMap::new();
        if let Some(canonical) = &canonical {
            attributes.insert("pdfid".to_string(), canonical.clone());
            self.by_pdf_id.insert(canonical.clone(), id);
        }

        self.elements.push(LogicalElement {
            tag: tag.to_string(),
            pdf_id: canonical,
            attributes,
            block,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.elements[parent.0].children.push(LogicalNode::Element { id });
        id
    }

    /// Append a non-element child to `parent`.
    pub fn append(&mut self, parent: ElementId, node: LogicalNode) {
        if let Some(elem) = self.elements.get_mut(parent.0) {
            elem.children.push(node);
        }
    }

    /// Set an attribute on an element.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: impl Into<String>) {
        if let Some(elem) = self.elements.get_mut(id.0) {
            elem.attributes.insert(name.to_string(), value.into());
        }
    }

    /// The most recently appended child element of `parent`.
    pub fn last_child_element(&self, parent: ElementId) -> Option<ElementId> {
        self.get(parent)?
            .children
            .iter()
            .rev()
            .find_map(|child| match child {
                LogicalNode::Element { id } => Some(*id),
                _ => None,
            })
    }

    /// Detach `id` from its parent. The element stays in the arena but is no
    /// longer reachable from the root.
    pub fn detach(&mut self, id: ElementId) {
        let Some(parent) = self.get(id).and_then(|e| e.parent) else {
            return;
        };
        if let Some(parent) = self.elements.get_mut(parent.0) {
            parent
                .children
                .retain(|child| !matches!(child, LogicalNode::Element { id: c } if *c == id));
        }
        if let Some(pdf_id) = self.elements[id.0].pdf_id.clone() {
            if self.by_pdf_id.get(&pdf_id) == Some(&id) {
                self.by_pdf_id.remove(&pdf_id);
            }
        }
    }

    /// Elements with tag `tag` under `id`, in document order (preorder).
    pub fn descendants_with_tag(&self, id: ElementId, tag: &str) -> Vec<ElementId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let Some(elem) = self.get(current) else {
                continue;
            };
            if current != id && elem.tag == tag {
                found.push(current);
            }
            let children: Vec<ElementId> = elem.child_elements().collect();
            stack.extend(children.into_iter().rev());
        }
        found
    }

    fn reindex(&mut self) {
        self.by_pdf_id = self
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.pdf_id.clone().map(|id| (id, ElementId(i))))
            .collect();
    }

    /// Visit every text span reachable from the root, in document order.
    pub fn spans(&self) -> Vec<&TextSpan> {
        let mut spans = Vec::new();
        self.collect_spans(self.root(), &mut spans);
        spans
    }

    fn collect_spans<'a>(&'a self, id: ElementId, out: &mut Vec<&'a TextSpan>) {
        let Some(elem) = self.get(id) else {
            return;
        };
        for child in &elem.children {
            match child {
                LogicalNode::Element { id } => self.collect_spans(*id, out),
                LogicalNode::Text(span) => out.push(span),
                LogicalNode::Image { .. } => {},
            }
        }
    }

    /// Apply `f` to every reachable text span of `key`; returns how many matched.
    pub fn for_each_span_mut(&mut self, key: McidKey, mut f: impl FnMut(&mut TextSpan)) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let Some(elem) = self.elements.get_mut(id.0) else {
                continue;
            };
            for child in elem.children.iter_mut() {
                match child {
                    LogicalNode::Element { id } => stack.push(*id),
                    LogicalNode::Text(span) if span.key == key => {
                        f(span);
                        count += 1;
                    },
                    _ => {},
                }
            }
        }
        count
    }
}
