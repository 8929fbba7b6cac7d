//! Positioned text overlay for one page.
//!
//! The overlay is an invisible layer of text nodes laid over the rendered
//! page image so that text can be selected and highlighted. Each node
//! corresponds to exactly one [`TextFragment`](crate::content::TextFragment)
//! and records which marked-content sequence it belongs to and at which
//! character offset within that sequence it starts.
//!
//! Building happens in two passes (see [`builder`]): node creation, which
//! runs immediately, and measurement, which can be deferred and canceled
//! through an [`OverlayRenderTask`]. Measured nodes are then placed in
//! structure containers (see [`layer`]).

pub mod builder;
pub mod layer;
pub mod measure;
pub mod task;

pub use builder::{annotation_marks, create_nodes, measure_nodes};
pub use layer::{build_layer, LayerChild, OverlayContainer, OverlayLayer};
pub use measure::{FixedAdvanceMeasurer, FontFaceMeasurer, TextMeasurer};
pub use task::{CancelHandle, OverlayRenderTask};

use crate::content::McidKey;
use crate::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Severity of a validation problem attached to a marked-content sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A hard failure
    Error,
    /// Anything less severe
    Warning,
}

impl Severity {
    /// Parse the checker's problem type; anything but `"error"` is a warning.
    pub fn from_problem_type(problem_type: &str) -> Self {
        if problem_type.eq_ignore_ascii_case("error") {
            Self::Error
        } else {
            Self::Warning
        }
    }

    /// Visual class applied to marked elements.
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Error => "validation-error",
            Self::Warning => "validation-warning",
        }
    }
}

/// One positioned text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedTextNode {
    /// Text of the fragment
    pub text: String,
    /// Left edge in pixels
    pub left: f32,
    /// Top edge in pixels
    pub top: f32,
    /// Rotation in degrees, 0 if axis-aligned
    pub angle: f32,
    /// Font size in pixels
    pub font_size: f32,
    /// CSS font family
    pub font_family: String,
    /// The text is whitespace only and is never measured
    pub is_whitespace: bool,
    /// Width of the glyphs on the rendered page, when worth scaling to
    pub canvas_width: Option<f32>,
    /// Width measured with the overlay font, set by the measurement pass
    pub measured_width: Option<f32>,
    /// `canvas_width / measured_width`, when the two differ
    pub horizontal_scale: Option<f32>,
    /// Owning marked-content sequence
    pub owner: Option<McidKey>,
    /// Characters of the owning sequence that precede this node
    pub start_offset: usize,
    /// Structure element the owning sequence belongs to
    #[serde(default)]
    pub struct_parent: Option<String>,
}

impl PositionedTextNode {
    /// Length of the node's text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// The `"page/mcid"` attribute value, if the node is tagged.
    pub fn mcid_attr(&self) -> Option<String> {
        self.owner.map(|key| key.to_string())
    }

    /// Width the node occupies on screen before rotation.
    pub fn display_width(&self) -> f32 {
        self.canvas_width.or(self.measured_width).unwrap_or(0.0)
    }

    /// Local (unrotated) box of the node.
    pub fn local_rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.display_width(), self.font_size)
    }

    /// Screen bounding box of the node, accounting for rotation.
    pub fn client_rect(&self) -> Rect {
        self.local_rect().rotated_bounds(self.angle)
    }

    /// CSS transform the node needs, or an empty string.
    pub fn css_transform(&self) -> String {
        let mut parts = Vec::new();
        if self.angle != 0.0 {
            parts.push(format!("rotate({}deg)", self.angle));
        }
        if let Some(scale) = self.horizontal_scale {
            parts.push(format!("scaleX({})", scale));
        }
        parts.join(" ")
    }
}

/// A translucent mark drawn over a node whose sequence has a validation problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationMark {
    /// Sequence the mark belongs to
    pub owner: McidKey,
    /// Index of the node in [`PageOverlay::nodes`]
    pub node_index: usize,
    /// Screen box of the mark (before rotation)
    pub rect: Rect,
    /// Rotation copied from the node
    pub angle: f32,
    /// Class name derived from the severity
    pub class_name: String,
    /// Opacity of the mark
    pub opacity: f32,
}

/// The finished overlay for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageOverlay {
    /// Page index
    pub page: u32,
    /// Nodes in fragment order
    pub nodes: Vec<PositionedTextNode>,
    /// Validation marks on the annotation layer
    pub annotations: Vec<AnnotationMark>,
    /// Structure containers the measured nodes are placed in
    #[serde(default)]
    pub layer: OverlayLayer,
}

impl PageOverlay {
    /// Indices of the nodes owned by `key`, in order.
    pub fn nodes_for(&self, key: McidKey) -> impl Iterator<Item = (usize, &PositionedTextNode)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(move |(_, node)| node.owner == Some(key))
    }

    /// Index of the first node carrying any MCID.
    pub fn first_tagged(&self) -> Option<usize> {
        self.nodes.iter().position(|node| node.owner.is_some())
    }

    /// Index of the last node carrying any MCID.
    pub fn last_tagged(&self) -> Option<usize> {
        self.nodes.iter().rposition(|node| node.owner.is_some())
    }

    /// Remove every annotation mark belonging to `key`.
    pub fn clear_annotations(&mut self, key: McidKey) {
        self.annotations.retain(|mark| mark.owner != key);
    }
}
