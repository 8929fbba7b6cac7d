//! Configuration for overlay building and document reconstruction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default cap on positioned text nodes per page.
pub const MAX_TEXT_NODES_TO_RENDER: usize = 100_000;

/// Role a `Part` element takes when the RoleMap does not name one.
pub const DEFAULT_PART_ROLE: &str = "section";

/// Overlay building configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// Stop creating nodes for a page after this many.
    pub max_nodes: usize,

    /// Delay before the measurement pass runs; `None` runs it immediately.
    pub render_delay: Option<Duration>,

    /// Opacity of validation annotation marks.
    pub annotation_opacity: f32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            max_nodes: MAX_TEXT_NODES_TO_RENDER,
            render_delay: None,
            annotation_opacity: 0.2,
        }
    }

    /// Set the node cap.
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Defer the measurement pass.
    pub fn with_render_delay(mut self, delay: Duration) -> Self {
        self.render_delay = Some(delay);
        self
    }

    /// Set the annotation mark opacity.
    pub fn with_annotation_opacity(mut self, opacity: f32) -> Self {
        self.annotation_opacity = opacity;
        self
    }
}

/// Reconstruction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconstructionConfig {
    /// Merge tables split across pages when their row shapes match.
    pub merge_split_tables: bool,

    /// Wrap shifted-baseline runs in `sup`/`sub`.
    pub detect_scripts: bool,

    /// Drop the trailing hyphen of line-break hyphenated spans.
    pub join_hyphenated_words: bool,

    /// Role used for a missing `Part` entry in the role map.
    pub default_part_role: String,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconstructionConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            merge_split_tables: true,
            detect_scripts: true,
            join_hyphenated_words: true,
            default_part_role: DEFAULT_PART_ROLE.to_string(),
        }
    }

    /// Enable table merging.
    pub fn with_table_merging(mut self, enable: bool) -> Self {
        self.merge_split_tables = enable;
        self
    }

    /// Enable sub/superscript detection.
    pub fn with_script_detection(mut self, enable: bool) -> Self {
        self.detect_scripts = enable;
        self
    }

    /// Enable hyphenation joins.
    pub fn with_hyphen_joining(mut self, enable: bool) -> Self {
        self.join_hyphenated_words = enable;
        self
    }
}

/// Everything a [`DocumentSession`](crate::session::DocumentSession) needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Overlay settings
    pub overlay: OverlayConfig,
    /// Reconstruction settings
    pub reconstruction: ReconstructionConfig,
}

impl SessionConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the overlay settings.
    pub fn with_overlay(mut self, overlay: OverlayConfig) -> Self {
        self.overlay = overlay;
        self
    }

    /// Replace the reconstruction settings.
    pub fn with_reconstruction(mut self, reconstruction: ReconstructionConfig) -> Self {
        self.reconstruction = reconstruction;
        self
    }
}
