//! The two overlay passes: node creation and measurement.
//!
//! Node creation projects every fragment and assigns per-MCID start offsets.
//! Measurement resolves the overlay font, measures each non-whitespace node
//! and records the horizontal scale needed to make the node span the same
//! width as the glyphs on the page.

use std::collections::HashMap;

use super::measure::TextMeasurer;
use super::{AnnotationMark, PositionedTextNode, Severity};
use crate::content::{FontStyle, McidKey, TextContent};
use crate::geometry::{project_fragment, Rect, Viewport};

/// Create one node per fragment, stopping at `max_nodes`.
pub fn create_nodes(
    content: &TextContent,
    viewport: &Viewport,
    max_nodes: usize,
) -> Vec<PositionedTextNode> {
    let default_style = FontStyle::default();
    let mut offsets: HashMap<McidKey, usize> = HashMap::new();
    let mut nodes = Vec::with_capacity(content.items.len().min(max_nodes));

    for fragment in &content.items {
        if nodes.len() >= max_nodes {
            log::warn!(
                "Text node cap of {} reached, skipping {} remaining fragments",
                max_nodes,
                content.items.len() - nodes.len()
            );
            break;
        }

        let style = content
            .styles
            .get(&fragment.font_name)
            .unwrap_or(&default_style);
        let owner = fragment.mcid_key();
        let start_offset = match owner {
            Some(key) => {
                let offset = offsets.entry(key).or_insert(0);
                let start = *offset;
                *offset += fragment.char_len();
                start
            },
            None => 0,
        };

        let projection = project_fragment(viewport, fragment, style);
        nodes.push(PositionedTextNode {
            text: fragment.text.clone(),
            left: projection.left,
            top: projection.top,
            angle: projection.angle,
            font_size: projection.font_size,
            font_family: style.font_family.clone(),
            is_whitespace: fragment.is_whitespace_only(),
            canvas_width: projection.canvas_width,
            measured_width: None,
            horizontal_scale: None,
            owner,
            start_offset,
            struct_parent: owner.and(fragment.parent_id.clone()),
        });
    }

    nodes
}

/// Measure every non-whitespace node and set its horizontal scale.
pub fn measure_nodes(nodes: &mut [PositionedTextNode], measurer: &mut dyn TextMeasurer) {
    let mut last_font: Option<(f32, String)> = None;

    for node in nodes.iter_mut() {
        if node.is_whitespace {
            continue;
        }

        let same_font = last_font
            .as_ref()
            .is_some_and(|(size, family)| *size == node.font_size && *family == node.font_family);
        if !same_font {
            measurer.set_font(node.font_size, &node.font_family);
            last_font = Some((node.font_size, node.font_family.clone()));
        }

        let width = measurer.measure(&node.text);
        node.measured_width = Some(width);
        if width > 0.0 {
            if let Some(canvas_width) = node.canvas_width {
                let scale = canvas_width / width;
                if (scale - 1.0).abs() > f32::EPSILON {
                    node.horizontal_scale = Some(scale);
                }
            }
        }
    }
}

/// Marks for every measured node whose sequence has a validation problem.
pub fn annotation_marks(
    nodes: &[PositionedTextNode],
    problems: &HashMap<McidKey, Severity>,
    opacity: f32,
) -> Vec<AnnotationMark> {
    if problems.is_empty() {
        return Vec::new();
    }
    nodes
        .iter()
        .enumerate()
        .filter_map(|(node_index, node)| {
            let owner = node.owner?;
            let severity = problems.get(&owner)?;
            let measured = node.measured_width.filter(|w| *w > 0.0)?;
            let width = node.canvas_width.unwrap_or(measured);
            Some(AnnotationMark {
                owner,
                node_index,
                rect: Rect::new(node.left, node.top, width, node.font_size),
                angle: node.angle,
                class_name: severity.class_name().to_string(),
                opacity,
            })
        })
        .collect()
}
