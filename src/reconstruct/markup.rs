//! Serialization of the logical tree to markup.

use super::arena::{ElementId, LogicalArena, LogicalNode, TextSpan};

/// Escape HTML special characters in text and attribute values.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Serialize everything under the root (the root itself is not emitted).
pub fn write_document(arena: &LogicalArena) -> String {
    let mut out = String::new();
    if let Some(root) = arena.get(arena.root()) {
        for child in &root.children {
            write_node(arena, child, &mut out);
        }
    }
    out
}

fn write_node(arena: &LogicalArena, node: &LogicalNode, out: &mut String) {
    match node {
        LogicalNode::Element { id } => write_element(arena, *id, out),
        LogicalNode::Text(span) => write_span(span, out),
        // Producer markup is inserted as-is.
        LogicalNode::Image { markup } => out.push_str(markup),
    }
}

fn write_element(arena: &LogicalArena, id: ElementId, out: &mut String) {
    let Some(elem) = arena.get(id) else {
        return;
    };
    out.push('<');
    out.push_str(&elem.tag);
    for (name, value) in &elem.attributes {
        out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
    }
    out.push('>');
    for child in &elem.children {
        write_node(arena, child, out);
    }
    out.push_str("</");
    out.push_str(&elem.tag);
    out.push('>');
    if elem.block {
        out.push('\n');
    }
}

fn write_span(span: &TextSpan, out: &mut String) {
    out.push_str(&format!(
        "<span mcid=\"{}\" startoffset=\"{}\"",
        span.key, span.start_offset
    ));
    if let Some(class) = &span.class {
        out.push_str(&format!(" class=\"{}\"", escape_html(class)));
    }
    out.push('>');
    out.push_str(&escape_html(&span.text));
    out.push_str("</span>");
}
