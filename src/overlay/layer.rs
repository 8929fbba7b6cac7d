//! Structure containers of the overlay.
//!
//! Measured nodes are not laid out flat: each tagged node is placed inside
//! an element for its parent structure element, and that element inside
//! elements for its ancestors, up to the nearest block-level ancestor. The
//! block element (or the topmost ancestor the page knows, when none is a
//! block) sits at the root of the layer. Containers are created once per
//! structure element and shared by every node below them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PositionedTextNode;
use crate::content::PageStruct;
use crate::structure::{RoleResolver, StructType};

/// An entry of the layer root or of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum LayerChild {
    /// Index into [`OverlayLayer::containers`]
    Container(usize),
    /// Index into [`PageOverlay::nodes`](super::PageOverlay::nodes)
    Node(usize),
}

/// Element standing for one structure element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayContainer {
    /// Id of the structure element
    pub struct_id: String,
    /// Output tag
    pub tag: String,
    /// The element is block level
    pub block: bool,
    /// Enclosing container, `None` at the layer root
    pub parent: Option<usize>,
    /// Entries in insertion order
    pub children: Vec<LayerChild>,
}

/// Placement of a page's measured nodes in structure containers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayLayer {
    /// Every container created for the page
    pub containers: Vec<OverlayContainer>,
    /// Entries at the layer root, in insertion order
    pub children: Vec<LayerChild>,
}

impl OverlayLayer {
    /// Container directly holding node `node_index`, if any.
    pub fn container_of(&self, node_index: usize) -> Option<usize> {
        self.containers
            .iter()
            .position(|c| c.children.contains(&LayerChild::Node(node_index)))
    }

    /// Nearest block-level container enclosing node `node_index`.
    pub fn block_of(&self, node_index: usize) -> Option<usize> {
        let mut current = self.container_of(node_index);
        while let Some(index) = current {
            let container = &self.containers[index];
            if container.block {
                return Some(index);
            }
            current = container.parent;
        }
        None
    }

    /// Node indices below container `index`, in layer order.
    pub fn nodes_in(&self, index: usize) -> Vec<usize> {
        let mut out = Vec::new();
        self.collect_nodes(index, &mut out);
        out
    }

    fn collect_nodes(&self, index: usize, out: &mut Vec<usize>) {
        for child in &self.containers[index].children {
            match *child {
                LayerChild::Node(node) => out.push(node),
                LayerChild::Container(inner) => self.collect_nodes(inner, out),
            }
        }
    }

    fn create(&mut self, struct_id: &str, entry: &PageStruct, roles: &RoleResolver) -> usize {
        let struct_type = StructType::from_name(&entry.struct_type);
        self.containers.push(OverlayContainer {
            struct_id: struct_id.to_string(),
            tag: roles.output_tag(&struct_type),
            block: roles.is_block(&struct_type),
            parent: None,
            children: Vec::new(),
        });
        self.containers.len() - 1
    }

    fn attach(&mut self, parent: usize, child: usize) {
        self.containers[child].parent = Some(parent);
        self.containers[parent].children.push(LayerChild::Container(child));
    }
}

/// Build the layer for measured `nodes`.
///
/// Whitespace nodes and nodes that measured to zero width are left out.
/// Untagged nodes, and tagged nodes whose parent the page does not describe,
/// go to the layer root.
pub fn build_layer(
    nodes: &[PositionedTextNode],
    structs: &HashMap<String, PageStruct>,
    roles: &RoleResolver,
) -> OverlayLayer {
    let mut layer = OverlayLayer::default();
    let mut created: HashMap<&str, usize> = HashMap::new();

    for (index, node) in nodes.iter().enumerate() {
        if node.is_whitespace || !node.measured_width.is_some_and(|w| w > 0.0) {
            continue;
        }
        let parent = node
            .struct_parent
            .as_deref()
            .filter(|_| node.owner.is_some())
            .and_then(|id| structs.get_key_value(id));
        match parent {
            Some((id, entry)) => {
                let container = place_chain(&mut layer, &mut created, (id, entry), structs, roles);
                layer.containers[container].children.push(LayerChild::Node(index));
            },
            None => layer.children.push(LayerChild::Node(index)),
        }
    }

    layer
}

/// Container for `id`, creating it and any missing ancestors on the way up.
fn place_chain<'s>(
    layer: &mut OverlayLayer,
    created: &mut HashMap<&'s str, usize>,
    (id, mut current): (&'s String, &'s PageStruct),
    structs: &'s HashMap<String, PageStruct>,
    roles: &RoleResolver,
) -> usize {
    if let Some(&existing) = created.get(id.as_str()) {
        return existing;
    }

    let first = layer.create(id, current, roles);
    created.insert(id.as_str(), first);
    let mut child = first;

    loop {
        if layer.containers[child].block {
            layer.children.push(LayerChild::Container(child));
            break;
        }
        let next = current
            .parent_id
            .as_deref()
            .and_then(|pid| structs.get_key_value(pid));
        let Some((pid, entry)) = next else {
            layer.children.push(LayerChild::Container(child));
            break;
        };
        if let Some(&existing) = created.get(pid.as_str()) {
            layer.attach(existing, child);
            break;
        }
        let parent = layer.create(pid, entry, roles);
        created.insert(pid.as_str(), parent);
        layer.attach(parent, child);
        current = entry;
        child = parent;
    }

    first
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::McidKey;

    fn node(text: &str, parent: Option<&str>, width: f32) -> PositionedTextNode {
        PositionedTextNode {
            text: text.to_string(),
            left: 0.0,
            top: 0.0,
            angle: 0.0,
            font_size: 10.0,
            font_family: "serif".to_string(),
            is_whitespace: text.trim().is_empty(),
            canvas_width: None,
            measured_width: Some(width),
            horizontal_scale: None,
            owner: parent.map(|_| McidKey::new(0, 0)),
            start_offset: 0,
            struct_parent: parent.map(str::to_string),
        }
    }

    fn structs(entries: &[(&str, &str, Option<&str>)]) -> HashMap<String, PageStruct> {
        entries
            .iter()
            .map(|(id, s, parent)| {
                (
                    id.to_string(),
                    PageStruct {
                        struct_type: s.to_string(),
                        parent_id: parent.map(str::to_string),
                    },
                )
            })
            .collect()
    }

    fn roles() -> RoleResolver {
        RoleResolver::new(&HashMap::new(), "section")
    }

    #[test]
    fn test_chain_stops_at_block() {
        let structs = structs(&[
            ("1R", "Document", None),
            ("2R", "P", Some("1R")),
            ("3R", "Span", Some("2R")),
        ]);
        let nodes = vec![node("Hello", Some("3R"), 20.0), node("World", Some("2R"), 20.0)];
        let layer = build_layer(&nodes, &structs, &roles());

        // Document is above the block and never gets a container.
        assert_eq!(layer.containers.len(), 2);
        assert_eq!(layer.children, vec![LayerChild::Container(1)]);
        let p = &layer.containers[1];
        assert_eq!((p.tag.as_str(), p.block), ("p", true));
        assert_eq!(p.children, vec![LayerChild::Container(0), LayerChild::Node(1)]);
        assert_eq!(layer.containers[0].tag, "span");
        assert_eq!(layer.container_of(0), Some(0));
        assert_eq!(layer.block_of(0), Some(1));
        assert_eq!(layer.nodes_in(1), vec![0, 1]);
    }

    #[test]
    fn test_chain_without_block_roots_topmost() {
        let structs = structs(&[("1R", "Sect", None), ("2R", "Link", Some("1R"))]);
        let nodes = vec![node("here", Some("2R"), 20.0)];
        let layer = build_layer(&nodes, &structs, &roles());

        assert_eq!(layer.containers.len(), 2);
        assert_eq!(layer.children, vec![LayerChild::Container(1)]);
        assert_eq!(layer.containers[1].tag, "section");
        assert_eq!(layer.containers[0].tag, "a");
        assert_eq!(layer.block_of(0), None);
    }

    #[test]
    fn test_unplaced_nodes() {
        let structs = structs(&[("2R", "P", None)]);
        let nodes = vec![
            node("Page 1", None, 20.0),
            node(" ", Some("2R"), 5.0),
            node("empty", Some("2R"), 0.0),
            node("lost", Some("9R"), 20.0),
        ];
        let layer = build_layer(&nodes, &structs, &roles());

        assert!(layer.containers.is_empty());
        assert_eq!(layer.children, vec![LayerChild::Node(0), LayerChild::Node(3)]);
    }

    #[test]
    fn test_serialized_children() {
        let json = serde_json::to_string(&LayerChild::Container(2)).unwrap();
        assert_eq!(json, r#"{"kind":"container","index":2}"#);
    }
}
