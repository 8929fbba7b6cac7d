//! Role resolution: structure types to output tags.
//!
//! Custom structure types are first resolved through the document's RoleMap
//! (which may chain), then mapped onto an output tag name. Link and Document
//! are remapped explicitly (`a` and `div`); a small fixed set of roles is
//! always placed at block level.

use lazy_static::lazy_static;
use phf::{phf_map, phf_set};
use regex::Regex;
use std::collections::HashMap;

use super::types::StructType;

/// Longest RoleMap chain followed before giving up.
const MAX_ROLE_MAP_DEPTH: usize = 8;

static OUTPUT_TAGS: phf::Map<&'static str, &'static str> = phf_map! {
    "Link" => "a",
    "Document" => "div",
    "Part" => "section",
    "Art" => "article",
    "Sect" => "section",
    "Div" => "div",
    "BlockQuote" => "blockquote",
    "Caption" => "caption",
    "P" => "p",
    "H" => "h1",
    "H1" => "h1",
    "H2" => "h2",
    "H3" => "h3",
    "H4" => "h4",
    "H5" => "h5",
    "H6" => "h6",
    "L" => "ul",
    "LI" => "li",
    "Lbl" => "span",
    "LBody" => "span",
    "Table" => "table",
    "TR" => "tr",
    "TH" => "th",
    "TD" => "td",
    "THead" => "thead",
    "TBody" => "tbody",
    "TFoot" => "tfoot",
    "Span" => "span",
    "Quote" => "q",
    "Note" => "aside",
    "Reference" => "span",
    "BibEntry" => "p",
    "Code" => "code",
    "Annot" => "span",
    "Figure" => "figure",
    "Formula" => "figure",
    "Form" => "form",
};

// Compared upper-cased, so "Table", "TABLE" and "table" all qualify.
static BLOCK_ROLES: phf::Set<&'static str> = phf_set! {
    "P", "H", "H1", "H2", "H3", "H4", "H5", "H6",
    "L", "LBL", "LI", "LBODY", "TABLE",
};

lazy_static! {
    static ref TAG_NAME_RE: Regex = Regex::new(r"^[A-Za-z][A-Za-z0-9-]*$").expect("static tag pattern");
}

/// Role resolution bound to one document's RoleMap.
#[derive(Debug, Clone)]
pub struct RoleResolver {
    role_map: HashMap<String, String>,
}

impl RoleResolver {
    /// Build a resolver, filling in `Part → default_part_role` when the
    /// document does not map `Part` itself.
    pub fn new(role_map: &HashMap<String, String>, default_part_role: &str) -> Self {
        let mut role_map = role_map.clone();
        role_map
            .entry("Part".to_string())
            .or_insert_with(|| default_part_role.to_string());
        Self { role_map }
    }

    /// Follow the RoleMap from `struct_type` to the role it finally stands for.
    ///
    /// Cycles and overly long chains stop at the last name reached.
    pub fn resolve(&self, struct_type: &StructType) -> String {
        let mut role = struct_type.name().to_string();
        for _ in 0..MAX_ROLE_MAP_DEPTH {
            match self.role_map.get(&role) {
                Some(next) if next != &role => role = next.clone(),
                _ => break,
            }
        }
        role
    }

    /// Output tag for a structure type.
    pub fn output_tag(&self, struct_type: &StructType) -> String {
        tag_for_role(&self.resolve(struct_type))
    }

    /// True if the element is always placed at block level.
    ///
    /// Either the raw type or its direct RoleMap target may qualify.
    pub fn is_block(&self, struct_type: &StructType) -> bool {
        let name = struct_type.name();
        if BLOCK_ROLES.contains(name.to_ascii_uppercase().as_str()) {
            return true;
        }
        self.role_map
            .get(name)
            .is_some_and(|mapped| BLOCK_ROLES.contains(mapped.to_ascii_uppercase().as_str()))
    }
}

/// Output tag for an already-resolved role name.
///
/// Unknown roles keep their own name, lower-cased, when it is a valid tag
/// name; anything else becomes a `span`.
pub fn tag_for_role(role: &str) -> String {
    if let Some(tag) = OUTPUT_TAGS.get(role) {
        return (*tag).to_string();
    }
    if TAG_NAME_RE.is_match(role) {
        role.to_ascii_lowercase()
    } else {
        log::debug!("Role '{}' is not a usable tag name, emitting span", role);
        "span".to_string()
    }
}
