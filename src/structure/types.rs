//! Types for PDF logical structure trees.
//!
//! Implements structure element types according to ISO 32000-1:2008 Section 14.7.2.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The root of a PDF structure tree (StructTreeRoot dictionary).
///
/// According to PDF spec Section 14.7.2, the StructTreeRoot contains:
/// - `/K` - The immediate child or children of the structure tree root
/// - `/RoleMap` - Maps non-standard structure types to standard ones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructTreeRoot {
    /// Top-level children in document order
    pub children: Vec<StructChild>,

    /// Role map for custom structure types
    #[serde(default)]
    pub role_map: HashMap<String, String>,
}

impl StructTreeRoot {
    /// Create a new structure tree root
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level element
    pub fn add_element(&mut self, elem: StructElem) {
        self.children.push(StructChild::Element(Box::new(elem)));
    }

    /// Map a custom structure type onto another type
    pub fn map_role(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.role_map.insert(from.into(), to.into());
    }
}

/// A structure element (StructElem) in the structure tree.
///
/// According to PDF spec Section 14.7.2, each StructElem has:
/// - `/S` - Structure type (e.g., /Document, /P, /H1, /Sect)
/// - `/K` - Children (structure elements or marked content references)
/// - `/P` - Parent structure element
/// - `/Pg` - Page containing this element (optional)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructElem {
    /// Identifier of the element's dictionary, e.g. `"12R"`.
    ///
    /// Revisions of the same element share the part before any `_` suffix.
    pub pdf_id: String,

    /// Structure type as written in the file (`/S`)
    pub struct_type: StructType,

    /// `pdf_id` of the parent element, if any
    #[serde(default)]
    pub parent_id: Option<String>,

    /// Page number this element appears on (if known)
    #[serde(default)]
    pub page: Option<u32>,

    /// Link target for `/Link` elements
    #[serde(default)]
    pub uri: Option<String>,

    /// Alternate description (`/Alt`)
    #[serde(default)]
    pub alt: Option<String>,

    /// Child elements (structure elements or content references)
    #[serde(default)]
    pub children: Vec<StructChild>,
}

impl StructElem {
    /// Create a new structure element
    pub fn new(pdf_id: impl Into<String>, struct_type: StructType) -> Self {
        Self {
            pdf_id: pdf_id.into(),
            struct_type,
            parent_id: None,
            page: None,
            uri: None,
            alt: None,
            children: Vec::new(),
        }
    }

    /// Set the page
    pub fn on_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Set the alternate description
    pub fn with_alt(mut self, alt: impl Into<String>) -> Self {
        self.alt = Some(alt.into());
        self
    }

    /// Set the link target
    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Add a nested structure element, recording this element as its parent
    pub fn add_element(&mut self, mut child: StructElem) {
        child.parent_id = Some(self.pdf_id.clone());
        self.children.push(StructChild::Element(Box::new(child)));
    }

    /// Add a marked content reference
    pub fn add_mcr(&mut self, page: u32, mcid: u32) {
        self.children.push(StructChild::MarkedContentRef { mcid, page });
    }

    /// Builder form of [`add_element`](Self::add_element)
    pub fn with_element(mut self, child: StructElem) -> Self {
        self.add_element(child);
        self
    }

    /// Builder form of [`add_mcr`](Self::add_mcr)
    pub fn with_mcr(mut self, page: u32, mcid: u32) -> Self {
        self.add_mcr(page, mcid);
        self
    }

    /// Nested structure elements, skipping content references
    pub fn child_elements(&self) -> impl Iterator<Item = &StructElem> {
        self.children.iter().filter_map(|child| match child {
            StructChild::Element(elem) => Some(elem.as_ref()),
            StructChild::MarkedContentRef { .. } => None,
        })
    }
}

/// Child of a structure element (either another struct elem or marked content reference)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StructChild {
    /// Another structure element (recursive hierarchy)
    #[serde(rename = "StructElem")]
    Element(Box<StructElem>),

    /// Reference to marked content by MCID (Marked Content ID)
    #[serde(rename = "MCR")]
    MarkedContentRef {
        /// Marked Content ID
        mcid: u32,
        /// Page number containing this marked content
        page: u32,
    },
}

/// Standard structure types from PDF spec Section 14.8.4.
///
/// Custom types can be mapped to standard types via the RoleMap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum StructType {
    // Document-level structure types
    /// Document root
    Document,
    /// Part (major division)
    Part,
    /// Article
    Art,
    /// Section
    Sect,
    /// Division
    Div,
    /// Block quotation
    BlockQuote,
    /// Caption of a table or figure
    Caption,

    // Paragraph-level structure types
    /// Paragraph
    P,
    /// Heading (unnumbered)
    H,
    /// Heading level 1
    H1,
    /// Heading level 2
    H2,
    /// Heading level 3
    H3,
    /// Heading level 4
    H4,
    /// Heading level 5
    H5,
    /// Heading level 6
    H6,

    // List structure types
    /// List
    L,
    /// List item
    LI,
    /// Label (list item marker)
    Lbl,
    /// List body (list item content)
    LBody,

    // Table structure types
    /// Table
    Table,
    /// Table row
    TR,
    /// Table header cell
    TH,
    /// Table data cell
    TD,
    /// Table header group
    THead,
    /// Table body group
    TBody,
    /// Table footer group
    TFoot,

    // Inline structure types
    /// Span (inline generic)
    Span,
    /// Quote
    Quote,
    /// Note
    Note,
    /// Reference
    Reference,
    /// Bibliographic entry
    BibEntry,
    /// Code
    Code,
    /// Link
    Link,
    /// Annotation
    Annot,

    // Illustration structure types
    /// Figure
    Figure,
    /// Formula
    Formula,
    /// Form (input field)
    Form,

    /// Custom structure type not defined in the PDF specification
    Custom(String),
}

impl StructType {
    /// Parse structure type from its name (e.g., "P" -> StructType::P)
    pub fn from_name(s: &str) -> Self {
        match s {
            "Document" => Self::Document,
            "Part" => Self::Part,
            "Art" => Self::Art,
            "Sect" => Self::Sect,
            "Div" => Self::Div,
            "BlockQuote" => Self::BlockQuote,
            "Caption" => Self::Caption,
            "P" => Self::P,
            "H" => Self::H,
            "H1" => Self::H1,
            "H2" => Self::H2,
            "H3" => Self::H3,
            "H4" => Self::H4,
            "H5" => Self::H5,
            "H6" => Self::H6,
            "L" => Self::L,
            "LI" => Self::LI,
            "Lbl" => Self::Lbl,
            "LBody" => Self::LBody,
            "Table" => Self::Table,
            "TR" => Self::TR,
            "TH" => Self::TH,
            "TD" => Self::TD,
            "THead" => Self::THead,
            "TBody" => Self::TBody,
            "TFoot" => Self::TFoot,
            "Span" => Self::Span,
            "Quote" => Self::Quote,
            "Note" => Self::Note,
            "Reference" => Self::Reference,
            "BibEntry" => Self::BibEntry,
            "Code" => Self::Code,
            "Link" => Self::Link,
            "Annot" => Self::Annot,
            "Figure" => Self::Figure,
            "Formula" => Self::Formula,
            "Form" => Self::Form,
            _ => Self::Custom(s.to_string()),
        }
    }

    /// Name as written in the file
    pub fn name(&self) -> &str {
        match self {
            Self::Document => "Document",
            Self::Part => "Part",
            Self::Art => "Art",
            Self::Sect => "Sect",
            Self::Div => "Div",
            Self::BlockQuote => "BlockQuote",
            Self::Caption => "Caption",
            Self::P => "P",
            Self::H => "H",
            Self::H1 => "H1",
            Self::H2 => "H2",
            Self::H3 => "H3",
            Self::H4 => "H4",
            Self::H5 => "H5",
            Self::H6 => "H6",
            Self::L => "L",
            Self::LI => "LI",
            Self::Lbl => "Lbl",
            Self::LBody => "LBody",
            Self::Table => "Table",
            Self::TR => "TR",
            Self::TH => "TH",
            Self::TD => "TD",
            Self::THead => "THead",
            Self::TBody => "TBody",
            Self::TFoot => "TFoot",
            Self::Span => "Span",
            Self::Quote => "Quote",
            Self::Note => "Note",
            Self::Reference => "Reference",
            Self::BibEntry => "BibEntry",
            Self::Code => "Code",
            Self::Link => "Link",
            Self::Annot => "Annot",
            Self::Figure => "Figure",
            Self::Formula => "Formula",
            Self::Form => "Form",
            Self::Custom(name) => name,
        }
    }
}

impl From<String> for StructType {
    fn from(s: String) -> Self {
        Self::from_name(&s)
    }
}

impl From<StructType> for String {
    fn from(t: StructType) -> Self {
        t.name().to_string()
    }
}
