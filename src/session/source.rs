//! Where a session gets its pages from.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::content::TextContent;
use crate::error::{Error, Result};
use crate::structure::StructTreeRoot;

/// Supplier of per-page text and the structure tree.
#[async_trait(?Send)]
pub trait DocumentSource {
    /// Number of pages.
    fn page_count(&self) -> u32;

    /// Text content of `page`.
    async fn page_text_content(&self, page: u32) -> Result<TextContent>;

    /// The document's structure tree, `None` for untagged documents.
    async fn struct_tree(&self) -> Result<Option<StructTreeRoot>>;
}

/// A source holding everything in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    pages: BTreeMap<u32, TextContent>,
    page_count: u32,
    struct_tree: Option<StructTreeRoot>,
}

impl InMemorySource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a page.
    pub fn with_page(mut self, content: TextContent) -> Self {
        self.pages.insert(self.page_count, content);
        self.page_count += 1;
        self
    }

    /// Set the structure tree.
    pub fn with_struct_tree(mut self, tree: StructTreeRoot) -> Self {
        self.struct_tree = Some(tree);
        self
    }

    /// Load a document dump: `{"pages": [TextContent...], "struct_tree": ...}`.
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: DocumentDump = serde_json::from_str(json)?;
        let source = dump.pages.into_iter().fold(Self::new(), Self::with_page);
        Ok(match dump.struct_tree {
            Some(tree) => source.with_struct_tree(tree),
            None => source,
        })
    }
}

/// Serialized form of a whole document, as exchanged with the renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentDump {
    /// Text content of each page, in page order
    pub pages: Vec<TextContent>,
    /// Structure tree, absent for untagged documents
    #[serde(default)]
    pub struct_tree: Option<StructTreeRoot>,
}

#[async_trait(?Send)]
impl DocumentSource for InMemorySource {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page_text_content(&self, page: u32) -> Result<TextContent> {
        self.pages
            .get(&page)
            .cloned()
            .ok_or_else(|| Error::Source(format!("page {} out of range ({} pages)", page, self.page_count)))
    }

    async fn struct_tree(&self) -> Result<Option<StructTreeRoot>> {
        Ok(self.struct_tree.clone())
    }
}
