//! Per-page text content as delivered by the rendering engine.
//!
//! A page's text arrives as an ordered list of [`TextFragment`]s. Fragments
//! inside a marked-content sequence carry a [`MarkedContentRef`]; every
//! fragment of one sequence shares the same `(page, mcid)` pair, and MCIDs
//! are only unique within a page.

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::geometry::Matrix;

lazy_static! {
    static ref MCID_KEY_RE: Regex =
        Regex::new(r"^\s*(\d+)\s*/\s*(\d+)\s*$").expect("static MCID key pattern");
}

/// Marked content a fragment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkedContentRef {
    /// Marked Content ID, unique only within `page`
    pub mcid: u32,
    /// Page index the sequence lives on
    pub page: u32,
}

/// Document-wide identifier of a marked-content sequence.
///
/// Rendered as `"page/mcid"`, which is the form stored on overlay nodes and
/// logical text spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct McidKey {
    /// Page index
    pub page: u32,
    /// Marked Content ID on that page
    pub mcid: u32,
}

impl McidKey {
    /// Create a new key.
    pub fn new(page: u32, mcid: u32) -> Self {
        Self { page, mcid }
    }
}

impl From<MarkedContentRef> for McidKey {
    fn from(mc: MarkedContentRef) -> Self {
        Self::new(mc.page, mc.mcid)
    }
}

impl fmt::Display for McidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.page, self.mcid)
    }
}

impl FromStr for McidKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let caps = MCID_KEY_RE
            .captures(s)
            .ok_or_else(|| Error::InvalidMcidKey(s.to_string()))?;
        let page = caps[1]
            .parse()
            .map_err(|_| Error::InvalidMcidKey(s.to_string()))?;
        let mcid = caps[2]
            .parse()
            .map_err(|_| Error::InvalidMcidKey(s.to_string()))?;
        Ok(Self { page, mcid })
    }
}

/// One positioned run of text on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextFragment {
    /// Decoded text of the run
    pub text: String,
    /// Text rendering matrix in PDF user space
    pub transform: Matrix,
    /// Advance width in user space units
    pub width: f32,
    /// Height in user space units
    pub height: f32,
    /// Key into [`TextContent::styles`]
    pub font_name: String,
    /// The run ends a line with a hyphen that breaks a word
    #[serde(default)]
    pub eol_hyphen: bool,
    /// Owning marked-content sequence, if the run is tagged
    #[serde(default)]
    pub marked_content: Option<MarkedContentRef>,
    /// Structure element directly containing the sequence, a key into
    /// [`TextContent::structs`]
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl TextFragment {
    /// Create an untagged fragment with an identity transform.
    pub fn new(text: impl Into<String>, font_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            transform: Matrix::identity(),
            width: 0.0,
            height: 0.0,
            font_name: font_name.into(),
            eol_hyphen: false,
            marked_content: None,
            parent_id: None,
        }
    }

    /// Set the text matrix.
    pub fn with_transform(mut self, transform: Matrix) -> Self {
        self.transform = transform;
        self
    }

    /// Set width and height in user space.
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Tag the fragment with a marked-content sequence.
    pub fn with_marked_content(mut self, page: u32, mcid: u32) -> Self {
        self.marked_content = Some(MarkedContentRef { mcid, page });
        self
    }

    /// Set the structure element containing the fragment's sequence.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Flag the fragment as ending in a line-break hyphen.
    pub fn with_eol_hyphen(mut self, eol_hyphen: bool) -> Self {
        self.eol_hyphen = eol_hyphen;
        self
    }

    /// Length in characters, the unit all MCID offsets are counted in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// True if the text contains nothing but whitespace.
    pub fn is_whitespace_only(&self) -> bool {
        self.text.chars().all(char::is_whitespace)
    }

    /// Document-wide key of the owning sequence.
    pub fn mcid_key(&self) -> Option<McidKey> {
        self.marked_content.map(McidKey::from)
    }
}

/// Font information needed to place text on screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontStyle {
    /// CSS font family used for measurement and display
    pub font_family: String,
    /// Ascent as a fraction of the font size
    #[serde(default)]
    pub ascent: Option<f32>,
    /// Descent as a (negative) fraction of the font size
    #[serde(default)]
    pub descent: Option<f32>,
    /// Vertical writing mode
    #[serde(default)]
    pub vertical: bool,
}

impl FontStyle {
    /// Create a horizontal style with no ascent information.
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
            ascent: None,
            descent: None,
            vertical: false,
        }
    }

    /// Set the ascent ratio.
    pub fn with_ascent(mut self, ascent: f32) -> Self {
        self.ascent = Some(ascent);
        self
    }

    /// Set the descent ratio.
    pub fn with_descent(mut self, descent: f32) -> Self {
        self.descent = Some(descent);
        self
    }

    /// Enable vertical writing.
    pub fn vertical(mut self) -> Self {
        self.vertical = true;
        self
    }
}

impl Default for FontStyle {
    fn default() -> Self {
        Self::new("sans-serif")
    }
}

/// A structure element as seen from one page: its type and its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageStruct {
    /// Structure type name (`S`), possibly a custom role
    pub struct_type: String,
    /// Parent structure element, `None` below the tree root
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Text content of one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Fragments in content-stream order
    pub items: Vec<TextFragment>,
    /// Font styles keyed by [`TextFragment::font_name`]
    #[serde(default)]
    pub styles: HashMap<String, FontStyle>,
    /// Structure elements reachable from the page's sequences, by id
    #[serde(default)]
    pub structs: HashMap<String, PageStruct>,
    /// The document's RoleMap
    #[serde(default)]
    pub role_map: HashMap<String, String>,
}

impl TextContent {
    /// Create an empty text content.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment.
    pub fn push(&mut self, fragment: TextFragment) {
        self.items.push(fragment);
    }

    /// Register a font style.
    pub fn add_style(&mut self, font_name: impl Into<String>, style: FontStyle) {
        self.styles.insert(font_name.into(), style);
    }

    /// Register a structure element the page's sequences hang under.
    pub fn add_struct(
        &mut self,
        id: impl Into<String>,
        struct_type: impl Into<String>,
        parent_id: Option<&str>,
    ) {
        self.structs.insert(
            id.into(),
            PageStruct {
                struct_type: struct_type.into(),
                parent_id: parent_id.map(str::to_string),
            },
        );
    }

    /// Map a custom role onto a standard structure type.
    pub fn map_role(&mut self, from: impl Into<String>, to: impl Into<String>) {
        self.role_map.insert(from.into(), to.into());
    }

    /// Style for a font name, falling back to the default style.
    pub fn style_for(&self, font_name: &str) -> FontStyle {
        self.styles.get(font_name).cloned().unwrap_or_default()
    }
}

/// A fragment that belongs to a marked-content run, with its offset.
#[derive(Debug, Clone, PartialEq)]
pub struct RunFragment {
    /// The original fragment
    pub fragment: TextFragment,
    /// Characters of the run preceding this fragment
    pub start_offset: usize,
}

/// All fragments of one marked-content sequence on one page, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct McidRun {
    /// Fragments in reading order
    pub fragments: Vec<RunFragment>,
}

impl McidRun {
    /// Full text of the sequence.
    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.fragment.text.as_str()).collect()
    }

    /// Length of the sequence in characters.
    pub fn char_len(&self) -> usize {
        self.fragments.iter().map(|f| f.fragment.char_len()).sum()
    }

    /// True if the sequence is nothing but a line-break hyphen: a single
    /// flagged fragment, or flagged text that is empty once the hyphen is
    /// removed.
    pub fn is_hyphen_artifact(&self) -> bool {
        match self.fragments.as_slice() {
            [] => false,
            [only] => only.fragment.eol_hyphen,
            [.., last] => {
                last.fragment.eol_hyphen
                    && self
                        .text()
                        .trim_end_matches(['-', '\u{ad}'])
                        .trim()
                        .is_empty()
            },
        }
    }
}

/// Group a page's fragments by MCID, accumulating per-sequence offsets.
///
/// Fragments whose marked content names a different page are still grouped
/// under the page they claim, matching how the overlay labels them.
pub fn group_by_mcid(content: &TextContent) -> HashMap<McidKey, McidRun> {
    let mut runs: HashMap<McidKey, McidRun> = HashMap::new();
    for fragment in &content.items {
        let Some(key) = fragment.mcid_key() else {
            continue;
        };
        let run = runs.entry(key).or_default();
        let start_offset = run.char_len();
        run.fragments.push(RunFragment {
            fragment: fragment.clone(),
            start_offset,
        });
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcid_key_display_and_parse() {
        let key = McidKey::new(4, 17);
        assert_eq!(key.to_string(), "4/17");
        assert_eq!("4/17".parse::<McidKey>().unwrap(), key);
        assert_eq!(" 4 / 17 ".parse::<McidKey>().unwrap(), key);
    }

    #[test]
    fn test_mcid_key_rejects_garbage() {
        assert!("".parse::<McidKey>().is_err());
        assert!("4".parse::<McidKey>().is_err());
        assert!("a/b".parse::<McidKey>().is_err());
        assert!("4/-1".parse::<McidKey>().is_err());
        assert!("99999999999/1".parse::<McidKey>().is_err());
    }

    #[test]
    fn test_whitespace_detection() {
        assert!(TextFragment::new("  \t", "F1").is_whitespace_only());
        assert!(TextFragment::new("", "F1").is_whitespace_only());
        assert!(!TextFragment::new(" a ", "F1").is_whitespace_only());
    }

    #[test]
    fn test_char_len_counts_scalars() {
        assert_eq!(TextFragment::new("héllo", "F1").char_len(), 5);
    }

    #[test]
    fn test_group_by_mcid_offsets() {
        let mut content = TextContent::new();
        content.push(TextFragment::new("Hello ", "F1").with_marked_content(0, 3));
        content.push(TextFragment::new("untagged", "F1"));
        content.push(TextFragment::new("Title", "F1").with_marked_content(0, 1));
        content.push(TextFragment::new("World", "F1").with_marked_content(0, 3));

        let runs = group_by_mcid(&content);
        assert_eq!(runs.len(), 2);

        let run = &runs[&McidKey::new(0, 3)];
        assert_eq!(run.text(), "Hello World");
        let offsets: Vec<usize> = run.fragments.iter().map(|f| f.start_offset).collect();
        assert_eq!(offsets, vec![0, 6]);
        assert_eq!(runs[&McidKey::new(0, 1)].char_len(), 5);
    }

    #[test]
    fn test_run_hyphen_artifact() {
        let mut content = TextContent::new();
        content.push(
            TextFragment::new("exam-", "F1")
                .with_marked_content(0, 0)
                .with_eol_hyphen(true),
        );
        content.push(TextFragment::new("The quick", "F1").with_marked_content(0, 1));
        content.push(
            TextFragment::new("and con-", "F1")
                .with_marked_content(0, 1)
                .with_eol_hyphen(true),
        );
        content.push(TextFragment::new(" ", "F1").with_marked_content(0, 2));
        content.push(
            TextFragment::new("\u{ad}", "F1")
                .with_marked_content(0, 2)
                .with_eol_hyphen(true),
        );
        content.push(TextFragment::new("plain", "F1").with_marked_content(0, 3));

        let runs = group_by_mcid(&content);
        assert!(runs[&McidKey::new(0, 0)].is_hyphen_artifact());
        assert!(!runs[&McidKey::new(0, 1)].is_hyphen_artifact());
        assert!(runs[&McidKey::new(0, 2)].is_hyphen_artifact());
        assert!(!runs[&McidKey::new(0, 3)].is_hyphen_artifact());
    }

    #[test]
    fn test_page_structs_from_json() {
        let json = r#"{
            "items": [{"text": "Hi", "transform": {"a": 1, "b": 0, "c": 0, "d": 1, "e": 0, "f": 0},
                       "width": 10, "height": 10, "font_name": "F1",
                       "marked_content": {"mcid": 0, "page": 0}, "parent_id": "5R"}],
            "structs": {"5R": {"struct_type": "Span", "parent_id": "4R"},
                        "4R": {"struct_type": "Para"}},
            "role_map": {"Para": "P"}
        }"#;
        let content: TextContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.items[0].parent_id.as_deref(), Some("5R"));
        assert_eq!(content.structs["5R"].parent_id.as_deref(), Some("4R"));
        assert_eq!(content.structs["4R"].parent_id, None);
        assert_eq!(content.role_map["Para"], "P");
    }

    #[test]
    fn test_style_fallback() {
        let mut content = TextContent::new();
        content.add_style("F1", FontStyle::new("serif").with_ascent(0.8));
        assert_eq!(content.style_for("F1").font_family, "serif");
        assert_eq!(content.style_for("missing"), FontStyle::default());
    }
}
