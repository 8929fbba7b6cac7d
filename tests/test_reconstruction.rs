//! Integration tests for reflow reconstruction.
//!
//! Builds small structure trees over synthetic page text and checks the
//! serialized markup and the logical tree.

use async_trait::async_trait;
use pdf_reflow::config::ReconstructionConfig;
use pdf_reflow::content::{group_by_mcid, McidKey, McidRun, TextContent, TextFragment};
use pdf_reflow::error::{Error, Result};
use pdf_reflow::geometry::Matrix;
use pdf_reflow::reconstruct::{reconstruct, FigureProducer, ReconstructedDocument};
use pdf_reflow::structure::{StructElem, StructTreeRoot, StructType};
use std::cell::Cell;
use std::collections::HashMap;

/// A fragment on its own line so no baseline heuristics kick in.
fn line(text: &str, page: u32, mcid: u32, row: u32) -> TextFragment {
    TextFragment::new(text, "F1")
        .with_transform(Matrix::new(10.0, 0.0, 0.0, 10.0, 72.0, 700.0 - 20.0 * row as f32))
        .with_size(text.len() as f32 * 5.0, 10.0)
        .with_marked_content(page, mcid)
}

fn runs_of(pages: &[Vec<TextFragment>]) -> HashMap<McidKey, McidRun> {
    let mut runs = HashMap::new();
    for fragments in pages {
        let mut content = TextContent::new();
        for f in fragments {
            content.push(f.clone());
        }
        runs.extend(group_by_mcid(&content));
    }
    runs
}

async fn build(tree: &StructTreeRoot, runs: &HashMap<McidKey, McidRun>) -> ReconstructedDocument {
    reconstruct(tree, runs, &ReconstructionConfig::new(), None).await
}

fn td(id: &str, page: u32, mcid: u32) -> StructElem {
    StructElem::new(id, StructType::TD).with_mcr(page, mcid)
}

// =============================================================================
// ORDERING AND TAGS
// =============================================================================

mod ordering_tests {
    use super::*;

    #[tokio::test]
    async fn test_nested_siblings_keep_source_order() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Document)
                .with_element(StructElem::new("2R", StructType::H1).with_mcr(0, 0))
                .with_element(
                    StructElem::new("3R", StructType::Sect)
                        .with_element(StructElem::new("4R", StructType::P).with_mcr(0, 1))
                        .with_element(StructElem::new("5R", StructType::P).with_mcr(0, 2)),
                )
                .with_element(
                    StructElem::new("6R", StructType::P).with_mcr(0, 3).with_element(
                        StructElem::new("7R", StructType::Link)
                            .with_uri("https://example.com")
                            .with_mcr(0, 4),
                    ),
                ),
        );
        let runs = runs_of(&[vec![
            line("Title", 0, 0, 0),
            line("First", 0, 1, 1),
            line("Second", 0, 2, 2),
            line("See ", 0, 3, 3),
            line("here", 0, 4, 4),
        ]]);

        let doc = build(&tree, &runs).await;
        let expected = concat!(
            "<div pdfid=\"1R\">",
            "<h1 pdfid=\"2R\"><span mcid=\"0/0\" startoffset=\"0\">Title</span></h1>\n",
            "<section pdfid=\"3R\">",
            "<p pdfid=\"4R\"><span mcid=\"0/1\" startoffset=\"0\">First</span></p>\n",
            "<p pdfid=\"5R\"><span mcid=\"0/2\" startoffset=\"0\">Second</span></p>\n",
            "</section>",
            "<p pdfid=\"6R\"><span mcid=\"0/3\" startoffset=\"0\">See </span>",
            "<a pdfid=\"7R\" href=\"https://example.com\"><span mcid=\"0/4\" startoffset=\"0\">here</span></a>",
            "</p>\n",
            "</div>",
        );
        assert_eq!(doc.to_markup(), expected);
    }

    #[tokio::test]
    async fn test_role_map_and_part_default() {
        let mut tree = StructTreeRoot::new();
        tree.map_role("Title", "H1");
        tree.add_element(
            StructElem::new("1R", StructType::Part)
                .with_element(StructElem::new("2R", StructType::from_name("Title")).with_mcr(0, 0)),
        );
        let runs = runs_of(&[vec![line("Intro", 0, 0, 0)]]);

        let doc = build(&tree, &runs).await;
        let arena = doc.arena();
        let part = arena.get(arena.by_pdf_id("1R").unwrap()).unwrap();
        let title = arena.get(arena.by_pdf_id("2R").unwrap()).unwrap();
        assert_eq!(part.tag, "section");
        assert_eq!(title.tag, "h1");
        assert!(title.block);
    }

    #[tokio::test]
    async fn test_multiple_fragments_share_id() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("1R", StructType::P).with_mcr(0, 3));
        let runs = runs_of(&[vec![line("Hello ", 0, 3, 0), line("World", 0, 3, 1)]]);

        let doc = build(&tree, &runs).await;
        let spans = doc.spans_for(McidKey::new(0, 3));
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].start_offset, 0);
        assert_eq!(spans[1].start_offset, 6);
    }

    #[tokio::test]
    async fn test_revision_ids_resolve_to_same_element() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("12R_3", StructType::P).with_mcr(0, 0));
        let runs = runs_of(&[vec![line("x", 0, 0, 0)]]);

        let doc = build(&tree, &runs).await;
        let id = doc.arena().by_pdf_id("12R").unwrap();
        assert_eq!(doc.arena().by_pdf_id("12R_7"), Some(id));
        assert!(doc.to_markup().contains("pdfid=\"12R\""));
    }
}

// =============================================================================
// TABLES
// =============================================================================

mod table_tests {
    use super::*;

    fn two_page_tables(second_row_cells: u32) -> (StructTreeRoot, HashMap<McidKey, McidRun>) {
        let first = StructElem::new("10R", StructType::Table)
            .with_element(
                StructElem::new("11R", StructType::THead).with_element(
                    StructElem::new("12R", StructType::TR)
                        .with_element(td("13R", 0, 0))
                        .with_element(td("14R", 0, 1)),
                ),
            )
            .with_element(
                StructElem::new("15R", StructType::TR)
                    .with_element(td("16R", 0, 2))
                    .with_element(td("17R", 0, 3)),
            );

        let mut row = StructElem::new("21R", StructType::TR);
        for cell in 0..second_row_cells {
            row.add_element(td(&format!("3{}R", cell), 1, cell));
        }
        let second = StructElem::new("20R", StructType::Table).with_element(row);

        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Div)
                .with_element(first)
                .with_element(second),
        );

        let page0 = (0..4).map(|m| line("a", 0, m, m)).collect();
        let page1 = (0..second_row_cells).map(|m| line("b", 1, m, m)).collect();
        (tree, runs_of(&[page0, page1]))
    }

    #[tokio::test]
    async fn test_continued_table_is_merged() {
        let (tree, runs) = two_page_tables(2);
        let doc = build(&tree, &runs).await;
        let arena = doc.arena();

        let table = arena.by_pdf_id("10R").unwrap();
        assert!(arena.by_pdf_id("20R").is_none());
        assert_eq!(arena.descendants_with_tag(table, "tr").len(), 3);
        assert_eq!(doc.to_markup().matches("<table").count(), 1);

        // The continued row keeps its own cells and text.
        let row = arena.by_pdf_id("21R").unwrap();
        assert_eq!(arena.get(row).unwrap().parent, Some(table));
        assert_eq!(doc.spans_for(McidKey::new(1, 1)).len(), 1);
    }

    #[tokio::test]
    async fn test_different_cell_count_is_not_merged() {
        let (tree, runs) = two_page_tables(3);
        let doc = build(&tree, &runs).await;

        assert!(doc.arena().by_pdf_id("20R").is_some());
        assert_eq!(doc.to_markup().matches("<table").count(), 2);
    }

    #[tokio::test]
    async fn test_merging_can_be_disabled() {
        let (tree, runs) = two_page_tables(2);
        let config = ReconstructionConfig::new().with_table_merging(false);
        let doc = reconstruct(&tree, &runs, &config, None).await;
        assert_eq!(doc.to_markup().matches("<table").count(), 2);
    }
}

// =============================================================================
// HYPHENATION
// =============================================================================

mod hyphen_tests {
    use super::*;

    #[tokio::test]
    async fn test_hyphen_fragment_dropped_without_empty_parent() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Document)
                .with_element(StructElem::new("2R", StructType::P).with_mcr(0, 0))
                .with_element(
                    StructElem::new("3R", StructType::P)
                        .with_element(StructElem::new("4R", StructType::Span).with_mcr(0, 1)),
                ),
        );
        let runs = runs_of(&[vec![
            line("Normal text", 0, 0, 0),
            line("frag-", 0, 1, 1).with_eol_hyphen(true),
        ]]);

        let doc = build(&tree, &runs).await;
        let arena = doc.arena();
        assert!(arena.by_pdf_id("4R").is_none());
        assert!(arena.by_pdf_id("3R").is_none());
        assert!(arena.by_pdf_id("1R").is_some());

        let markup = doc.to_markup();
        assert!(!markup.contains("frag"));
        assert_eq!(markup.matches("<p").count(), 1);
    }

    #[tokio::test]
    async fn test_parent_with_other_content_survives_drop() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::P)
                .with_mcr(0, 0)
                .with_element(StructElem::new("2R", StructType::Span).with_mcr(0, 1)),
        );
        let runs = runs_of(&[vec![
            line("kept", 0, 0, 0),
            line("frag-", 0, 1, 1).with_eol_hyphen(true),
        ]]);

        let doc = build(&tree, &runs).await;
        assert!(doc.arena().by_pdf_id("1R").is_some());
        assert!(doc.arena().by_pdf_id("2R").is_none());
    }

    #[tokio::test]
    async fn test_break_hyphen_joined_inside_sequence() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("1R", StructType::P).with_mcr(0, 0));
        let runs = runs_of(&[vec![
            line("exam-", 0, 0, 0).with_eol_hyphen(true),
            line("ple", 0, 0, 1),
        ]]);

        let doc = build(&tree, &runs).await;
        let spans = doc.spans_for(McidKey::new(0, 0));
        let texts: Vec<&str> = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["exam", "ple"]);
        // Offsets still count the hyphen.
        assert_eq!(spans[1].start_offset, 5);
    }

    #[tokio::test]
    async fn test_paragraph_ending_in_break_hyphen_is_kept() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Document)
                .with_element(StructElem::new("2R", StructType::P).with_mcr(0, 0)),
        );
        let runs = runs_of(&[vec![
            line("The quick brown fox jumps over the", 0, 0, 0),
            line("lazy dog and con-", 0, 0, 1).with_eol_hyphen(true),
        ]]);

        let doc = build(&tree, &runs).await;
        assert!(doc.arena().by_pdf_id("2R").is_some());
        let markup = doc.to_markup();
        assert!(markup.contains("The quick brown fox"));
        assert!(markup.contains(">lazy dog and con</span>"));
    }
}

// =============================================================================
// SUBSCRIPTS AND SUPERSCRIPTS
// =============================================================================

mod script_tests {
    use super::*;

    fn glyph(text: &str, x: f32, y: f32, size: f32, width: f32) -> TextFragment {
        TextFragment::new(text, "F1")
            .with_transform(Matrix::new(size, 0.0, 0.0, size, x, y))
            .with_size(width, size)
            .with_marked_content(0, 0)
    }

    #[tokio::test]
    async fn test_subscript_wrapped() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("1R", StructType::P).with_mcr(0, 0));
        let runs = runs_of(&[vec![
            glyph("H", 0.0, 100.0, 10.0, 8.0),
            glyph("2", 8.0, 97.0, 6.0, 4.0),
            glyph("O", 12.0, 100.0, 10.0, 8.0),
        ]]);

        let doc = build(&tree, &runs).await;
        assert_eq!(
            doc.to_markup(),
            concat!(
                "<p pdfid=\"1R\"><span mcid=\"0/0\" startoffset=\"0\">H</span>",
                "<sub><span mcid=\"0/0\" startoffset=\"1\">2</span></sub>",
                "<span mcid=\"0/0\" startoffset=\"2\">O</span></p>\n",
            )
        );
    }

    #[tokio::test]
    async fn test_consecutive_superscripts_share_wrapper() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("1R", StructType::P).with_mcr(0, 0));
        let runs = runs_of(&[vec![
            glyph("x", 0.0, 100.0, 10.0, 5.0),
            glyph("1", 5.0, 104.0, 6.0, 3.0),
            glyph("0", 8.0, 104.0, 6.0, 3.0),
        ]]);

        let doc = build(&tree, &runs).await;
        let markup = doc.to_markup();
        assert_eq!(markup.matches("<sup>").count(), 1);
        assert!(markup.contains("<sup><span mcid=\"0/0\" startoffset=\"1\">1</span><span mcid=\"0/0\" startoffset=\"2\">0</span></sup>"));
    }

    #[tokio::test]
    async fn test_detection_can_be_disabled() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(StructElem::new("1R", StructType::P).with_mcr(0, 0));
        let runs = runs_of(&[vec![
            glyph("x", 0.0, 100.0, 10.0, 5.0),
            glyph("2", 5.0, 104.0, 6.0, 3.0),
        ]]);
        let config = ReconstructionConfig::new().with_script_detection(false);
        let doc = reconstruct(&tree, &runs, &config, None).await;
        assert!(!doc.to_markup().contains("<sup>"));
    }

    #[tokio::test]
    async fn test_script_in_inline_child_uses_block_baseline() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::P)
                .with_mcr(0, 0)
                .with_element(StructElem::new("2R", StructType::Span).with_mcr(0, 1)),
        );
        let runs = runs_of(&[vec![
            glyph("x", 0.0, 100.0, 10.0, 5.0),
            glyph("2", 5.0, 104.0, 6.0, 3.0).with_marked_content(0, 1),
        ]]);

        let doc = build(&tree, &runs).await;
        let markup = doc.to_markup();
        assert_eq!(markup.matches("<sup>").count(), 1);
        assert!(markup.contains("<sup><span mcid=\"0/1\" startoffset=\"0\">2</span></sup>"));
        // The wrapper sits inside the span's own element.
        assert!(markup.find("pdfid=\"2R\"").unwrap() < markup.find("<sup>").unwrap());
    }
}

// =============================================================================
// FIGURES
// =============================================================================

mod figure_tests {
    use super::*;

    struct Images {
        calls: Cell<usize>,
        fail_page: Option<u32>,
    }

    #[async_trait(?Send)]
    impl FigureProducer for Images {
        async fn generate(&self, page: u32, element_ids: &[String]) -> Result<HashMap<String, String>> {
            self.calls.set(self.calls.get() + 1);
            if self.fail_page == Some(page) {
                return Err(Error::Figure {
                    page,
                    reason: "rasterizer crashed".to_string(),
                });
            }
            Ok(element_ids
                .iter()
                .map(|id| (id.clone(), format!("<img src=\"{}.png\">", id)))
                .collect())
        }
    }

    fn figures_tree() -> (StructTreeRoot, HashMap<McidKey, McidRun>) {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Document)
                .with_element(
                    StructElem::new("2R", StructType::Figure)
                        .on_page(0)
                        .with_element(StructElem::new("3R", StructType::Caption).with_mcr(0, 0)),
                )
                .with_element(StructElem::new("4R", StructType::Figure).on_page(0))
                .with_element(StructElem::new("5R", StructType::P).with_mcr(0, 1)),
        );
        let runs = runs_of(&[vec![line("Fig. 1", 0, 0, 0), line("After", 0, 1, 1)]]);
        (tree, runs)
    }

    #[tokio::test]
    async fn test_figures_substituted_with_one_job_per_page() {
        let (tree, runs) = figures_tree();
        let images = Images {
            calls: Cell::new(0),
            fail_page: None,
        };
        let doc = reconstruct(&tree, &runs, &ReconstructionConfig::new(), Some(&images)).await;

        assert_eq!(images.calls.get(), 1);
        let markup = doc.to_markup();
        assert!(markup.contains("<figure pdfid=\"2R\"><img src=\"2R.png\"></figure>"));
        assert!(markup.contains("<figure pdfid=\"4R\"><img src=\"4R.png\"></figure>"));
        // The caption was replaced by the image; the paragraph follows the figures.
        assert!(!markup.contains("Fig. 1"));
        assert!(markup.find("4R.png").unwrap() < markup.find("After").unwrap());
        assert!(doc.failed_figure_pages().is_empty());
    }

    #[tokio::test]
    async fn test_failed_figure_job_keeps_text() {
        let (tree, runs) = figures_tree();
        let images = Images {
            calls: Cell::new(0),
            fail_page: Some(0),
        };
        let doc = reconstruct(&tree, &runs, &ReconstructionConfig::new(), Some(&images)).await;

        let markup = doc.to_markup();
        assert!(markup.contains("<figure pdfid=\"2R\" data-figure=\"unavailable\">"));
        assert!(markup.contains("Fig. 1"));
        assert!(markup.contains("After"));
        assert_eq!(doc.failed_figure_pages(), &[0]);
    }

    #[tokio::test]
    async fn test_failed_figure_keeps_alternate_text() {
        let mut tree = StructTreeRoot::new();
        tree.add_element(
            StructElem::new("1R", StructType::Document)
                .with_element(StructElem::new("2R", StructType::Figure).on_page(0).with_alt("Sales chart")),
        );
        let runs = runs_of(&[vec![]]);
        let images = Images {
            calls: Cell::new(0),
            fail_page: Some(0),
        };
        let doc = reconstruct(&tree, &runs, &ReconstructionConfig::new(), Some(&images)).await;

        assert!(doc
            .to_markup()
            .contains("<figure pdfid=\"2R\" data-figure=\"unavailable\" aria-label=\"Sales chart\">"));
    }

    #[tokio::test]
    async fn test_figures_without_producer_are_plain_elements() {
        let (tree, runs) = figures_tree();
        let doc = reconstruct(&tree, &runs, &ReconstructionConfig::new(), None).await;
        let markup = doc.to_markup();
        assert!(markup.contains("Fig. 1"));
        assert!(!markup.contains("data-figure"));
    }
}
