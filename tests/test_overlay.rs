//! Integration tests for overlay construction.
//!
//! Covers node placement, per-MCID offsets, measurement and the node cap.

use pdf_reflow::config::OverlayConfig;
use pdf_reflow::content::{group_by_mcid, FontStyle, McidKey, TextContent, TextFragment};
use pdf_reflow::geometry::{Matrix, Viewport};
use pdf_reflow::overlay::{
    create_nodes, measure_nodes, FixedAdvanceMeasurer, LayerChild, OverlayRenderTask, PageOverlay,
};
use proptest::prelude::*;

fn fragment(text: &str, x: f32, width: f32, mcid: u32) -> TextFragment {
    TextFragment::new(text, "F1")
        .with_transform(Matrix::new(10.0, 0.0, 0.0, 10.0, x, 700.0))
        .with_size(width, 10.0)
        .with_marked_content(0, mcid)
}

async fn render(content: &TextContent, config: &OverlayConfig) -> PageOverlay {
    OverlayRenderTask::new(0, content, &Viewport::new(800.0, 1.0), config)
        .run(&mut FixedAdvanceMeasurer::default())
        .await
        .unwrap()
}

// =============================================================================
// OFFSETS
// =============================================================================

mod offset_tests {
    use super::*;

    #[tokio::test]
    async fn test_hello_world_offsets() {
        let mut content = TextContent::new();
        content.push(fragment("Hello ", 0.0, 30.0, 3));
        content.push(fragment("World", 30.0, 25.0, 3));

        let overlay = render(&content, &OverlayConfig::new()).await;
        assert_eq!(overlay.nodes.len(), 2);
        assert_eq!(overlay.nodes[0].start_offset, 0);
        assert_eq!(overlay.nodes[1].start_offset, 6);
        assert_eq!(overlay.nodes[1].mcid_attr().as_deref(), Some("0/3"));
    }

    #[tokio::test]
    async fn test_interleaved_sequences_keep_own_offsets() {
        let mut content = TextContent::new();
        content.push(fragment("ab", 0.0, 10.0, 1));
        content.push(fragment("xyz", 10.0, 15.0, 2));
        content.push(fragment("cd", 25.0, 10.0, 1));

        let overlay = render(&content, &OverlayConfig::new()).await;
        let offsets: Vec<usize> = overlay.nodes.iter().map(|n| n.start_offset).collect();
        assert_eq!(offsets, vec![0, 0, 2]);
    }

    proptest! {
        #[test]
        fn prop_offsets_are_contiguous(
            items in prop::collection::vec((0u32..4, "[a-z ]{1,8}"), 0..40)
        ) {
            let mut content = TextContent::new();
            for (i, (mcid, text)) in items.iter().enumerate() {
                content.push(fragment(text, i as f32 * 10.0, 10.0, *mcid));
            }
            let nodes = create_nodes(&content, &Viewport::new(800.0, 1.0), usize::MAX);
            let runs = group_by_mcid(&content);

            for (key, run) in &runs {
                let mut expected = 0;
                let mut total = 0;
                for node in nodes.iter().filter(|n| n.owner == Some(*key)) {
                    prop_assert_eq!(node.start_offset, expected);
                    expected += node.char_len();
                    total += node.char_len();
                }
                prop_assert_eq!(total, run.char_len());
            }
        }
    }
}

// =============================================================================
// PLACEMENT AND MEASUREMENT
// =============================================================================

mod measurement_tests {
    use super::*;

    #[tokio::test]
    async fn test_node_placed_at_ascent() {
        let mut content = TextContent::new();
        content.add_style("F1", FontStyle::new("serif").with_ascent(0.8));
        content.push(fragment("Title", 72.0, 50.0, 0));

        let overlay = render(&content, &OverlayConfig::new()).await;
        let node = &overlay.nodes[0];
        assert_eq!(node.font_family, "serif");
        assert_eq!(node.left, 72.0);
        // Baseline at 800 - 700 = 100, ascent 8px above it.
        assert!((node.top - 92.0).abs() < 1e-4);
        assert_eq!(node.angle, 0.0);
    }

    #[tokio::test]
    async fn test_scale_matches_page_width() {
        let mut content = TextContent::new();
        // Five characters at 10px measure 25px, but span 50px on the page.
        content.push(fragment("Wider", 0.0, 50.0, 0));
        content.push(fragment("x", 50.0, 30.0, 0));

        let overlay = render(&content, &OverlayConfig::new()).await;
        assert_eq!(overlay.nodes[0].horizontal_scale, Some(2.0));
        assert_eq!(overlay.nodes[0].css_transform(), "scaleX(2)");
        // Single characters are never scaled.
        assert_eq!(overlay.nodes[1].horizontal_scale, None);
    }

    #[test]
    fn test_whitespace_nodes_are_kept_but_not_measured() {
        let mut content = TextContent::new();
        content.push(fragment("a", 0.0, 5.0, 0));
        content.push(fragment(" ", 5.0, 5.0, 0));
        content.push(fragment("b", 10.0, 5.0, 0));

        let mut nodes = create_nodes(&content, &Viewport::new(800.0, 1.0), 100);
        measure_nodes(&mut nodes, &mut FixedAdvanceMeasurer::default());
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1].measured_width, None);
        assert_eq!(nodes[2].start_offset, 2);
    }

    #[tokio::test]
    async fn test_node_cap_still_completes() {
        let mut content = TextContent::new();
        for i in 0..20 {
            content.push(fragment("ab", i as f32 * 10.0, 10.0, 0));
        }
        let overlay = render(&content, &OverlayConfig::new().with_max_nodes(5)).await;
        assert_eq!(overlay.nodes.len(), 5);
    }

    #[tokio::test]
    async fn test_untagged_fragments_have_no_owner() {
        let mut content = TextContent::new();
        content.push(TextFragment::new("Page 1", "F1").with_size(30.0, 10.0));
        let overlay = render(&content, &OverlayConfig::new()).await;
        assert_eq!(overlay.nodes[0].owner, None);
        assert_eq!(overlay.first_tagged(), None);
        assert_eq!(overlay.nodes_for(McidKey::new(0, 0)).count(), 0);
    }
}

// =============================================================================
// STRUCTURE CONTAINERS
// =============================================================================

mod layer_tests {
    use super::*;

    fn tagged_page() -> TextContent {
        let mut content = TextContent::new();
        content.push(
            TextFragment::new("Page 3", "F1")
                .with_transform(Matrix::new(10.0, 0.0, 0.0, 10.0, 0.0, 780.0))
                .with_size(30.0, 10.0),
        );
        content.push(fragment("Read the ", 0.0, 45.0, 0).with_parent("4R"));
        content.push(fragment("manual", 45.0, 30.0, 1).with_parent("5R"));
        content.push(fragment(" ", 75.0, 5.0, 1).with_parent("5R"));
        content.push(fragment("now", 80.0, 15.0, 2).with_parent("4R"));
        content.add_struct("1R", "Document", None);
        content.add_struct("4R", "Para", Some("1R"));
        content.add_struct("5R", "Link", Some("4R"));
        content.map_role("Para", "P");
        content
    }

    #[tokio::test]
    async fn test_tagged_nodes_nest_under_their_block() {
        let overlay = render(&tagged_page(), &OverlayConfig::new()).await;
        let layer = &overlay.layer;

        assert_eq!(layer.children, vec![LayerChild::Node(0), LayerChild::Container(0)]);
        assert_eq!(layer.containers.len(), 2);

        let para = &layer.containers[0];
        assert_eq!(para.struct_id, "4R");
        assert_eq!(para.tag, "p");
        assert!(para.block);
        assert_eq!(
            para.children,
            vec![LayerChild::Node(1), LayerChild::Container(1), LayerChild::Node(4)]
        );

        let link = &layer.containers[1];
        assert_eq!(link.tag, "a");
        assert_eq!(link.parent, Some(0));
        // The whitespace node is not placed.
        assert_eq!(link.children, vec![LayerChild::Node(2)]);

        assert_eq!(layer.nodes_in(0), vec![1, 2, 4]);
        assert_eq!(layer.block_of(2), Some(0));
        assert_eq!(layer.block_of(0), None);
    }

    #[tokio::test]
    async fn test_page_without_structs_is_flat() {
        let mut content = TextContent::new();
        content.push(fragment("Hello", 0.0, 25.0, 0).with_parent("4R"));
        let overlay = render(&content, &OverlayConfig::new()).await;

        assert!(overlay.layer.containers.is_empty());
        assert_eq!(overlay.layer.children, vec![LayerChild::Node(0)]);
    }
}
