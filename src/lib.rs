// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::type_complexity)]
#![allow(clippy::should_implement_trait)]
// Allow unused for tests
#![cfg_attr(test, allow(dead_code))]

//! # PDF Reflow
//!
//! Text overlay and reflow reconstruction for tagged PDF documents.
//!
//! Given the positioned text fragments of every page and the document's
//! structure tree, this crate builds:
//!
//! - **Overlays**: one positioned, measured text node per fragment, laid over
//!   the rendered page so text can be selected and highlighted
//! - **A reflowed document**: a single logical tree (headings, paragraphs,
//!   lists, tables, links, figures) in reading order, serializable to markup
//! - **A shared coordinate space**: every overlay node and every logical text
//!   span records the marked-content sequence it belongs to and its character
//!   offset within it, so selections translate between the two, across pages
//!
//! ## Architecture
//!
//! - [`geometry`]: viewport and fragment matrices to screen placement
//! - [`overlay`]: node creation, deferred cancelable measurement, structure containers, annotation marks
//! - [`structure`]: structure tree model and role resolution
//! - [`reconstruct`]: the reconstruction pass and its logical arena
//! - [`range`]: endpoint resolution, cross-page splitting, rectangles
//! - [`highlight`]: per-page highlight index and redraws
//! - [`session`]: one open document tying everything together
//!
//! ## Quick Start
//!
//! ```ignore
//! use pdf_reflow::config::SessionConfig;
//! use pdf_reflow::geometry::Viewport;
//! use pdf_reflow::session::{DocumentSession, InMemorySource};
//!
//! # async fn run(source: InMemorySource) -> pdf_reflow::Result<()> {
//! let session = DocumentSession::new(source, SessionConfig::default());
//!
//! // Overlay for the first page
//! session.render(0, &Viewport::new(792.0, 1.5)).await?;
//!
//! // Reflowed markup for the whole document
//! if let Some(markup) = session.extract_document().await? {
//!     println!("{}", markup);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

// Error handling
pub mod error;

// Configuration
pub mod config;

// Page input
pub mod content;
pub mod geometry;

// Text overlay
pub mod overlay;

/// PDF logical structure (Tagged PDFs)
pub mod structure;

// Reflow reconstruction
pub mod reconstruct;

// Selection mapping and highlights
pub mod highlight;
pub mod range;

// Document session
pub mod session;

// Re-exports
pub use config::{OverlayConfig, ReconstructionConfig, SessionConfig};
pub use content::{McidKey, TextContent, TextFragment};
pub use error::{Error, Result};
pub use overlay::{PageOverlay, PositionedTextNode};
pub use range::{SelectionEndpoint, SelectionRange};
pub use reconstruct::ReconstructedDocument;
pub use session::{DocumentSession, DocumentSource};

// Version info
/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
