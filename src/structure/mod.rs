//! PDF Logical Structure (Tagged PDF) support.
//!
//! The structure tree arrives already parsed from the rendering engine; this
//! module holds its types (ISO 32000-1:2008 Section 14.7) and the role
//! resolution used to turn structure types into output tags.
//!
//! ## Structure Tree
//!
//! A structure tree consists of:
//! - **StructTreeRoot**: The root of the structure hierarchy
//! - **StructElem**: Structure elements (paragraphs, headings, sections, etc.)
//! - **Marked Content References**: `(page, MCID)` leaves pointing into page text
//! - **RoleMap**: Custom structure types mapped onto standard ones

mod roles;
mod types;

pub use roles::{tag_for_role, RoleResolver};
pub use types::{StructChild, StructElem, StructTreeRoot, StructType};
