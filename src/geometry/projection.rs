//! Projection of text fragments into screen space.
//!
//! A fragment's text matrix is composed with the viewport transform; the
//! result gives the on-screen rotation, the font size in pixels and the
//! baseline origin, which is then shifted up by the font ascent so the
//! overlay node's top-left corner lines up with the rendered glyphs.

use super::Matrix;
use crate::content::{FontStyle, TextFragment};
use serde::{Deserialize, Serialize};

/// Mapping from PDF user space to screen pixels for one page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    /// User space → screen transform
    pub transform: Matrix,
    /// Zoom factor included in `transform`
    pub scale: f32,
}

impl Viewport {
    /// Unrotated viewport for a page of `page_height` points at `scale`.
    ///
    /// Flips the y axis so screen y grows downwards.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_reflow::geometry::Viewport;
    ///
    /// let vp = Viewport::new(792.0, 1.5);
    /// let p = vp.transform.transform_point(0.0, 792.0);
    /// assert_eq!(p.y, 0.0);
    /// ```
    pub fn new(page_height: f32, scale: f32) -> Self {
        Self {
            transform: Matrix::new(scale, 0.0, 0.0, -scale, 0.0, page_height * scale),
            scale,
        }
    }

    /// Viewport with an explicit transform (rotated pages, offsets).
    pub fn with_transform(transform: Matrix, scale: f32) -> Self {
        Self { transform, scale }
    }
}

/// Where and how a fragment lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    /// Left edge of the node in pixels
    pub left: f32,
    /// Top edge of the node in pixels
    pub top: f32,
    /// Rotation in degrees, exactly 0 for axis-aligned text
    pub angle: f32,
    /// Font size in pixels
    pub font_size: f32,
    /// Width the rendered glyphs occupy on screen; `None` for runs too short
    /// to be worth scaling
    pub canvas_width: Option<f32>,
}

/// Project one fragment through `viewport` using its font `style`.
pub fn project_fragment(viewport: &Viewport, fragment: &TextFragment, style: &FontStyle) -> Projection {
    let tx = fragment.transform.multiply(&viewport.transform);

    let mut angle = tx.b.atan2(tx.a);
    if style.vertical {
        angle += std::f32::consts::FRAC_PI_2;
    }

    let font_height = (tx.c * tx.c + tx.d * tx.d).sqrt();
    let font_ascent = match (style.ascent, style.descent) {
        (Some(ascent), _) if ascent != 0.0 => ascent * font_height,
        (_, Some(descent)) if descent != 0.0 => (1.0 + descent) * font_height,
        _ => font_height,
    };

    let (left, top) = if angle == 0.0 {
        (tx.e, tx.f - font_ascent)
    } else {
        (tx.e + font_ascent * angle.sin(), tx.f - font_ascent * angle.cos())
    };

    // Single characters are not scaled: it barely changes highlighting and
    // skipping it keeps pages with many tiny runs cheap to lay out.
    let canvas_width = if fragment.char_len() > 1 {
        let extent = if style.vertical {
            fragment.height
        } else {
            fragment.width
        };
        Some(extent * viewport.scale)
    } else {
        None
    };

    Projection {
        left,
        top,
        angle: angle.to_degrees(),
        font_size: font_height,
        canvas_width,
    }
}
