//! Superscript and subscript detection from baseline shifts.
//!
//! Positions are compared in PDF user space (y grows upwards). A fragment
//! is a script when it starts within one font height of the previous
//! fragment's right edge and its baseline sits above (superscript) or below
//! (subscript) the running baseline by less than one font height.

use crate::content::TextFragment;

const BASELINE_TOLERANCE: f32 = 1e-3;

/// Direction of a baseline shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Raised baseline
    Superscript,
    /// Lowered baseline
    Subscript,
}

impl ScriptKind {
    /// Wrapper tag name.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Superscript => "sup",
            Self::Subscript => "sub",
        }
    }
}

/// Running baseline state for the fragments placed under one parent.
#[derive(Debug, Clone, Default)]
pub struct BaselineTracker {
    baseline: Option<f32>,
    prev_right: Option<f32>,
}

impl BaselineTracker {
    /// Classify `fragment` and advance the state.
    ///
    /// Normal fragments move the running baseline; script fragments leave it
    /// where it is so a run of them keeps shifting in the same direction.
    pub fn classify(&mut self, fragment: &TextFragment) -> Option<ScriptKind> {
        let t = &fragment.transform;
        let x = t.e;
        let y = t.f;
        let font_height = (t.c * t.c + t.d * t.d).sqrt();
        let right = x + fragment.width;

        let kind = match (self.baseline, self.prev_right) {
            (Some(baseline), Some(prev_right)) if font_height > 0.0 => {
                let near = (x - prev_right).abs() <= font_height;
                let dy = y - baseline;
                if near && dy.abs() > BASELINE_TOLERANCE && dy.abs() < font_height {
                    Some(if dy > 0.0 {
                        ScriptKind::Superscript
                    } else {
                        ScriptKind::Subscript
                    })
                } else {
                    None
                }
            },
            _ => None,
        };

        if kind.is_none() {
            self.baseline = Some(y);
        }
        self.prev_right = Some(right);
        kind
    }
}
