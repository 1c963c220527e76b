//! DrawDeck Render Library
//!
//! Painters for the alignment guide overlay. The default implementation
//! records into a Vello scene the host composites over the canvas.

mod overlay;

#[cfg(feature = "vello-renderer")]
mod vello_impl;

pub use overlay::{GuideOverlay, GuideSegment, guide_color, guide_stroke};

#[cfg(feature = "vello-renderer")]
pub use vello_impl::VelloGuidePainter;
