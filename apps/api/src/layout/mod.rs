// Preview layout: fixed-width canvas, content-derived height.
// Produces absolute-coordinate primitives; the render module turns them into markup.
// Everything here is pure and synchronous.

pub mod engine;
pub mod primitives;
pub mod text_wrap;
pub mod theme;

// Re-export the public API consumed by the preview generator.
pub use engine::layout_preview;
pub use primitives::PreviewDocument;
pub use theme::{default_layout_config, LayoutConfig};
