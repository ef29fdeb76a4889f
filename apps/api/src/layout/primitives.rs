//! Absolute-coordinate draw primitives produced by the layout engine.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

/// One or more lines of text. `y` is the baseline of the first line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextBlock {
    pub x: f32,
    pub y: f32,
    pub lines: Vec<String>,
    pub font_size: f32,
    pub line_height: f32,
    pub fill: String,
    pub bold: bool,
    pub anchor: TextAnchor,
}

/// A filled circle with a centered glyph, used in place of missing artwork.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Badge {
    pub cx: f32,
    pub cy: f32,
    pub radius: f32,
    pub fill: String,
    pub stroke: String,
    pub glyph: String,
    pub glyph_fill: String,
}

/// An inline image clipped to a circle inscribed in its square box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedImage {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    /// Always a `data:` URI.
    pub href: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RectShape {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub fill: String,
    pub corner_radius: f32,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayoutPrimitive {
    Text(TextBlock),
    Badge(Badge),
    Image(EmbeddedImage),
    Rect(RectShape),
}

/// The finished layout: fixed width, computed height, primitives in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewDocument {
    pub width: f32,
    pub height: f32,
    pub title: String,
    pub author: Option<String>,
    pub primitives: Vec<LayoutPrimitive>,
}

impl PreviewDocument {
    pub fn images(&self) -> impl Iterator<Item = &EmbeddedImage> {
        self.primitives.iter().filter_map(|p| match p {
            LayoutPrimitive::Image(img) => Some(img),
            _ => None,
        })
    }

    #[cfg(test)]
    pub fn badges(&self) -> impl Iterator<Item = &Badge> {
        self.primitives.iter().filter_map(|p| match p {
            LayoutPrimitive::Badge(b) => Some(b),
            _ => None,
        })
    }
}
