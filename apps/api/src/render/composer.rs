//! SVG serialization of a laid-out preview document.
//!
//! Build-once, serialize-once: the layout engine accumulates primitives and this
//! module writes them out in paint order, wrapped in the fixed chrome
//! (background gradient, border, title, author, watermark).

use std::collections::HashMap;
use std::fmt::Write;

use crate::layout::primitives::{
    Badge, EmbeddedImage, LayoutPrimitive, PreviewDocument, RectShape, TextAnchor, TextBlock,
};
use crate::layout::theme::LayoutConfig;

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

const TITLE_BASELINE: f32 = 72.0;
const AUTHOR_BASELINE: f32 = 108.0;
const BORDER_INSET: f32 = 8.0;

/// Serializes `doc` into a standalone SVG document.
pub fn compose_svg(doc: &PreviewDocument, config: &LayoutConfig) -> String {
    let mut out = String::with_capacity(16 * 1024 + doc.primitives.len() * 256);
    let palette = &config.palette;

    // `write!` into a String cannot fail.
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{font}">"#,
        w = num(doc.width),
        h = num(doc.height),
        font = escape_xml(&config.font_family),
    );

    let symbols = write_defs(&mut out, doc, config);

    let _ = write!(
        out,
        r#"<rect x="0" y="0" width="{}" height="{}" fill="url(#bg)"/>"#,
        num(doc.width),
        num(doc.height)
    );
    let _ = write!(
        out,
        r#"<rect x="{i}" y="{i}" width="{}" height="{}" rx="12" fill="none" stroke="{}" stroke-width="2"/>"#,
        num(doc.width - 2.0 * BORDER_INSET),
        num(doc.height - 2.0 * BORDER_INSET),
        escape_xml(&palette.border),
        i = num(BORDER_INSET),
    );

    write_text(
        &mut out,
        &TextBlock {
            x: doc.width / 2.0,
            y: TITLE_BASELINE,
            lines: vec![doc.title.clone()],
            font_size: config.title_font_size,
            line_height: config.title_font_size,
            fill: palette.title.clone(),
            bold: true,
            anchor: TextAnchor::Middle,
        },
    );
    if let Some(author) = doc.author.as_deref().filter(|a| !a.trim().is_empty()) {
        write_text(
            &mut out,
            &TextBlock {
                x: doc.width / 2.0,
                y: AUTHOR_BASELINE,
                lines: vec![author.to_string()],
                font_size: config.author_font_size,
                line_height: config.author_font_size,
                fill: palette.muted.clone(),
                bold: false,
                anchor: TextAnchor::Middle,
            },
        );
    }

    let mut clip_index = 0;
    for primitive in &doc.primitives {
        match primitive {
            LayoutPrimitive::Text(t) => write_text(&mut out, t),
            LayoutPrimitive::Badge(b) => write_badge(&mut out, b),
            LayoutPrimitive::Image(img) => {
                let symbol = symbols.get(img.href.as_str()).copied().unwrap_or_default();
                write_image(&mut out, img, symbol, clip_index);
                clip_index += 1;
            }
            LayoutPrimitive::Rect(r) => write_rect(&mut out, r),
        }
    }

    write_text(
        &mut out,
        &TextBlock {
            x: doc.width - BORDER_INSET - 16.0,
            y: doc.height - BORDER_INSET - 16.0,
            lines: vec![config.watermark.clone()],
            font_size: 12.0,
            line_height: 12.0,
            fill: palette.muted.clone(),
            bold: false,
            anchor: TextAnchor::End,
        },
    );

    out.push_str("</svg>");
    out
}

// ────────────────────────────────────────────────────────────────────────────
// Fragments
// ────────────────────────────────────────────────────────────────────────────

/// Background gradient, one circular clip path per placed image (in paint
/// order), and one `<symbol>` per distinct image payload.
///
/// Returns the symbol index for each payload. A character drawn in the roster
/// list and both night columns embeds its artwork once.
fn write_defs<'a>(
    out: &mut String,
    doc: &'a PreviewDocument,
    config: &LayoutConfig,
) -> HashMap<&'a str, usize> {
    let palette = &config.palette;
    out.push_str("<defs>");
    let _ = write!(
        out,
        r#"<linearGradient id="bg" x1="0" y1="0" x2="0" y2="1"><stop offset="0" stop-color="{}"/><stop offset="1" stop-color="{}"/></linearGradient>"#,
        escape_xml(&palette.background_top),
        escape_xml(&palette.background_bottom),
    );
    for (i, img) in doc.images().enumerate() {
        let r = img.size / 2.0;
        let _ = write!(
            out,
            r#"<clipPath id="clip{i}"><circle cx="{}" cy="{}" r="{}"/></clipPath>"#,
            num(img.x + r),
            num(img.y + r),
            num(r),
        );
    }

    let mut symbols: HashMap<&str, usize> = HashMap::new();
    for img in doc.images() {
        if symbols.contains_key(img.href.as_str()) {
            continue;
        }
        let id = symbols.len();
        let _ = write!(
            out,
            r#"<symbol id="img{id}" viewBox="0 0 1 1" preserveAspectRatio="xMidYMid slice"><image width="1" height="1" preserveAspectRatio="xMidYMid slice" href="{}"/></symbol>"#,
            escape_xml(&img.href),
        );
        symbols.insert(img.href.as_str(), id);
    }
    out.push_str("</defs>");
    symbols
}

fn write_text(out: &mut String, t: &TextBlock) {
    if t.lines.is_empty() {
        return;
    }
    let anchor = match t.anchor {
        TextAnchor::Start => "start",
        TextAnchor::Middle => "middle",
        TextAnchor::End => "end",
    };
    let _ = write!(
        out,
        r#"<text x="{x}" y="{}" font-size="{}" fill="{}" text-anchor="{anchor}"{}>"#,
        num(t.y),
        num(t.font_size),
        escape_xml(&t.fill),
        if t.bold { r#" font-weight="bold""# } else { "" },
        x = num(t.x),
    );
    if let [line] = t.lines.as_slice() {
        out.push_str(&escape_xml(line));
    } else {
        for (i, line) in t.lines.iter().enumerate() {
            let dy = if i == 0 { 0.0 } else { t.line_height };
            let _ = write!(
                out,
                r#"<tspan x="{}" dy="{}">{}</tspan>"#,
                num(t.x),
                num(dy),
                escape_xml(line)
            );
        }
    }
    out.push_str("</text>");
}

fn write_badge(out: &mut String, b: &Badge) {
    let _ = write!(
        out,
        r#"<circle cx="{}" cy="{}" r="{}" fill="{}" stroke="{}" stroke-width="2"/>"#,
        num(b.cx),
        num(b.cy),
        num(b.radius),
        escape_xml(&b.fill),
        escape_xml(&b.stroke),
    );
    // Baseline offset that visually centers a single glyph.
    let font_size = b.radius;
    let _ = write!(
        out,
        r#"<text x="{}" y="{}" font-size="{}" fill="{}" text-anchor="middle" font-weight="bold">{}</text>"#,
        num(b.cx),
        num(b.cy + font_size * 0.35),
        num(font_size),
        escape_xml(&b.glyph_fill),
        escape_xml(&b.glyph),
    );
}

/// The clip sits on a wrapping group so it stays in canvas coordinates.
fn write_image(out: &mut String, img: &EmbeddedImage, symbol: usize, clip_index: usize) {
    let _ = write!(
        out,
        r##"<g clip-path="url(#clip{clip_index})"><use href="#img{symbol}" x="{}" y="{}" width="{s}" height="{s}"/></g>"##,
        num(img.x),
        num(img.y),
        s = num(img.size),
    );
}

fn write_rect(out: &mut String, r: &RectShape) {
    let _ = write!(
        out,
        r#"<rect x="{}" y="{}" width="{}" height="{}" fill="{}""#,
        num(r.x),
        num(r.y),
        num(r.width),
        num(r.height),
        escape_xml(&r.fill),
    );
    if r.corner_radius > 0.0 {
        let _ = write!(out, r#" rx="{}""#, num(r.corner_radius));
    }
    if r.opacity < 1.0 {
        let _ = write!(out, r#" opacity="{:.2}""#, r.opacity);
    }
    out.push_str("/>");
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

/// Fixed one-decimal formatting keeps output byte-stable across runs.
fn num(v: f32) -> String {
    format!("{v:.1}")
}

/// Escapes markup characters and drops anything outside the XML 1.0 `Char`
/// production (C0 controls other than tab/newline/return, U+FFFE, U+FFFF).
pub fn escape_xml(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\t' | '\n' | '\r' => escaped.push(c),
            '\u{0}'..='\u{1f}' | '\u{fffe}' | '\u{ffff}' => {}
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::theme::default_layout_config;

    fn doc(primitives: Vec<LayoutPrimitive>) -> PreviewDocument {
        PreviewDocument {
            width: 1200.0,
            height: 720.0,
            title: "Trouble & <Brewing>".to_string(),
            author: Some("Author".to_string()),
            primitives,
        }
    }

    fn image(x: f32) -> LayoutPrimitive {
        LayoutPrimitive::Image(EmbeddedImage {
            x,
            y: 10.0,
            size: 64.0,
            href: "data:image/png;base64,iVBORw0KGgo=".to_string(),
        })
    }

    #[test]
    fn test_declares_canvas_dimensions() {
        let svg = compose_svg(&doc(vec![]), &default_layout_config());
        assert!(svg.starts_with("<svg "));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(r#"width="1200.0" height="720.0" viewBox="0 0 1200.0 720.0""#));
    }

    #[test]
    fn test_title_is_escaped() {
        let svg = compose_svg(&doc(vec![]), &default_layout_config());
        assert!(svg.contains("Trouble &amp; &lt;Brewing&gt;"));
        assert!(!svg.contains("<Brewing>"));
    }

    #[test]
    fn test_one_clip_path_per_image() {
        let svg = compose_svg(&doc(vec![image(0.0), image(100.0)]), &default_layout_config());
        assert_eq!(svg.matches("<clipPath ").count(), 2);
        assert!(svg.contains(r#"clip-path="url(#clip0)""#));
        assert!(svg.contains(r#"clip-path="url(#clip1)""#));
        assert!(svg.contains(r#"<circle cx="132.0" cy="42.0" r="32.0"/>"#));
    }

    #[test]
    fn test_control_characters_are_dropped() {
        assert_eq!(escape_xml("Trouble\u{1}Brewing\u{1b}"), "TroubleBrewing");
        assert_eq!(escape_xml("a\tb\nc"), "a\tb\nc");
        assert_eq!(escape_xml("x\u{fffe}y\u{ffff}"), "xy");

        let mut d = doc(vec![LayoutPrimitive::Text(TextBlock {
            x: 10.0,
            y: 20.0,
            lines: vec!["poi\u{8}soner".to_string()],
            font_size: 15.0,
            line_height: 20.0,
            fill: "#000".to_string(),
            bold: false,
            anchor: TextAnchor::Start,
        })]);
        d.title = "Trouble\u{1}Brewing".to_string();
        d.author = Some("\u{0}someone".to_string());
        let svg = compose_svg(&d, &default_layout_config());
        assert!(svg.contains(">TroubleBrewing<"));
        assert!(svg.contains(">poisoner<"));
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default());
        assert!(tree.is_ok(), "{:?}", tree.err());
    }

    #[test]
    fn test_repeated_payload_is_embedded_once() {
        let other = LayoutPrimitive::Image(EmbeddedImage {
            x: 300.0,
            y: 10.0,
            size: 32.0,
            href: "data:image/jpeg;base64,/9j/4AAQ".to_string(),
        });
        let svg = compose_svg(
            &doc(vec![image(0.0), image(100.0), other, image(200.0)]),
            &default_layout_config(),
        );

        assert_eq!(svg.matches("data:image/png;base64,iVBORw0KGgo=").count(), 1);
        assert_eq!(svg.matches("data:image/jpeg;base64,/9j/4AAQ").count(), 1);
        assert_eq!(svg.matches("<symbol ").count(), 2);
        assert_eq!(svg.matches("<use ").count(), 4);
        assert_eq!(svg.matches(r##"href="#img0""##).count(), 3);
        assert!(svg.contains(
            r##"<g clip-path="url(#clip2)"><use href="#img1" x="300.0" y="10.0" width="32.0" height="32.0"/></g>"##
        ));
    }

    #[test]
    fn test_multiline_text_uses_tspans() {
        let block = LayoutPrimitive::Text(TextBlock {
            x: 10.0,
            y: 20.0,
            lines: vec!["one".to_string(), "two".to_string()],
            font_size: 15.0,
            line_height: 20.0,
            fill: "#000".to_string(),
            bold: false,
            anchor: TextAnchor::Start,
        });
        let svg = compose_svg(&doc(vec![block]), &default_layout_config());
        assert!(svg.contains(r#"<tspan x="10.0" dy="0.0">one</tspan><tspan x="10.0" dy="20.0">two</tspan>"#));
    }

    #[test]
    fn test_badge_renders_circle_and_glyph() {
        let badge = LayoutPrimitive::Badge(Badge {
            cx: 50.0,
            cy: 50.0,
            radius: 20.0,
            fill: "#d9534f".to_string(),
            stroke: "#fff".to_string(),
            glyph: "爪".to_string(),
            glyph_fill: "#fff".to_string(),
        });
        let svg = compose_svg(&doc(vec![badge]), &default_layout_config());
        assert!(svg.contains(r##"<circle cx="50.0" cy="50.0" r="20.0" fill="#d9534f""##));
        assert!(svg.contains(">爪</text>"));
    }

    #[test]
    fn test_missing_author_is_omitted() {
        let mut d = doc(vec![]);
        d.author = None;
        let config = default_layout_config();
        let svg = compose_svg(&d, &config);
        assert!(!svg.contains(">Author<"));
        assert!(svg.contains(&config.watermark));
    }

    #[test]
    fn test_output_parses_as_svg() {
        let rect = LayoutPrimitive::Rect(RectShape {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
            fill: "#fff".to_string(),
            corner_radius: 2.0,
            opacity: 0.5,
        });
        let svg = compose_svg(&doc(vec![rect, image(0.0)]), &default_layout_config());
        let tree = usvg::Tree::from_str(&svg, &usvg::Options::default());
        assert!(tree.is_ok(), "{:?}", tree.err());
        let tree = tree.unwrap();
        assert_eq!(tree.size().width(), 1200.0);
        assert_eq!(tree.size().height(), 720.0);
    }
}
