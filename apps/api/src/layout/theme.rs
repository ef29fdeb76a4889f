//! Static geometry and palette for the preview document.
//!
//! All sizes are in SVG user units (1 unit = 1 px at the standard raster tier).
//! The canvas width is fixed; height is derived from content by the engine.

use serde::Serialize;

use crate::models::roster::Faction;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

/// Per-faction header styling.
#[derive(Debug, Clone, Serialize)]
pub struct FactionStyle {
    pub label: String,
    pub accent: String,
    pub header_font_size: f32,
}

/// A synthetic entry drawn ahead of the first-night sequence.
#[derive(Debug, Clone, Serialize)]
pub struct RecognitionMarker {
    pub label: String,
    pub glyph: String,
    /// Supplies the badge colour.
    pub faction: Faction,
}

#[derive(Debug, Clone, Serialize)]
pub struct Palette {
    pub background_top: String,
    pub background_bottom: String,
    pub border: String,
    pub title: String,
    pub text: String,
    pub muted: String,
    pub glyph: String,
}

/// Night-order column sizing. Icon diameter and spacing are solved per document
/// so the longer column fills the available height, then clamped to these bounds.
#[derive(Debug, Clone, Serialize)]
pub struct NightColumnConfig {
    pub top_margin: f32,
    pub bottom_margin: f32,
    pub min_icon: f32,
    pub max_icon: f32,
    pub min_spacing: f32,
    pub max_spacing: f32,
    /// Target spacing as a fraction of the icon diameter before clamping.
    pub spacing_ratio: f32,
    pub caption_font_size: f32,
    pub first_night_caption: String,
    pub other_night_caption: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutConfig {
    pub canvas_width: f32,
    pub min_canvas_height: f32,
    /// Vertical space reserved for title, author, logo and summary line.
    pub header_height: f32,
    pub footer_height: f32,
    /// Width of each night-order column at the left and right edges.
    pub side_column_width: f32,
    pub content_padding: f32,
    pub column_gutter: f32,

    pub faction_header_height: f32,
    pub faction_gap: f32,
    pub min_row_height: f32,
    pub line_height: f32,
    pub icon_size: f32,
    pub ability_font_size: f32,
    pub ability_chars_per_line: usize,
    pub ability_max_lines: usize,
    pub name_font_size: f32,
    pub name_max_chars: usize,

    pub title_font_size: f32,
    pub author_font_size: f32,
    pub summary_font_size: f32,
    pub logo_size: f32,

    pub night: NightColumnConfig,
    pub recognition_markers: Vec<RecognitionMarker>,
    pub palette: Palette,
    /// Indexed by `Faction::index()`.
    pub factions: [FactionStyle; 6],
    pub font_family: String,
    pub title_fallback: String,
    pub watermark: String,
}

impl LayoutConfig {
    pub fn faction_style(&self, faction: Faction) -> &FactionStyle {
        &self.factions[faction.index()]
    }

    /// Left edge of the roster list area.
    pub fn content_left(&self) -> f32 {
        self.side_column_width + self.content_padding
    }

    pub fn content_width(&self) -> f32 {
        self.canvas_width - 2.0 * self.content_left()
    }

    pub fn column_width(&self) -> f32 {
        (self.content_width() - self.column_gutter) / 2.0
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Defaults
// ────────────────────────────────────────────────────────────────────────────

fn style(label: &str, accent: &str, header_font_size: f32) -> FactionStyle {
    FactionStyle {
        label: label.to_string(),
        accent: accent.to_string(),
        header_font_size,
    }
}

pub fn default_layout_config() -> LayoutConfig {
    LayoutConfig {
        canvas_width: 1200.0,
        min_canvas_height: 720.0,
        header_height: 200.0,
        footer_height: 60.0,
        side_column_width: 96.0,
        content_padding: 24.0,
        column_gutter: 32.0,

        faction_header_height: 52.0,
        faction_gap: 12.0,
        min_row_height: 96.0,
        line_height: 20.0,
        icon_size: 64.0,
        ability_font_size: 15.0,
        ability_chars_per_line: 19,
        ability_max_lines: 5,
        name_font_size: 14.0,
        name_max_chars: 6,

        title_font_size: 44.0,
        author_font_size: 18.0,
        summary_font_size: 16.0,
        logo_size: 120.0,

        night: NightColumnConfig {
            top_margin: 40.0,
            bottom_margin: 40.0,
            min_icon: 18.0,
            max_icon: 56.0,
            min_spacing: 4.0,
            max_spacing: 20.0,
            spacing_ratio: 0.25,
            caption_font_size: 13.0,
            first_night_caption: "首个夜晚".to_string(),
            other_night_caption: "其他夜晚".to_string(),
        },
        recognition_markers: vec![
            RecognitionMarker {
                label: "爪牙信息".to_string(),
                glyph: "爪".to_string(),
                faction: Faction::Minion,
            },
            RecognitionMarker {
                label: "恶魔信息".to_string(),
                glyph: "恶".to_string(),
                faction: Faction::Demon,
            },
        ],
        palette: Palette {
            background_top: "#1b1424".to_string(),
            background_bottom: "#0d0a12".to_string(),
            border: "#c9a45c".to_string(),
            title: "#f3e6c4".to_string(),
            text: "#e8e1d3".to_string(),
            muted: "#a59c8c".to_string(),
            glyph: "#ffffff".to_string(),
        },
        factions: [
            style("镇民", "#3a7bd5", 20.0),
            style("外来者", "#4fb3d9", 20.0),
            style("爪牙", "#d9534f", 20.0),
            style("恶魔", "#b3261e", 22.0),
            style("旅行者", "#8e6bbf", 18.0),
            style("传奇角色", "#d4a017", 18.0),
        ],
        font_family: "'Noto Sans SC', 'PingFang SC', 'Microsoft YaHei', sans-serif".to_string(),
        title_fallback: "未命名剧本".to_string(),
        watermark: "ScriptShare".to_string(),
    }
}
