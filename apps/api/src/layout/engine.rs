//! Layout engine: turns a classified roster, its night order and the resolved
//! images into absolute-coordinate primitives.
//!
//! # Passes
//! 1. Header: logo, summary line, separator.
//! 2. Roster list: factions in canonical order, two columns, rows placed as
//!    synchronized pairs. The cursor after the last faction fixes the canvas height.
//! 3. Night columns: sized against that height, so they always come last.
//!
//! Pure and deterministic: the same inputs give the same coordinates.

use crate::assets::{ImageKey, ResolvedImages};
use crate::layout::primitives::{
    Badge, EmbeddedImage, LayoutPrimitive, PreviewDocument, RectShape, TextAnchor, TextBlock,
};
use crate::layout::text_wrap::wrap_text;
use crate::layout::theme::{LayoutConfig, NightColumnConfig};
use crate::models::roster::{CharacterRecord, Faction};
use crate::roster::{ClassifiedRoster, NightOrderPlan};

/// Lays out the whole preview document.
pub fn layout_preview(
    roster: &ClassifiedRoster,
    plan: &NightOrderPlan,
    images: &ResolvedImages,
    config: &LayoutConfig,
) -> PreviewDocument {
    let mut out = Vec::new();

    layout_header(roster, images, config, &mut out);
    let content_bottom = layout_roster_list(roster, images, config, &mut out);
    let height = canvas_height(content_bottom, config);
    layout_night_columns(roster, plan, images, height, config, &mut out);

    PreviewDocument {
        width: config.canvas_width,
        height,
        title: roster
            .meta
            .title
            .clone()
            .unwrap_or_else(|| config.title_fallback.clone()),
        author: roster.meta.author.clone(),
        primitives: out,
    }
}

/// Content bottom plus footer, never below the configured minimum.
pub fn canvas_height(content_bottom: f32, config: &LayoutConfig) -> f32 {
    (content_bottom + config.footer_height)
        .ceil()
        .max(config.min_canvas_height)
}

// ────────────────────────────────────────────────────────────────────────────
// Header
// ────────────────────────────────────────────────────────────────────────────

fn layout_header(
    roster: &ClassifiedRoster,
    images: &ResolvedImages,
    config: &LayoutConfig,
    out: &mut Vec<LayoutPrimitive>,
) {
    if let Some(href) = images.get(ImageKey::Logo) {
        out.push(LayoutPrimitive::Image(EmbeddedImage {
            x: config.content_left(),
            y: (config.header_height - config.logo_size) / 2.0 - 10.0,
            size: config.logo_size,
            href: href.to_string(),
        }));
    }

    let summary = format!(
        "{} · {}个角色 · 难度：{}",
        roster.players.label(),
        roster.total_characters,
        roster.difficulty.label
    );
    out.push(LayoutPrimitive::Text(TextBlock {
        x: config.canvas_width / 2.0,
        y: config.header_height - 44.0,
        lines: vec![summary],
        font_size: config.summary_font_size,
        line_height: config.summary_font_size,
        fill: config.palette.muted.clone(),
        bold: false,
        anchor: TextAnchor::Middle,
    }));

    out.push(LayoutPrimitive::Rect(RectShape {
        x: config.content_left(),
        y: config.header_height - 20.0,
        width: config.content_width(),
        height: 2.0,
        fill: config.palette.border.clone(),
        corner_radius: 0.0,
        opacity: 0.6,
    }));
}

// ────────────────────────────────────────────────────────────────────────────
// Roster list
// ────────────────────────────────────────────────────────────────────────────

/// Places every non-empty faction and returns the cursor after the last one.
pub fn layout_roster_list(
    roster: &ClassifiedRoster,
    images: &ResolvedImages,
    config: &LayoutConfig,
    out: &mut Vec<LayoutPrimitive>,
) -> f32 {
    let left_x = config.content_left();
    let right_x = left_x + config.column_width() + config.column_gutter;
    let mut y = config.header_height;

    for faction in Faction::ALL {
        let members: Vec<(usize, &CharacterRecord)> = roster.bucket(faction).collect();
        if members.is_empty() {
            continue;
        }

        layout_faction_header(faction, members.len(), y, config, out);
        y += config.faction_header_height;

        // Even index → left, odd → right. The cursor moves once per pair.
        for pair in members.chunks(2) {
            let (li, left) = pair[0];
            let left_h = layout_character(left, li, faction, left_x, y, images, config, out);
            let right_h = pair
                .get(1)
                .map(|(ri, right)| {
                    layout_character(right, *ri, faction, right_x, y, images, config, out)
                })
                .unwrap_or(0.0);
            y += left_h.max(right_h);
        }

        y += config.faction_gap;
    }

    y
}

fn layout_faction_header(
    faction: Faction,
    count: usize,
    y: f32,
    config: &LayoutConfig,
    out: &mut Vec<LayoutPrimitive>,
) {
    let style = config.faction_style(faction);
    let band_height = config.faction_header_height - 16.0;

    out.push(LayoutPrimitive::Rect(RectShape {
        x: config.content_left(),
        y: y + 8.0,
        width: config.content_width(),
        height: band_height,
        fill: style.accent.clone(),
        corner_radius: 6.0,
        opacity: 0.2,
    }));
    out.push(LayoutPrimitive::Text(TextBlock {
        x: config.content_left() + 12.0,
        y: y + 8.0 + (band_height + style.header_font_size) / 2.0 - 2.0,
        lines: vec![format!("{} · {}", style.label, count)],
        font_size: style.header_font_size,
        line_height: style.header_font_size,
        fill: style.accent.clone(),
        bold: true,
        anchor: TextAnchor::Start,
    }));
}

/// Height a character row needs for its wrapped ability text.
pub fn row_height(ability_lines: usize, config: &LayoutConfig) -> f32 {
    (ability_lines as f32 * config.line_height).max(config.min_row_height)
}

/// Places one roster entry with its top-left at (`x`, `y`) and returns its row height.
#[allow(clippy::too_many_arguments)]
fn layout_character(
    record: &CharacterRecord,
    index: usize,
    faction: Faction,
    x: f32,
    y: f32,
    images: &ResolvedImages,
    config: &LayoutConfig,
    out: &mut Vec<LayoutPrimitive>,
) -> f32 {
    let ability = wrap_text(
        &record.ability,
        config.ability_chars_per_line,
        config.ability_max_lines,
    );
    let height = row_height(ability.len(), config);
    let icon = config.icon_size;

    out.push(icon_or_badge(
        images.get(ImageKey::Character(index)),
        record,
        faction,
        x + icon / 2.0,
        y + icon / 2.0,
        icon,
        config,
    ));

    let name = wrap_text(&record.name, config.name_max_chars, 1);
    if !name.is_empty() {
        out.push(LayoutPrimitive::Text(TextBlock {
            x: x + icon / 2.0,
            y: y + icon + config.name_font_size + 4.0,
            lines: name,
            font_size: config.name_font_size,
            line_height: config.name_font_size,
            fill: config.palette.title.clone(),
            bold: true,
            anchor: TextAnchor::Middle,
        }));
    }

    if !ability.is_empty() {
        out.push(LayoutPrimitive::Text(TextBlock {
            x: x + icon + 16.0,
            y: y + config.ability_font_size,
            lines: ability,
            font_size: config.ability_font_size,
            line_height: config.line_height,
            fill: config.palette.text.clone(),
            bold: false,
            anchor: TextAnchor::Start,
        }));
    }

    height
}

/// The artwork when one resolved, otherwise an initial-letter badge.
fn icon_or_badge(
    href: Option<&str>,
    record: &CharacterRecord,
    faction: Faction,
    cx: f32,
    cy: f32,
    diameter: f32,
    config: &LayoutConfig,
) -> LayoutPrimitive {
    match href {
        Some(href) => LayoutPrimitive::Image(EmbeddedImage {
            x: cx - diameter / 2.0,
            y: cy - diameter / 2.0,
            size: diameter,
            href: href.to_string(),
        }),
        None => LayoutPrimitive::Badge(Badge {
            cx,
            cy,
            radius: diameter / 2.0,
            fill: config.faction_style(faction).accent.clone(),
            stroke: config.palette.border.clone(),
            glyph: record.initial(),
            glyph_fill: config.palette.glyph.clone(),
        }),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Night columns
// ────────────────────────────────────────────────────────────────────────────

/// Icon diameter and spacing for `count` icons stacked in `available` height.
///
/// Spacing targets `spacing_ratio × icon`; the icon is solved so the stack fills
/// `available` exactly, then both are clamped to their configured ranges.
pub fn night_icon_metrics(count: usize, available: f32, night: &NightColumnConfig) -> (f32, f32) {
    if count == 0 {
        return (0.0, 0.0);
    }
    let n = count as f32;
    let gaps = (count - 1) as f32;
    let icon = (available / (n + gaps * night.spacing_ratio)).clamp(night.min_icon, night.max_icon);
    let spacing = if count > 1 {
        ((available - n * icon) / gaps).clamp(night.min_spacing, night.max_spacing)
    } else {
        0.0
    };
    (icon, spacing)
}

enum NightSlot<'a> {
    Marker { glyph: &'a str, faction: Faction },
    Character { index: usize },
}

fn layout_night_columns(
    roster: &ClassifiedRoster,
    plan: &NightOrderPlan,
    images: &ResolvedImages,
    height: f32,
    config: &LayoutConfig,
    out: &mut Vec<LayoutPrimitive>,
) {
    let mut left: Vec<NightSlot> = Vec::new();
    if !plan.first_night.is_empty() {
        left.extend(config.recognition_markers.iter().map(|m| NightSlot::Marker {
            glyph: &m.glyph,
            faction: m.faction,
        }));
        left.extend(
            plan.first_night
                .iter()
                .map(|e| NightSlot::Character {
                    index: e.character_index,
                }),
        );
    }
    let right: Vec<NightSlot> = plan
        .other_night
        .iter()
        .map(|e| NightSlot::Character {
            index: e.character_index,
        })
        .collect();

    let count = left.len().max(right.len());
    if count == 0 {
        return;
    }

    let night = &config.night;
    let available = (height - night.top_margin - night.bottom_margin).max(0.0);
    let (icon, spacing) = night_icon_metrics(count, available, night);
    let block = count as f32 * icon + (count - 1) as f32 * spacing;
    let top = night.top_margin + ((available - block) / 2.0).max(0.0);

    let left_cx = config.side_column_width / 2.0;
    let right_cx = config.canvas_width - config.side_column_width / 2.0;

    for (cx, slots, caption) in [
        (left_cx, &left, &night.first_night_caption),
        (right_cx, &right, &night.other_night_caption),
    ] {
        if slots.is_empty() {
            continue;
        }
        out.push(LayoutPrimitive::Text(TextBlock {
            x: cx,
            y: (top - 8.0).max(night.caption_font_size),
            lines: vec![caption.clone()],
            font_size: night.caption_font_size,
            line_height: night.caption_font_size,
            fill: config.palette.muted.clone(),
            bold: false,
            anchor: TextAnchor::Middle,
        }));

        for (i, slot) in slots.iter().enumerate() {
            let cy = top + i as f32 * (icon + spacing) + icon / 2.0;
            out.push(night_slot(slot, roster, images, cx, cy, icon, config));
        }
    }
}

fn night_slot(
    slot: &NightSlot,
    roster: &ClassifiedRoster,
    images: &ResolvedImages,
    cx: f32,
    cy: f32,
    icon: f32,
    config: &LayoutConfig,
) -> LayoutPrimitive {
    match slot {
        NightSlot::Marker { glyph, faction } => LayoutPrimitive::Badge(Badge {
            cx,
            cy,
            radius: icon / 2.0,
            fill: config.faction_style(*faction).accent.clone(),
            stroke: config.palette.border.clone(),
            glyph: glyph.to_string(),
            glyph_fill: config.palette.glyph.clone(),
        }),
        NightSlot::Character { index } => {
            let character = &roster.characters[*index];
            icon_or_badge(
                images.get(ImageKey::Character(*index)),
                &character.record,
                character.faction,
                cx,
                cy,
                icon,
                config,
            )
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
