//! Input normalization: the only place that guesses at the roster's shape.
//!
//! Accepts either a flat array (bare id strings or objects, optionally carrying a
//! `_meta` record) or an object exposing a `characters` array plus descriptive
//! fields. Everything downstream works from the resulting `RosterDocument`.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::models::roster::{
    CharacterRecord, DifficultyInput, Faction, ImageRef, RosterDocument, RosterMeta,
};

/// Id of the pseudo-record that carries script metadata.
pub const META_ID: &str = "_meta";
/// Team tag reserved for interaction-rule pseudo-records.
pub const INTERACTION_RULE_TEAM: &str = "a jinxed";

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("roster is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("roster must be a JSON array or an object with a `characters` array, got {0}")]
    Shape(&'static str),
}

/// Parses raw request bytes into a canonical roster.
pub fn parse_roster(bytes: &[u8]) -> Result<RosterDocument, RosterError> {
    let value: Value = serde_json::from_slice(bytes)?;
    normalize_roster(&value)
}

/// Normalizes an already-parsed JSON value into a canonical roster.
///
/// Only the top-level shape can fail. Individual entries that cannot be read as
/// characters are skipped.
pub fn normalize_roster(value: &Value) -> Result<RosterDocument, RosterError> {
    let (entries, mut meta) = match value {
        Value::Array(items) => (items.as_slice(), RosterMeta::default()),
        Value::Object(obj) => match obj.get("characters") {
            Some(Value::Array(items)) => (items.as_slice(), read_meta(obj)),
            _ => return Err(RosterError::Shape("an object without a `characters` array")),
        },
        other => return Err(RosterError::Shape(json_kind(other))),
    };

    let mut characters = Vec::with_capacity(entries.len());
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            Value::String(id) => {
                let id = id.trim();
                if id.is_empty() || id == META_ID {
                    continue;
                }
                characters.push(CharacterRecord {
                    id: id.to_string(),
                    name: id.to_string(),
                    ..Default::default()
                });
            }
            Value::Object(obj) => {
                if string_field(obj, "id").as_deref() == Some(META_ID) {
                    merge_meta(&mut meta, read_meta(obj));
                    continue;
                }
                let team = string_field(obj, "team");
                if team
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(INTERACTION_RULE_TEAM))
                {
                    debug!("Skipping interaction rule at roster index {i}");
                    continue;
                }
                characters.push(read_character(obj, team));
            }
            other => debug!(
                "Skipping roster entry {i}: expected object or string, got {}",
                json_kind(other)
            ),
        }
    }

    Ok(RosterDocument { meta, characters })
}

// ────────────────────────────────────────────────────────────────────────────
// Field readers
// ────────────────────────────────────────────────────────────────────────────

fn read_character(obj: &Map<String, Value>, team: Option<String>) -> CharacterRecord {
    let name = string_field(obj, "name");
    let id = string_field(obj, "id")
        .or_else(|| name.clone())
        .unwrap_or_default();
    let faction = team.as_deref().and_then(Faction::from_tag);
    let raw_team = if faction.is_none() { team } else { None };

    let mut reminders = string_list(obj.get("reminders"));
    reminders.extend(string_list(obj.get("remindersGlobal")));

    CharacterRecord {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        faction,
        raw_team,
        ability: string_field(obj, "ability").unwrap_or_default(),
        image: image_field(obj.get("image")),
        first_night: obj.get("firstNight").and_then(positive_int),
        other_night: obj.get("otherNight").and_then(positive_int),
        first_night_reminder: string_field(obj, "firstNightReminder").unwrap_or_default(),
        other_night_reminder: string_field(obj, "otherNightReminder").unwrap_or_default(),
        reminders,
    }
}

fn read_meta(obj: &Map<String, Value>) -> RosterMeta {
    let player_count = ["playerCount", "player_count", "players"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(positive_int));

    let setup_slots = match obj.get("setup") {
        Some(Value::Array(slots)) if !slots.is_empty() => Some(slots.len()),
        _ => None,
    };

    RosterMeta {
        title: string_field(obj, "title").or_else(|| string_field(obj, "name")),
        author: string_field(obj, "author"),
        logo: image_field(obj.get("logo")),
        description: string_field(obj, "description"),
        tags: string_list(obj.get("tags")),
        player_count,
        setup_slots,
        difficulty: obj.get("difficulty").and_then(difficulty_field),
    }
}

/// Fields present in `overrides` replace those in `base`.
fn merge_meta(base: &mut RosterMeta, overrides: RosterMeta) {
    if overrides.title.is_some() {
        base.title = overrides.title;
    }
    if overrides.author.is_some() {
        base.author = overrides.author;
    }
    if !overrides.logo.is_none() {
        base.logo = overrides.logo;
    }
    if overrides.description.is_some() {
        base.description = overrides.description;
    }
    if !overrides.tags.is_empty() {
        base.tags = overrides.tags;
    }
    if overrides.player_count.is_some() {
        base.player_count = overrides.player_count;
    }
    if overrides.setup_slots.is_some() {
        base.setup_slots = overrides.setup_slots;
    }
    if overrides.difficulty.is_some() {
        base.difficulty = overrides.difficulty;
    }
}

/// Strings are trimmed; numbers are stringified; blanks count as absent.
fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn image_field(value: Option<&Value>) -> ImageRef {
    match value {
        Some(Value::String(s)) => ImageRef::parse(s),
        Some(Value::Array(items)) => items
            .iter()
            .find_map(|v| v.as_str())
            .map(ImageRef::parse)
            .unwrap_or_default(),
        _ => ImageRef::None,
    }
}

/// Accepts integers, integral floats and numeric strings. Zero, negatives and
/// fractions are treated as absent.
pub fn positive_int(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
        Some(n as u32)
    } else {
        None
    }
}

fn difficulty_field(value: &Value) -> Option<DifficultyInput> {
    match value {
        Value::Number(n) => n.as_f64().map(DifficultyInput::Level),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else if let Ok(level) = s.parse::<f64>() {
                Some(DifficultyInput::Level(level))
            } else {
                Some(DifficultyInput::Label(s.to_string()))
            }
        }
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flat_array_with_leading_meta() {
        let doc = normalize_roster(&json!([
            { "id": "_meta", "name": "暗流涌动", "author": "Steven", "logo": "https://x.test/logo.png" },
            { "id": "washerwoman", "name": "洗衣妇", "team": "townsfolk", "ability": "...", "firstNight": 32 },
            "imp"
        ]))
        .unwrap();

        assert_eq!(doc.meta.title.as_deref(), Some("暗流涌动"));
        assert_eq!(doc.meta.author.as_deref(), Some("Steven"));
        assert!(matches!(doc.meta.logo, ImageRef::Url(_)));
        assert_eq!(doc.characters.len(), 2);
        assert_eq!(doc.characters[0].faction, Some(Faction::Townsfolk));
        assert_eq!(doc.characters[0].first_night, Some(32));
        assert_eq!(doc.characters[1].id, "imp");
        assert_eq!(doc.characters[1].faction, None);
    }

    #[test]
    fn test_object_form_reads_descriptive_fields() {
        let doc = normalize_roster(&json!({
            "title": "Custom",
            "playerCount": "10",
            "difficulty": 3,
            "tags": ["new", " ", "fun"],
            "description": "desc",
            "unknownField": { "ignored": true },
            "characters": [{ "id": "chef", "team": "townsfolk" }]
        }))
        .unwrap();

        assert_eq!(doc.meta.title.as_deref(), Some("Custom"));
        assert_eq!(doc.meta.player_count, Some(10));
        assert_eq!(doc.meta.difficulty, Some(DifficultyInput::Level(3.0)));
        assert_eq!(doc.meta.tags, vec!["new".to_string(), "fun".to_string()]);
        assert_eq!(doc.characters.len(), 1);
    }

    #[test]
    fn test_meta_record_overrides_object_fields() {
        let doc = normalize_roster(&json!({
            "title": "Outer",
            "author": "Outer Author",
            "characters": [{ "id": "_meta", "name": "Inner" }]
        }))
        .unwrap();
        assert_eq!(doc.meta.title.as_deref(), Some("Inner"));
        assert_eq!(doc.meta.author.as_deref(), Some("Outer Author"));
        assert!(doc.characters.is_empty());
    }

    #[test]
    fn test_interaction_rules_are_discarded() {
        let doc = normalize_roster(&json!([
            { "id": "spy_alchemist", "team": "a jinxed", "ability": "..." },
            { "id": "spy", "team": "minion" }
        ]))
        .unwrap();
        assert_eq!(doc.characters.len(), 1);
        assert_eq!(doc.characters[0].id, "spy");
    }

    #[test]
    fn test_unrecognized_team_kept_as_raw() {
        let doc = normalize_roster(&json!([{ "id": "x", "team": "villain" }])).unwrap();
        assert_eq!(doc.characters[0].faction, None);
        assert_eq!(doc.characters[0].raw_team.as_deref(), Some("villain"));
    }

    #[test]
    fn test_loose_typing_of_fields() {
        let doc = normalize_roster(&json!([{
            "id": 42,
            "firstNight": "7",
            "otherNight": 2.5,
            "image": ["https://x.test/a.png", "https://x.test/b.png"],
            "reminders": ["Poisoned", 3],
            "remindersGlobal": ["Dead"]
        }]))
        .unwrap();
        let rec = &doc.characters[0];
        assert_eq!(rec.id, "42");
        assert_eq!(rec.name, "42");
        assert_eq!(rec.first_night, Some(7));
        assert_eq!(rec.other_night, None);
        assert_eq!(rec.image, ImageRef::Url("https://x.test/a.png".to_string()));
        assert_eq!(rec.reminders, vec!["Poisoned".to_string(), "Dead".to_string()]);
    }

    #[test]
    fn test_positive_int_rejects_non_positive() {
        assert_eq!(positive_int(&json!(0)), None);
        assert_eq!(positive_int(&json!(-3)), None);
        assert_eq!(positive_int(&json!("abc")), None);
        assert_eq!(positive_int(&json!(null)), None);
        assert_eq!(positive_int(&json!(4.0)), Some(4));
    }

    #[test]
    fn test_non_roster_shapes_rejected() {
        assert!(matches!(
            normalize_roster(&json!("hello")),
            Err(RosterError::Shape("a string"))
        ));
        assert!(matches!(
            normalize_roster(&json!({ "name": "no characters" })),
            Err(RosterError::Shape(_))
        ));
        assert!(matches!(parse_roster(b"{not json"), Err(RosterError::Json(_))));
    }

    #[test]
    fn test_empty_array_is_empty_roster() {
        let doc = parse_roster(b"[]").unwrap();
        assert!(doc.characters.is_empty());
        assert_eq!(doc.meta, RosterMeta::default());
    }

    #[test]
    fn test_non_object_entries_skipped() {
        let doc = normalize_roster(&json!([1, null, "  ", { "id": "chef" }])).unwrap();
        assert_eq!(doc.characters.len(), 1);
    }
}
