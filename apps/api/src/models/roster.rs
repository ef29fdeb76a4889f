//! Canonical roster types produced by input normalization and consumed by every
//! later stage of preview generation.

use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// Faction
// ────────────────────────────────────────────────────────────────────────────

/// The six canonical role categories.
///
/// Declaration order is the canonical rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Townsfolk,
    Outsider,
    Minion,
    Demon,
    Traveler,
    Fabled,
}

impl Faction {
    pub const ALL: [Faction; 6] = [
        Faction::Townsfolk,
        Faction::Outsider,
        Faction::Minion,
        Faction::Demon,
        Faction::Traveler,
        Faction::Fabled,
    ];

    /// Parses an explicit team tag. Returns `None` for anything unrecognized,
    /// which leaves the record to the keyword fallback.
    pub fn from_tag(tag: &str) -> Option<Faction> {
        match tag.trim().to_lowercase().as_str() {
            "townsfolk" | "镇民" => Some(Faction::Townsfolk),
            "outsider" | "外来者" => Some(Faction::Outsider),
            "minion" | "爪牙" => Some(Faction::Minion),
            "demon" | "恶魔" => Some(Faction::Demon),
            "traveler" | "traveller" | "旅行者" => Some(Faction::Traveler),
            "fabled" | "传奇角色" => Some(Faction::Fabled),
            _ => None,
        }
    }

    /// Travelers and Fabled never take part in the night order.
    pub fn acts_at_night(self) -> bool {
        !matches!(self, Faction::Traveler | Faction::Fabled)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Images
// ────────────────────────────────────────────────────────────────────────────

/// Where a character's artwork comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ImageRef {
    #[default]
    None,
    /// An `http(s)://` reference that must be fetched and embedded.
    Url(String),
    /// An inline `data:image/...` URI, already embeddable.
    Embedded(String),
}

impl ImageRef {
    /// Classifies a raw image string. Anything that is neither a network URL
    /// nor an inline payload is dropped.
    pub fn parse(raw: &str) -> ImageRef {
        let raw = raw.trim();
        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("https://") || lower.starts_with("http://") {
            ImageRef::Url(raw.to_string())
        } else if lower.starts_with("data:image/") {
            ImageRef::Embedded(raw.to_string())
        } else {
            ImageRef::None
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ImageRef::None)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Records
// ────────────────────────────────────────────────────────────────────────────

/// One character as it appeared in the input, after loose-typing cleanup.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub id: String,
    pub name: String,
    /// Explicit team tag, if it was one of the recognized ones.
    pub faction: Option<Faction>,
    /// The raw, unrecognized team tag, kept for the keyword fallback.
    pub raw_team: Option<String>,
    pub ability: String,
    pub image: ImageRef,
    pub first_night: Option<u32>,
    pub other_night: Option<u32>,
    pub first_night_reminder: String,
    pub other_night_reminder: String,
    pub reminders: Vec<String>,
}

impl CharacterRecord {
    /// First visible character of the name, used for text badges.
    pub fn initial(&self) -> String {
        self.name
            .trim()
            .chars()
            .next()
            .or_else(|| self.id.trim().chars().next())
            .map(|c| c.to_uppercase().to_string())
            .unwrap_or_else(|| "?".to_string())
    }
}

/// An explicit difficulty as supplied by the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DifficultyInput {
    Level(f64),
    Label(String),
}

/// Descriptive fields, merged from the object-form roster and the `_meta` record.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RosterMeta {
    pub title: Option<String>,
    pub author: Option<String>,
    pub logo: ImageRef,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub player_count: Option<u32>,
    pub setup_slots: Option<usize>,
    pub difficulty: Option<DifficultyInput>,
}

/// The one canonical roster shape every downstream component works from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RosterDocument {
    pub meta: RosterMeta,
    pub characters: Vec<CharacterRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faction_from_tag_accepts_spelling_variants() {
        assert_eq!(Faction::from_tag("Traveller"), Some(Faction::Traveler));
        assert_eq!(Faction::from_tag(" DEMON "), Some(Faction::Demon));
        assert_eq!(Faction::from_tag("爪牙"), Some(Faction::Minion));
        assert_eq!(Faction::from_tag("a jinxed"), None);
        assert_eq!(Faction::from_tag(""), None);
    }

    #[test]
    fn test_faction_all_is_canonical_order() {
        for (i, f) in Faction::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
    }

    #[test]
    fn test_image_ref_parse() {
        assert_eq!(
            ImageRef::parse("https://cdn.example.com/imp.png"),
            ImageRef::Url("https://cdn.example.com/imp.png".to_string())
        );
        assert!(matches!(
            ImageRef::parse("data:image/png;base64,AAAA"),
            ImageRef::Embedded(_)
        ));
        assert_eq!(ImageRef::parse("icons/imp.png"), ImageRef::None);
        assert_eq!(ImageRef::parse("ftp://host/imp.png"), ImageRef::None);
    }

    #[test]
    fn test_initial_falls_back_to_id_then_question_mark() {
        let mut rec = CharacterRecord {
            id: "imp".to_string(),
            ..Default::default()
        };
        assert_eq!(rec.initial(), "I");
        rec.name = "小恶魔".to_string();
        assert_eq!(rec.initial(), "小");
        rec.name.clear();
        rec.id.clear();
        assert_eq!(rec.initial(), "?");
    }
}
