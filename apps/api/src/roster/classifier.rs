//! Roster classification: buckets every character into exactly one faction and
//! derives the summary figures shown in the preview header.
//!
//! Explicit team tags always win. Records without a recognized tag go through a
//! keyword fallback over id, name and raw tag, tested Demon → Minion → Outsider →
//! Traveler → Fabled, defaulting to Townsfolk. The keyword lists are a stopgap
//! until rosters are validated against a strict schema; nothing outside this
//! module depends on them.

use serde::Serialize;

use crate::models::roster::{CharacterRecord, DifficultyInput, Faction, RosterDocument, RosterMeta};

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub demon_keywords: Vec<String>,
    pub minion_keywords: Vec<String>,
    pub outsider_keywords: Vec<String>,
    pub traveler_keywords: Vec<String>,
    pub fabled_keywords: Vec<String>,
    /// Share of a game's players that are Townsfolk. Display estimate only.
    pub townsfolk_player_ratio: f64,
    /// Used when there are no Townsfolk at all.
    pub fallback_player_ratio: f64,
    /// Ordered easiest → hardest.
    pub difficulty_labels: Vec<String>,
    /// Average ability length (in chars) thresholds; each one crossed bumps the tier.
    pub ability_length_thresholds: Vec<f64>,
    /// Average reminders per character at which the tier is bumped once more.
    pub reminder_density_threshold: f64,
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn default_classifier_config() -> ClassifierConfig {
    ClassifierConfig {
        demon_keywords: words(&[
            "demon", "imp", "zombuul", "pukka", "shabaloth", "po", "fanggu", "fang_gu",
            "vigormortis", "nodashii", "no_dashii", "vortox", "legion", "leviathan", "riot",
            "lilmonsta", "alhadikhia", "lordoftyphon", "kazali", "ojo", "yaggababble", "恶魔",
        ]),
        minion_keywords: words(&[
            "minion", "poisoner", "spy", "scarletwoman", "scarlet_woman", "baron", "godfather",
            "devilsadvocate", "assassin", "mastermind", "eviltwin", "witch", "cerenovus",
            "pithag", "marionette", "widow", "goblin", "fearmonger", "psychopath", "mezepheles",
            "harpy", "organgrinder", "vizier", "boffin", "summoner", "wraith", "xaan", "爪牙",
        ]),
        outsider_keywords: words(&[
            "outsider", "butler", "drunk", "recluse", "saint", "tinker", "moonchild", "goon",
            "lunatic", "sweetheart", "barber", "klutz", "mutant", "hatter", "damsel", "heretic",
            "puzzlemaster", "snitch", "politician", "golem", "ogre", "plaguedoctor", "zealot",
            "hermit", "外来者",
        ]),
        traveler_keywords: words(&[
            "traveler", "traveller", "scapegoat", "gunslinger", "beggar", "bureaucrat", "thief",
            "butcher", "bonecollector", "harlot", "barista", "deviant", "apprentice", "matron",
            "judge", "bishop", "voudon", "gangster", "旅行者",
        ]),
        fabled_keywords: words(&[
            "fabled", "doomsayer", "angel", "buddhist", "hellslibrarian", "revolutionary",
            "fiddler", "toymaker", "fibbin", "duchess", "sentinel", "spiritofivory", "djinn",
            "stormcatcher", "bootlegger", "ferryman", "gardener", "传奇",
        ]),
        townsfolk_player_ratio: 0.65,
        fallback_player_ratio: 0.8,
        difficulty_labels: words(&["入门", "普通", "进阶", "困难"]),
        ability_length_thresholds: vec![40.0, 70.0],
        reminder_density_threshold: 1.5,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedCharacter {
    pub faction: Faction,
    /// True when the faction came from the keyword fallback rather than a tag.
    pub inferred: bool,
    pub record: CharacterRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEstimateSource {
    Explicit,
    SetupSlots,
    TownsfolkRatio,
    TotalRatio,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerEstimate {
    pub players: u32,
    pub source: PlayerEstimateSource,
}

impl PlayerEstimate {
    pub fn label(&self) -> String {
        if self.players == 0 {
            "人数未知".to_string()
        } else {
            format!("{}人左右", self.players)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultySource {
    Explicit,
    Heuristic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Difficulty {
    pub label: String,
    /// Position on the configured label scale; `None` for a free-form explicit label.
    pub level: Option<usize>,
    pub source: DifficultySource,
}

/// A roster with every character assigned to one faction.
///
/// `characters` keeps input order; per-faction views preserve it too.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedRoster {
    pub meta: RosterMeta,
    pub characters: Vec<ClassifiedCharacter>,
    pub total_characters: usize,
    pub players: PlayerEstimate,
    pub difficulty: Difficulty,
}

impl ClassifiedRoster {
    /// Characters of one faction with their index into `characters`.
    pub fn bucket(&self, faction: Faction) -> impl Iterator<Item = (usize, &CharacterRecord)> + '_ {
        self.characters
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.faction == faction)
            .map(|(i, c)| (i, &c.record))
    }

    pub fn count(&self, faction: Faction) -> usize {
        self.characters.iter().filter(|c| c.faction == faction).count()
    }

    /// Factions with at least one character, in canonical order.
    pub fn non_empty_factions(&self) -> Vec<Faction> {
        Faction::ALL
            .into_iter()
            .filter(|f| self.count(*f) > 0)
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Classification
// ────────────────────────────────────────────────────────────────────────────

/// Classifies a normalized roster. Never fails.
pub fn classify_roster(doc: RosterDocument, config: &ClassifierConfig) -> ClassifiedRoster {
    let characters: Vec<ClassifiedCharacter> = doc
        .characters
        .into_iter()
        .map(|record| {
            let (faction, inferred) = match record.faction {
                Some(f) => (f, false),
                None => (fallback_faction(&record, config), true),
            };
            ClassifiedCharacter {
                faction,
                inferred,
                record,
            }
        })
        .collect();

    let total_characters = characters.len();
    let townsfolk = characters
        .iter()
        .filter(|c| c.faction == Faction::Townsfolk)
        .count();
    let players = estimate_players(&doc.meta, townsfolk, total_characters, config);
    let difficulty = derive_difficulty(&doc.meta, &characters, config);

    ClassifiedRoster {
        meta: doc.meta,
        characters,
        total_characters,
        players,
        difficulty,
    }
}

/// Keyword fallback for records without a recognized team tag.
pub fn fallback_faction(record: &CharacterRecord, config: &ClassifierConfig) -> Faction {
    let haystacks: Vec<&str> = [
        Some(record.id.as_str()),
        Some(record.name.as_str()),
        record.raw_team.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect();

    let priority = [
        (Faction::Demon, &config.demon_keywords),
        (Faction::Minion, &config.minion_keywords),
        (Faction::Outsider, &config.outsider_keywords),
        (Faction::Traveler, &config.traveler_keywords),
        (Faction::Fabled, &config.fabled_keywords),
    ];

    priority
        .into_iter()
        .find(|(_, keywords)| {
            haystacks
                .iter()
                .any(|h| keywords.iter().any(|k| keyword_matches(h, k)))
        })
        .map(|(f, _)| f)
        .unwrap_or(Faction::Townsfolk)
}

/// ASCII keywords must equal a whole token (or the whole compacted string);
/// non-ASCII keywords match as substrings.
fn keyword_matches(haystack: &str, keyword: &str) -> bool {
    let haystack = haystack.to_lowercase();
    if !keyword.is_ascii() {
        return haystack.contains(keyword);
    }
    let compact: String = haystack.chars().filter(|c| c.is_alphanumeric()).collect();
    if compact == keyword {
        return true;
    }
    haystack
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .any(|token| token == keyword || token.split('_').any(|part| part == keyword))
}

// ────────────────────────────────────────────────────────────────────────────
// Summary figures
// ────────────────────────────────────────────────────────────────────────────

/// Explicit count → setup-slot count → Townsfolk ratio → total ratio.
pub fn estimate_players(
    meta: &RosterMeta,
    townsfolk: usize,
    total: usize,
    config: &ClassifierConfig,
) -> PlayerEstimate {
    if let Some(players) = meta.player_count.filter(|n| *n > 0) {
        return PlayerEstimate {
            players,
            source: PlayerEstimateSource::Explicit,
        };
    }
    if let Some(slots) = meta.setup_slots.filter(|n| *n > 0) {
        return PlayerEstimate {
            players: slots as u32,
            source: PlayerEstimateSource::SetupSlots,
        };
    }
    if townsfolk > 0 && config.townsfolk_player_ratio > 0.0 {
        return PlayerEstimate {
            players: (townsfolk as f64 / config.townsfolk_player_ratio).round() as u32,
            source: PlayerEstimateSource::TownsfolkRatio,
        };
    }
    if total > 0 {
        return PlayerEstimate {
            players: (total as f64 * config.fallback_player_ratio).ceil() as u32,
            source: PlayerEstimateSource::TotalRatio,
        };
    }
    PlayerEstimate {
        players: 0,
        source: PlayerEstimateSource::Empty,
    }
}

pub fn derive_difficulty(
    meta: &RosterMeta,
    characters: &[ClassifiedCharacter],
    config: &ClassifierConfig,
) -> Difficulty {
    match &meta.difficulty {
        Some(DifficultyInput::Level(level)) if level.is_finite() => {
            explicit_level(level.round(), config)
        }
        Some(DifficultyInput::Label(label)) => {
            let level = config
                .difficulty_labels
                .iter()
                .position(|l| l.eq_ignore_ascii_case(label));
            Difficulty {
                label: label.clone(),
                level,
                source: DifficultySource::Explicit,
            }
        }
        _ => heuristic_difficulty(characters, config),
    }
}

/// Numeric difficulties are 1-based and clipped onto the label scale.
fn explicit_level(level: f64, config: &ClassifierConfig) -> Difficulty {
    let max = config.difficulty_labels.len().max(1);
    let index = (level.clamp(1.0, max as f64) as usize) - 1;
    Difficulty {
        label: config
            .difficulty_labels
            .get(index)
            .cloned()
            .unwrap_or_default(),
        level: Some(index),
        source: DifficultySource::Explicit,
    }
}

fn heuristic_difficulty(characters: &[ClassifiedCharacter], config: &ClassifierConfig) -> Difficulty {
    let mut level = 0usize;
    if !characters.is_empty() {
        let n = characters.len() as f64;
        let avg_ability = characters
            .iter()
            .map(|c| c.record.ability.chars().count())
            .sum::<usize>() as f64
            / n;
        let avg_reminders = characters
            .iter()
            .map(|c| c.record.reminders.len())
            .sum::<usize>() as f64
            / n;

        level += config
            .ability_length_thresholds
            .iter()
            .filter(|t| avg_ability >= **t)
            .count();
        if avg_reminders >= config.reminder_density_threshold {
            level += 1;
        }
    }
    let level = level.min(config.difficulty_labels.len().saturating_sub(1));
    Difficulty {
        label: config
            .difficulty_labels
            .get(level)
            .cloned()
            .unwrap_or_default(),
        level: Some(level),
        source: DifficultySource::Heuristic,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
