//! Night order extraction: the first-night and other-night action sequences.

use serde::Serialize;

use crate::roster::classifier::ClassifiedRoster;

/// Reduced projection of a character for one night sequence.
///
/// Artwork is looked up by `character_index` in the resolved image set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NightOrderEntry {
    /// Index into `ClassifiedRoster::characters`.
    pub character_index: usize,
    pub name: String,
    pub order: u32,
    pub reminder: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NightOrderPlan {
    pub first_night: Vec<NightOrderEntry>,
    pub other_night: Vec<NightOrderEntry>,
}

/// Builds both sequences, ascending by order. Ties keep roster order.
/// Travelers and Fabled are never included.
pub fn extract_night_order(roster: &ClassifiedRoster) -> NightOrderPlan {
    let mut first_night = Vec::new();
    let mut other_night = Vec::new();

    for (index, character) in roster.characters.iter().enumerate() {
        if !character.faction.acts_at_night() {
            continue;
        }
        let record = &character.record;
        if let Some(order) = record.first_night {
            first_night.push(NightOrderEntry {
                character_index: index,
                name: record.name.clone(),
                order,
                reminder: record.first_night_reminder.clone(),
            });
        }
        if let Some(order) = record.other_night {
            other_night.push(NightOrderEntry {
                character_index: index,
                name: record.name.clone(),
                order,
                reminder: record.other_night_reminder.clone(),
            });
        }
    }

    // sort_by_key is stable
    first_night.sort_by_key(|e| e.order);
    other_night.sort_by_key(|e| e.order);

    NightOrderPlan {
        first_night,
        other_night,
    }
}
