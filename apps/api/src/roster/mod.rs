// Roster intake: normalization of loosely-typed input, faction classification,
// and night order extraction. Everything here is pure and synchronous.

pub mod classifier;
pub mod night_order;
pub mod normalize;

pub use classifier::{classify_roster, ClassifiedRoster, ClassifierConfig};
pub use night_order::{extract_night_order, NightOrderPlan};
pub use normalize::{parse_roster, RosterError};
