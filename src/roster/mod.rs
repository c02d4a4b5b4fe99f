// Roster model and identifier enrichment

pub mod champions;
pub mod enrichment;
pub mod sources;
pub mod spells;
pub mod types;

pub use champions::champion_name;
pub use enrichment::Enricher;
pub use sources::{PassContext, SpellPair, SpellSource};
pub use spells::spell_name;
pub use types::{CombatStats, PlayerView, RosterSnapshot, Runes, UNSELECTED};
