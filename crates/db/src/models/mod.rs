pub mod encounter;
pub mod patient;

pub use encounter::{Encounter, EncounterStatus};
pub use patient::Patient;
