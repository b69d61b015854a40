pub mod auth;
pub mod dao;
pub mod pipeline;
pub mod resolver;
pub mod store;

pub use pipeline::{EncounterOutcome, EncounterPipeline, EncounterSubmission, PipelineError};
pub use resolver::{PatientResolver, ResolutionContext, ResolveError, ResolvedPatient};
pub use store::{EncounterDraft, EncounterStore, PatientStore};
