use std::sync::Arc;
use std::time::Duration;

use mongodb::Database;

use clinscribe_config::Settings;
use clinscribe_services::dao::encounter::EncounterDao;
use clinscribe_services::dao::patient::PatientDao;
use clinscribe_services::pipeline::EncounterPipeline;
use clinscribe_services::store::{EncounterStore, PatientStore};
use clinscribe_transcription::config::GatewayConfig;
use clinscribe_transcription::gateway::RemoteGateway;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub patients: Arc<PatientDao>,
    pub encounters: Arc<EncounterDao>,
    pub pipeline: Arc<EncounterPipeline>,
}

impl AppState {
    pub fn new(db: &Database, settings: Settings) -> Self {
        let patients = Arc::new(PatientDao::new(db));
        let encounters = Arc::new(EncounterDao::new(db));

        let gateway = Arc::new(RemoteGateway::new(GatewayConfig::new(
            settings.transcription.base_url.clone(),
            Duration::from_secs(settings.transcription.timeout_secs),
        )));
        let pipeline = Arc::new(EncounterPipeline::new(
            gateway,
            Arc::clone(&patients) as Arc<dyn PatientStore>,
            Arc::clone(&encounters) as Arc<dyn EncounterStore>,
        ));

        Self {
            settings: Arc::new(settings),
            patients,
            encounters,
            pipeline,
        }
    }
}
