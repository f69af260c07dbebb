use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;
use uuid::Uuid;

use crate::config::Config;
use crate::db::interaction_repository::InteractionRepository;
use crate::db::view_repository::ViewRepository;
use crate::db::workflow_repository::WorkflowRepository;
use crate::services::ai::{Classifier, ResponseGenerator};
use crate::services::platform::PlatformClient;

#[derive(Clone)]
pub struct AppState {
    pub workflow_repo: Arc<dyn WorkflowRepository>,
    pub interaction_repo: Arc<dyn InteractionRepository>,
    pub view_repo: Arc<dyn ViewRepository>,
    pub classifier: Arc<dyn Classifier>,
    pub generator: Arc<dyn ResponseGenerator>,
    pub platform: Arc<dyn PlatformClient>,
    pub http_client: Arc<Client>,
    pub config: Arc<Config>,
    /// At most one dispatch pass per interaction id within this process.
    pub dispatch_guard: Arc<DashMap<Uuid, ()>>,
}
