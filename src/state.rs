use crate::config::Config;
use crate::submission::SubmissionService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub submissions: SubmissionService,
}
