//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::BidRepository;
use crate::services::ReportJob;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Bid store
    pub repository: Arc<dyn BidRepository>,
    /// Report generation and delivery
    pub job: Arc<ReportJob>,
    /// Expected value of the `Authorization` header
    pub secret_key: Arc<str>,
}

impl AppState {
    pub fn new(
        repository: Arc<dyn BidRepository>,
        job: Arc<ReportJob>,
        secret_key: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            repository,
            job,
            secret_key: secret_key.into(),
        }
    }

    /// Whether `credential` matches the shared secret.
    pub fn is_authorized(&self, credential: Option<&str>) -> bool {
        matches!(credential, Some(value) if value == &*self.secret_key)
    }
}
