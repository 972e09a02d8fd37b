//! State shared across all actix-web workers.

use std::sync::Arc;

use gx_core::dashboard::{DEFAULT_FEED_LIMIT, DEFAULT_WINDOW_HOURS};
use gx_core::{AnnotationStore, AnnotationWidget, Dashboard, FeedObserver, IdentityProvider, KvBackend, Session};
use gx_valuation::FinancialDataSource;
use tokio::sync::Mutex;

/// Runtime knobs taken from configuration.
#[derive(Debug, Clone, Copy)]
pub struct FeedDefaults {
    pub summary_window_hours: i64,
    pub merged_feed_limit: usize,
}

impl Default for FeedDefaults {
    fn default() -> Self {
        Self {
            summary_window_hours: DEFAULT_WINDOW_HOURS,
            merged_feed_limit: DEFAULT_FEED_LIMIT,
        }
    }
}

pub struct AppState {
    pub store: Arc<AnnotationStore>,
    pub session: Arc<Session>,
    pub dashboard: Dashboard,
    /// Batches are processed one at a time.
    pub observer: Mutex<FeedObserver>,
    pub valuation: Arc<dyn FinancialDataSource>,
    pub defaults: FeedDefaults,
}

impl AppState {
    /// Restores the session from `backend` and wires every component to it.
    pub async fn new(
        backend: Arc<dyn KvBackend>,
        provider: Arc<dyn IdentityProvider>,
        valuation: Arc<dyn FinancialDataSource>,
        defaults: FeedDefaults,
    ) -> Self {
        let store = Arc::new(AnnotationStore::new(Arc::clone(&backend)));
        let session = Arc::new(Session::load(backend, provider).await);
        Self {
            dashboard: Dashboard::new(Arc::clone(&store)),
            observer: Mutex::new(FeedObserver::new(Arc::clone(&store), Arc::clone(&session))),
            store,
            session,
            valuation,
            defaults,
        }
    }

    pub fn widget(&self, entity_id: &str) -> AnnotationWidget {
        AnnotationWidget::new(entity_id, Arc::clone(&self.store), Arc::clone(&self.session))
    }
}
