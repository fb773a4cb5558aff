//! Turns a submitted seating number into a view state.

use results_common::{LookupError, Record, ResultsStore, ViewState};
use tracing::{debug, error};

/// Stateless lookup over the results store
#[derive(Debug, Clone)]
pub struct LookupService {
    store: ResultsStore,
}

impl LookupService {
    pub fn new(store: ResultsStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ResultsStore {
        &self.store
    }

    /// Run one read-only lookup off the async runtime
    pub async fn lookup(&self, seating_no: &str) -> Result<Option<Record>, LookupError> {
        let store = self.store.clone();
        let seating_no = seating_no.to_string();
        tokio::task::spawn_blocking(move || store.lookup(&seating_no))
            .await
            .map_err(|e| LookupError::Task(e.to_string()))?
    }

    /// Decide the page for a submission.
    ///
    /// Blank input never touches storage. Storage failures are logged for the
    /// operator and shown to the user as "no match".
    pub async fn resolve(&self, submitted: Option<&str>) -> ViewState {
        let query = submitted.map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return ViewState::NoQuery;
        }
        let query = query.to_string();

        match self.lookup(&query).await {
            Ok(Some(record)) => ViewState::Found { query, record },
            Ok(None) => {
                debug!("No record for seating number {:?}", query);
                ViewState::NotFound { query }
            }
            Err(e) => {
                error!(
                    "Lookup for {:?} failed ({}), answering no match: {}",
                    query,
                    e.kind(),
                    e
                );
                ViewState::NotFound { query }
            }
        }
    }
}
