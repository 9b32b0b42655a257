//! Reader for the persisted balance validation log.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::backend::BackendPort;
use crate::backend::cache::TtlCache;
use crate::models::ValidationLogEntry;
use crate::reconciliation::validator::logging_floor;

/// Default number of log rows returned.
pub const DEFAULT_LOG_LIMIT: usize = 50;

/// Reads discrepancy records written by the database-side trigger.
///
/// Results are cached briefly; log rows are immutable and the admin
/// dashboard polls this surface, so a short TTL keeps repeated reads off
/// the backend without staleness concerns beyond the TTL itself.
pub struct ValidationLogReader<B> {
    backend: Arc<B>,
    cache: Mutex<TtlCache<String, Vec<ValidationLogEntry>>>,
}

impl<B: BackendPort> ValidationLogReader<B> {
    /// Create a reader with the given response cache.
    #[must_use]
    pub fn new(backend: Arc<B>, cache: TtlCache<String, Vec<ValidationLogEntry>>) -> Self {
        Self {
            backend,
            cache: Mutex::new(cache),
        }
    }

    /// Fetch recent log entries, newest first.
    ///
    /// `min_discrepancy` filters on the signed `discrepancy` column as
    /// persisted, so large negative discrepancies below the threshold are
    /// excluded. Query failures are logged and surface as an empty list.
    pub async fn validation_logs(
        &self,
        limit: Option<usize>,
        min_discrepancy: Option<Decimal>,
    ) -> Vec<ValidationLogEntry> {
        let limit = limit.unwrap_or(DEFAULT_LOG_LIMIT);
        let min_discrepancy = min_discrepancy.unwrap_or_else(logging_floor);
        let cache_key = format!("{limit}:{min_discrepancy}");

        if let Some(entries) = self.cache.lock().await.get(&cache_key) {
            debug!(limit, %min_discrepancy, "Validation log served from cache");
            return entries;
        }

        match self.backend.fetch_validation_log(limit, min_discrepancy).await {
            Ok(entries) => {
                self.cache.lock().await.insert(cache_key, entries.clone());
                entries
            }
            Err(err) => {
                error!(limit, %min_discrepancy, error = %err, "Failed to fetch validation log");
                Vec::new()
            }
        }
    }
}
