mod chat;
mod prompts;
mod roadmap;

use chrono::Utc;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::OrbiiConfig;
use crate::db::Database;
use crate::error::{InferenceError, ServiceResult};
use crate::i18n::I18n;
use crate::inference::TextGeneration;

/// Session id used when a chat request carries none
pub const ANONYMOUS_SESSION_ID: &str = "anonymous";

/// Main service coordinator
pub struct OrbiiService {
    pub config: Arc<OrbiiConfig>,
    pub db: Arc<Database>,
    pub inference: Arc<dyn TextGeneration>,
    pub i18n: Arc<I18n>,
    /// Serializes load-modify-persist per session id
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl OrbiiService {
    pub fn new(
        config: Arc<OrbiiConfig>,
        db: Arc<Database>,
        inference: Arc<dyn TextGeneration>,
    ) -> Self {
        info!(model = %config.inference.model, "Initializing Orbii service");

        Self {
            config,
            db,
            inference,
            i18n: Arc::new(I18n::new()),
            session_locks: DashMap::new(),
        }
    }

    /// Lock guarding one session's stored state
    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.session_locks
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }

    /// Run an inference call under the configured timeout.
    ///
    /// Blank output counts as a failure.
    async fn bounded<F>(&self, call: F) -> Result<String, InferenceError>
    where
        F: Future<Output = Result<String, InferenceError>>,
    {
        let timeout = self.config.inference.request_timeout();

        let text = tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| InferenceError::Timeout {
                secs: timeout.as_secs(),
            })??;

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(trimmed.to_string())
    }

    /// Evict sessions idle longer than the configured TTL
    pub fn cleanup_sessions(&self) -> ServiceResult<usize> {
        let ttl = self.config.session.ttl();
        if ttl.is_zero() {
            return Ok(0);
        }

        let cutoff = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| Utc::now().checked_sub_signed(ttl));
        let Some(cutoff) = cutoff else {
            warn!(
                ttl_secs = self.config.session.ttl_secs,
                "Session TTL reaches past the earliest representable time, skipping cleanup"
            );
            return Ok(0);
        };
        let removed = self.db.cleanup_stale_sessions(cutoff)?;

        // Locks nobody is holding or waiting on can go
        self.session_locks
            .retain(|_, lock| Arc::strong_count(lock) > 1);

        Ok(removed)
    }
}
