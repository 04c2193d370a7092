//! Dashboard operations
//!
//! What the UI shell dispatches: load products and top sellers, record
//! sales, manage calendar events and submit the onboarding survey. Every
//! operation validates first, requires a signed-in user, and turns backend
//! failures into a [`DashboardError`] value.

mod calendar;
mod catalog;
mod error;
mod segmentation;

pub use calendar::MonthGrid;
pub use error::{DashboardError, DashboardResult};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{Local, NaiveDate};

use crate::backend::{BackendResult, DataStore};
use crate::models::{Event, User};
use crate::session::{SessionConfig, SessionManager};

/// Operations over the signed-in user's data
pub struct Dashboard {
    session: Arc<SessionManager>,
    store: Arc<dyn DataStore>,
    request_timeout: Duration,
    /// Events seen by the last listing, keyed by id
    events: Mutex<HashMap<String, Event>>,
}

impl Dashboard {
    pub fn new(session: Arc<SessionManager>, store: Arc<dyn DataStore>) -> Self {
        Self::with_config(session, store, &SessionConfig::default())
    }

    pub fn with_config(
        session: Arc<SessionManager>,
        store: Arc<dyn DataStore>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            session,
            store,
            request_timeout: config.request_timeout,
            events: Mutex::new(HashMap::new()),
        }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    fn require_user(&self) -> DashboardResult<User> {
        self.session
            .current_user()
            .ok_or(DashboardError::NotAuthenticated)
    }

    /// Run a backend call with the request timeout, logging failures
    async fn call<T>(
        &self,
        operation: &'static str,
        request: impl Future<Output = BackendResult<T>>,
    ) -> DashboardResult<T> {
        let result = match tokio::time::timeout(self.request_timeout, request).await {
            Ok(result) => result,
            Err(elapsed) => Err(elapsed.into()),
        };
        result.map_err(|e| {
            tracing::error!(operation, error = %e, "Backend call failed");
            DashboardError::Backend(e)
        })
    }

    fn event_cache(&self) -> MutexGuard<'_, HashMap<String, Event>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn today() -> NaiveDate {
        Local::now().date_naive()
    }
}
