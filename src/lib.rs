//! # FutureCal
//!
//! Business dashboard and event calendar client for a hosted auth +
//! Postgres backend.
//!
//! ## Features
//!
//! - **Session management**: one authoritative session state, kept in step
//!   with the identity provider's change stream
//! - **Top sellers**: per-month product ranking by units sold
//! - **Calendar**: events owned by their creator, laid out on a month grid
//! - **Onboarding**: four-question segmentation survey
//!
//! ## Modules
//!
//! - [`backend`]: gateway traits and the HTTP / in-memory implementations
//! - [`session`]: the Session Manager
//! - [`analytics`]: the Aggregation Engine
//! - [`forms`]: write-side validation
//! - [`dashboard`]: the operations a UI shell dispatches
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futurecal::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load_default();
//!     let backend = Arc::new(HttpBackend::new(config.backend_config()?)?);
//!
//!     let session = SessionManager::new(backend.clone(), backend.clone(), config.session_config());
//!     session.start().await;
//!
//!     if let AuthOutcome::Failed(failure) = session.login("ana@example.com", "secret1").await {
//!         eprintln!("{}", failure.message);
//!         return Ok(());
//!     }
//!
//!     let dashboard = Dashboard::new(session.clone(), backend);
//!     for top in dashboard.top_products_this_month().await? {
//!         println!("{}: {} sold", top.product.name, top.total_sales);
//!     }
//!
//!     session.logout().await;
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod backend;
pub mod config;
pub mod dashboard;
pub mod forms;
pub mod logging;
pub mod models;
pub mod session;

// Re-export top-level types for convenience
pub use backend::{
    AuthChange, AuthEvent, AuthSession, AuthUser, BackendError, BackendResult, DataStore,
    HttpBackend, HttpBackendConfig, IdentityProvider, Lookup, MemoryBackend,
};

pub use session::{
    AuthErrorKind, AuthFailure, AuthOutcome, SessionConfig, SessionManager, SessionPhase,
    SessionState,
};

pub use analytics::{month_start, top_products, TOP_PRODUCTS_LIMIT};

pub use forms::{
    Credentials, EventForm, ProductForm, SaleForm, SurveyForm, ValidationError, ValidationResult,
};

pub use dashboard::{Dashboard, DashboardError, DashboardResult, MonthGrid};

pub use models::{
    Event, EventChanges, NewEvent, NewProduct, NewSale, Platform, Product, Sale,
    SaleWithProduct, TopProduct, User, UserFilters,
};

pub use config::{generate_default_config, Config, ConfigError, LoggingConfig};
