//! Backend Gateway
//!
//! The hosted identity service and relational tables the client depends on.
//!
//! ## Architecture
//!
//! - **IdentityProvider**: sign-up, password sign-in, sign-out, current
//!   session, and a broadcast stream of session changes
//! - **DataStore**: typed CRUD over `user_filters`, `events`, `products`
//!   and `sales`
//! - **HttpBackend**: both traits over the hosted `/auth/v1` and
//!   `/rest/v1` HTTP endpoints
//! - **MemoryBackend**: both traits in process, for tests and demos

mod auth;
mod error;
mod http;
mod memory;
mod query;
mod session_file;
mod tables;
mod types;

pub use error::{BackendError, BackendResult, NO_ROWS_CODE};
pub use http::{HttpBackend, HttpBackendConfig};
pub use memory::MemoryBackend;
pub use query::{Order, TableQuery};
pub use session_file::SessionFile;
pub use types::{AuthChange, AuthEvent, AuthSession, AuthUser, Lookup, SignUp};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::broadcast;

use crate::models::{
    Event, EventChanges, NewEvent, NewProduct, NewSale, Product, Sale, SaleWithProduct,
    UserFilters,
};

/// Hosted identity service
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create a new identity
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUp>;

    /// Exchange email and password for a session
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> BackendResult<AuthSession>;

    /// Invalidate the current session; local session is dropped even on error
    async fn sign_out(&self) -> BackendResult<()>;

    /// Revoke one session remotely
    ///
    /// When `session` is the current session it is replaced by
    /// `replacement` without a notification, or dropped with a `SignedOut`
    /// notification when there is none. Any other current session is left
    /// untouched.
    async fn revoke_session(
        &self,
        session: &AuthSession,
        replacement: Option<&AuthSession>,
    ) -> BackendResult<()>;

    /// Current session, if any
    async fn get_session(&self) -> BackendResult<Option<AuthSession>>;

    /// Session-change notifications, delivered in order
    fn subscribe(&self) -> broadcast::Receiver<AuthChange>;
}

/// Hosted relational tables
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Survey answers for a user; "no row" is `Lookup::NotFound`
    async fn get_user_filters(&self, user_id: &str) -> Lookup<UserFilters>;

    /// Insert or replace all four answers for a user
    async fn upsert_user_filters(
        &self,
        user_id: &str,
        filters: &UserFilters,
    ) -> BackendResult<UserFilters>;

    /// All events ordered by date
    async fn list_events(&self) -> BackendResult<Vec<Event>>;

    /// Events on one day ordered by time
    async fn list_events_on(&self, date: NaiveDate) -> BackendResult<Vec<Event>>;

    async fn create_event(&self, event: &NewEvent) -> BackendResult<Event>;

    async fn update_event(&self, id: &str, changes: &EventChanges) -> BackendResult<Event>;

    async fn delete_event(&self, id: &str) -> BackendResult<()>;

    async fn create_product(&self, product: &NewProduct) -> BackendResult<Product>;

    /// All products, newest first
    async fn list_products(&self) -> BackendResult<Vec<Product>>;

    async fn create_sale(&self, sale: &NewSale) -> BackendResult<Sale>;

    /// All sales, most recent sale date first
    async fn list_sales(&self) -> BackendResult<Vec<Sale>>;

    /// Sales dated on or after `since`, joined with their products
    async fn sales_since(&self, since: NaiveDate) -> BackendResult<Vec<SaleWithProduct>>;
}
