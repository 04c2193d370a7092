//! In-process backend
//!
//! Implements both gateway traits over plain collections. Used by the
//! test suite and by `futurecal --demo`; supports simulated outages,
//! slow sign-ins, and externally pushed session changes.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::error::{BackendError, BackendResult};
use super::types::{AuthChange, AuthSession, AuthUser, Lookup, SignUp};
use super::{DataStore, IdentityProvider};
use crate::models::{
    Event, EventChanges, NewEvent, NewProduct, NewSale, Product, Sale, SaleWithProduct,
    UserFilters,
};

/// Messages the hosted identity service uses for these conditions
const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const EMAIL_NOT_CONFIRMED: &str = "Email not confirmed";

#[derive(Debug, Clone)]
struct Account {
    password: String,
    user: AuthUser,
}

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<String, Account>,
    session: Option<AuthSession>,
    /// Access tokens invalidated by sign-out or revocation
    revoked: Vec<String>,
    filters: HashMap<String, UserFilters>,
    events: Vec<Event>,
    products: Vec<Product>,
    sales: Vec<Sale>,
}

/// Backend held entirely in memory
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
    changes: broadcast::Sender<AuthChange>,
    require_confirmation: bool,
    offline: Mutex<bool>,
    fail_sign_out: Mutex<bool>,
    sign_in_delay: Mutex<Option<Duration>>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Backend whose sign-ups are confirmed immediately
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            state: Mutex::new(MemoryState::default()),
            changes,
            require_confirmation: false,
            offline: Mutex::new(false),
            fail_sign_out: Mutex::new(false),
            sign_in_delay: Mutex::new(None),
        }
    }

    /// Backend whose sign-ups wait for email confirmation
    pub fn with_email_confirmation() -> Self {
        Self {
            require_confirmation: true,
            ..Self::new()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-update
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn flag(flag: &Mutex<bool>) -> bool {
        *flag.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_online(&self) -> BackendResult<()> {
        if Self::flag(&self.offline) {
            Err(BackendError::Unavailable)
        } else {
            Ok(())
        }
    }

    /// Make every call fail as if the backend were unreachable
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap_or_else(|e| e.into_inner()) = offline;
    }

    /// Make remote sign-out fail (local session is still dropped)
    pub fn set_sign_out_failure(&self, fail: bool) {
        *self.fail_sign_out.lock().unwrap_or_else(|e| e.into_inner()) = fail;
    }

    /// Delay password sign-in responses
    pub fn set_sign_in_delay(&self, delay: Option<Duration>) {
        *self.sign_in_delay.lock().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Register a confirmed account directly
    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4().to_string(),
            email: Some(email.to_string()),
            email_confirmed_at: Some(Utc::now()),
            created_at: Utc::now(),
        };
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                password: password.to_string(),
                user: user.clone(),
            },
        );
        user
    }

    /// Mark a pending account as confirmed
    pub fn confirm_email(&self, email: &str) -> bool {
        let mut state = self.lock();
        match state.accounts.get_mut(email) {
            Some(account) => {
                account.user.email_confirmed_at = Some(Utc::now());
                true
            }
            None => false,
        }
    }

    /// Install a session as if restored from storage
    pub fn set_session(&self, session: Option<AuthSession>) {
        self.lock().session = session;
    }

    /// Deliver a session change as if it came from another client
    pub fn push(&self, change: AuthChange) {
        {
            let mut state = self.lock();
            state.session = change.session.clone();
        }
        let _ = self.changes.send(change);
    }

    /// Build a session for an existing account without notifying
    pub fn session_for(&self, email: &str) -> Option<AuthSession> {
        let state = self.lock();
        state.accounts.get(email).map(|account| new_session(account.user.clone()))
    }

    /// Whether an access token was signed out or revoked
    pub fn is_revoked(&self, access_token: &str) -> bool {
        self.lock().revoked.iter().any(|t| t == access_token)
    }

    /// Insert a product row directly
    pub fn insert_product(&self, product: Product) {
        self.lock().products.push(product);
    }

    /// Insert a sale row directly
    pub fn insert_sale(&self, sale: Sale) {
        self.lock().sales.push(sale);
    }

    /// Remove a product without touching its sales
    pub fn remove_product(&self, id: &str) {
        self.lock().products.retain(|p| p.id != id);
    }
}

fn new_session(user: AuthUser) -> AuthSession {
    AuthSession {
        access_token: Uuid::new_v4().to_string(),
        refresh_token: Some(Uuid::new_v4().to_string()),
        expires_at: Some(Utc::now().timestamp() + 3600),
        user,
    }
}

#[async_trait]
impl IdentityProvider for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUp> {
        self.check_online()?;

        let (user, session) = {
            let mut state = self.lock();
            if state.accounts.contains_key(email) {
                return Err(BackendError::Auth("User already registered".to_string()));
            }
            let user = AuthUser {
                id: Uuid::new_v4().to_string(),
                email: Some(email.to_string()),
                email_confirmed_at: (!self.require_confirmation).then(Utc::now),
                created_at: Utc::now(),
            };
            state.accounts.insert(
                email.to_string(),
                Account {
                    password: password.to_string(),
                    user: user.clone(),
                },
            );

            let session = (!self.require_confirmation).then(|| new_session(user.clone()));
            if let Some(session) = &session {
                state.session = Some(session.clone());
            }
            (user, session)
        };

        if let Some(session) = &session {
            let _ = self.changes.send(AuthChange::signed_in(session.clone()));
        }

        Ok(SignUp { user, session })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let delay = *self.sign_in_delay.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_online()?;

        let session = {
            let mut state = self.lock();
            let account = match state.accounts.get(email) {
                Some(account) if account.password == password => account.clone(),
                _ => return Err(BackendError::Auth(INVALID_CREDENTIALS.to_string())),
            };
            if !account.user.is_confirmed() {
                return Err(BackendError::Auth(EMAIL_NOT_CONFIRMED.to_string()));
            }
            let session = new_session(account.user);
            state.session = Some(session.clone());
            session
        };

        let _ = self.changes.send(AuthChange::signed_in(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> BackendResult<()> {
        {
            let mut state = self.lock();
            if let Some(session) = state.session.take() {
                state.revoked.push(session.access_token);
            }
        }
        let _ = self.changes.send(AuthChange::signed_out());

        self.check_online()?;
        if Self::flag(&self.fail_sign_out) {
            return Err(BackendError::Api {
                status: 500,
                code: None,
                message: "sign-out failed".to_string(),
            });
        }
        Ok(())
    }

    async fn revoke_session(
        &self,
        session: &AuthSession,
        replacement: Option<&AuthSession>,
    ) -> BackendResult<()> {
        self.check_online()?;
        let dropped = {
            let mut state = self.lock();
            state.revoked.push(session.access_token.clone());
            let is_current = state
                .session
                .as_ref()
                .is_some_and(|current| current.access_token == session.access_token);
            if is_current {
                state.session = replacement.cloned();
            }
            is_current && replacement.is_none()
        };

        if dropped {
            let _ = self.changes.send(AuthChange::signed_out());
        }
        Ok(())
    }

    async fn get_session(&self) -> BackendResult<Option<AuthSession>> {
        self.check_online()?;
        Ok(self.lock().session.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthChange> {
        self.changes.subscribe()
    }
}

#[async_trait]
impl DataStore for MemoryBackend {
    async fn get_user_filters(&self, user_id: &str) -> Lookup<UserFilters> {
        if let Err(e) = self.check_online() {
            return Lookup::Failed(e);
        }
        Lookup::from_result(Ok(self.lock().filters.get(user_id).cloned()))
    }

    async fn upsert_user_filters(
        &self,
        user_id: &str,
        filters: &UserFilters,
    ) -> BackendResult<UserFilters> {
        self.check_online()?;
        self.lock()
            .filters
            .insert(user_id.to_string(), filters.clone());
        Ok(filters.clone())
    }

    async fn list_events(&self) -> BackendResult<Vec<Event>> {
        self.check_online()?;
        let mut events = self.lock().events.clone();
        events.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(events)
    }

    async fn list_events_on(&self, date: NaiveDate) -> BackendResult<Vec<Event>> {
        self.check_online()?;
        let mut events: Vec<Event> = self
            .lock()
            .events
            .iter()
            .filter(|e| e.date == date)
            .cloned()
            .collect();
        events.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(events)
    }

    async fn create_event(&self, event: &NewEvent) -> BackendResult<Event> {
        self.check_online()?;
        let created = Event {
            id: Uuid::new_v4().to_string(),
            title: event.title.clone(),
            description: event.description.clone(),
            date: event.date,
            time: event.time.clone(),
            created_by: event.created_by.clone(),
            created_at: Utc::now(),
        };
        self.lock().events.push(created.clone());
        Ok(created)
    }

    async fn update_event(&self, id: &str, changes: &EventChanges) -> BackendResult<Event> {
        self.check_online()?;
        let mut state = self.lock();
        let event = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| BackendError::RowNotFound(id.to_string()))?;
        event.title = changes.title.clone();
        event.description = changes.description.clone();
        event.date = changes.date;
        event.time = changes.time.clone();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: &str) -> BackendResult<()> {
        self.check_online()?;
        let mut state = self.lock();
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Err(BackendError::RowNotFound(id.to_string()));
        }
        Ok(())
    }

    async fn create_product(&self, product: &NewProduct) -> BackendResult<Product> {
        self.check_online()?;
        let created = Product {
            id: Uuid::new_v4().to_string(),
            name: product.name.clone(),
            description: Some(product.description.clone()),
            price: product.price,
            image_url: product.image_url.clone(),
            platform: product.platform,
            platform_id: product.platform_id.clone(),
            user_id: Some(product.user_id.clone()),
            created_at: Some(Utc::now()),
        };
        self.lock().products.push(created.clone());
        Ok(created)
    }

    async fn list_products(&self) -> BackendResult<Vec<Product>> {
        self.check_online()?;
        // Newest first; insertion order stands in for created_at
        Ok(self.lock().products.iter().rev().cloned().collect())
    }

    async fn create_sale(&self, sale: &NewSale) -> BackendResult<Sale> {
        self.check_online()?;
        let mut state = self.lock();
        if !state.products.iter().any(|p| p.id == sale.product_id) {
            return Err(BackendError::Api {
                status: 409,
                code: Some("23503".to_string()),
                message: "sale references a missing product".to_string(),
            });
        }
        let created = Sale {
            id: Uuid::new_v4().to_string(),
            product_id: sale.product_id.clone(),
            quantity: sale.quantity,
            total_amount: sale.total_amount,
            sale_date: sale.sale_date,
            platform: sale.platform,
            user_id: sale.user_id.clone(),
            created_at: Some(Utc::now()),
        };
        state.sales.push(created.clone());
        Ok(created)
    }

    async fn list_sales(&self) -> BackendResult<Vec<Sale>> {
        self.check_online()?;
        let mut sales = self.lock().sales.clone();
        sales.sort_by(|a, b| b.sale_date.cmp(&a.sale_date));
        Ok(sales)
    }

    async fn sales_since(&self, since: NaiveDate) -> BackendResult<Vec<SaleWithProduct>> {
        self.check_online()?;
        let state = self.lock();
        let mut rows: Vec<SaleWithProduct> = state
            .sales
            .iter()
            .filter(|s| s.sale_date >= since)
            .map(|s| SaleWithProduct {
                product_id: s.product_id.clone(),
                quantity: s.quantity,
                total_amount: s.total_amount,
                product: state
                    .products
                    .iter()
                    .find(|p| p.id == s.product_id)
                    .map(|p| Product {
                        user_id: None,
                        created_at: None,
                        ..p.clone()
                    }),
            })
            .collect();
        rows.sort_by(|a, b| b.total_amount.total_cmp(&a.total_amount));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::AuthEvent;

    #[tokio::test]
    async fn test_sign_in_broadcasts() {
        let backend = MemoryBackend::new();
        backend.add_account("ana@example.com", "secret1");
        let mut rx = backend.subscribe();

        let session = backend
            .sign_in_with_password("ana@example.com", "secret1")
            .await
            .unwrap();

        let change = rx.recv().await.unwrap();
        assert_eq!(change.event, AuthEvent::SignedIn);
        assert_eq!(change.session, Some(session));
    }

    #[tokio::test]
    async fn test_sign_in_errors() {
        let backend = MemoryBackend::with_email_confirmation();
        backend.sign_up("ana@example.com", "secret1").await.unwrap();

        let err = backend
            .sign_in_with_password("ana@example.com", "secret1")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth(ref m) if m == EMAIL_NOT_CONFIRMED));

        let err = backend
            .sign_in_with_password("ana@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Auth(ref m) if m == INVALID_CREDENTIALS));

        assert!(backend.confirm_email("ana@example.com"));
        assert!(backend
            .sign_in_with_password("ana@example.com", "secret1")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_filters_lookup() {
        let backend = MemoryBackend::new();
        assert!(matches!(backend.get_user_filters("u-1").await, Lookup::NotFound));

        let filters = UserFilters::from_answers([
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "d".to_string(),
        ]);
        backend.upsert_user_filters("u-1", &filters).await.unwrap();
        assert_eq!(backend.get_user_filters("u-1").await.found(), Some(filters));

        backend.set_offline(true);
        assert!(matches!(
            backend.get_user_filters("u-1").await,
            Lookup::Failed(BackendError::Unavailable)
        ));
    }

    #[tokio::test]
    async fn test_sales_since_joins_and_filters() {
        let backend = MemoryBackend::new();
        let product = backend
            .create_product(&NewProduct {
                name: "Mate".to_string(),
                description: String::new(),
                price: 10.0,
                image_url: None,
                platform: crate::models::Platform::Shopify,
                platform_id: "S-1".to_string(),
                user_id: "u-1".to_string(),
            })
            .await
            .unwrap();

        for (day, qty) in [(1, 1), (20, 2)] {
            backend
                .create_sale(&NewSale {
                    product_id: product.id.clone(),
                    quantity: qty,
                    total_amount: 10.0 * qty as f64,
                    sale_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
                    platform: product.platform,
                    user_id: "u-1".to_string(),
                })
                .await
                .unwrap();
        }

        let rows = backend
            .sales_since(NaiveDate::from_ymd_opt(2024, 5, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(rows[0].product.as_ref().unwrap().name, "Mate");

        backend.remove_product(&product.id);
        let rows = backend
            .sales_since(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap())
            .await
            .unwrap();
        assert!(rows.iter().all(|r| r.product.is_none()));
    }
}
