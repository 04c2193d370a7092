//! Session Manager
//!
//! Owns the session state and keeps it in step with the identity provider.
//!
//! Writes are ordered by a generation counter: every applied transition
//! bumps it, and an operation that awaited the backend only applies its
//! result if the generation is still the one it started from. Logouts and
//! pushed notifications therefore win over login/register results that
//! have not resolved yet.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::outcome::{AuthFailure, AuthOutcome, CONFIRMATION_PENDING_MESSAGE};
use super::state::{SessionPhase, SessionState};
use crate::backend::{
    AuthChange, AuthEvent, AuthSession, AuthUser, BackendError, BackendResult, DataStore,
    IdentityProvider, Lookup,
};
use crate::models::User;

/// Session manager settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upper bound on every identity / filters call
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Ticket {
    generation: u64,
    logouts: u64,
}

/// Single writer of the session state
pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn DataStore>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    generation: Mutex<u64>,
    /// Provider session behind the applied state, guarded by `generation`
    live: Mutex<Option<AuthSession>>,
    logouts: AtomicU64,
    /// Emails with a local login/register in flight
    in_flight: Mutex<Vec<String>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Removes an email from the in-flight list when the request ends
struct InFlight<'a> {
    manager: &'a SessionManager,
    email: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut in_flight = lock(&self.manager.in_flight);
        if let Some(pos) = in_flight.iter().position(|e| *e == self.email) {
            in_flight.remove(pos);
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl SessionManager {
    /// Create a manager in the `Loading` state; call [`start`](Self::start) next
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn DataStore>,
        config: SessionConfig,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::default());
        Arc::new(Self {
            identity,
            store,
            config,
            state,
            generation: Mutex::new(0),
            live: Mutex::new(None),
            logouts: AtomicU64::new(0),
            in_flight: Mutex::new(Vec::new()),
            listener: Mutex::new(None),
        })
    }

    /// Load the initial session and subscribe to session changes
    pub async fn start(self: &Arc<Self>) {
        // Subscribe first so nothing pushed during the initial fetch is lost
        let changes = self.identity.subscribe();
        self.refresh().await;

        let handle = tokio::spawn(Self::listen(Arc::downgrade(self), changes));
        if let Some(previous) = lock(&self.listener).replace(handle) {
            previous.abort();
        }
        tracing::debug!("Session listener started");
    }

    /// Stop listening for session changes
    pub fn shutdown(&self) {
        if let Some(handle) = lock(&self.listener).take() {
            handle.abort();
            tracing::debug!("Session listener stopped");
        }
    }

    /// Snapshot of the current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Read-only view that is notified on every change
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Lifecycle phase of the current state
    pub fn phase(&self) -> SessionPhase {
        self.state.borrow().phase()
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        let state = self.state.borrow();
        if state.is_authenticated {
            state.user.clone()
        } else {
            None
        }
    }

    /// Re-read the session from the provider
    ///
    /// Any failure lands in the signed-out state rather than `Loading`.
    pub async fn refresh(&self) {
        let ticket = self.ticket();
        let (next, session) = match self.call(self.identity.get_session()).await {
            Ok(Some(session)) => {
                let user = self.load_user(&session.user).await;
                (SessionState::authenticated(user), Some(session))
            }
            Ok(None) => {
                tracing::debug!("No existing session");
                (SessionState::signed_out(), None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not fetch session, continuing signed out");
                (SessionState::signed_out(), None)
            }
        };

        if !self.apply_if_current(ticket.generation, next, session) {
            tracing::debug!("Session refresh superseded by a newer change");
        }
    }

    /// Sign in with email and password
    pub async fn login(&self, email: &str, password: &str) -> AuthOutcome {
        let ticket = self.ticket();
        let _in_flight = self.track(email);
        self.set_loading(true);

        match self
            .call(self.identity.sign_in_with_password(email, password))
            .await
        {
            Ok(session) => self.complete_sign_in(ticket, session).await,
            Err(e) => self.fail(&e, "Login failed"),
        }
    }

    /// Create an account; signs in unless email confirmation is required
    pub async fn register(&self, email: &str, password: &str) -> AuthOutcome {
        let ticket = self.ticket();
        let _in_flight = self.track(email);
        self.set_loading(true);

        let sign_up = match self.call(self.identity.sign_up(email, password)).await {
            Ok(sign_up) => sign_up,
            Err(e) => return self.fail(&e, "Registration failed"),
        };

        let pending = sign_up.needs_confirmation();
        match sign_up.session {
            Some(session) if !pending => self.complete_sign_in(ticket, session).await,
            _ => {
                self.set_loading(false);
                tracing::info!(user_id = %sign_up.user.id, "Registered, awaiting email confirmation");
                AuthOutcome::ConfirmationPending {
                    message: CONFIRMATION_PENDING_MESSAGE.to_string(),
                }
            }
        }
    }

    /// Clear the session locally, then invalidate it remotely
    ///
    /// The local state is cleared even if the remote call fails.
    pub async fn logout(&self) {
        self.logouts.fetch_add(1, Ordering::SeqCst);
        self.force(SessionState::signed_out());
        tracing::info!("Signed out");

        if let Err(e) = self.call(self.identity.sign_out()).await {
            tracing::warn!(error = %e, "Remote sign-out failed; local session already cleared");
        }
    }

    /// Replace the cached user (e.g. after the survey is submitted)
    ///
    /// Returns false when `user` is not the signed-in user.
    pub fn update_user(&self, user: User) -> bool {
        let user_id = user.id.clone();
        let completed = user.has_completed_segmentation;
        let updated = self.state.send_if_modified(|state| {
            if state.user_id() == Some(user_id.as_str()) {
                state.user = Some(user);
                true
            } else {
                false
            }
        });

        if updated {
            tracing::debug!(user_id = %user_id, completed, "Cached user updated");
        } else {
            tracing::warn!(user_id = %user_id, "Ignoring update for a user that is not signed in");
        }
        updated
    }

    async fn listen(manager: Weak<Self>, mut changes: broadcast::Receiver<AuthChange>) {
        loop {
            match changes.recv().await {
                Ok(change) => {
                    let Some(manager) = manager.upgrade() else {
                        break;
                    };
                    manager.handle_change(change).await;
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Missed session changes, re-reading session");
                    let Some(manager) = manager.upgrade() else {
                        break;
                    };
                    manager.refresh().await;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    async fn handle_change(&self, change: AuthChange) {
        match change.event {
            AuthEvent::SignedIn => {
                let Some(session) = change.session else {
                    tracing::warn!("Sign-in notification without a session");
                    return;
                };
                if self.is_local_sign_in(&session.user) {
                    tracing::debug!("Sign-in notification for a local request, skipping");
                    return;
                }
                if self.state().user_id() == Some(session.user.id.as_str()) {
                    tracing::debug!("Sign-in notification already applied");
                    return;
                }
                if !self.provider_holds(&session).await {
                    tracing::debug!(
                        user_id = %session.user.id,
                        "Sign-in notification is stale, skipping"
                    );
                    return;
                }

                // Claim the state now so local results still in flight lose
                let generation = self.bump();
                let user = self.load_user(&session.user).await;
                let user_id = user.id.clone();
                let next = SessionState::authenticated(user);
                if self.apply_if_current(generation, next, Some(session)) {
                    tracing::info!(user_id = %user_id, "Applied pushed sign-in");
                } else {
                    tracing::debug!(user_id = %user_id, "Pushed sign-in superseded");
                }
            }
            AuthEvent::SignedOut => {
                let state = self.state();
                if !state.is_authenticated && state.user.is_none() {
                    return;
                }
                // An echo of an earlier sign-out can arrive after a newer sign-in
                if let Ok(Some(current)) = self.call(self.identity.get_session()).await {
                    if state.user_id() == Some(current.user.id.as_str()) {
                        tracing::debug!("Sign-out notification is stale, skipping");
                        return;
                    }
                }
                self.force(SessionState::signed_out());
                tracing::info!("Applied pushed sign-out");
            }
            AuthEvent::TokenRefreshed => {
                tracing::debug!("Access token refreshed");
            }
        }
    }

    async fn complete_sign_in(&self, ticket: Ticket, session: AuthSession) -> AuthOutcome {
        if self.logged_out_since(ticket) {
            return self.abandon(&session).await;
        }

        let user = self.load_user(&session.user).await;
        let next = SessionState::authenticated(user.clone());
        if self.apply_if_current(ticket.generation, next, Some(session.clone())) {
            tracing::info!(
                user_id = %user.id,
                completed = user.has_completed_segmentation,
                "Signed in"
            );
            return AuthOutcome::SignedIn(user);
        }

        if self.logged_out_since(ticket) {
            return self.abandon(&session).await;
        }

        // A pushed change got there first; fine if it is the same identity
        match self.current_user() {
            Some(current) if current.id == user.id => AuthOutcome::SignedIn(current),
            _ => {
                tracing::info!(user_id = %user.id, "Sign-in superseded by a pushed session change");
                self.abandon(&session).await
            }
        }
    }

    /// Revoke the session a cancelled login created
    ///
    /// A newer session that has been applied since stays current in the
    /// provider.
    async fn abandon(&self, abandoned: &AuthSession) -> AuthOutcome {
        let replacement = self
            .live_session()
            .filter(|live| live.access_token != abandoned.access_token);
        tracing::info!(
            user_id = %abandoned.user.id,
            keeps_newer = replacement.is_some(),
            "Abandoning overtaken sign-in"
        );

        if let Err(e) = self
            .call(self.identity.revoke_session(abandoned, replacement.as_ref()))
            .await
        {
            tracing::warn!(error = %e, "Failed to revoke abandoned session");
        }
        AuthOutcome::Failed(AuthFailure::superseded())
    }

    /// Whether the provider's current session is `session`
    async fn provider_holds(&self, session: &AuthSession) -> bool {
        match self.call(self.identity.get_session()).await {
            Ok(Some(current)) => current.access_token == session.access_token,
            Ok(None) => false,
            Err(e) => {
                tracing::debug!(error = %e, "Could not confirm pushed session, applying it");
                true
            }
        }
    }

    fn live_session(&self) -> Option<AuthSession> {
        let _generation = lock(&self.generation);
        lock(&self.live).clone()
    }

    fn fail(&self, err: &BackendError, context: &str) -> AuthOutcome {
        self.set_loading(false);
        match err {
            BackendError::Auth(message) => {
                tracing::info!(reason = %message, "{}", context);
            }
            _ => {
                tracing::error!(error = %err, "{}", context);
            }
        }
        AuthOutcome::Failed(AuthFailure::from(err))
    }

    /// Build the domain user; a missing filters row means "survey pending"
    async fn load_user(&self, identity: &AuthUser) -> User {
        let lookup = match tokio::time::timeout(
            self.config.request_timeout,
            self.store.get_user_filters(&identity.id),
        )
        .await
        {
            Ok(lookup) => lookup,
            Err(_) => Lookup::Failed(BackendError::Timeout),
        };

        let filters = match lookup {
            Lookup::Found(filters) => Some(filters),
            Lookup::NotFound => None,
            Lookup::Failed(e) => {
                tracing::error!(user_id = %identity.id, error = %e, "Error loading user filters");
                None
            }
        };

        User {
            id: identity.id.clone(),
            email: identity.email.clone().unwrap_or_default(),
            has_completed_segmentation: filters.is_some(),
            filters,
            created_at: identity.created_at,
        }
    }

    async fn call<T>(&self, request: impl Future<Output = BackendResult<T>>) -> BackendResult<T> {
        tokio::time::timeout(self.config.request_timeout, request).await?
    }

    fn ticket(&self) -> Ticket {
        Ticket {
            generation: *lock(&self.generation),
            logouts: self.logouts.load(Ordering::SeqCst),
        }
    }

    fn logged_out_since(&self, ticket: Ticket) -> bool {
        self.logouts.load(Ordering::SeqCst) != ticket.logouts
    }

    fn bump(&self) -> u64 {
        let mut generation = lock(&self.generation);
        *generation += 1;
        *generation
    }

    /// Apply `next` only if nothing else was applied since `generation`
    fn apply_if_current(
        &self,
        generation: u64,
        next: SessionState,
        session: Option<AuthSession>,
    ) -> bool {
        let mut current = lock(&self.generation);
        if *current != generation {
            return false;
        }
        *current += 1;
        *lock(&self.live) = session;
        self.state.send_replace(next);
        true
    }

    fn force(&self, next: SessionState) {
        let mut current = lock(&self.generation);
        *current += 1;
        *lock(&self.live) = None;
        self.state.send_replace(next);
    }

    fn set_loading(&self, loading: bool) {
        self.state.send_if_modified(|state| {
            let changed = state.loading != loading;
            state.loading = loading;
            changed
        });
    }

    fn track(&self, email: &str) -> InFlight<'_> {
        let email = normalize_email(email);
        lock(&self.in_flight).push(email.clone());
        InFlight {
            manager: self,
            email,
        }
    }

    fn is_local_sign_in(&self, identity: &AuthUser) -> bool {
        match &identity.email {
            Some(email) => lock(&self.in_flight).contains(&normalize_email(email)),
            None => false,
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn manager(backend: &Arc<MemoryBackend>) -> Arc<SessionManager> {
        SessionManager::new(backend.clone(), backend.clone(), SessionConfig::default())
    }

    #[test]
    fn test_default_config() {
        assert_eq!(SessionConfig::default().request_timeout, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_initial_state_is_loading() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(&backend);
        assert_eq!(manager.phase(), SessionPhase::Loading);
        assert!(manager.current_user().is_none());
    }

    #[tokio::test]
    async fn test_apply_if_current_rejects_stale_generation() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(&backend);

        let ticket = manager.ticket();
        manager.force(SessionState::signed_out());
        assert!(!manager.apply_if_current(ticket.generation, SessionState::default(), None));
        assert_eq!(manager.phase(), SessionPhase::Unauthenticated);

        let ticket = manager.ticket();
        assert!(manager.apply_if_current(ticket.generation, SessionState::default(), None));
        assert_eq!(manager.phase(), SessionPhase::Loading);
    }

    #[tokio::test]
    async fn test_in_flight_tracking() {
        let backend = Arc::new(MemoryBackend::new());
        let manager = manager(&backend);
        let identity = backend.add_account("Ana@Example.com", "secret1");

        {
            let _guard = manager.track(" ana@example.com ");
            assert!(manager.is_local_sign_in(&identity));
        }
        assert!(!manager.is_local_sign_in(&identity));
    }
}
