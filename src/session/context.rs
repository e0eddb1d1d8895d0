//! Session bootstrap and auth state for the console.
//!
//! DESIGN
//! ======
//! `AuthContext` owns the answer to "who is signed in, with which profile and
//! tenant". State is published on a `watch` channel so any number of readers
//! can follow it.
//!
//! Startup is two-phase. `new` hydrates a tentative state from the session
//! cache (with `loading = true`) so a returning user sees something at once.
//! `bootstrap` then asks the provider for the authoritative session, racing a
//! safety timer. Whichever finishes first flips `loading` off; the check keeps
//! running past the timer and still adopts its result.
//!
//! Profile loads are deduplicated per user id with an in-flight marker. Session
//! events tend to arrive in bursts (a sign-in emits `SignedIn` while the caller
//! is already adopting the same session), and one directory round trip per
//! burst is enough. The marker is released on a timer after completion.
//!
//! Auth errors never escape: they degrade to "no session" or to a minimal
//! profile built from the auth user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

use super::cache::SessionCache;
use super::provider::{AuthError, AuthEvent, AuthProvider, Directory};
use super::types::{AuthUser, Cliente, Profile, Session};

const DEFAULT_SAFETY_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_SIGN_OUT_TIMEOUT_MS: u64 = 3_000;
const DEFAULT_IN_FLIGHT_RELEASE_MS: u64 = 1_000;

// =============================================================================
// SETTINGS & STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthSettings {
    /// Upper bound on how long `loading` stays on during bootstrap.
    pub safety_timeout: Duration,
    /// Deadline for the provider sign-out call.
    pub sign_out_timeout: Duration,
    /// Delay before a finished profile load lets the same user load again.
    pub in_flight_release: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            safety_timeout: Duration::from_millis(DEFAULT_SAFETY_TIMEOUT_MS),
            sign_out_timeout: Duration::from_millis(DEFAULT_SIGN_OUT_TIMEOUT_MS),
            in_flight_release: Duration::from_millis(DEFAULT_IN_FLIGHT_RELEASE_MS),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthState {
    pub user: Option<AuthUser>,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub cliente: Option<Cliente>,
    pub loading: bool,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

struct Inner {
    provider: Arc<dyn AuthProvider>,
    directory: Arc<dyn Directory>,
    cache: SessionCache,
    settings: AuthSettings,
    state: watch::Sender<AuthState>,
    loading_done: AtomicBool,
    in_flight: Mutex<Option<String>>,
}

/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct AuthContext {
    inner: Arc<Inner>,
}

impl AuthContext {
    /// Build a context and hydrate it from the cache.
    ///
    /// Caches written by another app version are dropped first.
    #[must_use]
    pub fn new(
        provider: Arc<dyn AuthProvider>,
        directory: Arc<dyn Directory>,
        cache: SessionCache,
        settings: AuthSettings,
    ) -> Self {
        cache.reconcile_version(env!("CARGO_PKG_VERSION"));

        let session = cache.load_session();
        let initial = AuthState {
            user: session.as_ref().map(|s| s.user.clone()),
            session,
            profile: cache.load_profile(),
            cliente: cache.load_cliente(),
            loading: true,
        };
        let (state, _) = watch::channel(initial);

        Self {
            inner: Arc::new(Inner {
                provider,
                directory,
                cache,
                settings,
                state,
                loading_done: AtomicBool::new(false),
                in_flight: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn cache(&self) -> &SessionCache {
        &self.inner.cache
    }

    /// Resolve the authoritative session, bounded by the safety timer.
    ///
    /// Returns once the check itself has finished, even when the timer fired
    /// first.
    pub async fn bootstrap(&self) {
        let check = self.resolve_session();
        tokio::pin!(check);

        tokio::select! {
            () = &mut check => {}
            () = tokio::time::sleep(self.inner.settings.safety_timeout) => {
                tracing::warn!(
                    timeout = ?self.inner.settings.safety_timeout,
                    "session check still running; releasing loading state"
                );
                self.finish_loading();
                check.await;
            }
        }
        self.finish_loading();
    }

    /// Turn `loading` off. Only the first call has an effect.
    fn finish_loading(&self) -> bool {
        if self.inner.loading_done.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.inner.state.send_modify(|s| s.loading = false);
        true
    }

    async fn resolve_session(&self) {
        let session = match self.inner.provider.get_session().await {
            Ok(Some(session)) => Some(session),
            Ok(None) => self.recover_from_cache().await,
            Err(e) => {
                tracing::warn!(error = %e, "session check failed; trying cached tokens");
                self.recover_from_cache().await
            }
        };

        match session {
            Some(session) => self.adopt(session).await,
            None => {
                tracing::info!("no session; signed out");
                self.clear_local();
            }
        }
    }

    /// Re-establish a session from the token pair left in the cache.
    async fn recover_from_cache(&self) -> Option<Session> {
        let tokens = self.inner.cache.load_tokens()?;
        match self
            .inner
            .provider
            .set_session(&tokens.access_token, &tokens.refresh_token, tokens.expires_at)
            .await
        {
            Ok(session) => {
                tracing::info!(user_id = %session.user.id, "session restored from cache");
                Some(session)
            }
            Err(e) => {
                tracing::warn!(error = %e, "cached session rejected");
                None
            }
        }
    }

    async fn adopt(&self, session: Session) {
        self.inner.cache.save_session(&session);
        self.inner.state.send_modify(|s| {
            s.user = Some(session.user.clone());
            s.session = Some(session.clone());
        });
        self.load_profile(&session).await;
    }

    /// Fetch the profile and its tenant for `session` and publish both.
    ///
    /// A second call for the same user while one is in flight (or within the
    /// release delay after it) returns immediately.
    pub async fn load_profile(&self, session: &Session) {
        let user_id = session.user.id.clone();
        {
            let mut marker = self
                .inner
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if marker.as_deref() == Some(user_id.as_str()) {
                tracing::debug!(%user_id, "profile load already in flight");
                return;
            }
            *marker = Some(user_id.clone());
        }

        let profile = match self.inner.directory.fetch_profile(session).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(%user_id, error = %e, "profile fetch failed; using minimal profile");
                Profile::minimal(&session.user)
            }
        };

        let cliente = match profile.cliente_id.as_deref() {
            Some(cliente_id) => match self.inner.directory.fetch_cliente(session, cliente_id).await {
                Ok(cliente) => Some(cliente),
                Err(e) => {
                    tracing::warn!(%user_id, cliente_id, error = %e, "tenant fetch failed");
                    None
                }
            },
            None => None,
        };

        // Signed out (or switched user) while fetching.
        let still_current = self
            .inner
            .state
            .borrow()
            .user
            .as_ref()
            .is_some_and(|u| u.id == user_id);
        if still_current {
            self.inner.cache.save_profile(&profile);
            self.inner.cache.save_cliente(cliente.as_ref());
            self.inner.state.send_modify(|s| {
                s.profile = Some(profile);
                s.cliente = cliente;
            });
        }

        self.release_in_flight(user_id);
    }

    fn release_in_flight(&self, user_id: String) {
        let inner = Arc::downgrade(&self.inner);
        let delay = self.inner.settings.in_flight_release;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let mut marker = inner.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if marker.as_deref() == Some(user_id.as_str()) {
                *marker = None;
            }
        });
    }

    /// Follow provider events until the provider goes away or the context is
    /// dropped.
    pub fn spawn_listener(&self) -> JoinHandle<()> {
        let mut events = self.inner.provider.subscribe();
        let inner = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "auth listener lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                };
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                Self { inner }.handle_event(event).await;
            }
            tracing::debug!("auth listener stopped");
        })
    }

    async fn handle_event(&self, event: AuthEvent) {
        tracing::debug!(event = event.name(), "auth event");
        match event {
            // Bootstrap owns the no-session case; acting here would wipe the
            // cached tokens before the fallback reads them.
            AuthEvent::InitialSession(None) => {}
            AuthEvent::InitialSession(Some(session))
            | AuthEvent::SignedIn(session)
            | AuthEvent::TokenRefreshed(session)
            | AuthEvent::UserUpdated(session) => self.adopt(session).await,
            AuthEvent::SignedOut => self.clear_local(),
        }
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.inner.provider.sign_in_with_password(email, password).await?;
        tracing::info!(user_id = %session.user.id, "signed in");
        self.adopt(session.clone()).await;
        Ok(session)
    }

    /// Sign out with the provider, then clear local state regardless of how
    /// the provider call ended.
    pub async fn sign_out(&self) {
        let deadline = self.inner.settings.sign_out_timeout;
        match tokio::time::timeout(deadline, self.inner.provider.sign_out()).await {
            Ok(Ok(())) => tracing::info!("signed out"),
            Ok(Err(e)) => tracing::warn!(error = %e, "provider sign-out failed; clearing local state"),
            Err(_) => tracing::warn!(
                timeout = ?deadline,
                "provider sign-out timed out; clearing local state"
            ),
        }
        self.clear_local();
    }

    fn clear_local(&self) {
        // A fresh sign-in must load its profile even inside the release delay.
        *self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.inner.cache.clear_auth();
        self.inner.state.send_modify(|s| {
            s.user = None;
            s.session = None;
            s.profile = None;
            s.cliente = None;
        });
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
