//! Session lifecycle: login, logout, token refresh and claim derivation.
//!
//! `SessionManager` owns the in-memory session state and writes every token
//! mutation through the credential store before touching memory, so persisted
//! and in-memory state never diverge for longer than one operation. It is an
//! explicit handle passed to whoever needs it rather than ambient global
//! state, which keeps teardown and testing deterministic. The background
//! refresh task is owned by a guard and aborted exactly once on drop.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::credentials::CredentialStore;
use crate::error::{ClientError, ClientResult};
use crate::guard::SessionView;
use crate::models::{SignupRequest, TokenPair};
use crate::token::{self, Claims};
use crate::tprintln;

const LOGIN_FAILED: &str = "Invalid email or password";
const REFRESH_FAILED: &str = "Failed to refresh token";
const NO_REFRESH_TOKEN: &str = "No refresh token available";

#[derive(Debug, Clone)]
pub struct SessionState {
    pub token: Option<TokenPair>,
    /// Claims decoded from the access token; `None` whenever `token` is
    /// `None` or the payload does not parse.
    pub user: Option<Claims>,
    /// An auth operation (login/refresh) is in flight.
    pub loading: bool,
    pub error: Option<String>,
    /// Startup read of persisted credentials has not completed yet.
    pub is_loading_token: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self { token: None, user: None, loading: false, error: None, is_loading_token: true }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    api: ApiClient,
    creds: CredentialStore,
    state: Arc<RwLock<SessionState>>,
}

impl SessionManager {
    pub fn new(api: ApiClient, creds: CredentialStore) -> Self {
        Self { api, creds, state: Arc::new(RwLock::new(SessionState::default())) }
    }

    pub fn state(&self) -> SessionState { self.state.read().clone() }

    pub fn view(&self) -> SessionView {
        let st = self.state.read();
        SessionView {
            authenticated: st.token.is_some(),
            busy: st.loading || st.is_loading_token,
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.read().token.as_ref().map(|t| t.access.clone())
    }

    pub fn user(&self) -> Option<Claims> { self.state.read().user.clone() }

    /// Startup read of the persisted slots. A session is restored only when
    /// both tokens are present.
    pub fn load_persisted(&self) {
        let pair = self.creds.pair();
        self.set_token(pair);
        self.state.write().is_loading_token = false;
    }

    /// Replace the in-memory token and re-derive the user claims. A decode
    /// failure is logged and swallowed; the session stays valid with no user.
    fn set_token(&self, pair: Option<TokenPair>) {
        let user = pair.as_ref().and_then(|p| match token::decode(&p.access) {
            Ok(claims) => Some(claims),
            Err(e) => {
                warn!("access token claims did not decode: {}", e);
                None
            }
        });
        let mut st = self.state.write();
        st.token = pair;
        st.user = user;
    }

    fn begin_op(&self) {
        let mut st = self.state.write();
        st.loading = true;
        st.error = None;
    }

    fn end_op(&self, error: Option<String>) {
        let mut st = self.state.write();
        st.loading = false;
        st.error = error;
    }

    /// Persist the new pair (disk first), then install it in memory.
    fn adopt_pair(&self, pair: TokenPair) -> ClientResult<()> {
        self.creds.store(&pair)?;
        self.set_token(Some(pair));
        Ok(())
    }

    /// Exchange credentials for a token pair. Any failure (wrong password,
    /// unknown account, transport) collapses to the same generic message.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<()> {
        self.begin_op();
        let outcome = match self.api.login(email, password).await {
            Ok(pair) => self.adopt_pair(pair),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                self.end_op(None);
                tprintln!("session.login ok user_id={:?}", self.user().map(|u| u.user_id));
                Ok(())
            }
            Err(e) => {
                debug!("login failed: {}", e);
                self.end_op(Some(LOGIN_FAILED.to_string()));
                Err(ClientError::credentials(LOGIN_FAILED))
            }
        }
    }

    /// Register a new account; a successful signup logs the user straight in.
    pub async fn signup(&self, req: &SignupRequest) -> ClientResult<()> {
        self.begin_op();
        let outcome = match self.api.signup(req).await {
            Ok(pair) => self.adopt_pair(pair),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                self.end_op(None);
                Ok(())
            }
            Err(e) => {
                self.end_op(Some("Signup failed, please try again.".to_string()));
                Err(e)
            }
        }
    }

    /// Clear persisted and in-memory state. Safe to call when already logged
    /// out.
    pub fn logout(&self) {
        self.creds.clear();
        self.set_token(None);
        tprintln!("session.logout");
    }

    /// Exchange the persisted refresh token for a fresh pair.
    ///
    /// No persisted refresh token: set the error and stop. Not a logout, as
    /// there is no session to end, and clearing here could clobber a login
    /// that is mid-flight in another context.
    ///
    /// Exchange failure: the session is treated as terminated; error is set
    /// and `logout()` runs as the fallback.
    pub async fn refresh(&self) -> ClientResult<()> {
        self.begin_op();
        let Some(refresh) = self.creds.refresh_token() else {
            self.end_op(Some(NO_REFRESH_TOKEN.to_string()));
            return Err(ClientError::auth(NO_REFRESH_TOKEN));
        };
        let outcome = match self.api.refresh(&refresh).await {
            Ok(pair) => self.adopt_pair(pair),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => {
                self.end_op(None);
                tprintln!("session.refresh ok");
                Ok(())
            }
            Err(e) => {
                self.end_op(Some(REFRESH_FAILED.to_string()));
                self.logout();
                Err(e)
            }
        }
    }

    /// Spawn the periodic background refresh. The returned guard uniquely
    /// owns the task and aborts it on drop, so a remounted context never
    /// leaves a duplicate timer behind.
    pub fn start_auto_refresh(&self, every: Duration) -> RefreshTask {
        let mgr = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // interval fires immediately; the first refresh should wait a full period
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if let Err(e) = mgr.refresh().await {
                    debug!("background refresh: {}", e);
                }
            }
        });
        RefreshTask { handle }
    }
}

/// Owner of the background refresh task. Dropping it cancels the task.
pub struct RefreshTask {
    handle: JoinHandle<()>,
}

impl RefreshTask {
    pub fn stop(self) { /* drop aborts */ }

    pub fn is_finished(&self) -> bool { self.handle.is_finished() }
}

impl Drop for RefreshTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
