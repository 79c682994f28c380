//! Session Manager
//!
//! Owns authentication state (token and username), the login/register form,
//! and the persisted copy of the session. Every session has a lifetime
//! handle; requests issued under it carry a [`SessionTicket`] so a response
//! that arrives after logout can be recognised and dropped.

use tokio_util::sync::CancellationToken;

use crate::api::{LoginRequest, QueryApi, RegisterRequest};
use crate::error::LlmqError;

pub mod store;

use store::{SessionStore, StoredSession};

/// Authentication state
///
/// Token and username are only ever set or cleared together, so
/// [`Session::is_logged_in`] holds exactly when both are non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    token: String,
    username: String,
}

impl Session {
    /// Create a session from a token and username.
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: username.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn is_logged_in(&self) -> bool {
        !self.token.is_empty() && !self.username.is_empty()
    }
}

/// Which form the user is filling in while logged out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthView {
    #[default]
    Login,
    Register,
}

/// Login/register form fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Handle tying a request to the session it was issued under
#[derive(Debug, Clone)]
pub struct SessionTicket {
    token: String,
    lifetime: CancellationToken,
}

impl SessionTicket {
    /// Bearer token to send with the request.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the session has ended since the ticket was issued.
    pub fn is_cancelled(&self) -> bool {
        self.lifetime.is_cancelled()
    }

    /// Resolves once the session ends.
    pub async fn cancelled(&self) {
        self.lifetime.cancelled().await
    }
}

/// Owner of the authentication state machine
#[derive(Debug)]
pub struct SessionManager {
    session: Session,
    form: AuthForm,
    view: AuthView,
    store: Box<dyn SessionStore>,
    lifetime: CancellationToken,
}

impl SessionManager {
    /// Create a logged-out manager backed by `store`.
    pub fn new(store: Box<dyn SessionStore>) -> Self {
        Self {
            session: Session::default(),
            form: AuthForm::default(),
            view: AuthView::default(),
            store,
            lifetime: CancellationToken::new(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn form(&self) -> &AuthForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut AuthForm {
        &mut self.form
    }

    pub fn view(&self) -> AuthView {
        self.view
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// Switch between the login and register forms.
    pub fn toggle_view(&mut self) {
        self.view = match self.view {
            AuthView::Login => AuthView::Register,
            AuthView::Register => AuthView::Login,
        };
    }

    /// Ticket for a request under the current session, or `None` when
    /// logged out.
    pub fn ticket(&self) -> Option<SessionTicket> {
        self.is_logged_in().then(|| SessionTicket {
            token: self.session.token.clone(),
            lifetime: self.lifetime.clone(),
        })
    }

    /// Whether `ticket` still belongs to the live session.
    pub fn is_current(&self, ticket: &SessionTicket) -> bool {
        !ticket.is_cancelled() && self.is_logged_in() && ticket.token == self.session.token
    }

    /// Restore a persisted session
    ///
    /// The token is not validated here; the first authenticated request
    /// will surface an auth error if it has expired. A store that cannot be
    /// read is treated as empty.
    ///
    /// # Returns
    ///
    /// `true` if a complete session was restored
    pub fn restore(&mut self) -> bool {
        let stored = match self.store.load() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to read stored session: {:#}", e);
                None
            }
        };

        match stored {
            Some(stored) if stored.is_complete() => {
                tracing::info!(username = %stored.username, "Restored session");
                self.start(Session::new(stored.token, stored.username));
                true
            }
            _ => false,
        }
    }

    /// Register a new account from the form
    ///
    /// On success the view returns to login and the email field is cleared;
    /// the user is not logged in.
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::Validation`] if any field is blank (no request is
    /// made) or [`LlmqError::Auth`] if the server rejects the registration
    pub async fn register(&mut self, api: &dyn QueryApi) -> Result<(), LlmqError> {
        if self.form.username.trim().is_empty()
            || self.form.password.trim().is_empty()
            || self.form.email.trim().is_empty()
        {
            return Err(LlmqError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }

        let request = RegisterRequest {
            username: self.form.username.clone(),
            email: self.form.email.clone(),
            password: self.form.password.clone(),
        };

        api.register(&request).await.map_err(|e| {
            tracing::warn!(username = %request.username, "Registration failed: {}", e);
            LlmqError::Auth(e.user_message("Registration failed"))
        })?;

        tracing::info!(username = %request.username, "Registered account");
        self.view = AuthView::Login;
        self.form.email.clear();
        Ok(())
    }

    /// Log in with the form's username and password
    ///
    /// On success the session is started and persisted and the form's
    /// credentials are cleared. On failure the form is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::Validation`] if a field is blank (no request is
    /// made) or [`LlmqError::Auth`] if the server rejects the credentials
    pub async fn login(&mut self, api: &dyn QueryApi) -> Result<(), LlmqError> {
        if self.form.username.trim().is_empty() || self.form.password.trim().is_empty() {
            return Err(LlmqError::Validation(
                "Please enter username and password".to_string(),
            ));
        }

        let request = LoginRequest {
            username: self.form.username.clone(),
            password: self.form.password.clone(),
        };

        let grant = api.login(&request).await.map_err(|e| {
            tracing::warn!(username = %request.username, "Login failed: {}", e);
            LlmqError::Auth(e.user_message("Login failed"))
        })?;

        let session = Session::new(grant.into_token(), request.username);
        let stored = StoredSession {
            token: session.token.clone(),
            username: session.username.clone(),
        };
        if let Err(e) = self.store.save(&stored) {
            tracing::warn!("Failed to persist session: {:#}", e);
        }

        tracing::info!(username = %session.username, "Logged in");
        self.start(session);
        self.form.username.clear();
        self.form.password.clear();
        Ok(())
    }

    /// End the session
    ///
    /// Clears the store and the in-memory session, and cancels the session
    /// lifetime so in-flight requests observe it.
    pub fn logout(&mut self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!("Failed to clear stored session: {:#}", e);
        }
        self.lifetime.cancel();
        if self.session.is_logged_in() {
            tracing::info!(username = %self.session.username, "Logged out");
        }
        self.session = Session::default();
    }

    fn start(&mut self, session: Session) {
        self.lifetime.cancel();
        self.lifetime = CancellationToken::new();
        self.session = session;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::store::MemorySessionStore;
    use crate::api::fake::{FakeCall, FakeQueryApi};
    use crate::api::{ApiError, TokenGrant};

    fn manager() -> (SessionManager, MemorySessionStore) {
        let store = MemorySessionStore::new();
        (SessionManager::new(Box::new(store.clone())), store)
    }

    #[test]
    fn test_session_logged_in_requires_both_fields() {
        assert!(Session::new("t", "u").is_logged_in());
        assert!(!Session::new("", "u").is_logged_in());
        assert!(!Session::new("t", "").is_logged_in());
        assert!(!Session::default().is_logged_in());
    }

    #[test]
    fn test_restore_from_complete_store() {
        let store = MemorySessionStore::with_session("t1", "alice");
        let mut manager = SessionManager::new(Box::new(store));
        assert!(manager.restore());
        assert_eq!(manager.session(), &Session::new("t1", "alice"));
    }

    #[test]
    fn test_restore_ignores_partial_store() {
        let store = MemorySessionStore::with_session("t1", "");
        let mut manager = SessionManager::new(Box::new(store));
        assert!(!manager.restore());
        assert!(!manager.is_logged_in());
    }

    #[tokio::test]
    async fn test_login_success_persists_and_clears_credentials() {
        let (mut manager, store) = manager();
        let api = FakeQueryApi::new();
        api.push_login(Ok(TokenGrant::AccessToken("t1".to_string())));

        manager.form_mut().username = "alice".to_string();
        manager.form_mut().password = "x".to_string();
        manager.login(&api).await.unwrap();

        assert_eq!(manager.session(), &Session::new("t1", "alice"));
        assert!(manager.is_logged_in());
        assert_eq!(
            store.load().unwrap(),
            Some(StoredSession {
                token: "t1".to_string(),
                username: "alice".to_string()
            })
        );
        assert!(manager.form().password.is_empty());
    }

    #[tokio::test]
    async fn test_login_blank_fields_makes_no_request() {
        let (mut manager, _store) = manager();
        let api = FakeQueryApi::new();
        manager.form_mut().username = "alice".to_string();
        manager.form_mut().password = "   ".to_string();

        let err = manager.login(&api).await.unwrap_err();
        assert!(matches!(err, LlmqError::Validation(_)));
        assert_eq!(err.to_string(), "Please enter username and password");
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_login_rejection_keeps_form() {
        let (mut manager, store) = manager();
        let api = FakeQueryApi::new();
        api.push_login(Err(ApiError::Rejected {
            status: 401,
            message: Some("Invalid credentials".to_string()),
        }));
        manager.form_mut().username = "alice".to_string();
        manager.form_mut().password = "wrong".to_string();

        let err = manager.login(&api).await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid credentials");
        assert_eq!(manager.form().password, "wrong");
        assert!(!manager.is_logged_in());
        assert!(store.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_register_requires_all_fields() {
        let (mut manager, _store) = manager();
        let api = FakeQueryApi::new();
        manager.form_mut().username = "bob".to_string();
        manager.form_mut().password = "secret123".to_string();

        let err = manager.register(&api).await.unwrap_err();
        assert_eq!(err.to_string(), "Please fill in all fields");
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_register_success_returns_to_login_without_session() {
        let (mut manager, _store) = manager();
        let api = FakeQueryApi::new();
        manager.toggle_view();
        *manager.form_mut() = AuthForm {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "secret123".to_string(),
        };

        manager.register(&api).await.unwrap();

        assert_eq!(manager.view(), AuthView::Login);
        assert!(manager.form().email.is_empty());
        assert_eq!(manager.form().username, "bob");
        assert!(!manager.is_logged_in());
        assert_eq!(
            api.calls(),
            vec![FakeCall::Register {
                username: "bob".to_string(),
                email: "bob@example.com".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_register_rejection_uses_fallback() {
        let (mut manager, _store) = manager();
        let api = FakeQueryApi::new();
        api.push_register(Err(ApiError::Rejected {
            status: 400,
            message: None,
        }));
        manager.toggle_view();
        *manager.form_mut() = AuthForm {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "secret123".to_string(),
        };

        let err = manager.register(&api).await.unwrap_err();
        assert_eq!(err.to_string(), "Registration failed");
        assert_eq!(manager.view(), AuthView::Register);
        assert_eq!(manager.form().email, "bob@example.com");
    }

    #[test]
    fn test_logout_clears_everything_and_cancels_ticket() {
        let store = MemorySessionStore::with_session("t1", "alice");
        let observer = store.clone();
        let mut manager = SessionManager::new(Box::new(store));
        manager.restore();

        let ticket = manager.ticket().unwrap();
        assert!(manager.is_current(&ticket));

        manager.logout();

        assert!(ticket.is_cancelled());
        assert!(!manager.is_current(&ticket));
        assert_eq!(manager.session(), &Session::default());
        assert!(observer.load().unwrap().is_none());
        assert!(manager.ticket().is_none());
    }

    #[tokio::test]
    async fn test_ticket_from_previous_session_is_not_current() {
        let store = MemorySessionStore::with_session("old", "alice");
        let mut manager = SessionManager::new(Box::new(store));
        manager.restore();
        let stale = manager.ticket().unwrap();

        manager.logout();
        let api = FakeQueryApi::new();
        api.push_login(Ok(TokenGrant::Token("new".to_string())));
        manager.form_mut().username = "alice".to_string();
        manager.form_mut().password = "x".to_string();
        manager.login(&api).await.unwrap();

        assert!(!manager.is_current(&stale));
        assert!(manager.is_current(&manager.ticket().unwrap()));
    }

    #[test]
    fn test_toggle_view() {
        let (mut manager, _store) = manager();
        assert_eq!(manager.view(), AuthView::Login);
        manager.toggle_view();
        assert_eq!(manager.view(), AuthView::Register);
        manager.toggle_view();
        assert_eq!(manager.view(), AuthView::Login);
    }
}
