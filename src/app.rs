//! Application state container
//!
//! [`App`] composes the [`SessionManager`] and the
//! [`ConversationController`] with the banner error and the backend client.
//! The REPL and the one-shot commands are handed an `App` and drive it
//! through these operations; nothing else holds mutable client state.
//!
//! Operations that fail also mirror their error into the banner, so a UI
//! can either inspect the returned error or just re-render from state.

use std::sync::Arc;

use crate::api::{QueryApi, Stats};
use crate::config::ChatConfig;
use crate::conversation::{Completion, ConversationController, Message, PendingQuery, QueryOutcome};
use crate::error::LlmqError;
use crate::session::store::SessionStore;
use crate::session::{AuthForm, AuthView, Session, SessionManager};

/// The client's state container
pub struct App {
    api: Arc<dyn QueryApi>,
    session: SessionManager,
    conversation: ConversationController,
    banner: Option<String>,
    settings: ChatConfig,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("session", &self.session)
            .field("conversation", &self.conversation)
            .field("banner", &self.banner)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create a logged-out app
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use llmq::api::fake::FakeQueryApi;
    /// use llmq::app::App;
    /// use llmq::config::ChatConfig;
    /// use llmq::session::store::MemorySessionStore;
    ///
    /// let app = App::new(
    ///     Arc::new(FakeQueryApi::new()),
    ///     Box::new(MemorySessionStore::new()),
    ///     ChatConfig::default(),
    /// );
    /// assert!(!app.session().is_logged_in());
    /// ```
    pub fn new(api: Arc<dyn QueryApi>, store: Box<dyn SessionStore>, settings: ChatConfig) -> Self {
        Self {
            api,
            session: SessionManager::new(store),
            conversation: ConversationController::new(),
            banner: None,
            settings,
        }
    }

    pub fn session(&self) -> &Session {
        self.session.session()
    }

    pub fn auth_view(&self) -> AuthView {
        self.session.view()
    }

    pub fn form(&self) -> &AuthForm {
        self.session.form()
    }

    pub fn form_mut(&mut self) -> &mut AuthForm {
        self.session.form_mut()
    }

    pub fn transcript(&self) -> &[Message] {
        self.conversation.transcript()
    }

    pub fn stats(&self) -> Option<&Stats> {
        self.conversation.stats()
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    /// Current banner error, if any
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Shared handle to the backend client
    pub fn api(&self) -> Arc<dyn QueryApi> {
        Arc::clone(&self.api)
    }

    fn fail<T>(&mut self, error: LlmqError) -> Result<T, LlmqError> {
        self.banner = Some(error.to_string());
        Err(error)
    }

    /// Restore a persisted session and refresh stats if one was found.
    pub async fn restore(&mut self) -> bool {
        let restored = self.restore_session();
        if restored {
            self.fetch_stats().await;
        }
        restored
    }

    /// Restore a persisted session without contacting the backend.
    pub fn restore_session(&mut self) -> bool {
        self.session.restore()
    }

    /// Switch between the login and register forms, clearing the banner.
    pub fn toggle_view(&mut self) {
        self.session.toggle_view();
        self.banner = None;
    }

    /// Register using the current form contents
    ///
    /// # Errors
    ///
    /// Returns the validation or server error, also shown in the banner
    pub async fn register(&mut self) -> Result<(), LlmqError> {
        self.banner = None;
        let api = Arc::clone(&self.api);
        match self.session.register(api.as_ref()).await {
            Ok(()) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    /// Log in using the current form contents, then refresh stats
    ///
    /// A successful login starts from an empty transcript and no stats,
    /// including when it replaces another live session.
    ///
    /// # Errors
    ///
    /// Returns the validation or server error, also shown in the banner
    pub async fn login(&mut self) -> Result<(), LlmqError> {
        self.banner = None;
        let api = Arc::clone(&self.api);
        if let Err(e) = self.session.login(api.as_ref()).await {
            return self.fail(e);
        }
        self.conversation.reset();
        self.fetch_stats().await;
        Ok(())
    }

    /// Fill in the form and log in.
    pub async fn login_with(&mut self, username: &str, password: &str) -> Result<(), LlmqError> {
        let form = self.session.form_mut();
        form.username = username.to_string();
        form.password = password.to_string();
        self.login().await
    }

    /// Fill in the form and register.
    pub async fn register_with(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), LlmqError> {
        *self.session.form_mut() = AuthForm {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        self.register().await
    }

    /// Full reset: session, persisted session, transcript, stats and banner.
    pub fn logout(&mut self) {
        self.session.logout();
        self.conversation.reset();
        self.banner = None;
    }

    /// Start a query without waiting for it
    ///
    /// Returns `None` when the text is blank, a query is already in flight,
    /// or nobody is logged in. Otherwise the user message is already in the
    /// transcript and the banner is cleared.
    pub fn begin_submit(&mut self, text: &str) -> Option<PendingQuery> {
        let pending = self.conversation.begin_submit(text, self.session.ticket())?;
        self.banner = None;
        Some(pending)
    }

    /// Apply the outcome of a query started with [`Self::begin_submit`]
    ///
    /// A response for a session that has since ended changes nothing except
    /// releasing the loading flag.
    ///
    /// # Returns
    ///
    /// `Ok(true)` when an answer was appended, `Ok(false)` when discarded
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::Query`] when the query failed, or
    /// [`LlmqError::Auth`] when the token was refused; the error entry is
    /// already in the transcript and the banner is set
    pub async fn finish_submit(
        &mut self,
        pending: PendingQuery,
        outcome: QueryOutcome,
    ) -> Result<bool, LlmqError> {
        let still_current = self.session.is_current(pending.ticket());
        match self.conversation.complete_submit(pending, outcome, still_current) {
            Completion::Answered => {
                if self.settings.refresh_stats_after_query {
                    self.fetch_stats().await;
                }
                Ok(true)
            }
            Completion::Failed(e) => self.fail(e),
            Completion::Discarded => Ok(false),
        }
    }

    /// Submit a query and wait for the outcome
    ///
    /// # Returns
    ///
    /// `Ok(false)` if the submission was a no-op, `Ok(true)` if answered
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::Query`] when the query failed
    pub async fn submit_query(&mut self, text: &str) -> Result<bool, LlmqError> {
        let Some(pending) = self.begin_submit(text) else {
            return Ok(false);
        };
        let api = Arc::clone(&self.api);
        let outcome = pending.dispatch(api.as_ref()).await;
        self.finish_submit(pending, outcome).await
    }

    /// Replace the transcript with the server's history
    ///
    /// # Returns
    ///
    /// Number of records imported
    ///
    /// # Errors
    ///
    /// Returns [`LlmqError::NotLoggedIn`] without a session, or
    /// [`LlmqError::Fetch`] (also shown in the banner) when the request fails
    pub async fn fetch_history(&mut self) -> Result<usize, LlmqError> {
        self.fetch_history_limited(self.settings.history_limit).await
    }

    /// Like [`Self::fetch_history`] with an explicit record limit.
    pub async fn fetch_history_limited(&mut self, limit: Option<u32>) -> Result<usize, LlmqError> {
        let Some(ticket) = self.session.ticket() else {
            return Err(LlmqError::NotLoggedIn);
        };
        let result = self.api.fetch_history(ticket.token(), limit).await;
        if !self.session.is_current(&ticket) {
            tracing::info!("Discarding history for an ended session");
            return Ok(0);
        }
        match self.conversation.apply_history(result) {
            Ok(count) => Ok(count),
            Err(e) => self.fail(e),
        }
    }

    /// Best-effort stats refresh; failures are only logged.
    pub async fn fetch_stats(&mut self) {
        let Some(ticket) = self.session.ticket() else {
            return;
        };
        let result = self.api.fetch_stats(ticket.token()).await;
        if self.session.is_current(&ticket) {
            self.conversation.apply_stats(result);
        }
    }

    /// Empty the transcript.
    pub fn clear_chat(&mut self) {
        self.conversation.clear_chat();
    }
}
