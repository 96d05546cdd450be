//! AnecdoteApp - the application controller.
//!
//! This module ties the session store, history store and generator into a
//! single state machine that a front end drives with discrete events:
//! topic submission, suggestion and history clicks, login and logout,
//! language and view changes. Presentation reads the resulting state.

use crate::analytics::{params, AnalyticsSink, EventParams, NoopSink};
use crate::anecdote::Anecdote;
use crate::error::ValidationError;
use crate::generator::{GenerationError, Generator};
use crate::highlight::{segment_story, StorySegment};
use crate::history::{HistoryStore, PersistOutcome, FALLBACK_HISTORY_LIMIT, HISTORY_LIMIT};
use crate::launch::{share_link, LaunchParams, QueryParams, SHARED_TOPIC};
use crate::session::{SessionStore, User};
use crate::storage::KeyValueStore;
use crate::suggestions::{derive_suggestions, supported_language, Suggestion, DEFAULT_LANGUAGE};
use crate::view::{NoopView, View, ViewHooks};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Errors from controller operations.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Please log in first")]
    NoSession,

    #[error("A story is already being generated")]
    Busy,

    #[error("No history entry #{0}")]
    NoSuchHistoryEntry(usize),

    #[error("No related topic #{0}")]
    NoSuchRelatedTopic(usize),
}

/// Configuration for the controller.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Page that share links point at.
    pub share_base_url: String,

    /// Maximum history entries.
    pub history_limit: usize,

    /// History entries retried when a full write is rejected.
    pub fallback_history_limit: usize,

    /// Language selected at startup.
    pub language: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            share_base_url: "https://anecdote.app/".to_string(),
            history_limit: HISTORY_LIMIT,
            fallback_history_limit: FALLBACK_HISTORY_LIMIT,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl AppConfig {
    pub fn with_share_base_url(mut self, url: impl Into<String>) -> Self {
        self.share_base_url = url.into();
        self
    }

    pub fn with_history_limits(mut self, limit: usize, fallback: usize) -> Self {
        self.history_limit = limit;
        self.fallback_history_limit = fallback;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Progress of the current generation request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    Idle,
    Loading,
    /// The last request failed; the message is shown verbatim.
    Failed(String),
}

impl GenerationStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, GenerationStatus::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            GenerationStatus::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// A generation that has been started but not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingGeneration {
    pub topic: String,
    pub language: String,
    /// The user the result will be saved for.
    pub user: User,
}

/// The application controller.
pub struct AnecdoteApp {
    config: AppConfig,
    session: SessionStore,
    history: HistoryStore,
    generator: Generator,
    launch: Box<dyn LaunchParams>,
    analytics: Arc<dyn AnalyticsSink>,
    view_hooks: Arc<dyn ViewHooks>,

    view: View,
    current: Option<Anecdote>,
    topic: String,
    language: String,
    status: GenerationStatus,
    show_meanings: bool,
    pending_shared_topic: Option<String>,
}

impl AnecdoteApp {
    /// Create a controller over `storage` using `generator`.
    ///
    /// Nothing is read until [`AnecdoteApp::start`] is called.
    pub fn new(storage: Arc<dyn KeyValueStore>, generator: Generator) -> Self {
        let config = AppConfig::default();
        Self {
            session: SessionStore::new(storage.clone()),
            history: HistoryStore::new(storage)
                .with_limits(config.history_limit, config.fallback_history_limit),
            generator,
            launch: Box::new(QueryParams::new()),
            analytics: Arc::new(NoopSink),
            view_hooks: Arc::new(NoopView),
            view: View::Home,
            current: None,
            topic: String::new(),
            language: config.language.clone(),
            status: GenerationStatus::Idle,
            show_meanings: false,
            pending_shared_topic: None,
            config,
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.history = self
            .history
            .with_limits(config.history_limit, config.fallback_history_limit);
        self.language = supported_language(&config.language)
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string();
        self.config = config;
        self
    }

    pub fn with_launch_params(mut self, launch: Box<dyn LaunchParams>) -> Self {
        self.launch = launch;
        self
    }

    pub fn with_analytics(mut self, analytics: Arc<dyn AnalyticsSink>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn with_view_hooks(mut self, hooks: Arc<dyn ViewHooks>) -> Self {
        self.view_hooks = hooks;
        self
    }

    // ------------------------------------------------------------------
    // Startup and identity
    // ------------------------------------------------------------------

    /// Restore the stored session and consume any shared topic.
    ///
    /// A shared topic with no restorable session forces a guest login. The
    /// topic is then submitted once and cleared from the launch parameters.
    /// A failed shared generation is reported through [`Self::status`].
    pub async fn start(&mut self) -> Result<(), ControllerError> {
        if self.session.current().is_none() && self.session.restore().is_some() {
            self.on_session_changed();
        }

        if let Some(topic) = self.launch.get(SHARED_TOPIC) {
            self.launch.clear(SHARED_TOPIC);
            if !topic.trim().is_empty() {
                info!(topic = %topic, "opening shared topic");
                self.pending_shared_topic = Some(topic);
                if self.session.current().is_none() {
                    self.login_as_guest();
                }
            }
        }

        let Some(topic) = self.pending_shared_topic.take() else {
            return Ok(());
        };
        match self.submit(&topic).await {
            Err(ControllerError::Generation(_)) => Ok(()),
            other => other,
        }
    }

    /// Log in under `name`, replacing any current session.
    pub fn login(&mut self, name: &str) -> Result<(), ControllerError> {
        self.session.login(name)?;
        self.track("login", json!({ "method": "named" }));
        self.on_session_changed();
        Ok(())
    }

    /// Log in as the guest.
    pub fn login_as_guest(&mut self) {
        self.session.login_as_guest();
        self.track("login", json!({ "method": "guest" }));
        self.on_session_changed();
    }

    /// Log out and forget all per-user state.
    pub fn logout(&mut self) {
        self.track("logout", json!({}));
        self.session.logout();
        self.history.clear();
        self.current = None;
        self.topic.clear();
        self.status = GenerationStatus::Idle;
        self.show_meanings = false;
        self.view = View::Home;
    }

    fn on_session_changed(&mut self) {
        if let Some(user) = self.session.current().cloned() {
            self.history.load(&user);
        }
        self.view = View::Home;
        if self.pending_shared_topic.is_none() {
            self.current = None;
            self.topic.clear();
        }
    }

    // ------------------------------------------------------------------
    // Generation
    // ------------------------------------------------------------------

    /// Generate a story for `topic` and record it in history.
    pub async fn submit(&mut self, topic: &str) -> Result<(), ControllerError> {
        let pending = self.begin_generation(topic)?;
        let result = self
            .generator
            .generate(&pending.topic, &pending.language)
            .await;
        self.finish_generation(pending, result)
    }

    /// Generate a story for the topic currently in the input field.
    pub async fn submit_current(&mut self) -> Result<(), ControllerError> {
        let topic = self.topic.clone();
        self.submit(&topic).await
    }

    /// First half of [`Self::submit`]: validate and enter the loading state.
    ///
    /// Rejected input leaves the state untouched. While a generation is
    /// pending, further submissions fail with [`ControllerError::Busy`].
    pub fn begin_generation(&mut self, topic: &str) -> Result<PendingGeneration, ControllerError> {
        let trimmed = topic.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyTopic.into());
        }
        if self.status.is_loading() {
            return Err(ControllerError::Busy);
        }
        let Some(user) = self.session.current().cloned() else {
            return Err(ControllerError::NoSession);
        };

        self.track(
            "generate_story_start",
            json!({ "topic": topic, "language": self.language }),
        );
        self.status = GenerationStatus::Loading;
        self.current = None;
        self.show_meanings = false;
        self.topic = topic.to_string();
        self.view = View::Home;

        Ok(PendingGeneration {
            topic: trimmed.to_string(),
            language: self.language.clone(),
            user,
        })
    }

    /// Second half of [`Self::submit`]: apply the generator's result.
    pub fn finish_generation(
        &mut self,
        pending: PendingGeneration,
        result: Result<Anecdote, GenerationError>,
    ) -> Result<(), ControllerError> {
        match result {
            Ok(anecdote) => {
                self.status = GenerationStatus::Idle;
                self.track(
                    "generate_story_success",
                    json!({
                        "topic": pending.topic,
                        "language": pending.language,
                        "anecdote_title": anecdote.title,
                    }),
                );
                if self.session.current() == Some(&pending.user) {
                    let outcome = self.history.append(&pending.user, anecdote.clone());
                    if outcome != PersistOutcome::Saved {
                        debug!(?outcome, "history not fully persisted");
                    }
                } else {
                    debug!(title = %anecdote.title, "session changed during generation; not saved");
                }
                self.current = Some(anecdote);
                self.view_hooks.scroll_to_result();
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.track(
                    "generate_story_error",
                    json!({ "topic": pending.topic, "error_message": message }),
                );
                self.status = GenerationStatus::Failed(message);
                Err(e.into())
            }
        }
    }

    /// Regenerate from a history entry's stored topic.
    pub async fn select_history(&mut self, index: usize) -> Result<(), ControllerError> {
        let entry = self
            .history
            .get(index)
            .ok_or(ControllerError::NoSuchHistoryEntry(index))?;
        let (title, topic) = (entry.title.clone(), entry.topic.clone());
        self.track("view_history_item", json!({ "title": title }));
        self.submit(&topic).await
    }

    /// Generate from a suggestion chip.
    pub async fn select_suggestion(&mut self, label: &str) -> Result<(), ControllerError> {
        self.track("click_suggestion", json!({ "label": label }));
        self.submit(label).await
    }

    /// Generate from one of the current story's related topics.
    pub async fn select_related_topic(&mut self, index: usize) -> Result<(), ControllerError> {
        let topic = self
            .current
            .as_ref()
            .and_then(|a| a.related_topics.get(index))
            .cloned()
            .ok_or(ControllerError::NoSuchRelatedTopic(index))?;
        self.track("click_related_topic", json!({ "topic": topic }));
        self.submit(&topic).await
    }

    // ------------------------------------------------------------------
    // Presentation events
    // ------------------------------------------------------------------

    /// Update the topic input field.
    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.topic = topic.into();
    }

    /// Switch the story language. Only supported languages are accepted.
    pub fn set_language(&mut self, language: &str) -> Result<(), ValidationError> {
        let canonical = supported_language(language)
            .ok_or_else(|| ValidationError::UnsupportedLanguage(language.trim().to_string()))?;
        self.language = canonical.to_string();
        self.track("change_language", json!({ "language": canonical }));
        Ok(())
    }

    /// Flip between the home and history views.
    pub fn toggle_view(&mut self) -> View {
        self.view = self.view.toggled();
        self.track("page_view", json!({ "page_path": self.view.path() }));
        self.view
    }

    /// Back to an empty home screen.
    pub fn go_home(&mut self) {
        self.view = View::Home;
        self.current = None;
        self.topic.clear();
        self.track("page_view", json!({ "page_path": View::Home.path() }));
    }

    /// Dismiss the current story to pick another topic.
    pub fn explore_new_topic(&mut self) {
        self.current = None;
        self.topic.clear();
        self.view_hooks.scroll_to_top();
        self.track("explore_new_topic_click", json!({}));
    }

    /// Toggle inline definitions of tough words. Returns the new state.
    pub fn toggle_meanings(&mut self) -> bool {
        self.show_meanings = !self.show_meanings;
        let state = if self.show_meanings { "on" } else { "off" };
        self.track("toggle_meanings", json!({ "state": state }));
        self.show_meanings
    }

    /// The current story, with tough words marked when meanings are shown.
    pub fn story_segments(&self) -> Vec<StorySegment> {
        match &self.current {
            None => Vec::new(),
            Some(a) if self.show_meanings => segment_story(&a.story, &a.tough_words),
            Some(a) => vec![StorySegment::Plain(a.story.clone())],
        }
    }

    /// A link that reopens the current story's topic.
    pub fn share_link(&self) -> Option<String> {
        let anecdote = self.current.as_ref()?;
        self.track("share_story_click", json!({ "topic": anecdote.topic }));
        Some(share_link(&self.config.share_base_url, &anecdote.topic))
    }

    /// Suggestions derived from history and the curated defaults.
    pub fn suggestions(&self) -> Vec<Suggestion> {
        derive_suggestions(self.history.entries())
    }

    // ------------------------------------------------------------------
    // State accessors
    // ------------------------------------------------------------------

    pub fn user(&self) -> Option<&User> {
        self.session.current()
    }

    /// History for the active user, newest first.
    pub fn history(&self) -> &[Anecdote] {
        self.history.entries()
    }

    /// Storage key of the loaded history partition.
    pub fn history_partition(&self) -> Option<&str> {
        self.history.partition()
    }

    pub fn current_anecdote(&self) -> Option<&Anecdote> {
        self.current.as_ref()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn status(&self) -> &GenerationStatus {
        &self.status
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn show_meanings(&self) -> bool {
        self.show_meanings
    }

    pub fn launch_params(&self) -> &dyn LaunchParams {
        self.launch.as_ref()
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    fn track(&self, event: &str, value: serde_json::Value) {
        let params: EventParams = params(value);
        self.analytics.track(event, params);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_anecdote, sample_story, TestHarness};

    #[test]
    fn test_app_config_builder() {
        let config = AppConfig::default()
            .with_share_base_url("https://example.org/learn")
            .with_history_limits(20, 5)
            .with_language("Hindi");

        assert_eq!(config.share_base_url, "https://example.org/learn");
        assert_eq!(config.history_limit, 20);
        assert_eq!(config.fallback_history_limit, 5);
        assert_eq!(config.language, "Hindi");
    }

    #[test]
    fn test_generation_status_helpers() {
        assert!(GenerationStatus::Loading.is_loading());
        assert_eq!(GenerationStatus::Idle.error(), None);
        assert_eq!(GenerationStatus::Failed("x".into()).error(), Some("x"));
    }

    #[tokio::test]
    async fn test_submit_requires_session() {
        let mut h = TestHarness::new();
        let err = h.app.submit("Gravity").await.unwrap_err();

        assert!(matches!(err, ControllerError::NoSession));
        assert_eq!(h.provider.text_request_count(), 0);
        assert_eq!(h.app.status(), &GenerationStatus::Idle);
    }

    #[test]
    fn test_busy_while_loading() {
        let mut h = TestHarness::new();
        h.app.login_as_guest();

        let pending = h.app.begin_generation("Gravity").unwrap();
        assert!(h.app.status().is_loading());
        assert!(matches!(
            h.app.begin_generation("Optics"),
            Err(ControllerError::Busy)
        ));

        h.app
            .finish_generation(pending, Ok(sample_anecdote("The Falling Fruit", "Physics")))
            .unwrap();
        assert_eq!(h.app.status(), &GenerationStatus::Idle);
        assert!(h.app.begin_generation("Optics").is_ok());
    }

    #[test]
    fn test_result_not_saved_for_a_different_user() {
        let mut h = TestHarness::new();
        h.app.login("Ada").unwrap();
        let pending = h.app.begin_generation("Gravity").unwrap();
        h.app.login("Grace").unwrap();

        h.app
            .finish_generation(pending, Ok(sample_anecdote("The Falling Fruit", "Physics")))
            .unwrap();

        assert!(h.app.history().is_empty());
        h.app.login("Ada").unwrap();
        assert!(h.app.history().is_empty());
    }

    #[tokio::test]
    async fn test_related_topic_and_meanings() {
        let mut h = TestHarness::new();
        h.app.login_as_guest();
        h.provider
            .queue_story(sample_story("The Falling Fruit", "Physics"))
            .queue_story(sample_story("Three Laws", "Mechanics"));
        h.app.submit("Gravity").await.unwrap();

        assert!(h.app.toggle_meanings());
        assert!(h
            .app
            .story_segments()
            .iter()
            .any(|s| matches!(s, StorySegment::Term { word, .. } if word == "scholar")));

        h.app.select_related_topic(0).await.unwrap();
        assert!(!h.app.show_meanings());
        assert_eq!(h.app.topic(), "Laws of Motion");
        assert!(h.provider.text_requests()[1]
            .prompt_text()
            .contains("\"Laws of Motion\""));
        assert!(matches!(
            h.app.select_related_topic(7).await,
            Err(ControllerError::NoSuchRelatedTopic(7))
        ));
    }

    #[test]
    fn test_set_language() {
        let mut h = TestHarness::new();
        h.app.set_language("french").unwrap();
        assert_eq!(h.app.language(), "French");
        assert_eq!(
            h.app.set_language("Elvish"),
            Err(ValidationError::UnsupportedLanguage("Elvish".to_string()))
        );
        assert_eq!(h.app.language(), "French");
        assert_eq!(h.analytics.count("change_language"), 1);
    }

    #[test]
    fn test_view_toggle_and_home() {
        let mut h = TestHarness::new();
        assert_eq!(h.app.toggle_view(), View::History);
        assert_eq!(h.app.toggle_view(), View::Home);
        h.app.toggle_view();
        h.app.set_topic("Calculus");
        h.app.go_home();

        assert_eq!(h.app.view(), View::Home);
        assert_eq!(h.app.topic(), "");
        let paths: Vec<_> = h
            .analytics
            .events()
            .into_iter()
            .filter(|e| e.name == "page_view")
            .map(|e| e.params["page_path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, ["/history", "/home", "/history", "/home"]);
    }
}
