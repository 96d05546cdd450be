//! Testing utilities.
//!
//! This module provides tools for tests that must not touch the network:
//! - `MockProvider` for scripted provider replies
//! - `TestHarness` wiring a controller to in-memory fakes
//! - Sample story payloads and anecdotes

use crate::analytics::RecordingSink;
use crate::anecdote::{Anecdote, ToughWord};
use crate::app::{AnecdoteApp, AppConfig};
use crate::generator::{ContentProvider, Generator, GeneratorConfig};
use crate::launch::QueryParams;
use crate::storage::MemoryStore;
use async_trait::async_trait;
use gemini::{InlineData, Part, Request, Response};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// A scripted reply from the mock provider.
#[derive(Debug, Clone)]
pub enum MockReply {
    Respond(Response),
    Fail(String),
}

#[derive(Default)]
struct MockState {
    text_replies: VecDeque<MockReply>,
    image_replies: VecDeque<MockReply>,
    text_requests: Vec<Request>,
    image_requests: Vec<Request>,
}

/// A provider that returns scripted replies.
///
/// Story requests (those carrying a response schema) and illustration
/// requests are answered from separate queues. An exhausted story queue
/// fails; an exhausted image queue answers with no image.
#[derive(Default)]
pub struct MockProvider {
    state: Mutex<MockState>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a story payload, serialized as the provider would send it.
    pub fn queue_story(&self, story: Value) -> &Self {
        self.queue_text(story.to_string())
    }

    /// Queue a raw text reply to the next story request.
    pub fn queue_text(&self, text: impl Into<String>) -> &Self {
        self.state()
            .text_replies
            .push_back(MockReply::Respond(Response::from_text(text)));
        self
    }

    /// Queue a complete provider response for the next story request.
    pub fn queue_text_response(&self, response: Response) -> &Self {
        self.state()
            .text_replies
            .push_back(MockReply::Respond(response));
        self
    }

    /// Make the next story request fail at the transport level.
    pub fn queue_text_error(&self, message: impl Into<String>) -> &Self {
        self.state()
            .text_replies
            .push_back(MockReply::Fail(message.into()));
        self
    }

    /// Queue an inline image for the next illustration request.
    pub fn queue_image(&self, mime_type: &str, base64_data: &str) -> &Self {
        let part = Part::InlineData(InlineData {
            mime_type: mime_type.to_string(),
            data: base64_data.to_string(),
        });
        self.state()
            .image_replies
            .push_back(MockReply::Respond(Response::from_parts(vec![part])));
        self
    }

    /// Queue a text-only (imageless) reply to the next illustration request.
    pub fn queue_image_text(&self, text: impl Into<String>) -> &Self {
        self.state()
            .image_replies
            .push_back(MockReply::Respond(Response::from_text(text)));
        self
    }

    /// Make the next illustration request fail.
    pub fn queue_image_error(&self, message: impl Into<String>) -> &Self {
        self.state()
            .image_replies
            .push_back(MockReply::Fail(message.into()));
        self
    }

    pub fn text_requests(&self) -> Vec<Request> {
        self.state().text_requests.clone()
    }

    pub fn image_requests(&self) -> Vec<Request> {
        self.state().image_requests.clone()
    }

    pub fn text_request_count(&self) -> usize {
        self.state().text_requests.len()
    }

    pub fn image_request_count(&self) -> usize {
        self.state().image_requests.len()
    }
}

#[async_trait]
impl ContentProvider for MockProvider {
    async fn generate_content(&self, request: Request) -> Result<Response, gemini::Error> {
        let reply = {
            let mut state = self.state();
            if request.response_schema.is_some() {
                state.text_requests.push(request);
                state.text_replies.pop_front().unwrap_or_else(|| {
                    MockReply::Fail("no scripted story reply".to_string())
                })
            } else {
                state.image_requests.push(request);
                state
                    .image_replies
                    .pop_front()
                    .unwrap_or_else(|| MockReply::Respond(Response::default()))
            }
        };

        match reply {
            MockReply::Respond(response) => Ok(response),
            MockReply::Fail(message) => Err(gemini::Error::Network(message)),
        }
    }
}

/// A schema-conforming story payload.
pub fn sample_story(title: &str, topic: &str) -> Value {
    json!({
        "title": title,
        "story": format!(
            "In 1666, a young scholar named Isaac sat in his mother's garden when an apple fell. \
             Whether or not it struck him, as the popular legend claims, he began to wonder \
             why it fell straight down. This is the tale of {title}."
        ),
        "takeaway": "Curiosity about ordinary events can reveal universal laws.",
        "funFact": "Newton's apple tree still grows at Woolsthorpe Manor.",
        "emoji": "🍎",
        "topic": topic,
        "ncertTopic": "Class 9 Science: Gravitation",
        "relatedTopics": ["Laws of Motion", "Kepler", "Tides"],
        "toughWords": [
            { "word": "scholar", "definition": "a learned person" },
            { "word": "legend", "definition": "popular unverified story" },
            { "word": "universal", "definition": "true everywhere" }
        ]
    })
}

/// An [`Anecdote`] built from [`sample_story`], without illustration.
pub fn sample_anecdote(title: &str, topic: &str) -> Anecdote {
    Anecdote {
        title: title.to_string(),
        story: format!("A scholar faced a moment of discovery in the tale of {title}."),
        takeaway: "Curiosity about ordinary events can reveal universal laws.".to_string(),
        fun_fact: "Newton's apple tree still grows at Woolsthorpe Manor.".to_string(),
        topic: topic.to_string(),
        emoji: "🍎".to_string(),
        related_topics: vec![
            "Laws of Motion".to_string(),
            "Kepler".to_string(),
            "Tides".to_string(),
        ],
        tough_words: vec![
            ToughWord::new("scholar", "a learned person"),
            ToughWord::new("discovery", "finding something new"),
            ToughWord::new("tale", "a story"),
        ],
        ncert_topic: "Class 9 Science: Gravitation".to_string(),
        image_url: None,
    }
}

/// A controller wired to in-memory fakes.
pub struct TestHarness {
    pub app: AnecdoteApp,
    pub provider: Arc<MockProvider>,
    pub store: Arc<MemoryStore>,
    pub analytics: Arc<RecordingSink>,
}

impl TestHarness {
    /// A harness with an empty store and no launch parameters.
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), QueryParams::new())
    }

    /// A harness launched with `query` (e.g. `"shared_topic=Pythagoras"`).
    pub fn with_launch_query(query: &str) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), QueryParams::parse(query))
    }

    /// A harness over an existing store, as if the app were restarted.
    pub fn with_store(store: Arc<MemoryStore>, launch: QueryParams) -> Self {
        let provider = Arc::new(MockProvider::new());
        let analytics = Arc::new(RecordingSink::new());
        let generator = Generator::new(provider.clone()).with_config(GeneratorConfig::default());
        let app = AnecdoteApp::new(store.clone(), generator)
            .with_config(AppConfig::default())
            .with_launch_params(Box::new(launch))
            .with_analytics(analytics.clone());

        Self {
            app,
            provider,
            store,
            analytics,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
