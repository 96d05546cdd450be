//! QA tests for the submit flow.
//!
//! These drive the controller against the mock provider, so they run
//! offline: `cargo test -p anecdote-core --test qa_generation`

use anecdote_core::storage::KeyValueStore;
use anecdote_core::testing::sample_story;
use anecdote_core::{
    ControllerError, GenerationStatus, HistoryEntry, StorySegment, TestHarness, ValidationError,
    View, GENERATION_FAILED_MESSAGE,
};

fn stored_history(h: &TestHarness, key: &str) -> Vec<HistoryEntry> {
    let raw = h.store.get(key).unwrap().expect("history should be stored");
    serde_json::from_str(&raw).unwrap()
}

// =============================================================================
// Successful generation
// =============================================================================

#[tokio::test]
async fn test_submit_gravity() {
    let mut h = TestHarness::new();
    h.app.login("Asha").unwrap();
    h.provider
        .queue_story(sample_story("The Falling Fruit", "Classical Mechanics"))
        .queue_image("image/png", "iVBORw0KGgo=");

    h.app.submit("Gravity").await.unwrap();

    let current = h.app.current_anecdote().unwrap();
    assert_eq!(current.title, "The Falling Fruit");
    assert_eq!(current.topic, "Classical Mechanics");
    assert!(current.has_illustration());
    assert_eq!(h.app.status(), &GenerationStatus::Idle);
    assert_eq!(h.app.topic(), "Gravity");
    assert_eq!(h.app.view(), View::Home);

    assert_eq!(h.app.history().len(), 1);
    assert_eq!(h.app.history()[0].title, "The Falling Fruit");

    // The durable copy never carries the image.
    let stored = stored_history(&h, "history:asha");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].title, "The Falling Fruit");
    let raw = h.store.get("history:asha").unwrap().unwrap();
    assert!(!raw.contains("imageUrl"));
    assert!(!raw.contains("base64"));

    assert_eq!(
        h.analytics.names(),
        ["login", "generate_story_start", "generate_story_success"]
    );
    let success = h.analytics.last("generate_story_success").unwrap();
    assert_eq!(success.params["anecdote_title"], "The Falling Fruit");
    assert_eq!(success.params["language"], "English");
}

#[tokio::test]
async fn test_image_failure_still_saves_story() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    h.provider
        .queue_story(sample_story("Eureka", "Buoyancy"))
        .queue_image_error("quota exhausted");

    h.app.submit("Archimedes").await.unwrap();

    let current = h.app.current_anecdote().unwrap();
    assert_eq!(current.title, "Eureka");
    assert!(current.image_url.is_none());
    assert_eq!(stored_history(&h, "history:guest")[0].title, "Eureka");
    assert_eq!(h.analytics.count("generate_story_error"), 0);
}

#[tokio::test]
async fn test_selected_language_reaches_provider() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    h.app.set_language("Hindi").unwrap();
    h.provider.queue_story(sample_story("Seb Ka Girna", "Bhautiki"));

    h.app.submit("Gravity").await.unwrap();

    let request = h.provider.text_requests().remove(0);
    assert!(request.prompt_text().contains("Hindi"));
    assert!(request.system_instruction.unwrap().contains("Hindi"));
}

#[tokio::test]
async fn test_duplicate_title_moves_to_front() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    h.provider
        .queue_story(sample_story("The Falling Fruit", "Physics"))
        .queue_story(sample_story("Eureka", "Buoyancy"))
        .queue_story(sample_story("The Falling Fruit", "Physics"));

    for topic in ["Gravity", "Archimedes", "Newton"] {
        h.app.submit(topic).await.unwrap();
    }

    let titles: Vec<_> = h.app.history().iter().map(|a| a.title.as_str()).collect();
    assert_eq!(titles, ["The Falling Fruit", "Eureka"]);
}

// =============================================================================
// Rejected and failed submissions
// =============================================================================

#[tokio::test]
async fn test_empty_topic_makes_no_request() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();

    let err = h.app.submit("   ").await.unwrap_err();

    assert!(matches!(
        err,
        ControllerError::Validation(ValidationError::EmptyTopic)
    ));
    assert_eq!(err.to_string(), "Please enter a topic");
    assert_eq!(h.provider.text_request_count(), 0);
    assert_eq!(h.app.status(), &GenerationStatus::Idle);
    assert_eq!(h.analytics.count("generate_story_start"), 0);
}

#[tokio::test]
async fn test_text_failure_sets_error_and_keeps_history() {
    let mut h = TestHarness::new();
    h.app.login("Asha").unwrap();
    h.provider
        .queue_story(sample_story("The Falling Fruit", "Physics"))
        .queue_text_error("503 Service Unavailable");

    h.app.submit("Gravity").await.unwrap();
    let err = h.app.submit("Optics").await.unwrap_err();

    assert!(matches!(err, ControllerError::Generation(_)));
    assert_eq!(
        h.app.status(),
        &GenerationStatus::Failed(GENERATION_FAILED_MESSAGE.to_string())
    );
    assert!(!h.app.status().is_loading());
    assert!(h.app.current_anecdote().is_none());
    assert_eq!(h.app.history().len(), 1);
    assert_eq!(stored_history(&h, "history:asha").len(), 1);

    let error = h.analytics.last("generate_story_error").unwrap();
    assert_eq!(error.params["topic"], "Optics");
    assert_eq!(error.params["error_message"], GENERATION_FAILED_MESSAGE);
}

#[tokio::test]
async fn test_contract_violation_is_a_failure() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    let mut story = sample_story("Eureka", "Buoyancy");
    story["relatedTopics"] = serde_json::json!(["Only one"]);
    h.provider.queue_story(story);

    assert!(h.app.submit("Archimedes").await.is_err());
    assert!(h.app.history().is_empty());
    assert_eq!(h.store.get("history:guest").unwrap(), None);
}

#[tokio::test]
async fn test_retry_after_failure_clears_error() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    h.provider
        .queue_text_error("timeout")
        .queue_story(sample_story("Eureka", "Buoyancy"));

    assert!(h.app.submit("Archimedes").await.is_err());
    h.app.submit_current().await.unwrap();

    assert_eq!(h.app.status().error(), None);
    assert_eq!(h.app.current_anecdote().unwrap().title, "Eureka");
}

// =============================================================================
// Story presentation
// =============================================================================

#[tokio::test]
async fn test_meanings_highlight_tough_words() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    h.provider.queue_story(sample_story("The Falling Fruit", "Physics"));
    h.app.submit("Gravity").await.unwrap();

    assert_eq!(h.app.story_segments().len(), 1);
    h.app.toggle_meanings();

    let terms: Vec<_> = h
        .app
        .story_segments()
        .into_iter()
        .filter_map(|s| match s {
            StorySegment::Term { word, .. } => Some(word),
            StorySegment::Plain(_) => None,
        })
        .collect();
    assert_eq!(terms, ["scholar", "legend"]);

    let toggle = h.analytics.last("toggle_meanings").unwrap();
    assert_eq!(toggle.params["state"], "on");
}

#[tokio::test]
async fn test_share_link_and_explore() {
    let mut h = TestHarness::new();
    h.app.login_as_guest();
    assert_eq!(h.app.share_link(), None);

    h.provider.queue_story(sample_story("The Falling Fruit", "Classical Mechanics"));
    h.app.submit("Gravity").await.unwrap();

    assert_eq!(
        h.app.share_link().as_deref(),
        Some("https://anecdote.app/?shared_topic=Classical%20Mechanics")
    );
    assert_eq!(h.analytics.count("share_story_click"), 1);

    h.app.explore_new_topic();
    assert!(h.app.current_anecdote().is_none());
    assert_eq!(h.app.topic(), "");
    assert_eq!(h.app.history().len(), 1);
}
