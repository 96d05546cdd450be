//! Bite-sized educational stories with an AI storyteller.
//!
//! This crate provides:
//! - Two-phase story generation (structured text, then best-effort illustration)
//! - Named and guest sessions persisted across restarts
//! - Per-user story history with quota-aware persistence
//! - An application controller that front ends drive with discrete events
//!
//! # Quick Start
//!
//! ```ignore
//! use anecdote_core::{AnecdoteApp, FileStore, Generator};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileStore::open("./data")?);
//!     let mut app = AnecdoteApp::new(store, Generator::from_env()?);
//!
//!     app.start().await?;
//!     app.login("Asha")?;
//!     app.submit("Gravity").await?;
//!
//!     if let Some(story) = app.current_anecdote() {
//!         println!("{} {}\n\n{}", story.emoji, story.title, story.story);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod anecdote;
pub mod app;
pub mod error;
pub mod generator;
pub mod highlight;
pub mod history;
pub mod launch;
pub mod session;
pub mod storage;
pub mod suggestions;
pub mod testing;
pub mod view;

// Primary public API
pub use analytics::{AnalyticsSink, NoopSink, RecordingSink, TracingSink};
pub use anecdote::{Anecdote, HistoryEntry, Illustration, ToughWord};
pub use app::{AnecdoteApp, AppConfig, ControllerError, GenerationStatus, PendingGeneration};
pub use error::ValidationError;
pub use generator::{
    ContentProvider, GenerationError, GenerationFailure, Generator, GeneratorConfig,
    GENERATION_FAILED_MESSAGE,
};
pub use highlight::{segment_story, StorySegment};
pub use history::{HistoryStore, HistoryWriteError, PersistOutcome};
pub use launch::{share_link, LaunchParams, QueryParams, SHARED_TOPIC};
pub use session::{SessionStore, User};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use suggestions::{Suggestion, SubjectCategory, SUPPORTED_LANGUAGES};
pub use testing::{MockProvider, TestHarness};
pub use view::{View, ViewHooks};
