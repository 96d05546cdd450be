//! The anecdote data model.
//!
//! An [`Anecdote`] is what the provider produces and what the user reads.
//! A [`HistoryEntry`] is the same record without its illustration, which is
//! the only shape ever written to durable storage.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

/// A difficult word from the story with a short in-context definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToughWord {
    pub word: String,
    pub definition: String,
}

impl ToughWord {
    pub fn new(word: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            definition: definition.into(),
        }
    }
}

/// A generated story about an academic topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anecdote {
    /// Short catchy title.
    pub title: String,

    /// The narrative, written in the requested language.
    pub story: String,

    /// The educational lesson of the story.
    pub takeaway: String,

    /// One fact-checked sentence related to the topic.
    pub fun_fact: String,

    /// Normalized subject label chosen by the provider.
    pub topic: String,

    /// A single emoji representing the story.
    pub emoji: String,

    /// Exactly three follow-up topics.
    pub related_topics: Vec<String>,

    /// Three to five vocabulary items found in the story.
    pub tough_words: Vec<ToughWord>,

    /// Closest curriculum chapter.
    pub ncert_topic: String,

    /// `data:<mime>;base64,<data>` illustration, when one was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Anecdote {
    /// Whether an illustration is attached.
    pub fn has_illustration(&self) -> bool {
        self.image_url.is_some()
    }

    /// Decode the attached illustration, if it is a well-formed base64 data URI.
    pub fn illustration(&self) -> Option<Illustration> {
        let uri = self.image_url.as_deref()?;
        let (mime_type, data) = uri.strip_prefix("data:")?.split_once(";base64,")?;
        let bytes = BASE64.decode(data).ok()?;
        Some(Illustration {
            mime_type: mime_type.to_string(),
            bytes,
        })
    }
}

/// Build a data URI from a MIME type and an already base64-encoded payload.
pub fn data_uri(mime_type: &str, base64_data: &str) -> String {
    format!("data:{mime_type};base64,{base64_data}")
}

/// A decoded illustration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Illustration {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Illustration {
    /// File extension matching the MIME type.
    pub fn extension(&self) -> &'static str {
        match self.mime_type.as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// An anecdote as stored in durable history: identical fields, no image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub title: String,
    pub story: String,
    pub takeaway: String,
    pub fun_fact: String,
    pub topic: String,
    pub emoji: String,
    pub related_topics: Vec<String>,
    pub tough_words: Vec<ToughWord>,
    pub ncert_topic: String,
}

impl From<&Anecdote> for HistoryEntry {
    fn from(anecdote: &Anecdote) -> Self {
        Self {
            title: anecdote.title.clone(),
            story: anecdote.story.clone(),
            takeaway: anecdote.takeaway.clone(),
            fun_fact: anecdote.fun_fact.clone(),
            topic: anecdote.topic.clone(),
            emoji: anecdote.emoji.clone(),
            related_topics: anecdote.related_topics.clone(),
            tough_words: anecdote.tough_words.clone(),
            ncert_topic: anecdote.ncert_topic.clone(),
        }
    }
}

impl From<HistoryEntry> for Anecdote {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            title: entry.title,
            story: entry.story,
            takeaway: entry.takeaway,
            fun_fact: entry.fun_fact,
            topic: entry.topic,
            emoji: entry.emoji,
            related_topics: entry.related_topics,
            tough_words: entry.tough_words,
            ncert_topic: entry.ncert_topic,
            image_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_anecdote;

    #[test]
    fn test_serializes_camel_case() {
        let anecdote = sample_anecdote("The Falling Fruit", "Gravity");
        let value = serde_json::to_value(&anecdote).unwrap();

        assert_eq!(value["funFact"], anecdote.fun_fact.as_str());
        assert_eq!(value["ncertTopic"], anecdote.ncert_topic.as_str());
        assert_eq!(value["relatedTopics"].as_array().unwrap().len(), 3);
        assert!(value.get("imageUrl").is_none());
    }

    #[test]
    fn test_history_entry_drops_image() {
        let mut anecdote = sample_anecdote("The Falling Fruit", "Gravity");
        anecdote.image_url = Some(data_uri("image/png", "aGVsbG8="));

        let entry = HistoryEntry::from(&anecdote);
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("imageUrl"));

        let restored: Anecdote = entry.into();
        assert_eq!(restored.title, anecdote.title);
        assert!(restored.image_url.is_none());
    }

    #[test]
    fn test_history_entry_ignores_stray_image_field() {
        let mut value = serde_json::to_value(sample_anecdote("Eureka", "Buoyancy")).unwrap();
        value["imageUrl"] = "data:image/png;base64,AAAA".into();

        let entry: HistoryEntry = serde_json::from_value(value).unwrap();
        assert_eq!(entry.title, "Eureka");
    }

    #[test]
    fn test_illustration_decoding() {
        let mut anecdote = sample_anecdote("Eureka", "Buoyancy");
        assert!(anecdote.illustration().is_none());

        anecdote.image_url = Some(data_uri("image/png", "aGVsbG8="));
        let image = anecdote.illustration().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes, b"hello");
        assert_eq!(image.extension(), "png");

        anecdote.image_url = Some("https://example.com/a.png".to_string());
        assert!(anecdote.illustration().is_none());
    }
}
