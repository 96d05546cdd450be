//! Structured-output contract for the story request.
//!
//! [`anecdote_schema`] is sent to the provider; [`parse_story`] checks that
//! what comes back actually honors it before it becomes an [`Anecdote`].

use super::GenerationFailure;
use crate::anecdote::{Anecdote, ToughWord};
use serde::Deserialize;
use serde_json::{json, Value};

/// Number of follow-up topics a story must carry.
pub const RELATED_TOPIC_COUNT: usize = 3;

/// Allowed number of tough words.
pub const TOUGH_WORDS_RANGE: std::ops::RangeInclusive<usize> = 3..=5;

/// Response schema for the story request, in the provider's schema dialect.
pub fn anecdote_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "title": {
                "type": "STRING",
                "description": "A catchy, intriguing title for the anecdote."
            },
            "story": {
                "type": "STRING",
                "description": "A compelling narrative anecdote focused on a specific PERSON and a specific MOMENT in time. Do NOT write a general summary or encyclopedia entry. It must have a protagonist, action, and a conclusion. Example: Instead of describing the Cellular Jail generally, tell the specific story of how Veer Savarkar used thorns to write poetry on the walls while in solitary confinement."
            },
            "takeaway": {
                "type": "STRING",
                "description": "A brief academic lesson or moral derived from the story. What is the educational value?"
            },
            "funFact": {
                "type": "STRING",
                "description": "A quick, surprising, and strictly fact-checked one-sentence fact related to the topic. Do not include myths, rumors, or unverified internet trivia."
            },
            "emoji": {
                "type": "STRING",
                "description": "A single emoji that best represents the story."
            },
            "topic": {
                "type": "STRING",
                "description": "The standardized academic topic name (e.g., 'Physics', 'World History')."
            },
            "ncertTopic": {
                "type": "STRING",
                "description": "The specific Chapter/Topic from the Indian NCERT Syllabus closest to this story (e.g. 'Class 10 Science: Light - Reflection and Refraction')."
            },
            "relatedTopics": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List exactly 3 related academic topics, historical figures, or concepts that would be interesting to learn about next. They should be short strings suitable for button labels."
            },
            "toughWords": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "word": {
                            "type": "STRING",
                            "description": "The difficult word found in the story."
                        },
                        "definition": {
                            "type": "STRING",
                            "description": "A very short definition (3-5 words) of the word in context."
                        }
                    },
                    "required": ["word", "definition"]
                },
                "description": "Identify 3-5 difficult or academic words used in the story and provide their simplified meanings."
            }
        },
        "required": [
            "title", "story", "takeaway", "funFact", "emoji",
            "topic", "ncertTopic", "relatedTopics", "toughWords"
        ]
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryPayload {
    title: String,
    story: String,
    takeaway: String,
    fun_fact: String,
    emoji: String,
    topic: String,
    ncert_topic: String,
    related_topics: Vec<String>,
    tough_words: Vec<ToughWord>,
}

/// Parse the provider's JSON text into an [`Anecdote`] without illustration.
pub fn parse_story(text: &str) -> Result<Anecdote, GenerationFailure> {
    let payload: StoryPayload = serde_json::from_str(text)?;

    let fields = [
        ("title", &payload.title),
        ("story", &payload.story),
        ("takeaway", &payload.takeaway),
        ("funFact", &payload.fun_fact),
        ("emoji", &payload.emoji),
        ("topic", &payload.topic),
        ("ncertTopic", &payload.ncert_topic),
    ];
    if let Some((name, _)) = fields.iter().find(|(_, value)| value.trim().is_empty()) {
        return Err(GenerationFailure::Contract(format!("`{name}` is empty")));
    }

    let related_topics: Vec<String> = payload
        .related_topics
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if related_topics.len() != RELATED_TOPIC_COUNT {
        return Err(GenerationFailure::Contract(format!(
            "expected {RELATED_TOPIC_COUNT} related topics, got {}",
            related_topics.len()
        )));
    }

    let tough_words: Vec<ToughWord> = payload
        .tough_words
        .iter()
        .filter(|w| !w.word.trim().is_empty() && !w.definition.trim().is_empty())
        .map(|w| ToughWord::new(w.word.trim(), w.definition.trim()))
        .collect();
    if !TOUGH_WORDS_RANGE.contains(&tough_words.len()) {
        return Err(GenerationFailure::Contract(format!(
            "expected 3 to 5 tough words, got {}",
            tough_words.len()
        )));
    }

    Ok(Anecdote {
        title: payload.title.trim().to_string(),
        story: payload.story.trim().to_string(),
        takeaway: payload.takeaway.trim().to_string(),
        fun_fact: payload.fun_fact.trim().to_string(),
        topic: payload.topic.trim().to_string(),
        emoji: payload.emoji.trim().to_string(),
        related_topics,
        tough_words,
        ncert_topic: payload.ncert_topic.trim().to_string(),
        image_url: None,
    })
}
