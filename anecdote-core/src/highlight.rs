//! Inline definitions for tough words.
//!
//! The story is split into typed segments rather than rewritten with
//! delimiter markers, so stories containing any character sequence render
//! intact.

use crate::anecdote::ToughWord;

/// A piece of a story as shown to the reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorySegment {
    /// Ordinary text.
    Plain(String),
    /// A tough word as it appears in the story, with its definition.
    Term { word: String, definition: String },
}

/// Split `story` so the first whole-word, case-insensitive occurrence of
/// each tough word becomes a [`StorySegment::Term`].
///
/// Words that do not occur, or whose only occurrences overlap an earlier
/// match, are left unmarked.
pub fn segment_story(story: &str, tough_words: &[ToughWord]) -> Vec<StorySegment> {
    let mut matches: Vec<(usize, usize, &str)> = Vec::new();

    for tough in tough_words {
        let word = tough.word.trim();
        if word.is_empty() {
            continue;
        }
        if let Some((start, end)) = find_word(story, word, &matches) {
            matches.push((start, end, tough.definition.as_str()));
        }
    }
    matches.sort_by_key(|&(start, _, _)| start);

    let mut segments = Vec::with_capacity(matches.len() * 2 + 1);
    let mut cursor = 0;
    for (start, end, definition) in matches {
        if start > cursor {
            segments.push(StorySegment::Plain(story[cursor..start].to_string()));
        }
        segments.push(StorySegment::Term {
            word: story[start..end].to_string(),
            definition: definition.to_string(),
        });
        cursor = end;
    }
    if cursor < story.len() {
        segments.push(StorySegment::Plain(story[cursor..].to_string()));
    }
    segments
}

fn find_word(story: &str, word: &str, taken: &[(usize, usize, &str)]) -> Option<(usize, usize)> {
    story.char_indices().find_map(|(start, _)| {
        let end = match_at(story, start, word)?;
        let free = taken.iter().all(|&(s, e, _)| end <= s || start >= e);
        (free && is_whole_word(story, start, end)).then_some((start, end))
    })
}

/// End offset if `word` matches case-insensitively at `start`.
fn match_at(story: &str, start: usize, word: &str) -> Option<usize> {
    let mut rest = story[start..].char_indices();
    for expected in word.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(rest.next().map(|(offset, _)| start + offset).unwrap_or(story.len()))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_whole_word(story: &str, start: usize, end: usize) -> bool {
    let before = story[..start].chars().next_back();
    let after = story[end..].chars().next();
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}
