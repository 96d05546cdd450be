//! Prompt text for both generation phases.

const STORY_PROMPT: &str = include_str!("prompts/story.txt");
const SYSTEM_PROMPT: &str = include_str!("prompts/system.txt");
const ILLUSTRATION_PROMPT: &str = include_str!("prompts/illustration.txt");

/// User prompt for the story phase.
pub fn story_prompt(topic: &str, language: &str) -> String {
    fill(STORY_PROMPT, &[("topic", topic), ("language", language)])
}

/// System instruction for the story phase.
pub fn system_instruction(language: &str) -> String {
    fill(SYSTEM_PROMPT, &[("language", language)])
}

/// Prompt for the illustration phase.
pub fn illustration_prompt(title: &str, topic: &str) -> String {
    fill(ILLUSTRATION_PROMPT.trim_end(), &[("title", title), ("topic", topic)])
}

/// Replace each `{name}` in `template` with its value in a single pass.
///
/// Substituted text is never rescanned, and unknown placeholders are kept.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
