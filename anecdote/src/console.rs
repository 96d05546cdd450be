//! Line-oriented interactive mode.
//!
//! Every input line is either a `#` command or a topic to generate a story
//! about. Output is plain text with `[TAG]` prefixes so it can be scripted.

use anecdote_core::{Anecdote, AnecdoteApp, ControllerError, StorySegment, View};
use std::io::{self, BufRead, Lines, StdinLock, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Front-end options not owned by the controller.
pub struct ConsoleOptions {
    pub name: Option<String>,
    pub guest: bool,
    pub image_dir: Option<PathBuf>,
}

const HELP: &str = "\
  <topic>          - Tell me a story about <topic>
  #history         - List your past stories
  #open <n>        - Retell history entry <n>
  #related <n>     - Explore related topic <n> of the current story
  #suggestions     - List suggested topics
  #suggest <n>     - Explore suggestion <n>
  #language <name> - Switch story language
  #meanings        - Toggle tough word meanings
  #share           - Print a share link for the current story
  #new             - Clear the current story
  #logout          - Log out and log in again
  #quit            - Exit
  #help            - Show this help";

/// Run the interactive loop until `#quit` or end of input.
pub async fn run(mut app: AnecdoteApp, options: ConsoleOptions) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let image_dir = options.image_dir.as_deref();

    if let Some(name) = &options.name {
        app.login(name)?;
    } else if options.guest {
        app.login_as_guest();
    }

    // Restores the stored session and opens any shared topic.
    begin_progress();
    let started = app.start().await;
    clear_indicator();
    started?;

    if app.user().is_none() && !prompt_login(&mut app, &mut lines)? {
        return Ok(());
    }

    println!("=== Anecdote ===");
    greet(&app);
    println!("Commands:");
    println!("{HELP}");
    println!();

    if let Some(error) = app.status().error() {
        println!("[ERROR] {error}");
    } else if let Some(anecdote) = app.current_anecdote() {
        print_anecdote(&app, anecdote, image_dir);
    }

    println!("Enter a topic (one per line):");
    println!();

    while let Some(line) = lines.next() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            begin_progress();
            let result = app.submit(line).await;
            report(&app, result, image_dir);
            continue;
        };

        let (name, arg) = command
            .split_once(char::is_whitespace)
            .map(|(n, a)| (n, a.trim()))
            .unwrap_or((command, ""));

        match name {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "help" => {
                println!("[HELP]");
                println!("{HELP}");
            }
            "history" => print_history(&mut app),
            "open" => match parse_index(arg) {
                Some(i) => {
                    begin_progress();
                    let result = app.select_history(i).await;
                    report(&app, result, image_dir);
                }
                None => println!("[ERROR] Usage: #open <n>"),
            },
            "related" => match parse_index(arg) {
                Some(i) => {
                    begin_progress();
                    let result = app.select_related_topic(i).await;
                    report(&app, result, image_dir);
                }
                None => println!("[ERROR] Usage: #related <n>"),
            },
            "suggestions" => print_suggestions(&app),
            "suggest" => {
                let label = parse_index(arg)
                    .and_then(|i| app.suggestions().into_iter().nth(i))
                    .map(|s| s.label);
                match label {
                    Some(label) => {
                        begin_progress();
                        let result = app.select_suggestion(&label).await;
                        report(&app, result, image_dir);
                    }
                    None => println!("[ERROR] Usage: #suggest <n> (see #suggestions)"),
                }
            }
            "language" => {
                if arg.is_empty() {
                    println!("[LANGUAGE] {}", app.language());
                    println!(
                        "  Available: {}",
                        anecdote_core::SUPPORTED_LANGUAGES.join(", ")
                    );
                } else {
                    match app.set_language(arg) {
                        Ok(()) => println!("[LANGUAGE] Stories will be told in {}", app.language()),
                        Err(e) => println!("[ERROR] {e}"),
                    }
                }
            }
            "meanings" => {
                let on = app.toggle_meanings();
                println!("[MEANINGS] {}", if on { "on" } else { "off" });
                if app.current_anecdote().is_some() {
                    print_story(&app);
                }
            }
            "share" => match app.share_link() {
                Some(link) => println!("[SHARE] {link}"),
                None => println!("[ERROR] Nothing to share yet"),
            },
            "new" => {
                app.explore_new_topic();
                println!("[NEW] What would you like to learn about?");
            }
            "logout" => {
                app.logout();
                println!("[LOGOUT] Goodbye!");
                if !prompt_login(&mut app, &mut lines)? {
                    break;
                }
                greet(&app);
            }
            _ => println!("[ERROR] Unknown command. Type #help for help."),
        }
        flush();
    }

    Ok(())
}

fn begin_progress() {
    print!("[PROCESSING]");
    flush();
}

/// Clear the progress indicator and print the outcome of a generation.
fn report(app: &AnecdoteApp, result: Result<(), ControllerError>, image_dir: Option<&Path>) {
    clear_indicator();

    match result {
        Ok(()) => {
            if let Some(anecdote) = app.current_anecdote() {
                print_anecdote(app, anecdote, image_dir);
            }
        }
        Err(e) => println!("[ERROR] {e}"),
    }
}

/// Ask for a name until the user logs in. A blank name logs in as guest.
///
/// Returns `false` if input ended first.
fn prompt_login(
    app: &mut AnecdoteApp,
    lines: &mut Lines<StdinLock<'static>>,
) -> anyhow::Result<bool> {
    loop {
        print!("Your name (blank for guest): ");
        flush();
        let Some(line) = lines.next() else {
            return Ok(false);
        };
        let name = line?;
        if name.trim().is_empty() {
            app.login_as_guest();
            return Ok(true);
        }
        match app.login(&name) {
            Ok(()) => return Ok(true),
            Err(e) => println!("[ERROR] {e}"),
        }
    }
}

fn greet(app: &AnecdoteApp) {
    if let Some(user) = app.user() {
        println!(
            "Welcome, {}! Stories are told in {}. {} saved {}.",
            user.display_name(),
            app.language(),
            app.history().len(),
            if app.history().len() == 1 { "story" } else { "stories" }
        );
    }
}

fn print_anecdote(app: &AnecdoteApp, anecdote: &Anecdote, image_dir: Option<&Path>) {
    println!();
    println!("[STORY] {} {}", anecdote.emoji, anecdote.title);
    println!("  Topic: {} ({})", anecdote.topic, anecdote.ncert_topic);
    println!();
    print_story(app);
    println!();
    println!("[TAKEAWAY] {}", anecdote.takeaway);
    println!("[FUN FACT] {}", anecdote.fun_fact);
    println!("[RELATED]");
    for (i, topic) in anecdote.related_topics.iter().enumerate() {
        println!("  {}. {topic}", i + 1);
    }

    match (anecdote.illustration(), image_dir) {
        (Some(image), Some(dir)) => match save_illustration(dir, &anecdote.title, &image) {
            Ok(path) => println!("[IMAGE] Saved to {}", path.display()),
            Err(e) => {
                warn!(error = %e, "failed to save illustration");
                println!("[ERROR] Could not save illustration: {e}");
            }
        },
        (Some(_), None) => println!("[IMAGE] Illustration available (use --image-dir to save)"),
        (None, _) => {}
    }
    println!();
}

fn print_story(app: &AnecdoteApp) {
    for segment in app.story_segments() {
        match segment {
            StorySegment::Plain(text) => print!("{text}"),
            StorySegment::Term { word, definition } => print!("*{word}* ({definition})"),
        }
    }
    println!();
}

fn print_history(app: &mut AnecdoteApp) {
    if app.view() == View::Home {
        app.toggle_view();
    }
    if app.history().is_empty() {
        println!("[HISTORY] No stories yet.");
        return;
    }
    println!("[HISTORY]");
    for (i, anecdote) in app.history().iter().enumerate() {
        println!("  {}. {} {} ({})", i + 1, anecdote.emoji, anecdote.title, anecdote.topic);
    }
}

fn print_suggestions(app: &AnecdoteApp) {
    println!("[SUGGESTIONS]");
    for (i, suggestion) in app.suggestions().iter().enumerate() {
        println!("  {}. {} [{}]", i + 1, suggestion.label, suggestion.category.name());
    }
}

fn save_illustration(
    dir: &Path,
    title: &str,
    image: &anecdote_core::Illustration,
) -> io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.{}", file_stem(title), image.extension()));
    std::fs::write(&path, &image.bytes)?;
    info!(path = %path.display(), bytes = image.bytes.len(), "illustration saved");
    Ok(path)
}

/// Lowercase, dash-separated file stem for `title`.
fn file_stem(title: &str) -> String {
    let stem = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-");
    if stem.is_empty() {
        "anecdote".to_string()
    } else {
        stem
    }
}

/// 1-based index from user input.
fn parse_index(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok()?.checked_sub(1)
}

fn flush() {
    io::stdout().flush().ok();
}

fn clear_indicator() {
    print!("\r            \r");
    flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_index() {
        assert_eq!(parse_index("1"), Some(0));
        assert_eq!(parse_index("3"), Some(2));
        assert_eq!(parse_index("0"), None);
        assert_eq!(parse_index("two"), None);
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("The Falling Fruit"), "the-falling-fruit");
        assert_eq!(file_stem("E = mc²: A Story!"), "e-mc-a-story");
        assert_eq!(file_stem("???"), "anecdote");
    }
}
