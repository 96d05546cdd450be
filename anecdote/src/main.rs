//! Anecdote command-line storyteller.
//!
//! Type any academic topic and get a short, true story about it.
//!
//! ```bash
//! cargo run -p anecdote -- --name "Asha" --language Hindi
//! cargo run -p anecdote -- --guest --shared-topic "Pythagoras" --image-dir ./pictures
//! ```

mod console;

use anecdote_core::suggestions::supported_language;
use anecdote_core::{
    AnecdoteApp, AppConfig, FileStore, Generator, GeneratorConfig, QueryParams, TracingSink,
    SHARED_TOPIC,
};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use console::ConsoleOptions;

#[derive(Debug, Parser)]
#[command(name = "anecdote", version, about = "Bite-sized true stories about any academic topic")]
struct Args {
    /// Directory holding the session and history files
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Language stories are written in
    #[arg(long, default_value = "English")]
    language: String,

    /// Log in under this name
    #[arg(long, conflicts_with = "guest")]
    name: Option<String>,

    /// Log in as a guest
    #[arg(long)]
    guest: bool,

    /// Open a shared topic on startup
    #[arg(long, value_name = "TOPIC")]
    shared_topic: Option<String>,

    /// Skip illustrations
    #[arg(long)]
    no_images: bool,

    /// Save illustrations into this directory
    #[arg(long, value_name = "DIR")]
    image_dir: Option<PathBuf>,

    /// Model for the story text
    #[arg(long)]
    text_model: Option<String>,

    /// Model for illustrations
    #[arg(long)]
    image_model: Option<String>,

    /// Page that share links point at
    #[arg(long, default_value = "https://anecdote.app/")]
    share_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let language = supported_language(&args.language)
        .ok_or_else(|| anyhow!("unsupported language: {}", args.language))?;

    let data_dir = match args.data_dir {
        Some(dir) => dir,
        None => dirs::data_dir()
            .map(|d| d.join("anecdote"))
            .ok_or_else(|| anyhow!("no user data directory; pass --data-dir"))?,
    };
    let store = FileStore::open(&data_dir)
        .with_context(|| format!("failed to open data directory {}", data_dir.display()))?;

    let mut generator_config = GeneratorConfig::default().with_illustrations(!args.no_images);
    if let Some(model) = args.text_model {
        generator_config = generator_config.with_text_model(model);
    }
    if let Some(model) = args.image_model {
        generator_config = generator_config.with_image_model(model);
    }
    let generator = Generator::from_env()
        .context("GEMINI_API_KEY is not set; add it to .env or export it")?
        .with_config(generator_config);

    let mut launch = QueryParams::new();
    if let Some(topic) = &args.shared_topic {
        launch.set(SHARED_TOPIC, topic.as_str());
    }

    let config = AppConfig::default()
        .with_share_base_url(args.share_url)
        .with_language(language);
    let app = AnecdoteApp::new(Arc::new(store), generator)
        .with_config(config)
        .with_launch_params(Box::new(launch))
        .with_analytics(Arc::new(TracingSink));

    let options = ConsoleOptions {
        name: args.name,
        guest: args.guest,
        image_dir: args.image_dir,
    };
    console::run(app, options).await
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("ANECDOTE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
