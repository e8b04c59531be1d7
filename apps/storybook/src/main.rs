mod config;
mod errors;
mod generation;
mod layout;
mod llm_client;
mod prompt_store;
mod render;
mod state;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::errors::AppError;
use crate::generation::illustrations::RunWorkspace;
use crate::generation::{StoryOutput, StoryRequest};
use crate::render::render_story_pdf;
use crate::state::AppState;

/// File names written into each run directory.
const STORY_JSON: &str = "story.json";
const STORY_PDF: &str = "story.pdf";

/// Process exit codes.
const EXIT_FAILURE: i32 = 1;
const EXIT_MODERATION_REJECTED: i32 = 2;

#[derive(Parser)]
#[command(
    name = "storybook",
    version,
    about = "Personalized illustrated story generator"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full pipeline and write story.json + story.pdf into a new run directory
    Generate(GenerateArgs),
    /// Render a previously saved story.json to PDF
    Render(RenderArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Candidate themes, comma-separated
    #[arg(long)]
    themes: String,
    /// Name of the child who stars in the story
    #[arg(long, default_value = "Alex")]
    child_name: String,
    #[arg(long, default_value_t = 5)]
    age: u32,
    #[arg(long, default_value = "beginner")]
    reading_level: String,
    /// Number of story pages
    #[arg(long, default_value_t = 10)]
    length: u32,
    #[arg(long, default_value = "warm")]
    tone: String,
    /// Illustration art style
    #[arg(long, default_value = "modern")]
    style: String,
    /// Attach an audio narration placeholder
    #[arg(long)]
    tts: bool,
    #[arg(long, value_name = "TEXT")]
    culture: Option<String>,
    #[arg(long, value_name = "TEXT")]
    moral: Option<String>,
    /// Overrides OUTPUT_DIR
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Skip PDF rendering
    #[arg(long)]
    no_pdf: bool,
}

#[derive(Args)]
struct RenderArgs {
    /// Path to a saved story.json
    #[arg(long, value_name = "FILE")]
    story: PathBuf,
    /// Output PDF path
    #[arg(long, value_name = "FILE")]
    out: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        let (code, report) = failure_report(&err);
        eprintln!("{report}");
        std::process::exit(code);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting storybook v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Generate(args) => run_generate(&config, args).await,
        Command::Render(args) => run_render(args).await,
    }
}

async fn run_generate(config: &Config, args: GenerateArgs) -> Result<()> {
    let state = AppState::build(config)?;
    let output_root = args
        .output_dir
        .clone()
        .unwrap_or_else(|| state.config.output_dir.clone());
    let pipeline = state.pipeline.with_output_root(&output_root);

    let request = StoryRequest {
        themes: args.themes,
        child_name: args.child_name,
        age: args.age,
        reading_level: args.reading_level,
        length: args.length,
        tone: args.tone,
        style: args.style,
        generate_tts: args.tts,
        culture: args.culture,
        moral: args.moral,
    };

    let story = pipeline.generate_story(&request).await?;

    let run_id = story
        .metadata
        .run_id
        .clone()
        .context("story output is missing its run id")?;
    let run_dir = RunWorkspace::with_run_id(&output_root, run_id).dir().to_path_buf();
    tokio::fs::create_dir_all(&run_dir)
        .await
        .with_context(|| format!("Cannot create run directory {}", run_dir.display()))?;

    let json_path = run_dir.join(STORY_JSON);
    let json = serde_json::to_string_pretty(&story)?;
    tokio::fs::write(&json_path, json)
        .await
        .with_context(|| format!("Cannot write {}", json_path.display()))?;
    info!("Story saved to {}", json_path.display());

    let pdf_path = if args.no_pdf {
        None
    } else {
        Some(render_story_pdf(story.clone(), run_dir.join(STORY_PDF)).await?)
    };

    print_summary(&story, &json_path, pdf_path.as_deref());
    Ok(())
}

async fn run_render(args: RenderArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.story)
        .await
        .with_context(|| format!("Cannot read {}", args.story.display()))?;
    let story: StoryOutput = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid story file", args.story.display()))?;

    let written = render_story_pdf(story, args.out).await?;
    println!("PDF written to {}", written.display());
    Ok(())
}

/// Exit code and stderr text for a failed command. A moderation rejection is
/// an expected outcome and gets its own code; stage-attributed errors name the
/// stage, and schema errors carry the raw model output.
fn failure_report(err: &anyhow::Error) -> (i32, String) {
    let Some(app_err) = err.downcast_ref::<AppError>() else {
        return (EXIT_FAILURE, format!("Error: {err:#}"));
    };

    if app_err.is_moderation_rejection() {
        return (
            EXIT_MODERATION_REJECTED,
            format!("Rejected: {app_err}. No story was produced."),
        );
    }

    let mut report = match app_err.stage() {
        Some(stage) => format!("Error in stage '{stage}': {app_err}"),
        None => format!("Error: {app_err}"),
    };
    if let AppError::Schema { raw, .. } = app_err {
        report.push_str("\nRaw model output:\n");
        report.push_str(raw);
    }
    (EXIT_FAILURE, report)
}

fn print_summary(story: &StoryOutput, json_path: &Path, pdf_path: Option<&Path>) {
    println!("{}", "=".repeat(60));
    println!("STORY GENERATION RESULTS");
    println!("{}", "=".repeat(60));
    println!("Title: {}", story.title);
    println!("Pages: {}", story.outline.beats.len());
    println!("Draft length: {} characters", story.draft.chars().count());
    println!("Final length: {} characters", story.story_final.chars().count());
    println!(
        "Illustrations: {} of {} pages",
        story.illustrations.len(),
        story.outline.beats.len()
    );
    for skipped in &story.metadata.skipped_illustrations {
        println!("  page {} skipped: {}", skipped.page, skipped.reason);
    }
    if !story.outline.vocabulary_targets.is_empty() {
        let words: Vec<&str> = story
            .outline
            .vocabulary_targets
            .iter()
            .map(String::as_str)
            .collect();
        println!("Vocabulary: {}", words.join(", "));
    }
    if let Some(audio) = &story.audio {
        println!("Audio: {audio}");
    }
    println!("Story JSON: {}", json_path.display());
    if let Some(pdf) = pdf_path {
        println!("PDF: {}", pdf.display());
    }
    println!("{}", "-".repeat(60));
    println!("{}", story.story_final);
}
