use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use genai::{
    AnimationStyle, AspectRatio, BackendFactory, BackendType, GenerationBackend, GenerationClient, OutputType,
    VideoDuration,
};
use std::path::{Path, PathBuf};
use studio::{
    Download, Operation, Studio, StudioConfig, StudioError, UploadSource, WorkflowStep, REFINEMENT_SUGGESTIONS,
};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "genstudio")]
#[command(about = "Generation studio CLI - turn reference images into designs and short videos")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the upload, ideate, generate and refine workflow once
    Run(RunArgs),

    /// List the available options and refinement suggestions
    Options,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Reference images
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,

    /// Topic used when generating a concept
    #[arg(long)]
    topic: Option<String>,

    /// Creative concept used as the generation prompt
    #[arg(long)]
    concept: Option<String>,

    /// Ask the service for a concept before generating
    #[arg(long)]
    ideate: bool,

    /// Remove the background from every reference image first
    #[arg(long)]
    remove_bg: bool,

    /// Aspect ratio (1:1, 16:9, 9:16, 4:3, 3:4)
    #[arg(long)]
    aspect_ratio: Option<AspectRatio>,

    /// Output type, e.g. cinematic-poster or banner
    #[arg(long)]
    output_type: Option<OutputType>,

    /// Extra variations of the first image
    #[arg(long, default_value = "0")]
    variations: u32,

    /// Refinement instructions, applied in order
    #[arg(long)]
    refine: Vec<String>,

    /// Apply a canned refinement suggestion by index (see `options`)
    #[arg(long)]
    suggestion: Option<usize>,

    /// Animate the final image into a short video
    #[arg(long)]
    animate: bool,

    /// Video length in seconds (2-10)
    #[arg(long)]
    duration: Option<u32>,

    /// Animation style, e.g. "pan up" or dolly-left
    #[arg(long)]
    style: Option<AnimationStyle>,

    /// Save the final image to the gallery
    #[arg(long)]
    save: bool,

    /// Output directory (overrides the configured one)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Backend to use (gemini, mock)
    #[arg(long)]
    backend: Option<BackendType>,

    /// Print the final session state as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("genstudio={level},studio={level},genai={level},warn").into()),
        )
        .with_target(false)
        .init();

    let config_path = cli.config.clone().or_else(StudioConfig::default_path);

    match cli.command {
        Commands::Run(args) => run_command(load_config(config_path.as_deref())?, args).await,
        Commands::Options => options_command(),
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => config_init_command(config_path, force),
            ConfigAction::Show => config_show_command(load_config(config_path.as_deref())?),
        },
    }
}

/// Load the configuration file when it exists, otherwise start from defaults.
fn load_config(path: Option<&Path>) -> Result<StudioConfig> {
    match path {
        Some(path) if path.exists() => {
            info!("Loading configuration from {:?}", path);
            StudioConfig::load(path).with_context(|| format!("failed to read config {}", path.display()))
        }
        _ => Ok(StudioConfig::default()),
    }
}

async fn run_command(mut config: StudioConfig, args: RunArgs) -> Result<()> {
    if let Some(backend) = args.backend {
        config.backend.backend_type = backend;
    }
    if let Some(ratio) = args.aspect_ratio {
        config.defaults.aspect_ratio = ratio;
    }
    if let Some(output_type) = args.output_type {
        config.defaults.output_type = output_type;
    }
    if let Some(secs) = args.duration {
        config.defaults.video_duration = VideoDuration::new(secs).map_err(|e| anyhow!(e))?;
    }
    if let Some(style) = args.style {
        config.defaults.animation_style = style;
    }
    let out_dir = args.out.clone().unwrap_or_else(|| {
        config
            .output_dir
            .join(chrono::Local::now().format("session-%Y%m%d-%H%M%S").to_string())
    });

    let backend = BackendFactory::create(config.backend.clone().with_env_api_key())
        .context("failed to set up the generation backend")?;
    info!("Using {} backend", backend.name());
    let studio = Studio::with_config(GenerationClient::new(backend), &config);

    // Upload
    let mut sources = Vec::new();
    for path in &args.images {
        match UploadSource::from_path(path) {
            Ok(source) => sources.push(source),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    let accepted = studio.add_uploads(sources);
    info!("Accepted {} of {} images", accepted, args.images.len());

    if args.remove_bg {
        for id in studio.processed_ids() {
            studio
                .request_background_removal(&id)
                .await
                .map_err(report(Operation::RemoveBackground))?;
        }
    }

    // Configure & ideate
    if let Some(topic) = &args.topic {
        studio.set_topic(topic.as_str());
    }
    if let Some(concept) = &args.concept {
        studio.set_concept(concept.as_str());
    }
    if args.ideate {
        let concept = studio.request_concept().await.map_err(report(Operation::Concept))?;
        println!("Concept: {concept}");
    }

    // Generate & refine
    studio.request_generation().await.map_err(report(Operation::Generation))?;
    for _ in 0..args.variations {
        studio.request_variation().await.map_err(report(Operation::Variation))?;
    }
    if let Some(index) = args.suggestion {
        let suggestion = studio.apply_suggestion(index).map_err(|e| anyhow!(e))?;
        info!("Applying suggestion: {}", suggestion);
        studio.request_refinement().await.map_err(report(Operation::Refinement))?;
    }
    for instruction in &args.refine {
        studio.set_refinement(instruction.as_str());
        studio.request_refinement().await.map_err(report(Operation::Refinement))?;
    }

    if args.animate {
        info!("{}", Operation::Video.busy_message());
        studio.request_video().await.map_err(report(Operation::Video))?;
    }

    let selected = studio.selected().ok_or_else(|| anyhow!("no image was generated"))?;
    if args.save {
        studio.promote_to_gallery(&selected.id).map_err(|e| anyhow!(e))?;
        info!("Image saved to gallery!");
    }

    // Downloads
    let mut downloads: Vec<Download> = Vec::new();
    for artifact in studio.history() {
        downloads.push(studio.download_artifact(&artifact.id)?);
    }
    if args.remove_bg {
        for id in studio.processed_ids() {
            downloads.push(studio.download_processed(&id)?);
        }
    }
    if studio.video().is_some() {
        downloads.push(studio.download_video()?);
    }
    for download in &downloads {
        let path = download
            .write_to(&out_dir)
            .with_context(|| format!("failed to write {}", download.filename))?;
        println!("{}", path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&studio.state())?);
    }

    info!(
        "Done: {} images, {} files written to {:?}",
        studio.history().len(),
        downloads.len(),
        out_dir
    );
    Ok(())
}

/// Turn a failed studio operation into the message the user sees.
fn report(op: Operation) -> impl Fn(StudioError) -> anyhow::Error {
    move |err| anyhow!(err.user_message(op.action()))
}

fn options_command() -> Result<()> {
    println!("Workflow:");
    for step in WorkflowStep::ALL {
        println!("  {}. {} - {}", step.number(), step.title(), step.description());
    }

    println!("\nAspect ratios:");
    for ratio in AspectRatio::ALL {
        println!("  {:<6} {}", ratio.value(), ratio.label());
    }

    println!("\nOutput types:");
    for kind in OutputType::ALL {
        println!("  {:<18} {}", kind.key(), kind.label());
    }

    println!("\nAnimation styles:");
    for style in AnimationStyle::ALL {
        println!("  {}", style.phrase());
    }

    println!(
        "\nVideo duration: {}-{} seconds (default {})",
        VideoDuration::MIN_SECS,
        VideoDuration::MAX_SECS,
        VideoDuration::default().secs()
    );

    println!("\nRefinement suggestions:");
    for (index, suggestion) in REFINEMENT_SUGGESTIONS.iter().enumerate() {
        println!("  [{index}] {suggestion}");
    }
    Ok(())
}

fn config_init_command(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = path.ok_or_else(|| anyhow!("no config directory available; pass --config"))?;
    if path.exists() && !force {
        return Err(anyhow!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    StudioConfig::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("Wrote default configuration to {:?}", path);
    println!("{}", path.display());
    Ok(())
}

fn config_show_command(config: StudioConfig) -> Result<()> {
    let mut shown = config;
    if shown.backend.api_key.is_some() {
        shown.backend.api_key = Some("<redacted>".to_string());
    }
    println!("{}", serde_json::to_string_pretty(&shown)?);
    Ok(())
}
