use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use movieclipper::config::{Config, Settings};
use movieclipper::error::ClipperError;
use movieclipper::interactive::{confirm, run_setup_wizard};
use movieclipper::library::IndexCache;
use movieclipper::media::{check_tools, ToolOverrides};
use movieclipper::pipeline::{run_clip, ClipOptions, ClipOutcome, Interrupt};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "movieclipper")]
#[command(version, about = "Movie clipping tool with fuzzy matching")]
#[command(long_about = "Find a movie in your library by fuzzy title match and cut a clip out of it with ffmpeg, copying the video stream and re-encoding audio for editors.")]
struct Cli {
    /// Movie title to search for, or a path to a movie file
    movie_input: Option<String>,

    /// Start time (HH:MM:SS, MM:SS, or seconds)
    #[arg(short, long)]
    start: Option<String>,

    /// Duration (HH:MM:SS, MM:SS, or seconds)
    #[arg(short, long)]
    duration: Option<String>,

    /// Use clips_testing directory for output
    #[arg(long)]
    test: bool,

    /// Run configuration setup
    #[arg(long)]
    setup: bool,

    /// Check ffmpeg and configuration
    #[arg(long)]
    check: bool,

    /// Path to ffmpeg binary
    #[arg(long)]
    ffmpeg_path: Option<PathBuf>,

    /// Path to ffprobe binary
    #[arg(long)]
    ffprobe_path: Option<PathBuf>,

    /// Keep all audio tracks (re-encodes to PCM for editor compatibility)
    #[arg(long)]
    preserve_audio: bool,

    /// Select specific audio language (e.g., eng, fre, spa)
    #[arg(long)]
    audio_lang: Option<String>,

    /// Force stereo mix (default)
    #[arg(long, overrides_with = "no_stereo")]
    stereo: bool,

    /// Keep the source channel count
    #[arg(long, overrides_with = "stereo")]
    no_stereo: bool,

    /// Clear movie index cache
    #[arg(long)]
    clear_cache: bool,

    /// Show cache information
    #[arg(long)]
    cache_info: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn force_stereo(&self) -> bool {
        self.stereo || !self.no_stereo
    }

    fn tool_overrides(&self) -> ToolOverrides {
        ToolOverrides {
            ffmpeg: self.ffmpeg_path.clone(),
            ffprobe: self.ffprobe_path.clone(),
        }
    }

    fn clip_options(&self, query: String, config: &Config) -> ClipOptions {
        ClipOptions {
            query,
            start: self.start.clone(),
            duration: self.duration.clone(),
            test_output: self.test,
            preserve_audio: self.preserve_audio || config.settings.preserve_all_audio,
            audio_language: self.audio_lang.clone(),
            force_stereo: self.force_stereo(),
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

/// Load the config, running the setup wizard when there is none and
/// offering it again when the existing one is broken.
fn load_or_setup() -> Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(ClipperError::ConfigNotFound(path)) => {
            println!(
                "{} {}",
                style("No configuration found at").yellow(),
                path.display()
            );
            run_setup_wizard().context("Setup failed")
        }
        Err(e) => {
            eprintln!("{} {e}", style("Configuration error:").red());
            if confirm("Run setup again?", true)? {
                run_setup_wizard().context("Setup failed")
            } else {
                Err(e).context("Failed to load configuration")
            }
        }
    }
}

/// Settings for cache maintenance. Falls back to the defaults so the cache
/// can be inspected without a working config.
fn cache_settings() -> Settings {
    match Config::load() {
        Ok(config) => config.settings,
        Err(e) => {
            debug!("Using default cache settings: {e}");
            Settings::default()
        }
    }
}

async fn check_environment(overrides: ToolOverrides) -> Result<()> {
    let tools = check_tools(overrides, false).await?;
    let config_path = Config::config_file_path()?;

    if !config_path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Run movieclipper --setup to create it.",
            config_path.display()
        );
    }
    Config::load_from(&config_path).context("Config file is invalid")?;

    println!("{} {}", style("ffmpeg:").green(), tools.ffmpeg.display());
    match &tools.ffprobe {
        Some(ffprobe) => println!("{} {}", style("ffprobe:").green(), ffprobe.display()),
        None => println!("{} not found", style("ffprobe:").yellow()),
    }
    println!("{} {}", style("Config file:").green(), config_path.display());
    Ok(())
}

fn clear_cache() -> Result<()> {
    let cache = IndexCache::from_settings(&cache_settings())?;
    if cache.invalidate()? {
        println!("{}", style("Movie index cache cleared").green());
    } else {
        println!("{}", style("No cache file found").yellow());
    }
    Ok(())
}

fn show_cache_info() -> Result<()> {
    let cache = IndexCache::from_settings(&cache_settings())?;
    match cache.info() {
        Some(info) => {
            println!("{}", style("Cache Information:").green());
            println!("  Path: {}", info.path.display());
            println!("  Movies: {}", info.movies_count);
            println!("  Age: {:.1} hours", info.age_hours);
            println!("  Size: {:.1} KB", info.size_bytes as f64 / 1024.0);
            println!("  Movies Directory: {}", info.movies_dir);
        }
        None => println!("{}", style("No cache found").yellow()),
    }
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if cli.check {
        return check_environment(cli.tool_overrides()).await;
    }

    if cli.setup {
        run_setup_wizard().context("Setup failed")?;
        return Ok(());
    }

    if cli.clear_cache {
        return clear_cache();
    }

    if cli.cache_info {
        return show_cache_info();
    }

    let Some(query) = cli.movie_input.clone() else {
        anyhow::bail!(
            "Movie input is required (unless using --setup)\nUsage: movieclipper MOVIE_INPUT [OPTIONS]"
        );
    };

    let tools = check_tools(cli.tool_overrides(), false).await?;
    let config = load_or_setup()?;

    let interrupt = Interrupt::new();
    interrupt.install()?;

    let options = cli.clip_options(query, &config);
    match run_clip(&config, &tools, &options, &interrupt).await {
        Ok(ClipOutcome::Created(output)) => {
            println!("{}", style("Clip created successfully.").green());
            println!("{} {}", style("Output:").green(), output.display());
            Ok(())
        }
        Ok(ClipOutcome::Cancelled) => {
            println!("{}", style("Cancelled.").yellow());
            Ok(())
        }
        Err(ClipperError::Interrupted) => {
            eprintln!("{}", style("Interrupted.").yellow());
            std::process::exit(130);
        }
        Err(e) => Err(e).context("Failed to create clip"),
    }
}
