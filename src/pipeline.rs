use crate::clip::{clip_end, format_time, generate_output_filename, parse_time, ClipRequest};
use crate::config::{Config, Settings};
use crate::error::{ClipperError, Result};
use crate::interactive::{choose_candidate, confirm, prompt_time};
use crate::library::{find_movie_files, query_as_path, resolve_query, IndexCache, Resolution};
use crate::media::{build_command, ClipCommand, Ffprobe, MediaTools, StreamProbe};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

const DEFAULT_START: &str = "0";
const DEFAULT_DURATION: &str = "20";

/// What the user asked for on the command line.
#[derive(Debug, Clone, Default)]
pub struct ClipOptions {
    /// Movie title to fuzzy match, or a path to a movie file.
    pub query: String,
    /// Start time; prompted for when absent.
    pub start: Option<String>,
    /// Clip length; prompted for when absent.
    pub duration: Option<String>,
    /// Write into the `clips_testing` directory instead of `clips_dir`.
    pub test_output: bool,
    /// Keep every audio track.
    pub preserve_audio: bool,
    /// Preferred audio language, overriding the configured default.
    pub audio_language: Option<String>,
    /// Downmix to the configured channel count.
    pub force_stereo: bool,
}

/// Stages of a single clip run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStage {
    Idle,
    Resolving,
    TimeParsing,
    CommandBuilding,
    Confirming,
    Executing,
    Succeeded,
    Failed,
}

impl fmt::Display for ClipStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ClipStage::Idle => "idle",
            ClipStage::Resolving => "resolving",
            ClipStage::TimeParsing => "time-parsing",
            ClipStage::CommandBuilding => "command-building",
            ClipStage::Confirming => "confirming",
            ClipStage::Executing => "executing",
            ClipStage::Succeeded => "succeeded",
            ClipStage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

impl ClipStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, ClipStage::Succeeded | ClipStage::Failed)
    }
}

struct StageTracker {
    stage: ClipStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            stage: ClipStage::Idle,
        }
    }

    fn advance(&mut self, next: ClipStage) {
        debug!("Clip stage: {} -> {}", self.stage, next);
        self.stage = next;
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipOutcome {
    Created(PathBuf),
    /// The user declined the confirmation prompt.
    Cancelled,
}

/// Ctrl-C state shared with the signal handler.
///
/// Outside of execution an interrupt exits the process with code 130.
/// While ffmpeg runs it only marks the run as cancelled so the partial
/// output can be cleaned up.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    cancelled: Arc<AtomicBool>,
    executing: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the process-wide Ctrl-C handler. Can only succeed once per
    /// process.
    pub fn install(&self) -> Result<()> {
        let state = self.clone();
        ctrlc::set_handler(move || state.on_signal()).map_err(|e| {
            ClipperError::Io(std::io::Error::other(format!(
                "Failed to install Ctrl-C handler: {e}"
            )))
        })
    }

    fn on_signal(&self) {
        if self.executing.load(Ordering::SeqCst) {
            self.cancelled.store(true, Ordering::SeqCst);
        } else {
            std::process::exit(130);
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn begin_execution(&self) -> ExecutionGuard<'_> {
        self.executing.store(true, Ordering::SeqCst);
        ExecutionGuard { interrupt: self }
    }
}

/// Clears the executing flag when the external tool is done, however the
/// run ends.
struct ExecutionGuard<'a> {
    interrupt: &'a Interrupt,
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.interrupt.executing.store(false, Ordering::SeqCst);
    }
}

/// Directory the clip is written to: `clips_testing` next to the clips
/// directory for test runs or when previews are the default, otherwise the
/// clips directory itself.
pub fn output_dir(config: &Config, test_output: bool) -> Result<PathBuf> {
    if test_output || config.settings.preview_by_default {
        let dir = config.testing_dir();
        fs::create_dir_all(&dir)?;
        Ok(dir)
    } else {
        Ok(config.directories.clips_dir.clone())
    }
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Cache handle for the movie index. `None` when caching is off or no cache
/// directory can be determined, in which case the library is scanned live.
fn index_cache(settings: &Settings) -> Option<IndexCache> {
    if !settings.cache_enabled {
        return None;
    }
    match IndexCache::from_settings(settings) {
        Ok(cache) => Some(cache),
        Err(e) => {
            warn!("Movie index cache unavailable, scanning directly: {e}");
            None
        }
    }
}

/// Turn the query into one movie file: a literal path wins, otherwise the
/// indexed movie library is fuzzy matched and ambiguous results are put to
/// the user.
pub fn select_movie_file(query: &str, config: &Config) -> Result<PathBuf> {
    if let Some(path) = query_as_path(query) {
        debug!("Using movie path directly: {}", path.display());
        return Ok(path);
    }

    let movies_dir = &config.directories.movies_dir;
    let cache = index_cache(&config.settings);

    let pb = spinner("Scanning movies...");
    let index = find_movie_files(movies_dir, &config.settings, cache.as_ref());
    pb.finish_and_clear();
    debug!("Found {} movie files ({:?})", index.files.len(), index.source);

    match resolve_query(query, &index.files, movies_dir)? {
        Resolution::Selected(path) => Ok(path),
        Resolution::Ambiguous(candidates) => choose_candidate(query, &candidates, movies_dir),
    }
}

fn resolve_time(given: Option<&str>, prompt: &str, default: &str) -> Result<Duration> {
    match given {
        Some(value) => parse_time(value),
        None => parse_time(&prompt_time(prompt, default)?),
    }
}

/// Run the external tool for `command`, writing `output_file`.
///
/// A non-zero exit surfaces ffmpeg's stderr. If the user interrupts while
/// the tool runs, the partial output is removed and the run fails with
/// [`ClipperError::Interrupted`].
pub async fn execute_clip(command: &ClipCommand, output_file: &Path, interrupt: &Interrupt) -> Result<()> {
    println!("{} {}", style("Executing:").green(), command);

    let pb = spinner("Processing video...");
    let result = {
        let _guard = interrupt.begin_execution();
        Command::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .output()
            .await
    };
    pb.finish_and_clear();

    let output = result.map_err(|e| ClipperError::Extraction(format!("Failed to run ffmpeg: {e}")))?;

    if interrupt.is_cancelled() {
        remove_partial_output(output_file);
        return Err(ClipperError::Interrupted);
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClipperError::Extraction(stderr.trim().to_string()));
    }

    Ok(())
}

fn remove_partial_output(output_file: &Path) {
    if output_file.exists() {
        match fs::remove_file(output_file) {
            Ok(()) => warn!("Interrupted, removed partial clip {}", output_file.display()),
            Err(e) => warn!("Could not remove partial clip {}: {e}", output_file.display()),
        }
    }
}

/// One full clip run: pick the movie, settle the times, build the command,
/// confirm with the user and execute.
pub async fn run_clip(
    config: &Config,
    tools: &MediaTools,
    options: &ClipOptions,
    interrupt: &Interrupt,
) -> Result<ClipOutcome> {
    let mut tracker = StageTracker::new();
    let result = run_stages(&mut tracker, config, tools, options, interrupt).await;

    match &result {
        Ok(ClipOutcome::Created(_)) => tracker.advance(ClipStage::Succeeded),
        Ok(ClipOutcome::Cancelled) => debug!("Clip run cancelled at {}", tracker.stage),
        Err(_) => tracker.advance(ClipStage::Failed),
    }
    result
}

async fn run_stages(
    tracker: &mut StageTracker,
    config: &Config,
    tools: &MediaTools,
    options: &ClipOptions,
    interrupt: &Interrupt,
) -> Result<ClipOutcome> {
    tracker.advance(ClipStage::Resolving);
    let movie_file = select_movie_file(&options.query, config)?;
    let movie_name = movie_file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("{} {}", style("Selected movie:").green(), movie_name);

    tracker.advance(ClipStage::TimeParsing);
    let start = resolve_time(options.start.as_deref(), "Start time", DEFAULT_START)?;
    let duration = resolve_time(options.duration.as_deref(), "Duration", DEFAULT_DURATION)?;
    let end = clip_end(start, duration)?;

    tracker.advance(ClipStage::CommandBuilding);
    let output_filename = generate_output_filename(&movie_file, start, end);
    let output_file = output_dir(config, options.test_output)?.join(&output_filename);

    let request = ClipRequest {
        source_file: movie_file,
        start,
        duration,
        output_file,
        preserve_all_audio: options.preserve_audio,
        audio_language: options.audio_language.clone(),
        force_stereo: options.force_stereo,
    };

    let ffprobe = tools.ffprobe.as_ref().map(Ffprobe::new);
    let probe = ffprobe.as_ref().map(|p| p as &dyn StreamProbe);
    let command = build_command(&request, &tools.ffmpeg, probe, &config.settings).await;

    tracker.advance(ClipStage::Confirming);
    println!("{} {}", style("Creating clip:").blue(), output_filename);
    println!(
        "{} {} to {}",
        style("From:").blue(),
        format_time(request.start),
        format_time(end)
    );
    println!("{} {}", style("Duration:").blue(), format_time(request.duration));

    if !confirm("Proceed with clipping?", true)? {
        return Ok(ClipOutcome::Cancelled);
    }

    tracker.advance(ClipStage::Executing);
    execute_clip(&command, &request.output_file, interrupt).await?;
    info!("Clip written to {}", request.output_file.display());

    Ok(ClipOutcome::Created(request.output_file))
}
