use std::path::{Path, PathBuf};

use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ClipperError, Result};

pub const FFMPEG_ENV: &str = "MOVIECLIPPER_FFMPEG";
pub const FFPROBE_ENV: &str = "MOVIECLIPPER_FFPROBE";

/// Resolved paths of the external media tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTools {
    pub ffmpeg: PathBuf,
    /// Missing probe means stream selection falls back to the first track.
    pub ffprobe: Option<PathBuf>,
}

/// Tool paths given explicitly on the command line or through the
/// environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOverrides {
    pub ffmpeg: Option<PathBuf>,
    pub ffprobe: Option<PathBuf>,
}

impl ToolOverrides {
    /// Fill any path not given explicitly from `MOVIECLIPPER_FFMPEG` /
    /// `MOVIECLIPPER_FFPROBE`.
    pub fn with_env(mut self) -> Self {
        if self.ffmpeg.is_none() {
            self.ffmpeg = env_path(FFMPEG_ENV);
        }
        if self.ffprobe.is_none() {
            self.ffprobe = env_path(FFPROBE_ENV);
        }
        self
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

fn check_explicit(path: &Path, label: &str) -> Result<PathBuf> {
    let path = crate::config::expand_tilde(path);
    if !path.is_file() {
        return Err(ClipperError::ToolResolution(format!(
            "{label} path does not exist: {}",
            path.display()
        )));
    }
    if !is_executable(&path) {
        return Err(ClipperError::ToolResolution(format!(
            "{label} path is not executable: {}",
            path.display()
        )));
    }
    Ok(path)
}

fn sibling_ffprobe(ffmpeg: &Path) -> Option<PathBuf> {
    let name = if cfg!(windows) { "ffprobe.exe" } else { "ffprobe" };
    let candidate = ffmpeg.with_file_name(name);
    (candidate.is_file() && is_executable(&candidate)).then_some(candidate)
}

/// Resolve the tools from explicit paths first, then `PATH`. The probe
/// falls back to an `ffprobe` next to the resolved ffmpeg.
pub fn resolve_tools(overrides: &ToolOverrides) -> Result<MediaTools> {
    resolve_with(overrides, |name| which::which(name).ok())
}

fn resolve_with<F>(overrides: &ToolOverrides, lookup: F) -> Result<MediaTools>
where
    F: Fn(&str) -> Option<PathBuf>,
{
    let ffmpeg = match &overrides.ffmpeg {
        Some(path) => check_explicit(path, "ffmpeg")?,
        None => lookup("ffmpeg").ok_or_else(|| ClipperError::ToolNotFound("ffmpeg".to_string()))?,
    };

    let ffprobe = match &overrides.ffprobe {
        Some(path) => Some(check_explicit(path, "ffprobe")?),
        None => lookup("ffprobe").or_else(|| sibling_ffprobe(&ffmpeg)),
    };

    debug!("Resolved ffmpeg={} ffprobe={:?}", ffmpeg.display(), ffprobe);
    Ok(MediaTools { ffmpeg, ffprobe })
}

/// Run `<tool> -version` to make sure the binary actually works.
pub async fn verify_tool(path: &Path, label: &str) -> Result<()> {
    let output = Command::new(path)
        .arg("-version")
        .output()
        .await
        .map_err(|e| ClipperError::ToolResolution(format!("{label} failed to run: {e}")))?;

    if !output.status.success() {
        return Err(ClipperError::ToolResolution(format!(
            "{label} failed to run: exited with {}",
            output.status
        )));
    }

    debug!("{label} is available at {}", path.display());
    Ok(())
}

/// Resolve and verify both tools. A missing probe is only an error when
/// `require_ffprobe` is set.
pub async fn check_tools(overrides: ToolOverrides, require_ffprobe: bool) -> Result<MediaTools> {
    let tools = resolve_tools(&overrides.with_env())?;

    verify_tool(&tools.ffmpeg, "ffmpeg").await?;

    match &tools.ffprobe {
        Some(ffprobe) => verify_tool(ffprobe, "ffprobe").await?,
        None if require_ffprobe => return Err(ClipperError::ToolNotFound("ffprobe".to_string())),
        None => warn!("ffprobe not found; audio stream detection limited"),
    }

    Ok(tools)
}
