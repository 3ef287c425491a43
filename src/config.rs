use crate::error::{ClipperError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_EXTENSIONS: &[&str] = &[
    ".mkv", ".mp4", ".avi", ".mov", ".wmv", ".flv", ".webm", ".m2ts",
];

/// Where movies are read from and clips are written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Directories {
    pub movies_dir: PathBuf,
    pub clips_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub default_audio_codec: String,
    pub default_sample_rate: u32,
    pub default_audio_channels: u32,
    pub default_audio_language: String,
    pub preserve_all_audio: bool,
    pub preview_by_default: bool,
    pub follow_symlinks: bool,
    pub video_extensions: Vec<String>,
    pub cache_enabled: bool,
    pub cache_ttl_hours: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_location: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_audio_codec: "pcm_s16le".to_string(),
            default_sample_rate: 48_000,
            default_audio_channels: 2,
            default_audio_language: "eng".to_string(),
            preserve_all_audio: false,
            preview_by_default: false,
            follow_symlinks: true,
            video_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            cache_enabled: true,
            cache_ttl_hours: 24,
            cache_location: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub directories: Directories,
    #[serde(default)]
    pub settings: Settings,
}

impl Config {
    pub fn new(movies_dir: PathBuf, clips_dir: PathBuf) -> Self {
        Self {
            directories: Directories {
                movies_dir,
                clips_dir,
            },
            settings: Settings::default(),
        }
    }

    /// Load and validate the config file from its standard location.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ClipperError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.directories.movies_dir = expand_tilde(&config.directories.movies_dir);
        config.directories.clips_dir = expand_tilde(&config.directories.clips_dir);
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let toml_content = toml::to_string_pretty(self)?;
        fs::write(path, toml_content)?;
        Ok(())
    }

    /// Check the directories and settings. Creates the clips directory when
    /// it does not exist yet.
    pub fn validate(&self) -> Result<()> {
        let movies_dir = &self.directories.movies_dir;
        if !movies_dir.exists() {
            return Err(ClipperError::Config(format!(
                "Directory does not exist: {}",
                movies_dir.display()
            )));
        }
        if !movies_dir.is_dir() {
            return Err(ClipperError::Config(format!(
                "Path is not a directory: {}",
                movies_dir.display()
            )));
        }
        if let Err(e) = fs::read_dir(movies_dir) {
            return Err(ClipperError::Config(format!(
                "Movies directory is not readable: {} ({e})",
                movies_dir.display()
            )));
        }

        let clips_dir = &self.directories.clips_dir;
        if clips_dir.exists() && !clips_dir.is_dir() {
            return Err(ClipperError::Config(format!(
                "Path is not a directory: {}",
                clips_dir.display()
            )));
        }
        if !clips_dir.exists() {
            fs::create_dir_all(clips_dir).map_err(|e| {
                ClipperError::Config(format!("Cannot create clips directory: {e}"))
            })?;
        }

        if self.settings.default_sample_rate == 0 {
            return Err(ClipperError::Config(
                "default_sample_rate must be greater than 0".to_string(),
            ));
        }
        if self.settings.default_audio_channels == 0 {
            return Err(ClipperError::Config(
                "default_audio_channels must be greater than 0".to_string(),
            ));
        }
        if self.settings.video_extensions.is_empty() {
            return Err(ClipperError::Config(
                "video_extensions must list at least one extension".to_string(),
            ));
        }

        Ok(())
    }

    pub fn config_file_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join("movieclipper").join("movieclipper.toml"))
            .ok_or_else(|| {
                ClipperError::Config("Cannot determine the user config directory".to_string())
            })
    }

    /// Directory that receives clips made with test-output routing.
    pub fn testing_dir(&self) -> PathBuf {
        let clips_dir = &self.directories.clips_dir;
        clips_dir
            .parent()
            .unwrap_or(clips_dir.as_path())
            .join("clips_testing")
    }
}

/// Suggested movies and clips directories for first-time setup: the first
/// existing of `~/Videos` and `~/Movies`, otherwise the working directory.
pub fn default_directories(home: &Path, cwd: &Path) -> (PathBuf, PathBuf) {
    let movies_root = [home.join("Videos"), home.join("Movies")]
        .into_iter()
        .find(|p| p.exists())
        .unwrap_or_else(|| cwd.to_path_buf());
    let clips_root = movies_root.join("clips");
    (movies_root, clips_root)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
