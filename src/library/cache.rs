use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::{expand_tilde, Settings};
use crate::error::{ClipperError, Result};

use super::scan::scan_movie_files;
use super::IndexEntry;

const CACHE_FILE_NAME: &str = "movie_index.json";
const CACHE_DIR_NAME: &str = "movieclipper";
const LEGACY_CACHE_DIR_NAME: &str = "movie_clipper";

/// Seconds since the Unix epoch.
pub fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Snapshot of one directory scan plus the parameters it was taken with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub timestamp: f64,
    pub movies_dir: String,
    pub follow_symlinks: bool,
    pub extensions: Vec<String>,
    pub movies: Vec<IndexEntry>,
}

impl CacheRecord {
    /// Scan `movies_dir` and stat every hit. Files that cannot be stat'ed
    /// are left out.
    pub fn build(movies_dir: &Path, extensions: &[String], follow_symlinks: bool) -> Self {
        info!("Building movie index cache...");

        let movies: Vec<IndexEntry> = scan_movie_files(movies_dir, extensions, follow_symlinks)
            .iter()
            .filter_map(|path| IndexEntry::stat(path))
            .collect();

        info!("Found {} movies in cache", movies.len());

        Self {
            timestamp: unix_now(),
            movies_dir: movies_dir.to_string_lossy().into_owned(),
            follow_symlinks,
            extensions: extensions.to_vec(),
            movies,
        }
    }

    pub fn is_valid(&self, movies_dir: &Path, settings: &Settings) -> bool {
        self.is_valid_at(movies_dir, settings, unix_now())
    }

    /// Valid only for the exact (directory, extension list, symlink policy)
    /// it was built with, and only within the configured time-to-live.
    pub fn is_valid_at(&self, movies_dir: &Path, settings: &Settings, now: f64) -> bool {
        if self.movies_dir != movies_dir.to_string_lossy() {
            debug!("Cache built for {}, not {}", self.movies_dir, movies_dir.display());
            return false;
        }
        if self.extensions != settings.video_extensions {
            debug!("Cache extension list differs from settings");
            return false;
        }
        if self.follow_symlinks != settings.follow_symlinks {
            debug!("Cache symlink policy differs from settings");
            return false;
        }

        let ttl_secs = settings.cache_ttl_hours as f64 * 3600.0;
        let age_secs = now - self.timestamp;
        if age_secs > ttl_secs {
            debug!("Cache expired ({:.0}s old, ttl {:.0}s)", age_secs, ttl_secs);
            return false;
        }

        true
    }

    pub fn age_hours(&self, now: f64) -> f64 {
        (now - self.timestamp) / 3600.0
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.movies.iter().map(|m| m.path()).collect()
    }
}

/// Summary of the cache file for `--cache-info`.
#[derive(Debug, Clone)]
pub struct CacheInfo {
    pub path: PathBuf,
    pub movies_count: usize,
    pub age_hours: f64,
    pub movies_dir: String,
    pub size_bytes: u64,
}

/// On-disk home of the [`CacheRecord`].
#[derive(Debug, Clone)]
pub struct IndexCache {
    path: PathBuf,
}

impl IndexCache {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache location from the settings: the explicit `cache_location`
    /// directory if set, else the user cache directory.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        if let Some(location) = &settings.cache_location {
            let dir = expand_tilde(Path::new(location));
            return Ok(Self::at(dir.join(CACHE_FILE_NAME)));
        }

        let base = dirs::cache_dir().ok_or_else(|| {
            ClipperError::Config("Cannot determine the user cache directory".to_string())
        })?;
        Ok(Self::at(default_cache_path(&base)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted record. Anything unreadable counts as no cache.
    pub fn load(&self) -> Option<CacheRecord> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No usable cache at {}: {e}", self.path.display());
                return None;
            }
        };

        match serde_json::from_str(&contents) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Ignoring malformed cache {}: {e}", self.path.display());
                None
            }
        }
    }

    /// Write the record to a temp file next to the cache and rename it into
    /// place, so a failed write leaves the previous record intact.
    pub fn save(&self, record: &CacheRecord) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut tmp, record)?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Saved movie index to {}", self.path.display());
        Ok(())
    }

    /// Delete the cache file. Returns whether there was one.
    pub fn invalidate(&self) -> Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub fn info(&self) -> Option<CacheInfo> {
        let record = self.load()?;
        let size_bytes = fs::metadata(&self.path).ok()?.len();
        Some(CacheInfo {
            path: self.path.clone(),
            movies_count: record.movies.len(),
            age_hours: record.age_hours(unix_now()),
            movies_dir: record.movies_dir,
            size_bytes,
        })
    }
}

fn default_cache_path(base: &Path) -> PathBuf {
    let current = base.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME);
    let legacy = base.join(LEGACY_CACHE_DIR_NAME).join(CACHE_FILE_NAME);
    if !current.exists() && legacy.exists() {
        legacy
    } else {
        current
    }
}
