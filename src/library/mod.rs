pub mod cache;
pub mod matcher;
pub mod scan;

pub use cache::{unix_now, CacheInfo, CacheRecord, IndexCache};
pub use matcher::{
    fuzzy_match, partial_ratio, pick_candidate, query_as_path, resolve_query, MatchCandidate,
    Resolution,
};
pub use scan::{normalize_extension, scan_movie_files};

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tracing::{info, warn};

use crate::config::Settings;

/// One discovered movie file as it looked at scan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub path: String,
    pub size: u64,
    pub mtime: f64,
}

impl IndexEntry {
    /// Stat `path`; `None` when the file is gone or unreadable.
    pub fn stat(path: &Path) -> Option<Self> {
        let metadata = fs::metadata(path).ok()?;
        let mtime = metadata
            .modified()
            .ok()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        Some(Self {
            path: path.to_string_lossy().into_owned(),
            size: metadata.len(),
            mtime,
        })
    }

    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.path)
    }
}

/// Where a movie listing came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource {
    /// Caching disabled, scanned directly.
    Live,
    /// Served from a valid cache record.
    Cached,
    /// Cache missing or stale, rescanned and saved.
    Rebuilt,
}

#[derive(Debug, Clone)]
pub struct MovieIndex {
    pub files: Vec<PathBuf>,
    pub source: IndexSource,
}

/// List the movie files under `movies_dir`, going through the index cache
/// when the settings enable it and a cache location is available.
///
/// Entries of a valid cache whose files have since disappeared are dropped
/// without forcing a rebuild.
pub fn find_movie_files(movies_dir: &Path, settings: &Settings, cache: Option<&IndexCache>) -> MovieIndex {
    let cache = match cache {
        Some(cache) if settings.cache_enabled => cache,
        _ => {
            return MovieIndex {
                files: scan_movie_files(movies_dir, &settings.video_extensions, settings.follow_symlinks),
                source: IndexSource::Live,
            };
        }
    };

    if let Some(record) = cache.load() {
        if record.is_valid(movies_dir, settings) {
            info!("Using cached movie index");
            let mut files: Vec<PathBuf> = record.paths().into_iter().filter(|p| p.exists()).collect();
            files.sort();
            return MovieIndex {
                files,
                source: IndexSource::Cached,
            };
        }
    }

    let record = CacheRecord::build(movies_dir, &settings.video_extensions, settings.follow_symlinks);
    if let Err(e) = cache.save(&record) {
        warn!("Could not save cache: {e}");
    }

    MovieIndex {
        files: record.paths(),
        source: IndexSource::Rebuilt,
    }
}
