use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Remembers which permission problems were already reported so each
/// (error code, path) pair is warned about once per traversal.
#[derive(Debug, Default)]
pub struct WarningLog {
    seen: HashSet<(Option<i32>, Option<PathBuf>)>,
}

impl WarningLog {
    /// Returns true when this pair has not been reported before.
    pub fn note(&mut self, code: Option<i32>, path: Option<&Path>) -> bool {
        self.seen.insert((code, path.map(Path::to_path_buf)))
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.seen.len()
    }
}

/// Lowercase an extension and make sure it carries a leading dot.
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

fn has_wanted_extension(path: &Path, wanted: &HashSet<String>) -> bool {
    path.extension()
        .map(|ext| wanted.contains(&format!(".{}", ext.to_string_lossy().to_lowercase())))
        .unwrap_or(false)
}

/// Walk `root` and collect files whose extension is in `extensions`
/// (case-insensitive), sorted by full path.
///
/// With `follow_symlinks` unset, symlinked files are left out and symlinked
/// directories are not entered. With it set, both are followed; symlink
/// loops are detected by the walker and skipped.
pub fn scan_movie_files(root: &Path, extensions: &[String], follow_symlinks: bool) -> Vec<PathBuf> {
    let wanted: HashSet<String> = extensions.iter().map(|e| normalize_extension(e)).collect();
    let mut warnings = WarningLog::default();
    let mut files = Vec::new();

    debug!(
        "Scanning {} (follow_symlinks={}, extensions={:?})",
        root.display(),
        follow_symlinks,
        extensions
    );

    for entry in WalkDir::new(root).follow_links(follow_symlinks) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                handle_walk_error(&err, &mut warnings);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }
        if !follow_symlinks && entry.path_is_symlink() {
            continue;
        }
        if has_wanted_extension(entry.path(), &wanted) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    info!("Found {} movie files under {}", files.len(), root.display());
    files
}

fn handle_walk_error(err: &walkdir::Error, warnings: &mut WarningLog) {
    if let Some(ancestor) = err.loop_ancestor() {
        debug!("Skipping symlink loop back to {}", ancestor.display());
        return;
    }

    let Some(io_err) = err.io_error() else {
        debug!("Skipping unreadable entry: {err}");
        return;
    };

    if io_err.kind() != io::ErrorKind::PermissionDenied {
        debug!("Skipping unreadable entry: {err}");
        return;
    }

    if warnings.note(io_err.raw_os_error(), err.path()) {
        let location = err
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "unknown path".to_string());
        warn!("Permission denied while scanning {location}");
    }
}
