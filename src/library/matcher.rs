//! Fuzzy title matching of a free-text query against movie file paths.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use crate::config::expand_tilde;
use crate::error::{ClipperError, Result};

/// Candidates must score strictly above this to be kept.
pub const MATCH_THRESHOLD: f64 = 60.0;
/// A top score strictly above this is picked without asking.
pub const AUTO_SELECT_SCORE: f64 = 90.0;
/// Most candidates offered for disambiguation, and most titles listed as a
/// hint when nothing matches.
pub const MAX_CHOICES: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub path: PathBuf,
    pub score: f64,
}

impl MatchCandidate {
    pub fn title(&self) -> String {
        file_title(&self.path)
    }
}

/// Outcome of matching a query against the library.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Selected(PathBuf),
    /// Ranked candidates, at most [`MAX_CHOICES`], for the user to choose from.
    Ambiguous(Vec<MatchCandidate>),
}

/// Indel similarity of two equal-footing strings, 0 to 100.
fn ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Best similarity between the shorter string and any same-length window of
/// the longer one (windows hanging off either end included), 0 to 100.
/// Strings of equal length are scored in both orders.
pub fn partial_ratio(s1: &str, s2: &str) -> f64 {
    let a: Vec<char> = s1.chars().collect();
    let b: Vec<char> = s2.chars().collect();

    if a.len() == b.len() {
        return best_window(&a, &b).max(best_window(&b, &a));
    }
    if a.len() < b.len() {
        best_window(&a, &b)
    } else {
        best_window(&b, &a)
    }
}

/// Slide `short` across `long`, which must be at least as long.
fn best_window(short: &[char], long: &[char]) -> f64 {
    if short.is_empty() {
        return 0.0;
    }

    let m = short.len();
    let n = long.len();
    let mut best: f64 = 0.0;

    for start in 0..=(n - m) {
        best = best.max(ratio(short, &long[start..start + m]));
        if best >= 100.0 {
            return 100.0;
        }
    }

    for len in 1..m {
        best = best.max(ratio(short, &long[..len]));
        best = best.max(ratio(short, &long[n - len..]));
    }

    best
}

fn file_title(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Score one path: the file title, and the parent directory name when the
/// file sits in its own uniquely named folder.
fn score_path(query: &str, path: &Path) -> f64 {
    let mut score = partial_ratio(query, &file_title(path).to_lowercase());

    let parent = path.parent();
    let parent_name = parent.and_then(Path::file_name);
    let grandparent_name = parent.and_then(Path::parent).and_then(Path::file_name);

    if let Some(name) = parent_name {
        if Some(name) != grandparent_name {
            score = score.max(partial_ratio(query, &name.to_string_lossy().to_lowercase()));
        }
    }

    score
}

/// Candidates scoring above [`MATCH_THRESHOLD`], best first. Equal scores
/// keep their input order.
pub fn fuzzy_match(query: &str, movie_files: &[PathBuf]) -> Vec<MatchCandidate> {
    let query = query.to_lowercase();
    let mut matches: Vec<MatchCandidate> = movie_files
        .iter()
        .filter_map(|path| {
            let score = score_path(&query, path);
            (score > MATCH_THRESHOLD).then(|| MatchCandidate {
                path: path.clone(),
                score,
            })
        })
        .collect();

    matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    matches
}

/// The query itself, when it names an existing file.
pub fn query_as_path(query: &str) -> Option<PathBuf> {
    let path = expand_tilde(Path::new(query));
    path.is_file().then_some(path)
}

/// Match `query` against `movie_files`. A single match or a clear winner is
/// selected outright; otherwise the top candidates are returned for the
/// caller to present.
pub fn resolve_query(query: &str, movie_files: &[PathBuf], movies_dir: &Path) -> Result<Resolution> {
    if movie_files.is_empty() {
        return Err(ClipperError::NoMovies(movies_dir.to_path_buf()));
    }

    let mut matches = fuzzy_match(query, movie_files);

    if matches.is_empty() {
        return Err(ClipperError::NoMatch {
            query: query.to_string(),
            available: movie_files.iter().take(MAX_CHOICES).map(|p| file_title(p)).collect(),
        });
    }

    if matches.len() == 1 || matches[0].score > AUTO_SELECT_SCORE {
        return Ok(Resolution::Selected(matches.swap_remove(0).path));
    }

    matches.truncate(MAX_CHOICES);
    Ok(Resolution::Ambiguous(matches))
}

/// Map a 1-based choice typed by the user onto `candidates`.
pub fn pick_candidate<'a>(candidates: &'a [MatchCandidate], input: &str) -> Result<&'a MatchCandidate> {
    let choice: usize = input
        .trim()
        .parse()
        .map_err(|_| ClipperError::InvalidSelection("Please enter a number.".to_string()))?;

    if choice == 0 || choice > candidates.len() {
        return Err(ClipperError::InvalidSelection(format!(
            "Choose a number between 1 and {}.",
            candidates.len()
        )));
    }

    Ok(&candidates[choice - 1])
}
