use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use super::time::format_time_for_filename;

const CLIP_EXTENSION: &str = "mp4";

fn release_tag_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"\.(19|20)\d{2}\..*",
            r"(?i)\.(BluRay|WEB|HDTV|DVDRip)\..*",
            r"(?i)\.x26[45].*",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("Invalid regex"))
        .collect()
    })
}

/// Strip year markers, release/quality/codec tags and dot separators from a
/// release-style file stem.
pub fn clean_title(stem: &str) -> String {
    let mut title = stem.to_string();
    for pattern in release_tag_patterns() {
        title = pattern.replace(&title, "").into_owned();
    }

    let cleaned: String = title
        .chars()
        .filter(|c| *c != '.' && !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .collect();

    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "clip".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Build the clip file name, e.g. `IronMan_00h01m00s_to_00h02m00s.mp4`.
pub fn generate_output_filename(movie_file: &Path, start: Duration, end: Duration) -> String {
    let stem = movie_file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    format!(
        "{}_{}_to_{}.{}",
        clean_title(&stem),
        format_time_for_filename(start),
        format_time_for_filename(end),
        CLIP_EXTENSION
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_output_filename() {
        let name = generate_output_filename(
            Path::new("Iron.Man.2008.BluRay.x264.mkv"),
            Duration::from_secs(60),
            Duration::from_secs(120),
        );
        assert_eq!(name, "IronMan_00h01m00s_to_00h02m00s.mp4");
    }

    #[test]
    fn test_clean_title_release_tags() {
        assert_eq!(clean_title("Doctor.Strange.2016.1080p.BluRay.x264-SPARKS"), "DoctorStrange");
        assert_eq!(clean_title("Some.Show.WEB.h264"), "SomeShow");
        assert_eq!(clean_title("Movie.hdtv.x265"), "Movie");
        assert_eq!(clean_title("Heat.X264-GRP"), "Heat");
    }

    #[test]
    fn test_clean_title_keeps_spaced_names() {
        assert_eq!(
            clean_title("Captain America The First Avenger 2011 1080p"),
            "Captain America The First Avenger 2011 1080p"
        );
    }

    #[test]
    fn test_clean_title_strips_unsafe_characters() {
        assert_eq!(clean_title("Who: Are? You*"), "Who Are You");
    }

    #[test]
    fn test_clean_title_never_empty() {
        assert_eq!(clean_title("..."), "clip");
        assert_eq!(clean_title(""), "clip");
    }

    #[test]
    fn test_filename_with_fractional_times() {
        let name = generate_output_filename(
            Path::new("/movies/Heat/Heat.mkv"),
            Duration::from_millis(1500),
            Duration::from_secs(3),
        );
        assert_eq!(name, "Heat_00h00m01.5s_to_00h00m03s.mp4");
    }
}
