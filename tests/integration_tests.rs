//! Integration tests for movieclipper
//!
//! These tests run the library against temporary movie trees and a fake
//! stream probe, so they need neither ffmpeg nor a terminal.

use movieclipper::clip::{generate_output_filename, parse_time, ClipRequest};
use movieclipper::config::{Config, Settings};
use movieclipper::library::{
    find_movie_files, resolve_query, scan_movie_files, CacheRecord, IndexCache, IndexSource,
    Resolution,
};
use movieclipper::media::{build_command, AudioStreamDescriptor, StreamProbe};
use movieclipper::{ClipperError, Result};

use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"movie").unwrap();
}

fn extensions() -> Vec<String> {
    Settings::default().video_extensions
}

// ============================================================================
// Directory Scanner Tests
// ============================================================================

mod scanner_tests {
    use super::*;

    #[test]
    fn test_nested_tree_is_found() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        touch(&root.join("Heat (1995)/Heat.1995.1080p.BluRay.x264.mkv"));
        touch(&root.join("Alien.mp4"));
        touch(&root.join("Alien.srt"));
        touch(&root.join("deep/a/b/c/Thief.M2TS"));

        let files = scan_movie_files(root, &extensions(), true);
        assert_eq!(
            files,
            vec![
                root.join("Alien.mp4"),
                root.join("Heat (1995)/Heat.1995.1080p.BluRay.x264.mkv"),
                root.join("deep/a/b/c/Thief.M2TS"),
            ]
        );
    }

    #[cfg(unix)]
    mod symlinks {
        use super::*;
        use std::os::unix::fs::symlink;

        fn linked_tree() -> (TempDir, PathBuf, PathBuf) {
            let tmp = TempDir::new().unwrap();
            let library = tmp.path().join("library");
            let external = tmp.path().join("external");
            touch(&library.join("Local.mkv"));
            touch(&external.join("Remote.mkv"));
            touch(&external.join("Single.mp4"));
            symlink(&external, library.join("linked_dir")).unwrap();
            symlink(external.join("Single.mp4"), library.join("Single.mp4")).unwrap();
            (tmp, library, external)
        }

        #[test]
        fn test_followed_directory_symlink_is_included() {
            let (_tmp, library, _) = linked_tree();
            let files = scan_movie_files(&library, &extensions(), true);
            assert!(files.contains(&library.join("linked_dir/Remote.mkv")));
            assert!(files.contains(&library.join("Single.mp4")));
            assert!(files.contains(&library.join("Local.mkv")));
        }

        #[test]
        fn test_unfollowed_symlinks_are_skipped() {
            let (_tmp, library, _) = linked_tree();
            let files = scan_movie_files(&library, &extensions(), false);
            assert_eq!(files, vec![library.join("Local.mkv")]);
        }

        #[test]
        fn test_broken_symlink_does_not_abort() {
            let tmp = TempDir::new().unwrap();
            touch(&tmp.path().join("Good.mkv"));
            symlink(tmp.path().join("gone.mkv"), tmp.path().join("Broken.mkv")).unwrap();

            for follow in [true, false] {
                let files = scan_movie_files(tmp.path(), &extensions(), follow);
                assert_eq!(files, vec![tmp.path().join("Good.mkv")]);
            }
        }

        #[test]
        fn test_self_referential_symlink_terminates() {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path().join("movies");
            touch(&root.join("Loop.mkv"));
            symlink(&root, root.join("again")).unwrap();

            let files = scan_movie_files(&root, &extensions(), true);
            assert!(files.contains(&root.join("Loop.mkv")));
            assert!(files.len() <= 2);
        }
    }

    #[cfg(unix)]
    mod unreadable {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        #[test]
        fn test_unreadable_directory_does_not_stop_scan() {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path().join("movies");
            touch(&root.join("Top.mkv"));
            touch(&root.join("a_locked/Hidden.mkv"));
            touch(&root.join("z_open/Visible.mkv"));

            let locked = root.join("a_locked");
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
            // Root ignores directory permissions, so only check exclusion
            // when the lock actually holds.
            let lock_holds = fs::read_dir(&locked).is_err();

            let files = scan_movie_files(&root, &extensions(), true);
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

            assert!(files.contains(&root.join("Top.mkv")));
            assert!(files.contains(&root.join("z_open/Visible.mkv")));
            if lock_holds {
                assert!(!files.contains(&root.join("a_locked/Hidden.mkv")));
            }
        }
    }
}

// ============================================================================
// Index Cache Tests
// ============================================================================

mod cache_tests {
    use super::*;

    fn setup() -> (TempDir, PathBuf, IndexCache, Settings) {
        let tmp = TempDir::new().unwrap();
        let movies = tmp.path().join("movies");
        touch(&movies.join("Heat.mkv"));
        touch(&movies.join("Alien.mp4"));
        let cache = IndexCache::at(tmp.path().join("cache/movie_index.json"));
        (tmp, movies, cache, Settings::default())
    }

    #[test]
    fn test_first_lookup_rebuilds_then_uses_cache() {
        let (_tmp, movies, cache, settings) = setup();

        let first = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(first.source, IndexSource::Rebuilt);
        assert_eq!(first.files.len(), 2);
        assert!(cache.path().exists());

        let second = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(second.source, IndexSource::Cached);
        assert_eq!(second.files, first.files);
    }

    #[test]
    fn test_disabled_cache_scans_live() {
        let (_tmp, movies, cache, mut settings) = setup();
        settings.cache_enabled = false;

        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Live);
        assert_eq!(index.files.len(), 2);
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_deleted_files_are_dropped_without_rebuild() {
        let (_tmp, movies, cache, settings) = setup();
        find_movie_files(&movies, &settings, Some(&cache));

        fs::remove_file(movies.join("Alien.mp4")).unwrap();
        touch(&movies.join("New.mkv"));

        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Cached);
        assert_eq!(index.files, vec![movies.join("Heat.mkv")]);
    }

    #[test]
    fn test_changed_fingerprint_rebuilds() {
        let (_tmp, movies, cache, mut settings) = setup();
        find_movie_files(&movies, &settings, Some(&cache));

        settings.follow_symlinks = !settings.follow_symlinks;
        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Rebuilt);
    }

    #[test]
    fn test_expired_record_rebuilds() {
        let (_tmp, movies, cache, settings) = setup();
        let mut record = CacheRecord::build(&movies, &settings.video_extensions, settings.follow_symlinks);
        record.timestamp -= (settings.cache_ttl_hours as f64) * 3600.0 + 1.0;
        cache.save(&record).unwrap();

        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Rebuilt);
    }

    #[test]
    fn test_failed_save_still_returns_files() {
        let (tmp, movies, _, settings) = setup();
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, b"not a directory").unwrap();
        let cache = IndexCache::at(blocker.join("movie_index.json"));

        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Rebuilt);
        assert_eq!(index.files.len(), 2);
        assert!(index.files.contains(&movies.join("Heat.mkv")));
        assert!(index.files.contains(&movies.join("Alien.mp4")));
        assert!(!cache.path().exists());
    }

    #[test]
    fn test_missing_cache_handle_scans_live() {
        let (_tmp, movies, _, settings) = setup();
        let index = find_movie_files(&movies, &settings, None);
        assert_eq!(index.source, IndexSource::Live);
        assert_eq!(index.files.len(), 2);
    }

    #[test]
    fn test_corrupt_cache_is_a_miss() {
        let (_tmp, movies, cache, settings) = setup();
        fs::create_dir_all(cache.path().parent().unwrap()).unwrap();
        fs::write(cache.path(), "{ not json").unwrap();

        let index = find_movie_files(&movies, &settings, Some(&cache));
        assert_eq!(index.source, IndexSource::Rebuilt);
        assert!(cache.load().is_some());
    }
}

// ============================================================================
// Selection Tests
// ============================================================================

mod selection_tests {
    use super::*;

    #[test]
    fn test_scanned_library_resolves_exact_title() {
        let tmp = TempDir::new().unwrap();
        let movies = tmp.path().join("movies");
        touch(&movies.join("Heat.1995.mkv"));
        touch(&movies.join("Alien.1979.mkv"));
        touch(&movies.join("Thief.1981.mkv"));

        let files = scan_movie_files(&movies, &extensions(), true);
        match resolve_query("alien", &files, &movies).unwrap() {
            Resolution::Selected(path) => assert_eq!(path, movies.join("Alien.1979.mkv")),
            other => panic!("expected a direct selection, got {other:?}"),
        }
    }

    #[test]
    fn test_unmatched_query_lists_titles() {
        let tmp = TempDir::new().unwrap();
        let movies = tmp.path().join("movies");
        touch(&movies.join("Heat.mkv"));
        let files = scan_movie_files(&movies, &extensions(), true);

        match resolve_query("zzzz_no_match", &files, &movies) {
            Err(ClipperError::NoMatch { available, .. }) => {
                assert_eq!(available, vec!["Heat".to_string()]);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_library() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            resolve_query("heat", &[], tmp.path()),
            Err(ClipperError::NoMovies(_))
        ));
    }
}

// ============================================================================
// Clip Building Tests
// ============================================================================

mod clip_building_tests {
    use super::*;

    struct LanguageProbe(Vec<&'static str>);

    #[async_trait]
    impl StreamProbe for LanguageProbe {
        async fn audio_streams(&self, _file: &Path) -> Result<Vec<AudioStreamDescriptor>> {
            Ok(self
                .0
                .iter()
                .enumerate()
                .map(|(i, lang)| AudioStreamDescriptor {
                    index: i,
                    stream_index: i + 1,
                    language: lang.to_string(),
                    ..AudioStreamDescriptor::synthetic()
                })
                .collect())
        }
    }

    fn request_for(config: &Config, movie: &Path, preserve: bool) -> ClipRequest {
        let start = parse_time("1:00").unwrap();
        let duration = parse_time("60").unwrap();
        let name = generate_output_filename(movie, start, start + duration);
        ClipRequest {
            source_file: movie.to_path_buf(),
            start,
            duration,
            output_file: config.directories.clips_dir.join(name),
            preserve_all_audio: preserve,
            audio_language: None,
            force_stereo: true,
        }
    }

    #[tokio::test]
    async fn test_selective_clip_command() {
        let config = Config::new(PathBuf::from("/movies"), PathBuf::from("/clips"));
        let movie = Path::new("/movies/Iron.Man.2008.BluRay.x264.mkv");
        let request = request_for(&config, movie, false);
        let probe = LanguageProbe(vec!["spa", "en-US"]);

        let cmd = build_command(&request, Path::new("ffmpeg"), Some(&probe), &config.settings).await;
        assert_eq!(cmd.values_of("-map"), vec!["0:v:0", "0:a:1"]);
        assert_eq!(cmd.values_of("-ss"), vec!["00:01:00"]);
        assert_eq!(cmd.values_of("-t"), vec!["00:01:00"]);
        assert_eq!(cmd.values_of("-c:v"), vec!["copy"]);
        assert_eq!(
            cmd.argv().last().unwrap(),
            "/clips/IronMan_00h01m00s_to_00h02m00s.mp4"
        );
    }

    #[tokio::test]
    async fn test_preserve_clip_command_never_maps_an_index() {
        let config = Config::new(PathBuf::from("/movies"), PathBuf::from("/clips"));
        let movie = Path::new("/movies/Heat.mkv");
        let request = request_for(&config, movie, true);
        let probe = LanguageProbe(vec!["eng", "fre", "spa"]);

        let cmd = build_command(&request, Path::new("ffmpeg"), Some(&probe), &config.settings).await;
        let maps = cmd.values_of("-map");
        assert_eq!(maps, vec!["0:v:0", "0:a?"]);
        assert!(maps.iter().all(|m| !m.starts_with("0:a:")));
    }

    #[tokio::test]
    async fn test_probe_without_audio_maps_video_only() {
        let config = Config::new(PathBuf::from("/movies"), PathBuf::from("/clips"));
        let request = request_for(&config, Path::new("/movies/Silent.mkv"), false);
        let probe = LanguageProbe(vec![]);

        let cmd = build_command(&request, Path::new("ffmpeg"), Some(&probe), &config.settings).await;
        assert_eq!(cmd.values_of("-map"), vec!["0:v:0"]);
        assert!(cmd.selected_stream.is_none());
    }
}

// ============================================================================
// Config Round Trip Tests
// ============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_saved_config_loads_back() {
        let tmp = TempDir::new().unwrap();
        let movies = tmp.path().join("movies");
        fs::create_dir_all(&movies).unwrap();
        let mut config = Config::new(movies.clone(), tmp.path().join("clips"));
        config.settings.default_audio_language = "fre".to_string();

        let path = tmp.path().join("conf/movieclipper.toml");
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.directories.movies_dir, movies);
        assert_eq!(loaded.settings.default_audio_language, "fre");
        assert!(tmp.path().join("clips").is_dir());
        assert_eq!(loaded.testing_dir(), tmp.path().join("clips_testing"));
    }

    #[test]
    fn test_missing_config_is_reported() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("absent.toml");
        assert!(matches!(
            Config::load_from(&path),
            Err(ClipperError::ConfigNotFound(p)) if p == path
        ));
    }
}
