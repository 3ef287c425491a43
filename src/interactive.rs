use crate::clip::parse_time;
use crate::config::{default_directories, expand_tilde, Config};
use crate::error::{ClipperError, Result};
use crate::library::{pick_candidate, MatchCandidate};
use console::style;
use dialoguer::{Confirm, Input};
use std::fs;
use std::path::{Path, PathBuf};

/// Ask for the movies and clips directories, then validate and save a new
/// config with default settings.
pub fn run_setup_wizard() -> Result<Config> {
    print_header();

    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    let cwd = std::env::current_dir()?;
    let (default_movies, default_clips) = default_directories(&home, &cwd);

    let movies_dir = ask_directory("Where are your movie files located?", &default_movies, &cwd)?;

    if !movies_dir.exists() {
        let create = Confirm::new()
            .with_prompt(format!(
                "Movies directory does not exist. Create {}?",
                movies_dir.display()
            ))
            .default(false)
            .interact()?;
        if !create {
            return Err(ClipperError::Config(
                "Movies directory is required. Setup cancelled.".to_string(),
            ));
        }
        fs::create_dir_all(&movies_dir)?;
    }

    let clips_dir = ask_directory("Where should clips be saved?", &default_clips, &cwd)?;
    if !clips_dir.exists() {
        fs::create_dir_all(&clips_dir)?;
    }

    let config = Config::new(movies_dir, clips_dir);
    config.validate()?;
    let path = config.save()?;

    println!("{} Configuration saved to {}", style("✓").green(), path.display());
    println!("  Movies directory: {}", style(config.directories.movies_dir.display()).cyan());
    println!("  Clips directory:  {}", style(config.directories.clips_dir.display()).cyan());
    println!();

    Ok(config)
}

fn print_header() {
    println!();
    println!(
        "{}",
        style("╔═══════════════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║               movieclipper - setup                ║").cyan()
    );
    println!(
        "{}",
        style("╚═══════════════════════════════════════════════════╝").cyan()
    );
    println!("  Configure your directories for movie clipping.\n");
}

fn ask_directory(prompt: &str, default: &Path, cwd: &Path) -> Result<PathBuf> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .default(default.display().to_string())
        .interact_text()?;

    let path = expand_tilde(Path::new(answer.trim()));
    Ok(if path.is_absolute() { path } else { cwd.join(path) })
}

/// Show the ranked candidates and ask for one by number until a valid
/// choice is entered.
pub fn choose_candidate(query: &str, candidates: &[MatchCandidate], movies_dir: &Path) -> Result<PathBuf> {
    println!(
        "\n{}",
        style(format!("Multiple movies found for '{query}':")).yellow()
    );
    print_candidate_table(candidates, movies_dir);

    let answer: String = Input::new()
        .with_prompt(format!("Select movie (1-{})", candidates.len()))
        .default("1".to_string())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            pick_candidate(candidates, input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()?;

    Ok(pick_candidate(candidates, &answer)?.path.clone())
}

fn print_candidate_table(candidates: &[MatchCandidate], movies_dir: &Path) {
    println!(
        "  {:>3}  {:<40}  {:<30}  {:>5}",
        style("#").magenta().bold(),
        style("Movie").magenta().bold(),
        style("Location").magenta().bold(),
        style("Score").magenta().bold()
    );

    for (i, candidate) in candidates.iter().enumerate() {
        println!(
            "  {:>3}  {:<40}  {:<30}  {:>5}",
            style(i + 1).cyan(),
            style(candidate.title()).green(),
            style(relative_location(&candidate.path, movies_dir)).blue(),
            style(format!("{:.0}%", candidate.score)).yellow()
        );
    }
    println!();
}

/// Folder of `path` relative to the movies directory, `.` for top-level
/// files.
fn relative_location(path: &Path, movies_dir: &Path) -> String {
    let parent = path.parent().unwrap_or(Path::new(""));
    let relative = parent.strip_prefix(movies_dir).unwrap_or(parent);
    if relative.as_os_str().is_empty() {
        ".".to_string()
    } else {
        relative.display().to_string()
    }
}

/// Prompt for a time value, re-asking until it parses.
pub fn prompt_time(prompt: &str, default: &str) -> Result<String> {
    let answer: String = Input::new()
        .with_prompt(format!("{prompt} (HH:MM:SS, MM:SS, or seconds)"))
        .default(default.to_string())
        .validate_with(|input: &String| -> std::result::Result<(), String> {
            parse_time(input).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;
    Ok(answer)
}

pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}
