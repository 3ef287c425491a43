pub mod filename;
pub mod time;

pub use filename::{clean_title, generate_output_filename};
pub use time::{clip_end, format_time, format_time_for_filename, parse_time};

use std::path::PathBuf;
use std::time::Duration;

/// Everything the command builder needs to know about one clip.
#[derive(Debug, Clone)]
pub struct ClipRequest {
    pub source_file: PathBuf,
    pub start: Duration,
    pub duration: Duration,
    pub output_file: PathBuf,
    pub preserve_all_audio: bool,
    pub audio_language: Option<String>,
    pub force_stereo: bool,
}

impl ClipRequest {
    /// End of the clip in the source timeline, `None` if it overflows.
    pub fn end(&self) -> Option<Duration> {
        self.start.checked_add(self.duration)
    }
}
