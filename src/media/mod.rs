pub mod command;
pub mod probe;
pub mod select;
pub mod tools;

pub use command::{build_command, ClipCommand};
pub use probe::{parse_ffprobe_output, Ffprobe, StreamProbe};
pub use select::select_audio_stream;
pub use tools::{check_tools, resolve_tools, MediaTools, ToolOverrides};

/// Language tag used when a stream carries none.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

/// One audio track as reported by the probing tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioStreamDescriptor {
    /// Position among the file's audio streams (the `N` in `0:a:N`).
    pub index: usize,
    pub codec_name: String,
    pub channels: u32,
    pub sample_rate: u32,
    pub language: String,
    pub title: String,
    /// Index of the stream in the container, across all stream types.
    pub stream_index: usize,
}

impl AudioStreamDescriptor {
    /// Stand-in for "the first audio stream, language unknown", used when
    /// the file cannot be probed.
    pub fn synthetic() -> Self {
        Self {
            index: 0,
            codec_name: "unknown".to_string(),
            channels: 2,
            sample_rate: 0,
            language: UNKNOWN_LANGUAGE.to_string(),
            title: String::new(),
            stream_index: 0,
        }
    }

    pub fn has_known_language(&self) -> bool {
        self.language != UNKNOWN_LANGUAGE
    }
}
