use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::debug;

use crate::error::{ClipperError, Result};

use super::{AudioStreamDescriptor, UNKNOWN_LANGUAGE};

/// Source of audio stream listings for a media file.
#[async_trait]
pub trait StreamProbe: Send + Sync {
    async fn audio_streams(&self, file: &Path) -> Result<Vec<AudioStreamDescriptor>>;
}

/// Probes files with an `ffprobe` binary.
#[derive(Debug, Clone)]
pub struct Ffprobe {
    path: PathBuf,
}

impl Ffprobe {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl StreamProbe for Ffprobe {
    async fn audio_streams(&self, file: &Path) -> Result<Vec<AudioStreamDescriptor>> {
        let output = Command::new(&self.path)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_streams",
                "-select_streams",
                "a",
            ])
            .arg(file)
            .output()
            .await
            .map_err(|e| ClipperError::Probe(format!("Failed to run ffprobe: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClipperError::Probe(format!(
                "ffprobe exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let streams = parse_ffprobe_output(&stdout)?;
        debug!("Probed {} audio streams in {}", streams.len(), file.display());
        Ok(streams)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    index: Option<usize>,
    codec_name: Option<String>,
    channels: Option<u32>,
    sample_rate: Option<NumberOrString>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// ffprobe reports some numbers as JSON strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    Text(String),
}

impl NumberOrString {
    fn as_u32(&self) -> u32 {
        match self {
            NumberOrString::Number(n) => u32::try_from(*n).unwrap_or(0),
            NumberOrString::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }
}

impl ProbeStream {
    fn tag(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Parse `ffprobe -print_format json -show_streams -select_streams a`
/// output into descriptors, numbered in the order ffprobe lists them.
pub fn parse_ffprobe_output(json: &str) -> Result<Vec<AudioStreamDescriptor>> {
    let parsed: ProbeOutput = serde_json::from_str(json)?;

    Ok(parsed
        .streams
        .iter()
        .enumerate()
        .map(|(i, stream)| AudioStreamDescriptor {
            index: i,
            codec_name: stream
                .codec_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            channels: stream.channels.unwrap_or(0),
            sample_rate: stream.sample_rate.as_ref().map(|s| s.as_u32()).unwrap_or(0),
            language: stream
                .tag("language")
                .unwrap_or(UNKNOWN_LANGUAGE)
                .to_string(),
            title: stream.tag("title").unwrap_or_default().to_string(),
            stream_index: stream.index.unwrap_or(i),
        })
        .collect())
}
