use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::clip::{format_time, ClipRequest};
use crate::config::Settings;

use super::probe::StreamProbe;
use super::select::select_audio_stream;
use super::AudioStreamDescriptor;

/// Full ffmpeg invocation for one clip, program path first.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipCommand {
    argv: Vec<OsString>,
    /// Audio track mapped in selective mode; `None` in preserve mode.
    pub selected_stream: Option<AudioStreamDescriptor>,
}

impl ClipCommand {
    #[cfg(test)]
    pub(crate) fn from_argv(argv: Vec<OsString>) -> Self {
        Self {
            argv,
            selected_stream: None,
        }
    }

    pub fn argv(&self) -> &[OsString] {
        &self.argv
    }

    pub fn program(&self) -> &OsStr {
        &self.argv[0]
    }

    pub fn args(&self) -> &[OsString] {
        &self.argv[1..]
    }

    pub fn contains(&self, arg: &str) -> bool {
        self.argv.iter().any(|a| a == arg)
    }

    /// Values following each occurrence of `flag`.
    pub fn values_of(&self, flag: &str) -> Vec<String> {
        self.argv
            .windows(2)
            .filter(|w| w[0] == flag)
            .map(|w| w[1].to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ClipCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .argv
            .iter()
            .map(|a| {
                let s = a.to_string_lossy();
                if s.contains(char::is_whitespace) {
                    format!("\"{s}\"")
                } else {
                    s.into_owned()
                }
            })
            .collect();
        write!(f, "{}", parts.join(" "))
    }
}

fn push(argv: &mut Vec<OsString>, args: &[&str]) {
    argv.extend(args.iter().map(OsString::from));
}

fn push_audio_encoding(argv: &mut Vec<OsString>, request: &ClipRequest, settings: &Settings) {
    if request.force_stereo {
        let channels = settings.default_audio_channels.to_string();
        push(argv, &["-ac", channels.as_str()]);
    }
    let sample_rate = settings.default_sample_rate.to_string();
    push(
        argv,
        &[
            "-c:a",
            settings.default_audio_codec.as_str(),
            "-ar",
            sample_rate.as_str(),
        ],
    );
}

/// Probe the file, falling back to the synthetic first-stream descriptor
/// when no probe is available or it fails.
async fn probe_streams(probe: Option<&dyn StreamProbe>, file: &Path) -> Vec<AudioStreamDescriptor> {
    let Some(probe) = probe else {
        return vec![AudioStreamDescriptor::synthetic()];
    };

    match probe.audio_streams(file).await {
        Ok(streams) => streams,
        Err(e) => {
            warn!("Could not detect audio streams: {e}");
            vec![AudioStreamDescriptor::synthetic()]
        }
    }
}

/// Assemble the ffmpeg arguments for `request`.
///
/// Video is always stream-copied. In preserve mode every audio track is
/// mapped generically and no probe runs. Otherwise one audio track is chosen
/// by language and mapped together with the first video stream.
pub async fn build_command(
    request: &ClipRequest,
    ffmpeg: &Path,
    probe: Option<&dyn StreamProbe>,
    settings: &Settings,
) -> ClipCommand {
    let start = format_time(request.start);
    let duration = format_time(request.duration);

    let mut argv: Vec<OsString> = vec![ffmpeg.as_os_str().to_os_string()];
    push(&mut argv, &["-y", "-ss", start.as_str(), "-i"]);
    argv.push(request.source_file.as_os_str().to_os_string());
    push(&mut argv, &["-t", duration.as_str(), "-c:v", "copy"]);

    let mut selected_stream = None;

    if request.preserve_all_audio {
        push(&mut argv, &["-map", "0:v:0", "-map", "0:a?"]);
    } else {
        if probe.is_none() && request.audio_language.is_some() {
            warn!("ffprobe unavailable; audio language selection ignored");
        }

        let streams = probe_streams(probe, &request.source_file).await;
        let language = request
            .audio_language
            .as_deref()
            .unwrap_or(&settings.default_audio_language);

        push(&mut argv, &["-map", "0:v:0"]);
        match select_audio_stream(&streams, language) {
            Some(stream) => {
                let audio_map = format!("0:a:{}", stream.index);
                push(&mut argv, &["-map", audio_map.as_str()]);
                if stream.has_known_language() {
                    info!("Selected audio: Stream {} ({})", stream.index, stream.language);
                } else {
                    debug!("Selected audio: Stream {} (unknown language)", stream.index);
                }
                selected_stream = Some(stream.clone());
            }
            None => warn!(
                "No audio streams found in {}; clip will have no audio",
                request.source_file.display()
            ),
        }
    }

    push_audio_encoding(&mut argv, request, settings);
    argv.push(request.output_file.as_os_str().to_os_string());

    ClipCommand {
        argv,
        selected_stream,
    }
}
