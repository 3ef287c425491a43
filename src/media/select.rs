use super::AudioStreamDescriptor;

/// Pick the audio stream for `preferred_language`: an exact tag match
/// first, then a match on the first two characters, then the first stream.
pub fn select_audio_stream<'a>(
    streams: &'a [AudioStreamDescriptor],
    preferred_language: &str,
) -> Option<&'a AudioStreamDescriptor> {
    if let Some(exact) = streams.iter().find(|s| s.language == preferred_language) {
        return Some(exact);
    }

    let prefix: String = preferred_language.chars().take(2).collect();
    streams
        .iter()
        .find(|s| s.language.starts_with(&prefix))
        .or_else(|| streams.first())
}
