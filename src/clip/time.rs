use std::time::Duration;

use crate::error::{ClipperError, Result};

/// Parse a time given as seconds, `M:SS` or `H:MM:SS`. The last component
/// may carry a fractional part.
pub fn parse_time(input: &str) -> Result<Duration> {
    let trimmed = input.trim();
    let invalid = || ClipperError::InvalidTime(input.to_string());

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() > 3 {
        return Err(invalid());
    }

    let (last, leading) = parts.split_last().ok_or_else(invalid)?;

    let mut whole_secs: u64 = 0;
    for part in leading {
        let value = parse_digits(part).ok_or_else(invalid)?;
        whole_secs = whole_secs
            .checked_mul(60)
            .and_then(|s| s.checked_add(value))
            .ok_or_else(invalid)?;
    }

    let (secs, nanos) = parse_seconds(last).ok_or_else(invalid)?;
    let total = whole_secs
        .checked_mul(60)
        .and_then(|s| s.checked_add(secs))
        .ok_or_else(invalid)?;

    Ok(Duration::new(total, nanos))
}

/// Format as `HH:MM:SS`, with a trimmed `.fraction` when there is a
/// sub-second part.
pub fn format_time(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let base = format!("{:02}:{:02}:{:02}", hours, minutes, seconds);

    match duration.subsec_nanos() {
        0 => base,
        nanos => {
            let fraction = format!("{:09}", nanos);
            format!("{}.{}", base, fraction.trim_end_matches('0'))
        }
    }
}

/// Time form used inside generated file names, e.g. `00h01m30s`.
pub fn format_time_for_filename(duration: Duration) -> String {
    format_time(duration).replacen(':', "h", 1).replacen(':', "m", 1) + "s"
}

/// End of a clip starting at `start` and lasting `duration`. Sums past the
/// representable range are rejected as an invalid time.
pub fn clip_end(start: Duration, duration: Duration) -> Result<Duration> {
    start.checked_add(duration).ok_or_else(|| {
        ClipperError::InvalidTime(format!(
            "clip end overflows: start {} plus duration {}",
            format_time(start),
            format_time(duration)
        ))
    })
}

fn parse_digits(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_seconds(part: &str) -> Option<(u64, u32)> {
    let (whole, fraction) = match part.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (part, None),
    };

    let secs = parse_digits(whole)?;
    let nanos = match fraction {
        None => 0,
        Some(digits) => {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let mut padded: String = digits.chars().take(9).collect();
            while padded.len() < 9 {
                padded.push('0');
            }
            padded.parse().ok()?
        }
    };

    Some((secs, nanos))
}
