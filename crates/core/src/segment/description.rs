//! Chapter markers written as timestamps in a free-text description.

use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::Marker;

static TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(\d{1,2}):([0-5]?\d)|(\d{1,3})):([0-5]\d)\b")
        .expect("timestamp pattern is valid")
});

/// Extracts markers from description lines such as `03:15 Second song`,
/// `75:00 Encore` or `1:02:45 - Finale`.
///
/// The first timestamp on a line is the start offset; the rest of the line,
/// trimmed of whitespace and separator punctuation, is the title. Lines
/// without a timestamp are ignored. Order is preserved.
pub fn parse_description_markers(description: &str) -> Vec<Marker> {
    description
        .lines()
        .filter_map(|line| {
            let caps = TIMESTAMP.captures(line)?;
            let whole = caps.get(0)?;

            let hours: u64 = caps
                .get(1)
                .and_then(|h| h.as_str().parse().ok())
                .unwrap_or(0);
            let minutes: u64 = caps.get(2).or_else(|| caps.get(3))?.as_str().parse().ok()?;
            let seconds: u64 = caps.get(4)?.as_str().parse().ok()?;
            let start_ms = ((hours * 60 + minutes) * 60 + seconds) * 1000;

            let mut title = String::with_capacity(line.len());
            title.push_str(&line[..whole.start()]);
            title.push_str(&line[whole.end()..]);
            let title = title
                .trim()
                .trim_matches(|c: char| c == '-' || c == '|' || c == ':' || c.is_whitespace())
                .to_string();

            Some(Marker::new(title, start_ms))
        })
        .collect()
}
