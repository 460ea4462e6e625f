//! Duration strings like `"30s"`, `"5m"`, `"1h"` or a bare `"45"`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration {input:?}: expected <n>s, <n>m, <n>h or <n>")]
pub struct DurationParseError {
    pub input: String,
}

/// Parse a duration string into whole seconds.
pub fn parse_duration_secs(s: &str) -> Result<u64, DurationParseError> {
    let trimmed = s.trim();
    let (digits, multiplier) = if let Some(secs) = trimmed.strip_suffix('s') {
        (secs, 1)
    } else if let Some(mins) = trimmed.strip_suffix('m') {
        (mins, 60)
    } else if let Some(hours) = trimmed.strip_suffix('h') {
        (hours, 3600)
    } else {
        (trimmed, 1)
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .ok_or_else(|| DurationParseError {
            input: s.to_string(),
        })
}
