use crate::error::{Result, SyncError};
use crate::sync::Timeout;
use std::time::Duration;

/// Parse a duration string like "250ms", "30s", "5m", "2h", "7d"
/// Defaults to seconds if no unit specified
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return Err(SyncError::InvalidDuration {
            input: s.to_string(),
            message: "empty string".to_string(),
        });
    }

    // "ms" must be checked before the single-letter suffixes
    let (num_str, unit) = if let Some(stripped) = s.strip_suffix("ms") {
        (stripped, "ms")
    } else if let Some(stripped) = s.strip_suffix('s') {
        (stripped, "s")
    } else if let Some(stripped) = s.strip_suffix('m') {
        (stripped, "m")
    } else if let Some(stripped) = s.strip_suffix('h') {
        (stripped, "h")
    } else if let Some(stripped) = s.strip_suffix('d') {
        (stripped, "d")
    } else {
        // No unit, assume seconds
        (s, "s")
    };

    let value: u64 = num_str.parse().map_err(|_| SyncError::InvalidDuration {
        input: s.to_string(),
        message: "expected format: NUMBER[ms|s|m|h|d] (e.g., '250ms', '30s', '5m')".to_string(),
    })?;

    let duration = match unit {
        "ms" => Duration::from_millis(value),
        "m" => Duration::from_secs(value.saturating_mul(60)),
        "h" => Duration::from_secs(value.saturating_mul(60 * 60)),
        "d" => Duration::from_secs(value.saturating_mul(60 * 60 * 24)),
        _ => Duration::from_secs(value),
    };

    Ok(duration)
}

/// Parse a wait bound: a duration, or "inf"/"infinite"/"-1" to wait forever
pub fn parse_timeout(s: &str) -> Result<Timeout> {
    match s.trim() {
        "inf" | "infinite" | "-1" => Ok(Timeout::Infinite),
        other => parse_duration(other).map(Timeout::After),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_units() {
        assert_eq!(parse_duration("1ms").unwrap().as_millis(), 1);
        assert_eq!(parse_duration("1s").unwrap().as_secs(), 1);
        assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
        assert_eq!(parse_duration("1h").unwrap().as_secs(), 3600);
        assert_eq!(parse_duration("1d").unwrap().as_secs(), 86400);
    }

    #[test]
    fn test_timeout_sentinels() {
        assert_eq!(parse_timeout("inf").unwrap(), Timeout::Infinite);
        assert_eq!(parse_timeout(" -1 ").unwrap(), Timeout::Infinite);
        assert_eq!(
            parse_timeout("50ms").unwrap(),
            Timeout::After(Duration::from_millis(50))
        );
        assert!(parse_timeout("-2").is_err());
    }
}
