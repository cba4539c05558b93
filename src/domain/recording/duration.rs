//! Duration value object

use std::fmt;
use std::str::FromStr;
use std::time::Duration as StdDuration;

use crate::domain::error::DurationParseError;

/// Default length of a one-shot `record` run (10 seconds)
pub const DEFAULT_RECORD_SECS: u64 = 10;

/// Default auto-stop deadline for a capture session (90 seconds)
pub const DEFAULT_MAX_DURATION_SECS: u64 = 90;

/// Default idle time before an incomplete reassembly buffer is discarded
pub const DEFAULT_STALE_BUFFER_SECS: u64 = 60;

/// Value object representing a time duration.
/// Immutable and validated on creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration {
    milliseconds: u64,
}

impl Duration {
    /// Create a Duration from milliseconds
    pub const fn from_millis(ms: u64) -> Self {
        Self { milliseconds: ms }
    }

    /// Create a Duration from seconds
    pub const fn from_secs(secs: u64) -> Self {
        Self {
            milliseconds: secs * 1000,
        }
    }

    /// Default one-shot recording length
    pub const fn default_record() -> Self {
        Self::from_secs(DEFAULT_RECORD_SECS)
    }

    /// Default maximum session length before the guard fires
    pub const fn default_max_duration() -> Self {
        Self::from_secs(DEFAULT_MAX_DURATION_SECS)
    }

    /// Default idle timeout for incomplete reassembly buffers
    pub const fn default_stale_buffer() -> Self {
        Self::from_secs(DEFAULT_STALE_BUFFER_SECS)
    }

    /// Get duration in seconds
    pub const fn as_secs(&self) -> u64 {
        self.milliseconds / 1000
    }

    /// Get duration in milliseconds
    pub const fn as_millis(&self) -> u64 {
        self.milliseconds
    }

    /// Convert to std::time::Duration
    pub const fn as_std(&self) -> StdDuration {
        StdDuration::from_millis(self.milliseconds)
    }
}

impl FromStr for Duration {
    type Err = DurationParseError;

    /// Parse strings like "30s", "1m", "2m30s" or "1h" into a Duration.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DurationParseError {
            input: s.to_string(),
        };
        let input = s.trim().to_lowercase();

        let mut total_secs: u64 = 0;
        let mut digits = String::new();
        let mut found_unit = false;

        for ch in input.chars() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                continue;
            }

            let multiplier = match ch {
                'h' => 3600,
                'm' => 60,
                's' => 1,
                _ => return Err(invalid()),
            };
            if digits.is_empty() {
                return Err(invalid());
            }

            let value: u64 = digits.parse().map_err(|_| invalid())?;
            total_secs = value
                .checked_mul(multiplier)
                .and_then(|v| v.checked_add(total_secs))
                .ok_or_else(invalid)?;
            digits.clear();
            found_unit = true;
        }

        // A trailing number without a unit is ambiguous
        if !digits.is_empty() || !found_unit || total_secs == 0 {
            return Err(invalid());
        }

        Ok(Self::from_secs(total_secs))
    }
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.as_secs();
        let minutes = total_secs / 60;
        let seconds = total_secs % 60;

        if minutes == 0 {
            write!(f, "{}s", seconds)
        } else if seconds == 0 {
            write!(f, "{}m", minutes)
        } else {
            write!(f, "{}m{}s", minutes, seconds)
        }
    }
}

impl Default for Duration {
    fn default() -> Self {
        Self::default_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_seconds_only() {
        let d: Duration = "30s".parse().unwrap();
        assert_eq!(d.as_secs(), 30);
        assert_eq!(d.as_millis(), 30000);
    }

    #[test]
    fn parse_minutes_and_seconds() {
        let d: Duration = "1m30s".parse().unwrap();
        assert_eq!(d.as_secs(), 90);
    }

    #[test]
    fn parse_hours() {
        let d: Duration = "1h".parse().unwrap();
        assert_eq!(d.as_secs(), 3600);
    }

    #[test]
    fn parse_case_insensitive_and_trimmed() {
        let d: Duration = "  1M30S ".parse().unwrap();
        assert_eq!(d.as_secs(), 90);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("".parse::<Duration>().is_err());
        assert!("90".parse::<Duration>().is_err());
        assert!("s".parse::<Duration>().is_err());
        assert!("10x".parse::<Duration>().is_err());
        assert!("0s".parse::<Duration>().is_err());
    }

    #[test]
    fn display_round_trips_common_values() {
        assert_eq!(Duration::from_secs(45).to_string(), "45s");
        assert_eq!(Duration::from_secs(120).to_string(), "2m");
        assert_eq!(Duration::from_secs(90).to_string(), "1m30s");
    }

    #[test]
    fn defaults() {
        assert_eq!(Duration::default_max_duration().as_secs(), 90);
        assert_eq!(Duration::default_record().as_secs(), 10);
        assert_eq!(Duration::default_stale_buffer().as_std(), StdDuration::from_secs(60));
    }
}
