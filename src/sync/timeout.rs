use crate::error::{Result, SyncError};
use std::time::{Duration, Instant};

/// Millisecond value reserved to mean "wait indefinitely".
pub const INFINITE_MILLIS: i64 = -1;

/// How long a bounded acquisition may wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    Infinite,
    After(Duration),
}

impl Timeout {
    /// Decode the integer encoding: `-1` is infinite, other negatives are invalid.
    pub fn from_millis(millis: i64) -> Result<Self> {
        match millis {
            INFINITE_MILLIS => Ok(Timeout::Infinite),
            m if m < 0 => Err(SyncError::invalid_timeout(m)),
            m => Ok(Timeout::After(Duration::from_millis(m as u64))),
        }
    }

    pub fn zero() -> Self {
        Timeout::After(Duration::ZERO)
    }

    pub fn is_infinite(&self) -> bool {
        matches!(self, Timeout::Infinite)
    }

    /// Monotonic deadline measured from `start`, `None` when infinite.
    pub(crate) fn deadline_from(&self, start: Instant) -> Option<Instant> {
        match self {
            Timeout::Infinite => None,
            // Saturate absurd durations to "practically never".
            Timeout::After(d) => Some(
                start
                    .checked_add(*d)
                    .unwrap_or_else(|| start + Duration::from_secs(60 * 60 * 24 * 365)),
            ),
        }
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Timeout::After(duration)
    }
}

impl TryFrom<i64> for Timeout {
    type Error = SyncError;

    fn try_from(millis: i64) -> Result<Self> {
        Timeout::from_millis(millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_is_infinite() {
        assert_eq!(Timeout::from_millis(-1).unwrap(), Timeout::Infinite);
        assert!(Timeout::from_millis(INFINITE_MILLIS).unwrap().is_infinite());
    }

    #[test]
    fn test_non_negative_millis() {
        assert_eq!(Timeout::from_millis(0).unwrap(), Timeout::zero());
        assert_eq!(
            Timeout::try_from(250).unwrap(),
            Timeout::After(Duration::from_millis(250))
        );
    }

    #[test]
    fn test_other_negatives_rejected() {
        let err = Timeout::from_millis(-2).unwrap_err();
        assert!(matches!(err, SyncError::InvalidTimeout { millis: -2 }));
        assert!(Timeout::from_millis(i64::MIN).is_err());
    }

    #[test]
    fn test_deadline() {
        let now = Instant::now();
        assert_eq!(Timeout::Infinite.deadline_from(now), None);
        assert_eq!(
            Timeout::After(Duration::from_millis(10)).deadline_from(now),
            Some(now + Duration::from_millis(10))
        );
        assert!(Timeout::After(Duration::MAX).deadline_from(now).is_some());
    }
}
