use std::time::Duration;

use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::DEFAULT_FLUSH_INTERVAL_MS;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodicStrategy {
    /// Interval in milliseconds
    pub interval: u64,
}

/// When buffered targets get swept.
///
/// Every strategy still flushes on suspension; they only differ in the
/// background timer.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum FlushStrategy {
    /// Sweep every two minutes.
    #[default]
    Default,
    /// No timer, flush only when the host suspends or terminates.
    End,
    Periodically(PeriodicStrategy),
}

impl FlushStrategy {
    /// Period of the background sweep, `None` when there is no timer.
    #[must_use]
    pub fn interval(&self) -> Option<Duration> {
        match self {
            FlushStrategy::Default => Some(Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS)),
            FlushStrategy::End => None,
            FlushStrategy::Periodically(periodic) if periodic.interval == 0 => {
                debug!("Periodic flush interval of 0ms, using default");
                Some(Duration::from_millis(DEFAULT_FLUSH_INTERVAL_MS))
            }
            FlushStrategy::Periodically(periodic) => Some(Duration::from_millis(periodic.interval)),
        }
    }
}

// Deserialize for FlushStrategy
// Flush Strategy can be either "end" or "periodically,<ms>"
impl<'de> Deserialize<'de> for FlushStrategy {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value.as_str() == "end" {
            Ok(FlushStrategy::End)
        } else {
            let mut split_value = value.as_str().split(',');
            // "periodically,60000"
            let strategy = split_value.next();
            let interval: Option<u64> = split_value.next().and_then(|v| v.trim().parse().ok());

            match (strategy, interval) {
                (Some("periodically"), Some(interval)) => {
                    Ok(FlushStrategy::Periodically(PeriodicStrategy { interval }))
                }
                (Some(strategy), _) => {
                    debug!("Invalid flush interval: {}, using default", strategy);
                    Ok(FlushStrategy::Default)
                }
                _ => {
                    debug!("Invalid flush strategy: {}, using default", value);
                    Ok(FlushStrategy::Default)
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_end() {
        let flush_strategy: FlushStrategy = serde_json::from_str("\"end\"").unwrap();
        assert_eq!(flush_strategy, FlushStrategy::End);
        assert_eq!(flush_strategy.interval(), None);
    }

    #[test]
    fn deserialize_periodically() {
        let flush_strategy: FlushStrategy = serde_json::from_str("\"periodically,60000\"").unwrap();
        assert_eq!(
            flush_strategy,
            FlushStrategy::Periodically(PeriodicStrategy { interval: 60000 })
        );
        assert_eq!(flush_strategy.interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn deserialize_invalid() {
        let flush_strategy: FlushStrategy = serde_json::from_str("\"invalid\"").unwrap();
        assert_eq!(flush_strategy, FlushStrategy::Default);
    }

    #[test]
    fn deserialize_invalid_interval() {
        let flush_strategy: FlushStrategy =
            serde_json::from_str("\"periodically,invalid\"").unwrap();
        assert_eq!(flush_strategy, FlushStrategy::Default);
    }

    #[test]
    fn default_interval_is_two_minutes() {
        assert_eq!(
            FlushStrategy::Default.interval(),
            Some(Duration::from_secs(120))
        );
    }

    #[test]
    fn zero_interval_uses_default() {
        let flush_strategy = FlushStrategy::Periodically(PeriodicStrategy { interval: 0 });
        assert_eq!(flush_strategy.interval(), Some(Duration::from_secs(120)));
    }
}
