//! Monitoring check frequency.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Daily,
    #[default]
    Weekly,
    Monthly,
}

impl Frequency {
    /// Parse a frequency name. Unrecognized values fall back to weekly.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Frequency::Daily,
            "weekly" => Frequency::Weekly,
            "monthly" => Frequency::Monthly,
            _ => Frequency::Weekly,
        }
    }

    pub fn interval(self) -> Duration {
        match self {
            Frequency::Daily => Duration::hours(24),
            Frequency::Weekly => Duration::days(7),
            Frequency::Monthly => Duration::days(30),
        }
    }

    pub fn std_interval(self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval().num_seconds() as u64)
    }

    pub fn next_check(self, from: DateTime<Utc>) -> DateTime<Utc> {
        from + self.interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_weekly_fallback() {
        assert_eq!(Frequency::parse("daily"), Frequency::Daily);
        assert_eq!(Frequency::parse(" Monthly "), Frequency::Monthly);
        assert_eq!(Frequency::parse("hourly"), Frequency::Weekly);
        assert_eq!(Frequency::parse(""), Frequency::Weekly);
    }

    #[test]
    fn test_intervals() {
        let now = Utc::now();
        assert_eq!(Frequency::Daily.next_check(now) - now, Duration::hours(24));
        assert_eq!(Frequency::Weekly.next_check(now) - now, Duration::days(7));
        assert_eq!(Frequency::Monthly.next_check(now) - now, Duration::days(30));
        assert_eq!(Frequency::Daily.std_interval().as_secs(), 86_400);
    }
}
