//! Alert rule definitions

use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// One recurring daily check, as persisted by the rule store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique rule ID, stable across rebuilds
    pub id: String,
    /// Owning user, resolved only for the email salutation
    pub owner_id: String,
    /// Daily fire time as `HH:MM` in the monitored location's timezone
    pub fire_time: String,
    /// Pollutant label (informational)
    #[serde(default = "default_pollutant")]
    pub pollutant: String,
    /// Alert when the pollution index is strictly above this value
    pub threshold: f64,
    pub recipient_email: String,
}

fn default_pollutant() -> String {
    "aqi".to_string()
}

impl AlertRule {
    /// Create a new rule
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        fire_time: impl Into<String>,
        threshold: f64,
        recipient_email: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            fire_time: fire_time.into(),
            pollutant: default_pollutant(),
            threshold,
            recipient_email: recipient_email.into(),
        }
    }

    /// Set the pollutant label
    pub fn with_pollutant(mut self, pollutant: impl Into<String>) -> Self {
        self.pollutant = pollutant.into();
        self
    }

    /// Check the rule can be scheduled and return its parsed fire time
    pub fn validate(&self) -> Result<FireTime, RuleError> {
        if !self.threshold.is_finite() {
            return Err(RuleError::NonFiniteThreshold(self.threshold));
        }
        if self.threshold < 0.0 {
            return Err(RuleError::NegativeThreshold(self.threshold));
        }
        self.fire_time.parse()
    }
}

/// Hour and minute of a daily trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FireTime {
    hour: u32,
    minute: u32,
}

impl FireTime {
    pub fn new(hour: u32, minute: u32) -> Result<Self, RuleError> {
        if hour > 23 || minute > 59 {
            return Err(RuleError::InvalidFireTime(format!("{}:{:02}", hour, minute)));
        }
        Ok(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl FromStr for FireTime {
    type Err = RuleError;

    /// Accepts `H:MM` or `HH:MM` on a 24-hour clock
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || RuleError::InvalidFireTime(s.to_string());
        let trimmed = s.trim();

        // chrono accepts single-digit minutes; require exactly two
        let minute_width = trimmed.split_once(':').map(|(_, m)| m.len());
        if minute_width != Some(2) || trimmed.contains(char::is_whitespace) {
            return Err(invalid());
        }

        let time = NaiveTime::parse_from_str(trimmed, "%H:%M").map_err(|_| invalid())?;
        FireTime::new(time.hour(), time.minute())
    }
}

impl fmt::Display for FireTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Rule configuration errors. A rule failing validation is left unscheduled.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RuleError {
    #[error("Invalid fire time: {0:?}")]
    InvalidFireTime(String),

    #[error("Threshold is not a finite number: {0}")]
    NonFiniteThreshold(f64),

    #[error("Threshold must not be negative: {0}")]
    NegativeThreshold(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fire_time() {
        assert_eq!("08:00".parse::<FireTime>().unwrap(), FireTime::new(8, 0).unwrap());
        assert_eq!("7:05".parse::<FireTime>().unwrap(), FireTime::new(7, 5).unwrap());
        assert_eq!("23:59".parse::<FireTime>().unwrap(), FireTime::new(23, 59).unwrap());
        assert_eq!(" 00:00 ".parse::<FireTime>().unwrap(), FireTime::new(0, 0).unwrap());
    }

    #[test]
    fn test_reject_malformed_fire_time() {
        for bad in [
            "", "8", "24:00", "12:60", "12:5", "ab:cd", "-1:30", "08:00:00", "123:00", "8 :00",
            "08: 00", "08:0a",
        ] {
            assert!(
                matches!(bad.parse::<FireTime>(), Err(RuleError::InvalidFireTime(_))),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_fire_time_display() {
        assert_eq!(FireTime::new(7, 5).unwrap().to_string(), "07:05");
    }

    #[test]
    fn test_validate_threshold() {
        let rule = AlertRule::new("r1", "u1", "08:00", 3.0, "a@example.com");
        assert_eq!(rule.validate().unwrap(), FireTime::new(8, 0).unwrap());

        let rule = AlertRule::new("r1", "u1", "08:00", f64::NAN, "a@example.com");
        assert!(matches!(rule.validate(), Err(RuleError::NonFiniteThreshold(_))));

        let rule = AlertRule::new("r1", "u1", "08:00", f64::INFINITY, "a@example.com");
        assert!(matches!(rule.validate(), Err(RuleError::NonFiniteThreshold(_))));

        let rule = AlertRule::new("r1", "u1", "08:00", -1.0, "a@example.com");
        assert_eq!(rule.validate(), Err(RuleError::NegativeThreshold(-1.0)));
    }

    #[test]
    fn test_rule_deserialize_defaults_pollutant() {
        let rule: AlertRule = serde_json::from_value(serde_json::json!({
            "id": "r1",
            "owner_id": "u1",
            "fire_time": "06:30",
            "threshold": 2,
            "recipient_email": "a@example.com"
        }))
        .unwrap();
        assert_eq!(rule.pollutant, "aqi");
        assert_eq!(rule.threshold, 2.0);
    }
}
