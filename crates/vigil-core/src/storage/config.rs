//! TOML-based application configuration.
//!
//! Stores operator preferences including:
//! - Breathing mode and poll cadence
//! - Loyalty check window, cooldown, and trigger probability
//! - Weekly review day and thresholds
//! - Breath-hold delays and absence penalties
//!
//! Configuration is stored at `~/.config/vigil/config.toml`.

use std::path::PathBuf;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::audio::BreathingMode;
use crate::enforcement::{BreathHoldThresholds, LoyaltyConfig, SchedulerConfig};
use crate::error::ConfigError;

/// Breathing classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreathingSection {
    #[serde(default)]
    pub mode: BreathingMode,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Loyalty check configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltySection {
    #[serde(default = "default_window_start")]
    pub window_start_hour: u32,
    #[serde(default = "default_window_end")]
    pub window_end_hour: u32,
    #[serde(default = "default_cooldown_minutes")]
    pub cooldown_minutes: i64,
    #[serde(default = "default_deadline_minutes")]
    pub deadline_minutes: i64,
    #[serde(default = "default_trigger_probability")]
    pub trigger_probability: f64,
}

/// Weekly review configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSection {
    /// Review day name, e.g. "sunday".
    #[serde(default = "default_review_weekday")]
    pub weekday: String,
    #[serde(default = "default_weekly_threshold")]
    pub weekly_threshold: u32,
    #[serde(default = "default_report_hour")]
    pub report_due_hour: u32,
}

/// Breath-hold and absence enforcement configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementSection {
    #[serde(default = "default_warning_delay_secs")]
    pub warning_delay_secs: i64,
    #[serde(default = "default_penalty_delay_secs")]
    pub penalty_delay_secs: i64,
    #[serde(default = "default_breath_penalty_points")]
    pub breath_penalty_points: u32,
    #[serde(default = "default_absence_threshold_hours")]
    pub absence_threshold_hours: i64,
    #[serde(default = "default_absence_penalty_points")]
    pub absence_penalty_points: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/vigil/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fixed seed for randomized decisions; omit for entropy seeding.
    /// Kept ahead of the sections so TOML serialization stays valid.
    #[serde(default)]
    pub rng_seed: Option<u64>,
    #[serde(default)]
    pub breathing: BreathingSection,
    #[serde(default)]
    pub loyalty: LoyaltySection,
    #[serde(default)]
    pub review: ReviewSection,
    #[serde(default)]
    pub enforcement: EnforcementSection,
}

// Default functions
fn default_poll_interval_ms() -> u64 {
    33
}
fn default_window_start() -> u32 {
    8
}
fn default_window_end() -> u32 {
    23
}
fn default_cooldown_minutes() -> i64 {
    120
}
fn default_deadline_minutes() -> i64 {
    7
}
fn default_trigger_probability() -> f64 {
    0.005
}
fn default_review_weekday() -> String {
    "sunday".into()
}
fn default_weekly_threshold() -> u32 {
    75
}
fn default_report_hour() -> u32 {
    21
}
fn default_warning_delay_secs() -> i64 {
    15
}
fn default_penalty_delay_secs() -> i64 {
    10
}
fn default_breath_penalty_points() -> u32 {
    10
}
fn default_absence_threshold_hours() -> i64 {
    12
}
fn default_absence_penalty_points() -> u32 {
    10
}

impl Default for BreathingSection {
    fn default() -> Self {
        Self {
            mode: BreathingMode::default(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for LoyaltySection {
    fn default() -> Self {
        Self {
            window_start_hour: default_window_start(),
            window_end_hour: default_window_end(),
            cooldown_minutes: default_cooldown_minutes(),
            deadline_minutes: default_deadline_minutes(),
            trigger_probability: default_trigger_probability(),
        }
    }
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            weekday: default_review_weekday(),
            weekly_threshold: default_weekly_threshold(),
            report_due_hour: default_report_hour(),
        }
    }
}

impl Default for EnforcementSection {
    fn default() -> Self {
        Self {
            warning_delay_secs: default_warning_delay_secs(),
            penalty_delay_secs: default_penalty_delay_secs(),
            breath_penalty_points: default_breath_penalty_points(),
            absence_threshold_hours: default_absence_threshold_hours(),
            absence_penalty_points: default_absence_penalty_points(),
        }
    }
}

impl Config {
    fn path() -> Result<PathBuf, ConfigError> {
        let dir = super::data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/vigil"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load the configuration, falling back to defaults when absent.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::LoadFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::LoadFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Save the configuration as TOML.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let text = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, text).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Get a config value by dotted key, e.g. `loyalty.cooldown_minutes`.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "breathing.mode" => Some(match self.breathing.mode {
                BreathingMode::SinglePerson => "single_person".into(),
                BreathingMode::TwoPerson => "two_person".into(),
            }),
            "breathing.poll_interval_ms" => Some(self.breathing.poll_interval_ms.to_string()),
            "loyalty.window_start_hour" => Some(self.loyalty.window_start_hour.to_string()),
            "loyalty.window_end_hour" => Some(self.loyalty.window_end_hour.to_string()),
            "loyalty.cooldown_minutes" => Some(self.loyalty.cooldown_minutes.to_string()),
            "loyalty.deadline_minutes" => Some(self.loyalty.deadline_minutes.to_string()),
            "loyalty.trigger_probability" => Some(self.loyalty.trigger_probability.to_string()),
            "review.weekday" => Some(self.review.weekday.clone()),
            "review.weekly_threshold" => Some(self.review.weekly_threshold.to_string()),
            "review.report_due_hour" => Some(self.review.report_due_hour.to_string()),
            "enforcement.warning_delay_secs" => {
                Some(self.enforcement.warning_delay_secs.to_string())
            }
            "enforcement.penalty_delay_secs" => {
                Some(self.enforcement.penalty_delay_secs.to_string())
            }
            "enforcement.breath_penalty_points" => {
                Some(self.enforcement.breath_penalty_points.to_string())
            }
            "enforcement.absence_threshold_hours" => {
                Some(self.enforcement.absence_threshold_hours.to_string())
            }
            "enforcement.absence_penalty_points" => {
                Some(self.enforcement.absence_penalty_points.to_string())
            }
            "rng_seed" => Some(
                self.rng_seed
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "none".into()),
            ),
            _ => None,
        }
    }

    /// Set a config value by dotted key and persist the file.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
            value.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.into(),
                message: format!("cannot parse '{value}'"),
            })
        }

        match key {
            "breathing.mode" => {
                self.breathing.mode = match value {
                    "single_person" | "single" | "1" => BreathingMode::SinglePerson,
                    "two_person" | "two" | "2" => BreathingMode::TwoPerson,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.into(),
                            message: format!("unknown mode '{value}'"),
                        })
                    }
                };
            }
            "breathing.poll_interval_ms" => {
                self.breathing.poll_interval_ms = parse(key, value)?
            }
            "loyalty.window_start_hour" => self.loyalty.window_start_hour = parse(key, value)?,
            "loyalty.window_end_hour" => self.loyalty.window_end_hour = parse(key, value)?,
            "loyalty.cooldown_minutes" => self.loyalty.cooldown_minutes = parse(key, value)?,
            "loyalty.deadline_minutes" => self.loyalty.deadline_minutes = parse(key, value)?,
            "loyalty.trigger_probability" => {
                self.loyalty.trigger_probability = parse(key, value)?
            }
            "review.weekday" => {
                self.review.weekday = value.to_string();
                self.review_weekday()?;
            }
            "review.weekly_threshold" => self.review.weekly_threshold = parse(key, value)?,
            "review.report_due_hour" => self.review.report_due_hour = parse(key, value)?,
            "enforcement.warning_delay_secs" => {
                self.enforcement.warning_delay_secs = parse(key, value)?
            }
            "enforcement.penalty_delay_secs" => {
                self.enforcement.penalty_delay_secs = parse(key, value)?
            }
            "enforcement.breath_penalty_points" => {
                self.enforcement.breath_penalty_points = parse(key, value)?
            }
            "enforcement.absence_threshold_hours" => {
                self.enforcement.absence_threshold_hours = parse(key, value)?
            }
            "enforcement.absence_penalty_points" => {
                self.enforcement.absence_penalty_points = parse(key, value)?
            }
            "rng_seed" => {
                self.rng_seed = if value == "none" {
                    None
                } else {
                    Some(parse(key, value)?)
                };
            }
            _ => {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "unknown key".into(),
                })
            }
        }
        self.save()
    }

    /// Parse the configured review weekday.
    pub fn review_weekday(&self) -> Result<Weekday, ConfigError> {
        match self.review.weekday.to_ascii_lowercase().as_str() {
            "monday" | "mon" => Ok(Weekday::Mon),
            "tuesday" | "tue" => Ok(Weekday::Tue),
            "wednesday" | "wed" => Ok(Weekday::Wed),
            "thursday" | "thu" => Ok(Weekday::Thu),
            "friday" | "fri" => Ok(Weekday::Fri),
            "saturday" | "sat" => Ok(Weekday::Sat),
            "sunday" | "sun" => Ok(Weekday::Sun),
            other => Err(ConfigError::InvalidValue {
                key: "review.weekday".into(),
                message: format!("unknown weekday '{other}'"),
            }),
        }
    }

    /// Build the scheduler configuration from the parsed sections.
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, ConfigError> {
        Ok(SchedulerConfig {
            loyalty: LoyaltyConfig {
                window_start_hour: self.loyalty.window_start_hour,
                window_end_hour: self.loyalty.window_end_hour,
                cooldown_minutes: self.loyalty.cooldown_minutes,
                deadline_minutes: self.loyalty.deadline_minutes,
                trigger_probability: self.loyalty.trigger_probability,
            },
            breath: BreathHoldThresholds {
                warning_delay_ms: self.enforcement.warning_delay_secs * 1_000,
                penalty_delay_ms: self.enforcement.penalty_delay_secs * 1_000,
                penalty_points: self.enforcement.breath_penalty_points,
            },
            review_weekday: self.review_weekday()?,
            weekly_threshold: self.review.weekly_threshold,
            report_due_hour: self.review.report_due_hour,
            absence_threshold_hours: self.enforcement.absence_threshold_hours,
            absence_penalty_points: self.enforcement.absence_penalty_points,
            rng_seed: self.rng_seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_constants() {
        let config = Config::default();
        assert_eq!(config.breathing.poll_interval_ms, 33);
        assert_eq!(config.loyalty.deadline_minutes, 7);
        assert_eq!(config.loyalty.trigger_probability, 0.005);
        assert_eq!(config.enforcement.warning_delay_secs, 15);
        assert_eq!(config.enforcement.penalty_delay_secs, 10);
    }

    #[test]
    fn toml_roundtrip_preserves_values() {
        let mut config = Config::default();
        config.breathing.mode = BreathingMode::TwoPerson;
        config.loyalty.cooldown_minutes = 45;
        config.rng_seed = Some(99);

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.breathing.mode, BreathingMode::TwoPerson);
        assert_eq!(parsed.loyalty.cooldown_minutes, 45);
        assert_eq!(parsed.rng_seed, Some(99));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let parsed: Config = toml::from_str("[loyalty]\ncooldown_minutes = 30\n").unwrap();
        assert_eq!(parsed.loyalty.cooldown_minutes, 30);
        assert_eq!(parsed.loyalty.deadline_minutes, 7);
        assert_eq!(parsed.review.weekly_threshold, 75);
    }

    #[test]
    fn weekday_parsing() {
        let mut config = Config::default();
        assert_eq!(config.review_weekday().unwrap(), Weekday::Sun);
        config.review.weekday = "Wednesday".into();
        assert_eq!(config.review_weekday().unwrap(), Weekday::Wed);
        config.review.weekday = "someday".into();
        assert!(config.review_weekday().is_err());
    }
}
