//! Engagement thresholds for the feature-request prompt.
//!
//! All thresholds combine with AND logic: every one must hold for the prompt
//! to be eligible.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Upper bound for any day-valued threshold (about a century).
pub const MAX_DAYS: u32 = 36_500;

/// When stored session timestamps are filtered to the recent window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionRecency {
    /// Pruned only when a launch is logged; queries count what is stored.
    #[default]
    AtLaunch,
    /// Also filtered against the window at query time.
    Live,
}

/// Thresholds controlling prompt eligibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfiguration {
    /// Minimum app launches before showing a prompt.
    #[serde(default = "default_min_app_launch_count")]
    pub min_app_launch_count: u32,
    /// Minimum days since the first tracked launch.
    #[serde(default = "default_min_days_since_first_launch")]
    pub min_days_since_first_launch: u32,
    /// Minimum significant events logged by the host.
    #[serde(default = "default_min_significant_event_count")]
    pub min_significant_event_count: u32,
    /// Minimum sessions within the recent window.
    #[serde(default = "default_min_recent_session_count")]
    pub min_recent_session_count: u32,
    /// Width of the recent session window, in days.
    #[serde(default = "default_recent_session_window_days")]
    pub recent_session_window_days: u32,
    /// Minimum days between two presentations.
    #[serde(default = "default_cooldown_days")]
    pub cooldown_days: u32,
    /// Maximum presentations per trailing 365 days.
    #[serde(default = "default_max_prompts_per_year")]
    pub max_prompts_per_year: u32,
    #[serde(default)]
    pub session_recency: SessionRecency,
}

fn default_min_app_launch_count() -> u32 {
    5
}
fn default_min_days_since_first_launch() -> u32 {
    7
}
fn default_min_significant_event_count() -> u32 {
    3
}
fn default_min_recent_session_count() -> u32 {
    3
}
fn default_recent_session_window_days() -> u32 {
    14
}
fn default_cooldown_days() -> u32 {
    30
}
fn default_max_prompts_per_year() -> u32 {
    12
}

impl Default for PromptConfiguration {
    fn default() -> Self {
        Self {
            min_app_launch_count: default_min_app_launch_count(),
            min_days_since_first_launch: default_min_days_since_first_launch(),
            min_significant_event_count: default_min_significant_event_count(),
            min_recent_session_count: default_min_recent_session_count(),
            recent_session_window_days: default_recent_session_window_days(),
            cooldown_days: default_cooldown_days(),
            max_prompts_per_year: default_max_prompts_per_year(),
            session_recency: SessionRecency::default(),
        }
    }
}

impl PromptConfiguration {
    pub fn with_min_app_launch_count(mut self, count: u32) -> Self {
        self.min_app_launch_count = count;
        self
    }

    pub fn with_min_days_since_first_launch(mut self, days: u32) -> Self {
        self.min_days_since_first_launch = days;
        self
    }

    pub fn with_min_significant_event_count(mut self, count: u32) -> Self {
        self.min_significant_event_count = count;
        self
    }

    pub fn with_min_recent_session_count(mut self, count: u32) -> Self {
        self.min_recent_session_count = count;
        self
    }

    pub fn with_recent_session_window_days(mut self, days: u32) -> Self {
        self.recent_session_window_days = days;
        self
    }

    pub fn with_cooldown_days(mut self, days: u32) -> Self {
        self.cooldown_days = days;
        self
    }

    pub fn with_max_prompts_per_year(mut self, count: u32) -> Self {
        self.max_prompts_per_year = count;
        self
    }

    pub fn with_session_recency(mut self, recency: SessionRecency) -> Self {
        self.session_recency = recency;
        self
    }

    /// Reject configurations the evaluator cannot interpret.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` for a zero-day session window or any
    /// day-valued threshold above [`MAX_DAYS`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recent_session_window_days == 0 {
            return Err(ConfigError::InvalidValue {
                key: "recent_session_window_days".into(),
                message: "window must span at least one day".into(),
            });
        }

        let day_fields = [
            ("min_days_since_first_launch", self.min_days_since_first_launch),
            ("recent_session_window_days", self.recent_session_window_days),
            ("cooldown_days", self.cooldown_days),
        ];
        for (key, days) in day_fields {
            if days > MAX_DAYS {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("{days} exceeds the maximum of {MAX_DAYS} days"),
                });
            }
        }

        Ok(())
    }
}
