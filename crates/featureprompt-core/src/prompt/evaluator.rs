//! Eligibility evaluation for the feature-request prompt.
//!
//! [`evaluate`] is a pure function of configuration, engagement snapshot and
//! the current instant. Gates are checked in a fixed order and evaluation stops
//! at the first one that fails:
//!
//! 1. not opted out
//! 2. enough days since the first launch
//! 3. enough launches
//! 4. enough significant events
//! 5. enough recent sessions
//! 6. cooldown since the last prompt has elapsed
//! 7. under the annual cap
//!
//! Day differences are `floor(elapsed_seconds / 86_400)` between two UTC
//! instants. No calendar or time zone is involved.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::configuration::{PromptConfiguration, SessionRecency};
use super::state::EngagementState;

const SECONDS_PER_DAY: i64 = 86_400;

/// Width of the annual-cap window, in days.
pub const ANNUAL_WINDOW_DAYS: u32 = 365;

/// The first gate that rejected the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum Blocker {
    OptedOut,
    NoFirstLaunch,
    TooSoonSinceFirstLaunch { days: i64, required: u32 },
    NotEnoughLaunches { count: u64, required: u32 },
    NotEnoughSignificantEvents { count: u64, required: u32 },
    NotEnoughRecentSessions { count: usize, required: u32 },
    CoolingDown { days_since_last: i64, cooldown_days: u32 },
    AnnualCapReached { shown: usize, cap: u32 },
}

/// Outcome of an eligibility check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    Blocked { blocker: Blocker },
}

impl Eligibility {
    pub fn is_eligible(&self) -> bool {
        matches!(self, Eligibility::Eligible)
    }

    pub fn blocker(&self) -> Option<&Blocker> {
        match self {
            Eligibility::Eligible => None,
            Eligibility::Blocked { blocker } => Some(blocker),
        }
    }
}

impl From<Blocker> for Eligibility {
    fn from(blocker: Blocker) -> Self {
        Eligibility::Blocked { blocker }
    }
}

/// Whole days elapsed from `from` to `to`, floored.
///
/// Negative when `to` precedes `from`.
pub fn days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Earliest instant still inside a trailing window of `days` ending at `now`.
fn window_start(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Keep only instants whose age at `now` is at most `days` days.
pub fn prune_window(
    timestamps: &[DateTime<Utc>],
    now: DateTime<Utc>,
    days: u32,
) -> Vec<DateTime<Utc>> {
    let cutoff = window_start(now, days);
    timestamps.iter().copied().filter(|t| *t >= cutoff).collect()
}

/// Presentations within the trailing 365 days.
pub fn prompts_in_last_year(dates: &[DateTime<Utc>], now: DateTime<Utc>) -> Vec<DateTime<Utc>> {
    prune_window(dates, now, ANNUAL_WINDOW_DAYS)
}

/// Sessions counted towards the recent-session threshold.
pub fn recent_session_count(
    config: &PromptConfiguration,
    state: &EngagementState,
    now: DateTime<Utc>,
) -> usize {
    match config.session_recency {
        SessionRecency::AtLaunch => state.session_timestamps.len(),
        SessionRecency::Live => {
            let cutoff = window_start(now, config.recent_session_window_days);
            state.session_timestamps.iter().filter(|t| **t >= cutoff).count()
        }
    }
}

/// Check every gate in order and report the first failure.
pub fn evaluate(
    config: &PromptConfiguration,
    state: &EngagementState,
    now: DateTime<Utc>,
) -> Eligibility {
    if state.user_opted_out {
        return Blocker::OptedOut.into();
    }

    let Some(first_launch) = state.first_launch_date else {
        return Blocker::NoFirstLaunch.into();
    };
    let days = days_between(first_launch, now);
    if days < i64::from(config.min_days_since_first_launch) {
        return Blocker::TooSoonSinceFirstLaunch {
            days,
            required: config.min_days_since_first_launch,
        }
        .into();
    }

    if state.app_launch_count < u64::from(config.min_app_launch_count) {
        return Blocker::NotEnoughLaunches {
            count: state.app_launch_count,
            required: config.min_app_launch_count,
        }
        .into();
    }

    if state.significant_event_count < u64::from(config.min_significant_event_count) {
        return Blocker::NotEnoughSignificantEvents {
            count: state.significant_event_count,
            required: config.min_significant_event_count,
        }
        .into();
    }

    let sessions = recent_session_count(config, state, now);
    if sessions < config.min_recent_session_count as usize {
        return Blocker::NotEnoughRecentSessions {
            count: sessions,
            required: config.min_recent_session_count,
        }
        .into();
    }

    if let Some(last_prompt) = state.last_prompt_date {
        let days_since_last = days_between(last_prompt, now);
        if days_since_last < i64::from(config.cooldown_days) {
            return Blocker::CoolingDown {
                days_since_last,
                cooldown_days: config.cooldown_days,
            }
            .into();
        }
    }

    let shown = prompts_in_last_year(&state.prompt_dates, now).len();
    if shown >= config.max_prompts_per_year as usize {
        return Blocker::AnnualCapReached {
            shown,
            cap: config.max_prompts_per_year,
        }
        .into();
    }

    Eligibility::Eligible
}
