//! Snapshot of the persisted engagement record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::storage::{keys, CounterStore, StoredValue};

/// The eight persisted engagement fields, read in one pass.
///
/// Absent keys take their zero/empty defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngagementState {
    pub first_launch_date: Option<DateTime<Utc>>,
    pub app_launch_count: u64,
    pub significant_event_count: u64,
    pub session_timestamps: Vec<DateTime<Utc>>,
    pub last_prompt_date: Option<DateTime<Utc>>,
    /// Every recorded presentation, unfiltered.
    pub prompt_dates: Vec<DateTime<Utc>>,
    pub total_prompts_shown: u64,
    pub user_opted_out: bool,
}

impl EngagementState {
    /// Read the full record from `store`.
    ///
    /// Never fails: a storage error or a value of the wrong kind is logged and
    /// the field falls back to its default.
    pub fn load<S: CounterStore + ?Sized>(store: &S) -> Self {
        Self {
            first_launch_date: read_date(store, keys::FIRST_LAUNCH_DATE),
            app_launch_count: read_count(store, keys::APP_LAUNCH_COUNT),
            significant_event_count: read_count(store, keys::SIGNIFICANT_EVENT_COUNT),
            session_timestamps: read_dates(store, keys::SESSION_TIMESTAMPS),
            last_prompt_date: read_date(store, keys::LAST_PROMPT_DATE),
            prompt_dates: read_dates(store, keys::PROMPT_DATES_THIS_YEAR),
            total_prompts_shown: read_count(store, keys::TOTAL_PROMPTS_SHOWN),
            user_opted_out: read_flag(store, keys::USER_OPTED_OUT),
        }
    }
}

/// Convert an instant to the persisted epoch-seconds form.
pub fn to_epoch_seconds(instant: DateTime<Utc>) -> f64 {
    instant.timestamp_micros() as f64 / 1_000_000.0
}

/// Convert persisted epoch seconds back to an instant.
///
/// Non-positive or non-finite values mean "absent".
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return None;
    }
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

fn wrong_kind(key: &str, value: &StoredValue, expected: &str) -> StoreError {
    StoreError::Encoding {
        key: key.to_string(),
        message: format!("expected {expected}, found {value:?}"),
    }
}

/// Strict read of a counter. Absent is zero; errors and wrong kinds propagate.
pub(crate) fn try_read_count<S: CounterStore + ?Sized>(store: &S, key: &str) -> StoreResult<u64> {
    match store.get(key)? {
        None => Ok(0),
        Some(value) => value
            .as_integer()
            .map(|n| n.max(0) as u64)
            .ok_or_else(|| wrong_kind(key, &value, "integer")),
    }
}

pub(crate) fn try_read_flag<S: CounterStore + ?Sized>(store: &S, key: &str) -> StoreResult<bool> {
    match store.get(key)? {
        None => Ok(false),
        Some(value) => value
            .as_flag()
            .ok_or_else(|| wrong_kind(key, &value, "flag")),
    }
}

pub(crate) fn try_read_date<S: CounterStore + ?Sized>(
    store: &S,
    key: &str,
) -> StoreResult<Option<DateTime<Utc>>> {
    match store.get(key)? {
        None => Ok(None),
        Some(value) => value
            .as_timestamp()
            .map(from_epoch_seconds)
            .ok_or_else(|| wrong_kind(key, &value, "timestamp")),
    }
}

pub(crate) fn try_read_dates<S: CounterStore + ?Sized>(
    store: &S,
    key: &str,
) -> StoreResult<Vec<DateTime<Utc>>> {
    match store.get(key)? {
        None => Ok(Vec::new()),
        Some(value) => value
            .as_timestamps()
            .map(|list| list.iter().filter_map(|s| from_epoch_seconds(*s)).collect())
            .ok_or_else(|| wrong_kind(key, &value, "timestamp list")),
    }
}

fn lenient<T: Default>(key: &str, result: StoreResult<T>) -> T {
    result.unwrap_or_else(|e| {
        warn!(key, error = %e, "engagement read failed, using default");
        T::default()
    })
}

pub(crate) fn read_count<S: CounterStore + ?Sized>(store: &S, key: &str) -> u64 {
    lenient(key, try_read_count(store, key))
}

pub(crate) fn read_flag<S: CounterStore + ?Sized>(store: &S, key: &str) -> bool {
    lenient(key, try_read_flag(store, key))
}

pub(crate) fn read_date<S: CounterStore + ?Sized>(store: &S, key: &str) -> Option<DateTime<Utc>> {
    lenient(key, try_read_date(store, key))
}

pub(crate) fn read_dates<S: CounterStore + ?Sized>(store: &S, key: &str) -> Vec<DateTime<Utc>> {
    lenient(key, try_read_dates(store, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    struct FailingStore;

    impl CounterStore for FailingStore {
        fn get(&self, _key: &str) -> StoreResult<Option<StoredValue>> {
            Err(StoreError::Locked)
        }
        fn set(&mut self, _key: &str, _value: StoredValue) -> StoreResult<()> {
            Err(StoreError::Locked)
        }
        fn remove(&mut self, _key: &str) -> StoreResult<()> {
            Err(StoreError::Locked)
        }
    }

    #[test]
    fn empty_store_loads_defaults() {
        let store = MemoryStore::new();
        assert_eq!(EngagementState::load(&store), EngagementState::default());
    }

    #[test]
    fn failing_store_loads_defaults() {
        assert_eq!(EngagementState::load(&FailingStore), EngagementState::default());
    }

    #[test]
    fn wrong_kinds_fall_back_to_defaults() {
        let mut store = MemoryStore::new();
        store.set(keys::APP_LAUNCH_COUNT, StoredValue::Flag(true)).unwrap();
        store.set(keys::USER_OPTED_OUT, StoredValue::Integer(1)).unwrap();
        store.set(keys::SESSION_TIMESTAMPS, StoredValue::Timestamp(5.0)).unwrap();

        let state = EngagementState::load(&store);
        assert_eq!(state.app_launch_count, 0);
        assert!(!state.user_opted_out);
        assert!(state.session_timestamps.is_empty());
    }

    #[test]
    fn strict_reads_surface_failures_and_wrong_kinds() {
        let mut store = MemoryStore::new();
        store.set(keys::APP_LAUNCH_COUNT, StoredValue::Flag(true)).unwrap();

        assert!(matches!(
            try_read_count(&store, keys::APP_LAUNCH_COUNT),
            Err(StoreError::Encoding { .. })
        ));
        assert_eq!(try_read_count(&store, keys::SIGNIFICANT_EVENT_COUNT).unwrap(), 0);
        assert!(matches!(
            try_read_dates(&FailingStore, keys::SESSION_TIMESTAMPS),
            Err(StoreError::Locked)
        ));
        assert!(try_read_date(&FailingStore, keys::FIRST_LAUNCH_DATE).is_err());
    }

    #[test]
    fn non_positive_timestamps_are_absent() {
        let mut store = MemoryStore::new();
        store.set(keys::FIRST_LAUNCH_DATE, StoredValue::Timestamp(0.0)).unwrap();
        store.set(keys::LAST_PROMPT_DATE, StoredValue::Timestamp(f64::NAN)).unwrap();

        let state = EngagementState::load(&store);
        assert!(state.first_launch_date.is_none());
        assert!(state.last_prompt_date.is_none());
    }

    #[test]
    fn epoch_seconds_roundtrip_keeps_microseconds() {
        let instant = Utc.with_ymd_and_hms(2025, 3, 9, 12, 30, 15).unwrap()
            + chrono::Duration::microseconds(250);
        assert_eq!(from_epoch_seconds(to_epoch_seconds(instant)), Some(instant));
    }
}
