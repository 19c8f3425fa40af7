//! The prompt trigger: the one object a host holds.
//!
//! Composes a [`CounterStore`], a [`PromptConfiguration`] and a [`Clock`].
//! Mutators take `&mut self`, so a single owner serializes every state
//! transition. Hosts that share a trigger across threads wrap it themselves.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::configuration::PromptConfiguration;
use super::evaluator::{self, Eligibility};
use super::state::{self, to_epoch_seconds, EngagementState};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::storage::{keys, CounterStore, StoredValue};

/// Tracks engagement and decides when to show the feature-request prompt.
pub struct PromptTrigger<S, C = SystemClock> {
    configuration: PromptConfiguration,
    store: S,
    clock: C,
}

impl<S: CounterStore> PromptTrigger<S, SystemClock> {
    /// Trigger on the wall clock.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn with_system_clock(configuration: PromptConfiguration, store: S) -> Result<Self> {
        Self::new(configuration, store, SystemClock)
    }
}

impl<S: CounterStore, C: Clock> PromptTrigger<S, C> {
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn new(configuration: PromptConfiguration, store: S, clock: C) -> Result<Self> {
        configuration.validate()?;
        Ok(Self {
            configuration,
            store,
            clock,
        })
    }

    /// Build a trigger only when prompting is configured.
    ///
    /// `None` disables prompting: no trigger exists and the host skips every
    /// call.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid.
    pub fn enabled(
        configuration: Option<PromptConfiguration>,
        store: S,
        clock: C,
    ) -> Result<Option<Self>> {
        configuration
            .map(|configuration| Self::new(configuration, store, clock))
            .transpose()
    }

    pub fn configuration(&self) -> &PromptConfiguration {
        &self.configuration
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Next value of a counter. Reads strictly so a failed read never
    /// overwrites the stored count.
    fn next_count(&self, key: &str) -> Result<u64> {
        Ok(state::try_read_count(&self.store, key)?.saturating_add(1))
    }

    fn set_count(&mut self, key: &str, count: u64) -> Result<()> {
        let stored = i64::try_from(count).unwrap_or(i64::MAX);
        self.store.set(key, StoredValue::Integer(stored))?;
        Ok(())
    }

    fn set_dates(&mut self, key: &str, dates: &[DateTime<Utc>]) -> Result<()> {
        let seconds = dates.iter().map(|d| to_epoch_seconds(*d)).collect();
        self.store.set(key, StoredValue::Timestamps(seconds))?;
        Ok(())
    }

    // Event logging

    /// Log an app launch. Call once per launch.
    ///
    /// # Errors
    /// A failed read returns before anything is written. Otherwise returns the
    /// first store write that fails; earlier writes stay applied.
    pub fn log_app_launch(&mut self) -> Result<()> {
        let now = self.now();

        let first_launch = state::try_read_date(&self.store, keys::FIRST_LAUNCH_DATE)?;
        let launches = self.next_count(keys::APP_LAUNCH_COUNT)?;
        let mut sessions = state::try_read_dates(&self.store, keys::SESSION_TIMESTAMPS)?;
        sessions.push(now);
        let sessions = evaluator::prune_window(
            &sessions,
            now,
            self.configuration.recent_session_window_days,
        );

        if first_launch.is_none() {
            self.store.set(
                keys::FIRST_LAUNCH_DATE,
                StoredValue::Timestamp(to_epoch_seconds(now)),
            )?;
            debug!(%now, "first launch recorded");
        }
        self.set_count(keys::APP_LAUNCH_COUNT, launches)?;
        self.set_dates(keys::SESSION_TIMESTAMPS, &sessions)?;

        debug!(launches, recent_sessions = sessions.len(), "app launch logged");
        Ok(())
    }

    /// Log a host-defined significant event (finished onboarding, made a
    /// purchase, used a core feature).
    ///
    /// # Errors
    /// Returns an error if the store read or write fails.
    pub fn log_significant_event(&mut self) -> Result<()> {
        let events = self.next_count(keys::SIGNIFICANT_EVENT_COUNT)?;
        self.set_count(keys::SIGNIFICANT_EVENT_COUNT, events)?;
        debug!(events, "significant event logged");
        Ok(())
    }

    // Eligibility

    /// Evaluate every gate and report the first failure, if any.
    pub fn eligibility(&self) -> Eligibility {
        let now = self.now();
        let state = EngagementState::load(&self.store);
        let result = evaluator::evaluate(&self.configuration, &state, now);
        debug!(?result, "prompt eligibility evaluated");
        result
    }

    /// `true` when every engagement threshold is met and the prompt is not
    /// cooling down, opted out or over the annual cap.
    pub fn should_show_prompt(&self) -> bool {
        self.eligibility().is_eligible()
    }

    // Prompt lifecycle

    /// Record a presentation. Call only after the prompt was actually shown.
    ///
    /// # Errors
    /// A failed read returns before anything is written. Otherwise returns the
    /// first store write that fails; earlier writes stay applied.
    pub fn record_prompt_shown(&mut self) -> Result<()> {
        let now = self.now();

        let mut dates = evaluator::prompts_in_last_year(
            &state::try_read_dates(&self.store, keys::PROMPT_DATES_THIS_YEAR)?,
            now,
        );
        dates.push(now);
        let total = self.next_count(keys::TOTAL_PROMPTS_SHOWN)?;

        self.store.set(
            keys::LAST_PROMPT_DATE,
            StoredValue::Timestamp(to_epoch_seconds(now)),
        )?;
        self.set_dates(keys::PROMPT_DATES_THIS_YEAR, &dates)?;
        self.set_count(keys::TOTAL_PROMPTS_SHOWN, total)?;
        debug!(total, this_year = dates.len(), "prompt presentation recorded");
        Ok(())
    }

    /// The user asked never to see the prompt again.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub fn user_did_opt_out(&mut self) -> Result<()> {
        self.store.set(keys::USER_OPTED_OUT, StoredValue::Flag(true))?;
        debug!("user opted out of prompts");
        Ok(())
    }

    /// Clear the opt-out flag (e.g. from a settings toggle).
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub fn reset_opt_out(&mut self) -> Result<()> {
        self.store.set(keys::USER_OPTED_OUT, StoredValue::Flag(false))?;
        debug!("prompt opt-out cleared");
        Ok(())
    }

    /// Remove every engagement key (logout, testing).
    ///
    /// # Errors
    /// Returns the first removal that fails; earlier removals stay applied.
    pub fn reset_all_data(&mut self) -> Result<()> {
        self.store.remove_all(&keys::ALL)?;
        debug!("engagement data reset");
        Ok(())
    }

    // Read-only state

    pub fn is_opted_out(&self) -> bool {
        state::read_flag(&self.store, keys::USER_OPTED_OUT)
    }

    pub fn total_prompts_shown(&self) -> u64 {
        state::read_count(&self.store, keys::TOTAL_PROMPTS_SHOWN)
    }

    pub fn current_launch_count(&self) -> u64 {
        state::read_count(&self.store, keys::APP_LAUNCH_COUNT)
    }

    pub fn current_significant_event_count(&self) -> u64 {
        state::read_count(&self.store, keys::SIGNIFICANT_EVENT_COUNT)
    }

    /// Full engagement record as currently stored.
    pub fn snapshot(&self) -> EngagementState {
        EngagementState::load(&self.store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::{StoreError, StoreResult};
    use crate::storage::MemoryStore;
    use chrono::{Duration, TimeZone};
    use std::cell::Cell;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 8, 0, 0).unwrap()
    }

    fn trigger(
        config: PromptConfiguration,
    ) -> (PromptTrigger<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(start());
        let trigger = PromptTrigger::new(config, MemoryStore::new(), clock.clone()).unwrap();
        (trigger, clock)
    }

    #[test]
    fn first_launch_is_set_once() {
        let (mut trigger, clock) = trigger(PromptConfiguration::default());
        trigger.log_app_launch().unwrap();
        clock.advance(Duration::hours(5));
        trigger.log_app_launch().unwrap();

        let snapshot = trigger.snapshot();
        assert_eq!(snapshot.first_launch_date, Some(start()));
        assert_eq!(snapshot.app_launch_count, 2);
        assert_eq!(snapshot.session_timestamps.len(), 2);
    }

    #[test]
    fn sessions_are_pruned_at_launch() {
        let (mut trigger, clock) = trigger(PromptConfiguration::default());
        trigger.log_app_launch().unwrap();
        clock.advance_days(10);
        trigger.log_app_launch().unwrap();
        clock.advance_days(5);
        trigger.log_app_launch().unwrap();

        // The day-0 session is 15 days old at the third launch.
        let sessions = trigger.snapshot().session_timestamps;
        assert_eq!(sessions, vec![start() + Duration::days(10), start() + Duration::days(15)]);
    }

    #[test]
    fn record_prompt_shown_updates_history() {
        let (mut trigger, clock) = trigger(PromptConfiguration::default());
        trigger.record_prompt_shown().unwrap();
        clock.advance_days(40);
        trigger.record_prompt_shown().unwrap();

        let snapshot = trigger.snapshot();
        assert_eq!(snapshot.last_prompt_date, Some(start() + Duration::days(40)));
        assert_eq!(snapshot.prompt_dates.len(), 2);
        assert_eq!(trigger.total_prompts_shown(), 2);
    }

    #[test]
    fn prompt_history_drops_entries_older_than_a_year_on_write() {
        let (mut trigger, clock) = trigger(PromptConfiguration::default());
        trigger.record_prompt_shown().unwrap();
        clock.advance_days(400);
        trigger.record_prompt_shown().unwrap();

        assert_eq!(trigger.snapshot().prompt_dates, vec![start() + Duration::days(400)]);
        assert_eq!(trigger.total_prompts_shown(), 2);
    }

    #[test]
    fn opt_out_and_reset() {
        let (mut trigger, _clock) = trigger(PromptConfiguration::default());
        assert!(!trigger.is_opted_out());
        trigger.user_did_opt_out().unwrap();
        assert!(trigger.is_opted_out());
        trigger.reset_opt_out().unwrap();
        assert!(!trigger.is_opted_out());
    }

    #[test]
    fn reset_all_data_empties_store() {
        let (mut trigger, _clock) = trigger(PromptConfiguration::default());
        trigger.log_app_launch().unwrap();
        trigger.log_significant_event().unwrap();
        trigger.record_prompt_shown().unwrap();
        trigger.user_did_opt_out().unwrap();

        trigger.reset_all_data().unwrap();
        assert!(trigger.store().is_empty());
        assert_eq!(trigger.snapshot(), EngagementState::default());
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let config = PromptConfiguration::default().with_recent_session_window_days(0);
        let result = PromptTrigger::new(config, MemoryStore::new(), ManualClock::new(start()));
        assert!(result.is_err());
    }

    #[test]
    fn missing_configuration_disables_trigger() {
        let clock = ManualClock::new(start());
        let none = PromptTrigger::enabled(None, MemoryStore::new(), clock.clone()).unwrap();
        assert!(none.is_none());

        let config = Some(PromptConfiguration::default());
        let some = PromptTrigger::enabled(config, MemoryStore::new(), clock).unwrap();
        assert!(some.is_some());
    }

    #[test]
    fn system_clock_trigger_records_wall_time() {
        let before = Utc::now();
        let mut trigger =
            PromptTrigger::with_system_clock(PromptConfiguration::default(), MemoryStore::new())
                .unwrap();
        trigger.log_app_launch().unwrap();

        let first = trigger.snapshot().first_launch_date.unwrap();
        assert!(first >= before - Duration::seconds(1));
        assert!(first <= Utc::now() + Duration::seconds(1));
    }

    struct ReadOnlyStore(MemoryStore);

    impl CounterStore for ReadOnlyStore {
        fn get(&self, key: &str) -> StoreResult<Option<StoredValue>> {
            self.0.get(key)
        }
        fn set(&mut self, _key: &str, _value: StoredValue) -> StoreResult<()> {
            Err(StoreError::QueryFailed("attempt to write a readonly database".into()))
        }
        fn remove(&mut self, _key: &str) -> StoreResult<()> {
            Err(StoreError::QueryFailed("attempt to write a readonly database".into()))
        }
    }

    #[test]
    fn write_failures_propagate_and_reads_still_answer() {
        let clock = ManualClock::new(start());
        let store = ReadOnlyStore(MemoryStore::new());
        let mut trigger =
            PromptTrigger::new(PromptConfiguration::default(), store, clock).unwrap();

        assert!(trigger.log_app_launch().is_err());
        assert!(trigger.user_did_opt_out().is_err());
        assert!(!trigger.should_show_prompt());
        assert_eq!(trigger.current_launch_count(), 0);
    }

    /// Memory store that fails exactly one read after `n` successful ones.
    struct FlakyStore {
        inner: MemoryStore,
        fail_after: Cell<Option<usize>>,
    }

    impl FlakyStore {
        fn fail_once_after(&self, n: usize) {
            self.fail_after.set(Some(n));
        }
    }

    impl CounterStore for FlakyStore {
        fn get(&self, key: &str) -> StoreResult<Option<StoredValue>> {
            match self.fail_after.get() {
                Some(0) => {
                    self.fail_after.set(None);
                    return Err(StoreError::Locked);
                }
                Some(n) => self.fail_after.set(Some(n - 1)),
                None => {}
            }
            self.inner.get(key)
        }
        fn set(&mut self, key: &str, value: StoredValue) -> StoreResult<()> {
            self.inner.set(key, value)
        }
        fn remove(&mut self, key: &str) -> StoreResult<()> {
            self.inner.remove(key)
        }
    }

    #[test]
    fn failed_reads_leave_counters_untouched() {
        let clock = ManualClock::new(start());
        let store = FlakyStore {
            inner: MemoryStore::new(),
            fail_after: Cell::new(None),
        };
        let mut trigger =
            PromptTrigger::new(PromptConfiguration::default(), store, clock.clone()).unwrap();
        for _ in 0..5 {
            trigger.log_app_launch().unwrap();
            trigger.log_significant_event().unwrap();
        }
        trigger.record_prompt_shown().unwrap();
        clock.advance_days(3);
        let before = trigger.snapshot();

        // A launch reads three keys; fail each one in turn.
        for successful in 0..3 {
            trigger.store().fail_once_after(successful);
            assert!(matches!(
                trigger.log_app_launch(),
                Err(crate::error::CoreError::Store(StoreError::Locked))
            ));
            assert_eq!(trigger.snapshot(), before);
        }

        trigger.store().fail_once_after(0);
        assert!(trigger.log_significant_event().is_err());
        assert_eq!(trigger.snapshot(), before);

        for successful in 0..2 {
            trigger.store().fail_once_after(successful);
            assert!(trigger.record_prompt_shown().is_err());
            assert_eq!(trigger.snapshot(), before);
        }

        assert_eq!(before.app_launch_count, 5);
        assert_eq!(before.significant_event_count, 5);
        assert_eq!(before.total_prompts_shown, 1);
        assert_eq!(before.first_launch_date, Some(start()));

        trigger.log_app_launch().unwrap();
        assert_eq!(trigger.current_launch_count(), 6);
    }

    #[test]
    fn wrong_kind_counter_is_not_overwritten() {
        let (mut trigger, _clock) = trigger(PromptConfiguration::default());
        trigger
            .store
            .set(keys::SIGNIFICANT_EVENT_COUNT, StoredValue::Flag(true))
            .unwrap();

        assert!(trigger.log_significant_event().is_err());
        assert_eq!(
            trigger.store().get(keys::SIGNIFICANT_EVENT_COUNT).unwrap(),
            Some(StoredValue::Flag(true))
        );
    }
}
