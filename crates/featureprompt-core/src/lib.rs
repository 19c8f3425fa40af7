//! # featureprompt Core Library
//!
//! An embeddable engine that decides whether and when a host application
//! should surface its in-app feature-request prompt. The host owns the UI;
//! this crate owns the decision and the durable counters behind it.
//!
//! ## Architecture
//!
//! - **Clock**: injectable time source so day arithmetic is testable
//! - **Storage**: a key/value [`CounterStore`] (SQLite or in-memory) and the
//!   TOML-based [`Config`]
//! - **Prompt**: thresholds, the pure eligibility evaluator, the
//!   [`PromptTrigger`] facade and per-session presentation gating
//!
//! The engine is single-owner: every mutation goes through `&mut PromptTrigger`.
//! There is no global instance; the host creates one and passes it to the code
//! that needs it.

pub mod clock;
pub mod error;
pub mod prompt;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, StoreError};
pub use prompt::{
    Blocker, Eligibility, EngagementState, PromptConfiguration, PromptCopy, PromptSession,
    PromptTrigger, SessionRecency,
};
pub use storage::{Config, CounterStore, MemoryStore, SqliteStore, StoredValue};
