//! Engagement-gated feature-request prompt.
//!
//! - [`PromptConfiguration`]: thresholds
//! - [`EngagementState`]: snapshot of the persisted counters
//! - [`evaluate`]: the pure eligibility gate
//! - [`PromptTrigger`]: the facade a host owns
//! - [`PromptSession`]: per-session presentation gating

pub mod configuration;
pub mod evaluator;
pub mod session;
pub mod state;
pub mod trigger;

pub use configuration::{PromptConfiguration, SessionRecency};
pub use evaluator::{days_between, evaluate, Blocker, Eligibility};
pub use session::{PromptCopy, PromptOutcome, PromptPhase, PromptRequest, PromptSession};
pub use state::EngagementState;
pub use trigger::PromptTrigger;
