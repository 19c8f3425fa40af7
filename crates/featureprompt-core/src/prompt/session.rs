//! Per-session presentation gating.
//!
//! The host's UI layer drives a [`PromptSession`] from its lifecycle hooks:
//! foreground transitions ask whether to present, the renderer confirms that
//! it did, and user actions (dismiss, opt out, accept) close the prompt. The
//! session never renders anything itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::trigger::PromptTrigger;
use crate::clock::Clock;
use crate::error::Result;
use crate::storage::CounterStore;

/// Text shown in the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptCopy {
    #[serde(default = "default_message")]
    pub message: String,
    #[serde(default = "default_cta_text")]
    pub cta_text: String,
}

fn default_message() -> String {
    "Help shape this app!".into()
}

fn default_cta_text() -> String {
    "Share a Feature Request".into()
}

impl Default for PromptCopy {
    fn default() -> Self {
        Self {
            message: default_message(),
            cta_text: default_cta_text(),
        }
    }
}

/// Instruction to the host to render the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptRequest {
    pub copy: PromptCopy,
    /// Shown on request, bypassing eligibility.
    pub forced: bool,
}

/// Where the session is in one prompt's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptPhase {
    /// Nothing on screen.
    Idle,
    /// Host was asked to render; not yet confirmed.
    Pending,
    /// Host confirmed the prompt is on screen.
    Presented,
}

/// What the host should do after the user tapped the call-to-action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    OpenFeatureList,
    Nothing,
}

/// Presentation state for one app session.
#[derive(Debug, Clone)]
pub struct PromptSession {
    copy: PromptCopy,
    phase: PromptPhase,
    forced: bool,
    checked_this_session: bool,
}

impl Default for PromptSession {
    fn default() -> Self {
        Self::new(PromptCopy::default())
    }
}

impl PromptSession {
    pub fn new(copy: PromptCopy) -> Self {
        Self {
            copy,
            phase: PromptPhase::Idle,
            forced: false,
            checked_this_session: false,
        }
    }

    pub fn phase(&self) -> PromptPhase {
        self.phase
    }

    pub fn copy(&self) -> &PromptCopy {
        &self.copy
    }

    pub fn has_checked(&self) -> bool {
        self.checked_this_session
    }

    fn request(&mut self, forced: bool) -> PromptRequest {
        self.phase = PromptPhase::Pending;
        self.forced = forced;
        PromptRequest {
            copy: self.copy.clone(),
            forced,
        }
    }

    /// Call when the app becomes active.
    ///
    /// Eligibility is evaluated at most once per session and never while a
    /// prompt is pending or on screen. A disabled engine (`None`) never
    /// prompts.
    pub fn on_foreground<S: CounterStore, C: Clock>(
        &mut self,
        trigger: Option<&PromptTrigger<S, C>>,
    ) -> Option<PromptRequest> {
        if self.checked_this_session || self.phase != PromptPhase::Idle {
            return None;
        }
        self.checked_this_session = true;

        let trigger = trigger?;
        if !trigger.should_show_prompt() {
            return None;
        }
        debug!("prompt requested on foreground");
        Some(self.request(false))
    }

    /// Show the prompt now regardless of eligibility.
    ///
    /// Returns `None` if a prompt is already pending or on screen.
    pub fn force_show(&mut self) -> Option<PromptRequest> {
        if self.phase != PromptPhase::Idle {
            return None;
        }
        debug!("prompt forced");
        Some(self.request(true))
    }

    /// The host rendered the pending prompt.
    ///
    /// Eligibility-driven presentations are recorded against the cooldown and
    /// annual cap; forced ones are not. Does nothing unless a prompt is
    /// pending.
    ///
    /// # Errors
    /// Returns an error if recording the presentation fails. The phase still
    /// advances since the prompt is on screen.
    pub fn confirm_presented<S: CounterStore, C: Clock>(
        &mut self,
        trigger: Option<&mut PromptTrigger<S, C>>,
    ) -> Result<()> {
        if self.phase != PromptPhase::Pending {
            return Ok(());
        }
        self.phase = PromptPhase::Presented;
        match trigger {
            Some(trigger) if !self.forced => trigger.record_prompt_shown(),
            _ => Ok(()),
        }
    }

    /// Close the prompt without further action.
    pub fn dismiss(&mut self) {
        if self.phase != PromptPhase::Idle {
            debug!("prompt dismissed");
        }
        self.phase = PromptPhase::Idle;
        self.forced = false;
    }

    /// "Don't show again": record the opt-out and close the prompt.
    ///
    /// # Errors
    /// Returns an error if the opt-out could not be stored. The prompt is
    /// closed either way.
    pub fn opt_out<S: CounterStore, C: Clock>(
        &mut self,
        trigger: Option<&mut PromptTrigger<S, C>>,
    ) -> Result<()> {
        self.dismiss();
        match trigger {
            Some(trigger) => trigger.user_did_opt_out(),
            None => Ok(()),
        }
    }

    /// The user tapped the call-to-action.
    pub fn accept(&mut self) -> PromptOutcome {
        if self.phase == PromptPhase::Idle {
            return PromptOutcome::Nothing;
        }
        self.dismiss();
        PromptOutcome::OpenFeatureList
    }
}
