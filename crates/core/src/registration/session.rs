use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::registration::engine::{initial_step, transition, TransitionError};
use crate::registration::states::{
    AccountKind, FinishReason, FlowContext, MainStatus, RegistrationEvent, RegistrationStep,
    ScreenshotRef, StepAction, StepDisposition,
};

/// Deadline for the selection and confirm steps.
pub const SELECTION_TIMEOUT: Duration = Duration::from_secs(300);
/// Deadline once a screenshot is being awaited.
pub const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(120);

/// Identifier of the interactive prompt message a session is attached to.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PromptKey(pub String);

impl PromptKey {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self(message_id.into())
    }
}

/// One in-flight registration. Ephemeral: lives only in the store, dies with
/// the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrationSession {
    pub owner_id: String,
    pub channel_id: String,
    pub step: RegistrationStep,
    pub account_kind: Option<AccountKind>,
    pub status: Option<MainStatus>,
    pub filler: Option<bool>,
    pub linked_id: Option<String>,
    pub screenshot: Option<ScreenshotRef>,
    deadline: Instant,
}

impl RegistrationSession {
    fn new(owner_id: String, channel_id: String, now: Instant) -> Self {
        Self {
            owner_id,
            channel_id,
            step: initial_step(),
            account_kind: None,
            status: None,
            filler: None,
            linked_id: None,
            screenshot: None,
            deadline: now + SELECTION_TIMEOUT,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }

    /// Required fields still missing for submission, in prompt order.
    pub fn missing_required_fields(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.account_kind == Some(AccountKind::Farm) && self.linked_id.is_none() {
            missing.push("linked governor id".to_owned());
        }
        if self.screenshot.is_none() {
            missing.push("screenshot".to_owned());
        }
        missing
    }

    fn context(&self) -> FlowContext {
        FlowContext { missing_required_fields: self.missing_required_fields() }
    }

    fn record_event(&mut self, event: &RegistrationEvent) {
        match event {
            RegistrationEvent::AccountKindChosen(kind) => self.account_kind = Some(*kind),
            RegistrationEvent::StatusChosen(status) => self.status = Some(*status),
            RegistrationEvent::FillerChosen(filler) => self.filler = Some(*filler),
            RegistrationEvent::LinkedIdSubmitted(linked_id) => {
                // Stored verbatim; only the input widget bounds apply.
                self.linked_id = Some(linked_id.clone());
            }
            RegistrationEvent::ScreenshotSupplied(screenshot) => {
                self.screenshot = Some(screenshot.clone());
            }
            RegistrationEvent::RestartRequested => {
                self.account_kind = None;
                self.status = None;
                self.filler = None;
                self.linked_id = None;
                self.screenshot = None;
            }
            RegistrationEvent::SubmitRequested | RegistrationEvent::CancelRequested => {}
        }
    }

    fn refresh_deadline(&mut self, now: Instant) {
        let timeout = match self.step {
            RegistrationStep::AwaitScreenshot => SCREENSHOT_TIMEOUT,
            _ => SELECTION_TIMEOUT,
        };
        self.deadline = now + timeout;
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active registration session for this message")]
    NotFound,
    #[error("registration session expired")]
    Expired,
    #[error("registration session belongs to another user")]
    NotOwner,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// Result of advancing a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The session moved to a new step; `session` is a post-transition
    /// snapshot for rendering.
    Progressed { actions: Vec<StepAction>, session: RegistrationSession },
    /// The session reached a terminal outcome and was removed.
    Finished { reason: FinishReason, session: RegistrationSession },
    /// A screenshot arrived out of step or from a non-owner; dropped with no
    /// state change.
    ScreenshotIgnored,
}

/// Process-wide map of in-flight registrations, keyed by prompt message.
///
/// Single-owner mutation is enforced by comparing the acting user on every
/// advance, and the expiry deadline is checked on every access. There is no
/// background sweeper; expired entries are removed the next time they are
/// touched.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<HashMap<PromptKey, RegistrationSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session for `key`, replacing any stale entry under the same
    /// key so the one-session-per-prompt invariant holds.
    pub fn begin(
        &self,
        key: PromptKey,
        owner_id: impl Into<String>,
        channel_id: impl Into<String>,
        now: Instant,
    ) {
        let session = RegistrationSession::new(owner_id.into(), channel_id.into(), now);
        self.inner.lock().expect("session store poisoned").insert(key, session);
    }

    pub fn contains(&self, key: &PromptKey) -> bool {
        self.inner.lock().expect("session store poisoned").contains_key(key)
    }

    /// Applies one event to the session under `key` on behalf of `actor_id`.
    pub fn advance(
        &self,
        key: &PromptKey,
        actor_id: &str,
        event: RegistrationEvent,
        now: Instant,
    ) -> Result<Advance, SessionError> {
        let mut sessions = self.inner.lock().expect("session store poisoned");
        let Some(session) = sessions.get_mut(key) else {
            return Err(SessionError::NotFound);
        };

        if session.is_expired(now) {
            sessions.remove(key);
            return Err(SessionError::Expired);
        }

        if session.owner_id != actor_id {
            if event.is_screenshot() {
                return Ok(Advance::ScreenshotIgnored);
            }
            return Err(SessionError::NotOwner);
        }

        let outcome = match transition(&session.step, &event, &session.context()) {
            Ok(outcome) => outcome,
            Err(TransitionError::InvalidTransition { .. }) if event.is_screenshot() => {
                return Ok(Advance::ScreenshotIgnored);
            }
            Err(error @ TransitionError::InvalidAttachment { .. }) => {
                // Invalid file terminates the session outright.
                sessions.remove(key);
                return Err(error.into());
            }
            Err(error) => return Err(error.into()),
        };

        session.record_event(&event);
        match outcome.next {
            StepDisposition::Continue(step) => {
                session.step = step;
                session.refresh_deadline(now);
                Ok(Advance::Progressed { actions: outcome.actions, session: session.clone() })
            }
            StepDisposition::Finished(reason) => {
                let session = sessions.remove(key).expect("session present under lock");
                Ok(Advance::Finished { reason, session })
            }
        }
    }

    /// Removes a session without applying an event (unrecoverable error
    /// teardown path).
    pub fn discard(&self, key: &PromptKey) -> Option<RegistrationSession> {
        self.inner.lock().expect("session store poisoned").remove(key)
    }
}
