pub mod engine;
pub mod session;
pub mod states;

pub use engine::{initial_step, transition, TransitionError};
pub use session::{
    Advance, PromptKey, RegistrationSession, SessionError, SessionStore, SCREENSHOT_TIMEOUT,
    SELECTION_TIMEOUT,
};
pub use states::{
    AccountKind, FinishReason, FlowContext, MainStatus, RegistrationEvent, RegistrationStep,
    ScreenshotRef, StepAction, StepDisposition, TransitionOutcome,
};
