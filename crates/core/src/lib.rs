pub mod config;
pub mod envelope;
pub mod errors;
pub mod export;
pub mod registration;

pub use envelope::{BackendResult, CommandEnvelope, ResultStatus};
pub use errors::CommandError;
pub use export::{Cell, CellFormat, ExportSpec, SheetGrid};
pub use registration::{
    AccountKind, Advance, FinishReason, FlowContext, MainStatus, PromptKey, RegistrationEvent,
    RegistrationSession, RegistrationStep, ScreenshotRef, SessionError, SessionStore, StepAction,
    TransitionError,
};
