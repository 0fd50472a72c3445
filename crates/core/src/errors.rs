use thiserror::Error;

use crate::registration::SessionError;

/// Command-layer fault taxonomy. The `Display` impl carries the diagnostic
/// that goes to the log; `user_message` is the only text that reaches chat.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command `{command}` invoked outside its permitted channel")]
    WrongChannel { command: String },
    #[error("command `{command}` has no permitted channel configured")]
    MissingChannelBinding { command: String },
    #[error("backend endpoint is not configured")]
    BackendUnconfigured,
    #[error("invalid input: {0}")]
    Input(String),
    #[error("attachment download failed: {0}")]
    Media(String),
    #[error("backend transport failure: {0}")]
    Transport(String),
    #[error("chat platform failure: {0}")]
    Platform(String),
    #[error(transparent)]
    Workflow(#[from] SessionError),
}

impl CommandError {
    pub fn user_message(&self) -> String {
        match self {
            Self::WrongChannel { command } => {
                format!("`/{command}` can only be used in its designated channel.")
            }
            Self::MissingChannelBinding { command } => format!(
                "`/{command}` is not configured yet. Ask an administrator to set its channel."
            ),
            Self::BackendUnconfigured => {
                "The stats backend endpoint is not configured. Ask an administrator to set it."
                    .to_owned()
            }
            Self::Input(message) => message.clone(),
            Self::Media(_) => {
                "The attached file could not be downloaded. Please try again.".to_owned()
            }
            Self::Transport(_) => {
                "The stats backend could not be reached. Please try again later.".to_owned()
            }
            Self::Platform(_) => {
                "Something went wrong talking to Discord. Please try again.".to_owned()
            }
            Self::Workflow(error) => workflow_user_message(error),
        }
    }
}

fn workflow_user_message(error: &SessionError) -> String {
    match error {
        SessionError::NotFound => {
            "This registration prompt is no longer active. Run `/register` to start over."
                .to_owned()
        }
        SessionError::Expired => {
            "Your registration timed out. Run `/register` to start over.".to_owned()
        }
        SessionError::NotOwner => {
            "This registration belongs to another user.".to_owned()
        }
        SessionError::Transition(transition) => {
            use crate::registration::TransitionError::{
                InvalidAttachment, InvalidTransition, MissingRequiredFields,
            };
            match transition {
                MissingRequiredFields { missing_fields } => format!(
                    "Cannot submit yet, still missing: {}.",
                    missing_fields.join(", ")
                ),
                InvalidTransition { .. } => {
                    "That action does not match the current registration step.".to_owned()
                }
                InvalidAttachment { content_type } => format!(
                    "`{content_type}` is not an image. Registration was cancelled; run \
                     `/register` to start over."
                ),
            }
        }
    }
}
