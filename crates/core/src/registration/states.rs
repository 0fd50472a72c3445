use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Main,
    Farm,
}

impl AccountKind {
    pub fn wire_value(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Farm => "farm",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "main" => Some(Self::Main),
            "farm" => Some(Self::Farm),
            _ => None,
        }
    }
}

/// Predefined status choices offered for a main account.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MainStatus {
    Fighter,
    Support,
    Vacation,
}

impl MainStatus {
    pub const ALL: [MainStatus; 3] = [Self::Fighter, Self::Support, Self::Vacation];

    pub fn wire_value(self) -> &'static str {
        match self {
            Self::Fighter => "fighter",
            Self::Support => "support",
            Self::Vacation => "vacation",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Fighter => "Fighter",
            Self::Support => "Support",
            Self::Vacation => "Vacation",
        }
    }

    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fighter" => Some(Self::Fighter),
            "support" => Some(Self::Support),
            "vacation" => Some(Self::Vacation),
            _ => None,
        }
    }
}

/// Steps of the interactive registration flow. Terminal outcomes are not
/// steps: a finished session is removed from the store, never parked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStep {
    SelectAccountType,
    SelectStatus,
    SelectFiller,
    LinkedIdForm,
    AwaitScreenshot,
    Confirm,
}

/// Reference to an attachment the user supplied as their screenshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScreenshotRef {
    pub url: String,
    pub content_type: Option<String>,
}

impl ScreenshotRef {
    /// Only attachments that declare an `image/*` content type count.
    pub fn is_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(|kind| kind.starts_with("image/"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistrationEvent {
    AccountKindChosen(AccountKind),
    StatusChosen(MainStatus),
    FillerChosen(bool),
    LinkedIdSubmitted(String),
    ScreenshotSupplied(ScreenshotRef),
    SubmitRequested,
    RestartRequested,
    CancelRequested,
}

impl RegistrationEvent {
    pub fn is_screenshot(&self) -> bool {
        matches!(self, Self::ScreenshotSupplied(_))
    }
}

/// UI follow-ups a transition asks the orchestrator to perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepAction {
    PromptAccountKind,
    PromptStatusSelect,
    PromptFillerSelect,
    OpenLinkedIdForm,
    PromptScreenshot,
    ShowConfirmSummary,
    SubmitRegistration,
}

/// Context handed to the transition table; lets the submit transition refuse
/// locally when required fields are still missing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlowContext {
    pub missing_required_fields: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepDisposition {
    Continue(RegistrationStep),
    Finished(FinishReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    Submitted,
    Cancelled,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub from: RegistrationStep,
    pub next: StepDisposition,
    pub actions: Vec<StepAction>,
}
