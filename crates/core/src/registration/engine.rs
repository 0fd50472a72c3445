use thiserror::Error;

use crate::registration::states::{
    AccountKind, FinishReason, FlowContext, RegistrationEvent, RegistrationStep, StepAction,
    StepDisposition, TransitionOutcome,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("submission refused, missing required fields: {missing_fields:?}")]
    MissingRequiredFields { missing_fields: Vec<String> },
    #[error("invalid transition from {step:?} using event {event:?}")]
    InvalidTransition { step: RegistrationStep, event: RegistrationEvent },
    #[error("attachment `{content_type}` is not an image")]
    InvalidAttachment { content_type: String },
}

pub fn initial_step() -> RegistrationStep {
    RegistrationStep::SelectAccountType
}

/// The registration transition table. Every (step, event) pair not listed
/// here is rejected; nothing advances through scattered guards.
pub fn transition(
    current: &RegistrationStep,
    event: &RegistrationEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, TransitionError> {
    use RegistrationEvent::{
        AccountKindChosen, CancelRequested, FillerChosen, LinkedIdSubmitted, RestartRequested,
        ScreenshotSupplied, StatusChosen, SubmitRequested,
    };
    use RegistrationStep::{
        AwaitScreenshot, Confirm, LinkedIdForm, SelectAccountType, SelectFiller, SelectStatus,
    };
    use StepAction::{
        OpenLinkedIdForm, PromptAccountKind, PromptFillerSelect, PromptScreenshot,
        PromptStatusSelect, ShowConfirmSummary, SubmitRegistration,
    };

    let (next, actions) = match (current, event) {
        (SelectAccountType, AccountKindChosen(kind)) => match kind {
            AccountKind::Main => {
                (StepDisposition::Continue(SelectStatus), vec![PromptStatusSelect])
            }
            AccountKind::Farm => {
                (StepDisposition::Continue(SelectFiller), vec![PromptFillerSelect])
            }
        },
        (SelectStatus, StatusChosen(_)) => {
            (StepDisposition::Continue(AwaitScreenshot), vec![PromptScreenshot])
        }
        (SelectFiller, FillerChosen(_)) => {
            (StepDisposition::Continue(LinkedIdForm), vec![OpenLinkedIdForm])
        }
        (LinkedIdForm, LinkedIdSubmitted(_)) => {
            (StepDisposition::Continue(AwaitScreenshot), vec![PromptScreenshot])
        }
        (AwaitScreenshot, ScreenshotSupplied(screenshot)) => {
            if !screenshot.is_image() {
                return Err(TransitionError::InvalidAttachment {
                    content_type: screenshot
                        .content_type
                        .clone()
                        .unwrap_or_else(|| "unknown".to_owned()),
                });
            }
            (StepDisposition::Continue(Confirm), vec![ShowConfirmSummary])
        }
        (Confirm, SubmitRequested) => {
            if !context.missing_required_fields.is_empty() {
                return Err(TransitionError::MissingRequiredFields {
                    missing_fields: context.missing_required_fields.clone(),
                });
            }
            (StepDisposition::Finished(FinishReason::Submitted), vec![SubmitRegistration])
        }
        (SelectAccountType, RestartRequested) => {
            return Err(TransitionError::InvalidTransition {
                step: *current,
                event: event.clone(),
            });
        }
        (_, RestartRequested) => {
            (StepDisposition::Continue(SelectAccountType), vec![PromptAccountKind])
        }
        (_, CancelRequested) => (StepDisposition::Finished(FinishReason::Cancelled), Vec::new()),
        _ => {
            return Err(TransitionError::InvalidTransition {
                step: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, next, actions })
}

#[cfg(test)]
mod tests {
    use crate::registration::states::{
        AccountKind, FinishReason, FlowContext, MainStatus, RegistrationEvent, RegistrationStep,
        ScreenshotRef, StepAction, StepDisposition,
    };

    use super::{initial_step, transition, TransitionError};

    fn image() -> ScreenshotRef {
        ScreenshotRef {
            url: "https://cdn.example/shot.png".to_owned(),
            content_type: Some("image/png".to_owned()),
        }
    }

    #[test]
    fn main_path_reaches_screenshot_without_linked_id_form() {
        let context = FlowContext::default();
        let mut step = initial_step();

        let outcome = transition(
            &step,
            &RegistrationEvent::AccountKindChosen(AccountKind::Main),
            &context,
        )
        .expect("select account type");
        assert_eq!(outcome.actions, vec![StepAction::PromptStatusSelect]);
        step = match outcome.next {
            StepDisposition::Continue(step) => step,
            other => panic!("unexpected disposition {other:?}"),
        };

        let outcome =
            transition(&step, &RegistrationEvent::StatusChosen(MainStatus::Fighter), &context)
                .expect("select status");
        assert_eq!(outcome.actions, vec![StepAction::PromptScreenshot]);
        assert!(!outcome.actions.contains(&StepAction::OpenLinkedIdForm));
        assert_eq!(
            outcome.next,
            StepDisposition::Continue(RegistrationStep::AwaitScreenshot)
        );
    }

    #[test]
    fn farm_path_collects_linked_id_before_screenshot() {
        let context = FlowContext::default();

        let outcome = transition(
            &RegistrationStep::SelectAccountType,
            &RegistrationEvent::AccountKindChosen(AccountKind::Farm),
            &context,
        )
        .expect("select account type");
        assert_eq!(outcome.next, StepDisposition::Continue(RegistrationStep::SelectFiller));

        let outcome = transition(
            &RegistrationStep::SelectFiller,
            &RegistrationEvent::FillerChosen(true),
            &context,
        )
        .expect("select filler");
        assert_eq!(outcome.actions, vec![StepAction::OpenLinkedIdForm]);
        assert_eq!(outcome.next, StepDisposition::Continue(RegistrationStep::LinkedIdForm));

        let outcome = transition(
            &RegistrationStep::LinkedIdForm,
            &RegistrationEvent::LinkedIdSubmitted("77881234".to_owned()),
            &context,
        )
        .expect("linked id");
        assert_eq!(
            outcome.next,
            StepDisposition::Continue(RegistrationStep::AwaitScreenshot)
        );
    }

    #[test]
    fn image_screenshot_advances_to_confirm() {
        let outcome = transition(
            &RegistrationStep::AwaitScreenshot,
            &RegistrationEvent::ScreenshotSupplied(image()),
            &FlowContext::default(),
        )
        .expect("screenshot");

        assert_eq!(outcome.next, StepDisposition::Continue(RegistrationStep::Confirm));
        assert_eq!(outcome.actions, vec![StepAction::ShowConfirmSummary]);
    }

    #[test]
    fn non_image_attachment_never_advances_to_confirm() {
        let error = transition(
            &RegistrationStep::AwaitScreenshot,
            &RegistrationEvent::ScreenshotSupplied(ScreenshotRef {
                url: "https://cdn.example/notes.pdf".to_owned(),
                content_type: Some("application/pdf".to_owned()),
            }),
            &FlowContext::default(),
        )
        .expect_err("must reject non-image attachment");

        assert!(matches!(
            error,
            TransitionError::InvalidAttachment { ref content_type } if content_type == "application/pdf"
        ));
    }

    #[test]
    fn submit_refuses_when_required_fields_missing() {
        let error = transition(
            &RegistrationStep::Confirm,
            &RegistrationEvent::SubmitRequested,
            &FlowContext { missing_required_fields: vec!["screenshot".to_owned()] },
        )
        .expect_err("must refuse incomplete submit");

        assert!(matches!(error, TransitionError::MissingRequiredFields { .. }));
    }

    #[test]
    fn submit_finishes_when_complete() {
        let outcome = transition(
            &RegistrationStep::Confirm,
            &RegistrationEvent::SubmitRequested,
            &FlowContext::default(),
        )
        .expect("submit");

        assert_eq!(outcome.next, StepDisposition::Finished(FinishReason::Submitted));
        assert_eq!(outcome.actions, vec![StepAction::SubmitRegistration]);
    }

    #[test]
    fn restart_returns_to_account_type_from_any_later_step() {
        for step in [
            RegistrationStep::SelectStatus,
            RegistrationStep::SelectFiller,
            RegistrationStep::LinkedIdForm,
            RegistrationStep::AwaitScreenshot,
            RegistrationStep::Confirm,
        ] {
            let outcome =
                transition(&step, &RegistrationEvent::RestartRequested, &FlowContext::default())
                    .expect("restart");
            assert_eq!(
                outcome.next,
                StepDisposition::Continue(RegistrationStep::SelectAccountType)
            );
            assert_eq!(outcome.actions, vec![StepAction::PromptAccountKind]);
        }
    }

    #[test]
    fn restart_from_initial_step_is_invalid() {
        let error = transition(
            &RegistrationStep::SelectAccountType,
            &RegistrationEvent::RestartRequested,
            &FlowContext::default(),
        )
        .expect_err("nothing to restart yet");

        assert!(matches!(error, TransitionError::InvalidTransition { .. }));
    }

    #[test]
    fn cancel_finishes_from_every_step() {
        for step in [
            RegistrationStep::SelectAccountType,
            RegistrationStep::SelectStatus,
            RegistrationStep::SelectFiller,
            RegistrationStep::LinkedIdForm,
            RegistrationStep::AwaitScreenshot,
            RegistrationStep::Confirm,
        ] {
            let outcome =
                transition(&step, &RegistrationEvent::CancelRequested, &FlowContext::default())
                    .expect("cancel");
            assert_eq!(outcome.next, StepDisposition::Finished(FinishReason::Cancelled));
        }
    }

    #[test]
    fn out_of_step_events_are_rejected() {
        let cases = [
            (
                RegistrationStep::SelectAccountType,
                RegistrationEvent::StatusChosen(MainStatus::Support),
            ),
            (RegistrationStep::SelectStatus, RegistrationEvent::FillerChosen(false)),
            (RegistrationStep::SelectStatus, RegistrationEvent::ScreenshotSupplied(image())),
            (RegistrationStep::Confirm, RegistrationEvent::ScreenshotSupplied(image())),
            (
                RegistrationStep::AwaitScreenshot,
                RegistrationEvent::LinkedIdSubmitted("123".to_owned()),
            ),
            (RegistrationStep::SelectFiller, RegistrationEvent::SubmitRequested),
        ];

        for (step, event) in cases {
            let error = transition(&step, &event, &FlowContext::default())
                .expect_err("pair must be rejected");
            assert!(matches!(error, TransitionError::InvalidTransition { .. }));
        }
    }

    #[test]
    fn replay_is_deterministic_for_same_event_sequence() {
        let events = [
            RegistrationEvent::AccountKindChosen(AccountKind::Main),
            RegistrationEvent::StatusChosen(MainStatus::Fighter),
            RegistrationEvent::ScreenshotSupplied(image()),
            RegistrationEvent::SubmitRequested,
        ];

        let run = || {
            let mut step = initial_step();
            let mut actions = Vec::new();
            for event in &events {
                let outcome =
                    transition(&step, event, &FlowContext::default()).expect("deterministic run");
                actions.push(outcome.actions);
                step = match outcome.next {
                    StepDisposition::Continue(next) => next,
                    StepDisposition::Finished(_) => break,
                };
            }
            actions
        };

        assert_eq!(run(), run());
    }
}
