use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use kingscribe_backend::{BackendClient, MediaFetcher};
use kingscribe_core::registration::{
    AccountKind, Advance, FinishReason, MainStatus, PromptKey, RegistrationEvent,
    RegistrationSession, ScreenshotRef, SessionError, SessionStore, StepAction,
};
use kingscribe_core::CommandError;

use crate::commands::CommandContext;
use crate::events::{
    ComponentInteractionEvent, EventContext, EventHandlerError, HandlerResult, InteractionService,
    MessageReplyEvent, ModalSubmitEvent,
};
use crate::gateway::{Gateway, GatewayError, MessageRef, ReplyTarget};
use crate::render;

/// Orchestrates the multi-step registration: one session per prompt message,
/// advanced by the transition table in core, rendered by editing the prompt
/// in place. Collects account type, status or filler flag, a linked governor
/// id for farms, and a screenshot, then ships the whole record to the
/// backend in a single `register` envelope.
pub struct RegistrationWorkflow {
    gateway: Arc<dyn Gateway>,
    backend: Arc<dyn BackendClient>,
    media: Arc<dyn MediaFetcher>,
    sessions: SessionStore,
}

/// Which transport carried an event into the workflow; decides how unmatched
/// prompts are treated.
enum EventOrigin<'a> {
    Component { interaction_id: &'a str },
    Modal,
    Reply,
}

impl RegistrationWorkflow {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        backend: Arc<dyn BackendClient>,
        media: Arc<dyn MediaFetcher>,
    ) -> Self {
        Self { gateway, backend, media, sessions: SessionStore::new() }
    }

    /// Posts the account-type prompt and opens a session keyed by the prompt
    /// message the platform assigned.
    pub async fn start(&self, ctx: &CommandContext) -> Result<(), GatewayError> {
        let target = ReplyTarget::Interaction { interaction_id: ctx.interaction_id.clone() };
        let prompt = self.gateway.send(&target, render::account_kind_prompt()).await?;

        self.sessions.begin(
            PromptKey::new(prompt.message_id.clone()),
            ctx.user_id.clone(),
            prompt.channel_id.clone(),
            Instant::now(),
        );

        info!(
            event_name = "workflow.registration.started",
            correlation_id = %ctx.correlation_id,
            user_id = %ctx.user_id,
            prompt_message_id = %prompt.message_id,
            "registration session opened"
        );
        Ok(())
    }

    async fn apply_event(
        &self,
        key: PromptKey,
        actor_id: &str,
        event: RegistrationEvent,
        origin: EventOrigin<'_>,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        match self.sessions.advance(&key, actor_id, event, Instant::now()) {
            Ok(Advance::Progressed { actions, session }) => {
                self.perform_actions(&key, &session, &actions, &origin, ctx).await?;
                Ok(HandlerResult::Processed)
            }
            Ok(Advance::Finished { reason: FinishReason::Cancelled, session }) => {
                info!(
                    event_name = "workflow.registration.cancelled",
                    correlation_id = %ctx.correlation_id,
                    user_id = %session.owner_id,
                    "registration cancelled by the user"
                );
                self.edit_prompt(&key, &session.channel_id, render::cancelled_message(), ctx)
                    .await?;
                Ok(HandlerResult::Processed)
            }
            Ok(Advance::Finished { reason: FinishReason::Submitted, session }) => {
                self.submit(&key, session, ctx).await?;
                Ok(HandlerResult::Processed)
            }
            Ok(Advance::ScreenshotIgnored) => Ok(HandlerResult::Ignored),
            Err(SessionError::NotFound) => match origin {
                // Most replies in a channel are not meant for us.
                EventOrigin::Reply => Ok(HandlerResult::Ignored),
                _ => Ok(HandlerResult::Responded(render::error_reply(
                    &CommandError::Workflow(SessionError::NotFound),
                    &ctx.correlation_id,
                ))),
            },
            Err(error) => {
                warn!(
                    event_name = "workflow.registration.rejected",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "registration event rejected"
                );
                Ok(HandlerResult::Responded(render::error_reply(
                    &CommandError::Workflow(error),
                    &ctx.correlation_id,
                )))
            }
        }
    }

    async fn perform_actions(
        &self,
        key: &PromptKey,
        session: &RegistrationSession,
        actions: &[StepAction],
        origin: &EventOrigin<'_>,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        for action in actions {
            match action {
                StepAction::PromptAccountKind => {
                    self.edit_prompt(key, &session.channel_id, render::account_kind_prompt(), ctx)
                        .await?;
                }
                StepAction::PromptStatusSelect => {
                    self.edit_prompt(key, &session.channel_id, render::status_prompt(), ctx)
                        .await?;
                }
                StepAction::PromptFillerSelect => {
                    self.edit_prompt(key, &session.channel_id, render::filler_prompt(), ctx)
                        .await?;
                }
                StepAction::OpenLinkedIdForm => {
                    let EventOrigin::Component { interaction_id } = origin else {
                        return Err(EventHandlerError::Interaction(
                            "linked-id form can only open from a component interaction".to_owned(),
                        ));
                    };
                    self.gateway.open_modal(interaction_id, render::linked_id_modal()).await?;
                }
                StepAction::PromptScreenshot => {
                    self.edit_prompt(key, &session.channel_id, render::screenshot_prompt(), ctx)
                        .await?;
                }
                StepAction::ShowConfirmSummary => {
                    self.edit_prompt(key, &session.channel_id, render::confirm_prompt(session), ctx)
                        .await?;
                }
                StepAction::SubmitRegistration => {
                    // Reached through Advance::Finished, never as a
                    // progression action.
                }
            }
        }
        Ok(())
    }

    async fn submit(
        &self,
        key: &PromptKey,
        session: RegistrationSession,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let Some(screenshot) = session.screenshot.clone() else {
            // The transition table refuses incomplete submits; this is the
            // teardown path for a record that lost its screenshot anyway.
            self.edit_prompt(
                key,
                &session.channel_id,
                render::error_reply(
                    &CommandError::Input("registration lost its screenshot".to_owned()),
                    &ctx.correlation_id,
                ),
                ctx,
            )
            .await?;
            return Ok(());
        };

        let image = match self.media.fetch_and_encode(&screenshot.url).await {
            Ok(image) => image,
            Err(error) => {
                warn!(
                    event_name = "workflow.registration.media_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "screenshot fetch failed"
                );
                self.edit_prompt(
                    key,
                    &session.channel_id,
                    render::error_reply(
                        &CommandError::Media(error.to_string()),
                        &ctx.correlation_id,
                    ),
                    ctx,
                )
                .await?;
                return Ok(());
            }
        };

        let payload = registration_payload(&session, image.data, image.content_type);
        let message = match self.backend.send("register", payload).await {
            Ok(result) => {
                info!(
                    event_name = "workflow.registration.submitted",
                    correlation_id = %ctx.correlation_id,
                    user_id = %session.owner_id,
                    "registration submitted to the backend"
                );
                render::result_message(&render::views::REGISTER, &result, &ctx.correlation_id)
            }
            Err(error) => {
                warn!(
                    event_name = "workflow.registration.backend_failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "registration submission failed"
                );
                render::error_reply(
                    &CommandError::Transport(error.to_string()),
                    &ctx.correlation_id,
                )
            }
        };

        // Either way the session is gone; a failed submission means running
        // `/register` again, never an automatic retry.
        self.edit_prompt(key, &session.channel_id, message, ctx).await
    }

    async fn edit_prompt(
        &self,
        key: &PromptKey,
        channel_id: &str,
        template: crate::messages::MessageTemplate,
        ctx: &EventContext,
    ) -> Result<(), EventHandlerError> {
        let message =
            MessageRef { channel_id: channel_id.to_owned(), message_id: key.0.clone() };
        match self.gateway.edit(&message, template).await {
            Ok(()) => Ok(()),
            Err(GatewayError::TokenExpired) => {
                warn!(
                    event_name = "workflow.registration.token_expired",
                    correlation_id = %ctx.correlation_id,
                    "prompt could not be updated; interaction token expired"
                );
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}

fn component_event(event: &ComponentInteractionEvent) -> Option<RegistrationEvent> {
    let selected = event.values.first().map(String::as_str);
    match event.component_id.as_str() {
        render::KIND_SELECT => {
            selected.and_then(AccountKind::from_wire).map(RegistrationEvent::AccountKindChosen)
        }
        render::STATUS_SELECT => {
            selected.and_then(MainStatus::from_wire).map(RegistrationEvent::StatusChosen)
        }
        render::FILLER_SELECT => match selected {
            Some("yes") => Some(RegistrationEvent::FillerChosen(true)),
            Some("no") => Some(RegistrationEvent::FillerChosen(false)),
            _ => None,
        },
        render::SUBMIT_BUTTON => Some(RegistrationEvent::SubmitRequested),
        render::RESTART_BUTTON => Some(RegistrationEvent::RestartRequested),
        render::CANCEL_BUTTON => Some(RegistrationEvent::CancelRequested),
        _ => None,
    }
}

fn registration_payload(
    session: &RegistrationSession,
    image_data: String,
    image_type: String,
) -> Value {
    let mut data = Map::new();
    data.insert("userId".to_owned(), json!(session.owner_id));

    if let Some(kind) = session.account_kind {
        data.insert("accountType".to_owned(), json!(kind.wire_value()));
        match kind {
            AccountKind::Main => {
                if let Some(status) = session.status {
                    data.insert("status".to_owned(), json!(status.wire_value()));
                }
            }
            AccountKind::Farm => {
                if let Some(filler) = session.filler {
                    data.insert("isFiller".to_owned(), json!(filler));
                }
                if let Some(linked_id) = &session.linked_id {
                    data.insert("linkedGovernorId".to_owned(), json!(linked_id));
                }
            }
        }
    }

    data.insert("image".to_owned(), json!(image_data));
    data.insert("imageType".to_owned(), json!(image_type));
    Value::Object(data)
}

#[async_trait]
impl InteractionService for RegistrationWorkflow {
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(registration_event) = component_event(event) else {
            return Ok(HandlerResult::Ignored);
        };

        self.apply_event(
            PromptKey::new(event.message_id.clone()),
            &event.user_id,
            registration_event,
            EventOrigin::Component { interaction_id: &event.interaction_id },
            ctx,
        )
        .await
    }

    async fn handle_modal(
        &self,
        event: &ModalSubmitEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        if event.modal_id != render::LINKED_ID_MODAL {
            return Ok(HandlerResult::Ignored);
        }
        let Some(linked_id) = event.input(render::LINKED_ID_INPUT) else {
            return Err(EventHandlerError::Interaction(
                "linked-id modal submitted without its input".to_owned(),
            ));
        };

        self.apply_event(
            PromptKey::new(event.message_id.clone()),
            &event.user_id,
            RegistrationEvent::LinkedIdSubmitted(linked_id.to_owned()),
            EventOrigin::Modal,
            ctx,
        )
        .await
    }

    async fn handle_reply(
        &self,
        event: &MessageReplyEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let Some(attachment) = event.attachments.first() else {
            return Ok(HandlerResult::Ignored);
        };

        let screenshot = ScreenshotRef {
            url: attachment.url.clone(),
            content_type: attachment.content_type.clone(),
        };

        self.apply_event(
            PromptKey::new(event.replied_to.clone()),
            &event.user_id,
            RegistrationEvent::ScreenshotSupplied(screenshot),
            EventOrigin::Reply,
            ctx,
        )
        .await
    }
}
