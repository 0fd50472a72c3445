use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::commands::{
    AttachmentRef, CommandContext, CommandRouter, CommandService, NoopCommandService,
    SlashCommandPayload,
};
use crate::gateway::GatewayError;
use crate::messages::MessageTemplate;
use crate::render;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscordEnvelope {
    pub envelope_id: String,
    pub event: DiscordEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiscordEvent {
    SlashCommand(SlashCommandPayload),
    Component(ComponentInteractionEvent),
    ModalSubmit(ModalSubmitEvent),
    MessageReply(MessageReplyEvent),
    Unsupported { event_type: String },
}

impl DiscordEvent {
    pub fn event_type(&self) -> DiscordEventType {
        match self {
            Self::SlashCommand(_) => DiscordEventType::SlashCommand,
            Self::Component(_) => DiscordEventType::Component,
            Self::ModalSubmit(_) => DiscordEventType::ModalSubmit,
            Self::MessageReply(_) => DiscordEventType::MessageReply,
            Self::Unsupported { .. } => DiscordEventType::Unsupported,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DiscordEventType {
    SlashCommand,
    Component,
    ModalSubmit,
    MessageReply,
    Unsupported,
}

/// A button press or select-menu choice on a message the bot posted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentInteractionEvent {
    pub interaction_id: String,
    /// The message carrying the component, i.e. the registration prompt.
    pub message_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub component_id: String,
    /// Selected values for menus; empty for buttons.
    pub values: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModalSubmitEvent {
    pub interaction_id: String,
    /// The prompt message the modal was opened from.
    pub message_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub modal_id: String,
    pub inputs: Vec<(String, String)>,
}

impl ModalSubmitEvent {
    pub fn input(&self, custom_id: &str) -> Option<&str> {
        self.inputs
            .iter()
            .find(|(id, _)| id == custom_id)
            .map(|(_, value)| value.as_str())
    }
}

/// A plain message that replies to another message, with its attachments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageReplyEvent {
    pub message_id: String,
    pub replied_to: String,
    pub channel_id: String,
    pub user_id: String,
    pub content: String,
    pub attachments: Vec<AttachmentRef>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Responded(MessageTemplate),
    Processed,
    Ignored,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EventHandlerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error("interaction handler failure: {0}")]
    Interaction(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Handler(#[from] EventHandlerError),
}

#[async_trait]
pub trait EventHandler: Send + Sync {
    fn event_type(&self) -> DiscordEventType;
    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[derive(Default)]
pub struct EventDispatcher {
    handlers: HashMap<DiscordEventType, Arc<dyn EventHandler>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<H>(&mut self, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.handlers.insert(handler.event_type(), Arc::new(handler));
    }

    pub async fn dispatch(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        let Some(handler) = self.handlers.get(&envelope.event.event_type()) else {
            return Ok(HandlerResult::Ignored);
        };

        handler.handle(envelope, ctx).await.map_err(DispatchError::from)
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

pub fn default_dispatcher() -> EventDispatcher {
    let service = Arc::new(NoopInteractionService);
    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(NoopCommandService));
    dispatcher.register(ComponentHandler::new(service.clone()));
    dispatcher.register(ModalSubmitHandler::new(service.clone()));
    dispatcher.register(MessageReplyHandler::new(service));
    dispatcher
}

pub struct SlashCommandHandler<S> {
    router: CommandRouter<S>,
}

impl<S> SlashCommandHandler<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { router: CommandRouter::new(service) }
    }
}

#[async_trait]
impl<S> EventHandler for SlashCommandHandler<S>
where
    S: CommandService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::SlashCommand
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::SlashCommand(payload) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };

        let command_ctx = CommandContext::from_payload(payload, ctx.correlation_id.clone());
        match self.router.route(payload, &command_ctx).await {
            Ok(Some(message)) => Ok(HandlerResult::Responded(message)),
            Ok(None) => Ok(HandlerResult::Processed),
            Err(error) => {
                // The single place command faults become chat messages.
                warn!(
                    command = %payload.command,
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "command failed"
                );
                Ok(HandlerResult::Responded(render::error_reply(&error, &ctx.correlation_id)))
            }
        }
    }
}

/// Component, modal, and reply events all funnel into whatever owns the
/// in-flight interactive sessions.
#[async_trait]
pub trait InteractionService: Send + Sync {
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;

    async fn handle_modal(
        &self,
        event: &ModalSubmitEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;

    async fn handle_reply(
        &self,
        event: &MessageReplyEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError>;
}

#[async_trait]
impl<T> InteractionService for Arc<T>
where
    T: InteractionService + ?Sized,
{
    async fn handle_component(
        &self,
        event: &ComponentInteractionEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        (**self).handle_component(event, ctx).await
    }

    async fn handle_modal(
        &self,
        event: &ModalSubmitEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        (**self).handle_modal(event, ctx).await
    }

    async fn handle_reply(
        &self,
        event: &MessageReplyEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        (**self).handle_reply(event, ctx).await
    }
}

#[derive(Default)]
pub struct NoopInteractionService;

#[async_trait]
impl InteractionService for NoopInteractionService {
    async fn handle_component(
        &self,
        _event: &ComponentInteractionEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn handle_modal(
        &self,
        _event: &ModalSubmitEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        Ok(HandlerResult::Ignored)
    }

    async fn handle_reply(
        &self,
        _event: &MessageReplyEvent,
        _ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        Ok(HandlerResult::Ignored)
    }
}

pub struct ComponentHandler<S> {
    service: S,
}

impl<S> ComponentHandler<S>
where
    S: InteractionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ComponentHandler<S>
where
    S: InteractionService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::Component
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::Component(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        self.service.handle_component(event, ctx).await
    }
}

pub struct ModalSubmitHandler<S> {
    service: S,
}

impl<S> ModalSubmitHandler<S>
where
    S: InteractionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for ModalSubmitHandler<S>
where
    S: InteractionService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::ModalSubmit
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::ModalSubmit(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        self.service.handle_modal(event, ctx).await
    }
}

pub struct MessageReplyHandler<S> {
    service: S,
}

impl<S> MessageReplyHandler<S>
where
    S: InteractionService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }
}

#[async_trait]
impl<S> EventHandler for MessageReplyHandler<S>
where
    S: InteractionService + 'static,
{
    fn event_type(&self) -> DiscordEventType {
        DiscordEventType::MessageReply
    }

    async fn handle(
        &self,
        envelope: &DiscordEnvelope,
        ctx: &EventContext,
    ) -> Result<HandlerResult, EventHandlerError> {
        let DiscordEvent::MessageReply(event) = &envelope.event else {
            return Ok(HandlerResult::Ignored);
        };
        self.service.handle_reply(event, ctx).await
    }
}
