use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::events::{
    default_dispatcher, DiscordEnvelope, DiscordEvent, EventContext, EventDispatcher,
    HandlerResult,
};
use crate::messages::{MessageTemplate, ModalTemplate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway failed to connect: {0}")]
    Connect(String),
    #[error("gateway read failed: {0}")]
    Receive(String),
    #[error("gateway ack failed: {0}")]
    Acknowledge(String),
    #[error("gateway send failed: {0}")]
    Send(String),
    #[error("interaction token expired")]
    TokenExpired,
    #[error("gateway disconnect failed: {0}")]
    Disconnect(String),
}

/// Where a response goes: back through an interaction token, or straight to
/// a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplyTarget {
    Interaction { interaction_id: String },
    Channel { channel_id: String },
}

/// A message the platform assigned an identity to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageRef {
    pub channel_id: String,
    pub message_id: String,
}

/// The platform seam. Event delivery, command registration, and message
/// rendering all live on the other side of this trait.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn register_commands(
        &self,
        application_id: &str,
        commands: &[&str],
    ) -> Result<(), GatewayError>;
    async fn connect(&self) -> Result<(), GatewayError>;
    async fn next_envelope(&self) -> Result<Option<DiscordEnvelope>, GatewayError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), GatewayError>;
    async fn send(
        &self,
        target: &ReplyTarget,
        message: MessageTemplate,
    ) -> Result<MessageRef, GatewayError>;
    async fn edit(&self, message: &MessageRef, template: MessageTemplate)
        -> Result<(), GatewayError>;
    async fn open_modal(
        &self,
        interaction_id: &str,
        modal: ModalTemplate,
    ) -> Result<(), GatewayError>;
    async fn disconnect(&self) -> Result<(), GatewayError>;
}

#[derive(Default)]
pub struct NoopGateway;

#[async_trait]
impl Gateway for NoopGateway {
    async fn register_commands(
        &self,
        _application_id: &str,
        _commands: &[&str],
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn connect(&self) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn next_envelope(&self) -> Result<Option<DiscordEnvelope>, GatewayError> {
        Ok(None)
    }

    async fn acknowledge(&self, _envelope_id: &str) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn send(
        &self,
        target: &ReplyTarget,
        _message: MessageTemplate,
    ) -> Result<MessageRef, GatewayError> {
        let channel_id = match target {
            ReplyTarget::Channel { channel_id } => channel_id.clone(),
            ReplyTarget::Interaction { .. } => "noop-channel".to_owned(),
        };
        Ok(MessageRef { channel_id, message_id: "noop-message".to_owned() })
    }

    async fn edit(
        &self,
        _message: &MessageRef,
        _template: MessageTemplate,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn open_modal(
        &self,
        _interaction_id: &str,
        _modal: ModalTemplate,
    ) -> Result<(), GatewayError> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), GatewayError> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Which message a handler response should answer.
pub fn reply_target(event: &DiscordEvent) -> Option<ReplyTarget> {
    match event {
        DiscordEvent::SlashCommand(payload) => {
            Some(ReplyTarget::Interaction { interaction_id: payload.interaction_id.clone() })
        }
        DiscordEvent::Component(event) => {
            Some(ReplyTarget::Interaction { interaction_id: event.interaction_id.clone() })
        }
        DiscordEvent::ModalSubmit(event) => {
            Some(ReplyTarget::Interaction { interaction_id: event.interaction_id.clone() })
        }
        DiscordEvent::MessageReply(event) => {
            Some(ReplyTarget::Channel { channel_id: event.channel_id.clone() })
        }
        DiscordEvent::Unsupported { .. } => None,
    }
}

/// Drives the envelope loop: connect with backoff, acknowledge, then hand
/// each envelope to its own task so slow handlers (a user mid-registration)
/// never block other users. Transport failures degrade gracefully; an
/// expired interaction token is logged and dropped because no further
/// message can be delivered for it.
pub struct GatewayRunner {
    gateway: Arc<dyn Gateway>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl Default for GatewayRunner {
    fn default() -> Self {
        Self {
            gateway: Arc::new(NoopGateway),
            dispatcher: Arc::new(default_dispatcher()),
            reconnect_policy: ReconnectPolicy::default(),
        }
    }
}

impl GatewayRunner {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        dispatcher: EventDispatcher,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { gateway, dispatcher: Arc::new(dispatcher), reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(gateway_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %gateway_error,
                        "gateway transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "gateway retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), GatewayError> {
        info!(attempt, "opening gateway connection");
        self.gateway.connect().await?;
        info!(attempt, "gateway connected");

        let mut in_flight = tokio::task::JoinSet::new();
        loop {
            let envelope = match self.gateway.next_envelope().await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => {
                    info!(attempt, "gateway event stream closed");
                    drain(&mut in_flight).await;
                    self.gateway.disconnect().await?;
                    return Ok(());
                }
                Err(error) => {
                    drain(&mut in_flight).await;
                    return Err(error);
                }
            };

            let correlation_id = if envelope.envelope_id.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                envelope.envelope_id.clone()
            };

            info!(
                event_name = "ingress.discord.envelope_received",
                envelope_id = %envelope.envelope_id,
                event_type = ?envelope.event.event_type(),
                correlation_id = %correlation_id,
                "received gateway envelope"
            );

            if let Err(error) = self.gateway.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.discord.ack_failed",
                    envelope_id = %envelope.envelope_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "failed to acknowledge gateway envelope"
                );
            }

            // Each envelope gets its own task: two users registering at once
            // interleave freely, keyed apart by their prompt messages.
            let dispatcher = Arc::clone(&self.dispatcher);
            let gateway = Arc::clone(&self.gateway);
            in_flight.spawn(async move {
                let context = EventContext { correlation_id: correlation_id.clone() };
                match dispatcher.dispatch(&envelope, &context).await {
                    Ok(HandlerResult::Responded(message)) => {
                        deliver(gateway.as_ref(), &envelope, message, &correlation_id).await;
                    }
                    Ok(HandlerResult::Processed | HandlerResult::Ignored) => {}
                    Err(error) => {
                        warn!(
                            envelope_id = %envelope.envelope_id,
                            correlation_id = %correlation_id,
                            error = %error,
                            "event dispatch failed; continuing gateway loop"
                        );
                    }
                }
            });
        }
    }
}

async fn drain(in_flight: &mut tokio::task::JoinSet<()>) {
    while in_flight.join_next().await.is_some() {}
}

async fn deliver(
    gateway: &dyn Gateway,
    envelope: &DiscordEnvelope,
    message: MessageTemplate,
    correlation_id: &str,
) {
    let Some(target) = reply_target(&envelope.event) else {
        return;
    };

    match gateway.send(&target, message).await {
        Ok(message_ref) => {
            debug!(
                event_name = "egress.discord.response_sent",
                correlation_id = %correlation_id,
                message_id = %message_ref.message_id,
                "delivered handler response"
            );
        }
        Err(GatewayError::TokenExpired) => {
            warn!(
                event_name = "egress.discord.token_expired",
                correlation_id = %correlation_id,
                "interaction token expired before the response could be delivered"
            );
        }
        Err(error) => {
            warn!(
                event_name = "egress.discord.send_failed",
                correlation_id = %correlation_id,
                error = %error,
                "failed to deliver handler response"
            );
        }
    }
}
