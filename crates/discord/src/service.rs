use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::warn;

use kingscribe_backend::{BackendClient, MediaFetcher};
use kingscribe_core::config::ChannelBindings;
use kingscribe_core::{BackendResult, CommandError};

use crate::commands::{AttachmentRef, CommandContext, CommandService};
use crate::messages::MessageTemplate;
use crate::render::{self, ResultView};
use crate::workflow::RegistrationWorkflow;

/// The production command service: channel restriction, envelope building,
/// one backend call, rendering. The interactive `register` command is
/// delegated to the workflow; everything else is a single round-trip.
pub struct StatsCommandService {
    backend: Arc<dyn BackendClient>,
    media: Arc<dyn MediaFetcher>,
    channels: ChannelBindings,
    workflow: Arc<RegistrationWorkflow>,
}

impl StatsCommandService {
    pub fn new(
        backend: Arc<dyn BackendClient>,
        media: Arc<dyn MediaFetcher>,
        channels: ChannelBindings,
        workflow: Arc<RegistrationWorkflow>,
    ) -> Self {
        Self { backend, media, channels, workflow }
    }

    fn ensure_channel(&self, command: &str, ctx: &CommandContext) -> Result<(), CommandError> {
        match self.channels.channel_for(command) {
            None => Err(CommandError::MissingChannelBinding { command: command.to_owned() }),
            Some(channel_id) if channel_id != ctx.channel_id => {
                Err(CommandError::WrongChannel { command: command.to_owned() })
            }
            Some(_) => Ok(()),
        }
    }

    async fn send(&self, command: &str, data: Value) -> Result<BackendResult, CommandError> {
        self.backend.send(command, data).await.map_err(|error| {
            warn!(backend_command = command, error = %error, "backend call failed");
            match error {
                kingscribe_backend::BackendError::Unconfigured => {
                    CommandError::BackendUnconfigured
                }
                other => CommandError::Transport(other.to_string()),
            }
        })
    }

    async fn submit_with_image(
        &self,
        backend_command: &str,
        view: &ResultView,
        mut data: Map<String, Value>,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        let image = self
            .media
            .fetch_and_encode(&screenshot.url)
            .await
            .map_err(|error| CommandError::Media(error.to_string()))?;

        data.insert("image".to_owned(), json!(image.data));
        data.insert("imageType".to_owned(), json!(image.content_type));

        let result = self.send(backend_command, Value::Object(data)).await?;
        Ok(Some(render::result_message(view, &result, &ctx.correlation_id)))
    }
}

fn base_data(ctx: &CommandContext) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("userId".to_owned(), json!(ctx.user_id));
    data
}

#[async_trait]
impl CommandService for StatsCommandService {
    async fn register(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("register", ctx)?;
        self.workflow
            .start(ctx)
            .await
            .map_err(|error| CommandError::Platform(error.to_string()))?;
        // The workflow owns the prompt message from here on.
        Ok(None)
    }

    async fn register_from_drive(
        &self,
        folder: String,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("register-from-drive", ctx)?;

        let mut data = base_data(ctx);
        data.insert("folderId".to_owned(), json!(folder));

        let result = self.send("register_from_drive", Value::Object(data)).await?;
        Ok(Some(render::result_message(
            &render::views::REGISTER_FROM_DRIVE,
            &result,
            &ctx.correlation_id,
        )))
    }

    async fn fix_registration_names(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("fix-registration-names", ctx)?;

        let result =
            self.send("fix_registration_names", Value::Object(base_data(ctx))).await?;
        Ok(Some(render::result_message(
            &render::views::FIX_REGISTRATION_NAMES,
            &result,
            &ctx.correlation_id,
        )))
    }

    async fn registration_data(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("get-registration-data", ctx)?;

        let result = self.send("get_registration_data", Value::Object(base_data(ctx))).await?;
        Ok(Some(render::export_message(&result, &ctx.correlation_id)))
    }

    async fn submit_zone_kp(
        &self,
        zone: i64,
        kp: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("submit-zone-kp", ctx)?;

        let mut data = base_data(ctx);
        data.insert("zone".to_owned(), json!(zone));
        data.insert("kp".to_owned(), json!(kp));
        self.submit_with_image("submit_zone_kp", &render::views::SUBMIT_ZONE_KP, data, screenshot, ctx)
            .await
    }

    async fn submit_zone_kp_bulk(
        &self,
        zone: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("submit-zone-kp-bulk", ctx)?;

        let mut data = base_data(ctx);
        data.insert("zone".to_owned(), json!(zone));
        self.submit_with_image(
            "submit_zone_kp_bulk",
            &render::views::SUBMIT_ZONE_KP_BULK,
            data,
            screenshot,
            ctx,
        )
        .await
    }

    async fn submit_prekvk_rank(
        &self,
        rank: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("submit-prekvk-rank", ctx)?;

        let mut data = base_data(ctx);
        data.insert("rank".to_owned(), json!(rank));
        self.submit_with_image(
            "submit_prekvk_rank",
            &render::views::SUBMIT_PREKVK_RANK,
            data,
            screenshot,
            ctx,
        )
        .await
    }

    async fn submit_death_troops(
        &self,
        deaths: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("submit-death-troops", ctx)?;

        let mut data = base_data(ctx);
        data.insert("deaths".to_owned(), json!(deaths));
        self.submit_with_image(
            "submit_death_troops",
            &render::views::SUBMIT_DEATH_TROOPS,
            data,
            screenshot,
            ctx,
        )
        .await
    }

    async fn my_stats(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("my-stats", ctx)?;

        let result = self.send("get_my_stats", Value::Object(base_data(ctx))).await?;
        Ok(Some(render::result_message(&render::views::MY_STATS, &result, &ctx.correlation_id)))
    }

    async fn leaderboard(
        &self,
        top: i64,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        self.ensure_channel("leaderboard", ctx)?;

        let mut data = base_data(ctx);
        data.insert("top".to_owned(), json!(top));

        let result = self.send("get_leaderboard", Value::Object(data)).await?;
        Ok(Some(render::leaderboard_message(&result, top, &ctx.correlation_id)))
    }
}
