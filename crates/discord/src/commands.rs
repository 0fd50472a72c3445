use async_trait::async_trait;
use thiserror::Error;

use kingscribe_core::CommandError;

use crate::messages::MessageTemplate;

/// Attachment supplied with a slash-command option or a reply message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentRef {
    pub url: String,
    pub filename: String,
    pub content_type: Option<String>,
}

impl AttachmentRef {
    pub fn is_image(&self) -> bool {
        self.content_type.as_deref().is_some_and(|kind| kind.starts_with("image/"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    String(String),
    Integer(i64),
    Attachment(AttachmentRef),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandOption {
    pub name: String,
    pub value: OptionValue,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlashCommandPayload {
    pub interaction_id: String,
    pub command: String,
    pub channel_id: String,
    pub user_id: String,
    pub options: Vec<CommandOption>,
}

impl SlashCommandPayload {
    fn str_option(&self, name: &str) -> Option<&str> {
        self.options.iter().find_map(|option| match &option.value {
            OptionValue::String(value) if option.name == name => Some(value.as_str()),
            _ => None,
        })
    }

    fn int_option(&self, name: &str) -> Option<i64> {
        self.options.iter().find_map(|option| match &option.value {
            OptionValue::Integer(value) if option.name == name => Some(*value),
            _ => None,
        })
    }

    fn attachment_option(&self, name: &str) -> Option<&AttachmentRef> {
        self.options.iter().find_map(|option| match &option.value {
            OptionValue::Attachment(value) if option.name == name => Some(value),
            _ => None,
        })
    }
}

/// Per-invocation identity handed to every service call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandContext {
    pub interaction_id: String,
    pub channel_id: String,
    pub user_id: String,
    pub correlation_id: String,
}

impl CommandContext {
    pub fn from_payload(payload: &SlashCommandPayload, correlation_id: impl Into<String>) -> Self {
        Self {
            interaction_id: payload.interaction_id.clone(),
            channel_id: payload.channel_id.clone(),
            user_id: payload.user_id.clone(),
            correlation_id: correlation_id.into(),
        }
    }
}

pub const DEFAULT_LEADERBOARD_TOP: i64 = 10;

/// Fully validated slash command. Minimum bounds and attachment content
/// types are enforced here so no handler sees malformed input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Register,
    RegisterFromDrive { folder: String },
    FixRegistrationNames,
    GetRegistrationData,
    SubmitZoneKp { zone: i64, kp: i64, screenshot: AttachmentRef },
    SubmitZoneKpBulk { zone: i64, screenshot: AttachmentRef },
    SubmitPrekvkRank { rank: i64, screenshot: AttachmentRef },
    SubmitDeathTroops { deaths: i64, screenshot: AttachmentRef },
    MyStats,
    Leaderboard { top: i64 },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandParseError {
    #[error("unsupported slash command: {0}")]
    UnknownCommand(String),
    #[error("`/{command}` is missing the required `{option}` option")]
    MissingOption { command: String, option: &'static str },
    #[error("`{option}` must be at least {minimum}")]
    BelowMinimum { option: &'static str, minimum: i64 },
    #[error("`{option}` must be an image attachment, got `{content_type}`")]
    NotAnImage { option: &'static str, content_type: String },
}

pub fn parse_command(payload: &SlashCommandPayload) -> Result<BotCommand, CommandParseError> {
    let command = payload.command.as_str();
    match command {
        "register" => Ok(BotCommand::Register),
        "register-from-drive" => {
            let folder = payload
                .str_option("folder")
                .ok_or(CommandParseError::MissingOption {
                    command: command.to_owned(),
                    option: "folder",
                })?
                .to_owned();
            Ok(BotCommand::RegisterFromDrive { folder })
        }
        "fix-registration-names" => Ok(BotCommand::FixRegistrationNames),
        "get-registration-data" => Ok(BotCommand::GetRegistrationData),
        "submit-zone-kp" => Ok(BotCommand::SubmitZoneKp {
            zone: required_int(payload, command, "zone", 1)?,
            kp: required_int(payload, command, "kp", 0)?,
            screenshot: required_image(payload, command, "screenshot")?,
        }),
        "submit-zone-kp-bulk" => Ok(BotCommand::SubmitZoneKpBulk {
            zone: required_int(payload, command, "zone", 1)?,
            screenshot: required_image(payload, command, "screenshot")?,
        }),
        "submit-prekvk-rank" => Ok(BotCommand::SubmitPrekvkRank {
            rank: required_int(payload, command, "rank", 1)?,
            screenshot: required_image(payload, command, "screenshot")?,
        }),
        "submit-death-troops" => Ok(BotCommand::SubmitDeathTroops {
            deaths: required_int(payload, command, "deaths", 0)?,
            screenshot: required_image(payload, command, "screenshot")?,
        }),
        "my-stats" => Ok(BotCommand::MyStats),
        "leaderboard" => {
            let top = match payload.int_option("top") {
                Some(top) if top < 1 => {
                    return Err(CommandParseError::BelowMinimum { option: "top", minimum: 1 });
                }
                Some(top) => top,
                None => DEFAULT_LEADERBOARD_TOP,
            };
            Ok(BotCommand::Leaderboard { top })
        }
        other => Err(CommandParseError::UnknownCommand(other.to_owned())),
    }
}

fn required_int(
    payload: &SlashCommandPayload,
    command: &str,
    option: &'static str,
    minimum: i64,
) -> Result<i64, CommandParseError> {
    let value = payload.int_option(option).ok_or(CommandParseError::MissingOption {
        command: command.to_owned(),
        option,
    })?;
    if value < minimum {
        return Err(CommandParseError::BelowMinimum { option, minimum });
    }
    Ok(value)
}

fn required_image(
    payload: &SlashCommandPayload,
    command: &str,
    option: &'static str,
) -> Result<AttachmentRef, CommandParseError> {
    let attachment = payload.attachment_option(option).ok_or(CommandParseError::MissingOption {
        command: command.to_owned(),
        option,
    })?;
    if !attachment.is_image() {
        return Err(CommandParseError::NotAnImage {
            option,
            content_type: attachment
                .content_type
                .clone()
                .unwrap_or_else(|| "unknown".to_owned()),
        });
    }
    Ok(attachment.clone())
}

/// One entry point per slash command. `Ok(None)` means the service already
/// delivered its own messages (the interactive registration prompt does).
#[async_trait]
pub trait CommandService: Send + Sync {
    async fn register(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn register_from_drive(
        &self,
        folder: String,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn fix_registration_names(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn registration_data(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn submit_zone_kp(
        &self,
        zone: i64,
        kp: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn submit_zone_kp_bulk(
        &self,
        zone: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn submit_prekvk_rank(
        &self,
        rank: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn submit_death_troops(
        &self,
        deaths: i64,
        screenshot: AttachmentRef,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn my_stats(
        &self,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;

    async fn leaderboard(
        &self,
        top: i64,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError>;
}

pub struct CommandRouter<S> {
    service: S,
}

impl<S> CommandRouter<S>
where
    S: CommandService,
{
    pub fn new(service: S) -> Self {
        Self { service }
    }

    pub async fn route(
        &self,
        payload: &SlashCommandPayload,
        ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        let command =
            parse_command(payload).map_err(|error| CommandError::Input(error.to_string()))?;

        match command {
            BotCommand::Register => self.service.register(ctx).await,
            BotCommand::RegisterFromDrive { folder } => {
                self.service.register_from_drive(folder, ctx).await
            }
            BotCommand::FixRegistrationNames => self.service.fix_registration_names(ctx).await,
            BotCommand::GetRegistrationData => self.service.registration_data(ctx).await,
            BotCommand::SubmitZoneKp { zone, kp, screenshot } => {
                self.service.submit_zone_kp(zone, kp, screenshot, ctx).await
            }
            BotCommand::SubmitZoneKpBulk { zone, screenshot } => {
                self.service.submit_zone_kp_bulk(zone, screenshot, ctx).await
            }
            BotCommand::SubmitPrekvkRank { rank, screenshot } => {
                self.service.submit_prekvk_rank(rank, screenshot, ctx).await
            }
            BotCommand::SubmitDeathTroops { deaths, screenshot } => {
                self.service.submit_death_troops(deaths, screenshot, ctx).await
            }
            BotCommand::MyStats => self.service.my_stats(ctx).await,
            BotCommand::Leaderboard { top } => self.service.leaderboard(top, ctx).await,
        }
    }
}

/// Answers every command with a preview notice; keeps the dispatcher usable
/// before real collaborators are wired in.
#[derive(Default)]
pub struct NoopCommandService;

impl NoopCommandService {
    fn preview(command: &str) -> Result<Option<MessageTemplate>, CommandError> {
        Ok(Some(crate::render::notice(
            "Preview mode",
            &format!("`/{command}` received; no backend is wired up yet."),
        )))
    }
}

#[async_trait]
impl CommandService for NoopCommandService {
    async fn register(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("register")
    }

    async fn register_from_drive(
        &self,
        _folder: String,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("register-from-drive")
    }

    async fn fix_registration_names(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("fix-registration-names")
    }

    async fn registration_data(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("get-registration-data")
    }

    async fn submit_zone_kp(
        &self,
        _zone: i64,
        _kp: i64,
        _screenshot: AttachmentRef,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("submit-zone-kp")
    }

    async fn submit_zone_kp_bulk(
        &self,
        _zone: i64,
        _screenshot: AttachmentRef,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("submit-zone-kp-bulk")
    }

    async fn submit_prekvk_rank(
        &self,
        _rank: i64,
        _screenshot: AttachmentRef,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("submit-prekvk-rank")
    }

    async fn submit_death_troops(
        &self,
        _deaths: i64,
        _screenshot: AttachmentRef,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("submit-death-troops")
    }

    async fn my_stats(
        &self,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("my-stats")
    }

    async fn leaderboard(
        &self,
        _top: i64,
        _ctx: &CommandContext,
    ) -> Result<Option<MessageTemplate>, CommandError> {
        Self::preview("leaderboard")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use kingscribe_core::CommandError;

    use crate::messages::MessageTemplate;

    use super::{
        parse_command, AttachmentRef, BotCommand, CommandContext, CommandOption,
        CommandParseError, CommandRouter, CommandService, OptionValue, SlashCommandPayload,
        DEFAULT_LEADERBOARD_TOP,
    };

    fn payload(command: &str, options: Vec<CommandOption>) -> SlashCommandPayload {
        SlashCommandPayload {
            interaction_id: "int-1".to_owned(),
            command: command.to_owned(),
            channel_id: "chan-1".to_owned(),
            user_id: "gov-1".to_owned(),
            options,
        }
    }

    fn image_option(name: &str) -> CommandOption {
        CommandOption {
            name: name.to_owned(),
            value: OptionValue::Attachment(AttachmentRef {
                url: "https://cdn.example/shot.png".to_owned(),
                filename: "shot.png".to_owned(),
                content_type: Some("image/png".to_owned()),
            }),
        }
    }

    fn int_option(name: &str, value: i64) -> CommandOption {
        CommandOption { name: name.to_owned(), value: OptionValue::Integer(value) }
    }

    #[test]
    fn parses_submit_zone_kp_with_bounds() {
        let command = parse_command(&payload(
            "submit-zone-kp",
            vec![int_option("zone", 5), int_option("kp", 1_200_000), image_option("screenshot")],
        ))
        .expect("parse");

        assert!(matches!(
            command,
            BotCommand::SubmitZoneKp { zone: 5, kp: 1_200_000, .. }
        ));
    }

    #[test]
    fn zone_below_minimum_is_rejected() {
        let error = parse_command(&payload(
            "submit-zone-kp",
            vec![int_option("zone", 0), int_option("kp", 10), image_option("screenshot")],
        ))
        .expect_err("zone 0 invalid");

        assert_eq!(error, CommandParseError::BelowMinimum { option: "zone", minimum: 1 });
    }

    #[test]
    fn non_image_attachment_is_rejected_locally() {
        let error = parse_command(&payload(
            "submit-death-troops",
            vec![
                int_option("deaths", 40_000),
                CommandOption {
                    name: "screenshot".to_owned(),
                    value: OptionValue::Attachment(AttachmentRef {
                        url: "https://cdn.example/log.txt".to_owned(),
                        filename: "log.txt".to_owned(),
                        content_type: Some("text/plain".to_owned()),
                    }),
                },
            ],
        ))
        .expect_err("text attachment invalid");

        assert!(matches!(error, CommandParseError::NotAnImage { option: "screenshot", .. }));
    }

    #[test]
    fn leaderboard_defaults_top_and_enforces_minimum() {
        let command = parse_command(&payload("leaderboard", Vec::new())).expect("parse");
        assert_eq!(command, BotCommand::Leaderboard { top: DEFAULT_LEADERBOARD_TOP });

        let error = parse_command(&payload("leaderboard", vec![int_option("top", 0)]))
            .expect_err("top 0 invalid");
        assert_eq!(error, CommandParseError::BelowMinimum { option: "top", minimum: 1 });
    }

    #[test]
    fn register_from_drive_requires_folder() {
        let error =
            parse_command(&payload("register-from-drive", Vec::new())).expect_err("no folder");
        assert!(matches!(error, CommandParseError::MissingOption { option: "folder", .. }));
    }

    #[test]
    fn unknown_commands_are_rejected() {
        let error = parse_command(&payload("make-coffee", Vec::new())).expect_err("unknown");
        assert_eq!(error, CommandParseError::UnknownCommand("make-coffee".to_owned()));
    }

    #[tokio::test]
    async fn router_calls_service_entrypoints() {
        #[derive(Default)]
        struct RecordingService {
            calls: Mutex<Vec<&'static str>>,
        }

        impl RecordingService {
            fn record(&self, name: &'static str) -> Result<Option<MessageTemplate>, CommandError> {
                self.calls.lock().expect("lock").push(name);
                Ok(None)
            }
        }

        #[async_trait]
        impl CommandService for RecordingService {
            async fn register(
                &self,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("register")
            }

            async fn register_from_drive(
                &self,
                _folder: String,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("register_from_drive")
            }

            async fn fix_registration_names(
                &self,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("fix_registration_names")
            }

            async fn registration_data(
                &self,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("registration_data")
            }

            async fn submit_zone_kp(
                &self,
                _zone: i64,
                _kp: i64,
                _screenshot: AttachmentRef,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("submit_zone_kp")
            }

            async fn submit_zone_kp_bulk(
                &self,
                _zone: i64,
                _screenshot: AttachmentRef,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("submit_zone_kp_bulk")
            }

            async fn submit_prekvk_rank(
                &self,
                _rank: i64,
                _screenshot: AttachmentRef,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("submit_prekvk_rank")
            }

            async fn submit_death_troops(
                &self,
                _deaths: i64,
                _screenshot: AttachmentRef,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("submit_death_troops")
            }

            async fn my_stats(
                &self,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("my_stats")
            }

            async fn leaderboard(
                &self,
                _top: i64,
                _ctx: &CommandContext,
            ) -> Result<Option<MessageTemplate>, CommandError> {
                self.record("leaderboard")
            }
        }

        let router = CommandRouter::new(RecordingService::default());
        let invocations = [
            payload("register", Vec::new()),
            payload(
                "submit-zone-kp",
                vec![int_option("zone", 1), int_option("kp", 5), image_option("screenshot")],
            ),
            payload("my-stats", Vec::new()),
            payload("leaderboard", vec![int_option("top", 25)]),
        ];

        for invocation in &invocations {
            let ctx = CommandContext::from_payload(invocation, "req-1");
            router.route(invocation, &ctx).await.expect("route");
        }

        let calls = router.service.calls.lock().expect("lock");
        assert_eq!(&*calls, &["register", "submit_zone_kp", "my_stats", "leaderboard"]);
    }

    #[test]
    fn parse_errors_map_to_input_errors() {
        let error = parse_command(&payload("leaderboard", vec![int_option("top", -5)]))
            .expect_err("invalid top");
        let command_error = CommandError::Input(error.to_string());
        assert!(command_error.user_message().contains("`top`"));
    }
}
