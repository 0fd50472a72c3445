use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use kingscribe_backend::{
    BackendClient, BackendError, HttpBackendClient, HttpMediaFetcher, MediaFetcher,
};
use kingscribe_core::config::{AppConfig, ConfigError, LoadOptions};
use kingscribe_discord::events::{
    ComponentHandler, EventDispatcher, MessageReplyHandler, ModalSubmitHandler,
    SlashCommandHandler,
};
use kingscribe_discord::gateway::{Gateway, GatewayRunner, NoopGateway, ReconnectPolicy};
use kingscribe_discord::service::StatsCommandService;
use kingscribe_discord::workflow::RegistrationWorkflow;

pub struct Application {
    pub config: AppConfig,
    pub runner: GatewayRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("backend client construction failed: {0}")]
    Backend(#[from] BackendError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let unbound = config.channels.commands_without_binding();
    if !unbound.is_empty() {
        // Soft configuration gap: those commands answer with a
        // configuration-error reply instead of reaching the backend.
        warn!(
            event_name = "system.bootstrap.unbound_commands",
            correlation_id = "bootstrap",
            commands = ?unbound,
            "commands without a channel binding"
        );
    }

    let gateway: Arc<dyn Gateway> = Arc::new(NoopGateway);
    let backend: Arc<dyn BackendClient> = Arc::new(HttpBackendClient::new(&config.backend)?);
    let media: Arc<dyn MediaFetcher> = Arc::new(HttpMediaFetcher::new());

    if let Err(error) = gateway
        .register_commands(&config.discord.application_id, &kingscribe_core::config::COMMAND_NAMES)
        .await
    {
        // The bot can still serve previously registered commands.
        warn!(
            event_name = "system.bootstrap.command_registration_failed",
            correlation_id = "bootstrap",
            error = %error,
            "slash command registration failed"
        );
    }

    let workflow =
        Arc::new(RegistrationWorkflow::new(gateway.clone(), backend.clone(), media.clone()));
    let service = StatsCommandService::new(
        backend,
        media,
        config.channels.clone(),
        workflow.clone(),
    );

    let mut dispatcher = EventDispatcher::new();
    dispatcher.register(SlashCommandHandler::new(service));
    dispatcher.register(ComponentHandler::new(workflow.clone()));
    dispatcher.register(ModalSubmitHandler::new(workflow.clone()));
    dispatcher.register(MessageReplyHandler::new(workflow));

    info!(
        event_name = "system.bootstrap.dispatcher_ready",
        correlation_id = "bootstrap",
        handler_count = dispatcher.handler_count(),
        "event dispatcher wired"
    );

    let runner = GatewayRunner::new(gateway, dispatcher, ReconnectPolicy::default());

    Ok(Application { config, runner })
}

#[cfg(test)]
mod tests {
    use kingscribe_core::config::{ConfigError, ConfigOverrides, LoadOptions};

    use super::{bootstrap, BootstrapError};

    fn overrides() -> ConfigOverrides {
        ConfigOverrides {
            bot_token: Some("token-abc".to_owned()),
            application_id: Some("app-123".to_owned()),
            backend_url: Some("https://backend.example/exec".to_owned()),
            ..ConfigOverrides::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_the_bot_credential() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides { bot_token: None, ..overrides() },
            ..LoadOptions::default()
        })
        .await;

        let error = match result {
            Ok(_) => panic!("bootstrap must fail without a credential"),
            Err(error) => error,
        };
        assert!(matches!(
            error,
            BootstrapError::Config(ConfigError::Validation(ref message))
                if message.contains("discord.bot_token")
        ));
    }

    #[tokio::test]
    async fn bootstrap_wires_the_runner_with_valid_config() {
        let app = bootstrap(LoadOptions {
            overrides: overrides(),
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap");

        assert_eq!(app.config.backend.base_url, "https://backend.example/exec");
    }
}
