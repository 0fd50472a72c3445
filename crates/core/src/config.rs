use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Slash commands the bot exposes; each may be bound to one permitted
/// channel. Binding names double as config keys and env-var suffixes.
pub const COMMAND_NAMES: [&str; 10] = [
    "register",
    "register-from-drive",
    "fix-registration-names",
    "get-registration-data",
    "submit-zone-kp",
    "submit-zone-kp-bulk",
    "submit-prekvk-rank",
    "submit-death-troops",
    "my-stats",
    "leaderboard",
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub discord: DiscordConfig,
    pub backend: BackendConfig,
    pub channels: ChannelBindings,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DiscordConfig {
    pub bot_token: SecretString,
    pub application_id: String,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub liveness_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Per-command permitted-channel identifiers. A command with no binding is a
/// soft configuration error surfaced to the invoking user, never a crash.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChannelBindings {
    bindings: BTreeMap<String, String>,
}

impl ChannelBindings {
    pub fn bind(&mut self, command: impl Into<String>, channel_id: impl Into<String>) {
        self.bindings.insert(command.into(), channel_id.into());
    }

    pub fn channel_for(&self, command: &str) -> Option<&str> {
        self.bindings.get(command).map(String::as_str)
    }

    pub fn commands_without_binding(&self) -> Vec<&'static str> {
        COMMAND_NAMES
            .into_iter()
            .filter(|command| !self.bindings.contains_key(*command))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(command, channel)| (command.as_str(), channel.as_str()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub bot_token: Option<String>,
    pub application_id: Option<String>,
    pub backend_url: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            discord: DiscordConfig {
                bot_token: String::new().into(),
                application_id: String::new(),
            },
            backend: BackendConfig { base_url: String::new(), timeout_secs: 30 },
            channels: ChannelBindings::default(),
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), liveness_port: 8080 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("kingscribe.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(discord) = patch.discord {
            if let Some(bot_token_value) = discord.bot_token {
                self.discord.bot_token = bot_token_value.into();
            }
            if let Some(application_id) = discord.application_id {
                self.discord.application_id = application_id;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(timeout_secs) = backend.timeout_secs {
                self.backend.timeout_secs = timeout_secs;
            }
        }

        if let Some(channels) = patch.channels {
            for (command, channel_id) in channels {
                self.channels.bind(command, channel_id);
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(liveness_port) = server.liveness_port {
                self.server.liveness_port = liveness_port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("KINGSCRIBE_DISCORD_BOT_TOKEN") {
            self.discord.bot_token = value.into();
        }
        if let Some(value) = read_env("KINGSCRIBE_DISCORD_APPLICATION_ID") {
            self.discord.application_id = value;
        }

        if let Some(value) = read_env("KINGSCRIBE_BACKEND_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("KINGSCRIBE_BACKEND_TIMEOUT_SECS") {
            self.backend.timeout_secs = parse_env("KINGSCRIBE_BACKEND_TIMEOUT_SECS", &value)?;
        }

        for command in COMMAND_NAMES {
            let var = channel_env_var(command);
            if let Some(value) = read_env(&var) {
                self.channels.bind(command, value);
            }
        }

        if let Some(value) = read_env("KINGSCRIBE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("KINGSCRIBE_SERVER_LIVENESS_PORT") {
            self.server.liveness_port = parse_env("KINGSCRIBE_SERVER_LIVENESS_PORT", &value)?;
        }

        let log_level =
            read_env("KINGSCRIBE_LOGGING_LEVEL").or_else(|| read_env("KINGSCRIBE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("KINGSCRIBE_LOGGING_FORMAT").or_else(|| read_env("KINGSCRIBE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bot_token) = overrides.bot_token {
            self.discord.bot_token = bot_token.into();
        }
        if let Some(application_id) = overrides.application_id {
            self.discord.application_id = application_id;
        }
        if let Some(backend_url) = overrides.backend_url {
            self.backend.base_url = backend_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_discord(&self.discord)?;
        validate_backend(&self.backend)?;
        validate_channels(&self.channels)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

/// Env-var suffix for a command's channel binding:
/// `submit-zone-kp` -> `KINGSCRIBE_CHANNEL_SUBMIT_ZONE_KP`.
pub fn channel_env_var(command: &str) -> String {
    format!("KINGSCRIBE_CHANNEL_{}", command.replace('-', "_").to_ascii_uppercase())
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("kingscribe.toml"), PathBuf::from("config/kingscribe.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Replaces `${VAR}` markers in raw TOML with the variable's value before
/// parsing; an unset variable is an error, not an empty string.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after_marker = &rest[start + 2..];
        let Some(end) = after_marker.find('}') else {
            return Err(ConfigError::UnterminatedInterpolation);
        };

        let var = &after_marker[..end];
        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_owned() })?;
        output.push_str(&value);
        rest = &after_marker[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn validate_discord(discord: &DiscordConfig) -> Result<(), ConfigError> {
    if discord.bot_token.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.bot_token is required. Get it from the Discord developer portal > Your App \
             > Bot > Token"
                .to_string(),
        ));
    }

    if discord.application_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "discord.application_id is required for slash command registration".to_string(),
        ));
    }

    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    // An unset endpoint is a soft gap: commands answer with a
    // configuration-error reply instead of failing the process.
    let url = backend.base_url.trim();
    if !url.is_empty() && !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }

    if backend.timeout_secs == 0 || backend.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "backend.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_channels(channels: &ChannelBindings) -> Result<(), ConfigError> {
    for (command, channel_id) in channels.iter() {
        if !COMMAND_NAMES.contains(&command) {
            return Err(ConfigError::Validation(format!(
                "channels.{command} does not name a known command"
            )));
        }
        if channel_id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "channels.{command} must not be empty"
            )));
        }
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.liveness_port == 0 {
        return Err(ConfigError::Validation(
            "server.liveness_port must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    discord: Option<DiscordPatch>,
    backend: Option<BackendPatch>,
    channels: Option<BTreeMap<String, String>>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DiscordPatch {
    bot_token: Option<String>,
    application_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    liveness_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
