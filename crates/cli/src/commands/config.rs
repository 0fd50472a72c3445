use std::env;

use kingscribe_core::config::{channel_env_var, AppConfig, LoadOptions, COMMAND_NAMES};
use secrecy::ExposeSecret;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];

    lines.push(render_line(
        "discord.bot_token",
        &redact_token(config.discord.bot_token.expose_secret()),
        "KINGSCRIBE_DISCORD_BOT_TOKEN",
    ));
    lines.push(render_line(
        "discord.application_id",
        &config.discord.application_id,
        "KINGSCRIBE_DISCORD_APPLICATION_ID",
    ));
    lines.push(render_line("backend.base_url", &config.backend.base_url, "KINGSCRIBE_BACKEND_URL"));
    lines.push(render_line(
        "backend.timeout_secs",
        &config.backend.timeout_secs.to_string(),
        "KINGSCRIBE_BACKEND_TIMEOUT_SECS",
    ));
    lines.push(render_line(
        "server.bind_address",
        &config.server.bind_address,
        "KINGSCRIBE_SERVER_BIND_ADDRESS",
    ));
    lines.push(render_line(
        "server.liveness_port",
        &config.server.liveness_port.to_string(),
        "KINGSCRIBE_SERVER_LIVENESS_PORT",
    ));
    lines.push(render_line("logging.level", &config.logging.level, "KINGSCRIBE_LOGGING_LEVEL"));

    for command in COMMAND_NAMES {
        let var = channel_env_var(command);
        let value = config
            .channels
            .channel_for(command)
            .map(str::to_owned)
            .unwrap_or_else(|| "(unbound)".to_string());
        lines.push(render_line(&format!("channels.{command}"), &value, &var));
    }

    lines.join("\n")
}

fn render_line(key: &str, value: &str, env_var: &str) -> String {
    let source = if env::var(env_var).map(|raw| !raw.trim().is_empty()).unwrap_or(false) {
        format!("env:{env_var}")
    } else {
        "file/default".to_string()
    };
    format!("  {key} = {value} ({source})")
}

fn redact_token(token: &str) -> String {
    if token.is_empty() {
        return "(unset)".to_string();
    }
    if token.len() <= 4 {
        return "****".to_string();
    }
    format!("{}****", &token[..4])
}

#[cfg(test)]
mod tests {
    use super::redact_token;

    #[test]
    fn tokens_are_redacted_to_a_short_prefix() {
        assert_eq!(redact_token("abcdef123456"), "abcd****");
        assert_eq!(redact_token("abc"), "****");
        assert_eq!(redact_token(""), "(unset)");
    }
}
