use kingscribe_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> String {
    let report = build_report();

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
    }

    render_human(&report)
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(DoctorCheck {
                name: "discord_credential_readiness",
                status: CheckStatus::Pass,
                details: "bot token and application id validated by config contract".to_string(),
            });
            checks.push(if config.backend.base_url.trim().is_empty() {
                DoctorCheck {
                    name: "backend_endpoint",
                    status: CheckStatus::Warn,
                    details: "backend endpoint is not configured; commands will answer with a \
                              configuration error"
                        .to_string(),
                }
            } else {
                DoctorCheck {
                    name: "backend_endpoint",
                    status: CheckStatus::Pass,
                    details: format!("backend endpoint set to {}", config.backend.base_url),
                }
            });
            checks.push(check_channel_bindings(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in
                ["discord_credential_readiness", "backend_endpoint", "channel_bindings"]
            {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let warned = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let overall_status = if failed {
        CheckStatus::Fail
    } else if warned {
        CheckStatus::Warn
    } else {
        CheckStatus::Pass
    };
    let summary = match overall_status {
        CheckStatus::Pass => "doctor: all readiness checks passed".to_string(),
        CheckStatus::Warn => "doctor: readiness checks passed with warnings".to_string(),
        _ => "doctor: one or more readiness checks failed".to_string(),
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_channel_bindings(config: &AppConfig) -> DoctorCheck {
    let unbound = config.channels.commands_without_binding();
    if unbound.is_empty() {
        DoctorCheck {
            name: "channel_bindings",
            status: CheckStatus::Pass,
            details: "every command has a permitted channel".to_string(),
        }
    } else {
        // Soft gap: those commands answer with a configuration-error reply.
        DoctorCheck {
            name: "channel_bindings",
            status: CheckStatus::Warn,
            details: format!("commands without a channel binding: {}", unbound.join(", ")),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = vec![report.summary.clone()];
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("  [{marker}] {}: {}", check.name, check.details));
    }
    lines.join("\n")
}
