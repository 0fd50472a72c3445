use serde_json::Value;

use kingscribe_core::export::{format_number, ExportSpec, SheetGrid};
use kingscribe_core::registration::{AccountKind, MainStatus, RegistrationSession};
use kingscribe_core::{BackendResult, CommandError, ResultStatus};

use crate::messages::{
    colors, Button, ButtonStyle, FilePayload, MessageBuilder, MessageTemplate, ModalTemplate,
    SelectMenu, SelectOption, TextInput,
};

pub const FAILURE_LIST_MAX_ENTRIES: usize = 10;
pub const FAILURE_LIST_MAX_CHARS: usize = 1000;

/// Component custom ids for the registration flow. Versioned so stale
/// prompts from an older build are recognizably foreign.
pub const KIND_SELECT: &str = "register.kind.v1";
pub const STATUS_SELECT: &str = "register.status.v1";
pub const FILLER_SELECT: &str = "register.filler.v1";
pub const LINKED_ID_MODAL: &str = "register.linked_id.v1";
pub const LINKED_ID_INPUT: &str = "register.linked_id.input.v1";
pub const SUBMIT_BUTTON: &str = "register.submit.v1";
pub const RESTART_BUTTON: &str = "register.restart.v1";
pub const CANCEL_BUTTON: &str = "register.cancel.v1";

#[derive(Clone, Copy, Debug)]
pub struct FieldSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub numeric: bool,
}

/// How one command's backend result is laid out.
#[derive(Clone, Copy, Debug)]
pub struct ResultView {
    pub title: &'static str,
    pub fields: &'static [FieldSpec],
    pub failures_key: Option<&'static str>,
}

pub mod views {
    use super::{FieldSpec, ResultView};

    pub const REGISTER: ResultView = ResultView {
        title: "Registration",
        fields: &[
            FieldSpec { key: "governorName", label: "Governor", numeric: false },
            FieldSpec { key: "governorId", label: "Governor ID", numeric: false },
            FieldSpec { key: "accountType", label: "Account Type", numeric: false },
        ],
        failures_key: None,
    };

    pub const REGISTER_FROM_DRIVE: ResultView = ResultView {
        title: "Drive import",
        fields: &[
            FieldSpec { key: "importedCount", label: "Imported", numeric: true },
            FieldSpec { key: "skippedCount", label: "Skipped", numeric: true },
        ],
        failures_key: Some("failures"),
    };

    pub const FIX_REGISTRATION_NAMES: ResultView = ResultView {
        title: "Registration name sync",
        fields: &[
            FieldSpec { key: "updatedCount", label: "Updated", numeric: true },
            FieldSpec { key: "clearedCount", label: "Cleared", numeric: true },
            FieldSpec { key: "notFoundCount", label: "Not Found", numeric: true },
        ],
        failures_key: None,
    };

    pub const SUBMIT_ZONE_KP: ResultView = ResultView {
        title: "Zone kill points",
        fields: &[
            FieldSpec { key: "zone", label: "Zone", numeric: true },
            FieldSpec { key: "kp", label: "Kill Points", numeric: true },
            FieldSpec { key: "dkp", label: "DKP", numeric: true },
        ],
        failures_key: None,
    };

    pub const SUBMIT_ZONE_KP_BULK: ResultView = ResultView {
        title: "Zone kill points (bulk)",
        fields: &[
            FieldSpec { key: "submittedCount", label: "Submitted", numeric: true },
            FieldSpec { key: "failedCount", label: "Failed", numeric: true },
        ],
        failures_key: Some("failures"),
    };

    pub const SUBMIT_PREKVK_RANK: ResultView = ResultView {
        title: "Pre-KvK rank",
        fields: &[
            FieldSpec { key: "rank", label: "Rank", numeric: true },
            FieldSpec { key: "score", label: "Score", numeric: true },
        ],
        failures_key: None,
    };

    pub const SUBMIT_DEATH_TROOPS: ResultView = ResultView {
        title: "Dead troops",
        fields: &[
            FieldSpec { key: "deaths", label: "Dead Troops", numeric: true },
            FieldSpec { key: "dkp", label: "DKP", numeric: true },
        ],
        failures_key: None,
    };

    pub const MY_STATS: ResultView = ResultView {
        title: "Your stats",
        fields: &[
            FieldSpec { key: "governorName", label: "Governor", numeric: false },
            FieldSpec { key: "kp", label: "Kill Points", numeric: true },
            FieldSpec { key: "deaths", label: "Dead Troops", numeric: true },
            FieldSpec { key: "dkp", label: "DKP", numeric: true },
            FieldSpec { key: "rank", label: "Rank", numeric: true },
        ],
        failures_key: None,
    };
}

pub fn status_color(status: ResultStatus) -> u32 {
    match status {
        ResultStatus::Success => colors::SUCCESS,
        ResultStatus::Partial => colors::WARNING,
        ResultStatus::Error => colors::FAILURE,
        ResultStatus::Unknown => colors::NEUTRAL,
    }
}

/// Renders one backend result into an embed: summary line, labeled fields,
/// optional failure list, correlation footer.
pub fn result_message(
    view: &ResultView,
    result: &BackendResult,
    correlation_id: &str,
) -> MessageTemplate {
    let summary = if result.message.is_empty() {
        match result.status {
            ResultStatus::Success => "Done.".to_owned(),
            ResultStatus::Partial => "Partially completed.".to_owned(),
            ResultStatus::Error => "The backend reported an error.".to_owned(),
            ResultStatus::Unknown => "The backend returned an unrecognized response.".to_owned(),
        }
    } else {
        result.message.clone()
    };

    MessageBuilder::new(format!("{}: {summary}", view.title))
        .embed(|embed| {
            embed.title(view.title).description(summary.clone()).color(status_color(result.status));

            for spec in view.fields {
                embed.field(spec.label, field_value(result, spec));
            }

            if let Some(failures_key) = view.failures_key {
                if let Some(block) = result
                    .detail(failures_key)
                    .and_then(Value::as_array)
                    .and_then(|failures| failure_block(failures))
                {
                    embed.wide_field("Failures", block);
                }
            }

            embed.footer(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

fn field_value(result: &BackendResult, spec: &FieldSpec) -> String {
    let Some(value) = result.detail(spec.key) else {
        return "N/A".to_owned();
    };

    match value {
        Value::Null => "N/A".to_owned(),
        Value::Number(number) if spec.numeric => match number.as_i64() {
            Some(number) => format_number(number),
            None => number.to_string(),
        },
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => if *flag { "yes" } else { "no" }.to_owned(),
        other => other.to_string(),
    }
}

/// Formats a per-row failure list: at most `FAILURE_LIST_MAX_ENTRIES` lines,
/// truncated before the block would exceed `FAILURE_LIST_MAX_CHARS`, with a
/// marker reporting what was hidden.
pub fn failure_block(failures: &[Value]) -> Option<String> {
    if failures.is_empty() {
        return None;
    }

    let mut lines: Vec<String> = Vec::new();
    let mut total = 0usize;

    for (index, failure) in failures.iter().take(FAILURE_LIST_MAX_ENTRIES).enumerate() {
        let row = failure
            .get("row")
            .and_then(Value::as_i64)
            .unwrap_or(index as i64 + 1);
        let id = failure
            .get("id")
            .map(value_as_display)
            .unwrap_or_else(|| "unknown".to_owned());
        let reason = failure
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("unspecified")
            .to_owned();

        let line = format!("Row {row} (ID: {id}): {reason}");
        if total + line.len() + 1 > FAILURE_LIST_MAX_CHARS {
            break;
        }
        total += line.len() + 1;
        lines.push(line);
    }

    let hidden = failures.len() - lines.len();
    if hidden > 0 {
        lines.push(format!("… and {hidden} more row(s)"));
    }

    Some(lines.join("\n"))
}

fn value_as_display(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Leaderboard entries come back as `details.entries: [{rank, name, dkp}]`.
pub fn leaderboard_message(result: &BackendResult, top: i64, correlation_id: &str) -> MessageTemplate {
    let title = format!("DKP Leaderboard (Top {top})");
    let entries = result.detail("entries").and_then(Value::as_array);

    let description = match entries {
        Some(entries) if !entries.is_empty() => entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let rank = entry
                    .get("rank")
                    .and_then(Value::as_i64)
                    .unwrap_or(index as i64 + 1);
                let name = entry.get("name").and_then(Value::as_str).unwrap_or("N/A");
                let dkp = entry
                    .get("dkp")
                    .and_then(Value::as_i64)
                    .map(format_number)
                    .unwrap_or_else(|| "N/A".to_owned());
                format!("`#{rank}` {name} · {dkp} DKP")
            })
            .collect::<Vec<_>>()
            .join("\n"),
        _ => "No leaderboard data yet.".to_owned(),
    };

    MessageBuilder::new(format!("{title}\n{description}"))
        .embed(|embed| {
            embed
                .title(title.clone())
                .description(description)
                .color(status_color(result.status))
                .footer(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

const EXPORT_FILENAME: &str = "registration_data.csv";

/// The one command that answers with a file. `details.rows` is the 2-D
/// dataset; the governor id column is forced to text and the stat columns
/// get thousands separators. A header-only dataset degrades to plain text.
pub fn export_message(result: &BackendResult, correlation_id: &str) -> MessageTemplate {
    let spec = ExportSpec {
        forced_text_headers: vec!["Governor ID".to_owned(), "Linked Governor ID".to_owned()],
        numeric_headers: vec![
            "Power".to_owned(),
            "Kill Points".to_owned(),
            "Dead Troops".to_owned(),
            "DKP".to_owned(),
        ],
    };

    let rows: Vec<Vec<Value>> = result
        .detail("rows")
        .and_then(Value::as_array)
        .map(|rows| {
            rows.iter()
                .map(|row| row.as_array().cloned().unwrap_or_default())
                .collect()
        })
        .unwrap_or_default();

    match SheetGrid::from_rows(&rows, &spec) {
        Some(grid) => {
            let row_count = grid.row_count();
            MessageBuilder::new(format!("Registration data export ({row_count} rows)"))
                .embed(|embed| {
                    embed
                        .title("Registration data export")
                        .description(format!("{row_count} registered accounts attached."))
                        .color(status_color(result.status))
                        .footer(format!("Correlation ID: {correlation_id}"));
                })
                .attach(FilePayload {
                    filename: EXPORT_FILENAME.to_owned(),
                    bytes: grid.encode_csv(),
                })
                .build()
        }
        None => MessageBuilder::new("There is no registration data to export yet.")
            .embed(|embed| {
                embed
                    .title("Registration data export")
                    .description("There is no registration data to export yet.")
                    .color(colors::NEUTRAL)
                    .footer(format!("Correlation ID: {correlation_id}"));
            })
            .build(),
    }
}

/// Uniform command-fault presentation: the user-safe message in red, the
/// correlation id for support, nothing else.
pub fn error_reply(error: &CommandError, correlation_id: &str) -> MessageTemplate {
    let message = error.user_message();
    MessageBuilder::new(message.clone())
        .embed(|embed| {
            embed
                .description(message)
                .color(colors::FAILURE)
                .footer(format!("Correlation ID: {correlation_id}"));
        })
        .build()
}

pub fn notice(title: &str, body: &str) -> MessageTemplate {
    MessageBuilder::new(format!("{title}: {body}"))
        .embed(|embed| {
            embed.title(title).description(body).color(colors::NEUTRAL);
        })
        .build()
}

// Registration flow prompts. The session key is the message these are
// rendered into, so every step edits the same prompt in place.

pub fn account_kind_prompt() -> MessageTemplate {
    MessageBuilder::new("Registration: choose an account type")
        .embed(|embed| {
            embed
                .title("Account registration")
                .description("Which account are you registering?")
                .color(colors::NEUTRAL);
        })
        .select(SelectMenu {
            custom_id: KIND_SELECT.to_owned(),
            placeholder: "Account type".to_owned(),
            options: vec![
                SelectOption::new(AccountKind::Main.wire_value(), "Main account"),
                SelectOption::new(AccountKind::Farm.wire_value(), "Farm account"),
            ],
        })
        .buttons(|buttons| {
            buttons.button(Button::new(CANCEL_BUTTON, "Cancel").style(ButtonStyle::Danger));
        })
        .build()
}

pub fn status_prompt() -> MessageTemplate {
    MessageBuilder::new("Registration: choose your status")
        .embed(|embed| {
            embed
                .title("Account registration")
                .description("Pick the status for your main account.")
                .color(colors::NEUTRAL);
        })
        .select(SelectMenu {
            custom_id: STATUS_SELECT.to_owned(),
            placeholder: "Status".to_owned(),
            options: MainStatus::ALL
                .into_iter()
                .map(|status| SelectOption::new(status.wire_value(), status.label()))
                .collect(),
        })
        .buttons(flow_buttons)
        .build()
}

pub fn filler_prompt() -> MessageTemplate {
    MessageBuilder::new("Registration: is this farm a filler?")
        .embed(|embed| {
            embed
                .title("Account registration")
                .description("Is this farm a filler account?")
                .color(colors::NEUTRAL);
        })
        .select(SelectMenu {
            custom_id: FILLER_SELECT.to_owned(),
            placeholder: "Filler?".to_owned(),
            options: vec![SelectOption::new("yes", "Yes"), SelectOption::new("no", "No")],
        })
        .buttons(flow_buttons)
        .build()
}

pub fn linked_id_modal() -> ModalTemplate {
    ModalTemplate {
        custom_id: LINKED_ID_MODAL.to_owned(),
        title: "Linked main account".to_owned(),
        inputs: vec![TextInput {
            custom_id: LINKED_ID_INPUT.to_owned(),
            label: "Governor ID of the linked main".to_owned(),
            min_length: 4,
            max_length: 20,
            required: true,
        }],
    }
}

pub fn screenshot_prompt() -> MessageTemplate {
    MessageBuilder::new("Registration: reply with a profile screenshot")
        .embed(|embed| {
            embed
                .title("Account registration")
                .description(
                    "Reply to this message with a screenshot of the governor profile. \
                     Only image attachments are accepted; you have 2 minutes.",
                )
                .color(colors::NEUTRAL);
        })
        .buttons(flow_buttons)
        .build()
}

pub fn confirm_prompt(session: &RegistrationSession) -> MessageTemplate {
    MessageBuilder::new("Registration: confirm and submit")
        .embed(|embed| {
            embed
                .title("Confirm registration")
                .description("Submit this registration, or restart from the beginning.")
                .color(colors::WARNING);

            let kind = session
                .account_kind
                .map(|kind| kind.wire_value().to_owned())
                .unwrap_or_else(|| "N/A".to_owned());
            embed.field("Account Type", kind);

            match session.account_kind {
                Some(AccountKind::Farm) => {
                    let filler = match session.filler {
                        Some(true) => "yes",
                        Some(false) => "no",
                        None => "N/A",
                    };
                    embed.field("Filler", filler);
                    embed.field(
                        "Linked Governor ID",
                        session.linked_id.clone().unwrap_or_else(|| "N/A".to_owned()),
                    );
                }
                _ => {
                    embed.field(
                        "Status",
                        session
                            .status
                            .map(|status| status.label().to_owned())
                            .unwrap_or_else(|| "N/A".to_owned()),
                    );
                }
            }

            embed.field(
                "Screenshot",
                if session.screenshot.is_some() { "attached" } else { "missing" },
            );
        })
        .buttons(|buttons| {
            buttons
                .button(Button::new(SUBMIT_BUTTON, "Submit").style(ButtonStyle::Primary))
                .button(Button::new(RESTART_BUTTON, "Restart"))
                .button(Button::new(CANCEL_BUTTON, "Cancel").style(ButtonStyle::Danger));
        })
        .build()
}

pub fn cancelled_message() -> MessageTemplate {
    notice("Registration cancelled", "Nothing was submitted. Run `/register` to start over.")
}

fn flow_buttons(buttons: &mut crate::messages::ButtonsBuilder) {
    buttons
        .button(Button::new(RESTART_BUTTON, "Restart"))
        .button(Button::new(CANCEL_BUTTON, "Cancel").style(ButtonStyle::Danger));
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use kingscribe_core::{BackendResult, CommandError, ResultStatus};

    use crate::messages::colors;

    use super::{
        export_message, failure_block, leaderboard_message, result_message, status_color, views,
    };

    fn result(value: Value) -> BackendResult {
        BackendResult::from_value(value)
    }

    #[test]
    fn status_colors_follow_the_outcome() {
        assert_eq!(status_color(ResultStatus::Success), colors::SUCCESS);
        assert_eq!(status_color(ResultStatus::Partial), colors::WARNING);
        assert_eq!(status_color(ResultStatus::Error), colors::FAILURE);
        assert_eq!(status_color(ResultStatus::Unknown), colors::NEUTRAL);
    }

    #[test]
    fn name_sync_counts_render_with_their_labels() {
        let message = result_message(
            &views::FIX_REGISTRATION_NAMES,
            &result(json!({
                "status": "success",
                "details": {"updatedCount": 5, "clearedCount": 2, "notFoundCount": 1}
            })),
            "req-1",
        );

        let fields = &message.embeds[0].fields;
        let rendered: Vec<(&str, &str)> =
            fields.iter().map(|field| (field.name.as_str(), field.value.as_str())).collect();
        assert_eq!(
            rendered,
            vec![("Updated", "5"), ("Cleared", "2"), ("Not Found", "1")]
        );
    }

    #[test]
    fn absent_fields_render_as_placeholder() {
        let message = result_message(
            &views::MY_STATS,
            &result(json!({"status": "success", "details": {"kp": 1234567}})),
            "req-2",
        );

        let fields = &message.embeds[0].fields;
        assert_eq!(fields[0].value, "N/A");
        assert_eq!(fields[1].value, "1,234,567");
        assert_eq!(fields[3].value, "N/A");
    }

    #[test]
    fn failure_list_respects_the_entry_cap() {
        let failures: Vec<Value> = (1..=14)
            .map(|row| json!({"row": row, "id": format!("10{row:02}"), "reason": "bad row"}))
            .collect();

        let block = failure_block(&failures).expect("block");
        assert!(block.contains("Row 10"));
        assert!(!block.contains("Row 11"));
        assert!(block.contains("… and 4 more row(s)"));
    }

    #[test]
    fn failure_list_truncates_before_exceeding_the_char_cap() {
        // Lines are 103 chars + separator; nine fit under 1000, the tenth
        // would push past it and must be cut even though the entry cap is 10.
        let reason = "x".repeat(85);
        let failures: Vec<Value> = (1..=12)
            .map(|row| json!({"row": row, "id": format!("10{row:02}"), "reason": reason}))
            .collect();

        let block = failure_block(&failures).expect("block");
        assert!(block.contains("Row 9"));
        assert!(!block.contains(&format!("Row 10 (ID: 1010): {reason}")));
        assert!(block.contains("… and 3 more row(s)"));
        let body_without_marker = block
            .lines()
            .filter(|line| line.starts_with("Row"))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(body_without_marker.len() <= super::FAILURE_LIST_MAX_CHARS);
    }

    #[test]
    fn failure_entries_format_row_id_and_reason() {
        let block = failure_block(&[json!({"row": 3, "id": 9981, "reason": "name mismatch"})])
            .expect("block");
        assert_eq!(block, "Row 3 (ID: 9981): name mismatch");
    }

    #[test]
    fn header_only_export_is_plain_text_without_a_file() {
        let message = export_message(
            &result(json!({
                "status": "success",
                "details": {"rows": [["Governor ID", "Power"]]}
            })),
            "req-3",
        );

        assert!(message.attachments.is_empty());
        assert!(message.fallback_text.contains("no registration data"));
    }

    #[test]
    fn populated_export_attaches_a_csv_file() {
        let message = export_message(
            &result(json!({
                "status": "success",
                "details": {"rows": [
                    ["Governor ID", "Power"],
                    [77001122, 98765432]
                ]}
            })),
            "req-4",
        );

        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].filename, "registration_data.csv");
        let csv = String::from_utf8(message.attachments[0].bytes.clone()).expect("utf8");
        assert!(csv.contains("77001122"));
        assert!(csv.contains("98,765,432"));
    }

    #[test]
    fn leaderboard_lines_are_rank_name_dkp() {
        let message = leaderboard_message(
            &result(json!({
                "status": "success",
                "details": {"entries": [
                    {"rank": 1, "name": "Alice", "dkp": 1500000},
                    {"rank": 2, "name": "Bob", "dkp": 900000}
                ]}
            })),
            10,
            "req-5",
        );

        let description = message.embeds[0].description.as_deref().expect("description");
        assert!(description.contains("`#1` Alice · 1,500,000 DKP"));
        assert!(description.contains("`#2` Bob · 900,000 DKP"));
    }

    #[test]
    fn empty_leaderboard_says_so() {
        let message = leaderboard_message(
            &result(json!({"status": "success", "details": {"entries": []}})),
            10,
            "req-6",
        );
        assert!(message.fallback_text.contains("No leaderboard data yet."));
    }

    #[test]
    fn backend_error_message_passes_through_to_the_embed() {
        let message = result_message(
            &views::SUBMIT_ZONE_KP,
            &result(json!({"status": "error", "message": "governor is not registered"})),
            "req-7",
        );

        assert_eq!(message.embeds[0].color, Some(colors::FAILURE));
        assert_eq!(
            message.embeds[0].description.as_deref(),
            Some("governor is not registered")
        );
    }

    #[test]
    fn error_reply_uses_the_user_safe_message() {
        let error = CommandError::Transport("POST https://backend 500".to_owned());
        let message = super::error_reply(&error, "req-8");

        let description = message.embeds[0].description.as_deref().expect("description");
        assert!(!description.contains("500"));
        assert!(description.contains("could not be reached"));
        assert_eq!(
            message.embeds[0].footer.as_deref(),
            Some("Correlation ID: req-8")
        );
    }
}
