use serde::Serialize;
use serde_json::Value;

/// Wire envelope posted to the stats backend: `{command, data}`.
///
/// `data` always carries the invoking user's identifier under `userId`
/// whenever the backend needs to attribute the action.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CommandEnvelope {
    pub command: String,
    pub data: Value,
}

impl CommandEnvelope {
    pub fn new(command: impl Into<String>, data: Value) -> Self {
        Self { command: command.into(), data }
    }
}

/// Backend-reported outcome. Anything the backend sends that is not a
/// recognized status string decodes to `Unknown` rather than failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultStatus {
    Success,
    Partial,
    Error,
    Unknown,
}

impl ResultStatus {
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "partial" => Self::Partial,
            "error" => Self::Error,
            _ => Self::Unknown,
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Decoded backend response. The backend enforces no schema beyond the
/// status/message/details envelope, so decoding is lenient: missing fields
/// become empty message / null details and callers fall back to placeholders.
#[derive(Clone, Debug, PartialEq)]
pub struct BackendResult {
    pub status: ResultStatus,
    pub message: String,
    pub details: Value,
}

impl BackendResult {
    pub fn from_value(value: Value) -> Self {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(ResultStatus::from_wire)
            .unwrap_or(ResultStatus::Unknown);
        let message =
            value.get("message").and_then(Value::as_str).unwrap_or_default().to_owned();
        let details = value.get("details").cloned().unwrap_or(Value::Null);

        Self { status, message, details }
    }

    /// Looks up a detail field by key; `None` when details are absent or not
    /// an object.
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_object().and_then(|details| details.get(key))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{BackendResult, CommandEnvelope, ResultStatus};

    #[test]
    fn envelope_serializes_to_command_and_data() {
        let envelope = CommandEnvelope::new("submit_zone_kp", json!({"userId": "1234", "zone": 5}));
        let wire = serde_json::to_value(&envelope).expect("serialize");

        assert_eq!(wire, json!({"command": "submit_zone_kp", "data": {"userId": "1234", "zone": 5}}));
    }

    #[test]
    fn result_decodes_recognized_statuses() {
        for (raw, expected) in [
            ("success", ResultStatus::Success),
            ("Partial", ResultStatus::Partial),
            (" ERROR ", ResultStatus::Error),
            ("weird", ResultStatus::Unknown),
        ] {
            assert_eq!(ResultStatus::from_wire(raw), expected);
        }
    }

    #[test]
    fn result_tolerates_missing_message_and_details() {
        let result = BackendResult::from_value(json!({"status": "success"}));

        assert_eq!(result.status, ResultStatus::Success);
        assert!(result.message.is_empty());
        assert!(result.details.is_null());
        assert_eq!(result.detail("updatedCount"), None);
    }

    #[test]
    fn result_without_status_is_unknown() {
        let result = BackendResult::from_value(json!({"message": "hm"}));
        assert_eq!(result.status, ResultStatus::Unknown);
        assert_eq!(result.message, "hm");
    }

    #[test]
    fn detail_lookup_reads_object_fields() {
        let result = BackendResult::from_value(json!({
            "status": "success",
            "details": {"updatedCount": 5}
        }));

        assert_eq!(result.detail("updatedCount"), Some(&json!(5)));
        assert_eq!(result.detail("missing"), None);
    }
}
