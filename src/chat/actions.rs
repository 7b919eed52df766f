//! The declared actions the model may invoke, and their phase legality.
//!
//! The action set is the model's only channel for requesting a phase
//! transition. Every invocation is validated against the current phase
//! before it is applied; an illegal or malformed call is rejected and the
//! user is reprompted.

use serde_json::json;

use crate::chat::phase::Phase;
use crate::chat::state::UserField;
use crate::llm::{ToolCall, ToolDefinition};

pub const RECORD_SERVICE_SELECTION: &str = "record_service_selection";
pub const RECORD_USER_FIELD: &str = "record_user_field";
pub const PERSIST_RECORD: &str = "persist_record";

/// A structured operation requested by the model.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Record the resolved service id and the user's zip code, atomically.
    RecordServiceSelection { service_id: String, zip: String },
    /// Record one contact detail.
    RecordUserField { field: UserField, value: String },
    /// Persist the assembled record. The server owns the collected data, so
    /// the action carries no arguments.
    PersistRecord,
}

impl Action {
    /// Decode a model tool call. Fails with a reason when the call names an
    /// unknown action or omits a required argument. Argument types beyond
    /// required-field presence are trusted per the declared schema.
    pub fn from_tool_call(call: &ToolCall) -> Result<Self, String> {
        match call.name.as_str() {
            RECORD_SERVICE_SELECTION => {
                let service_id = required_str(&call.arguments, "serviceId")?;
                let zip = required_str(&call.arguments, "zip")?;
                Ok(Action::RecordServiceSelection { service_id, zip })
            }
            RECORD_USER_FIELD => {
                let field_name = required_str(&call.arguments, "field")?;
                let value = required_str(&call.arguments, "value")?;
                let field = UserField::from_name(&field_name)
                    .ok_or_else(|| format!("unknown field {field_name:?}"))?;
                Ok(Action::RecordUserField { field, value })
            }
            PERSIST_RECORD => Ok(Action::PersistRecord),
            other => Err(format!("unknown action {other:?}")),
        }
    }

    /// Whether this action may be applied in the given phase.
    pub fn allowed_in(&self, phase: Phase) -> bool {
        match self {
            Action::RecordServiceSelection { .. } => phase == Phase::ServiceSelection,
            // Also legal while confirming, so the user can correct a field.
            Action::RecordUserField { .. } => {
                matches!(phase, Phase::CollectingDetails | Phase::ConfirmingDetails)
            }
            Action::PersistRecord => phase == Phase::ConfirmingDetails,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::RecordServiceSelection { .. } => RECORD_SERVICE_SELECTION,
            Action::RecordUserField { .. } => RECORD_USER_FIELD,
            Action::PersistRecord => PERSIST_RECORD,
        }
    }
}

fn required_str(arguments: &serde_json::Value, key: &str) -> Result<String, String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| format!("missing required argument {key:?}"))
}

/// The full action set declared to the model on every turn.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: RECORD_SERVICE_SELECTION.to_string(),
            description: "Save the selected service ID together with the user's zip code. \
                          Call this once the user has made a final service choice and \
                          provided their zip code."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "serviceId": { "type": "string" },
                    "zip": { "type": "string" }
                },
                "required": ["serviceId", "zip"]
            }),
        },
        ToolDefinition {
            name: RECORD_USER_FIELD.to_string(),
            description: "Save one user contact detail as soon as it is provided."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "field": { "type": "string", "enum": ["name", "phone", "email", "address"] },
                    "value": { "type": "string" }
                },
                "required": ["field", "value"]
            }),
        },
        ToolDefinition {
            name: PERSIST_RECORD.to_string(),
            description: "Save the completed request once the user has confirmed the \
                          collected details."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {}
            }),
        },
    ]
}
