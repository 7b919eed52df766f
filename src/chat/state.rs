//! Per-conversation state: phase, walker position, history, collected data.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::chat::phase::Phase;
use crate::llm::ChatMessage;
use crate::tree::Choice;

/// The contact fields collected one at a time after service selection, in
/// prompt order.
pub const DETAIL_FIELDS: [UserField; 4] = [
    UserField::Name,
    UserField::Phone,
    UserField::Email,
    UserField::Address,
];

/// A contact detail field the model may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserField {
    Name,
    Phone,
    Email,
    Address,
}

impl UserField {
    /// Parse the field name used in the action contract.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "phone" => Some(Self::Phone),
            "email" => Some(Self::Email),
            "address" => Some(Self::Address),
            _ => None,
        }
    }

    /// How the field is asked for in a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Name => "full name",
            Self::Phone => "phone number",
            Self::Email => "email address",
            Self::Address => "street address",
        }
    }
}

impl std::fmt::Display for UserField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Address => "address",
        };
        write!(f, "{s}")
    }
}

/// Structured data captured over one dialogue cycle.
///
/// The service id and zip code are private and only settable together, so
/// they are never partially present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedData {
    service_id: Option<String>,
    zip: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl CollectedData {
    /// Record the selected service and zip code atomically.
    pub fn set_service(&mut self, service_id: impl Into<String>, zip: impl Into<String>) {
        self.service_id = Some(service_id.into());
        self.zip = Some(zip.into());
    }

    /// The service id and zip, when recorded.
    pub fn service(&self) -> Option<(&str, &str)> {
        match (self.service_id.as_deref(), self.zip.as_deref()) {
            (Some(service_id), Some(zip)) => Some((service_id, zip)),
            _ => None,
        }
    }

    pub fn has_service(&self) -> bool {
        self.service().is_some()
    }

    pub fn set_field(&mut self, field: UserField, value: impl Into<String>) {
        let slot = match field {
            UserField::Name => &mut self.name,
            UserField::Phone => &mut self.phone,
            UserField::Email => &mut self.email,
            UserField::Address => &mut self.address,
        };
        *slot = Some(value.into());
    }

    pub fn get_field(&self, field: UserField) -> Option<&str> {
        match field {
            UserField::Name => self.name.as_deref(),
            UserField::Phone => self.phone.as_deref(),
            UserField::Email => self.email.as_deref(),
            UserField::Address => self.address.as_deref(),
        }
    }

    /// The first unset contact field, in the fixed prompt order.
    pub fn next_missing_field(&self) -> Option<UserField> {
        DETAIL_FIELDS
            .into_iter()
            .find(|field| self.get_field(*field).is_none())
    }

    /// Whether all contact fields have been recorded.
    pub fn details_complete(&self) -> bool {
        self.next_missing_field().is_none()
    }

    /// Human-readable summary for the confirmation step.
    ///
    /// Deliberately omits the service identifier — it is internal routing
    /// data, never shown to the user.
    pub fn confirmation_summary(&self) -> String {
        let mut lines = Vec::new();
        if let Some(zip) = self.zip.as_deref() {
            lines.push(format!("- Zip code: {zip}"));
        }
        for field in DETAIL_FIELDS {
            if let Some(value) = self.get_field(field) {
                lines.push(format!("- {}: {value}", capitalize(&field.to_string())));
            }
        }
        lines.join("\n")
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// One logical conversation, keyed by session id in the orchestrator.
#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    pub phase: Phase,
    pub current_question: Option<String>,
    pub current_choices: Option<BTreeMap<String, Choice>>,
    /// Service id resolved by the tree walker, held until the model records
    /// it together with a zip code. Not part of `collected` — the pair is
    /// only set atomically by the record action.
    pub pending_service_id: Option<String>,
    /// Ordered message history, replayed verbatim to the LLM each turn.
    pub history: Vec<ChatMessage>,
    pub collected: CollectedData,
    /// Completed persist cycles; part of the idempotency key.
    pub cycle: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: &str) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn push_assistant(&mut self, content: &str) {
        self.history.push(ChatMessage::assistant(content));
    }

    /// Restart the selection flow without completing the cycle (the user
    /// picked a new category mid-conversation). History is retained.
    pub fn restart_selection(&mut self) {
        self.phase = Phase::CategorySelection;
        self.current_question = None;
        self.current_choices = None;
        self.pending_service_id = None;
        self.collected = CollectedData::default();
    }

    /// Reset for a new cycle after a successful persist. History is
    /// retained; the cycle counter advances so the next persist gets a
    /// fresh idempotency key.
    pub fn reset_cycle(&mut self) {
        self.restart_selection();
        self.cycle += 1;
    }

    /// Idempotency key for the current cycle's persist.
    pub fn idempotency_key(&self, session_id: &str) -> String {
        format!("{session_id}:{}", self.cycle)
    }
}
