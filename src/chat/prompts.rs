//! System instruction builder and the fixed per-action reply templates.
//!
//! Replies that accompany a phase transition come from these templates, not
//! from the model's free text, so transition prompts are deterministic.

use std::collections::BTreeMap;

use crate::chat::phase::Phase;
use crate::chat::state::{ConversationState, DETAIL_FIELDS, UserField};
use crate::tree::Choice;

/// Last-resort reply when both the primary and fallback LLM calls fail.
pub const STATIC_APOLOGY: &str =
    "I'm sorry — I'm having trouble responding right now. Please try again in a moment.";

/// Question asked once the walker reaches a terminal service.
pub const ZIP_QUESTION: &str = "What's your zip code?";

/// Build the system instruction for the current turn.
///
/// Embeds the phase, the walker position, and the partially collected data.
/// The raw service id is redacted once the dialogue moves past service
/// selection — it is routing data the user never sees.
pub fn system_instruction(state: &ConversationState) -> String {
    let mut instruction = String::from(
        "You are a polite and helpful assistant guiding a user through a service \
         selection process. Be concise: one or two sentences, one question at a time. \
         Never reveal internal service IDs to the user.\n",
    );

    instruction.push_str(&format!("\nCurrent phase: {}.\n", state.phase));

    match state.phase {
        Phase::CategorySelection => {
            instruction.push_str(
                "No category is selected yet. Ask the user to pick a service category \
                 from the form before anything else.\n",
            );
        }
        Phase::ServiceSelection => {
            if let Some(question) = state.current_question.as_deref() {
                instruction.push_str(&format!("Current question: {question:?}.\n"));
            }
            if let Some(choices) = state.current_choices.as_ref() {
                let rendered =
                    serde_json::to_string(choices).unwrap_or_else(|_| "{}".to_string());
                instruction.push_str(&format!(
                    "Available choices (label → next step or service ID): {rendered}.\n\
                     Guide the user to select one of these choices.\n"
                ));
            }
            if let Some(service_id) = state.pending_service_id.as_deref() {
                instruction.push_str(&format!(
                    "The user's final choice resolved to service ID {service_id:?}. \
                     Ask for their zip code, then call {} with that service ID and the zip.\n",
                    crate::chat::actions::RECORD_SERVICE_SELECTION,
                ));
            }
        }
        Phase::CollectingDetails | Phase::ConfirmingDetails => {
            instruction.push_str(&collected_overview(state));
            if state.phase == Phase::CollectingDetails {
                instruction.push_str(&format!(
                    "Collect the remaining details one at a time, in order. Call {} as \
                     soon as the user provides a value. Do not ask for information that \
                     has already been provided.\n",
                    crate::chat::actions::RECORD_USER_FIELD,
                ));
            } else {
                instruction.push_str(&format!(
                    "All details are collected and a summary has been shown. If the user \
                     confirms, call {}. If they want to change a detail, call {} with the \
                     corrected value.\n",
                    crate::chat::actions::PERSIST_RECORD,
                    crate::chat::actions::RECORD_USER_FIELD,
                ));
            }
        }
    }

    instruction
}

/// Overview of collected data for the instruction. The service id is
/// reported only as selected/not selected, never by value.
fn collected_overview(state: &ConversationState) -> String {
    let mut overview = String::from("Collected so far:\n");
    overview.push_str(&format!(
        "- service: {}\n",
        if state.collected.has_service() {
            "selected"
        } else {
            "not selected"
        }
    ));
    if let Some((_, zip)) = state.collected.service() {
        overview.push_str(&format!("- zip: {zip}\n"));
    }
    for field in DETAIL_FIELDS {
        match state.collected.get_field(field) {
            Some(value) => overview.push_str(&format!("- {field}: {value}\n")),
            None => overview.push_str(&format!("- {field}: (missing)\n")),
        }
    }
    overview
}

/// Instruction for the function-free fallback call after a primary failure.
pub fn fallback_instruction() -> &'static str {
    "You are a polite assistant. The previous attempt to answer failed. \
     Apologize briefly for the hiccup and ask the user to repeat or continue. \
     Two sentences at most."
}

// ── Fixed reply templates ───────────────────────────────────────────────

/// Greeting after a category is chosen: the root question plus its labels.
pub fn category_greeting(
    category_name: &str,
    question: &str,
    choices: &BTreeMap<String, Choice>,
) -> String {
    format!(
        "Let's find the right {category_name} service for you. {question}\n{}",
        choice_list(choices)
    )
}

/// A nested question reached by the walker.
pub fn question_prompt(question: &str, choices: &BTreeMap<String, Choice>) -> String {
    format!("{question}\n{}", choice_list(choices))
}

fn choice_list(choices: &BTreeMap<String, Choice>) -> String {
    choices
        .keys()
        .map(|label| format!("- {label}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Asked when the walker resolves a terminal service.
pub fn zip_prompt() -> String {
    format!("Great choice! {ZIP_QUESTION}")
}

/// Asked after each recorded detail, for the next field in order.
pub fn field_prompt(field: UserField) -> String {
    format!("Thanks! What's your {}?", field.label())
}

/// Summary shown when all details are collected.
pub fn confirmation_request(state: &ConversationState) -> String {
    format!(
        "Here's what I have:\n{}\nReply \"confirm\" to submit your request, or tell me \
         what to change.",
        state.collected.confirmation_summary()
    )
}

/// Reply after a successful persist.
pub fn persisted_reply() -> String {
    "All set — your request has been saved! Our team will be in touch shortly. \
     Feel free to pick another category if you need anything else."
        .to_string()
}

/// Generic retryable reply when the store write fails. State is unchanged,
/// so the user can simply try again.
pub fn persist_failed_reply() -> String {
    "Sorry, something went wrong while saving your request. Nothing was lost — \
     please try again."
        .to_string()
}

/// Reply when no category has been chosen yet.
pub fn choose_category_prompt() -> String {
    "Please choose a service category to get started.".to_string()
}

/// Reply when the model requests an action that is not legal in the current
/// phase (or a malformed one). Restates where the dialogue stands.
pub fn reprompt(state: &ConversationState) -> String {
    match state.phase {
        Phase::CategorySelection => choose_category_prompt(),
        Phase::ServiceSelection => match (&state.current_question, &state.current_choices) {
            (Some(question), Some(choices)) => {
                format!("Let's finish this step first. {}", question_prompt(question, choices))
            }
            _ => format!("Let's finish this step first. {ZIP_QUESTION}"),
        },
        Phase::CollectingDetails => match state.collected.next_missing_field() {
            Some(field) => format!("Let's finish this step first. What's your {}?", field.label()),
            None => confirmation_request(state),
        },
        Phase::ConfirmingDetails => confirmation_request(state),
    }
}
