//! Decision tree types and the walker that advances through them.
//!
//! A category's tree is a nested question/choice structure. Each choice
//! label maps either to a further question or to a terminal service
//! identifier. The structure is a tree (acyclic), so a terminal label
//! always resolves to the same service id regardless of how the node was
//! reached.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A node in a category decision tree: a question plus labeled choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    pub question: String,
    pub choices: BTreeMap<String, Choice>,
}

/// The value behind a choice label: either a nested question or a terminal
/// service identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Choice {
    /// A nested question with its own choices.
    Branch(DecisionNode),
    /// A terminal service identifier.
    Service(String),
}

/// Outcome of matching a user answer against the current choices.
#[derive(Debug, Clone, PartialEq)]
pub enum NextStep {
    /// The answer led to a nested question.
    Question {
        question: String,
        choices: BTreeMap<String, Choice>,
    },
    /// The answer resolved to a concrete service identifier; traversal is
    /// complete.
    Terminal(String),
}

/// Match a user answer against the current choice labels.
///
/// Labels are matched case-insensitively after trimming. Returns `None`
/// when the answer matches no label; the caller decides how to handle the
/// free text (the orchestrator hands it to the LLM).
pub fn advance(answer: &str, choices: &BTreeMap<String, Choice>) -> Option<NextStep> {
    let normalized = answer.trim();
    let (_, choice) = choices
        .iter()
        .find(|(label, _)| label.eq_ignore_ascii_case(normalized))?;

    Some(match choice {
        Choice::Branch(node) => NextStep::Question {
            question: node.question.clone(),
            choices: node.choices.clone(),
        },
        Choice::Service(service_id) => NextStep::Terminal(service_id.clone()),
    })
}
