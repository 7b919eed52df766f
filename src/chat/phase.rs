//! Dialogue state machine — tracks which phase a conversation is in.

use serde::{Deserialize, Serialize};

/// The phases of the data-collection dialogue.
///
/// Progresses linearly: CategorySelection → ServiceSelection →
/// CollectingDetails → ConfirmingDetails, then loops back to
/// CategorySelection after a successful persist. The server is a standing
/// process, so there is no terminal phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    CategorySelection,
    ServiceSelection,
    CollectingDetails,
    ConfirmingDetails,
}

impl Phase {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, target),
            (CategorySelection, ServiceSelection)
                | (ServiceSelection, CollectingDetails)
                | (CollectingDetails, ConfirmingDetails)
                | (ConfirmingDetails, CategorySelection)
        )
    }

    /// The next phase in the cycle.
    pub fn next(&self) -> Phase {
        use Phase::*;
        match self {
            CategorySelection => ServiceSelection,
            ServiceSelection => CollectingDetails,
            CollectingDetails => ConfirmingDetails,
            ConfirmingDetails => CategorySelection,
        }
    }
}

impl Default for Phase {
    fn default() -> Self {
        Self::CategorySelection
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::CategorySelection => "category_selection",
            Self::ServiceSelection => "service_selection",
            Self::CollectingDetails => "collecting_details",
            Self::ConfirmingDetails => "confirming_details",
        };
        write!(f, "{s}")
    }
}
