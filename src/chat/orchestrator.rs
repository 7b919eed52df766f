//! Conversation orchestrator — drives the data-collection dialogue.
//!
//! Each turn: append the user message to history, build the phase-specific
//! system instruction, call the LLM with the declared action set, apply the
//! action it selects (after validating it against the current phase), and
//! answer with the action's fixed template — or with the model's free text
//! when no action was selected. Exact matches against the current choice
//! labels drive the tree walker deterministically before the LLM is
//! consulted.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{error, warn};

use crate::catalog::CategoryCatalog;
use crate::chat::actions::{self, Action};
use crate::chat::phase::Phase;
use crate::chat::prompts::{self, STATIC_APOLOGY, ZIP_QUESTION};
use crate::chat::state::ConversationState;
use crate::error::{LlmError, Result};
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, ToolCompletionRequest};
use crate::store::{LeadRecord, LeadStore};
use crate::tree::{self, NextStep};

/// Tokens counted as an affirmative reply during confirmation.
const AFFIRMATIONS: &[&str] = &[
    "confirm", "confirmed", "yes", "yep", "yeah", "correct", "ok", "okay", "sure", "y",
];

fn is_affirmation(text: &str) -> bool {
    let normalized = text.trim().trim_end_matches(['.', '!']).to_lowercase();
    AFFIRMATIONS.contains(&normalized.as_str())
}

/// The conversation state machine, shared across all inbound requests.
///
/// State is keyed by session id; the per-session mutex is held for a whole
/// turn, so concurrent requests on one conversation are serialized.
pub struct ChatOrchestrator {
    catalog: CategoryCatalog,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn LeadStore>,
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationState>>>>,
}

impl ChatOrchestrator {
    pub fn new(
        catalog: CategoryCatalog,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn LeadStore>,
    ) -> Self {
        Self {
            catalog,
            llm,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Process one user turn and produce the reply text.
    ///
    /// `CategoryNotFound` is the only error surfaced to the HTTP boundary;
    /// LLM and store failures are absorbed into user-facing reply text.
    pub async fn handle_message(
        &self,
        session_id: &str,
        message: &str,
        category_id: Option<&str>,
    ) -> Result<String> {
        // A category lookup failure must not mutate any state, so resolve it
        // before touching the session.
        let selected = match category_id {
            Some(id) => {
                let root = self.catalog.select_category(id)?.clone();
                let name = self
                    .catalog
                    .category_name(id)
                    .unwrap_or(id)
                    .to_string();
                Some((name, root))
            }
            None => None,
        };

        let session = self.session(session_id).await;
        let mut state = session.lock().await;

        if let Some((category_name, root)) = selected {
            // Selecting a category (re)starts the walker. The greeting is a
            // fixed template: root question plus choice labels.
            state.restart_selection();
            state.phase = Phase::ServiceSelection;
            state.current_question = Some(root.question.clone());
            state.current_choices = Some(root.choices.clone());
            state.push_user(message);
            let reply = prompts::category_greeting(&category_name, &root.question, &root.choices);
            state.push_assistant(&reply);
            return Ok(reply);
        }

        state.push_user(message);

        let reply = self.reply_for_turn(session_id, &mut state, message).await;
        state.push_assistant(&reply);
        Ok(reply)
    }

    async fn reply_for_turn(
        &self,
        session_id: &str,
        state: &mut ConversationState,
        message: &str,
    ) -> String {
        // Before any category is chosen there is nothing to talk about.
        if state.phase == Phase::CategorySelection {
            return prompts::choose_category_prompt();
        }

        // Deterministic confirmation: an affirmation token persists directly.
        if state.phase == Phase::ConfirmingDetails && is_affirmation(message) {
            return self.persist_and_reset(session_id, state).await;
        }

        // Exact label matches drive the walker without an LLM round-trip.
        // The phase stays put: only the record action advances it.
        if state.phase == Phase::ServiceSelection {
            if let Some(choices) = state.current_choices.clone() {
                match tree::advance(message, &choices) {
                    Some(NextStep::Question { question, choices }) => {
                        let reply = prompts::question_prompt(&question, &choices);
                        state.current_question = Some(question);
                        state.current_choices = Some(choices);
                        return reply;
                    }
                    Some(NextStep::Terminal(service_id)) => {
                        state.pending_service_id = Some(service_id);
                        state.current_question = Some(ZIP_QUESTION.to_string());
                        state.current_choices = None;
                        return prompts::zip_prompt();
                    }
                    // Free text: the LLM judges whether it still counts as
                    // an answer, but can only act through the action set.
                    None => {}
                }
            }
        }

        match self.llm_turn(session_id, state).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, phase = %state.phase, "LLM call failed, using fallback");
                self.fallback_reply().await
            }
        }
    }

    /// One LLM round-trip: system instruction + full history + action set.
    async fn llm_turn(
        &self,
        session_id: &str,
        state: &mut ConversationState,
    ) -> std::result::Result<String, LlmError> {
        let instruction = prompts::system_instruction(state);
        let mut messages = Vec::with_capacity(state.history.len() + 1);
        messages.push(ChatMessage::system(instruction));
        messages.extend(state.history.iter().cloned());

        let request = ToolCompletionRequest::new(messages, actions::tool_definitions());
        let response = self.llm.complete_with_tools(request).await?;

        if let Some(call) = response.tool_calls.first() {
            return Ok(match Action::from_tool_call(call) {
                Ok(action) if action.allowed_in(state.phase) => {
                    self.apply_action(session_id, state, action).await
                }
                Ok(action) => {
                    warn!(
                        action = action.name(),
                        phase = %state.phase,
                        "Rejected action not legal in current phase"
                    );
                    prompts::reprompt(state)
                }
                Err(reason) => {
                    warn!(%reason, "Rejected malformed action call");
                    prompts::reprompt(state)
                }
            });
        }

        match response.content {
            Some(content) if !content.trim().is_empty() => Ok(content),
            _ => Err(LlmError::EmptyResponse {
                provider: self.llm.model_name().to_string(),
            }),
        }
    }

    /// Apply a validated action and produce its templated reply.
    async fn apply_action(
        &self,
        session_id: &str,
        state: &mut ConversationState,
        action: Action,
    ) -> String {
        match action {
            Action::RecordServiceSelection { service_id, zip } => {
                state.collected.set_service(service_id, zip);
                state.pending_service_id = None;
                state.current_question = None;
                state.current_choices = None;
                advance_phase(state, Phase::CollectingDetails);
                match state.collected.next_missing_field() {
                    Some(field) => prompts::field_prompt(field),
                    None => {
                        advance_phase(state, Phase::ConfirmingDetails);
                        prompts::confirmation_request(state)
                    }
                }
            }
            Action::RecordUserField { field, value } => {
                state.collected.set_field(field, value);
                match state.collected.next_missing_field() {
                    Some(next) => prompts::field_prompt(next),
                    None => {
                        if state.phase == Phase::CollectingDetails {
                            advance_phase(state, Phase::ConfirmingDetails);
                        }
                        prompts::confirmation_request(state)
                    }
                }
            }
            Action::PersistRecord => self.persist_and_reset(session_id, state).await,
        }
    }

    /// Persist the assembled record; on success loop back to category
    /// selection, on failure leave state untouched so the turn can be
    /// retried with the same idempotency key.
    async fn persist_and_reset(&self, session_id: &str, state: &mut ConversationState) -> String {
        let Some((service_id, zip)) = state.collected.service() else {
            // Phase authority should make this unreachable; reprompt instead
            // of persisting a partial record.
            warn!(phase = %state.phase, "Persist requested without a recorded service");
            return prompts::reprompt(state);
        };

        let record = LeadRecord {
            id: uuid::Uuid::new_v4(),
            idempotency_key: state.idempotency_key(session_id),
            service_id: service_id.to_string(),
            zip: zip.to_string(),
            name: state.collected.name.clone(),
            phone: state.collected.phone.clone(),
            email: state.collected.email.clone(),
            address: state.collected.address.clone(),
            created_at: chrono::Utc::now(),
        };

        match self.store.persist(&record).await {
            Ok(()) => {
                state.reset_cycle();
                prompts::persisted_reply()
            }
            Err(err) => {
                error!(error = %err, key = %record.idempotency_key, "Failed to persist lead");
                prompts::persist_failed_reply()
            }
        }
    }

    /// Simplified function-free fallback call; a fixed apology if that also
    /// fails.
    async fn fallback_reply(&self) -> String {
        let request = CompletionRequest::new(vec![ChatMessage::system(
            prompts::fallback_instruction(),
        )])
        .with_max_tokens(200)
        .with_temperature(0.3);

        match self.llm.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => response.content,
            Ok(_) => STATIC_APOLOGY.to_string(),
            Err(err) => {
                warn!(error = %err, "Fallback LLM call failed, using static apology");
                STATIC_APOLOGY.to_string()
            }
        }
    }

    async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationState>> {
        if let Some(state) = self.sessions.read().await.get(session_id) {
            return Arc::clone(state);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(
            sessions
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(ConversationState::new()))),
        )
    }

    /// Snapshot of a session's state (tests and diagnostics).
    pub async fn snapshot(&self, session_id: &str) -> Option<ConversationState> {
        let sessions = self.sessions.read().await;
        match sessions.get(session_id) {
            Some(state) => Some(state.lock().await.clone()),
            None => None,
        }
    }
}

fn advance_phase(state: &mut ConversationState, to: Phase) {
    if state.phase.can_transition_to(to) {
        state.phase = to;
    } else {
        warn!(from = %state.phase, to = %to, "Ignored illegal phase transition");
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::{Error, StoreError};
    use crate::llm::{CompletionResponse, ToolCall, ToolCompletionResponse};

    const IDS: &str = r#"{ "6": "Electrical Work" }"#;
    const TREES: &str = r#"{
        "categories": {
            "Electrical Work": {
                "question": "What kind of electrical work do you need?",
                "choices": {
                    "Wiring": { "question": "New or repair?", "choices": { "New": "2101", "Repair": "2102" } },
                    "Panel upgrade": "2103"
                }
            }
        }
    }"#;

    /// Scripted LLM: pops one canned tool-completion result per call.
    struct ScriptedLlm {
        responses: Mutex<VecDeque<std::result::Result<ToolCompletionResponse, LlmError>>>,
        fallback: Mutex<VecDeque<std::result::Result<CompletionResponse, LlmError>>>,
    }

    impl ScriptedLlm {
        fn new(
            responses: Vec<std::result::Result<ToolCompletionResponse, LlmError>>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fallback: Mutex::new(VecDeque::new()),
            }
        }

        fn with_fallback(
            self,
            fallback: Vec<std::result::Result<CompletionResponse, LlmError>>,
        ) -> Self {
            Self {
                fallback: Mutex::new(fallback.into()),
                ..self
            }
        }

        fn text(content: &str) -> ToolCompletionResponse {
            ToolCompletionResponse {
                content: Some(content.to_string()),
                tool_calls: Vec::new(),
            }
        }

        fn tool(name: &str, arguments: serde_json::Value) -> ToolCompletionResponse {
            ToolCompletionResponse {
                content: None,
                tool_calls: vec![ToolCall {
                    name: name.to_string(),
                    arguments,
                }],
            }
        }

        fn timeout() -> LlmError {
            LlmError::Timeout {
                provider: "openai".to_string(),
                timeout: std::time::Duration::from_secs(30),
            }
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedLlm {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> std::result::Result<CompletionResponse, LlmError> {
            self.fallback
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(Self::timeout()))
        }

        async fn complete_with_tools(
            &self,
            _request: ToolCompletionRequest,
        ) -> std::result::Result<ToolCompletionResponse, LlmError> {
            self.responses
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| panic!("unexpected LLM call"))
        }
    }

    /// Store that counts persists and can be told to fail.
    struct RecordingStore {
        persisted: Mutex<Vec<LeadRecord>>,
        failures: AtomicUsize,
    }

    impl RecordingStore {
        fn new() -> Self {
            Self {
                persisted: Mutex::new(Vec::new()),
                failures: AtomicUsize::new(0),
            }
        }

        fn failing_once() -> Self {
            Self {
                persisted: Mutex::new(Vec::new()),
                failures: AtomicUsize::new(1),
            }
        }
    }

    #[async_trait]
    impl LeadStore for RecordingStore {
        async fn persist(&self, record: &LeadRecord) -> std::result::Result<(), StoreError> {
            if self.failures.load(Ordering::SeqCst) > 0 {
                self.failures.fetch_sub(1, Ordering::SeqCst);
                return Err(StoreError::Write("disk on fire".to_string()));
            }
            self.persisted.lock().await.push(record.clone());
            Ok(())
        }
    }

    fn orchestrator(
        llm: ScriptedLlm,
        store: Arc<RecordingStore>,
    ) -> ChatOrchestrator {
        let catalog = CategoryCatalog::from_json(IDS, TREES).unwrap();
        ChatOrchestrator::new(catalog, Arc::new(llm), store)
    }

    #[tokio::test]
    async fn category_selection_returns_root_question() {
        let bot = orchestrator(ScriptedLlm::new(vec![]), Arc::new(RecordingStore::new()));
        let reply = bot
            .handle_message("s1", "hi", Some("6"))
            .await
            .unwrap();

        assert!(reply.contains("What kind of electrical work do you need?"));
        assert!(reply.contains("- Wiring"));
        assert!(reply.contains("- Panel upgrade"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ServiceSelection);
        assert_eq!(state.history.len(), 2);
    }

    #[tokio::test]
    async fn unknown_category_fails_without_state_mutation() {
        let bot = orchestrator(ScriptedLlm::new(vec![]), Arc::new(RecordingStore::new()));
        let err = bot.handle_message("s1", "hi", Some("99")).await.unwrap_err();
        assert!(matches!(err, Error::Catalog(_)));
        assert!(bot.snapshot("s1").await.is_none());
    }

    #[tokio::test]
    async fn branch_answer_walks_to_nested_question() {
        let bot = orchestrator(ScriptedLlm::new(vec![]), Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot.handle_message("s1", "Wiring", None).await.unwrap();
        assert!(reply.contains("New or repair?"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ServiceSelection);
        assert_eq!(state.current_question.as_deref(), Some("New or repair?"));
    }

    #[tokio::test]
    async fn terminal_answer_stashes_service_and_asks_zip() {
        let bot = orchestrator(ScriptedLlm::new(vec![]), Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot
            .handle_message("s1", "Panel upgrade", None)
            .await
            .unwrap();
        assert!(reply.contains("zip code"));

        let state = bot.snapshot("s1").await.unwrap();
        // Phase only advances via the record action.
        assert_eq!(state.phase, Phase::ServiceSelection);
        assert_eq!(state.pending_service_id.as_deref(), Some("2103"));
        assert!(!state.collected.has_service());
    }

    #[tokio::test]
    async fn record_service_selection_advances_and_prompts_for_name() {
        let llm = ScriptedLlm::new(vec![Ok(ScriptedLlm::tool(
            actions::RECORD_SERVICE_SELECTION,
            json!({"serviceId": "2103", "zip": "30301"}),
        ))]);
        let bot = orchestrator(llm, Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();
        bot.handle_message("s1", "Panel upgrade", None).await.unwrap();

        let reply = bot.handle_message("s1", "30301", None).await.unwrap();
        assert!(reply.contains("full name"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::CollectingDetails);
        assert_eq!(state.collected.service(), Some(("2103", "30301")));
        assert!(state.pending_service_id.is_none());
    }

    #[tokio::test]
    async fn illegal_action_is_rejected_with_reprompt() {
        // persist_record during service selection must not persist anything.
        let llm = ScriptedLlm::new(vec![Ok(ScriptedLlm::tool(
            actions::PERSIST_RECORD,
            json!({}),
        ))]);
        let store = Arc::new(RecordingStore::new());
        let bot = orchestrator(llm, Arc::clone(&store));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot
            .handle_message("s1", "just save it already", None)
            .await
            .unwrap();
        assert!(reply.contains("Let's finish this step first"));
        assert!(store.persisted.lock().await.is_empty());

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ServiceSelection);
    }

    async fn drive_to_confirmation(
        store: Arc<RecordingStore>,
    ) -> ChatOrchestrator {
        let field = |name: &str, value: &str| {
            Ok(ScriptedLlm::tool(
                actions::RECORD_USER_FIELD,
                json!({"field": name, "value": value}),
            ))
        };
        let llm = ScriptedLlm::new(vec![
            Ok(ScriptedLlm::tool(
                actions::RECORD_SERVICE_SELECTION,
                json!({"serviceId": "2103", "zip": "30301"}),
            )),
            field("name", "Ada Lovelace"),
            field("phone", "555-0100"),
            field("email", "ada@example.com"),
            field("address", "1 Main St"),
        ]);
        let bot = orchestrator(llm, store);
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();
        bot.handle_message("s1", "Panel upgrade", None).await.unwrap();
        bot.handle_message("s1", "30301", None).await.unwrap();
        bot.handle_message("s1", "Ada Lovelace", None).await.unwrap();
        bot.handle_message("s1", "555-0100", None).await.unwrap();
        bot.handle_message("s1", "ada@example.com", None).await.unwrap();
        bot
    }

    #[tokio::test]
    async fn last_field_moves_to_confirmation_with_redacted_summary() {
        let store = Arc::new(RecordingStore::new());
        let bot = drive_to_confirmation(Arc::clone(&store)).await;

        let reply = bot.handle_message("s1", "1 Main St", None).await.unwrap();
        assert!(reply.contains("Ada Lovelace"));
        assert!(reply.contains("30301"));
        assert!(!reply.contains("2103"), "summary must not expose the service id");
        assert!(reply.to_lowercase().contains("confirm"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ConfirmingDetails);
        assert!(store.persisted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn affirmation_persists_once_and_resets() {
        let store = Arc::new(RecordingStore::new());
        let bot = drive_to_confirmation(Arc::clone(&store)).await;
        bot.handle_message("s1", "1 Main St", None).await.unwrap();

        let reply = bot.handle_message("s1", "Confirm", None).await.unwrap();
        assert!(reply.contains("saved"));

        let persisted = store.persisted.lock().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].idempotency_key, "s1:0");
        assert_eq!(persisted[0].service_id, "2103");
        assert_eq!(persisted[0].name.as_deref(), Some("Ada Lovelace"));
        drop(persisted);

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::CategorySelection);
        assert!(!state.collected.has_service());
        assert_eq!(state.cycle, 1);
    }

    #[tokio::test]
    async fn correction_during_confirmation_reissues_summary() {
        let field = |name: &str, value: &str| {
            Ok(ScriptedLlm::tool(
                actions::RECORD_USER_FIELD,
                json!({"field": name, "value": value}),
            ))
        };
        let llm = ScriptedLlm::new(vec![
            Ok(ScriptedLlm::tool(
                actions::RECORD_SERVICE_SELECTION,
                json!({"serviceId": "2103", "zip": "30301"}),
            )),
            field("name", "Ada Lovelace"),
            field("phone", "555-0100"),
            field("email", "ada@example.com"),
            field("address", "1 Main St"),
            // The user amends the phone number after seeing the summary.
            field("phone", "555-0199"),
        ]);
        let store = Arc::new(RecordingStore::new());
        let bot = orchestrator(llm, Arc::clone(&store));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();
        bot.handle_message("s1", "Panel upgrade", None).await.unwrap();
        bot.handle_message("s1", "30301", None).await.unwrap();
        bot.handle_message("s1", "Ada Lovelace", None).await.unwrap();
        bot.handle_message("s1", "555-0100", None).await.unwrap();
        bot.handle_message("s1", "ada@example.com", None).await.unwrap();
        bot.handle_message("s1", "1 Main St", None).await.unwrap();

        let reply = bot
            .handle_message("s1", "actually my phone is 555-0199", None)
            .await
            .unwrap();
        assert!(reply.contains("555-0199"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ConfirmingDetails);
        assert_eq!(state.collected.phone.as_deref(), Some("555-0199"));
        assert!(store.persisted.lock().await.is_empty());
    }

    #[tokio::test]
    async fn llm_failure_uses_fallback_text() {
        let llm = ScriptedLlm::new(vec![Err(ScriptedLlm::timeout())]).with_fallback(vec![Ok(
            CompletionResponse {
                content: "Sorry about that — could you say that again?".to_string(),
            },
        )]);
        let bot = orchestrator(llm, Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot
            .handle_message("s1", "hmm not sure", None)
            .await
            .unwrap();
        assert_eq!(reply, "Sorry about that — could you say that again?");

        // State unchanged apart from history.
        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ServiceSelection);
    }

    #[tokio::test]
    async fn double_llm_failure_uses_static_apology() {
        let llm = ScriptedLlm::new(vec![Err(ScriptedLlm::timeout())])
            .with_fallback(vec![Err(ScriptedLlm::timeout())]);
        let bot = orchestrator(llm, Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot
            .handle_message("s1", "hmm not sure", None)
            .await
            .unwrap();
        assert_eq!(reply, STATIC_APOLOGY);
    }

    #[tokio::test]
    async fn persist_failure_leaves_state_for_retry() {
        let store = Arc::new(RecordingStore::failing_once());
        let bot = drive_to_confirmation(Arc::clone(&store)).await;
        bot.handle_message("s1", "1 Main St", None).await.unwrap();

        let reply = bot.handle_message("s1", "confirm", None).await.unwrap();
        assert!(reply.contains("try again"));

        let state = bot.snapshot("s1").await.unwrap();
        assert_eq!(state.phase, Phase::ConfirmingDetails, "state unchanged for retry");
        assert_eq!(state.cycle, 0);

        // The retry persists with the same idempotency key.
        let reply = bot.handle_message("s1", "confirm", None).await.unwrap();
        assert!(reply.contains("saved"));
        let persisted = store.persisted.lock().await;
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].idempotency_key, "s1:0");
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let bot = orchestrator(ScriptedLlm::new(vec![]), Arc::new(RecordingStore::new()));
        bot.handle_message("alice", "hi", Some("6")).await.unwrap();

        let reply = bot.handle_message("bob", "hello?", None).await.unwrap();
        assert!(reply.contains("choose a service category"));

        let alice = bot.snapshot("alice").await.unwrap();
        let bob = bot.snapshot("bob").await.unwrap();
        assert_eq!(alice.phase, Phase::ServiceSelection);
        assert_eq!(bob.phase, Phase::CategorySelection);
    }

    #[tokio::test]
    async fn free_text_reply_is_used_verbatim() {
        let llm = ScriptedLlm::new(vec![Ok(ScriptedLlm::text(
            "Wiring covers outlets and fixtures; panel upgrades replace the breaker box.",
        ))]);
        let bot = orchestrator(llm, Arc::new(RecordingStore::new()));
        bot.handle_message("s1", "hi", Some("6")).await.unwrap();

        let reply = bot
            .handle_message("s1", "what's the difference?", None)
            .await
            .unwrap();
        assert!(reply.starts_with("Wiring covers"));
    }

    #[test]
    fn affirmation_matching_is_case_insensitive() {
        assert!(is_affirmation("confirm"));
        assert!(is_affirmation("  CONFIRM  "));
        assert!(is_affirmation("Yes!"));
        assert!(is_affirmation("okay"));
        assert!(!is_affirmation("no"));
        assert!(!is_affirmation("change the phone"));
    }
}
