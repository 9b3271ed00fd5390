//! Interactive chat sessions
//!
//! A session starts with the system prompt and the context document as the
//! first user message. Every [`ChatSession::send`] adds one user turn and,
//! when the answer decodes, one assistant turn. A failed turn leaves the
//! history as it was so the conversation can continue.

use crate::chat::{ChatClient, ChatMessage, ChatRequest, ResponseFormat};
use crate::error::{IsyError, Result};
use crate::responses::StructuredResponse;
use crate::usage::UsageLedger;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Conversation with the chat endpoint producing `R` responses
pub struct ChatSession<C, R> {
    client: C,
    model: String,
    messages: Vec<ChatMessage>,
    ledger: UsageLedger,
    session_start: UsageLedger,
    usage_path: Option<PathBuf>,
    _response: PhantomData<R>,
}

impl<C: ChatClient, R: StructuredResponse> ChatSession<C, R> {
    /// Start a session over `context`
    pub fn new(client: C, model: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            messages: vec![
                ChatMessage::system(R::SYSTEM_PROMPT),
                ChatMessage::user(context),
            ],
            ledger: UsageLedger::default(),
            session_start: UsageLedger::default(),
            usage_path: None,
            _response: PhantomData,
        }
    }

    /// Ask the model to answer in `language` (ignored when blank)
    pub fn with_response_language(mut self, language: &str) -> Self {
        let language = language.trim();
        if !language.is_empty() {
            self.messages[0]
                .content
                .push_str(&format!("\nAlways answer in this language: {}.", language));
        }
        self
    }

    /// Accumulate usage into `ledger`, saving it to `path` after every turn
    pub fn with_ledger(mut self, ledger: UsageLedger, path: impl Into<PathBuf>) -> Self {
        self.ledger = ledger;
        self.session_start = ledger;
        self.usage_path = Some(path.into());
        self
    }

    /// Send one user turn and decode the answer
    ///
    /// # Errors
    ///
    /// - [`IsyError::Chat`] if the request fails or the answer does not decode
    /// - [`IsyError::Io`] if the usage ledger cannot be saved
    pub fn send(&mut self, input: &str) -> Result<R> {
        let mut messages = self.messages.clone();
        messages.push(ChatMessage::user(input));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            response_format: Some(ResponseFormat::json_schema(R::SCHEMA_NAME, R::schema())),
        };

        let completion = self.client.complete(&request)?;
        self.ledger
            .record(completion.prompt_tokens, completion.completion_tokens);
        if let Some(path) = &self.usage_path {
            self.ledger.save(path)?;
        }

        let response: R = serde_json::from_str(&completion.content).map_err(|e| {
            warn!("Undecodable {} response: {}", R::SCHEMA_NAME, e);
            IsyError::chat(format!("cannot decode response: {}", e))
        })?;

        self.messages = request.messages;
        self.messages.push(ChatMessage::assistant(completion.content));
        debug!("Session now has {} messages", self.messages.len());
        Ok(response)
    }

    /// Conversation so far
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Cumulative usage, including earlier sessions
    pub fn total_usage(&self) -> UsageLedger {
        self.ledger
    }

    /// Usage of this session only
    pub fn session_usage(&self) -> UsageLedger {
        self.ledger.since(&self.session_start)
    }
}
