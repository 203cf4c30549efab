use std::io::Write;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    ports::{Collection, EmbeddingService, LlmService},
    DomainError, GenerationParams, Message, QueryMatch,
};

pub const EXIT_COMMAND: &str = "exit";

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful medical assistant. Answer only based on \
                                     the given context. If you don't know, say 'I don't know'.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatState {
    AwaitingInput,
    Terminated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub turns: usize,
    pub failed_turns: usize,
}

/// Answers questions from retrieved chunks. Each turn is independent.
pub struct ChatService {
    embedding: Arc<dyn EmbeddingService>,
    collection: Box<dyn Collection>,
    llm: Arc<dyn LlmService>,
    system_prompt: String,
    top_k: usize,
    params: GenerationParams,
}

impl ChatService {
    pub fn new(
        embedding: Arc<dyn EmbeddingService>,
        collection: Box<dyn Collection>,
        llm: Arc<dyn LlmService>,
    ) -> Self {
        Self {
            embedding,
            collection,
            llm,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            top_k: 3,
            params: GenerationParams::default(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_generation(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    /// The embedder must produce vectors the collection accepts.
    pub fn ensure_compatible(&self) -> Result<(), DomainError> {
        let expected = self.collection.spec().dimension;
        let actual = self.embedding.dimension();
        if expected != actual {
            return Err(DomainError::config(format!(
                "collection {} expects {expected}-dimensional vectors but the embedding model \
                 produces {actual}",
                self.collection.spec().name
            )));
        }
        Ok(())
    }

    /// One retrieval + generation round-trip.
    #[instrument(skip(self), fields(top_k = self.top_k))]
    pub async fn answer(&self, query: &str) -> Result<String, DomainError> {
        let vector = self.embedding.embed(query).await?;
        vector.ensure_dimension(self.collection.spec().dimension)?;

        let matches = self.collection.query(&vector, self.top_k).await?;
        debug!(matches = matches.len(), "retrieved context");

        let messages = self.build_messages(&build_context(&matches), query);
        self.llm.chat_completion(&messages, self.params).await
    }

    /// Reads queries until the exit command or the end of input.
    ///
    /// Recoverable failures are written to `out` and the loop continues;
    /// fatal ones end the session with an error.
    pub async fn run<I, W>(&self, queries: I, out: &mut W) -> Result<ChatSummary, DomainError>
    where
        I: IntoIterator<Item = String>,
        W: Write,
    {
        let mut queries = queries.into_iter();
        let mut summary = ChatSummary::default();
        let mut state = ChatState::AwaitingInput;

        while state == ChatState::AwaitingInput {
            state = match queries.next() {
                None => ChatState::Terminated,
                Some(input) if is_exit_command(&input) => ChatState::Terminated,
                Some(input) if input.trim().is_empty() => ChatState::AwaitingInput,
                Some(input) => {
                    summary.turns += 1;
                    match self.answer(input.trim()).await {
                        Ok(answer) => writeln!(out, "\nBot: {answer}\n")?,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            summary.failed_turns += 1;
                            warn!(error = %e, "turn failed");
                            writeln!(out, "\nError: {e}\n")?;
                        }
                    }
                    out.flush()?;
                    ChatState::AwaitingInput
                }
            };
        }

        info!(
            turns = summary.turns,
            failed = summary.failed_turns,
            "chat session ended"
        );
        Ok(summary)
    }

    fn build_messages(&self, context: &str, query: &str) -> Vec<Message> {
        vec![
            Message::system(&self.system_prompt),
            Message::user(format!("Context:\n{context}\n\nQuestion: {query}")),
        ]
    }
}

pub fn is_exit_command(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(EXIT_COMMAND)
}

/// Joins the retrieved texts in rank order, separated by one blank line.
pub fn build_context(matches: &[QueryMatch]) -> String {
    matches
        .iter()
        .map(|m| m.metadata.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
