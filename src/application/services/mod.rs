mod chat;
mod ingest;

pub use chat::{build_context, is_exit_command, ChatService, ChatState, ChatSummary, EXIT_COMMAND};
pub use ingest::{FailurePolicy, IngestReport, IngestService};
