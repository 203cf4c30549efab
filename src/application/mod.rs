//! Application layer - Use cases and orchestration.
//!
//! Services depend on domain ports (traits) rather than concrete
//! implementations, so the binaries inject the real adapters and tests inject
//! fakes.

pub mod services;

pub use services::{
    build_context, is_exit_command, ChatService, ChatState, ChatSummary, FailurePolicy,
    IngestReport, IngestService, EXIT_COMMAND,
};
