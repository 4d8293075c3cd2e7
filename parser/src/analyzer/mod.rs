mod analyzer;
pub mod chat;
pub mod event_dump;

pub use analyzer::Analyzer;
pub use chat::{ChatLogger, ChatLoggerBuilder};
pub use event_dump::EventDumpBuilder;
