use crate::events::{ChatMessage, EventPayload, ReceiverScope, ReplayEvent};

use super::analyzer::Analyzer;

pub struct ChatLoggerBuilder;

impl Default for ChatLoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatLoggerBuilder {
    pub fn new() -> ChatLoggerBuilder {
        ChatLoggerBuilder
    }

    pub fn build(self) -> Box<dyn Analyzer> {
        Box::new(ChatLogger::default())
    }
}

/// Prints chat messages as they are decoded.
#[derive(Debug, Default)]
pub struct ChatLogger {
    printed: usize,
}

impl ChatLogger {
    /// `[m:ss] sender -> receiver: text`
    pub fn format_line(message: &ChatMessage) -> String {
        let receiver = match (&message.scope, &message.receiver_name) {
            (None, _) => "startup".to_owned(),
            (Some(ReceiverScope::All), _) => "all".to_owned(),
            (Some(ReceiverScope::Allies), _) => "allies".to_owned(),
            (Some(ReceiverScope::Observers), _) => "observers".to_owned(),
            (Some(ReceiverScope::Slot(_)), Some(name)) => name.clone(),
            (Some(ReceiverScope::Slot(slot)), None) => format!("slot {slot}"),
        };
        format!(
            "[{}] {} -> {}: {}",
            message.timestamp, message.sender_name, receiver, message.text
        )
    }
}

impl Analyzer for ChatLogger {
    fn finish(&mut self) {
        tracing::debug!("chat logger printed {} message(s)", self.printed);
    }

    fn process(&mut self, event: &ReplayEvent) {
        if let EventPayload::Chat(message) = &event.payload {
            println!("{}", Self::format_line(message));
            self.printed += 1;
        }
    }
}
