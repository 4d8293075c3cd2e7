use tracing::warn;

use crate::analyzer::Analyzer;
use crate::events::ReplayEvent;

pub struct EventDumpBuilder {}

impl Default for EventDumpBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDumpBuilder {
    pub fn new() -> Self {
        Self {}
    }

    pub fn build(self) -> Box<dyn Analyzer> {
        Box::new(EventDump {})
    }
}

/// Prints every event as one line of JSON.
struct EventDump {}

impl Analyzer for EventDump {
    fn finish(&mut self) {}

    fn process(&mut self, event: &ReplayEvent) {
        match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(err) => warn!("could not serialize event at {}: {err}", event.clock),
        }
    }
}
