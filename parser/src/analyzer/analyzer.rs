use crate::events::ReplayEvent;

/// Consumer of decoded event blocks, fed in stream order during a decode.
pub trait Analyzer {
    fn process(&mut self, event: &ReplayEvent);
    fn finish(&mut self);
}
