//! Test and helper mocks for flowmeter_core

use std::collections::VecDeque;
use std::time::Duration;

/// A source that replays a fixed script of captures and failures, then
/// reports exhaustion on every further call.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<String, String>>,
    calls: usize,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn capture(mut self, text: impl Into<String>) -> Self {
        self.script.push_back(Ok(text.into()));
        self
    }

    pub fn failure(mut self, message: impl Into<String>) -> Self {
        self.script.push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl flowmeter_traits::TraceSource for ScriptedSource {
    fn acquire(
        &mut self,
        _timeout: Duration,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        self.calls += 1;
        match self.script.pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => Err(Box::new(std::io::Error::other(msg))),
            None => Err(Box::new(std::io::Error::other("script exhausted"))),
        }
    }
}
