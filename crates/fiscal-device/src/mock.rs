//! Scripted in-memory channel for unit tests.

use std::collections::VecDeque;

use crate::channel::{ChannelError, DeviceChannel};

/// Answers commands from a queue and records everything it was sent.
///
/// An exhausted queue answers with [`ChannelError::Disconnected`].
#[derive(Debug, Default)]
pub(crate) struct ScriptedChannel {
    responses: VecDeque<Result<String, ChannelError>>,
    sent: Vec<(u8, String)>,
}

impl ScriptedChannel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_ok(&mut self, response: &str) -> &mut Self {
        self.responses.push_back(Ok(response.to_string()));
        self
    }

    pub(crate) fn push_error(&mut self, error: ChannelError) -> &mut Self {
        self.responses.push_back(Err(error));
        self
    }

    /// Every `(code, payload)` pair sent so far, in order.
    pub(crate) fn sent(&self) -> &[(u8, String)] {
        &self.sent
    }

    /// Number of times `code` was sent.
    pub(crate) fn count(&self, code: u8) -> usize {
        self.sent.iter().filter(|(c, _)| *c == code).count()
    }

    /// Sent command codes, in order.
    pub(crate) fn codes(&self) -> Vec<u8> {
        self.sent.iter().map(|(c, _)| *c).collect()
    }
}

impl DeviceChannel for ScriptedChannel {
    fn send(&mut self, code: u8, payload: &str) -> Result<String, ChannelError> {
        self.sent.push((code, payload.to_string()));
        self.responses
            .pop_front()
            .unwrap_or(Err(ChannelError::Disconnected))
    }
}
