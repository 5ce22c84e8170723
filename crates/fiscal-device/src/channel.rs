//! # Device Channel
//!
//! The seam between this crate and the byte-level link to the device.
//!
//! ## Responsibility Split
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  fiscal-device (THIS CRATE)           Host-provided DeviceChannel       │
//! │  ───────────────────────────          ──────────────────────────────    │
//! │  • which command, in which order      • serial / USB framing            │
//! │  • payload text                       • checksums, sequence bytes       │
//! │  • response interpretation            • timeouts, reconnects            │
//! │                                                                         │
//! │  send(code, payload) ───────────────► frame, write, read, unframe       │
//! │  Ok(text) | Err(ChannelError) ◄──────                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every call blocks until the device answers or the channel gives up. The
//! device keeps exactly one bill session open, so a channel must never be
//! shared by two transactions at once; callers serialize access.

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::protocol::Step;

// =============================================================================
// Channel Error
// =============================================================================

/// Transport fault reported by a [`DeviceChannel`].
///
/// Never retried at this layer; it reaches the caller wrapped in
/// [`DeviceError::Channel`] with the step that was running.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// No answer within the channel's deadline.
    #[error("Device did not answer within {0:?}")]
    Timeout(Duration),

    /// The link to the device went away.
    #[error("Device disconnected")]
    Disconnected,

    /// The answer could not be unframed (bad checksum, truncated frame...).
    #[error("Framing error: {0}")]
    Framing(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Channel Trait
// =============================================================================

/// Blocking request/response link to one fiscal device.
pub trait DeviceChannel {
    /// Sends `code` with `payload` and returns the device's response text.
    fn send(&mut self, code: u8, payload: &str) -> Result<String, ChannelError>;
}

impl<C: DeviceChannel + ?Sized> DeviceChannel for &mut C {
    fn send(&mut self, code: u8, payload: &str) -> Result<String, ChannelError> {
        (**self).send(code, payload)
    }
}

impl<C: DeviceChannel + ?Sized> DeviceChannel for Box<C> {
    fn send(&mut self, code: u8, payload: &str) -> Result<String, ChannelError> {
        (**self).send(code, payload)
    }
}

/// Sends one command and labels any transport fault with `step`.
pub(crate) fn exchange<C: DeviceChannel + ?Sized>(
    channel: &mut C,
    step: Step,
    code: u8,
    payload: &str,
) -> DeviceResult<String> {
    debug!(%step, code, payload, "Sending command");
    let response = channel
        .send(code, payload)
        .map_err(|source| DeviceError::Channel { step, source })?;
    debug!(%step, response = %response, "Command response");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedChannel;

    #[test]
    fn test_exchange_labels_channel_errors() {
        let mut channel = ScriptedChannel::new();
        channel.push_error(ChannelError::Disconnected);

        let err = exchange(&mut channel, Step::Subtotal, 0x33, "").unwrap_err();
        assert!(err.is_channel_error());
        assert_eq!(err.step(), Some(Step::Subtotal));
    }

    #[test]
    fn test_exchange_through_boxed_channel() {
        let mut scripted = ScriptedChannel::new();
        scripted.push_ok("P,1,2,3");
        let mut boxed: Box<dyn DeviceChannel> = Box::new(scripted);

        let response = exchange(&mut boxed, Step::Subtotal, 0x33, "").unwrap();
        assert_eq!(response, "P,1,2,3");
    }
}
