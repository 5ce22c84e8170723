//! # Device Error Types
//!
//! Error types for fiscal device operations.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Device Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Channel      │  │    Protocol     │  │     Validation          │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  Timeout        │  │  too few fields │  │  bad bill structure     │ │
//! │  │  Disconnected   │  │  E: marker      │  │  InsufficientPayment    │ │
//! │  │  Framing / Io   │  │  wrong marker   │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │    Decoding     │  │   CloseFailed   │  │  Config / InvalidState  │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  upstream bill  │  │  receipt issued │  │  bad fiscal.toml        │ │
//! │  │  record         │  │  session stuck  │  │  transaction reused     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every variant raised by a protocol step names that step, and protocol
//! errors carry the raw device text for manual diagnosis.

use fiscal_core::{Amount, CoreError, FiscalReceipt, ValidationError};
use thiserror::Error;

use crate::channel::ChannelError;
use crate::protocol::Step;
use crate::transaction::TransactionState;

/// Result type alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;

/// Every way a device operation can fail.
#[derive(Debug, Error)]
pub enum DeviceError {
    // =========================================================================
    // Transport
    // =========================================================================
    /// Transport fault, returned verbatim with the step that was running.
    #[error("{step} failed: {source}")]
    Channel {
        step: Step,
        #[source]
        source: ChannelError,
    },

    // =========================================================================
    // Protocol
    // =========================================================================
    /// Response missing required fields or carrying a device error marker.
    #[error("{step} rejected: {reason} (device said {raw:?})")]
    Protocol {
        step: Step,
        reason: String,
        raw: String,
    },

    // =========================================================================
    // Bill
    // =========================================================================
    /// The bill breaks a structural rule; nothing was sent to the device.
    #[error("Invalid bill: {0}")]
    Validation(#[from] ValidationError),

    /// Payments did not cover the device-computed total.
    #[error("Insufficient payments: {remaining} still due")]
    InsufficientPayment { remaining: Amount },

    /// The upstream bill record could not be decoded.
    #[error("Failed to decode bill record: {0}")]
    Decoding(String),

    // =========================================================================
    // Session
    // =========================================================================
    /// The bill was finalized but releasing the device session failed.
    ///
    /// The receipt is legally issued by the device; whether to treat the
    /// bill as done is the caller's decision.
    #[error("Bill {receipt} issued but closing the session failed: {source}")]
    CloseFailed {
        receipt: FiscalReceipt,
        #[source]
        source: Box<DeviceError>,
    },

    /// A transaction was driven after reaching a terminal state.
    #[error("Transaction is {state}; start a new one")]
    InvalidState { state: TransactionState },

    // =========================================================================
    // Configuration
    // =========================================================================
    /// Configuration could not be loaded, saved or validated.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// =============================================================================
// Constructors & Accessors
// =============================================================================

impl DeviceError {
    /// Creates a protocol error for `step` with the raw device text.
    pub fn protocol(step: Step, reason: impl Into<String>, raw: impl Into<String>) -> Self {
        DeviceError::Protocol {
            step,
            reason: reason.into(),
            raw: raw.into(),
        }
    }

    /// Step that failed, when the error came from a protocol step.
    pub fn step(&self) -> Option<Step> {
        match self {
            DeviceError::Channel { step, .. } | DeviceError::Protocol { step, .. } => Some(*step),
            DeviceError::Validation(_) | DeviceError::Decoding(_) => Some(Step::Validate),
            DeviceError::InsufficientPayment { .. } => Some(Step::Payment),
            DeviceError::CloseFailed { .. } => Some(Step::CloseBill),
            DeviceError::InvalidState { .. } | DeviceError::Config(_) => None,
        }
    }

    /// Raw device response text, when one was received.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            DeviceError::Protocol { raw, .. } => Some(raw),
            DeviceError::CloseFailed { source, .. } => source.raw_response(),
            _ => None,
        }
    }

    /// Receipt already issued by the device, if the failure came after it.
    pub fn receipt(&self) -> Option<&FiscalReceipt> {
        match self {
            DeviceError::CloseFailed { receipt, .. } => Some(receipt),
            _ => None,
        }
    }

    /// Returns true for transport faults.
    pub fn is_channel_error(&self) -> bool {
        matches!(self, DeviceError::Channel { .. })
    }

    /// Returns true for malformed or rejected device responses.
    pub fn is_protocol_error(&self) -> bool {
        matches!(self, DeviceError::Protocol { .. })
    }

    /// Returns true when the bill itself is at fault.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            DeviceError::Validation(_) | DeviceError::InsufficientPayment { .. }
        )
    }
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for DeviceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Decoding(msg) => DeviceError::Decoding(msg),
            CoreError::Validation(v) => DeviceError::Validation(v),
        }
    }
}

impl From<std::io::Error> for DeviceError {
    fn from(err: std::io::Error) -> Self {
        DeviceError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for DeviceError {
    fn from(err: toml::de::Error) -> Self {
        DeviceError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for DeviceError {
    fn from(err: toml::ser::Error) -> Self {
        DeviceError::Config(err.to_string())
    }
}
