//! # fiscal-device: Fiscal Device Protocol Client
//!
//! This crate drives a tax-compliant fiscal device through the fixed
//! command sequence that registers a sale and returns a legally valid
//! fiscal receipt.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bill Issuance Architecture                         │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │              issue_bill / issue_bill_json (entry points)         │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┴─────────────────────┐                  │
//! │         ▼                                           ▼                   │
//! │  ┌────────────────────┐                  ┌────────────────────────┐    │
//! │  │ DeviceInfoReader   │                  │  BillTransaction       │    │
//! │  │                    │                  │                        │    │
//! │  │ device state       │                  │ state machine          │    │
//! │  │ tax server link    │                  │ payment retry          │    │
//! │  │ taxpayer identity  │                  │ receipt                │    │
//! │  └─────────┬──────────┘                  └───────────┬────────────┘    │
//! │            │                                         │                  │
//! │            ▼                                         ▼                  │
//! │  ┌────────────────────┐  ┌────────────────────┐  ┌──────────────────┐  │
//! │  │  ResponseParser    │  │  CommandEncoder    │  │  DeviceChannel   │  │
//! │  │  positional fields │  │  field table fold  │  │  host-provided   │  │
//! │  └────────────────────┘  └────────────────────┘  └──────────────────┘  │
//! │                                                                         │
//! │  Everything is blocking and strictly sequential: the device keeps one  │
//! │  bill session and expects commands in order.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`channel`] - `DeviceChannel` trait and transport errors
//! - [`config`] - Fiscal configuration (timezone, payment retry bound)
//! - [`encoder`] - Declarative payload builder
//! - [`error`] - Device error types
//! - [`info`] - Read-only device and taxpayer queries
//! - [`parser`] - Response splitting and validation
//! - [`payload`] - Field tables of each command
//! - [`protocol`] - Command codes, markers, delimiters
//! - [`transaction`] - The bill issuance state machine
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fiscal_device::{issue_bill_json, FiscalConfig};
//!
//! let config = FiscalConfig::load_or_default(None);
//! let mut channel = SerialChannel::open("/dev/ttyUSB0")?;
//!
//! let receipt = issue_bill_json(&mut channel, &config, &request_body)?;
//! println!("{receipt}"); // F;<NIM>;<Signature>;<IFU>;<DateTime>
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod channel;
pub mod config;
pub mod encoder;
pub mod error;
pub mod info;
pub mod parser;
pub mod payload;
pub mod protocol;
pub mod transaction;

#[cfg(test)]
mod mock;

// =============================================================================
// Re-exports
// =============================================================================

pub use channel::{ChannelError, DeviceChannel};
pub use config::FiscalConfig;
pub use encoder::CommandEncoder;
pub use error::{DeviceError, DeviceResult};
pub use info::DeviceInfoReader;
pub use parser::{ParsedResponse, ResponseParser};
pub use protocol::{Command, Step};
pub use transaction::{issue_bill, issue_bill_json, BillTransaction, TransactionState};
