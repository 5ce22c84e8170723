//! # fiscal-core: Pure Domain Model for Fiscal Bill Issuance
//!
//! This crate holds everything a fiscal bill *is*, with zero I/O. The
//! device protocol lives in `fiscal-device`; this crate only knows the
//! shapes that flow through it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Fiscal Bill Issuance Flow                           │
//! │                                                                         │
//! │  Upstream (JSON bill record)                                           │
//! │       │ Bill::from_json                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               ★ fiscal-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  amount   │  │ validation │  │   error   │  │   │
//! │  │   │  Bill     │  │  Amount   │  │ validate_  │  │ CoreError │  │   │
//! │  │   │  Receipt  │  │ (fixed-6) │  │   bill     │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DEVICE • PURE FUNCTIONS                          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  fiscal-device (BillTransaction) ──► FiscalReceipt                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Bill, Product, Payment, DeviceInfo, FiscalReceipt
//! - [`amount`] - Fixed-point decimal for prices, quantities and payments
//! - [`error`] - Domain error types
//! - [`validation`] - Structural checks run before a bill reaches a device
//!
//! ## Example Usage
//!
//! ```rust
//! use fiscal_core::Amount;
//!
//! let price: Amount = "1500".parse().unwrap();
//! assert_eq!(price.to_string(), "1500.000000");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod amount;
pub mod error;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use amount::Amount;
pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Literal an upstream record uses in the AIB field to mean "no AIB".
pub const AIB_ABSENT: &str = "N/A";

/// Textual layout of every timestamp the device emits (14 digits).
pub const DEVICE_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";
