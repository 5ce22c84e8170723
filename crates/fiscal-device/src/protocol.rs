//! # Device Protocol Constants
//!
//! Command codes, markers and delimiters of the fiscal device's text
//! protocol.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Bill Issuance Exchange                             │
//! │                                                                         │
//! │  HOST ───► START_BILL    seller,name,IFU,A,B,C,D,VT,RT,RN,buyer,..     │
//! │  HOST ◄─── ok | E:<reason>                                             │
//! │                                                                         │
//! │  HOST ───► ADD_BILL_ITEM label[\nbarcode]\tTAXprice*qty[;t,d][\to,e]   │
//! │  HOST ───► GET_SUBTOTAL                                                │
//! │  HOST ◄─── P,<f1>,<f2>,<ttc>                                           │
//! │                                                                         │
//! │  HOST ───► GET_TOTAL     <mode><amount>          (per payment)         │
//! │  HOST ◄─── P,<f1>,<f2>,<f3>,<remaining>                                │
//! │                                                                         │
//! │  HOST ───► 0x38          (finalize, empty payload)                     │
//! │  HOST ◄─── F;<NIM>;<Signature>;<IFU>;<DateTime>                        │
//! │                                                                         │
//! │  HOST ───► END_BILL      (release the single open-bill session)        │
//! │                                                                         │
//! │  READ-ONLY QUERIES                                                     │
//! │  HOST ───► DEV_STATE      ◄─── NIM,IFU,time,counters..,A,B,C,D         │
//! │  HOST ───► NETWORK_STATE  ◄─── uploaded,pending,last-sync              │
//! │  HOST ───► TAXPAYER_INFO I0..I5 ◄─── one field each                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

// =============================================================================
// Command Codes
// =============================================================================

/// Named device commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Device identity, counters and tax rates.
    DeviceState,
    /// Link state with the tax authority server.
    NetworkState,
    /// One taxpayer identity field, addressed `I0`..`I5`.
    TaxpayerInfo,
    /// Opens the device's single bill session.
    StartBill,
    /// Registers one line item.
    AddBillItem,
    /// Reports the running subtotal.
    BillSubtotal,
    /// Submits one payment and reports the running total.
    BillTotal,
    /// Closes the bill session.
    EndBill,
}

impl Command {
    /// Wire code of this command.
    pub const fn code(self) -> u8 {
        match self {
            Command::StartBill => 0xC0,
            Command::EndBill => 0xC1,
            Command::DeviceState => 0xC2,
            Command::NetworkState => 0xC3,
            Command::TaxpayerInfo => 0xC4,
            Command::AddBillItem => 0x31,
            Command::BillSubtotal => 0x33,
            Command::BillTotal => 0x35,
        }
    }
}

/// Raw finalize code. Deliberately outside [`Command`]: the device accepts
/// it only inside an open, fully paid bill session.
pub const FINALIZE_BILL: u8 = 0x38;

// =============================================================================
// Markers and Delimiters
// =============================================================================

/// Field delimiter of status and total responses (and of start-bill fields).
pub const FIELD_DELIMITER: char = ',';

/// Delimiter of the finalize response.
pub const FINALIZE_DELIMITER: char = fiscal_core::types::RECEIPT_DELIMITER;

/// First field of an accepted subtotal or payment response.
pub const ACCEPTED_MARKER: &str = "P";

/// First field of a successful finalize response.
pub const FINALIZED_MARKER: &str = fiscal_core::types::RECEIPT_MARKER;

/// Prefix of an explicit device error.
pub const DEVICE_ERROR_MARKER: &str = "E:";

/// Characters reserved as field/record separators inside payloads.
pub const RESERVED_CHARS: [char; 2] = ['\n', '\t'];

// =============================================================================
// Response Shapes
// =============================================================================

pub const DEVICE_STATE_FIELDS: usize = 10;
pub const NETWORK_STATE_FIELDS: usize = 3;
pub const SUBTOTAL_FIELDS: usize = 4;
pub const PAYMENT_FIELDS: usize = 5;
pub const FINALIZE_FIELDS: usize = 5;

/// Position of the remaining balance in a payment response.
pub const REMAINING_BALANCE_FIELD: usize = 4;

/// Taxpayer identity sub-queries are addressed `I0` through `I5`.
pub const TAXPAYER_INFO_FIELDS: u8 = 6;

/// Total submissions of one payment before moving on without acceptance.
pub const DEFAULT_PAYMENT_ATTEMPTS: u32 = 3;

// =============================================================================
// Steps
// =============================================================================

/// Protocol step, used to label logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Validate,
    DeviceState,
    NetworkState,
    TaxpayerInfo,
    StartBill,
    AddItem,
    Subtotal,
    Payment,
    Finalize,
    CloseBill,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::Validate => "VALIDATE",
            Step::DeviceState => "DEV_STATE",
            Step::NetworkState => "NETWORK_STATE",
            Step::TaxpayerInfo => "TAXPAYER_INFO",
            Step::StartBill => "START_BILL",
            Step::AddItem => "ADD_BILL_ITEM",
            Step::Subtotal => "GET_BILL_SUB_TOTAL",
            Step::Payment => "GET_BILL_TOTAL",
            Step::Finalize => "FINALIZE_BILL",
            Step::CloseBill => "END_BILL",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
