//! # Domain Types
//!
//! Core domain types that flow through a bill issuance.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Bill       │   │    Product      │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  seller / buyer │──►│  label, tax     │   │  mode (code)    │       │
//! │  │  VT / RT / RN   │   │  price × items  │   │  amount         │       │
//! │  │  AIB            │──►│  optional pairs │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │   DeviceInfo    │   │  FiscalReceipt  │                             │
//! │  │  ─────────────  │   │  ─────────────  │                             │
//! │  │  NIM / IFU      │   │  NIM, Signature │                             │
//! │  │  counters, taxes│   │  IFU, DateTime  │                             │
//! │  │  taxpayer info  │   │  F;..;..;..;..  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! A `Bill` belongs to the caller for the length of one transaction.
//! `DeviceInfo` and `FiscalReceipt` are plain values handed back to the
//! caller; nothing here is shared or mutated behind the caller's back.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amount::Amount;
use crate::error::{CoreError, CoreResult};
use crate::{AIB_ABSENT, DEVICE_TIMESTAMP_FORMAT};

// =============================================================================
// Bill
// =============================================================================

/// A sale to be registered on the fiscal device.
///
/// Field names on the wire follow the upstream record (`SellerId`,
/// `BuyerIFU`, `VT`, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    /// Seller (operator) identifier.
    #[serde(rename = "SellerId")]
    pub seller_id: String,

    /// Seller (operator) display name.
    #[serde(rename = "SellerName")]
    pub seller_name: String,

    /// Buyer's taxpayer number, empty for anonymous buyers.
    #[serde(rename = "BuyerIFU", default)]
    pub buyer_ifu: String,

    /// Buyer's name, empty for anonymous buyers.
    #[serde(rename = "BuyerName", default)]
    pub buyer_name: String,

    /// Bill type code (sale, credit note, ...).
    #[serde(rename = "VT")]
    pub vt: String,

    #[serde(rename = "RT", default, skip_serializing_if = "Option::is_none")]
    pub rt: Option<String>,

    #[serde(rename = "RN", default, skip_serializing_if = "Option::is_none")]
    pub rn: Option<String>,

    /// AIB code; the literal `"N/A"` means "no AIB".
    #[serde(rename = "AIB", default, skip_serializing_if = "Option::is_none")]
    pub aib: Option<String>,

    /// Ordered line items. Never empty on a valid bill.
    #[serde(rename = "Products")]
    pub products: Vec<Product>,

    /// Ordered payments, submitted to the device in this order.
    #[serde(rename = "Payments", default)]
    pub payments: Vec<Payment>,
}

impl Bill {
    /// Decodes an upstream JSON bill record.
    ///
    /// Only the shape is checked here; business rules are applied by
    /// [`validate_bill`](crate::validation::validate_bill).
    pub fn from_json(json: &[u8]) -> CoreResult<Self> {
        Ok(serde_json::from_slice(json)?)
    }

    /// Returns the AIB code, or `None` when absent or set to `"N/A"`.
    pub fn aib(&self) -> Option<&str> {
        self.aib.as_deref().filter(|aib| *aib != AIB_ABSENT)
    }

    /// Sum of all payment amounts, or `None` when it overflows.
    pub fn payments_total(&self) -> Option<Amount> {
        Amount::checked_sum(self.payments.iter().map(|p| p.amount))
    }
}

// =============================================================================
// Product
// =============================================================================

/// A line item on a bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Free-text label printed on the receipt.
    #[serde(rename = "Label")]
    pub label: String,

    #[serde(rename = "BarCode", default, skip_serializing_if = "Option::is_none")]
    pub bar_code: Option<String>,

    /// Tax group code (e.g. `"A"`, `"B"`).
    #[serde(rename = "Tax")]
    pub tax: String,

    /// Unit price.
    #[serde(rename = "Price")]
    pub price: Amount,

    /// Quantity sold.
    #[serde(rename = "Items")]
    pub items: Amount,

    #[serde(rename = "SpecificTax", default, skip_serializing_if = "Option::is_none")]
    pub specific_tax: Option<Amount>,

    #[serde(rename = "SpecificTaxDesc", default, skip_serializing_if = "Option::is_none")]
    pub specific_tax_desc: Option<String>,

    #[serde(rename = "OriginalPrice", default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<Amount>,

    #[serde(
        rename = "PriceChangeExplanation",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub price_change_explanation: Option<String>,
}

impl Product {
    /// Creates a product with only the mandatory fields set.
    pub fn new(label: impl Into<String>, tax: impl Into<String>, price: Amount, items: Amount) -> Self {
        Product {
            label: label.into(),
            bar_code: None,
            tax: tax.into(),
            price,
            items,
            specific_tax: None,
            specific_tax_desc: None,
            original_price: None,
            price_change_explanation: None,
        }
    }

    /// Bar code with surrounding whitespace removed, if any is left.
    pub fn bar_code(&self) -> Option<&str> {
        self.bar_code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
    }

    /// Specific tax and its description, when a positive tax is set.
    pub fn specific_tax(&self) -> Option<(Amount, &str)> {
        match (self.specific_tax, self.specific_tax_desc.as_deref()) {
            (Some(tax), Some(desc)) if tax.is_positive() => Some((tax, desc)),
            _ => None,
        }
    }

    /// Original price and the reason it changed, when a positive original
    /// price is set.
    pub fn original_price(&self) -> Option<(Amount, &str)> {
        match (self.original_price, self.price_change_explanation.as_deref()) {
            (Some(price), Some(why)) if price.is_positive() => Some((price, why)),
            _ => None,
        }
    }
}

// =============================================================================
// Payment
// =============================================================================

/// A payment towards a bill. A bill can be settled by several payments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment mode code as the device knows it (cash, card, ...).
    #[serde(rename = "Mode")]
    pub mode: String,

    /// Amount tendered with this mode.
    #[serde(rename = "Amount")]
    pub amount: Amount,
}

impl Payment {
    pub fn new(mode: impl Into<String>, amount: Amount) -> Self {
        Payment {
            mode: mode.into(),
            amount,
        }
    }
}

// =============================================================================
// Device Info
// =============================================================================

/// Flat record of what the device reports about itself and its taxpayer.
///
/// Each read-only query fills only its own slice of fields; use
/// [`DeviceInfo::merge`] to combine them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    // Device state query
    pub nim: String,
    pub ifu: String,
    pub time: Option<DateTime<FixedOffset>>,
    pub counter: String,
    pub sell_bill_counter: String,
    pub settlement_bill_counter: String,
    pub tax_a: String,
    pub tax_b: String,
    pub tax_c: String,
    pub tax_d: String,

    // Taxpayer identity query
    pub company_name: String,
    pub company_location_address: String,
    pub company_location_city: String,
    pub company_contact_phone: String,
    pub company_contact_email: String,

    // Tax-authority link query
    pub last_connection_to_server: Option<DateTime<FixedOffset>>,
    pub document_on_device_count: String,
    pub uploaded_document_count: String,
}

impl DeviceInfo {
    /// Fills every empty field of `self` from `other`.
    pub fn merge(mut self, other: DeviceInfo) -> DeviceInfo {
        fn take(slot: &mut String, from: String) {
            if slot.is_empty() {
                *slot = from;
            }
        }

        take(&mut self.nim, other.nim);
        take(&mut self.ifu, other.ifu);
        self.time = self.time.or(other.time);
        take(&mut self.counter, other.counter);
        take(&mut self.sell_bill_counter, other.sell_bill_counter);
        take(&mut self.settlement_bill_counter, other.settlement_bill_counter);
        take(&mut self.tax_a, other.tax_a);
        take(&mut self.tax_b, other.tax_b);
        take(&mut self.tax_c, other.tax_c);
        take(&mut self.tax_d, other.tax_d);
        take(&mut self.company_name, other.company_name);
        take(&mut self.company_location_address, other.company_location_address);
        take(&mut self.company_location_city, other.company_location_city);
        take(&mut self.company_contact_phone, other.company_contact_phone);
        take(&mut self.company_contact_email, other.company_contact_email);
        self.last_connection_to_server = self
            .last_connection_to_server
            .or(other.last_connection_to_server);
        take(&mut self.document_on_device_count, other.document_on_device_count);
        take(&mut self.uploaded_document_count, other.uploaded_document_count);
        self
    }

    /// The four tax-rate fields in device order (A, B, C, D).
    pub fn tax_rates(&self) -> [&str; 4] {
        [&self.tax_a, &self.tax_b, &self.tax_c, &self.tax_d]
    }
}

/// Decodes a 14-digit device timestamp (`YYYYMMDDhhmmss`) in `tz`.
///
/// Returns `None` for anything that is not exactly 14 digits or names an
/// impossible date; callers leave the field empty rather than failing.
pub fn decode_device_timestamp(raw: &str, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.len() != 14 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(raw, DEVICE_TIMESTAMP_FORMAT).ok()?;
    tz.from_local_datetime(&naive).single()
}

// =============================================================================
// Fiscal Receipt
// =============================================================================

/// Marker opening the finalize response and the receipt wire string.
pub const RECEIPT_MARKER: &str = "F";

/// Separator of the receipt wire string.
pub const RECEIPT_DELIMITER: char = ';';

/// The legal proof of a registered bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalReceipt {
    /// Device fiscal registration id.
    pub nim: String,
    /// Device-issued compliance signature.
    pub signature: String,
    /// Taxpayer fiscal id.
    pub ifu: String,
    /// Issuance timestamp, as the device reported it.
    pub date_time: String,
}

impl FiscalReceipt {
    /// Renders `F;<NIM>;<Signature>;<IFU>;<DateTime>`.
    pub fn to_wire(&self) -> String {
        self.to_string()
    }

    /// Parses the 5-field receipt string back into its parts.
    pub fn from_wire(wire: &str) -> CoreResult<Self> {
        let fields: Vec<&str> = wire.trim().split(RECEIPT_DELIMITER).collect();
        match fields.as_slice() {
            [RECEIPT_MARKER, nim, signature, ifu, date_time] => Ok(FiscalReceipt {
                nim: nim.to_string(),
                signature: signature.to_string(),
                ifu: ifu.to_string(),
                date_time: date_time.to_string(),
            }),
            _ => Err(CoreError::Decoding(format!(
                "receipt must be F;NIM;SIG;IFU;DT, got '{wire}'"
            ))),
        }
    }

    /// Issuance time in the fiscal timezone, if the device sent a
    /// well-formed timestamp.
    pub fn issued_at(&self, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
        decode_device_timestamp(&self.date_time, tz)
    }
}

impl fmt::Display for FiscalReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = RECEIPT_DELIMITER;
        write!(
            f,
            "{RECEIPT_MARKER}{d}{}{d}{}{d}{}{d}{}",
            self.nim, self.signature, self.ifu, self.date_time
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
