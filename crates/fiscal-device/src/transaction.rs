//! # Bill Transaction
//!
//! Drives one bill through the device's issuance sequence.
//!
//! ## State Machine
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Idle ──START_BILL──► Opened ──ADD_BILL_ITEM×n──► ItemsAdded           │
//! │                                                        │                │
//! │                                               GET_BILL_SUB_TOTAL        │
//! │                                                        ▼                │
//! │  PaymentsSettled ◄──GET_BILL_TOTAL×payments── TotalsChecked            │
//! │        │                                                                │
//! │      0x38                                                               │
//! │        ▼                                                                │
//! │  Finalized ──END_BILL──► Closed                                         │
//! │                                                                         │
//! │  Any step failure ──► Failed (terminal)                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Failure Policy
//! - Every failure aborts the remaining sequence; the only retry is the
//!   bounded resubmission of a single payment.
//! - Items the device accepted before a failure are NOT rolled back; the
//!   protocol has no cancel command. [`BillTransaction::accepted_items`]
//!   reports how many reached the device.
//! - A failed END_BILL still surfaces as [`DeviceError::CloseFailed`],
//!   carrying the receipt the device already issued.
//! - A transaction runs once. Retrying means a new transaction.

use chrono::FixedOffset;
use fiscal_core::validation::validate_bill;
use fiscal_core::{Bill, DeviceInfo, FiscalReceipt};
use std::fmt;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::channel::{exchange, DeviceChannel};
use crate::config::FiscalConfig;
use crate::error::{DeviceError, DeviceResult};
use crate::info::DeviceInfoReader;
use crate::parser::{is_device_error, ResponseParser};
use crate::payload::{bill_item_payload, payment_payload, start_bill_payload};
use crate::protocol::{
    Command, Step, ACCEPTED_MARKER, DEFAULT_PAYMENT_ATTEMPTS, DEVICE_ERROR_MARKER, FIELD_DELIMITER,
    FINALIZED_MARKER, FINALIZE_BILL, FINALIZE_DELIMITER, FINALIZE_FIELDS, PAYMENT_FIELDS,
    REMAINING_BALANCE_FIELD, SUBTOTAL_FIELDS,
};

// =============================================================================
// Transaction State
// =============================================================================

/// Where a transaction stands in the issuance sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    Idle,
    Opened,
    ItemsAdded,
    TotalsChecked,
    PaymentsSettled,
    Finalized,
    /// Terminal success.
    Closed,
    /// Terminal failure.
    Failed,
}

impl TransactionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionState::Closed | TransactionState::Failed)
    }

    /// True while the device holds an open bill session for this
    /// transaction.
    pub fn has_open_session(&self) -> bool {
        !matches!(
            self,
            TransactionState::Idle | TransactionState::Closed | TransactionState::Failed
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionState::Idle => write!(f, "idle"),
            TransactionState::Opened => write!(f, "opened"),
            TransactionState::ItemsAdded => write!(f, "items_added"),
            TransactionState::TotalsChecked => write!(f, "totals_checked"),
            TransactionState::PaymentsSettled => write!(f, "payments_settled"),
            TransactionState::Finalized => write!(f, "finalized"),
            TransactionState::Closed => write!(f, "closed"),
            TransactionState::Failed => write!(f, "failed"),
        }
    }
}

// =============================================================================
// Bill Transaction
// =============================================================================

/// One bill issuance against one device.
///
/// Holds the channel exclusively for its lifetime, which keeps a second
/// transaction off the device's single bill session.
pub struct BillTransaction<'a, C: DeviceChannel + ?Sized> {
    id: Uuid,
    channel: &'a mut C,
    tz: FixedOffset,
    payment_attempts: u32,
    state: TransactionState,
    accepted_items: usize,
}

impl<'a, C: DeviceChannel + ?Sized> BillTransaction<'a, C> {
    /// Creates an idle transaction decoding timestamps in `tz`.
    pub fn new(channel: &'a mut C, tz: FixedOffset) -> Self {
        BillTransaction {
            id: Uuid::new_v4(),
            channel,
            tz,
            payment_attempts: DEFAULT_PAYMENT_ATTEMPTS,
            state: TransactionState::Idle,
            accepted_items: 0,
        }
    }

    /// Creates an idle transaction with the timezone and retry bound from
    /// `config`.
    pub fn from_config(channel: &'a mut C, config: &FiscalConfig) -> DeviceResult<Self> {
        Ok(Self::new(channel, config.timezone()?).with_payment_attempts(config.payment_attempts()))
    }

    /// Sets the total submissions per payment (at least 1).
    pub fn with_payment_attempts(mut self, attempts: u32) -> Self {
        self.payment_attempts = attempts.max(1);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Items the device accepted so far. After a failure these stay
    /// registered on the device.
    pub fn accepted_items(&self) -> usize {
        self.accepted_items
    }

    /// Runs the full sequence and returns the device-issued receipt.
    ///
    /// `device` supplies the IFU and tax rates for the start-bill command,
    /// normally from [`DeviceInfoReader::device_state`].
    pub fn run(&mut self, bill: &Bill, device: &DeviceInfo) -> DeviceResult<FiscalReceipt> {
        if self.state != TransactionState::Idle {
            return Err(DeviceError::InvalidState { state: self.state });
        }

        info!(
            transaction_id = %self.id,
            products = bill.products.len(),
            payments = bill.payments.len(),
            "Starting bill transaction"
        );

        match self.drive(bill, device) {
            Ok(receipt) => {
                info!(
                    transaction_id = %self.id,
                    nim = %receipt.nim,
                    ifu = %receipt.ifu,
                    date_time = %receipt.date_time,
                    "Bill issued"
                );
                Ok(receipt)
            }
            Err(e) => {
                let open_session = self.state.has_open_session();
                self.state = TransactionState::Failed;
                error!(
                    transaction_id = %self.id,
                    step = ?e.step(),
                    raw = ?e.raw_response(),
                    error = %e,
                    "Bill transaction failed"
                );
                if open_session && self.accepted_items > 0 && e.receipt().is_none() {
                    warn!(
                        transaction_id = %self.id,
                        accepted_items = self.accepted_items,
                        "Items already registered on the device are not rolled back"
                    );
                }
                Err(e)
            }
        }
    }

    fn drive(&mut self, bill: &Bill, device: &DeviceInfo) -> DeviceResult<FiscalReceipt> {
        validate_bill(bill)?;

        self.start_bill(bill, device)?;
        self.advance(TransactionState::Opened);

        self.add_items(bill)?;
        self.advance(TransactionState::ItemsAdded);

        self.check_subtotal(bill)?;
        self.advance(TransactionState::TotalsChecked);

        self.settle_payments(bill)?;
        self.advance(TransactionState::PaymentsSettled);

        let receipt = self.finalize()?;
        self.advance(TransactionState::Finalized);

        self.close_bill().map_err(|e| DeviceError::CloseFailed {
            receipt: receipt.clone(),
            source: Box::new(e),
        })?;
        self.advance(TransactionState::Closed);

        Ok(receipt)
    }

    fn advance(&mut self, next: TransactionState) {
        debug!(transaction_id = %self.id, from = %self.state, to = %next, "State transition");
        self.state = next;
    }

    // =========================================================================
    // Steps
    // =========================================================================

    fn start_bill(&mut self, bill: &Bill, device: &DeviceInfo) -> DeviceResult<()> {
        let step = Step::StartBill;
        let payload = start_bill_payload(bill, device);
        let raw = exchange(&mut *self.channel, step, Command::StartBill.code(), &payload)?;

        if raw.contains(DEVICE_ERROR_MARKER) {
            return Err(DeviceError::protocol(step, "device refused to open the bill", raw));
        }
        Ok(())
    }

    fn add_items(&mut self, bill: &Bill) -> DeviceResult<()> {
        let step = Step::AddItem;
        for (index, product) in bill.products.iter().enumerate() {
            let payload = bill_item_payload(product);
            let raw = exchange(&mut *self.channel, step, Command::AddBillItem.code(), &payload)?;

            if is_device_error(&raw) {
                return Err(DeviceError::protocol(
                    step,
                    format!("item {index} ({}) rejected", product.label),
                    raw,
                ));
            }
            self.accepted_items += 1;
        }
        Ok(())
    }

    fn check_subtotal(&mut self, bill: &Bill) -> DeviceResult<()> {
        let step = Step::Subtotal;
        let raw = exchange(&mut *self.channel, step, Command::BillSubtotal.code(), "")?;
        let response = ResponseParser::new(step, FIELD_DELIMITER, SUBTOTAL_FIELDS).parse(&raw)?;
        response.expect_marker(ACCEPTED_MARKER)?;

        // The device total is authoritative; a mismatch only shows up in the
        // remaining balance after payments.
        if let (Ok(total), Some(tendered)) =
            (response.amount(SUBTOTAL_FIELDS - 1), bill.payments_total())
        {
            if tendered < total {
                warn!(
                    transaction_id = %self.id,
                    %total,
                    %tendered,
                    "Payments do not cover the device subtotal"
                );
            }
        }
        Ok(())
    }

    fn settle_payments(&mut self, bill: &Bill) -> DeviceResult<()> {
        let step = Step::Payment;
        let mut last_response = None;

        for (index, payment) in bill.payments.iter().enumerate() {
            let payload = payment_payload(payment);
            let mut attempt = 1;

            let raw = loop {
                let raw = exchange(&mut *self.channel, step, Command::BillTotal.code(), &payload)?;
                if is_accepted(&raw) || attempt >= self.payment_attempts {
                    break raw;
                }
                warn!(
                    transaction_id = %self.id,
                    payment = index,
                    attempt,
                    raw = %raw,
                    "Payment not accepted, resubmitting"
                );
                attempt += 1;
            };

            if !is_accepted(&raw) {
                warn!(
                    transaction_id = %self.id,
                    payment = index,
                    attempts = attempt,
                    raw = %raw,
                    "Payment still not accepted, proceeding"
                );
            }
            last_response = Some(raw);
        }

        let raw = last_response.ok_or_else(|| DeviceError::protocol(step, "no payment submitted", ""))?;
        let response = ResponseParser::new(step, FIELD_DELIMITER, PAYMENT_FIELDS).parse(&raw)?;
        let remaining = response.amount(REMAINING_BALANCE_FIELD)?;

        if remaining.is_positive() {
            return Err(DeviceError::InsufficientPayment { remaining });
        }
        Ok(())
    }

    fn finalize(&mut self) -> DeviceResult<FiscalReceipt> {
        let step = Step::Finalize;
        let raw = exchange(&mut *self.channel, step, FINALIZE_BILL, "")?;
        let response = ResponseParser::new(step, FINALIZE_DELIMITER, FINALIZE_FIELDS).parse(&raw)?;
        response.expect_marker(FINALIZED_MARKER)?;

        Ok(FiscalReceipt {
            nim: response.string(1),
            signature: response.string(2),
            ifu: response.string(3),
            date_time: response.string(4),
        })
    }

    fn close_bill(&mut self) -> DeviceResult<()> {
        let step = Step::CloseBill;
        let raw = exchange(&mut *self.channel, step, Command::EndBill.code(), "")?;
        if is_device_error(&raw) {
            return Err(DeviceError::protocol(step, "device refused to close the bill", raw));
        }
        Ok(())
    }
}

fn is_accepted(raw: &str) -> bool {
    raw.trim().split(FIELD_DELIMITER).next() == Some(ACCEPTED_MARKER)
}

// =============================================================================
// Entry Points
// =============================================================================

/// Issues `bill` on the device behind `channel`.
///
/// Validates the bill, reads the device state for the IFU and tax rates,
/// then runs one [`BillTransaction`]. An invalid bill never reaches the
/// device.
pub fn issue_bill<C: DeviceChannel + ?Sized>(
    channel: &mut C,
    config: &FiscalConfig,
    bill: &Bill,
) -> DeviceResult<FiscalReceipt> {
    validate_bill(bill)?;
    info!(device = %config.device.name, seller = %bill.seller_id, "Issuing bill");

    let device = DeviceInfoReader::new(&mut *channel, config.timezone()?).device_state()?;
    BillTransaction::from_config(channel, config)?.run(bill, &device)
}

/// Decodes an upstream JSON bill record and issues it, returning the
/// receipt as `F;<NIM>;<Signature>;<IFU>;<DateTime>`.
pub fn issue_bill_json<C: DeviceChannel + ?Sized>(
    channel: &mut C,
    config: &FiscalConfig,
    json: &[u8],
) -> DeviceResult<String> {
    let bill = Bill::from_json(json)?;
    Ok(issue_bill(channel, config, &bill)?.to_wire())
}
