//! # Command Payloads
//!
//! Field tables for every command that carries a payload.
//!
//! ## Layouts
//! ```text
//! START_BILL     SellerId,SellerName,IFU,TaxA,TaxB,TaxC,TaxD,VT,RT,RN,
//!                BuyerIFU,BuyerName[,AIB]
//! ADD_BILL_ITEM  Label[\nBarCode]\tTaxPrice*Items[;SpecificTax,Desc]
//!                [\tOriginalPrice,Explanation]
//! GET_TOTAL      ModeAmount
//! TAXPAYER_INFO  I<n>
//! ```
//!
//! `RT` and `RN` hold their positions (empty) when absent; only `AIB`
//! drops out of the start-bill payload.

use fiscal_core::{Bill, DeviceInfo, Payment, Product};

use crate::encoder::{sanitize, CommandEncoder};

const COMMA: &str = ",";

/// Payload of the start-bill command.
///
/// The IFU and the four tax rates come from the device's own state.
pub fn start_bill_payload(bill: &Bill, device: &DeviceInfo) -> String {
    let [tax_a, tax_b, tax_c, tax_d] = device.tax_rates();
    CommandEncoder::new()
        .text(COMMA, &bill.seller_id)
        .text(COMMA, &bill.seller_name)
        .field(COMMA, device.ifu.as_str())
        .field(COMMA, tax_a)
        .field(COMMA, tax_b)
        .field(COMMA, tax_c)
        .field(COMMA, tax_d)
        .text(COMMA, &bill.vt)
        .text(COMMA, bill.rt.as_deref().unwrap_or_default())
        .text(COMMA, bill.rn.as_deref().unwrap_or_default())
        .text(COMMA, &bill.buyer_ifu)
        .text(COMMA, &bill.buyer_name)
        .optional(COMMA, bill.aib())
        .encode()
}

/// Payload of one add-item command.
pub fn bill_item_payload(product: &Product) -> String {
    let specific_tax = product.specific_tax();
    let original_price = product.original_price();

    CommandEncoder::new()
        .text("", &product.label)
        .optional("\n", product.bar_code().map(sanitize))
        .text("\t", &product.tax)
        .field("", product.price.to_string())
        .field("*", product.items.to_string())
        .optional(";", specific_tax.map(|(tax, _)| tax.to_string()))
        .optional(",", specific_tax.map(|(_, desc)| sanitize(desc)))
        .optional("\t", original_price.map(|(price, _)| price.to_string()))
        .optional(",", original_price.map(|(_, why)| sanitize(why)))
        .encode()
}

/// Payload of one payment submission.
pub fn payment_payload(payment: &Payment) -> String {
    CommandEncoder::new()
        .text("", &payment.mode)
        .field("", payment.amount.to_string())
        .encode()
}

/// Payload addressing taxpayer identity field `index`.
pub fn taxpayer_info_payload(index: u8) -> String {
    format!("I{index}")
}
