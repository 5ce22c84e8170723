//! # Validation Module
//!
//! Structural checks applied to a [`Bill`] before any device command is
//! sent.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Decoding (serde)                                             │
//! │  └── Shape: keys present, numbers are numbers                          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── at least one product and one payment                              │
//! │  ├── quantities and payment amounts positive                           │
//! │  └── optional pairs given together                                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Fiscal device                                                │
//! │  └── tax groups, totals, remaining balance                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A bill rejected here never opens a device session, so nothing needs
//! cleaning up on the device.

use crate::error::ValidationError;
use crate::types::{Bill, Payment, Product};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Bill
// =============================================================================

/// Validates a whole bill, stopping at the first broken rule.
///
/// ## Rules
/// - `SellerId` and `VT` are required
/// - At least one product, each passing [`validate_product`]
/// - At least one payment, each passing [`validate_payment`]
/// - Payments must add up to a representable amount
///
/// ## Example
/// ```rust
/// use fiscal_core::{Amount, Bill, Payment, Product};
/// use fiscal_core::validation::validate_bill;
///
/// let bill = Bill {
///     seller_id: "S01".into(),
///     seller_name: "Caisse 1".into(),
///     buyer_ifu: String::new(),
///     buyer_name: String::new(),
///     vt: "FV".into(),
///     rt: None,
///     rn: None,
///     aib: None,
///     products: vec![Product::new("Pain", "A", Amount::from_units(200), Amount::from_units(1))],
///     payments: vec![Payment::new("V", Amount::from_units(200))],
/// };
/// assert!(validate_bill(&bill).is_ok());
/// ```
pub fn validate_bill(bill: &Bill) -> ValidationResult<()> {
    require("SellerId", &bill.seller_id)?;
    require("VT", &bill.vt)?;

    if bill.products.is_empty() {
        return Err(ValidationError::Empty {
            what: "product".to_string(),
        });
    }
    for (i, product) in bill.products.iter().enumerate() {
        validate_product(i, product)?;
    }

    if bill.payments.is_empty() {
        return Err(ValidationError::Empty {
            what: "payment".to_string(),
        });
    }
    for (i, payment) in bill.payments.iter().enumerate() {
        validate_payment(i, payment)?;
    }
    if bill.payments_total().is_none() {
        return Err(ValidationError::InvalidFormat {
            field: "Payments".to_string(),
            reason: "total is out of range".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Line Items
// =============================================================================

/// Validates a single product at position `index`.
///
/// ## Rules
/// - Tax code is required
/// - Price must not be negative
/// - Quantity must be positive
/// - `SpecificTax`/`SpecificTaxDesc` both present or both absent
/// - `OriginalPrice`/`PriceChangeExplanation` both present or both absent
pub fn validate_product(index: usize, product: &Product) -> ValidationResult<()> {
    let field = |name: &str| format!("Products[{index}].{name}");

    if product.tax.trim().is_empty() {
        return Err(ValidationError::Required { field: field("Tax") });
    }

    if product.price.is_negative() {
        return Err(ValidationError::Negative {
            field: field("Price"),
        });
    }

    if !product.items.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field("Items"),
        });
    }

    check_pair(
        product.specific_tax.is_some(),
        product.specific_tax_desc.is_some(),
        field("SpecificTax"),
        field("SpecificTaxDesc"),
    )?;

    check_pair(
        product.original_price.is_some(),
        product.price_change_explanation.is_some(),
        field("OriginalPrice"),
        field("PriceChangeExplanation"),
    )?;

    Ok(())
}

// =============================================================================
// Payments
// =============================================================================

/// Validates a single payment at position `index`.
///
/// ## Rules
/// - Mode code is required
/// - Amount must be positive
pub fn validate_payment(index: usize, payment: &Payment) -> ValidationResult<()> {
    if payment.mode.trim().is_empty() {
        return Err(ValidationError::Required {
            field: format!("Payments[{index}].Mode"),
        });
    }

    if !payment.amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: format!("Payments[{index}].Amount"),
        });
    }

    Ok(())
}

// =============================================================================
// Helpers
// =============================================================================

fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn check_pair(first: bool, second: bool, field: String, partner: String) -> ValidationResult<()> {
    if first != second {
        return Err(ValidationError::IncompletePair { field, partner });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::Amount;

    fn sample_bill() -> Bill {
        Bill {
            seller_id: "S01".to_string(),
            seller_name: "Caisse 1".to_string(),
            buyer_ifu: String::new(),
            buyer_name: String::new(),
            vt: "FV".to_string(),
            rt: None,
            rn: None,
            aib: None,
            products: vec![Product::new(
                "Coca 1L",
                "B",
                Amount::from_units(1500),
                Amount::from_units(2),
            )],
            payments: vec![Payment::new("V", Amount::from_units(3000))],
        }
    }

    #[test]
    fn test_valid_bill() {
        assert!(validate_bill(&sample_bill()).is_ok());
    }

    #[test]
    fn test_bill_needs_products_and_payments() {
        let mut bill = sample_bill();
        bill.products.clear();
        assert_eq!(
            validate_bill(&bill),
            Err(ValidationError::Empty {
                what: "product".to_string()
            })
        );

        let mut bill = sample_bill();
        bill.payments.clear();
        assert!(matches!(
            validate_bill(&bill),
            Err(ValidationError::Empty { .. })
        ));
    }

    #[test]
    fn test_required_header_fields() {
        let mut bill = sample_bill();
        bill.seller_id = "  ".to_string();
        assert!(matches!(
            validate_bill(&bill),
            Err(ValidationError::Required { .. })
        ));

        let mut bill = sample_bill();
        bill.vt.clear();
        assert!(validate_bill(&bill).is_err());
    }

    #[test]
    fn test_product_rules() {
        let mut product = sample_bill().products.remove(0);
        product.items = Amount::zero();
        assert_eq!(
            validate_product(3, &product),
            Err(ValidationError::MustBePositive {
                field: "Products[3].Items".to_string()
            })
        );

        let mut product = sample_bill().products.remove(0);
        product.price = Amount::from_units(-1);
        assert!(matches!(
            validate_product(0, &product),
            Err(ValidationError::Negative { .. })
        ));

        let mut product = sample_bill().products.remove(0);
        product.price = Amount::zero();
        assert!(validate_product(0, &product).is_ok());

        let mut product = sample_bill().products.remove(0);
        product.tax.clear();
        assert!(validate_product(0, &product).is_err());
    }

    #[test]
    fn test_optional_pairs_are_both_or_neither() {
        let mut product = sample_bill().products.remove(0);
        product.specific_tax = Some(Amount::from_units(10));
        assert!(matches!(
            validate_product(0, &product),
            Err(ValidationError::IncompletePair { .. })
        ));

        product.specific_tax_desc = Some("Taxe".to_string());
        assert!(validate_product(0, &product).is_ok());

        product.price_change_explanation = Some("Promo".to_string());
        assert!(validate_product(0, &product).is_err());

        product.original_price = Some(Amount::from_units(1800));
        assert!(validate_product(0, &product).is_ok());
    }

    #[test]
    fn test_payments_total_overflow_is_rejected() {
        let mut bill = sample_bill();
        let huge = Amount::from_units(5_000_000_000_000);
        bill.payments = vec![Payment::new("V", huge), Payment::new("C", huge)];
        assert!(matches!(
            validate_bill(&bill),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }

    #[test]
    fn test_payment_rules() {
        assert!(validate_payment(0, &Payment::new("V", Amount::from_units(1))).is_ok());
        assert!(validate_payment(0, &Payment::new("V", Amount::zero())).is_err());
        assert!(validate_payment(0, &Payment::new("", Amount::from_units(1))).is_err());
    }
}
