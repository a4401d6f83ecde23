//! Validation primitives for the posting surface
//!
//! Services attach field names and error types; these functions only state
//! the rule. Keeping them here lets the document posters and the movement
//! engine agree on what a legal quantity, cost or reference code is.

use rust_decimal::Decimal;

/// Upper bound for SKUs, warehouse codes and document numbers.
pub const MAX_CODE_LEN: usize = 64;

// ============================================================================
// Quantity and cost validations
// ============================================================================

/// Document line quantities must be strictly positive; the poster decides
/// the sign of the ledger entry, never the caller.
pub fn validate_positive_qty(qty: Decimal) -> Result<(), &'static str> {
    if qty <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

/// Adjustments carry a signed quantity but zero would post a no-op entry.
pub fn validate_nonzero_qty(qty: Decimal) -> Result<(), &'static str> {
    if qty.is_zero() {
        return Err("Quantity must not be zero");
    }
    Ok(())
}

/// Free receipts (cost 0) are allowed; negative costs are not.
pub fn validate_unit_cost(unit_cost: Decimal) -> Result<(), &'static str> {
    if unit_cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    Ok(())
}

/// Every posted document needs at least one line.
pub fn validate_has_lines(line_count: usize) -> Result<(), &'static str> {
    if line_count == 0 {
        return Err("Document must contain at least one line");
    }
    Ok(())
}

// ============================================================================
// Reference data validations
// ============================================================================

/// SKUs, warehouse codes, invoice and bill numbers: non-blank, bounded.
pub fn validate_code(code: &str) -> Result<(), &'static str> {
    if code.trim().is_empty() {
        return Err("Code must not be blank");
    }
    if code.len() > MAX_CODE_LEN {
        return Err("Code exceeds maximum length");
    }
    Ok(())
}

/// Display names for products, warehouses and suppliers.
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    if name.trim().is_empty() {
        return Err("Name must not be blank");
    }
    Ok(())
}

/// Adjustments must say why stock moved outside a document.
pub fn validate_reason(reason: &str) -> Result<(), &'static str> {
    if reason.trim().is_empty() {
        return Err("Reason is required");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    // ========================================================================
    // Quantity and cost validation tests
    // ========================================================================

    #[test]
    fn test_validate_positive_qty() {
        assert!(validate_positive_qty(dec("0.0001")).is_ok());
        assert!(validate_positive_qty(dec("25")).is_ok());
        assert!(validate_positive_qty(Decimal::ZERO).is_err());
        assert!(validate_positive_qty(dec("-3")).is_err());
    }

    #[test]
    fn test_validate_nonzero_qty() {
        assert!(validate_nonzero_qty(dec("-3")).is_ok());
        assert!(validate_nonzero_qty(dec("3")).is_ok());
        assert!(validate_nonzero_qty(Decimal::ZERO).is_err());
        assert!(validate_nonzero_qty(dec("0.000")).is_err());
    }

    #[test]
    fn test_validate_unit_cost() {
        assert!(validate_unit_cost(Decimal::ZERO).is_ok());
        assert!(validate_unit_cost(dec("12.50")).is_ok());
        assert!(validate_unit_cost(dec("-0.01")).is_err());
    }

    #[test]
    fn test_validate_has_lines() {
        assert!(validate_has_lines(1).is_ok());
        assert!(validate_has_lines(40).is_ok());
        assert!(validate_has_lines(0).is_err());
    }

    // ========================================================================
    // Reference data validation tests
    // ========================================================================

    #[test]
    fn test_validate_code() {
        assert!(validate_code("SKU-001").is_ok());
        assert!(validate_code("MAIN").is_ok());
        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code(&"X".repeat(MAX_CODE_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Main Warehouse").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name(" \t ").is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("cycle count correction").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("  ").is_err());
    }
}
