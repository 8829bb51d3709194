//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so every entry point rejects the same inputs
//! before touching the store.

use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine, TransactionKind};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

/// Trim a required text field, rejecting blanks.
pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Validate the amount/kind/theme combination of a transaction.
pub(crate) fn validate_entry(
    amount: Money,
    kind: TransactionKind,
    theme_id: Option<Uuid>,
) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation("amount must be > 0".to_string()));
    }
    match (kind, theme_id) {
        (TransactionKind::Expense, None) => Err(EngineError::Validation(
            "an expense requires a theme".to_string(),
        )),
        (TransactionKind::Income, Some(_)) => Err(EngineError::Validation(
            "an income cannot reference a theme".to_string(),
        )),
        _ => Ok(()),
    }
}

/// Add two amounts, rejecting a result outside the `i64` range.
pub(crate) fn checked_sum(lhs: Money, rhs: Money) -> ResultEngine<Money> {
    lhs.checked_add(rhs)
        .ok_or_else(|| EngineError::Validation("amount too large".to_string()))
}

/// Theme caps can be zero but never negative.
pub(crate) fn validate_budget(max_budget: Money) -> ResultEngine<()> {
    if max_budget.is_negative() {
        return Err(EngineError::Validation(
            "max budget must be >= 0".to_string(),
        ));
    }
    Ok(())
}
