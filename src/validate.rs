//! Pre-flight validation of user input. Nothing in this module performs I/O, and the coordinator
//! runs these checks before any remote call is attempted.

use crate::model::{dates, Amount, NewExpense};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Category names longer than this are rejected.
pub const MAX_CATEGORY_NAME_LEN: usize = 30;

/// Remarks longer than this are rejected.
pub const MAX_REMARKS_LEN: usize = 200;

/// The fields of an expense that can fail validation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    Date,
    Amount,
    ExpenseType,
    PaymentType,
    PaidBy,
    Remarks,
}

serde_plain::derive_display_from_serialize!(Field);

/// The outcome of validating an expense: one message per failing field.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ExpenseValidation {
    pub errors: BTreeMap<Field, String>,
}

impl ExpenseValidation {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// All messages on one line, e.g. for an error message.
    pub fn summary(&self) -> String {
        self.errors
            .iter()
            .map(|(field, message)| format!("{field}: {message}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// The outcome of validating a single name.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NameValidation {
    pub error: Option<String>,
}

impl NameValidation {
    fn ok() -> Self {
        Self { error: None }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// Checks that an expense is complete: date, a positive amount, expense type, payment type and
/// payer are all required.
pub fn validate_expense(expense: &NewExpense) -> ExpenseValidation {
    let mut errors = BTreeMap::new();

    if expense.date.trim().is_empty() {
        errors.insert(Field::Date, "Date is required".to_string());
    } else if dates::parse_date(&expense.date).is_err() {
        errors.insert(
            Field::Date,
            "Date must be in DD-MM-YYYY format".to_string(),
        );
    }

    if !expense.amount.is_positive() {
        errors.insert(
            Field::Amount,
            "Amount must be greater than 0".to_string(),
        );
    }

    if expense.expense_type.is_empty() {
        errors.insert(Field::ExpenseType, "Expense type is required".to_string());
    }

    if expense.payment_type.is_empty() {
        errors.insert(Field::PaymentType, "Payment type is required".to_string());
    }

    if expense.paid_by.is_empty() {
        errors.insert(Field::PaidBy, "Paid by is required".to_string());
    }

    if let Some(remarks) = &expense.remarks {
        if remarks.chars().count() > MAX_REMARKS_LEN {
            errors.insert(
                Field::Remarks,
                format!("Remarks must be {MAX_REMARKS_LEN} characters or less"),
            );
        }
    }

    ExpenseValidation { errors }
}

/// Checks a new category, payment type or user name against the existing entries of its list.
///
/// The length limit applies to `name` as given. The duplicate check compares the trimmed `name`
/// against the existing entries exactly as stored, so `" Cash"` is a duplicate of `"Cash"` but
/// `"Cash"` is not a duplicate of a stored `"Cash "`.
pub fn validate_category_name<S: AsRef<str>>(name: &str, existing: &[S]) -> NameValidation {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return NameValidation::err("Name cannot be empty");
    }

    if name.chars().count() > MAX_CATEGORY_NAME_LEN {
        return NameValidation::err(format!(
            "Name must be {MAX_CATEGORY_NAME_LEN} characters or less"
        ));
    }

    if existing.iter().any(|e| e.as_ref() == trimmed) {
        return NameValidation::err("This name already exists");
    }

    NameValidation::ok()
}

/// True if `amount` parses as a number greater than zero.
pub fn validate_amount(amount: &str) -> bool {
    Amount::from_str(amount)
        .map(|a| a.is_positive())
        .unwrap_or(false)
}

/// Checks that a required text field is not blank.
pub fn validate_required(value: &str, field_name: &str) -> NameValidation {
    if value.trim().is_empty() {
        NameValidation::err(format!("{field_name} is required"))
    } else {
        NameValidation::ok()
    }
}
