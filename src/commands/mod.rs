//! Command handlers for the tracpro CLI.
//!
//! Each handler loads what it needs, runs one flow of the `App` and describes the outcome as an
//! `Out`.

mod auth;
mod categories;
mod expenses;
mod init;
mod sheet;
mod theme;

use crate::error::{BestEffort, Error};
use crate::model::Expense;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use auth::{connect, sign_out, whoami};
pub use categories::categories;
pub use expenses::{add, recent};
pub use init::init;
pub use sheet::{connect_sheet, create_sheet, status};
pub use theme::theme;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    /// Get the `message`.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the structured data stored in `structure`.
    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Appends the side error of a best-effort outcome, if any, to `message`.
fn with_warning<T>(message: String, outcome: &BestEffort<T>) -> String {
    match outcome.side_error() {
        Some(e) => format!("{message}\n\nWarning: {}", describe(e)),
        None => message,
    }
}

fn describe(e: &Error) -> String {
    format!("{e} ({})", e.error_type())
}

/// One expense per line, newest first.
fn expense_table(expenses: &[Expense]) -> String {
    if expenses.is_empty() {
        return "No expenses this month".to_string();
    }
    expenses
        .iter()
        .map(|e| {
            let mut line = format!(
                "{}  {:>10}  {}  {}  {}",
                e.date,
                e.amount.to_string(),
                e.expense_type,
                e.payment_type,
                e.paid_by
            );
            if !e.remarks.is_empty() {
                line.push_str(&format!("  ({})", e.remarks));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::model::Amount;
    use std::str::FromStr;

    #[test]
    fn test_expense_table() {
        assert_eq!(expense_table(&[]), "No expenses this month");
        let expense = Expense {
            date: "03-11-2025".to_string(),
            amount: Amount::from_str("42.5").unwrap(),
            expense_type: "Fuel".to_string(),
            payment_type: "Cash".to_string(),
            paid_by: "Asha".to_string(),
            remarks: "scooter".to_string(),
            timestamp: String::new(),
        };
        assert_eq!(
            expense_table(&[expense]),
            "03-11-2025        42.5  Fuel  Cash  Asha  (scooter)"
        );
    }

    #[test]
    fn test_with_warning() {
        let done = BestEffort::complete(());
        assert_eq!(with_warning("Saved".to_string(), &done), "Saved");
        let partial = BestEffort::partial((), Error::msg(ErrorType::RemoteWrite, "quota"));
        assert_eq!(
            with_warning("Saved".to_string(), &partial),
            "Saved\n\nWarning: quota (remote_write)"
        );
    }
}
