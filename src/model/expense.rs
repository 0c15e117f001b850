//! Expense rows as stored in a month sheet.

use crate::model::dates;
use crate::model::Amount;
use anyhow::{bail, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The header row of every month sheet.
pub const EXPENSE_HEADERS: [&str; 7] = [
    "Date",
    "Amount",
    "Expense Type",
    "Payment Type",
    "Paid By",
    "Remarks",
    "Timestamp",
];

/// The number of columns in a month sheet.
pub const EXPENSE_COLUMNS: usize = EXPENSE_HEADERS.len();

/// An expense as submitted by the user, before it has been written. The validation layer checks
/// these fields, so none of them are guaranteed to be well-formed.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct NewExpense {
    /// `DD-MM-YYYY`
    pub date: String,
    pub amount: Amount,
    pub expense_type: String,
    pub payment_type: String,
    pub paid_by: String,
    pub remarks: Option<String>,
}

impl NewExpense {
    /// Parses `date`. The month of this date selects the sheet the expense is appended to.
    pub fn parsed_date(&self) -> anyhow::Result<NaiveDate> {
        dates::parse_date(&self.date)
    }

    /// Serializes the expense into a sheet row, stamping it with `timestamp`.
    pub(crate) fn to_row(&self, timestamp: &str) -> Vec<String> {
        vec![
            self.date.clone(),
            self.amount.to_string(),
            self.expense_type.clone(),
            self.payment_type.clone(),
            self.paid_by.clone(),
            self.remarks.clone().unwrap_or_default(),
            timestamp.to_string(),
        ]
    }
}

/// An expense that has been read back from a month sheet.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    pub date: String,
    pub amount: Amount,
    pub expense_type: String,
    pub payment_type: String,
    pub paid_by: String,
    pub remarks: String,
    pub timestamp: String,
}

impl Expense {
    /// Parses one data row. The Sheets API drops trailing empty cells, so short rows are padded
    /// with empty strings. A row whose amount does not parse is an error.
    pub(crate) fn from_row<S: AsRef<str>>(row: &[S]) -> anyhow::Result<Self> {
        if row.len() > EXPENSE_COLUMNS {
            bail!(
                "Expected at most {EXPENSE_COLUMNS} columns but the row has {}",
                row.len()
            );
        }
        let cell = |ix: usize| {
            row.get(ix)
                .map(|s| s.as_ref().to_string())
                .unwrap_or_default()
        };
        let raw_amount = cell(1);
        let amount = Amount::from_str(&raw_amount)
            .with_context(|| format!("Bad amount in expense dated '{}'", cell(0)))?;
        Ok(Self {
            date: cell(0),
            amount,
            expense_type: cell(2),
            payment_type: cell(3),
            paid_by: cell(4),
            remarks: cell(5),
            timestamp: cell(6),
        })
    }

    /// True when this record holds what was submitted in `new`, ignoring the generated timestamp.
    pub fn matches(&self, new: &NewExpense) -> bool {
        self.date == new.date
            && self.amount == new.amount
            && self.expense_type == new.expense_type
            && self.payment_type == new.payment_type
            && self.paid_by == new.paid_by
            && self.remarks == new.remarks.clone().unwrap_or_default()
    }
}
