//! Types that represent the core data model, such as `Expense` and `Categories`.
mod amount;
mod categories;
pub mod dates;
mod expense;
mod range;

pub use amount::{Amount, AmountError};
pub use categories::{
    Categories, CategoryKind, Profile, UserSettings, DEFAULT_EXPENSE_TYPES, DEFAULT_PAYMENT_TYPES,
    DEFAULT_USERS,
};
pub use expense::{Expense, NewExpense, EXPENSE_COLUMNS, EXPENSE_HEADERS};
pub use range::{column_letter, column_number, quote_sheet_name, Cell, Range};

use serde::{Deserialize, Serialize};

const DOCUMENT_URL_PREFIX: &str = "https://docs.google.com/spreadsheets/d/";

/// The display theme preference.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

serde_plain::derive_display_from_serialize!(Theme);
serde_plain::derive_fromstr_from_deserialize!(Theme);

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// A spreadsheet that the app can be bound to.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Document {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl Document {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let url = format!("{DOCUMENT_URL_PREFIX}{id}");
        Self {
            id,
            name: name.into(),
            url,
        }
    }
}
