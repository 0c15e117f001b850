//! The category configuration: expense types, payment types and users.

use serde::{Deserialize, Serialize};

pub const DEFAULT_EXPENSE_TYPES: &[&str] = &[
    "Groceries",
    "Transport",
    "Bills & Utilities",
    "Entertainment",
    "Healthcare",
    "Education",
    "Shopping",
    "Food & Dining",
];

pub const DEFAULT_PAYMENT_TYPES: &[&str] = &["Cash", "UPI", "Credit Card", "Debit Card"];

pub const DEFAULT_USERS: &[&str] = &["User 1", "User 2"];

/// Selects one of the three lists in `Categories`.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    ExpenseType,
    PaymentType,
    User,
}

serde_plain::derive_display_from_serialize!(CategoryKind);
serde_plain::derive_fromstr_from_deserialize!(CategoryKind);

/// The three lists held in the first three rows of the config sheet. The lists are replaced
/// wholesale on every save.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Categories {
    pub expense_types: Vec<String>,
    pub payment_types: Vec<String>,
    pub users: Vec<String>,
}

impl Default for Categories {
    fn default() -> Self {
        Self {
            expense_types: to_strings(DEFAULT_EXPENSE_TYPES),
            payment_types: to_strings(DEFAULT_PAYMENT_TYPES),
            users: to_strings(DEFAULT_USERS),
        }
    }
}

impl Categories {
    pub fn new(
        expense_types: impl IntoIterator<Item = impl Into<String>>,
        payment_types: impl IntoIterator<Item = impl Into<String>>,
        users: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            expense_types: expense_types.into_iter().map(Into::into).collect(),
            payment_types: payment_types.into_iter().map(Into::into).collect(),
            users: users.into_iter().map(Into::into).collect(),
        }
    }

    /// Builds `Categories` from the first three config rows. Any missing or empty row falls back to
    /// its built-in default list. Blank trailing cells are dropped.
    pub(crate) fn from_rows(rows: &[Vec<String>]) -> Self {
        Self::from_raw_rows(rows).or_defaults()
    }

    /// Like `from_rows` but a missing or empty row stays an empty list.
    pub(crate) fn from_raw_rows(rows: &[Vec<String>]) -> Self {
        let row = |ix: usize| -> Vec<String> {
            rows.get(ix)
                .map(|r| r.iter().filter(|s| !s.trim().is_empty()).cloned().collect())
                .unwrap_or_default()
        };
        Self {
            expense_types: row(0),
            payment_types: row(1),
            users: row(2),
        }
    }

    /// Replaces each empty list with its default.
    pub(crate) fn or_defaults(self) -> Self {
        let raw = Self::from_raw_rows(&self.to_rows());
        let defaults = Self::default();
        let pick = |values: Vec<String>, default: Vec<String>| {
            if values.is_empty() {
                default
            } else {
                values
            }
        };
        Self {
            expense_types: pick(raw.expense_types, defaults.expense_types),
            payment_types: pick(raw.payment_types, defaults.payment_types),
            users: pick(raw.users, defaults.users),
        }
    }

    /// The three list rows, in sheet order.
    pub(crate) fn to_rows(&self) -> Vec<Vec<String>> {
        vec![
            self.expense_types.clone(),
            self.payment_types.clone(),
            self.users.clone(),
        ]
    }

    /// The length of the longest list, or 1 if all lists are empty. This is the column count of
    /// the config write range.
    pub(crate) fn width(&self) -> usize {
        self.expense_types
            .len()
            .max(self.payment_types.len())
            .max(self.users.len())
            .max(1)
    }

    pub fn list(&self, kind: CategoryKind) -> &Vec<String> {
        match kind {
            CategoryKind::ExpenseType => &self.expense_types,
            CategoryKind::PaymentType => &self.payment_types,
            CategoryKind::User => &self.users,
        }
    }

    pub fn list_mut(&mut self, kind: CategoryKind) -> &mut Vec<String> {
        match kind {
            CategoryKind::ExpenseType => &mut self.expense_types,
            CategoryKind::PaymentType => &mut self.payment_types,
            CategoryKind::User => &mut self.users,
        }
    }

    /// True when all three lists are empty, which is what a never-synced cache holds.
    pub fn is_empty(&self) -> bool {
        self.expense_types.is_empty() && self.payment_types.is_empty() && self.users.is_empty()
    }
}

/// Per-user settings that override the spreadsheet's shared config. They also record which
/// spreadsheet the user was last bound to.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct UserSettings {
    pub sheet_id: String,
    pub categories: Categories,
}

/// The profile of the signed-in user.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Profile {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
