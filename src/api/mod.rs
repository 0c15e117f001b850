//! Talking to Google.
//!
//! Two traits split the remote work in layers:
//! - `Sheet` is a thin, low-level wrapper over the Google Sheets v4 API: spreadsheets, sheets,
//!   ranges and cell values. `GoogleSheet` implements it against Google and `TestSheet` keeps
//!   everything in memory.
//! - `Ledger` is the expense tracker's view of a spreadsheet: month sheets, the hidden config
//!   sheet and per-user settings. `LedgerImpl` implements it on top of any `Sheet`, and
//!   `CachedLedger` decorates a `Ledger` so that every successful result is mirrored into the
//!   local cache.
//!
//! Identity is handled by `TokenManager`, which drives an `IdentityProvider` (`GoogleIdentity` or
//! `TestIdentity`) and keeps the bearer token in the cache.

mod cached;
mod files;
mod identity;
mod ledger;
mod oauth;
mod sheet;
mod sheet_test_client;

use crate::cache::Cache;
use crate::error::Res;
use crate::model::{Categories, Document, Expense, NewExpense, UserSettings};
use crate::Config;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub(crate) use cached::CachedLedger;
pub(crate) use files::SecretFile;
pub(crate) use identity::{IdentityProvider, TestIdentity, TokenManager};
pub(crate) use ledger::LedgerImpl;
pub(crate) use oauth::GoogleIdentity;
pub(crate) use sheet::GoogleSheet;
pub(crate) use sheet_test_client::TestSheet;

/// The hidden sheet that holds the shared category configuration.
pub const CONFIG_SHEET: &str = "_config";

/// The prefix of the hidden per-user settings sheets.
pub const USER_SHEET_PREFIX: &str = "_user:";

/// The id Google gives the default sheet of a newly created spreadsheet.
pub(crate) const DEFAULT_SHEET_ID: i64 = 0;

/// OAuth scopes required for Sheets access and for reading the user's profile.
pub(crate) const OAUTH_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/userinfo.email",
    "https://www.googleapis.com/auth/userinfo.profile",
];

/// The environment variable that, when set and non-empty, replaces Google with in-memory test
/// doubles.
pub const TEST_MODE_ENV: &str = "TRACPRO_IN_TEST_MODE";

/// Whether to talk to Google or to the in-memory test doubles.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Google,
    Testing,
}

serde_plain::derive_display_from_serialize!(Mode);
serde_plain::derive_fromstr_from_deserialize!(Mode);

impl Mode {
    /// `Mode::Testing` when `TRACPRO_IN_TEST_MODE` is set to a non-empty value, otherwise
    /// `Mode::Google`.
    pub fn from_env() -> Self {
        match std::env::var(TEST_MODE_ENV) {
            Ok(value) if !value.is_empty() => Mode::Testing,
            _ => Mode::Google,
        }
    }
}

/// The properties of one sheet (tab) within a spreadsheet.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SheetProps {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) hidden: bool,
}

/// A range in A1 notation, e.g. `'November 2025'!A1:G1`, and the rows to write into it.
#[derive(Debug, Clone, Eq, PartialEq)]
pub(crate) struct SheetRange {
    pub(crate) range: String,
    pub(crate) values: Vec<Vec<String>>,
}

impl SheetRange {
    pub(crate) fn new(range: impl ToString, values: Vec<Vec<String>>) -> Self {
        Self {
            range: range.to_string(),
            values,
        }
    }
}

/// The low-level spreadsheet primitives. Every call names the spreadsheet it acts on.
#[async_trait::async_trait]
pub(crate) trait Sheet {
    /// Sets the bearer token used by subsequent requests.
    fn attach(&mut self, token: &str);

    /// Creates a new spreadsheet and returns its id.
    async fn create_spreadsheet(&mut self, title: &str) -> Res<String>;

    /// Lists the sheets of the spreadsheet, in tab order.
    async fn sheets(&mut self, spreadsheet_id: &str) -> Res<Vec<SheetProps>>;

    /// Adds a sheet and returns its sheet id. `index` is the tab position, `None` appends it.
    async fn add_sheet(
        &mut self,
        spreadsheet_id: &str,
        title: &str,
        hidden: bool,
        index: Option<usize>,
    ) -> Res<i64>;

    async fn delete_sheet(&mut self, spreadsheet_id: &str, sheet_id: i64) -> Res<()>;

    /// Makes the first `columns` cells of the first row bold.
    async fn bold_header(&mut self, spreadsheet_id: &str, sheet_id: i64, columns: usize)
        -> Res<()>;

    /// Reads the formatted values of `range`. Trailing empty rows and cells are omitted.
    async fn get(&mut self, spreadsheet_id: &str, range: &str) -> Res<Vec<Vec<String>>>;

    /// Overwrites each range with its values.
    async fn update(&mut self, spreadsheet_id: &str, data: &[SheetRange]) -> Res<()>;

    /// Appends rows after the last row of data in `range`.
    async fn append(&mut self, spreadsheet_id: &str, range: &str, rows: &[Vec<String>])
        -> Res<()>;
}

/// The expense tracker's operations on its spreadsheet. Every operation first attaches the cached
/// bearer token and fails with `ErrorType::NotAuthenticated` when there is none. Every operation
/// other than `create_spreadsheet` acts on the bound document and fails with
/// `ErrorType::NoSheetConfigured` when there is none.
#[async_trait::async_trait]
pub(crate) trait Ledger {
    /// Creates and initializes a new spreadsheet: a hidden config sheet with default categories and
    /// the current month's sheet. The new document is not bound by this call.
    async fn create_spreadsheet(&mut self, title: &str) -> Res<Document>;

    /// Creates the month sheet for `date` if it is missing and returns its name.
    async fn ensure_month_sheet_exists(&mut self, date: NaiveDate) -> Res<String>;

    /// Creates the hidden config sheet, populated with the default categories, if it is missing.
    async fn ensure_config_sheet_exists(&mut self) -> Res<()>;

    /// Appends `expense` to the sheet of the month of its date, creating the sheet if needed.
    async fn append_expense(&mut self, expense: &NewExpense) -> Res<()>;

    /// The newest `limit` expenses of the current month, newest first.
    async fn recent_expenses(&mut self, limit: usize) -> Res<Vec<Expense>>;

    /// The category configuration. Remote read failures degrade to the defaults.
    async fn config(&mut self) -> Res<Categories>;

    /// Replaces the category configuration.
    async fn update_config(&mut self, categories: &Categories) -> Res<()>;

    /// The settings saved for `email`, if any.
    async fn user_config(&mut self, email: &str) -> Res<Option<UserSettings>>;

    /// Replaces the settings saved for `email`.
    async fn save_user_config(&mut self, email: &str, settings: &UserSettings) -> Res<()>;
}

/// Builds the `Sheet` for `mode`.
pub(crate) fn sheet(mode: Mode) -> Box<dyn Sheet + Send> {
    match mode {
        Mode::Google => Box::new(GoogleSheet::new()),
        Mode::Testing => Box::new(TestSheet::new()),
    }
}

/// Builds the `IdentityProvider` for `mode`.
pub(crate) fn identity(mode: Mode, config: &Config) -> Arc<dyn IdentityProvider + Send + Sync> {
    match mode {
        Mode::Google => Arc::new(GoogleIdentity::new(config)),
        Mode::Testing => Arc::new(TestIdentity::default()),
    }
}

/// Builds the `Ledger` the app uses: a cache-mirroring ledger over `sheet`.
pub(crate) fn ledger(
    sheet: Box<dyn Sheet + Send>,
    cache: Cache,
    tokens: TokenManager,
) -> Box<dyn Ledger + Send> {
    let inner = LedgerImpl::new(sheet, cache.clone(), tokens);
    Box::new(CachedLedger::new(Box::new(inner), cache))
}
