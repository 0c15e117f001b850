//! Implements the `Ledger` trait on top of any `Sheet`.
//!
//! Layout of a TracPro spreadsheet:
//! - `_config` (hidden): row 1 expense types, row 2 payment types, row 3 users, row 4 the
//!   RFC 3339 time of the last write.
//! - `_user:<email>` (hidden, optional): the same four rows for one user, plus row 5 holding the
//!   id of the spreadsheet that user is bound to.
//! - One sheet per month, named like `November 2025`, newest first. Row 1 is a bold header, every
//!   other row is an expense.

use crate::api::{
    Ledger, Sheet, SheetRange, TokenManager, CONFIG_SHEET, DEFAULT_SHEET_ID, USER_SHEET_PREFIX,
};
use crate::cache::Cache;
use crate::error::{Error, ErrorType, Res};
use crate::model::dates::{self, month_sheet_name};
use crate::model::{
    column_letter, Categories, Cell, Document, Expense, NewExpense, Range, UserSettings,
    EXPENSE_COLUMNS, EXPENSE_HEADERS,
};
use anyhow::Context;
use chrono::{Local, NaiveDate, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{debug, info, trace, warn};

/// The widest range read from a config sheet. Lists longer than this are truncated.
const CONFIG_LAST_COLUMN: usize = 702; // ZZ

/// Characters that Google does not allow in sheet titles.
const FORBIDDEN_TITLE_CHARS: &[char] = &['[', ']', '*', '?', '/', '\\', ':'];

/// Google's limit on the length of a sheet title.
const MAX_TITLE_LEN: usize = 100;

/// Implements the `Ledger` trait for any `Sheet`. The bound document is read from the cache on
/// every call so that a binding made elsewhere takes effect immediately.
pub(crate) struct LedgerImpl {
    sheet: Box<dyn Sheet + Send>,
    cache: Cache,
    tokens: TokenManager,
}

impl LedgerImpl {
    /// Create a new `LedgerImpl` object that will use a dynamically-dispatched `sheet` to get and
    /// send its data.
    pub(crate) fn new(sheet: Box<dyn Sheet + Send>, cache: Cache, tokens: TokenManager) -> Self {
        Self {
            sheet,
            cache,
            tokens,
        }
    }

    async fn attach(&mut self) -> Res<()> {
        if !self.tokens.ensure_attached(self.sheet.as_mut()).await {
            return Err(Error::msg(
                ErrorType::NotAuthenticated,
                "Not signed in, run 'tracpro connect' first",
            )
            .into());
        }
        Ok(())
    }

    /// Attaches the token and returns the id of the bound document.
    async fn prepare(&mut self) -> Res<String> {
        self.attach().await?;
        match self.cache.document().await {
            Some(document) => Ok(document.id),
            None => Err(Error::msg(
                ErrorType::NoSheetConfigured,
                "No spreadsheet is connected, run 'tracpro connect' or 'tracpro connect-sheet'",
            )
            .into()),
        }
    }
}

#[async_trait::async_trait]
impl Ledger for LedgerImpl {
    async fn create_spreadsheet(&mut self, title: &str) -> Res<Document> {
        self.attach().await?;
        let id = self.sheet.create_spreadsheet(title).await?;
        info!("Created spreadsheet '{title}' ({id})");

        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        let sheet = self.sheet.as_mut();
        ensure_config_sheet(sheet, &id).await?;
        ensure_month_sheet(sheet, &id, dates::today()).await?;
        if let Err(e) = sheet.delete_sheet(&id, DEFAULT_SHEET_ID).await {
            warn!("Unable to delete the default sheet of the new spreadsheet: {e:#}");
        }
        Ok(Document::new(id, title))
    }

    async fn ensure_month_sheet_exists(&mut self, date: NaiveDate) -> Res<String> {
        let id = self.prepare().await?;
        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        ensure_month_sheet(self.sheet.as_mut(), &id, date).await
    }

    async fn ensure_config_sheet_exists(&mut self) -> Res<()> {
        let id = self.prepare().await?;
        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        ensure_config_sheet(self.sheet.as_mut(), &id).await
    }

    async fn append_expense(&mut self, expense: &NewExpense) -> Res<()> {
        let date = expense
            .parsed_date()
            .map_err(|e| Error::new(ErrorType::Validation, e))?;
        let id = self.prepare().await?;
        let row = expense.to_row(&dates::format_timestamp(&Local::now()));

        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        let sheet = self.sheet.as_mut();
        let month = ensure_month_sheet(sheet, &id, date).await?;
        let range = Range::columns(&month, EXPENSE_COLUMNS).to_string();
        trace!("appending to {range}");
        sheet
            .append(&id, &range, &[row])
            .await
            .with_context(|| format!("Unable to add the expense to '{month}'"))?;
        debug!("Appended an expense dated {} to '{month}'", expense.date);
        Ok(())
    }

    async fn recent_expenses(&mut self, limit: usize) -> Res<Vec<Expense>> {
        let id = self.prepare().await?;
        let month = month_sheet_name(dates::today());
        let exists = self
            .sheet
            .sheets(&id)
            .await?
            .iter()
            .any(|s| s.title == month);
        if !exists {
            debug!("There is no sheet for {month} yet");
            return Ok(Vec::new());
        }

        let range = Range::rows_from(&month, 2, EXPENSE_COLUMNS).to_string();
        let rows = self
            .sheet
            .get(&id, &range)
            .await
            .with_context(|| format!("Unable to read the expenses in '{month}'"))?;
        let mut expenses: Vec<Expense> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|c| !c.trim().is_empty()))
            .filter_map(|(ix, row)| match Expense::from_row(row) {
                Ok(expense) => Some(expense),
                Err(e) => {
                    warn!("Skipping row {} of '{month}': {e:#}", ix + 2);
                    None
                }
            })
            .collect();
        expenses.reverse();
        expenses.truncate(limit);
        Ok(expenses)
    }

    async fn config(&mut self) -> Res<Categories> {
        let id = self.prepare().await?;
        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        let sheet = self.sheet.as_mut();
        let rows = async {
            ensure_config_sheet(sheet, &id).await?;
            read_config_rows(sheet, &id, CONFIG_SHEET, 3).await
        }
        .await;
        match rows {
            Ok(rows) => Ok(Categories::from_rows(&rows)),
            Err(e) => {
                warn!("Unable to read the category configuration, using defaults: {e:#}");
                Ok(Categories::default())
            }
        }
    }

    async fn update_config(&mut self, categories: &Categories) -> Res<()> {
        let id = self.prepare().await?;
        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        let sheet = self.sheet.as_mut();
        ensure_config_sheet(sheet, &id).await?;
        write_config_rows(sheet, &id, CONFIG_SHEET, categories, None).await?;
        debug!("Saved the category configuration");
        Ok(())
    }

    async fn user_config(&mut self, email: &str) -> Res<Option<UserSettings>> {
        let id = self.prepare().await?;
        let title = user_sheet_name(email);
        let exists = self
            .sheet
            .sheets(&id)
            .await?
            .iter()
            .any(|s| s.title == title);
        if !exists {
            return Ok(None);
        }
        let rows = read_config_rows(self.sheet.as_mut(), &id, &title, 5).await?;
        let sheet_id = rows
            .get(4)
            .and_then(|r| r.first())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let categories = Categories::from_raw_rows(&rows[..rows.len().min(3)]);
        Ok(Some(UserSettings {
            sheet_id,
            categories,
        }))
    }

    async fn save_user_config(&mut self, email: &str, settings: &UserSettings) -> Res<()> {
        let id = self.prepare().await?;
        let title = user_sheet_name(email);
        let lock = document_lock(&id);
        let _guard = lock.lock().await;
        let sheet = self.sheet.as_mut();
        ensure_sheet(sheet, &id, &title, true, None, None).await?;
        write_config_rows(
            sheet,
            &id,
            &title,
            &settings.categories,
            Some(&settings.sheet_id),
        )
        .await?;
        debug!("Saved the settings of {email}");
        Ok(())
    }
}

/// The name of the hidden sheet that holds the settings of `email`.
pub(crate) fn user_sheet_name(email: &str) -> String {
    let cleaned: String = email
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if FORBIDDEN_TITLE_CHARS.contains(&c) { '_' } else { c })
        .collect();
    format!("{USER_SHEET_PREFIX}{cleaned}")
        .chars()
        .take(MAX_TITLE_LEN)
        .collect()
}

/// One async mutex per spreadsheet id, shared by every `LedgerImpl` in the process. Held across
/// each check-then-create sequence so that no two of them interleave on the same document.
fn document_lock(spreadsheet_id: &str) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>> = OnceLock::new();
    let locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new()));
    let mut locks = match locks.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    locks
        .entry(spreadsheet_id.to_string())
        .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
        .clone()
}

/// Creates sheet `title` if the spreadsheet has no sheet by that name. When `header` is given it
/// is written to row 1 in bold. Returns true if the sheet was created.
async fn ensure_sheet(
    sheet: &mut (dyn Sheet + Send),
    id: &str,
    title: &str,
    hidden: bool,
    index: Option<usize>,
    header: Option<&[&str]>,
) -> Res<bool> {
    if sheet.sheets(id).await?.iter().any(|s| s.title == title) {
        return Ok(false);
    }
    let sheet_id = sheet
        .add_sheet(id, title, hidden, index)
        .await
        .with_context(|| format!("Unable to create the sheet '{title}'"))?;
    if let Some(header) = header {
        let range = Range::rect(title, Cell::new(1, 1), Cell::new(header.len(), 1));
        let values = vec![header.iter().map(|h| h.to_string()).collect()];
        sheet.update(id, &[SheetRange::new(range, values)]).await?;
        sheet.bold_header(id, sheet_id, header.len()).await?;
    }
    info!("Created the sheet '{title}'");
    Ok(true)
}

/// Creates the month sheet for `date`, with its header, as the first tab if it is missing.
async fn ensure_month_sheet(
    sheet: &mut (dyn Sheet + Send),
    id: &str,
    date: NaiveDate,
) -> Res<String> {
    let month = month_sheet_name(date);
    ensure_sheet(sheet, id, &month, false, Some(0), Some(&EXPENSE_HEADERS)).await?;
    Ok(month)
}

/// Creates the hidden config sheet, holding the default categories, if it is missing.
async fn ensure_config_sheet(sheet: &mut (dyn Sheet + Send), id: &str) -> Res<()> {
    if ensure_sheet(sheet, id, CONFIG_SHEET, true, None, None).await? {
        write_config_rows(sheet, id, CONFIG_SHEET, &Categories::default(), None).await?;
    }
    Ok(())
}

/// Reads the first `rows` rows of a config-shaped sheet.
async fn read_config_rows(
    sheet: &mut (dyn Sheet + Send),
    id: &str,
    title: &str,
    rows: usize,
) -> Res<Vec<Vec<String>>> {
    let range = Range::rect(title, Cell::new(1, 1), Cell::new(CONFIG_LAST_COLUMN, rows));
    sheet
        .get(id, &range.to_string())
        .await
        .with_context(|| format!("Unable to read '{title}'"))
}

/// Replaces rows 1-3 of a config-shaped sheet with `categories`, stamps row 4 and, if given, writes
/// `sheet_id` to row 5. All of it goes out in one update, with rows 1-3 padded by blank cells to
/// the width of the old rows so that a shorter list leaves no stale cells. A failed write leaves
/// the old rows in place.
async fn write_config_rows(
    sheet: &mut (dyn Sheet + Send),
    id: &str,
    title: &str,
    categories: &Categories,
    sheet_id: Option<&str>,
) -> Res<()> {
    let old = read_config_rows(sheet, id, title, 3).await?;
    let width = old
        .iter()
        .map(Vec::len)
        .max()
        .unwrap_or(0)
        .max(categories.width());

    let mut values = categories.to_rows();
    for row in &mut values {
        row.resize(width, String::new());
    }
    values.push(vec![Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)]);
    if let Some(sheet_id) = sheet_id {
        values.push(vec![sheet_id.to_string()]);
    }
    let range = Range::rect(title, Cell::new(1, 1), Cell::new(width, values.len()));
    trace!("writing {range}");
    sheet
        .update(id, &[SheetRange::new(range, values)])
        .await
        .with_context(|| format!("Unable to write '{title}' ({})", column_letter(width)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::TestSheet;
    use crate::error::IntoResult;
    use crate::test::{expense, TestEnv};

    #[test]
    fn test_user_sheet_name() {
        assert_eq!(user_sheet_name("A@B.com"), "_user:a@b.com");
        assert_eq!(user_sheet_name("x[1]*?/\\:y@z"), "_user:x_1______y@z");
        assert_eq!(user_sheet_name(&"a".repeat(200)).chars().count(), MAX_TITLE_LEN);
    }

    #[tokio::test]
    async fn test_create_spreadsheet_layout() {
        let env = TestEnv::signed_in().await;
        let mut ledger = env.ledger();
        let document = ledger.create_spreadsheet("Household").await.unwrap();
        assert_eq!(document.name, "Household");
        assert_eq!(
            document.url,
            format!("https://docs.google.com/spreadsheets/d/{}", document.id)
        );

        let state = TestSheet::state(&document.id).unwrap();
        assert_eq!(state.title, "Household");
        let titles: Vec<&str> = state.tabs.iter().map(|t| t.title.as_str()).collect();
        let month = month_sheet_name(dates::today());
        assert_eq!(titles, vec![month.as_str(), CONFIG_SHEET]);

        let config = state.tab(CONFIG_SHEET).unwrap();
        assert!(config.hidden);
        assert_eq!(config.rows.len(), 4);
        assert_eq!(config.rows[1], vec!["Cash", "UPI", "Credit Card", "Debit Card"]);
        assert!(chrono::DateTime::parse_from_rfc3339(&config.rows[3][0]).is_ok());

        let month_tab = state.tab(&month).unwrap();
        assert!(!month_tab.hidden);
        assert_eq!(month_tab.rows, vec![EXPENSE_HEADERS.map(String::from).to_vec()]);
        assert_eq!(month_tab.bold_columns, EXPENSE_COLUMNS);
    }

    #[tokio::test]
    async fn test_requires_sign_in() {
        let env = TestEnv::new().await;
        let mut ledger = env.ledger();
        let err = ledger
            .create_spreadsheet("Nope")
            .await
            .pub_result(ErrorType::RemoteWrite)
            .unwrap_err();
        assert!(err.is(ErrorType::NotAuthenticated));
        let err = ledger
            .recent_expenses(5)
            .await
            .pub_result(ErrorType::RemoteRead)
            .unwrap_err();
        assert!(err.is(ErrorType::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_requires_a_document() {
        let env = TestEnv::signed_in().await;
        let mut ledger = env.ledger();
        let err = ledger
            .append_expense(&expense(&dates::current_date(), "10", None))
            .await
            .pub_result(ErrorType::RemoteWrite)
            .unwrap_err();
        assert!(err.is(ErrorType::NoSheetConfigured));
        let err = ledger
            .config()
            .await
            .pub_result(ErrorType::RemoteRead)
            .unwrap_err();
        assert!(err.is(ErrorType::NoSheetConfigured));
    }

    #[tokio::test]
    async fn test_append_then_recent_round_trips() {
        let env = TestEnv::signed_in().await;
        env.new_document().await;
        let mut ledger = env.ledger();

        let new = expense(&dates::current_date(), "249.50", None);
        ledger.append_expense(&new).await.unwrap();

        let recent = ledger.recent_expenses(1).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert!(recent[0].matches(&new));
        assert_eq!(recent[0].remarks, "");
        assert!(!recent[0].timestamp.is_empty());
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let env = TestEnv::signed_in().await;
        env.new_document().await;
        let mut ledger = env.ledger();
        let today = dates::current_date();
        for amount in ["1", "2", "3"] {
            ledger
                .append_expense(&expense(&today, amount, None))
                .await
                .unwrap();
        }
        let amounts: Vec<String> = ledger
            .recent_expenses(3)
            .await
            .unwrap()
            .iter()
            .map(|e| e.amount.to_string())
            .collect();
        assert_eq!(amounts, vec!["3", "2", "1"]);
    }

    #[tokio::test]
    async fn test_recent_truncates() {
        let env = TestEnv::signed_in().await;
        env.new_document().await;
        let mut ledger = env.ledger();
        let today = dates::current_date();
        for amount in ["1", "2", "3", "4", "5"] {
            ledger
                .append_expense(&expense(&today, amount, Some("r")))
                .await
                .unwrap();
        }
        let recent = ledger.recent_expenses(2).await.unwrap();
        let amounts: Vec<String> = recent.iter().map(|e| e.amount.to_string()).collect();
        assert_eq!(amounts, vec!["5", "4"]);
    }

    #[tokio::test]
    async fn test_append_goes_to_the_month_of_the_expense() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        ledger
            .append_expense(&expense("15-01-2020", "7", None))
            .await
            .unwrap();

        let state = TestSheet::state(&document.id).unwrap();
        assert_eq!(state.tabs[0].title, "January 2020");
        let january = state.tab("January 2020").unwrap();
        assert_eq!(january.rows.len(), 2);
        assert_eq!(january.rows[1][0], "15-01-2020");

        // The current month is unaffected.
        assert!(ledger.recent_expenses(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_without_a_month_sheet_is_empty() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let month = month_sheet_name(dates::today());
        TestSheet::update(&document.id, |s| s.remove_tab(&month));
        let mut ledger = env.ledger();
        assert!(ledger.recent_expenses(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_skips_malformed_rows() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        let today = dates::current_date();
        ledger
            .append_expense(&expense(&today, "10", None))
            .await
            .unwrap();
        let month = month_sheet_name(dates::today());
        TestSheet::update(&document.id, |s| {
            if let Some(tab) = s.tabs.iter_mut().find(|t| t.title == month) {
                tab.rows.push(vec![today.clone(), "lots".to_string()]);
                tab.rows.push(Vec::new());
            }
        });
        ledger
            .append_expense(&expense(&today, "20", None))
            .await
            .unwrap();
        let amounts: Vec<String> = ledger
            .recent_expenses(10)
            .await
            .unwrap()
            .iter()
            .map(|e| e.amount.to_string())
            .collect();
        assert_eq!(amounts, vec!["20", "10"]);
    }

    #[tokio::test]
    async fn test_recent_read_failure_propagates() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        TestSheet::update(&document.id, |s| s.fail_reads = true);
        assert!(env.ledger().recent_expenses(10).await.is_err());
    }

    #[tokio::test]
    async fn test_config_round_trip_and_shrink() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        assert_eq!(ledger.config().await.unwrap(), Categories::default());

        let long = Categories::new(
            ["Rent", "Fuel", "Food", "Fun", "Gifts"],
            ["Cash"],
            ["Asha", "Ravi"],
        );
        ledger.update_config(&long).await.unwrap();
        assert_eq!(ledger.config().await.unwrap(), long);

        let short = Categories::new(["Rent"], ["Cash", "UPI"], ["Asha"]);
        ledger.update_config(&short).await.unwrap();
        assert_eq!(ledger.config().await.unwrap(), short);

        let state = TestSheet::state(&document.id).unwrap();
        let config = state.tab(CONFIG_SHEET).unwrap();
        assert!(config.rows[0][1..].iter().all(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_config_after_config_sheet_deleted_is_default() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        ledger
            .update_config(&Categories::new(["Rent"], ["Cash"], ["Asha"]))
            .await
            .unwrap();
        TestSheet::update(&document.id, |s| s.remove_tab(CONFIG_SHEET));

        assert_eq!(ledger.config().await.unwrap(), Categories::default());
        let state = TestSheet::state(&document.id).unwrap();
        assert!(state.tab(CONFIG_SHEET).unwrap().hidden);
    }

    #[tokio::test]
    async fn test_config_read_failure_degrades_to_defaults() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        ledger
            .update_config(&Categories::new(["Rent"], ["Cash"], ["Asha"]))
            .await
            .unwrap();
        TestSheet::update(&document.id, |s| s.fail_reads = true);
        assert_eq!(ledger.config().await.unwrap(), Categories::default());
    }

    #[tokio::test]
    async fn test_config_write_failure_propagates() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        TestSheet::update(&document.id, |s| s.fail_writes = true);
        assert!(env
            .ledger()
            .update_config(&Categories::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_failed_config_write_keeps_the_saved_config() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        let saved = Categories::new(["Rent", "Fuel"], ["Cash"], ["Asha"]);
        ledger.update_config(&saved).await.unwrap();

        TestSheet::update(&document.id, |s| s.fail_updates = true);
        assert!(ledger
            .update_config(&Categories::new(["Food"], ["UPI"], ["Ravi"]))
            .await
            .is_err());
        TestSheet::update(&document.id, |s| s.fail_updates = false);
        assert_eq!(ledger.config().await.unwrap(), saved);
    }

    #[tokio::test]
    async fn test_failed_user_config_write_keeps_the_saved_settings() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        let saved = UserSettings {
            sheet_id: document.id.clone(),
            categories: Categories::new(["Rent", "Fuel"], ["Cash"], ["Asha"]),
        };
        ledger.save_user_config("me@example.com", &saved).await.unwrap();

        TestSheet::update(&document.id, |s| s.fail_updates = true);
        let changed = UserSettings {
            sheet_id: "elsewhere".to_string(),
            categories: Categories::new(["Food"], ["UPI"], ["Ravi"]),
        };
        assert!(ledger
            .save_user_config("me@example.com", &changed)
            .await
            .is_err());
        TestSheet::update(&document.id, |s| s.fail_updates = false);
        assert_eq!(
            ledger.user_config("me@example.com").await.unwrap(),
            Some(saved)
        );
    }

    #[tokio::test]
    async fn test_blank_user_config_has_empty_lists() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        let empty = Categories::new(
            Vec::<String>::new(),
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        let settings = UserSettings {
            sheet_id: document.id.clone(),
            categories: empty,
        };
        ledger
            .save_user_config("me@example.com", &settings)
            .await
            .unwrap();
        let loaded = ledger.user_config("me@example.com").await.unwrap().unwrap();
        assert!(loaded.categories.is_empty());
        assert_eq!(loaded.sheet_id, document.id);
    }

    #[tokio::test]
    async fn test_user_config() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut ledger = env.ledger();
        assert!(ledger.user_config("me@example.com").await.unwrap().is_none());

        let settings = UserSettings {
            sheet_id: document.id.clone(),
            categories: Categories::new(["Rent", "Fuel"], ["UPI"], ["Me"]),
        };
        ledger
            .save_user_config("me@example.com", &settings)
            .await
            .unwrap();
        assert_eq!(
            ledger.user_config("Me@Example.com").await.unwrap(),
            Some(settings)
        );

        let state = TestSheet::state(&document.id).unwrap();
        assert!(state.tab("_user:me@example.com").unwrap().hidden);
        // The shared config is untouched.
        assert_eq!(ledger.config().await.unwrap(), Categories::default());
    }

    #[tokio::test]
    async fn test_concurrent_ensure_creates_one_sheet() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut a = env.ledger();
        let mut b = env.ledger();
        let date = NaiveDate::from_ymd_opt(2021, 6, 1).unwrap();

        let (ra, rb) = tokio::join!(
            a.ensure_month_sheet_exists(date),
            b.ensure_month_sheet_exists(date)
        );
        assert_eq!(ra.unwrap(), "June 2021");
        assert_eq!(rb.unwrap(), "June 2021");

        let state = TestSheet::state(&document.id).unwrap();
        let count = state.tabs.iter().filter(|t| t.title == "June 2021").count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_ensure_repairs_missing_pieces() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        TestSheet::update(&document.id, |s| s.remove_tab(CONFIG_SHEET));
        let mut ledger = env.ledger();
        ledger.ensure_config_sheet_exists().await.unwrap();
        ledger.ensure_config_sheet_exists().await.unwrap();
        let state = TestSheet::state(&document.id).unwrap();
        assert_eq!(
            state.tabs.iter().filter(|t| t.title == CONFIG_SHEET).count(),
            1
        );
        assert_eq!(state.tab(CONFIG_SHEET).unwrap().rows.len(), 4);
    }
}
