//! A `Ledger` decorator that mirrors every successful remote result into the local cache.

use crate::api::Ledger;
use crate::cache::Cache;
use crate::error::Res;
use crate::model::{Categories, Document, Expense, NewExpense, UserSettings};
use anyhow::Context;
use chrono::NaiveDate;
use tracing::{debug, warn};

/// Wraps a `Ledger` and writes its results through to the `Cache` in the same call. A failure to
/// update a mirrored value is logged and otherwise ignored, but a failure to record a document
/// binding is an error because later calls depend on it.
pub(crate) struct CachedLedger {
    inner: Box<dyn Ledger + Send>,
    cache: Cache,
}

impl CachedLedger {
    pub(crate) fn new(inner: Box<dyn Ledger + Send>, cache: Cache) -> Self {
        Self { inner, cache }
    }
}

fn log_mirror_failure(what: &str, result: Res<()>) {
    if let Err(e) = result {
        warn!("Unable to cache the {what}: {e:#}");
    }
}

#[async_trait::async_trait]
impl Ledger for CachedLedger {
    /// Creates the spreadsheet and binds it.
    async fn create_spreadsheet(&mut self, title: &str) -> Res<Document> {
        let document = self.inner.create_spreadsheet(title).await?;
        self.cache
            .set_document(&document)
            .await
            .context("Unable to remember the new spreadsheet")?;
        log_mirror_failure(
            "categories",
            self.cache.set_categories(&Categories::default()).await,
        );
        log_mirror_failure("recent expenses", self.cache.set_recent(&[]).await);
        debug!("Bound {}", document.url);
        Ok(document)
    }

    async fn ensure_month_sheet_exists(&mut self, date: NaiveDate) -> Res<String> {
        self.inner.ensure_month_sheet_exists(date).await
    }

    async fn ensure_config_sheet_exists(&mut self) -> Res<()> {
        self.inner.ensure_config_sheet_exists().await
    }

    async fn append_expense(&mut self, expense: &NewExpense) -> Res<()> {
        self.inner.append_expense(expense).await?;
        log_mirror_failure(
            "last payer",
            self.cache.set_last_paid_by(&expense.paid_by).await,
        );
        Ok(())
    }

    async fn recent_expenses(&mut self, limit: usize) -> Res<Vec<Expense>> {
        let expenses = self.inner.recent_expenses(limit).await?;
        log_mirror_failure("recent expenses", self.cache.set_recent(&expenses).await);
        Ok(expenses)
    }

    async fn config(&mut self) -> Res<Categories> {
        let categories = self.inner.config().await?;
        log_mirror_failure("categories", self.cache.set_categories(&categories).await);
        Ok(categories)
    }

    async fn update_config(&mut self, categories: &Categories) -> Res<()> {
        self.inner.update_config(categories).await?;
        log_mirror_failure("categories", self.cache.set_categories(categories).await);
        Ok(())
    }

    async fn user_config(&mut self, email: &str) -> Res<Option<UserSettings>> {
        self.inner.user_config(email).await
    }

    /// Saves the settings and records the user's document binding locally.
    async fn save_user_config(&mut self, email: &str, settings: &UserSettings) -> Res<()> {
        self.inner.save_user_config(email, settings).await?;
        if !settings.sheet_id.is_empty() {
            self.cache
                .set_user_document(email, &settings.sheet_id)
                .await
                .context("Unable to remember the user's spreadsheet")?;
        }
        Ok(())
    }
}
