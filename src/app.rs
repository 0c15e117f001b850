//! The application state coordinator.
//!
//! `App` owns every piece of mutable application state: the in-memory view, the cache handle, the
//! token manager and the ledger. Callers get a read-only `AppView` and drive everything else
//! through the flows below, each of which leaves the view, the cache and the spreadsheet
//! consistent with one another.

use crate::api::{self, IdentityProvider, Ledger, Sheet, TokenManager};
use crate::cache::{Cache, UNNAMED_DOCUMENT};
use crate::config::extract_spreadsheet_id;
use crate::error::{BestEffort, Error, ErrorType, IntoResult, Res, Result};
use crate::model::{
    Categories, CategoryKind, Document, Expense, NewExpense, Profile, Theme, UserSettings,
};
use crate::validate::{validate_category_name, validate_expense};
use crate::{Config, Mode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The lifecycle of an `App`. `App::new` walks through every state and returns a `Ready` app.
#[derive(
    Debug, Default, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AppState {
    #[default]
    Uninitialized,
    /// Loading the last known state from the cache.
    Hydrating,
    /// Building the identity and spreadsheet clients.
    Initializing,
    Ready,
}

serde_plain::derive_display_from_serialize!(AppState);

/// A read-only snapshot of what the app knows.
#[derive(Debug, Clone, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AppView {
    pub state: AppState,
    /// A token is cached. It has not necessarily been validated.
    pub authenticated: bool,
    pub document: Option<Document>,
    pub categories: Categories,
    pub recent: Vec<Expense>,
    /// When `recent` was last fetched from the spreadsheet.
    pub recent_fetched_at: Option<DateTime<Utc>>,
    pub last_paid_by: Option<String>,
    pub theme: Theme,
    pub user: Option<Profile>,
}

/// The application state coordinator. See the module docs.
pub struct App {
    config: Config,
    cache: Cache,
    tokens: TokenManager,
    ledger: Box<dyn Ledger + Send>,
    view: AppView,
}

impl App {
    /// Hydrates from the cache and builds the clients for `mode`. A client configuration problem
    /// does not fail startup; it is reported when signing in.
    pub async fn new(config: Config, mode: Mode) -> Result<Self> {
        let cache = Cache::load(config.cache_path())
            .await
            .pub_result(ErrorType::Cache)?;
        let identity = api::identity(mode, &config);
        Ok(Self::assemble(config, cache, identity, api::sheet(mode)).await)
    }

    pub(crate) async fn assemble(
        config: Config,
        cache: Cache,
        identity: Arc<dyn IdentityProvider + Send + Sync>,
        sheet: Box<dyn Sheet + Send>,
    ) -> Self {
        let mut view = AppView {
            state: AppState::Hydrating,
            ..AppView::default()
        };
        debug!("{}", view.state);
        hydrate(&cache, &mut view).await;

        view.state = AppState::Initializing;
        debug!("{}", view.state);
        if let Some(problem) = config.startup_error() {
            warn!("Sign-in is unavailable: {problem}");
        }
        let tokens = TokenManager::new(
            identity,
            cache.clone(),
            config.startup_error().map(str::to_string),
        );
        let ledger = api::ledger(sheet, cache.clone(), tokens.clone());

        view.state = AppState::Ready;
        view.authenticated = tokens.is_authenticated().await;
        debug!("{}, authenticated: {}", view.state, view.authenticated);
        Self {
            config,
            cache,
            tokens,
            ledger,
            view,
        }
    }

    pub fn view(&self) -> &AppView {
        &self.view
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Signs in and makes the app ready to record expenses:
    /// - Run the consent flow.
    /// - If no document is bound, bind the one this user last used on this machine, or create one.
    /// - Load the categories, preferring the user's own settings.
    /// - Refresh the recent expenses. A failed refresh is the side error of the result.
    pub async fn connect(&mut self) -> Result<BestEffort<Document>> {
        self.tokens
            .authenticate()
            .await
            .pub_result(ErrorType::Auth)?;
        self.view.authenticated = true;
        self.view.user = match self.tokens.current_user().await {
            Ok(profile) => {
                info!("Signed in as {}", profile.email);
                Some(profile)
            }
            Err(e) => {
                warn!("Unable to fetch the user profile: {e:#}");
                None
            }
        };

        let document = match self.view.document.clone() {
            Some(document) => document,
            None => match self.user_binding().await {
                Some(document) => {
                    info!("Resuming {}", document.url);
                    self.bind(document).await?
                }
                None => {
                    let title = self.config.default_sheet_title().to_string();
                    self.create_sheet(Some(&title)).await?
                }
            },
        };

        self.load_config().await?;
        let recent = self.refresh_recent().await?;
        Ok(recent.map(|_| document))
    }

    /// Binds the document named by `id_or_url`, either a bare spreadsheet id or a link to it, and
    /// loads its categories if signed in.
    pub async fn connect_manual(&mut self, id_or_url: &str) -> Result<Document> {
        let id = extract_spreadsheet_id(id_or_url).pub_result(ErrorType::Validation)?;
        let name = match &self.view.document {
            Some(current) if current.id == id => current.name.clone(),
            _ => UNNAMED_DOCUMENT.to_string(),
        };
        let document = self.bind(Document::new(id, name)).await?;
        info!("Connected to {}", document.url);
        if self.view.authenticated {
            self.load_config().await?;
        } else {
            debug!("Not signed in, the categories will load after 'tracpro connect'");
        }
        Ok(document)
    }

    /// Creates a new spreadsheet, initialized with the default categories, and binds it. `None`
    /// uses the configured default title.
    pub async fn create_sheet(&mut self, title: Option<&str>) -> Result<Document> {
        let title = title.unwrap_or(self.config.default_sheet_title()).to_string();
        let document = self
            .ledger
            .create_spreadsheet(&title)
            .await
            .pub_result(ErrorType::RemoteWrite)?;
        self.view.document = Some(document.clone());
        self.view.categories = Categories::default();
        self.view.recent = Vec::new();
        self.view.recent_fetched_at = self.cache.recent_timestamp().await;
        info!("Created {}", document.url);
        if let Some(e) = self.save_user_settings().await {
            warn!("Unable to save your settings to the new spreadsheet: {e}");
        }
        Ok(document)
    }

    /// Reads the categories from the bound document, preferring the signed-in user's own settings
    /// and falling back to the shared config. Remote failures degrade to the defaults.
    pub async fn load_config(&mut self) -> Result<Categories> {
        let per_user = match self.profile().await {
            Some(profile) => match self.ledger.user_config(&profile.email).await {
                Ok(settings) => settings,
                Err(e) => {
                    debug!("Unable to read the settings of {}: {e:#}", profile.email);
                    None
                }
            },
            None => None,
        };
        let bound = self.view.document.as_ref().map(|d| d.id.as_str());
        let categories = match per_user {
            Some(settings)
                if !settings.categories.is_empty()
                    && (settings.sheet_id.is_empty() || Some(settings.sheet_id.as_str()) == bound) =>
            {
                debug!("Using the signed-in user's categories");
                let categories = settings.categories.or_defaults();
                if let Err(e) = self.cache.set_categories(&categories).await {
                    warn!("Unable to cache the categories: {e:#}");
                }
                categories
            }
            _ => self
                .ledger
                .config()
                .await
                .pub_result(ErrorType::RemoteRead)?,
        };
        self.view.categories = categories.clone();
        Ok(categories)
    }

    /// Replaces the category lists in the spreadsheet, then in memory and in the cache. Saving the
    /// same lists to the signed-in user's settings is attempted last, and its failure is reported
    /// as the side error of an otherwise successful save.
    pub async fn save_categories(&mut self, categories: Categories) -> Result<BestEffort<()>> {
        check_categories(&categories).pub_result(ErrorType::Validation)?;
        self.ledger
            .update_config(&categories)
            .await
            .pub_result(ErrorType::RemoteWrite)?;
        self.view.categories = categories;
        info!("Saved the categories");
        Ok(match self.save_user_settings().await {
            None => BestEffort::complete(()),
            Some(e) => {
                warn!("Unable to save the categories to your user settings: {e}");
                BestEffort::partial((), e)
            }
        })
    }

    /// Adds `name` to one list and saves all lists.
    pub async fn add_category(
        &mut self,
        kind: CategoryKind,
        name: &str,
    ) -> Result<BestEffort<()>> {
        let mut categories = self.view.categories.clone();
        let list = categories.list_mut(kind);
        if let Some(message) = validate_category_name(name, list).error {
            return Err(Error::msg(ErrorType::Validation, message));
        }
        list.push(name.trim().to_string());
        self.save_categories(categories).await
    }

    /// Removes `name` from one list and saves all lists.
    pub async fn remove_category(
        &mut self,
        kind: CategoryKind,
        name: &str,
    ) -> Result<BestEffort<()>> {
        let mut categories = self.view.categories.clone();
        let list = categories.list_mut(kind);
        let before = list.len();
        list.retain(|existing| existing != name.trim());
        if list.len() == before {
            return Err(Error::msg(
                ErrorType::Validation,
                format!("There is no {kind} named '{}'", name.trim()),
            ));
        }
        self.save_categories(categories).await
    }

    /// Validates and records an expense, then refreshes the recent expenses. Invalid input never
    /// reaches the spreadsheet.
    pub async fn add_expense(&mut self, expense: NewExpense) -> Result<BestEffort<Vec<Expense>>> {
        let validation = validate_expense(&expense);
        if !validation.is_valid() {
            return Err(Error::msg(ErrorType::Validation, validation.summary()));
        }
        self.ledger
            .append_expense(&expense)
            .await
            .pub_result(ErrorType::RemoteWrite)?;
        info!("Added {} for {}", expense.amount, expense.expense_type);
        self.view.last_paid_by = Some(expense.paid_by);
        self.refresh_recent().await
    }

    /// Fetches the configured number of newest expenses of the current month. If the spreadsheet
    /// cannot be read, the last known expenses are returned along with the error.
    pub async fn refresh_recent(&mut self) -> Result<BestEffort<Vec<Expense>>> {
        self.fetch_recent(self.config.recent_limit()).await
    }

    /// Like `refresh_recent` with an explicit `limit`.
    pub async fn fetch_recent(&mut self, limit: usize) -> Result<BestEffort<Vec<Expense>>> {
        match self
            .ledger
            .recent_expenses(limit)
            .await
            .pub_result(ErrorType::RemoteRead)
        {
            Ok(expenses) => {
                self.view.recent = expenses.clone();
                self.view.recent_fetched_at = self.cache.recent_timestamp().await;
                Ok(BestEffort::complete(expenses))
            }
            Err(e) if e.is(ErrorType::NotAuthenticated) || e.is(ErrorType::NoSheetConfigured) => {
                Err(e)
            }
            Err(e) => {
                warn!("Unable to refresh the recent expenses, showing cached ones: {e}");
                Ok(BestEffort::partial(self.view.recent.clone(), e))
            }
        }
    }

    /// Revokes and forgets the token. The document binding stays in the cache so that the next
    /// `connect` resumes the same spreadsheet.
    pub async fn sign_out(&mut self) -> Result<BestEffort<()>> {
        let outcome = self
            .tokens
            .sign_out()
            .await
            .pub_result(ErrorType::Cache)?;
        self.view.authenticated = false;
        self.view.document = None;
        self.view.user = None;
        Ok(outcome)
    }

    /// The profile of the signed-in user.
    pub async fn whoami(&mut self) -> Result<Profile> {
        let profile = self
            .tokens
            .current_user()
            .await
            .pub_result(ErrorType::ProfileFetch)?;
        self.view.user = Some(profile.clone());
        Ok(profile)
    }

    pub fn theme(&self) -> Theme {
        self.view.theme
    }

    pub async fn set_theme(&mut self, theme: Theme) -> Result<Theme> {
        self.cache
            .set_theme(theme)
            .await
            .pub_result(ErrorType::Cache)?;
        self.view.theme = theme;
        Ok(theme)
    }

    pub async fn toggle_theme(&mut self) -> Result<Theme> {
        self.set_theme(self.view.theme.toggled()).await
    }

    async fn bind(&mut self, document: Document) -> Result<Document> {
        self.cache
            .set_document(&document)
            .await
            .pub_result(ErrorType::Cache)?;
        self.view.document = Some(document.clone());
        Ok(document)
    }

    /// The document the signed-in user was last bound to on this machine.
    async fn user_binding(&self) -> Option<Document> {
        let email = &self.view.user.as_ref()?.email;
        let id = self.cache.user_document(email).await?;
        Some(Document::new(id, UNNAMED_DOCUMENT))
    }

    /// The signed-in user's profile, fetched if it is not known yet.
    async fn profile(&mut self) -> Option<Profile> {
        if self.view.user.is_none() && self.view.authenticated {
            match self.tokens.current_user().await {
                Ok(profile) => self.view.user = Some(profile),
                Err(e) => debug!("Unable to fetch the user profile: {e:#}"),
            }
        }
        self.view.user.clone()
    }

    /// Saves the current categories and binding to the signed-in user's settings. Returns the
    /// error instead of failing.
    async fn save_user_settings(&mut self) -> Option<Error> {
        let result: Res<()> = async {
            let profile = self.tokens.current_user().await?;
            let sheet_id = self
                .view
                .document
                .as_ref()
                .map(|d| d.id.clone())
                .unwrap_or_default();
            let settings = UserSettings {
                sheet_id,
                categories: self.view.categories.clone(),
            };
            self.ledger
                .save_user_config(&profile.email, &settings)
                .await?;
            self.view.user = Some(profile);
            Ok(())
        }
        .await;
        result.pub_result(ErrorType::RemoteWrite).err()
    }
}

/// Loads the last known state from the cache. Never fails; missing values keep their defaults.
async fn hydrate(cache: &Cache, view: &mut AppView) {
    view.document = cache.document().await;
    view.categories = cache.categories().await.or_defaults();
    view.recent = cache.recent().await;
    view.recent_fetched_at = cache.recent_timestamp().await;
    view.last_paid_by = cache.last_paid_by().await;
    view.theme = cache.theme().await;
}

/// Every list needs at least one entry, and each entry must pass the same checks as a newly added
/// name.
fn check_categories(categories: &Categories) -> Res<()> {
    for kind in [
        CategoryKind::ExpenseType,
        CategoryKind::PaymentType,
        CategoryKind::User,
    ] {
        let list = categories.list(kind);
        if list.is_empty() {
            anyhow::bail!("At least one {kind} is required");
        }
        for (ix, name) in list.iter().enumerate() {
            if let Some(message) = validate_category_name(name, &list[..ix]).error {
                anyhow::bail!("{kind} '{name}': {message}");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{TestSheet, CONFIG_SHEET};
    use crate::model::dates;
    use crate::test::{expense, TestEnv};

    #[tokio::test]
    async fn test_startup_hydrates_from_the_cache() {
        let env = TestEnv::new().await;
        let cache = env.cache();
        cache
            .set_document(&Document::new("cached-id", "Home"))
            .await
            .unwrap();
        let categories = Categories::new(["Rent"], Vec::<String>::new(), ["Asha"]);
        cache.set_categories(&categories).await.unwrap();
        cache.set_theme(Theme::Dark).await.unwrap();
        cache.set_last_paid_by("Asha").await.unwrap();

        let app = env.app().await;
        let view = app.view();
        assert_eq!(view.state, AppState::Ready);
        assert!(!view.authenticated);
        assert_eq!(view.document, Some(Document::new("cached-id", "Home")));
        assert_eq!(view.categories.expense_types, vec!["Rent"]);
        assert_eq!(view.categories.payment_types, Categories::default().payment_types);
        assert_eq!(view.theme, Theme::Dark);
        assert_eq!(view.last_paid_by.as_deref(), Some("Asha"));
    }

    #[tokio::test]
    async fn test_connect_creates_a_document_when_none_is_bound() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        let outcome = app.connect().await.unwrap();
        assert!(outcome.is_complete());
        let document = outcome.into_value();

        assert!(app.view().authenticated);
        assert_eq!(document.name, "TracPro_Expenses");
        assert_eq!(app.view().document, Some(document.clone()));
        assert_eq!(env.cache().document().await, Some(document.clone()));
        assert_eq!(app.view().categories, Categories::default());
        assert!(app.view().recent.is_empty());
        assert_eq!(
            app.view().user.as_ref().map(|u| u.email.as_str()),
            Some("tester@example.com")
        );
        assert_eq!(
            env.cache().user_document("tester@example.com").await,
            Some(document.id)
        );
    }

    #[tokio::test]
    async fn test_connect_resumes_the_bound_document() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        assert_eq!(app.connect().await.unwrap().into_value(), document);
    }

    #[tokio::test]
    async fn test_connect_reports_a_failed_refresh() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        TestSheet::update(&document.id, |s| s.fail_reads = true);
        let mut app = env.app().await;
        let outcome = app.connect().await.unwrap();
        assert_eq!(outcome.value(), &document);
        assert!(outcome.side_error().unwrap().is(ErrorType::RemoteRead));
    }

    #[tokio::test]
    async fn test_blank_user_categories_fall_back_to_the_shared_config() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let shared = Categories::new(["Rent"], ["UPI"], ["Them"]);
        let mut ledger = env.ledger();
        ledger.update_config(&shared).await.unwrap();
        let blank = UserSettings {
            sheet_id: document.id.clone(),
            categories: Categories::new(
                Vec::<String>::new(),
                Vec::<String>::new(),
                Vec::<String>::new(),
            ),
        };
        ledger
            .save_user_config("tester@example.com", &blank)
            .await
            .unwrap();

        let mut app = env.app().await;
        app.connect().await.unwrap();
        assert_eq!(app.view().categories, shared);
    }

    #[tokio::test]
    async fn test_connect_resumes_the_users_document_after_sign_out() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        let first = app.connect().await.unwrap().into_value();
        app.sign_out().await.unwrap();
        assert!(app.view().document.is_none());
        env.cache().clear_document().await.unwrap();

        let second = app.connect().await.unwrap().into_value();
        assert_eq!(second.id, first.id);
    }

    #[tokio::test]
    async fn test_connect_prefers_the_users_categories() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        app.connect().await.unwrap();
        let mine = Categories::new(["Books"], ["Cash"], ["Me"]);
        app.save_categories(mine.clone()).await.unwrap();

        // Someone else changes the shared config.
        let mut ledger = env.ledger();
        ledger
            .update_config(&Categories::new(["Rent"], ["UPI"], ["Them"]))
            .await
            .unwrap();

        let mut app = env.app().await;
        app.connect().await.unwrap();
        assert_eq!(app.view().categories, mine);
    }

    #[tokio::test]
    async fn test_connect_denied() {
        let env = TestEnv::new().await;
        env.identity().update(|s| s.deny_consent = true);
        let mut app = env.app().await;
        let err = app.connect().await.unwrap_err();
        assert!(err.is(ErrorType::Auth));
        assert!(!app.view().authenticated);
        assert!(env.cache().document().await.is_none());
    }

    #[tokio::test]
    async fn test_manual_connect_with_a_url() {
        let env = TestEnv::signed_in().await;
        let mut app = env.app().await;
        let document = app
            .connect_manual("https://docs.google.com/spreadsheets/d/ABC123/edit#gid=0")
            .await
            .unwrap();
        assert_eq!(document.id, "ABC123");
        assert_eq!(env.cache().document().await.unwrap().id, "ABC123");
        // The document does not exist, so the categories degrade to the defaults.
        assert_eq!(app.view().categories, Categories::default());
    }

    #[tokio::test]
    async fn test_manual_connect_loads_the_documents_categories() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let categories = Categories::new(["Rent"], ["Cash"], ["Asha"]);
        env.ledger().update_config(&categories).await.unwrap();
        env.cache().clear_document().await.unwrap();

        let mut app = env.app().await;
        app.connect_manual(&document.id).await.unwrap();
        assert_eq!(app.view().categories, categories);
    }

    #[tokio::test]
    async fn test_manual_connect_rejects_garbage() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        let err = app.connect_manual("not a sheet!").await.unwrap_err();
        assert!(err.is(ErrorType::Validation));
    }

    #[tokio::test]
    async fn test_save_categories_survives_a_failed_user_settings_save() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        TestSheet::update(&document.id, |s| {
            s.fail_sheet_prefix = Some(api::USER_SHEET_PREFIX.to_string())
        });

        let categories = Categories::new(["Rent", "Fuel"], ["Cash"], ["Asha"]);
        let outcome = app.save_categories(categories.clone()).await.unwrap();
        assert!(!outcome.is_complete());
        assert!(outcome.side_error().unwrap().is(ErrorType::RemoteWrite));
        assert_eq!(app.view().categories, categories);
        assert_eq!(env.cache().categories().await, categories);
        assert_eq!(env.ledger().config().await.unwrap(), categories);
    }

    #[tokio::test]
    async fn test_save_categories_failure_changes_nothing() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        TestSheet::update(&document.id, |s| s.fail_writes = true);
        let err = app
            .save_categories(Categories::new(["Rent"], ["Cash"], ["Asha"]))
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::RemoteWrite));
        assert_eq!(app.view().categories, Categories::default());
    }

    #[tokio::test]
    async fn test_save_categories_validates() {
        let env = TestEnv::signed_in().await;
        env.new_document().await;
        let mut app = env.app().await;
        let err = app
            .save_categories(Categories::new(["Rent", "Rent"], ["Cash"], ["Asha"]))
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::Validation));
        let err = app
            .save_categories(Categories::new(["Rent"], Vec::<String>::new(), ["Asha"]))
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::Validation));
    }

    #[tokio::test]
    async fn test_add_and_remove_category() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        app.load_config().await.unwrap();

        let outcome = app
            .add_category(CategoryKind::PaymentType, "  Wallet ")
            .await
            .unwrap();
        assert!(outcome.is_complete());
        assert!(app.view().categories.payment_types.contains(&"Wallet".to_string()));

        let err = app
            .add_category(CategoryKind::PaymentType, "Wallet")
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::Validation));

        app.remove_category(CategoryKind::PaymentType, "Cash")
            .await
            .unwrap();
        let state = TestSheet::state(&document.id).unwrap();
        let payments = &state.tab(CONFIG_SHEET).unwrap().rows[1];
        assert!(!payments.contains(&"Cash".to_string()));
        assert!(payments.contains(&"Wallet".to_string()));

        let err = app
            .remove_category(CategoryKind::User, "Nobody")
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::Validation));
    }

    #[tokio::test]
    async fn test_add_expense() {
        let env = TestEnv::signed_in().await;
        env.new_document().await;
        let mut app = env.app().await;
        let new = expense(&dates::current_date(), "99", Some("groceries"));
        let recent = app.add_expense(new.clone()).await.unwrap();
        assert!(recent.is_complete());
        assert_eq!(recent.value().len(), 1);
        assert!(recent.value()[0].matches(&new));
        assert_eq!(app.view().last_paid_by.as_deref(), Some("User 1"));
        assert_eq!(env.cache().recent().await, app.view().recent);
    }

    #[tokio::test]
    async fn test_invalid_expense_never_reaches_the_sheet() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        let mut new = expense(&dates::current_date(), "0", None);
        new.paid_by = String::new();
        let err = app.add_expense(new).await.unwrap_err();
        assert!(err.is(ErrorType::Validation));
        assert!(err.to_string().contains("Amount"));

        let state = TestSheet::state(&document.id).unwrap();
        let month = state.tab(&dates::month_sheet_name(dates::today())).unwrap();
        assert_eq!(month.rows.len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_falls_back_to_the_cache() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        app.add_expense(expense(&dates::current_date(), "5", None))
            .await
            .unwrap();

        TestSheet::update(&document.id, |s| s.fail_reads = true);
        let mut app = env.app().await;
        let outcome = app.refresh_recent().await.unwrap();
        assert!(outcome.side_error().unwrap().is(ErrorType::RemoteRead));
        assert_eq!(outcome.value().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_requires_sign_in() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        let err = app.refresh_recent().await.unwrap_err();
        assert!(err.is(ErrorType::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_sign_out_keeps_the_cached_binding() {
        let env = TestEnv::signed_in().await;
        let document = env.new_document().await;
        let mut app = env.app().await;
        env.identity().update(|s| s.fail_revoke = true);
        let outcome = app.sign_out().await.unwrap();
        assert!(!outcome.is_complete());
        assert!(!app.view().authenticated);
        assert!(app.view().document.is_none());
        assert!(env.cache().token().await.is_none());
        assert_eq!(env.cache().document().await, Some(document));
    }

    #[tokio::test]
    async fn test_startup_error_only_blocks_sign_in() {
        let env = TestEnv::with_client_id("your_google_client_id").await;
        env.cache()
            .set_document(&Document::new("cached-id", "Home"))
            .await
            .unwrap();
        let mut app = env.app().await;
        assert_eq!(app.view().state, AppState::Ready);
        assert!(app.view().document.is_some());
        let err = app.connect().await.unwrap_err();
        assert!(err.is(ErrorType::Auth));
    }

    #[tokio::test]
    async fn test_theme() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        assert_eq!(app.theme(), Theme::Light);
        assert_eq!(app.toggle_theme().await.unwrap(), Theme::Dark);
        assert_eq!(env.cache().theme().await, Theme::Dark);
        assert_eq!(app.set_theme(Theme::Light).await.unwrap(), Theme::Light);
    }

    #[tokio::test]
    async fn test_whoami() {
        let env = TestEnv::new().await;
        let mut app = env.app().await;
        assert!(app.whoami().await.unwrap_err().is(ErrorType::ProfileFetch));
        app.connect().await.unwrap();
        assert_eq!(app.whoami().await.unwrap().name.as_deref(), Some("Test User"));
    }

    #[test]
    fn test_check_categories() {
        assert!(check_categories(&Categories::default()).is_ok());
        assert!(check_categories(&Categories::new(["a".repeat(31)], ["Cash"], ["Me"])).is_err());
        assert!(check_categories(&Categories::new([" "], ["Cash"], ["Me"])).is_err());
    }
}
