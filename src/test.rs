//! Shared test utilities for creating test environments.
//!
//! This module is only compiled when running tests (`#[cfg(test)]`).

use crate::api::{self, CachedLedger, Ledger, LedgerImpl, TestIdentity, TestSheet, TokenManager};
use crate::app::App;
use crate::cache::Cache;
use crate::model::{Amount, Document, NewExpense};
use crate::Config;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

/// A throwaway tracpro home directory with a Config, a cache and an in-memory identity provider.
/// Holds TempDir to keep the directory alive for the duration of the test. Spreadsheets created
/// through the environment live in the process-wide `TestSheet` registry.
pub(crate) struct TestEnv {
    _temp_dir: TempDir,
    config: Config,
    cache: Cache,
    identity: TestIdentity,
    tokens: TokenManager,
}

impl TestEnv {
    /// Creates a test environment that is not signed in.
    pub(crate) async fn new() -> Self {
        Self::with_client_id("test-client-id.apps.googleusercontent.com").await
    }

    /// Creates a test environment whose client secret carries `client_id`.
    pub(crate) async fn with_client_id(client_id: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("tracpro");
        let secret_path = temp_dir.path().join("client_secret.json");
        write_client_secret(&secret_path, client_id);

        let config = Config::create(&root, &secret_path).await.unwrap();
        let cache = Cache::load(config.cache_path()).await.unwrap();
        let identity = TestIdentity::default();
        let tokens = TokenManager::new(
            Arc::new(identity.clone()),
            cache.clone(),
            config.startup_error().map(str::to_string),
        );

        Self {
            _temp_dir: temp_dir,
            config,
            cache,
            identity,
            tokens,
        }
    }

    /// Creates a test environment with a token in the cache.
    pub(crate) async fn signed_in() -> Self {
        let env = Self::new().await;
        env.tokens.authenticate().await.unwrap();
        env
    }

    pub(crate) fn config(&self) -> Config {
        self.config.clone()
    }

    pub(crate) fn cache(&self) -> Cache {
        self.cache.clone()
    }

    /// A handle to the identity provider, for steering it.
    pub(crate) fn identity(&self) -> TestIdentity {
        self.identity.clone()
    }

    pub(crate) fn tokens(&self) -> TokenManager {
        self.tokens.clone()
    }

    /// A ledger over a fresh `TestSheet`, without the cache mirror.
    pub(crate) fn ledger(&self) -> LedgerImpl {
        LedgerImpl::new(Box::new(TestSheet::new()), self.cache(), self.tokens())
    }

    /// A cache-mirroring ledger over a fresh `TestSheet`.
    pub(crate) fn cached_ledger(&self) -> CachedLedger {
        CachedLedger::new(Box::new(self.ledger()), self.cache())
    }

    /// An `App` that shares this environment's cache and identity provider.
    pub(crate) async fn app(&self) -> App {
        App::assemble(
            self.config(),
            self.cache(),
            Arc::new(self.identity()),
            api::sheet(crate::Mode::Testing),
        )
        .await
    }

    /// Creates an initialized spreadsheet and binds it. The environment must be signed in.
    pub(crate) async fn new_document(&self) -> Document {
        let document = self.ledger().create_spreadsheet("Test Expenses").await.unwrap();
        self.cache.set_document(&document).await.unwrap();
        document
    }
}

/// Writes a `client_secret.json` as downloaded from the Google Cloud Console.
pub(crate) fn write_client_secret(path: &Path, client_id: &str) {
    let content = format!(
        r#"{{
            "installed": {{
                "client_id": "{client_id}",
                "client_secret": "test-secret",
                "redirect_uris": ["http://localhost"],
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token"
            }}
        }}"#
    );
    std::fs::write(path, content).unwrap();
}

/// A valid expense paid by the first default user.
pub(crate) fn expense(date: &str, amount: &str, remarks: Option<&str>) -> NewExpense {
    NewExpense {
        date: date.to_string(),
        amount: Amount::from_str(amount).unwrap(),
        expense_type: "Groceries".to_string(),
        payment_type: "UPI".to_string(),
        paid_by: "User 1".to_string(),
        remarks: remarks.map(str::to_string),
    }
}
