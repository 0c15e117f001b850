//! The identity and token manager.
//!
//! `TokenManager` owns the lifecycle of the bearer token: it asks an `IdentityProvider` for a fresh
//! token, keeps it in the cache, attaches it to a `Sheet` before requests, and revokes it on
//! sign-out. It never validates a token with the provider on its own; a token is considered present
//! if the cache holds one.

use crate::api::Sheet;
use crate::cache::Cache;
use crate::error::{BestEffort, Error, ErrorType, Res};
use crate::model::Profile;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Something that can run a consent flow and answer questions about the resulting token.
#[async_trait::async_trait]
pub(crate) trait IdentityProvider {
    /// Runs the interactive consent flow and returns a new bearer token. Cancellation or a
    /// provider error is an `ErrorType::Auth` error.
    async fn request_token(&self) -> Res<String>;

    /// Fetches the profile of the user that `token` belongs to. A rejected token is an
    /// `ErrorType::ProfileFetch` error.
    async fn fetch_profile(&self, token: &str) -> Res<Profile>;

    /// Revokes `token` with the provider.
    async fn revoke(&self, token: &str) -> Res<()>;
}

/// Obtains, stores, attaches and revokes the bearer token.
#[derive(Clone)]
pub(crate) struct TokenManager {
    provider: Arc<dyn IdentityProvider + Send + Sync>,
    cache: Cache,
    startup_error: Option<String>,
}

impl TokenManager {
    /// `startup_error` is a client configuration problem found at startup. It is reported by
    /// `authenticate` and by nothing else.
    pub(crate) fn new(
        provider: Arc<dyn IdentityProvider + Send + Sync>,
        cache: Cache,
        startup_error: Option<String>,
    ) -> Self {
        Self {
            provider,
            cache,
            startup_error,
        }
    }

    /// Runs the consent flow and stores the new token. A fresh token is always requested, even if
    /// one is cached.
    pub(crate) async fn authenticate(&self) -> Res<String> {
        if let Some(problem) = &self.startup_error {
            return Err(Error::msg(ErrorType::Auth, problem.clone()).into());
        }
        let token = self.provider.request_token().await?;
        self.cache.set_token(&token).await?;
        info!("Signed in");
        Ok(token)
    }

    /// True if a token is cached. The token is not validated.
    pub(crate) async fn is_authenticated(&self) -> bool {
        self.cache.token().await.is_some()
    }

    /// The profile of the signed-in user.
    pub(crate) async fn current_user(&self) -> Res<Profile> {
        let token = self.cache.token().await.ok_or_else(|| {
            Error::msg(
                ErrorType::ProfileFetch,
                "Unable to fetch the user profile without signing in first",
            )
        })?;
        self.provider.fetch_profile(&token).await
    }

    /// Revokes the token, best effort, and then clears it from the cache regardless of the
    /// revocation outcome.
    pub(crate) async fn sign_out(&self) -> Res<BestEffort<()>> {
        let revoked = match self.cache.token().await {
            Some(token) => self.provider.revoke(&token).await,
            None => Ok(()),
        };
        self.cache.clear_token().await?;
        info!("Signed out");
        Ok(match revoked {
            Ok(()) => BestEffort::complete(()),
            Err(e) => {
                warn!("Unable to revoke the token: {e:#}");
                BestEffort::partial((), Error::new(ErrorType::Auth, e))
            }
        })
    }

    /// Attaches the cached token to `sheet`. Returns false if there is no token.
    pub(crate) async fn ensure_attached(&self, sheet: &mut (dyn Sheet + Send)) -> bool {
        match self.cache.token().await {
            Some(token) => {
                sheet.attach(&token);
                true
            }
            None => {
                debug!("No token to attach");
                false
            }
        }
    }
}

const TEST_TOKEN_PREFIX: &str = "test-token-";

/// An `IdentityProvider` that never leaves the process. Any token it could have issued is accepted,
/// even one issued by an earlier process, so that the binary can run in test mode across commands. Clones share state, so a test can keep a
/// handle to steer the provider after handing it to a `TokenManager`.
#[derive(Debug, Clone, Default)]
pub(crate) struct TestIdentity {
    state: Arc<Mutex<TestIdentityState>>,
}

/// The knobs and the record of a `TestIdentity`.
#[derive(Debug, Clone)]
pub(crate) struct TestIdentityState {
    pub(crate) profile: Profile,
    /// The consent flow fails as if the user pressed "Cancel".
    pub(crate) deny_consent: bool,
    pub(crate) reject_profile: bool,
    pub(crate) fail_revoke: bool,
    pub(crate) issued: Vec<String>,
    pub(crate) revoked: Vec<String>,
}

impl Default for TestIdentityState {
    fn default() -> Self {
        Self {
            profile: Profile {
                email: "tester@example.com".to_string(),
                name: Some("Test User".to_string()),
                picture: None,
            },
            deny_consent: false,
            reject_profile: false,
            fail_revoke: false,
            issued: Vec::new(),
            revoked: Vec::new(),
        }
    }
}

impl TestIdentity {
    fn lock(&self) -> MutexGuard<'_, TestIdentityState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub(crate) fn state(&self) -> TestIdentityState {
        self.lock().clone()
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut TestIdentityState)) {
        f(&mut self.lock())
    }
}

#[async_trait::async_trait]
impl IdentityProvider for TestIdentity {
    async fn request_token(&self) -> Res<String> {
        let mut state = self.lock();
        if state.deny_consent {
            return Err(Error::msg(ErrorType::Auth, "Sign-in failed: access_denied").into());
        }
        let token = format!("{TEST_TOKEN_PREFIX}{}", state.issued.len() + 1);
        state.issued.push(token.clone());
        Ok(token)
    }

    async fn fetch_profile(&self, token: &str) -> Res<Profile> {
        let state = self.lock();
        if state.reject_profile || !token.starts_with(TEST_TOKEN_PREFIX) {
            return Err(Error::msg(
                ErrorType::ProfileFetch,
                "The profile endpoint returned HTTP 401 Unauthorized",
            )
            .into());
        }
        Ok(state.profile.clone())
    }

    async fn revoke(&self, token: &str) -> Res<()> {
        let mut state = self.lock();
        if state.fail_revoke {
            anyhow::bail!("The revocation endpoint could not be reached");
        }
        state.revoked.push(token.to_string());
        Ok(())
    }
}
