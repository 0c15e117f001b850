//! The Google implementation of `IdentityProvider`.
//!
//! Signing in runs the OAuth 2.0 authorization code flow for installed apps:
//! - Build the consent URL (with PKCE and a CSRF state) and show it to the user.
//! - Listen on `http://localhost:3030` for Google's redirect.
//! - Exchange the authorization code for an access token.
//!
//! Consent is always requested again (`prompt=consent`) so that a fresh, fully-scoped token is
//! issued on every sign-in.

use crate::api::files::SecretFile;
use crate::api::OAUTH_SCOPES;
use crate::api::IdentityProvider;
use crate::error::{Error, ErrorType, Res};
use crate::model::Profile;
use crate::Config;
use anyhow::{bail, Context};
use hyper::body::Incoming;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    PkceCodeChallenge, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info};

const OAUTH_CALLBACK_PORT: u16 = 3030;
const CONSENT_TIMEOUT: Duration = Duration::from_secs(300);
const REVOKE_URL: &str = "https://oauth2.googleapis.com/revoke";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

type ConsentClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Signs in with Google and talks to Google's identity endpoints.
pub(crate) struct GoogleIdentity {
    client_id: Option<String>,
    secret: Option<SecretFile>,
    http: reqwest::Client,
}

impl GoogleIdentity {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            client_id: config.client_id().map(str::to_string),
            secret: config.secret().cloned(),
            http: reqwest::Client::new(),
        }
    }

    fn oauth_client(&self) -> Res<ConsentClient> {
        let secret = self
            .secret
            .as_ref()
            .context("No OAuth client secret is configured, run 'tracpro init' first")?;
        let client_id = self
            .client_id
            .clone()
            .unwrap_or_else(|| secret.client_id().to_string());
        Ok(BasicClient::new(ClientId::new(client_id))
            .set_client_secret(ClientSecret::new(secret.client_secret().to_string()))
            .set_auth_uri(AuthUrl::new(secret.auth_uri().to_string()).context("Invalid auth_uri")?)
            .set_token_uri(
                TokenUrl::new(secret.token_uri().to_string()).context("Invalid token_uri")?,
            )
            .set_redirect_uri(
                RedirectUrl::new(format!("http://localhost:{OAUTH_CALLBACK_PORT}"))
                    .context("Invalid redirect URI")?,
            ))
    }

    async fn consent(&self) -> Res<String> {
        let client = self.oauth_client()?;
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scopes(OAUTH_SCOPES.iter().map(|s| Scope::new(s.to_string())))
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(challenge)
            .url();

        let listener = TcpListener::bind(("127.0.0.1", OAUTH_CALLBACK_PORT))
            .await
            .with_context(|| format!("Unable to listen on port {OAUTH_CALLBACK_PORT}"))?;
        info!("Open this URL in your browser to sign in with Google:\n\n{auth_url}\n");
        info!("Waiting for the consent page on http://localhost:{OAUTH_CALLBACK_PORT}");

        let callback = tokio::time::timeout(CONSENT_TIMEOUT, wait_for_callback(listener))
            .await
            .context("Timed out waiting for the Google consent page")??;
        let code = callback.into_code(csrf.secret())?;

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Unable to build the HTTP client")?;
        let token = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(verifier)
            .request_async(&http)
            .await
            .context("Unable to exchange the authorization code for a token")?;
        Ok(token.access_token().secret().clone())
    }

    async fn profile(&self, token: &str) -> Res<Profile> {
        let response = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(token)
            .send()
            .await
            .context("Unable to reach the Google profile endpoint")?;
        let status = response.status();
        if !status.is_success() {
            bail!("The profile endpoint returned HTTP {status}");
        }
        let info: UserInfo = response
            .json()
            .await
            .context("Unable to parse the Google profile")?;
        Ok(Profile {
            email: info.email,
            name: info.name,
            picture: info.picture,
        })
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoogleIdentity {
    async fn request_token(&self) -> Res<String> {
        self.consent()
            .await
            .map_err(|e| Error::new(ErrorType::Auth, e).into())
    }

    async fn fetch_profile(&self, token: &str) -> Res<Profile> {
        self.profile(token)
            .await
            .map_err(|e| Error::new(ErrorType::ProfileFetch, e).into())
    }

    async fn revoke(&self, token: &str) -> Res<()> {
        let response = self
            .http
            .post(REVOKE_URL)
            .form(&[("token", token)])
            .send()
            .await
            .context("Unable to reach the Google revocation endpoint")?;
        let status = response.status();
        if !status.is_success() {
            bail!("The revocation endpoint returned HTTP {status}");
        }
        debug!("Revoked the token");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
    name: Option<String>,
    picture: Option<String>,
}

/// The query parameters of Google's redirect to the callback server.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
struct Callback {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl Callback {
    /// Parses a redirect query. Returns `None` for requests that are not a redirect, such as the
    /// browser asking for `/favicon.ico`.
    fn from_query(query: &str) -> Option<Self> {
        let mut callback = Callback::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = Some(value.into_owned());
            match key.as_ref() {
                "code" => callback.code = value,
                "state" => callback.state = value,
                "error" => callback.error = value,
                "error_description" => callback.error_description = value,
                _ => {}
            }
        }
        if callback.code.is_none() && callback.error.is_none() {
            None
        } else {
            Some(callback)
        }
    }

    /// The authorization code, if Google granted one for `expected_state`.
    fn into_code(self, expected_state: &str) -> Res<String> {
        if let Some(error) = self.error {
            match self.error_description {
                Some(description) => bail!("Sign-in failed: {error}: {description}"),
                None => bail!("Sign-in failed: {error}"),
            }
        }
        if self.state.as_deref() != Some(expected_state) {
            bail!("Sign-in failed: the OAuth state did not match, please try again");
        }
        self.code
            .context("Sign-in failed: Google did not return an authorization code")
    }

    fn browser_message(&self) -> String {
        match &self.error {
            Some(error) => format!("TracPro sign-in failed: {error}. You can close this window."),
            None => "TracPro is signed in. You can close this window.".to_string(),
        }
    }
}

/// Serves connections on `listener` until one of them carries Google's redirect.
async fn wait_for_callback(listener: TcpListener) -> Res<Callback> {
    let (tx, mut rx) = mpsc::channel::<Callback>(1);
    loop {
        tokio::select! {
            Some(callback) = rx.recv() => return Ok(callback),
            accepted = listener.accept() => {
                let (stream, _) = accepted.context("Unable to accept the OAuth callback")?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    let service = service_fn(move |request: Request<Incoming>| {
                        let tx = tx.clone();
                        async move { Ok::<_, Infallible>(handle_callback(request, tx).await) }
                    });
                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await
                    {
                        debug!("OAuth callback connection error: {e}");
                    }
                });
            }
        }
    }
}

async fn handle_callback(request: Request<Incoming>, tx: mpsc::Sender<Callback>) -> Response<String> {
    let query = request.uri().query().unwrap_or_default();
    let Some(callback) = Callback::from_query(query) else {
        let mut response = text_response("Not found".to_string());
        *response.status_mut() = StatusCode::NOT_FOUND;
        return response;
    };
    let message = callback.browser_message();
    if tx.send(callback).await.is_err() {
        debug!("Ignoring an OAuth callback that arrived after the first one");
    }
    text_response(message)
}

fn text_response(body: String) -> Response<String> {
    let mut response = Response::new(body);
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    response
}
