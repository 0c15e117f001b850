//! Sign-in command handlers.
//!
//! - `tracpro connect` - Sign in, then bind, resume or create the expense spreadsheet
//! - `tracpro sign-out` - Revoke and forget the token
//! - `tracpro whoami` - Show the signed-in user

use crate::app::App;
use crate::commands::{with_warning, Out};
use crate::model::{Document, Profile};
use crate::{Config, Mode, Result};

/// Handles the `tracpro connect` command.
///
/// This is the ONLY command that opens the Google consent page. A fresh token is requested every
/// time, even if one is cached.
pub async fn connect(config: Config, mode: Mode) -> Result<Out<Document>> {
    let mut app = App::new(config, mode).await?;
    let outcome = app.connect().await?;
    let who = app
        .view()
        .user
        .as_ref()
        .map(|u| format!(" as {}", u.email))
        .unwrap_or_default();
    let document = outcome.value();
    let message = with_warning(
        format!(
            "Signed in{who} and connected to '{}'\n{}",
            document.name, document.url
        ),
        &outcome,
    );
    Ok(Out::new(message, outcome.into_value()))
}

/// Handles the `tracpro sign-out` command. The token is forgotten even if Google cannot be reached
/// to revoke it.
pub async fn sign_out(config: Config, mode: Mode) -> Result<Out<()>> {
    let mut app = App::new(config, mode).await?;
    let outcome = app.sign_out().await?;
    Ok(with_warning("Signed out".to_string(), &outcome).into())
}

/// Handles the `tracpro whoami` command.
pub async fn whoami(config: Config, mode: Mode) -> Result<Out<Profile>> {
    let mut app = App::new(config, mode).await?;
    let profile = app.whoami().await?;
    let message = match &profile.name {
        Some(name) => format!("Signed in as {name} <{}>", profile.email),
        None => format!("Signed in as {}", profile.email),
    };
    Ok(Out::new(message, profile))
}
