//! Command handlers that choose the spreadsheet, and `tracpro status`.

use crate::app::{App, AppView};
use crate::commands::Out;
use crate::model::Document;
use crate::{Config, Mode, Result};

/// Handles the `tracpro connect-sheet` command: binds an existing spreadsheet by id or URL.
pub async fn connect_sheet(config: Config, mode: Mode, id_or_url: &str) -> Result<Out<Document>> {
    let mut app = App::new(config, mode).await?;
    let document = app.connect_manual(id_or_url).await?;
    let mut message = format!("Connected to spreadsheet {}\n{}", document.id, document.url);
    if !app.view().authenticated {
        message.push_str("\n\nRun 'tracpro connect' to sign in and load its categories.");
    }
    Ok(Out::new(message, document))
}

/// Handles the `tracpro create-sheet` command.
pub async fn create_sheet(
    config: Config,
    mode: Mode,
    title: Option<&str>,
) -> Result<Out<Document>> {
    let mut app = App::new(config, mode).await?;
    let document = app.create_sheet(title).await?;
    Ok(Out::new(
        format!("Created '{}'\n{}", document.name, document.url),
        document,
    ))
}

/// Handles the `tracpro status` command. Only the cache is consulted.
pub async fn status(config: Config, mode: Mode) -> Result<Out<AppView>> {
    let app = App::new(config, mode).await?;
    let view = app.view().clone();
    let mut lines = vec![format!(
        "Signed in: {}",
        if view.authenticated { "yes" } else { "no" }
    )];
    lines.push(match &view.document {
        Some(document) => format!("Spreadsheet: {} ({})", document.name, document.url),
        None => "Spreadsheet: none".to_string(),
    });
    if let Some(problem) = app.config().startup_error() {
        lines.push(format!("Sign-in problem: {problem}"));
    }
    lines.push(format!("Expense types: {}", view.categories.expense_types.join(", ")));
    lines.push(format!("Payment types: {}", view.categories.payment_types.join(", ")));
    lines.push(format!("Users: {}", view.categories.users.join(", ")));
    if let Some(paid_by) = &view.last_paid_by {
        lines.push(format!("Last paid by: {paid_by}"));
    }
    lines.push(match view.recent_fetched_at {
        Some(at) => format!(
            "Recent expenses cached: {} (fetched {})",
            view.recent.len(),
            at.to_rfc3339()
        ),
        None => "Recent expenses cached: none".to_string(),
    });
    lines.push(format!("Theme: {}", view.theme));
    Ok(Out::new(lines.join("\n"), view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::AppState;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_status_before_anything() {
        let env = TestEnv::new().await;
        let out = status(env.config(), Mode::Testing).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.state, AppState::Ready);
        assert!(out.message().contains("Signed in: no"));
        assert!(out.message().contains("Spreadsheet: none"));
        assert!(out.message().contains("Theme: light"));
    }

    #[tokio::test]
    async fn test_connect_sheet_without_sign_in() {
        let env = TestEnv::new().await;
        let out = connect_sheet(
            env.config(),
            Mode::Testing,
            "https://docs.google.com/spreadsheets/d/ABC123/edit#gid=0",
        )
        .await
        .unwrap();
        assert_eq!(out.structure().unwrap().id, "ABC123");
        assert!(out.message().contains("tracpro connect"));

        let out = status(env.config(), Mode::Testing).await.unwrap();
        assert!(out.message().contains("docs.google.com/spreadsheets/d/ABC123"));
    }

    #[tokio::test]
    async fn test_create_sheet() {
        let env = TestEnv::signed_in().await;
        let out = create_sheet(env.config(), Mode::Testing, Some("Trip"))
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().name, "Trip");
        let view = status(env.config(), Mode::Testing)
            .await
            .unwrap()
            .structure()
            .cloned()
            .unwrap();
        assert_eq!(view.document.unwrap().name, "Trip");
    }
}
