use crate::commands::Out;
use crate::error::{ErrorType, IntoResult};
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file with default settings
/// - Copies `secret_file` into its default location in the data dir.
///
/// # Arguments
/// - `tracpro_home` - The directory that will be the root of data directory, e.g. `$HOME/tracpro`
/// - `secret_file` - The downloaded OAuth 2.0 client credentials JSON needed to start the Google
///   OAuth workflow. This will be copied from the `secret_file` path to its default location and
///   name in the data directory.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(tracpro_home: &Path, secret_file: &Path) -> Result<Out<()>> {
    let config = Config::create(tracpro_home, secret_file)
        .await
        .context("Unable to create the data directory and configs")
        .pub_result(ErrorType::Config)?;
    let mut message = format!(
        "Successfully created the tracpro directory and config in {}",
        config.root().display()
    );
    if let Some(problem) = config.startup_error() {
        message.push_str(&format!("\n\nWarning: {problem}"));
    }
    Ok(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::write_client_secret;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let secret = dir.path().join("downloaded.json");
        write_client_secret(&secret, "1234-abcd.apps.googleusercontent.com");
        let home = dir.path().join("tracpro");

        let out = init(&home, &secret).await.unwrap();
        assert!(out.message().starts_with("Successfully created"));
        assert!(!out.message().contains("Warning"));
        assert!(Config::load(&home).await.is_ok());
    }

    #[tokio::test]
    async fn test_init_missing_secret() {
        let dir = TempDir::new().unwrap();
        let err = init(&dir.path().join("tracpro"), &dir.path().join("missing.json"))
            .await
            .unwrap_err();
        assert!(err.is(ErrorType::Config));
    }
}
