use clap::Parser;
use std::process::ExitCode;
use tracpro_sync::args::{Args, Command};
use tracpro_sync::{commands, Config, Mode, Result};
use tracing::{debug, error, trace};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let log_level = args.common().log_level();
    init_logger(log_level);
    debug!("Log level set to {}", log_level.to_string().to_lowercase());

    match main_inner(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Exiting with error: {e}");
            ExitCode::FAILURE
        }
    }
}

pub async fn main_inner(args: Args) -> Result<()> {
    trace!("{args:?}");
    let home = args.common().tracpro_home().path();

    // This allows for testing the program without hitting the Google APIs. When
    // TRACPRO_IN_TEST_MODE is set and non-zero in length, then the mode will be Mode::Testing,
    // otherwise it will be Mode::Google.
    let mode = Mode::from_env();

    let _: () = match args.command() {
        Command::Init(init_args) => commands::init(home, init_args.client_secret())
            .await?
            .print(),

        Command::Connect => commands::connect(Config::load(home).await?, mode)
            .await?
            .print(),

        Command::ConnectSheet(sheet_args) => {
            let config = Config::load(home).await?;
            commands::connect_sheet(config, mode, sheet_args.id_or_url())
                .await?
                .print()
        }

        Command::CreateSheet(sheet_args) => {
            let config = Config::load(home).await?;
            commands::create_sheet(config, mode, sheet_args.title())
                .await?
                .print()
        }

        Command::SignOut => commands::sign_out(Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Whoami => commands::whoami(Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Status => commands::status(Config::load(home).await?, mode)
            .await?
            .print(),

        Command::Add(add_args) => {
            let config = Config::load(home).await?;
            commands::add(config, mode, add_args.clone()).await?.print()
        }

        Command::Recent(recent_args) => {
            let config = Config::load(home).await?;
            commands::recent(config, mode, recent_args.clone())
                .await?
                .print()
        }

        Command::Categories(categories_args) => {
            let config = Config::load(home).await?;
            commands::categories(config, mode, categories_args.action())
                .await?
                .print()
        }

        Command::Theme(theme_args) => {
            let config = Config::load(home).await?;
            commands::theme(config, mode, theme_args.choice())
                .await?
                .print()
        }
    };
    Ok(())
}

/// Initializes the tracing subscriber.
pub fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => {
            // RUST_LOG exists; use it.
            EnvFilter::from_default_env()
        }
        None => {
            // RUST_LOG does not exist; use default log level for the library and the binary only.
            EnvFilter::new(format!(
                "{}={},{}={}",
                env!("CARGO_PKG_NAME").replace('-', "_"),
                level,
                env!("CARGO_BIN_NAME"),
                level
            ))
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
