//! These structs provide the CLI interface for the tracpro CLI.

use crate::model::{Amount, CategoryKind, Theme};
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// tracpro: A personal expense tracker that keeps its data in a Google sheet.
///
/// Every expense you add is appended to a sheet named after its month, e.g. "November 2025", in a
/// spreadsheet that tracpro creates for you (or one you point it at). Your expense types, payment
/// types and the people who pay are kept in a hidden sheet of the same spreadsheet, so every device
/// that connects to it sees the same lists.
///
/// You will need Google OAuth client credentials for a desktop app. Run `tracpro init` with the
/// downloaded file, then `tracpro connect`.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run. Create OAuth client credentials of type "Desktop
    /// app" in the Google Cloud Console, with the Google Sheets API enabled, download them and
    /// pass the file as --client-secret.
    Init(InitArgs),
    /// Sign in with Google and connect to your expense spreadsheet, creating one if needed.
    Connect,
    /// Connect to an existing spreadsheet by its id or URL.
    ConnectSheet(ConnectSheetArgs),
    /// Create a new expense spreadsheet and connect to it.
    CreateSheet(CreateSheetArgs),
    /// Sign out and revoke the Google token. The spreadsheet stays remembered.
    SignOut,
    /// Show the signed-in Google user.
    Whoami,
    /// Show what tracpro knows without contacting Google.
    Status,
    /// Add an expense.
    Add(AddArgs),
    /// Show this month's most recent expenses.
    Recent(RecentArgs),
    /// Show or change the expense types, payment types and users.
    Categories(CategoriesArgs),
    /// Show or change the display theme.
    Theme(ThemeArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where tracpro configuration and its cache are held. Defaults to ~/tracpro
    #[arg(long, env = "TRACPRO_HOME", default_value_t = default_tracpro_home())]
    tracpro_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, tracpro_home: PathBuf) -> Self {
        Self {
            log_level,
            tracpro_home: tracpro_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn tracpro_home(&self) -> &DisplayPath {
        &self.tracpro_home
    }
}

/// (Not shown): Args for the `tracpro init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The path to your downloaded OAuth client credentials. This file will be copied to the
    /// default secrets location in the main data directory.
    #[arg(long)]
    client_secret: PathBuf,
}

impl InitArgs {
    pub fn new(client_secret: impl Into<PathBuf>) -> Self {
        Self {
            client_secret: client_secret.into(),
        }
    }

    pub fn client_secret(&self) -> &Path {
        &self.client_secret
    }
}

/// (Not shown): Args for the `tracpro connect-sheet` command.
#[derive(Debug, Parser, Clone)]
pub struct ConnectSheetArgs {
    /// The spreadsheet id, or its URL, e.g.
    /// https://docs.google.com/spreadsheets/d/1a7Km9FxQwRbPt82JvN4LzYpH5OcGnWsT6iDuE3VhMjX/edit
    id_or_url: String,
}

impl ConnectSheetArgs {
    pub fn new(id_or_url: impl Into<String>) -> Self {
        Self {
            id_or_url: id_or_url.into(),
        }
    }

    pub fn id_or_url(&self) -> &str {
        &self.id_or_url
    }
}

/// (Not shown): Args for the `tracpro create-sheet` command.
#[derive(Debug, Parser, Clone)]
pub struct CreateSheetArgs {
    /// The title of the new spreadsheet. Defaults to the `default_sheet_title` in config.json.
    #[arg(long)]
    title: Option<String>,
}

impl CreateSheetArgs {
    pub fn new(title: Option<String>) -> Self {
        Self { title }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }
}

/// (Not shown): Args for the `tracpro add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The amount, e.g. 249.50. A leading currency symbol and thousands separators are allowed.
    #[arg(long)]
    amount: Amount,

    /// The expense type, e.g. Groceries.
    #[arg(long)]
    expense_type: String,

    /// The payment type, e.g. UPI.
    #[arg(long)]
    payment_type: String,

    /// Who paid. Defaults to whoever paid for the last expense added on this machine.
    #[arg(long)]
    paid_by: Option<String>,

    /// The date of the expense as DD-MM-YYYY. Defaults to today.
    #[arg(long)]
    date: Option<String>,

    /// Free text, up to 200 characters.
    #[arg(long)]
    remarks: Option<String>,
}

impl AddArgs {
    pub fn new(
        amount: Amount,
        expense_type: impl Into<String>,
        payment_type: impl Into<String>,
    ) -> Self {
        Self {
            amount,
            expense_type: expense_type.into(),
            payment_type: payment_type.into(),
            paid_by: None,
            date: None,
            remarks: None,
        }
    }

    pub fn with_paid_by(mut self, paid_by: impl Into<String>) -> Self {
        self.paid_by = Some(paid_by.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_remarks(mut self, remarks: impl Into<String>) -> Self {
        self.remarks = Some(remarks.into());
        self
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn expense_type(&self) -> &str {
        &self.expense_type
    }

    pub fn payment_type(&self) -> &str {
        &self.payment_type
    }

    pub fn paid_by(&self) -> Option<&str> {
        self.paid_by.as_deref()
    }

    pub fn date(&self) -> Option<&str> {
        self.date.as_deref()
    }

    pub fn remarks(&self) -> Option<&str> {
        self.remarks.as_deref()
    }
}

/// (Not shown): Args for the `tracpro recent` command.
#[derive(Debug, Parser, Clone)]
pub struct RecentArgs {
    /// How many expenses to show. Defaults to the `recent_limit` in config.json.
    #[arg(long)]
    limit: Option<usize>,

    /// Show the expenses cached by the last refresh without contacting Google.
    #[arg(long)]
    cached: bool,
}

impl RecentArgs {
    pub fn new(limit: Option<usize>, cached: bool) -> Self {
        Self { limit, cached }
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    pub fn cached(&self) -> bool {
        self.cached
    }
}

/// (Not shown): Args for the `tracpro categories` command.
#[derive(Debug, Parser, Clone)]
pub struct CategoriesArgs {
    #[command(subcommand)]
    action: CategoriesAction,
}

impl CategoriesArgs {
    pub fn new(action: CategoriesAction) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &CategoriesAction {
        &self.action
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum CategoriesAction {
    /// Show the lists.
    Show {
        /// Read the lists from the spreadsheet instead of the cache.
        #[arg(long)]
        refresh: bool,
    },
    /// Replace all three lists at once. Each list is comma-separated.
    Set {
        #[arg(long, value_delimiter = ',', required = true)]
        expense_types: Vec<String>,
        #[arg(long, value_delimiter = ',', required = true)]
        payment_types: Vec<String>,
        #[arg(long, value_delimiter = ',', required = true)]
        users: Vec<String>,
    },
    /// Add a name to one list.
    Add { kind: CategoryKind, name: String },
    /// Remove a name from one list.
    Remove { kind: CategoryKind, name: String },
}

/// (Not shown): Args for the `tracpro theme` command.
#[derive(Debug, Parser, Clone)]
pub struct ThemeArgs {
    /// Omit to show the current theme.
    choice: Option<ThemeChoice>,
}

impl ThemeArgs {
    pub fn new(choice: Option<ThemeChoice>) -> Self {
        Self { choice }
    }

    pub fn choice(&self) -> Option<ThemeChoice> {
        self.choice
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    Light,
    Dark,
    Toggle,
}

impl ThemeChoice {
    /// The theme to switch to, or `None` for toggle.
    pub fn theme(self) -> Option<Theme> {
        match self {
            ThemeChoice::Light => Some(Theme::Light),
            ThemeChoice::Dark => Some(Theme::Dark),
            ThemeChoice::Toggle => None,
        }
    }
}

fn default_tracpro_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("tracpro"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --tracpro-home or TRACPRO_HOME instead of relying on the default \
                tracpro home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("tracpro")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
