use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use dolphins_registry::LevelMatch;

#[derive(Parser)]
#[command(
    name = "dolphins",
    about = "Dolphins: diver certification records on a ledger",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Journal file holding the ledger.
    #[arg(long, global = true, default_value = "dolphins.journal")]
    pub journal: PathBuf,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LevelMatchArg {
    Lenient,
    Strict,
}

impl From<LevelMatchArg> for LevelMatch {
    fn from(value: LevelMatchArg) -> Self {
        match value {
            LevelMatchArg::Lenient => LevelMatch::Lenient,
            LevelMatchArg::Strict => LevelMatch::Strict,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a named operation (addDiver, addLevel, addCourse, addTestResult, getLevel, getHistoryForKey)
    Invoke(InvokeArgs),
    /// Show a diver record
    Show(ShowArgs),
    /// Show every stored version of a diver record
    History(HistoryArgs),
    /// List stored diver ids
    List,
    /// Start the HTTP gateway
    Serve(ServeArgs),
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    pub args: Vec<String>,
    /// Fail instead of silently ignoring updates aimed at a non-current level
    #[arg(long, value_enum, default_value = "lenient")]
    pub level_match: LevelMatchArg,
    /// Refuse addDiver when the id already exists
    #[arg(long)]
    pub no_overwrite: bool,
}

#[derive(Args)]
pub struct ShowArgs {
    pub id: String,
}

#[derive(Args)]
pub struct HistoryArgs {
    pub id: String,
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Overrides the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}
