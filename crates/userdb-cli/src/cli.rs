use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use userdb_core::VERSION;

use crate::constants::{bench, CONFIG_PATH_ENV, DB_PATH_ENV};

/// userdb - an account store on an embedded key-value database
#[derive(Parser)]
#[command(name = "userdb")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the database directory
    #[arg(short, long, global = true, env = DB_PATH_ENV)]
    pub db: Option<String>,

    /// Path to the config file
    #[arg(short, long, global = true, env = CONFIG_PATH_ENV)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log level for userdb targets (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account (overwrites an existing one)
    Add(AddArgs),

    /// Show an account
    Find(FindArgs),

    /// Verify an account's password
    CheckPassword(PasswordArgs),

    /// Move an account to a new email
    ChangeEmail(ChangeEmailArgs),

    /// Set a new password, keeping the account data
    ChangePassword(PasswordArgs),

    /// Replace an account's data
    Modify(ModifyArgs),

    /// Delete an account
    Delete(DeleteArgs),

    /// List accounts in email order
    List(ListArgs),

    /// Run the throughput benchmark
    Bench(BenchArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `add` command
#[derive(Args)]
pub struct AddArgs {
    #[arg(value_name = "EMAIL")]
    pub email: String,

    /// Password (prompted for when omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Account data as a JSON value
    #[arg(long, value_name = "JSON")]
    pub data: Option<String>,
}

/// Arguments for the `find` command
#[derive(Args)]
pub struct FindArgs {
    #[arg(value_name = "EMAIL")]
    pub email: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for `check-password` and `change-password`
#[derive(Args)]
pub struct PasswordArgs {
    #[arg(value_name = "EMAIL")]
    pub email: String,

    /// Password (prompted for when omitted)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Arguments for the `change-email` command
#[derive(Args)]
pub struct ChangeEmailArgs {
    /// Current email
    #[arg(value_name = "OLD")]
    pub old: String,

    /// New email
    #[arg(value_name = "NEW")]
    pub new: String,
}

/// Arguments for the `modify` command
#[derive(Args)]
pub struct ModifyArgs {
    #[arg(value_name = "EMAIL")]
    pub email: String,

    /// New account data as a JSON value
    #[arg(long, value_name = "JSON")]
    pub data: String,
}

/// Arguments for the `delete` command
#[derive(Args)]
pub struct DeleteArgs {
    #[arg(value_name = "EMAIL")]
    pub email: String,
}

/// Arguments for the `list` command
#[derive(Args)]
pub struct ListArgs {
    /// Only emails after this one
    #[arg(long, value_name = "EMAIL")]
    pub gt: Option<String>,

    /// Only this email and later
    #[arg(long, value_name = "EMAIL")]
    pub gte: Option<String>,

    /// Only emails before this one
    #[arg(long, value_name = "EMAIL")]
    pub lt: Option<String>,

    /// Only this email and earlier
    #[arg(long, value_name = "EMAIL")]
    pub lte: Option<String>,

    /// Limit number of results
    #[arg(long)]
    pub limit: Option<usize>,

    /// Descending email order
    #[arg(long)]
    pub reverse: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `bench` command
#[derive(Args)]
pub struct BenchArgs {
    /// Accounts to write before the timed run
    #[arg(long, default_value_t = bench::RECORDS)]
    pub records: usize,

    /// Operations in flight at once
    #[arg(long, default_value_t = bench::CONCURRENCY)]
    pub concurrency: usize,

    /// Operations in the timed run
    #[arg(long, default_value_t = bench::OPS)]
    pub ops: u64,

    /// Seconds between rate reports
    #[arg(long, default_value_t = bench::SAMPLE_SECS)]
    pub sample_secs: u64,

    /// Run against an in-memory engine instead of the database
    #[arg(long)]
    pub in_memory: bool,

    /// Store benchmark passwords in plaintext (skips hashing)
    #[cfg(feature = "insecure-bench")]
    #[arg(long)]
    pub insecure: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    #[arg(value_enum)]
    pub shell: Shell,
}
