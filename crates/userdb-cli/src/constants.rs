//! Constants used throughout the CLI.

/// Exit codes for the CLI.
///
/// These follow common Unix conventions:
/// - 0: Success
/// - 1: General error (used by anyhow for unhandled errors)
/// - 2: Misuse of shell command (reserved by shells)
/// - 3+: Application-specific errors
pub mod exit_codes {
    /// Resource not found (config file, account).
    pub const NOT_FOUND: i32 = 3;

    /// Invalid user input or arguments.
    pub const INVALID_INPUT: i32 = 4;

    /// Authentication failed (wrong password).
    pub const AUTH_FAILED: i32 = 5;
}

/// Log filter used when neither `RUST_LOG` nor `--log-level` is set.
pub const DEFAULT_LOG_FILTER: &str = "userdb=warn";

/// Environment variable holding the database path.
pub const DB_PATH_ENV: &str = "USERDB_PATH";

/// Environment variable holding the config file path.
pub const CONFIG_PATH_ENV: &str = "USERDB_CONFIG";

/// Benchmark defaults.
pub mod bench {
    /// Accounts written before the timed run.
    pub const RECORDS: usize = 100_000;

    /// Operations in flight at once.
    pub const CONCURRENCY: usize = 10;

    /// Operations in the timed run.
    pub const OPS: u64 = 1_000_000;

    /// Seconds between rate reports.
    pub const SAMPLE_SECS: u64 = 10;

    /// Suffix of every benchmark account email.
    pub const BASE_EMAIL: &str = "test@example.com";

    /// Password of every populated account.
    pub const PASSWORD: &str = "supersecret";
}
