//! Engine settings shared by every subcommand
//!
//! Each flag can also be set through its `LEASEQ_*` environment variable.

use clap::{ArgAction, Args};
use leaseq_core::application::config::{DEFAULT_DELAY_SECONDS, DEFAULT_VISIBILITY_TIMEOUT_SECONDS};
use leaseq_core::application::EngineConfig;
use std::path::Path;

pub const DEFAULT_DB_PATH: &str = "~/.leaseq/queues.db";

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    /// SQLite database file (or `sqlite:` URL)
    #[arg(long, global = true, env = "LEASEQ_DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: String,

    /// Default delay for `send` and `send-batch` (seconds)
    #[arg(
        long,
        global = true,
        env = "LEASEQ_DELAY_SECONDS",
        default_value_t = DEFAULT_DELAY_SECONDS,
        allow_negative_numbers = true
    )]
    pub delay_seconds: i64,

    /// Default lease for `read` (seconds)
    #[arg(
        long,
        global = true,
        env = "LEASEQ_VISIBILITY_TIMEOUT",
        default_value_t = DEFAULT_VISIBILITY_TIMEOUT_SECONDS,
        allow_negative_numbers = true
    )]
    pub visibility_timeout: i64,

    /// Reject empty or malformed JSON payloads
    #[arg(
        long,
        global = true,
        env = "LEASEQ_STRICT_VALIDATION",
        default_value_t = true,
        action = ArgAction::Set
    )]
    pub strict_validation: bool,

    /// Queues to create on startup (comma separated)
    #[arg(long, global = true, env = "LEASEQ_QUEUES", value_delimiter = ',')]
    pub queues: Vec<String>,
}

impl EngineArgs {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            delay_seconds: self.delay_seconds,
            visibility_timeout_seconds: self.visibility_timeout,
            strict_validation: self.strict_validation,
            queues: self
                .queues
                .iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect(),
        }
    }

    /// Database location with `~` expanded
    pub fn database_path(&self) -> String {
        shellexpand::tilde(&self.db_path).into_owned()
    }

    /// Parent directory to create before opening, for plain file paths
    pub fn database_dir(&self) -> Option<std::path::PathBuf> {
        let path = self.database_path();
        if path.starts_with("sqlite:") || path == ":memory:" {
            return None;
        }

        Path::new(&path)
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        engine: EngineArgs,
    }

    fn parse(args: &[&str]) -> EngineArgs {
        let mut argv = vec!["leaseq"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).unwrap().engine
    }

    #[test]
    fn test_flags_build_engine_config() {
        let args = parse(&[
            "--delay-seconds",
            "3",
            "--visibility-timeout",
            "45",
            "--strict-validation",
            "false",
            "--queues",
            "orders, invoices,",
        ]);

        let config = args.engine_config();
        assert_eq!(config.delay_seconds, 3);
        assert_eq!(config.visibility_timeout_seconds, 45);
        assert!(!config.strict_validation);
        assert_eq!(config.queues, vec!["orders", "invoices"]);
    }

    #[test]
    fn test_negative_values_reach_validation() {
        let config = parse(&["--delay-seconds", "-1"]).engine_config();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_dir() {
        let args = parse(&["--db-path", "/tmp/leaseq/queues.db"]);
        assert_eq!(args.database_dir(), Some("/tmp/leaseq".into()));

        let args = parse(&["--db-path", "sqlite::memory:"]);
        assert_eq!(args.database_dir(), None);

        let args = parse(&["--db-path", "queues.db"]);
        assert_eq!(args.database_dir(), None);
    }

    #[test]
    fn test_tilde_is_expanded() {
        let args = parse(&["--db-path", "~/q.db"]);
        assert!(!args.database_path().starts_with('~'));
    }
}
