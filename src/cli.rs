//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and the selection flag precedence.

use crate::models::SelectionSpec;
use clap::Parser;
use std::path::PathBuf;
use tracing::warn;

/// azcir - Azure storage Cost Intelligence Reports
///
/// Inventories storage accounts, blob containers and file shares across
/// one or more Azure subscriptions and writes a Markdown or JSON report.
/// Uses the Azure CLI login (`az login`) for credentials.
///
/// Examples:
///   azcir --auto
///   azcir --all-subscriptions --format json
///   azcir --subscription-ids 1111-aaaa,2222-bbbb --max-workers 2
///   azcir --auto --account-pattern "prod*" --no-file-shares
///   azcir --auto --container-names logs,backups --share-pattern "team-*"
///   azcir --dry-run
///   azcir --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Run without prompts, analyzing the current subscription
    /// unless another selection flag is given
    #[arg(long)]
    pub auto: bool,

    /// Analyze only the first visible subscription
    #[arg(long)]
    pub single_subscription: bool,

    /// Analyze every visible subscription
    #[arg(long)]
    pub all_subscriptions: bool,

    /// Analyze these subscriptions, in this order
    ///
    /// Accepts space- or comma-separated ids. Takes precedence over
    /// --all-subscriptions and --single-subscription.
    #[arg(
        long,
        alias = "subscription-id",
        value_name = "ID",
        num_args = 1..,
        value_delimiter = ','
    )]
    pub subscription_ids: Vec<String>,

    /// Number of subscriptions analyzed concurrently
    #[arg(long, value_name = "NUM")]
    pub max_workers: Option<usize>,

    /// Output file path for the report
    ///
    /// Defaults to a timestamped file in the configured output directory.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .azcir.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Only analyze these storage accounts (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub account_names: Option<Vec<String>>,

    /// Only analyze storage accounts matching this glob pattern
    #[arg(long, value_name = "PATTERN")]
    pub account_pattern: Option<String>,

    /// Maximum storage accounts per subscription
    #[arg(long, value_name = "COUNT")]
    pub max_accounts: Option<usize>,

    /// Only list these blob containers (comma-separated)
    #[arg(long, value_name = "NAMES", num_args = 1.., value_delimiter = ',')]
    pub container_names: Option<Vec<String>>,

    /// Only list blob containers matching this glob pattern
    #[arg(long, value_name = "PATTERN")]
    pub container_pattern: Option<String>,

    /// Only list these file shares (comma-separated)
    #[arg(long, value_name = "NAMES", num_args = 1.., value_delimiter = ',')]
    pub share_names: Option<Vec<String>>,

    /// Only list file shares matching this glob pattern
    #[arg(long, value_name = "PATTERN")]
    pub share_pattern: Option<String>,

    /// Skip Blob Storage container listing
    #[arg(long)]
    pub no_containers: bool,

    /// Skip Azure Files share listing
    #[arg(long)]
    pub no_file_shares: bool,

    /// Skip the Cost Management query
    #[arg(long)]
    pub no_costs: bool,

    /// Skip capacity and blob count metrics
    #[arg(long)]
    pub no_usage: bool,

    /// Days of cost history to sum
    #[arg(long, value_name = "DAYS")]
    pub cost_days: Option<u32>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to the Azure CLI binary
    #[arg(long, value_name = "PATH", env = "AZCIR_AZ_PATH")]
    pub az_path: Option<String>,

    /// Dry run: list subscriptions and the resolved selection, then exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .azcir.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format (dashboard data file)
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.max_workers == Some(0) {
            return Err("Max workers must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.cost_days == Some(0) {
            return Err("Cost days must be at least 1".to_string());
        }

        if self.max_accounts == Some(0) {
            return Err("Max accounts must be at least 1".to_string());
        }

        if self.subscription_ids.iter().any(|id| id.trim().is_empty()) {
            return Err("Subscription ids must not be empty".to_string());
        }

        let patterns = [
            ("account", &self.account_pattern),
            ("container", &self.container_pattern),
            ("share", &self.share_pattern),
        ];
        for (kind, pattern) in patterns {
            if let Some(pattern) = pattern {
                if let Err(e) = glob::Pattern::new(pattern) {
                    return Err(format!("Invalid {} pattern '{}': {}", kind, pattern, e));
                }
            }
        }

        Ok(())
    }

    /// Selection requested on the command line, if any.
    ///
    /// Precedence: --subscription-ids, --all-subscriptions,
    /// --single-subscription, then --auto (current subscription).
    pub fn selection_spec(&self) -> Option<SelectionSpec> {
        let given = [
            !self.subscription_ids.is_empty(),
            self.all_subscriptions,
            self.single_subscription,
        ]
        .iter()
        .filter(|flag| **flag)
        .count();

        if given > 1 {
            warn!("Multiple selection flags given; using --subscription-ids > --all-subscriptions > --single-subscription");
        }

        if !self.subscription_ids.is_empty() {
            Some(SelectionSpec::Explicit(self.subscription_ids.clone()))
        } else if self.all_subscriptions {
            Some(SelectionSpec::All)
        } else if self.single_subscription {
            Some(SelectionSpec::Single)
        } else if self.auto {
            Some(SelectionSpec::Current)
        } else {
            None
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            auto: false,
            single_subscription: false,
            all_subscriptions: false,
            subscription_ids: Vec::new(),
            max_workers: None,
            output: None,
            format: OutputFormat::Markdown,
            config: None,
            verbose: false,
            quiet: false,
            account_names: None,
            account_pattern: None,
            max_accounts: None,
            container_names: None,
            container_pattern: None,
            share_names: None,
            share_pattern: None,
            no_containers: false,
            no_file_shares: false,
            no_costs: false,
            no_usage: false,
            cost_days: None,
            timeout: None,
            az_path: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_selection_flags() {
        let args = Args::try_parse_from([
            "azcir",
            "--subscription-ids",
            "aaa,bbb",
            "ccc",
            "--max-workers",
            "2",
        ])
        .unwrap();
        assert_eq!(args.subscription_ids, vec!["aaa", "bbb", "ccc"]);
        assert_eq!(args.max_workers, Some(2));

        let args = Args::try_parse_from(["azcir", "--subscription-id", "zzz"]).unwrap();
        assert_eq!(args.subscription_ids, vec!["zzz"]);
    }

    #[test]
    fn test_selection_precedence() {
        let mut args = make_args();
        assert_eq!(args.selection_spec(), None);

        args.auto = true;
        assert_eq!(args.selection_spec(), Some(SelectionSpec::Current));

        args.single_subscription = true;
        assert_eq!(args.selection_spec(), Some(SelectionSpec::Single));

        args.all_subscriptions = true;
        assert_eq!(args.selection_spec(), Some(SelectionSpec::All));

        args.subscription_ids = vec!["x".to_string()];
        assert_eq!(
            args.selection_spec(),
            Some(SelectionSpec::Explicit(vec!["x".to_string()]))
        );
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_inventory_only_run_is_allowed() {
        let mut args = make_args();
        args.no_containers = true;
        args.no_file_shares = true;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_parse_container_and_share_filters() {
        let args = Args::try_parse_from([
            "azcir",
            "--container-names",
            "logs,backups",
            "--share-pattern",
            "team-*",
            "--no-usage",
        ])
        .unwrap();
        assert_eq!(
            args.container_names,
            Some(vec!["logs".to_string(), "backups".to_string()])
        );
        assert_eq!(args.share_pattern.as_deref(), Some("team-*"));
        assert!(args.no_usage);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_zero_workers() {
        let mut args = make_args();
        args.max_workers = Some(0);
        assert!(args.validate().is_err());

        args.max_workers = Some(3);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_bad_pattern() {
        let mut args = make_args();
        args.account_pattern = Some("[abc".to_string());
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.container_pattern = Some("logs-[".to_string());
        assert!(args.validate().unwrap_err().contains("container pattern"));
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
