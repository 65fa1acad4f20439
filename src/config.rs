//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.azcir.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".azcir.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Azure connection settings.
    #[serde(default)]
    pub azure: AzureConfig,

    /// Subscription selection settings.
    #[serde(default)]
    pub selection: SelectionConfig,

    /// Storage inventory settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Cost Management settings.
    #[serde(default)]
    pub costs: CostConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Directory reports are written to when --output is not given.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of subscriptions analyzed concurrently.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            verbose: false,
            max_workers: default_max_workers(),
        }
    }
}

fn default_output_dir() -> String {
    ".".to_string()
}

fn default_max_workers() -> usize {
    4
}

/// Azure connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Path to the Azure CLI binary.
    #[serde(default = "default_cli_path")]
    pub cli_path: String,

    /// Azure Resource Manager endpoint.
    #[serde(default = "default_management_endpoint")]
    pub management_endpoint: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries for throttled or failed requests.
    #[serde(default = "default_retries")]
    pub retries: usize,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            cli_path: default_cli_path(),
            management_endpoint: default_management_endpoint(),
            timeout_seconds: default_timeout(),
            retries: default_retries(),
        }
    }
}

fn default_cli_path() -> String {
    "az".to_string()
}

fn default_management_endpoint() -> String {
    "https://management.azure.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_retries() -> usize {
    3
}

/// Selection mode usable from the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    All,
    Current,
    Single,
}

/// Subscription selection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// How many invalid answers the prompt accepts before using the current subscription.
    #[serde(default = "default_prompt_attempts")]
    pub max_prompt_attempts: usize,

    /// Subscriptions to analyze when no selection flag is given.
    #[serde(default)]
    pub subscription_ids: Vec<String>,

    /// Mode used when neither flags nor `subscription_ids` select anything.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_mode: Option<SelectionMode>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_prompt_attempts: default_prompt_attempts(),
            subscription_ids: Vec::new(),
            default_mode: None,
        }
    }
}

fn default_prompt_attempts() -> usize {
    3
}

/// Storage inventory settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// List blob containers per account.
    #[serde(default = "default_true")]
    pub analyze_containers: bool,

    /// List Azure Files shares per account.
    #[serde(default = "default_true")]
    pub analyze_file_shares: bool,

    /// Only analyze these storage accounts (case-insensitive).
    #[serde(default)]
    pub account_names: Vec<String>,

    /// Only analyze accounts matching this glob pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_pattern: Option<String>,

    /// Maximum storage accounts per subscription.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_accounts: Option<usize>,

    /// Maximum containers listed per account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_containers_per_account: Option<usize>,

    /// Maximum file shares listed per account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_shares_per_account: Option<usize>,

    /// Only list these containers (case-insensitive).
    #[serde(default)]
    pub container_names: Vec<String>,

    /// Only list containers matching this glob pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_pattern: Option<String>,

    /// Only list these file shares (case-insensitive).
    #[serde(default)]
    pub share_names: Vec<String>,

    /// Only list file shares matching this glob pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub share_pattern: Option<String>,

    /// Read capacity and blob count metrics per account.
    #[serde(default = "default_true")]
    pub collect_usage: bool,
}

impl ScannerConfig {
    fn patterns(&self) -> [(&'static str, Option<&String>); 3] {
        [
            ("account", self.account_pattern.as_ref()),
            ("container", self.container_pattern.as_ref()),
            ("share", self.share_pattern.as_ref()),
        ]
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            analyze_containers: true,
            analyze_file_shares: true,
            account_names: Vec::new(),
            account_pattern: None,
            max_accounts: None,
            max_containers_per_account: None,
            max_shares_per_account: None,
            container_names: Vec::new(),
            container_pattern: None,
            share_names: Vec::new(),
            share_pattern: None,
            collect_usage: true,
        }
    }
}

/// Cost Management settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostConfig {
    /// Query storage costs per subscription.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Days of history to sum.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Service names counted as storage spend.
    #[serde(default = "default_service_names")]
    pub service_names: Vec<String>,
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookback_days: default_lookback_days(),
            service_names: default_service_names(),
        }
    }
}

fn default_lookback_days() -> u32 {
    90
}

fn default_service_names() -> Vec<String> {
    vec!["Storage", "Azure Storage", "Blob Storage", "Files"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Include per-account tables in the Markdown report.
    #[serde(default = "default_true")]
    pub include_account_details: bool,

    /// Include the recommendations section.
    #[serde(default = "default_true")]
    pub include_recommendations: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_account_details: true,
            include_recommendations: true,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(workers) = args.max_workers {
            self.general.max_workers = workers;
        }
        if args.verbose {
            self.general.verbose = true;
        }

        if let Some(ref az_path) = args.az_path {
            self.azure.cli_path = az_path.clone();
        }
        if let Some(timeout) = args.timeout {
            self.azure.timeout_seconds = timeout;
        }

        // Scanner switches only ever turn things off
        if args.no_containers {
            self.scanner.analyze_containers = false;
        }
        if args.no_file_shares {
            self.scanner.analyze_file_shares = false;
        }
        if let Some(ref names) = args.account_names {
            self.scanner.account_names = names.clone();
        }
        if let Some(ref pattern) = args.account_pattern {
            self.scanner.account_pattern = Some(pattern.clone());
        }
        if let Some(max) = args.max_accounts {
            self.scanner.max_accounts = Some(max);
        }
        if let Some(ref names) = args.container_names {
            self.scanner.container_names = names.clone();
        }
        if let Some(ref pattern) = args.container_pattern {
            self.scanner.container_pattern = Some(pattern.clone());
        }
        if let Some(ref names) = args.share_names {
            self.scanner.share_names = names.clone();
        }
        if let Some(ref pattern) = args.share_pattern {
            self.scanner.share_pattern = Some(pattern.clone());
        }
        if args.no_usage {
            self.scanner.collect_usage = false;
        }

        if args.no_costs {
            self.costs.enabled = false;
        }
        if let Some(days) = args.cost_days {
            self.costs.lookback_days = days;
        }
    }

    /// Check values a config file could have gotten wrong.
    pub fn validate(&self) -> Result<(), String> {
        if self.general.max_workers == 0 {
            return Err("general.max_workers must be at least 1".to_string());
        }
        if self.azure.timeout_seconds == 0 {
            return Err("azure.timeout_seconds must be at least 1".to_string());
        }
        if self.selection.max_prompt_attempts == 0 {
            return Err("selection.max_prompt_attempts must be at least 1".to_string());
        }
        for (kind, pattern) in self.scanner.patterns() {
            if let Some(pattern) = pattern {
                if let Err(e) = glob::Pattern::new(pattern) {
                    return Err(format!("Invalid {} pattern '{}': {}", kind, pattern, e));
                }
            }
        }
        if self.costs.enabled && self.costs.lookback_days == 0 {
            return Err("costs.lookback_days must be at least 1".to_string());
        }
        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
