//! Error types.
//!
//! Selection and authentication failures are fatal for a run. Analysis
//! failures are scoped to one subscription and end up in the report's
//! failure list instead of aborting the run.

use thiserror::Error;

/// Failure to turn user intent into a concrete list of subscriptions.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("no subscriptions are visible to the current credential")]
    EmptySubscriptionList,

    #[error("no current subscription is set; run `az account set --subscription <id>` or pass --subscription-ids")]
    NoCurrentSubscription,

    #[error("subscription '{0}' is not visible to the current credential; run with --dry-run to list available subscriptions")]
    UnknownSubscriptionId(String),

    #[error("no subscription ids were given")]
    NothingSelected,

    #[error("subscription selection cancelled")]
    Cancelled,

    #[error("failed to read selection: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure talking to Azure, either through the CLI or the REST API.
#[derive(Debug, Error)]
pub enum AzureError {
    #[error("Azure CLI not found at '{0}'; install it or set azure.cli_path")]
    CliNotFound(String),

    #[error("`az {command}` failed: {stderr}")]
    CliFailed { command: String, stderr: String },

    #[error("failed to parse output of `az {command}`: {source}")]
    CliOutput {
        command: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Azure API returned {status} for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected response from {url}: {message}")]
    UnexpectedResponse { url: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The credential could not be obtained. Always fatal.
#[derive(Debug, Error)]
#[error("Azure authentication failed: {source}. Run `az login` and try again.")]
pub struct AuthError {
    #[from]
    source: AzureError,
}

/// Analysis of a single subscription failed.
#[derive(Debug, Error)]
#[error("analysis of subscription {subscription_id} failed: {source}")]
pub struct AnalysisError {
    pub subscription_id: String,
    #[source]
    pub source: AzureError,
}

impl AnalysisError {
    pub fn new(subscription_id: impl Into<String>, source: AzureError) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            source,
        }
    }

    /// Reason string recorded in the report's failure list.
    pub fn reason(&self) -> String {
        self.source.to_string()
    }
}
