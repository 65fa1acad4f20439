//! Authentication and subscription discovery.
//!
//! Credentials come from the Azure CLI login. Subscriptions are listed
//! through Resource Manager first, with `az account list` as a fallback.

use crate::azure::client::{ArmClient, ArmClientConfig};
use crate::config::AzureConfig;
use crate::error::{AuthError, AzureError};
use crate::models::{Subscription, SubscriptionState};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

const SUBSCRIPTIONS_API_VERSION: &str = "2022-12-01";

/// Source of the subscriptions visible to the current credential.
#[async_trait]
pub trait AccountProvider: Send + Sync {
    /// All subscriptions visible to the credential, in provider order.
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, AzureError>;

    /// Id of the credential's active subscription, if one is set.
    async fn current_subscription_id(&self) -> Option<String>;
}

/// Bearer token returned by `az account get-access-token`.
#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "accessToken")]
    pub access_token: String,
    #[serde(default)]
    pub tenant: Option<String>,
    /// Expiry as a unix timestamp (newer CLI versions only).
    #[serde(default)]
    pub expires_on: Option<i64>,
}

/// Subscription entry as printed by `az account list` / `az account show`.
#[derive(Debug, Deserialize)]
struct CliSubscription {
    id: String,
    name: String,
    #[serde(default)]
    state: SubscriptionState,
    #[serde(rename = "tenantId", default)]
    tenant_id: Option<String>,
    #[serde(rename = "isDefault", default)]
    is_default: bool,
}

impl From<CliSubscription> for Subscription {
    fn from(sub: CliSubscription) -> Self {
        Self {
            id: sub.id,
            name: sub.name,
            tenant_id: sub.tenant_id,
            state: sub.state,
            is_default: sub.is_default,
        }
    }
}

/// Subscription entry from `GET /subscriptions`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmSubscription {
    subscription_id: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default)]
    state: SubscriptionState,
}

impl From<ArmSubscription> for Subscription {
    fn from(sub: ArmSubscription) -> Self {
        Self {
            name: if sub.display_name.is_empty() {
                sub.subscription_id.clone()
            } else {
                sub.display_name
            },
            id: sub.subscription_id,
            tenant_id: sub.tenant_id,
            state: sub.state,
            is_default: false,
        }
    }
}

/// Runs the `az` binary and decodes its JSON output.
#[derive(Debug, Clone)]
pub struct AzureCli {
    program: String,
}

impl AzureCli {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn run_json<T: DeserializeOwned>(&self, args: &[&str]) -> Result<T, AzureError> {
        let command = args.join(" ");
        debug!("Running az {}", command);

        let output = Command::new(&self.program)
            .args(args)
            .args(["--output", "json"])
            .output()
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => AzureError::CliNotFound(self.program.clone()),
                _ => AzureError::Io(e),
            })?;

        if !output.status.success() {
            return Err(AzureError::CliFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|source| AzureError::CliOutput { command, source })
    }

    /// Get a bearer token for `resource` from the CLI login.
    pub async fn access_token(&self, resource: &str) -> Result<AccessToken, AzureError> {
        self.run_json(&["account", "get-access-token", "--resource", resource])
            .await
    }

    /// `az account list`.
    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, AzureError> {
        let subs: Vec<CliSubscription> = self.run_json(&["account", "list"]).await?;
        Ok(subs.into_iter().map(Subscription::from).collect())
    }

    /// `az account show`: the active subscription.
    pub async fn current_subscription(&self) -> Result<Subscription, AzureError> {
        let sub: CliSubscription = self.run_json(&["account", "show"]).await?;
        Ok(sub.into())
    }
}

/// Subscription enumerator backed by Resource Manager and the Azure CLI.
#[derive(Debug, Clone)]
pub struct AzureAccounts {
    arm: ArmClient,
    cli: AzureCli,
}

impl AzureAccounts {
    pub fn new(arm: ArmClient, cli: AzureCli) -> Self {
        Self { arm, cli }
    }
}

#[async_trait]
impl AccountProvider for AzureAccounts {
    async fn list_subscriptions(&self) -> Result<Vec<Subscription>, AzureError> {
        let url = self.arm.url("/subscriptions", SUBSCRIPTIONS_API_VERSION);

        match self.arm.get_paged::<ArmSubscription>(&url).await {
            Ok(subs) => {
                info!("Found {} subscriptions via Resource Manager", subs.len());
                Ok(subs.into_iter().map(Subscription::from).collect())
            }
            Err(e) => {
                warn!("Resource Manager subscription listing failed: {}", e);
                warn!("Falling back to `az account list`");
                let subs = self.cli.list_subscriptions().await?;
                info!("Found {} subscriptions via Azure CLI", subs.len());
                Ok(subs)
            }
        }
    }

    async fn current_subscription_id(&self) -> Option<String> {
        match self.cli.current_subscription().await {
            Ok(sub) => Some(sub.id),
            Err(e) => {
                debug!("Could not determine current subscription: {}", e);
                None
            }
        }
    }
}

/// Log in through the Azure CLI and build an authenticated ARM client.
pub async fn authenticate(config: &AzureConfig) -> Result<(ArmClient, AzureCli), AuthError> {
    let cli = AzureCli::new(config.cli_path.clone());
    let resource = format!("{}/", config.management_endpoint.trim_end_matches('/'));

    let token = cli.access_token(&resource).await?;
    info!(
        "Authenticated via Azure CLI{}",
        token
            .tenant
            .as_deref()
            .map(|t| format!(" (tenant {})", t))
            .unwrap_or_default()
    );
    if let Some(expires) = token.expires_on {
        debug!("Access token expires at unix time {}", expires);
    }

    let arm = ArmClient::new(ArmClientConfig::from(config), token.access_token)?;
    Ok((arm, cli))
}
