//! Per-subscription storage inventory.
//!
//! Lists storage accounts, blob containers and file shares through
//! Resource Manager and sums storage spend through Cost Management.

use crate::analysis::recommendations::subscription_recommendations;
use crate::analysis::SubscriptionAnalyzer;
use crate::azure::client::ArmClient;
use crate::azure::filter::{limit, NameFilter, Named};
use crate::config::{CostConfig, ScannerConfig};
use crate::error::{AnalysisError, AzureError};
use crate::models::{
    AnalysisResult, ContainerSummary, CostSummary, FileShareSummary, StorageAccount, Subscription,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{debug, info, warn};

const STORAGE_API_VERSION: &str = "2023-01-01";
const COST_API_VERSION: &str = "2023-03-01";
const METRICS_API_VERSION: &str = "2018-01-01";

const COST_COLUMNS: &[&str] = &["Cost", "PreTaxCost", "CostUSD", "totalCost"];

#[derive(Debug, Deserialize)]
struct ArmStorageAccount {
    id: String,
    name: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    sku: Option<ArmSku>,
    #[serde(default)]
    properties: ArmStorageAccountProperties,
}

#[derive(Debug, Deserialize)]
struct ArmSku {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tier: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmStorageAccountProperties {
    #[serde(default)]
    access_tier: Option<String>,
    #[serde(default)]
    creation_time: Option<String>,
    #[serde(default)]
    primary_endpoints: Option<ArmEndpoints>,
}

#[derive(Debug, Default, Deserialize)]
struct ArmEndpoints {
    #[serde(default)]
    blob: Option<String>,
    #[serde(default)]
    file: Option<String>,
}

impl ArmStorageAccount {
    fn into_account(self, subscription_id: &str) -> StorageAccount {
        let endpoints = self.properties.primary_endpoints.unwrap_or_default();
        let (sku_name, sku_tier) = match self.sku {
            Some(sku) => (sku.name, sku.tier),
            None => (None, None),
        };

        StorageAccount {
            resource_group: resource_group_from_id(&self.id)
                .unwrap_or("Unknown")
                .to_string(),
            id: self.id,
            name: self.name,
            location: self.location,
            kind: self.kind.unwrap_or_else(|| "Unknown".to_string()),
            sku_name: sku_name.unwrap_or_else(|| "Unknown".to_string()),
            sku_tier: sku_tier.unwrap_or_else(|| "Unknown".to_string()),
            access_tier: self.properties.access_tier,
            creation_time: parse_timestamp(self.properties.creation_time.as_deref()),
            blob_endpoint: endpoints.blob,
            file_endpoint: endpoints.file,
            subscription_id: subscription_id.to_string(),
            used_capacity_bytes: None,
            blob_count: None,
            blob_capacity_bytes: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArmContainer {
    name: String,
    #[serde(default)]
    properties: ArmContainerProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmContainerProperties {
    #[serde(default)]
    public_access: Option<String>,
    #[serde(default)]
    last_modified_time: Option<String>,
    #[serde(default)]
    lease_state: Option<String>,
    #[serde(default)]
    has_immutability_policy: bool,
    #[serde(default)]
    has_legal_hold: bool,
}

impl ArmContainer {
    fn into_summary(self, account: &StorageAccount) -> ContainerSummary {
        ContainerSummary {
            account_name: account.name.clone(),
            resource_group: account.resource_group.clone(),
            name: self.name,
            public_access: self
                .properties
                .public_access
                .unwrap_or_else(|| "None".to_string()),
            last_modified: parse_timestamp(self.properties.last_modified_time.as_deref()),
            lease_state: self.properties.lease_state,
            has_immutability_policy: self.properties.has_immutability_policy,
            has_legal_hold: self.properties.has_legal_hold,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArmShare {
    name: String,
    #[serde(default)]
    properties: ArmShareProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArmShareProperties {
    #[serde(default)]
    share_quota: Option<u64>,
    #[serde(default)]
    access_tier: Option<String>,
    #[serde(default)]
    enabled_protocols: Option<String>,
    #[serde(default)]
    last_modified_time: Option<String>,
    #[serde(default)]
    share_usage_bytes: Option<u64>,
}

impl ArmShare {
    fn into_summary(self, account: &StorageAccount) -> FileShareSummary {
        FileShareSummary {
            account_name: account.name.clone(),
            resource_group: account.resource_group.clone(),
            name: self.name,
            quota_gib: self.properties.share_quota,
            usage_bytes: self.properties.share_usage_bytes,
            access_tier: self.properties.access_tier,
            enabled_protocols: self.properties.enabled_protocols,
            last_modified: parse_timestamp(self.properties.last_modified_time.as_deref()),
        }
    }
}

impl Named for StorageAccount {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ArmContainer {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ArmShare {
    fn name(&self) -> &str {
        &self.name
    }
}

/// Azure Monitor metrics response, reduced to what the inventory reads.
#[derive(Debug, Deserialize)]
struct MetricsResponse {
    #[serde(default)]
    value: Vec<Metric>,
}

#[derive(Debug, Deserialize)]
struct Metric {
    name: MetricName,
    #[serde(default)]
    timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Deserialize)]
struct MetricName {
    value: String,
}

#[derive(Debug, Deserialize)]
struct TimeSeries {
    #[serde(default)]
    data: Vec<MetricPoint>,
}

#[derive(Debug, Deserialize)]
struct MetricPoint {
    #[serde(default)]
    average: Option<f64>,
}

impl MetricsResponse {
    /// Most recent average reported for `name`, rounded to a whole count.
    fn latest(&self, name: &str) -> Option<u64> {
        self.value
            .iter()
            .filter(|m| m.name.value.eq_ignore_ascii_case(name))
            .flat_map(|m| &m.timeseries)
            .flat_map(|ts| &ts.data)
            .filter_map(|p| p.average)
            .last()
            .map(|v| v.max(0.0).round() as u64)
    }
}

#[derive(Debug, Deserialize)]
struct CostQueryResponse {
    properties: CostQueryProperties,
}

#[derive(Debug, Deserialize)]
struct CostQueryProperties {
    #[serde(default)]
    columns: Vec<CostColumn>,
    #[serde(default)]
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct CostColumn {
    name: String,
}

/// Analyzer that inventories one subscription's storage through Azure.
pub struct StorageAnalyzer {
    arm: ArmClient,
    scanner: ScannerConfig,
    costs: CostConfig,
}

impl StorageAnalyzer {
    pub fn new(arm: ArmClient, scanner: ScannerConfig, costs: CostConfig) -> Self {
        Self {
            arm,
            scanner,
            costs,
        }
    }

    async fn list_storage_accounts(
        &self,
        subscription_id: &str,
    ) -> Result<Vec<StorageAccount>, AzureError> {
        let url = self.arm.url(
            &format!(
                "/subscriptions/{}/providers/Microsoft.Storage/storageAccounts",
                subscription_id
            ),
            STORAGE_API_VERSION,
        );
        let accounts: Vec<ArmStorageAccount> = self.arm.get_paged(&url).await?;
        Ok(accounts
            .into_iter()
            .map(|a| a.into_account(subscription_id))
            .collect())
    }

    async fn list_containers(
        &self,
        account: &StorageAccount,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<ContainerSummary>, AzureError> {
        let url = self.arm.url(
            &format!("{}/blobServices/default/containers", account.id),
            STORAGE_API_VERSION,
        );
        let containers: Vec<ArmContainer> = self.arm.get_paged(&url).await?;

        let filter = NameFilter::new(
            "container",
            &self.scanner.container_names,
            self.scanner.container_pattern.as_deref(),
        );
        let containers = filter.apply(containers, &format!("in {}", account.name), warnings);

        Ok(limit(containers, self.scanner.max_containers_per_account)
            .into_iter()
            .map(|c| c.into_summary(account))
            .collect())
    }

    async fn list_file_shares(
        &self,
        account: &StorageAccount,
        warnings: &mut Vec<String>,
    ) -> Result<Vec<FileShareSummary>, AzureError> {
        let url = self.arm.url(
            &format!("{}/fileServices/default/shares?$expand=stats", account.id),
            STORAGE_API_VERSION,
        );
        let shares: Vec<ArmShare> = self.arm.get_paged(&url).await?;

        let filter = NameFilter::new(
            "file share",
            &self.scanner.share_names,
            self.scanner.share_pattern.as_deref(),
        );
        let shares = filter.apply(shares, &format!("in {}", account.name), warnings);

        Ok(limit(shares, self.scanner.max_shares_per_account)
            .into_iter()
            .map(|s| s.into_summary(account))
            .collect())
    }

    /// Fill in used capacity and blob counts from Azure Monitor.
    async fn collect_usage(&self, account: &mut StorageAccount) -> Result<(), AzureError> {
        let now = Utc::now();

        let url = self.arm.url(
            &metrics_path(&account.id, "UsedCapacity", now),
            METRICS_API_VERSION,
        );
        let metrics: MetricsResponse = self.arm.get_json(&url).await?;
        account.used_capacity_bytes = metrics.latest("UsedCapacity");

        if account.blob_endpoint.is_some() {
            let blob_service = format!("{}/blobServices/default", account.id);
            let url = self.arm.url(
                &metrics_path(&blob_service, "BlobCount,BlobCapacity", now),
                METRICS_API_VERSION,
            );
            let metrics: MetricsResponse = self.arm.get_json(&url).await?;
            account.blob_count = metrics.latest("BlobCount");
            account.blob_capacity_bytes = metrics.latest("BlobCapacity");
        }

        Ok(())
    }

    async fn query_costs(&self, subscription_id: &str) -> Result<CostSummary, AzureError> {
        let url = self.arm.url(
            &format!(
                "/subscriptions/{}/providers/Microsoft.CostManagement/query",
                subscription_id
            ),
            COST_API_VERSION,
        );
        let body = cost_query_body(Utc::now(), self.costs.lookback_days, &self.costs.service_names);
        let response: CostQueryResponse = self.arm.post_json(&url, &body).await?;
        summarize_costs(&response.properties, self.costs.lookback_days)
            .map_err(|message| AzureError::UnexpectedResponse { url, message })
    }
}

#[async_trait]
impl SubscriptionAnalyzer for StorageAnalyzer {
    async fn analyze(&self, subscription: &Subscription) -> Result<AnalysisResult, AnalysisError> {
        let start = Instant::now();
        let mut result = AnalysisResult::new(subscription.clone());

        let accounts = self
            .list_storage_accounts(&subscription.id)
            .await
            .map_err(|e| AnalysisError::new(&subscription.id, e))?;
        info!(
            "Found {} storage accounts in {}",
            accounts.len(),
            subscription
        );

        let mut accounts = select_accounts(accounts, &self.scanner, &mut result.warnings);

        for account in accounts.iter_mut() {
            debug!(
                "Inspecting {} ({}, {} {})",
                account.name, account.location, account.sku_name, account.sku_tier
            );

            if self.scanner.analyze_containers && account.blob_endpoint.is_some() {
                match self.list_containers(account, &mut result.warnings).await {
                    Ok(containers) => result.containers.extend(containers),
                    Err(e) => {
                        warn!("Could not list containers for {}: {}", account.name, e);
                        result
                            .warnings
                            .push(format!("{}: containers unavailable: {}", account.name, e));
                    }
                }
            }

            if self.scanner.analyze_file_shares && account.file_endpoint.is_some() {
                match self.list_file_shares(account, &mut result.warnings).await {
                    Ok(shares) => result.file_shares.extend(shares),
                    Err(e) => {
                        warn!("Could not list file shares for {}: {}", account.name, e);
                        result
                            .warnings
                            .push(format!("{}: file shares unavailable: {}", account.name, e));
                    }
                }
            }

            if self.scanner.collect_usage {
                if let Err(e) = self.collect_usage(account).await {
                    warn!("Could not read usage metrics for {}: {}", account.name, e);
                    result
                        .warnings
                        .push(format!("{}: usage metrics unavailable: {}", account.name, e));
                }
            }
        }

        if self.costs.enabled {
            match self.query_costs(&subscription.id).await {
                Ok(cost) => {
                    info!(
                        "Storage cost for {} over {} days: {:.2} {}",
                        subscription.id, cost.lookback_days, cost.total, cost.currency
                    );
                    result.cost = Some(cost);
                }
                Err(e) => {
                    warn!("Cost query failed for {}: {}", subscription.id, e);
                    result.warnings.push(format!("cost data unavailable: {}", e));
                }
            }
        }

        result.recommendations = subscription_recommendations(&accounts);
        result.storage_accounts = accounts;
        result.duration_seconds = start.elapsed().as_secs_f64();

        Ok(result)
    }
}

/// Apply name, pattern and count filters to a subscription's accounts.
///
/// Explicit names win over the pattern. A filter that matches nothing is
/// ignored with a warning so the subscription is still inventoried.
pub fn select_accounts(
    accounts: Vec<StorageAccount>,
    scanner: &ScannerConfig,
    warnings: &mut Vec<String>,
) -> Vec<StorageAccount> {
    let filter = NameFilter::new(
        "storage account",
        &scanner.account_names,
        scanner.account_pattern.as_deref(),
    );
    let selected = filter.apply(accounts, "in subscription", warnings);

    if let Some(max) = scanner.max_accounts {
        if selected.len() > max {
            info!("Limiting to first {} storage accounts", max);
        }
    }
    limit(selected, scanner.max_accounts)
}

/// Resource group segment of an ARM resource id.
pub fn resource_group_from_id(id: &str) -> Option<&str> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().filter(|s| !s.is_empty());
        }
    }
    None
}

/// Azure Monitor metrics path for the last day at hourly grain.
fn metrics_path(resource_id: &str, metric_names: &str, now: DateTime<Utc>) -> String {
    let from = now - Duration::days(1);
    format!(
        "{}/providers/Microsoft.Insights/metrics?metricnames={}&aggregation=Average&interval=PT1H&timespan={}/{}",
        resource_id,
        metric_names,
        from.format("%Y-%m-%dT%H:%M:%SZ"),
        now.format("%Y-%m-%dT%H:%M:%SZ")
    )
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Cost Management query summing storage spend over the lookback window.
fn cost_query_body(now: DateTime<Utc>, lookback_days: u32, service_names: &[String]) -> Value {
    let from = now - Duration::days(i64::from(lookback_days));
    json!({
        "type": "ActualCost",
        "timeframe": "Custom",
        "timePeriod": {
            "from": from.format("%Y-%m-%dT00:00:00Z").to_string(),
            "to": now.format("%Y-%m-%dT23:59:59Z").to_string(),
        },
        "dataset": {
            "granularity": "None",
            "aggregation": {
                "totalCost": { "name": "Cost", "function": "Sum" }
            },
            "grouping": [
                { "type": "Dimension", "name": "ServiceName" }
            ],
            "filter": {
                "dimensions": {
                    "name": "ServiceName",
                    "operator": "In",
                    "values": service_names,
                }
            }
        }
    })
}

/// Sum cost rows by service, locating columns by name.
///
/// Rows without a recognizable cost column are an error rather than a
/// silent zero.
fn summarize_costs(
    properties: &CostQueryProperties,
    lookback_days: u32,
) -> Result<CostSummary, String> {
    let column = |names: &[&str]| {
        properties
            .columns
            .iter()
            .position(|c| names.iter().any(|n| c.name.eq_ignore_ascii_case(n)))
    };

    let mut summary = CostSummary {
        lookback_days,
        ..CostSummary::default()
    };

    if !properties.rows.is_empty() {
        let cost_idx = column(COST_COLUMNS).ok_or_else(|| {
            let found: Vec<&str> = properties.columns.iter().map(|c| c.name.as_str()).collect();
            format!(
                "cost query returned no cost column (expected one of {}; got {})",
                COST_COLUMNS.join(", "),
                if found.is_empty() { "none".to_string() } else { found.join(", ") }
            )
        })?;
        let service_idx = column(&["ServiceName"]);
        let currency_idx = column(&["Currency"]);
        let mut by_service: BTreeMap<String, f64> = BTreeMap::new();

        for row in &properties.rows {
            let cost = row.get(cost_idx).and_then(Value::as_f64).unwrap_or(0.0);
            let service = service_idx
                .and_then(|i| row.get(i))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();

            if summary.currency.is_empty() {
                if let Some(currency) = currency_idx.and_then(|i| row.get(i)).and_then(Value::as_str) {
                    summary.currency = currency.to_string();
                }
            }

            summary.total += cost;
            *by_service.entry(service).or_default() += cost;
        }
        summary.by_service = by_service;
    }

    if summary.currency.is_empty() {
        summary.currency = "USD".to_string();
    }
    Ok(summary)
}
