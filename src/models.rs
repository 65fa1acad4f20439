//! Data models for the storage analysis.
//!
//! This module contains the core data structures used throughout
//! the application: subscriptions, storage inventory rows, per-subscription
//! results and the aggregate report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Lifecycle state of a subscription as reported by Azure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionState {
    Enabled,
    Disabled,
    Warned,
    PastDue,
    Deleted,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriptionState::Enabled => write!(f, "Enabled"),
            SubscriptionState::Disabled => write!(f, "Disabled"),
            SubscriptionState::Warned => write!(f, "Warned"),
            SubscriptionState::PastDue => write!(f, "PastDue"),
            SubscriptionState::Deleted => write!(f, "Deleted"),
            SubscriptionState::Unknown => write!(f, "Unknown"),
        }
    }
}

/// A subscription visible to the current credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Subscription id (a GUID).
    pub id: String,
    /// Display name.
    pub name: String,
    /// Owning tenant, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub state: SubscriptionState,
    /// Whether the Azure CLI marks this as the active subscription.
    #[serde(default)]
    pub is_default: bool,
}

impl Subscription {
    pub fn matches_id(&self, id: &str) -> bool {
        self.id.eq_ignore_ascii_case(id.trim())
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Which subscriptions the user asked to analyze.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionSpec {
    /// Every visible subscription, in enumeration order.
    All,
    /// The credential's active subscription.
    Current,
    /// The first visible subscription.
    Single,
    /// The listed ids, in the order given.
    Explicit(Vec<String>),
}

impl fmt::Display for SelectionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionSpec::All => write!(f, "all"),
            SelectionSpec::Current => write!(f, "current"),
            SelectionSpec::Single => write!(f, "single"),
            SelectionSpec::Explicit(ids) => write!(f, "explicit ({})", ids.join(", ")),
        }
    }
}

/// A storage account discovered in a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageAccount {
    /// Full ARM resource id.
    pub id: String,
    pub name: String,
    pub resource_group: String,
    pub location: String,
    pub kind: String,
    pub sku_name: String,
    pub sku_tier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blob_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_endpoint: Option<String>,
    pub subscription_id: String,
    /// Latest `UsedCapacity` metric, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub used_capacity_bytes: Option<u64>,
    /// Latest `BlobCount` metric of the blob service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_count: Option<u64>,
    /// Latest `BlobCapacity` metric of the blob service, in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blob_capacity_bytes: Option<u64>,
}

/// A blob container inside a storage account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub account_name: String,
    pub resource_group: String,
    pub name: String,
    pub public_access: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_state: Option<String>,
    pub has_immutability_policy: bool,
    pub has_legal_hold: bool,
}

/// An Azure Files share inside a storage account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileShareSummary {
    pub account_name: String,
    pub resource_group: String,
    pub name: String,
    /// Provisioned quota in GiB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota_gib: Option<u64>,
    /// Bytes stored in the share.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled_protocols: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

/// Storage spend for one subscription over a lookback window.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub total: f64,
    pub currency: String,
    pub lookback_days: u32,
    pub by_service: BTreeMap<String, f64>,
}

/// Priority of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl Priority {
    /// Returns an emoji representation of the priority.
    pub fn emoji(&self) -> &'static str {
        match self {
            Priority::Low => "🟢",
            Priority::Medium => "🟡",
            Priority::High => "🔴",
        }
    }
}

/// A recommendation row in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub category: String,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub potential_savings: String,
}

/// Everything discovered in one subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub subscription: Subscription,
    pub storage_accounts: Vec<StorageAccount>,
    pub containers: Vec<ContainerSummary>,
    pub file_shares: Vec<FileShareSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostSummary>,
    pub recommendations: Vec<Recommendation>,
    /// Non-fatal problems hit while analyzing (e.g. one account unreadable).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub duration_seconds: f64,
}

impl AnalysisResult {
    /// Creates an empty result for a subscription.
    pub fn new(subscription: Subscription) -> Self {
        Self {
            subscription,
            storage_accounts: Vec::new(),
            containers: Vec::new(),
            file_shares: Vec::new(),
            cost: None,
            recommendations: Vec::new(),
            warnings: Vec::new(),
            duration_seconds: 0.0,
        }
    }

    /// Distinct regions of this subscription's storage accounts.
    pub fn regions(&self) -> BTreeSet<String> {
        self.storage_accounts
            .iter()
            .map(|a| a.location.clone())
            .collect()
    }
}

/// A subscription whose analysis failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionFailure {
    pub subscription_id: String,
    pub subscription_name: String,
    pub reason: String,
}

/// Totals across all successfully analyzed subscriptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSummary {
    pub subscriptions_requested: usize,
    pub subscriptions_succeeded: usize,
    pub subscriptions_failed: usize,
    pub storage_accounts: usize,
    pub containers: usize,
    pub file_shares: usize,
    /// Sum of account `UsedCapacity` over accounts that reported it.
    pub used_capacity_bytes: u64,
    pub blob_count: u64,
    pub share_quota_gib: u64,
    pub share_usage_bytes: u64,
    /// Total storage cost; absent when no costs were retrieved or currencies differ.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    /// Successful subscriptions whose cost query returned data.
    pub subscriptions_with_cost: usize,
    pub regions: BTreeSet<String>,
    pub accounts_by_sku: BTreeMap<String, usize>,
}

impl ReportSummary {
    /// Whether `total_cost` leaves out subscriptions that have no cost data.
    pub fn cost_is_partial(&self) -> bool {
        self.total_cost.is_some() && self.subscriptions_with_cost < self.subscriptions_succeeded
    }
}

/// Metadata about the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub tool_version: String,
    pub analysis_date: DateTime<Utc>,
    /// Human-readable description of the selection that was resolved.
    pub selection: String,
    pub max_workers: usize,
    pub duration_seconds: f64,
}

/// The combined report handed to the report writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateReport {
    pub metadata: ReportMetadata,
    pub results: Vec<AnalysisResult>,
    pub failures: Vec<SubscriptionFailure>,
    pub summary: ReportSummary,
    pub recommendations: Vec<Recommendation>,
}

impl AggregateReport {
    pub fn is_multi_subscription(&self) -> bool {
        self.summary.subscriptions_requested > 1
    }

    /// Whether at least one subscription was analyzed.
    pub fn has_successes(&self) -> bool {
        !self.results.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_state_parses_unknown_values() {
        let state: SubscriptionState = serde_json::from_str("\"Enabled\"").unwrap();
        assert_eq!(state, SubscriptionState::Enabled);

        let state: SubscriptionState = serde_json::from_str("\"SomethingNew\"").unwrap();
        assert_eq!(state, SubscriptionState::Unknown);
    }

    #[test]
    fn test_matches_id_ignores_case_and_whitespace() {
        let sub = Subscription {
            id: "AAAA-bbbb".to_string(),
            name: "Prod".to_string(),
            tenant_id: None,
            state: SubscriptionState::Enabled,
            is_default: false,
        };
        assert!(sub.matches_id("aaaa-BBBB"));
        assert!(sub.matches_id(" aaaa-bbbb "));
        assert!(!sub.matches_id("aaaa"));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::High.emoji(), "🔴");
    }

    #[test]
    fn test_cost_is_partial() {
        let mut summary = ReportSummary {
            subscriptions_succeeded: 2,
            subscriptions_with_cost: 1,
            total_cost: Some(10.0),
            ..ReportSummary::default()
        };
        assert!(summary.cost_is_partial());

        summary.subscriptions_with_cost = 2;
        assert!(!summary.cost_is_partial());

        summary.total_cost = None;
        summary.subscriptions_with_cost = 0;
        assert!(!summary.cost_is_partial());
    }

    #[test]
    fn test_selection_spec_display() {
        assert_eq!(SelectionSpec::All.to_string(), "all");
        assert_eq!(
            SelectionSpec::Explicit(vec!["a".into(), "b".into()]).to_string(),
            "explicit (a, b)"
        );
    }
}
