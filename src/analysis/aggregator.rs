//! Result aggregation and statistics.
//!
//! This module merges per-subscription outcomes into one report and
//! computes summary totals across subscriptions.

use crate::analysis::recommendations::portfolio_recommendations;
use crate::analysis::runner::Outcome;
use crate::models::{
    AggregateReport, AnalysisResult, ReportMetadata, ReportSummary, SubscriptionFailure,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Merge ordered outcomes into an [`AggregateReport`].
///
/// Successes keep their input order. Failures go to a separate list with
/// the error text as the reason.
pub fn aggregate(outcomes: Vec<Outcome>, metadata: ReportMetadata) -> AggregateReport {
    let requested = outcomes.len();
    let mut results = Vec::new();
    let mut failures = Vec::new();

    for (subscription, outcome) in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => {
                let mut reason = e.reason();
                if reason.trim().is_empty() {
                    reason = "unknown error".to_string();
                }
                failures.push(SubscriptionFailure {
                    subscription_id: subscription.id,
                    subscription_name: subscription.name,
                    reason,
                });
            }
        }
    }

    let summary = summarize(&results, requested, failures.len());
    let recommendations = portfolio_recommendations(&summary);

    debug!(
        "Aggregated {} result(s) and {} failure(s)",
        results.len(),
        failures.len()
    );

    AggregateReport {
        metadata,
        results,
        failures,
        summary,
        recommendations,
    }
}

/// Compute summary totals over successful results.
pub fn summarize(results: &[AnalysisResult], requested: usize, failed: usize) -> ReportSummary {
    let mut regions = BTreeSet::new();
    let mut accounts_by_sku: BTreeMap<String, usize> = BTreeMap::new();
    let mut used_capacity_bytes: u64 = 0;
    let mut blob_count: u64 = 0;

    for result in results {
        regions.extend(result.regions());
        for account in &result.storage_accounts {
            *accounts_by_sku.entry(account.sku_name.clone()).or_default() += 1;
            used_capacity_bytes += account.used_capacity_bytes.unwrap_or(0);
            blob_count += account.blob_count.unwrap_or(0);
        }
    }

    let shares = results.iter().flat_map(|r| &r.file_shares);
    let share_quota_gib: u64 = shares.clone().filter_map(|s| s.quota_gib).sum();
    let share_usage_bytes: u64 = shares.filter_map(|s| s.usage_bytes).sum();

    let (total_cost, currency) = combined_cost(results);
    let subscriptions_with_cost = results.iter().filter(|r| r.cost.is_some()).count();
    if total_cost.is_some() && subscriptions_with_cost < results.len() {
        debug!(
            "Cost total covers {} of {} subscriptions",
            subscriptions_with_cost,
            results.len()
        );
    }

    ReportSummary {
        subscriptions_requested: requested,
        subscriptions_succeeded: results.len(),
        subscriptions_failed: failed,
        storage_accounts: results.iter().map(|r| r.storage_accounts.len()).sum(),
        containers: results.iter().map(|r| r.containers.len()).sum(),
        file_shares: results.iter().map(|r| r.file_shares.len()).sum(),
        used_capacity_bytes,
        blob_count,
        share_quota_gib,
        share_usage_bytes,
        total_cost,
        currency,
        subscriptions_with_cost,
        regions,
        accounts_by_sku,
    }
}

/// Sum of cost totals, only when every reported cost shares a currency.
///
/// Subscriptions without cost data are left out of the sum; callers
/// compare `subscriptions_with_cost` to tell a partial total apart.
fn combined_cost(results: &[AnalysisResult]) -> (Option<f64>, Option<String>) {
    let costs: Vec<_> = results.iter().filter_map(|r| r.cost.as_ref()).collect();

    let Some(first) = costs.first() else {
        return (None, None);
    };

    if costs.iter().any(|c| c.currency != first.currency) {
        debug!("Cost currencies differ across subscriptions; omitting total");
        return (None, None);
    }

    let total: f64 = costs.iter().map(|c| c.total).sum();
    (Some(total), Some(first.currency.clone()))
}

/// Subscriptions ordered by storage account count, most first.
pub fn largest_subscriptions(results: &[AnalysisResult], n: usize) -> Vec<(&str, usize)> {
    let mut counts: Vec<_> = results
        .iter()
        .map(|r| (r.subscription.name.as_str(), r.storage_accounts.len()))
        .filter(|(_, count)| *count > 0)
        .collect();

    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    counts.truncate(n);
    counts
}
