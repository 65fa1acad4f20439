//! Markdown and JSON report generation.
//!
//! This module renders the Cost Intelligence Report from the
//! aggregated analysis results.

use crate::analysis::largest_subscriptions;
use crate::cli::OutputFormat;
use crate::config::ReportConfig;
use crate::models::{
    AggregateReport, AnalysisResult, CostSummary, Recommendation, ReportMetadata, ReportSummary,
    SubscriptionFailure,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AggregateReport, options: &ReportConfig) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Azure Storage Cost Intelligence Report\n\n");

    output.push_str(&generate_metadata_section(&report.metadata, report));
    output.push_str(&generate_table_of_contents(report, options));
    output.push_str(&generate_summary_section(&report.summary, &report.results));
    output.push_str(&generate_subscriptions_section(report));

    if options.include_account_details {
        output.push_str(&generate_details_section(&report.results));
    }

    output.push_str(&generate_failures_section(&report.failures));

    if options.include_recommendations {
        output.push_str(&generate_recommendations_section(report));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, report: &AggregateReport) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Analysis Type:** {}\n",
        if report.is_multi_subscription() {
            "Multi-subscription"
        } else {
            "Single subscription"
        }
    ));
    section.push_str(&format!("- **Selection:** {}\n", metadata.selection));
    section.push_str(&format!(
        "- **Subscriptions Analyzed:** {} of {}\n",
        report.summary.subscriptions_succeeded, report.summary.subscriptions_requested
    ));
    if report.summary.subscriptions_failed > 0 {
        section.push_str(&format!(
            "- **Subscriptions Failed:** {}\n",
            report.summary.subscriptions_failed
        ));
    }
    section.push_str(&format!("- **Workers:** {}\n", metadata.max_workers));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push_str(&format!("- **Tool Version:** {}\n", metadata.tool_version));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &AggregateReport, options: &ReportConfig) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Subscriptions](#subscriptions)\n");

    if options.include_account_details && !report.results.is_empty() {
        toc.push_str("- [Storage Details](#storage-details)\n");
    }
    if !report.failures.is_empty() {
        toc.push_str("- [Failed Subscriptions](#failed-subscriptions)\n");
    }
    if options.include_recommendations && has_recommendations(report) {
        toc.push_str("- [Recommendations](#recommendations)\n");
    }

    toc.push('\n');

    toc
}

/// Generate the summary section.
fn generate_summary_section(summary: &ReportSummary, results: &[AnalysisResult]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    section.push_str("| Subscriptions | Storage Accounts | Containers | File Shares | Storage Cost |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} |\n\n",
        summary.subscriptions_succeeded,
        summary.storage_accounts,
        summary.containers,
        summary.file_shares,
        format_total_cost(summary)
    ));

    if summary.cost_is_partial() {
        section.push_str(&format!(
            "> ⚠️ Storage cost covers {} of {} analyzed subscriptions; the rest had no cost data.\n\n",
            summary.subscriptions_with_cost, summary.subscriptions_succeeded
        ));
    }

    if summary.used_capacity_bytes > 0 || summary.blob_count > 0 || summary.share_quota_gib > 0 {
        section.push_str("| Used Capacity | Blobs | Share Quota | Share Usage |\n");
        section.push_str("|:---:|:---:|:---:|:---:|\n");
        section.push_str(&format!(
            "| {} | {} | {} GiB | {} |\n\n",
            format_bytes(summary.used_capacity_bytes),
            summary.blob_count,
            summary.share_quota_gib,
            format_bytes(summary.share_usage_bytes)
        ));
    }

    if !summary.regions.is_empty() {
        let regions: Vec<&str> = summary.regions.iter().map(String::as_str).collect();
        section.push_str(&format!("**Regions:** {}\n\n", regions.join(", ")));
    }

    if !summary.accounts_by_sku.is_empty() {
        section.push_str("### Storage Accounts by SKU\n\n");
        section.push_str("| SKU | Accounts |\n");
        section.push_str("|:---|:---:|\n");

        let mut skus: Vec<_> = summary.accounts_by_sku.iter().collect();
        skus.sort_by_key(|(_, count)| std::cmp::Reverse(**count));

        for (sku, count) in skus {
            section.push_str(&format!("| {} | {} |\n", sku, count));
        }
        section.push('\n');
    }

    let largest = largest_subscriptions(results, 5);
    if largest.len() > 1 {
        section.push_str("### Largest Subscriptions\n\n");
        section.push_str("| Subscription | Storage Accounts |\n");
        section.push_str("|:---|:---:|\n");

        for (name, count) in largest {
            section.push_str(&format!("| {} | {} |\n", escape_cell(name), count));
        }
        section.push('\n');
    }

    section
}

/// Generate the per-subscription overview table.
fn generate_subscriptions_section(report: &AggregateReport) -> String {
    let mut section = String::new();

    section.push_str("## Subscriptions\n\n");

    if report.results.is_empty() && report.failures.is_empty() {
        section.push_str("No subscriptions were analyzed.\n\n");
        return section;
    }

    section.push_str("| Subscription | ID | State | Accounts | Containers | File Shares | Storage Cost | Status |\n");
    section.push_str("|:---|:---|:---:|:---:|:---:|:---:|---:|:---:|\n");

    for result in &report.results {
        section.push_str(&format!(
            "| {} | `{}` | {} | {} | {} | {} | {} | ✅ |\n",
            escape_cell(&result.subscription.name),
            result.subscription.id,
            result.subscription.state,
            result.storage_accounts.len(),
            result.containers.len(),
            result.file_shares.len(),
            format_cost(result.cost.as_ref()),
        ));
    }

    for failure in &report.failures {
        section.push_str(&format!(
            "| {} | `{}` | - | - | - | - | - | ❌ |\n",
            escape_cell(&failure.subscription_name),
            failure.subscription_id
        ));
    }

    section.push('\n');
    section
}

/// Generate per-account, container and share tables for each subscription.
fn generate_details_section(results: &[AnalysisResult]) -> String {
    if results.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Storage Details\n\n");

    for result in results {
        section.push_str(&generate_subscription_details(result));
    }

    section
}

fn generate_subscription_details(result: &AnalysisResult) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", escape_cell(&result.subscription.name)));
    block.push_str(&format!(
        "*Subscription: `{}` | Accounts: {} | Analyzed in {:.1}s*\n\n",
        result.subscription.id,
        result.storage_accounts.len(),
        result.duration_seconds
    ));

    if result.storage_accounts.is_empty() {
        block.push_str("No storage accounts found.\n\n");
    } else {
        block.push_str("#### Storage Accounts\n\n");
        block.push_str("| Name | Resource Group | Location | Kind | SKU | Access Tier | Used | Blobs | Created |\n");
        block.push_str("|:---|:---|:---|:---|:---|:---|---:|---:|:---|\n");
        for account in &result.storage_accounts {
            block.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                account.name,
                account.resource_group,
                account.location,
                account.kind,
                account.sku_name,
                account.access_tier.as_deref().unwrap_or("-"),
                format_optional_bytes(account.used_capacity_bytes),
                account
                    .blob_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format_date(account.creation_time.as_ref()),
            ));
        }
        block.push('\n');
    }

    if !result.containers.is_empty() {
        block.push_str("#### Blob Containers\n\n");
        block.push_str("| Account | Container | Public Access | Lease | Last Modified | Protection |\n");
        block.push_str("|:---|:---|:---|:---|:---|:---|\n");
        for container in &result.containers {
            let public = if container.public_access.eq_ignore_ascii_case("none") {
                container.public_access.clone()
            } else {
                format!("⚠️ {}", container.public_access)
            };
            let mut protection = Vec::new();
            if container.has_immutability_policy {
                protection.push("immutability");
            }
            if container.has_legal_hold {
                protection.push("legal hold");
            }
            block.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                container.account_name,
                container.name,
                public,
                container.lease_state.as_deref().unwrap_or("-"),
                format_date(container.last_modified.as_ref()),
                if protection.is_empty() {
                    "-".to_string()
                } else {
                    protection.join(", ")
                },
            ));
        }
        block.push('\n');
    }

    if !result.file_shares.is_empty() {
        block.push_str("#### File Shares\n\n");
        block.push_str("| Account | Share | Quota (GiB) | Used | Access Tier | Protocols | Last Modified |\n");
        block.push_str("|:---|:---|---:|---:|:---|:---|:---|\n");
        for share in &result.file_shares {
            block.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} |\n",
                share.account_name,
                share.name,
                share
                    .quota_gib
                    .map(|q| q.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                format_optional_bytes(share.usage_bytes),
                share.access_tier.as_deref().unwrap_or("-"),
                share.enabled_protocols.as_deref().unwrap_or("-"),
                format_date(share.last_modified.as_ref()),
            ));
        }
        block.push('\n');
    }

    if let Some(ref cost) = result.cost {
        if !cost.by_service.is_empty() {
            block.push_str(&format!("#### Storage Cost (last {} days)\n\n", cost.lookback_days));
            block.push_str("| Service | Cost |\n");
            block.push_str("|:---|---:|\n");
            for (service, amount) in &cost.by_service {
                block.push_str(&format!("| {} | {:.2} {} |\n", service, amount, cost.currency));
            }
            block.push('\n');
        }
    }

    if !result.warnings.is_empty() {
        block.push_str("> ⚠️ **Warnings:**\n");
        for warning in &result.warnings {
            block.push_str(&format!("> - {}\n", warning));
        }
        block.push('\n');
    }

    block
}

/// Generate the failed subscriptions section.
fn generate_failures_section(failures: &[SubscriptionFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failed Subscriptions\n\n");
    section.push_str("| Subscription | ID | Reason |\n");
    section.push_str("|:---|:---|:---|\n");

    for failure in failures {
        section.push_str(&format!(
            "| {} | `{}` | {} |\n",
            escape_cell(&failure.subscription_name),
            failure.subscription_id,
            escape_cell(&failure.reason)
        ));
    }
    section.push('\n');

    section
}

fn has_recommendations(report: &AggregateReport) -> bool {
    !report.recommendations.is_empty()
        || report.results.iter().any(|r| !r.recommendations.is_empty())
}

/// Generate the recommendations section.
fn generate_recommendations_section(report: &AggregateReport) -> String {
    if !has_recommendations(report) {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Recommendations\n\n");

    if !report.recommendations.is_empty() {
        section.push_str("### Across All Subscriptions\n\n");
        section.push_str(&recommendation_table(&report.recommendations));
    }

    for result in report.results.iter().filter(|r| !r.recommendations.is_empty()) {
        section.push_str(&format!("### {}\n\n", escape_cell(&result.subscription.name)));
        section.push_str(&recommendation_table(&result.recommendations));
    }

    section
}

fn recommendation_table(recommendations: &[Recommendation]) -> String {
    let mut table = String::new();

    table.push_str("| Priority | Category | Recommendation | Potential Savings |\n");
    table.push_str("|:---:|:---|:---|:---|\n");

    let mut sorted: Vec<&Recommendation> = recommendations.iter().collect();
    sorted.sort_by(|a, b| b.priority.cmp(&a.priority));

    for rec in sorted {
        table.push_str(&format!(
            "| {} {} | {} | **{}**: {} | {} |\n",
            rec.priority.emoji(),
            rec.priority,
            rec.category,
            rec.title,
            escape_cell(&rec.description),
            escape_cell(&rec.potential_savings)
        ));
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Report generated by azcir v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

fn format_cost(cost: Option<&CostSummary>) -> String {
    match cost {
        Some(c) => format!("{:.2} {}", c.total, c.currency),
        None => "n/a".to_string(),
    }
}

fn format_total_cost(summary: &ReportSummary) -> String {
    match (summary.total_cost, summary.currency.as_deref()) {
        (Some(total), Some(currency)) if summary.cost_is_partial() => format!(
            "{:.2} {} (partial: {} of {} subscriptions)",
            total, currency, summary.subscriptions_with_cost, summary.subscriptions_succeeded
        ),
        (Some(total), Some(currency)) => format!("{:.2} {}", total, currency),
        _ => "n/a".to_string(),
    }
}

/// Binary-unit size such as `1.5 GiB`.
fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn format_optional_bytes(bytes: Option<u64>) -> String {
    bytes.map(format_bytes).unwrap_or_else(|| "-".to_string())
}

fn format_date(value: Option<&DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AggregateReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Render `report` in `format`.
pub fn render(report: &AggregateReport, format: OutputFormat, options: &ReportConfig) -> Result<String> {
    match format {
        OutputFormat::Markdown => Ok(generate_markdown_report(report, options)),
        OutputFormat::Json => generate_json_report(report),
    }
}

/// Timestamped report path inside `output_dir`.
pub fn default_output_path(
    output_dir: &Path,
    format: OutputFormat,
    multi_subscription: bool,
    now: DateTime<Utc>,
) -> PathBuf {
    let scope = if multi_subscription { "multi" } else { "single" };
    output_dir.join(format!(
        "azure_storage_cir_{}_{}.{}",
        scope,
        now.format("%Y%m%d_%H%M%S"),
        format.extension()
    ))
}

/// Write report content to `path`, creating parent directories.
pub fn write_report(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Short plain-text summary for the console.
pub fn console_summary(report: &AggregateReport) -> String {
    let summary = &report.summary;
    let mut lines = Vec::new();

    lines.push("📊 Analysis Summary:".to_string());
    lines.push(format!(
        "   Subscriptions: {} analyzed, {} failed",
        summary.subscriptions_succeeded, summary.subscriptions_failed
    ));
    lines.push(format!("   Storage accounts: {}", summary.storage_accounts));
    lines.push(format!(
        "   Containers: {} | File shares: {}",
        summary.containers, summary.file_shares
    ));
    if summary.total_cost.is_some() {
        lines.push(format!("   Storage cost: {}", format_total_cost(summary)));
    }
    if summary.used_capacity_bytes > 0 {
        lines.push(format!(
            "   Used capacity: {} ({} blobs)",
            format_bytes(summary.used_capacity_bytes),
            summary.blob_count
        ));
    }
    if !summary.regions.is_empty() {
        lines.push(format!("   Regions: {}", summary.regions.len()));
    }
    for failure in &report.failures {
        lines.push(format!(
            "   ❌ {} ({}): {}",
            failure.subscription_name, failure.subscription_id, failure.reason
        ));
    }
    lines.push(format!(
        "   Duration: {:.1}s",
        report.metadata.duration_seconds
    ));

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::analysis::runner::tests::sub;
    use crate::error::{AnalysisError, AzureError};
    use crate::models::{ContainerSummary, FileShareSummary, StorageAccount};
    use chrono::TimeZone;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            tool_version: "1.0.0".to_string(),
            analysis_date: Utc.with_ymd_and_hms(2024, 6, 1, 8, 30, 0).unwrap(),
            selection: "explicit (a, b)".to_string(),
            max_workers: 2,
            duration_seconds: 12.5,
        }
    }

    fn create_test_report() -> AggregateReport {
        let mut ok = AnalysisResult::new(sub("a"));
        ok.storage_accounts = (0..3)
            .map(|i| StorageAccount {
                id: format!("/subscriptions/a/resourceGroups/rg/providers/Microsoft.Storage/storageAccounts/acct{}", i),
                name: format!("acct{}", i),
                resource_group: "rg".to_string(),
                location: "eastus".to_string(),
                kind: "StorageV2".to_string(),
                sku_name: "Standard_GRS".to_string(),
                sku_tier: "Standard".to_string(),
                access_tier: Some("Cool".to_string()),
                creation_time: None,
                blob_endpoint: None,
                file_endpoint: None,
                subscription_id: "a".to_string(),
                used_capacity_bytes: Some(1536 * (i + 1)),
                blob_count: Some(10),
                blob_capacity_bytes: None,
            })
            .collect();
        ok.containers.push(ContainerSummary {
            account_name: "acct0".to_string(),
            resource_group: "rg".to_string(),
            name: "public-assets".to_string(),
            public_access: "Blob".to_string(),
            last_modified: None,
            lease_state: Some("Available".to_string()),
            has_immutability_policy: false,
            has_legal_hold: true,
        });
        ok.file_shares.push(FileShareSummary {
            account_name: "acct1".to_string(),
            resource_group: "rg".to_string(),
            name: "profiles".to_string(),
            quota_gib: Some(100),
            usage_bytes: Some(3 * 1024 * 1024 * 1024),
            access_tier: Some("Hot".to_string()),
            enabled_protocols: Some("SMB".to_string()),
            last_modified: None,
        });
        ok.cost = Some(CostSummary {
            total: 42.0,
            currency: "USD".to_string(),
            lookback_days: 30,
            by_service: [("Storage".to_string(), 42.0)].into_iter().collect(),
        });
        ok.warnings.push("acct2: file shares unavailable: 403".to_string());
        ok.recommendations =
            crate::analysis::recommendations::subscription_recommendations(&ok.storage_accounts);

        let failed = Err(AnalysisError::new(
            "b",
            AzureError::Api {
                status: 403,
                url: "https://management.azure.com/subscriptions/b".to_string(),
                body: "AuthorizationFailed: no access".to_string(),
            },
        ));

        aggregate(vec![(sub("a"), Ok(ok)), (sub("b"), failed)], metadata())
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# Azure Storage Cost Intelligence Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("Multi-subscription"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Storage Details"));
        assert!(markdown.contains("acct2"));
        assert!(markdown.contains("⚠️ Blob"));
        assert!(markdown.contains("legal hold"));
        assert!(markdown.contains("profiles"));
        assert!(markdown.contains("42.00 USD"));
        assert!(markdown.contains("## Failed Subscriptions"));
        assert!(markdown.contains("AuthorizationFailed"));
        assert!(markdown.contains("Consolidate Storage Accounts"));
        assert!(markdown.contains("| 9.0 KiB | 30 | 100 GiB | 3.0 GiB |"));
        assert!(markdown.contains("| 1.5 KiB | 10 |"));
    }

    #[test]
    fn test_report_options_hide_sections() {
        let report = create_test_report();
        let options = ReportConfig {
            include_account_details: false,
            include_recommendations: false,
        };
        let markdown = generate_markdown_report(&report, &options);

        assert!(!markdown.contains("## Storage Details"));
        assert!(!markdown.contains("## Recommendations"));
        assert!(markdown.contains("## Failed Subscriptions"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata, &report);

        assert!(section.contains("2024-06-01 08:30:00 UTC"));
        assert!(section.contains("explicit (a, b)"));
        assert!(section.contains("1 of 2"));
        assert!(section.contains("Subscriptions Failed:"));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024 * 1024), "5.0 TiB");
        assert_eq!(format_optional_bytes(None), "-");
    }

    #[test]
    fn test_partial_cost_is_flagged() {
        let mut with_cost = AnalysisResult::new(sub("a"));
        with_cost.cost = Some(CostSummary {
            total: 500.0,
            currency: "USD".to_string(),
            lookback_days: 90,
            ..CostSummary::default()
        });
        let without_cost = AnalysisResult::new(sub("b"));

        let report = aggregate(
            vec![(sub("a"), Ok(with_cost)), (sub("b"), Ok(without_cost))],
            metadata(),
        );

        assert_eq!(
            format_total_cost(&report.summary),
            "500.00 USD (partial: 1 of 2 subscriptions)"
        );
        assert!(console_summary(&report)
            .contains("Storage cost: 500.00 USD (partial: 1 of 2 subscriptions)"));
        let markdown = generate_markdown_report(&report, &ReportConfig::default());
        assert!(markdown.contains("Storage cost covers 1 of 2 analyzed subscriptions"));
    }

    #[test]
    fn test_escape_cell() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["results"].as_array().map(Vec::len), Some(1));
        assert_eq!(value["failures"][0]["subscription_id"], "b");
        assert_eq!(value["summary"]["storage_accounts"], 3);
    }

    #[test]
    fn test_default_output_path() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let path = default_output_path(Path::new("reports"), OutputFormat::Json, true, now);
        assert_eq!(
            path,
            PathBuf::from("reports/azure_storage_cir_multi_20240102_030405.json")
        );
    }

    #[test]
    fn test_write_report_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.md");

        write_report(&path, "# hello").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# hello");
    }

    #[test]
    fn test_console_summary() {
        let report = create_test_report();
        let text = console_summary(&report);
        assert!(text.contains("1 analyzed, 1 failed"));
        assert!(text.contains("Storage cost: 42.00 USD"));
        assert!(text.contains("❌ Sub b (b)"));
    }
}
