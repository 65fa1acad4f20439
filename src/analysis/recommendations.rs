//! Recommendation rows attached to subscriptions and to the whole report.

use crate::models::{Priority, Recommendation, ReportSummary, StorageAccount};

/// Storage spend above which an enterprise-wide cost review is suggested.
pub const ENTERPRISE_REVIEW_THRESHOLD: f64 = 1000.0;

/// Recommendations for one subscription's storage accounts.
pub fn subscription_recommendations(accounts: &[StorageAccount]) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if !accounts.is_empty() {
        recommendations.push(Recommendation {
            category: "Cost Optimization".to_string(),
            title: "Review Storage Account SKUs".to_string(),
            description: format!(
                "Analyze {} storage accounts for right-sizing opportunities",
                accounts.len()
            ),
            priority: Priority::Medium,
            potential_savings: "Requires detailed usage analysis".to_string(),
        });
    }

    if accounts.len() > 2 {
        recommendations.push(Recommendation {
            category: "Management".to_string(),
            title: "Consolidate Storage Accounts".to_string(),
            description: format!(
                "Consider consolidating {} storage accounts to reduce management overhead",
                accounts.len()
            ),
            priority: Priority::Low,
            potential_savings: "Operational efficiency gains".to_string(),
        });
    }

    recommendations
}

/// Recommendations spanning every analyzed subscription.
pub fn portfolio_recommendations(summary: &ReportSummary) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    if summary.subscriptions_succeeded > 1 {
        recommendations.push(Recommendation {
            category: "Enterprise Management".to_string(),
            title: "Multi-Subscription Governance".to_string(),
            description: format!(
                "Implement governance across {} subscriptions and {} storage accounts",
                summary.subscriptions_succeeded, summary.storage_accounts
            ),
            priority: Priority::High,
            potential_savings: "Significant operational efficiency".to_string(),
        });
    }

    if let Some(total) = summary.total_cost {
        if total > ENTERPRISE_REVIEW_THRESHOLD {
            let currency = summary.currency.as_deref().unwrap_or("USD");
            let scope = if summary.cost_is_partial() {
                format!(
                    "the {} of {} subscriptions that reported costs",
                    summary.subscriptions_with_cost, summary.subscriptions_succeeded
                )
            } else {
                "all subscriptions".to_string()
            };
            recommendations.push(Recommendation {
                category: "Cost Optimization".to_string(),
                title: "Enterprise Cost Review".to_string(),
                description: format!(
                    "Review {:.2} {} in storage costs across {}",
                    total, currency, scope
                ),
                priority: Priority::High,
                potential_savings: format!(
                    "Potential 15-30% savings ({:.2} - {:.2} {})",
                    total * 0.15,
                    total * 0.30,
                    currency
                ),
            });
        }
    }

    recommendations
}
