//! Bounded fan-out of the per-subscription analyzer.

use crate::error::AnalysisError;
use crate::models::{AnalysisResult, Subscription};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, info, warn};

/// Analysis routine run once per selected subscription.
///
/// Implementations must not share mutable state between calls; the runner
/// may invoke `analyze` for several subscriptions at once.
#[async_trait]
pub trait SubscriptionAnalyzer: Send + Sync {
    async fn analyze(&self, subscription: &Subscription) -> Result<AnalysisResult, AnalysisError>;
}

/// Outcome of analyzing one subscription, paired with the subscription.
pub type Outcome = (Subscription, Result<AnalysisResult, AnalysisError>);

/// Analyze every subscription with at most `max_workers` in flight.
///
/// Outcomes come back in the same order as `subscriptions`, whatever order
/// the analyses finish in.
pub async fn analyze_all<A>(
    analyzer: &A,
    subscriptions: Vec<Subscription>,
    max_workers: usize,
    progress: Option<&ProgressBar>,
) -> Vec<Outcome>
where
    A: SubscriptionAnalyzer + ?Sized,
{
    let workers = max_workers.max(1);
    info!(
        "Analyzing {} subscription(s) with {} worker(s)",
        subscriptions.len(),
        workers
    );

    stream::iter(subscriptions.into_iter().map(|subscription| async move {
        debug!("Starting analysis of {}", subscription);
        let result = analyzer.analyze(&subscription).await;

        match result {
            Ok(ref r) => info!(
                "✓ {}: {} storage accounts in {:.1}s",
                subscription.name,
                r.storage_accounts.len(),
                r.duration_seconds
            ),
            Err(ref e) => warn!("✗ {}: {}", subscription.name, e),
        }

        if let Some(bar) = progress {
            bar.set_message(subscription.name.clone());
            bar.inc(1);
        }

        (subscription, result)
    }))
    .buffered(workers)
    .collect()
    .await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::AzureError;
    use crate::models::SubscriptionState;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    pub(crate) fn sub(id: &str) -> Subscription {
        Subscription {
            id: id.to_string(),
            name: format!("Sub {}", id),
            tenant_id: None,
            state: SubscriptionState::Enabled,
            is_default: false,
        }
    }

    /// Fails subscriptions whose id starts with "bad"; earlier ids sleep longer.
    struct MockAnalyzer {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        delays_ms: Vec<u64>,
    }

    impl MockAnalyzer {
        fn new(delays_ms: Vec<u64>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                delays_ms,
            }
        }
    }

    #[async_trait]
    impl SubscriptionAnalyzer for MockAnalyzer {
        async fn analyze(
            &self,
            subscription: &Subscription,
        ) -> Result<AnalysisResult, AnalysisError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let index: usize = subscription
                .id
                .trim_start_matches(|c: char| !c.is_ascii_digit())
                .parse()
                .unwrap_or(0);
            let delay = self.delays_ms.get(index).copied().unwrap_or(1);
            tokio::time::sleep(Duration::from_millis(delay)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if subscription.id.starts_with("bad") {
                Err(AnalysisError::new(
                    &subscription.id,
                    AzureError::Api {
                        status: 403,
                        url: "https://management.azure.com/x".to_string(),
                        body: "AuthorizationFailed: denied".to_string(),
                    },
                ))
            } else {
                Ok(AnalysisResult::new(subscription.clone()))
            }
        }
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_others() {
        let analyzer = MockAnalyzer::new(vec![5, 5, 5]);
        let subs = vec![sub("ok0"), sub("bad1"), sub("ok2")];

        let outcomes = analyze_all(&analyzer, subs, 3, None).await;

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].1.is_ok());
        assert!(outcomes[1].1.is_err());
        assert!(outcomes[2].1.is_ok());
    }

    #[tokio::test]
    async fn test_order_follows_selection_not_completion() {
        // First subscription finishes last.
        let analyzer = MockAnalyzer::new(vec![40, 20, 1]);
        let subs = vec![sub("s0"), sub("s1"), sub("s2")];

        let outcomes = analyze_all(&analyzer, subs, 3, None).await;
        let ids: Vec<&str> = outcomes.iter().map(|(s, _)| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s0", "s1", "s2"]);
    }

    #[test]
    fn test_worker_limit_is_respected() {
        let analyzer = MockAnalyzer::new(vec![10; 6]);
        let subs: Vec<Subscription> = (0..6).map(|i| sub(&format!("s{}", i))).collect();

        let outcomes = tokio_test::block_on(analyze_all(&analyzer, subs, 2, None));

        assert_eq!(outcomes.len(), 6);
        assert_eq!(analyzer.peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_progress_bar_advances() {
        let analyzer = MockAnalyzer::new(vec![]);
        let bar = ProgressBar::hidden();
        bar.set_length(2);

        analyze_all(&analyzer, vec![sub("a0"), sub("a1")], 0, Some(&bar)).await;
        assert_eq!(bar.position(), 2);
    }
}
