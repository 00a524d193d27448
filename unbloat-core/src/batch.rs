// unbloat-core/src/batch.rs
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::model::{BatchEvent, BatchReport, Direction, OperationResult, SelectionSet};

use crate::cancel::CancellationToken;
use crate::tracker::StatusTracker;

/// Delegated-privilege service able to run package-manager operations.
#[async_trait]
pub trait PrivilegedChannel: Send + Sync {
    async fn has_permission(&self) -> bool;

    /// Asks for permission; the outcome is observed later through
    /// `has_permission`.
    async fn request_permission(&self);

    async fn uninstall(&self, package_id: &str) -> bool;

    async fn reinstall(&self, package_id: &str) -> bool;
}

/// Applies one direction to every package of a selection through the
/// privileged channel, updating the tracker as each package completes.
pub struct BatchOrchestrator {
    channel: Arc<dyn PrivilegedChannel>,
    tracker: Arc<StatusTracker>,
    op_timeout: Duration,
    events: Option<broadcast::Sender<BatchEvent>>,
}

impl BatchOrchestrator {
    pub fn new(
        channel: Arc<dyn PrivilegedChannel>,
        tracker: Arc<StatusTracker>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            channel,
            tracker,
            op_timeout,
            events: None,
        }
    }

    pub fn with_events(mut self, events: broadcast::Sender<BatchEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Runs the batch. Without channel permission nothing is touched and
    /// `PermissionDenied` is returned; otherwise every package is attempted
    /// once (or skipped after cancellation) and reported individually.
    pub async fn run_batch(
        &self,
        selection: &SelectionSet,
        direction: Direction,
        cancel: &CancellationToken,
    ) -> Result<BatchReport> {
        let permitted = match tokio::time::timeout(self.op_timeout, self.channel.has_permission())
            .await
        {
            Ok(permitted) => permitted,
            Err(_) => {
                warn!("Permission check timed out after {:?}", self.op_timeout);
                false
            }
        };
        if !permitted {
            warn!(
                "Refusing to {} {} packages: privileged channel permission missing",
                direction,
                selection.len()
            );
            return Err(UnbloatError::PermissionDenied);
        }

        info!("Starting {} of {} packages", direction, selection.len());
        self.emit(BatchEvent::BatchStarted {
            direction,
            total: selection.len(),
        });

        let mut report = BatchReport::new(direction);
        for package_id in selection {
            if cancel.is_cancelled() {
                debug!("Batch cancelled; skipping '{}'", package_id);
                report.skipped.push(package_id.clone());
                self.emit(BatchEvent::PackageSkipped {
                    package_id: package_id.clone(),
                });
                continue;
            }

            self.emit(BatchEvent::PackageStarted {
                package_id: package_id.clone(),
            });
            let result = self.run_one(package_id, direction).await;
            self.emit(BatchEvent::PackageFinished {
                package_id: package_id.clone(),
                result: result.clone(),
            });
            report.results.insert(package_id.clone(), result);
        }

        info!(
            "Finished {}: {} succeeded, {} failed, {} skipped",
            direction,
            report.succeeded(),
            report.failed(),
            report.skipped.len()
        );
        self.emit(BatchEvent::BatchFinished {
            succeeded: report.succeeded(),
            failed: report.failed(),
            skipped: report.skipped.len(),
        });
        Ok(report)
    }

    async fn run_one(&self, package_id: &str, direction: Direction) -> OperationResult {
        let Some(_claim) = self.tracker.claim(package_id) else {
            warn!("'{}' already has an operation in flight", package_id);
            return OperationResult::failed("another operation on this package is in progress");
        };

        // Read at dispatch time, not batch start.
        let target = direction.target_status();
        if self.tracker.status(package_id) == Some(target) {
            debug!("'{}' is already {}; nothing to do", package_id, target);
            let result = OperationResult::succeeded_with(format!("already {target}"));
            self.tracker.apply_result(package_id, direction, &result);
            return result;
        }

        let invocation = async {
            match direction {
                Direction::Remove => self.channel.uninstall(package_id).await,
                Direction::Restore => self.channel.reinstall(package_id).await,
            }
        };
        let result = match tokio::time::timeout(self.op_timeout, invocation).await {
            Ok(true) => {
                debug!("✓ {} '{}'", direction, package_id);
                OperationResult::succeeded()
            }
            Ok(false) => {
                error!("✖ Failed to {} '{}'", direction, package_id);
                OperationResult::failed("privileged channel reported failure")
            }
            Err(_) => {
                error!(
                    "✖ {} '{}' timed out after {:?}",
                    direction, package_id, self.op_timeout
                );
                OperationResult::failed(format!("timed out after {:?}", self.op_timeout))
            }
        };
        self.tracker.apply_result(package_id, direction, &result);
        result
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use unbloat_common::model::{AppView, Outcome, PackageStatus};

    use super::*;

    #[derive(Default)]
    struct FakeChannel {
        denied: bool,
        failing: HashSet<String>,
        delay: Option<Duration>,
        cancel_after_first: Option<CancellationToken>,
        uninstalls: Mutex<Vec<String>>,
        reinstalls: Mutex<Vec<String>>,
        permission_requests: AtomicUsize,
    }

    impl FakeChannel {
        fn calls(&self) -> usize {
            self.uninstalls.lock().unwrap().len() + self.reinstalls.lock().unwrap().len()
        }

        async fn dispatch(&self, log: &Mutex<Vec<String>>, package_id: &str) -> bool {
            log.lock().unwrap().push(package_id.to_string());
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            !self.failing.contains(package_id)
        }
    }

    #[async_trait]
    impl PrivilegedChannel for FakeChannel {
        async fn has_permission(&self) -> bool {
            !self.denied
        }

        async fn request_permission(&self) {
            self.permission_requests.fetch_add(1, Ordering::SeqCst);
        }

        async fn uninstall(&self, package_id: &str) -> bool {
            self.dispatch(&self.uninstalls, package_id).await
        }

        async fn reinstall(&self, package_id: &str) -> bool {
            self.dispatch(&self.reinstalls, package_id).await
        }
    }

    fn tracker(entries: &[(&str, PackageStatus)]) -> Arc<StatusTracker> {
        let tracker = StatusTracker::new(AppView::Installed);
        tracker.reconcile(
            entries
                .iter()
                .map(|(id, status)| (id.to_string(), *status))
                .collect::<HashMap<_, _>>(),
        );
        Arc::new(tracker)
    }

    fn selection(ids: &[&str]) -> SelectionSet {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn orchestrator(channel: &Arc<FakeChannel>, tracker: &Arc<StatusTracker>) -> BatchOrchestrator {
        let channel: Arc<dyn PrivilegedChannel> = channel.clone();
        BatchOrchestrator::new(channel, Arc::clone(tracker), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_permission_denied_touches_nothing() {
        let channel = Arc::new(FakeChannel {
            denied: true,
            ..FakeChannel::default()
        });
        let tracker = tracker(&[("com.a", PackageStatus::Installed)]);
        tracker.select("com.a");

        let err = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a"]), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, UnbloatError::PermissionDenied));
        assert_eq!(channel.calls(), 0);
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Installed));
        assert!(tracker.is_selected("com.a"));
    }

    #[tokio::test]
    async fn test_partial_failure_does_not_stop_the_batch() {
        let channel = Arc::new(FakeChannel {
            failing: HashSet::from(["com.b".to_string()]),
            ..FakeChannel::default()
        });
        let tracker = tracker(&[
            ("com.a", PackageStatus::Installed),
            ("com.b", PackageStatus::Installed),
        ]);
        tracker.select("com.a");
        tracker.select("com.b");

        let report = orchestrator(&channel, &tracker)
            .run_batch(&tracker.selection(), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results["com.a"].outcome, Outcome::Succeeded);
        assert_eq!(report.results["com.b"].outcome, Outcome::Failed);
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Uninstalled));
        assert_eq!(tracker.status("com.b"), Some(PackageStatus::Installed));
        assert!(!tracker.is_selected("com.a"));
        assert!(tracker.is_selected("com.b"));
    }

    #[tokio::test]
    async fn test_already_in_target_state_skips_the_channel() {
        let channel = Arc::new(FakeChannel::default());
        let tracker = tracker(&[("com.a", PackageStatus::Uninstalled)]);

        let report = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a"]), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.results["com.a"].is_success());
        assert_eq!(channel.calls(), 0);
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Uninstalled));
    }

    #[tokio::test]
    async fn test_restore_uses_reinstall() {
        let channel = Arc::new(FakeChannel::default());
        let tracker = tracker(&[("com.a", PackageStatus::Uninstalled)]);

        let report = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a"]), Direction::Restore, &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_clean());
        assert_eq!(*channel.reinstalls.lock().unwrap(), vec!["com.a".to_string()]);
        assert!(channel.uninstalls.lock().unwrap().is_empty());
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Installed));
    }

    #[tokio::test]
    async fn test_cancellation_takes_effect_between_packages() {
        let cancel = CancellationToken::new();
        let channel = Arc::new(FakeChannel {
            cancel_after_first: Some(cancel.clone()),
            ..FakeChannel::default()
        });
        let tracker = tracker(&[
            ("com.a", PackageStatus::Installed),
            ("com.b", PackageStatus::Installed),
            ("com.c", PackageStatus::Installed),
        ]);

        let report = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a", "com.b", "com.c"]), Direction::Remove, &cancel)
            .await
            .unwrap();

        // The dispatched invocation completes and stays valid.
        assert!(report.results["com.a"].is_success());
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Uninstalled));
        assert_eq!(report.skipped, vec!["com.b".to_string(), "com.c".to_string()]);
        assert_eq!(tracker.status("com.b"), Some(PackageStatus::Installed));
        assert_eq!(channel.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_invocation_times_out_as_failure() {
        let channel = Arc::new(FakeChannel {
            delay: Some(Duration::from_secs(60)),
            ..FakeChannel::default()
        });
        let tracker = tracker(&[("com.a", PackageStatus::Installed)]);

        let report = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a"]), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap();

        let result = &report.results["com.a"];
        assert_eq!(result.outcome, Outcome::Failed);
        assert!(result.detail.as_deref().unwrap().contains("timed out"));
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Installed));
    }

    #[tokio::test]
    async fn test_claimed_package_is_not_dispatched() {
        let channel = Arc::new(FakeChannel::default());
        let tracker = tracker(&[("com.a", PackageStatus::Installed)]);
        let _claim = tracker.claim("com.a").unwrap();

        let report = orchestrator(&channel, &tracker)
            .run_batch(&selection(&["com.a"]), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.results["com.a"].outcome, Outcome::Failed);
        assert_eq!(channel.calls(), 0);
    }

    #[tokio::test]
    async fn test_progress_events_are_emitted_in_order() {
        let channel = Arc::new(FakeChannel::default());
        let tracker = tracker(&[("com.a", PackageStatus::Installed)]);
        let (tx, mut rx) = broadcast::channel(16);

        orchestrator(&channel, &tracker)
            .with_events(tx)
            .run_batch(&selection(&["com.a"]), Direction::Remove, &CancellationToken::new())
            .await
            .unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(
            events,
            vec![
                BatchEvent::BatchStarted {
                    direction: Direction::Remove,
                    total: 1
                },
                BatchEvent::PackageStarted {
                    package_id: "com.a".to_string()
                },
                BatchEvent::PackageFinished {
                    package_id: "com.a".to_string(),
                    result: OperationResult::succeeded()
                },
                BatchEvent::BatchFinished {
                    succeeded: 1,
                    failed: 0,
                    skipped: 0
                },
            ]
        );
    }
}
