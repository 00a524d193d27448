// unbloat-core/src/tracker.rs
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};
use unbloat_common::model::{
    AppView, Catalog, Direction, OperationResult, PackageEntry, PackageStatus, RiskFilter,
    SelectionSet,
};

/// Per-session view state: the package status cache, the current selection,
/// the active view and filter.
///
/// Status changes only through [`StatusTracker::reconcile`] (a fresh
/// inventory read) or [`StatusTracker::apply_result`] (a confirmed
/// operation). Selecting a package never changes its status.
#[derive(Debug, Default)]
pub struct StatusTracker {
    state: Mutex<TrackerState>,
}

#[derive(Debug, Default)]
struct TrackerState {
    view: AppView,
    filter: RiskFilter,
    statuses: HashMap<String, PackageStatus>,
    selection: SelectionSet,
    catalog: Option<Arc<Catalog>>,
    claimed: HashSet<String>,
}

impl TrackerState {
    fn selectable(&self, package_id: &str) -> bool {
        let status_matches =
            self.statuses.get(package_id) == Some(&self.view.required_status());
        status_matches && self.filter.admits(self.record(package_id))
    }

    fn record(&self, package_id: &str) -> Option<&unbloat_common::ClassificationRecord> {
        self.catalog.as_ref().and_then(|c| c.get(package_id))
    }

    fn prune_selection(&mut self) {
        let before = self.selection.len();
        let selection = std::mem::take(&mut self.selection);
        self.selection = selection
            .into_iter()
            .filter(|id| self.selectable(id))
            .collect();
        if self.selection.len() != before {
            debug!(
                "Dropped {} selections no longer valid for the current view",
                before - self.selection.len()
            );
        }
    }
}

/// Exclusive right to operate on one package. Released on drop.
#[derive(Debug)]
pub struct PackageClaim<'a> {
    tracker: &'a StatusTracker,
    package_id: String,
}

impl Drop for PackageClaim<'_> {
    fn drop(&mut self) {
        self.tracker.lock().claimed.remove(&self.package_id);
    }
}

impl StatusTracker {
    pub fn new(view: AppView) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                view,
                ..TrackerState::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replaces the status cache with a fresh inventory read.
    pub fn reconcile(&self, statuses: HashMap<String, PackageStatus>) {
        let mut state = self.lock();
        let changed = statuses
            .iter()
            .filter(|(id, status)| {
                state
                    .statuses
                    .get(id.as_str())
                    .is_some_and(|cached| cached != *status)
            })
            .count();
        if changed > 0 {
            warn!("{} cached package statuses disagreed with the device", changed);
        }
        debug!("Reconciled status cache with {} packages", statuses.len());
        state.statuses = statuses;
        state.prune_selection();
    }

    /// Installs the catalog used for annotation and risk filtering.
    pub fn set_catalog(&self, catalog: Arc<Catalog>) {
        let mut state = self.lock();
        state.catalog = Some(catalog);
        state.prune_selection();
    }

    pub fn status(&self, package_id: &str) -> Option<PackageStatus> {
        self.lock().statuses.get(package_id).copied()
    }

    pub fn view(&self) -> AppView {
        self.lock().view
    }

    pub fn filter(&self) -> RiskFilter {
        self.lock().filter
    }

    pub fn selection(&self) -> SelectionSet {
        self.lock().selection.clone()
    }

    pub fn is_selected(&self, package_id: &str) -> bool {
        self.lock().selection.contains(package_id)
    }

    /// Adds `package_id` to the selection if it belongs to the current view
    /// and passes the filter. Returns whether it is selected afterwards.
    pub fn select(&self, package_id: &str) -> bool {
        let mut state = self.lock();
        if state.selectable(package_id) {
            state.selection.insert(package_id.to_string());
            true
        } else {
            debug!(
                "Ignoring selection of '{}': not in the {:?} view",
                package_id, state.view
            );
            false
        }
    }

    pub fn deselect(&self, package_id: &str) -> bool {
        self.lock().selection.remove(package_id)
    }

    /// Selects every package currently visible. Returns the selection size.
    pub fn select_all_visible(&self) -> usize {
        let mut state = self.lock();
        let visible: Vec<String> = state
            .statuses
            .keys()
            .filter(|id| state.selectable(id))
            .cloned()
            .collect();
        state.selection.extend(visible);
        state.selection.len()
    }

    /// Switches tabs: the selection is cleared and the filter reset.
    pub fn switch_view(&self, view: AppView) {
        let mut state = self.lock();
        state.view = view;
        state.filter = RiskFilter::Any;
        state.selection.clear();
    }

    /// Changes the secondary filter, dropping selections it hides.
    pub fn set_filter(&self, filter: RiskFilter) {
        let mut state = self.lock();
        state.filter = filter;
        state.prune_selection();
    }

    /// Records the outcome of one package operation. On success the package
    /// takes the direction's target status and leaves the selection; on
    /// failure nothing changes so the user can retry.
    pub fn apply_result(&self, package_id: &str, direction: Direction, result: &OperationResult) {
        if !result.is_success() {
            return;
        }
        let mut state = self.lock();
        let target = direction.target_status();
        let previous = state.statuses.insert(package_id.to_string(), target);
        state.selection.remove(package_id);
        if previous != Some(target) {
            debug!(
                "Package '{}' is now {} (was {:?})",
                package_id, target, previous
            );
        }
    }

    /// Packages of the current view that pass the filter, with their catalog
    /// classification, ordered by identifier.
    pub fn visible_packages(&self) -> Vec<PackageEntry> {
        let state = self.lock();
        let mut entries: Vec<PackageEntry> = state
            .statuses
            .iter()
            .filter(|(id, _)| state.selectable(id))
            .map(|(id, status)| PackageEntry {
                package_id: id.clone(),
                status: *status,
                classification: state.record(id).cloned(),
                selected: state.selection.contains(id),
            })
            .collect();
        entries.sort_by(|a, b| a.package_id.cmp(&b.package_id));
        entries
    }

    /// Claims `package_id` for one operation; `None` if another operation on
    /// it is still in flight.
    pub fn claim(&self, package_id: &str) -> Option<PackageClaim<'_>> {
        let mut state = self.lock();
        if state.claimed.insert(package_id.to_string()) {
            Some(PackageClaim {
                tracker: self,
                package_id: package_id.to_string(),
            })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use unbloat_common::model::{ClassificationRecord, InstallOrigin, RemovalRisk};

    use super::*;

    fn statuses(entries: &[(&str, PackageStatus)]) -> HashMap<String, PackageStatus> {
        entries
            .iter()
            .map(|(id, status)| (id.to_string(), *status))
            .collect()
    }

    fn tracker() -> StatusTracker {
        let tracker = StatusTracker::new(AppView::Installed);
        tracker.reconcile(statuses(&[
            ("com.a", PackageStatus::Installed),
            ("com.b", PackageStatus::Installed),
            ("com.gone", PackageStatus::Uninstalled),
        ]));
        tracker
    }

    fn catalog() -> Arc<Catalog> {
        let record = |risk| ClassificationRecord {
            install_origin: InstallOrigin::Oem,
            description: String::new(),
            removal_risk: risk,
        };
        let mut records = BTreeMap::new();
        records.insert("com.a".to_string(), record(RemovalRisk::Recommended));
        records.insert("com.b".to_string(), record(RemovalRisk::Unsafe));
        Arc::new(Catalog::new("rev", records))
    }

    #[test]
    fn test_select_respects_view() {
        let tracker = tracker();
        assert!(tracker.select("com.a"));
        assert!(!tracker.select("com.gone"));
        assert!(!tracker.select("com.unknown"));
        assert_eq!(tracker.selection().len(), 1);

        // Selection alone never changes status.
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Installed));
    }

    #[test]
    fn test_success_flips_status_and_deselects() {
        let tracker = tracker();
        tracker.select("com.a");

        tracker.apply_result("com.a", Direction::Remove, &OperationResult::succeeded());

        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Uninstalled));
        assert!(!tracker.is_selected("com.a"));

        // Applying the same success again does not flip it back.
        tracker.apply_result("com.a", Direction::Remove, &OperationResult::succeeded());
        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Uninstalled));
    }

    #[test]
    fn test_deselect() {
        let tracker = tracker();
        tracker.select("com.a");

        assert!(tracker.deselect("com.a"));
        assert!(!tracker.is_selected("com.a"));
        assert!(!tracker.deselect("com.a"));
        assert!(!tracker.deselect("com.b"));
        assert!(tracker.selection().is_empty());
    }

    #[test]
    fn test_failure_changes_nothing() {
        let tracker = tracker();
        tracker.select("com.a");

        tracker.apply_result("com.a", Direction::Remove, &OperationResult::failed("denied"));

        assert_eq!(tracker.status("com.a"), Some(PackageStatus::Installed));
        assert!(tracker.is_selected("com.a"));
    }

    #[test]
    fn test_switch_view_clears_selection_and_filter() {
        let tracker = tracker();
        tracker.set_catalog(catalog());
        tracker.set_filter(RiskFilter::Only(RemovalRisk::Recommended));
        tracker.select("com.a");

        tracker.switch_view(AppView::Uninstalled);

        assert!(tracker.selection().is_empty());
        assert_eq!(tracker.filter(), RiskFilter::Any);
        assert!(tracker.select("com.gone"));
        assert!(!tracker.select("com.a"));
    }

    #[test]
    fn test_filter_prunes_selection() {
        let tracker = tracker();
        tracker.set_catalog(catalog());
        tracker.select("com.a");
        tracker.select("com.b");

        tracker.set_filter(RiskFilter::Only(RemovalRisk::Unsafe));

        assert_eq!(tracker.selection().into_iter().collect::<Vec<_>>(), ["com.b"]);
        assert!(!tracker.select("com.a"));
    }

    #[test]
    fn test_reconcile_drops_stale_selection() {
        let tracker = tracker();
        tracker.select("com.a");
        tracker.select("com.b");

        tracker.reconcile(statuses(&[
            ("com.a", PackageStatus::Uninstalled),
            ("com.b", PackageStatus::Installed),
        ]));

        assert!(!tracker.is_selected("com.a"));
        assert!(tracker.is_selected("com.b"));
        assert_eq!(tracker.status("com.gone"), None);
    }

    #[test]
    fn test_visible_packages_are_annotated() {
        let tracker = tracker();
        tracker.set_catalog(catalog());
        tracker.select("com.b");

        let visible = tracker.visible_packages();

        assert_eq!(visible.len(), 2);
        assert_eq!(visible[0].package_id, "com.a");
        assert_eq!(
            visible[0].classification.as_ref().map(|c| c.removal_risk),
            Some(RemovalRisk::Recommended)
        );
        assert!(visible[1].selected);
    }

    #[test]
    fn test_select_all_visible() {
        let tracker = tracker();
        assert_eq!(tracker.select_all_visible(), 2);
        tracker.switch_view(AppView::Uninstalled);
        assert_eq!(tracker.select_all_visible(), 1);
    }

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let tracker = tracker();
        let claim = tracker.claim("com.a").unwrap();
        assert!(tracker.claim("com.a").is_none());
        assert!(tracker.claim("com.b").is_some());

        drop(claim);
        assert!(tracker.claim("com.a").is_some());
    }
}
