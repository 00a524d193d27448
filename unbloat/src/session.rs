// unbloat/src/session.rs
//! Everything one invocation works with, built once and handed to commands.

use std::env;
use std::sync::Arc;

use colored::Colorize;
use tracing::{debug, warn};
use unbloat_common::config::Config;
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::model::{AppView, Catalog};
use unbloat_common::preferences::Preferences;
use unbloat_core::{AdbBridge, CatalogStore, CatalogSynchronizer, PackageInventory, StatusTracker};
use unbloat_net::{CatalogSource, HttpCatalogFetcher};

pub struct Session {
    pub config: Config,
    pub store: CatalogStore,
    pub preferences: Preferences,
    pub synchronizer: CatalogSynchronizer,
    pub tracker: Arc<StatusTracker>,
    pub bridge: Arc<AdbBridge>,
}

impl Session {
    /// `system_only` limits the device inventory to system packages.
    pub fn open(config: Config, system_only: bool) -> Result<Self> {
        let store = CatalogStore::new(&config)?;
        let preferences = store.load_preferences();
        debug!("Loaded preferences: {:?}", preferences);

        let fetcher: Arc<dyn CatalogSource> = Arc::new(HttpCatalogFetcher::new(&config)?);
        let synchronizer = CatalogSynchronizer::new(fetcher, store.clone());
        let bridge = Arc::new(AdbBridge::new(&config).with_system_only(system_only));

        Ok(Self {
            config,
            store,
            preferences,
            synchronizer,
            tracker: Arc::new(StatusTracker::new(AppView::Installed)),
            bridge,
        })
    }

    fn auto_update_enabled(&self) -> bool {
        if env::var("UNBLOAT_NO_AUTO_UPDATE").is_ok_and(|v| v == "1") {
            debug!("Auto-update disabled via UNBLOAT_NO_AUTO_UPDATE=1.");
            return false;
        }
        self.preferences.auto_update_catalog
    }

    /// Catalog used to annotate packages. Refreshes first when auto-update is
    /// on; otherwise uses the cached copy and only goes to the network when
    /// nothing is cached. `None` means "carry on without annotations".
    pub async fn catalog_for_display(&self) -> Option<Arc<Catalog>> {
        if !self.auto_update_enabled() {
            if let Some(catalog) = self.synchronizer.current() {
                return Some(catalog);
            }
        }

        match self.synchronizer.sync(false).await {
            Ok(report) => {
                if report.refreshed {
                    println!(
                        "{}{} {}",
                        "==> ".bold().blue(),
                        "Catalog updated to".bold(),
                        report.catalog.revision()
                    );
                }
                match (&report.notice, report.refreshed) {
                    (Some(notice), false) => eprintln!(
                        "{} Using cached catalog ({}): {}",
                        "Warning:".yellow(),
                        report.catalog.revision(),
                        notice
                    ),
                    (Some(notice), true) => eprintln!("{} {}", "Warning:".yellow(), notice),
                    (None, _) => {}
                }
                Some(report.catalog)
            }
            Err(e) => {
                warn!("No catalog available: {}", e);
                eprintln!(
                    "{} No catalog available, packages will be shown without classification: {}",
                    "Warning:".yellow(),
                    e
                );
                None
            }
        }
    }

    /// Reads the device inventory into the tracker.
    pub async fn refresh_inventory(&self) -> Result<()> {
        let statuses = self.bridge.read_statuses().await.map_err(|e| {
            UnbloatError::CommandExecError(format!(
                "Could not list packages on the device (is it connected with USB debugging enabled?): {e}"
            ))
        })?;
        self.tracker.reconcile(statuses);
        Ok(())
    }

    pub async fn prepare(&self) -> Result<Option<Arc<Catalog>>> {
        let catalog = self.catalog_for_display().await;
        if let Some(catalog) = &catalog {
            self.tracker.set_catalog(Arc::clone(catalog));
        }
        self.refresh_inventory().await?;
        Ok(catalog)
    }
}
