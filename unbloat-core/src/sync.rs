// unbloat-core/src/sync.rs
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, warn};
use unbloat_common::error::{Result, UnbloatError};
use unbloat_common::model::Catalog;
use unbloat_net::CatalogSource;

use crate::store::CatalogStore;

/// What a `sync` call produced.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub catalog: Arc<Catalog>,
    /// True when the catalog was fetched by this sync rather than reused.
    pub refreshed: bool,
    /// Non-fatal failure; `catalog` is then the previously cached one.
    pub notice: Option<UnbloatError>,
}

type InFlight = Shared<BoxFuture<'static, Result<SyncReport>>>;

/// Keeps the local catalog in step with the remote one.
///
/// Concurrent `sync` calls coalesce: whoever arrives while a sync is running
/// awaits that same run and receives the same report.
pub struct CatalogSynchronizer {
    inner: Arc<SyncInner>,
    in_flight: Mutex<Option<(u64, InFlight)>>,
    next_run: AtomicU64,
}

struct SyncInner {
    source: Arc<dyn CatalogSource>,
    store: CatalogStore,
    current: RwLock<Option<Arc<Catalog>>>,
}

impl CatalogSynchronizer {
    pub fn new(source: Arc<dyn CatalogSource>, store: CatalogStore) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                source,
                store,
                current: RwLock::new(None),
            }),
            in_flight: Mutex::new(None),
            next_run: AtomicU64::new(0),
        }
    }

    pub fn store(&self) -> &CatalogStore {
        &self.inner.store
    }

    /// The catalog currently in use, loading the cached copy on first call.
    pub fn current(&self) -> Option<Arc<Catalog>> {
        self.inner.cached_catalog()
    }

    /// Compares the stored revision with a freshly fetched remote revision.
    /// True on mismatch or when nothing has been stored yet.
    pub async fn needs_update(&self) -> Result<bool> {
        self.inner.needs_update().await
    }

    /// Returns the cached catalog if it is current (and `force` is false),
    /// otherwise fetches, parses and persists a new one. Refresh failures fall
    /// back to the cached catalog and are reported through
    /// [`SyncReport::notice`]; only "no catalog at all" is an error.
    pub async fn sync(&self, force: bool) -> Result<SyncReport> {
        let (run_id, run) = {
            let mut slot = lock(&self.in_flight);
            match slot.as_ref() {
                Some((run_id, run)) => {
                    debug!("Catalog sync already in flight; awaiting its result");
                    (*run_id, run.clone())
                }
                None => {
                    let run_id = self.next_run.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let run = async move { inner.run(force).await }.boxed().shared();
                    *slot = Some((run_id, run.clone()));
                    (run_id, run)
                }
            }
        };

        let report = run.await;

        let mut slot = lock(&self.in_flight);
        if matches!(slot.as_ref(), Some((current, _)) if *current == run_id) {
            *slot = None;
        }
        report
    }
}

impl SyncInner {
    async fn run(&self, force: bool) -> Result<SyncReport> {
        let cached = self.cached_catalog();

        if let (false, Some(catalog)) = (force, &cached) {
            match self.needs_update().await {
                Ok(false) => {
                    debug!("Catalog revision {} is current", catalog.revision());
                    return Ok(SyncReport {
                        catalog: Arc::clone(catalog),
                        refreshed: false,
                        notice: None,
                    });
                }
                Ok(true) => debug!("Remote catalog revision changed; refreshing"),
                Err(e) => {
                    warn!("Catalog revision check failed, keeping cached catalog: {}", e);
                    return Ok(SyncReport {
                        catalog: Arc::clone(catalog),
                        refreshed: false,
                        notice: Some(e),
                    });
                }
            }
        }

        match self.refresh().await {
            Ok((catalog, notice)) => Ok(SyncReport {
                catalog,
                refreshed: true,
                notice,
            }),
            Err(e) => match cached {
                Some(catalog) => {
                    warn!("Catalog refresh failed, keeping cached catalog: {}", e);
                    Ok(SyncReport {
                        catalog,
                        refreshed: false,
                        notice: Some(e),
                    })
                }
                None => Err(UnbloatError::NoCatalog(Box::new(e))),
            },
        }
    }

    /// Revision of the catalog in memory, else the stored one. The in-memory
    /// revision wins so a failed persist does not force a refetch every time.
    fn local_revision(&self) -> Option<String> {
        let in_memory = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|catalog| catalog.revision().to_string());
        in_memory.or_else(|| {
            self.store.load_revision().unwrap_or_else(|e| {
                warn!("Could not read stored catalog revision: {}", e);
                None
            })
        })
    }

    async fn needs_update(&self) -> Result<bool> {
        let local = self.local_revision();
        let remote = self.source.fetch_revision().await?;
        let stale = local.as_deref() != Some(remote.as_str());
        debug!(
            "Catalog revision local={:?} remote={} stale={}",
            local, remote, stale
        );
        Ok(stale)
    }

    async fn refresh(&self) -> Result<(Arc<Catalog>, Option<UnbloatError>)> {
        let fetched = self.source.fetch().await?;
        let catalog = Arc::new(Catalog::parse(fetched.revision.as_str(), &fetched.raw)?);
        info!(
            "Catalog refreshed to revision {} ({} packages)",
            catalog.revision(),
            catalog.len()
        );

        let notice = match self.store.store_catalog(&fetched.raw, &fetched.revision) {
            Ok(()) => None,
            Err(e) => {
                warn!("Catalog fetched but could not be persisted: {}", e);
                Some(UnbloatError::Cache(format!("Failed to persist catalog: {e}")))
            }
        };

        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&catalog));
        Ok((catalog, notice))
    }

    fn cached_catalog(&self) -> Option<Arc<Catalog>> {
        if let Some(catalog) = self
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Some(Arc::clone(catalog));
        }

        let loaded = self.load_from_store()?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        Some(Arc::clone(current.get_or_insert(loaded)))
    }

    fn load_from_store(&self) -> Option<Arc<Catalog>> {
        let (raw, revision) = match (self.store.load_catalog_bytes(), self.store.load_revision()) {
            (Ok(Some(raw)), Ok(Some(revision))) => (raw, revision),
            (Err(e), _) | (_, Err(e)) => {
                warn!("Could not read cached catalog: {}", e);
                return None;
            }
            _ => {
                debug!("No cached catalog in {}", self.store.dir().display());
                return None;
            }
        };
        match Catalog::parse(revision, &raw) {
            Ok(catalog) => {
                debug!(
                    "Loaded cached catalog revision {} ({} packages)",
                    catalog.revision(),
                    catalog.len()
                );
                Some(Arc::new(catalog))
            }
            Err(e) => {
                warn!("Cached catalog is unreadable, ignoring it: {}", e);
                None
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
