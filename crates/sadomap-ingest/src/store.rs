//! Per-area POI cache with single-flight ingestion.
//!
//! [`PoiStore::get_pois`] serves cached areas directly and ingests the rest
//! concurrently. A request for an area that is already being fetched joins
//! the running fetch instead of starting another one. When every caller
//! waiting on a fetch has gone away, the fetch is cancelled and nothing it
//! produced reaches the cache.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{join_all, BoxFuture, FutureExt, Shared};
use sadomap_core::{AreaCatalog, AreaConfig, AreaId, ConfigError, Poi};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{AreaError, IngestError};
use crate::events::{EventSink, IngestEvent, TracingSink};
use crate::normalize::Normalizer;
use crate::retry::{retry_with_backoff, RetryPolicy};
use crate::source::SourceReader;

type AreaResult = Result<Arc<[Poi]>, AreaError>;
type SharedFetch = Shared<BoxFuture<'static, AreaResult>>;

/// Result of one [`PoiStore::get_pois`] call. Partial results are valid:
/// `data` holds every area that succeeded, `errors` every area that did not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PoiBatch {
    pub data: Vec<Poi>,
    pub errors: Vec<AreaError>,
}

struct InFlight {
    ticket: u64,
    future: SharedFetch,
    cancel: CancellationToken,
    waiters: usize,
}

#[derive(Default)]
struct StoreState {
    cache: HashMap<AreaId, Arc<[Poi]>>,
    in_flight: HashMap<AreaId, InFlight>,
    /// Bumped by `invalidate`/`clear`; a fetch started under an older
    /// generation must not populate the cache.
    generations: HashMap<AreaId, u64>,
    next_ticket: u64,
}

impl StoreState {
    fn generation(&self, area: &AreaId) -> u64 {
        self.generations.get(area).copied().unwrap_or(0)
    }

    fn bump_generation(&mut self, area: &AreaId) {
        *self.generations.entry(area.clone()).or_insert(0) += 1;
    }
}

struct StoreInner {
    source: Arc<dyn SourceReader>,
    catalog: AreaCatalog,
    policy: RetryPolicy,
    normalizer: Normalizer,
    sink: Arc<dyn EventSink>,
    state: Mutex<StoreState>,
}

impl StoreInner {
    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache of ingested POIs keyed by area. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct PoiStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for PoiStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoiStore")
            .field("policy", &self.inner.policy)
            .field("cached_areas", &self.cached_areas())
            .finish_non_exhaustive()
    }
}

enum Pending {
    Ready(Arc<[Poi]>),
    Wait {
        area: AreaId,
        future: SharedFetch,
        guard: WaiterGuard,
    },
}

/// Leaves a shared fetch when dropped; the last waiter to leave cancels it.
struct WaiterGuard {
    inner: Arc<StoreInner>,
    area: AreaId,
    ticket: u64,
}

impl Drop for WaiterGuard {
    fn drop(&mut self) {
        let mut state = self.inner.lock();
        let Some(entry) = state.in_flight.get_mut(&self.area) else {
            return;
        };
        if entry.ticket != self.ticket {
            return;
        }
        entry.waiters = entry.waiters.saturating_sub(1);
        if entry.waiters == 0 {
            entry.cancel.cancel();
            state.in_flight.remove(&self.area);
            tracing::debug!(area = %self.area, "last waiter left; fetch abandoned");
        }
    }
}

impl PoiStore {
    /// Store that reports data-quality events through `tracing`.
    #[must_use]
    pub fn new(source: Arc<dyn SourceReader>, catalog: AreaCatalog, policy: RetryPolicy) -> Self {
        Self::with_sink(source, catalog, policy, Arc::new(TracingSink))
    }

    #[must_use]
    pub fn with_sink(
        source: Arc<dyn SourceReader>,
        catalog: AreaCatalog,
        policy: RetryPolicy,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let normalizer = Normalizer::for_catalog(&catalog);
        Self {
            inner: Arc::new(StoreInner {
                source,
                catalog,
                policy,
                normalizer,
                sink,
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// POIs for `areas`, merged in the given order.
    ///
    /// Cached areas are served from memory; the others are ingested
    /// concurrently and the call returns once all of them have settled.
    /// Repeated area ids are requested once. POIs sharing an id are merged
    /// last-write-wins and reported as [`IngestEvent::DuplicateIds`].
    ///
    /// Cancelling `cancel` (or dropping the returned future) stops waiting;
    /// areas not yet finished are reported as cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownArea`] before any fetch starts if an id
    /// is not in the catalog. Area-level failures are returned in
    /// [`PoiBatch::errors`], never as `Err`.
    pub async fn get_pois(
        &self,
        areas: &[AreaId],
        cancel: &CancellationToken,
    ) -> Result<PoiBatch, ConfigError> {
        let mut seen = HashSet::with_capacity(areas.len());
        let mut requested = Vec::with_capacity(areas.len());
        for id in areas {
            if !seen.insert(id) {
                continue;
            }
            let config = self
                .inner
                .catalog
                .get(id)
                .ok_or_else(|| ConfigError::UnknownArea(id.clone()))?;
            requested.push(config);
        }

        let pending = self.register(&requested);

        let waits = pending.into_iter().map(|pending| async move {
            match pending {
                Pending::Ready(pois) => Ok(pois),
                Pending::Wait {
                    area,
                    future,
                    guard,
                } => {
                    let _guard = guard;
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => Err(AreaError::cancelled(area)),
                        res = future => res,
                    }
                }
            }
        });
        let results = join_all(waits).await;

        Ok(self.merge(results))
    }

    /// Look each area up in the cache, join its in-flight fetch, or start
    /// a new one. Guards are created only after the lock is released.
    fn register(&self, requested: &[&AreaConfig]) -> Vec<Pending> {
        enum Slot {
            Ready(Arc<[Poi]>),
            Wait(AreaId, SharedFetch, u64),
        }

        let slots: Vec<Slot> = {
            let mut state = self.inner.lock();
            requested
                .iter()
                .map(|config| {
                    if let Some(pois) = state.cache.get(&config.id) {
                        tracing::debug!(area = %config.id, "cache hit");
                        return Slot::Ready(Arc::clone(pois));
                    }
                    if let Some(entry) = state.in_flight.get_mut(&config.id) {
                        entry.waiters += 1;
                        tracing::debug!(area = %config.id, waiters = entry.waiters, "joining in-flight fetch");
                        return Slot::Wait(config.id.clone(), entry.future.clone(), entry.ticket);
                    }

                    state.next_ticket += 1;
                    let ticket = state.next_ticket;
                    let generation = state.generation(&config.id);
                    let fetch_cancel = CancellationToken::new();
                    let future = ingest(
                        Arc::clone(&self.inner),
                        (*config).clone(),
                        fetch_cancel.clone(),
                        ticket,
                        generation,
                    )
                    .boxed()
                    .shared();
                    state.in_flight.insert(
                        config.id.clone(),
                        InFlight {
                            ticket,
                            future: future.clone(),
                            cancel: fetch_cancel,
                            waiters: 1,
                        },
                    );
                    Slot::Wait(config.id.clone(), future, ticket)
                })
                .collect()
        };

        slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Ready(pois) => Pending::Ready(pois),
                Slot::Wait(area, future, ticket) => Pending::Wait {
                    guard: WaiterGuard {
                        inner: Arc::clone(&self.inner),
                        area: area.clone(),
                        ticket,
                    },
                    area,
                    future,
                },
            })
            .collect()
    }

    fn merge(&self, results: Vec<AreaResult>) -> PoiBatch {
        let mut batch = PoiBatch::default();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut duplicates = Vec::new();

        for result in results {
            match result {
                Ok(pois) => {
                    for poi in pois.iter() {
                        if let Some(&idx) = positions.get(&poi.id) {
                            duplicates.push(poi.id.clone());
                            batch.data[idx] = poi.clone();
                        } else {
                            positions.insert(poi.id.clone(), batch.data.len());
                            batch.data.push(poi.clone());
                        }
                    }
                }
                Err(err) => batch.errors.push(err),
            }
        }

        if !duplicates.is_empty() {
            self.inner.sink.emit(IngestEvent::DuplicateIds {
                count: duplicates.len(),
                ids: duplicates,
            });
        }
        batch
    }

    /// Drop one area's cached POIs. A fetch already running for it still
    /// answers its current callers but will not populate the cache.
    pub fn invalidate(&self, area: &AreaId) {
        let mut state = self.inner.lock();
        state.cache.remove(area);
        state.in_flight.remove(area);
        state.bump_generation(area);
        tracing::debug!(%area, "cache entry invalidated");
    }

    /// Drop every cached area.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        let areas: Vec<AreaId> = state
            .cache
            .keys()
            .chain(state.in_flight.keys())
            .cloned()
            .collect();
        for area in &areas {
            state.bump_generation(area);
        }
        state.cache.clear();
        state.in_flight.clear();
        tracing::debug!(areas = areas.len(), "cache cleared");
    }

    #[must_use]
    pub fn is_cached(&self, area: &AreaId) -> bool {
        self.inner.lock().cache.contains_key(area)
    }

    /// Cached area ids, sorted.
    #[must_use]
    pub fn cached_areas(&self) -> Vec<AreaId> {
        let mut areas: Vec<AreaId> = self.inner.lock().cache.keys().cloned().collect();
        areas.sort();
        areas
    }
}

/// Fetch, normalize and cache one area. Runs inside a [`Shared`] future, so
/// it is driven by whichever waiter polls it.
async fn ingest(
    inner: Arc<StoreInner>,
    area: AreaConfig,
    cancel: CancellationToken,
    ticket: u64,
    generation: u64,
) -> AreaResult {
    let attempts = AtomicU32::new(0);
    let outcome = {
        let source: &dyn SourceReader = inner.source.as_ref();
        let config = &area;
        let counter = &attempts;
        retry_with_backoff(inner.policy, &cancel, area.id.as_str(), move || {
            counter.fetch_add(1, Ordering::Relaxed);
            source.fetch(config)
        })
        .await
    };
    let attempts = attempts.load(Ordering::Relaxed);

    let result = outcome.and_then(|sheet| {
        inner
            .normalizer
            .normalize_sheet(&area, &sheet, inner.sink.as_ref())
    });

    let mut state = inner.lock();
    if state
        .in_flight
        .get(&area.id)
        .is_some_and(|entry| entry.ticket == ticket)
    {
        state.in_flight.remove(&area.id);
    }

    match result {
        Ok(pois) => {
            let pois: Arc<[Poi]> = pois.into();
            if cancel.is_cancelled() || state.generation(&area.id) != generation {
                tracing::debug!(area = %area.id, "stale fetch; cache not updated");
            } else {
                state.cache.insert(area.id.clone(), Arc::clone(&pois));
                tracing::info!(area = %area.id, pois = pois.len(), attempts, "area cached");
            }
            Ok(pois)
        }
        Err(IngestError::Cancelled) => {
            tracing::debug!(area = %area.id, attempts, "fetch cancelled");
            Err(AreaError::cancelled(area.id))
        }
        Err(err) => {
            drop(state);
            let error = AreaError::from_ingest(area.id.clone(), &err, attempts);
            inner.sink.emit(IngestEvent::AreaFailed {
                area: area.id,
                attempts,
                error: err.to_string(),
            });
            Err(error)
        }
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
