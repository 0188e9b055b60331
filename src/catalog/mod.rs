//! # Orbital element catalogs
//!
//! A catalog is the injected source of [`OrbitalElementRecord`]s. The visit pipeline only
//! needs one operation from it, [`ElementCatalog::fetch_records`], which returns either the
//! latest element sets (`as_of = None`) or, in **historical mode**, the element sets that
//! were valid around a past instant.
//!
//! ## Implementations
//!
//! - [`StaticCatalog`]: fixed in-memory record list (tests, replays).
//! - [`tle_file::TleFileCatalog`]: reads a two- or three-line TLE text file.
//! - [`CachedCatalog`]: memoises the live set of another catalog for a refresh interval.
//! - `space_track::SpaceTrackCatalog` (feature `space-track`): queries space-track.org.
//!
//! ## Historical selection
//!
//! Every implementation applies the same rule through [`select_as_of`]: for each catalog
//! number, keep the record whose epoch is nearest `as_of`, among the records within
//! ± `window_days` of it. A window holding no record at all is reported as
//! [`SattleError::CatalogUnavailable`] (see [`historical_set`]), never as an empty sky.
//!
//! ```text
//!           as_of − w            as_of            as_of + w
//! ─────────────[────────x──────────|───x──────────────]────── x = record epochs
//!                                      ▲ kept
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use hifitime::Epoch;
use itertools::Itertools;
use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::orbital_elements::OrbitalElementRecord;
use crate::sattle_errors::SattleError;
use crate::time::days_between;

pub mod tle_file;

#[cfg(feature = "space-track")]
pub mod space_track;

/// An immutable snapshot of catalog records, shared between concurrent visit computations.
pub type ElementSet = Arc<Vec<OrbitalElementRecord>>;

/// Default half-width of the historical epoch window, in days (≈ 4.4 hours).
pub const DEFAULT_HISTORICAL_WINDOW_DAYS: f64 = 0.1833;

/// Source of orbital element records.
pub trait ElementCatalog: Send + Sync {
    /// Fetch the records valid for propagation.
    ///
    /// Arguments
    /// -----------------
    /// * `as_of`: `None` for the latest available set, or the instant the records must be
    ///   valid at (historical mode).
    ///
    /// Return
    /// ----------
    /// * The record snapshot, or [`SattleError::CatalogUnavailable`] when the source cannot be
    ///   reached or yields nothing usable.
    fn fetch_records(
        &self,
        as_of: Option<Epoch>,
    ) -> impl Future<Output = Result<ElementSet, SattleError>> + Send;
}

/// Keep, per catalog number, the record nearest `as_of` within ± `window_days`.
///
/// The result is sorted by catalog number.
pub fn select_as_of(
    records: &[OrbitalElementRecord],
    as_of: &Epoch,
    window_days: f64,
) -> Vec<OrbitalElementRecord> {
    records
        .iter()
        .filter(|record| days_between(as_of, &record.epoch()).abs() <= window_days)
        .into_grouping_map_by(|record| record.catalog_number())
        .min_by_key(|_, record| OrderedFloat(days_between(as_of, &record.epoch()).abs()))
        .into_values()
        .sorted_by_key(|record| record.catalog_number())
        .cloned()
        .collect()
}

/// [`select_as_of`] for a catalog fetch: an empty selection is an error.
///
/// Return
/// ----------
/// * The selected records, or [`SattleError::CatalogUnavailable`] when no record of any
///   object falls within ± `window_days` of `as_of`.
pub fn historical_set(
    records: &[OrbitalElementRecord],
    as_of: &Epoch,
    window_days: f64,
) -> Result<ElementSet, SattleError> {
    let selected = select_as_of(records, as_of, window_days);
    if selected.is_empty() {
        warn!(
            %as_of,
            window_days,
            records = records.len(),
            "no element set in the historical window"
        );
        return Err(SattleError::CatalogUnavailable(format!(
            "no element set within ±{window_days} d of {as_of}"
        )));
    }
    debug!(%as_of, selected = selected.len(), "historical element sets selected");
    Ok(Arc::new(selected))
}

/// A fixed, in-memory catalog.
#[derive(Debug, Clone)]
pub struct StaticCatalog {
    records: ElementSet,
    window_days: f64,
}

impl StaticCatalog {
    pub fn new(records: Vec<OrbitalElementRecord>) -> Self {
        StaticCatalog {
            records: Arc::new(records),
            window_days: DEFAULT_HISTORICAL_WINDOW_DAYS,
        }
    }

    pub fn with_historical_window(mut self, window_days: f64) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl ElementCatalog for StaticCatalog {
    async fn fetch_records(&self, as_of: Option<Epoch>) -> Result<ElementSet, SattleError> {
        match as_of {
            None => Ok(Arc::clone(&self.records)),
            Some(as_of) => historical_set(&self.records, &as_of, self.window_days),
        }
    }
}

/// Memoises the live record set of an inner catalog.
///
/// The first live request (or the first one after `refresh` has elapsed) goes to the inner
/// catalog; the others are served from the stored snapshot. Historical requests are never
/// cached since each one targets a different instant.
pub struct CachedCatalog<C> {
    inner: C,
    refresh: Duration,
    snapshot: Mutex<Option<(Instant, ElementSet)>>,
}

impl<C: ElementCatalog> CachedCatalog<C> {
    pub fn new(inner: C, refresh: Duration) -> Self {
        CachedCatalog {
            inner,
            refresh,
            snapshot: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    /// Drop the stored snapshot so the next live request refetches.
    pub fn invalidate(&self) {
        *self.snapshot.lock() = None;
    }

    fn fresh_snapshot(&self) -> Option<ElementSet> {
        let guard = self.snapshot.lock();
        guard
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < self.refresh)
            .map(|(_, records)| Arc::clone(records))
    }
}

impl<C: ElementCatalog> ElementCatalog for CachedCatalog<C> {
    async fn fetch_records(&self, as_of: Option<Epoch>) -> Result<ElementSet, SattleError> {
        if as_of.is_some() {
            return self.inner.fetch_records(as_of).await;
        }

        if let Some(records) = self.fresh_snapshot() {
            debug!(records = records.len(), "serving live catalog from memory");
            return Ok(records);
        }

        let records = self.inner.fetch_records(None).await?;
        info!(records = records.len(), "live catalog refreshed");
        *self.snapshot.lock() = Some((Instant::now(), Arc::clone(&records)));
        Ok(records)
    }
}
