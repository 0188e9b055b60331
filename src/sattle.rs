//! # Sattle engine
//!
//! [`Sattle`] owns the collaborators of the satellite-visibility pipeline and exposes its two
//! operations:
//!
//! ```text
//! register_visit:  request ─▶ Visit ─▶ catalog.fetch_records(as_of) ─▶ compute tracks ─▶ cache.put
//! whitelist:       request ─▶ cache.get(visit_id) ─▶ WhitelistFilter ─▶ outcome
//! ```
//!
//! Track computation is CPU bound and runs on the rayon pool from a
//! [`tokio::task::spawn_blocking`] task, so registering a visit never stalls the async
//! runtime. Nothing reaches the cache until the whole visit is computed.
//!
//! ## Example
//!
//! ```rust,no_run
//! use sattle::api::{RegisterVisitRequest, WhitelistRequest};
//! use sattle::catalog::tle_file::TleFileCatalog;
//! use sattle::config::SattleConfig;
//! use sattle::sattle::Sattle;
//!
//! # async fn run() -> Result<(), sattle::sattle_errors::SattleError> {
//! let config = SattleConfig::default();
//! let engine = Sattle::new(TleFileCatalog::new("catalog.tle"), &config)?;
//!
//! let visit: RegisterVisitRequest = serde_json::from_str(
//!     r#"{"visit_id": 1, "exposure_start_mjd": 60000.0, "exposure_end_mjd": 60000.0007,
//!         "boresight_ra": 10.0, "boresight_dec": 0.0}"#,
//! )?;
//! engine.register_visit(&visit).await?;
//!
//! let query: WhitelistRequest = serde_json::from_str(
//!     r#"{"visit_id": 1, "detector_id": 0, "diasources": []}"#,
//! )?;
//! let outcome = engine.whitelist(&query)?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{RegisterVisitRequest, WhitelistRequest};
use crate::catalog::ElementCatalog;
use crate::config::{CacheConfig, SattleConfig};
use crate::constants::VisitId;
use crate::propagation::{Sgp4SkyPropagator, SkyPropagator};
use crate::sattle_errors::SattleError;
use crate::visit::{Visit, VisitTrackComputer};
use crate::visit_cache::{spawn_eviction_task, VisitCache, VisitCacheEntry};
use crate::whitelist::{WhitelistFilter, WhitelistOutcome};

pub struct Sattle<C> {
    catalog: C,
    computer: VisitTrackComputer,
    cache: Arc<VisitCache>,
    filter: WhitelistFilter,
    cache_config: CacheConfig,
}

impl<C: ElementCatalog> Sattle<C> {
    /// Build an engine propagating with SGP4.
    pub fn new(catalog: C, config: &SattleConfig) -> Result<Self, SattleError> {
        Sattle::with_propagator(catalog, Arc::new(Sgp4SkyPropagator), config)
    }

    /// Build an engine around a given propagator.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::InvalidConfig`] / [`SattleError::InvalidSite`] if `config` does not
    ///   validate.
    pub fn with_propagator(
        catalog: C,
        propagator: Arc<dyn SkyPropagator>,
        config: &SattleConfig,
    ) -> Result<Self, SattleError> {
        config.validate()?;
        let site = Arc::new(config.observer_site()?);
        Ok(Sattle {
            catalog,
            computer: VisitTrackComputer::new(propagator, site, config.search_radius),
            cache: Arc::new(VisitCache::new(config.cache.shards)),
            filter: config.whitelist_filter()?,
            cache_config: config.cache,
        })
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn cache(&self) -> &Arc<VisitCache> {
        &self.cache
    }

    pub fn filter(&self) -> &WhitelistFilter {
        &self.filter
    }

    /// Validate a registration request and register its visit.
    pub async fn register_visit(
        &self,
        request: &RegisterVisitRequest,
    ) -> Result<Arc<VisitCacheEntry>, SattleError> {
        let visit = request.to_visit()?;
        self.register(visit, request.historical).await
    }

    /// Compute the tracks of `visit` and publish them, replacing any previous entry.
    ///
    /// Arguments
    /// -----------------
    /// * `visit`: The exposure to register.
    /// * `historical`: Use the element sets valid at the exposure start instead of the
    ///   latest ones.
    ///
    /// Return
    /// ----------
    /// * The entry visible for `visit.visit_id` when this registration published. It is a
    ///   newer registration's entry if one started after this call and published first.
    ///   It is returned even if an eviction sweep removes the visit right after.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::InvalidVisit`] for an invalid visit, [`SattleError::CatalogUnavailable`]
    ///   if no element set can be fetched. The cache is left untouched in both cases.
    pub async fn register(
        &self,
        visit: Visit,
        historical: bool,
    ) -> Result<Arc<VisitCacheEntry>, SattleError> {
        visit.validate()?;
        let visit_id = visit.visit_id;
        let generation = self.cache.next_generation();
        debug!(visit_id, generation, historical, "registering visit");

        let as_of = historical.then(|| visit.start_epoch());
        let records = self.catalog.fetch_records(as_of).await?;

        let computer = self.computer.clone();
        let (visit, tracks) = tokio::task::spawn_blocking(move || {
            let tracks = computer.compute(&visit, &records);
            (visit, tracks)
        })
        .await?;

        let publication = self
            .cache
            .put(VisitCacheEntry::new(visit, tracks, historical, generation));
        if publication.is_published() {
            info!(visit_id, generation, "visit registered");
        }
        Ok(publication.into_entry())
    }

    /// Classify the DiaSources of `request` against the cached tracks of its visit.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::VisitNotFound`] if the visit was never registered or was evicted.
    pub fn whitelist(&self, request: &WhitelistRequest) -> Result<WhitelistOutcome, SattleError> {
        self.filter.filter_visit(
            &self.cache,
            request.visit_id,
            request.detector_id,
            &request.diasources,
        )
    }

    pub fn visit_entry(&self, visit_id: VisitId) -> Result<Arc<VisitCacheEntry>, SattleError> {
        self.cache.get(visit_id)
    }

    /// Start the periodic cache sweep configured in `cache.max_age_secs`.
    pub fn spawn_eviction(&self) -> tokio::task::JoinHandle<()> {
        spawn_eviction_task(
            Arc::clone(&self.cache),
            self.cache_config.eviction_interval(),
            self.cache_config.max_age(),
        )
    }
}
