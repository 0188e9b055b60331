//! # Visits and satellite tracks
//!
//! A [`Visit`] is one exposure: a time window and the boresight pointing. The
//! [`VisitTrackComputer`] propagates every catalog object to the two exposure endpoints and
//! keeps the objects that come within the search radius of the boresight at either of
//! them, producing one [`Track`] (start → end) per retained object.
//!
//! ```text
//!  catalog ──par_iter──▶ propagate(start), propagate(end)
//!                          │
//!                          ├─ failure ─────────────▶ SkippedObject
//!                          ├─ sep > r at both ends ─▶ dropped
//!                          └─ sep ≤ r at one end ──▶ Track (both endpoints kept)
//! ```
//!
//! Objects are independent of each other, so the loop runs on the rayon pool. The output
//! is sorted by catalog number so two runs over the same inputs publish identical entries.

use std::sync::Arc;

use hifitime::Epoch;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{
    ArcSec, CatalogNumber, Degree, VisitId, DEG_PER_ARCSEC, MJD, SECONDS_PER_DAY,
};
use crate::conversion::{angular_separation_deg, normalize_ra_deg};
use crate::observers::ObserverSite;
use crate::orbital_elements::OrbitalElementRecord;
use crate::propagation::{SkyPosition, SkyPropagator};
use crate::sattle_errors::SattleError;
use crate::time::epoch_from_mjd_tai;

/// One exposure. Times are MJD in the TAI scale, angles are decimal degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: VisitId,
    pub exposure_start: MJD,
    pub exposure_end: MJD,
    pub boresight_ra: Degree,
    pub boresight_dec: Degree,
}

impl Visit {
    /// Build a validated visit.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::InvalidVisit`] for non-finite values, an exposure ending before it
    ///   starts, or a declination outside [−90°, 90°].
    pub fn new(
        visit_id: VisitId,
        exposure_start: MJD,
        exposure_end: MJD,
        boresight_ra: Degree,
        boresight_dec: Degree,
    ) -> Result<Visit, SattleError> {
        let visit = Visit {
            visit_id,
            exposure_start,
            exposure_end,
            boresight_ra,
            boresight_dec,
        };
        visit.validate()?;
        Ok(visit)
    }

    pub fn validate(&self) -> Result<(), SattleError> {
        let values = [
            self.exposure_start,
            self.exposure_end,
            self.boresight_ra,
            self.boresight_dec,
        ];
        if !values.iter().all(|v| v.is_finite()) {
            return Err(SattleError::InvalidVisit(format!(
                "visit {}: non-finite time or pointing",
                self.visit_id
            )));
        }
        if self.exposure_end < self.exposure_start {
            return Err(SattleError::InvalidVisit(format!(
                "visit {}: exposure ends ({}) before it starts ({})",
                self.visit_id, self.exposure_end, self.exposure_start
            )));
        }
        if self.boresight_dec.abs() > 90.0 {
            return Err(SattleError::InvalidVisit(format!(
                "visit {}: boresight declination {} outside [-90, 90]",
                self.visit_id, self.boresight_dec
            )));
        }
        Ok(())
    }

    pub fn start_epoch(&self) -> Epoch {
        epoch_from_mjd_tai(self.exposure_start)
    }

    pub fn end_epoch(&self) -> Epoch {
        epoch_from_mjd_tai(self.exposure_end)
    }

    pub fn exposure_seconds(&self) -> f64 {
        (self.exposure_end - self.exposure_start) * SECONDS_PER_DAY
    }
}

/// How far from the boresight an object may be and still be kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchRadius {
    /// A constant radius in degrees.
    Fixed { degrees: Degree },
    /// Detector radius plus a margin growing with the exposure length:
    /// `(detector_radius + search_buffer · exposure_seconds) / 3600` degrees.
    ExposureScaled {
        /// Radius of the focal plane in arcseconds.
        detector_radius: ArcSec,
        /// Apparent-motion margin in arcseconds per second of exposure.
        search_buffer: ArcSec,
    },
}

impl Default for SearchRadius {
    fn default() -> Self {
        SearchRadius::Fixed { degrees: 10.0 }
    }
}

impl SearchRadius {
    /// Production values of the exposure-scaled radius (1.75° focal plane, 1680″/s).
    pub fn rubin_exposure_scaled() -> Self {
        SearchRadius::ExposureScaled {
            detector_radius: 6300.0,
            search_buffer: 1680.0,
        }
    }

    /// Radius in degrees for an exposure of `exposure_seconds`.
    pub fn degrees_for(&self, exposure_seconds: f64) -> Degree {
        match *self {
            SearchRadius::Fixed { degrees } => degrees,
            SearchRadius::ExposureScaled {
                detector_radius,
                search_buffer,
            } => (detector_radius + search_buffer * exposure_seconds) * DEG_PER_ARCSEC,
        }
    }

    pub fn validate(&self) -> Result<(), SattleError> {
        let ok = match *self {
            SearchRadius::Fixed { degrees } => degrees.is_finite() && degrees > 0.0,
            SearchRadius::ExposureScaled {
                detector_radius,
                search_buffer,
            } => {
                detector_radius.is_finite()
                    && search_buffer.is_finite()
                    && detector_radius > 0.0
                    && search_buffer >= 0.0
            }
        };
        if ok {
            Ok(())
        } else {
            Err(SattleError::InvalidConfig(format!(
                "invalid search radius {self:?}"
            )))
        }
    }
}

/// Apparent path of one object during one exposure, J2000 decimal degrees.
///
/// `start_ra`/`end_ra` are in [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub catalog_number: CatalogNumber,
    pub start_ra: Degree,
    pub start_dec: Degree,
    pub end_ra: Degree,
    pub end_dec: Degree,
}

impl Track {
    pub fn from_positions(
        catalog_number: CatalogNumber,
        start: &SkyPosition,
        end: &SkyPosition,
    ) -> Self {
        Track {
            catalog_number,
            start_ra: normalize_ra_deg(start.ra_deg()),
            start_dec: start.dec_deg(),
            end_ra: normalize_ra_deg(end.ra_deg()),
            end_dec: end.dec_deg(),
        }
    }

    pub fn start(&self) -> (Degree, Degree) {
        (self.start_ra, self.start_dec)
    }

    pub fn end(&self) -> (Degree, Degree) {
        (self.end_ra, self.end_dec)
    }

    /// Smallest of the two endpoint separations from `(ra, dec)`, in degrees.
    pub fn min_endpoint_separation(&self, ra: Degree, dec: Degree) -> Degree {
        angular_separation_deg(ra, dec, self.start_ra, self.start_dec).min(
            angular_separation_deg(ra, dec, self.end_ra, self.end_dec),
        )
    }
}

/// An object that could not be evaluated for a visit, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedObject {
    pub catalog_number: CatalogNumber,
    pub reason: String,
}

/// Everything the track computer produced for one visit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisitTracks {
    pub tracks: Vec<Track>,
    pub skipped: Vec<SkippedObject>,
    /// Radius (degrees) actually applied.
    pub search_radius: Degree,
}

enum ObjectOutcome {
    Retained(Track),
    OutOfField,
    Skipped(SkippedObject),
}

/// Propagates a catalog over a visit and keeps the objects near the boresight.
#[derive(Clone)]
pub struct VisitTrackComputer {
    propagator: Arc<dyn SkyPropagator>,
    site: Arc<ObserverSite>,
    search_radius: SearchRadius,
}

impl VisitTrackComputer {
    pub fn new(
        propagator: Arc<dyn SkyPropagator>,
        site: Arc<ObserverSite>,
        search_radius: SearchRadius,
    ) -> Self {
        VisitTrackComputer {
            propagator,
            site,
            search_radius,
        }
    }

    pub fn search_radius(&self) -> SearchRadius {
        self.search_radius
    }

    pub fn site(&self) -> &ObserverSite {
        &self.site
    }

    /// Compute the tracks of a visit.
    ///
    /// Arguments
    /// -----------------
    /// * `visit`: The exposure to evaluate.
    /// * `records`: The catalog snapshot (live or historical).
    ///
    /// Return
    /// ----------
    /// * The retained tracks sorted by catalog number, plus the objects whose propagation
    ///   failed. A propagation failure never fails the visit.
    pub fn compute(&self, visit: &Visit, records: &[OrbitalElementRecord]) -> VisitTracks {
        let radius = self.search_radius.degrees_for(visit.exposure_seconds());
        let epochs = [visit.start_epoch(), visit.end_epoch()];

        let outcomes: Vec<ObjectOutcome> = records
            .par_iter()
            .map(|record| self.evaluate(visit, record, &epochs, radius))
            .collect();

        let mut result = VisitTracks {
            search_radius: radius,
            ..VisitTracks::default()
        };
        for outcome in outcomes {
            match outcome {
                ObjectOutcome::Retained(track) => result.tracks.push(track),
                ObjectOutcome::Skipped(skipped) => result.skipped.push(skipped),
                ObjectOutcome::OutOfField => {}
            }
        }
        result.tracks.sort_by_key(|track| track.catalog_number);
        result.skipped.sort_by_key(|skipped| skipped.catalog_number);

        info!(
            visit_id = visit.visit_id,
            objects = records.len(),
            retained = result.tracks.len(),
            skipped = result.skipped.len(),
            search_radius = radius,
            "visit tracks computed"
        );
        result
    }

    fn evaluate(
        &self,
        visit: &Visit,
        record: &OrbitalElementRecord,
        epochs: &[Epoch; 2],
        radius: Degree,
    ) -> ObjectOutcome {
        let positions = match self.propagator.sky_positions(record, &self.site, epochs) {
            Ok(positions) if positions.len() == 2 => positions,
            Ok(positions) => {
                return ObjectOutcome::Skipped(SkippedObject {
                    catalog_number: record.catalog_number(),
                    reason: format!("expected 2 positions, got {}", positions.len()),
                })
            }
            Err(e) => {
                warn!(
                    visit_id = visit.visit_id,
                    catalog_number = record.catalog_number(),
                    error = %e,
                    "skipping object"
                );
                return ObjectOutcome::Skipped(SkippedObject {
                    catalog_number: record.catalog_number(),
                    reason: e.to_string(),
                });
            }
        };

        let track = Track::from_positions(record.catalog_number(), &positions[0], &positions[1]);
        let separation = track.min_endpoint_separation(visit.boresight_ra, visit.boresight_dec);

        if separation <= radius {
            debug!(
                visit_id = visit.visit_id,
                catalog_number = track.catalog_number,
                separation,
                "object retained"
            );
            ObjectOutcome::Retained(track)
        } else {
            ObjectOutcome::OutOfField
        }
    }
}

#[cfg(test)]
mod visit_test {
    use super::*;
    use crate::catalog::catalog_test::record_for;
    use crate::constants::RADEG;
    use crate::observers::SiteConfig;
    use crate::propagation::Sgp4SkyPropagator;
    use approx::assert_abs_diff_eq;
    use std::collections::HashMap;

    /// Returns a fixed (start, end) position pair per catalog number, or an error.
    struct Scripted(HashMap<CatalogNumber, Option<[(Degree, Degree); 2]>>);

    impl SkyPropagator for Scripted {
        fn sky_position(
            &self,
            _record: &OrbitalElementRecord,
            _site: &ObserverSite,
            _epoch: &Epoch,
        ) -> Result<SkyPosition, SattleError> {
            unreachable!("the computer asks for both endpoints at once")
        }

        fn sky_positions(
            &self,
            record: &OrbitalElementRecord,
            _site: &ObserverSite,
            _epochs: &[Epoch],
        ) -> Result<Vec<SkyPosition>, SattleError> {
            match self.0.get(&record.catalog_number()) {
                Some(Some(ends)) => Ok(ends
                    .iter()
                    .map(|(ra, dec)| SkyPosition {
                        ra: ra * RADEG,
                        dec: dec * RADEG,
                        range: 1000.0,
                    })
                    .collect()),
                _ => Err(SattleError::Propagation {
                    catalog_number: record.catalog_number(),
                    reason: "scripted failure".into(),
                }),
            }
        }
    }

    fn site() -> Arc<ObserverSite> {
        Arc::new(ObserverSite::from_config(&SiteConfig::default()).unwrap())
    }

    fn visit() -> Visit {
        Visit::new(1, 60000.0, 60000.0007, 10.0, 0.0).unwrap()
    }

    #[test]
    fn test_visit_validation() {
        assert!(Visit::new(1, 60000.0, 60000.0, 10.0, 0.0).is_ok());
        assert!(matches!(
            Visit::new(1, 60000.1, 60000.0, 10.0, 0.0),
            Err(SattleError::InvalidVisit(_))
        ));
        assert!(Visit::new(1, f64::NAN, 60000.0, 10.0, 0.0).is_err());
        assert!(Visit::new(1, 60000.0, 60000.1, 10.0, 91.0).is_err());
        assert!(Visit::new(1, 60000.0, 60000.1, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_search_radius() {
        assert_eq!(SearchRadius::default().degrees_for(30.0), 10.0);

        // 6300″ + 1680″/s · 30 s = 56700″ = 15.75°
        assert_abs_diff_eq!(
            SearchRadius::rubin_exposure_scaled().degrees_for(30.0),
            15.75,
            epsilon = 1e-12
        );
        assert_abs_diff_eq!(
            SearchRadius::rubin_exposure_scaled().degrees_for(0.0),
            1.75,
            epsilon = 1e-12
        );

        assert!(SearchRadius::Fixed { degrees: 0.0 }.validate().is_err());
        assert!(SearchRadius::Fixed { degrees: f64::NAN }.validate().is_err());
        assert!(SearchRadius::rubin_exposure_scaled().validate().is_ok());
    }

    #[test]
    fn test_search_radius_serde() {
        let json = r#"{"mode": "exposure_scaled", "detector_radius": 6300.0, "search_buffer": 1680.0}"#;
        let radius: SearchRadius = serde_json::from_str(json).unwrap();
        assert_eq!(radius, SearchRadius::rubin_exposure_scaled());

        let json = r#"{"mode": "fixed", "degrees": 5.0}"#;
        let radius: SearchRadius = serde_json::from_str(json).unwrap();
        assert_eq!(radius, SearchRadius::Fixed { degrees: 5.0 });
    }

    #[test]
    fn test_retention_rules() {
        let script = HashMap::from([
            // Both endpoints inside the field
            (1, Some([(10.05, 0.02), (10.15, 0.03)])),
            // Only the end is inside
            (2, Some([(25.0, 0.0), (15.0, 0.0)])),
            // Only the start is inside
            (3, Some([(5.0, -3.0), (40.0, -3.0)])),
            // Both outside
            (4, Some([(200.0, -50.0), (201.0, -50.0)])),
            // Propagation failure
            (5, None),
        ]);
        let records: Vec<_> = [5, 4, 3, 2, 1]
            .iter()
            .map(|n| record_for(*n, "20194.50000000"))
            .collect();

        let computer = VisitTrackComputer::new(
            Arc::new(Scripted(script)),
            site(),
            SearchRadius::default(),
        );
        let result = computer.compute(&visit(), &records);

        let numbers: Vec<_> = result.tracks.iter().map(|t| t.catalog_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(result.search_radius, 10.0);

        // Both endpoints are kept even when one lies outside the radius
        assert_abs_diff_eq!(result.tracks[1].start_ra, 25.0, epsilon = 1e-9);
        assert_abs_diff_eq!(result.tracks[1].end_ra, 15.0, epsilon = 1e-9);

        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].catalog_number, 5);
        assert!(result.skipped[0].reason.contains("scripted failure"));

        for track in &result.tracks {
            assert!(track.min_endpoint_separation(10.0, 0.0) <= 10.0);
        }
    }

    #[test]
    fn test_wraparound_boresight() {
        let script = HashMap::from([(1, Some([(359.0, 0.0), (358.5, 0.1)]))]);
        let records = vec![record_for(1, "20194.50000000")];
        let computer = VisitTrackComputer::new(
            Arc::new(Scripted(script)),
            site(),
            SearchRadius::Fixed { degrees: 2.0 },
        );
        let visit = Visit::new(7, 60000.0, 60000.0007, 0.5, 0.0).unwrap();
        let result = computer.compute(&visit, &records);
        assert_eq!(result.tracks.len(), 1);
    }

    #[test]
    fn test_track_normalizes_ra() {
        let start = SkyPosition {
            ra: -0.5 * RADEG,
            dec: 0.0,
            range: 1.0,
        };
        let end = SkyPosition {
            ra: 360.5 * RADEG,
            dec: 1.0 * RADEG,
            range: 1.0,
        };
        let track = Track::from_positions(9, &start, &end);
        assert_abs_diff_eq!(track.start_ra, 359.5, epsilon = 1e-9);
        assert_abs_diff_eq!(track.end_ra, 0.5, epsilon = 1e-9);
        assert_abs_diff_eq!(track.end_dec, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sgp4_backed_computation() {
        // The ISS seen from Cerro Pachón, with a radius covering the whole sky: every
        // object is retained and both endpoints are finite
        let records = vec![record_for(25544, "20194.88612269")];
        let computer = VisitTrackComputer::new(
            Arc::new(Sgp4SkyPropagator),
            site(),
            SearchRadius::Fixed { degrees: 180.0 },
        );
        let visit = Visit::new(3, 59042.9, 59042.9003, 120.0, -30.0).unwrap();
        let result = computer.compute(&visit, &records);

        assert!(result.skipped.is_empty());
        assert_eq!(result.tracks.len(), 1);
        let track = result.tracks[0];
        assert!((0.0..360.0).contains(&track.start_ra));
        assert!(track.start_dec.abs() <= 90.0);
        assert!((0.0..360.0).contains(&track.end_ra));
        assert!(track.end_dec.abs() <= 90.0);
        assert_ne!(track.start(), track.end());
    }
}
