//! # Sky propagation
//!
//! Turns one [`OrbitalElementRecord`] into an apparent **topocentric** direction, referred to
//! **J2000**, for a ground observer at a given instant.
//!
//! ```text
//! record ──SGP4/SDP4──▶ r_sat (TEME, km)
//!                          │  − r_obs(t)  (ObserverSite::geocentric_position)
//!                          ▼
//!                 topocentric vector of date ──P(t)ᵀ──▶ J2000 (ra, dec, range)
//! ```
//!
//! The numerical kernel is the `sgp4` crate. It works in two regimes, near-Earth (SGP4) and
//! deep-space (SDP4), split at a 225 minute orbital period; [`PropagationRegime`] mirrors
//! that split so failures and logs can say which one was involved.
//!
//! TEME is treated as the mean equator and equinox of date. The difference is the equation
//! of the equinoxes, at most about 1.1 s of time (≈ 17″, 0.005°) in right ascension, which
//! stays below the 0.01° default streak half-width.

use std::fmt;

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::constants::{Kilometer, Radian, DEEP_SPACE_PERIOD_MINUTES, RADEG};
use crate::conversion::spherical_from_cartesian;
use crate::observers::ObserverSite;
use crate::orbital_elements::OrbitalElementRecord;
use crate::ref_system::mean_of_date_to_j2000;
use crate::sattle_errors::SattleError;

/// The two propagation regimes of the SGP4 family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropagationRegime {
    /// Period below 225 minutes: SGP4 with atmospheric drag.
    NearEarth,
    /// Period of 225 minutes or more: SDP4 with lunar/solar perturbations and resonances.
    DeepSpace,
}

impl PropagationRegime {
    pub fn from_period(period_minutes: f64) -> Self {
        if period_minutes >= DEEP_SPACE_PERIOD_MINUTES {
            PropagationRegime::DeepSpace
        } else {
            PropagationRegime::NearEarth
        }
    }

    pub fn of(record: &OrbitalElementRecord) -> Self {
        PropagationRegime::from_period(record.orbital_period_minutes())
    }
}

impl fmt::Display for PropagationRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropagationRegime::NearEarth => write!(f, "near-Earth"),
            PropagationRegime::DeepSpace => write!(f, "deep-space"),
        }
    }
}

/// Apparent direction and distance of an object as seen from the observer.
///
/// `ra` and `dec` are J2000 and in **radians**; `range` is in **kilometers**.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyPosition {
    pub ra: Radian,
    pub dec: Radian,
    pub range: Kilometer,
}

impl SkyPosition {
    pub fn ra_deg(&self) -> f64 {
        self.ra / RADEG
    }

    pub fn dec_deg(&self) -> f64 {
        self.dec / RADEG
    }
}

/// Initialised SGP4/SDP4 state for one element record.
///
/// Building the kernel constants is the expensive part of propagation, so a visit builds
/// them once per object and evaluates both exposure endpoints from the same state.
pub struct Kernel<'a> {
    record: &'a OrbitalElementRecord,
    regime: PropagationRegime,
    constants: sgp4::Constants,
}

impl<'a> Kernel<'a> {
    pub fn new(record: &'a OrbitalElementRecord) -> Result<Self, SattleError> {
        let regime = PropagationRegime::of(record);
        let constants = sgp4::Constants::from_elements(record.elements()).map_err(|e| {
            SattleError::Propagation {
                catalog_number: record.catalog_number(),
                reason: format!("{regime} initialisation: {e}"),
            }
        })?;
        Ok(Kernel {
            record,
            regime,
            constants,
        })
    }

    pub fn regime(&self) -> PropagationRegime {
        self.regime
    }

    /// Geocentric TEME position (km) `minutes` after the element epoch.
    pub fn position(&self, minutes: f64) -> Result<Vector3<Kilometer>, SattleError> {
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|e| SattleError::Propagation {
                catalog_number: self.record.catalog_number(),
                reason: format!("{} propagation at {minutes:.3} min: {e}", self.regime),
            })?;

        let position = Vector3::from(prediction.position);
        if !position.iter().all(|c| c.is_finite()) {
            return Err(SattleError::Propagation {
                catalog_number: self.record.catalog_number(),
                reason: "non-finite state vector".into(),
            });
        }
        Ok(position)
    }

    /// Geocentric TEME position (km) at an absolute instant.
    pub fn position_at(&self, epoch: &Epoch) -> Result<Vector3<Kilometer>, SattleError> {
        self.position(self.record.minutes_since_epoch(epoch))
    }
}

/// Geocentric TEME position of `record`, `minutes` after its epoch.
pub fn propagate_position(
    record: &OrbitalElementRecord,
    minutes: f64,
) -> Result<Vector3<Kilometer>, SattleError> {
    Kernel::new(record)?.position(minutes)
}

/// Convert a geocentric position of date into the observer's J2000 sky frame.
///
/// Arguments
/// -----------------
/// * `position`: Geocentric position of the object (km), equator and equinox of date.
/// * `site`: The observer.
/// * `epoch`: Observation instant.
///
/// Return
/// ----------
/// * The topocentric [`SkyPosition`] with the precession of date removed.
pub fn topocentric_sky_position(
    position: &Vector3<Kilometer>,
    site: &ObserverSite,
    epoch: &Epoch,
) -> SkyPosition {
    let topocentric = position - site.geocentric_position(epoch);
    let j2000 = mean_of_date_to_j2000(epoch.to_mjd_tt_days()) * topocentric;
    let (ra, dec, range) = spherical_from_cartesian(&j2000);
    SkyPosition { ra, dec, range }
}

/// Source of topocentric sky positions.
///
/// The visit track computer only talks to this trait, so tests can substitute scripted
/// positions for the SGP4 kernel.
pub trait SkyPropagator: Send + Sync {
    /// Position of `record` seen from `site` at `epoch`.
    fn sky_position(
        &self,
        record: &OrbitalElementRecord,
        site: &ObserverSite,
        epoch: &Epoch,
    ) -> Result<SkyPosition, SattleError>;

    /// Positions at several instants. Any failure fails the whole object.
    fn sky_positions(
        &self,
        record: &OrbitalElementRecord,
        site: &ObserverSite,
        epochs: &[Epoch],
    ) -> Result<Vec<SkyPosition>, SattleError> {
        epochs
            .iter()
            .map(|epoch| self.sky_position(record, site, epoch))
            .collect()
    }
}

/// [`SkyPropagator`] backed by the `sgp4` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sgp4SkyPropagator;

impl SkyPropagator for Sgp4SkyPropagator {
    fn sky_position(
        &self,
        record: &OrbitalElementRecord,
        site: &ObserverSite,
        epoch: &Epoch,
    ) -> Result<SkyPosition, SattleError> {
        let position = Kernel::new(record)?.position_at(epoch)?;
        Ok(topocentric_sky_position(&position, site, epoch))
    }

    fn sky_positions(
        &self,
        record: &OrbitalElementRecord,
        site: &ObserverSite,
        epochs: &[Epoch],
    ) -> Result<Vec<SkyPosition>, SattleError> {
        let kernel = Kernel::new(record)?;
        epochs
            .iter()
            .map(|epoch| {
                let position = kernel.position_at(epoch)?;
                Ok(topocentric_sky_position(&position, site, epoch))
            })
            .collect()
    }
}

#[cfg(test)]
mod propagation_test {
    use super::*;
    use crate::conversion::angular_separation;
    use crate::observers::SiteConfig;
    use crate::orbital_elements::orbital_elements_test::{
        GPS_LINE1, GPS_LINE2, ISS_LINE1, ISS_LINE2,
    };
    use crate::ref_system::prec;
    use approx::assert_abs_diff_eq;
    use hifitime::Duration;

    fn iss() -> OrbitalElementRecord {
        OrbitalElementRecord::from_tle(None, ISS_LINE1, ISS_LINE2).unwrap()
    }

    fn gps() -> OrbitalElementRecord {
        OrbitalElementRecord::from_tle(None, GPS_LINE1, GPS_LINE2).unwrap()
    }

    fn rubin() -> ObserverSite {
        ObserverSite::from_config(&SiteConfig::default()).unwrap()
    }

    #[test]
    fn test_regime_selection() {
        assert_eq!(PropagationRegime::from_period(92.9), PropagationRegime::NearEarth);
        assert_eq!(PropagationRegime::from_period(224.99), PropagationRegime::NearEarth);
        assert_eq!(PropagationRegime::from_period(225.0), PropagationRegime::DeepSpace);
        assert_eq!(PropagationRegime::of(&iss()), PropagationRegime::NearEarth);
        assert_eq!(PropagationRegime::of(&gps()), PropagationRegime::DeepSpace);
    }

    #[test]
    fn test_near_earth_position() {
        let r = propagate_position(&iss(), 0.0).unwrap();
        // Low Earth orbit, ~420 km altitude
        assert!(r.norm() > 6650.0 && r.norm() < 6850.0, "{}", r.norm());

        let r90 = propagate_position(&iss(), 90.0).unwrap();
        assert!(r90.norm() > 6650.0 && r90.norm() < 6850.0);
    }

    #[test]
    fn test_deep_space_position() {
        let kernel_record = gps();
        let kernel = Kernel::new(&kernel_record).unwrap();
        assert_eq!(kernel.regime(), PropagationRegime::DeepSpace);

        let r = kernel.position(60.0).unwrap();
        // Semi-major axis ~26560 km, e ~ 0.0045
        assert!(r.norm() > 26300.0 && r.norm() < 26800.0, "{}", r.norm());
    }

    #[test]
    fn test_topocentric_geometry() {
        let record = gps();
        let site = rubin();
        let epoch = record.epoch() + Duration::from_seconds(3600.0);

        let position = propagate_position(&record, 60.0).unwrap();
        let sky = topocentric_sky_position(&position, &site, &epoch);

        assert!((0.0..crate::constants::DPI).contains(&sky.ra));
        assert!(sky.dec.abs() <= std::f64::consts::FRAC_PI_2);

        // The observer sits on the Earth's surface: the range differs from the geocentric
        // distance by at most one Earth radius
        assert!((sky.range - position.norm()).abs() <= crate::constants::EARTH_RADIUS_KM + 5.0);

        // Undo the J2000 rotation and the observer offset to recover the geocentric vector
        let direction = crate::conversion::unit_vector_from_radec(sky.ra, sky.dec);
        let of_date = prec(epoch.to_mjd_tt_days()) * (direction * sky.range);
        let recovered = of_date + site.geocentric_position(&epoch);
        assert_abs_diff_eq!(recovered, position, epsilon = 1e-5);
    }

    #[test]
    fn test_sky_positions_match_single_calls() {
        let record = iss();
        let site = rubin();
        let start = record.epoch() + Duration::from_seconds(600.0);
        let end = start + Duration::from_seconds(30.0);

        let both = Sgp4SkyPropagator
            .sky_positions(&record, &site, &[start, end])
            .unwrap();
        assert_eq!(both.len(), 2);

        let first = Sgp4SkyPropagator.sky_position(&record, &site, &start).unwrap();
        assert_abs_diff_eq!(both[0].ra, first.ra, epsilon = 1e-12);
        assert_abs_diff_eq!(both[0].dec, first.dec, epsilon = 1e-12);
        assert_abs_diff_eq!(both[0].range, first.range, epsilon = 1e-9);
    }

    #[test]
    fn test_apparent_motion_is_continuous() {
        // A GPS satellite moves at most a few arcseconds per second across the sky
        let record = gps();
        let site = rubin();
        let t0 = record.epoch() + Duration::from_seconds(7200.0);
        let t1 = t0 + Duration::from_seconds(10.0);

        let p = Sgp4SkyPropagator
            .sky_positions(&record, &site, &[t0, t1])
            .unwrap();
        let moved = angular_separation(p[0].ra, p[0].dec, p[1].ra, p[1].dec);
        assert!(moved > 0.0 && moved < 0.1 * RADEG, "{moved}");
    }
}
