//! # Observer site geometry
//!
//! The telescope is a fixed ground site. Its geodetic coordinates are converted once into
//! **geocentric parallax constants** (ρ·cosφ, ρ·sinφ), which then give the observer's
//! geocentric position at any instant by rotating with Greenwich sidereal time.
//!
//! ## Frames & units
//!
//! - Longitude: **degrees**, east positive. Latitude: **degrees**, geodetic.
//! - Height above the reference ellipsoid: **meters**.
//! - ρ·cosφ, ρ·sinφ: **Earth equatorial radii** (dimensionless).
//! - [`ObserverSite::geocentric_position`] returns **kilometers** in the equatorial frame of
//!   date (mean equinox, rotated by GMST), the same frame as the SGP4 output it is
//!   subtracted from.
//!
//! ```text
//! (lat, h) --geodetic_to_parallax--> (ρcosφ, ρsinφ) --GMST + lon--> r_obs(t) [km]
//! ```

use hifitime::Epoch;
use nalgebra::Vector3;
use ordered_float::NotNan;
use serde::{Deserialize, Serialize};

use crate::constants::{Degree, Kilometer, Meter, EARTH_MAJOR_AXIS, EARTH_MINOR_AXIS};
use crate::constants::EARTH_RADIUS_KM;
use crate::sattle_errors::SattleError;
use crate::time::gmst_at;

/// Geodetic description of an observing site, as found in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SiteConfig {
    /// Geodetic latitude in degrees.
    pub latitude: Degree,
    /// Longitude in degrees, east positive.
    pub longitude: Degree,
    /// Height above the reference ellipsoid in meters.
    pub height: Meter,
}

impl Default for SiteConfig {
    /// Rubin Observatory, Cerro Pachón.
    fn default() -> Self {
        SiteConfig {
            latitude: -30.244633333333333,
            longitude: -70.74941666666666,
            height: 2662.75,
        }
    }
}

/// Fixed ground-based observer with precomputed parallax constants.
///
/// Process-wide constant: built once from configuration and shared read-only by every
/// propagation.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ObserverSite {
    /// Longitude in **degrees** east of Greenwich.
    pub longitude: NotNan<f64>,

    /// Geodetic latitude in **degrees**.
    pub latitude: NotNan<f64>,

    /// Height above the ellipsoid in **meters**.
    pub height: NotNan<f64>,

    /// ρ·cosφ (geocentric latitude φ), in **Earth radii**.
    pub rho_cos_phi: NotNan<f64>,

    /// ρ·sinφ (geocentric latitude φ), in **Earth radii**.
    pub rho_sin_phi: NotNan<f64>,

    /// Optional human-readable site name.
    pub name: Option<String>,
}

impl ObserverSite {
    /// Create a new site from geodetic coordinates.
    ///
    /// Arguments
    /// -----------------
    /// * `longitude`: Longitude in **degrees** (east positive).
    /// * `latitude`: Geodetic latitude in **degrees**, within [−90, 90].
    /// * `height`: Height above the reference ellipsoid in **meters**.
    /// * `name`: Optional site name.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::InvalidSite`] if a coordinate is NaN or the latitude is out of range.
    pub fn new(
        longitude: Degree,
        latitude: Degree,
        height: Meter,
        name: Option<String>,
    ) -> Result<ObserverSite, SattleError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(SattleError::InvalidSite(format!(
                "latitude {latitude} outside [-90, 90]"
            )));
        }
        if !longitude.is_finite() || !height.is_finite() {
            return Err(SattleError::InvalidSite(format!(
                "non-finite longitude {longitude} or height {height}"
            )));
        }

        let (rho_cos_phi, rho_sin_phi) = geodetic_to_parallax(latitude, height);

        Ok(ObserverSite {
            longitude: NotNan::new(longitude)?,
            latitude: NotNan::new(latitude)?,
            height: NotNan::new(height)?,
            rho_cos_phi: NotNan::new(rho_cos_phi)?,
            rho_sin_phi: NotNan::new(rho_sin_phi)?,
            name,
        })
    }

    /// Build a site from its configuration section.
    pub fn from_config(site: &SiteConfig) -> Result<ObserverSite, SattleError> {
        ObserverSite::new(site.longitude, site.latitude, site.height, None)
    }

    /// Geocentric position of the observer at `epoch`, in kilometers.
    ///
    /// The site is rotated about the polar axis by the local mean sidereal angle
    /// (GMST + longitude), which places it in the equatorial frame of date used by SGP4.
    pub fn geocentric_position(&self, epoch: &Epoch) -> Vector3<Kilometer> {
        let theta = gmst_at(epoch) + self.longitude.to_radians();
        let rho_cos_phi = self.rho_cos_phi.into_inner();

        Vector3::new(
            EARTH_RADIUS_KM * rho_cos_phi * theta.cos(),
            EARTH_RADIUS_KM * rho_cos_phi * theta.sin(),
            EARTH_RADIUS_KM * self.rho_sin_phi.into_inner(),
        )
    }
}

/// Convert geodetic latitude and height into normalized parallax coordinates.
///
/// The values are expressed in units of the Earth's equatorial radius and account for
/// the Earth's oblateness:
///
/// ```text
/// u = atan( (sin φ * (b/a)) / cos φ )
/// ρ_sinφ = (b/a) * sin u + (h/a) * sin φ
/// ρ_cosφ = cos u + (h/a) * cos φ
/// ```
///
/// Arguments
/// ---------
/// * `lat` - Geodetic latitude of the observer in **radians**.
/// * `height` - Observer's altitude above the reference ellipsoid in **meters**.
pub fn lat_alt_to_parallax(lat: f64, height: Meter) -> (f64, f64) {
    let axis_ratio = EARTH_MINOR_AXIS / EARTH_MAJOR_AXIS;

    // Parametric latitude
    let u = (lat.sin() * axis_ratio).atan2(lat.cos());

    let rho_sin_phi = axis_ratio * u.sin() + (height / EARTH_MAJOR_AXIS) * lat.sin();
    let rho_cos_phi = u.cos() + (height / EARTH_MAJOR_AXIS) * lat.cos();

    (rho_cos_phi, rho_sin_phi)
}

/// Degree-input wrapper around [`lat_alt_to_parallax`].
pub fn geodetic_to_parallax(lat: Degree, height: Meter) -> (f64, f64) {
    lat_alt_to_parallax(lat.to_radians(), height)
}
