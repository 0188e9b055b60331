//! # Time scales at the component boundaries
//!
//! Exposure windows arrive as **MJD in TAI**, orbital element epochs are **UTC** calendar
//! datetimes (as parsed by the `sgp4` crate), sidereal time needs **UT1** and precession
//! needs **TT**. Everything is funnelled through [`hifitime::Epoch`] so each consumer can
//! ask for the scale it needs.
//!
//! UT1 is approximated by UTC (|ΔUT1| < 0.9 s, i.e. below 4″ of Earth rotation), which is
//! far inside the streak half-width used by the whitelist filter.

use chrono::{Datelike, NaiveDateTime, Timelike};
use hifitime::{Epoch, TimeScale};

use crate::constants::{DPI, MJD, SECONDS_PER_DAY, SIDEREAL_RATE, T2000};

/// Build an epoch from an exposure timestamp expressed as MJD in the TAI scale.
pub fn epoch_from_mjd_tai(mjd: MJD) -> Epoch {
    Epoch::from_mjd_in_time_scale(mjd, TimeScale::TAI)
}

/// Convert a UTC calendar datetime (TLE/OMM epoch) into an [`Epoch`].
pub fn epoch_from_naive_utc(datetime: &NaiveDateTime) -> Epoch {
    Epoch::from_gregorian_utc(
        datetime.year(),
        datetime.month() as u8,
        datetime.day() as u8,
        datetime.hour() as u8,
        datetime.minute() as u8,
        datetime.second() as u8,
        datetime.nanosecond(),
    )
}

/// Signed elapsed time from `from` to `to`, in minutes.
pub fn minutes_between(from: &Epoch, to: &Epoch) -> f64 {
    (*to - *from).to_seconds() / 60.0
}

/// Signed elapsed time from `from` to `to`, in days.
pub fn days_between(from: &Epoch, to: &Epoch) -> f64 {
    (*to - *from).to_seconds() / SECONDS_PER_DAY
}

/// Compute the Greenwich Mean Sidereal Time (GMST) in radians
/// for a given Modified Julian Date (UT1 time scale).
///
/// IAU 1982 polynomial for GMST at 0h UT1, plus the rotation accumulated during
/// the fraction of the day scaled by the sidereal rate.
///
/// # Arguments
/// * `tjm` - Modified Julian Date (MJD, UT1 time scale)
///
/// # Returns
/// * GMST angle in radians, normalized to the interval [0, 2π).
pub fn gmst(tjm: f64) -> f64 {
    // Polynomial coefficients for GMST at 0h UT1 (in seconds)
    const C0: f64 = 24110.54841;
    const C1: f64 = 8640184.812866;
    const C2: f64 = 9.3104e-2;
    const C3: f64 = -6.2e-6;

    let day_start = tjm.floor();
    let t = (day_start - T2000) / 36525.0;

    let gmst0 = (((C3 * t + C2) * t + C1) * t + C0) * DPI / SECONDS_PER_DAY;
    let h = tjm.fract() * DPI;

    (gmst0 + h * SIDEREAL_RATE).rem_euclid(DPI)
}

/// GMST at the given instant, evaluated on the UTC scale.
pub fn gmst_at(epoch: &Epoch) -> f64 {
    gmst(epoch.to_mjd_utc_days())
}
