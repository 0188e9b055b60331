//! # Constants and type definitions for sattle
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! aliases** used throughout the crate: Earth figure for the observer geometry, the SGP4
//! regime threshold, and the identifiers carried by visits, detectors and DiaSources.
//!
//! ## Overview
//!
//! - Angular and time conversions (degrees ↔ radians, days ↔ minutes, JD ↔ MJD)
//! - Earth ellipsoid used for the topocentric correction
//! - Core type aliases used across the crate

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of minutes in a Julian day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Conversion factor between Julian Date and Modified Julian Date
pub const JDTOMJD: f64 = 2400000.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Arcseconds → degrees
pub const DEG_PER_ARCSEC: f64 = 1.0 / 3600.0;

/// Earth equatorial radius in meters (GRS1980/WGS84)
pub const EARTH_MAJOR_AXIS: f64 = 6_378_137.0;

/// Earth polar radius in meters (GRS1980/WGS84)
pub const EARTH_MINOR_AXIS: f64 = 6_356_752.3;

/// Earth equatorial radius in kilometers
pub const EARTH_RADIUS_KM: f64 = EARTH_MAJOR_AXIS / 1000.0;

/// Sidereal-to-solar rotation rate ratio
pub const SIDEREAL_RATE: f64 = 1.00273790934;

/// Orbital period (minutes) at and above which SGP4 switches to its deep-space (SDP4) branch
pub const DEEP_SPACE_PERIOD_MINUTES: f64 = 225.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcseconds
pub type ArcSec = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;
/// Distance in meters
pub type Meter = f64;
/// Modified Julian Date (days)
pub type MJD = f64;

/// Unique key of one exposure
pub type VisitId = i64;
/// Detector (CCD) identifier within a visit
pub type DetectorId = i64;
/// DiaSource identifier, unique within a visit and detector
pub type DiaSourceId = i64;
/// NORAD catalog number of a tracked object
pub type CatalogNumber = u64;
