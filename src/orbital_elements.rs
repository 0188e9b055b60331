//! # Orbital element records
//!
//! An [`OrbitalElementRecord`] is one catalogued object's mean elements (TLE / OMM content)
//! at a reference epoch. Parsing and the element fields themselves belong to the `sgp4`
//! crate; this module only attaches the catalog identity and the epoch as a
//! [`hifitime::Epoch`], which is what the rest of the crate reasons with.
//!
//! Records are immutable once loaded and are shared read-only (behind an `Arc`) by every
//! visit computation that uses the same catalog snapshot.

use hifitime::Epoch;

use crate::constants::{CatalogNumber, MINUTES_PER_DAY};
use crate::sattle_errors::SattleError;
use crate::time::{epoch_from_naive_utc, minutes_between};

#[derive(Debug, Clone)]
pub struct OrbitalElementRecord {
    elements: sgp4::Elements,
    epoch: Epoch,
}

impl OrbitalElementRecord {
    /// Wrap already-parsed SGP4 elements.
    pub fn new(elements: sgp4::Elements) -> Self {
        let epoch = epoch_from_naive_utc(&elements.datetime);
        OrbitalElementRecord { elements, epoch }
    }

    /// Parse a two-line element set, with an optional name line.
    ///
    /// Arguments
    /// -----------------
    /// * `name`: Object name (line 0 of a three-line element set), if any.
    /// * `line1`, `line2`: The two 69-column TLE lines, checksums included.
    ///
    /// Return
    /// ----------
    /// * The parsed record, or [`SattleError::TleParse`] describing the offending field.
    pub fn from_tle(
        name: Option<String>,
        line1: &str,
        line2: &str,
    ) -> Result<OrbitalElementRecord, SattleError> {
        let elements = sgp4::Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| SattleError::TleParse(format!("{e} (line 1: {:?})", line1.trim())))?;
        Ok(OrbitalElementRecord::new(elements))
    }

    pub fn catalog_number(&self) -> CatalogNumber {
        self.elements.norad_id
    }

    /// Reference epoch of the element set (UTC-derived).
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// Mean motion in revolutions per day.
    pub fn mean_motion(&self) -> f64 {
        self.elements.mean_motion
    }

    /// Orbital period in minutes derived from the mean motion.
    pub fn orbital_period_minutes(&self) -> f64 {
        MINUTES_PER_DAY / self.elements.mean_motion
    }

    /// International designator (launch year, launch number and piece), when present.
    pub fn designator(&self) -> Option<&str> {
        self.elements.international_designator.as_deref()
    }

    pub fn object_name(&self) -> Option<&str> {
        self.elements.object_name.as_deref()
    }

    pub fn elements(&self) -> &sgp4::Elements {
        &self.elements
    }

    /// Minutes elapsed from the element epoch to `epoch` (negative before the epoch).
    pub fn minutes_since_epoch(&self, epoch: &Epoch) -> f64 {
        minutes_between(&self.epoch, epoch)
    }
}
