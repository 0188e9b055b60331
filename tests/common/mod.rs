#![allow(dead_code)]

use std::collections::HashMap;

use approx::assert_abs_diff_eq;
use hifitime::Epoch;
use sattle::constants::{CatalogNumber, Degree, RADEG};
use sattle::observers::ObserverSite;
use sattle::orbital_elements::OrbitalElementRecord;
use sattle::propagation::{SkyPosition, SkyPropagator};
use sattle::sattle_errors::SattleError;
use sattle::visit::Track;

pub const ISS_LINE1: &str =
    "1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992";
pub const ISS_LINE2: &str =
    "2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008";

fn checksum(line: &str) -> u32 {
    line.chars()
        .take(68)
        .map(|c| match c {
            '-' => 1,
            c => c.to_digit(10).unwrap_or(0),
        })
        .sum::<u32>()
        % 10
}

/// TLE lines for `norad_id` at `epoch_field` (YYDDD.DDDDDDDD), on the ISS orbit.
pub fn tle_for(norad_id: u64, epoch_field: &str) -> (String, String) {
    let body1 = format!(
        "1 {norad_id:05}U {}{epoch_field}{}",
        &ISS_LINE1[9..18],
        &ISS_LINE1[32..68]
    );
    let body2 = format!("2 {norad_id:05}{}", &ISS_LINE2[7..68]);
    let line1 = format!("{body1}{}", checksum(&body1));
    let line2 = format!("{body2}{}", checksum(&body2));
    (line1, line2)
}

pub fn record_for(norad_id: u64, epoch_field: &str) -> OrbitalElementRecord {
    let (line1, line2) = tle_for(norad_id, epoch_field);
    OrbitalElementRecord::from_tle(None, &line1, &line2).unwrap()
}

/// Propagator returning fixed endpoints per catalog number; objects without a script fail.
pub struct ScriptedPropagator {
    endpoints: HashMap<CatalogNumber, [(Degree, Degree); 2]>,
}

impl ScriptedPropagator {
    pub fn new(endpoints: impl IntoIterator<Item = (CatalogNumber, [(Degree, Degree); 2])>) -> Self {
        ScriptedPropagator {
            endpoints: endpoints.into_iter().collect(),
        }
    }
}

impl SkyPropagator for ScriptedPropagator {
    fn sky_position(
        &self,
        record: &OrbitalElementRecord,
        _site: &ObserverSite,
        _epoch: &Epoch,
    ) -> Result<SkyPosition, SattleError> {
        Err(SattleError::Propagation {
            catalog_number: record.catalog_number(),
            reason: "single positions are not scripted".into(),
        })
    }

    fn sky_positions(
        &self,
        record: &OrbitalElementRecord,
        _site: &ObserverSite,
        _epochs: &[Epoch],
    ) -> Result<Vec<SkyPosition>, SattleError> {
        let ends = self
            .endpoints
            .get(&record.catalog_number())
            .ok_or_else(|| SattleError::Propagation {
                catalog_number: record.catalog_number(),
                reason: "no scripted endpoints".into(),
            })?;
        Ok(ends
            .iter()
            .map(|(ra, dec)| SkyPosition {
                ra: ra * RADEG,
                dec: dec * RADEG,
                range: 1000.0,
            })
            .collect())
    }
}

pub fn assert_track_close(track: &Track, start: (Degree, Degree), end: (Degree, Degree)) {
    assert_abs_diff_eq!(track.start_ra, start.0, epsilon = 1e-9);
    assert_abs_diff_eq!(track.start_dec, start.1, epsilon = 1e-9);
    assert_abs_diff_eq!(track.end_ra, end.0, epsilon = 1e-9);
    assert_abs_diff_eq!(track.end_dec, end.1, epsilon = 1e-9);
}

/// Axis-aligned `[ra, dec]` box of half-size `half` (degrees) around a point, listed
/// counter-clockwise.
pub fn square_bbox(ra: Degree, dec: Degree, half: Degree) -> Vec<[Degree; 2]> {
    let half_ra = half / (dec * RADEG).cos().max(1e-6);
    vec![
        [ra - half_ra, dec - half],
        [ra + half_ra, dec - half],
        [ra + half_ra, dec + half],
        [ra - half_ra, dec + half],
    ]
}
