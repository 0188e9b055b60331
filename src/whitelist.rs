//! # Whitelist filter
//!
//! Given the cached tracks of a visit and a batch of DiaSources from one detector, decide
//! which sources are **not** explained by a satellite crossing.
//!
//! Every [`Track`] becomes a [`Streak`]: the great-circle arc between its two endpoints,
//! widened by `streak_half_width` on each side. A source whose footprint meets at least one
//! streak is *contaminated*; the others form the *whitelist*. Sources whose footprint cannot
//! be turned into a polygon are *rejected* and reported with the reason, so they are never
//! confused with contaminated ones.
//!
//! ## Determinism
//!
//! The outcome depends only on the cache entry and the set of sources: each source is
//! classified independently and every id list is returned in ascending order.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::constants::{DetectorId, DiaSourceId, Degree, VisitId};
use crate::sattle_errors::SattleError;
use crate::spherical::{BoundingCap, SphericalPolygon, Streak};
use crate::visit::Track;
use crate::visit_cache::{VisitCache, VisitCacheEntry};

/// Default streak half-width in degrees.
pub const DEFAULT_STREAK_HALF_WIDTH: Degree = 0.01;

/// A candidate detection and its sky-projected footprint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiaSource {
    pub diasource_id: DiaSourceId,
    /// Footprint corners as `[ra, dec]` in decimal degrees, in any order.
    pub bbox: Vec<[Degree; 2]>,
}

impl DiaSource {
    pub fn new(diasource_id: DiaSourceId, bbox: Vec<[Degree; 2]>) -> Self {
        DiaSource { diasource_id, bbox }
    }

    /// Build the footprint polygon: the convex hull of the bbox corners.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::MalformedFootprint`] if the bbox has fewer than 3 vertices, a
    ///   non-finite coordinate, a declination outside [−90°, 90°], or corners that span
    ///   no area or more than a hemisphere.
    pub fn footprint(&self) -> Result<SphericalPolygon, SattleError> {
        let malformed = |reason: String| SattleError::MalformedFootprint {
            diasource_id: self.diasource_id,
            reason,
        };

        if self.bbox.len() < 3 {
            return Err(malformed(format!(
                "footprint has {} vertices, at least 3 are required",
                self.bbox.len()
            )));
        }
        if let Some([ra, dec]) = self
            .bbox
            .iter()
            .find(|[ra, dec]| !ra.is_finite() || !dec.is_finite())
        {
            return Err(malformed(format!("non-finite vertex ({ra}, {dec})")));
        }
        if let Some([_, dec]) = self.bbox.iter().find(|[_, dec]| dec.abs() > 90.0) {
            return Err(malformed(format!("declination {dec} outside [-90, 90]")));
        }

        SphericalPolygon::convex_hull_radec_deg(&self.bbox)
            .ok_or_else(|| malformed("corners are collinear or span more than a hemisphere".into()))
    }
}

/// A source left out of both lists because its footprint is unusable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedSource {
    pub diasource_id: DiaSourceId,
    pub reason: String,
}

/// Classification of one DiaSource batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WhitelistOutcome {
    pub visit_id: VisitId,
    pub detector_id: DetectorId,
    /// Sources crossed by no streak, ascending.
    pub whitelist: Vec<DiaSourceId>,
    /// Sources crossed by at least one streak, ascending.
    pub contaminated: Vec<DiaSourceId>,
    /// Sources with an unusable footprint, ascending by id.
    pub rejected: Vec<RejectedSource>,
}

enum Classification {
    Clean(DiaSourceId),
    Contaminated(DiaSourceId),
    Rejected(RejectedSource),
}

/// A streak with its precomputed bounding cap.
struct PreparedStreak {
    streak: Streak,
    cap: BoundingCap,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhitelistFilter {
    streak_half_width: Degree,
}

impl Default for WhitelistFilter {
    fn default() -> Self {
        WhitelistFilter {
            streak_half_width: DEFAULT_STREAK_HALF_WIDTH,
        }
    }
}

impl WhitelistFilter {
    /// Errors
    /// ----------
    /// * [`SattleError::InvalidConfig`] for a negative or non-finite half-width.
    pub fn new(streak_half_width: Degree) -> Result<Self, SattleError> {
        if !streak_half_width.is_finite() || streak_half_width < 0.0 {
            return Err(SattleError::InvalidConfig(format!(
                "streak half-width must be a finite non-negative angle, got {streak_half_width}"
            )));
        }
        Ok(WhitelistFilter { streak_half_width })
    }

    pub fn streak_half_width(&self) -> Degree {
        self.streak_half_width
    }

    pub fn streak(&self, track: &Track) -> Streak {
        Streak::from_radec_deg(track.start(), track.end(), self.streak_half_width)
    }

    /// Classify `sources` against the tracks of `entry`.
    ///
    /// Arguments
    /// -----------------
    /// * `entry`: The published tracks of the visit.
    /// * `detector_id`: Echoed back in the outcome.
    /// * `sources`: The DiaSources to classify; malformed ones are rejected individually.
    pub fn filter(
        &self,
        entry: &VisitCacheEntry,
        detector_id: DetectorId,
        sources: &[DiaSource],
    ) -> WhitelistOutcome {
        let visit_id = entry.visit_id();
        if entry.tracks.is_empty() {
            debug!(visit_id, detector_id, "no satellite track for this visit");
        }

        let streaks: Vec<PreparedStreak> = entry
            .tracks
            .iter()
            .map(|track| {
                let streak = self.streak(track);
                PreparedStreak {
                    cap: streak.bounding_cap(),
                    streak,
                }
            })
            .collect();

        let classifications: Vec<Classification> = sources
            .par_iter()
            .map(|source| classify(source, &streaks))
            .collect();

        let mut outcome = WhitelistOutcome {
            visit_id,
            detector_id,
            ..WhitelistOutcome::default()
        };
        for classification in classifications {
            match classification {
                Classification::Clean(id) => outcome.whitelist.push(id),
                Classification::Contaminated(id) => outcome.contaminated.push(id),
                Classification::Rejected(rejected) => {
                    warn!(
                        visit_id,
                        detector_id,
                        diasource_id = rejected.diasource_id,
                        reason = %rejected.reason,
                        "DiaSource rejected"
                    );
                    outcome.rejected.push(rejected)
                }
            }
        }
        outcome.whitelist.sort_unstable();
        outcome.contaminated.sort_unstable();
        outcome
            .rejected
            .sort_by(|a, b| (a.diasource_id, &a.reason).cmp(&(b.diasource_id, &b.reason)));

        info!(
            visit_id,
            detector_id,
            streaks = streaks.len(),
            whitelisted = outcome.whitelist.len(),
            contaminated = outcome.contaminated.len(),
            rejected = outcome.rejected.len(),
            "DiaSources filtered"
        );
        outcome
    }

    /// Look up `visit_id` in `cache` and classify `sources` against it.
    ///
    /// Errors
    /// ----------
    /// * [`SattleError::VisitNotFound`] if the visit has no published entry.
    pub fn filter_visit(
        &self,
        cache: &VisitCache,
        visit_id: VisitId,
        detector_id: DetectorId,
        sources: &[DiaSource],
    ) -> Result<WhitelistOutcome, SattleError> {
        let entry = cache.get(visit_id)?;
        Ok(self.filter(&entry, detector_id, sources))
    }
}

fn classify(source: &DiaSource, streaks: &[PreparedStreak]) -> Classification {
    let footprint = match source.footprint() {
        Ok(footprint) => footprint,
        Err(e) => {
            return Classification::Rejected(RejectedSource {
                diasource_id: source.diasource_id,
                reason: e.to_string(),
            })
        }
    };

    let cap = footprint.bounding_cap();
    let crossed = streaks
        .iter()
        .filter(|prepared| prepared.cap.may_overlap(&cap))
        .any(|prepared| prepared.streak.intersects(&footprint));

    if crossed {
        Classification::Contaminated(source.diasource_id)
    } else {
        Classification::Clean(source.diasource_id)
    }
}
