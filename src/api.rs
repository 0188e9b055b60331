//! Request and response bodies exchanged with the alert pipeline.
//!
//! ```json
//! // visit registration
//! {"visit_id": 1, "exposure_start_mjd": 60000.0, "exposure_end_mjd": 60000.0007,
//!  "boresight_ra": 10.0, "boresight_dec": 0.0, "historical": false}
//!
//! // whitelist query
//! {"visit_id": 1, "detector_id": 42,
//!  "diasources": [{"diasource_id": 11, "bbox": [[10.09, 0.02], [10.11, 0.02], [10.11, 0.03]]}]}
//!
//! // whitelist response
//! {"visit_id": 1, "detector_id": 42, "whitelist": [12]}
//! ```

use serde::{Deserialize, Serialize};

use crate::constants::{Degree, DetectorId, DiaSourceId, VisitId, MJD};
use crate::sattle_errors::SattleError;
use crate::visit::Visit;
use crate::whitelist::{DiaSource, WhitelistOutcome};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterVisitRequest {
    pub visit_id: VisitId,
    #[serde(alias = "exposure_start")]
    pub exposure_start_mjd: MJD,
    #[serde(alias = "exposure_end")]
    pub exposure_end_mjd: MJD,
    pub boresight_ra: Degree,
    pub boresight_dec: Degree,
    /// Use element sets valid at `exposure_start_mjd` instead of the live catalog.
    #[serde(default)]
    pub historical: bool,
}

impl RegisterVisitRequest {
    pub fn to_visit(&self) -> Result<Visit, SattleError> {
        Visit::new(
            self.visit_id,
            self.exposure_start_mjd,
            self.exposure_end_mjd,
            self.boresight_ra,
            self.boresight_dec,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistRequest {
    pub visit_id: VisitId,
    pub detector_id: DetectorId,
    pub diasources: Vec<DiaSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhitelistResponse {
    pub visit_id: VisitId,
    pub detector_id: DetectorId,
    pub whitelist: Vec<DiaSourceId>,
}

impl From<&WhitelistOutcome> for WhitelistResponse {
    fn from(outcome: &WhitelistOutcome) -> Self {
        WhitelistResponse {
            visit_id: outcome.visit_id,
            detector_id: outcome.detector_id,
            whitelist: outcome.whitelist.clone(),
        }
    }
}

impl From<WhitelistOutcome> for WhitelistResponse {
    fn from(outcome: WhitelistOutcome) -> Self {
        WhitelistResponse {
            visit_id: outcome.visit_id,
            detector_id: outcome.detector_id,
            whitelist: outcome.whitelist,
        }
    }
}
