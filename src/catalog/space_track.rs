//! General-perturbation element sets from [space-track.org](https://www.space-track.org).
//!
//! Every fetch is a full session: log in (the session cookie is kept by the client's cookie
//! store), query the `gp` class for the live catalog or the `gp_history` class for a
//! historical window, log out. Records come back as OMM JSON; only the embedded TLE lines
//! are used.
//!
//! Credentials are read from `SPACETRACK_USER` and `SPACETRACK_PASSWORD`.

use std::sync::Arc;

use hifitime::Epoch;
use reqwest::Client;
use serde::Deserialize;
use tracing::{info, warn};

use super::{historical_set, ElementCatalog, ElementSet, DEFAULT_HISTORICAL_WINDOW_DAYS};
use crate::orbital_elements::OrbitalElementRecord;
use crate::sattle_errors::SattleError;

pub const BASE_URL: &str = "https://www.space-track.org";

/// Epoch predicate of the live query: element sets published in the last 30 days.
const LIVE_EPOCH_PREDICATE: &str = "%3Enow-30";

/// The subset of an OMM record this crate needs.
#[derive(Debug, Deserialize, PartialEq)]
pub struct GpRecord {
    #[serde(rename = "OBJECT_NAME")]
    pub object_name: Option<String>,
    #[serde(rename = "TLE_LINE1")]
    pub tle_line1: Option<String>,
    #[serde(rename = "TLE_LINE2")]
    pub tle_line2: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpaceTrackCatalog {
    client: Client,
    username: String,
    password: String,
    window_days: f64,
}

impl SpaceTrackCatalog {
    pub fn new(username: String, password: String) -> Result<Self, SattleError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(SpaceTrackCatalog {
            client,
            username,
            password,
            window_days: DEFAULT_HISTORICAL_WINDOW_DAYS,
        })
    }

    /// Build a catalog from `SPACETRACK_USER` / `SPACETRACK_PASSWORD`.
    pub fn from_env() -> Result<Self, SattleError> {
        let (Ok(username), Ok(password)) = (
            std::env::var("SPACETRACK_USER"),
            std::env::var("SPACETRACK_PASSWORD"),
        ) else {
            return Err(SattleError::InvalidConfig(
                "environment variables SPACETRACK_USER and SPACETRACK_PASSWORD must be set".into(),
            ));
        };
        SpaceTrackCatalog::new(username, password)
    }

    pub fn with_historical_window(mut self, window_days: f64) -> Self {
        self.window_days = window_days;
        self
    }

    /// Run one login / query / logout session and return the raw GP records.
    async fn query(&self, class: &str, epoch_predicate: &str) -> Result<Vec<GpRecord>, SattleError> {
        info!(class, "logging in to space-track");
        self.client
            .post(format!("{BASE_URL}/ajaxauth/login"))
            .form(&[
                ("identity", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?;

        let url = query_url(class, epoch_predicate);
        let response = self.client.get(&url).send().await?.error_for_status();

        // Log out whatever the query outcome was
        if let Err(e) = self
            .client
            .get(format!("{BASE_URL}/ajaxauth/logout"))
            .send()
            .await
        {
            warn!(error = %e, "space-track logout failed");
        }

        let records: Vec<GpRecord> = response?.json().await?;
        info!(class, records = records.len(), "received GP catalog");
        Ok(records)
    }
}

/// URL of a `basicspacedata` query for non-decayed objects, ordered by catalog number.
pub fn query_url(class: &str, epoch_predicate: &str) -> String {
    [
        BASE_URL,
        "basicspacedata",
        "query",
        "class",
        class,
        "decay_date",
        "null-val",
        "epoch",
        epoch_predicate,
        "orderby",
        "norad_cat_id",
        "format",
        "json",
    ]
    .join("/")
}

/// URL-encoded `>start,<end` epoch predicate around `as_of`.
pub fn historical_epoch_predicate(as_of: &Epoch, window_days: f64) -> String {
    let half_width = hifitime::Duration::from_days(window_days);
    format!(
        "%3E{}%2C%3C{}",
        space_track_datetime(&(*as_of - half_width)),
        space_track_datetime(&(*as_of + half_width))
    )
}

fn space_track_datetime(epoch: &Epoch) -> String {
    let (y, m, d, hh, mm, ss, _) = epoch.to_gregorian_utc();
    format!("{y:04}-{m:02}-{d:02}T{hh:02}:{mm:02}:{ss:02}")
}

/// Turn GP records into element records, skipping the ones without usable TLE lines.
pub fn records_from_gp(gp: Vec<GpRecord>) -> Vec<OrbitalElementRecord> {
    gp.into_iter()
        .filter_map(|entry| {
            let (Some(line1), Some(line2)) = (entry.tle_line1, entry.tle_line2) else {
                return None;
            };
            OrbitalElementRecord::from_tle(entry.object_name, line1.trim(), line2.trim())
                .inspect_err(|e| warn!(error = %e, "skipping GP record"))
                .ok()
        })
        .collect()
}

impl ElementCatalog for SpaceTrackCatalog {
    async fn fetch_records(&self, as_of: Option<Epoch>) -> Result<ElementSet, SattleError> {
        let gp = match &as_of {
            None => self.query("gp", LIVE_EPOCH_PREDICATE).await,
            Some(as_of) => {
                let predicate = historical_epoch_predicate(as_of, self.window_days);
                self.query("gp_history", &predicate).await
            }
        }
        .map_err(|e| SattleError::CatalogUnavailable(format!("space-track: {e}")))?;

        let records = records_from_gp(gp);
        if records.is_empty() {
            return Err(SattleError::CatalogUnavailable(
                "space-track returned no usable element set".into(),
            ));
        }

        match as_of {
            None => Ok(Arc::new(records)),
            Some(as_of) => historical_set(&records, &as_of, self.window_days),
        }
    }
}
