//! Two-line / three-line element set files.
//!
//! ```text
//! ISS (ZARYA)                                                            <- optional name line
//! 1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
//! 2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
//! ```
//!
//! A record is recognised when a line starting with `"1 "` is immediately followed by a
//! line starting with `"2 "`. Anything else is either a name line (kept for the next
//! record) or noise. A pair that the `sgp4` parser rejects is skipped with a warning so one
//! corrupt entry does not take the whole catalog down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use hifitime::Epoch;
use tracing::{info, warn};

use super::{historical_set, ElementCatalog, ElementSet, DEFAULT_HISTORICAL_WINDOW_DAYS};
use crate::orbital_elements::OrbitalElementRecord;
use crate::sattle_errors::SattleError;

/// Result of parsing a TLE text: the records plus one message per rejected line pair.
#[derive(Debug, Default)]
pub struct ParsedTles {
    pub records: Vec<OrbitalElementRecord>,
    pub rejected: Vec<String>,
}

/// Parse every element set found in `text`.
pub fn parse_tle_text(text: &str) -> ParsedTles {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let mut parsed = ParsedTles::default();
    let mut name: Option<String> = None;

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];
        let next = lines.get(i + 1).copied();

        match next {
            Some(line2) if line.starts_with("1 ") && line2.starts_with("2 ") => {
                match OrbitalElementRecord::from_tle(name.take(), line, line2) {
                    Ok(record) => parsed.records.push(record),
                    Err(e) => parsed.rejected.push(e.to_string()),
                }
                i += 2;
            }
            _ => {
                name = if line.is_empty() || line.starts_with("1 ") || line.starts_with("2 ") {
                    None
                } else {
                    Some(line.strip_prefix("0 ").unwrap_or(line).to_string())
                };
                i += 1;
            }
        }
    }

    parsed
}

/// Catalog backed by a TLE text file, read on every fetch.
///
/// Wrap it in a [`super::CachedCatalog`] to avoid re-reading the file for every visit.
#[derive(Debug, Clone)]
pub struct TleFileCatalog {
    path: PathBuf,
    window_days: f64,
}

impl TleFileCatalog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        TleFileCatalog {
            path: path.as_ref().to_path_buf(),
            window_days: DEFAULT_HISTORICAL_WINDOW_DAYS,
        }
    }

    pub fn with_historical_window(mut self, window_days: f64) -> Self {
        self.window_days = window_days;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_records(&self) -> Result<Vec<OrbitalElementRecord>, SattleError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            SattleError::CatalogUnavailable(format!("{}: {e}", self.path.display()))
        })?;

        let parsed = parse_tle_text(&text);
        for reason in &parsed.rejected {
            warn!(file = %self.path.display(), %reason, "skipping element set");
        }

        if parsed.records.is_empty() {
            return Err(SattleError::CatalogUnavailable(format!(
                "{}: no valid element set",
                self.path.display()
            )));
        }

        info!(
            file = %self.path.display(),
            records = parsed.records.len(),
            rejected = parsed.rejected.len(),
            "TLE file loaded"
        );
        Ok(parsed.records)
    }
}

impl ElementCatalog for TleFileCatalog {
    async fn fetch_records(&self, as_of: Option<Epoch>) -> Result<ElementSet, SattleError> {
        let records = self.read_records().await?;
        match as_of {
            None => Ok(Arc::new(records)),
            Some(as_of) => historical_set(&records, &as_of, self.window_days),
        }
    }
}
