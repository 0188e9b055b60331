use thiserror::Error;

use crate::constants::{CatalogNumber, DiaSourceId, VisitId};

#[derive(Error, Debug)]
pub enum SattleError {
    #[error("Orbital element catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Unable to parse TLE: {0}")]
    TleParse(String),

    #[error("Propagation failed for object {catalog_number}: {reason}")]
    Propagation {
        catalog_number: CatalogNumber,
        reason: String,
    },

    #[error("Visit {0} not present in cache")]
    VisitNotFound(VisitId),

    #[error("Malformed footprint for DiaSource {diasource_id}: {reason}")]
    MalformedFootprint {
        diasource_id: DiaSourceId,
        reason: String,
    },

    #[error("Invalid visit: {0}")]
    InvalidVisit(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid observer site: {0}")]
    InvalidSite(String),

    #[error("Track computation aborted: {0}")]
    ComputationAborted(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON (de)serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[cfg(feature = "space-track")]
    #[error("HTTP reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),
}

impl From<ordered_float::FloatIsNan> for SattleError {
    fn from(_: ordered_float::FloatIsNan) -> Self {
        SattleError::InvalidSite("NaN coordinate".into())
    }
}

impl From<tokio::task::JoinError> for SattleError {
    fn from(e: tokio::task::JoinError) -> Self {
        SattleError::ComputationAborted(e.to_string())
    }
}

impl PartialEq for SattleError {
    fn eq(&self, other: &Self) -> bool {
        use SattleError::*;
        match (self, other) {
            (CatalogUnavailable(a), CatalogUnavailable(b)) => a == b,
            (TleParse(a), TleParse(b)) => a == b,
            (
                Propagation {
                    catalog_number: a,
                    reason: ra,
                },
                Propagation {
                    catalog_number: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (VisitNotFound(a), VisitNotFound(b)) => a == b,
            (
                MalformedFootprint {
                    diasource_id: a,
                    reason: ra,
                },
                MalformedFootprint {
                    diasource_id: b,
                    reason: rb,
                },
            ) => a == b && ra == rb,
            (InvalidVisit(a), InvalidVisit(b)) => a == b,
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (InvalidSite(a), InvalidSite(b)) => a == b,
            (ComputationAborted(a), ComputationAborted(b)) => a == b,

            // Wrapped foreign errors only compare by variant
            (IoError(_), IoError(_)) => true,
            (JsonError(_), JsonError(_)) => true,
            #[cfg(feature = "space-track")]
            (ReqwestError(_), ReqwestError(_)) => true,

            _ => false,
        }
    }
}
