//! # sattle
//!
//! Satellite-visibility cache and DiaSource whitelist filter for a transient alert pipeline.
//!
//! For every registered visit, catalogued objects are propagated with SGP4 to the start
//! and end of the exposure, projected on the observer's sky, and the ones near the
//! boresight are cached as tracks. A later whitelist query tests each DiaSource footprint
//! against the streaks of those tracks and returns the sources no satellite explains.
//!
//! See [`sattle::Sattle`] for the entry point.

pub mod api;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod conversion;
pub mod observers;
pub mod orbital_elements;
pub mod propagation;
mod ref_system;
pub mod sattle;
pub mod sattle_errors;
pub mod spherical;
pub mod time;
pub mod visit;
pub mod visit_cache;
pub mod whitelist;
