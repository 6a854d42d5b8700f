//! `athos-recon`: contact roster reconciliation.
//!
//! Pure crate: merges the contacts an extractor found with the contacts a
//! lookup service returned. No CLI, network or IO dependencies.

pub mod error;
pub mod model;
pub mod parse;
pub mod reconcile;

pub use error::ReconError;
pub use model::{AgencyProfile, Award, CaseStudy, ClientRef, Contact, ReconcileSummary, Reconciled};
pub use parse::{contacts_from_json, profile_from_json};
pub use reconcile::{normalize_name, reconcile, reconcile_with_summary};
