//! Library half of the `athos` binary: collaborator adapters, the pipeline
//! orchestrator and batch runs. `main.rs` is argument handling only.

pub mod batch;
pub mod error;
pub mod exit_codes;
pub mod fetch;
pub mod import;
pub mod logging;
pub mod pipeline;
pub mod roster;

pub use error::CliError;
