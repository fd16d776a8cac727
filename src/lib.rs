//! Batch ETL for property listing data.
//!
//! One JSON batch of denormalized property records (with embedded HOA,
//! rehab, and valuation sequences) plus a field-configuration table go in;
//! four normalized relational tables come out, with every child row's
//! `property_id` resolved to the database identity assigned to its parent.

pub mod config;
pub mod constants;
pub mod error;
pub mod extract;
pub mod load;
pub mod logging;
pub mod pipeline;
pub mod rows;
pub mod schema;
pub mod transform;

pub use config::{CommitMode, Config};
pub use error::{EtlError, Result, Stage};
pub use pipeline::{run, RunSummary};
