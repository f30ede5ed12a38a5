//! AirGradient to AWS Timestream proxy.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): `routes/*.rs`
//! only import what this gateway re-exports, never sibling internals.

pub mod config;
pub mod models;
pub mod routes;
pub mod store;

pub use config::Config;

// Re-exported for routes/*.rs so they depend on the gateway rather than on
// models.rs and store.rs directly.
pub use models::{dimension_sensor_id, echo_sensor_name, SensorReading};
pub use store::{
    MeasurementStore, RejectedRecord, TimestreamStore, WriteOutcome, DATABASE_NAME, TABLE_NAME,
};
