pub mod error;
pub mod schema;
pub mod random;
pub mod ingestion;
pub mod reconcile;
pub mod normalize;
pub mod benchmarks;
pub mod quality;
pub mod db;
pub mod loader;
pub mod outputs;
pub mod config;
pub mod pipeline;

pub use error::{EtlError, Result};
