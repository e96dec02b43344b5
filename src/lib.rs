pub mod config;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod notifier;
pub mod persist;
pub mod server;
pub mod snapshot;
pub mod state;
pub mod tracker;

pub use config::{ConfigLoader, TrackerConfig};
pub use error::{Error, Result};
pub use snapshot::Snapshot;
pub use tracker::TrackerEngine;
