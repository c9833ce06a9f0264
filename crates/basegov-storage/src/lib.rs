//! Partition store, append-only stage logs, and the portal HTTP fetcher.

pub mod fetch;
pub mod log;
pub mod store;

pub use fetch::{FetchError, FetcherConfig, PortalFetcher, PortalResponse};
pub use log::StageLog;
pub use store::PartitionStore;

pub const CRATE_NAME: &str = "basegov-storage";
