//! Core domain model for the BASE.gov contract pipeline: stages, partition
//! keys and their canonical file names, the combinatorial download space, and
//! the descriptive lookup tables.

pub mod key;
pub mod lookups;
pub mod space;
pub mod stage;

pub use key::{KeyParseError, PartitionKey, RawKey};
pub use lookups::{Lookups, Resolution};
pub use space::{DistrictMunicipalities, DownloadSpace};
pub use stage::Stage;

pub const CRATE_NAME: &str = "basegov-core";
