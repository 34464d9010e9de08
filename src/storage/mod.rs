pub mod db;
pub mod persist;
pub mod scan;
pub mod store;

pub use scan::{Scan, ScanSummary, PLACEHOLDER_IMAGE};
pub use store::ScanStore;
