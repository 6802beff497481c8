//! Built-in extensions.

pub mod blacklist;
pub mod data_sources;
pub mod storage_monitor;

pub use blacklist::{Blacklist, BLACKLIST};
pub use data_sources::{DataSource, DataSourceRegistry, DATA_SOURCE_REGISTRY};
pub use storage_monitor::{medium_for_uri, StorageMonitor, STORAGE_MONITOR};
