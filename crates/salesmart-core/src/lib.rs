pub mod cleaning;
pub mod config;
pub mod entities;
pub mod error;
pub mod integrity;
pub mod outputs;
pub mod pipelines;
pub mod units;
pub mod validators;

#[cfg(feature = "runtime")]
pub mod db;
#[cfg(feature = "runtime")]
pub mod extract;
#[cfg(feature = "runtime")]
pub mod object_store;
#[cfg(feature = "runtime")]
pub mod storage;

pub use cleaning::{CleanedTable, CleaningOptions, CleaningReport};
pub use entities::Entity;
