pub mod types;
pub mod handle;
pub mod store;
pub mod shared;
pub mod config;
pub mod error;
pub mod stats;
