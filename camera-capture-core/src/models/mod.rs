pub mod capture_result;
pub mod characteristics;
pub mod config;
pub mod error;
pub mod geometry;
pub mod metadata;
pub mod request;
pub mod state;
