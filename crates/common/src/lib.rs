//! Shared configuration, error and storage layer for the breakwire services.

pub mod config;
pub mod db;
pub mod error;
pub mod store;

pub use config::AppConfig;
pub use error::AppError;
