//! Mediaforge Core Library
//!
//! This crate provides the operation-chain grammar, error taxonomy,
//! configuration, and domain models shared by the mediaforge processing
//! components.

pub mod b64;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use chain::{ChainParser, Operation, OperationChain, ParamValue};
pub use config::ProcessorConfig;
pub use error::{ErrorMetadata, LogLevel, TransformError};
pub use models::MediaType;
