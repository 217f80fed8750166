//! Shared types, error model, and configuration for formscribe.
//!
//! This crate is the foundation depended on by all other formscribe crates.
//! It provides:
//! - [`FormscribeError`]: the unified error type
//! - Domain types ([`PlatformId`], [`FieldName`], [`SectionKey`], [`GenerationResult`], ...)
//! - The per-platform field tables ([`PlatformRegistry`], [`FieldDefinition`])
//! - Configuration ([`AppConfig`], [`ApiConfig`], config loading)

pub mod config;
pub mod error;
pub mod registry;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    ApiConfig, AppConfig, config_dir, config_file_path, init_config, load_config,
    load_config_from,
};
pub use error::{FormscribeError, Result};
pub use registry::{FieldDefinition, PlatformConfig, PlatformRegistry};
pub use types::{
    BULLET, DistributionOutcome, FieldName, GenerationRequest, GenerationResult, PlatformId,
    RequestId, ResponseFormat, SectionKey, SectionValue, StructuredContent, StyleOption,
};
