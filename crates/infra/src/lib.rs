//! Infrastructure layer: configuration, storage adapters and the use-case
//! services that sit between the HTTP handlers and the repositories.

pub mod config;
pub mod repository;
pub mod services;

pub use config::{AppConfig, BootstrapAdmin, ConfigError, StorageConfig};
pub use repository::{RepoResult, RepositoryError};
pub use services::{ServiceError, ServiceResult, Services};
