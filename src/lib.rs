pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{documents::DocumentStore, memory::MemoryStorage};
pub use app::Backend;
pub use config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use config::CliConfig;

#[cfg(feature = "lambda")]
pub use config::lambda::{LambdaConfig, S3Storage};

pub use config::toml_config::AppConfig;
pub use core::jobs::{JobEngine, JobReceipt, UploadRequest};
pub use utils::error::{MapiesError, Result};
