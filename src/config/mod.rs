pub mod cli;
pub mod lambda;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::{CliConfig, Command};

#[cfg(feature = "cli")]
mod cli_args {
    use super::toml_config::AppConfig;
    use crate::utils::error::Result;
    use crate::utils::validation::{self, Validate};
    use clap::{Parser, Subcommand};
    use serde::{Deserialize, Serialize};
    use std::path::Path;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "mapies")]
    #[command(about = "Mapies backend jobs: CSV geocoding import, map data and billing sync")]
    pub struct CliConfig {
        /// Path to TOML configuration file
        #[arg(short, long, default_value = "mapies.toml")]
        pub config: String,

        /// Override storage.data_dir from the config file
        #[arg(long)]
        pub data_dir: Option<String>,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per job phase")]
        pub monitor: bool,

        #[command(subcommand)]
        pub command: Command,
    }

    #[derive(Debug, Clone, Serialize, Deserialize, Subcommand)]
    pub enum Command {
        /// Create or replace a user document
        CreateUser {
            #[arg(long)]
            user: String,
            #[arg(long)]
            email: String,
            #[arg(long, default_value = "freemium")]
            tier: String,
        },
        /// Create a map owned by a user
        CreateMap {
            #[arg(long)]
            user: String,
            #[arg(long)]
            name: String,
        },
        /// Upload a CSV file and geocode it into a map
        Import {
            #[arg(long)]
            user: String,
            #[arg(long)]
            map: String,
            #[arg(long)]
            file: String,
            /// Column mapping as field=Header pairs, e.g. name=Store,address=Street
            #[arg(long, value_delimiter = ',')]
            mapping: Vec<String>,
        },
        /// Re-run a failed or partially failed CSV job
        Retry {
            #[arg(long)]
            user: String,
            #[arg(long)]
            job: String,
        },
        /// Print a CSV job document
        Status {
            #[arg(long)]
            user: String,
            #[arg(long)]
            job: String,
        },
        /// Export a map's markers as a ZIP archive
        Export {
            #[arg(long)]
            user: String,
            #[arg(long)]
            map: String,
        },
        /// Apply a Stripe webhook event stored in a JSON file
        Webhook {
            #[arg(long)]
            payload: String,
            /// Stripe-Signature header; required when a webhook secret is configured
            #[arg(long)]
            signature: Option<String>,
        },
        /// Recount marker and polygon stats for a map
        RecomputeStats {
            #[arg(long)]
            map: String,
        },
    }

    impl CliConfig {
        /// 載入 TOML 配置；檔案不存在時使用預設值
        pub fn load_app_config(&self) -> Result<AppConfig> {
            let mut config = if Path::new(&self.config).exists() {
                AppConfig::from_file(&self.config)?
            } else {
                tracing::debug!("Config file '{}' not found, using defaults", self.config);
                AppConfig::default()
            };

            if let Some(data_dir) = &self.data_dir {
                config.storage.data_dir = data_dir.clone();
            }
            if self.monitor {
                config.monitoring.enabled = true;
            }

            config.validate()?;
            Ok(config)
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("config", &self.config)?;
            if let Some(data_dir) = &self.data_dir {
                validation::validate_path("data_dir", data_dir)?;
            }
            Ok(())
        }
    }
}
