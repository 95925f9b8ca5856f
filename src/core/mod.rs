pub mod billing;
pub mod csv_processor;
pub mod export;
pub mod geocoding;
pub mod jobs;
pub mod maps;
pub mod plans;
pub mod sharing;

pub use crate::domain::ports::{ConfigProvider, Geocoder, Storage};
pub use crate::utils::error::Result;
