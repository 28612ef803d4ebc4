pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::{CliConfig, OutputFormat};

pub use adapters::{LocalStorage, WebDriverLauncher};
pub use config::PortalConfig;
pub use core::pipeline::AveragingPipeline;
pub use domain::model::{AverageReport, AverageResult, Condition, Credentials};
pub use utils::error::{Result, ScrapeError};
