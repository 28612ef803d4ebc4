#[cfg(feature = "cli")]
pub mod cli;
pub mod portal;

pub use portal::{
    GradeSelectors, LoginCheck, PortalConfig, PortalSection, PortalSelectors, TimingConfig,
    WebDriverSettings,
};

#[cfg(feature = "cli")]
pub use cli::{CliConfig, OutputFormat};
