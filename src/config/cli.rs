use crate::config::PortalConfig;
use crate::domain::model::Credentials;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::{self, Validate};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Text => "txt",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        }
    }
}

#[derive(Clone, Parser)]
#[command(name = "pronote-averages")]
#[command(about = "Log into Pronote and compute weighted grade averages")]
pub struct CliConfig {
    /// Pronote username
    #[arg(short, long, env = "PRONOTE_USERNAME")]
    pub username: String,

    /// Pronote password
    #[arg(short, long, env = "PRONOTE_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Path to a TOML file overriding portal URL, selectors, timings or coefficients
    #[arg(short, long, env = "PRONOTE_CONFIG")]
    pub config: Option<String>,

    /// WebDriver endpoint (chromedriver, geckodriver, selenium)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Directory where the report is also saved
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON lines on stderr")]
    pub json_logs: bool,
}

impl std::fmt::Debug for CliConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliConfig")
            .field("username", &self.username)
            .field("config", &self.config)
            .field("webdriver", &self.webdriver)
            .field("headed", &self.headed)
            .field("format", &self.format)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl CliConfig {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    /// 載入 TOML（若有）並套用命令列覆蓋設定
    pub fn portal_config(&self) -> Result<PortalConfig> {
        let mut config = match &self.config {
            Some(path) => PortalConfig::from_file(path)?,
            None => PortalConfig::default(),
        };

        if let Some(endpoint) = &self.webdriver {
            config.webdriver.endpoint = endpoint.clone();
            tracing::info!("🔧 WebDriver endpoint overridden to: {}", endpoint);
        }
        if self.headed {
            config.webdriver.headless = false;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        if let Some(path) = &self.config {
            validation::validate_path("config", path)?;
        }
        if let Some(output) = &self.output {
            validation::validate_path("output", output)?;
        }
        if let Some(endpoint) = &self.webdriver {
            validation::validate_url("webdriver", endpoint)?;
        }
        if self.username.is_empty() {
            return Err(ScrapeError::MissingConfigError {
                field: "username".to_string(),
            });
        }
        Ok(())
    }
}
