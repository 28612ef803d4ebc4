use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("WebDriver command failed: {0}")]
    WebDriverError(#[from] fantoccini::error::CmdError),

    #[error("WebDriver session could not be created: {0}")]
    SessionError(#[from] fantoccini::error::NewSessionError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration field: {field}")]
    MissingConfigError { field: String },

    #[error("Incorrect credentials: the portal showed its login error popup")]
    InvalidCredentials,

    #[error("Timed out after {after_ms}ms waiting for {target}")]
    Timeout { target: String, after_ms: u64 },

    #[error("Browser automation unavailable at {endpoint}: {reason}")]
    BrowserUnavailable { endpoint: String, reason: String },

    #[error("Could not read grade for {subject} from '{raw}': {reason}")]
    GradeParseError {
        subject: String,
        raw: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Authentication,
    Navigation,
    Extraction,
    Browser,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ScrapeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. } => ErrorCategory::Configuration,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Timeout { .. } => ErrorCategory::Navigation,
            Self::GradeParseError { .. }
            | Self::ProcessingError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_) => ErrorCategory::Extraction,
            Self::WebDriverError(_)
            | Self::SessionError(_)
            | Self::HttpError(_)
            | Self::BrowserUnavailable { .. } => ErrorCategory::Browser,
            Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 單一科目的解析失敗只會跳過該科目
            Self::GradeParseError { .. } => ErrorSeverity::Low,
            Self::Timeout { .. } | Self::WebDriverError(_) => ErrorSeverity::Medium,
            Self::InvalidCredentials
            | Self::ConfigError { .. }
            | Self::ConfigValidationError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::MissingConfigError { .. }
            | Self::ProcessingError { .. }
            | Self::CsvError(_)
            | Self::SerializationError(_) => ErrorSeverity::High,
            Self::SessionError(_)
            | Self::HttpError(_)
            | Self::BrowserUnavailable { .. }
            | Self::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("The configuration is invalid: {}", self),
            ErrorCategory::Authentication => {
                "The portal rejected the username or password.".to_string()
            }
            ErrorCategory::Navigation => {
                "The portal did not show the expected page in time.".to_string()
            }
            ErrorCategory::Extraction => format!("Could not read the grades page: {}", self),
            ErrorCategory::Browser => "Could not drive the browser session.".to_string(),
            ErrorCategory::System => format!("A system error occurred: {}", self),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => "Check the TOML file against the documented sections",
            ErrorCategory::Authentication => "Check the Pronote username and password",
            ErrorCategory::Navigation => {
                "Retry later; if it keeps failing the portal markup may have changed, update [selectors]"
            }
            ErrorCategory::Extraction => "Update the [grades] selectors to the current portal markup",
            ErrorCategory::Browser => {
                "Start a WebDriver server (e.g. chromedriver --port=4444) and check --webdriver"
            }
            ErrorCategory::System => "Check file permissions and available disk space",
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
