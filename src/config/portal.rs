use crate::domain::model::CoefficientTable;
use crate::domain::ports::ElementLocator;
use crate::utils::error::{Result, ScrapeError};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

/// 單一科目係數上限
pub const MAX_COEFFICIENT: u32 = 1_000;

/// 入口網站、選擇器、時間與係數表。每個區段都可省略，預設值即目前網站的版本。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    pub portal: PortalSection,
    pub webdriver: WebDriverSettings,
    pub timing: TimingConfig,
    pub selectors: PortalSelectors,
    pub grades: GradeSelectors,
    pub coefficients: CoefficientTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginCheck {
    /// 輪詢直到錯誤視窗或登入後才有的元素出現
    SuccessMarker,
    /// 短暫探測錯誤視窗，沒出現就當作登入成功
    ErrorProbe,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSection {
    pub url: String,
    pub name_prefix: String,
    pub login_check: LoginCheck,
}

impl Default for PortalSection {
    fn default() -> Self {
        Self {
            url: "https://0593102b.index-education.net/pronote/eleve.html".to_string(),
            name_prefix: crate::core::name::DEFAULT_NAME_PREFIX.to_string(),
            login_check: LoginCheck::SuccessMarker,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebDriverSettings {
    pub endpoint: String,
    pub headless: bool,
    pub browser_binary: Option<String>,
    pub probe_status: bool,
    pub probe_timeout_ms: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".to_string(),
            headless: true,
            browser_binary: None,
            probe_status: true,
            probe_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub element_timeout_ms: u64,
    pub error_probe_ms: u64,
    pub settle_delay_ms: u64,
    pub retry_delay_ms: u64,
    pub retry_attempts: u32,
    pub poll_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            element_timeout_ms: 20_000,
            error_probe_ms: 100,
            settle_delay_ms: 500,
            retry_delay_ms: 3_000,
            retry_attempts: 2,
            poll_interval_ms: 100,
        }
    }
}

impl TimingConfig {
    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }

    pub fn error_probe(&self) -> Duration {
        Duration::from_millis(self.error_probe_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalSelectors {
    pub username: ElementLocator,
    pub password: ElementLocator,
    pub login_button: ElementLocator,
    pub error_popup: ElementLocator,
    pub login_success: ElementLocator,
    pub user_heading: ElementLocator,
    pub notes_menu: ElementLocator,
    pub grades_detail: ElementLocator,
    pub display_mode_toggle: ElementLocator,
    pub by_subject_toggle: ElementLocator,
    pub grades_container: ElementLocator,
}

const NOTES_MENU_XPATH: &str =
    "//div[contains(@class, 'label-menu_niveau0') and contains(text(),'Notes')]";

impl Default for PortalSelectors {
    fn default() -> Self {
        let xpath = |v: &str| ElementLocator::XPath(v.to_string());
        Self {
            username: ElementLocator::Id("id_29".to_string()),
            password: ElementLocator::Id("id_30".to_string()),
            login_button: ElementLocator::Id("id_18".to_string()),
            error_popup: xpath("/html/body/div[2]/div[2]/div/div"),
            login_success: xpath(NOTES_MENU_XPATH),
            user_heading: xpath(
                "/html/body/div[4]/div/div[1]/div/div[1]/div/div[2]/div[2]/div[2]/div[1]",
            ),
            notes_menu: xpath(NOTES_MENU_XPATH),
            grades_detail: xpath("//li[@aria-label='Détail de mes notes']"),
            display_mode_toggle: xpath("/html/body/div[4]/div/div[1]/div/div[5]/div[2]/label[2]/input"),
            by_subject_toggle: xpath(
                "/html/body/div[4]/div/div[1]/div/div[5]/div[2]/label[2]/span[2]",
            ),
            grades_container: ElementLocator::Css(".zone-contenu-format".to_string()),
        }
    }
}

/// 成績頁面解析用的 CSS 選擇器
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradeSelectors {
    pub block: String,
    pub subject: String,
    pub grade: String,
    pub large_title: String,
    pub average_label: String,
    pub label_delimiter: String,
}

impl Default for GradeSelectors {
    fn default() -> Self {
        Self {
            block: "div.zone-contenu-format".to_string(),
            subject: "div.zone-principale span.ie-titre-gros".to_string(),
            grade: "div.zone-complementaire".to_string(),
            large_title: "div.ie-titre-gros".to_string(),
            average_label: "Moyenne élève".to_string(),
            label_delimiter: ":".to_string(),
        }
    }
}

impl PortalConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ScrapeError::ConfigError {
            message: format!("cannot read {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ScrapeError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PRONOTE_URL})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("portal.url", &self.portal.url)?;
        validation::validate_url("webdriver.endpoint", &self.webdriver.endpoint)?;

        validation::validate_positive_number(
            "timing.element_timeout_ms",
            self.timing.element_timeout_ms,
            1,
        )?;
        validation::validate_positive_number(
            "timing.poll_interval_ms",
            self.timing.poll_interval_ms,
            1,
        )?;
        validation::validate_range("timing.retry_attempts", self.timing.retry_attempts, 0, 10)?;

        validation::validate_non_empty_string("grades.average_label", &self.grades.average_label)?;
        validation::validate_non_empty_string(
            "grades.label_delimiter",
            &self.grades.label_delimiter,
        )?;
        // 選擇器能否編譯由解析器負責檢查
        crate::core::grades::GradePageParser::new(&self.grades)?;

        if self.coefficients.is_empty() {
            return Err(ScrapeError::MissingConfigError {
                field: "coefficients".to_string(),
            });
        }
        for (subject, coefficient) in self.coefficients.iter() {
            validation::validate_range(
                &format!("coefficients.{}", subject),
                coefficient,
                1,
                MAX_COEFFICIENT,
            )?;
        }

        Ok(())
    }
}

impl Validate for PortalConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = PortalConfig::from_toml_str("").unwrap();
        assert!(config.portal.url.ends_with("/pronote/eleve.html"));
        assert_eq!(config.timing.retry_attempts, 2);
        assert_eq!(config.timing.error_probe(), Duration::from_millis(100));
        assert_eq!(config.coefficients.get("MATHEMATIQUES"), Some(15));
        assert_eq!(config.selectors.username, ElementLocator::Id("id_29".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_remaining_defaults() {
        let toml_content = r#"
[portal]
login_check = "error_probe"

[timing]
retry_attempts = 4

[selectors]
username = { by = "css", value = "input[name=login]" }

[coefficients]
"mathematiques" = 16
"LATIN" = 3
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.portal.login_check, LoginCheck::ErrorProbe);
        assert_eq!(config.timing.retry_attempts, 4);
        assert_eq!(config.timing.retry_delay_ms, 3_000);
        assert_eq!(
            config.selectors.username,
            ElementLocator::Css("input[name=login]".to_string())
        );
        assert_eq!(config.selectors.password, ElementLocator::Id("id_30".to_string()));
        // 係數表整個被取代，不與預設合併
        assert_eq!(config.coefficients.len(), 2);
        assert_eq!(config.coefficients.get("MATHEMATIQUES"), Some(16));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_PRONOTE_PORTAL_URL", "https://demo.index-education.net/pronote/eleve.html");

        let toml_content = r#"
[portal]
url = "${TEST_PRONOTE_PORTAL_URL}"
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.portal.url,
            "https://demo.index-education.net/pronote/eleve.html"
        );

        std::env::remove_var("TEST_PRONOTE_PORTAL_URL");
    }

    #[test]
    fn test_unset_env_var_is_left_in_place_and_fails_validation() {
        let toml_content = r#"
[webdriver]
endpoint = "${TEST_PRONOTE_UNSET_ENDPOINT}"
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.webdriver.endpoint, "${TEST_PRONOTE_UNSET_ENDPOINT}");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_coefficient_is_rejected() {
        let toml_content = r#"
[coefficients]
"EPS" = 0
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ScrapeError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_oversized_coefficient_is_rejected() {
        let toml_content = r#"
[coefficients]
"A" = 4000000000
"B" = 4000000000
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();
        match config.validate().unwrap_err() {
            ScrapeError::InvalidConfigValueError { field, value, .. } => {
                assert_eq!(field, "coefficients.A");
                assert_eq!(value, "4000000000");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let at_cap = PortalConfig::from_toml_str("[coefficients]\n\"A\" = 1000\n").unwrap();
        assert!(at_cap.validate().is_ok());
    }

    #[test]
    fn test_bad_grade_selector_is_rejected() {
        let toml_content = r#"
[grades]
subject = "span[["
"#;
        let config = PortalConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_reported() {
        let err = PortalConfig::from_toml_str("[timing\nretry_attempts = 1").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = PortalConfig::from_file("/nonexistent/pronote.toml").unwrap_err();
        assert!(matches!(err, ScrapeError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let toml_content = r#"
[webdriver]
endpoint = "http://127.0.0.1:9515"
headless = false
"#;
        temp_file.write_all(toml_content.as_bytes()).unwrap();

        let config = PortalConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.webdriver.endpoint, "http://127.0.0.1:9515");
        assert!(!config.webdriver.headless);
    }
}
