use crate::adapters::WebDriverLauncher;
use crate::config::PortalConfig;
use crate::core::averages::weighted_averages;
use crate::core::grades::GradePageParser;
use crate::core::name::NameNormalizer;
use crate::core::session::{PortalSession, SessionOutcome};
use crate::domain::model::{
    AverageReport, AverageResult, Averages, Condition, Credentials, GradeMap, GradeOutcome,
};
use crate::domain::ports::{Browser, BrowserLauncher};
use crate::utils::error::{Result, ScrapeError};

/// 持有瀏覽器 session；正常路徑呼叫 `close`，其他情況（取消、panic）在 Drop 時背景關閉
pub struct BrowserGuard {
    browser: Option<Box<dyn Browser>>,
}

impl BrowserGuard {
    pub fn new(browser: Box<dyn Browser>) -> Self {
        Self {
            browser: Some(browser),
        }
    }

    pub fn browser(&mut self) -> &mut dyn Browser {
        // 只有 close(self) 與 drop 會取走
        self.browser
            .as_deref_mut()
            .expect("browser is present until the guard is closed")
    }

    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            match browser.quit().await {
                Ok(()) => tracing::debug!("Browser session closed"),
                Err(e) => tracing::warn!("⚠️ Failed to close browser session: {}", e),
            }
        }
    }
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        let Some(mut browser) = self.browser.take() else {
            return;
        };
        tracing::warn!("⚠️ Browser session abandoned, quitting it in the background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = browser.quit().await {
                        tracing::warn!("⚠️ Failed to close abandoned browser session: {}", e);
                    }
                });
            }
            Err(_) => tracing::error!("No async runtime left to close the browser session"),
        }
    }
}

impl From<&ScrapeError> for Condition {
    fn from(error: &ScrapeError) -> Self {
        match error {
            ScrapeError::InvalidCredentials => Condition::InvalidCredentials,
            ScrapeError::Timeout { target, .. } => Condition::PageTimeout {
                target: target.clone(),
            },
            ScrapeError::BrowserUnavailable { reason, .. } => Condition::BrowserUnavailable {
                reason: reason.clone(),
            },
            ScrapeError::SessionError(e) => Condition::BrowserUnavailable {
                reason: e.to_string(),
            },
            other => Condition::Failed {
                reason: other.to_string(),
            },
        }
    }
}

/// 入口：帳密 → 瀏覽器 session → 成績 → 加權平均 + 姓名
pub struct AveragingPipeline<L: BrowserLauncher> {
    launcher: L,
    config: PortalConfig,
    parser: GradePageParser,
    normalizer: NameNormalizer,
}

impl AveragingPipeline<WebDriverLauncher> {
    pub fn with_webdriver(config: PortalConfig) -> Result<Self> {
        let launcher =
            WebDriverLauncher::new(config.webdriver.clone(), config.timing.poll_interval())?;
        Self::new(launcher, config)
    }
}

impl<L: BrowserLauncher> AveragingPipeline<L> {
    pub fn new(launcher: L, config: PortalConfig) -> Result<Self> {
        let parser = GradePageParser::new(&config.grades)?;
        let normalizer = NameNormalizer::new(config.portal.name_prefix.clone());
        Ok(Self {
            launcher,
            config,
            parser,
            normalizer,
        })
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// 不會回傳錯誤：所有失敗都變成空欄位加上 `Condition`
    pub async fn compute(&self, username: &str, password: &str) -> AverageReport {
        self.compute_for(&Credentials::new(username, password)).await
    }

    pub async fn compute_for(&self, credentials: &Credentials) -> AverageReport {
        tracing::info!("🚀 Computing averages for {}", credentials.username);

        let browser = match self.launcher.launch().await {
            Ok(browser) => browser,
            Err(e) => return self.failure(&e),
        };

        let mut guard = BrowserGuard::new(browser);
        let outcome = PortalSession::new(&self.config, &self.parser, guard.browser())
            .run(credentials)
            .await;
        guard.close().await;

        match outcome {
            Ok(outcome) => self.report(outcome),
            Err(e) => self.failure(&e),
        }
    }

    fn failure(&self, error: &ScrapeError) -> AverageReport {
        tracing::error!(
            "❌ Averages unavailable: {} (Category: {:?}, Severity: {:?})",
            error,
            error.category(),
            error.severity()
        );
        AverageReport::failed(Condition::from(error))
    }

    fn report(&self, outcome: SessionOutcome) -> AverageReport {
        let full_name = outcome
            .raw_name
            .as_deref()
            .map(|raw| self.normalizer.normalize(raw))
            .filter(|name| !name.is_empty());
        if let Some(name) = &full_name {
            tracing::info!("👤 Student: {}", name);
        }

        let (averages, condition, grades) = match outcome.grades {
            GradeOutcome::Found(grades) => {
                let averages = weighted_averages(&grades, &self.config.coefficients);
                let condition = Condition::GradesFound {
                    subjects: grades.len(),
                };
                (averages, condition, grades)
            }
            GradeOutcome::ConfirmedEmpty => {
                (Averages::default(), Condition::NoGradesYet, GradeMap::new())
            }
            GradeOutcome::NotRendered => (
                Averages::default(),
                Condition::GradesNotRendered,
                GradeMap::new(),
            ),
        };

        tracing::info!(
            "📊 Averages after {} attempt(s): overall={:?} core={:?} specialty={:?}",
            outcome.attempts,
            averages.overall,
            averages.core,
            averages.specialty
        );
        AverageReport::new(AverageResult::new(averages, full_name), condition, grades)
    }
}
