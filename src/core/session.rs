use crate::config::{LoginCheck, PortalConfig};
use crate::core::grades::GradePageParser;
use crate::domain::model::{Credentials, GradeOutcome};
use crate::domain::ports::{Browser, ClickMode, ElementLocator, WaitCondition};
use crate::utils::error::{Result, ScrapeError};
use std::fmt;
use tokio::time::Instant;

/// 入口網站互動的各個階段
#[derive(Debug, Clone, PartialEq)]
enum SessionState {
    Start,
    Authenticating,
    ErrorCheck,
    NameCapture,
    MenuNav,
    GradesView,
    ModeSelect,
    Extracting { attempt: u32 },
    Retry { attempt: u32 },
    Done(GradeOutcome),
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Start => write!(f, "start"),
            SessionState::Authenticating => write!(f, "authenticating"),
            SessionState::ErrorCheck => write!(f, "error-check"),
            SessionState::NameCapture => write!(f, "name-capture"),
            SessionState::MenuNav => write!(f, "menu-nav"),
            SessionState::GradesView => write!(f, "grades-view"),
            SessionState::ModeSelect => write!(f, "mode-select"),
            SessionState::Extracting { attempt } => write!(f, "extracting#{}", attempt),
            SessionState::Retry { attempt } => write!(f, "retry#{}", attempt),
            SessionState::Done(_) => write!(f, "done"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    /// 頁首原始文字，尚未整理
    pub raw_name: Option<String>,
    pub grades: GradeOutcome,
    pub attempts: u32,
}

/// 驅動一個已開啟的瀏覽器完成登入、導覽與成績擷取。不負責關閉瀏覽器。
pub struct PortalSession<'a> {
    config: &'a PortalConfig,
    parser: &'a GradePageParser,
    browser: &'a mut dyn Browser,
    raw_name: Option<String>,
    last_attempt: u32,
}

impl<'a> PortalSession<'a> {
    pub fn new(
        config: &'a PortalConfig,
        parser: &'a GradePageParser,
        browser: &'a mut dyn Browser,
    ) -> Self {
        Self {
            config,
            parser,
            browser,
            raw_name: None,
            last_attempt: 0,
        }
    }

    pub async fn run(mut self, credentials: &Credentials) -> Result<SessionOutcome> {
        let mut state = SessionState::Start;
        loop {
            tracing::debug!("➡️ Portal session state: {}", state);
            let current = state.to_string();
            let next = match state {
                SessionState::Start => self.start().await,
                SessionState::Authenticating => self.authenticate(credentials).await,
                SessionState::ErrorCheck => self.check_login().await,
                SessionState::NameCapture => self.capture_name().await,
                SessionState::MenuNav => self.open_notes_menu().await,
                SessionState::GradesView => self.open_grades_detail().await,
                SessionState::ModeSelect => self.select_by_subject().await,
                SessionState::Extracting { attempt } => self.extract(attempt).await,
                SessionState::Retry { attempt } => self.retry(attempt).await,
                SessionState::Done(grades) => {
                    let attempts = self.attempts_used();
                    return Ok(SessionOutcome {
                        raw_name: self.raw_name,
                        grades,
                        attempts,
                    });
                }
            };

            state = next.inspect_err(|e| {
                tracing::error!("💥 Portal session failed during {}: {}", current, e);
            })?;
        }
    }

    fn attempts_used(&self) -> u32 {
        // 至少擷取一次；之後每次重試加一
        self.last_attempt + 1
    }

    async fn wait(&mut self, target: &ElementLocator, condition: WaitCondition) -> Result<()> {
        let timeout = self.config.timing.element_timeout();
        self.browser.wait_for(target, condition, timeout).await
    }

    async fn start(&mut self) -> Result<SessionState> {
        let config = self.config;
        tracing::info!("🌐 Opening portal {}", config.portal.url);
        self.browser.goto(&config.portal.url).await?;
        self.wait(&config.selectors.username, WaitCondition::Visible)
            .await?;
        Ok(SessionState::Authenticating)
    }

    async fn authenticate(&mut self, credentials: &Credentials) -> Result<SessionState> {
        let config = self.config;
        let selectors = &config.selectors;
        self.browser
            .send_keys(&selectors.username, &credentials.username)
            .await?;
        self.browser
            .send_keys(&selectors.password, &credentials.password)
            .await?;
        self.browser
            .click(&selectors.login_button, ClickMode::Native)
            .await?;
        tracing::debug!("Submitted login form for {}", credentials.username);
        Ok(SessionState::ErrorCheck)
    }

    async fn check_login(&mut self) -> Result<SessionState> {
        let config = self.config;
        match config.portal.login_check {
            LoginCheck::SuccessMarker => self.await_login_signal().await?,
            LoginCheck::ErrorProbe => self.probe_error_popup().await?,
        }
        tracing::info!("🔓 Login succeeded, home page loaded");
        Ok(SessionState::NameCapture)
    }

    /// 錯誤視窗或登入後的元素，哪個先出現就以哪個為準
    async fn await_login_signal(&mut self) -> Result<()> {
        let config = self.config;
        let selectors = &config.selectors;
        let timing = &config.timing;
        let deadline = Instant::now() + timing.element_timeout();

        loop {
            // 登入後的元素不會出現在失敗頁面上，先檢查它
            if self.browser.is_present(&selectors.login_success).await? {
                return Ok(());
            }
            if self.browser.is_present(&selectors.error_popup).await? {
                tracing::warn!("🚫 Login error popup detected");
                return Err(ScrapeError::InvalidCredentials);
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ScrapeError::Timeout {
                    target: format!(
                        "login outcome ({} or {})",
                        selectors.error_popup, selectors.login_success
                    ),
                    after_ms: timing.element_timeout_ms,
                });
            }
            tokio::time::sleep(timing.poll_interval().min(deadline - now)).await;
        }
    }

    /// 短暫等待錯誤視窗；沒出現就視為登入成功
    async fn probe_error_popup(&mut self) -> Result<()> {
        let config = self.config;
        let probe = config.timing.error_probe();
        match self
            .browser
            .wait_for(&config.selectors.error_popup, WaitCondition::Present, probe)
            .await
        {
            Ok(()) => {
                tracing::warn!("🚫 Login error popup detected");
                Err(ScrapeError::InvalidCredentials)
            }
            Err(ScrapeError::Timeout { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn capture_name(&mut self) -> Result<SessionState> {
        match self.read_heading().await {
            Ok(raw) => {
                tracing::debug!("Captured heading text: {}", raw);
                self.raw_name = Some(raw);
            }
            Err(e) => tracing::warn!("⚠️ Could not read the student name: {}", e),
        }
        Ok(SessionState::MenuNav)
    }

    async fn read_heading(&mut self) -> Result<String> {
        let config = self.config;
        let heading = &config.selectors.user_heading;
        self.wait(heading, WaitCondition::Visible).await?;
        Ok(self.browser.text(heading).await?.trim().to_string())
    }

    async fn open_notes_menu(&mut self) -> Result<SessionState> {
        let config = self.config;
        let menu = &config.selectors.notes_menu;
        self.wait(menu, WaitCondition::Clickable).await?;
        self.browser.scroll_into_view(menu).await?;
        self.browser.click(menu, ClickMode::Native).await?;
        Ok(SessionState::GradesView)
    }

    async fn open_grades_detail(&mut self) -> Result<SessionState> {
        let config = self.config;
        let selectors = &config.selectors;
        self.wait(&selectors.grades_detail, WaitCondition::Present)
            .await?;
        self.browser.scroll_into_view(&selectors.grades_detail).await?;
        self.browser
            .click(&selectors.grades_detail, ClickMode::Script)
            .await?;
        tracing::info!("📂 Opened grade details");

        self.wait(&selectors.display_mode_toggle, WaitCondition::Present)
            .await?;
        tokio::time::sleep(config.timing.settle_delay()).await;
        Ok(SessionState::ModeSelect)
    }

    async fn select_by_subject(&mut self) -> Result<SessionState> {
        let config = self.config;
        let selectors = &config.selectors;
        self.wait(&selectors.by_subject_toggle, WaitCondition::Clickable)
            .await?;
        self.browser
            .scroll_into_view(&selectors.by_subject_toggle)
            .await?;
        self.browser
            .click(&selectors.by_subject_toggle, ClickMode::Script)
            .await?;
        tracing::info!("📑 Switched to by-subject layout");

        self.wait(&selectors.grades_container, WaitCondition::Present)
            .await?;
        Ok(SessionState::Extracting { attempt: 0 })
    }

    async fn extract(&mut self, attempt: u32) -> Result<SessionState> {
        let config = self.config;
        let html = self.browser.page_source().await?;
        let snapshot = self.parser.parse(&html);
        self.last_attempt = attempt;

        if !snapshot.is_empty() {
            tracing::info!("📝 Extracted {} grades", snapshot.grades.len());
            return Ok(SessionState::Done(GradeOutcome::Found(snapshot.grades)));
        }

        let retries = config.timing.retry_attempts;
        if attempt < retries {
            tracing::info!(
                "🔁 No grades found, retrying in {}ms ({}/{})",
                config.timing.retry_delay_ms,
                attempt + 1,
                retries
            );
            return Ok(SessionState::Retry { attempt });
        }

        let outcome = if snapshot.subject_blocks > 0 {
            tracing::info!(
                "📭 {} subjects listed but none has a grade yet",
                snapshot.subject_blocks
            );
            GradeOutcome::ConfirmedEmpty
        } else {
            tracing::warn!("⚠️ Grades view never rendered any subject");
            GradeOutcome::NotRendered
        };
        Ok(SessionState::Done(outcome))
    }

    async fn retry(&mut self, attempt: u32) -> Result<SessionState> {
        let config = self.config;
        tokio::time::sleep(config.timing.retry_delay()).await;
        self.browser.refresh().await?;
        self.wait(&config.selectors.grades_container, WaitCondition::Present)
            .await?;
        Ok(SessionState::Extracting {
            attempt: attempt + 1,
        })
    }
}
