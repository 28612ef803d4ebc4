use crate::config::WebDriverSettings;
use crate::domain::ports::{Browser, BrowserLauncher, ClickMode, ElementLocator, WaitCondition};
use crate::utils::error::{Result, ScrapeError};
use async_trait::async_trait;
use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder, Locator};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::time::Duration;
use tokio::time::Instant;

fn locator(target: &ElementLocator) -> Locator<'_> {
    match target {
        ElementLocator::Id(v) => Locator::Id(v),
        ElementLocator::Css(v) => Locator::Css(v),
        ElementLocator::XPath(v) => Locator::XPath(v),
    }
}

/// 透過 W3C WebDriver 控制的瀏覽器 session
pub struct WebDriverBrowser {
    client: Client,
    poll_interval: Duration,
}

impl WebDriverBrowser {
    pub fn new(client: Client, poll_interval: Duration) -> Self {
        Self {
            client,
            poll_interval,
        }
    }

    async fn first(&self, target: &ElementLocator) -> Result<Option<Element>> {
        let found = self.client.find_all(locator(target)).await?;
        Ok(found.into_iter().next())
    }

    async fn element(&self, target: &ElementLocator) -> Result<Element> {
        Ok(self.client.find(locator(target)).await?)
    }

    async fn run_on(&self, script: &str, element: &Element) -> Result<()> {
        let argument = serde_json::to_value(element)?;
        self.client.execute(script, vec![argument]).await?;
        Ok(())
    }
}

async fn satisfies(element: &Element, condition: WaitCondition) -> bool {
    match condition {
        WaitCondition::Present => true,
        WaitCondition::Visible => element.is_displayed().await.unwrap_or(false),
        WaitCondition::Clickable => {
            element.is_displayed().await.unwrap_or(false)
                && element.is_enabled().await.unwrap_or(false)
        }
    }
}

#[async_trait]
impl Browser for WebDriverBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.client.goto(url).await?;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        target: &ElementLocator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(element) = self.first(target).await? {
                if satisfies(&element, condition).await {
                    return Ok(());
                }
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(ScrapeError::Timeout {
                    target: target.to_string(),
                    after_ms: timeout.as_millis() as u64,
                });
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn is_present(&mut self, target: &ElementLocator) -> Result<bool> {
        Ok(self.first(target).await?.is_some())
    }

    async fn send_keys(&mut self, target: &ElementLocator, text: &str) -> Result<()> {
        self.element(target).await?.send_keys(text).await?;
        Ok(())
    }

    async fn click(&mut self, target: &ElementLocator, mode: ClickMode) -> Result<()> {
        let element = self.element(target).await?;
        match mode {
            ClickMode::Native => element.click().await?,
            ClickMode::Script => self.run_on("arguments[0].click();", &element).await?,
        }
        Ok(())
    }

    async fn scroll_into_view(&mut self, target: &ElementLocator) -> Result<()> {
        let element = self.element(target).await?;
        self.run_on("arguments[0].scrollIntoView(true);", &element)
            .await
    }

    async fn text(&mut self, target: &ElementLocator) -> Result<String> {
        Ok(self.element(target).await?.text().await?)
    }

    async fn page_source(&mut self) -> Result<String> {
        Ok(self.client.source().await?)
    }

    async fn refresh(&mut self) -> Result<()> {
        self.client.refresh().await?;
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.client.clone().close().await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    ready: bool,
    #[serde(default)]
    message: String,
}

/// 每次呼叫開一個新的 WebDriver session
pub struct WebDriverLauncher {
    settings: WebDriverSettings,
    poll_interval: Duration,
    http: reqwest::Client,
}

impl WebDriverLauncher {
    pub fn new(settings: WebDriverSettings, poll_interval: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.probe_timeout_ms))
            .build()?;
        Ok(Self {
            settings,
            poll_interval,
            http,
        })
    }

    fn unavailable(&self, reason: impl Into<String>) -> ScrapeError {
        ScrapeError::BrowserUnavailable {
            endpoint: self.settings.endpoint.clone(),
            reason: reason.into(),
        }
    }

    /// 先確認 WebDriver 伺服器可以接受新 session
    pub async fn probe_status(&self) -> Result<()> {
        let url = format!("{}/status", self.settings.endpoint.trim_end_matches('/'));
        tracing::debug!("Probing WebDriver status at {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.unavailable(format!("status endpoint returned {}", response.status())));
        }

        let status: StatusResponse = response
            .json()
            .await
            .map_err(|e| self.unavailable(format!("unexpected status payload: {}", e)))?;

        if !status.value.ready {
            return Err(self.unavailable(if status.value.message.is_empty() {
                "driver is not ready".to_string()
            } else {
                status.value.message
            }));
        }
        Ok(())
    }

    pub fn capabilities(&self) -> Map<String, Value> {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--window-size=1280,1024".to_string(),
        ];
        if self.settings.headless {
            args.push("--headless=new".to_string());
        }

        let mut chrome_options = json!({ "args": args });
        if let Some(binary) = &self.settings.browser_binary {
            chrome_options["binary"] = json!(binary);
        }

        let mut capabilities = Map::new();
        capabilities.insert("browserName".to_string(), json!("chrome"));
        capabilities.insert("goog:chromeOptions".to_string(), chrome_options);
        capabilities
    }
}

#[async_trait]
impl BrowserLauncher for WebDriverLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        if self.settings.probe_status {
            self.probe_status().await?;
        }

        tracing::debug!("Opening WebDriver session at {}", self.settings.endpoint);
        let client = ClientBuilder::native()
            .capabilities(self.capabilities())
            .connect(&self.settings.endpoint)
            .await?;

        Ok(Box::new(WebDriverBrowser::new(client, self.poll_interval)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn launcher(endpoint: String) -> WebDriverLauncher {
        let settings = WebDriverSettings {
            endpoint,
            probe_timeout_ms: 2_000,
            ..WebDriverSettings::default()
        };
        WebDriverLauncher::new(settings, Duration::from_millis(50)).unwrap()
    }

    #[tokio::test]
    async fn test_probe_accepts_ready_driver() {
        let server = MockServer::start_async().await;
        let status = server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(200).json_body(serde_json::json!({
                    "value": { "ready": true, "message": "ChromeDriver ready for new sessions." }
                }));
            })
            .await;

        let result = launcher(server.base_url()).probe_status().await;
        assert!(result.is_ok());
        status.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_reports_busy_driver() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(200).json_body(serde_json::json!({
                    "value": { "ready": false, "message": "session limit reached" }
                }));
            })
            .await;

        let err = launcher(server.base_url()).probe_status().await.unwrap_err();
        match err {
            ScrapeError::BrowserUnavailable { reason, .. } => {
                assert_eq!(reason, "session limit reached")
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_launch_stops_when_status_endpoint_fails() {
        let server = MockServer::start_async().await;
        let status = server
            .mock_async(|when, then| {
                when.method(GET).path("/status");
                then.status(500);
            })
            .await;
        let session = server
            .mock_async(|when, then| {
                when.method(POST).path("/session");
                then.status(500);
            })
            .await;

        let result = launcher(server.base_url()).launch().await;
        assert!(matches!(
            result,
            Err(ScrapeError::BrowserUnavailable { .. })
        ));
        status.assert_async().await;
        assert_eq!(session.hits_async().await, 0);
    }

    #[test]
    fn test_capabilities_follow_settings() {
        let settings = WebDriverSettings {
            headless: false,
            browser_binary: Some("/usr/bin/chromium".to_string()),
            ..WebDriverSettings::default()
        };
        let launcher = WebDriverLauncher::new(settings, Duration::from_millis(50)).unwrap();
        let caps = launcher.capabilities();

        let options = &caps["goog:chromeOptions"];
        assert_eq!(options["binary"], "/usr/bin/chromium");
        let args = options["args"].as_array().unwrap();
        assert!(!args.iter().any(|a| a == "--headless=new"));
    }
}
