use crate::utils::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 頁面元素的定位方式（對應 TOML 中的 `{ by = "xpath", value = "..." }`）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum ElementLocator {
    Id(String),
    Css(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

impl fmt::Display for ElementLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementLocator::Id(v) => write!(f, "id:{}", v),
            ElementLocator::Css(v) => write!(f, "css:{}", v),
            ElementLocator::XPath(v) => write!(f, "xpath:{}", v),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    Present,
    Visible,
    Clickable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickMode {
    Native,
    /// 以 `arguments[0].click()` 觸發，用於原生點擊不可靠的元素
    Script,
}

/// 可控制的瀏覽器 session。每次計算只會擁有一個，不跨呼叫共用。
#[async_trait]
pub trait Browser: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;

    /// 在 timeout 內等待條件成立，逾時回傳 `ScrapeError::Timeout`
    async fn wait_for(
        &mut self,
        target: &ElementLocator,
        condition: WaitCondition,
        timeout: Duration,
    ) -> Result<()>;

    /// 不等待，只檢查元素目前是否存在
    async fn is_present(&mut self, target: &ElementLocator) -> Result<bool>;

    async fn send_keys(&mut self, target: &ElementLocator, text: &str) -> Result<()>;
    async fn click(&mut self, target: &ElementLocator, mode: ClickMode) -> Result<()>;
    async fn scroll_into_view(&mut self, target: &ElementLocator) -> Result<()>;
    async fn text(&mut self, target: &ElementLocator) -> Result<String>;
    async fn page_source(&mut self) -> Result<String>;
    async fn refresh(&mut self) -> Result<()>;
    async fn quit(&mut self) -> Result<()>;
}

#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Browser>>;
}

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}
