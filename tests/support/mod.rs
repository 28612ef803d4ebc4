#![allow(dead_code)]

use async_trait::async_trait;
use pronote_averages::config::{PortalConfig, PortalSelectors, TimingConfig};
use pronote_averages::domain::ports::{
    Browser, BrowserLauncher, ClickMode, ElementLocator, WaitCondition,
};
use pronote_averages::{Result, ScrapeError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How the simulated portal behaves during one session.
#[derive(Debug, Clone, Default)]
pub struct PortalScript {
    pub reject_login: bool,
    pub heading: Option<String>,
    /// The logged-in page also has a node at the error popup path.
    pub stray_error_node: bool,
    /// Page source returned by each successive extraction; the last one repeats.
    pub grade_pages: Vec<String>,
    /// Elements that never show up.
    pub missing: Vec<ElementLocator>,
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn fast_config() -> PortalConfig {
    PortalConfig {
        timing: TimingConfig {
            element_timeout_ms: 50,
            error_probe_ms: 10,
            settle_delay_ms: 0,
            retry_delay_ms: 0,
            retry_attempts: 2,
            poll_interval_ms: 5,
        },
        ..PortalConfig::default()
    }
}

pub fn grades_page(blocks: &[(&str, &str)]) -> String {
    let body: String = blocks
        .iter()
        .map(|(subject, grade_node)| {
            format!(
                r#"<div class="zone-contenu-format">
                     <div class="zone-principale"><span class="ie-titre-gros">{}</span></div>
                     {}
                   </div>"#,
                subject, grade_node
            )
        })
        .collect();
    format!("<html><body><div class=\"liste\">{}</div></body></html>", body)
}

pub fn labelled(grade: &str) -> String {
    format!(
        r#"<div class="zone-complementaire" aria-label="Moyenne élève : {}"></div>"#,
        grade
    )
}

pub fn titled(grade: &str) -> String {
    format!(
        r#"<div class="zone-complementaire"><div class="ie-titre-gros">{}</div></div>"#,
        grade
    )
}

pub fn count(events: &EventLog, prefix: &str) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| e.starts_with(prefix))
        .count()
}

pub struct FakeBrowser {
    selectors: PortalSelectors,
    script: PortalScript,
    events: EventLog,
    loaded: bool,
    submitted: bool,
    extractions: usize,
}

impl FakeBrowser {
    pub fn new(selectors: PortalSelectors, script: PortalScript, events: EventLog) -> Self {
        Self {
            selectors,
            script,
            events,
            loaded: false,
            submitted: false,
            extractions: 0,
        }
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn logged_in(&self) -> bool {
        self.submitted && !self.script.reject_login
    }

    fn present(&self, target: &ElementLocator) -> bool {
        let s = &self.selectors;
        if !self.loaded || self.script.missing.contains(target) {
            return false;
        }
        if target == &s.username || target == &s.password || target == &s.login_button {
            return true;
        }
        if target == &s.error_popup {
            return self.submitted && (self.script.reject_login || self.script.stray_error_node);
        }
        if target == &s.user_heading {
            return self.logged_in() && self.script.heading.is_some();
        }
        let after_login = [
            &s.login_success,
            &s.notes_menu,
            &s.grades_detail,
            &s.display_mode_toggle,
            &s.by_subject_toggle,
            &s.grades_container,
        ];
        after_login.contains(&target) && self.logged_in()
    }

    fn require(&self, target: &ElementLocator) -> Result<()> {
        if self.present(target) {
            Ok(())
        } else {
            Err(ScrapeError::ProcessingError {
                message: format!("no such element: {}", target),
            })
        }
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.record(format!("goto {}", url));
        self.loaded = true;
        Ok(())
    }

    async fn wait_for(
        &mut self,
        target: &ElementLocator,
        _condition: WaitCondition,
        timeout: Duration,
    ) -> Result<()> {
        if self.present(target) {
            Ok(())
        } else {
            Err(ScrapeError::Timeout {
                target: target.to_string(),
                after_ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn is_present(&mut self, target: &ElementLocator) -> Result<bool> {
        Ok(self.present(target))
    }

    async fn send_keys(&mut self, target: &ElementLocator, text: &str) -> Result<()> {
        self.require(target)?;
        self.record(format!("type {} {}", target, text));
        Ok(())
    }

    async fn click(&mut self, target: &ElementLocator, mode: ClickMode) -> Result<()> {
        self.require(target)?;
        self.record(format!("click {} {:?}", target, mode));
        if target == &self.selectors.login_button {
            self.submitted = true;
        }
        Ok(())
    }

    async fn scroll_into_view(&mut self, target: &ElementLocator) -> Result<()> {
        self.require(target)?;
        self.record(format!("scroll {}", target));
        Ok(())
    }

    async fn text(&mut self, target: &ElementLocator) -> Result<String> {
        self.require(target)?;
        Ok(self.script.heading.clone().unwrap_or_default())
    }

    async fn page_source(&mut self) -> Result<String> {
        self.record("source".to_string());
        let pages = &self.script.grade_pages;
        let page = match pages.len() {
            0 => "<html><body></body></html>".to_string(),
            n => pages[self.extractions.min(n - 1)].clone(),
        };
        self.extractions += 1;
        Ok(page)
    }

    async fn refresh(&mut self) -> Result<()> {
        self.record("refresh".to_string());
        Ok(())
    }

    async fn quit(&mut self) -> Result<()> {
        self.record("quit".to_string());
        Ok(())
    }
}

pub struct FakeLauncher {
    pub selectors: PortalSelectors,
    pub script: PortalScript,
    pub events: EventLog,
    pub unavailable: bool,
}

impl FakeLauncher {
    pub fn new(config: &PortalConfig, script: PortalScript) -> Self {
        Self {
            selectors: config.selectors.clone(),
            script,
            events: EventLog::default(),
            unavailable: false,
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Browser>> {
        if self.unavailable {
            return Err(ScrapeError::BrowserUnavailable {
                endpoint: "http://localhost:4444".to_string(),
                reason: "connection refused".to_string(),
            });
        }
        self.events.lock().unwrap().push("launch".to_string());
        Ok(Box::new(FakeBrowser::new(
            self.selectors.clone(),
            self.script.clone(),
            self.events.clone(),
        )))
    }
}
