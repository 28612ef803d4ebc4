use crate::config::GradeSelectors;
use crate::domain::model::{GradeEntry, GradeSnapshot};
use crate::utils::error::{Result, ScrapeError};
use scraper::{ElementRef, Html, Selector};

/// 解析「依科目」成績頁面。頁面結構不受我們控制，所以每個科目各自容錯。
#[derive(Debug, Clone)]
pub struct GradePageParser {
    block: Selector,
    subject: Selector,
    grade: Selector,
    large_title: Selector,
    average_label: String,
    label_delimiter: String,
}

impl GradePageParser {
    pub fn new(selectors: &GradeSelectors) -> Result<Self> {
        Ok(Self {
            block: compile("grades.block", &selectors.block)?,
            subject: compile("grades.subject", &selectors.subject)?,
            grade: compile("grades.grade", &selectors.grade)?,
            large_title: compile("grades.large_title", &selectors.large_title)?,
            average_label: selectors.average_label.clone(),
            label_delimiter: selectors.label_delimiter.clone(),
        })
    }

    pub fn parse(&self, html: &str) -> GradeSnapshot {
        let document = Html::parse_document(html);
        let mut snapshot = GradeSnapshot::default();

        for block in document.select(&self.block) {
            let Some(subject) = self.subject_of(block) else {
                continue;
            };
            snapshot.subject_blocks += 1;

            match self.grade_of(&subject, block) {
                Some(value) => snapshot.record(GradeEntry { subject, value }),
                None => tracing::debug!("No grade found for {}", subject),
            }
        }

        tracing::debug!(
            "Parsed {} grades from {} subject blocks",
            snapshot.grades.len(),
            snapshot.subject_blocks
        );
        snapshot
    }

    fn subject_of(&self, block: ElementRef<'_>) -> Option<String> {
        let node = block.select(&self.subject).next()?;
        let subject = stripped_text(node).to_uppercase();
        (!subject.is_empty()).then_some(subject)
    }

    fn grade_of(&self, subject: &str, block: ElementRef<'_>) -> Option<f64> {
        let node = block.select(&self.grade).next()?;
        self.grade_from_label(subject, node)
            .or_else(|| self.grade_from_large_title(subject, node))
    }

    /// aria-label 形如 "Moyenne élève : 14,5"
    fn grade_from_label(&self, subject: &str, node: ElementRef<'_>) -> Option<f64> {
        let label = node.value().attr("aria-label")?;
        if !label.contains(self.average_label.as_str()) {
            return None;
        }
        let raw = label.rsplit(self.label_delimiter.as_str()).next()?;
        report_failure(subject, parse_decimal(subject, raw))
    }

    fn grade_from_large_title(&self, subject: &str, node: ElementRef<'_>) -> Option<f64> {
        let title = node.select(&self.large_title).next()?;
        report_failure(subject, parse_decimal(subject, &stripped_text(title)))
    }
}

fn compile(field: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| ScrapeError::InvalidConfigValueError {
        field: field.to_string(),
        value: css.to_string(),
        reason: format!("Invalid CSS selector: {}", e),
    })
}

/// 等同 BeautifulSoup 的 `get_text(strip=True)`
fn stripped_text(node: ElementRef<'_>) -> String {
    node.text()
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

pub fn parse_decimal(subject: &str, raw: &str) -> Result<f64> {
    let normalized = raw.trim().replace(',', ".");
    let failure = |reason: String| ScrapeError::GradeParseError {
        subject: subject.to_string(),
        raw: raw.to_string(),
        reason,
    };

    let value: f64 = normalized.parse().map_err(|e| failure(format!("{}", e)))?;
    if !value.is_finite() {
        return Err(failure("grade is not a finite number".to_string()));
    }
    Ok(value)
}

fn report_failure(subject: &str, parsed: Result<f64>) -> Option<f64> {
    match parsed {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("⚠️ Skipping grade conversion for {}: {}", subject, e);
            None
        }
    }
}
