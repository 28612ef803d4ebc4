use crate::domain::model::{AverageReport, CoefficientTable};
use crate::utils::error::{Result, ScrapeError};
use serde::Serialize;

#[derive(Serialize)]
struct SummaryRow<'a> {
    overall: Option<f64>,
    core: Option<f64>,
    specialty: Option<f64>,
    full_name: Option<&'a str>,
    condition: String,
    error: Option<&'a str>,
    fetched_at: String,
}

/// 與原本網頁端點相同的欄位，外加 condition、grades 與時間
pub fn render_json(report: &AverageReport) -> Result<String> {
    let mut value = serde_json::to_value(report)?;
    if let Some(object) = value.as_object_mut() {
        object.insert(
            "error".to_string(),
            serde_json::to_value(report.error_message())?,
        );
    }
    Ok(serde_json::to_string_pretty(&value)?)
}

pub fn render_csv(report: &AverageReport) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.serialize(SummaryRow {
        overall: report.result.overall,
        core: report.result.core,
        specialty: report.result.specialty,
        full_name: report.result.full_name.as_deref(),
        condition: report.condition.describe(),
        error: report.error_message(),
        fetched_at: report.fetched_at.to_rfc3339(),
    })?;
    let bytes = writer
        .into_inner()
        .map_err(|e| ScrapeError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ScrapeError::ProcessingError {
        message: format!("CSV output is not UTF-8: {}", e),
    })
}

pub fn render_text(report: &AverageReport, coefficients: &CoefficientTable) -> String {
    let format_average = |value: Option<f64>| match value {
        Some(v) => format!("{:.2}", v),
        None => "-".to_string(),
    };

    let mut lines = Vec::new();
    if let Some(message) = report.error_message() {
        lines.push(format!("❌ {}", message));
    }
    if let Some(name) = &report.result.full_name {
        lines.push(format!("👤 {}", name));
    }
    lines.push(format!("📊 Overall:   {}", format_average(report.result.overall)));
    lines.push(format!("📘 Core:      {}", format_average(report.result.core)));
    lines.push(format!("🎯 Specialty: {}", format_average(report.result.specialty)));

    if !report.grades.is_empty() {
        lines.push(String::new());
        for (subject, grade) in &report.grades {
            let coefficient = coefficients
                .get(subject)
                .map(|c| format!("x{}", c))
                .unwrap_or_else(|| "unweighted".to_string());
            lines.push(format!("  {:<48} {:>6.2}  {}", subject, grade, coefficient));
        }
    }

    lines.push(String::new());
    lines.push(format!("ℹ️ {}", report.condition.describe()));
    lines.join("\n")
}
