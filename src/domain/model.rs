use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 係數等於此值的科目視為專業科目（spécialité），其餘為共同科目（tronc commun）
pub const SPECIALTY_COEFFICIENT: u32 = 15;

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeEntry {
    pub subject: String,
    pub value: f64,
}

/// 科目（大寫）→ 成績；同一科目重複出現時以最後一次為準
pub type GradeMap = BTreeMap<String, f64>;

/// 單次解析頁面的結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeSnapshot {
    pub grades: GradeMap,
    /// 頁面上找到的科目區塊數（不論是否有成績）
    pub subject_blocks: usize,
}

impl GradeSnapshot {
    pub fn record(&mut self, entry: GradeEntry) {
        self.grades.insert(entry.subject, entry.value);
    }

    pub fn is_empty(&self) -> bool {
        self.grades.is_empty()
    }
}

/// 成績擷取最後的結果
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Found(GradeMap),
    /// 科目列表已顯示，但重試後仍沒有任何成績
    ConfirmedEmpty,
    /// 重試後仍找不到任何科目區塊
    NotRendered,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>", into = "BTreeMap<String, u32>")]
pub struct CoefficientTable {
    entries: BTreeMap<String, u32>,
}

impl CoefficientTable {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(subject, coef)| (subject.as_ref().trim().to_uppercase(), coef))
            .collect();
        Self { entries }
    }

    pub fn get(&self, subject: &str) -> Option<u32> {
        self.entries.get(subject).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_specialty(coefficient: u32) -> bool {
        coefficient == SPECIALTY_COEFFICIENT
    }
}

impl Default for CoefficientTable {
    fn default() -> Self {
        Self::from_pairs([
            ("MATHEMATIQUES", 15),
            ("PHYSIQUE-CHIMIE", 15),
            ("NUMERIQUE ET SCIENCES INFORMATIQUES", 15),
            ("ENSEIGN.SCIENTIFIQUE > ENS.SCIENT.SVT", 3),
            ("ENSEIGN.SCIENTIFIQUE > ENS. SCIENT. PHYSIQUE", 3),
            ("FRANCAIS", 10),
            ("EPS", 6),
            ("ANGLAIS LV1", 6),
            ("ESPAGNOL LV2", 6),
            ("HISTOIRE-GEOGRAPHIE", 6),
            ("ENSEIGNEMENT MORAL ET CIVIQUE", 2),
        ])
    }
}

impl From<BTreeMap<String, u32>> for CoefficientTable {
    fn from(entries: BTreeMap<String, u32>) -> Self {
        Self::from_pairs(entries)
    }
}

impl From<CoefficientTable> for BTreeMap<String, u32> {
    fn from(table: CoefficientTable) -> Self {
        table.entries
    }
}

/// 三種加權平均；分母為 0 時為 None
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Averages {
    pub overall: Option<f64>,
    pub core: Option<f64>,
    pub specialty: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AverageResult {
    pub overall: Option<f64>,
    pub core: Option<f64>,
    pub specialty: Option<f64>,
    pub full_name: Option<String>,
}

impl AverageResult {
    pub fn new(averages: Averages, full_name: Option<String>) -> Self {
        Self {
            overall: averages.overall,
            core: averages.core,
            specialty: averages.specialty,
            full_name,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.overall.is_none()
            && self.core.is_none()
            && self.specialty.is_none()
            && self.full_name.is_none()
    }

    pub fn into_tuple(self) -> (Option<f64>, Option<f64>, Option<f64>, Option<String>) {
        (self.overall, self.core, self.specialty, self.full_name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    GradesFound { subjects: usize },
    NoGradesYet,
    GradesNotRendered,
    InvalidCredentials,
    PageTimeout { target: String },
    BrowserUnavailable { reason: String },
    Failed { reason: String },
}

impl Condition {
    pub fn describe(&self) -> String {
        match self {
            Condition::GradesFound { subjects } => format!("{} graded subjects found", subjects),
            Condition::NoGradesYet => "subjects listed but no grades yet this term".to_string(),
            Condition::GradesNotRendered => "the grades view never rendered".to_string(),
            Condition::InvalidCredentials => "incorrect credentials".to_string(),
            Condition::PageTimeout { target } => format!("timed out waiting for {}", target),
            Condition::BrowserUnavailable { reason } => {
                format!("browser unavailable: {}", reason)
            }
            Condition::Failed { reason } => format!("failed: {}", reason),
        }
    }
}

/// 交給呼叫端（CLI 或網頁後端）呈現的完整結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AverageReport {
    #[serde(flatten)]
    pub result: AverageResult,
    pub condition: Condition,
    pub grades: GradeMap,
    pub fetched_at: DateTime<Utc>,
}

impl AverageReport {
    pub const GENERIC_FAILURE: &'static str = "Could not extract grades: either the credentials \
        are wrong or there are no grades for this term yet.";

    pub fn new(result: AverageResult, condition: Condition, grades: GradeMap) -> Self {
        Self {
            result,
            condition,
            grades,
            fetched_at: Utc::now(),
        }
    }

    pub fn failed(condition: Condition) -> Self {
        Self::new(AverageResult::default(), condition, GradeMap::new())
    }

    /// 四個欄位皆為空時給使用者看的單一訊息，不區分內部原因
    pub fn error_message(&self) -> Option<&'static str> {
        self.result.is_empty().then_some(Self::GENERIC_FAILURE)
    }

    pub fn into_tuple(self) -> (Option<f64>, Option<f64>, Option<f64>, Option<String>) {
        self.result.into_tuple()
    }
}
