pub mod averages;
pub mod grades;
pub mod name;
pub mod pipeline;
pub mod report;
pub mod session;

pub use crate::domain::model::{AverageReport, AverageResult, Condition, GradeMap};
pub use crate::domain::ports::{Browser, BrowserLauncher, Storage};
pub use crate::utils::error::Result;
