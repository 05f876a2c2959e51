pub mod boundary;
pub mod cases;
pub mod config;
pub mod types;
pub mod value;

pub use types::{CaseResult, CaseStatus, RunReport, RunSummary, TestCase};
pub use value::Value;
