//! Hypothesis tests and the helpers that feed categorical plots.
//!
//! - `significance`: p-value to asterisk label mapping
//! - `hypothesis`: Student's two-sample t-test and one-way ANOVA
//! - `correction`: multiple-comparison p-value adjustment
//! - `comparison`: table-driven test runners with bracket annotation

pub mod comparison;
pub mod correction;
pub mod significance;
pub mod hypothesis;

use serde::Serialize;
use thiserror::Error;

use crate::data::TableError;

pub use comparison::{
    GroupSummary, MultipleComparisonTTest, MultipleTTest, OneWayAnova, PairwiseResult,
    UnpairedTTest,
};
pub use correction::CorrectionMethod;
pub use significance::Significance;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("group {group} has {found} observations, at least {needed} are required")]
    TooFewObservations {
        group: String,
        found: usize,
        needed: usize,
    },
    #[error("category {0} does not occur in the grouping column")]
    UnknownCategory(String),
    #[error("at least {needed} categories are required, got {found}")]
    TooFewCategories { needed: usize, found: usize },
    #[error("unknown correction method: {0}")]
    UnknownMethod(String),
    #[error("distribution error: {0}")]
    Distribution(String),
}

/// Test statistic and its p-value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestResult {
    pub statistic: f64,
    pub pvalue: f64,
}

impl TestResult {
    pub fn significance(&self) -> Significance {
        Significance::from_pvalue(self.pvalue)
    }
}
