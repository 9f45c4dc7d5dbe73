//! Multiple-comparison p-value adjustment.
//!
//! Method names and aliases follow the usual statsmodels spelling so
//! notebooks and the CLI can share them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::StatsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CorrectionMethod {
    Bonferroni,
    Sidak,
    HolmSidak,
    Holm,
    SimesHochberg,
    Hommel,
    FdrBh,
    FdrBy,
}

impl CorrectionMethod {
    pub const ALL: [CorrectionMethod; 8] = [
        CorrectionMethod::Bonferroni,
        CorrectionMethod::Sidak,
        CorrectionMethod::HolmSidak,
        CorrectionMethod::Holm,
        CorrectionMethod::SimesHochberg,
        CorrectionMethod::Hommel,
        CorrectionMethod::FdrBh,
        CorrectionMethod::FdrBy,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CorrectionMethod::Bonferroni => "bonferroni",
            CorrectionMethod::Sidak => "sidak",
            CorrectionMethod::HolmSidak => "holm-sidak",
            CorrectionMethod::Holm => "holm",
            CorrectionMethod::SimesHochberg => "simes-hochberg",
            CorrectionMethod::Hommel => "hommel",
            CorrectionMethod::FdrBh => "fdr_bh",
            CorrectionMethod::FdrBy => "fdr_by",
        }
    }

    /// Next method in [`CorrectionMethod::ALL`], wrapping around
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Adjust `pvalues`, returning corrected values in input order, capped at 1
    pub fn adjust(&self, pvalues: &[f64]) -> Vec<f64> {
        let m = pvalues.len();
        if m == 0 {
            return Vec::new();
        }
        let mf = m as f64;

        let corrected: Vec<f64> = match self {
            CorrectionMethod::Bonferroni => pvalues.iter().map(|p| p * mf).collect(),
            CorrectionMethod::Sidak => pvalues.iter().map(|p| sidak(*p, mf)).collect(),
            _ => {
                let order = ascending_order(pvalues);
                let sorted: Vec<f64> = order.iter().map(|&i| pvalues[i]).collect();
                let adjusted = self.adjust_sorted(&sorted);
                let mut out = vec![0.0; m];
                for (rank, &i) in order.iter().enumerate() {
                    out[i] = adjusted[rank];
                }
                out
            }
        };

        corrected.into_iter().map(|p| p.min(1.0)).collect()
    }

    /// Step-wise procedures over ascending p-values
    fn adjust_sorted(&self, sorted: &[f64]) -> Vec<f64> {
        let m = sorted.len();
        let mf = m as f64;
        match self {
            CorrectionMethod::Holm => {
                let raw = sorted.iter().enumerate().map(|(i, p)| p * (mf - i as f64));
                running(raw, f64::max)
            }
            CorrectionMethod::HolmSidak => {
                let raw = sorted.iter().enumerate().map(|(i, p)| sidak(*p, mf - i as f64));
                running(raw, f64::max)
            }
            CorrectionMethod::SimesHochberg => {
                let raw: Vec<f64> = sorted
                    .iter()
                    .enumerate()
                    .map(|(i, p)| p * (mf - i as f64))
                    .collect();
                running_from_end(&raw)
            }
            CorrectionMethod::FdrBh => {
                let raw: Vec<f64> = sorted
                    .iter()
                    .enumerate()
                    .map(|(i, p)| p * mf / (i as f64 + 1.0))
                    .collect();
                running_from_end(&raw)
            }
            CorrectionMethod::FdrBy => {
                let harmonic: f64 = (1..=m).map(|i| 1.0 / i as f64).sum();
                let raw: Vec<f64> = sorted
                    .iter()
                    .enumerate()
                    .map(|(i, p)| p * mf * harmonic / (i as f64 + 1.0))
                    .collect();
                running_from_end(&raw)
            }
            CorrectionMethod::Hommel => hommel(sorted),
            CorrectionMethod::Bonferroni | CorrectionMethod::Sidak => {
                unreachable!("single-step methods do not sort")
            }
        }
    }
}

fn sidak(p: f64, m: f64) -> f64 {
    -(m * (-p).ln_1p()).exp_m1()
}

fn ascending_order(pvalues: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..pvalues.len()).collect();
    order.sort_by(|&a, &b| pvalues[a].total_cmp(&pvalues[b]));
    order
}

/// Cumulative fold from the front (running max for step-down methods)
fn running(values: impl Iterator<Item = f64>, f: fn(f64, f64) -> f64) -> Vec<f64> {
    let mut acc = f64::NEG_INFINITY;
    values
        .map(|v| {
            acc = f(acc, v);
            acc
        })
        .collect()
}

/// Running minimum taken from the largest p-value down (step-up methods)
fn running_from_end(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    for i in (0..out.len().saturating_sub(1)).rev() {
        out[i] = out[i].min(out[i + 1]);
    }
    out
}

fn hommel(sorted: &[f64]) -> Vec<f64> {
    let n = sorted.len();
    let mut a = sorted.to_vec();
    for m in (2..=n).rev() {
        let mf = m as f64;
        let tail = &sorted[n - m..];
        let cim = tail
            .iter()
            .enumerate()
            .map(|(j, p)| mf * p / (j as f64 + 1.0))
            .fold(f64::INFINITY, f64::min);
        for v in &mut a[n - m..] {
            *v = v.max(cim);
        }
        for (i, v) in a[..n - m].iter_mut().enumerate() {
            *v = v.max((mf * sorted[i]).min(cim));
        }
    }
    a
}

impl FromStr for CorrectionMethod {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "b" | "bonf" | "bonferroni" => Ok(CorrectionMethod::Bonferroni),
            "s" | "sidak" => Ok(CorrectionMethod::Sidak),
            "hs" | "holm-sidak" => Ok(CorrectionMethod::HolmSidak),
            "h" | "holm" => Ok(CorrectionMethod::Holm),
            "sh" | "simes-hochberg" => Ok(CorrectionMethod::SimesHochberg),
            "ho" | "hommel" => Ok(CorrectionMethod::Hommel),
            "fdr_bh" | "fdr_i" | "fdr_p" | "fdri" | "fdrp" => Ok(CorrectionMethod::FdrBh),
            "fdr_by" | "fdr_n" | "fdr_c" | "fdrn" | "fdrcorr" => Ok(CorrectionMethod::FdrBy),
            _ => Err(StatsError::UnknownMethod(s.to_string())),
        }
    }
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
