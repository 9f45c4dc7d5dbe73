//! Asterisk labels for p-values.

use std::fmt;

use serde::Serialize;

/// Significance bucket of a p-value. Each bucket includes its lower bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Significance {
    /// p >= 0.05
    #[serde(rename = "ns")]
    NotSignificant,
    /// 0.01 <= p < 0.05
    #[serde(rename = "*")]
    One,
    /// 0.001 <= p < 0.01
    #[serde(rename = "**")]
    Two,
    /// 0.0001 <= p < 0.001
    #[serde(rename = "***")]
    Three,
    /// p < 0.0001
    #[serde(rename = "****")]
    Four,
}

impl Significance {
    /// Map a p-value to its bucket. NaN is not significant.
    pub fn from_pvalue(p: f64) -> Self {
        if p.is_nan() || p >= 0.05 {
            Significance::NotSignificant
        } else if p >= 0.01 {
            Significance::One
        } else if p >= 0.001 {
            Significance::Two
        } else if p >= 0.0001 {
            Significance::Three
        } else {
            Significance::Four
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Significance::NotSignificant => "ns",
            Significance::One => "*",
            Significance::Two => "**",
            Significance::Three => "***",
            Significance::Four => "****",
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_lower_bounds_are_inclusive() {
        assert_eq!(Significance::from_pvalue(0.05).as_str(), "ns");
        assert_eq!(Significance::from_pvalue(0.0499).as_str(), "*");
        assert_eq!(Significance::from_pvalue(0.01).as_str(), "*");
        assert_eq!(Significance::from_pvalue(0.001).as_str(), "**");
        assert_eq!(Significance::from_pvalue(0.0001).as_str(), "***");
        assert_eq!(Significance::from_pvalue(0.00009).as_str(), "****");
    }

    #[test]
    fn test_labels_are_monotonic() {
        let pvalues = [0.9, 0.05, 0.02, 0.005, 0.0005, 0.00001, 0.0];
        let labels: Vec<Significance> = pvalues.iter().map(|&p| Significance::from_pvalue(p)).collect();
        assert!(labels.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_nan_is_not_significant() {
        assert_eq!(Significance::from_pvalue(f64::NAN), Significance::NotSignificant);
    }

    #[test]
    fn test_serializes_as_label() {
        let json = serde_json::to_string(&Significance::Three).unwrap();
        assert_eq!(json, "\"***\"");
    }
}
