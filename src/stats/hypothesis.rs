//! Student's two-sample t-test (pooled variance) and one-way ANOVA.

use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

use super::{StatsError, TestResult};

/// Mean and sample variance (ddof = 1)
pub(crate) fn mean_var(xs: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let ss: f64 = xs.iter().map(|x| (x - mean).powi(2)).sum();
    (mean, ss / (n - 1.0))
}

fn require(group: &str, xs: &[f64], needed: usize) -> Result<(), StatsError> {
    if xs.len() < needed {
        return Err(StatsError::TooFewObservations {
            group: group.to_string(),
            found: xs.len(),
            needed,
        });
    }
    Ok(())
}

/// Two-sided unpaired t-test assuming equal variances.
///
/// Both samples need at least two observations. Zero pooled variance gives
/// an infinite statistic (p = 0) when the means differ, NaN otherwise.
pub fn ttest_ind(a: &[f64], b: &[f64]) -> Result<TestResult, StatsError> {
    require("a", a, 2)?;
    require("b", b, 2)?;

    let (n1, n2) = (a.len() as f64, b.len() as f64);
    let (m1, v1) = mean_var(a);
    let (m2, v2) = mean_var(b);

    let df = n1 + n2 - 2.0;
    let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / df;
    let statistic = (m1 - m2) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();

    let pvalue = if statistic.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        let dist = StudentsT::new(0.0, 1.0, df).map_err(|e| StatsError::Distribution(e.to_string()))?;
        (2.0 * dist.sf(statistic.abs())).min(1.0)
    };

    Ok(TestResult { statistic, pvalue })
}

/// One-way ANOVA across two or more non-empty samples
pub fn f_oneway(samples: &[&[f64]]) -> Result<TestResult, StatsError> {
    if samples.len() < 2 {
        return Err(StatsError::TooFewCategories {
            needed: 2,
            found: samples.len(),
        });
    }
    for (i, s) in samples.iter().enumerate() {
        require(&format!("#{i}"), s, 1)?;
    }

    let k = samples.len() as f64;
    let n: f64 = samples.iter().map(|s| s.len() as f64).sum();
    if n <= k {
        return Err(StatsError::TooFewObservations {
            group: "all".to_string(),
            found: n as usize,
            needed: samples.len() + 1,
        });
    }

    let grand_mean = samples.iter().flat_map(|s| s.iter()).sum::<f64>() / n;
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for s in samples {
        let mean = s.iter().sum::<f64>() / s.len() as f64;
        ss_between += s.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += s.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    }

    let (df_between, df_within) = (k - 1.0, n - k);
    let statistic = (ss_between / df_between) / (ss_within / df_within);

    let pvalue = if statistic.is_nan() {
        f64::NAN
    } else if statistic.is_infinite() {
        0.0
    } else {
        let dist = FisherSnedecor::new(df_between, df_within)
            .map_err(|e| StatsError::Distribution(e.to_string()))?;
        dist.sf(statistic)
    };

    Ok(TestResult { statistic, pvalue })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Significance;

    #[test]
    fn test_ttest_matches_reference_values() {
        let result = ttest_ind(&[1.0, 2.0, 3.0, 4.0, 5.0], &[2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert!((result.statistic + 1.0).abs() < 1e-12);
        assert!((result.pvalue - 0.346_593_507_087_334_2).abs() < 1e-6);
    }

    #[test]
    fn test_identical_means_are_not_significant() {
        let a = [4.1, 5.3, 4.8, 5.9, 4.4, 5.5];
        let b = [5.5, 4.4, 5.9, 4.8, 5.3, 4.1];
        let result = ttest_ind(&a, &b).unwrap();
        assert!(result.pvalue >= 0.05);
        assert_eq!(result.significance().as_str(), "ns");
    }

    #[test]
    fn test_large_separation_is_four_stars() {
        let a = [10.0, 10.1, 9.9, 10.2, 9.8];
        let b = [20.0, 20.1, 19.9, 20.2, 19.8];
        let result = ttest_ind(&a, &b).unwrap();
        assert!(result.statistic < 0.0);
        assert_eq!(result.significance(), Significance::Four);
    }

    #[test]
    fn test_singleton_sample_is_rejected() {
        let err = ttest_ind(&[1.0], &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StatsError::TooFewObservations { found: 1, .. }));
    }

    #[test]
    fn test_zero_variance_with_different_means() {
        let result = ttest_ind(&[1.0, 1.0], &[2.0, 2.0]).unwrap();
        assert!(result.statistic.is_infinite());
        assert_eq!(result.pvalue, 0.0);
    }

    #[test]
    fn test_anova_matches_closed_form() {
        // F(2, 6) survival at 27 is (1 + 2 * 27 / 6)^-3 = 0.001
        let result = f_oneway(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[7.0, 8.0, 9.0]]).unwrap();
        assert!((result.statistic - 27.0).abs() < 1e-9);
        assert!((result.pvalue - 0.001).abs() < 1e-9);
    }

    #[test]
    fn test_anova_needs_two_groups() {
        assert!(matches!(
            f_oneway(&[&[1.0, 2.0]]),
            Err(StatsError::TooFewCategories { found: 1, .. })
        ));
    }

    #[test]
    fn test_anova_rejects_empty_group() {
        assert!(f_oneway(&[&[1.0, 2.0], &[]]).is_err());
    }
}
