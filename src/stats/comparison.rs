//! Table-driven test runners.
//!
//! Each runner borrows a [`Table`] and names the grouping column (`var`)
//! and the measured column (`value`). Categories are matched by their cell
//! label and placed on the x axis in first-seen order, the way a categorical
//! plot of the same table lays them out.

use ratatui::style::Color;
use serde::Serialize;

use super::hypothesis::{f_oneway, mean_var, ttest_ind};
use super::{CorrectionMethod, Significance, StatsError, TestResult};
use crate::data::{dedup_labels, Table, Value};
use crate::plot::{Bracket, PlotSurface, RunningMax};

/// Corrected p-values below this are dropped from pairwise results
pub const PAIRWISE_PVALUE_FLOOR: f64 = 0.0001;

/// Family-wise alpha used for the reject flag
pub const ALPHA: f64 = 0.05;

/// Outcome of one pairwise comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairwiseResult {
    pub group1: String,
    pub group2: String,
    pub statistic: f64,
    pub pvalue: f64,
    pub pvalue_corrected: f64,
    pub reject: bool,
    pub significance: Significance,
}

/// Observations of one category, erroring when it never occurs
fn sample(table: &Table, var: &str, category: &str, value: &str) -> Result<Vec<f64>, StatsError> {
    x_position(table, var, category)?;
    Ok(table.numeric_where(var, category, value)?)
}

/// Position of a category on the x axis
fn x_position(table: &Table, var: &str, category: &str) -> Result<f64, StatsError> {
    table
        .labels(var)?
        .iter()
        .position(|label| label == category)
        .map(|idx| idx as f64)
        .ok_or_else(|| StatsError::UnknownCategory(category.to_string()))
}

fn max_of(xs: &[f64]) -> f64 {
    xs.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn ttest_between(a: (&str, &[f64]), b: (&str, &[f64])) -> Result<TestResult, StatsError> {
    for (group, xs) in [a, b] {
        if xs.len() < 2 {
            return Err(StatsError::TooFewObservations {
                group: group.to_string(),
                found: xs.len(),
                needed: 2,
            });
        }
    }
    ttest_ind(a.1, b.1)
}

/// Per-group maxima of `value`, keyed by category label
fn group_maxima(table: &Table, var: &str, value: &str) -> Result<RunningMax, StatsError> {
    let mut tops = Vec::new();
    for label in table.labels(var)? {
        let xs = table.numeric_where(var, &label, value)?;
        tops.push((label, max_of(&xs)));
    }
    Ok(RunningMax::new(tops))
}

/// Draw one bracket per pair, stacking each above earlier brackets that
/// touch the same groups
fn annotate_stacked<'p>(
    table: &Table,
    var: &str,
    value: &str,
    surface: &mut dyn PlotSurface,
    pairs: impl Iterator<Item = (&'p str, &'p str, Significance)>,
    color: Color,
    h: f64,
) -> Result<(), StatsError> {
    let mut tops = group_maxima(table, var, value)?;
    for (g1, g2, significance) in pairs {
        let x1 = x_position(table, var, g1)?;
        let x2 = x_position(table, var, g2)?;
        let bracket = tops
            .stack(g1, x1, g2, x2, h)
            .ok_or_else(|| StatsError::UnknownCategory(format!("{g1} / {g2}")))?;
        bracket.draw(surface, significance.as_str(), color);
    }
    Ok(())
}

/// Unpaired t-test between exactly two categories
#[derive(Debug, Clone)]
pub struct UnpairedTTest<'a> {
    table: &'a Table,
    var: String,
    categories: [String; 2],
    value: String,
}

impl<'a> UnpairedTTest<'a> {
    pub fn new(table: &'a Table, var: &str, categories: [&str; 2], value: &str) -> Self {
        UnpairedTTest {
            table,
            var: var.to_string(),
            categories: categories.map(String::from),
            value: value.to_string(),
        }
    }

    pub fn perform_ttest(&self) -> Result<(TestResult, Significance), StatsError> {
        let [c1, c2] = &self.categories;
        let a = sample(self.table, &self.var, c1, &self.value)?;
        let b = sample(self.table, &self.var, c2, &self.value)?;
        let result = ttest_between((c1, &a), (c2, &b))?;
        Ok((result, result.significance()))
    }

    /// Bracket between the two categories, `h` above the taller group
    pub fn graph_annotate(
        &self,
        surface: &mut dyn PlotSurface,
        significance: Significance,
        color: Color,
        h: f64,
    ) -> Result<(), StatsError> {
        let [c1, c2] = &self.categories;
        let x1 = x_position(self.table, &self.var, c1)?;
        let x2 = x_position(self.table, &self.var, c2)?;
        let y1 = max_of(&sample(self.table, &self.var, c1, &self.value)?);
        let y2 = max_of(&sample(self.table, &self.var, c2, &self.value)?);

        Bracket::between(x1, x2, y1, y2, h).draw(surface, significance.as_str(), color);
        Ok(())
    }
}

/// Every pairwise t-test between the groups of `var`, corrected for
/// multiple comparisons
#[derive(Debug, Clone)]
pub struct MultipleComparisonTTest<'a> {
    table: &'a Table,
    var: String,
    value: String,
    method: CorrectionMethod,
}

impl<'a> MultipleComparisonTTest<'a> {
    pub fn new(table: &'a Table, var: &str, value: &str, method: CorrectionMethod) -> Self {
        MultipleComparisonTTest {
            table,
            var: var.to_string(),
            value: value.to_string(),
            method,
        }
    }

    pub fn method(&self) -> CorrectionMethod {
        self.method
    }

    /// Pairs of the ascending-sorted groups, tested in (i, j), i < j order.
    /// Groups sharing a label are tested as one.
    ///
    /// Pairs whose corrected p-value falls below [`PAIRWISE_PVALUE_FLOOR`]
    /// are left out of the result.
    pub fn perform_ttest(&self) -> Result<Vec<PairwiseResult>, StatsError> {
        let mut groups: Vec<Value> = self.table.unique(&self.var)?;
        groups.sort();
        let labels = dedup_labels(groups.iter());

        let samples = labels
            .iter()
            .map(|g| self.table.numeric_where(&self.var, g, &self.value))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tests = Vec::new();
        for i in 0..labels.len() {
            for j in (i + 1)..labels.len() {
                let result = ttest_between((&labels[i], &samples[i]), (&labels[j], &samples[j]))?;
                tests.push((i, j, result));
            }
        }

        let raw: Vec<f64> = tests.iter().map(|(_, _, r)| r.pvalue).collect();
        let corrected = self.method.adjust(&raw);

        Ok(tests
            .into_iter()
            .zip(corrected)
            .filter(|(_, p)| *p >= PAIRWISE_PVALUE_FLOOR)
            .map(|((i, j, result), p)| PairwiseResult {
                group1: labels[i].clone(),
                group2: labels[j].clone(),
                statistic: result.statistic,
                pvalue: result.pvalue,
                pvalue_corrected: p,
                reject: p <= ALPHA,
                significance: Significance::from_pvalue(p),
            })
            .collect())
    }

    pub fn graph_annotate(
        &self,
        surface: &mut dyn PlotSurface,
        results: &[PairwiseResult],
        color: Color,
        h: f64,
    ) -> Result<(), StatsError> {
        annotate_stacked(
            self.table,
            &self.var,
            &self.value,
            surface,
            results
                .iter()
                .map(|r| (r.group1.as_str(), r.group2.as_str(), r.significance)),
            color,
            h,
        )
    }
}

/// Uncorrected t-tests for a caller-chosen list of category pairs
#[derive(Debug, Clone)]
pub struct MultipleTTest<'a> {
    table: &'a Table,
    var: String,
    value: String,
    pairs: Vec<(String, String)>,
}

impl<'a> MultipleTTest<'a> {
    pub fn new(table: &'a Table, var: &str, value: &str, pairs: Vec<(String, String)>) -> Self {
        MultipleTTest {
            table,
            var: var.to_string(),
            value: value.to_string(),
            pairs,
        }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    /// One significance label per pair, in pair order
    pub fn perform_ttest(&self) -> Result<Vec<PairwiseResult>, StatsError> {
        self.pairs
            .iter()
            .map(|(g1, g2)| {
                let a = sample(self.table, &self.var, g1, &self.value)?;
                let b = sample(self.table, &self.var, g2, &self.value)?;
                let result = ttest_between((g1, &a), (g2, &b))?;
                Ok(PairwiseResult {
                    group1: g1.clone(),
                    group2: g2.clone(),
                    statistic: result.statistic,
                    pvalue: result.pvalue,
                    pvalue_corrected: result.pvalue,
                    reject: result.pvalue <= ALPHA,
                    significance: result.significance(),
                })
            })
            .collect()
    }

    /// Stacked brackets for `self.pairs`, labeled with `labels` in pair order
    pub fn graph_annotate(
        &self,
        surface: &mut dyn PlotSurface,
        labels: &[Significance],
        color: Color,
        h: f64,
    ) -> Result<(), StatsError> {
        annotate_stacked(
            self.table,
            &self.var,
            &self.value,
            surface,
            self.pairs
                .iter()
                .zip(labels)
                .map(|((g1, g2), s)| (g1.as_str(), g2.as_str(), *s)),
            color,
            h,
        )
    }
}

/// One-way ANOVA across named categories
#[derive(Debug, Clone)]
pub struct OneWayAnova<'a> {
    table: &'a Table,
    var: String,
    value: String,
    categories: Vec<String>,
}

impl<'a> OneWayAnova<'a> {
    pub fn new(table: &'a Table, var: &str, value: &str, categories: Vec<String>) -> Self {
        OneWayAnova {
            table,
            var: var.to_string(),
            value: value.to_string(),
            categories,
        }
    }

    pub fn perform_anova(&self) -> Result<TestResult, StatsError> {
        let samples = self
            .categories
            .iter()
            .map(|c| sample(self.table, &self.var, c, &self.value))
            .collect::<Result<Vec<_>, _>>()?;
        for (category, xs) in self.categories.iter().zip(&samples) {
            if xs.is_empty() {
                return Err(StatsError::TooFewObservations {
                    group: category.clone(),
                    found: 0,
                    needed: 1,
                });
            }
        }
        let slices: Vec<&[f64]> = samples.iter().map(Vec::as_slice).collect();
        f_oneway(&slices)
    }
}

/// Mean and standard deviation of `value` per category of `var`
#[derive(Debug, Clone)]
pub struct GroupSummary<'a> {
    table: &'a Table,
    var: String,
    value: String,
}

impl<'a> GroupSummary<'a> {
    pub fn new(table: &'a Table, var: &str, value: &str) -> Self {
        GroupSummary {
            table,
            var: var.to_string(),
            value: value.to_string(),
        }
    }

    /// Category labels in the order used by [`GroupSummary::compute_stats`]
    pub fn categories(&self) -> Result<Vec<String>, StatsError> {
        Ok(self.table.labels(&self.var)?)
    }

    /// Parallel (means, sample standard deviations) in first-seen order.
    /// A single observation has an undefined (NaN) deviation.
    pub fn compute_stats(&self) -> Result<(Vec<f64>, Vec<f64>), StatsError> {
        let mut means = Vec::new();
        let mut stds = Vec::new();
        for category in self.categories()? {
            let xs = self.table.numeric_where(&self.var, &category, &self.value)?;
            let (mean, var) = mean_var(&xs);
            means.push(mean);
            stds.push(var.sqrt());
        }
        Ok((means, stds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;
    use crate::plot::{RecordingSurface, Shape};

    fn separated_table() -> Table {
        let mut rows = Vec::new();
        for (group, base) in [("low", 1.0), ("mid", 1.05), ("high", 50.0)] {
            for k in 0..6 {
                rows.push(vec![Value::from(group), Value::Float(base + 0.1 * k as f64)]);
            }
        }
        Table::new(vec!["arm".to_string(), "signal".to_string()], rows)
    }

    #[test]
    fn test_unpaired_ttest_labels_result() {
        let table = sample_table();
        let test = UnpairedTTest::new(&table, "group", ["ctrl", "drug"], "score");
        let (result, label) = test.perform_ttest().unwrap();

        // ctrl 1,2,3 vs drug 4,6,5: t = -3 / sqrt(1 * 2/3)
        assert!((result.statistic + 3.0 / (2.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(label, result.significance());
        assert_eq!(label, Significance::One);
    }

    #[test]
    fn test_unpaired_unknown_category() {
        let table = sample_table();
        let test = UnpairedTTest::new(&table, "group", ["ctrl", "placebo"], "score");
        assert_eq!(
            test.perform_ttest().unwrap_err(),
            StatsError::UnknownCategory("placebo".to_string())
        );
    }

    #[test]
    fn test_unpaired_annotation_geometry() {
        let table = sample_table();
        let test = UnpairedTTest::new(&table, "group", ["ctrl", "drug"], "score");
        let mut surface = RecordingSurface::new();
        test.graph_annotate(&mut surface, Significance::One, Color::Yellow, 0.5)
            .unwrap();

        match &surface.shapes()[0] {
            Shape::Line { xs, ys, .. } => {
                assert_eq!(xs, &vec![0.0, 0.0, 1.0, 1.0]);
                // maxima 3 and 6
                assert_eq!(ys, &vec![3.5, 7.0, 7.0, 6.5]);
            }
            other => panic!("expected a line, got {other:?}"),
        }
        match &surface.shapes()[1] {
            Shape::Text { x, y, label, .. } => {
                assert_eq!((*x, *y), (0.5, 7.0));
                assert_eq!(label, "*");
            }
            other => panic!("expected text, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_comparison_never_pairs_a_label_with_itself() {
        let rows = [
            (Value::from("1"), 1.0),
            (Value::from("1"), 2.0),
            (Value::Int(1), 3.0),
            (Value::Int(2), 7.0),
            (Value::Int(2), 8.0),
            (Value::Int(2), 9.0),
        ];
        let table = Table::new(
            vec!["dose".to_string(), "score".to_string()],
            rows.into_iter().map(|(d, s)| vec![d, Value::Float(s)]).collect(),
        );
        let test = MultipleComparisonTTest::new(&table, "dose", "score", CorrectionMethod::Bonferroni);
        let results = test.perform_ttest().unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!((results[0].group1.as_str(), results[0].group2.as_str()), ("1", "2"));
        let summary = GroupSummary::new(&table, "dose", "score");
        assert_eq!(summary.categories().unwrap(), vec!["1", "2"]);
        assert_eq!(summary.compute_stats().unwrap().0, vec![2.0, 8.0]);
    }

    #[test]
    fn test_multiple_comparison_sorted_pairs() {
        let table = sample_table();
        let test = MultipleComparisonTTest::new(&table, "group", "score", CorrectionMethod::Holm);
        let results = test.perform_ttest().unwrap();

        let pairs: Vec<(&str, &str)> = results
            .iter()
            .map(|r| (r.group1.as_str(), r.group2.as_str()))
            .collect();
        assert_eq!(pairs, vec![("ctrl", "drug"), ("ctrl", "vehicle"), ("drug", "vehicle")]);
        for r in &results {
            assert!(r.pvalue_corrected >= r.pvalue);
            assert_eq!(r.significance, Significance::from_pvalue(r.pvalue_corrected));
        }
    }

    #[test]
    fn test_multiple_comparison_drops_smallest_bucket() {
        let table = separated_table();
        let test =
            MultipleComparisonTTest::new(&table, "arm", "signal", CorrectionMethod::Bonferroni);
        let results = test.perform_ttest().unwrap();

        // high differs from both others by ~49 with tiny spread: dropped
        assert_eq!(results.len(), 1);
        assert_eq!((results[0].group1.as_str(), results[0].group2.as_str()), ("low", "mid"));
        assert_eq!(results[0].significance, Significance::NotSignificant);
        assert!(!results[0].reject);
    }

    #[test]
    fn test_multiple_comparison_annotations_stack() {
        let table = sample_table();
        let test = MultipleComparisonTTest::new(&table, "group", "score", CorrectionMethod::Bonferroni);
        let results = test.perform_ttest().unwrap();
        let mut surface = RecordingSurface::new();
        test.graph_annotate(&mut surface, &results, Color::White, 1.0).unwrap();

        let bases: Vec<f64> = surface
            .shapes()
            .iter()
            .filter_map(|s| match s {
                Shape::Line { ys, .. } => Some(ys[0]),
                _ => None,
            })
            .collect();
        // ctrl max 3, drug max 6, vehicle max 3.5
        assert_eq!(bases, vec![7.0, 9.0, 11.0]);
    }

    #[test]
    fn test_explicit_pairs_follow_given_order() {
        let table = sample_table();
        let pairs = vec![
            ("vehicle".to_string(), "ctrl".to_string()),
            ("drug".to_string(), "ctrl".to_string()),
        ];
        let test = MultipleTTest::new(&table, "group", "score", pairs);
        let results = test.perform_ttest().unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].group1, "vehicle");
        assert_eq!(results[1].pvalue, results[1].pvalue_corrected);

        let labels: Vec<Significance> = results.iter().map(|r| r.significance).collect();
        let mut surface = RecordingSurface::new();
        test.graph_annotate(&mut surface, &labels, Color::White, 0.5).unwrap();
        let texts: Vec<&str> = surface
            .shapes()
            .iter()
            .filter_map(|s| match s {
                Shape::Text { label, .. } => Some(label.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec![labels[0].as_str(), labels[1].as_str()]);
    }

    #[test]
    fn test_explicit_pair_with_singleton_group() {
        let mut table_rows: Vec<Vec<Value>> = sample_table().rows().to_vec();
        table_rows.push(vec![Value::from("solo"), Value::Float(1.0)]);
        let table = Table::new(vec!["group".to_string(), "score".to_string()], table_rows);
        let test = MultipleTTest::new(&table, "group", "score", vec![("solo".into(), "ctrl".into())]);
        assert!(matches!(
            test.perform_ttest(),
            Err(StatsError::TooFewObservations { ref group, found: 1, .. }) if group == "solo"
        ));
    }

    #[test]
    fn test_one_way_anova() {
        let table = sample_table();
        let anova = OneWayAnova::new(
            &table,
            "group",
            "score",
            vec!["ctrl".to_string(), "drug".to_string(), "vehicle".to_string()],
        );
        let result = anova.perform_anova().unwrap();
        assert!(result.statistic > 0.0);
        assert!(result.pvalue > 0.0 && result.pvalue < 0.05);
    }

    #[test]
    fn test_group_summary_first_seen_order() {
        let table = sample_table();
        let summary = GroupSummary::new(&table, "group", "score");
        let (means, stds) = summary.compute_stats().unwrap();

        assert_eq!(summary.categories().unwrap(), vec!["ctrl", "drug", "vehicle"]);
        assert_eq!(means, vec![2.0, 5.0, 3.0]);
        assert!((stds[0] - 1.0).abs() < 1e-12);
        assert!((stds[1] - 1.0).abs() < 1e-12);
        assert!((stds[2] - 0.5f64.sqrt()).abs() < 1e-12);
    }
}
