//! Subcommand handlers.
//!
//! Every handler loads the table from its source, runs one helper and
//! prints either a plain-text table or JSON.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tracing::info;

use crate::app;
use crate::cli::{AppConfig, ColumnArgs, Commands, SourceArgs};
use crate::data::{count_unique, group, load_table, sum_by_var, Table, Value};
use crate::stats::{
    CorrectionMethod, GroupSummary, MultipleComparisonTTest, MultipleTTest, OneWayAnova,
    PairwiseResult, Significance, TestResult, UnpairedTTest,
};

pub fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Load { source, rows } => load(&source, rows),
        Commands::Summary { source, columns, json } => summary(&source, &columns, json),
        Commands::Count { source, var, name, json } => {
            let table = fetch(&source)?;
            emit_table(&count_unique(&table, &var, &name)?, json)
        }
        Commands::Sum { source, by, var, name, json } => {
            let table = fetch(&source)?;
            let grouped = group(&table, by.as_slice())?;
            emit_table(&sum_by_var(&grouped, &var, &name)?, json)
        }
        Commands::Ttest { source, columns, categories, json } => {
            ttest(&source, &columns, &categories, json)
        }
        Commands::Pairwise { source, columns, method, json } => {
            pairwise(&source, &columns, method, json)
        }
        Commands::Pairs { source, columns, pairs, json } => {
            let table = fetch(&source)?;
            let test = MultipleTTest::new(&table, &columns.var, &columns.value, pairs);
            let results = test.perform_ttest()?;
            emit_pairwise(&results, json)
        }
        Commands::Anova { source, columns, categories, json } => {
            anova(&source, &columns, categories, json)
        }
        Commands::Show { source, var, value, method, sci, tick_format } => {
            app::run(AppConfig::from_show_command(&source, var, value, method, sci, tick_format))
        }
    }
}

fn fetch(source: &SourceArgs) -> Result<Table> {
    let config = source.resolve();
    load_table(&config).with_context(|| match &config.sqlite {
        Some(path) => format!("Failed to load table from {}", path.display()),
        None => format!("Failed to load table using {}", config.config_file.display()),
    })
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn emit_table(table: &Table, json: bool) -> Result<()> {
    if json {
        return print_json(table);
    }
    println!("{}", table.head(table.len()));
    Ok(())
}

fn load(source: &SourceArgs, rows: usize) -> Result<()> {
    let table = fetch(source)?;
    println!("{}", table.head(rows));
    Ok(())
}

#[derive(Serialize)]
struct GroupStats {
    category: String,
    mean: f64,
    std: f64,
}

fn summary(source: &SourceArgs, columns: &ColumnArgs, json: bool) -> Result<()> {
    let table = fetch(source)?;
    let summary = GroupSummary::new(&table, &columns.var, &columns.value);
    let categories = summary.categories()?;
    let (means, stds) = summary.compute_stats()?;

    if json {
        let stats: Vec<GroupStats> = categories
            .into_iter()
            .zip(means.into_iter().zip(stds))
            .map(|(category, (mean, std))| GroupStats { category, mean, std })
            .collect();
        return print_json(&stats);
    }

    let rows = categories
        .into_iter()
        .zip(means.into_iter().zip(stds))
        .map(|(category, (mean, std))| vec![Value::Text(category), Value::Float(mean), Value::Float(std)])
        .collect();
    let out = Table::new(vec![columns.var.clone(), "mean".to_string(), "std".to_string()], rows);
    println!("{}", out.head(out.len()));
    Ok(())
}

#[derive(Serialize)]
struct TTestReport<'a> {
    group1: &'a str,
    group2: &'a str,
    statistic: f64,
    pvalue: f64,
    significance: Significance,
}

fn ttest(source: &SourceArgs, columns: &ColumnArgs, categories: &[String], json: bool) -> Result<()> {
    let [c1, c2] = categories else {
        bail!("--categories takes exactly two values, got {}", categories.len());
    };

    let table = fetch(source)?;
    let test = UnpairedTTest::new(&table, &columns.var, [c1.as_str(), c2.as_str()], &columns.value);
    let (result, significance) = test.perform_ttest()?;
    info!(statistic = result.statistic, pvalue = result.pvalue, "t-test done");

    if json {
        return print_json(&TTestReport {
            group1: c1,
            group2: c2,
            statistic: result.statistic,
            pvalue: result.pvalue,
            significance,
        });
    }
    println!(
        "{c1} vs {c2}: t = {:.4}, p = {:.4e} ({significance})",
        result.statistic, result.pvalue
    );
    Ok(())
}

fn pairwise(source: &SourceArgs, columns: &ColumnArgs, method: CorrectionMethod, json: bool) -> Result<()> {
    let table = fetch(source)?;
    let test = MultipleComparisonTTest::new(&table, &columns.var, &columns.value, method);
    let results = test.perform_ttest()?;
    info!(method = %method, pairs = results.len(), "pairwise comparison done");
    emit_pairwise(&results, json)
}

fn pairwise_table(results: &[PairwiseResult]) -> Table {
    let columns = ["group1", "group2", "stat", "pval", "pval_corr", "reject", "sig"]
        .map(String::from)
        .to_vec();
    let rows = results
        .iter()
        .map(|r| {
            vec![
                Value::Text(r.group1.clone()),
                Value::Text(r.group2.clone()),
                Value::Float(r.statistic),
                Value::Float(r.pvalue),
                Value::Float(r.pvalue_corrected),
                Value::Bool(r.reject),
                Value::Text(r.significance.to_string()),
            ]
        })
        .collect();
    Table::new(columns, rows)
}

fn emit_pairwise(results: &[PairwiseResult], json: bool) -> Result<()> {
    if json {
        return print_json(results);
    }
    if results.is_empty() {
        println!("No comparisons to report");
        return Ok(());
    }
    println!("{}", pairwise_table(results).head(results.len()));
    Ok(())
}

#[derive(Serialize)]
struct AnovaReport<'a> {
    categories: &'a [String],
    #[serde(flatten)]
    result: TestResult,
}

fn anova(source: &SourceArgs, columns: &ColumnArgs, categories: Vec<String>, json: bool) -> Result<()> {
    let table = fetch(source)?;
    let categories = if categories.is_empty() {
        table.labels(&columns.var)?
    } else {
        categories
    };

    let anova = OneWayAnova::new(&table, &columns.var, &columns.value, categories.clone());
    let result = anova.perform_anova()?;

    if json {
        return print_json(&AnovaReport {
            categories: &categories,
            result,
        });
    }
    println!(
        "one-way ANOVA over {}: F = {:.4}, p = {:.4e}",
        categories.join(", "),
        result.statistic,
        result.pvalue
    );
    Ok(())
}
