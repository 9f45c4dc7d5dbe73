//! Command-line interface argument parsing for sigstar.
//!
//! Every subcommand loads one table, then runs a helper over it:
//! - `sigstar load --rows 10`
//! - `sigstar ttest --var group --value score --categories ctrl,drug`
//! - `sigstar pairwise --var group --value score --method holm --json`
//! - `sigstar show --sqlite results.db`

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::data::{SourceConfig, DEFAULT_CONFIG_FILE, DEFAULT_QUERY, DEFAULT_RESULT_NAME, DEFAULT_SECTION};
use crate::plot::MathTextSciFormatter;
use crate::stats::CorrectionMethod;

/// Environment variable naming the INI credentials file
pub const CONFIG_ENV: &str = "SIGSTAR_DB_INI";

/// Load a database table, run t-tests and ANOVA, and draw significance
/// brackets over a categorical plot.
#[derive(Parser, Debug)]
#[command(name = "sigstar")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Where the table comes from
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// INI file with the connection parameters.
    /// Falls back to $SIGSTAR_DB_INI, ./db.ini, then <config dir>/sigstar/db.ini
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// INI section holding the parameters
    #[arg(long, default_value = DEFAULT_SECTION)]
    pub section: String,

    /// SQL statement producing the table
    #[arg(long, default_value = DEFAULT_QUERY)]
    pub query: String,

    /// Read from a SQLite file instead of PostgreSQL
    #[arg(long)]
    pub sqlite: Option<PathBuf>,
}

impl SourceArgs {
    pub fn resolve(&self) -> SourceConfig {
        SourceConfig {
            config_file: config_file_from(self.config.clone(), std::env::var(CONFIG_ENV).ok()),
            section: self.section.clone(),
            query: self.query.clone(),
            sqlite: self.sqlite.clone(),
        }
    }
}

/// First existing candidate among the usual INI locations
fn config_file_from(explicit: Option<PathBuf>, env: Option<String>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Some(path) = env.filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    let local = Path::new(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return local.to_path_buf();
    }
    dirs::config_dir()
        .map(|dir| dir.join("sigstar").join(DEFAULT_CONFIG_FILE))
        .filter(|path| path.exists())
        .unwrap_or_else(|| local.to_path_buf())
}

/// Grouping and measured columns
#[derive(Args, Debug, Clone)]
pub struct ColumnArgs {
    /// Categorical column defining the groups
    #[arg(long)]
    pub var: String,

    /// Numeric column being compared
    #[arg(long)]
    pub value: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the query and print the first rows
    Load {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of rows to print
        #[arg(short = 'n', long, default_value = "5")]
        rows: usize,
    },

    /// Mean and sample standard deviation per group
    Summary {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        columns: ColumnArgs,
        #[arg(long)]
        json: bool,
    },

    /// Occurrences of each distinct value of a column
    Count {
        #[command(flatten)]
        source: SourceArgs,

        /// Column to count
        #[arg(long)]
        var: String,

        /// Name of the count column
        #[arg(long, default_value = DEFAULT_RESULT_NAME)]
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Sum a column per group
    Sum {
        #[command(flatten)]
        source: SourceArgs,

        /// Key columns, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        by: Vec<String>,

        /// Column to sum
        #[arg(long)]
        var: String,

        /// Name of the sum column
        #[arg(long, default_value = DEFAULT_RESULT_NAME)]
        name: String,

        #[arg(long)]
        json: bool,
    },

    /// Unpaired t-test between two categories
    Ttest {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        columns: ColumnArgs,

        /// The two categories, comma-separated
        #[arg(long, value_delimiter = ',', required = true)]
        categories: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// All pairwise t-tests with multiple-comparison correction
    Pairwise {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        columns: ColumnArgs,

        /// Correction method (bonf, sidak, holm-sidak, holm, simes-hochberg,
        /// hommel, fdr_bh, fdr_by)
        #[arg(short, long, default_value = "bonf")]
        method: CorrectionMethod,

        #[arg(long)]
        json: bool,
    },

    /// Uncorrected t-tests for explicit category pairs
    Pairs {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        columns: ColumnArgs,

        /// A pair of categories as `a:b`; repeat for more pairs
        #[arg(short, long = "pair", value_parser = parse_pair, required = true)]
        pairs: Vec<(String, String)>,

        #[arg(long)]
        json: bool,
    },

    /// One-way ANOVA across categories
    Anova {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        columns: ColumnArgs,

        /// Categories to compare, comma-separated. Defaults to every group
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Launch the dashboard: strip plot with stacked significance brackets
    Show {
        #[command(flatten)]
        source: SourceArgs,

        /// Initial grouping column
        #[arg(long)]
        var: Option<String>,

        /// Initial value column
        #[arg(long)]
        value: Option<String>,

        /// Initial correction method
        #[arg(short, long, default_value = "bonf")]
        method: CorrectionMethod,

        /// Start with LaTeX-style scientific tick labels
        #[arg(long)]
        sci: bool,

        /// printf-style format for scientific tick labels, e.g. "%1.3e".
        /// Implies --sci
        #[arg(long, value_name = "FMT", value_parser = parse_tick_format)]
        tick_format: Option<MathTextSciFormatter>,
    },
}

fn parse_tick_format(s: &str) -> Result<MathTextSciFormatter, String> {
    MathTextSciFormatter::new(s).map_err(|e| e.to_string())
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((a, b)) if !a.is_empty() && !b.is_empty() => Ok((a.to_string(), b.to_string())),
        _ => Err(format!("expected a pair as `a:b`, got {s:?}")),
    }
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

/// Configuration for the dashboard
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub source: SourceConfig,
    pub var: Option<String>,
    pub value: Option<String>,
    pub method: CorrectionMethod,
    pub sci_ticks: bool,
    pub sci_format: MathTextSciFormatter,
}

impl AppConfig {
    pub fn from_show_command(
        source: &SourceArgs,
        var: Option<String>,
        value: Option<String>,
        method: CorrectionMethod,
        sci: bool,
        tick_format: Option<MathTextSciFormatter>,
    ) -> Self {
        AppConfig {
            source: source.resolve(),
            var,
            value,
            method,
            sci_ticks: sci || tick_format.is_some(),
            sci_format: tick_format.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::TickFormatter;

    #[test]
    fn test_default_show_config() {
        let cli = Cli::try_parse_from(["sigstar", "show", "--sqlite", "data.db"]).unwrap();
        let Commands::Show { source, var, value, method, sci, tick_format } = cli.command else {
            panic!("expected show");
        };
        let config = AppConfig::from_show_command(&source, var, value, method, sci, tick_format);
        assert_eq!(config.method, CorrectionMethod::Bonferroni);
        assert_eq!(config.source.query, DEFAULT_QUERY);
        assert_eq!(config.source.section, DEFAULT_SECTION);
        assert_eq!(config.source.sqlite, Some(PathBuf::from("data.db")));
        assert!(config.var.is_none());
        assert!(!config.sci_ticks);
        assert_eq!(config.sci_format.fmt(), MathTextSciFormatter::DEFAULT_FORMAT);
    }

    #[test]
    fn test_tick_format_turns_on_sci_ticks() {
        let cli = Cli::try_parse_from(["sigstar", "show", "--tick-format", "%1.3e"]).unwrap();
        let Commands::Show { source, var, value, method, sci, tick_format } = cli.command else {
            panic!("expected show");
        };
        let config = AppConfig::from_show_command(&source, var, value, method, sci, tick_format);
        assert!(config.sci_ticks);
        assert_eq!(config.sci_format.fmt(), "%1.3e");
        assert_eq!(config.sci_format.format(1234.0), "$1.234{\\times}10^{3}$");
    }

    #[test]
    fn test_bad_tick_format_is_rejected() {
        assert!(Cli::try_parse_from(["sigstar", "show", "--tick-format", "%d"]).is_err());
    }

    #[test]
    fn test_ttest_categories_split_on_comma() {
        let cli = Cli::try_parse_from([
            "sigstar", "ttest", "--var", "group", "--value", "score", "--categories", "ctrl,drug",
        ])
        .unwrap();
        match cli.command {
            Commands::Ttest { categories, columns, .. } => {
                assert_eq!(categories, vec!["ctrl", "drug"]);
                assert_eq!(columns.var, "group");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_method_aliases_parse() {
        let cli = Cli::try_parse_from([
            "sigstar", "pairwise", "--var", "g", "--value", "v", "--method", "fdr_bh",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Pairwise { method: CorrectionMethod::FdrBh, .. }
        ));

        let bad = Cli::try_parse_from([
            "sigstar", "pairwise", "--var", "g", "--value", "v", "--method", "tukey",
        ]);
        assert!(bad.is_err());
    }

    #[test]
    fn test_pairs_are_repeatable() {
        let cli = Cli::try_parse_from([
            "sigstar", "pairs", "--var", "g", "--value", "v", "--pair", "a:b", "--pair", "a:c",
        ])
        .unwrap();
        match cli.command {
            Commands::Pairs { pairs, .. } => assert_eq!(
                pairs,
                vec![("a".to_string(), "b".to_string()), ("a".to_string(), "c".to_string())]
            ),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_pair_rejects_missing_side() {
        assert!(parse_pair("a:").is_err());
        assert!(parse_pair("ab").is_err());
    }

    #[test]
    fn test_config_file_precedence() {
        assert_eq!(
            config_file_from(Some(PathBuf::from("explicit.ini")), Some("env.ini".to_string())),
            PathBuf::from("explicit.ini")
        );
        assert_eq!(
            config_file_from(None, Some("env.ini".to_string())),
            PathBuf::from("env.ini")
        );
    }
}
