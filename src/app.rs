//! Dashboard state and TUI event loop.

use std::io;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::Color,
    Terminal,
};
use tracing::{debug, warn};

use crate::cli::AppConfig;
use crate::data::{load_table, Table};
use crate::plot::{DecimalFormatter, MathTextSciFormatter, RecordingSurface, TickFormatter};
use crate::stats::{
    CorrectionMethod, GroupSummary, MultipleComparisonTTest, OneWayAnova, PairwiseResult,
    StatsError, TestResult,
};
use crate::ui::{
    chart::SignificancePlot,
    widgets::{ColumnList, MethodBar, ResultsPanel, StatusBar},
    HelpOverlay, Theme,
};

/// Horizontal spread of strip plot points around their category
const JITTER: f64 = 0.06;

/// Everything the plot and results panel show for one column pair
#[derive(Debug, Clone)]
pub struct Analysis {
    pub categories: Vec<String>,
    /// Strip plot points per category, x jittered around the category index
    pub points: Vec<Vec<(f64, f64)>>,
    pub means: Vec<f64>,
    pub stds: Vec<f64>,
    pub method: CorrectionMethod,
    pub pairwise: Vec<PairwiseResult>,
    /// Brackets drawn in data coordinates, replayed onto the terminal canvas
    pub annotations: RecordingSurface,
    pub anova: Option<TestResult>,
    /// Why pairwise tests could not run, if they could not
    pub note: Option<String>,
}

impl Analysis {
    pub fn compute(
        table: &Table,
        var: &str,
        value: &str,
        method: CorrectionMethod,
        bracket_color: Color,
    ) -> Result<Self, StatsError> {
        let summary = GroupSummary::new(table, var, value);
        let categories = summary.categories()?;
        let (means, stds) = summary.compute_stats()?;

        let mut points = Vec::with_capacity(categories.len());
        for (i, category) in categories.iter().enumerate() {
            let ys = table.numeric_where(var, category, value)?;
            points.push(
                ys.into_iter()
                    .enumerate()
                    .map(|(k, y)| (i as f64 + ((k % 5) as f64 - 2.0) * JITTER, y))
                    .collect(),
            );
        }

        let h = bracket_step(&points);
        let mut annotations = RecordingSurface::new();
        let test = MultipleComparisonTTest::new(table, var, value, method);
        let (pairwise, note) = match test.perform_ttest() {
            Ok(results) => {
                test.graph_annotate(&mut annotations, &results, bracket_color, h)?;
                (results, None)
            }
            Err(e) => {
                debug!(error = %e, "pairwise tests skipped");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let anova = OneWayAnova::new(table, var, value, categories.clone())
            .perform_anova()
            .ok();

        Ok(Analysis {
            categories,
            points,
            means,
            stds,
            method,
            pairwise,
            annotations,
            anova,
            note,
        })
    }

    /// Vertical range covering points, error bars and brackets, padded
    pub fn y_bounds(&self) -> [f64; 2] {
        let spread = self
            .means
            .iter()
            .zip(&self.stds)
            .filter(|(m, s)| m.is_finite() && s.is_finite())
            .flat_map(|(m, s)| [m - s, m + s]);
        let ys = self
            .points
            .iter()
            .flatten()
            .map(|(_, y)| *y)
            .chain(spread)
            .chain(self.annotations.y_max())
            .filter(|y| y.is_finite());

        let (lo, hi) = ys.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
        if lo > hi {
            return [0.0, 1.0];
        }
        let range = if hi > lo { hi - lo } else { 1.0 };
        [lo - range * 0.05, hi + range * 0.12]
    }
}

/// Bracket spacing: 5% of the data range
fn bracket_step(points: &[Vec<(f64, f64)>]) -> f64 {
    let (lo, hi) = points
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), (_, y)| {
            (lo.min(*y), hi.max(*y))
        });
    if hi > lo {
        (hi - lo) * 0.05
    } else {
        1.0
    }
}

/// Which panel is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Groups,
    Values,
}

impl FocusedPanel {
    fn next(self) -> Self {
        match self {
            FocusedPanel::Groups => FocusedPanel::Values,
            FocusedPanel::Values => FocusedPanel::Groups,
        }
    }
}

/// Application state
pub struct App {
    config: AppConfig,
    theme: Theme,

    // Data
    table: Table,
    columns: Vec<String>,
    value_columns: Vec<String>,
    analysis: Option<Analysis>,

    // UI State
    focused: FocusedPanel,
    selected_var: usize,
    selected_value: usize,
    method: CorrectionMethod,
    sci_ticks: bool,
    sci_format: MathTextSciFormatter,
    show_help: bool,

    should_quit: bool,

    // Error message to display (non-fatal)
    error_message: Option<String>,
}

impl App {
    /// Load the table and compute the first analysis
    pub fn new(config: AppConfig) -> Result<Self> {
        let table = load_table(&config.source)?;
        Self::with_table(config, table)
    }

    fn with_table(config: AppConfig, table: Table) -> Result<Self> {
        let columns = table.columns().to_vec();
        let value_columns = numeric_columns(&table);
        if value_columns.is_empty() {
            bail!("The table has no numeric column to compare");
        }

        let selected_var = match &config.var {
            Some(var) => match columns.iter().position(|c| c == var) {
                Some(idx) => idx,
                None => bail!("Column {var} not found in the table"),
            },
            None => columns
                .iter()
                .position(|c| !value_columns.contains(c))
                .unwrap_or(0),
        };
        let selected_value = match &config.value {
            Some(value) => match value_columns.iter().position(|c| c == value) {
                Some(idx) => idx,
                None => bail!("Column {value} is missing or not numeric"),
            },
            None => value_columns
                .iter()
                .position(|c| *c != columns[selected_var])
                .unwrap_or(0),
        };

        let mut app = App {
            method: config.method,
            sci_ticks: config.sci_ticks,
            sci_format: config.sci_format.clone(),
            config,
            theme: Theme::default(),
            table,
            columns,
            value_columns,
            analysis: None,
            focused: FocusedPanel::Groups,
            selected_var,
            selected_value,
            show_help: false,
            should_quit: false,
            error_message: None,
        };
        app.recompute();
        Ok(app)
    }

    fn var(&self) -> &str {
        &self.columns[self.selected_var]
    }

    fn value(&self) -> &str {
        &self.value_columns[self.selected_value]
    }

    /// Rerun every test for the current selection
    fn recompute(&mut self) {
        let result = Analysis::compute(
            &self.table,
            self.var(),
            self.value(),
            self.method,
            self.theme.annotation,
        );
        match result {
            Ok(analysis) => {
                self.error_message = analysis.note.clone();
                self.analysis = Some(analysis);
            }
            Err(e) => {
                warn!(error = %e, "analysis failed");
                self.analysis = None;
                self.error_message = Some(e.to_string());
            }
        }
    }

    /// Run the query again, keeping the selected columns when they survive
    fn reload(&mut self) -> Result<()> {
        let table = load_table(&self.config.source)?;
        let (var, value) = (self.var().to_string(), self.value().to_string());

        let value_columns = numeric_columns(&table);
        if value_columns.is_empty() {
            bail!("The reloaded table has no numeric column to compare");
        }
        self.columns = table.columns().to_vec();
        self.selected_var = self.columns.iter().position(|c| *c == var).unwrap_or(0);
        self.selected_value = value_columns.iter().position(|c| *c == value).unwrap_or(0);
        self.value_columns = value_columns;
        self.table = table;

        self.recompute();
        Ok(())
    }

    /// Set an error message to display (non-fatal)
    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    /// Handle keyboard input
    fn handle_input(&mut self, key: KeyCode) -> Result<()> {
        match key {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return Ok(());
            }
            KeyCode::Esc if self.show_help => {
                self.show_help = false;
                return Ok(());
            }
            _ => {}
        }

        // If help is shown, don't process other keys
        if self.show_help {
            return Ok(());
        }

        match key {
            KeyCode::Char('r') => self.reload()?,
            KeyCode::Tab | KeyCode::BackTab => self.focused = self.focused.next(),
            KeyCode::Char('m') => {
                self.method = self.method.next();
                self.recompute();
            }
            KeyCode::Char('e') => self.sci_ticks = !self.sci_ticks,
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
            _ => {}
        }
        Ok(())
    }

    fn move_selection(&mut self, delta: isize) {
        let (selected, len) = match self.focused {
            FocusedPanel::Groups => (&mut self.selected_var, self.columns.len()),
            FocusedPanel::Values => (&mut self.selected_value, self.value_columns.len()),
        };
        if len == 0 {
            return;
        }
        *selected = (*selected as isize + delta).rem_euclid(len as isize) as usize;
        self.recompute();
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        let size = frame.area();

        // Main layout: body, method bar, status bar
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(2),
            ])
            .split(size);

        // Body layout: sidebar (left) and content (right)
        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(24), Constraint::Min(40)])
            .split(main_chunks[0]);

        let sidebar_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(body_chunks[0]);

        let result_rows = self
            .analysis
            .as_ref()
            .map(|a| a.pairwise.len() + 2)
            .unwrap_or(1) as u16;
        let content_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(10),
                Constraint::Length((result_rows + 2).min(10)),
            ])
            .split(body_chunks[1]);

        ColumnList::new(" Group by ", &self.columns, self.selected_var, &self.theme).render(
            frame,
            sidebar_chunks[0],
            self.focused == FocusedPanel::Groups,
        );
        ColumnList::new(" Value ", &self.value_columns, self.selected_value, &self.theme).render(
            frame,
            sidebar_chunks[1],
            self.focused == FocusedPanel::Values,
        );

        let formatter: &dyn TickFormatter = if self.sci_ticks {
            &self.sci_format
        } else {
            &DecimalFormatter
        };
        let title = format!("{} by {}", self.value(), self.var());
        SignificancePlot::new(self.analysis.as_ref(), &title, formatter, &self.theme)
            .render(frame, content_chunks[0]);

        ResultsPanel::new(self.analysis.as_ref(), &self.theme).render(frame, content_chunks[1]);
        MethodBar::new(self.method, &self.theme).render(frame, main_chunks[1]);

        let source = match &self.config.source.sqlite {
            Some(path) => path.display().to_string(),
            None => format!("[{}]", self.config.source.section),
        };
        StatusBar::new(
            &source,
            self.table.len(),
            self.error_message.as_deref(),
            &self.theme,
        )
        .render(frame, main_chunks[2]);

        if self.show_help {
            HelpOverlay::new(&self.theme).render(frame, size);
        }
    }
}

fn numeric_columns(table: &Table) -> Vec<String> {
    table
        .columns()
        .iter()
        .filter(|c| table.is_numeric(c))
        .cloned()
        .collect()
}

/// Restore terminal to normal state
fn restore_terminal() {
    // Best effort cleanup, we may be unwinding
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Run the dashboard
pub fn run(config: AppConfig) -> Result<()> {
    // Load before touching the terminal so failures print normally
    let mut app = App::new(config).context("Failed to initialize application")?;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        restore_terminal();
        return Err(e).context("Failed to setup terminal");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(t) => t,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };

    let result = run_main_loop(&mut terminal, &mut app);

    // Always restore terminal, regardless of result
    restore_terminal();
    terminal.show_cursor().ok();

    result
}

fn run_main_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(Duration::from_millis(250))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Err(e) = app.handle_input(key.code) {
                        app.set_error(format!("{e:#}"));
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{sample_table, SourceConfig, Value};
    use crate::stats::Significance;
    use std::path::PathBuf;

    fn config() -> AppConfig {
        AppConfig {
            source: SourceConfig {
                config_file: PathBuf::from("db.ini"),
                section: "postgresql".to_string(),
                query: "SELECT 1".to_string(),
                sqlite: None,
            },
            var: None,
            value: None,
            method: CorrectionMethod::Bonferroni,
            sci_ticks: false,
            sci_format: MathTextSciFormatter::default(),
        }
    }

    #[test]
    fn test_default_selection_picks_text_then_numeric() {
        let app = App::with_table(config(), sample_table()).unwrap();
        assert_eq!(app.var(), "group");
        assert_eq!(app.value(), "score");
        let analysis = app.analysis.as_ref().unwrap();
        assert_eq!(analysis.categories, vec!["ctrl", "drug", "vehicle"]);
        assert_eq!(analysis.pairwise.len(), 3);
        assert!(analysis.anova.is_some());
    }

    #[test]
    fn test_unknown_column_is_rejected() {
        let mut cfg = config();
        cfg.var = Some("dose".to_string());
        assert!(App::with_table(cfg, sample_table()).is_err());
    }

    #[test]
    fn test_cycling_method_recomputes() {
        let mut app = App::with_table(config(), sample_table()).unwrap();
        app.handle_input(KeyCode::Char('m')).unwrap();
        assert_eq!(app.method, CorrectionMethod::Sidak);
        assert_eq!(app.analysis.as_ref().unwrap().method, CorrectionMethod::Sidak);
    }

    #[test]
    fn test_help_swallows_keys() {
        let mut app = App::with_table(config(), sample_table()).unwrap();
        app.handle_input(KeyCode::Char('?')).unwrap();
        app.handle_input(KeyCode::Char('e')).unwrap();
        assert!(!app.sci_ticks);
        app.handle_input(KeyCode::Esc).unwrap();
        app.handle_input(KeyCode::Char('e')).unwrap();
        assert!(app.sci_ticks);
    }

    #[test]
    fn test_grouping_by_numeric_column_reports_error() {
        let mut app = App::with_table(config(), sample_table()).unwrap();
        // group by "score": every group has one observation
        app.handle_input(KeyCode::Char('j')).unwrap();
        assert_eq!(app.var(), "score");
        let analysis = app.analysis.as_ref().unwrap();
        assert!(analysis.pairwise.is_empty());
        assert!(analysis.note.is_some());
        assert_eq!(app.error_message, analysis.note);
    }

    #[test]
    fn test_brackets_sit_above_data() {
        let table = sample_table();
        let analysis = Analysis::compute(&table, "group", "score", CorrectionMethod::Holm, Color::White)
            .unwrap();
        let data_max = analysis
            .points
            .iter()
            .flatten()
            .map(|(_, y)| *y)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(analysis.annotations.y_max().unwrap() > data_max);
        assert!(analysis.y_bounds()[1] > analysis.annotations.y_max().unwrap());
        assert!(analysis
            .pairwise
            .iter()
            .all(|r| r.significance == Significance::from_pvalue(r.pvalue_corrected)));
    }

    #[test]
    fn test_table_without_numeric_columns() {
        let table = Table::new(vec!["name".to_string()], vec![vec![Value::from("a")]]);
        assert!(App::with_table(config(), table).is_err());
    }
}
