//! UI widgets for the sigstar dashboard.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph},
    Frame,
};

use super::theme::Theme;
use crate::app::Analysis;
use crate::stats::CorrectionMethod;

/// Selectable list of column names
pub struct ColumnList<'a> {
    title: &'a str,
    columns: &'a [String],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> ColumnList<'a> {
    pub fn new(title: &'a str, columns: &'a [String], selected: usize, theme: &'a Theme) -> Self {
        ColumnList {
            title,
            columns,
            selected,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let items: Vec<ListItem> = self
            .columns
            .iter()
            .map(|name| ListItem::new(name.as_str()))
            .collect();

        let (border_style, title_style) = self.theme.panel_styles(focused);
        let block = Block::default()
            .title(self.title)
            .borders(Borders::ALL)
            .border_type(if focused {
                BorderType::Double
            } else {
                BorderType::Plain
            })
            .border_style(border_style)
            .title_style(title_style);

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Pairwise test table plus the ANOVA line
pub struct ResultsPanel<'a> {
    analysis: Option<&'a Analysis>,
    theme: &'a Theme,
}

impl<'a> ResultsPanel<'a> {
    pub fn new(analysis: Option<&'a Analysis>, theme: &'a Theme) -> Self {
        ResultsPanel { analysis, theme }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let Some(analysis) = self.analysis else {
            return vec![Line::from("No results")];
        };

        let mut lines = vec![Line::from(Span::styled(
            format!(
                "{:<12} {:<12} {:>9} {:>10} {:>10}  sig",
                "group1", "group2", "t", "p", "p-adj"
            ),
            Style::default().add_modifier(Modifier::BOLD),
        ))];
        for r in &analysis.pairwise {
            let style = if r.reject {
                self.theme.highlight_style()
            } else {
                self.theme.normal_style()
            };
            lines.push(Line::from(Span::styled(
                format!(
                    "{:<12} {:<12} {:>9.3} {:>10.3e} {:>10.3e}  {}",
                    r.group1, r.group2, r.statistic, r.pvalue, r.pvalue_corrected, r.significance
                ),
                style,
            )));
        }

        if let Some(anova) = analysis.anova {
            lines.push(Line::from(format!(
                "ANOVA: F = {:.3}, p = {:.3e} ({})",
                anova.statistic,
                anova.pvalue,
                anova.significance()
            )));
        }
        lines
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let title = match self.analysis {
            Some(a) => format!(" Pairwise t-tests ({}) ", a.method),
            None => " Pairwise t-tests ".to_string(),
        };
        let paragraph = Paragraph::new(self.lines()).block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(self.theme.border_style())
                .title_style(self.theme.title_style()),
        );
        frame.render_widget(paragraph, area);
    }
}

/// One-line bar listing correction methods, current one highlighted
pub struct MethodBar<'a> {
    selected: CorrectionMethod,
    theme: &'a Theme,
}

impl<'a> MethodBar<'a> {
    pub fn new(selected: CorrectionMethod, theme: &'a Theme) -> Self {
        MethodBar { selected, theme }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::styled("[m] ", Style::default().add_modifier(Modifier::DIM))];
        for method in CorrectionMethod::ALL {
            let style = if method == self.selected {
                self.theme.highlight_style()
            } else {
                self.theme.normal_style()
            };
            spans.push(Span::styled(method.name(), style));
            spans.push(Span::raw("  "));
        }

        let paragraph = Paragraph::new(Line::from(spans)).style(self.theme.normal_style());
        frame.render_widget(paragraph, area);
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    source: &'a str,
    rows: usize,
    error: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(source: &'a str, rows: usize, error: Option<&'a str>, theme: &'a Theme) -> Self {
        StatusBar {
            source,
            rows,
            error,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let line = match self.error {
            Some(e) => Line::from(Span::styled(format!("Error: {e}"), self.theme.error_style())),
            None => Line::from(format!(
                "sigstar: {} ({} rows) | [e] Sci ticks [r] Reload [h] Help [q] Quit",
                self.source, self.rows
            )),
        };

        let paragraph = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(self.theme.border_style()),
        );
        frame.render_widget(paragraph, area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;
    use ratatui::style::Color;

    #[test]
    fn test_results_lines_include_header_rows_and_anova() {
        let table = sample_table();
        let analysis =
            Analysis::compute(&table, "group", "score", CorrectionMethod::Holm, Color::White).unwrap();
        let theme = Theme::default();
        let lines = ResultsPanel::new(Some(&analysis), &theme).lines();

        assert_eq!(lines.len(), 1 + analysis.pairwise.len() + 1);
        assert!(lines[1].to_string().starts_with("ctrl"));
        assert!(lines.last().unwrap().to_string().starts_with("ANOVA"));
    }

    #[test]
    fn test_results_without_analysis() {
        let theme = Theme::default();
        let lines = ResultsPanel::new(None, &theme).lines();
        assert_eq!(lines, vec![Line::from("No results")]);
    }
}
