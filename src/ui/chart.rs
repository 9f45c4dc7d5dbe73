//! Categorical strip plot with significance brackets.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Context, Line as CanvasLine, Points},
        Block, Borders, Paragraph,
    },
    Frame,
};

use super::theme::Theme;
use crate::app::Analysis;
use crate::plot::{LineStyle, PlotSurface, TickFormatter};

const Y_TICKS: usize = 5;

/// Draws annotation shapes onto a ratatui canvas.
///
/// Terminal cells are coarse, so text is shifted up one cell to sit on top
/// of its anchor instead of across it.
struct CanvasSurface<'c, 'a> {
    ctx: &'c mut Context<'a>,
    x_per_cell: f64,
    y_per_cell: f64,
}

impl PlotSurface for CanvasSurface<'_, '_> {
    fn line(&mut self, xs: &[f64], ys: &[f64], style: LineStyle) {
        let points: Vec<(f64, f64)> = xs.iter().copied().zip(ys.iter().copied()).collect();
        for pair in points.windows(2) {
            let ((x1, y1), (x2, y2)) = (pair[0], pair[1]);
            self.ctx.draw(&CanvasLine::new(x1, y1, x2, y2, style.color));
        }
    }

    fn text(&mut self, x: f64, y: f64, label: &str, color: Color) {
        let half_width = label.chars().count() as f64 * self.x_per_cell / 2.0;
        self.ctx.print(
            x - half_width,
            y + self.y_per_cell,
            Span::styled(label.to_string(), Style::default().fg(color)),
        );
    }
}

/// Strip plot of one value column grouped by a categorical column
pub struct SignificancePlot<'a> {
    analysis: Option<&'a Analysis>,
    title: &'a str,
    formatter: &'a dyn TickFormatter,
    theme: &'a Theme,
}

impl<'a> SignificancePlot<'a> {
    pub fn new(
        analysis: Option<&'a Analysis>,
        title: &'a str,
        formatter: &'a dyn TickFormatter,
        theme: &'a Theme,
    ) -> Self {
        SignificancePlot {
            analysis,
            title,
            formatter,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title(format!(" {} ", self.title))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style())
            .title_style(self.theme.title_style());
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let analysis = match self.analysis {
            Some(a) if !a.categories.is_empty() => a,
            _ => {
                let message = Paragraph::new("No data available")
                    .style(Style::default().add_modifier(Modifier::DIM))
                    .alignment(Alignment::Center);
                frame.render_widget(message, inner);
                return;
            }
        };

        let [y_min, y_max] = analysis.y_bounds();
        let ticks = tick_values(y_min, y_max, Y_TICKS);
        let tick_labels: Vec<String> = ticks.iter().map(|t| self.formatter.format(*t)).collect();
        let label_width = tick_labels.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 1;

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(label_width), Constraint::Min(1)])
            .split(inner);
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(columns[1]);
        let (plot_area, x_label_area) = (rows[0], rows[1]);
        let y_label_area = Rect {
            height: plot_area.height,
            ..columns[0]
        };

        let y_lines = y_axis_lines(&ticks, &tick_labels, y_min, y_max, y_label_area.height as usize);
        frame.render_widget(
            Paragraph::new(y_lines).alignment(Alignment::Right).style(self.theme.normal_style()),
            y_label_area,
        );
        frame.render_widget(
            Paragraph::new(x_axis_line(&analysis.categories, x_label_area.width as usize))
                .style(self.theme.normal_style()),
            x_label_area,
        );

        let n = analysis.categories.len() as f64;
        let x_per_cell = n / plot_area.width.max(1) as f64;
        let y_per_cell = (y_max - y_min) / plot_area.height.max(1) as f64;

        let canvas = Canvas::default()
            .marker(Marker::Braille)
            .x_bounds([-0.5, n - 0.5])
            .y_bounds([y_min, y_max])
            .paint(|ctx| {
                for (i, points) in analysis.points.iter().enumerate() {
                    ctx.draw(&Points {
                        coords: points,
                        color: self.theme.chart_color(i),
                    });
                }
                ctx.layer();

                for (i, (mean, std)) in analysis.means.iter().zip(&analysis.stds).enumerate() {
                    let x = i as f64;
                    if !mean.is_finite() {
                        continue;
                    }
                    ctx.draw(&CanvasLine::new(x - 0.2, *mean, x + 0.2, *mean, self.theme.summary));
                    if std.is_finite() {
                        ctx.draw(&CanvasLine::new(x, mean - std, x, mean + std, self.theme.summary));
                    }
                }
                ctx.layer();

                let mut surface = CanvasSurface {
                    ctx,
                    x_per_cell,
                    y_per_cell,
                };
                analysis.annotations.replay(&mut surface);
            });
        frame.render_widget(canvas, plot_area);
    }
}

/// `count` evenly spaced values from `min` to `max`
fn tick_values(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count < 2 {
        return vec![min];
    }
    let step = (max - min) / (count - 1) as f64;
    (0..count).map(|i| min + step * i as f64).collect()
}

/// One line per terminal row, with each tick label on the row nearest its value
fn y_axis_lines(ticks: &[f64], labels: &[String], min: f64, max: f64, height: usize) -> Vec<Line<'static>> {
    let mut rows = vec![String::new(); height];
    if height == 0 || max <= min {
        return rows.into_iter().map(Line::from).collect();
    }
    for (tick, label) in ticks.iter().zip(labels) {
        let row = ((max - tick) / (max - min) * (height - 1) as f64).round() as usize;
        if let Some(slot) = rows.get_mut(row) {
            *slot = label.clone();
        }
    }
    rows.into_iter().map(Line::from).collect()
}

/// Category names centered under their x positions, clipped to their slot
fn x_axis_line(categories: &[String], width: usize) -> String {
    let mut line = vec![' '; width];
    if categories.is_empty() || width == 0 {
        return String::new();
    }
    let slot = (width / categories.len()).max(1);
    for (i, category) in categories.iter().enumerate() {
        let label: Vec<char> = category.chars().take(slot.saturating_sub(1).max(1)).collect();
        let center = i * slot + slot / 2;
        let start = center.saturating_sub(label.len() / 2);
        for (offset, c) in label.into_iter().enumerate() {
            if let Some(cell) = line.get_mut(start + offset) {
                *cell = c;
            }
        }
    }
    line.into_iter().collect()
}
