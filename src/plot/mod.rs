//! Plot annotation primitives.
//!
//! Annotations are drawn onto whatever [`PlotSurface`] the caller has
//! active. [`RecordingSurface`] keeps the shapes so they can be inspected
//! or replayed onto a terminal canvas later.

pub mod annotate;
pub mod ticks;

use ratatui::style::Color;

pub use annotate::{Bracket, RunningMax, BRACKET_LINE_WIDTH};
pub use ticks::{DecimalFormatter, MathTextSciFormatter, TickFormatter};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub width: f64,
    pub color: Color,
}

/// Something annotations can be drawn on, in data coordinates
pub trait PlotSurface {
    /// Polyline through the given points
    fn line(&mut self, xs: &[f64], ys: &[f64], style: LineStyle);

    /// Text whose bottom edge is centered on (x, y)
    fn text(&mut self, x: f64, y: f64, label: &str, color: Color);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Line {
        xs: Vec<f64>,
        ys: Vec<f64>,
        style: LineStyle,
    },
    Text {
        x: f64,
        y: f64,
        label: String,
        color: Color,
    },
}

/// Surface that records every drawing call
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    shapes: Vec<Shape>,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    /// Highest y coordinate touched by any shape
    pub fn y_max(&self) -> Option<f64> {
        self.shapes
            .iter()
            .flat_map(|shape| match shape {
                Shape::Line { ys, .. } => ys.clone(),
                Shape::Text { y, .. } => vec![*y],
            })
            .reduce(f64::max)
    }

    /// Draw every recorded shape onto another surface, in order
    pub fn replay(&self, target: &mut dyn PlotSurface) {
        for shape in &self.shapes {
            match shape {
                Shape::Line { xs, ys, style } => target.line(xs, ys, *style),
                Shape::Text { x, y, label, color } => target.text(*x, *y, label, *color),
            }
        }
    }
}

impl PlotSurface for RecordingSurface {
    fn line(&mut self, xs: &[f64], ys: &[f64], style: LineStyle) {
        self.shapes.push(Shape::Line {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            style,
        });
    }

    fn text(&mut self, x: f64, y: f64, label: &str, color: Color) {
        self.shapes.push(Shape::Text {
            x,
            y,
            label: label.to_string(),
            color,
        });
    }
}
