//! Significance bracket geometry.

use std::collections::HashMap;

use ratatui::style::Color;

use super::{LineStyle, PlotSurface};

pub const BRACKET_LINE_WIDTH: f64 = 1.5;

/// A three-segment bracket joining two categorical x positions, with the
/// label anchored at the middle of its top bar
#[derive(Debug, Clone, PartialEq)]
pub struct Bracket {
    pub xs: [f64; 4],
    pub ys: [f64; 4],
    pub label_x: f64,
    pub label_y: f64,
}

impl Bracket {
    /// Bracket between two groups whose tallest values are `y1_max` and
    /// `y2_max`. Legs start `h` above each group, the bar sits `h` above the
    /// taller leg.
    pub fn between(x1: f64, x2: f64, y1_max: f64, y2_max: f64, h: f64) -> Self {
        let (y1, y2) = (y1_max + h, y2_max + h);
        let top = y1.max(y2) + h;
        Bracket {
            xs: [x1, x1, x2, x2],
            ys: [y1, top, top, y2],
            label_x: (x1 + x2) * 0.5,
            label_y: top,
        }
    }

    pub fn draw(&self, surface: &mut dyn PlotSurface, label: &str, color: Color) {
        surface.line(
            &self.xs,
            &self.ys,
            LineStyle {
                width: BRACKET_LINE_WIDTH,
                color,
            },
        );
        surface.text(self.label_x, self.label_y, label, color);
    }
}

/// Per-group height below which nothing new may be drawn.
///
/// Starts at each group's maximum value and rises every time a bracket is
/// stacked over the group, so later brackets land above earlier ones.
#[derive(Debug, Clone, Default)]
pub struct RunningMax {
    tops: HashMap<String, f64>,
}

impl RunningMax {
    pub fn new(tops: impl IntoIterator<Item = (String, f64)>) -> Self {
        RunningMax {
            tops: tops.into_iter().collect(),
        }
    }

    pub fn get(&self, group: &str) -> Option<f64> {
        self.tops.get(group).copied()
    }

    /// Bracket for the next comparison between `g1` (at `x1`) and `g2` (at
    /// `x2`). Both groups are raised to `h` above the bracket base.
    ///
    /// Returns `None` when either group is unknown.
    pub fn stack(&mut self, g1: &str, x1: f64, g2: &str, x2: f64, h: f64) -> Option<Bracket> {
        let y1 = self.get(g1)? + h;
        let y2 = self.get(g2)? + h;
        let base = y1.max(y2);

        self.tops.insert(g1.to_string(), base + h);
        self.tops.insert(g2.to_string(), base + h);

        let bar = base + 0.5 * h;
        Some(Bracket {
            xs: [x1, x1, x2, x2],
            ys: [base, bar, bar, base],
            label_x: (x1 + x2) * 0.5,
            label_y: bar,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plot::{RecordingSurface, Shape};

    #[test]
    fn test_single_bracket_clears_taller_group() {
        let bracket = Bracket::between(0.0, 1.0, 5.0, 8.0, 1.0);
        assert_eq!(bracket.xs, [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(bracket.ys, [6.0, 10.0, 10.0, 9.0]);
        assert_eq!((bracket.label_x, bracket.label_y), (0.5, 10.0));

        // Taller group on the left gives the same bar height
        let mirrored = Bracket::between(0.0, 1.0, 8.0, 5.0, 1.0);
        assert_eq!(mirrored.ys, [9.0, 10.0, 10.0, 6.0]);
    }

    #[test]
    fn test_stacked_brackets_do_not_overlap() {
        let mut tops = RunningMax::new([
            ("a".to_string(), 10.0),
            ("b".to_string(), 12.0),
            ("c".to_string(), 11.0),
        ]);
        let h = 1.0;

        let first = tops.stack("a", 0.0, "b", 1.0, h).unwrap();
        assert_eq!(first.ys, [13.0, 13.5, 13.5, 13.0]);
        assert_eq!(tops.get("a"), Some(14.0));
        assert_eq!(tops.get("b"), Some(14.0));
        assert_eq!(tops.get("c"), Some(11.0));

        let second = tops.stack("a", 0.0, "c", 2.0, h).unwrap();
        assert_eq!(second.ys[0], 15.0);
        assert!(second.ys[0] > first.ys[1]);

        let third = tops.stack("b", 1.0, "c", 2.0, h).unwrap();
        assert_eq!(third.ys[0], 17.0);
    }

    #[test]
    fn test_stack_unknown_group() {
        let mut tops = RunningMax::new([("a".to_string(), 1.0)]);
        assert!(tops.stack("a", 0.0, "z", 1.0, 0.5).is_none());
        assert_eq!(tops.get("a"), Some(1.0));
    }

    #[test]
    fn test_draw_emits_line_then_label() {
        let mut surface = RecordingSurface::new();
        Bracket::between(0.0, 2.0, 1.0, 1.0, 0.5).draw(&mut surface, "**", Color::White);

        assert_eq!(surface.shapes().len(), 2);
        assert!(matches!(
            &surface.shapes()[0],
            Shape::Line { style, .. } if style.width == BRACKET_LINE_WIDTH
        ));
        assert!(matches!(
            &surface.shapes()[1],
            Shape::Text { x, label, .. } if *x == 1.0 && label == "**"
        ));
    }
}
