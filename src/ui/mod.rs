//! Terminal User Interface components for the sigstar dashboard.

pub mod chart;
mod help;
mod theme;
pub mod widgets;

pub use help::HelpOverlay;
pub use theme::Theme;
