//! sigstar: load a table from PostgreSQL, run t-tests and ANOVA over its
//! groups, and annotate categorical plots with significance brackets.
//!
//! The `sigstar` binary is a thin shell over these modules. Library users
//! build a [`data::Table`], run the runners in [`stats`] and draw their
//! brackets onto any [`plot::PlotSurface`].

pub mod app;
pub mod cli;
pub mod commands;
pub mod data;
pub mod plot;
pub mod stats;
pub mod ui;

pub use data::{Table, Value};
pub use stats::{
    CorrectionMethod, MultipleComparisonTTest, MultipleTTest, OneWayAnova, Significance,
    UnpairedTTest,
};
