//! Data layer: credentials, query loading and table helpers.

pub mod aggregate;
pub mod config;
mod models;
pub mod storage;

pub use aggregate::{count_unique, group, sum_by_var, GroupedTable, DEFAULT_RESULT_NAME};
pub use config::{read_db_config, ConfigError, DbParams, DEFAULT_CONFIG_FILE, DEFAULT_SECTION};
#[cfg(test)]
pub(crate) use models::sample_table;
pub(crate) use models::dedup_labels;
pub use models::{Table, TableError, Value};
pub use storage::{load_table, SourceConfig, TableSource, DEFAULT_QUERY};
