//! Query execution against PostgreSQL or a SQLite file.
//!
//! Both backends execute one statement, fetch every row and pair the cells
//! with the column names from the statement metadata.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use postgres::{Client, NoTls};
use rusqlite::{types::ValueRef, Connection, OpenFlags, Row};
use rust_decimal::{prelude::ToPrimitive, Decimal};
use tracing::{error, info, warn};

use super::config::{read_db_config, DbParams};
use super::models::{Table, Value};

/// Statement run when the caller does not supply one
pub const DEFAULT_QUERY: &str = "SELECT * FROM v12_platinum_158_dataset_1";

/// Anything that can turn a SQL statement into a [`Table`]
pub trait TableSource {
    fn fetch_table(&mut self, query: &str) -> Result<Table>;
}

/// Where to load the table from
#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub config_file: PathBuf,
    pub section: String,
    pub query: String,
    /// Read from this SQLite file instead of PostgreSQL
    pub sqlite: Option<PathBuf>,
}

/// Open the configured source and run its query
pub fn load_table(source: &SourceConfig) -> Result<Table> {
    let mut backend: Box<dyn TableSource> = match &source.sqlite {
        Some(path) => Box::new(SqliteSource::open(path)?),
        None => {
            let params = read_db_config(&source.config_file, &source.section)?;
            Box::new(connect(&params)?)
        }
    };
    let table = backend.fetch_table(&source.query)?;
    info!(rows = table.len(), columns = table.columns().len(), "table loaded");
    Ok(table)
}

pub struct PgSource {
    client: Client,
}

/// Connect to the PostgreSQL server described by `params`.
///
/// Connection failures are logged and returned.
pub fn connect(params: &DbParams) -> Result<PgSource> {
    let config = pg_config(params)?;

    info!("Connecting to the PostgreSQL database...");
    match config.connect(NoTls) {
        Ok(client) => Ok(PgSource { client }),
        Err(e) => {
            error!(error = %e, "connection failed");
            Err(e).context("Failed to connect to PostgreSQL")
        }
    }
}

fn pg_config(params: &DbParams) -> Result<postgres::Config> {
    let mut config = postgres::Config::new();
    for (key, value) in params.iter() {
        match key {
            "host" => {
                config.host(value);
            }
            "port" => {
                let port: u16 = value
                    .parse()
                    .with_context(|| format!("Invalid port: {value}"))?;
                config.port(port);
            }
            "user" => {
                config.user(value);
            }
            "password" => {
                config.password(value);
            }
            "dbname" | "database" => {
                config.dbname(value);
            }
            "options" => {
                config.options(value);
            }
            "application_name" => {
                config.application_name(value);
            }
            "connect_timeout" => {
                let secs: u64 = value
                    .parse()
                    .with_context(|| format!("Invalid connect_timeout: {value}"))?;
                config.connect_timeout(std::time::Duration::from_secs(secs));
            }
            other => warn!(parameter = other, "ignoring unknown connection parameter"),
        }
    }
    Ok(config)
}

impl TableSource for PgSource {
    fn fetch_table(&mut self, query: &str) -> Result<Table> {
        let stmt = self
            .client
            .prepare(query)
            .with_context(|| format!("Failed to prepare query: {query}"))?;
        let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

        let rows = self
            .client
            .query(&stmt, &[])
            .with_context(|| format!("Failed to execute query: {query}"))?;

        let mut unreadable = BTreeSet::new();
        let mut cells = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut values = Vec::with_capacity(row.len());
            for idx in 0..row.len() {
                values.push(match pg_value(row, idx) {
                    Ok(value) => value,
                    Err(e) => {
                        if unreadable.insert(idx) {
                            warn!(
                                column = row.columns()[idx].name(),
                                error = %e,
                                "column type not readable, its cells are null; cast it to float8 or text in the query"
                            );
                        }
                        Value::Null
                    }
                });
            }
            cells.push(values);
        }

        Ok(Table::new(columns, cells))
    }
}

/// Convert one PostgreSQL cell. Types without a mapping are read as text,
/// which fails for types the driver cannot render as text.
fn pg_value(row: &postgres::Row, idx: usize) -> Result<Value, postgres::Error> {
    let cell = match row.columns()[idx].type_().name() {
        "bool" => row.try_get::<_, Option<bool>>(idx).map(|v| v.map(Value::Bool)),
        "int2" => row
            .try_get::<_, Option<i16>>(idx)
            .map(|v| v.map(|v| Value::Int(v.into()))),
        "int4" => row
            .try_get::<_, Option<i32>>(idx)
            .map(|v| v.map(|v| Value::Int(v.into()))),
        "int8" => row.try_get::<_, Option<i64>>(idx).map(|v| v.map(Value::Int)),
        "float4" => row
            .try_get::<_, Option<f32>>(idx)
            .map(|v| v.map(|v| Value::Float(v.into()))),
        "float8" => row.try_get::<_, Option<f64>>(idx).map(|v| v.map(Value::Float)),
        "numeric" => row.try_get::<_, Option<Decimal>>(idx).map(|v| v.map(decimal_value)),
        "timestamp" => row
            .try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map(|v| v.map(|v| Value::Text(v.to_string()))),
        "timestamptz" => row
            .try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map(|v| v.map(|v| Value::Text(v.to_rfc3339()))),
        "date" => row
            .try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map(|v| v.map(|v| Value::Text(v.to_string()))),
        _ => row.try_get::<_, Option<String>>(idx).map(|v| v.map(Value::Text)),
    }?;
    Ok(cell.unwrap_or(Value::Null))
}

/// `numeric` cells are analysed as floats
fn decimal_value(d: Decimal) -> Value {
    Value::Float(d.to_f64().unwrap_or(f64::NAN))
}

pub struct SqliteSource {
    conn: Connection,
}

impl SqliteSource {
    /// Open a read-only connection to a SQLite database file
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Database file not found: {path:?}");
        }
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open database: {path:?}"))?;
        Ok(SqliteSource { conn })
    }

    /// Wrap an already open connection
    pub fn from_connection(conn: Connection) -> Self {
        SqliteSource { conn }
    }
}

impl TableSource for SqliteSource {
    fn fetch_table(&mut self, query: &str) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(query)
            .with_context(|| format!("Failed to prepare query: {query}"))?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|idx| sqlite_value(row, idx))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context(|| format!("Failed to read rows for query: {query}"))?;

        Ok(Table::new(columns, rows))
    }
}

/// Blobs holding UTF-8 are read as text, anything else as a size marker
fn sqlite_value(row: &Row, idx: usize) -> rusqlite::Result<Value> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Value::Text(s.to_string()),
            Err(_) => Value::Text(format!("<{} bytes>", bytes.len())),
        },
    })
}
