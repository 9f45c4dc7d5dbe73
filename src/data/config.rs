//! Connection parameters read from an INI credentials file.
//!
//! The file holds one section per database, e.g.
//!
//! ```ini
//! [postgresql]
//! host=localhost
//! dbname=assays
//! user=analyst
//! password=secret
//! port=5432
//! ```

use std::path::Path;

use ini::{Ini, ParseOption};
use thiserror::Error;
use tracing::debug;

/// Credentials file looked up when none is given
pub const DEFAULT_CONFIG_FILE: &str = "db.ini";

/// Section read when none is given
pub const DEFAULT_SECTION: &str = "postgresql";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Section {section} not found in the {filename} file")]
    MissingSection { section: String, filename: String },
    #[error("Failed to parse {filename}: {message}")]
    Parse { filename: String, message: String },
}

/// Key/value pairs of one INI section, in file order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DbParams {
    entries: Vec<(String, String)>,
}

impl DbParams {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Read `section` of the INI file at `filename`.
///
/// An unreadable or absent file is treated like an empty one, so both end
/// in `ConfigError::MissingSection`. Keys are lowercased. Values are kept
/// literally: backslashes and quotes in a password reach the server as
/// written.
pub fn read_db_config(filename: impl AsRef<Path>, section: &str) -> Result<DbParams, ConfigError> {
    let path = filename.as_ref();
    let filename = path.display().to_string();

    let ini = match Ini::load_from_file_opt(path, literal_values()) {
        Ok(ini) => ini,
        Err(ini::Error::Io(e)) => {
            debug!(file = %filename, error = %e, "credentials file not readable");
            Ini::new()
        }
        Err(ini::Error::Parse(e)) => {
            return Err(ConfigError::Parse {
                filename,
                message: e.to_string(),
            })
        }
    };

    let props = ini
        .section(Some(section))
        .ok_or_else(|| ConfigError::MissingSection {
            section: section.to_string(),
            filename,
        })?;

    Ok(DbParams {
        entries: props
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_string()))
            .collect(),
    })
}

fn literal_values() -> ParseOption {
    ParseOption {
        enabled_escape: false,
        enabled_quote: false,
        ..Default::default()
    }
}
