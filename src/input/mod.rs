//! Reading histogram records from a file or standard input.

use crate::models::Record;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while loading records.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input from {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed input from {name}: {source}")]
    Malformed {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Where the JSON document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    /// `None` and `-` both mean standard input.
    pub fn from_arg(arg: Option<&Path>) -> Self {
        match arg {
            Some(path) if path != Path::new("-") => InputSource::File(path.to_path_buf()),
            _ => InputSource::Stdin,
        }
    }

    /// Read and parse the whole document.
    pub fn read_records(&self) -> Result<Vec<Record>, InputError> {
        let name = self.to_string();
        match self {
            InputSource::Stdin => parse_records(std::io::stdin().lock(), &name),
            InputSource::File(path) => {
                let file = std::fs::File::open(path).map_err(|source| InputError::Io {
                    name: name.clone(),
                    source,
                })?;
                parse_records(std::io::BufReader::new(file), &name)
            }
        }
    }
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "<stdin>"),
            InputSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parse a JSON array of records from `reader`.
///
/// `name` only labels error messages.
pub fn parse_records<R: Read>(mut reader: R, name: &str) -> Result<Vec<Record>, InputError> {
    let mut content = String::new();
    reader
        .read_to_string(&mut content)
        .map_err(|source| InputError::Io {
            name: name.to_string(),
            source,
        })?;

    let records: Vec<Record> =
        serde_json::from_str(&content).map_err(|source| InputError::Malformed {
            name: name.to_string(),
            source,
        })?;

    debug!("Parsed {} records from {}", records.len(), name);
    Ok(records)
}
