//! Custom mappings: IDL types replaced by existing target types.
//!
//! Mapping files are TOML:
//!
//! ```toml
//! [[mapping]]
//! idl = "omg.org.CORBA.WStringValue"
//! target = "Sys.Text.WideString"
//! ```
//!
//! `idl` is the target name generated for the IDL type, `target` the full
//! name of a type in a referenced assembly.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("failed to read mapping file `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid mapping file `{name}`: {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("`{idl}` is mapped twice (in `{name}`)")]
    Duplicate { idl: String, name: String },
}

#[derive(Debug, Deserialize)]
struct MappingFile {
    #[serde(default)]
    mapping: Vec<MappingEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct MappingEntry {
    idl: String,
    target: String,
}

/// The custom mappings of one invocation.
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    entries: HashMap<String, String>,
}

impl MappingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<(), MappingError> {
        let text = fs::read_to_string(path).map_err(|source| MappingError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&path.display().to_string(), &text)
    }

    /// Add the mappings of a TOML document; `name` is used in errors.
    pub fn load_str(&mut self, name: &str, text: &str) -> Result<(), MappingError> {
        let file: MappingFile = toml::from_str(text).map_err(|source| MappingError::Parse {
            name: name.to_string(),
            source,
        })?;
        for entry in file.mapping {
            if self.entries.contains_key(&entry.idl) {
                return Err(MappingError::Duplicate {
                    idl: entry.idl,
                    name: name.to_string(),
                });
            }
            debug!(idl = %entry.idl, target = %entry.target, "custom mapping");
            self.entries.insert(entry.idl, entry.target);
        }
        Ok(())
    }

    /// The target type name for the IDL type `idl`, if it is mapped.
    pub fn get(&self, idl: &str) -> Option<&str> {
        self.entries.get(idl).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[mapping]]
idl = "omg.org.CORBA.WStringValue"
target = "Sys.Text.WideString"

[[mapping]]
idl = "M.Date"
target = "Sys.DateTime"
"#;

    #[test]
    fn test_load_mappings() {
        let mut table = MappingTable::new();
        table.load_str("sample.toml", SAMPLE).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("M.Date"), Some("Sys.DateTime"));
        assert_eq!(table.get("M.Other"), None);
    }

    #[test]
    fn test_duplicate_mapping_rejected() {
        let mut table = MappingTable::new();
        table.load_str("a.toml", SAMPLE).unwrap();
        let err = table.load_str("b.toml", SAMPLE).unwrap_err();
        assert!(matches!(err, MappingError::Duplicate { ref name, .. } if name == "b.toml"));
    }

    #[test]
    fn test_invalid_toml_rejected() {
        let mut table = MappingTable::new();
        assert!(matches!(
            table.load_str("bad.toml", "[[mapping]]\nidl = 3\n"),
            Err(MappingError::Parse { .. })
        ));
    }

    #[test]
    fn test_empty_file_is_fine() {
        let mut table = MappingTable::new();
        table.load_str("empty.toml", "").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.toml");
        fs::write(&path, SAMPLE).unwrap();
        let mut table = MappingTable::new();
        table.load(&path).unwrap();
        assert_eq!(table.get("omg.org.CORBA.WStringValue"), Some("Sys.Text.WideString"));
    }
}
