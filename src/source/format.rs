//! Decoding input source files.

use super::document::Document;
use crate::error::{Error, Result};
use serde_yaml::Value;
use std::path::Path;
use tracing::debug;

/// Supported input source file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileFormat {
    #[default]
    Yaml,
    Json,
}

impl FileFormat {
    /// Pick a format from the file extension. Unknown extensions are YAML.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => FileFormat::Json,
            _ => FileFormat::Yaml,
        }
    }

    /// Decode `content` into a document root.
    pub fn decode(self, content: &str) -> std::result::Result<Value, String> {
        match self {
            FileFormat::Yaml => serde_yaml::from_str::<Value>(content).map_err(|e| e.to_string()),
            FileFormat::Json => {
                let json: serde_json::Value =
                    serde_json::from_str(content).map_err(|e| e.to_string())?;
                serde_yaml::to_value(json).map_err(|e| e.to_string())
            }
        }
    }
}

impl std::fmt::Display for FileFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileFormat::Yaml => write!(f, "yaml"),
            FileFormat::Json => write!(f, "json"),
        }
    }
}

/// Ensure the decoded root can be walked by path.
///
/// An empty file decodes to null and is treated as an empty mapping.
fn check_root(root: Value, path: &Path) -> Result<Value> {
    let inner = match &root {
        Value::Tagged(tagged) => &tagged.value,
        other => other,
    };
    let problem = match inner {
        Value::Null => return Ok(Value::Mapping(Default::default())),
        Value::Mapping(_) => None,
        other => Some(crate::value::describe(other)),
    };
    match problem {
        None => Ok(root),
        Some(found) => Err(Error::Decode {
            path: path.to_path_buf(),
            message: format!("top level must be a mapping, found {}", found),
        }),
    }
}

impl Document {
    /// Decode a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        Self::from_str_as(content, FileFormat::Yaml)
    }

    /// Decode a JSON string.
    pub fn from_json_str(content: &str) -> Result<Self> {
        Self::from_str_as(content, FileFormat::Json)
    }

    fn from_str_as(content: &str, format: FileFormat) -> Result<Self> {
        let path = Path::new("<string>");
        let root = format.decode(content).map_err(|message| Error::Decode {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(Self::new(check_root(root, path)?))
    }

    /// Read and decode a file, choosing the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Self::from_file_as(path, FileFormat::from_path(path))
    }

    /// Read and decode a file in the given format.
    pub fn from_file_as(path: impl AsRef<Path>, format: FileFormat) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let root = format.decode(&content).map_err(|message| Error::Decode {
            path: path.to_path_buf(),
            message,
        })?;
        let root = check_root(root, path)?;
        debug!(path = %path.display(), %format, "Loaded input source");
        Ok(Self::new(root).with_origin(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_path(Path::new("a.yaml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.yml")), FileFormat::Yaml);
        assert_eq!(FileFormat::from_path(Path::new("a.JSON")), FileFormat::Json);
        assert_eq!(FileFormat::from_path(Path::new("current")), FileFormat::Yaml);
    }

    #[test]
    fn test_json_document_supports_nested_paths() {
        let doc = Document::from_json_str(r#"{"top": {"test": 15}}"#).unwrap();
        assert_eq!(doc.int("top.test").unwrap(), Some(15));
    }

    #[test]
    fn test_empty_yaml_is_empty_document() {
        let doc = Document::from_yaml_str("").unwrap();
        assert!(!doc.is_set("test"));
    }

    #[test]
    fn test_scalar_root_is_decode_error() {
        let err = Document::from_yaml_str("just a string").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_malformed_yaml_is_decode_error() {
        let err = Document::from_yaml_str("test: [1, 2").unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_from_file_records_origin() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("current.yaml");
        std::fs::write(&path, "test: 15").unwrap();

        let doc = Document::from_file(&path).unwrap();
        assert_eq!(doc.origin(), Some(path.as_path()));
        assert_eq!(doc.int("test").unwrap(), Some(15));
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let err = Document::from_file(temp.path().join("nope.yaml")).unwrap_err();
        match err {
            Error::Read { path, .. } => assert!(path.ends_with("nope.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
