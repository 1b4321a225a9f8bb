//! Read-only, path-addressed view over a decoded document.

use crate::error::{Error, Result};
use crate::value::{FlagKind, FlagValue};
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Separator between path segments in flag names.
pub const PATH_SEPARATOR: char = '.';

/// A decoded input source document.
///
/// Leaves are looked up by dotted path: `top.test` walks into the `top`
/// mapping and reads its `test` key.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Value,
    origin: Option<PathBuf>,
}

impl Document {
    /// Wrap an already-decoded value.
    pub fn new(root: Value) -> Self {
        Self { root, origin: None }
    }

    /// Record the file the document was loaded from.
    ///
    /// Relative path values are resolved against the file's directory.
    pub fn with_origin(mut self, origin: impl Into<PathBuf>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }

    fn base_dir(&self) -> Option<&Path> {
        self.origin.as_deref().and_then(Path::parent)
    }

    /// Find the node at `path`.
    ///
    /// Returns `None` if any intermediate segment is missing or not a mapping,
    /// if the final segment is missing, or if it holds an explicit null.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut node = &self.root;
        for segment in path.split(PATH_SEPARATOR) {
            node = child(node, segment)?;
        }
        match node {
            Value::Null => None,
            found => Some(found),
        }
    }

    /// Whether a value exists at `path`.
    pub fn is_set(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// Look up `path` and coerce it to `kind`.
    ///
    /// `Ok(None)` when absent; an error when present but not convertible.
    pub fn value(&self, path: &str, kind: FlagKind) -> Result<Option<FlagValue>> {
        let Some(node) = self.lookup(path) else {
            return Ok(None);
        };
        kind.coerce(node, self.base_dir())
            .map(Some)
            .map_err(|found| Error::Coerce {
                flag: path.to_string(),
                expected: kind,
                found,
            })
    }

    pub fn int(&self, path: &str) -> Result<Option<i64>> {
        match self.value(path, FlagKind::Int)? {
            Some(FlagValue::Int(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn uint(&self, path: &str) -> Result<Option<u64>> {
        match self.value(path, FlagKind::Uint)? {
            Some(FlagValue::Uint(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn float(&self, path: &str) -> Result<Option<f64>> {
        match self.value(path, FlagKind::Float)? {
            Some(FlagValue::Float(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn bool(&self, path: &str) -> Result<Option<bool>> {
        match self.value(path, FlagKind::Bool)? {
            Some(FlagValue::Bool(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn string(&self, path: &str) -> Result<Option<String>> {
        match self.value(path, FlagKind::String)? {
            Some(FlagValue::String(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn path(&self, path: &str) -> Result<Option<PathBuf>> {
        match self.value(path, FlagKind::Path)? {
            Some(FlagValue::Path(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn duration(&self, path: &str) -> Result<Option<Duration>> {
        match self.value(path, FlagKind::Duration)? {
            Some(FlagValue::Duration(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn string_list(&self, path: &str) -> Result<Option<Vec<String>>> {
        match self.value(path, FlagKind::StringList)? {
            Some(FlagValue::StringList(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn int_list(&self, path: &str) -> Result<Option<Vec<i64>>> {
        match self.value(path, FlagKind::IntList)? {
            Some(FlagValue::IntList(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }

    pub fn float_list(&self, path: &str) -> Result<Option<Vec<f64>>> {
        match self.value(path, FlagKind::FloatList)? {
            Some(FlagValue::FloatList(v)) => Ok(Some(v)),
            _ => Ok(None),
        }
    }
}

/// Step one segment into a mapping.
///
/// Keys that decoded as numbers or booleans match their textual form.
fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    let map = match node {
        Value::Mapping(map) => map,
        Value::Tagged(tagged) => return child(&tagged.value, segment),
        _ => return None,
    };
    if let Some(found) = map.get(segment) {
        return Some(found);
    }
    map.iter().find_map(|(key, value)| match key {
        Value::Number(n) if n.to_string() == segment => Some(value),
        Value::Bool(b) if b.to_string() == segment => Some(value),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(src: &str) -> Document {
        Document::new(serde_yaml::from_str(src).unwrap())
    }

    #[test]
    fn test_flat_lookup() {
        let d = doc("test: 15");
        assert_eq!(d.int("test").unwrap(), Some(15));
        assert!(d.is_set("test"));
    }

    #[test]
    fn test_nested_lookup() {
        let d = doc("top:\n  test: 15\n");
        assert_eq!(d.int("top.test").unwrap(), Some(15));
        assert!(d.is_set("top"));
        assert!(!d.is_set("test"));
    }

    #[test]
    fn test_missing_segments_are_not_errors() {
        let d = doc("top:\n  test: 15\nleaf: 3\n");
        assert_eq!(d.int("missing").unwrap(), None);
        assert_eq!(d.int("top.missing").unwrap(), None);
        assert_eq!(d.int("missing.test").unwrap(), None);
        // Intermediate segment is a scalar, not a mapping
        assert_eq!(d.int("leaf.test").unwrap(), None);
    }

    #[test]
    fn test_null_counts_as_absent() {
        let d = doc("test: ~\n");
        assert!(!d.is_set("test"));
        assert_eq!(d.int("test").unwrap(), None);
    }

    #[test]
    fn test_dotted_name_is_a_path_not_a_literal_key() {
        let d = doc("\"top.test\": 15\n");
        assert_eq!(d.int("top.test").unwrap(), None);
    }

    #[test]
    fn test_non_string_keys_match_textually() {
        let d = doc("ports:\n  80: http\n  443: https\nflags:\n  true: on\n");
        assert_eq!(d.string("ports.443").unwrap(), Some("https".to_string()));
        assert_eq!(d.string("flags.true").unwrap(), Some("on".to_string()));
    }

    #[test]
    fn test_coercion_failure_names_flag() {
        let d = doc("test: fifteen\n");
        let err = d.int("test").unwrap_err();
        match err {
            Error::Coerce {
                flag,
                expected,
                found,
            } => {
                assert_eq!(flag, "test");
                assert_eq!(expected, FlagKind::Int);
                assert_eq!(found, "string \"fifteen\"");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_typed_getters() {
        let d = doc(
            r#"
name: svc
ratio: 0.5
debug: true
timeout: 1m30s
hosts: [a, b]
ids: [1, 2]
weights: [0.5, 1]
"#,
        );
        assert_eq!(d.string("name").unwrap().as_deref(), Some("svc"));
        assert_eq!(d.float("ratio").unwrap(), Some(0.5));
        assert_eq!(d.bool("debug").unwrap(), Some(true));
        assert_eq!(d.duration("timeout").unwrap(), Some(Duration::from_secs(90)));
        assert_eq!(
            d.string_list("hosts").unwrap(),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(d.int_list("ids").unwrap(), Some(vec![1, 2]));
        assert_eq!(d.float_list("weights").unwrap(), Some(vec![0.5, 1.0]));
    }

    #[test]
    fn test_path_relative_to_origin() {
        let d = doc("tls:\n  cert: certs/server.pem\n").with_origin("/etc/app/config.yaml");
        assert_eq!(
            d.path("tls.cert").unwrap(),
            Some(PathBuf::from("/etc/app/certs/server.pem"))
        );
    }
}
