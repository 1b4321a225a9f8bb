//! Flag kinds and typed flag values.
//!
//! The set of kinds is closed. Every kind knows how to:
//! - produce its zero value (used when a flag declares no default)
//! - parse a raw command-line or environment string
//! - coerce a decoded document node

use serde::{Serialize, Serializer};
use serde_yaml::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Kind of value a flag holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagKind {
    Int,
    Uint,
    Float,
    Bool,
    String,
    Path,
    Duration,
    StringList,
    IntList,
    FloatList,
}

impl fmt::Display for FlagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlagKind::Int => "int",
            FlagKind::Uint => "uint",
            FlagKind::Float => "float",
            FlagKind::Bool => "bool",
            FlagKind::String => "string",
            FlagKind::Path => "path",
            FlagKind::Duration => "duration",
            FlagKind::StringList => "string list",
            FlagKind::IntList => "int list",
            FlagKind::FloatList => "float list",
        };
        write!(f, "{}", name)
    }
}

impl FlagKind {
    /// Whether the kind holds a sequence of values.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            FlagKind::StringList | FlagKind::IntList | FlagKind::FloatList
        )
    }

    /// Whether an empty raw string is a meaningful value for this kind.
    pub fn accepts_empty(self) -> bool {
        matches!(self, FlagKind::String | FlagKind::Path) || self.is_list()
    }

    /// The value a flag of this kind has when nothing else supplies one.
    pub fn zero(self) -> FlagValue {
        match self {
            FlagKind::Int => FlagValue::Int(0),
            FlagKind::Uint => FlagValue::Uint(0),
            FlagKind::Float => FlagValue::Float(0.0),
            FlagKind::Bool => FlagValue::Bool(false),
            FlagKind::String => FlagValue::String(String::new()),
            FlagKind::Path => FlagValue::Path(PathBuf::new()),
            FlagKind::Duration => FlagValue::Duration(Duration::ZERO),
            FlagKind::StringList => FlagValue::StringList(Vec::new()),
            FlagKind::IntList => FlagValue::IntList(Vec::new()),
            FlagKind::FloatList => FlagValue::FloatList(Vec::new()),
        }
    }

    /// Parse a raw string from the command line or environment.
    ///
    /// List kinds split on commas. Returns the reason on failure.
    pub fn parse(self, raw: &str) -> Result<FlagValue, String> {
        match self {
            FlagKind::Int => parse_int(raw).map(FlagValue::Int),
            FlagKind::Uint => parse_uint(raw).map(FlagValue::Uint),
            FlagKind::Float => parse_float(raw).map(FlagValue::Float),
            FlagKind::Bool => parse_bool(raw).map(FlagValue::Bool),
            FlagKind::String => Ok(FlagValue::String(raw.to_string())),
            FlagKind::Path => Ok(FlagValue::Path(PathBuf::from(raw))),
            FlagKind::Duration => parse_duration(raw).map(FlagValue::Duration),
            FlagKind::StringList => Ok(FlagValue::StringList(
                split_list(raw).map(str::to_string).collect(),
            )),
            FlagKind::IntList => split_list(raw)
                .map(parse_int)
                .collect::<Result<_, _>>()
                .map(FlagValue::IntList),
            FlagKind::FloatList => split_list(raw)
                .map(parse_float)
                .collect::<Result<_, _>>()
                .map(FlagValue::FloatList),
        }
    }

    /// Parse every occurrence of a repeatable command-line flag.
    ///
    /// Scalar kinds keep the last occurrence; list kinds concatenate.
    pub fn parse_all<'a>(
        self,
        raws: impl IntoIterator<Item = &'a str>,
    ) -> Result<Option<FlagValue>, String> {
        let mut result: Option<FlagValue> = None;
        for raw in raws {
            let parsed = self.parse(raw)?;
            result = Some(match (result, parsed) {
                (Some(FlagValue::StringList(mut a)), FlagValue::StringList(b)) => {
                    a.extend(b);
                    FlagValue::StringList(a)
                }
                (Some(FlagValue::IntList(mut a)), FlagValue::IntList(b)) => {
                    a.extend(b);
                    FlagValue::IntList(a)
                }
                (Some(FlagValue::FloatList(mut a)), FlagValue::FloatList(b)) => {
                    a.extend(b);
                    FlagValue::FloatList(a)
                }
                (_, parsed) => parsed,
            });
        }
        Ok(result)
    }

    /// Coerce a decoded document node to this kind.
    ///
    /// `base_dir` is the directory of the file the node came from; relative
    /// paths are resolved against it. On failure returns a description of
    /// what was found.
    pub fn coerce(self, node: &Value, base_dir: Option<&Path>) -> Result<FlagValue, String> {
        if let Value::Tagged(tagged) = node {
            return self.coerce(&tagged.value, base_dir);
        }
        match self {
            FlagKind::Int => coerce_int(node).map(FlagValue::Int),
            FlagKind::Uint => coerce_uint(node).map(FlagValue::Uint),
            FlagKind::Float => coerce_float(node).map(FlagValue::Float),
            FlagKind::Bool => coerce_bool(node).map(FlagValue::Bool),
            FlagKind::String => coerce_string(node).map(FlagValue::String),
            FlagKind::Path => coerce_string(node).map(|s| {
                let path = PathBuf::from(s);
                match base_dir {
                    Some(dir) if !path.as_os_str().is_empty() && path.is_relative() => {
                        FlagValue::Path(dir.join(path))
                    }
                    _ => FlagValue::Path(path),
                }
            }),
            FlagKind::Duration => coerce_duration(node).map(FlagValue::Duration),
            FlagKind::StringList => coerce_list(node, coerce_string).map(FlagValue::StringList),
            FlagKind::IntList => coerce_list(node, coerce_int).map(FlagValue::IntList),
            FlagKind::FloatList => coerce_list(node, coerce_float).map(FlagValue::FloatList),
        }
    }
}

/// A typed flag value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FlagValue {
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    String(String),
    Path(PathBuf),
    Duration(#[serde(serialize_with = "serialize_duration")] Duration),
    StringList(Vec<String>),
    IntList(Vec<i64>),
    FloatList(Vec<f64>),
}

impl FlagValue {
    pub fn kind(&self) -> FlagKind {
        match self {
            FlagValue::Int(_) => FlagKind::Int,
            FlagValue::Uint(_) => FlagKind::Uint,
            FlagValue::Float(_) => FlagKind::Float,
            FlagValue::Bool(_) => FlagKind::Bool,
            FlagValue::String(_) => FlagKind::String,
            FlagValue::Path(_) => FlagKind::Path,
            FlagValue::Duration(_) => FlagKind::Duration,
            FlagValue::StringList(_) => FlagKind::StringList,
            FlagValue::IntList(_) => FlagKind::IntList,
            FlagValue::FloatList(_) => FlagKind::FloatList,
        }
    }
}

impl FlagValue {
    /// Convert to `kind` where no information is lost.
    ///
    /// Covers the literals a declaration naturally writes: a non-negative
    /// integer for a `Uint`, an integer for a `Float`, text for a `Path`.
    /// Returns the value unchanged on failure.
    pub fn fit(self, kind: FlagKind) -> Result<FlagValue, FlagValue> {
        if self.kind() == kind {
            return Ok(self);
        }
        match (self, kind) {
            (FlagValue::Int(v), FlagKind::Uint) if v >= 0 => Ok(FlagValue::Uint(v as u64)),
            (FlagValue::Int(v), FlagKind::Float) => Ok(FlagValue::Float(v as f64)),
            (FlagValue::Uint(v), FlagKind::Int) if i64::try_from(v).is_ok() => {
                Ok(FlagValue::Int(v as i64))
            }
            (FlagValue::Uint(v), FlagKind::Float) => Ok(FlagValue::Float(v as f64)),
            (FlagValue::String(v), FlagKind::Path) => Ok(FlagValue::Path(PathBuf::from(v))),
            (FlagValue::Path(v), FlagKind::String) => match v.into_os_string().into_string() {
                Ok(s) => Ok(FlagValue::String(s)),
                Err(os) => Err(FlagValue::Path(PathBuf::from(os))),
            },
            (FlagValue::IntList(v), FlagKind::FloatList) => Ok(FlagValue::FloatList(
                v.into_iter().map(|i| i as f64).collect(),
            )),
            (value, _) => Err(value),
        }
    }
}

impl fmt::Display for FlagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: ToString>(items: &[T]) -> String {
            items
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        }
        match self {
            FlagValue::Int(v) => write!(f, "{}", v),
            FlagValue::Uint(v) => write!(f, "{}", v),
            FlagValue::Float(v) => write!(f, "{}", v),
            FlagValue::Bool(v) => write!(f, "{}", v),
            FlagValue::String(v) => write!(f, "{}", v),
            FlagValue::Path(v) => write!(f, "{}", v.display()),
            FlagValue::Duration(v) => write!(f, "{}", humantime::format_duration(*v)),
            FlagValue::StringList(v) => write!(f, "{}", v.join(",")),
            FlagValue::IntList(v) => write!(f, "{}", join(v)),
            FlagValue::FloatList(v) => write!(f, "{}", join(v)),
        }
    }
}

fn serialize_duration<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&humantime::format_duration(*d).to_string())
}

// Raw string parsing

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|s| !s.is_empty())
}

/// Split an optional radix prefix (`0x`, `0o`, `0b`) off a digit string.
fn radix_of(digits: &str) -> (u32, &str) {
    let lower = digits.get(..2).map(str::to_ascii_lowercase);
    match lower.as_deref() {
        Some("0x") => (16, &digits[2..]),
        Some("0o") => (8, &digits[2..]),
        Some("0b") => (2, &digits[2..]),
        _ => (10, digits),
    }
}

/// `from_str_radix` accepts its own sign, which would let `0x-5` or `+-5` through.
fn reject_inner_sign(digits: &str) -> Result<(), String> {
    if digits.starts_with(['+', '-']) {
        return Err("invalid digit found in string".to_string());
    }
    Ok(())
}

fn parse_int(raw: &str) -> Result<i64, String> {
    let s = raw.trim();
    let (negative, unsigned) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, digits) = radix_of(unsigned);
    reject_inner_sign(digits)?;
    // Parse with the sign attached so i64::MIN round-trips.
    let signed = if negative {
        format!("-{}", digits)
    } else {
        digits.to_string()
    };
    i64::from_str_radix(&signed, radix).map_err(|e| e.to_string())
}

fn parse_uint(raw: &str) -> Result<u64, String> {
    let s = raw.trim();
    let s = s.strip_prefix('+').unwrap_or(s);
    let (radix, digits) = radix_of(s);
    reject_inner_sign(digits)?;
    u64::from_str_radix(digits, radix).map_err(|e| e.to_string())
}

fn parse_float(raw: &str) -> Result<f64, String> {
    raw.trim().parse::<f64>().map_err(|e| e.to_string())
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        other => Err(format!("{:?} is not a boolean", other)),
    }
}

fn parse_duration(raw: &str) -> Result<Duration, String> {
    let s = raw.trim();
    if let Ok(secs) = s.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

// Document coercion

/// Short description of a node for error messages.
pub(crate) fn describe(node: &Value) -> String {
    match node {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("bool {}", b),
        Value::Number(n) => format!("number {}", n),
        Value::String(s) => format!("string {:?}", s),
        Value::Sequence(_) => "sequence".to_string(),
        Value::Mapping(_) => "mapping".to_string(),
        Value::Tagged(t) => format!("tagged value {}", t.tag),
    }
}

// 2^63 as f64; integral floats in [-2^63, 2^63) fit in i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn coerce_int(node: &Value) -> Result<i64, String> {
    match node {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if n.is_u64() {
                Err(format!("{} (out of range)", describe(node)))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= -I64_BOUND && f < I64_BOUND => {
                        Ok(f as i64)
                    }
                    _ => Err(describe(node)),
                }
            }
        }
        Value::String(s) => parse_int(s).map_err(|_| describe(node)),
        _ => Err(describe(node)),
    }
}

fn coerce_uint(node: &Value) -> Result<u64, String> {
    match node {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Ok(u)
            } else if n.is_i64() {
                Err(format!("{} (out of range)", describe(node)))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= 0.0 && f < 2.0 * I64_BOUND => {
                        Ok(f as u64)
                    }
                    _ => Err(describe(node)),
                }
            }
        }
        Value::String(s) => parse_uint(s).map_err(|_| describe(node)),
        _ => Err(describe(node)),
    }
}

fn coerce_float(node: &Value) -> Result<f64, String> {
    match node {
        Value::Number(n) => n.as_f64().ok_or_else(|| describe(node)),
        Value::String(s) => parse_float(s).map_err(|_| describe(node)),
        _ => Err(describe(node)),
    }
}

fn coerce_bool(node: &Value) -> Result<bool, String> {
    match node {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => parse_bool(s).map_err(|_| describe(node)),
        _ => Err(describe(node)),
    }
}

fn coerce_string(node: &Value) -> Result<String, String> {
    match node {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(describe(node)),
    }
}

fn coerce_duration(node: &Value) -> Result<Duration, String> {
    match node {
        Value::String(s) => parse_duration(s).map_err(|_| describe(node)),
        Value::Number(n) => n
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| describe(node)),
        _ => Err(describe(node)),
    }
}

fn coerce_list<T>(
    node: &Value,
    element: fn(&Value) -> Result<T, String>,
) -> Result<Vec<T>, String> {
    match node {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let item = match item {
                    Value::Tagged(t) => &t.value,
                    other => other,
                };
                element(item).map_err(|found| format!("element {}: {}", i, found))
            })
            .collect(),
        Value::Mapping(_) | Value::Null => Err(describe(node)),
        scalar => element(scalar).map(|v| vec![v]),
    }
}
