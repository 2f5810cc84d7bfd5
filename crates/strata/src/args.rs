//! Argument maps: the flat key → value map a filter consumes.
//!
//! The same map is passed, unchanged, to both preflight and execute.
//! Typed accessors fail with a typed error instead of casting silently.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::path::DataPath;

/// Errors from typed argument access.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("missing argument '{key}'")]
    Missing { key: String },

    #[error("argument '{key}' has type {found}, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Description of a generated input file list.
///
/// The list is purely arithmetic: `dir/prefix{index:0padding}suffix.ext`
/// for `index` in `start..=end` stepping by `increment`. Ordering of the
/// index range is validated before any filesystem probing happens.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileListInfo {
    pub dir: PathBuf,
    pub prefix: String,
    pub suffix: String,
    pub extension: String,
    pub padding: usize,
    pub start: i64,
    pub end: i64,
    pub increment: i64,
}

impl FileListInfo {
    /// Expand to concrete file paths. Assumes the range is valid.
    pub fn file_names(&self) -> Vec<PathBuf> {
        let mut names = vec![];
        if self.increment <= 0 {
            return names;
        }
        let mut index = self.start;
        while index <= self.end {
            names.push(self.dir.join(format!(
                "{}{:0width$}{}.{}",
                self.prefix,
                index,
                self.suffix,
                self.extension,
                width = self.padding
            )));
            index += self.increment;
        }
        names
    }
}

/// One type-erased argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    IntVec(Vec<i64>),
    FloatVec(Vec<f64>),
    Table(Vec<Vec<f64>>),
    FsPath(PathBuf),
    FileList(FileListInfo),
    Path(DataPath),
    PathList(Vec<DataPath>),
}

impl ArgValue {
    /// Type tag used in mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ArgValue::Bool(_) => "bool",
            ArgValue::Int(_) => "int",
            ArgValue::Float(_) => "float",
            ArgValue::String(_) => "string",
            ArgValue::IntVec(_) => "int vector",
            ArgValue::FloatVec(_) => "float vector",
            ArgValue::Table(_) => "table",
            ArgValue::FsPath(_) => "filesystem path",
            ArgValue::FileList(_) => "file list",
            ArgValue::Path(_) => "data path",
            ArgValue::PathList(_) => "data path list",
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::String(v.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::String(v)
    }
}

impl From<DataPath> for ArgValue {
    fn from(v: DataPath) -> Self {
        ArgValue::Path(v)
    }
}

impl From<PathBuf> for ArgValue {
    fn from(v: PathBuf) -> Self {
        ArgValue::FsPath(v)
    }
}

/// Ordered key → value map of user-supplied filter inputs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: IndexMap<String, ArgValue>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArgValue)> {
        self.values.iter()
    }

    fn require(&self, key: &str) -> Result<&ArgValue, ArgumentError> {
        self.values.get(key).ok_or_else(|| ArgumentError::Missing {
            key: key.to_string(),
        })
    }

    fn mismatch(key: &str, expected: &'static str, found: &ArgValue) -> ArgumentError {
        ArgumentError::TypeMismatch {
            key: key.to_string(),
            expected,
            found: found.type_name(),
        }
    }

    pub fn bool_at(&self, key: &str) -> Result<bool, ArgumentError> {
        match self.require(key)? {
            ArgValue::Bool(v) => Ok(*v),
            other => Err(Self::mismatch(key, "bool", other)),
        }
    }

    pub fn int_at(&self, key: &str) -> Result<i64, ArgumentError> {
        match self.require(key)? {
            ArgValue::Int(v) => Ok(*v),
            other => Err(Self::mismatch(key, "int", other)),
        }
    }

    pub fn float_at(&self, key: &str) -> Result<f64, ArgumentError> {
        match self.require(key)? {
            ArgValue::Float(v) => Ok(*v),
            ArgValue::Int(v) => Ok(*v as f64),
            other => Err(Self::mismatch(key, "float", other)),
        }
    }

    pub fn string_at(&self, key: &str) -> Result<&str, ArgumentError> {
        match self.require(key)? {
            ArgValue::String(v) => Ok(v),
            other => Err(Self::mismatch(key, "string", other)),
        }
    }

    pub fn int_vec_at(&self, key: &str) -> Result<&[i64], ArgumentError> {
        match self.require(key)? {
            ArgValue::IntVec(v) => Ok(v),
            other => Err(Self::mismatch(key, "int vector", other)),
        }
    }

    pub fn float_vec_at(&self, key: &str) -> Result<&[f64], ArgumentError> {
        match self.require(key)? {
            ArgValue::FloatVec(v) => Ok(v),
            other => Err(Self::mismatch(key, "float vector", other)),
        }
    }

    pub fn table_at(&self, key: &str) -> Result<&[Vec<f64>], ArgumentError> {
        match self.require(key)? {
            ArgValue::Table(v) => Ok(v),
            other => Err(Self::mismatch(key, "table", other)),
        }
    }

    pub fn fs_path_at(&self, key: &str) -> Result<&PathBuf, ArgumentError> {
        match self.require(key)? {
            ArgValue::FsPath(v) => Ok(v),
            other => Err(Self::mismatch(key, "filesystem path", other)),
        }
    }

    pub fn file_list_at(&self, key: &str) -> Result<&FileListInfo, ArgumentError> {
        match self.require(key)? {
            ArgValue::FileList(v) => Ok(v),
            other => Err(Self::mismatch(key, "file list", other)),
        }
    }

    pub fn path_at(&self, key: &str) -> Result<&DataPath, ArgumentError> {
        match self.require(key)? {
            ArgValue::Path(v) => Ok(v),
            other => Err(Self::mismatch(key, "data path", other)),
        }
    }

    pub fn path_list_at(&self, key: &str) -> Result<&[DataPath], ArgumentError> {
        match self.require(key)? {
            ArgValue::PathList(v) => Ok(v),
            other => Err(Self::mismatch(key, "data path list", other)),
        }
    }
}

impl FromIterator<(String, ArgValue)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (String, ArgValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let args = Arguments::new()
            .with("flag", true)
            .with("count", 3i64)
            .with("name", "Data");

        assert!(args.bool_at("flag").unwrap());
        assert_eq!(args.int_at("count").unwrap(), 3);
        assert_eq!(args.string_at("name").unwrap(), "Data");
    }

    #[test]
    fn test_missing_and_mismatch() {
        let args = Arguments::new().with("count", 3i64);

        assert!(matches!(
            args.bool_at("nope"),
            Err(ArgumentError::Missing { .. })
        ));
        match args.bool_at("count") {
            Err(ArgumentError::TypeMismatch {
                key,
                expected,
                found,
            }) => {
                assert_eq!(key, "count");
                assert_eq!(expected, "bool");
                assert_eq!(found, "int");
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_float_widens_int() {
        let args = Arguments::new().with("x", 2i64);
        assert_eq!(args.float_at("x").unwrap(), 2.0);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let args = Arguments::new()
            .with("b", 1i64)
            .with("a", 2i64)
            .with("c", 3i64);
        let keys: Vec<&String> = args.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["b", "a", "c"]);
    }

    #[test]
    fn test_file_list_expansion() {
        let info = FileListInfo {
            dir: PathBuf::from("/data"),
            prefix: "slice_".to_string(),
            suffix: String::new(),
            extension: "tif".to_string(),
            padding: 3,
            start: 9,
            end: 11,
            increment: 1,
        };
        let names = info.file_names();
        assert_eq!(names.len(), 3);
        assert_eq!(names[0], PathBuf::from("/data/slice_009.tif"));
        assert_eq!(names[2], PathBuf::from("/data/slice_011.tif"));
    }
}
