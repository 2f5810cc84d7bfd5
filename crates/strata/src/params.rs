//! Parameter declarations: typed, validated, JSON-round-trippable inputs.
//!
//! Parameters come in two families: plain-value parameters with no store
//! dependency, and data-referencing parameters whose value is a
//! [`DataPath`] validated against live store content. The set is a
//! closed sum type; every variant knows how to serialize, validate, and
//! (for the data-referencing family) resolve its value.

use serde_json::Value as Json;
use std::path::Path;

use crate::args::{ArgValue, Arguments, FileListInfo};
use crate::array::{ScalarType, StorageClass};
use crate::path::DataPath;
use crate::store::{NodeId, ObjectStore};

/// Errors from parameter serialization and validation.
///
/// Every variant maps to a stable negative code via [`code`].
///
/// [`code`]: ParameterError::code
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParameterError {
    #[error("'{key}': expected a {expected} value, found {found}")]
    WrongValueType {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("'{key}': cannot read {expected} from JSON")]
    BadJson { key: String, expected: &'static str },

    #[error("'{key}': {message}")]
    OutOfRange { key: String, message: String },

    #[error("'{key}': expected {expected} entries, found {found}")]
    WrongLength {
        key: String,
        expected: usize,
        found: usize,
    },

    #[error("'{key}': {message}")]
    TableShape { key: String, message: String },

    #[error("'{key}': choice index {index} out of range for {count} choices")]
    ChoiceOutOfRange {
        key: String,
        index: i64,
        count: usize,
    },

    #[error("'{key}': {message}")]
    IndexOrdering { key: String, message: String },

    #[error("'{key}': file {path} does not exist")]
    FileMissing { key: String, path: String },

    #[error("'{key}': {path}: {message}")]
    FileRole {
        key: String,
        path: String,
        message: String,
    },

    #[error("'{key}': {path} does not exist")]
    DoesNotExist { key: String, path: String },

    #[error("'{key}': {path} is not a {expected}")]
    WrongObjectType {
        key: String,
        path: String,
        expected: &'static str,
    },

    #[error("'{key}': {path} has element type {found}, which is not allowed here")]
    ScalarTypeNotAllowed {
        key: String,
        path: String,
        found: &'static str,
    },

    #[error("'{key}': {path} has component shape {found:?}, expected {expected:?}")]
    ComponentShapeMismatch {
        key: String,
        path: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("'{key}': {path} has the wrong storage class")]
    StorageClassMismatch { key: String, path: String },

    #[error("'{key}': {path} already exists")]
    TargetExists { key: String, path: String },

    #[error("'{key}': {path} carries no geometry")]
    MissingGeometry { key: String, path: String },

    #[error("'{key}': selection is empty")]
    EmptySelection { key: String },
}

impl ParameterError {
    /// Stable negative code for front ends and logs.
    pub fn code(&self) -> i32 {
        match self {
            ParameterError::WrongValueType { .. } => -100,
            ParameterError::BadJson { .. } => -101,
            ParameterError::OutOfRange { .. } => -102,
            ParameterError::WrongLength { .. } => -103,
            ParameterError::TableShape { .. } => -104,
            ParameterError::ChoiceOutOfRange { .. } => -105,
            ParameterError::IndexOrdering { .. } => -120,
            ParameterError::FileMissing { .. } => -121,
            ParameterError::FileRole { .. } => -122,
            ParameterError::DoesNotExist { .. } => -110,
            ParameterError::WrongObjectType { .. } => -111,
            ParameterError::ScalarTypeNotAllowed { .. } => -112,
            ParameterError::ComponentShapeMismatch { .. } => -113,
            ParameterError::StorageClassMismatch { .. } => -114,
            ParameterError::TargetExists { .. } => -115,
            ParameterError::MissingGeometry { .. } => -116,
            ParameterError::EmptySelection { .. } => -117,
        }
    }
}

/// Category of value a parameter accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Bool,
    Int,
    Float,
    String,
    Choice,
    IntVec,
    FloatVec,
    FsPath,
    Table,
    FileList,
    DataPath,
    DataPathList,
}

/// Declared role of a filesystem-path parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRole {
    InputFile,
    InputDir,
    OutputFile,
    OutputDir,
}

/// Key, display name, and help text shared by every parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub key: String,
    pub name: String,
    pub help: String,
}

impl ParamInfo {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            help: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoolParam {
    pub info: ParamInfo,
    pub default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntParam {
    pub info: ParamInfo,
    pub default: i64,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatParam {
    pub info: ParamInfo,
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringParam {
    pub info: ParamInfo,
    pub default: String,
}

/// Value is the index into `choices`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceParam {
    pub info: ParamInfo,
    pub choices: Vec<String>,
    pub default: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntVecParam {
    pub info: ParamInfo,
    pub len: usize,
    pub default: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FloatVecParam {
    pub info: ParamInfo,
    pub len: usize,
    pub default: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FsPathParam {
    pub info: ParamInfo,
    pub role: PathRole,
    /// Accepted extensions, lowercase, no dot. Empty means any.
    pub extensions: Vec<String>,
}

/// A 2-D numeric table with a fixed column count.
#[derive(Debug, Clone, PartialEq)]
pub struct TableParam {
    pub info: ParamInfo,
    pub cols: usize,
    pub min_rows: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileListParam {
    pub info: ParamInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArraySelectionParam {
    pub info: ParamInfo,
    /// Allowed element kinds. Empty means any.
    pub allowed_scalars: Vec<ScalarType>,
    /// Required component shape, if any.
    pub component_dims: Option<Vec<usize>>,
    /// Required storage class, if any.
    pub storage: Option<StorageClass>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSelectionParam {
    pub info: ParamInfo,
}

/// Selects a group that carries geometry metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometrySelectionParam {
    pub info: ParamInfo,
}

/// Names a path at which a filter will create a new array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayCreationParam {
    pub info: ParamInfo,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MultiArraySelectionParam {
    pub info: ParamInfo,
    pub allowed_scalars: Vec<ScalarType>,
}

/// The closed set of parameter declarations.
#[derive(Debug, Clone, PartialEq)]
pub enum Parameter {
    Bool(BoolParam),
    Int(IntParam),
    Float(FloatParam),
    String(StringParam),
    Choice(ChoiceParam),
    IntVec(IntVecParam),
    FloatVec(FloatVecParam),
    FsPath(FsPathParam),
    Table(TableParam),
    FileList(FileListParam),
    ArraySelection(ArraySelectionParam),
    GroupSelection(GroupSelectionParam),
    GeometrySelection(GeometrySelectionParam),
    ArrayCreation(ArrayCreationParam),
    MultiArraySelection(MultiArraySelectionParam),
}

impl Parameter {
    /// Simple constructors for the common cases.
    pub fn bool(key: &str, name: &str, default: bool) -> Self {
        Parameter::Bool(BoolParam {
            info: ParamInfo::new(key, name),
            default,
        })
    }

    pub fn int(key: &str, name: &str, default: i64) -> Self {
        Parameter::Int(IntParam {
            info: ParamInfo::new(key, name),
            default,
            min: None,
            max: None,
        })
    }

    pub fn float(key: &str, name: &str, default: f64) -> Self {
        Parameter::Float(FloatParam {
            info: ParamInfo::new(key, name),
            default,
            min: None,
            max: None,
        })
    }

    pub fn string(key: &str, name: &str, default: &str) -> Self {
        Parameter::String(StringParam {
            info: ParamInfo::new(key, name),
            default: default.to_string(),
        })
    }

    pub fn choice(key: &str, name: &str, choices: &[&str], default: usize) -> Self {
        Parameter::Choice(ChoiceParam {
            info: ParamInfo::new(key, name),
            choices: choices.iter().map(|s| s.to_string()).collect(),
            default,
        })
    }

    pub fn array_selection(key: &str, name: &str) -> Self {
        Parameter::ArraySelection(ArraySelectionParam {
            info: ParamInfo::new(key, name),
            allowed_scalars: vec![],
            component_dims: None,
            storage: None,
        })
    }

    pub fn group_selection(key: &str, name: &str) -> Self {
        Parameter::GroupSelection(GroupSelectionParam {
            info: ParamInfo::new(key, name),
        })
    }

    pub fn array_creation(key: &str, name: &str) -> Self {
        Parameter::ArrayCreation(ArrayCreationParam {
            info: ParamInfo::new(key, name),
        })
    }

    fn info(&self) -> &ParamInfo {
        match self {
            Parameter::Bool(p) => &p.info,
            Parameter::Int(p) => &p.info,
            Parameter::Float(p) => &p.info,
            Parameter::String(p) => &p.info,
            Parameter::Choice(p) => &p.info,
            Parameter::IntVec(p) => &p.info,
            Parameter::FloatVec(p) => &p.info,
            Parameter::FsPath(p) => &p.info,
            Parameter::Table(p) => &p.info,
            Parameter::FileList(p) => &p.info,
            Parameter::ArraySelection(p) => &p.info,
            Parameter::GroupSelection(p) => &p.info,
            Parameter::GeometrySelection(p) => &p.info,
            Parameter::ArrayCreation(p) => &p.info,
            Parameter::MultiArraySelection(p) => &p.info,
        }
    }

    pub fn key(&self) -> &str {
        &self.info().key
    }

    pub fn human_name(&self) -> &str {
        &self.info().name
    }

    pub fn help(&self) -> &str {
        &self.info().help
    }

    /// The accepted value category.
    pub fn kind(&self) -> ParamKind {
        match self {
            Parameter::Bool(_) => ParamKind::Bool,
            Parameter::Int(_) => ParamKind::Int,
            Parameter::Float(_) => ParamKind::Float,
            Parameter::String(_) => ParamKind::String,
            Parameter::Choice(_) => ParamKind::Choice,
            Parameter::IntVec(_) => ParamKind::IntVec,
            Parameter::FloatVec(_) => ParamKind::FloatVec,
            Parameter::FsPath(_) => ParamKind::FsPath,
            Parameter::Table(_) => ParamKind::Table,
            Parameter::FileList(_) => ParamKind::FileList,
            Parameter::ArraySelection(_)
            | Parameter::GroupSelection(_)
            | Parameter::GeometrySelection(_)
            | Parameter::ArrayCreation(_) => ParamKind::DataPath,
            Parameter::MultiArraySelection(_) => ParamKind::DataPathList,
        }
    }

    /// True for the family whose value references store content.
    pub fn is_data_reference(&self) -> bool {
        matches!(
            self,
            Parameter::ArraySelection(_)
                | Parameter::GroupSelection(_)
                | Parameter::GeometrySelection(_)
                | Parameter::ArrayCreation(_)
                | Parameter::MultiArraySelection(_)
        )
    }

    /// The value used when the caller supplies none.
    pub fn default_value(&self) -> ArgValue {
        match self {
            Parameter::Bool(p) => ArgValue::Bool(p.default),
            Parameter::Int(p) => ArgValue::Int(p.default),
            Parameter::Float(p) => ArgValue::Float(p.default),
            Parameter::String(p) => ArgValue::String(p.default.clone()),
            Parameter::Choice(p) => ArgValue::Int(p.default as i64),
            Parameter::IntVec(p) => ArgValue::IntVec(p.default.clone()),
            Parameter::FloatVec(p) => ArgValue::FloatVec(p.default.clone()),
            Parameter::FsPath(_) => ArgValue::FsPath(Default::default()),
            Parameter::Table(p) => ArgValue::Table(vec![vec![0.0; p.cols]; p.min_rows]),
            Parameter::FileList(_) => ArgValue::FileList(FileListInfo {
                dir: Default::default(),
                prefix: String::new(),
                suffix: String::new(),
                extension: String::new(),
                padding: 0,
                start: 0,
                end: 0,
                increment: 1,
            }),
            Parameter::ArraySelection(_)
            | Parameter::GroupSelection(_)
            | Parameter::GeometrySelection(_)
            | Parameter::ArrayCreation(_) => {
                ArgValue::Path(DataPath::new(["Unassigned"]).expect("static"))
            }
            Parameter::MultiArraySelection(_) => ArgValue::PathList(vec![]),
        }
    }

    /// Serialize a value of this parameter's kind to JSON.
    ///
    /// Paired with [`from_json`](Self::from_json): the round trip is exact.
    pub fn to_json(&self, value: &ArgValue) -> Result<Json, ParameterError> {
        let key = self.key();
        match (self.kind(), value) {
            (ParamKind::Bool, ArgValue::Bool(v)) => Ok(Json::Bool(*v)),
            (ParamKind::Int | ParamKind::Choice, ArgValue::Int(v)) => Ok(Json::from(*v)),
            (ParamKind::Float, ArgValue::Float(v)) => Ok(Json::from(*v)),
            (ParamKind::String, ArgValue::String(v)) => Ok(Json::from(v.clone())),
            (ParamKind::IntVec, ArgValue::IntVec(v)) => Ok(Json::from(v.clone())),
            (ParamKind::FloatVec, ArgValue::FloatVec(v)) => Ok(Json::from(v.clone())),
            (ParamKind::Table, ArgValue::Table(v)) => Ok(Json::from(v.clone())),
            (ParamKind::FsPath, ArgValue::FsPath(v)) => {
                Ok(Json::from(v.to_string_lossy().into_owned()))
            }
            (ParamKind::FileList, ArgValue::FileList(v)) => {
                serde_json::to_value(v).map_err(|_| ParameterError::BadJson {
                    key: key.to_string(),
                    expected: "file list",
                })
            }
            (ParamKind::DataPath, ArgValue::Path(v)) => Ok(Json::from(v.to_string())),
            (ParamKind::DataPathList, ArgValue::PathList(v)) => Ok(Json::from(
                v.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            )),
            (_, other) => Err(self.wrong_type(other)),
        }
    }

    /// Parse a value of this parameter's kind from JSON.
    pub fn from_json(&self, json: &Json) -> Result<ArgValue, ParameterError> {
        let key = self.key().to_string();
        let bad = |expected: &'static str| ParameterError::BadJson {
            key: key.clone(),
            expected,
        };
        match self.kind() {
            ParamKind::Bool => json.as_bool().map(ArgValue::Bool).ok_or(bad("bool")),
            ParamKind::Int | ParamKind::Choice => {
                json.as_i64().map(ArgValue::Int).ok_or(bad("integer"))
            }
            ParamKind::Float => json.as_f64().map(ArgValue::Float).ok_or(bad("number")),
            ParamKind::String => json
                .as_str()
                .map(|s| ArgValue::String(s.to_string()))
                .ok_or(bad("string")),
            ParamKind::IntVec => json
                .as_array()
                .and_then(|a| a.iter().map(Json::as_i64).collect::<Option<Vec<_>>>())
                .map(ArgValue::IntVec)
                .ok_or(bad("integer array")),
            ParamKind::FloatVec => json
                .as_array()
                .and_then(|a| a.iter().map(Json::as_f64).collect::<Option<Vec<_>>>())
                .map(ArgValue::FloatVec)
                .ok_or(bad("number array")),
            ParamKind::Table => json
                .as_array()
                .and_then(|rows| {
                    rows.iter()
                        .map(|row| {
                            row.as_array()?
                                .iter()
                                .map(Json::as_f64)
                                .collect::<Option<Vec<_>>>()
                        })
                        .collect::<Option<Vec<_>>>()
                })
                .map(ArgValue::Table)
                .ok_or(bad("number table")),
            ParamKind::FsPath => json
                .as_str()
                .map(|s| ArgValue::FsPath(s.into()))
                .ok_or(bad("path string")),
            ParamKind::FileList => serde_json::from_value::<FileListInfo>(json.clone())
                .map(ArgValue::FileList)
                .map_err(|_| bad("file list")),
            ParamKind::DataPath => json
                .as_str()
                .ok_or(bad("path string"))
                .and_then(|s| DataPath::parse(s).map_err(|_| bad("path string")))
                .map(ArgValue::Path),
            ParamKind::DataPathList => json
                .as_array()
                .ok_or(bad("path array"))
                .and_then(|a| {
                    a.iter()
                        .map(|item| {
                            item.as_str()
                                .ok_or(bad("path array"))
                                .and_then(|s| DataPath::parse(s).map_err(|_| bad("path array")))
                        })
                        .collect::<Result<Vec<_>, _>>()
                })
                .map(ArgValue::PathList),
        }
    }

    fn wrong_type(&self, found: &ArgValue) -> ParameterError {
        ParameterError::WrongValueType {
            key: self.key().to_string(),
            expected: match self.kind() {
                ParamKind::Bool => "bool",
                ParamKind::Int => "int",
                ParamKind::Float => "float",
                ParamKind::String => "string",
                ParamKind::Choice => "choice index",
                ParamKind::IntVec => "int vector",
                ParamKind::FloatVec => "float vector",
                ParamKind::FsPath => "filesystem path",
                ParamKind::Table => "table",
                ParamKind::FileList => "file list",
                ParamKind::DataPath => "data path",
                ParamKind::DataPathList => "data path list",
            },
            found: found.type_name(),
        }
    }

    /// Validate a value without store access.
    ///
    /// Returns accumulated warnings on success. Data-referencing
    /// parameters only type-check here; see
    /// [`validate_store`](Self::validate_store).
    pub fn validate(&self, value: &ArgValue) -> Result<Vec<String>, ParameterError> {
        let key = self.key().to_string();
        let mut warnings = vec![];
        match (self, value) {
            (Parameter::Bool(_), ArgValue::Bool(_)) => {}
            (Parameter::String(_), ArgValue::String(_)) => {}
            (Parameter::Int(p), ArgValue::Int(v)) => {
                if p.min.is_some_and(|min| *v < min) || p.max.is_some_and(|max| *v > max) {
                    return Err(ParameterError::OutOfRange {
                        key,
                        message: format!(
                            "{} is outside [{}, {}]",
                            v,
                            p.min.map_or("-inf".into(), |m| m.to_string()),
                            p.max.map_or("inf".into(), |m| m.to_string()),
                        ),
                    });
                }
            }
            (Parameter::Float(p), ArgValue::Float(v)) => {
                if p.min.is_some_and(|min| *v < min) || p.max.is_some_and(|max| *v > max) {
                    return Err(ParameterError::OutOfRange {
                        key,
                        message: format!("{} is out of range", v),
                    });
                }
            }
            (Parameter::Choice(p), ArgValue::Int(v)) => {
                if *v < 0 || *v as usize >= p.choices.len() {
                    return Err(ParameterError::ChoiceOutOfRange {
                        key,
                        index: *v,
                        count: p.choices.len(),
                    });
                }
            }
            (Parameter::IntVec(p), ArgValue::IntVec(v)) => {
                if v.len() != p.len {
                    return Err(ParameterError::WrongLength {
                        key,
                        expected: p.len,
                        found: v.len(),
                    });
                }
            }
            (Parameter::FloatVec(p), ArgValue::FloatVec(v)) => {
                if v.len() != p.len {
                    return Err(ParameterError::WrongLength {
                        key,
                        expected: p.len,
                        found: v.len(),
                    });
                }
            }
            (Parameter::Table(p), ArgValue::Table(rows)) => {
                if rows.len() < p.min_rows {
                    return Err(ParameterError::TableShape {
                        key,
                        message: format!("needs at least {} rows, found {}", p.min_rows, rows.len()),
                    });
                }
                if let Some(row) = rows.iter().find(|row| row.len() != p.cols) {
                    return Err(ParameterError::TableShape {
                        key,
                        message: format!("every row needs {} columns, found {}", p.cols, row.len()),
                    });
                }
            }
            (Parameter::FsPath(p), ArgValue::FsPath(path)) => {
                self.validate_fs_path(p, path, &mut warnings)?;
            }
            (Parameter::FileList(_), ArgValue::FileList(info)) => {
                // Index-range checks come before any filesystem probing.
                if info.start > info.end {
                    return Err(ParameterError::IndexOrdering {
                        key,
                        message: format!("start index {} exceeds end index {}", info.start, info.end),
                    });
                }
                if info.increment <= 0 {
                    return Err(ParameterError::IndexOrdering {
                        key,
                        message: format!("increment must be positive, got {}", info.increment),
                    });
                }
                if !info.dir.is_dir() {
                    warnings.push(format!(
                        "'{}': directory {} does not exist",
                        self.key(),
                        info.dir.display()
                    ));
                }
            }
            (
                Parameter::ArraySelection(_)
                | Parameter::GroupSelection(_)
                | Parameter::GeometrySelection(_)
                | Parameter::ArrayCreation(_),
                ArgValue::Path(_),
            ) => {}
            (Parameter::MultiArraySelection(_), ArgValue::PathList(paths)) => {
                if paths.is_empty() {
                    return Err(ParameterError::EmptySelection { key });
                }
            }
            (_, other) => return Err(self.wrong_type(other)),
        }
        Ok(warnings)
    }

    fn validate_fs_path(
        &self,
        p: &FsPathParam,
        path: &Path,
        warnings: &mut Vec<String>,
    ) -> Result<(), ParameterError> {
        let key = self.key().to_string();
        let display = path.display().to_string();

        if matches!(p.role, PathRole::InputFile | PathRole::OutputFile)
            && !p.extensions.is_empty()
        {
            let ext = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase())
                .unwrap_or_default();
            if !p.extensions.contains(&ext) {
                return Err(ParameterError::FileRole {
                    key,
                    path: display,
                    message: format!("extension must be one of {:?}", p.extensions),
                });
            }
        }

        match p.role {
            PathRole::InputFile => {
                if !path.exists() {
                    return Err(ParameterError::FileMissing { key, path: display });
                }
                if !path.is_file() {
                    return Err(ParameterError::FileRole {
                        key,
                        path: display,
                        message: "expected a file, found a directory".to_string(),
                    });
                }
            }
            PathRole::InputDir => {
                if !path.exists() {
                    return Err(ParameterError::FileMissing { key, path: display });
                }
                if !path.is_dir() {
                    return Err(ParameterError::FileRole {
                        key,
                        path: display,
                        message: "expected a directory, found a file".to_string(),
                    });
                }
            }
            // Output targets may not exist yet: a warning, never an error.
            PathRole::OutputFile => {
                if path.is_dir() {
                    return Err(ParameterError::FileRole {
                        key,
                        path: display,
                        message: "expected a file, found a directory".to_string(),
                    });
                }
                if !path.exists() {
                    warnings.push(format!("'{}': {} will be created", self.key(), display));
                }
            }
            PathRole::OutputDir => {
                if path.is_file() {
                    return Err(ParameterError::FileRole {
                        key,
                        path: display,
                        message: "expected a directory, found a file".to_string(),
                    });
                }
                if !path.exists() {
                    warnings.push(format!("'{}': {} will be created", self.key(), display));
                }
            }
        }
        Ok(())
    }

    /// Validate a data-referencing value against live store content.
    ///
    /// Plain-value parameters accept any value here unchanged.
    pub fn validate_store(
        &self,
        store: &ObjectStore,
        value: &ArgValue,
    ) -> Result<(), ParameterError> {
        let key = self.key().to_string();
        match (self, value) {
            (Parameter::ArraySelection(p), ArgValue::Path(path)) => {
                check_array(store, &key, path, &p.allowed_scalars, p.component_dims.as_deref(), p.storage)
            }
            (Parameter::MultiArraySelection(p), ArgValue::PathList(paths)) => {
                if paths.is_empty() {
                    return Err(ParameterError::EmptySelection { key });
                }
                for path in paths {
                    check_array(store, &key, path, &p.allowed_scalars, None, None)?;
                }
                Ok(())
            }
            (Parameter::GroupSelection(_), ArgValue::Path(path)) => {
                check_group(store, &key, path).map(|_| ())
            }
            (Parameter::GeometrySelection(_), ArgValue::Path(path)) => {
                let group = check_group(store, &key, path)?;
                if group.geometry.is_none() {
                    return Err(ParameterError::MissingGeometry {
                        key,
                        path: path.to_string(),
                    });
                }
                Ok(())
            }
            (Parameter::ArrayCreation(_), ArgValue::Path(path)) => {
                if store.contains(path) {
                    return Err(ParameterError::TargetExists {
                        key,
                        path: path.to_string(),
                    });
                }
                match path.parent() {
                    Some(parent) => check_group(store, &key, &parent).map(|_| ()),
                    None => Ok(()),
                }
            }
            _ => Ok(()),
        }
    }

    /// Resolve a data-referencing value to the node it addresses.
    pub fn resolve(
        &self,
        store: &ObjectStore,
        value: &ArgValue,
    ) -> Result<NodeId, ParameterError> {
        self.validate_store(store, value)?;
        let path = match value {
            ArgValue::Path(path) => path,
            ArgValue::PathList(paths) => {
                paths.first().ok_or(ParameterError::EmptySelection {
                    key: self.key().to_string(),
                })?
            }
            other => return Err(self.wrong_type(other)),
        };
        store
            .resolve(path)
            .map_err(|_| ParameterError::DoesNotExist {
                key: self.key().to_string(),
                path: path.to_string(),
            })
    }
}

fn check_group<'a>(
    store: &'a ObjectStore,
    key: &str,
    path: &DataPath,
) -> Result<&'a crate::store::Group, ParameterError> {
    let node = store.get(path).ok_or_else(|| ParameterError::DoesNotExist {
        key: key.to_string(),
        path: path.to_string(),
    })?;
    node.as_group().ok_or_else(|| ParameterError::WrongObjectType {
        key: key.to_string(),
        path: path.to_string(),
        expected: "group",
    })
}

fn check_array(
    store: &ObjectStore,
    key: &str,
    path: &DataPath,
    allowed: &[ScalarType],
    component_dims: Option<&[usize]>,
    storage: Option<StorageClass>,
) -> Result<(), ParameterError> {
    let node = store.get(path).ok_or_else(|| ParameterError::DoesNotExist {
        key: key.to_string(),
        path: path.to_string(),
    })?;
    let array = node.as_array().ok_or_else(|| ParameterError::WrongObjectType {
        key: key.to_string(),
        path: path.to_string(),
        expected: "array",
    })?;

    if !allowed.is_empty() && !allowed.contains(&array.scalar) {
        return Err(ParameterError::ScalarTypeNotAllowed {
            key: key.to_string(),
            path: path.to_string(),
            found: array.scalar.name(),
        });
    }
    if let Some(expected) = component_dims {
        if array.component_dims != expected {
            return Err(ParameterError::ComponentShapeMismatch {
                key: key.to_string(),
                path: path.to_string(),
                expected: expected.to_vec(),
                found: array.component_dims.clone(),
            });
        }
    }
    if storage.is_some_and(|s| s != array.storage) {
        return Err(ParameterError::StorageClassMismatch {
            key: key.to_string(),
            path: path.to_string(),
        });
    }
    Ok(())
}

/// What a controller parameter's value must be to activate dependents.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTrigger {
    BoolIs(bool),
    ChoiceIs(i64),
}

#[derive(Debug, Clone, PartialEq)]
struct Link {
    controller: String,
    trigger: LinkTrigger,
    dependents: Vec<String>,
}

/// Declarative visibility gating: a controller value activates dependents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkMap {
    links: Vec<Link>,
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate `dependents` behind `controller` holding the trigger value.
    pub fn link(
        mut self,
        controller: impl Into<String>,
        trigger: LinkTrigger,
        dependents: &[&str],
    ) -> Self {
        self.links.push(Link {
            controller: controller.into(),
            trigger,
            dependents: dependents.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    /// Whether `key` is active under the supplied arguments.
    ///
    /// Keys no link names as a dependent are always active.
    pub fn is_active(&self, key: &str, args: &Arguments) -> bool {
        let mut gated = false;
        for link in &self.links {
            if !link.dependents.iter().any(|d| d == key) {
                continue;
            }
            gated = true;
            let satisfied = match (&link.trigger, args.get(&link.controller)) {
                (LinkTrigger::BoolIs(expected), Some(ArgValue::Bool(v))) => v == expected,
                (LinkTrigger::ChoiceIs(expected), Some(ArgValue::Int(v))) => v == expected,
                _ => false,
            };
            if satisfied {
                return true;
            }
        }
        !gated
    }
}

/// Validate every active parameter of a declaration set.
///
/// Each parameter's value is looked up by key (falling back to its
/// default) and type- and range-checked; when a store is given the
/// data-referencing values are also cross-checked against live content.
/// Errors and warnings accumulate; inactive (link-gated) parameters are
/// skipped.
pub fn validate_all(
    params: &[Parameter],
    links: &LinkMap,
    args: &Arguments,
    store: Option<&ObjectStore>,
) -> (Vec<ParameterError>, Vec<String>) {
    let mut errors = vec![];
    let mut warnings = vec![];

    for param in params {
        if !links.is_active(param.key(), args) {
            continue;
        }
        let default;
        let value = match args.get(param.key()) {
            Some(value) => value,
            None => {
                default = param.default_value();
                &default
            }
        };
        match param.validate(value) {
            Ok(mut warns) => warnings.append(&mut warns),
            Err(e) => {
                errors.push(e);
                continue;
            }
        }
        if let Some(store) = store {
            if let Err(e) = param.validate_store(store, value) {
                errors.push(e);
            }
        }
    }

    (errors, warnings)
}
