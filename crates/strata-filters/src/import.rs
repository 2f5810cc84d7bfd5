//! Import of arrays from an external hierarchical container.
//!
//! The container format itself is an external collaborator: all this
//! filter needs is the success/failure-with-message contract below.

use std::path::Path;
use std::sync::Arc;

use strata::{
    Action, AlgorithmError, Arguments, ArrayData, ArrayValues, CancelToken, Filter, FilterDecl,
    FilterError, FsPathParam, ObjectStore, ParamInfo, Parameter, PathRole, PreflightResult,
    ScalarType,
};

/// Reader contract for an external structured container.
pub trait ObjectReader: Send + Sync {
    /// Shape of a named dataset: element kind, tuple dims, component dims.
    ///
    /// Called during preflight; must not read bulk data.
    fn read_shape(
        &self,
        file: &Path,
        dataset: &str,
    ) -> Result<(ScalarType, Vec<usize>, Vec<usize>), String>;

    /// The dataset's full contents.
    fn read(&self, file: &Path, dataset: &str) -> Result<ArrayValues, String>;
}

/// Imports one dataset from an external container into the store.
pub struct ImportObject {
    decl: FilterDecl,
    reader: Arc<dyn ObjectReader>,
}

impl ImportObject {
    pub fn new(reader: Arc<dyn ObjectReader>) -> Self {
        Self {
            decl: FilterDecl::new(
                "ImportObject",
                "8a261d04-6b22-42c5-a37a-4ea7e48b1a11",
                "Import Object",
            )
            .description("Imports a dataset from an external container file")
            .parameter(Parameter::FsPath(FsPathParam {
                info: ParamInfo::new("file", "Container File"),
                role: PathRole::InputFile,
                extensions: vec![],
            }))
            .parameter(Parameter::string("dataset", "Dataset Name", ""))
            .parameter(Parameter::array_creation("output", "Imported Array")),
            reader,
        }
    }
}

impl Filter for ImportObject {
    fn decl(&self) -> &FilterDecl {
        &self.decl
    }

    fn preflight(
        &self,
        store: &ObjectStore,
        args: &Arguments,
        _cancel: &CancelToken,
    ) -> PreflightResult {
        let mut result = PreflightResult::default();
        result.actions = self.decl.validated_actions(store, args);
        if !result.actions.is_valid() {
            return result;
        }

        let file = match args.fs_path_at("file") {
            Ok(file) => file.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };
        let dataset = match args.string_at("dataset") {
            Ok(name) if !name.is_empty() => name.to_string(),
            Ok(_) => {
                result.actions.error("dataset name is empty");
                return result;
            }
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };
        let output = match args.path_at("output") {
            Ok(path) => path.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        // Only the shape is read here; bulk data waits for execute.
        match self.reader.read_shape(&file, &dataset) {
            Ok((scalar, tuple_dims, component_dims)) => {
                let array = ArrayData::placeholder(scalar, tuple_dims, component_dims);
                result.derive("tuple_count", array.tuple_count() as i64);
                result.actions.push(Action::ImportObject {
                    path: output,
                    array,
                });
            }
            Err(message) => result.actions.error(message),
        }
        result
    }

    fn body(
        &self,
        store: &mut ObjectStore,
        args: &Arguments,
        _cancel: &CancelToken,
    ) -> Result<Vec<String>, FilterError> {
        let file = args.fs_path_at("file")?.clone();
        let dataset = args.string_at("dataset")?.to_string();
        let output = args.path_at("output")?.clone();

        let values = self
            .reader
            .read(&file, &dataset)
            .map_err(AlgorithmError::new)?;
        store.array_at_mut(&output)?.set_values(values)?;
        Ok(vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use strata::{BoundFilter, DataPath};

    fn path(s: &str) -> DataPath {
        DataPath::parse(s).unwrap()
    }

    /// In-memory stand-in for a container file reader.
    struct MockReader {
        datasets: HashMap<String, ArrayValues>,
    }

    impl MockReader {
        fn new() -> Self {
            let mut datasets = HashMap::new();
            datasets.insert(
                "EulerAngles".to_string(),
                ArrayValues::F32(vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]),
            );
            Self { datasets }
        }
    }

    impl ObjectReader for MockReader {
        fn read_shape(
            &self,
            _file: &Path,
            dataset: &str,
        ) -> Result<(ScalarType, Vec<usize>, Vec<usize>), String> {
            let values = self
                .datasets
                .get(dataset)
                .ok_or_else(|| format!("no dataset named '{}'", dataset))?;
            Ok((values.scalar_type(), vec![values.len() / 3], vec![3]))
        }

        fn read(&self, _file: &Path, dataset: &str) -> Result<ArrayValues, String> {
            self.datasets
                .get(dataset)
                .cloned()
                .ok_or_else(|| format!("no dataset named '{}'", dataset))
        }
    }

    fn import_args(dir: &Path, dataset: &str) -> (Arguments, std::path::PathBuf) {
        let file = dir.join("recon.bin");
        std::fs::write(&file, b"container").unwrap();
        let args = Arguments::new()
            .with("file", file.clone())
            .with("dataset", dataset)
            .with("output", path("Imported/Eulers"));
        (args, file)
    }

    #[test]
    fn test_import_plan_then_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let (args, _file) = import_args(dir.path(), "EulerAngles");

        let mut store = ObjectStore::new();
        store.make_path(&path("Imported")).unwrap();

        let filter = ImportObject::new(Arc::new(MockReader::new()));
        let mut bound = BoundFilter::new(Arc::new(filter), args);

        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(preflight.is_valid(), "{:?}", preflight.actions.errors());
        // Preflight predicted shape without reading bulk data
        match &preflight.actions.actions()[0] {
            Action::ImportObject { array, .. } => {
                assert!(array.is_placeholder());
                assert_eq!(array.tuple_dims, vec![2]);
                assert_eq!(array.component_dims, vec![3]);
            }
            other => panic!("unexpected action {:?}", other),
        }

        let result = bound.run_execute(&mut store, &CancelToken::new());
        assert!(result.is_ok(), "{:?}", result.errors);
        let array = store.array_at(&path("Imported/Eulers")).unwrap();
        assert_eq!(
            array.values.as_ref().unwrap().as_f32().unwrap(),
            &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6]
        );
    }

    #[test]
    fn test_missing_dataset_fails_preflight_with_reader_message() {
        let dir = tempfile::tempdir().unwrap();
        let (args, _file) = import_args(dir.path(), "Nope");

        let mut store = ObjectStore::new();
        store.make_path(&path("Imported")).unwrap();

        let filter = ImportObject::new(Arc::new(MockReader::new()));
        let mut bound = BoundFilter::new(Arc::new(filter), args);
        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(!preflight.is_valid());
        assert!(preflight.actions.errors()[0].contains("Nope"));
    }
}
