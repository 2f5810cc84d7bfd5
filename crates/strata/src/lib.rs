//! Strata: hierarchical data store + two-phase filter pipeline engine.
//!
//! Filters transform data held in a shared hierarchical store. Each
//! filter runs in two phases: preflight predicts structural changes
//! without mutating anything, execute commits them and runs the
//! numeric body. Pipelines sequence bound filters with fail-fast
//! error handling.

mod actions;
mod args;
mod array;
mod filter;
mod geometry;
mod parallel;
mod params;
mod path;
mod pipeline;
mod registry;
mod store;

pub use actions::{Action, ActionError, ApplyMode, OutputActions};
pub use args::{ArgValue, ArgumentError, Arguments, FileListInfo};
pub use array::{ArrayData, ArrayValues, ScalarType, StorageClass};
pub use filter::{
    AlgorithmError, BoundFilter, CancelToken, ExecuteResult, Filter, FilterDecl, FilterError,
    FilterState, PreflightResult,
};
pub use geometry::ImageGeometry;
pub use parallel::{Cancelled, DataParallel, chunk_ranges};
pub use params::{
    ArrayCreationParam, ArraySelectionParam, BoolParam, ChoiceParam, FileListParam, FloatParam,
    FloatVecParam, FsPathParam, GeometrySelectionParam, GroupSelectionParam, IntParam,
    IntVecParam, LinkMap, LinkTrigger, MultiArraySelectionParam, ParamInfo, ParamKind, Parameter,
    ParameterError, PathRole, StringParam, TableParam, validate_all,
};
pub use path::DataPath;
pub use pipeline::{FaultState, NodeOutcome, Pipeline, PipelineError, PipelineNode, PipelineResult};
pub use registry::FilterRegistry;
pub use store::{Group, Node, NodeId, NodeKind, ObjectStore, PathError};
