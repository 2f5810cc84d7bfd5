//! Pipelines: ordered filter invocations with fail-fast sequencing.
//!
//! A pipeline node is either a bound filter or a nested pipeline. Nodes
//! run strictly in declared order; the first node whose fault state is
//! `Errors` stops the run. Warnings never halt progression. Nothing is
//! rolled back on failure: the store keeps every change committed
//! before the faulting node, in an inspectable state.

use serde_json::{Map, Value as Json, json};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::actions::ApplyMode;
use crate::args::Arguments;
use crate::filter::{BoundFilter, CancelToken};
use crate::params::ParameterError;
use crate::registry::FilterRegistry;
use crate::store::ObjectStore;

/// Errors from pipeline document serialization.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failed to parse pipeline document: {0}")]
    Parse(String),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

/// Per-node outcome classification controlling pipeline progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum FaultState {
    #[default]
    None,
    Warnings,
    Errors,
}

/// What one pipeline node produced: its fault state plus every error
/// and warning it surfaced, in order.
#[derive(Debug, Clone)]
pub struct NodeOutcome {
    pub label: String,
    pub fault: FaultState,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl NodeOutcome {
    fn classify(label: String, errors: Vec<String>, warnings: Vec<String>) -> Self {
        let fault = if !errors.is_empty() {
            FaultState::Errors
        } else if !warnings.is_empty() {
            FaultState::Warnings
        } else {
            FaultState::None
        };
        Self {
            label,
            fault,
            errors,
            warnings,
        }
    }
}

/// Outcomes of every node actually run, in execution order.
#[derive(Debug, Clone, Default)]
pub struct PipelineResult {
    pub outcomes: Vec<NodeOutcome>,
}

impl PipelineResult {
    /// The worst fault state across all outcomes.
    pub fn fault(&self) -> FaultState {
        self.outcomes
            .iter()
            .map(|o| o.fault)
            .max()
            .unwrap_or_default()
    }

    pub fn is_ok(&self) -> bool {
        self.fault() != FaultState::Errors
    }

    /// Every error with its node label, in execution order.
    pub fn errors(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|o| o.errors.iter().map(|e| format!("{}: {}", o.label, e)))
            .collect()
    }

    /// Every warning with its node label, in execution order.
    pub fn warnings(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .flat_map(|o| o.warnings.iter().map(|w| format!("{}: {}", o.label, w)))
            .collect()
    }
}

/// One entry in a pipeline.
#[derive(Debug, Clone)]
pub enum PipelineNode {
    Filter(BoundFilter),
    Nested(Pipeline),
}

/// An ordered sequence of bound filters and nested pipelines.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    pub name: String,
    nodes: Vec<PipelineNode>,
}

impl Pipeline {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: vec![],
        }
    }

    /// Append a bound filter node.
    pub fn push_filter(&mut self, filter: Arc<dyn crate::filter::Filter>, args: Arguments) {
        self.nodes.push(PipelineNode::Filter(BoundFilter::new(filter, args)));
    }

    /// Append a nested pipeline node.
    pub fn push_pipeline(&mut self, pipeline: Pipeline) {
        self.nodes.push(PipelineNode::Nested(pipeline));
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Total bound-filter count, including nested pipelines.
    pub fn filter_count(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match node {
                PipelineNode::Filter(_) => 1,
                PipelineNode::Nested(p) => p.filter_count(),
            })
            .sum()
    }

    /// Run the pipeline against `store`.
    ///
    /// With `preflight_only` every node is validated against a working
    /// copy and the real store is never touched. Otherwise each node
    /// preflights against a disposable copy and then executes against
    /// the live store. Either way the first `Errors` node stops the run
    /// and nothing already committed is rolled back.
    pub fn run(
        &mut self,
        store: &mut ObjectStore,
        preflight_only: bool,
        cancel: &CancelToken,
    ) -> PipelineResult {
        let mut result = PipelineResult::default();
        if preflight_only {
            let mut scratch = store.clone();
            self.preflight_into(&mut scratch, cancel, &mut result.outcomes);
        } else {
            self.execute_into(store, cancel, &mut result.outcomes);
        }
        result
    }

    /// Returns true if the run must stop.
    fn execute_into(
        &mut self,
        store: &mut ObjectStore,
        cancel: &CancelToken,
        outcomes: &mut Vec<NodeOutcome>,
    ) -> bool {
        for node in &mut self.nodes {
            match node {
                PipelineNode::Filter(bound) => {
                    let label = bound.filter().decl().id.clone();
                    debug!(filter = %label, "running pipeline node");

                    if cancel.is_cancelled() {
                        outcomes.push(NodeOutcome::classify(
                            label,
                            vec!["cancelled".to_string()],
                            vec![],
                        ));
                        return true;
                    }

                    let scratch = store.clone();
                    let preflight = bound.run_preflight(&scratch, cancel);
                    if !preflight.is_valid() {
                        outcomes.push(NodeOutcome::classify(
                            label,
                            preflight.actions.errors().to_vec(),
                            preflight.actions.warnings().to_vec(),
                        ));
                        return true;
                    }

                    let executed = bound.run_execute(store, cancel);
                    let errors: Vec<String> =
                        executed.errors.iter().map(|e| e.to_string()).collect();
                    let outcome = NodeOutcome::classify(label, errors, executed.warnings);
                    let stop = outcome.fault == FaultState::Errors;
                    if stop {
                        warn!(filter = %outcome.label, "pipeline node failed");
                    }
                    outcomes.push(outcome);
                    if stop {
                        return true;
                    }
                }
                PipelineNode::Nested(pipeline) => {
                    if pipeline.execute_into(store, cancel, outcomes) {
                        return true;
                    }
                }
            }
        }
        false
    }

    fn preflight_into(
        &mut self,
        scratch: &mut ObjectStore,
        cancel: &CancelToken,
        outcomes: &mut Vec<NodeOutcome>,
    ) -> bool {
        for node in &mut self.nodes {
            match node {
                PipelineNode::Filter(bound) => {
                    let label = bound.filter().decl().id.clone();
                    let preflight = bound.run_preflight(scratch, cancel);
                    let outcome = NodeOutcome::classify(
                        label,
                        preflight.actions.errors().to_vec(),
                        preflight.actions.warnings().to_vec(),
                    );
                    let stop = outcome.fault == FaultState::Errors;
                    if !stop {
                        // Later nodes must see the predicted shape.
                        if let Err(e) = preflight.actions.apply(scratch, ApplyMode::Plan) {
                            outcomes.push(NodeOutcome::classify(
                                outcome.label,
                                vec![e.to_string()],
                                outcome.warnings,
                            ));
                            return true;
                        }
                    }
                    outcomes.push(outcome);
                    if stop {
                        return true;
                    }
                }
                PipelineNode::Nested(pipeline) => {
                    if pipeline.preflight_into(scratch, cancel, outcomes) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Serialize to the persisted pipeline document.
    ///
    /// Each filter entry carries its stable identity (class name and
    /// UUID) and a key → serialized-value object produced per parameter.
    pub fn to_json(&self) -> Result<Json, PipelineError> {
        let mut nodes = vec![];
        for node in &self.nodes {
            match node {
                PipelineNode::Filter(bound) => {
                    let decl = bound.filter().decl();
                    let mut args = Map::new();
                    for param in &decl.parameters {
                        let default;
                        let value = match bound.args().get(param.key()) {
                            Some(value) => value,
                            None => {
                                default = param.default_value();
                                &default
                            }
                        };
                        args.insert(param.key().to_string(), param.to_json(value)?);
                    }
                    nodes.push(json!({
                        "filter": {
                            "class": decl.id,
                            "uuid": decl.uuid,
                            "args": Json::Object(args),
                        }
                    }));
                }
                PipelineNode::Nested(pipeline) => {
                    // A nested document already has the node entry shape.
                    nodes.push(pipeline.to_json()?);
                }
            }
        }
        Ok(json!({
            "pipeline": {
                "name": self.name,
                "nodes": nodes,
            }
        }))
    }

    /// Rebuild a pipeline from its document, resolving filters through
    /// the registry.
    ///
    /// Unknown classes are errors; a UUID that disagrees with the
    /// registered filter, or an argument key no parameter declares, is
    /// a load warning.
    pub fn from_json(
        json: &Json,
        registry: &FilterRegistry,
    ) -> Result<(Pipeline, Vec<String>), PipelineError> {
        let doc = json
            .get("pipeline")
            .and_then(Json::as_object)
            .ok_or_else(|| PipelineError::Parse("missing 'pipeline' object".to_string()))?;
        let name = doc
            .get("name")
            .and_then(Json::as_str)
            .unwrap_or_default()
            .to_string();
        let nodes = doc
            .get("nodes")
            .and_then(Json::as_array)
            .ok_or_else(|| PipelineError::Parse("missing 'nodes' array".to_string()))?;

        let mut pipeline = Pipeline::new(name);
        let mut warnings = vec![];

        for entry in nodes {
            if entry.get("pipeline").is_some() {
                let (sub, mut sub_warnings) = Pipeline::from_json(entry, registry)?;
                warnings.append(&mut sub_warnings);
                pipeline.push_pipeline(sub);
                continue;
            }

            let filter_entry = entry
                .get("filter")
                .and_then(Json::as_object)
                .ok_or_else(|| {
                    PipelineError::Parse("node is neither 'filter' nor 'pipeline'".to_string())
                })?;
            let class = filter_entry
                .get("class")
                .and_then(Json::as_str)
                .ok_or_else(|| PipelineError::Parse("filter entry missing 'class'".to_string()))?;
            let uuid = filter_entry.get("uuid").and_then(Json::as_str);

            let filter = registry
                .get(class)
                .or_else(|| uuid.and_then(|u| registry.get_by_uuid(u)))
                .ok_or_else(|| PipelineError::UnknownFilter(class.to_string()))?;

            if let Some(uuid) = uuid {
                if uuid != filter.decl().uuid {
                    warnings.push(format!(
                        "filter '{}': document uuid {} does not match registered uuid {}",
                        class,
                        uuid,
                        filter.decl().uuid
                    ));
                }
            }

            let mut args = filter.decl().default_arguments();
            if let Some(entries) = filter_entry.get("args").and_then(Json::as_object) {
                for (key, value) in entries {
                    match filter.decl().parameter_by_key(key) {
                        Some(param) => args.set(key.clone(), param.from_json(value)?),
                        None => warnings.push(format!(
                            "filter '{}': no parameter named '{}'",
                            class, key
                        )),
                    }
                }
            }

            pipeline.push_filter(filter, args);
        }

        Ok((pipeline, warnings))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Action;
    use crate::filter::{Filter, FilterDecl, PreflightResult};
    use crate::params::Parameter;
    use crate::path::DataPath;

    fn path(s: &str) -> DataPath {
        DataPath::parse(s).unwrap()
    }

    /// Creates a group; fails preflight when asked to.
    struct GroupMaker {
        decl: FilterDecl,
    }

    impl GroupMaker {
        fn new() -> Self {
            Self {
                decl: FilterDecl::new(
                    "GroupMaker",
                    "11111111-1111-1111-1111-111111111111",
                    "Group Maker",
                )
                .parameter(Parameter::string("name", "Group Name", "Group"))
                .parameter(Parameter::bool("fail", "Force Failure", false))
                .parameter(Parameter::bool("warn", "Force Warning", false)),
            }
        }
    }

    impl Filter for GroupMaker {
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
            if args.bool_at("fail").unwrap_or(false) {
                result.actions.error("forced failure");
                return result;
            }
            if args.bool_at("warn").unwrap_or(false) {
                result.actions.warn("forced warning");
            }
            match args.string_at("name") {
                Ok(name) => result.actions.push(Action::CreateGroup {
                    path: DataPath::new([name]).expect("non-empty"),
                }),
                Err(e) => result.actions.error(e.to_string()),
            }
            result
        }
    }

    fn registry() -> FilterRegistry {
        let mut registry = FilterRegistry::new();
        registry.register(GroupMaker::new());
        registry
    }

    fn bound(name: &str, fail: bool, warn: bool) -> (Arc<dyn Filter>, Arguments) {
        let registry = registry();
        let filter = registry.get("GroupMaker").unwrap();
        let args = Arguments::new()
            .with("name", name)
            .with("fail", fail)
            .with("warn", warn);
        (filter, args)
    }

    #[test]
    fn test_fail_fast_law() {
        // 3-node pipeline, node 2 errors: node 3 never runs and the
        // aggregate carries exactly nodes 1 and 2.
        let mut pipeline = Pipeline::new("test");
        let (f, a) = bound("One", false, false);
        pipeline.push_filter(f, a);
        let (f, a) = bound("Two", true, false);
        pipeline.push_filter(f, a);
        let (f, a) = bound("Three", false, false);
        pipeline.push_filter(f, a);

        let mut store = ObjectStore::new();
        let result = pipeline.run(&mut store, false, &CancelToken::new());

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].fault, FaultState::None);
        assert_eq!(result.outcomes[1].fault, FaultState::Errors);
        assert_eq!(result.fault(), FaultState::Errors);

        // Node 1 committed, node 3 never ran
        assert!(store.contains(&path("One")));
        assert!(!store.contains(&path("Three")));
    }

    #[test]
    fn test_warnings_never_halt() {
        let mut pipeline = Pipeline::new("test");
        let (f, a) = bound("One", false, true);
        pipeline.push_filter(f, a);
        let (f, a) = bound("Two", false, false);
        pipeline.push_filter(f, a);

        let mut store = ObjectStore::new();
        let result = pipeline.run(&mut store, false, &CancelToken::new());

        assert_eq!(result.outcomes.len(), 2);
        assert_eq!(result.outcomes[0].fault, FaultState::Warnings);
        assert_eq!(result.fault(), FaultState::Warnings);
        assert!(result.is_ok());
        assert!(store.contains(&path("Two")));
    }

    #[test]
    fn test_preflight_only_leaves_store_untouched() {
        let mut pipeline = Pipeline::new("test");
        let (f, a) = bound("One", false, false);
        pipeline.push_filter(f, a);

        let mut store = ObjectStore::new();
        let result = pipeline.run(&mut store, true, &CancelToken::new());

        assert!(result.is_ok());
        assert!(store.is_empty());
    }

    #[test]
    fn test_nested_pipeline_runs_in_order() {
        let mut inner = Pipeline::new("inner");
        let (f, a) = bound("FromInner", false, false);
        inner.push_filter(f, a);

        let mut outer = Pipeline::new("outer");
        let (f, a) = bound("First", false, false);
        outer.push_filter(f, a);
        outer.push_pipeline(inner);
        let (f, a) = bound("Last", false, false);
        outer.push_filter(f, a);

        assert_eq!(outer.filter_count(), 3);

        let mut store = ObjectStore::new();
        let result = outer.run(&mut store, false, &CancelToken::new());
        assert!(result.is_ok());
        assert_eq!(result.outcomes.len(), 3);
        for name in ["First", "FromInner", "Last"] {
            assert!(store.contains(&path(name)), "missing {}", name);
        }
    }

    #[test]
    fn test_nested_failure_stops_outer() {
        let mut inner = Pipeline::new("inner");
        let (f, a) = bound("Bad", true, false);
        inner.push_filter(f, a);

        let mut outer = Pipeline::new("outer");
        outer.push_pipeline(inner);
        let (f, a) = bound("Never", false, false);
        outer.push_filter(f, a);

        let mut store = ObjectStore::new();
        let result = outer.run(&mut store, false, &CancelToken::new());
        assert_eq!(result.fault(), FaultState::Errors);
        assert!(!store.contains(&path("Never")));
    }

    #[test]
    fn test_document_roundtrip() {
        let mut pipeline = Pipeline::new("reconstruction");
        let (f, a) = bound("Alpha", false, false);
        pipeline.push_filter(f, a);
        let mut nested = Pipeline::new("cleanup");
        let (f, a) = bound("Beta", false, false);
        nested.push_filter(f, a);
        pipeline.push_pipeline(nested);

        let json = pipeline.to_json().unwrap();
        assert_eq!(json["pipeline"]["name"], "reconstruction");
        assert_eq!(
            json["pipeline"]["nodes"][0]["filter"]["class"],
            "GroupMaker"
        );
        assert_eq!(
            json["pipeline"]["nodes"][0]["filter"]["args"]["name"],
            "Alpha"
        );

        let (back, warnings) = Pipeline::from_json(&json, &registry()).unwrap();
        assert!(warnings.is_empty());
        assert_eq!(back.name, "reconstruction");
        assert_eq!(back.len(), 2);
        assert_eq!(back.filter_count(), 2);

        // The rebuilt pipeline behaves identically
        let mut store = ObjectStore::new();
        let mut back = back;
        let result = back.run(&mut store, false, &CancelToken::new());
        assert!(result.is_ok());
        assert!(store.contains(&path("Alpha")));
        assert!(store.contains(&path("Beta")));
    }

    #[test]
    fn test_unknown_filter_is_error_unknown_arg_is_warning() {
        let json = json!({
            "pipeline": {
                "name": "x",
                "nodes": [ { "filter": { "class": "Missing", "uuid": "?", "args": {} } } ]
            }
        });
        assert!(matches!(
            Pipeline::from_json(&json, &registry()),
            Err(PipelineError::UnknownFilter(_))
        ));

        let json = json!({
            "pipeline": {
                "name": "x",
                "nodes": [ { "filter": {
                    "class": "GroupMaker",
                    "uuid": "11111111-1111-1111-1111-111111111111",
                    "args": { "name": "G", "bogus": 1 }
                } } ]
            }
        });
        let (_, warnings) = Pipeline::from_json(&json, &registry()).unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("bogus"));
    }

    #[test]
    fn test_cancel_stops_between_nodes() {
        let mut pipeline = Pipeline::new("test");
        let (f, a) = bound("One", false, false);
        pipeline.push_filter(f, a);

        let cancel = CancelToken::new();
        cancel.cancel();
        let mut store = ObjectStore::new();
        let result = pipeline.run(&mut store, false, &cancel);
        assert_eq!(result.fault(), FaultState::Errors);
        assert!(store.is_empty());
    }
}
