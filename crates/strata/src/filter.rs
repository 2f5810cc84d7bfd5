//! The two-phase filter contract: preflight predicts, execute commits.
//!
//! Preflight is side-effect-free on the real store (the pipeline runner
//! hands it a disposable working copy) and produces a prediction of
//! structural change. Execute re-derives and commits that action list,
//! then runs the filter's numeric body against the now-present data.
//! Cancellation is cooperative and non-transactional: effects already
//! committed when the token trips are not rolled back.

use indexmap::IndexMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::actions::{ActionError, ApplyMode, OutputActions};
use crate::args::{ArgValue, ArgumentError, Arguments};
use crate::params::{LinkMap, Parameter, ParameterError, validate_all};
use crate::store::{ObjectStore, PathError};

/// Shared cancellation flag, polled at safe points.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Best-effort; work already dispatched runs
    /// to its next poll point.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Execute-time numeric or IO failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct AlgorithmError {
    pub message: String,
}

impl AlgorithmError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Any failure a filter phase can surface.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FilterError {
    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    #[error("preflight failed: {0}")]
    Preflight(String),

    #[error("cancelled")]
    Cancelled,
}

/// Lifecycle of one bound filter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterState {
    #[default]
    Idle,
    Preflighting,
    PreflightFailed,
    PreflightSucceeded,
    Executing,
    ExecuteFailed,
    ExecuteSucceeded,
}

/// The outcome of a preflight run: predicted actions plus any derived
/// display values (a computed default name, a tuple count, ...).
#[derive(Debug, Clone, Default)]
pub struct PreflightResult {
    pub actions: OutputActions,
    pub derived: IndexMap<String, ArgValue>,
}

impl PreflightResult {
    pub fn is_valid(&self) -> bool {
        self.actions.is_valid()
    }

    /// Attach a derived display value.
    pub fn derive(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) {
        self.derived.insert(key.into(), value.into());
    }
}

/// Accumulated errors and warnings from one execute run.
///
/// The warnings channel is always present; warnings survive success.
#[derive(Debug, Clone, Default)]
pub struct ExecuteResult {
    pub errors: Vec<FilterError>,
    pub warnings: Vec<String>,
}

impl ExecuteResult {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Static description of a filter: identity, parameters, links.
#[derive(Debug, Clone)]
pub struct FilterDecl {
    /// Stable class name, the primary identity in pipeline documents.
    pub id: String,
    /// Stable UUID alias, cross-checked on pipeline load.
    pub uuid: String,
    /// Human-readable name.
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
    pub links: LinkMap,
}

impl FilterDecl {
    pub fn new(id: impl Into<String>, uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: uuid.into(),
            name: name.into(),
            description: String::new(),
            parameters: vec![],
            links: LinkMap::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn links(mut self, links: LinkMap) -> Self {
        self.links = links;
        self
    }

    pub fn parameter_by_key(&self, key: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.key() == key)
    }

    /// An argument map holding every parameter's default.
    pub fn default_arguments(&self) -> Arguments {
        self.parameters
            .iter()
            .map(|p| (p.key().to_string(), p.default_value()))
            .collect()
    }

    /// Validate all active parameters and fold the outcome into a fresh
    /// action list: errors invalidate it, warnings ride along.
    ///
    /// Filters call this first in preflight and append their structural
    /// actions only when the list is still valid.
    pub fn validated_actions(&self, store: &ObjectStore, args: &Arguments) -> OutputActions {
        let mut actions = OutputActions::new();
        let (errors, warnings) = validate_all(&self.parameters, &self.links, args, Some(store));
        for warning in warnings {
            actions.warn(warning);
        }
        for error in errors {
            actions.error(format!("[{}] {}", error.code(), error));
        }
        actions
    }
}

/// One independently authored transform.
///
/// `preflight` must not mutate the store it is shown. The provided
/// `execute` re-derives the action list against the live store, commits
/// it, then runs [`body`](Filter::body); structural filters with no
/// numeric work keep the default no-op body.
pub trait Filter: Send + Sync {
    fn decl(&self) -> &FilterDecl;

    fn preflight(
        &self,
        store: &ObjectStore,
        args: &Arguments,
        cancel: &CancelToken,
    ) -> PreflightResult;

    /// The numeric/algorithmic work, run after structural commit.
    /// Returns warnings on success.
    fn body(
        &self,
        store: &mut ObjectStore,
        args: &Arguments,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, FilterError> {
        let _ = (store, args, cancel);
        Ok(vec![])
    }

    /// Commit the predicted structural changes, then run the body.
    ///
    /// On failure nothing is rolled back: the store keeps whatever
    /// actions had already committed.
    fn execute(
        &self,
        store: &mut ObjectStore,
        args: &Arguments,
        cancel: &CancelToken,
    ) -> ExecuteResult {
        let mut result = ExecuteResult::default();
        if cancel.is_cancelled() {
            result.errors.push(FilterError::Cancelled);
            return result;
        }

        let preflight = self.preflight(store, args, cancel);
        result
            .warnings
            .extend(preflight.actions.warnings().iter().cloned());
        if !preflight.is_valid() {
            result.errors.extend(
                preflight
                    .actions
                    .errors()
                    .iter()
                    .cloned()
                    .map(FilterError::Preflight),
            );
            return result;
        }

        if let Err(e) = preflight.actions.apply(store, ApplyMode::Commit) {
            result.errors.push(e.into());
            return result;
        }

        match self.body(store, args, cancel) {
            Ok(warnings) => result.warnings.extend(warnings),
            Err(e) => result.errors.push(e),
        }
        result
    }
}

/// A filter plus the argument map it will run with, tracking state.
#[derive(Clone)]
pub struct BoundFilter {
    filter: Arc<dyn Filter>,
    args: Arguments,
    state: FilterState,
}

impl std::fmt::Debug for BoundFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundFilter")
            .field("filter", &self.filter.decl().id)
            .field("state", &self.state)
            .finish()
    }
}

impl BoundFilter {
    pub fn new(filter: Arc<dyn Filter>, args: Arguments) -> Self {
        Self {
            filter,
            args,
            state: FilterState::Idle,
        }
    }

    pub fn filter(&self) -> &Arc<dyn Filter> {
        &self.filter
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Run preflight against a store view, updating the state machine.
    pub fn run_preflight(&mut self, store: &ObjectStore, cancel: &CancelToken) -> PreflightResult {
        self.state = FilterState::Preflighting;
        let result = self.filter.preflight(store, &self.args, cancel);
        self.state = if result.is_valid() {
            FilterState::PreflightSucceeded
        } else {
            FilterState::PreflightFailed
        };
        result
    }

    /// Run execute against the live store, updating the state machine.
    pub fn run_execute(&mut self, store: &mut ObjectStore, cancel: &CancelToken) -> ExecuteResult {
        self.state = FilterState::Executing;
        let result = self.filter.execute(store, &self.args, cancel);
        self.state = if result.is_ok() {
            FilterState::ExecuteSucceeded
        } else {
            FilterState::ExecuteFailed
        };
        result
    }
}
