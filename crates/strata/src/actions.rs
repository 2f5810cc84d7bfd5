//! Actions: replayable descriptions of one structural store mutation.
//!
//! Every action runs in one of two modes. `Plan` performs the identical
//! structural change with placeholder arrays only, so later actions in
//! the same batch see the predicted shape of the store. `Commit`
//! performs the change for real and allocates or transfers backing
//! storage.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::ArrayData;
use crate::geometry::ImageGeometry;
use crate::path::DataPath;
use crate::store::{ObjectStore, PathError};

/// Whether an action predicts or performs its mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Plan,
    Commit,
}

/// Errors from applying an action.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("{action}: {source}")]
    Structural {
        action: &'static str,
        #[source]
        source: PathError,
    },

    #[error("action list is invalid and must not be applied")]
    InvalidList,
}

/// The closed set of structural mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Create a group, making any missing intermediate groups.
    CreateGroup { path: DataPath },

    /// Create an array at `path`; the parent must already exist.
    CreateArray { path: DataPath, array: ArrayData },

    /// Re-hang the edge named by `path` under `new_parent`.
    Move { path: DataPath, new_parent: DataPath },

    Rename { path: DataPath, new_name: String },

    /// Drop the parent edge named by `path` (unreachable nodes sweep).
    Delete { path: DataPath },

    /// Deep-copy the subtree at `path` under `dest_parent`.
    Copy {
        path: DataPath,
        dest_parent: DataPath,
        new_name: String,
    },

    /// Add an additional parent edge, sharing the node.
    Link { path: DataPath, extra_parent: DataPath },

    /// Set or replace the geometry metadata on a group.
    UpdateGeometry {
        path: DataPath,
        geometry: ImageGeometry,
    },

    /// Insert an array read from an external object.
    ///
    /// In plan mode only the carried shape lands; in commit mode the
    /// carried values are transferred as-is.
    ImportObject { path: DataPath, array: ArrayData },
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::CreateGroup { .. } => "create group",
            Action::CreateArray { .. } => "create array",
            Action::Move { .. } => "move",
            Action::Rename { .. } => "rename",
            Action::Delete { .. } => "delete",
            Action::Copy { .. } => "copy",
            Action::Link { .. } => "link",
            Action::UpdateGeometry { .. } => "update geometry",
            Action::ImportObject { .. } => "import object",
        }
    }

    /// Apply this action to the store in the given mode.
    ///
    /// Plan and Commit make the same structural change; only backing
    /// storage treatment differs.
    pub fn apply(&self, store: &mut ObjectStore, mode: ApplyMode) -> Result<(), ActionError> {
        let structural = |source| ActionError::Structural {
            action: self.name(),
            source,
        };

        match self {
            Action::CreateGroup { path } => {
                store.make_path(path).map(|_| ()).map_err(structural)?;
            }
            Action::CreateArray { path, array } => {
                let mut array = ArrayData::placeholder(
                    array.scalar,
                    array.tuple_dims.clone(),
                    array.component_dims.clone(),
                );
                if mode == ApplyMode::Commit {
                    array.allocate().map_err(structural)?;
                }
                let parent = path.parent();
                store
                    .insert_array(parent.as_ref(), path.name(), array)
                    .map(|_| ())
                    .map_err(structural)?;
            }
            Action::Move { path, new_parent } => {
                store.move_node(path, new_parent).map_err(structural)?;
            }
            Action::Rename { path, new_name } => {
                store.rename(path, new_name.clone()).map_err(structural)?;
            }
            Action::Delete { path } => {
                store.remove(path).map_err(structural)?;
            }
            Action::Copy {
                path,
                dest_parent,
                new_name,
            } => {
                store
                    .deep_copy(path, dest_parent, new_name.clone())
                    .map(|_| ())
                    .map_err(structural)?;
            }
            Action::Link { path, extra_parent } => {
                let child = store.resolve(path).map_err(structural)?;
                let parent = store.resolve(extra_parent).map_err(structural)?;
                store.add_parent(child, parent).map_err(structural)?;
            }
            Action::UpdateGeometry { path, geometry } => {
                let id = store.resolve(path).map_err(structural)?;
                let group = store
                    .node_mut(id)
                    .and_then(|n| n.as_group_mut())
                    .ok_or_else(|| {
                        structural(PathError::WrongType {
                            path: path.to_string(),
                            expected: "group".to_string(),
                        })
                    })?;
                group.geometry = Some(geometry.clone());
            }
            Action::ImportObject { path, array } => {
                let inserted = match mode {
                    ApplyMode::Plan => ArrayData::placeholder(
                        array.scalar,
                        array.tuple_dims.clone(),
                        array.component_dims.clone(),
                    ),
                    ApplyMode::Commit => array.clone(),
                };
                let parent = path.parent();
                store
                    .insert_array(parent.as_ref(), path.name(), inserted)
                    .map(|_| ())
                    .map_err(structural)?;
            }
        }

        if mode == ApplyMode::Commit {
            debug!(action = self.name(), "committed");
        }
        Ok(())
    }
}

/// The ordered result of a filter's structural planning.
///
/// Normal actions run first, in order; the deferred tail runs only
/// after every normal action has succeeded. Any recorded error marks
/// the whole list invalid, and an invalid list refuses to apply.
#[derive(Debug, Clone, Default)]
pub struct OutputActions {
    actions: Vec<Action>,
    deferred: Vec<Action>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl OutputActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a normal action.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Append an action whose validity depends on the normal actions
    /// having already landed.
    pub fn push_deferred(&mut self, action: Action) {
        self.deferred.push(action);
    }

    /// Record a warning. Warnings never invalidate the list.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a construction error, invalidating the list.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn deferred(&self) -> &[Action] {
        &self.deferred
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty() && self.deferred.is_empty()
    }

    /// Merge another list into this one, keeping relative order.
    pub fn extend(&mut self, other: OutputActions) {
        self.actions.extend(other.actions);
        self.deferred.extend(other.deferred);
        self.warnings.extend(other.warnings);
        self.errors.extend(other.errors);
    }

    /// Apply every action in order: normals first, then the deferred
    /// tail. Refuses to touch the store when the list is invalid.
    pub fn apply(&self, store: &mut ObjectStore, mode: ApplyMode) -> Result<(), ActionError> {
        if !self.is_valid() {
            return Err(ActionError::InvalidList);
        }
        for action in &self.actions {
            action.apply(store, mode)?;
        }
        for action in &self.deferred {
            action.apply(store, mode)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::ScalarType;

    fn path(s: &str) -> DataPath {
        DataPath::parse(s).unwrap()
    }

    #[test]
    fn test_plan_creates_placeholder_commit_allocates() {
        let action = Action::CreateArray {
            path: path("G/Data"),
            array: ArrayData::placeholder(ScalarType::F32, vec![10], vec![2]),
        };

        let mut planned = ObjectStore::new();
        planned.make_path(&path("G")).unwrap();
        action.apply(&mut planned, ApplyMode::Plan).unwrap();
        assert!(planned.array_at(&path("G/Data")).unwrap().is_placeholder());

        let mut committed = ObjectStore::new();
        committed.make_path(&path("G")).unwrap();
        action.apply(&mut committed, ApplyMode::Commit).unwrap();
        let array = committed.array_at(&path("G/Data")).unwrap();
        assert!(!array.is_placeholder());
        assert_eq!(array.values.as_ref().unwrap().len(), 20);
    }

    #[test]
    fn test_plan_and_commit_agree_on_shape() {
        // Preflight/execute parity: the same action list yields the same
        // set of paths and types in both modes.
        let mut list = OutputActions::new();
        list.push(Action::CreateGroup {
            path: path("A/B"),
        });
        list.push(Action::CreateArray {
            path: path("A/B/Data"),
            array: ArrayData::placeholder(ScalarType::U8, vec![4], vec![3]),
        });
        list.push(Action::Move {
            path: path("A/B"),
            new_parent: path("A"),
        });
        list.push_deferred(Action::Rename {
            path: path("A/B/Data"),
            new_name: "Renamed".to_string(),
        });

        let mut planned = ObjectStore::new();
        list.apply(&mut planned, ApplyMode::Plan).unwrap();
        let mut committed = ObjectStore::new();
        list.apply(&mut committed, ApplyMode::Commit).unwrap();

        for p in ["A", "A/B", "A/B/Renamed"] {
            let p = path(p);
            let planned_node = planned.get(&p).expect("planned");
            let committed_node = committed.get(&p).expect("committed");
            assert_eq!(
                planned_node.kind.type_name(),
                committed_node.kind.type_name()
            );
        }
        let planned_arr = planned.array_at(&path("A/B/Renamed")).unwrap();
        let committed_arr = committed.array_at(&path("A/B/Renamed")).unwrap();
        assert_eq!(planned_arr.tuple_dims, committed_arr.tuple_dims);
        assert_eq!(planned_arr.scalar, committed_arr.scalar);
        assert!(planned_arr.is_placeholder());
        assert!(!committed_arr.is_placeholder());
    }

    #[test]
    fn test_later_actions_see_planned_shape() {
        let mut list = OutputActions::new();
        list.push(Action::CreateGroup {
            path: path("Root/Sub"),
        });
        // This one depends on Root/Sub existing in plan mode already
        list.push(Action::CreateArray {
            path: path("Root/Sub/Data"),
            array: ArrayData::placeholder(ScalarType::I32, vec![2], vec![1]),
        });

        let mut store = ObjectStore::new();
        list.apply(&mut store, ApplyMode::Plan).unwrap();
        assert!(store.contains(&path("Root/Sub/Data")));
    }

    #[test]
    fn test_invalid_list_refuses_apply() {
        let mut list = OutputActions::new();
        list.push(Action::CreateGroup { path: path("A") });
        list.error("construction failed");

        let mut store = ObjectStore::new();
        assert!(matches!(
            list.apply(&mut store, ApplyMode::Commit),
            Err(ActionError::InvalidList)
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_warnings_do_not_invalidate() {
        let mut list = OutputActions::new();
        list.push(Action::CreateGroup { path: path("A") });
        list.warn("something mild");
        assert!(list.is_valid());

        let mut store = ObjectStore::new();
        list.apply(&mut store, ApplyMode::Commit).unwrap();
        assert!(store.contains(&path("A")));
    }

    #[test]
    fn test_import_transfers_values_on_commit() {
        let mut array = ArrayData::placeholder(ScalarType::U8, vec![3], vec![1]);
        array
            .set_values(crate::array::ArrayValues::U8(vec![7, 8, 9]))
            .unwrap();
        let action = Action::ImportObject {
            path: path("Imported"),
            array,
        };

        let mut store = ObjectStore::new();
        action.apply(&mut store, ApplyMode::Plan).unwrap();
        assert!(store.array_at(&path("Imported")).unwrap().is_placeholder());

        let mut store = ObjectStore::new();
        action.apply(&mut store, ApplyMode::Commit).unwrap();
        assert_eq!(
            store
                .array_at(&path("Imported"))
                .unwrap()
                .values
                .as_ref()
                .unwrap()
                .as_u8()
                .unwrap(),
            &[7, 8, 9]
        );
    }

    #[test]
    fn test_action_serde_roundtrip() {
        let action = Action::Move {
            path: path("Group2/Group3"),
            new_parent: path("Group1"),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "move");
        let back: Action = serde_json::from_value(json).unwrap();
        assert_eq!(back, action);
    }
}
