//! The object store: an arena of nodes addressed by integer handles.
//!
//! All parent/child relations are identity references into the arena; a
//! node may have more than one parent (a DAG, never a cycle). Sibling
//! names are unique per parent. Removal follows an eager reachability
//! sweep: dropping the last parent edge of a node deletes it, and
//! recursively any children that thereby lose their last parent.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::array::ArrayData;
use crate::geometry::ImageGeometry;
use crate::path::DataPath;

/// Errors from path resolution and structural mutation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    EmptyPath,

    #[error("path not found: {path}")]
    NotFound { path: String },

    #[error("not a group: {path}")]
    NotAGroup { path: String },

    #[error("wrong object type at {path}: expected {expected}")]
    WrongType { path: String, expected: String },

    #[error("path already exists: {path}")]
    AlreadyExists { path: String },

    #[error("operation would make {path} its own ancestor")]
    WouldCreateCycle { path: String },

    #[error("shape mismatch: expected {expected} elements, found {found}")]
    ShapeMismatch { expected: usize, found: usize },
}

/// Opaque integer handle to a node in the store arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(usize);

/// Named-children capability of a node, with optional grid geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    children: IndexMap<String, NodeId>,
    pub geometry: Option<ImageGeometry>,
}

impl Group {
    /// Ordered name → id map of children.
    pub fn children(&self) -> &IndexMap<String, NodeId> {
        &self.children
    }

    pub fn child(&self, name: &str) -> Option<NodeId> {
        self.children.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// What a node holds.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Group(Group),
    Array(ArrayData),
}

impl NodeKind {
    /// Type tag used in error messages and listings.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Group(_) => "group",
            NodeKind::Array(_) => "array",
        }
    }
}

/// A uniquely identified entry in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    id: NodeId,
    name: String,
    parents: Vec<NodeId>,
    pub kind: NodeKind,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Incoming edges; more than one makes this a shared node.
    pub fn parents(&self) -> &[NodeId] {
        &self.parents
    }

    pub fn is_group(&self) -> bool {
        matches!(self.kind, NodeKind::Group(_))
    }

    pub fn as_group(&self) -> Option<&Group> {
        match &self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Array(_) => None,
        }
    }

    pub fn as_group_mut(&mut self) -> Option<&mut Group> {
        match &mut self.kind {
            NodeKind::Group(group) => Some(group),
            NodeKind::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayData> {
        match &self.kind {
            NodeKind::Array(array) => Some(array),
            NodeKind::Group(_) => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayData> {
        match &mut self.kind {
            NodeKind::Array(array) => Some(array),
            NodeKind::Group(_) => None,
        }
    }
}

/// The single long-lived owner of all nodes.
///
/// Cloning the store yields an independent working copy; the pipeline
/// runner hands such a copy to preflight so it stays side-effect-free.
#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    roots: IndexMap<String, NodeId>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ordered name → id map of top-level nodes.
    pub fn roots(&self) -> &IndexMap<String, NodeId> {
        &self.roots
    }

    /// Look up a node by handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Resolve a path with a single left-to-right walk from the roots.
    ///
    /// Fails with `NotFound` if any segment is missing and `NotAGroup`
    /// if a non-final segment resolves to a non-group.
    pub fn resolve(&self, path: &DataPath) -> Result<NodeId, PathError> {
        let segments = path.segments();
        if segments.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let mut current = *self
            .roots
            .get(&segments[0])
            .ok_or_else(|| PathError::NotFound {
                path: path.to_string(),
            })?;

        for (depth, segment) in segments.iter().enumerate().skip(1) {
            let node = self.node(current).ok_or_else(|| PathError::NotFound {
                path: path.to_string(),
            })?;
            let group = node.as_group().ok_or_else(|| PathError::NotAGroup {
                path: segments[..depth].join("/"),
            })?;
            current = group.child(segment).ok_or_else(|| PathError::NotFound {
                path: path.to_string(),
            })?;
        }

        Ok(current)
    }

    /// Look up a node by path.
    pub fn get(&self, path: &DataPath) -> Option<&Node> {
        self.resolve(path).ok().and_then(|id| self.node(id))
    }

    pub fn contains(&self, path: &DataPath) -> bool {
        self.resolve(path).is_ok()
    }

    /// Resolve a path that must address a group.
    pub fn group_at(&self, path: &DataPath) -> Result<&Group, PathError> {
        let id = self.resolve(path)?;
        self.node(id)
            .and_then(Node::as_group)
            .ok_or_else(|| PathError::WrongType {
                path: path.to_string(),
                expected: "group".to_string(),
            })
    }

    /// Resolve a path that must address an array.
    pub fn array_at(&self, path: &DataPath) -> Result<&ArrayData, PathError> {
        let id = self.resolve(path)?;
        self.node(id)
            .and_then(Node::as_array)
            .ok_or_else(|| PathError::WrongType {
                path: path.to_string(),
                expected: "array".to_string(),
            })
    }

    pub fn array_at_mut(&mut self, path: &DataPath) -> Result<&mut ArrayData, PathError> {
        let id = self.resolve(path)?;
        self.node_mut(id)
            .and_then(Node::as_array_mut)
            .ok_or_else(|| PathError::WrongType {
                path: path.to_string(),
                expected: "array".to_string(),
            })
    }

    /// Create a group under `parent` (`None` for top level).
    pub fn insert_group(
        &mut self,
        parent: Option<&DataPath>,
        name: impl Into<String>,
    ) -> Result<NodeId, PathError> {
        self.insert_node(parent, name.into(), NodeKind::Group(Group::default()))
    }

    /// Create an array under `parent` (`None` for top level).
    pub fn insert_array(
        &mut self,
        parent: Option<&DataPath>,
        name: impl Into<String>,
        array: ArrayData,
    ) -> Result<NodeId, PathError> {
        self.insert_node(parent, name.into(), NodeKind::Array(array))
    }

    fn insert_node(
        &mut self,
        parent: Option<&DataPath>,
        name: String,
        kind: NodeKind,
    ) -> Result<NodeId, PathError> {
        let parent_id = match parent {
            Some(path) => {
                let id = self.resolve(path)?;
                if self.node(id).is_none_or(|n| !n.is_group()) {
                    return Err(PathError::NotAGroup {
                        path: path.to_string(),
                    });
                }
                Some(id)
            }
            None => None,
        };

        if self.child_of(parent_id, &name).is_some() {
            return Err(PathError::AlreadyExists {
                path: match parent {
                    Some(p) => p.child(&name).to_string(),
                    None => name.clone(),
                },
            });
        }

        let id = self.alloc(name.clone(), kind, parent_id);
        self.children_mut(parent_id).insert(name, id);
        Ok(id)
    }

    /// Create every missing intermediate group along `path`, returning
    /// the id of the final segment's group.
    pub fn make_path(&mut self, path: &DataPath) -> Result<NodeId, PathError> {
        let segments = path.segments();
        if segments.is_empty() {
            return Err(PathError::EmptyPath);
        }

        let mut parent: Option<NodeId> = None;
        for (depth, segment) in segments.iter().enumerate() {
            match self.child_of(parent, segment) {
                Some(existing) => {
                    if self.node(existing).is_none_or(|n| !n.is_group()) {
                        return Err(PathError::NotAGroup {
                            path: segments[..=depth].join("/"),
                        });
                    }
                    parent = Some(existing);
                }
                None => {
                    let id = self.alloc(
                        segment.clone(),
                        NodeKind::Group(Group::default()),
                        parent,
                    );
                    self.children_mut(parent).insert(segment.clone(), id);
                    parent = Some(id);
                }
            }
        }

        Ok(parent.expect("non-empty path"))
    }

    /// Remove the single parent edge named by `path`, then sweep any
    /// node left unreachable (no parent edge and not top-level).
    pub fn remove(&mut self, path: &DataPath) -> Result<(), PathError> {
        let id = self.resolve(path)?;
        let parent_id = match path.parent() {
            Some(parent_path) => Some(self.resolve(&parent_path)?),
            None => None,
        };

        debug!(path = %path, "removing edge");
        self.detach(id, parent_id, path.name());
        self.sweep(id);
        Ok(())
    }

    /// Add an additional incoming edge, making `child` shared.
    ///
    /// Rejects the link if it would make the child its own ancestor, or
    /// if the new parent already has a child of the same name.
    pub fn add_parent(&mut self, child: NodeId, parent: NodeId) -> Result<(), PathError> {
        let child_name = self
            .node(child)
            .map(|n| n.name().to_string())
            .ok_or(PathError::NotFound {
                path: String::new(),
            })?;

        if self.node(parent).is_none_or(|n| !n.is_group()) {
            return Err(PathError::NotAGroup {
                path: self.display_path(parent),
            });
        }
        if child == parent || self.is_ancestor(child, parent) {
            return Err(PathError::WouldCreateCycle {
                path: self.display_path(child),
            });
        }
        if self.child_of(Some(parent), &child_name).is_some() {
            return Err(PathError::AlreadyExists {
                path: format!("{}/{}", self.display_path(parent), child_name),
            });
        }

        self.children_mut(Some(parent)).insert(child_name, child);
        if let Some(node) = self.node_mut(child) {
            node.parents.push(parent);
        }
        Ok(())
    }

    /// Move the node at `path` under `new_parent`.
    ///
    /// The specific edge named by `path` is replaced; other parent edges
    /// of a shared node are untouched.
    pub fn move_node(&mut self, path: &DataPath, new_parent: &DataPath) -> Result<(), PathError> {
        let id = self.resolve(path)?;
        let dest = self.resolve(new_parent)?;
        let old_parent = match path.parent() {
            Some(parent_path) => Some(self.resolve(&parent_path)?),
            None => None,
        };

        if self.node(dest).is_none_or(|n| !n.is_group()) {
            return Err(PathError::NotAGroup {
                path: new_parent.to_string(),
            });
        }
        if id == dest || self.is_ancestor(id, dest) {
            return Err(PathError::WouldCreateCycle {
                path: path.to_string(),
            });
        }
        if old_parent != Some(dest) && self.child_of(Some(dest), path.name()).is_some() {
            return Err(PathError::AlreadyExists {
                path: new_parent.child(path.name()).to_string(),
            });
        }
        if old_parent == Some(dest) {
            return Ok(());
        }

        debug!(from = %path, to = %new_parent, "moving node");
        self.detach(id, old_parent, path.name());
        let name = self.node(id).map(|n| n.name().to_string()).unwrap_or_default();
        self.children_mut(Some(dest)).insert(name, id);
        if let Some(node) = self.node_mut(id) {
            node.parents.push(dest);
        }
        Ok(())
    }

    /// Rename the node at `path`, preserving its position among siblings.
    pub fn rename(&mut self, path: &DataPath, new_name: impl Into<String>) -> Result<(), PathError> {
        let new_name = new_name.into();
        if new_name.is_empty() {
            return Err(PathError::EmptyPath);
        }
        let id = self.resolve(path)?;
        let parent_id = match path.parent() {
            Some(parent_path) => Some(self.resolve(&parent_path)?),
            None => None,
        };

        if new_name == path.name() {
            return Ok(());
        }
        if self.child_of(parent_id, &new_name).is_some() {
            return Err(PathError::AlreadyExists {
                path: path.renamed(&new_name).to_string(),
            });
        }

        let children = self.children_mut(parent_id);
        if let Some(index) = children.get_index_of(path.name()) {
            children.shift_remove(path.name());
            children.shift_insert(index, new_name.clone(), id);
        }
        if let Some(node) = self.node_mut(id) {
            node.name = new_name;
        }
        Ok(())
    }

    /// Recursively copy the subtree at `src` under `dest_parent`.
    ///
    /// Shared nodes inside the subtree are duplicated, not re-linked.
    pub fn deep_copy(
        &mut self,
        src: &DataPath,
        dest_parent: &DataPath,
        new_name: impl Into<String>,
    ) -> Result<NodeId, PathError> {
        let new_name = new_name.into();
        let src_id = self.resolve(src)?;
        let dest_id = self.resolve(dest_parent)?;
        if self.node(dest_id).is_none_or(|n| !n.is_group()) {
            return Err(PathError::NotAGroup {
                path: dest_parent.to_string(),
            });
        }
        if self.child_of(Some(dest_id), &new_name).is_some() {
            return Err(PathError::AlreadyExists {
                path: dest_parent.child(&new_name).to_string(),
            });
        }
        // Copying a subtree into itself would never terminate.
        if src_id == dest_id || self.is_ancestor(src_id, dest_id) {
            return Err(PathError::WouldCreateCycle {
                path: src.to_string(),
            });
        }

        let copy = self.copy_subtree(src_id, dest_id, new_name.clone());
        self.children_mut(Some(dest_id)).insert(new_name, copy);
        Ok(copy)
    }

    fn copy_subtree(&mut self, src: NodeId, parent: NodeId, name: String) -> NodeId {
        let kind = match &self.node(src).expect("resolved").kind {
            NodeKind::Group(group) => NodeKind::Group(Group {
                children: IndexMap::new(),
                geometry: group.geometry.clone(),
            }),
            NodeKind::Array(array) => NodeKind::Array(array.clone()),
        };
        let copy = self.alloc(name, kind, Some(parent));

        let children: Vec<(String, NodeId)> = self
            .node(src)
            .and_then(Node::as_group)
            .map(|g| {
                g.children()
                    .iter()
                    .map(|(n, id)| (n.clone(), *id))
                    .collect()
            })
            .unwrap_or_default();

        for (child_name, child_id) in children {
            let child_copy = self.copy_subtree(child_id, copy, child_name.clone());
            self.children_mut(Some(copy)).insert(child_name, child_copy);
        }
        copy
    }

    /// True if `ancestor` lies on any parent chain above `node`.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut pending = vec![node];
        let mut seen = vec![];
        while let Some(current) = pending.pop() {
            if seen.contains(&current) {
                continue;
            }
            seen.push(current);
            if let Some(n) = self.node(current) {
                for &parent in n.parents() {
                    if parent == ancestor {
                        return true;
                    }
                    pending.push(parent);
                }
            }
        }
        false
    }

    fn alloc(&mut self, name: String, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.nodes.push(None);
                self.nodes.len() - 1
            }
        };
        let id = NodeId(slot);
        self.nodes[slot] = Some(Node {
            id,
            name,
            parents: parent.into_iter().collect(),
            kind,
        });
        id
    }

    fn child_of(&self, parent: Option<NodeId>, name: &str) -> Option<NodeId> {
        match parent {
            Some(id) => self.node(id)?.as_group()?.child(name),
            None => self.roots.get(name).copied(),
        }
    }

    fn children_mut(&mut self, parent: Option<NodeId>) -> &mut IndexMap<String, NodeId> {
        match parent {
            Some(id) => {
                &mut self
                    .node_mut(id)
                    .and_then(Node::as_group_mut)
                    .expect("parent is a group")
                    .children
            }
            None => &mut self.roots,
        }
    }

    /// Drop the edge `parent → node` (or the root entry for `None`).
    fn detach(&mut self, id: NodeId, parent: Option<NodeId>, name: &str) {
        self.children_mut(parent).shift_remove(name);
        if let (Some(parent_id), Some(node)) = (parent, self.node_mut(id)) {
            node.parents.retain(|p| *p != parent_id);
        }
    }

    /// Delete `id` if it has become unreachable, cascading to children
    /// that lose their last parent edge.
    fn sweep(&mut self, id: NodeId) {
        let unreachable = match self.node(id) {
            Some(node) => node.parents.is_empty() && !self.roots.values().any(|r| *r == id),
            None => false,
        };
        if !unreachable {
            return;
        }

        let children: Vec<(String, NodeId)> = self
            .node(id)
            .and_then(Node::as_group)
            .map(|g| {
                g.children()
                    .iter()
                    .map(|(n, c)| (n.clone(), *c))
                    .collect()
            })
            .unwrap_or_default();

        self.nodes[id.0] = None;
        self.free.push(id.0);

        for (_, child) in children {
            if let Some(node) = self.node_mut(child) {
                node.parents.retain(|p| *p != id);
            }
            self.sweep(child);
        }
    }

    /// Best-effort textual path for diagnostics, following first parents.
    fn display_path(&self, id: NodeId) -> String {
        let mut segments = vec![];
        let mut current = Some(id);
        while let Some(cur) = current {
            match self.node(cur) {
                Some(node) => {
                    segments.push(node.name().to_string());
                    current = node.parents().first().copied();
                }
                None => break,
            }
        }
        segments.reverse();
        segments.join("/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{ArrayData, ScalarType};

    fn path(s: &str) -> DataPath {
        DataPath::parse(s).unwrap()
    }

    fn sample_store() -> ObjectStore {
        let mut store = ObjectStore::new();
        store.insert_group(None, "Group1").unwrap();
        store.insert_group(None, "Group2").unwrap();
        store
            .insert_group(Some(&path("Group2")), "Group3")
            .unwrap();
        store
            .insert_array(
                Some(&path("Group2/Group3")),
                "Data",
                ArrayData::placeholder(ScalarType::F32, vec![4], vec![1]),
            )
            .unwrap();
        store
    }

    #[test]
    fn test_resolution() {
        let store = sample_store();
        assert!(store.contains(&path("Group2/Group3/Data")));
        assert_eq!(
            store.get(&path("Group2/Group3")).unwrap().name(),
            "Group3"
        );
        assert!(matches!(
            store.resolve(&path("Group2/Nope")),
            Err(PathError::NotFound { .. })
        ));
        // Non-final segment through an array
        assert!(matches!(
            store.resolve(&path("Group2/Group3/Data/Below")),
            Err(PathError::NotAGroup { .. })
        ));
    }

    #[test]
    fn test_typed_lookup() {
        let store = sample_store();
        assert!(store.group_at(&path("Group2")).is_ok());
        assert!(store.array_at(&path("Group2/Group3/Data")).is_ok());
        assert!(matches!(
            store.array_at(&path("Group2")),
            Err(PathError::WrongType { .. })
        ));
        assert!(matches!(
            store.group_at(&path("Group2/Group3/Data")),
            Err(PathError::WrongType { .. })
        ));
    }

    #[test]
    fn test_sibling_names_unique_per_parent() {
        let mut store = sample_store();
        assert!(matches!(
            store.insert_group(None, "Group1"),
            Err(PathError::AlreadyExists { .. })
        ));
        // Same name under a different parent is fine
        store
            .insert_group(Some(&path("Group1")), "Group3")
            .unwrap();
        assert!(store.contains(&path("Group1/Group3")));
        assert!(store.contains(&path("Group2/Group3")));
    }

    #[test]
    fn test_make_path() {
        let mut store = ObjectStore::new();
        store.make_path(&path("A/B/C")).unwrap();
        assert!(store.contains(&path("A/B/C")));
        // Idempotent over existing groups
        store.make_path(&path("A/B/D")).unwrap();
        assert!(store.contains(&path("A/B/D")));

        store
            .insert_array(
                Some(&path("A")),
                "Arr",
                ArrayData::placeholder(ScalarType::U8, vec![1], vec![1]),
            )
            .unwrap();
        assert!(matches!(
            store.make_path(&path("A/Arr/X")),
            Err(PathError::NotAGroup { .. })
        ));
    }

    #[test]
    fn test_move_scenario() {
        // Scenario: move Group3 (child of Group2) under Group1.
        let mut store = sample_store();
        store
            .move_node(&path("Group2/Group3"), &path("Group1"))
            .unwrap();
        assert!(store.contains(&path("Group1/Group3")));
        assert!(!store.contains(&path("Group2/Group3")));
        // The subtree moved with it
        assert!(store.contains(&path("Group1/Group3/Data")));
    }

    #[test]
    fn test_cycle_rejected() {
        // Scenario: move Group2 under its own descendant Group3.
        let mut store = sample_store();
        let before = store.len();
        assert!(matches!(
            store.move_node(&path("Group2"), &path("Group2/Group3")),
            Err(PathError::WouldCreateCycle { .. })
        ));
        // Store unchanged
        assert_eq!(store.len(), before);
        assert!(store.contains(&path("Group2/Group3")));
    }

    #[test]
    fn test_add_parent_multi_parent_law() {
        let mut store = sample_store();
        let shared = store.resolve(&path("Group2/Group3")).unwrap();
        let group1 = store.resolve(&path("Group1")).unwrap();

        let parents_before = store.node(shared).unwrap().parents().len();
        store.add_parent(shared, group1).unwrap();
        let node = store.node(shared).unwrap();
        assert_eq!(node.parents().len(), parents_before + 1);

        // Reachable through both paths, children not duplicated
        assert!(store.contains(&path("Group1/Group3/Data")));
        assert!(store.contains(&path("Group2/Group3/Data")));
        assert_eq!(store.group_at(&path("Group1/Group3")).unwrap().len(), 1);

        // Linking a node under itself is a cycle
        assert!(matches!(
            store.add_parent(group1, group1),
            Err(PathError::WouldCreateCycle { .. })
        ));
    }

    #[test]
    fn test_remove_sweeps_unreachable() {
        let mut store = sample_store();
        store.remove(&path("Group2/Group3")).unwrap();
        assert!(!store.contains(&path("Group2/Group3")));
        // Data lost its only parent chain and was swept
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_one_edge_of_shared_node() {
        let mut store = sample_store();
        let shared = store.resolve(&path("Group2/Group3")).unwrap();
        let group1 = store.resolve(&path("Group1")).unwrap();
        store.add_parent(shared, group1).unwrap();

        store.remove(&path("Group2/Group3")).unwrap();
        // Still reachable through the second parent; nothing swept
        assert!(store.contains(&path("Group1/Group3/Data")));
        assert_eq!(store.node(shared).unwrap().parents().len(), 1);
    }

    #[test]
    fn test_referential_integrity_under_unrelated_mutation() {
        let mut store = sample_store();
        let target = path("Group2/Group3/Data");
        let id = store.resolve(&target).unwrap();

        // Mutations that do not touch the target's ancestors
        store.insert_group(None, "Other").unwrap();
        store.insert_group(Some(&path("Group1")), "Sub").unwrap();
        store.remove(&path("Group1/Sub")).unwrap();

        assert_eq!(store.resolve(&target).unwrap(), id);
        assert_eq!(store.get(&target).unwrap().name(), "Data");
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut store = ObjectStore::new();
        store.insert_group(None, "A").unwrap();
        store.insert_group(None, "B").unwrap();
        store.insert_group(None, "C").unwrap();

        store.rename(&path("B"), "Renamed").unwrap();
        let names: Vec<&String> = store.roots().keys().collect();
        assert_eq!(names, ["A", "Renamed", "C"]);

        assert!(matches!(
            store.rename(&path("A"), "C"),
            Err(PathError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_deep_copy() {
        let mut store = sample_store();
        store
            .deep_copy(&path("Group2/Group3"), &path("Group1"), "Copy")
            .unwrap();
        assert!(store.contains(&path("Group1/Copy/Data")));
        // Originals untouched, copies independent
        assert!(store.contains(&path("Group2/Group3/Data")));
        let original = store.resolve(&path("Group2/Group3/Data")).unwrap();
        let copied = store.resolve(&path("Group1/Copy/Data")).unwrap();
        assert_ne!(original, copied);
    }

    #[test]
    fn test_copy_into_own_subtree_rejected() {
        let mut store = sample_store();
        assert!(matches!(
            store.deep_copy(&path("Group2"), &path("Group2/Group3"), "Copy"),
            Err(PathError::WouldCreateCycle { .. })
        ));
    }
}
