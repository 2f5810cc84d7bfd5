//! Structural filters: pure store mutation, no numeric body.

use strata::{
    Action, Arguments, ArrayData, CancelToken, DataPath, Filter, FilterDecl, FloatVecParam,
    ImageGeometry, IntVecParam, LinkMap, LinkTrigger, ObjectStore, ParamInfo, Parameter,
    PreflightResult, ScalarType,
};

/// Choice labels for the object-type selector shared by the move-family
/// filters. Index 0 gates the group parameter, index 1 the array one.
const OBJECT_TYPES: [&str; 2] = ["Group", "Array"];

fn object_selector() -> (Vec<Parameter>, LinkMap) {
    let params = vec![
        Parameter::choice("object_type", "Object Type", &OBJECT_TYPES, 0),
        Parameter::group_selection("group", "Group to Act On"),
        Parameter::array_selection("array", "Array to Act On"),
    ];
    let links = LinkMap::new()
        .link("object_type", LinkTrigger::ChoiceIs(0), &["group"])
        .link("object_type", LinkTrigger::ChoiceIs(1), &["array"]);
    (params, links)
}

/// Path of whichever object-type selection is active.
fn selected_path(args: &Arguments) -> Result<DataPath, String> {
    let key = match args.int_at("object_type").map_err(|e| e.to_string())? {
        0 => "group",
        1 => "array",
        other => return Err(format!("object type index {} out of range", other)),
    };
    args.path_at(key).cloned().map_err(|e| e.to_string())
}

macro_rules! no_body_filter {
    ($name:ident) => {
        impl Filter for $name {
            fn decl(&self) -> &FilterDecl {
                &self.decl
            }

            fn preflight(
                &self,
                store: &ObjectStore,
                args: &Arguments,
                cancel: &CancelToken,
            ) -> PreflightResult {
                self.preflight_impl(store, args, cancel)
            }
        }
    };
}

/// Creates a group, making any missing intermediate groups.
pub struct CreateGroup {
    decl: FilterDecl,
}

impl CreateGroup {
    pub fn new() -> Self {
        Self {
            decl: FilterDecl::new(
                "CreateGroup",
                "8a261d04-6b22-42c5-a37a-4ea7e48b1a01",
                "Create Group",
            )
            .description("Creates a group at the given path")
            .parameter(Parameter::string("path", "Group Path", "NewGroup")),
        }
    }

    fn preflight_impl(
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

        let path = match args.string_at("path").map_err(|e| e.to_string()) {
            Ok(raw) => match DataPath::parse(raw) {
                Ok(path) => path,
                Err(e) => {
                    result.actions.error(e.to_string());
                    return result;
                }
            },
            Err(e) => {
                result.actions.error(e);
                return result;
            }
        };
        if store.contains(&path) {
            result.actions.error(format!("'{}' already exists", path));
            return result;
        }

        result.actions.push(Action::CreateGroup { path });
        result
    }
}

impl Default for CreateGroup {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(CreateGroup);

/// Creates a default-filled array of a chosen element kind and shape.
pub struct CreateDataArray {
    decl: FilterDecl,
}

const SCALAR_CHOICES: [&str; 12] = [
    "i8", "u8", "i16", "u16", "i32", "u32", "i64", "u64", "f32", "f64", "bool", "utf8",
];

const SCALAR_KINDS: [ScalarType; 12] = [
    ScalarType::I8,
    ScalarType::U8,
    ScalarType::I16,
    ScalarType::U16,
    ScalarType::I32,
    ScalarType::U32,
    ScalarType::I64,
    ScalarType::U64,
    ScalarType::F32,
    ScalarType::F64,
    ScalarType::Bool,
    ScalarType::Utf8,
];

impl CreateDataArray {
    pub fn new() -> Self {
        Self {
            decl: FilterDecl::new(
                "CreateDataArray",
                "8a261d04-6b22-42c5-a37a-4ea7e48b1a02",
                "Create Data Array",
            )
            .description("Creates an array with a chosen element kind and shape")
            .parameter(Parameter::array_creation("output", "Created Array"))
            .parameter(Parameter::choice(
                "scalar_type",
                "Element Type",
                &SCALAR_CHOICES,
                8,
            ))
            .parameter(Parameter::IntVec(IntVecParam {
                info: ParamInfo::new("tuple_dims", "Tuple Dimensions"),
                len: 3,
                default: vec![1, 1, 1],
            }))
            .parameter(Parameter::int("components", "Components per Tuple", 1)),
        }
    }

    fn preflight_impl(
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

        let scalar = match args.int_at("scalar_type") {
            Ok(index) if (0..SCALAR_KINDS.len() as i64).contains(&index) => {
                SCALAR_KINDS[index as usize]
            }
            Ok(index) => {
                result
                    .actions
                    .error(format!("element type index {} out of range", index));
                return result;
            }
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        let dims = args.int_vec_at("tuple_dims").unwrap_or(&[1, 1, 1]);
        if dims.iter().any(|d| *d <= 0) {
            result
                .actions
                .error("tuple dimensions must all be positive");
            return result;
        }
        let components = args.int_at("components").unwrap_or(1);
        if components <= 0 {
            result.actions.error("component count must be positive");
            return result;
        }
        let path = match args.path_at("output") {
            Ok(path) => path.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        let tuple_dims: Vec<usize> = dims.iter().map(|d| *d as usize).collect();
        let array = ArrayData::placeholder(scalar, tuple_dims, vec![components as usize]);
        result.derive("tuple_count", array.tuple_count() as i64);
        result.actions.push(Action::CreateArray { path, array });
        result
    }
}

impl Default for CreateDataArray {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(CreateDataArray);

/// Moves a group or array under a new parent group.
pub struct MoveObject {
    decl: FilterDecl,
}

impl MoveObject {
    pub fn new() -> Self {
        let (params, links) = object_selector();
        let mut decl = FilterDecl::new(
            "MoveObject",
            "8a261d04-6b22-42c5-a37a-4ea7e48b1a03",
            "Move Object",
        )
        .description("Re-hangs an object under a new parent group")
        .links(links);
        for param in params {
            decl = decl.parameter(param);
        }
        decl = decl.parameter(Parameter::group_selection("dest", "Destination Group"));
        Self { decl }
    }

    fn preflight_impl(
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

        let path = match selected_path(args) {
            Ok(path) => path,
            Err(e) => {
                result.actions.error(e);
                return result;
            }
        };
        let dest = match args.path_at("dest") {
            Ok(dest) => dest.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        // Surface the cycle error at preflight, before anything commits.
        if let (Ok(subject), Ok(new_parent)) = (store.resolve(&path), store.resolve(&dest)) {
            if subject == new_parent || store.is_ancestor(subject, new_parent) {
                result
                    .actions
                    .error(format!("moving '{}' under '{}' would create a cycle", path, dest));
                return result;
            }
        }

        result.actions.push(Action::Move {
            path,
            new_parent: dest,
        });
        result
    }
}

impl Default for MoveObject {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(MoveObject);

/// Renames a group or array in place.
pub struct RenameObject {
    decl: FilterDecl,
}

impl RenameObject {
    pub fn new() -> Self {
        let (params, links) = object_selector();
        let mut decl = FilterDecl::new(
            "RenameObject",
            "8a261d04-6b22-42c5-a37a-4ea7e48b1a04",
            "Rename Object",
        )
        .links(links);
        for param in params {
            decl = decl.parameter(param);
        }
        decl = decl.parameter(Parameter::string("new_name", "New Name", ""));
        Self { decl }
    }

    fn preflight_impl(
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

        let path = match selected_path(args) {
            Ok(path) => path,
            Err(e) => {
                result.actions.error(e);
                return result;
            }
        };
        match args.string_at("new_name") {
            Ok(name) if !name.is_empty() && !name.contains('/') => {
                result.actions.push(Action::Rename {
                    path,
                    new_name: name.to_string(),
                });
            }
            Ok(_) => result
                .actions
                .error("new name must be non-empty and free of '/'"),
            Err(e) => result.actions.error(e.to_string()),
        }
        result
    }
}

impl Default for RenameObject {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(RenameObject);

/// Drops one parent edge; unreachable nodes are swept.
pub struct DeleteObject {
    decl: FilterDecl,
}

impl DeleteObject {
    pub fn new() -> Self {
        let (params, links) = object_selector();
        let mut decl = FilterDecl::new(
            "DeleteObject",
            "8a261d04-6b22-42c5-a37a-4ea7e48b1a05",
            "Delete Object",
        )
        .links(links);
        for param in params {
            decl = decl.parameter(param);
        }
        Self { decl }
    }

    fn preflight_impl(
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
        match selected_path(args) {
            Ok(path) => result.actions.push(Action::Delete { path }),
            Err(e) => result.actions.error(e),
        }
        result
    }
}

impl Default for DeleteObject {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(DeleteObject);

/// Deep-copies a subtree under a new parent.
pub struct CopyObject {
    decl: FilterDecl,
}

impl CopyObject {
    pub fn new() -> Self {
        let (params, links) = object_selector();
        let mut decl = FilterDecl::new(
            "CopyObject",
            "8a261d04-6b22-42c5-a37a-4ea7e48b1a06",
            "Copy Object",
        )
        .links(links);
        for param in params {
            decl = decl.parameter(param);
        }
        decl = decl
            .parameter(Parameter::group_selection("dest", "Destination Group"))
            .parameter(Parameter::string("new_name", "Copy Name", ""));
        Self { decl }
    }

    fn preflight_impl(
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

        let path = match selected_path(args) {
            Ok(path) => path,
            Err(e) => {
                result.actions.error(e);
                return result;
            }
        };
        let dest = match args.path_at("dest") {
            Ok(dest) => dest.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };
        let new_name = match args.string_at("new_name") {
            Ok(name) if !name.is_empty() => name.to_string(),
            Ok(_) => path.name().to_string(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };
        if store.contains(&dest.child(&new_name)) {
            result
                .actions
                .error(format!("'{}' already exists", dest.child(&new_name)));
            return result;
        }

        result.actions.push(Action::Copy {
            path,
            dest_parent: dest,
            new_name,
        });
        result
    }
}

impl Default for CopyObject {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(CopyObject);

/// Adds an additional parent edge, sharing the object between groups.
pub struct LinkObject {
    decl: FilterDecl,
}

impl LinkObject {
    pub fn new() -> Self {
        let (params, links) = object_selector();
        let mut decl = FilterDecl::new(
            "LinkObject",
            "8a261d04-6b22-42c5-a37a-4ea7e48b1a07",
            "Link Object",
        )
        .links(links);
        for param in params {
            decl = decl.parameter(param);
        }
        decl = decl.parameter(Parameter::group_selection("extra_parent", "Additional Parent"));
        Self { decl }
    }

    fn preflight_impl(
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

        let path = match selected_path(args) {
            Ok(path) => path,
            Err(e) => {
                result.actions.error(e);
                return result;
            }
        };
        let extra = match args.path_at("extra_parent") {
            Ok(extra) => extra.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        if let (Ok(subject), Ok(new_parent)) = (store.resolve(&path), store.resolve(&extra)) {
            if subject == new_parent || store.is_ancestor(subject, new_parent) {
                result.actions.error(format!(
                    "linking '{}' under '{}' would create a cycle",
                    path, extra
                ));
                return result;
            }
        }

        result.actions.push(Action::Link {
            path,
            extra_parent: extra,
        });
        result
    }
}

impl Default for LinkObject {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(LinkObject);

/// Sets grid geometry metadata on a group.
pub struct SetImageGeometry {
    decl: FilterDecl,
}

impl SetImageGeometry {
    pub fn new() -> Self {
        Self {
            decl: FilterDecl::new(
                "SetImageGeometry",
                "8a261d04-6b22-42c5-a37a-4ea7e48b1a08",
                "Set Image Geometry",
            )
            .parameter(Parameter::group_selection("group", "Target Group"))
            .parameter(Parameter::IntVec(IntVecParam {
                info: ParamInfo::new("dims", "Dimensions"),
                len: 3,
                default: vec![1, 1, 1],
            }))
            .parameter(Parameter::FloatVec(FloatVecParam {
                info: ParamInfo::new("spacing", "Spacing"),
                len: 3,
                default: vec![1.0, 1.0, 1.0],
            }))
            .parameter(Parameter::FloatVec(FloatVecParam {
                info: ParamInfo::new("origin", "Origin"),
                len: 3,
                default: vec![0.0, 0.0, 0.0],
            })),
        }
    }

    fn preflight_impl(
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

        let path = match args.path_at("group") {
            Ok(path) => path.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };
        let dims = args.int_vec_at("dims").unwrap_or(&[1, 1, 1]);
        if dims.iter().any(|d| *d <= 0) {
            result.actions.error("dimensions must all be positive");
            return result;
        }
        let spacing = args.float_vec_at("spacing").unwrap_or(&[1.0, 1.0, 1.0]);
        let origin = args.float_vec_at("origin").unwrap_or(&[0.0, 0.0, 0.0]);

        let geometry = ImageGeometry::new([dims[0] as usize, dims[1] as usize, dims[2] as usize])
            .spacing([spacing[0], spacing[1], spacing[2]])
            .origin([origin[0], origin[1], origin[2]]);
        result.derive("cell_count", geometry.element_count() as i64);
        result.actions.push(Action::UpdateGeometry { path, geometry });
        result
    }
}

impl Default for SetImageGeometry {
    fn default() -> Self {
        Self::new()
    }
}

no_body_filter!(SetImageGeometry);
