//! Built-in filters for the Strata engine.
//!
//! Structural filters cover store mutation (create, move, rename,
//! delete, copy, link, geometry); `GenerateColorTable` is the numeric
//! reference filter exercising the parallel substrate; `ImportObject`
//! pulls arrays from an external container through the [`ObjectReader`]
//! contract.

mod colormap;
mod import;
mod structural;

pub use colormap::GenerateColorTable;
pub use import::{ImportObject, ObjectReader};
pub use structural::{
    CopyObject, CreateDataArray, CreateGroup, DeleteObject, LinkObject, MoveObject, RenameObject,
    SetImageGeometry,
};

use std::sync::Arc;
use strata::FilterRegistry;

/// Register every filter that needs no external collaborator.
pub fn register_all(registry: &mut FilterRegistry) {
    registry.register(CreateGroup::new());
    registry.register(CreateDataArray::new());
    registry.register(MoveObject::new());
    registry.register(RenameObject::new());
    registry.register(DeleteObject::new());
    registry.register(CopyObject::new());
    registry.register(LinkObject::new());
    registry.register(SetImageGeometry::new());
    registry.register(GenerateColorTable::new());
}

/// Register the import filter with the container reader it consumes.
pub fn register_import(registry: &mut FilterRegistry, reader: Arc<dyn ObjectReader>) {
    registry.register(ImportObject::new(reader));
}
