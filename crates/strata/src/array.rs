//! Typed array payloads: element kinds, shapes, and backing storage.
//!
//! An array carries a tuple shape and an independent component shape.
//! During preflight only the metadata exists (`values` is `None`); commit
//! allocates or transfers the backing storage.

use serde::{Deserialize, Serialize};

use crate::store::PathError;

/// Primitive element kind of an array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
    Bool,
    Utf8,
}

impl ScalarType {
    /// Size in bytes of one element; strings report 0 (variable).
    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 | ScalarType::Bool => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::I64 | ScalarType::U64 | ScalarType::F64 => 8,
            ScalarType::Utf8 => 0,
        }
    }

    /// True for the integer and floating-point kinds.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, ScalarType::Bool | ScalarType::Utf8)
    }

    /// Stable textual name, matching the serde representation.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::I8 => "i8",
            ScalarType::U8 => "u8",
            ScalarType::I16 => "i16",
            ScalarType::U16 => "u16",
            ScalarType::I32 => "i32",
            ScalarType::U32 => "u32",
            ScalarType::I64 => "i64",
            ScalarType::U64 => "u64",
            ScalarType::F32 => "f32",
            ScalarType::F64 => "f64",
            ScalarType::Bool => "bool",
            ScalarType::Utf8 => "utf8",
        }
    }
}

/// Where an array's backing storage lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageClass {
    #[default]
    InMemory,
    OutOfCore,
}

/// Backing storage, one vector variant per element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayValues {
    I8(Vec<i8>),
    U8(Vec<u8>),
    I16(Vec<i16>),
    U16(Vec<u16>),
    I32(Vec<i32>),
    U32(Vec<u32>),
    I64(Vec<i64>),
    U64(Vec<u64>),
    F32(Vec<f32>),
    F64(Vec<f64>),
    Bool(Vec<bool>),
    Utf8(Vec<String>),
}

impl ArrayValues {
    /// Allocate default-filled storage for `len` elements of `scalar`.
    pub fn zeroed(scalar: ScalarType, len: usize) -> Self {
        match scalar {
            ScalarType::I8 => ArrayValues::I8(vec![0; len]),
            ScalarType::U8 => ArrayValues::U8(vec![0; len]),
            ScalarType::I16 => ArrayValues::I16(vec![0; len]),
            ScalarType::U16 => ArrayValues::U16(vec![0; len]),
            ScalarType::I32 => ArrayValues::I32(vec![0; len]),
            ScalarType::U32 => ArrayValues::U32(vec![0; len]),
            ScalarType::I64 => ArrayValues::I64(vec![0; len]),
            ScalarType::U64 => ArrayValues::U64(vec![0; len]),
            ScalarType::F32 => ArrayValues::F32(vec![0.0; len]),
            ScalarType::F64 => ArrayValues::F64(vec![0.0; len]),
            ScalarType::Bool => ArrayValues::Bool(vec![false; len]),
            ScalarType::Utf8 => ArrayValues::Utf8(vec![String::new(); len]),
        }
    }

    /// The element kind of this storage.
    pub fn scalar_type(&self) -> ScalarType {
        match self {
            ArrayValues::I8(_) => ScalarType::I8,
            ArrayValues::U8(_) => ScalarType::U8,
            ArrayValues::I16(_) => ScalarType::I16,
            ArrayValues::U16(_) => ScalarType::U16,
            ArrayValues::I32(_) => ScalarType::I32,
            ArrayValues::U32(_) => ScalarType::U32,
            ArrayValues::I64(_) => ScalarType::I64,
            ArrayValues::U64(_) => ScalarType::U64,
            ArrayValues::F32(_) => ScalarType::F32,
            ArrayValues::F64(_) => ScalarType::F64,
            ArrayValues::Bool(_) => ScalarType::Bool,
            ArrayValues::Utf8(_) => ScalarType::Utf8,
        }
    }

    /// Number of stored elements.
    pub fn len(&self) -> usize {
        match self {
            ArrayValues::I8(v) => v.len(),
            ArrayValues::U8(v) => v.len(),
            ArrayValues::I16(v) => v.len(),
            ArrayValues::U16(v) => v.len(),
            ArrayValues::I32(v) => v.len(),
            ArrayValues::U32(v) => v.len(),
            ArrayValues::I64(v) => v.len(),
            ArrayValues::U64(v) => v.len(),
            ArrayValues::F32(v) => v.len(),
            ArrayValues::F64(v) => v.len(),
            ArrayValues::Bool(v) => v.len(),
            ArrayValues::Utf8(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Element at `index` widened to f64, for numeric kinds.
    pub fn get_f64(&self, index: usize) -> Option<f64> {
        match self {
            ArrayValues::I8(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::U8(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::I16(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::U16(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::I32(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::U32(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::I64(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::U64(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::F32(v) => v.get(index).map(|x| *x as f64),
            ArrayValues::F64(v) => v.get(index).copied(),
            ArrayValues::Bool(_) | ArrayValues::Utf8(_) => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match self {
            ArrayValues::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8_mut(&mut self) -> Option<&mut Vec<u8>> {
        match self {
            ArrayValues::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match self {
            ArrayValues::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32_mut(&mut self) -> Option<&mut Vec<i32>> {
        match self {
            ArrayValues::I32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<&[f32]> {
        match self {
            ArrayValues::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f32_mut(&mut self) -> Option<&mut Vec<f32>> {
        match self {
            ArrayValues::F32(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match self {
            ArrayValues::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            ArrayValues::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<&[bool]> {
        match self {
            ArrayValues::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_utf8(&self) -> Option<&[String]> {
        match self {
            ArrayValues::Utf8(v) => Some(v),
            _ => None,
        }
    }
}

/// A typed, shaped array payload.
///
/// `tuple_dims` and `component_dims` are independent: a 2x3 image of RGB
/// bytes has tuple dims `[2, 3]` and component dims `[3]`. `values` is
/// `None` while the array is a preflight placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayData {
    pub scalar: ScalarType,
    pub tuple_dims: Vec<usize>,
    pub component_dims: Vec<usize>,
    #[serde(default)]
    pub storage: StorageClass,
    #[serde(default)]
    pub values: Option<ArrayValues>,
}

impl ArrayData {
    /// A placeholder array: shape metadata only, no backing storage.
    pub fn placeholder(
        scalar: ScalarType,
        tuple_dims: Vec<usize>,
        component_dims: Vec<usize>,
    ) -> Self {
        Self {
            scalar,
            tuple_dims,
            component_dims,
            storage: StorageClass::InMemory,
            values: None,
        }
    }

    /// Number of tuples (product of tuple dims).
    pub fn tuple_count(&self) -> usize {
        self.tuple_dims.iter().product()
    }

    /// Components per tuple (product of component dims).
    pub fn component_count(&self) -> usize {
        self.component_dims.iter().product()
    }

    /// Total element count.
    pub fn total_elements(&self) -> usize {
        self.tuple_count() * self.component_count()
    }

    /// True while this array has no backing storage.
    pub fn is_placeholder(&self) -> bool {
        self.values.is_none()
    }

    /// Allocate default-filled backing storage matching the shape.
    ///
    /// Fails if storage is already present with a mismatched length.
    pub fn allocate(&mut self) -> Result<(), PathError> {
        let total = self.total_elements();
        match &self.values {
            Some(values) if values.len() != total => Err(PathError::ShapeMismatch {
                expected: total,
                found: values.len(),
            }),
            Some(_) => Ok(()),
            None => {
                self.values = Some(ArrayValues::zeroed(self.scalar, total));
                Ok(())
            }
        }
    }

    /// Install externally produced storage, checking kind and length.
    pub fn set_values(&mut self, values: ArrayValues) -> Result<(), PathError> {
        if values.scalar_type() != self.scalar {
            return Err(PathError::WrongType {
                path: String::new(),
                expected: self.scalar.name().to_string(),
            });
        }
        let total = self.total_elements();
        if values.len() != total {
            return Err(PathError::ShapeMismatch {
                expected: total,
                found: values.len(),
            });
        }
        self.values = Some(values);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes() {
        let array = ArrayData::placeholder(ScalarType::U8, vec![2, 3], vec![4]);
        assert_eq!(array.tuple_count(), 6);
        assert_eq!(array.component_count(), 4);
        assert_eq!(array.total_elements(), 24);
        assert!(array.is_placeholder());
    }

    #[test]
    fn test_allocate() {
        let mut array = ArrayData::placeholder(ScalarType::F32, vec![5], vec![2]);
        array.allocate().unwrap();
        assert!(!array.is_placeholder());
        assert_eq!(array.values.as_ref().unwrap().len(), 10);
        assert_eq!(array.values.as_ref().unwrap().as_f32().unwrap()[3], 0.0);

        // Re-allocation of a correctly sized array is a no-op
        array.allocate().unwrap();
    }

    #[test]
    fn test_set_values_checks_kind_and_length() {
        let mut array = ArrayData::placeholder(ScalarType::U8, vec![3], vec![1]);
        assert!(array.set_values(ArrayValues::F32(vec![0.0; 3])).is_err());
        assert!(array.set_values(ArrayValues::U8(vec![0; 2])).is_err());
        array.set_values(ArrayValues::U8(vec![1, 2, 3])).unwrap();
        assert_eq!(array.values.unwrap().as_u8().unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn test_scalar_type_names_roundtrip() {
        for scalar in [
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
        ] {
            let json = serde_json::to_string(&scalar).unwrap();
            assert_eq!(json, format!("\"{}\"", scalar.name()));
            let back: ScalarType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, scalar);
        }
    }

    #[test]
    fn test_get_f64_widening() {
        let values = ArrayValues::I16(vec![-3, 7]);
        assert_eq!(values.get_f64(0), Some(-3.0));
        assert_eq!(values.get_f64(1), Some(7.0));
        assert_eq!(values.get_f64(2), None);
        assert_eq!(ArrayValues::Bool(vec![true]).get_f64(0), None);
    }
}
