//! Per-tuple color mapping through a monotonic control-point table.

use strata::{
    Action, AlgorithmError, Arguments, ArrayData, ArrayValues, CancelToken, DataParallel, Filter,
    FilterDecl, FilterError, ObjectStore, ParamInfo, Parameter, PreflightResult, ScalarType,
    TableParam,
};

/// Maps a scalar array to RGB byte triplets.
///
/// The control-point table has rows `[position, r, g, b]` with channel
/// values in `[0, 1]` and strictly increasing positions. Input values
/// are normalized over the array's min/max, then interpolated linearly
/// between the surrounding control points. The per-tuple loop runs on
/// the data-parallel substrate; the normalization bounds and the bin
/// table are computed once on the invoking thread before dispatch.
pub struct GenerateColorTable {
    decl: FilterDecl,
}

impl GenerateColorTable {
    pub fn new() -> Self {
        let mut input = Parameter::array_selection("input", "Input Array");
        if let Parameter::ArraySelection(p) = &mut input {
            p.allowed_scalars = vec![
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
            ];
            p.component_dims = Some(vec![1]);
        }
        Self {
            decl: FilterDecl::new(
                "GenerateColorTable",
                "8a261d04-6b22-42c5-a37a-4ea7e48b1a10",
                "Generate Color Table",
            )
            .description("Maps a scalar array to RGB bytes through a control-point table")
            .parameter(input)
            .parameter(Parameter::array_creation("output", "Color Array"))
            .parameter(Parameter::Table(TableParam {
                info: ParamInfo::new("control_points", "Control Points"),
                cols: 4,
                min_rows: 2,
            })),
        }
    }

    fn control_points(args: &Arguments) -> Result<Vec<[f64; 4]>, String> {
        let rows = args.table_at("control_points").map_err(|e| e.to_string())?;
        let mut points = Vec::with_capacity(rows.len());
        for row in rows {
            points.push([row[0], row[1], row[2], row[3]]);
        }
        for pair in points.windows(2) {
            if pair[1][0] <= pair[0][0] {
                return Err("control point positions must be strictly increasing".to_string());
            }
        }
        Ok(points)
    }
}

impl Default for GenerateColorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Filter for GenerateColorTable {
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

        if let Err(e) = Self::control_points(args) {
            result.actions.error(e);
            return result;
        }
        let input = match args.path_at("input") {
            Ok(path) => path.clone(),
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
        let tuple_dims = match store.array_at(&input) {
            Ok(array) => array.tuple_dims.clone(),
            Err(e) => {
                result.actions.error(e.to_string());
                return result;
            }
        };

        let array = ArrayData::placeholder(ScalarType::U8, tuple_dims, vec![3]);
        result.derive("tuple_count", array.tuple_count() as i64);
        result.actions.push(Action::CreateArray {
            path: output,
            array,
        });
        result
    }

    fn body(
        &self,
        store: &mut ObjectStore,
        args: &Arguments,
        cancel: &CancelToken,
    ) -> Result<Vec<String>, FilterError> {
        let points = Self::control_points(args).map_err(AlgorithmError::new)?;
        let input_path = args.path_at("input")?;
        let output_path = args.path_at("output")?;

        // Widen the input once, on the invoking thread.
        let input = store.array_at(input_path)?;
        let tuple_count = input.tuple_count();
        let values = input
            .values
            .as_ref()
            .ok_or_else(|| AlgorithmError::new(format!("'{}' has no backing storage", input_path)))?;
        let scalars: Vec<f64> = (0..tuple_count)
            .map(|i| values.get_f64(i).unwrap_or(0.0))
            .collect();

        let (min, max) = scalars.iter().fold((f64::MAX, f64::MIN), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
        let span = if max > min { max - min } else { 1.0 };

        let mut rgb = vec![0u8; tuple_count * 3];
        DataParallel::new()
            .for_each_slice_chunk(&mut rgb, 3, cancel, |first_tuple, chunk| {
                for (offset, triplet) in chunk.chunks_mut(3).enumerate() {
                    let value = scalars[first_tuple + offset];
                    let normalized = ((value - min) / span).clamp(0.0, 1.0);
                    let color = interpolate(&points, normalized);
                    triplet.copy_from_slice(&color);
                }
            })
            .map_err(|_| FilterError::Cancelled)?;

        let output = store.array_at_mut(output_path)?;
        output.set_values(ArrayValues::U8(rgb))?;
        Ok(vec![])
    }
}

/// Linear interpolation between the control points surrounding `t`.
fn interpolate(points: &[[f64; 4]], t: f64) -> [u8; 3] {
    let to_byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;

    let first = points.first().expect("validated: at least two rows");
    let last = points.last().expect("validated: at least two rows");
    if t <= first[0] {
        return [to_byte(first[1]), to_byte(first[2]), to_byte(first[3])];
    }
    if t >= last[0] {
        return [to_byte(last[1]), to_byte(last[2]), to_byte(last[3])];
    }

    let upper = points.iter().position(|p| p[0] >= t).expect("t below last");
    let lo = points[upper - 1];
    let hi = points[upper];
    let frac = (t - lo[0]) / (hi[0] - lo[0]);
    [
        to_byte(lo[1] + (hi[1] - lo[1]) * frac),
        to_byte(lo[2] + (hi[2] - lo[2]) * frac),
        to_byte(lo[3] + (hi[3] - lo[3]) * frac),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use strata::{ArgValue, BoundFilter, DataPath};

    fn path(s: &str) -> DataPath {
        DataPath::parse(s).unwrap()
    }

    fn four_point_table() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0, 0.0, 1.0],
            vec![0.4, 0.0, 1.0, 0.0],
            vec![0.8, 1.0, 1.0, 0.0],
            vec![1.0, 1.0, 0.0, 0.0],
        ]
    }

    fn store_with_scalars(count: usize) -> ObjectStore {
        let mut store = ObjectStore::new();
        store.make_path(&path("Recon")).unwrap();
        let mut array = ArrayData::placeholder(ScalarType::F32, vec![count], vec![1]);
        let values: Vec<f32> = (0..count).map(|i| (i as f32 * 0.73).sin()).collect();
        array.set_values(ArrayValues::F32(values)).unwrap();
        store
            .insert_array(Some(&path("Recon")), "Scalars", array)
            .unwrap();
        store
    }

    fn args() -> Arguments {
        Arguments::new()
            .with("input", path("Recon/Scalars"))
            .with("output", path("Recon/Colors"))
            .with("control_points", ArgValue::Table(four_point_table()))
    }

    #[test]
    fn test_color_mapping_matches_reference_rows() {
        // Scenario: 37,989 tuples through a 4-point table, checked
        // row-by-row against an independently computed reference.
        let tuple_count = 37_989;
        let mut store = store_with_scalars(tuple_count);
        let mut bound = BoundFilter::new(Arc::new(GenerateColorTable::new()), args());
        let result = bound.run_execute(&mut store, &CancelToken::new());
        assert!(result.is_ok(), "{:?}", result.errors);

        let input: Vec<f64> = store
            .array_at(&path("Recon/Scalars"))
            .unwrap()
            .values
            .as_ref()
            .unwrap()
            .as_f32()
            .unwrap()
            .iter()
            .map(|v| *v as f64)
            .collect();
        let output = store.array_at(&path("Recon/Colors")).unwrap();
        assert_eq!(output.tuple_count(), tuple_count);
        assert_eq!(output.component_dims, vec![3]);
        let rgb = output.values.as_ref().unwrap().as_u8().unwrap();

        // Reference computed independently of the filter's loop
        let table = four_point_table();
        let min = input.iter().cloned().fold(f64::MAX, f64::min);
        let max = input.iter().cloned().fold(f64::MIN, f64::max);
        let reference = |v: f64| -> [u8; 3] {
            let t = ((v - min) / (max - min)).clamp(0.0, 1.0);
            let to_byte = |c: f64| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
            if t <= table[0][0] {
                return [to_byte(table[0][1]), to_byte(table[0][2]), to_byte(table[0][3])];
            }
            for pair in table.windows(2) {
                if t <= pair[1][0] {
                    let f = (t - pair[0][0]) / (pair[1][0] - pair[0][0]);
                    return [
                        to_byte(pair[0][1] + (pair[1][1] - pair[0][1]) * f),
                        to_byte(pair[0][2] + (pair[1][2] - pair[0][2]) * f),
                        to_byte(pair[0][3] + (pair[1][3] - pair[0][3]) * f),
                    ];
                }
            }
            let last = table.last().unwrap();
            [to_byte(last[1]), to_byte(last[2]), to_byte(last[3])]
        };

        for (i, value) in input.iter().enumerate() {
            let expected = reference(*value);
            assert_eq!(
                &rgb[i * 3..i * 3 + 3],
                &expected,
                "tuple {} mismatch",
                i
            );
        }
    }

    #[test]
    fn test_non_monotonic_table_fails_preflight() {
        let store = store_with_scalars(8);
        let bad = Arguments::new()
            .with("input", path("Recon/Scalars"))
            .with("output", path("Recon/Colors"))
            .with(
                "control_points",
                ArgValue::Table(vec![
                    vec![0.0, 0.0, 0.0, 1.0],
                    vec![0.8, 0.0, 1.0, 0.0],
                    vec![0.4, 1.0, 0.0, 0.0],
                ]),
            );
        let mut bound = BoundFilter::new(Arc::new(GenerateColorTable::new()), bad);
        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(!preflight.is_valid());
        assert!(preflight.actions.errors()[0].contains("increasing"));
    }

    #[test]
    fn test_output_shape_predicted_in_preflight() {
        let store = store_with_scalars(12);
        let mut bound = BoundFilter::new(Arc::new(GenerateColorTable::new()), args());
        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(preflight.is_valid());
        assert_eq!(preflight.derived.get("tuple_count"), Some(&ArgValue::Int(12)));

        // The predicted action creates a u8, 3-component array
        match &preflight.actions.actions()[0] {
            Action::CreateArray { array, .. } => {
                assert_eq!(array.scalar, ScalarType::U8);
                assert_eq!(array.component_dims, vec![3]);
                assert_eq!(array.tuple_dims, vec![12]);
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn test_missing_input_fails_preflight() {
        // The input selection points at nothing: the parameter check
        // invalidates the whole preflight.
        let mut store = ObjectStore::new();
        store.make_path(&path("Recon")).unwrap();

        let mut bound = BoundFilter::new(Arc::new(GenerateColorTable::new()), args());
        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(!preflight.is_valid());
        assert!(preflight.actions.errors()[0].contains("does not exist"));
    }

    #[test]
    fn test_wrong_component_count_rejected() {
        let mut store = ObjectStore::new();
        store.make_path(&path("Recon")).unwrap();
        store
            .insert_array(
                Some(&path("Recon")),
                "Vectors",
                ArrayData::placeholder(ScalarType::F32, vec![4], vec![3]),
            )
            .unwrap();

        let bad = Arguments::new()
            .with("input", path("Recon/Vectors"))
            .with("output", path("Recon/Colors"))
            .with("control_points", ArgValue::Table(four_point_table()));
        let mut bound = BoundFilter::new(Arc::new(GenerateColorTable::new()), bad);
        let preflight = bound.run_preflight(&store, &CancelToken::new());
        assert!(!preflight.is_valid());
    }
}
