//! Shape normalizer.
//!
//! BSON has no multi-dimensional array type, so the encoder only ever sees
//! scalars, flat sequences and documents of flat sequences. [`split`] breaks
//! an array with more than one non-trivial extent into pieces along its last
//! axis (a matrix becomes its rows), and [`merge`] stacks decoded pieces back
//! together when they are structurally identical.
//!
//! ```rust
//! use ndbson::shape::{merge, split};
//! use ndbson::{NativeValue, NdArray};
//!
//! let m = NativeValue::Array(NdArray::matrix(3, 4, (0..12).map(f64::from).collect::<Vec<_>>()).unwrap());
//! let rows = split(&m).unwrap();
//! assert_eq!(rows.len(), 3);
//! assert_eq!(merge(rows), m);
//! ```

use crate::value::{ArrayData, CellArray, NativeValue, NdArray, Record, RecordArray};

/// Pads a shape to two extents and drops trailing singletons past the second.
///
/// # Examples
///
/// ```rust
/// use ndbson::shape::normalize;
///
/// assert_eq!(normalize(vec![]), vec![1, 1]);
/// assert_eq!(normalize(vec![5]), vec![5, 1]);
/// assert_eq!(normalize(vec![2, 3, 1, 1]), vec![2, 3]);
/// assert_eq!(normalize(vec![2, 1, 4]), vec![2, 1, 4]);
/// ```
#[must_use]
pub fn normalize(mut shape: Vec<usize>) -> Vec<usize> {
    while shape.len() < 2 {
        shape.push(1);
    }
    while shape.len() > 2 && shape.last() == Some(&1) {
        shape.pop();
    }
    shape
}

/// Number of elements a shape holds.
#[must_use]
pub fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Column-major flat position of a multi-dimensional index.
///
/// Index components past the shape's rank must be zero.
#[must_use]
pub fn linear_index(shape: &[usize], index: &[usize]) -> Option<usize> {
    let mut position = 0;
    let mut stride = 1;
    for (axis, &i) in index.iter().enumerate() {
        let extent = shape.get(axis).copied().unwrap_or(1);
        if i >= extent {
            return None;
        }
        position += i * stride;
        stride *= extent;
    }
    Some(position)
}

/// Renders a shape as `2x3x4`.
#[must_use]
pub fn describe(shape: &[usize]) -> String {
    shape
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join("x")
}

/// Returns `true` if more than one extent is greater than one.
#[must_use]
pub fn is_multidimensional(shape: &[usize]) -> bool {
    shape.iter().filter(|&&d| d > 1).count() > 1
}

/// Flat indices of each piece `split` produces, with the piece shape.
fn split_plan(shape: &[usize]) -> (Vec<usize>, Vec<Vec<usize>>) {
    if shape.len() == 2 {
        let (rows, cols) = (shape[0], shape[1]);
        let pieces = (0..rows)
            .map(|i| (0..cols).map(|j| i + j * rows).collect())
            .collect();
        (vec![1, cols], pieces)
    } else {
        let (leading, last) = shape.split_at(shape.len() - 1);
        let chunk = numel(leading);
        let pieces = (0..last[0])
            .map(|k| (k * chunk..(k + 1) * chunk).collect())
            .collect();
        (normalize(leading.to_vec()), pieces)
    }
}

/// Splits an array, container or record array along its last axis.
///
/// A matrix becomes a `1 x n` container of its rows; an N-d value becomes
/// its slices over the last axis, which the encoder splits again in turn.
/// Returns `None` for values with at most one non-trivial extent.
#[must_use]
pub fn split(value: &NativeValue) -> Option<CellArray> {
    let shape = match value {
        NativeValue::Array(a) => a.shape(),
        NativeValue::Container(c) => c.shape(),
        NativeValue::RecordArray(r) => r.shape(),
        _ => return None,
    };
    if !is_multidimensional(shape) {
        return None;
    }
    let (piece_shape, plan) = split_plan(shape);
    let mut pieces = Vec::with_capacity(plan.len());
    for indices in &plan {
        let piece = match value {
            NativeValue::Array(a) => NativeValue::Array(
                NdArray::new(piece_shape.clone(), a.data().gather(indices)).ok()?,
            ),
            NativeValue::Container(c) => {
                NativeValue::Container(CellArray::new(piece_shape.clone(), c.gather(indices)).ok()?)
            }
            NativeValue::RecordArray(r) => NativeValue::RecordArray(
                RecordArray::new(piece_shape.clone(), r.fields().to_vec(), r.gather(indices))
                    .ok()?,
            ),
            _ => return None,
        };
        pieces.push(piece);
    }
    tracing::trace!(
        shape = %describe(shape),
        pieces = pieces.len(),
        "split along last axis"
    );
    Some(CellArray::row(pieces))
}

/// Shape of `n` stacked pieces of `piece`, plus the reordering of their
/// concatenated elements when pieces are rows.
///
/// `1 x 1` pieces form a `1 x n` row, `1 x k` rows stack into `n x k`, and
/// anything else gains a trailing axis of extent `n`.
fn stack_plan(piece: &[usize], n: usize) -> (Vec<usize>, Option<Vec<usize>>) {
    match piece {
        [1, 1] => (vec![1, n], None),
        [1, k] => {
            let k = *k;
            let order = (0..k)
                .flat_map(|j| (0..n).map(move |i| i * k + j))
                .collect();
            (vec![n, k], Some(order))
        }
        _ => {
            let mut shape = piece.to_vec();
            shape.push(n);
            (normalize(shape), None)
        }
    }
}

fn reorder<T: Clone>(items: Vec<T>, order: Option<Vec<usize>>) -> Vec<T> {
    match order {
        Some(order) => order.iter().map(|&i| items[i].clone()).collect(),
        None => items,
    }
}

fn merge_arrays(elements: &[NativeValue]) -> Option<NativeValue> {
    let mut views = elements.iter().map(NativeValue::to_array_view);
    let (shape, mut data) = views.next()??;
    if data.is_empty() {
        return None;
    }
    for view in views {
        let (next_shape, next_data) = view?;
        if next_shape != shape || !data.extend_from(&next_data) {
            return None;
        }
    }
    let (merged_shape, order) = stack_plan(&shape, elements.len());
    let data: ArrayData = match order {
        Some(order) => data.gather(&order),
        None => data,
    };
    NdArray::new(merged_shape, data).ok().map(NativeValue::Array)
}

fn merge_records(elements: &[NativeValue]) -> Option<NativeValue> {
    let mut records: Vec<Record> = Vec::with_capacity(elements.len());
    let mut fields: Option<Vec<String>> = None;
    let mut piece_shape: Option<Vec<usize>> = None;
    for element in elements {
        let (shape, recs) = match element {
            NativeValue::Record(r) => (vec![1, 1], std::slice::from_ref(r)),
            NativeValue::RecordArray(r) if !r.is_empty() => (r.shape().to_vec(), r.records()),
            _ => return None,
        };
        let first = recs.first()?;
        let names = fields.get_or_insert_with(|| first.keys().cloned().collect());
        if !first.has_fields(names) || *piece_shape.get_or_insert_with(|| shape.clone()) != shape {
            return None;
        }
        records.extend_from_slice(recs);
    }
    let (merged_shape, order) = stack_plan(&piece_shape?, elements.len());
    RecordArray::new(merged_shape, fields?, reorder(records, order))
        .ok()
        .map(NativeValue::RecordArray)
}

fn merge_containers(elements: &[NativeValue]) -> Option<NativeValue> {
    let mut cells = Vec::new();
    let mut piece_shape: Option<&[usize]> = None;
    for element in elements {
        let inner = element.as_container().filter(|c| !c.is_empty())?;
        if *piece_shape.get_or_insert(inner.shape()) != inner.shape() {
            return None;
        }
        cells.extend(inner.elements().iter().cloned());
    }
    let (merged_shape, order) = stack_plan(piece_shape?, elements.len());
    CellArray::new(merged_shape, reorder(cells, order))
        .ok()
        .map(NativeValue::Container)
}

/// Stacks the elements of a container into one value when they are
/// structurally identical.
///
/// Numeric, logical and datetime elements of one kind and shape become an
/// array; records (and record arrays) with the same ordered fields become a
/// record array; containers of the same shape become one larger container.
/// Text and binary elements are never merged. Anything else, or a container
/// with fewer than two elements, comes back unchanged.
#[must_use]
pub fn merge(cells: CellArray) -> NativeValue {
    let elements = cells.elements();
    if elements.len() < 2 {
        return NativeValue::Container(cells);
    }
    let merged = match &elements[0] {
        NativeValue::Scalar(_)
        | NativeValue::Logical(_)
        | NativeValue::DateTime(_)
        | NativeValue::Array(_) => merge_arrays(elements),
        NativeValue::Record(_) | NativeValue::RecordArray(_) => merge_records(elements),
        NativeValue::Container(_) => merge_containers(elements),
        NativeValue::Text(_) | NativeValue::Binary(_) | NativeValue::Opaque(_) => None,
    };
    match merged {
        Some(value) => {
            tracing::trace!(count = elements.len(), merged = %value, "merged container");
            value
        }
        None => NativeValue::Container(cells),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    fn range(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_vectors_pass_through() {
        assert!(split(&NativeValue::from(vec![1.0, 2.0, 3.0])).is_none());
        let column = NdArray::new(vec![3, 1], vec![1.0, 2.0, 3.0]).unwrap();
        assert!(split(&NativeValue::Array(column)).is_none());
        assert!(split(&NativeValue::from(4.0)).is_none());
        let singleton_axes = NdArray::new(vec![1, 1, 5], range(5)).unwrap();
        assert!(split(&NativeValue::Array(singleton_axes)).is_none());
    }

    #[test]
    fn test_matrix_splits_into_rows() {
        let m = NdArray::matrix(2, 3, vec![1i32, 2, 3, 4, 5, 6]).unwrap();
        let rows = split(&NativeValue::Array(m)).unwrap();
        assert_eq!(
            rows.elements(),
            &[
                NativeValue::from(vec![1i32, 2, 3]),
                NativeValue::from(vec![4i32, 5, 6]),
            ]
        );
    }

    #[test]
    fn test_nd_splits_along_last_axis() {
        let a = NdArray::new(vec![2, 3, 4], range(24)).unwrap();
        let slices = split(&NativeValue::Array(a)).unwrap();
        assert_eq!(slices.len(), 4);
        let second = slices.elements()[1].as_array().unwrap();
        assert_eq!(second.shape(), &[2, 3]);
        assert_eq!(second.data(), &ArrayData::Float64(range(6).iter().map(|x| x + 6.0).collect()));
    }

    #[test]
    fn test_merge_rows_restores_matrix() {
        let m = NativeValue::Array(NdArray::matrix(3, 4, range(12)).unwrap());
        assert_eq!(merge(split(&m).unwrap()), m);
    }

    #[test]
    fn test_merge_restores_nd() {
        let a = NativeValue::Array(NdArray::new(vec![2, 3, 4], range(24)).unwrap());
        let slices = split(&a).unwrap();
        let rebuilt: Vec<NativeValue> = slices
            .elements()
            .iter()
            .map(|s| merge(split(s).unwrap()))
            .collect();
        assert_eq!(merge(CellArray::row(rebuilt)), a);
    }

    #[test]
    fn test_merge_scalars_into_row() {
        let cells = CellArray::row(vec![NativeValue::from(1.0), NativeValue::from(2.0)]);
        assert_eq!(merge(cells), NativeValue::from(vec![1.0, 2.0]));

        let dates = CellArray::row(vec![NativeValue::DateTime(1.0), NativeValue::DateTime(2.0)]);
        let merged = merge(dates);
        let arr = merged.as_array().unwrap();
        assert_eq!(arr.data(), &ArrayData::DateTime(vec![1.0, 2.0]));
    }

    #[test]
    fn test_merge_refuses_mixed_kinds() {
        let cells = CellArray::row(vec![
            NativeValue::Scalar(Scalar::Float64(1.0)),
            NativeValue::Scalar(Scalar::Int32(2)),
        ]);
        assert!(merge(cells).is_container());

        let cells = CellArray::row(vec![NativeValue::from("a"), NativeValue::from(1.0)]);
        assert!(merge(cells).is_container());

        let cells = CellArray::row(vec![NativeValue::from(vec![1.0, 2.0]), NativeValue::from(vec![1.0])]);
        assert!(merge(cells).is_container());
    }

    #[test]
    fn test_text_never_merges() {
        let cells = CellArray::row(vec![NativeValue::from("ab"), NativeValue::from("cd")]);
        assert!(merge(cells).is_container());
    }

    #[test]
    fn test_merge_records() {
        let rec = |x: f64| -> Record { [("x".to_string(), NativeValue::from(x))].into_iter().collect() };
        let merged = merge(CellArray::row(vec![
            NativeValue::Record(rec(1.0)),
            NativeValue::Record(rec(2.0)),
        ]));
        let arr = merged.as_record_array().unwrap();
        assert_eq!(arr.shape(), &[1, 2]);
        assert_eq!(arr.records()[1], rec(2.0));

        let mut other = Record::new();
        other.insert("y", NativeValue::from(1.0));
        let unmerged = merge(CellArray::row(vec![
            NativeValue::Record(rec(1.0)),
            NativeValue::Record(other),
        ]));
        assert!(unmerged.is_container());
    }

    #[test]
    fn test_single_element_is_unchanged() {
        let cells = CellArray::row(vec![NativeValue::from(1.0)]);
        assert!(merge(cells).is_container());
    }

    #[test]
    fn test_linear_index() {
        assert_eq!(linear_index(&[2, 3], &[1, 2]), Some(5));
        assert_eq!(linear_index(&[2, 3], &[1, 2, 0]), Some(5));
        assert_eq!(linear_index(&[2, 3], &[2, 0]), None);
        assert_eq!(describe(&[2, 3, 4]), "2x3x4");
    }
}
