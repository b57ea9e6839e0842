//! Integration tests for the column descriptor hand-off.
//!
//! These tests exercise producer → descriptor → consumer paths using host
//! memory standing in for device buffers (no CUDA device required).

use std::ffi::c_void;
use std::sync::Arc;

use arrow_array::{Float32Array, Int32Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use gpu_column_interop::arrow::{record_batch_to_host_columns, views_to_record_batch, HostColumn};
use gpu_column_interop::column::validity;
use gpu_column_interop::column::array_interface::{columns_from_json, columns_to_json, ArrayInterface};
use gpu_column_interop::consumer::{build_unsafe_rows, views_from_descriptors, FeatureMatrix, InfoField};
use gpu_column_interop::{ColumnConfig, ColumnError, ColumnView, ErrorKind, GpuColumnData, TypeId, Violation};

// ---------------------------------------------------------------------------
// Helper
// ---------------------------------------------------------------------------

fn int32_bytes(values: &[i32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

// ---------------------------------------------------------------------------
// Descriptor scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_dense_int32_column() {
    let data = int32_bytes(&[100, 101, 102, 103, 104]);
    let desc = GpuColumnData::new(data.as_ptr().cast(), std::ptr::null(), 4, 5, TypeId::Int32.as_raw(), 0);

    let view = unsafe { ColumnView::from_descriptor(&desc) }.unwrap();
    assert_eq!(view.value_bytes(3).unwrap(), Some(&data[12..16]));
    assert_eq!(view.value::<i32>(3).unwrap(), Some(103));
    assert!((0..5).all(|row| view.is_valid(row).unwrap()));
}

#[test]
fn test_masked_column_has_two_nulls() {
    let data = int32_bytes(&[1, 0, 3, 0, 5]);
    let mask = validity::build_mask([true, false, true, false, true]);
    let desc = GpuColumnData::with_validity(
        data.as_ptr().cast(),
        mask.as_ptr().cast(),
        TypeId::Int32,
        5,
        2,
    );

    let view = unsafe { ColumnView::from_descriptor_with(&desc, &ColumnConfig::default()) }.unwrap();
    assert_eq!(view.counted_null_count(), 2);
    let values: Vec<_> = view.iter::<i32>().unwrap().collect();
    assert_eq!(values, vec![Some(1), None, Some(3), None, Some(5)]);
}

#[test]
fn test_null_count_above_rows_rejected() {
    // addresses are never dereferenced: validation fails first
    let desc = GpuColumnData::with_validity(
        0x1000 as *const c_void,
        0x2000 as *const c_void,
        TypeId::Int32,
        5,
        6,
    );
    let err = unsafe { ColumnView::from_descriptor(&desc) }.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ContractViolation);
    assert!(matches!(
        err.violation(),
        Some(Violation::NullCountExceedsRows { null_count: 6, num_row: 5 })
    ));
}

#[test]
fn test_zero_rows_with_null_pointers() {
    let desc = GpuColumnData::new(std::ptr::null(), std::ptr::null(), 8, 0, TypeId::Float64.as_raw(), 0);
    let view = unsafe { ColumnView::from_descriptor(&desc) }.unwrap();
    assert_eq!(view.row_count(), 0);
    assert_eq!(view.counted_null_count(), 0);
}

#[test]
fn test_absent_mask_matches_full_mask() {
    let data = int32_bytes(&[1, 2, 3]);
    let full = [0b111u8];
    let without = ColumnView::new(&data, None, TypeId::Int32, 3, 0).unwrap();
    let with = ColumnView::new(&data, Some(&full[..]), TypeId::Int32, 3, 0).unwrap();
    assert_eq!(
        without.iter::<i32>().unwrap().collect::<Vec<_>>(),
        with.iter::<i32>().unwrap().collect::<Vec<_>>()
    );
}

#[test]
fn test_descriptor_is_copy_and_immutable() {
    let col = HostColumn::from_slice("a", &[1i64, 2, 3]);
    let desc = col.descriptor();
    let copy = desc;
    assert_eq!(copy, desc);
    assert_eq!(copy.num_row(), 3);
    assert_eq!(copy.dtype_size_in_bytes(), 8);
}

// ---------------------------------------------------------------------------
// Lease hand-off
// ---------------------------------------------------------------------------

#[test]
fn test_released_owner_is_dangling() {
    let owner = Arc::new(HostColumn::from_values("x", &[Some(1.5f32), None]));
    let lease = owner.lease();
    assert_eq!(lease.with_view(|v| v.null_count()).unwrap(), 1);

    drop(owner);
    let err = lease.with_view(|v| v.null_count()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DanglingReference);
}

// ---------------------------------------------------------------------------
// Arrow → descriptor → consumers
// ---------------------------------------------------------------------------

fn make_batch() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int32, false),
        Field::new("score", DataType::Float32, true),
    ]));
    let id = Arc::new(Int32Array::from(vec![1, 2, 3]));
    let score = Arc::new(Float32Array::from(vec![Some(0.5), None, Some(2.5)]));
    RecordBatch::try_new(schema, vec![id, score]).unwrap()
}

#[test]
fn test_batch_round_trip_through_descriptors() {
    let batch = make_batch();
    let columns = record_batch_to_host_columns(&batch).unwrap();
    let descriptors: Vec<GpuColumnData> = columns.iter().map(HostColumn::descriptor).collect();

    let views = unsafe { views_from_descriptors(&descriptors, &ColumnConfig::default()) }.unwrap();
    let rebuilt = views_to_record_batch(&views, batch.schema()).unwrap();
    assert_eq!(rebuilt, batch);
}

#[test]
fn test_unsafe_rows_from_batch() {
    let columns = record_batch_to_host_columns(&make_batch()).unwrap();
    let views: Vec<_> = columns.iter().map(|c| c.view().unwrap()).collect();
    let rows = build_unsafe_rows(&views).unwrap();

    assert_eq!(rows.layout().row_size, 8 + 2 * 8);
    assert_eq!(rows.get_i64(2, 0), Some(3));
    assert_eq!(rows.is_null_at(1, 1), Some(true));
    let slot = rows.slot(0, 1).unwrap();
    assert_eq!(f32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]), 0.5);
}

#[test]
fn test_feature_matrix_from_descriptors() {
    let feature = HostColumn::from_slice("f", &[1.0f32, 2.0, 3.0]);
    let label = HostColumn::from_slice("label", &[5.0f32, 6.0, 7.0]);
    let weight = HostColumn::from_slice("weight", &[5.0f32, 6.0, 7.0]);

    let descriptors = [feature.descriptor(), label.descriptor(), weight.descriptor()];
    let views = unsafe { views_from_descriptors(&descriptors, &ColumnConfig::default()) }.unwrap();

    let mut matrix = FeatureMatrix::from_columns(&views[..1], f32::NAN).unwrap();
    matrix.set_info(InfoField::Label, &views[1]).unwrap();
    matrix.set_info("weight".parse().unwrap(), &views[2]).unwrap();
    matrix.check_info_lengths().unwrap();

    assert_eq!(matrix.label().unwrap(), &[5.0, 6.0, 7.0]);
    assert_eq!(matrix.weight().unwrap(), &[5.0, 6.0, 7.0]);
    assert_eq!(matrix.row_num(), 3);
}

// ---------------------------------------------------------------------------
// Array interface
// ---------------------------------------------------------------------------

#[test]
fn test_array_interface_for_masked_column() {
    let col = HostColumn::from_values("m", &[Some(1i64), None, Some(3)]);
    let desc = col.descriptor();
    let json = columns_to_json(&[desc], &ColumnConfig::default()).unwrap();
    let parsed = columns_from_json(&json).unwrap();

    assert_eq!(parsed.len(), 1);
    assert_eq!(parsed[0].typestr, "<i8");
    assert_eq!(parsed[0].shape, vec![3]);
    assert_eq!(parsed[0].mask.as_ref().map(|m| m.typestr.as_str()), Some("<t1"));

    let back = ArrayInterface::from_json(&parsed[0].to_json().unwrap())
        .unwrap()
        .into_descriptor(1)
        .unwrap();
    assert_eq!(back, desc);
}

#[test]
fn test_invalid_descriptor_error_surfaces_through_json() {
    let desc = GpuColumnData::new(0x1000 as *const c_void, std::ptr::null(), 4, 3, 0, 0);
    let err = columns_to_json(&[desc], &ColumnConfig::default()).unwrap_err();
    let column_err = err.downcast_ref::<ColumnError>().unwrap();
    assert_eq!(column_err.violation(), Some(&Violation::UnknownTypeId(0)));
}
