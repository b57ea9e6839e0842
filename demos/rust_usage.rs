use std::sync::Arc;

use anyhow::Result;
use arrow_array::{Float64Array, Int64Array, RecordBatch};
use arrow_schema::{DataType, Field, Schema};
use gpu_column_interop::arrow::{record_batch_to_host_columns, HostColumn};
use gpu_column_interop::column::array_interface::{columns_to_json, ArrayInterface};
use gpu_column_interop::consumer::{build_unsafe_rows, views_from_descriptors, FeatureMatrix, InfoField};
use gpu_column_interop::{ColumnConfig, ColumnView, GpuColumnData, TypeId};
use tracing::{info, Level};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    info!("GPU column descriptor - Rust examples");

    descriptor_example()?;
    array_interface_example()?;
    unsafe_row_example()?;
    feature_matrix_example()?;
    lease_example()?;
    error_handling_example()?;

    Ok(())
}

fn descriptor_example() -> Result<()> {
    info!("=== Example 1: Describing a column ===");

    let column = HostColumn::from_values("price", &[Some(10i32), None, Some(30)]);
    let desc = column.descriptor();
    let layout = desc.validate()?;
    info!(
        "{}: {:?}, {} rows, {} nulls, {} data bytes",
        column.name, layout.type_id, layout.row_count, layout.null_count, layout.data_len
    );

    let view = column.view()?;
    for (row, value) in view.iter::<i32>()?.enumerate() {
        info!("  row {}: {:?}", row, value);
    }

    Ok(())
}

fn array_interface_example() -> Result<()> {
    info!("=== Example 2: __cuda_array_interface__ ===");

    let column = HostColumn::from_values("ratio", &[Some(0.25f64), Some(0.5), None]);
    let config = ColumnConfig::default();
    let json = columns_to_json(&[column.descriptor()], &config)?;
    info!("Exported: {}", json);

    let single = ArrayInterface::from_descriptor(&column.descriptor(), config.array_interface_version)?;
    let back = single.into_descriptor(column.null_count() as i64)?;
    info!("Round trip preserved descriptor: {}", back == column.descriptor());

    Ok(())
}

fn unsafe_row_example() -> Result<()> {
    info!("=== Example 3: Spark UnsafeRow ===");

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("amount", DataType::Float64, true),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(Float64Array::from(vec![Some(9.5), None, Some(12.0)])),
        ],
    )?;

    let columns = record_batch_to_host_columns(&batch)?;
    let descriptors: Vec<GpuColumnData> = columns.iter().map(HostColumn::descriptor).collect();
    let views = unsafe { views_from_descriptors(&descriptors, &ColumnConfig::default())? };
    let rows = build_unsafe_rows(&views)?;

    for row in 0..rows.num_rows() {
        info!(
            "  row {}: id={:?} amount={:?} amount_null={:?}",
            row,
            rows.get_i64(row, 0),
            rows.get_f64(row, 1),
            rows.is_null_at(row, 1)
        );
    }

    Ok(())
}

fn feature_matrix_example() -> Result<()> {
    info!("=== Example 4: Feature matrix ===");

    let age = HostColumn::from_values("age", &[Some(31.0f32), None, Some(45.0)]);
    let income = HostColumn::from_slice("income", &[52.0f32, 61.5, -1.0]);
    let label = HostColumn::from_slice("label", &[0.0f32, 1.0, 1.0]);

    let mut matrix = FeatureMatrix::from_columns(&[age.view()?, income.view()?], -1.0)?;
    matrix.set_info(InfoField::Label, &label.view()?)?;
    matrix.check_info_lengths()?;

    info!("Matrix is {} x {}", matrix.row_num(), matrix.col_num());
    for row in 0..matrix.row_num() {
        info!("  {:?}", matrix.row(row));
    }

    Ok(())
}

fn lease_example() -> Result<()> {
    info!("=== Example 5: Ownership hand-off ===");

    let owner = Arc::new(HostColumn::from_slice("ts", &[1_700_000_000_000i64, 1_700_000_000_500]));
    let lease = owner.lease();
    let rows = lease.with_view(|view| view.row_count())?;
    info!("Lease on '{}' sees {} rows", lease.name(), rows);

    drop(owner);
    match lease.with_view(|view| view.row_count()) {
        Ok(_) => info!("Unexpected: released column still readable"),
        Err(e) => info!("Expected error after release: {}", e),
    }

    Ok(())
}

fn error_handling_example() -> Result<()> {
    info!("=== Example 6: Contract violations ===");

    // the addresses are never read: validation rejects the descriptor first
    let bogus = GpuColumnData::with_validity(
        0x1000 as *const std::ffi::c_void,
        0x2000 as *const std::ffi::c_void,
        TypeId::Int32,
        5,
        6,
    );
    match unsafe { ColumnView::from_descriptor(&bogus) } {
        Ok(_) => info!("Unexpected: invalid descriptor accepted"),
        Err(e) => info!("Expected error ({:?}): {}", e.kind(), e),
    }

    Ok(())
}
