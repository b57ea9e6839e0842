//! Conversion between Arrow `RecordBatch` and host columns / column views.

use anyhow::{bail, Context, Result};
use arrow_array::cast::AsArray;
use arrow_array::types::{
    ArrowPrimitiveType, Date32Type, Date64Type, Float32Type, Float64Type, Int16Type, Int32Type,
    Int64Type, Int8Type, TimestampMillisecondType,
};
use arrow_array::{
    Array, ArrayRef, BooleanArray, Date32Array, Date64Array, Float32Array, Float64Array,
    Int16Array, Int32Array, Int64Array, Int8Array, RecordBatch, TimestampMillisecondArray,
};
use arrow_schema::{DataType, SchemaRef};
use gpu_column_core::validity;
use gpu_column_core::{ColumnView, GpuColumnData, NativeValue, TypeId};
use std::sync::Arc;
use tracing::{debug, info};

use crate::column_buffer::HostColumn;
use crate::schema_utils::type_id_for;

// ---------------------------------------------------------------------------
// Arrow → host columns
// ---------------------------------------------------------------------------

/// Convert an Arrow `RecordBatch` into one `HostColumn` per field.
///
/// Values keep their native width; Arrow's bit-packed booleans are expanded
/// to one byte per value. Null slots keep whatever bytes Arrow holds there
/// and are masked out by the copied validity bitmap.
pub fn record_batch_to_host_columns(batch: &RecordBatch) -> Result<Vec<HostColumn>> {
    info!(
        "Converting batch of {} rows x {} columns to host columns",
        batch.num_rows(),
        batch.num_columns()
    );
    batch
        .schema()
        .fields()
        .iter()
        .zip(batch.columns())
        .map(|(field, col)| {
            array_to_host_column(field.name(), col.as_ref())
                .with_context(|| format!("Converting column '{}'", field.name()))
        })
        .collect()
}

pub fn array_to_host_column(name: &str, array: &dyn Array) -> Result<HostColumn> {
    let type_id = type_id_for(array.data_type())?;
    let n_rows = array.len();
    let validity = (array.null_count() > 0)
        .then(|| validity::build_mask((0..n_rows).map(|i| array.is_valid(i))));

    let data = match array.data_type() {
        DataType::Int8 => primitive_bytes::<Int8Type>(array)?,
        DataType::Int16 => primitive_bytes::<Int16Type>(array)?,
        DataType::Int32 => primitive_bytes::<Int32Type>(array)?,
        DataType::Int64 => primitive_bytes::<Int64Type>(array)?,
        DataType::Float32 => primitive_bytes::<Float32Type>(array)?,
        DataType::Float64 => primitive_bytes::<Float64Type>(array)?,
        DataType::Date32 => primitive_bytes::<Date32Type>(array)?,
        DataType::Date64 => primitive_bytes::<Date64Type>(array)?,
        DataType::Timestamp(_, _) => primitive_bytes::<TimestampMillisecondType>(array)?,
        DataType::Boolean => {
            let a = array.as_boolean_opt().context("Expected a boolean array")?;
            a.values().iter().map(u8::from).collect()
        }
        other => bail!("Unsupported column type for conversion: {:?}", other),
    };

    debug!(
        "Column '{}': {:?}, {} rows, {} nulls",
        name,
        type_id,
        n_rows,
        array.null_count()
    );
    HostColumn::from_bytes(name, type_id, data, n_rows, validity)
}

fn primitive_bytes<T>(array: &dyn Array) -> Result<Vec<u8>>
where
    T: ArrowPrimitiveType,
    T::Native: NativeValue,
{
    let a = array
        .as_primitive_opt::<T>()
        .with_context(|| format!("Expected a {:?} array", T::DATA_TYPE))?;
    let mut out = Vec::with_capacity(a.len() * std::mem::size_of::<T::Native>());
    for v in a.values().iter() {
        v.extend_le(&mut out);
    }
    Ok(out)
}

/// Descriptors for a set of host columns, in order.
pub fn host_column_descriptors(columns: &[HostColumn]) -> Vec<GpuColumnData> {
    columns.iter().map(HostColumn::descriptor).collect()
}

// ---------------------------------------------------------------------------
// Column views → Arrow
// ---------------------------------------------------------------------------

/// Rebuild an Arrow array, nulls included, from a column view.
pub fn column_view_to_array(view: &ColumnView<'_>) -> Result<ArrayRef> {
    let array: ArrayRef = match view.type_id() {
        TypeId::Int8 => Arc::new(view.iter::<i8>()?.collect::<Int8Array>()),
        TypeId::Int16 => Arc::new(view.iter::<i16>()?.collect::<Int16Array>()),
        TypeId::Int32 => Arc::new(view.iter::<i32>()?.collect::<Int32Array>()),
        TypeId::Int64 => Arc::new(view.iter::<i64>()?.collect::<Int64Array>()),
        TypeId::Float32 => Arc::new(view.iter::<f32>()?.collect::<Float32Array>()),
        TypeId::Float64 => Arc::new(view.iter::<f64>()?.collect::<Float64Array>()),
        TypeId::Bool8 => Arc::new(view.iter::<bool>()?.collect::<BooleanArray>()),
        TypeId::Date32 => Arc::new(view.iter::<i32>()?.collect::<Date32Array>()),
        TypeId::Date64 => Arc::new(view.iter::<i64>()?.collect::<Date64Array>()),
        TypeId::Timestamp => Arc::new(view.iter::<i64>()?.collect::<TimestampMillisecondArray>()),
    };
    Ok(array)
}

/// Reconstruct a `RecordBatch` from column views.
///
/// The caller supplies the target schema; each view's type must match its
/// field.
pub fn views_to_record_batch(views: &[ColumnView<'_>], schema: SchemaRef) -> Result<RecordBatch> {
    if views.len() != schema.fields().len() {
        bail!(
            "views_to_record_batch: {} columns for a schema of {} fields",
            views.len(),
            schema.fields().len()
        );
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(views.len());
    for (view, field) in views.iter().zip(schema.fields()) {
        let expected = type_id_for(field.data_type())?;
        if view.type_id() != expected {
            bail!(
                "Column '{}' holds {:?}, schema expects {:?}",
                field.name(),
                view.type_id(),
                expected
            );
        }
        columns.push(column_view_to_array(view)?);
    }

    RecordBatch::try_new(schema, columns).context("Building RecordBatch from column views")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
