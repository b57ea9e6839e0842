use anyhow::{bail, Result};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use gpu_column_core::TypeId;

use crate::column_buffer::HostColumn;

/// Map an Arrow `DataType` to the descriptor type it is stored as.
pub fn type_id_for(dt: &DataType) -> Result<TypeId> {
    match dt {
        DataType::Int8 => Ok(TypeId::Int8),
        DataType::Int16 => Ok(TypeId::Int16),
        DataType::Int32 => Ok(TypeId::Int32),
        DataType::Int64 => Ok(TypeId::Int64),
        DataType::Float32 => Ok(TypeId::Float32),
        DataType::Float64 => Ok(TypeId::Float64),
        DataType::Boolean => Ok(TypeId::Bool8),
        DataType::Date32 => Ok(TypeId::Date32),
        DataType::Date64 => Ok(TypeId::Date64),
        DataType::Timestamp(TimeUnit::Millisecond, None) => Ok(TypeId::Timestamp),
        other => bail!("Unsupported Arrow DataType for column descriptor: {:?}", other),
    }
}

pub fn data_type_for(type_id: TypeId) -> DataType {
    match type_id {
        TypeId::Int8 => DataType::Int8,
        TypeId::Int16 => DataType::Int16,
        TypeId::Int32 => DataType::Int32,
        TypeId::Int64 => DataType::Int64,
        TypeId::Float32 => DataType::Float32,
        TypeId::Float64 => DataType::Float64,
        TypeId::Bool8 => DataType::Boolean,
        TypeId::Date32 => DataType::Date32,
        TypeId::Date64 => DataType::Date64,
        TypeId::Timestamp => DataType::Timestamp(TimeUnit::Millisecond, None),
    }
}

/// Schema describing a set of host columns, nullable where a column has nulls.
pub fn schema_for(columns: &[HostColumn]) -> Schema {
    Schema::new(
        columns
            .iter()
            .map(|c| Field::new(&c.name, data_type_for(c.type_id), c.null_count() > 0))
            .collect::<Vec<_>>(),
    )
}

pub trait SchemaExt {
    fn descriptor_types(&self) -> Result<Vec<TypeId>>;
    /// Sum of element widths, i.e. bytes per row across all column buffers.
    fn row_byte_width(&self) -> Result<usize>;
    fn is_descriptor_compatible(&self) -> bool;
}

impl SchemaExt for Schema {
    fn descriptor_types(&self) -> Result<Vec<TypeId>> {
        self.fields().iter().map(|f| type_id_for(f.data_type())).collect()
    }

    fn row_byte_width(&self) -> Result<usize> {
        Ok(self.descriptor_types()?.iter().map(|t| t.byte_width()).sum())
    }

    fn is_descriptor_compatible(&self) -> bool {
        self.fields().iter().all(|f| type_id_for(f.data_type()).is_ok())
    }
}
