//! Producer-side plumbing: Arrow data in, column descriptors out.
//!
//! This crate copies Apache Arrow `RecordBatch`es into [`HostColumn`]s, hands
//! their buffers to consumers as [`gpu_column_core::GpuColumnData`]
//! descriptors, and rebuilds Arrow arrays from consumer-side views.
//!
//! # Layout contract
//!
//! Each column is stored as a **flat, row-contiguous** byte buffer at the
//! element's native width, plus an optional validity bitmask:
//!
//! ```text
//! data:     [  value[0]  |  value[1]  | ... |  value[n-1]  ]
//! validity: [ b7..b0 | b15..b8 | ... ]   bit i set = row i valid
//! ```
//!
//! The mask is omitted when a column has no nulls.

pub mod column_buffer;
pub mod record_batch_convert;
pub mod schema_utils;

pub use column_buffer::{ColumnLease, HostColumn};
pub use record_batch_convert::{
    column_view_to_array, host_column_descriptors, record_batch_to_host_columns,
    views_to_record_batch,
};
pub use schema_utils::SchemaExt;
