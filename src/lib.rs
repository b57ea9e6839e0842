//! Column descriptor interop: one import for producer, core and consumer crates.
//!
//! * [`column`]: the `#[repr(C)]` descriptor, its validation, views and
//!   array-interface JSON.
//! * [`arrow`]: Arrow-backed producer columns and descriptor leases.
//! * [`consumer`]: Spark `UnsafeRow` builder and dense feature matrix.

pub use arrow_interop as arrow;
pub use column_consumer as consumer;
pub use gpu_column_core as column;

pub use gpu_column_core::{
    ColumnConfig, ColumnError, ColumnView, ErrorKind, GpuColumnData, TypeId, Violation,
};
