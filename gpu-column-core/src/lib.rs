//! Fixed-layout descriptors for externally-owned GPU column memory.
//!
//! A producer (typically a dataframe library) fills a [`GpuColumnData`] with
//! the addresses and shape of a column it allocated and hands it across an
//! interop boundary. A consumer validates the descriptor on receipt and, for
//! host-accessible memory, reads it through a [`ColumnView`].
//!
//! The descriptor owns nothing; freeing the buffers stays with whichever
//! allocator created them.

pub mod array_interface;
pub mod descriptor;
pub mod error;
pub mod type_id;
pub mod validity;
pub mod view;

pub use array_interface::{columns_to_json, ArrayInterface};
pub use descriptor::{ColumnLayout, GpuColumnData};
pub use error::{ColumnError, ErrorKind, Violation};
pub use type_id::{NativeValue, TypeId};
pub use validity::ValidityMask;
pub use view::ColumnView;

/// Consumer-side settings.
#[derive(Debug, Clone)]
pub struct ColumnConfig {
    /// Recount unset validity bits on receipt and reject descriptors whose
    /// cached null count disagrees.
    pub verify_null_count: bool,
    /// `version` field written into array-interface JSON.
    pub array_interface_version: u8,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            verify_null_count: true,
            array_interface_version: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ColumnConfig::default();
        assert!(config.verify_null_count);
        assert_eq!(config.array_interface_version, 1);
    }
}
