//! `__cuda_array_interface__`-style JSON for column descriptors.
//!
//! ```text
//! {"data": [ptr, false], "shape": [rows], "typestr": "<f4", "version": 1,
//!  "mask": {"data": [mask_ptr, false], "shape": [rows], "typestr": "<t1", "version": 1}}
//! ```
//!
//! The mask entry is only emitted when the descriptor carries a validity
//! pointer. The null count has no slot in the interface and must be supplied
//! when importing.

use std::ffi::c_void;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::descriptor::GpuColumnData;
use crate::type_id::TypeId;
use crate::ColumnConfig;

/// Type string for a packed one-bit-per-row mask.
pub const MASK_TYPESTR: &str = "<t1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArrayInterface {
    /// Address and read-only flag.
    pub data: (usize, bool),
    pub shape: Vec<u64>,
    pub typestr: String,
    pub version: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<Box<ArrayInterface>>,
}

impl ArrayInterface {
    /// Describe a validated descriptor. Invalid descriptors are rejected
    /// before anything is emitted.
    pub fn from_descriptor(desc: &GpuColumnData, version: u8) -> Result<Self> {
        let layout = desc.validate()?;
        let rows = layout.row_count as u64;

        let mask = desc.has_validity().then(|| {
            Box::new(ArrayInterface {
                data: (desc.valid_ptr() as usize, false),
                shape: vec![rows],
                typestr: MASK_TYPESTR.to_string(),
                version,
                mask: None,
            })
        });

        Ok(Self {
            data: (desc.data_ptr() as usize, false),
            shape: vec![rows],
            typestr: layout.type_id.typestr().to_string(),
            version,
            mask,
        })
    }

    /// Rebuild a descriptor. The result has already passed validation.
    pub fn into_descriptor(&self, null_count: i64) -> Result<GpuColumnData> {
        let rows = self.rows()?;
        let type_id = TypeId::from_typestr(&self.typestr)
            .with_context(|| format!("Unsupported typestr '{}'", self.typestr))?;

        let valid_ptr = match &self.mask {
            Some(mask) => {
                if mask.typestr != MASK_TYPESTR {
                    bail!("Unsupported mask typestr '{}'", mask.typestr);
                }
                if mask.rows()? != rows {
                    bail!("Mask shape {:?} does not match data shape {:?}", mask.shape, self.shape);
                }
                mask.data.0 as *const c_void
            }
            None => std::ptr::null(),
        };

        let desc = GpuColumnData::with_validity(
            self.data.0 as *const c_void,
            valid_ptr,
            type_id,
            rows,
            null_count,
        );
        desc.validate()?;
        Ok(desc)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).context("Serializing array interface")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Parsing array interface")
    }

    fn rows(&self) -> Result<i64> {
        match self.shape.as_slice() {
            [rows] => i64::try_from(*rows).context("Row count exceeds i64"),
            other => bail!("Expected a one-dimensional shape, got {:?}", other),
        }
    }
}

/// JSON array with one interface object per column.
pub fn columns_to_json(columns: &[GpuColumnData], config: &ColumnConfig) -> Result<String> {
    let interfaces = columns
        .iter()
        .enumerate()
        .map(|(i, desc)| {
            ArrayInterface::from_descriptor(desc, config.array_interface_version)
                .with_context(|| format!("Describing column {}", i))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!("Emitting array interface for {} columns", interfaces.len());
    serde_json::to_string(&interfaces).context("Serializing array interfaces")
}

pub fn columns_from_json(json: &str) -> Result<Vec<ArrayInterface>> {
    serde_json::from_str(json).context("Parsing array interface list")
}
