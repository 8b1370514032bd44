//! Region-instance storage seam.
//!
//! The engine treats instances as opaque handles; all reads go through
//! `InstanceSource`, which must be satisfiable without allocation (values
//! are copied into a caller-provided buffer). `HeapInstances` is the
//! in-memory implementation used by initialization tasks and tests.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use partwise_core::error::{Error, Result};
use partwise_core::id::{IdGen, InstanceId};

/// Byte-level read access to instance storage.
pub trait InstanceSource: Send + Sync + 'static {
    /// Copy `buf.len()` bytes at `offset` of `instance` into `buf`.
    /// Destroyed or unknown instances and out-of-range offsets surface as
    /// `Error::InvalidDescriptor`.
    fn read_into(&self, instance: InstanceId, offset: usize, buf: &mut [u8]) -> Result<()>;
}

/// In-memory instance store. The engine only ever reads; writes come from
/// external initialization code before the relevant precondition triggers.
#[derive(Default)]
pub struct HeapInstances {
    ids: IdGen,
    instances: RwLock<HashMap<InstanceId, Arc<RwLock<Vec<u8>>>>>,
}

impl HeapInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zero-filled instance able to hold `element_count` elements
    /// of the given per-element field sizes (each field stored as its own
    /// contiguous block).
    pub fn create_instance(&self, element_count: u64, field_sizes: &[usize]) -> InstanceId {
        let total: usize = field_sizes
            .iter()
            .map(|s| s * element_count as usize)
            .sum();
        let id = InstanceId::new(self.ids.next_raw());
        self.instances
            .write()
            .insert(id, Arc::new(RwLock::new(vec![0u8; total])));
        id
    }

    /// Drop an instance. Outstanding descriptors naming it will fail with
    /// `InvalidDescriptor` when an operator reads through them.
    pub fn destroy_instance(&self, instance: InstanceId) {
        self.instances.write().remove(&instance);
    }

    /// Overwrite bytes at `offset`. For initialization code only.
    pub fn write(&self, instance: InstanceId, offset: usize, bytes: &[u8]) -> Result<()> {
        let data = self.lookup(instance)?;
        let mut data = data.write();
        let end = offset
            .checked_add(bytes.len())
            .filter(|&e| e <= data.len())
            .ok_or_else(|| {
                Error::InvalidDescriptor(format!(
                    "write of {} bytes at {} past instance {} of {} bytes",
                    bytes.len(),
                    offset,
                    instance,
                    data.len()
                ))
            })?;
        data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    fn lookup(&self, instance: InstanceId) -> Result<Arc<RwLock<Vec<u8>>>> {
        self.instances
            .read()
            .get(&instance)
            .cloned()
            .ok_or_else(|| Error::InvalidDescriptor(format!("instance {instance} does not exist")))
    }
}

impl InstanceSource for HeapInstances {
    fn read_into(&self, instance: InstanceId, offset: usize, buf: &mut [u8]) -> Result<()> {
        let data = self.lookup(instance)?;
        let data = data.read();
        let end = offset
            .checked_add(buf.len())
            .filter(|&e| e <= data.len())
            .ok_or_else(|| {
                Error::InvalidDescriptor(format!(
                    "read of {} bytes at {} past instance {} of {} bytes",
                    buf.len(),
                    offset,
                    instance,
                    data.len()
                ))
            })?;
        buf.copy_from_slice(&data[offset..end]);
        Ok(())
    }
}
