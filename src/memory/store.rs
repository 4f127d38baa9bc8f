//! Symbol store: one [`MemoryContainer`] per description symbol
//!
//! Statements fill the store (`read`, `readlist`, `var`); expressions read
//! it back through the statement host. For containers whose bytes came from
//! the target, [`SymbolStore::target_span`] tells the caller where a write
//! has to be re-issued on the device.

use super::container::MemoryContainer;
use super::validity::{normalize_symbol, ValidityCache};
use super::{CacheError, CacheResult};
use log::trace;

/// Sentinel offset: append as a new element instead of writing in place
pub const APPEND: u64 = u64::MAX;

#[derive(Debug, Default)]
pub struct SymbolStore {
    containers: ValidityCache<MemoryContainer>,
}

impl SymbolStore {
    pub fn new() -> Self {
        Self {
            containers: ValidityCache::new(normalize_symbol),
        }
    }

    pub fn container(&self, name: &str) -> Option<&MemoryContainer> {
        self.containers.get(name)
    }

    /// Container for `name`, created empty on first use
    pub fn container_mut(&mut self, name: &str) -> &mut MemoryContainer {
        if self.containers.get(name).is_none() {
            if let Some(stale) = self.containers.delete(name) {
                trace!("dropping stale container '{}' ({} bytes)", name, stale.len());
            }
        }
        self.containers.ensure(name, MemoryContainer::new)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.container(name).is_some()
    }

    /// Store `data` at `offset` (or append it as an element when `offset`
    /// is [`APPEND`]). Returns the offset actually used.
    pub fn store(
        &mut self,
        name: &str,
        offset: u64,
        data: &[u8],
        logical_size: u64,
        base_address: Option<u64>,
    ) -> CacheResult<u64> {
        let container = self.container_mut(name);
        if offset == APPEND {
            return Ok(container.append(data, logical_size, base_address));
        }
        container.write(offset, data)?;
        Ok(offset)
    }

    pub fn read(&self, name: &str, offset: u64, size: u64) -> CacheResult<Vec<u8>> {
        let container = self
            .container(name)
            .ok_or_else(|| CacheError::UnknownSymbol(name.to_string()))?;
        container.read(offset, size).map(<[u8]>::to_vec)
    }

    /// Write into an existing container
    pub fn write(&mut self, name: &str, offset: u64, data: &[u8]) -> CacheResult<()> {
        if !self.contains(name) {
            return Err(CacheError::UnknownSymbol(name.to_string()));
        }
        self.container_mut(name).write(offset, data)
    }

    /// Target range behind a write of `len` bytes at `offset`, when the
    /// enclosing element came from the target. See
    /// [`MemoryContainer::target_span`].
    pub fn target_span(&self, name: &str, offset: u64, len: u64) -> Option<(u64, u64)> {
        self.container(name)?.target_span(offset, len)
    }

    /// Empty one container, keeping the entry
    pub fn clear(&mut self, name: &str) {
        self.container_mut(name).clear();
    }

    pub fn set_persistent(&mut self, name: &str, persistent: bool) {
        self.container_mut(name).persistent = persistent;
    }

    /// Empty every container not marked persistent
    pub fn clear_transient(&mut self) {
        for container in self.containers.values_mut() {
            if !container.persistent {
                container.clear();
            }
        }
    }

    pub fn invalidate(&mut self, name: &str) {
        self.containers.invalidate(name);
    }

    pub fn invalidate_all(&mut self) {
        self.containers.invalidate_all();
    }

    pub fn remove(&mut self, name: &str) -> Option<MemoryContainer> {
        self.containers.delete(name)
    }
}
