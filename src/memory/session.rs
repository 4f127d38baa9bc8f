//! Target session: the caches that mediate all target I/O
//!
//! A session owns the target handle together with the register cache, the
//! chunked memory cache, the symbol-address cache and the symbol store. It
//! lives as long as the debug session; the owner calls [`TargetSession::invalidate`]
//! whenever the target state changes (resume, step, reset).

use super::chunked::ChunkCache;
use super::registers::RegisterCache;
use super::store::SymbolStore;
use super::target::TargetAccess;
use super::validity::{normalize_symbol, ValidityCache};
use super::{CacheError, CacheResult};
use log::debug;

#[derive(Debug)]
pub struct TargetSession<T> {
    target: T,
    pub registers: RegisterCache,
    pub memory: ChunkCache,
    symbols: ValidityCache<Option<u64>>,
    pub store: SymbolStore,
}

impl<T: TargetAccess> TargetSession<T> {
    pub fn new(target: T, chunk_size: usize) -> Self {
        Self {
            target,
            registers: RegisterCache::new(),
            memory: ChunkCache::new(chunk_size),
            symbols: ValidityCache::new(normalize_symbol),
            store: SymbolStore::new(),
        }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    pub fn read_memory(&mut self, address: u64, size: usize) -> CacheResult<Vec<u8>> {
        self.memory.read(&self.target, address, size)
    }

    pub fn write_memory(&mut self, address: u64, data: &[u8]) -> CacheResult<()> {
        self.memory.write(&mut self.target, address, data)
    }

    pub fn read_register(&mut self, name: &str) -> CacheResult<u32> {
        self.registers.read(&self.target, name)
    }

    pub fn write_register(&mut self, name: &str, value: u64) {
        self.registers.write(&self.target, name, value);
    }

    pub fn flush_registers(&mut self) -> CacheResult<usize> {
        self.registers.flush(&mut self.target)
    }

    /// Symbol address, cached. Failed lookups are cached too.
    pub fn symbol_address(&mut self, name: &str) -> Option<u64> {
        if let Some(address) = self.symbols.get(name) {
            return *address;
        }
        let address = self.target.symbol_address(name.trim());
        self.symbols.set(name, address);
        address
    }

    pub fn symbol_size(&self, name: &str) -> Option<u64> {
        self.target.symbol_size(name.trim())
    }

    pub fn symbol_at(&self, address: u64) -> Option<String> {
        self.target.symbol_at(address)
    }

    pub fn is_running(&self) -> bool {
        self.target.is_running()
    }

    /// Write into a stored symbol. Bytes that came from the target go to
    /// the device first, clamped to the target bytes of the enclosing
    /// element; the store is updated only when the device accepted them.
    pub fn write_symbol(&mut self, name: &str, offset: u64, data: &[u8]) -> CacheResult<()> {
        if !self.store.contains(name) {
            return Err(CacheError::UnknownSymbol(name.to_string()));
        }
        if let Some((address, backed)) = self.store.target_span(name, offset, data.len() as u64) {
            self.write_memory(address, &data[..backed as usize])?;
        }
        self.store.write(name, offset, data)
    }

    /// Forget everything read from the target
    pub fn invalidate(&mut self) {
        debug!("target session invalidated");
        self.registers.invalidate_all();
        self.memory.invalidate_all();
        self.symbols.invalidate_all();
        self.store.clear_transient();
    }

    /// Forget one symbol: its address, its stored data and its memory chunks
    pub fn invalidate_symbol(&mut self, name: &str) {
        if let (Some(Some(address)), Some(size)) =
            (self.symbols.get(name).copied(), self.symbol_size(name))
        {
            self.memory.invalidate_range(address, size as usize);
        }
        self.symbols.invalidate(name);
        self.store.invalidate(name);
    }
}
