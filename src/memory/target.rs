//! Target I/O boundary
//!
//! [`TargetAccess`] is the only way the engine touches a debug target.
//! Every read may fail; a failed read is `None`, never zero.
//!
//! [`SimulatedTarget`] is an in-memory target with sparse memory regions,
//! a register file and a symbol table. It counts every transaction so cache
//! behaviour can be asserted in tests and exercised from the CLI.

use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TargetError {
    #[error("Memory at 0x{address:08x} ({size} bytes) is not writable")]
    MemoryWrite { address: u64, size: usize },

    #[error("Register '{0}' cannot be written")]
    RegisterWrite(String),

    #[error("Target does not support {0}")]
    NotSupported(&'static str),
}

/// Access to a (possibly live) debug target
pub trait TargetAccess {
    /// Read `size` bytes at `address`; `None` when any byte is unreadable.
    fn read_memory(&self, address: u64, size: usize) -> Option<Vec<u8>>;

    fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), TargetError>;

    /// Raw register value by canonical name (`R0`, `SP`, `MSP`, `CONTROL`...)
    fn read_register(&self, name: &str) -> Option<u64>;

    fn write_register(&mut self, name: &str, _value: u64) -> Result<(), TargetError> {
        Err(TargetError::RegisterWrite(name.to_string()))
    }

    fn symbol_address(&self, name: &str) -> Option<u64>;

    fn symbol_size(&self, _name: &str) -> Option<u64> {
        None
    }

    /// Name of the symbol containing `address`
    fn symbol_at(&self, _address: u64) -> Option<String> {
        None
    }

    fn is_running(&self) -> bool {
        false
    }
}

#[derive(Debug, Clone)]
struct Region {
    base: u64,
    bytes: Vec<u8>,
    writable: bool,
}

impl Region {
    fn contains(&self, address: u64, size: usize) -> bool {
        address >= self.base
            && address
                .checked_add(size as u64)
                .is_some_and(|end| end - self.base <= self.bytes.len() as u64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionCounts {
    pub memory_reads: usize,
    pub memory_writes: usize,
    pub register_reads: usize,
    pub register_writes: usize,
}

/// In-memory target with transaction counters
#[derive(Debug, Default)]
pub struct SimulatedTarget {
    regions: Vec<Region>,
    registers: FxHashMap<String, u64>,
    symbols: FxHashMap<String, (u64, u64)>,
    running: bool,
    counts: Cell<TransactionCounts>,
    read_log: RefCell<Vec<(u64, usize)>>,
}

impl SimulatedTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a writable region of `size` zero bytes at `base`
    pub fn with_region(mut self, base: u64, size: usize) -> Self {
        self.regions.push(Region {
            base,
            bytes: vec![0; size],
            writable: true,
        });
        self
    }

    /// Map a read-only region holding `bytes`
    pub fn with_rom(mut self, base: u64, bytes: &[u8]) -> Self {
        self.regions.push(Region {
            base,
            bytes: bytes.to_vec(),
            writable: false,
        });
        self
    }

    pub fn with_register(mut self, name: &str, value: u64) -> Self {
        self.registers.insert(name.to_ascii_uppercase(), value);
        self
    }

    pub fn with_symbol(mut self, name: &str, address: u64, size: u64) -> Self {
        self.symbols.insert(name.to_string(), (address, size));
        self
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Write bytes without counting a transaction (test setup)
    pub fn poke(&mut self, address: u64, data: &[u8]) -> bool {
        match self
            .regions
            .iter_mut()
            .find(|r| r.contains(address, data.len()))
        {
            Some(region) => {
                let start = (address - region.base) as usize;
                region.bytes[start..start + data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    pub fn poke_u32(&mut self, address: u64, value: u32) -> bool {
        self.poke(address, &value.to_le_bytes())
    }

    /// Read bytes without counting a transaction (test assertions)
    pub fn peek(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        self.regions
            .iter()
            .find(|r| r.contains(address, size))
            .map(|region| {
                let start = (address - region.base) as usize;
                region.bytes[start..start + size].to_vec()
            })
    }

    pub fn peek_u32(&self, address: u64) -> Option<u32> {
        let bytes = self.peek(address, 4)?;
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn register(&self, name: &str) -> Option<u64> {
        self.registers.get(&name.to_ascii_uppercase()).copied()
    }

    pub fn counts(&self) -> TransactionCounts {
        self.counts.get()
    }

    /// `(address, size)` of every memory read so far
    pub fn read_log(&self) -> Vec<(u64, usize)> {
        self.read_log.borrow().clone()
    }

    pub fn reset_counts(&self) {
        self.counts.set(TransactionCounts::default());
        self.read_log.borrow_mut().clear();
    }

    fn bump(&self, update: impl FnOnce(&mut TransactionCounts)) {
        let mut counts = self.counts.get();
        update(&mut counts);
        self.counts.set(counts);
    }
}

impl TargetAccess for SimulatedTarget {
    fn read_memory(&self, address: u64, size: usize) -> Option<Vec<u8>> {
        self.bump(|c| c.memory_reads += 1);
        self.read_log.borrow_mut().push((address, size));
        self.peek(address, size)
    }

    fn write_memory(&mut self, address: u64, data: &[u8]) -> Result<(), TargetError> {
        self.bump(|c| c.memory_writes += 1);
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.writable && r.contains(address, data.len()))
            .ok_or(TargetError::MemoryWrite {
                address,
                size: data.len(),
            })?;
        let start = (address - region.base) as usize;
        region.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_register(&self, name: &str) -> Option<u64> {
        self.bump(|c| c.register_reads += 1);
        self.register(name)
    }

    fn write_register(&mut self, name: &str, value: u64) -> Result<(), TargetError> {
        self.bump(|c| c.register_writes += 1);
        let key = name.to_ascii_uppercase();
        match self.registers.get_mut(&key) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(TargetError::RegisterWrite(name.to_string())),
        }
    }

    fn symbol_address(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).map(|(address, _)| *address)
    }

    fn symbol_size(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).map(|(_, size)| *size)
    }

    fn symbol_at(&self, address: u64) -> Option<String> {
        // innermost (highest based) symbol wins, ties by name
        self.symbols
            .iter()
            .filter(|(_, (base, size))| address == *base || (address > *base && address < base + size))
            .max_by(|(na, (ba, _)), (nb, (bb, _))| ba.cmp(bb).then_with(|| nb.cmp(na)))
            .map(|(name, _)| name.clone())
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_are_counted() {
        let mut target = SimulatedTarget::new().with_region(0x2000_0000, 16);
        target.poke_u32(0x2000_0004, 0xDEAD_BEEF);

        assert_eq!(
            target.read_memory(0x2000_0004, 4),
            Some(vec![0xEF, 0xBE, 0xAD, 0xDE])
        );
        assert_eq!(target.read_memory(0x2000_000E, 4), None);
        assert_eq!(target.counts().memory_reads, 2);
        assert_eq!(target.read_log(), vec![(0x2000_0004, 4), (0x2000_000E, 4)]);
    }

    #[test]
    fn test_rom_rejects_writes() {
        let mut target = SimulatedTarget::new().with_rom(0x0800_0000, &[1, 2, 3, 4]);
        assert!(target.write_memory(0x0800_0000, &[9]).is_err());
        assert_eq!(target.peek(0x0800_0000, 1), Some(vec![1]));
    }

    #[test]
    fn test_symbols() {
        let target = SimulatedTarget::new()
            .with_symbol("os_info", 0x2000_0000, 0x40)
            .with_symbol("idle_stack", 0x2000_0100, 0x100);
        assert_eq!(target.symbol_address("os_info"), Some(0x2000_0000));
        assert_eq!(target.symbol_at(0x2000_0110), Some("idle_stack".to_string()));
        assert_eq!(target.symbol_at(0x3000_0000), None);
    }
}
