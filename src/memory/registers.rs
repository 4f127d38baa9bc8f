//! Register cache
//!
//! Raw register values keyed by canonical name. Reads go to the target only
//! when the entry is missing or invalid; writes are kept locally as dirty
//! entries until [`RegisterCache::flush`] pushes them back.
//!
//! # Name resolution
//!
//! - `R13`, `R14`, `R15` are the `SP`, `LR`, `PC` aliases.
//! - `SP` resolves to `PSP` when the SPSEL bit of `CONTROL` is set, else to
//!   `MSP`. `CONTROL` itself is read through the cache. When it cannot be
//!   read, `SP` is asked for directly.

use super::target::TargetAccess;
use super::validity::{normalize_register, ValidityCache};
use super::{CacheError, CacheResult};
use crate::interpreter::constants::CONTROL_SPSEL;
use log::debug;

#[derive(Debug)]
pub struct RegisterCache {
    entries: ValidityCache<u64>,
}

impl Default for RegisterCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the fixed calling-convention aliases
pub fn canonical_name(name: &str) -> String {
    let upper = normalize_register(name);
    match upper.as_str() {
        "R13" => "SP".to_string(),
        "R14" => "LR".to_string(),
        "R15" => "PC".to_string(),
        _ => upper,
    }
}

impl RegisterCache {
    pub fn new() -> Self {
        Self {
            entries: ValidityCache::new(normalize_register),
        }
    }

    /// Resolve aliases and the banked stack pointer
    pub fn resolve<T: TargetAccess + ?Sized>(&mut self, target: &T, name: &str) -> String {
        let name = canonical_name(name);
        if name != "SP" {
            return name;
        }
        match self.fetch(target, "CONTROL") {
            Some(control) if control & CONTROL_SPSEL != 0 => "PSP".to_string(),
            Some(_) => "MSP".to_string(),
            None => name,
        }
    }

    /// Read a register, masked to 32 bits
    pub fn read<T: TargetAccess + ?Sized>(&mut self, target: &T, name: &str) -> CacheResult<u32> {
        let resolved = self.resolve(target, name);
        self.fetch(target, &resolved)
            .map(|value| value as u32)
            .ok_or(CacheError::RegisterUnavailable(resolved))
    }

    fn fetch<T: TargetAccess + ?Sized>(&mut self, target: &T, name: &str) -> Option<u64> {
        if let Some(value) = self.entries.get(name) {
            return Some(*value);
        }
        let value = target.read_register(name)? & 0xFFFF_FFFF;
        debug!("register {} fetched: 0x{:08x}", name, value);
        self.entries.set(name, value);
        Some(value)
    }

    /// Record a local write; the entry becomes valid and dirty
    pub fn write<T: TargetAccess + ?Sized>(&mut self, target: &T, name: &str, value: u64) {
        let resolved = self.resolve(target, name);
        self.entries.set_dirty(&resolved, value & 0xFFFF_FFFF);
    }

    /// Push dirty entries to the target. Returns how many were written.
    pub fn flush<T: TargetAccess + ?Sized>(&mut self, target: &mut T) -> CacheResult<usize> {
        let pending: Vec<(String, u64)> = self
            .entries
            .dirty_entries()
            .into_iter()
            .map(|(name, value)| (name, *value))
            .collect();

        for (name, value) in &pending {
            target
                .write_register(name, *value)
                .map_err(|source| CacheError::RegisterWrite {
                    name: name.clone(),
                    source,
                })?;
            self.entries.mark_clean(name);
        }
        Ok(pending.len())
    }

    pub fn invalidate(&mut self, name: &str) {
        self.entries.invalidate(&canonical_name(name));
    }

    pub fn invalidate_all(&mut self) {
        debug!("register cache invalidated");
        self.entries.invalidate_all();
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.entries
            .entry(&canonical_name(name))
            .is_some_and(|entry| entry.dirty)
    }
}
