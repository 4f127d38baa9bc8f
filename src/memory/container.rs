//! Per-symbol memory container
//!
//! A growable byte buffer holding what statements have read or stored for
//! one symbol. Appended elements remember their offset, logical size and the
//! target address they were read from, so "element N's address" can be
//! answered without re-deriving it from raw bytes.

use super::{CacheError, CacheResult};

/// Placement of one appended element inside a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementInfo {
    pub offset: u64,
    pub size: u64,
    /// Leading bytes that came from the target; the rest are virtual
    pub target_size: u64,
    pub base_address: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryContainer {
    bytes: Vec<u8>,
    /// `(offset, size)` most recently materialized
    window: (u64, u64),
    elements: Vec<ElementInfo>,
    /// Survives [`super::store::SymbolStore::clear_transient`]
    pub persistent: bool,
}

impl MemoryContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Grow the buffer so `[offset, offset + size)` exists. Never shrinks.
    pub fn ensure(&mut self, offset: u64, size: u64) -> CacheResult<()> {
        let end = offset
            .checked_add(size)
            .and_then(|end| usize::try_from(end).ok())
            .ok_or(CacheError::OutOfRange {
                offset,
                size,
                len: self.bytes.len() as u64,
            })?;
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.window = (offset, size);
        Ok(())
    }

    /// Bytes at `[offset, offset + size)`; the range must already exist.
    pub fn read(&self, offset: u64, size: u64) -> CacheResult<&[u8]> {
        let out_of_range = || CacheError::OutOfRange {
            offset,
            size,
            len: self.bytes.len() as u64,
        };
        let start = usize::try_from(offset).map_err(|_| out_of_range())?;
        let end = start
            .checked_add(usize::try_from(size).map_err(|_| out_of_range())?)
            .ok_or_else(out_of_range)?;
        self.bytes.get(start..end).ok_or_else(out_of_range)
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) -> CacheResult<()> {
        self.ensure(offset, data.len() as u64)?;
        let start = offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    /// Append one element. The element occupies `logical_size` bytes (at
    /// least `data.len()`); the tail past `data` is zero-filled room for
    /// virtual members.
    pub fn append(&mut self, data: &[u8], logical_size: u64, base_address: Option<u64>) -> u64 {
        let offset = self.bytes.len() as u64;
        let size = logical_size.max(data.len() as u64);
        self.bytes.extend_from_slice(data);
        self.bytes.resize((offset + size) as usize, 0);
        self.elements.push(ElementInfo {
            offset,
            size,
            target_size: data.len() as u64,
            base_address,
        });
        self.window = (offset, size);
        offset
    }

    pub fn element(&self, index: usize) -> Option<&ElementInfo> {
        self.elements.get(index)
    }

    pub fn element_address(&self, index: usize) -> Option<u64> {
        self.element(index).and_then(|e| e.base_address)
    }

    pub fn element_size(&self, index: usize) -> Option<u64> {
        self.element(index).map(|e| e.size)
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Target address backing `offset`, if the enclosing element was read
    /// from the target. Virtual bytes have none.
    pub fn absolute_address(&self, offset: u64) -> Option<u64> {
        self.target_span(offset, 1).map(|(address, _)| address)
    }

    /// Target range behind `len` bytes at `offset`: the address of `offset`
    /// and how many of the bytes lie in the enclosing element's target
    /// bytes. The range stops where the virtual tail or the next element
    /// begins.
    pub fn target_span(&self, offset: u64, len: u64) -> Option<(u64, u64)> {
        let element = self
            .elements
            .iter()
            .find(|e| offset >= e.offset && offset < e.offset + e.target_size)?;
        let base = element.base_address?;
        let backed = (element.offset + element.target_size - offset).min(len);
        Some((base + (offset - element.offset), backed))
    }

    pub fn window(&self) -> (u64, u64) {
        self.window
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
        self.elements.clear();
        self.window = (0, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_monotonically() {
        let mut c = MemoryContainer::new();
        c.write(8, &[1, 2]).unwrap();
        assert_eq!(c.len(), 10);
        c.ensure(0, 4).unwrap();
        assert_eq!(c.len(), 10);
        assert_eq!(c.window(), (0, 4));
        assert_eq!(c.read(8, 2).unwrap(), &[1, 2]);
        assert!(c.read(9, 2).is_err());
    }

    #[test]
    fn test_element_metadata() {
        let mut c = MemoryContainer::new();
        assert_eq!(c.append(&[1, 2, 3, 4], 4, Some(0x2000_0010)), 0);
        assert_eq!(c.append(&[5, 6, 7, 8], 8, Some(0x2000_0040)), 4);

        assert_eq!(c.element_count(), 2);
        assert_eq!(c.element_address(1), Some(0x2000_0040));
        assert_eq!(c.element_size(1), Some(8));
        assert_eq!(c.len(), 12);
        assert_eq!(c.absolute_address(6), Some(0x2000_0042));
        // Bytes 8..12 are the virtual tail of the second element
        assert_eq!(c.absolute_address(9), None);
        assert_eq!(c.absolute_address(12), None);
    }

    #[test]
    fn test_target_span_stops_at_element_end() {
        let mut c = MemoryContainer::new();
        c.append(&[0; 4], 6, Some(0x2000_0010));
        c.append(&[0; 4], 4, Some(0x2000_0080));

        assert_eq!(c.target_span(1, 2), Some((0x2000_0011, 2)));
        // Runs into the virtual tail and on into the next element
        assert_eq!(c.target_span(2, 8), Some((0x2000_0012, 2)));
        assert_eq!(c.target_span(4, 2), None);
        assert_eq!(c.target_span(6, 8), Some((0x2000_0080, 4)));
    }

    #[test]
    fn test_local_elements_have_no_address() {
        let mut c = MemoryContainer::new();
        c.append(&[0; 4], 4, None);
        assert_eq!(c.absolute_address(0), None);
        c.clear();
        assert!(c.is_empty());
        assert_eq!(c.element_count(), 0);
    }
}
