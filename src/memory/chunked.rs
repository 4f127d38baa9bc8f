//! Chunked target-memory cache
//!
//! Target memory is mirrored in aligned chunks of `chunk_size` bytes. A read
//! fetches only the chunks it is missing, one target transaction per
//! contiguous run of missing chunks, so re-reading a region costs no target
//! traffic at all. Writes go straight to the target and patch any cached
//! chunk they overlap.

use super::target::TargetAccess;
use super::{CacheError, CacheResult};
use log::{debug, trace};
use rustc_hash::FxHashMap;

#[derive(Debug)]
pub struct ChunkCache {
    chunk_size: u64,
    chunks: FxHashMap<u64, Vec<u8>>,
}

impl ChunkCache {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1) as u64,
            chunks: FxHashMap::default(),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size as usize
    }

    /// Read `size` bytes at `address` through the cache
    pub fn read<T: TargetAccess + ?Sized>(
        &mut self,
        target: &T,
        address: u64,
        size: usize,
    ) -> CacheResult<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let end = address
            .checked_add(size as u64)
            .ok_or(CacheError::TargetRead { address, size })?;

        let first = address / self.chunk_size;
        let last = (end - 1) / self.chunk_size;

        if !self.fill(target, first, last) {
            // Aligned fetch failed (e.g. crosses the end of a mapped region):
            // read exactly what was asked for, uncached.
            debug!(
                "aligned fetch around 0x{:08x} failed, reading {} bytes directly",
                address, size
            );
            return direct_read(target, address, size);
        }

        let mut out = Vec::with_capacity(size);
        for index in first..=last {
            let chunk = self
                .chunks
                .get(&index)
                .ok_or(CacheError::TargetRead { address, size })?;
            let chunk_base = index * self.chunk_size;
            let from = address.max(chunk_base) - chunk_base;
            let to = end.min(chunk_base.saturating_add(self.chunk_size)) - chunk_base;
            out.extend_from_slice(&chunk[from as usize..to as usize]);
        }
        Ok(out)
    }

    /// Fetch every missing chunk in `first..=last`. Returns `false` if any
    /// run could not be fetched.
    fn fill<T: TargetAccess + ?Sized>(&mut self, target: &T, first: u64, last: u64) -> bool {
        let mut index = first;
        while index <= last {
            if self.chunks.contains_key(&index) {
                index += 1;
                continue;
            }
            let run_start = index;
            while index <= last && !self.chunks.contains_key(&index) {
                index += 1;
            }
            let run_len = index - run_start;

            let base = run_start * self.chunk_size;
            let len = (run_len * self.chunk_size) as usize;
            trace!("fetching {} chunk(s) at 0x{:08x}", run_len, base);
            match target.read_memory(base, len) {
                Some(bytes) if bytes.len() == len => {
                    for (i, chunk) in bytes.chunks(self.chunk_size as usize).enumerate() {
                        self.chunks.insert(run_start + i as u64, chunk.to_vec());
                    }
                }
                _ => return false,
            }
        }
        true
    }

    /// Write through to the target, then patch cached chunks
    pub fn write<T: TargetAccess + ?Sized>(
        &mut self,
        target: &mut T,
        address: u64,
        data: &[u8],
    ) -> CacheResult<()> {
        target
            .write_memory(address, data)
            .map_err(|source| CacheError::TargetWrite { address, source })?;

        for (i, byte) in data.iter().enumerate() {
            let at = address + i as u64;
            if let Some(chunk) = self.chunks.get_mut(&(at / self.chunk_size)) {
                chunk[(at % self.chunk_size) as usize] = *byte;
            }
        }
        Ok(())
    }

    /// Drop every cached chunk overlapping `[address, address + size)`
    pub fn invalidate_range(&mut self, address: u64, size: usize) {
        if size == 0 {
            return;
        }
        let first = address / self.chunk_size;
        let last = address.saturating_add(size as u64 - 1) / self.chunk_size;
        self.chunks.retain(|index, _| *index < first || *index > last);
    }

    pub fn invalidate_all(&mut self) {
        debug!("memory cache invalidated ({} chunks)", self.chunks.len());
        self.chunks.clear();
    }

    pub fn cached_chunks(&self) -> usize {
        self.chunks.len()
    }
}

fn direct_read<T: TargetAccess + ?Sized>(target: &T, address: u64, size: usize) -> CacheResult<Vec<u8>> {
    let bytes = target
        .read_memory(address, size)
        .ok_or(CacheError::TargetRead { address, size })?;
    if bytes.len() < size {
        return Err(CacheError::ShortRead {
            address,
            expected: size,
            actual: bytes.len(),
        });
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::target::SimulatedTarget;

    fn target() -> SimulatedTarget {
        let mut target = SimulatedTarget::new().with_region(0x2000_0000, 0x100);
        for i in 0..0x100u64 {
            target.poke(0x2000_0000 + i, &[i as u8]);
        }
        target
    }

    #[test]
    fn test_repeated_read_is_free() {
        let target = target();
        let mut cache = ChunkCache::new(16);

        assert_eq!(cache.read(&target, 0x2000_0004, 4).unwrap(), vec![4, 5, 6, 7]);
        assert_eq!(target.counts().memory_reads, 1);
        assert_eq!(target.read_log(), vec![(0x2000_0000, 16)]);

        cache.read(&target, 0x2000_0000, 16).unwrap();
        assert_eq!(target.counts().memory_reads, 1);
    }

    #[test]
    fn test_fetches_only_missing_chunks() {
        let target = target();
        let mut cache = ChunkCache::new(16);
        cache.read(&target, 0x2000_0010, 4).unwrap();
        target.reset_counts();

        let bytes = cache.read(&target, 0x2000_0008, 0x20).unwrap();
        assert_eq!(bytes.len(), 0x20);
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[0x1F], 0x27);
        assert_eq!(target.read_log(), vec![(0x2000_0000, 16), (0x2000_0020, 16)]);
    }

    #[test]
    fn test_falls_back_to_direct_read_at_region_end() {
        let target = target();
        // one chunk would span past the mapped region
        let mut cache = ChunkCache::new(0x200);
        assert_eq!(
            cache.read(&target, 0x2000_00FC, 4).unwrap(),
            vec![0xFC, 0xFD, 0xFE, 0xFF]
        );
        assert_eq!(cache.cached_chunks(), 0);
        assert!(matches!(
            cache.read(&target, 0x2000_00FC, 8),
            Err(CacheError::TargetRead { .. })
        ));
    }

    #[test]
    fn test_write_through() {
        let mut target = target();
        let mut cache = ChunkCache::new(16);
        cache.read(&target, 0x2000_0000, 4).unwrap();

        cache.write(&mut target, 0x2000_0002, &[0xAA, 0xBB]).unwrap();
        assert_eq!(target.peek(0x2000_0002, 2), Some(vec![0xAA, 0xBB]));
        assert_eq!(cache.read(&target, 0x2000_0000, 4).unwrap(), vec![0, 1, 0xAA, 0xBB]);
        assert_eq!(target.counts().memory_reads, 1);
    }

    #[test]
    fn test_invalidate_refetches() {
        let target = target();
        let mut cache = ChunkCache::new(16);
        cache.read(&target, 0x2000_0000, 4).unwrap();
        cache.invalidate_range(0x2000_0002, 1);
        cache.read(&target, 0x2000_0000, 4).unwrap();
        assert_eq!(target.counts().memory_reads, 2);

        cache.invalidate_all();
        assert_eq!(cache.cached_chunks(), 0);
    }
}
