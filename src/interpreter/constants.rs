// Constants for the evaluator and statement engine

/// Target pointer width in bytes (32-bit Cortex-M)
pub const POINTER_SIZE: u64 = 4;

/// SPSEL bit of the CONTROL register: set when thread mode runs on PSP
pub const CONTROL_SPSEL: u64 = 1 << 1;

/// Hard cap on list/list-out loop iterations
pub const DEFAULT_MAX_LOOP_ITERATIONS: usize = 100_000;

/// Hard cap on elements collected by one readlist
pub const DEFAULT_MAX_LIST_ELEMENTS: usize = 100_000;

/// Chunk granularity of the target memory cache
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// Longest string followed through a pointer by `%N` / `%U`
pub const DEFAULT_MAX_STRING_LEN: usize = 512;
