//! Values, caches and target access
//!
//! This module provides everything between the evaluator and the target:
//! - [`value`]: tagged runtime values, declared scalar types, byte codec
//! - [`arith`]: exact arithmetic over tagged values
//! - [`bits`]: bit-field extraction and injection
//! - [`validity`]: generic cache with valid/dirty flags
//! - [`registers`]: register cache with alias and banked-SP resolution
//! - [`container`] / [`store`]: per-symbol byte buffers with element metadata
//! - [`chunked`]: chunk-aligned cache over target memory
//! - [`target`]: the [`target::TargetAccess`] boundary and a simulated target
//! - [`session`]: the caches bundled with a target handle
//!
//! # Failure model
//!
//! Target reads report failure as `None`; the caches turn that into a
//! [`CacheError`] and never substitute zero bytes.

pub mod arith;
pub mod bits;
pub mod chunked;
pub mod container;
pub mod registers;
pub mod session;
pub mod store;
pub mod target;
pub mod validity;
pub mod value;

use target::TargetError;
use thiserror::Error;

/// Errors raised by the cache layer
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    #[error("Target read of {size} bytes at 0x{address:08x} failed")]
    TargetRead { address: u64, size: usize },

    #[error("Short read at 0x{address:08x}: expected {expected} bytes, got {actual}")]
    ShortRead {
        address: u64,
        expected: usize,
        actual: usize,
    },

    #[error("Target write at 0x{address:08x} failed: {source}")]
    TargetWrite {
        address: u64,
        #[source]
        source: TargetError,
    },

    #[error("Register '{0}' is unavailable")]
    RegisterUnavailable(String),

    #[error("Writing register '{name}' failed: {source}")]
    RegisterWrite {
        name: String,
        #[source]
        source: TargetError,
    },

    #[error("No stored data for symbol '{0}'")]
    UnknownSymbol(String),

    #[error("Range {offset}+{size} is outside the {len} stored bytes")]
    OutOfRange { offset: u64, size: u64, len: u64 },
}

pub type CacheResult<T> = Result<T, CacheError>;
