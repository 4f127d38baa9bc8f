//! Resolution host: the evaluator's only window onto the data model
//!
//! The evaluator never touches memory or the description objects itself. It
//! asks the host to resolve names into references, to step from a reference
//! to a member or element, and to read or write through a resolved
//! [`RefContainer`]. Optional capabilities have default methods that report
//! [`HostError::NotSupported`], which the evaluator turns into an error.
//!
//! # Required methods
//!
//! - [`ResolutionHost::symbol_ref`]: identifier → reference
//! - [`ResolutionHost::member_ref`]: reference + member name → reference
//! - [`ResolutionHost::read_value`] / [`ResolutionHost::write_value`]
//!
//! # Intrinsics
//!
//! One method per intrinsic (`__GetRegVal`, `__FindSymbol`, `__CalcMemUsed`,
//! `__size_of`, `__Symbol_exists`, `__Offset_of`, `__Running`).

use crate::interpreter::context::RefContainer;
use crate::memory::value::{ScalarType, Value};
use crate::memory::CacheError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    /// The host does not implement this capability
    #[error("{0} is not supported by this host")]
    NotSupported(&'static str),

    /// The capability exists but produced no value
    #[error("'{0}' is undefined")]
    Undefined(String),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type HostResult<T> = Result<T, HostError>;

pub trait ResolutionHost {
    /// Handle to a resolved symbol, member or element
    type Ref: Clone + fmt::Debug;

    /// Resolve an identifier against the root base
    fn symbol_ref(&mut self, root: &Self::Ref, name: &str) -> HostResult<Self::Ref>;

    /// Resolve `property` as a member of `base`
    fn member_ref(&mut self, base: &Self::Ref, property: &str) -> HostResult<Self::Ref>;

    fn read_value(&mut self, container: &RefContainer<Self::Ref>) -> HostResult<Value>;

    /// Store `value` and return what was actually stored
    fn write_value(&mut self, container: &RefContainer<Self::Ref>, value: &Value)
        -> HostResult<Value>;

    /// Bytes between consecutive elements of `array`
    fn element_stride(&mut self, array: &Self::Ref) -> HostResult<u64> {
        self.target_size(array)
    }

    /// Byte offset of `member` inside `base`
    fn member_offset(&mut self, _base: &Self::Ref, _member: &Self::Ref) -> HostResult<u64> {
        Ok(0)
    }

    /// Reference to element `index` of `array`
    fn element_ref(&mut self, array: &Self::Ref, _index: u64) -> HostResult<Self::Ref> {
        Ok(array.clone())
    }

    /// Size in bytes of the referenced object as stored on the target
    fn target_size(&mut self, _item: &Self::Ref) -> HostResult<u64> {
        Err(HostError::NotSupported("target_size"))
    }

    fn value_type(&mut self, _item: &Self::Ref) -> Option<ScalarType> {
        None
    }

    /// Format override for one printf segment; `None` defers to the built-in
    /// specifier engine
    fn format_printf(
        &mut self,
        _spec: char,
        _value: &Value,
        _container: &RefContainer<Self::Ref>,
    ) -> HostResult<Option<String>> {
        Ok(None)
    }

    /// Enumerator text for `value` of the referenced member (`%E`)
    fn enum_text(&mut self, _container: &RefContainer<Self::Ref>, _value: &Value) -> Option<String> {
        None
    }

    /// Name of the symbol containing `address` (`%C`, `%S`)
    fn symbol_name(&mut self, _address: u64) -> Option<String> {
        None
    }

    /// Raw target bytes, used to follow string pointers (`%N`, `%U`)
    fn read_bytes(&mut self, _address: u64, _len: usize) -> HostResult<Vec<u8>> {
        Err(HostError::NotSupported("read_bytes"))
    }

    /// Value of a `type:member[:enumerator]` selector
    fn colon_path(&mut self, _parts: &[String]) -> HostResult<Value> {
        Err(HostError::NotSupported("colon paths"))
    }

    /// Call a user function
    fn call(&mut self, name: &str, _args: &[Value]) -> HostResult<Value> {
        Err(HostError::Undefined(name.to_string()))
    }

    fn get_reg_val(&mut self, _register: &str) -> HostResult<Value> {
        Err(HostError::NotSupported("__GetRegVal"))
    }

    fn find_symbol(&mut self, _symbol: &str) -> HostResult<Value> {
        Err(HostError::NotSupported("__FindSymbol"))
    }

    /// Stack usage of a fill-pattern painted region
    fn calc_mem_used(
        &mut self,
        _address: u64,
        _size: u64,
        _fill_pattern: u64,
        _magic: u64,
    ) -> HostResult<Value> {
        Err(HostError::NotSupported("__CalcMemUsed"))
    }

    fn size_of(&mut self, _symbol: &str) -> HostResult<Value> {
        Err(HostError::NotSupported("__size_of"))
    }

    fn symbol_exists(&mut self, _symbol: &str) -> HostResult<Value> {
        Err(HostError::NotSupported("__Symbol_exists"))
    }

    fn offset_of(&mut self, _path: &str) -> HostResult<Value> {
        Err(HostError::NotSupported("__Offset_of"))
    }

    fn running(&mut self) -> HostResult<Value> {
        Err(HostError::NotSupported("__Running"))
    }
}
