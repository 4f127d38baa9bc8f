//! `read`, `readlist` and `var` statements
//!
//! Reads fetch target bytes through the session's chunk cache and append
//! them to the symbol store one element at a time, padded to the type's
//! virtual size and tagged with the element's target address.
//!
//! A readlist collects elements in one of three shapes:
//! - consecutive elements at `symbol + offset`;
//! - a pointer table at `symbol + offset` (`based` without `next`);
//! - a linked list followed through the `next` member, starting at
//!   `symbol + offset` or, when `based`, at the pointer stored there.
//!
//! Linked-list traversal stops on a null pointer, on the declared count, on
//! an address it has already visited (reported as a cycle) and on the
//! element guard of the engine configuration.

use crate::interpreter::constants::POINTER_SIZE;
use crate::memory::store::APPEND;
use crate::memory::target::TargetAccess;
use crate::memory::value::{ScalarType, Value};
use crate::model::{Expression, ReadListSpec, ReadSpec, TypeRef, VarSpec};
use crate::statements::engine::{PassEvent, StatementEngine};
use crate::statements::errors::StatementError;
use crate::statements::tree::Statement;
use log::{debug, warn};
use rustc_hash::FxHashSet;

/// Target and virtual byte size of one element
#[derive(Debug, Clone, Copy)]
struct ElementSize {
    target: u64,
    logical: u64,
}

impl<'d, T: TargetAccess> StatementEngine<'d, T> {
    pub(crate) fn exec_read(&mut self, statement: &Statement<'d>, spec: &ReadSpec) -> Result<(), StatementError> {
        if spec.constant && self.satisfied.contains(&statement.id) {
            return Ok(());
        }
        let line = statement.line();
        let size = self.element_size(line, &spec.ty)?;
        let base = self.base_address(line, spec.symbol.as_deref(), spec.offset.as_ref())?;
        let count = match &spec.size {
            Some(expr) => self.eval_count(line, "size", expr)?,
            None => 1,
        };

        let total = count
            .checked_mul(size.target)
            .filter(|&total| base.checked_add(total).is_some())
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| StatementError::Invalid {
                line,
                message: format!(
                    "{} x {} bytes at 0x{:08x} exceed the address space",
                    count, size.target, base
                ),
            })?;
        let bytes = if total == 0 {
            Vec::new()
        } else {
            self.session
                .read_memory(base, total)
                .map_err(|source| StatementError::Cache { line, source })?
        };

        self.session.store.clear(&spec.name);
        for (i, element) in bytes.chunks(size.target as usize).enumerate() {
            let address = element_address(line, base, i as u64, size.target)?;
            self.session
                .store
                .store(&spec.name, APPEND, element, size.logical, Some(address))
                .map_err(|source| StatementError::Cache { line, source })?;
        }
        debug!("read '{}': {} x {} bytes at 0x{:08x}", spec.name, count, size.target, base);

        if spec.constant {
            self.session.store.set_persistent(&spec.name, true);
            self.satisfied.insert(statement.id);
        }
        Ok(())
    }

    pub(crate) fn exec_readlist(
        &mut self,
        statement: &Statement<'d>,
        spec: &ReadListSpec,
    ) -> Result<(), StatementError> {
        if spec.constant && self.satisfied.contains(&statement.id) {
            return Ok(());
        }
        let line = statement.line();
        if spec.init {
            self.session.store.clear(&spec.name);
        }
        // The container exists even when no element is collected
        self.session.store.container_mut(&spec.name);

        let size = self.element_size(line, &spec.ty)?;
        let base = self.base_address(line, spec.symbol.as_deref(), spec.offset.as_ref())?;
        let limit = match &spec.count {
            Some(expr) => Some(self.eval_count(line, "count", expr)?),
            None => None,
        };

        match (&spec.next, spec.based) {
            (Some(next), based) => {
                let head = if based { self.read_pointer(line, base)? } else { base };
                self.follow_list(line, spec, next, head, limit, size)?;
            }
            (None, true) => {
                for i in 0..limit.unwrap_or(1) {
                    let slot = element_address(line, base, i, POINTER_SIZE)?;
                    let pointer = self.read_pointer(line, slot)?;
                    if pointer != 0 {
                        self.append_element(line, &spec.name, pointer, size)?;
                    }
                }
            }
            (None, false) => {
                for i in 0..limit.unwrap_or(1) {
                    let address = element_address(line, base, i, size.target)?;
                    self.append_element(line, &spec.name, address, size)?;
                }
            }
        }

        if spec.constant {
            self.session.store.set_persistent(&spec.name, true);
            self.satisfied.insert(statement.id);
        }
        Ok(())
    }

    fn follow_list(
        &mut self,
        line: u32,
        spec: &ReadListSpec,
        next: &str,
        head: u64,
        limit: Option<u64>,
        size: ElementSize,
    ) -> Result<(), StatementError> {
        let description = self.description;
        let member = description
            .types
            .typedef_of(&spec.ty)
            .and_then(|t| t.find(next))
            .ok_or_else(|| StatementError::Invalid {
                line,
                message: format!("'{}' has no member '{}'", spec.name, next),
            })?;
        let pointer_type = member
            .ty
            .scalar()
            .filter(|ty| !ty.is_float())
            .unwrap_or(ScalarType::uint(POINTER_SIZE as u32 * 8));

        let guard = self.config.max_list_elements;
        let mut visited = FxHashSet::default();
        let mut address = head;
        let mut collected = 0u64;

        while address != 0 {
            if limit.is_some_and(|limit| collected >= limit) {
                break;
            }
            if collected as usize >= guard {
                warn!("readlist '{}' stopped after {} elements", spec.name, guard);
                self.report.events.push(PassEvent::ListLimitReached {
                    symbol: spec.name.clone(),
                    limit: guard,
                });
                break;
            }
            if !visited.insert(address) {
                warn!("readlist '{}' loops back to 0x{:08x}", spec.name, address);
                self.report.events.push(PassEvent::CycleDetected {
                    symbol: spec.name.clone(),
                    address,
                });
                break;
            }

            let bytes = self.append_element(line, &spec.name, address, size)?;
            collected += 1;

            let start = member.offset as usize;
            address = bytes
                .get(start..)
                .and_then(|tail| Value::decode(tail, pointer_type))
                .and_then(|v| v.as_u64())
                .ok_or_else(|| StatementError::Invalid {
                    line,
                    message: format!("member '{}' lies outside the element", next),
                })?;
        }
        debug!("readlist '{}': {} elements", spec.name, collected);
        Ok(())
    }

    pub(crate) fn exec_var(&mut self, statement: &Statement<'d>, spec: &VarSpec) -> Result<(), StatementError> {
        let line = statement.line();
        let bytes = match &spec.ty {
            TypeRef::Scalar(ty) => {
                let value = match &spec.value {
                    Some(expr) => self.eval_at(line, "value", expr)?,
                    None => Value::I32(0),
                };
                value
                    .coerce(*ty)
                    .and_then(|v| v.encode(*ty))
                    .ok_or_else(|| StatementError::Invalid {
                        line,
                        message: format!("'{}' does not fit {}", value, ty),
                    })?
            }
            named => vec![0; self.element_size(line, named)?.logical as usize],
        };

        let offset = if spec.append { APPEND } else { 0 };
        let width = bytes.len() as u64;
        self.session
            .store
            .store(&spec.name, offset, &bytes, width, None)
            .map_err(|source| StatementError::Cache { line, source })?;
        Ok(())
    }

    // ===== Helpers =====

    fn element_size(&self, line: u32, ty: &TypeRef) -> Result<ElementSize, StatementError> {
        let types = &self.description.types;
        let unknown = || StatementError::UnknownType {
            line,
            name: match ty {
                TypeRef::Named(name) => name.clone(),
                TypeRef::Scalar(s) => s.to_string(),
            },
        };
        let target = types.target_size(ty).ok_or_else(unknown)?;
        let logical = types.virtual_size(ty).ok_or_else(unknown)?;
        if target == 0 {
            return Err(StatementError::Invalid {
                line,
                message: format!("type {:?} has no target bytes", ty),
            });
        }
        Ok(ElementSize { target, logical })
    }

    /// `symbol + offset`; at least one of the two is required
    fn base_address(
        &mut self,
        line: u32,
        symbol: Option<&str>,
        offset: Option<&Expression>,
    ) -> Result<u64, StatementError> {
        let mut base = None;
        if let Some(name) = symbol {
            let address = self
                .session
                .symbol_address(name)
                .ok_or_else(|| StatementError::UnresolvedSymbol {
                    line,
                    name: name.to_string(),
                })?;
            base = Some(address);
        }
        if let Some(expr) = offset {
            let value = self.eval_at(line, "offset", expr)?;
            let delta = value
                .as_i128()
                .filter(|_| value.is_integral())
                .ok_or_else(|| StatementError::Invalid {
                    line,
                    message: format!("offset '{}' is not an integer", value),
                })?;
            let start = base.unwrap_or(0);
            let address = u64::try_from(start as i128 + delta).map_err(|_| StatementError::Invalid {
                line,
                message: format!("0x{:08x} + {} lies outside the address space", start, delta),
            })?;
            base = Some(address);
        }
        base.ok_or_else(|| StatementError::Invalid {
            line,
            message: "needs a symbol or an offset".to_string(),
        })
    }

    fn eval_count(&mut self, line: u32, what: &'static str, expr: &Expression) -> Result<u64, StatementError> {
        let value = self.eval_at(line, what, expr)?;
        match value.as_i128() {
            Some(n) if n >= 0 && value.is_integral() => Ok(n as u64),
            _ => Err(StatementError::Invalid {
                line,
                message: format!("{} '{}' is not a non-negative integer", what, value),
            }),
        }
    }

    fn read_pointer(&mut self, line: u32, address: u64) -> Result<u64, StatementError> {
        let bytes = self
            .session
            .read_memory(address, POINTER_SIZE as usize)
            .map_err(|source| StatementError::Cache { line, source })?;
        Ok(Value::decode(&bytes, ScalarType::uint(POINTER_SIZE as u32 * 8))
            .and_then(|v| v.as_u64())
            .unwrap_or(0))
    }

    /// Read one element at `address` and append it to `name`
    fn append_element(
        &mut self,
        line: u32,
        name: &str,
        address: u64,
        size: ElementSize,
    ) -> Result<Vec<u8>, StatementError> {
        let bytes = self
            .session
            .read_memory(address, size.target as usize)
            .map_err(|source| StatementError::Cache { line, source })?;
        self.session
            .store
            .store(name, APPEND, &bytes, size.logical, Some(address))
            .map_err(|source| StatementError::Cache { line, source })?;
        Ok(bytes)
    }
}

/// `base + index * stride`
fn element_address(line: u32, base: u64, index: u64, stride: u64) -> Result<u64, StatementError> {
    index
        .checked_mul(stride)
        .and_then(|delta| base.checked_add(delta))
        .ok_or_else(|| StatementError::Invalid {
            line,
            message: format!(
                "element {} of {} bytes at 0x{:08x} lies outside the address space",
                index, stride, base
            ),
        })
}
