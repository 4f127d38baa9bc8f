//! Resolution host over the description model and the target session
//!
//! Symbols are the names the statements declare (`read`, `readlist`, `var`,
//! loop variables); their bytes live in the session's symbol store. Member
//! and element steps are computed from the typedefs:
//! - element stride is the type's virtual size, so virtual members of every
//!   element are addressable;
//! - bit-field members read and write through the bit packer;
//! - `name._count` and `name[i]._addr` are served from per-element
//!   metadata of the store.
//!
//! Writes go through [`TargetSession::write_symbol`], which forwards bytes
//! that came from the target to the device.

use crate::interpreter::{HostError, HostResult, RefContainer, ResolutionHost};
use crate::memory::bits::{extract_bits, inject_bits, mask, sign_extend};
use crate::memory::session::TargetSession;
use crate::memory::target::TargetAccess;
use crate::memory::value::{ScalarType, Value};
use crate::model::{Description, Member, TypeRef};
use log::debug;
use rustc_hash::FxHashMap;

/// Reference handed to the evaluator
#[derive(Debug, Clone, PartialEq)]
pub enum HostRef {
    Root,
    Symbol { name: String, ty: TypeRef },
    /// Member `index` of typedef `owner`
    Member { owner: String, index: usize },
    Element { ty: TypeRef },
    /// `_count` pseudo member
    Count,
    /// `_addr` pseudo member
    Address,
}

pub struct EngineHost<'a, T> {
    description: &'a Description,
    symbols: &'a FxHashMap<String, TypeRef>,
    session: &'a mut TargetSession<T>,
    chunk_size: usize,
}

impl<'a, T: TargetAccess> EngineHost<'a, T> {
    pub fn new(
        description: &'a Description,
        symbols: &'a FxHashMap<String, TypeRef>,
        session: &'a mut TargetSession<T>,
    ) -> Self {
        let chunk_size = session.memory.chunk_size();
        EngineHost {
            description,
            symbols,
            session,
            chunk_size,
        }
    }

    pub fn session(&mut self) -> &mut TargetSession<T> {
        self.session
    }

    fn member(&self, item: &HostRef) -> Option<&'a Member> {
        match item {
            HostRef::Member { owner, index } => {
                self.description.types.get(owner)?.members.get(*index)
            }
            _ => None,
        }
    }

    fn type_of(&self, item: &HostRef) -> Option<TypeRef> {
        match item {
            HostRef::Symbol { ty, .. } | HostRef::Element { ty } => Some(ty.clone()),
            HostRef::Member { .. } => self.member(item).map(|m| m.ty.clone()),
            _ => None,
        }
    }

    /// Bytes of one element of a member
    fn member_element_size(&self, member: &Member) -> Option<u64> {
        let types = &self.description.types;
        if member.is_virtual {
            types.virtual_size(&member.ty)
        } else {
            types.target_size(&member.ty)
        }
    }

    fn anchor_name<'c>(&self, container: &'c RefContainer<HostRef>) -> HostResult<&'c str> {
        match &container.anchor {
            Some(HostRef::Symbol { name, .. }) => Ok(name),
            _ => Err(HostError::Undefined("anchor symbol".to_string())),
        }
    }

    fn symbol_element_size(&self, name: &str) -> Option<u64> {
        let ty = self.symbols.get(name)?;
        self.description.types.target_size(ty)
    }
}

fn address_value(address: u64) -> Value {
    match u32::try_from(address) {
        Ok(a) => Value::U32(a),
        Err(_) => Value::U64(address),
    }
}

fn bitfield_value(raw: u64, len: u32, ty: Option<ScalarType>) -> Value {
    match ty {
        Some(ty) if ty.is_signed() && !ty.is_float() => {
            let v = sign_extend(raw, len);
            match i32::try_from(v) {
                Ok(n) => Value::I32(n),
                Err(_) => Value::I64(v),
            }
        }
        _ => address_value(raw),
    }
}

impl<T: TargetAccess> ResolutionHost for EngineHost<'_, T> {
    type Ref = HostRef;

    fn symbol_ref(&mut self, _root: &HostRef, name: &str) -> HostResult<HostRef> {
        match self.symbols.get(name) {
            Some(ty) => Ok(HostRef::Symbol {
                name: name.to_string(),
                ty: ty.clone(),
            }),
            None => Err(HostError::Undefined(name.to_string())),
        }
    }

    fn member_ref(&mut self, base: &HostRef, property: &str) -> HostResult<HostRef> {
        match (base, property) {
            (HostRef::Symbol { .. }, "_count") => return Ok(HostRef::Count),
            (HostRef::Symbol { .. } | HostRef::Element { .. }, "_addr") => {
                return Ok(HostRef::Address)
            }
            _ => {}
        }

        let undefined = || HostError::Undefined(format!(".{}", property));
        let Some(TypeRef::Named(owner)) = self.type_of(base) else {
            return Err(undefined());
        };
        let index = self
            .description
            .types
            .get(&owner)
            .and_then(|t| t.find_index(property))
            .ok_or_else(undefined)?;
        Ok(HostRef::Member { owner, index })
    }

    fn read_value(&mut self, container: &RefContainer<HostRef>) -> HostResult<Value> {
        let name = self.anchor_name(container)?;
        let current = container.current.as_ref().unwrap_or(&HostRef::Root);

        match current {
            HostRef::Count => {
                let count = self
                    .session
                    .store
                    .container(name)
                    .map_or(0, |c| c.element_count());
                return Ok(Value::U32(count as u32));
            }
            HostRef::Address => {
                let index = container.index.unwrap_or(0) as usize;
                return self
                    .session
                    .store
                    .container(name)
                    .and_then(|c| c.element_address(index))
                    .map(address_value)
                    .ok_or_else(|| HostError::Undefined(format!("{}[{}]._addr", name, index)));
            }
            _ => {}
        }

        let bytes = self
            .session
            .store
            .read(name, container.offset, container.width)?;

        if let Some(bits) = self.member(current).and_then(|m| m.bits) {
            let raw = extract_bits(&bytes, bits.start as usize, bits.len as usize)
                .ok_or_else(|| HostError::Undefined(format!("bit-field of {}", name)))?;
            return Ok(bitfield_value(raw, bits.len, container.value_type));
        }

        match container.value_type {
            Some(ty) => Value::decode(&bytes, ty)
                .ok_or_else(|| HostError::Undefined(format!("{} as {}", name, ty))),
            None => Ok(Value::Bytes(bytes)),
        }
    }

    fn write_value(&mut self, container: &RefContainer<HostRef>, value: &Value) -> HostResult<Value> {
        let name = self.anchor_name(container)?.to_string();
        let current = container.current.clone().unwrap_or(HostRef::Root);
        if matches!(current, HostRef::Count | HostRef::Address) {
            return Err(HostError::NotSupported("writing pseudo members"));
        }

        if let Some(bits) = self.member(&current).and_then(|m| m.bits) {
            let raw = value
                .as_u64()
                .ok_or_else(|| HostError::Undefined(format!("numeric value for {}", name)))?
                & mask(bits.len);
            let mut storage = self
                .session
                .store
                .read(&name, container.offset, container.width)?;
            if !inject_bits(&mut storage, bits.start as usize, bits.len as usize, raw) {
                return Err(HostError::Undefined(format!("bit-field of {}", name)));
            }
            self.session
                .write_symbol(&name, container.offset, &storage)?;
            return Ok(bitfield_value(raw, bits.len, container.value_type));
        }

        let Some(ty) = container.value_type else {
            return Err(HostError::NotSupported("writing aggregate values"));
        };
        let stored = value
            .coerce(ty)
            .ok_or_else(|| HostError::Undefined(format!("{} as {}", value, ty)))?;
        let bytes = stored
            .encode(ty)
            .ok_or_else(|| HostError::Undefined(format!("{} as {}", value, ty)))?;
        self.session.write_symbol(&name, container.offset, &bytes)?;
        Ok(stored)
    }

    fn element_stride(&mut self, array: &HostRef) -> HostResult<u64> {
        let stride = match array {
            HostRef::Symbol { ty, .. } => self.description.types.virtual_size(ty),
            HostRef::Member { .. } => self.member(array).and_then(|m| self.member_element_size(m)),
            _ => None,
        };
        stride.ok_or(HostError::NotSupported("indexing this value"))
    }

    fn member_offset(&mut self, _base: &HostRef, member: &HostRef) -> HostResult<u64> {
        Ok(self.member(member).map_or(0, |m| m.offset))
    }

    fn element_ref(&mut self, array: &HostRef, _index: u64) -> HostResult<HostRef> {
        self.type_of(array)
            .map(|ty| HostRef::Element { ty })
            .ok_or(HostError::NotSupported("indexing this value"))
    }

    fn target_size(&mut self, item: &HostRef) -> HostResult<u64> {
        let size = match item {
            HostRef::Symbol { ty, .. } | HostRef::Element { ty } => {
                self.description.types.virtual_size(ty)
            }
            HostRef::Member { .. } => self.member(item).and_then(|m| {
                let element = self.member_element_size(m)?;
                Some(element * m.count)
            }),
            HostRef::Count | HostRef::Address => Some(4),
            HostRef::Root => None,
        };
        size.ok_or(HostError::NotSupported("size of this value"))
    }

    fn value_type(&mut self, item: &HostRef) -> Option<ScalarType> {
        match item {
            HostRef::Member { .. } => {
                let member = self.member(item)?;
                if member.count > 1 {
                    None
                } else {
                    member.ty.scalar()
                }
            }
            HostRef::Count | HostRef::Address => Some(ScalarType::uint(32)),
            _ => self.type_of(item).and_then(|ty| ty.scalar()),
        }
    }

    fn enum_text(&mut self, container: &RefContainer<HostRef>, value: &Value) -> Option<String> {
        let member = self.member(container.current.as_ref()?)?;
        member.enum_name(value.as_i64()?).map(str::to_string)
    }

    fn symbol_name(&mut self, address: u64) -> Option<String> {
        self.session.symbol_at(address)
    }

    /// Read up to `len` bytes, chunk by chunk, stopping after the chunk that
    /// holds a terminator
    fn read_bytes(&mut self, address: u64, len: usize) -> HostResult<Vec<u8>> {
        let mut out = Vec::new();
        while out.len() < len {
            let at = address + out.len() as u64;
            let size = (self.chunk_size - (at % self.chunk_size as u64) as usize).min(len - out.len());
            match self.session.read_memory(at, size) {
                Ok(bytes) => {
                    let done = bytes.chunks_exact(2).any(|w| w == [0, 0]) || bytes.len() < 2 && bytes.contains(&0);
                    out.extend_from_slice(&bytes);
                    if done {
                        break;
                    }
                }
                Err(err) if out.is_empty() => return Err(err.into()),
                Err(err) => {
                    debug!("string read stopped at 0x{:08x}: {}", at, err);
                    break;
                }
            }
        }
        Ok(out)
    }

    fn colon_path(&mut self, parts: &[String]) -> HostResult<Value> {
        let undefined = || HostError::Undefined(parts.join(":"));
        match parts {
            [typedef, member] => self
                .description
                .types
                .member(typedef, member)
                .map(|m| address_value(m.offset))
                .ok_or_else(undefined),
            [typedef, member, enumerator] => {
                let value = self
                    .description
                    .types
                    .member(typedef, member)
                    .and_then(|m| m.enum_value(enumerator))
                    .ok_or_else(undefined)?;
                Ok(match i32::try_from(value) {
                    Ok(n) => Value::I32(n),
                    Err(_) => Value::I64(value),
                })
            }
            _ => Err(undefined()),
        }
    }

    fn get_reg_val(&mut self, register: &str) -> HostResult<Value> {
        Ok(Value::U32(self.session.read_register(register)?))
    }

    fn find_symbol(&mut self, symbol: &str) -> HostResult<Value> {
        self.session
            .symbol_address(symbol)
            .map(address_value)
            .ok_or_else(|| HostError::Undefined(symbol.to_string()))
    }

    /// Stack usage of a region painted with `fill_pattern`. The result packs
    /// the used bytes (bits 0..20), the percentage (bits 20..29) and an
    /// overflow flag (bit 31, set when `magic` was overwritten).
    fn calc_mem_used(
        &mut self,
        address: u64,
        size: u64,
        fill_pattern: u64,
        magic: u64,
    ) -> HostResult<Value> {
        let bytes = self.session.read_memory(address, size as usize)?;
        let words: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();

        let (overflow, first) = if magic != 0 {
            (words.first() != Some(&(magic as u32)), 1)
        } else {
            (false, 0)
        };
        let untouched = words
            .iter()
            .skip(first)
            .take_while(|&&w| w == fill_pattern as u32)
            .count();

        let unused = ((first + untouched) * 4) as u64;
        let used = if overflow { size } else { size.saturating_sub(unused) };
        let percent = if size == 0 { 0 } else { used * 100 / size };

        let mut packed = (used & 0xF_FFFF) | ((percent & 0x1FF) << 20);
        if overflow {
            packed |= 1 << 31;
        }
        Ok(Value::U32(packed as u32))
    }

    /// Element count of a declared symbol, byte size of any other
    fn size_of(&mut self, symbol: &str) -> HostResult<Value> {
        let bytes = self
            .session
            .symbol_size(symbol)
            .ok_or_else(|| HostError::Undefined(symbol.to_string()))?;
        let count = match self.symbol_element_size(symbol) {
            Some(element) if element > 0 => bytes / element,
            _ => bytes,
        };
        Ok(address_value(count))
    }

    fn symbol_exists(&mut self, symbol: &str) -> HostResult<Value> {
        Ok(Value::from_bool(self.session.symbol_address(symbol).is_some()))
    }

    fn offset_of(&mut self, path: &str) -> HostResult<Value> {
        let parts: Vec<String> = path.split(':').map(|p| p.trim().to_string()).collect();
        if parts.len() != 2 {
            return Err(HostError::Undefined(path.to_string()));
        }
        self.colon_path(&parts)
    }

    fn running(&mut self) -> HostResult<Value> {
        Ok(Value::from_bool(self.session.is_running()))
    }
}
