// In-memory resolution host for evaluator unit tests

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::EvalResult;
use crate::interpreter::host::{HostError, HostResult, ResolutionHost};
use crate::memory::value::{ScalarType, Value};
use rustc_hash::FxHashMap;

pub const BASE: u64 = 0x2000_0000;

/// Layout of a symbol or member: a scalar type, or named fields
#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub ty: Option<ScalarType>,
    /// Size of one element
    pub size: u64,
    pub fields: Vec<(String, u64, Layout)>,
}

impl Layout {
    pub fn scalar(ty: ScalarType) -> Self {
        Layout {
            ty: Some(ty),
            size: ty.byte_width() as u64,
            fields: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TestRef {
    pub symbol: String,
    pub offset: u64,
    pub layout: Layout,
}

impl TestRef {
    pub fn root() -> Self {
        TestRef {
            symbol: String::new(),
            offset: 0,
            layout: Layout {
                ty: None,
                size: 0,
                fields: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Default)]
pub struct TestHost {
    pub memory: Vec<u8>,
    pub symbols: FxHashMap<String, (u64, Layout)>,
    pub registers: FxHashMap<String, u64>,
    pub reads: usize,
    pub writes: usize,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn place(&mut self, name: &str, bytes: &[u8], layout: Layout) -> u64 {
        let address = BASE + self.memory.len() as u64;
        self.memory.extend_from_slice(bytes);
        self.symbols.insert(name.to_string(), (address, layout));
        address
    }

    pub fn with_scalar(mut self, name: &str, ty: ScalarType, value: Value) -> Self {
        let bytes = value.encode(ty).unwrap_or_default();
        self.place(name, &bytes, Layout::scalar(ty));
        self
    }

    pub fn with_u32(self, name: &str, value: u32) -> Self {
        self.with_scalar(name, ScalarType::uint(32), Value::U32(value))
    }

    pub fn with_array(mut self, name: &str, ty: ScalarType, values: &[i64]) -> Self {
        let mut bytes = Vec::new();
        for v in values {
            bytes.extend(Value::I64(*v).encode(ty).unwrap_or_default());
        }
        self.place(name, &bytes, Layout::scalar(ty));
        self
    }

    /// Array of structs with scalar fields laid out back to back
    pub fn with_structs(mut self, name: &str, fields: &[(&str, ScalarType)], rows: &[&[i64]]) -> Self {
        let mut offset = 0;
        let mut layout_fields = Vec::new();
        for (field, ty) in fields {
            layout_fields.push((field.to_string(), offset, Layout::scalar(*ty)));
            offset += ty.byte_width() as u64;
        }
        let mut bytes = Vec::new();
        for row in rows {
            for ((_, ty), v) in fields.iter().zip(row.iter()) {
                bytes.extend(Value::I64(*v).encode(*ty).unwrap_or_default());
            }
        }
        let layout = Layout {
            ty: None,
            size: offset,
            fields: layout_fields,
        };
        self.place(name, &bytes, layout);
        self
    }

    pub fn with_register(mut self, name: &str, value: u64) -> Self {
        self.registers.insert(name.to_string(), value);
        self
    }

    pub fn address_of(&self, name: &str) -> Option<u64> {
        self.symbols.get(name).map(|(address, _)| *address)
    }

    fn slice(&mut self, address: u64, len: u64) -> HostResult<&mut [u8]> {
        let start = address
            .checked_sub(BASE)
            .ok_or_else(|| HostError::Undefined(format!("0x{:08x}", address)))?
            as usize;
        let end = start + len as usize;
        self.memory
            .get_mut(start..end)
            .ok_or_else(|| HostError::Undefined(format!("0x{:08x}", address)))
    }

    fn container_address(&self, ctx: &RefContainer<TestRef>) -> HostResult<u64> {
        let anchor = ctx
            .anchor
            .as_ref()
            .ok_or_else(|| HostError::Undefined("unresolved reference".into()))?;
        let base = self
            .address_of(&anchor.symbol)
            .ok_or_else(|| HostError::Undefined(anchor.symbol.clone()))?;
        Ok(base + ctx.offset)
    }
}

impl ResolutionHost for TestHost {
    type Ref = TestRef;

    fn symbol_ref(&mut self, _root: &TestRef, name: &str) -> HostResult<TestRef> {
        let (_, layout) = self
            .symbols
            .get(name)
            .ok_or_else(|| HostError::Undefined(name.to_string()))?;
        Ok(TestRef {
            symbol: name.to_string(),
            offset: 0,
            layout: layout.clone(),
        })
    }

    fn member_ref(&mut self, base: &TestRef, property: &str) -> HostResult<TestRef> {
        base.layout
            .fields
            .iter()
            .find(|(name, _, _)| name == property)
            .map(|(_, offset, layout)| TestRef {
                symbol: base.symbol.clone(),
                offset: *offset,
                layout: layout.clone(),
            })
            .ok_or_else(|| HostError::Undefined(property.to_string()))
    }

    fn read_value(&mut self, ctx: &RefContainer<TestRef>) -> HostResult<Value> {
        self.reads += 1;
        let ty = ctx
            .value_type
            .ok_or_else(|| HostError::Undefined("aggregate read".into()))?;
        let address = self.container_address(ctx)?;
        let bytes = self.slice(address, ctx.width)?.to_vec();
        Value::decode(&bytes, ty).ok_or_else(|| HostError::Undefined("decode".into()))
    }

    fn write_value(&mut self, ctx: &RefContainer<TestRef>, value: &Value) -> HostResult<Value> {
        self.writes += 1;
        let ty = ctx
            .value_type
            .ok_or_else(|| HostError::Undefined("aggregate write".into()))?;
        let bytes = value
            .encode(ty)
            .ok_or_else(|| HostError::Undefined("encode".into()))?;
        let address = self.container_address(ctx)?;
        self.slice(address, bytes.len() as u64)?.copy_from_slice(&bytes);
        value.coerce(ty).ok_or_else(|| HostError::Undefined("coerce".into()))
    }

    fn member_offset(&mut self, _base: &TestRef, member: &TestRef) -> HostResult<u64> {
        Ok(member.offset)
    }

    fn target_size(&mut self, item: &TestRef) -> HostResult<u64> {
        Ok(item.layout.size)
    }

    fn value_type(&mut self, item: &TestRef) -> Option<ScalarType> {
        item.layout.ty
    }

    fn enum_text(&mut self, _ctx: &RefContainer<TestRef>, value: &Value) -> Option<String> {
        match value.as_i64()? {
            1 => Some("Ready".to_string()),
            2 => Some("Running".to_string()),
            _ => None,
        }
    }

    fn symbol_name(&mut self, address: u64) -> Option<String> {
        self.symbols
            .iter()
            .find(|(_, (base, layout))| address >= *base && address < base + layout.size.max(1))
            .map(|(name, _)| name.clone())
    }

    fn read_bytes(&mut self, address: u64, len: usize) -> HostResult<Vec<u8>> {
        let available = (BASE + self.memory.len() as u64).saturating_sub(address);
        let len = (len as u64).min(available);
        Ok(self.slice(address, len)?.to_vec())
    }

    fn colon_path(&mut self, parts: &[String]) -> HostResult<Value> {
        match parts.join(":").as_str() {
            "Thread:state:Ready" => Ok(Value::I32(1)),
            "Thread:state" => Ok(Value::I32(4)),
            other => Err(HostError::Undefined(other.to_string())),
        }
    }

    fn call(&mut self, name: &str, args: &[Value]) -> HostResult<Value> {
        match (name, args) {
            ("max", [a, b]) => Ok(if a.as_f64() >= b.as_f64() { a.clone() } else { b.clone() }),
            _ => Err(HostError::Undefined(name.to_string())),
        }
    }

    fn get_reg_val(&mut self, register: &str) -> HostResult<Value> {
        self.registers
            .get(register)
            .map(|v| Value::U32(*v as u32))
            .ok_or_else(|| HostError::Undefined(register.to_string()))
    }

    fn find_symbol(&mut self, symbol: &str) -> HostResult<Value> {
        self.address_of(symbol)
            .map(|a| Value::U32(a as u32))
            .ok_or_else(|| HostError::Undefined(symbol.to_string()))
    }

    fn size_of(&mut self, symbol: &str) -> HostResult<Value> {
        self.symbols
            .get(symbol)
            .map(|(_, layout)| Value::U32(layout.size as u32))
            .ok_or_else(|| HostError::Undefined(symbol.to_string()))
    }

    fn symbol_exists(&mut self, symbol: &str) -> HostResult<Value> {
        Ok(Value::from_bool(self.symbols.contains_key(symbol)))
    }

    fn running(&mut self) -> HostResult<Value> {
        Ok(Value::I32(0))
    }
}

/// Parse and evaluate `text` against `host`
pub fn eval_text(host: &mut TestHost, text: &str) -> EvalResult<Value> {
    Evaluator::new(host, TestRef::root()).evaluate_text(text)
}
