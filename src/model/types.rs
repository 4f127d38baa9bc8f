//! Typedefs, members and enumerators
//!
//! A [`Typedef`] describes a structure on the target: its size, the offset of
//! each member, optional bit-fields and enumerators. Members declared with
//! [`Typedef::var`] are virtual: they live only in the engine's memory
//! cache, after the target bytes of each element, so the virtual size of a
//! type is its target size plus its virtual members.

use super::ModelError;
use crate::memory::value::ScalarType;
use rustc_hash::FxHashMap;

/// Type of a symbol or member: a scalar or a named typedef
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    Scalar(ScalarType),
    Named(String),
}

impl TypeRef {
    /// `uint32_t`, `double`, ... become scalars, anything else a typedef name
    pub fn from_name(name: &str) -> Self {
        match ScalarType::from_name(name) {
            Some(ty) => TypeRef::Scalar(ty),
            None => TypeRef::Named(name.trim().to_string()),
        }
    }

    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            TypeRef::Scalar(ty) => Some(*ty),
            TypeRef::Named(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enumerator {
    pub name: String,
    pub value: i64,
}

/// `(first bit, bit count)` inside the member's storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    pub start: u32,
    pub len: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub ty: TypeRef,
    pub offset: u64,
    /// Array length; 1 for a plain member
    pub count: u64,
    pub bits: Option<BitField>,
    pub enums: Vec<Enumerator>,
    pub is_virtual: bool,
}

impl Member {
    pub fn new(name: &str, ty: TypeRef, offset: u64) -> Self {
        Member {
            name: name.to_string(),
            ty,
            offset,
            count: 1,
            bits: None,
            enums: Vec::new(),
            is_virtual: false,
        }
    }

    pub fn enum_name(&self, value: i64) -> Option<&str> {
        self.enums
            .iter()
            .find(|e| e.value == value)
            .map(|e| e.name.as_str())
    }

    pub fn enum_value(&self, name: &str) -> Option<i64> {
        self.enums.iter().find(|e| e.name == name).map(|e| e.value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Typedef {
    pub name: String,
    /// Bytes read from the target per element
    pub size: u64,
    pub members: Vec<Member>,
}

impl Typedef {
    pub fn new(name: &str, size: u64) -> Self {
        Typedef {
            name: name.to_string(),
            size,
            members: Vec::new(),
        }
    }

    /// Add a target member at `offset`
    pub fn member(mut self, name: &str, ty: &str, offset: u64) -> Self {
        self.members
            .push(Member::new(name, TypeRef::from_name(ty), offset));
        self
    }

    /// Add a target array member of `count` elements
    pub fn array(mut self, name: &str, ty: &str, offset: u64, count: u64) -> Self {
        let mut member = Member::new(name, TypeRef::from_name(ty), offset);
        member.count = count.max(1);
        self.members.push(member);
        self
    }

    /// Add a bit-field member
    pub fn bitfield(mut self, name: &str, ty: &str, offset: u64, start: u32, len: u32) -> Self {
        let mut member = Member::new(name, TypeRef::from_name(ty), offset);
        member.bits = Some(BitField { start, len });
        self.members.push(member);
        self
    }

    /// Attach enumerators to the most recently added member
    pub fn enums(mut self, values: &[(&str, i64)]) -> Self {
        if let Some(member) = self.members.last_mut() {
            member.enums.extend(values.iter().map(|(name, value)| Enumerator {
                name: name.to_string(),
                value: *value,
            }));
        }
        self
    }

    /// Add a virtual member; its offset is assigned on registration
    pub fn var(mut self, name: &str, ty: &str) -> Self {
        let mut member = Member::new(name, TypeRef::from_name(ty), 0);
        member.is_virtual = true;
        self.members.push(member);
        self
    }

    pub fn find(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name == name)
    }

    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }
}

/// All typedefs of a description, with computed virtual layouts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeRegistry {
    typedefs: FxHashMap<String, Typedef>,
    virtual_sizes: FxHashMap<String, u64>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a typedef and lay out its virtual members after `size`
    pub fn add(&mut self, mut typedef: Typedef) -> Result<(), ModelError> {
        for (i, member) in typedef.members.iter().enumerate() {
            if typedef.members[..i].iter().any(|m| m.name == member.name) {
                return Err(ModelError::DuplicateMember {
                    typedef: typedef.name.clone(),
                    member: member.name.clone(),
                });
            }
        }

        let mut next = typedef.size;
        for member in typedef.members.iter_mut().filter(|m| m.is_virtual) {
            let width = match &member.ty {
                TypeRef::Scalar(ty) => ty.byte_width() as u64,
                TypeRef::Named(name) => self
                    .virtual_sizes
                    .get(name)
                    .copied()
                    .ok_or_else(|| ModelError::UnknownType(name.clone()))?,
            };
            member.offset = next;
            next += width * member.count;
        }

        self.virtual_sizes.insert(typedef.name.clone(), next);
        self.typedefs.insert(typedef.name.clone(), typedef);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Typedef> {
        self.typedefs.get(name)
    }

    pub fn typedef_of(&self, ty: &TypeRef) -> Option<&Typedef> {
        match ty {
            TypeRef::Named(name) => self.get(name),
            TypeRef::Scalar(_) => None,
        }
    }

    /// Bytes of one element on the target
    pub fn target_size(&self, ty: &TypeRef) -> Option<u64> {
        match ty {
            TypeRef::Scalar(s) => Some(s.byte_width() as u64),
            TypeRef::Named(name) => self.get(name).map(|t| t.size),
        }
    }

    /// Bytes of one element in the memory cache, virtual members included
    pub fn virtual_size(&self, ty: &TypeRef) -> Option<u64> {
        match ty {
            TypeRef::Scalar(s) => Some(s.byte_width() as u64),
            TypeRef::Named(name) => self.virtual_sizes.get(name).copied(),
        }
    }

    /// Resolve `type:member` to the member
    pub fn member(&self, typedef: &str, member: &str) -> Option<&Member> {
        self.get(typedef)?.find(member)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn thread() -> Typedef {
        Typedef::new("Thread", 12)
            .member("id", "uint8_t", 0)
            .member("state", "uint8_t", 1)
            .enums(&[("Ready", 1), ("Running", 2)])
            .member("next", "uint32_t", 4)
            .bitfield("prio", "uint32_t", 8, 4, 6)
            .var("stack_used", "uint32_t")
            .var("marker", "uint8_t")
    }

    #[test]
    fn test_virtual_layout() {
        let mut registry = TypeRegistry::new();
        registry.add(thread()).unwrap();
        let ty = TypeRef::Named("Thread".into());
        assert_eq!(registry.target_size(&ty), Some(12));
        assert_eq!(registry.virtual_size(&ty), Some(17));
        assert_eq!(registry.member("Thread", "stack_used").unwrap().offset, 12);
        assert_eq!(registry.member("Thread", "marker").unwrap().offset, 16);
    }

    #[test]
    fn test_enumerators() {
        let mut registry = TypeRegistry::new();
        registry.add(thread()).unwrap();
        let state = registry.member("Thread", "state").unwrap();
        assert_eq!(state.enum_name(2), Some("Running"));
        assert_eq!(state.enum_value("Ready"), Some(1));
        assert_eq!(state.enum_name(9), None);
    }

    #[test]
    fn test_registration_errors() {
        let mut registry = TypeRegistry::new();
        let dup = Typedef::new("T", 4).member("a", "uint8_t", 0).member("a", "uint8_t", 1);
        assert!(matches!(registry.add(dup), Err(ModelError::DuplicateMember { .. })));
        let unknown = Typedef::new("U", 4).var("inner", "Missing");
        assert_eq!(registry.add(unknown), Err(ModelError::UnknownType("Missing".into())));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(TypeRef::from_name("uint16_t"), TypeRef::Scalar(ScalarType::uint(16)));
        assert_eq!(TypeRef::from_name(" Thread "), TypeRef::Named("Thread".into()));
    }
}
