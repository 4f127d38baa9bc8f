//! Component description model
//!
//! The description is produced by a loader (outside this crate) and consumed
//! read-only by the statement engine:
//! - [`types`]: typedefs, members, bit-fields, enumerators
//! - [`node`]: statement nodes (`read`, `readlist`, `list`, `item`, ...)
//! - [`expression`]: expression attributes, parsed once

pub mod expression;
pub mod node;
pub mod types;

pub use expression::Expression;
pub use node::{LoopSpec, Node, NodeKind, ReadListSpec, ReadSpec, VarSpec};
pub use types::{BitField, Enumerator, Member, TypeRef, TypeRegistry, Typedef};

use rustc_hash::FxHashMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Unknown type '{0}'")]
    UnknownType(String),

    #[error("Typedef '{typedef}' declares member '{member}' twice")]
    DuplicateMember { typedef: String, member: String },

    #[error("Line {line}: '{name}' is declared as {first:?} and as {second:?}")]
    ConflictingSymbol {
        line: u32,
        name: String,
        first: TypeRef,
        second: TypeRef,
    },

    #[error("Line {line}: loop '{var}' needs exactly one of 'limit' and 'while'")]
    LoopBounds { line: u32, var: String },

    #[error("Line {line}: readlist '{name}' has no member '{member}'")]
    UnknownNextMember {
        line: u32,
        name: String,
        member: String,
    },

    #[error("Line {line}: '{text}': {message}")]
    InvalidExpression {
        line: u32,
        text: String,
        message: String,
    },
}

/// A complete component description: typedefs plus top-level objects
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    pub types: TypeRegistry,
    pub objects: Vec<Node>,
}

impl Description {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_type(mut self, typedef: Typedef) -> Result<Self, ModelError> {
        self.types.add(typedef)?;
        Ok(self)
    }

    pub fn with_object(mut self, object: Node) -> Self {
        self.objects.push(object);
        self
    }

    /// Every symbol the statements declare, with its type
    pub fn declared_symbols(&self) -> FxHashMap<String, TypeRef> {
        let mut symbols = FxHashMap::default();
        for object in &self.objects {
            object.walk(&mut |node| {
                if let Some((name, ty)) = node.declared_symbol() {
                    symbols.entry(name.to_string()).or_insert_with(|| ty.clone());
                }
            });
        }
        symbols
    }

    /// Check the whole description; reports the first problem found
    pub fn validate(&self) -> Result<(), ModelError> {
        let mut declared: FxHashMap<&str, &TypeRef> = FxHashMap::default();
        let mut result = Ok(());

        for object in &self.objects {
            object.walk(&mut |node| {
                if result.is_err() {
                    return;
                }
                result = self.validate_node(node, &mut declared);
            });
        }
        result
    }

    fn validate_node<'a>(
        &self,
        node: &'a Node,
        declared: &mut FxHashMap<&'a str, &'a TypeRef>,
    ) -> Result<(), ModelError> {
        if let Some(cond) = &node.cond {
            check_expression(node.line, cond)?;
        }

        if let Some((name, ty)) = node.declared_symbol() {
            if let TypeRef::Named(type_name) = ty {
                if self.types.get(type_name).is_none() {
                    return Err(ModelError::UnknownType(type_name.clone()));
                }
            }
            match declared.get(name) {
                Some(first) if *first != ty => {
                    return Err(ModelError::ConflictingSymbol {
                        line: node.line,
                        name: name.to_string(),
                        first: (*first).clone(),
                        second: ty.clone(),
                    })
                }
                _ => {
                    declared.insert(name, ty);
                }
            }
        }

        match &node.kind {
            NodeKind::List(spec) | NodeKind::ListOut(spec) => {
                if spec.limit.is_some() == spec.while_.is_some() {
                    return Err(ModelError::LoopBounds {
                        line: node.line,
                        var: spec.var.clone(),
                    });
                }
            }
            NodeKind::ReadList(spec) => {
                if let Some(next) = &spec.next {
                    let found = self
                        .types
                        .typedef_of(&spec.ty)
                        .and_then(|t| t.find(next))
                        .is_some();
                    if !found {
                        return Err(ModelError::UnknownNextMember {
                            line: node.line,
                            name: spec.name.clone(),
                            member: next.clone(),
                        });
                    }
                }
            }
            NodeKind::Calc { exprs } => {
                for expr in exprs {
                    check_expression(node.line, expr)?;
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn check_expression(line: u32, expr: &Expression) -> Result<(), ModelError> {
    match expr.parsed.first_error() {
        Some(diagnostic) => Err(ModelError::InvalidExpression {
            line,
            text: expr.text.clone(),
            message: diagnostic.to_string(),
        }),
        None => Ok(()),
    }
}
