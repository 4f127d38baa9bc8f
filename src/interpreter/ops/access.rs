//! Reference resolution: identifiers, member access and indexing
//!
//! An identifier restarts the chain in the container; members and elements
//! only add to its offset. Strides and member offsets always come from the
//! host, never from an assumed scalar width.

use crate::interpreter::context::RefContainer;
use crate::interpreter::engine::Evaluator;
use crate::interpreter::errors::{EvalError, EvalResult};
use crate::interpreter::host::{HostError, ResolutionHost};
use crate::parser::ast::{Expr, ExprKind, Span};
use log::debug;

impl<H: ResolutionHost> Evaluator<'_, H> {
    /// Resolve a reference expression into `ctx` without reading it
    pub(crate) fn resolve(&mut self, expr: &Expr, ctx: &mut RefContainer<H::Ref>) -> EvalResult<()> {
        match &expr.kind {
            ExprKind::Identifier(name) => self.resolve_identifier(name, expr.span, ctx),
            ExprKind::Member { object, property } => {
                self.resolve(object, ctx)?;
                self.resolve_member(property, expr.span, ctx)
            }
            ExprKind::Index { array, index } => {
                self.resolve(array, ctx)?;
                let position = self.eval_index(index)?;
                self.resolve_element(position, ctx)
            }
            _ => Err(EvalError::InvalidTarget {
                what: expr.describe(),
                span: expr.span,
            }),
        }
    }

    fn resolve_identifier(
        &mut self,
        name: &str,
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<()> {
        let symbol = self
            .host
            .symbol_ref(&ctx.root, name)
            .map_err(|_| EvalError::UnresolvedSymbol {
                name: name.to_string(),
                span,
            })?;
        let width = self.width_of(&symbol, name);
        let value_type = self.host.value_type(&symbol);
        ctx.reset_to(name, symbol, width, value_type);
        Ok(())
    }

    fn resolve_member(
        &mut self,
        property: &str,
        span: Span,
        ctx: &mut RefContainer<H::Ref>,
    ) -> EvalResult<()> {
        let Some(base) = ctx.current.clone() else {
            return Err(EvalError::UnresolvedMember {
                object: "<unresolved>".to_string(),
                member: property.to_string(),
                span,
            });
        };

        let unresolved = || EvalError::UnresolvedMember {
            object: ctx.member.clone().unwrap_or_default(),
            member: property.to_string(),
            span,
        };
        let member = self.host.member_ref(&base, property).map_err(|_| unresolved())?;
        let delta = self
            .host
            .member_offset(&base, &member)
            .map_err(|_| unresolved())?;
        let width = self.width_of(&member, property);
        let value_type = self.host.value_type(&member);

        ctx.advance(member, delta, width, value_type);
        ctx.member = Some(property.to_string());
        Ok(())
    }

    fn resolve_element(&mut self, index: u64, ctx: &mut RefContainer<H::Ref>) -> EvalResult<()> {
        let Some(array) = ctx.current.clone() else {
            return Err(EvalError::ReadFailed {
                what: "<unresolved>".to_string(),
                source: HostError::Undefined("array".to_string()),
            });
        };

        let failed = |source| EvalError::ReadFailed {
            what: format!("{}[{}]", ctx.member.clone().unwrap_or_default(), index),
            source,
        };
        let stride = self.host.element_stride(&array).map_err(failed)?;
        let element = self.host.element_ref(&array, index).map_err(failed)?;
        let value_type = self.host.value_type(&element);

        ctx.advance(element, index.wrapping_mul(stride), stride, value_type);
        ctx.index = Some(index);
        Ok(())
    }

    /// Target size of `item`, or 0 when the host cannot tell
    fn width_of(&mut self, item: &H::Ref, name: &str) -> u64 {
        match self.host.target_size(item) {
            Ok(width) => width,
            Err(e) => {
                debug!("no target size for '{}': {}", name, e);
                0
            }
        }
    }

    /// Evaluate an index in its own container, leaving the outer chain alone
    fn eval_index(&mut self, index: &Expr) -> EvalResult<u64> {
        let mut inner = RefContainer::new(self.root.clone());
        let value = self.eval(index, &mut inner)?;
        match value.as_i128() {
            Some(n) if n >= 0 && value.is_integral() => Ok(n as u64),
            _ => Err(EvalError::InvalidIndex {
                value: value.to_string(),
                span: index.span,
            }),
        }
    }
}
