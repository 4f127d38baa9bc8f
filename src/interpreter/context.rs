//! Reference container: the evaluation context of one resolution chain
//!
//! Resolving `a.b[2].c` starts a chain at `a` (the anchor) and accumulates
//! the byte offsets of `.b`, `[2]` and `.c` on top of it. The host reads and
//! writes through the final container, so it only needs the anchor, the
//! accumulated offset and the read width.
//!
//! Containers are plain values. Nested evaluations (index expressions,
//! assignment right-hand sides) run in an [`RefContainer::isolated`] copy, so
//! they cannot disturb the chain being built around them.

use crate::memory::value::ScalarType;

#[derive(Debug, Clone, PartialEq)]
pub struct RefContainer<R> {
    /// Root resolution base; identifiers are resolved against it
    pub root: R,
    /// Top-level symbol of the current chain
    pub anchor: Option<R>,
    /// Last resolved member or element
    pub current: Option<R>,
    /// Bytes from the start of the anchor to `current`
    pub offset: u64,
    /// Bytes to read at `offset`
    pub width: u64,
    /// Index of the last element step, if any
    pub index: Option<u64>,
    /// Name of the last resolved identifier or member
    pub member: Option<String>,
    /// Declared scalar type of `current`
    pub value_type: Option<ScalarType>,
}

impl<R: Clone> RefContainer<R> {
    pub fn new(root: R) -> Self {
        RefContainer {
            root,
            anchor: None,
            current: None,
            offset: 0,
            width: 0,
            index: None,
            member: None,
            value_type: None,
        }
    }

    /// Fresh container over the same root
    pub fn isolated(&self) -> Self {
        Self::new(self.root.clone())
    }

    /// Start a new chain at `anchor`
    pub fn reset_to(&mut self, name: &str, anchor: R, width: u64, value_type: Option<ScalarType>) {
        self.anchor = Some(anchor.clone());
        self.current = Some(anchor);
        self.offset = 0;
        self.width = width;
        self.index = None;
        self.member = Some(name.to_string());
        self.value_type = value_type;
    }

    /// Step to a member or element `delta` bytes further along the chain
    pub fn advance(&mut self, next: R, delta: u64, width: u64, value_type: Option<ScalarType>) {
        self.current = Some(next);
        self.offset = self.offset.wrapping_add(delta);
        self.width = width;
        self.value_type = value_type;
    }

    /// True once an identifier has been resolved into this container
    pub fn is_resolved(&self) -> bool {
        self.anchor.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reset_discards_previous_chain() {
        let mut ctx = RefContainer::new("root");
        ctx.reset_to("a", "a", 8, None);
        ctx.advance("a.b", 4, 4, Some(ScalarType::uint(32)));
        ctx.index = Some(3);
        assert_eq!(ctx.offset, 4);

        ctx.reset_to("c", "c", 2, Some(ScalarType::int(16)));
        assert_eq!(ctx.anchor, Some("c"));
        assert_eq!(ctx.offset, 0);
        assert_eq!(ctx.index, None);
        assert_eq!(ctx.width, 2);
    }

    #[test]
    fn test_advance_accumulates() {
        let mut ctx = RefContainer::new(());
        ctx.reset_to("a", (), 16, None);
        ctx.advance((), 4, 4, None);
        ctx.advance((), 8, 2, None);
        assert_eq!(ctx.offset, 12);
        assert_eq!(ctx.width, 2);
    }

    #[test]
    fn test_isolated_copy_keeps_root_only() {
        let mut ctx = RefContainer::new(7);
        ctx.reset_to("x", 1, 4, None);
        let inner = ctx.isolated();
        assert_eq!(inner.root, 7);
        assert!(!inner.is_resolved());
        assert!(ctx.is_resolved());
    }
}
