// Statement tree: the description nodes in execution order

use crate::model::Node;

/// A description node with its children sorted by line.
///
/// `id` numbers the statements in pre-order; it is stable for the lifetime
/// of a description and keys per-statement engine state.
#[derive(Debug, Clone)]
pub struct Statement<'d> {
    pub id: usize,
    pub node: &'d Node,
    pub children: Vec<Statement<'d>>,
}

impl<'d> Statement<'d> {
    /// Build the tree below `node`, numbering from `next_id`
    pub fn build(node: &'d Node, next_id: &mut usize) -> Self {
        let id = *next_id;
        *next_id += 1;

        let mut children: Vec<Statement<'d>> = node
            .children
            .iter()
            .map(|child| Statement::build(child, next_id))
            .collect();
        // Stable: equal lines keep declaration order
        children.sort_by_key(|s| s.node.line);

        Statement { id, node, children }
    }

    /// Build one tree per top-level object, sorted the same way
    pub fn forest(objects: &'d [Node]) -> Vec<Statement<'d>> {
        let mut next_id = 0;
        let mut roots: Vec<Statement<'d>> = objects
            .iter()
            .map(|object| Statement::build(object, &mut next_id))
            .collect();
        roots.sort_by_key(|s| s.node.line);
        roots
    }

    pub fn line(&self) -> u32 {
        self.node.line
    }

    /// Number of statements in this subtree
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Statement::count).sum::<usize>()
    }
}
