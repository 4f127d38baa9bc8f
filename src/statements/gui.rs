//! Output tree with epoch-based reconciliation
//!
//! The tree lives in an arena and survives refresh passes. A pass runs in
//! two phases:
//!
//! 1. **Build**: statements claim children by key under a parent. A claim
//!    reuses the committed child with the same key (keeping its [`GuiId`]),
//!    or allocates a new node. Repeated keys under one parent get `#2`,
//!    `#3`, ... suffixes. Claims and text changes are staged.
//! 2. **Commit**: every parent's child list is replaced by its claims in
//!    claim order; committed children that were not claimed again are
//!    pruned with their subtrees. [`GuiTree::abort_pass`] drops the staged
//!    state instead and leaves the committed tree untouched.

use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt::Write;

/// Stable handle of an output node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GuiId(usize);

impl GuiId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
struct GuiNode {
    key: String,
    name: String,
    value: String,
    /// Text set during the running pass
    staged: Option<(String, String)>,
    parent: Option<GuiId>,
    children: Vec<GuiId>,
    /// Pass that last claimed the node
    epoch: u64,
    from_print: bool,
    live: bool,
}

/// Presentation view of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNode {
    pub name: String,
    pub value: String,
    pub children: Vec<OutputNode>,
}

#[derive(Debug, Clone)]
pub struct GuiTree {
    nodes: Vec<GuiNode>,
    free: Vec<usize>,
    epoch: u64,
    pending: FxHashMap<GuiId, Vec<GuiId>>,
    created: Vec<GuiId>,
}

impl Default for GuiTree {
    fn default() -> Self {
        Self::new()
    }
}

impl GuiTree {
    pub const ROOT: GuiId = GuiId(0);

    pub fn new() -> Self {
        GuiTree {
            nodes: vec![GuiNode {
                live: true,
                ..GuiNode::default()
            }],
            free: Vec::new(),
            epoch: 0,
            pending: FxHashMap::default(),
            created: Vec::new(),
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Start a build phase
    pub fn begin_pass(&mut self) {
        self.abort_pass();
        self.epoch += 1;
    }

    /// Claim the child of `parent` keyed `key` for this pass
    pub fn claim_child(&mut self, parent: GuiId, key: &str) -> GuiId {
        let key = self.unique_key(parent, key);
        let epoch = self.epoch;

        let reused = self.nodes[parent.0]
            .children
            .iter()
            .copied()
            .find(|id| self.nodes[id.0].key == key && self.nodes[id.0].epoch != epoch);

        let id = match reused {
            Some(id) => id,
            None => {
                let id = self.allocate(GuiNode {
                    key,
                    parent: Some(parent),
                    live: true,
                    ..GuiNode::default()
                });
                self.created.push(id);
                id
            }
        };

        let node = &mut self.nodes[id.0];
        node.epoch = epoch;
        node.from_print = false;
        node.staged = Some((String::new(), String::new()));
        self.pending.entry(parent).or_default().push(id);
        id
    }

    /// Claim a synthetic `print` child
    pub fn claim_print(&mut self, parent: GuiId, key: &str) -> GuiId {
        let id = self.claim_child(parent, key);
        self.nodes[id.0].from_print = true;
        id
    }

    pub fn set_text(&mut self, id: GuiId, name: String, value: String) {
        self.nodes[id.0].staged = Some((name, value));
    }

    /// Name and value as the running pass sees them
    pub fn text(&self, id: GuiId) -> (&str, &str) {
        let node = &self.nodes[id.0];
        match &node.staged {
            Some((name, value)) => (name, value),
            None => (&node.name, &node.value),
        }
    }

    /// Children claimed under `parent` so far in this pass
    pub fn claimed(&self, parent: GuiId) -> &[GuiId] {
        self.pending.get(&parent).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_print(&self, id: GuiId) -> bool {
        self.nodes[id.0].from_print
    }

    /// Withdraw a claim made in this pass
    pub fn detach(&mut self, id: GuiId) {
        let Some(parent) = self.nodes[id.0].parent else {
            return;
        };
        if let Some(list) = self.pending.get_mut(&parent) {
            list.retain(|&child| child != id);
        }
    }

    /// Make the staged pass the visible tree
    pub fn commit_pass(&mut self) {
        let mut reached = FxHashSet::default();
        self.commit_node(GuiTree::ROOT, &mut reached);

        for id in std::mem::take(&mut self.created) {
            if !reached.contains(&id) {
                self.release(id);
            }
        }
        self.pending.clear();
    }

    /// Drop everything staged since [`GuiTree::begin_pass`]
    pub fn abort_pass(&mut self) {
        for id in std::mem::take(&mut self.created) {
            self.release(id);
        }
        self.discard_staged();
    }

    fn commit_node(&mut self, id: GuiId, reached: &mut FxHashSet<GuiId>) {
        reached.insert(id);
        if let Some((name, value)) = self.nodes[id.0].staged.take() {
            self.nodes[id.0].name = name;
            self.nodes[id.0].value = value;
        }

        let claimed = self.pending.remove(&id).unwrap_or_default();
        let keep: FxHashSet<GuiId> = claimed.iter().copied().collect();
        let previous = std::mem::replace(&mut self.nodes[id.0].children, claimed.clone());
        for old in previous {
            if !keep.contains(&old) {
                self.release(old);
            }
        }
        for child in claimed {
            self.commit_node(child, reached);
        }
    }

    fn discard_staged(&mut self) {
        self.pending.clear();
        self.created.clear();
        for node in &mut self.nodes {
            node.staged = None;
        }
    }

    fn allocate(&mut self, node: GuiNode) -> GuiId {
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                GuiId(slot)
            }
            None => {
                self.nodes.push(node);
                GuiId(self.nodes.len() - 1)
            }
        }
    }

    /// Free a node and its committed subtree
    fn release(&mut self, id: GuiId) {
        if id == GuiTree::ROOT || !self.nodes[id.0].live {
            return;
        }
        let children = std::mem::take(&mut self.nodes[id.0].children);
        self.nodes[id.0] = GuiNode::default();
        self.free.push(id.0);
        for child in children {
            self.release(child);
        }
    }

    fn unique_key(&self, parent: GuiId, key: &str) -> String {
        let taken = |candidate: &str| {
            self.claimed(parent)
                .iter()
                .any(|id| self.nodes[id.0].key == candidate)
        };
        if !taken(key) {
            return key.to_string();
        }
        (2..)
            .map(|n| format!("{}#{}", key, n))
            .find(|candidate| !taken(candidate.as_str()))
            .unwrap_or_else(|| key.to_string())
    }

    /// Number of live nodes, root excluded
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.live).count() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[GuiTree::ROOT.0].children.is_empty()
    }

    pub fn children(&self, id: GuiId) -> &[GuiId] {
        &self.nodes[id.0].children
    }

    pub fn key(&self, id: GuiId) -> &str {
        &self.nodes[id.0].key
    }

    /// Committed tree below the root
    pub fn snapshot(&self) -> Vec<OutputNode> {
        self.snapshot_children(GuiTree::ROOT)
    }

    fn snapshot_children(&self, id: GuiId) -> Vec<OutputNode> {
        self.nodes[id.0]
            .children
            .iter()
            .map(|&child| {
                let node = &self.nodes[child.0];
                OutputNode {
                    name: node.name.clone(),
                    value: node.value.clone(),
                    children: self.snapshot_children(child),
                }
            })
            .collect()
    }

    /// Indented `name: value` listing of the committed tree
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for node in self.snapshot() {
            render(&node, 0, &mut out);
        }
        out
    }
}

fn render(node: &OutputNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = if node.value.is_empty() {
        writeln!(out, "{}{}", indent, node.name)
    } else {
        writeln!(out, "{}{}: {}", indent, node.name, node.value)
    };
    for child in &node.children {
        render(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pass(tree: &mut GuiTree, keys: &[&str]) -> Vec<GuiId> {
        tree.begin_pass();
        let ids = keys
            .iter()
            .map(|key| {
                let id = tree.claim_child(GuiTree::ROOT, key);
                tree.set_text(id, key.to_string(), String::new());
                id
            })
            .collect();
        tree.commit_pass();
        ids
    }

    fn keys(tree: &GuiTree) -> Vec<&str> {
        tree.children(GuiTree::ROOT).iter().map(|&id| tree.key(id)).collect()
    }

    #[test]
    fn test_ids_are_stable_across_passes() {
        let mut tree = GuiTree::new();
        let first = pass(&mut tree, &["a", "b", "c"]);
        let second = pass(&mut tree, &["c", "a"]);

        assert_eq!(second, vec![first[2], first[0]]);
        assert_eq!(keys(&tree), vec!["c", "a"]);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_duplicate_keys_are_suffixed() {
        let mut tree = GuiTree::new();
        let first = pass(&mut tree, &["row", "row", "row"]);
        assert_eq!(keys(&tree), vec!["row", "row#2", "row#3"]);

        let second = pass(&mut tree, &["row", "row"]);
        assert_eq!(second, first[..2].to_vec());
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_unclaimed_subtrees_are_pruned() {
        let mut tree = GuiTree::new();
        tree.begin_pass();
        let parent = tree.claim_child(GuiTree::ROOT, "p");
        tree.claim_child(parent, "x");
        tree.claim_child(parent, "y");
        tree.commit_pass();
        assert_eq!(tree.len(), 3);

        tree.begin_pass();
        let again = tree.claim_child(GuiTree::ROOT, "p");
        tree.commit_pass();
        assert_eq!(again, parent);
        assert!(tree.children(parent).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_abort_keeps_committed_tree() {
        let mut tree = GuiTree::new();
        pass(&mut tree, &["a"]);
        let before = tree.snapshot();

        tree.begin_pass();
        let a = tree.claim_child(GuiTree::ROOT, "a");
        tree.set_text(a, "changed".into(), "1".into());
        tree.claim_child(GuiTree::ROOT, "b");
        tree.abort_pass();

        assert_eq!(tree.snapshot(), before);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_detach_and_render() {
        let mut tree = GuiTree::new();
        tree.begin_pass();
        let threads = tree.claim_child(GuiTree::ROOT, "threads");
        tree.set_text(threads, "Threads".into(), String::new());
        let idle = tree.claim_child(threads, "0");
        tree.set_text(idle, "idle".into(), "Ready".into());
        let gone = tree.claim_print(threads, "1");
        assert!(tree.is_print(gone));
        tree.detach(gone);
        assert_eq!(tree.claimed(threads), &[idle]);
        tree.commit_pass();

        assert_eq!(tree.render_text(), "Threads\n  idle: Ready\n");
        assert_eq!(tree.len(), 2);
    }
}
