use std::collections::HashMap;
use std::fmt;

use generational_arena::{Arena, Index};
use tracing::instrument;

/// Data payload for tree nodes representing merchant categories.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryData {
    /// Category identifier as issued by the category subsystem
    pub id: String,
    /// Display name
    pub name: String,
    /// Price declared on the category itself, if any
    pub price: Option<f64>,
}

impl fmt::Display for CategoryData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Tree node in the arena-based category hierarchy.
#[derive(Debug)]
pub struct TreeNode {
    /// Category data for this node
    pub data: CategoryData,
    /// Index of parent node in the arena, None for the root
    pub parent: Option<Index>,
    /// Indices of child nodes in the arena
    pub children: Vec<Index>,
}

impl TreeNode {
    /// A node with no children is a leaf.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Arena-based category tree for one composition session.
///
/// Uses generational arena for memory-safe node references and keeps an
/// id -> index side map for O(1) lookups by category id. Parent links are
/// back-references only, never ownership edges.
#[derive(Debug, Default)]
pub struct CategoryTree {
    /// Arena storage for all tree nodes
    arena: Arena<TreeNode>,
    /// Index of the root node, None for empty trees
    root: Option<Index>,
    /// Category id -> arena index
    index_of: HashMap<String, Index>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    #[instrument(level = "trace", skip(self))]
    pub fn insert_node(&mut self, data: CategoryData, parent: Option<Index>) -> Index {
        let id = data.id.clone();
        let node = TreeNode {
            data,
            parent,
            children: Vec::new(),
        };
        let node_idx = self.arena.insert(node);
        // First occurrence wins: a cycle-broken duplicate leaf must not
        // hijack id lookups
        self.index_of.entry(id).or_insert(node_idx);

        if let Some(parent_idx) = parent {
            if let Some(parent) = self.arena.get_mut(parent_idx) {
                parent.children.push(node_idx);
            }
        } else {
            self.root = Some(node_idx);
        }

        node_idx
    }

    pub fn get_node(&self, idx: Index) -> Option<&TreeNode> {
        self.arena.get(idx)
    }

    pub fn root(&self) -> Option<Index> {
        self.root
    }

    /// Look up a node by category id.
    pub fn find(&self, id: &str) -> Option<Index> {
        self.index_of.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.arena.len()
    }

    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.find(id)
            .and_then(|idx| self.get_node(idx))
            .map(|n| n.data.name.as_str())
    }

    pub fn price_of(&self, id: &str) -> Option<f64> {
        self.find(id)
            .and_then(|idx| self.get_node(idx))
            .and_then(|n| n.data.price)
    }

    /// Pre-order iteration from the root, explicit stack, left-to-right.
    pub fn iter(&self) -> TreeIterator {
        TreeIterator::new(self)
    }

    #[instrument(level = "debug", skip(self))]
    pub fn depth(&self) -> usize {
        let mut max_depth = 0;
        let mut stack: Vec<(Index, usize)> = self.root.map(|r| (r, 1)).into_iter().collect();
        while let Some((idx, depth)) = stack.pop() {
            if let Some(node) = self.get_node(idx) {
                max_depth = max_depth.max(depth);
                for &child in &node.children {
                    stack.push((child, depth + 1));
                }
            }
        }
        max_depth
    }

    /// Collects the category ids of all leaves under the given node, in
    /// left-to-right traversal order. The node itself is included when it
    /// is a leaf.
    #[instrument(level = "trace", skip(self))]
    pub fn leaf_ids_under(&self, start: Index) -> Vec<String> {
        let mut leaves = Vec::new();
        let mut stack = vec![start];
        while let Some(idx) = stack.pop() {
            if let Some(node) = self.get_node(idx) {
                if node.is_leaf() {
                    leaves.push(node.data.id.clone());
                } else {
                    for &child in node.children.iter().rev() {
                        stack.push(child);
                    }
                }
            }
        }
        leaves
    }
}

pub struct TreeIterator<'a> {
    tree: &'a CategoryTree,
    stack: Vec<Index>,
}

impl<'a> TreeIterator<'a> {
    fn new(tree: &'a CategoryTree) -> Self {
        let mut stack = Vec::new();
        if let Some(root) = tree.root() {
            stack.push(root);
        }
        Self { tree, stack }
    }
}

impl<'a> Iterator for TreeIterator<'a> {
    type Item = (Index, &'a TreeNode);

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current_idx) = self.stack.pop() {
            if let Some(node) = self.tree.get_node(current_idx) {
                // Push children in reverse order for left-to-right traversal
                for &child in node.children.iter().rev() {
                    self.stack.push(child);
                }
                return Some((current_idx, node));
            }
        }
        None
    }
}
