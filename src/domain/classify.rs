//! Leaf classification over a built category tree.
//!
//! Derives the three views the composition flow works with: plain leaves,
//! last-level parents (internal nodes whose direct children are all
//! leaves), and orphan leaves (leaves whose direct parent is not a
//! last-level parent), bucketed by top branch. Classification runs in a
//! single pre-order traversal with an explicit stack and produces the
//! parent index as a side effect for reuse by selection and compilation.

use std::collections::{BTreeMap, HashMap, HashSet};

use generational_arena::Index;
use tracing::instrument;

use crate::domain::arena::CategoryTree;

/// Bucket name for orphan leaves with an empty below-root path.
pub const OTHER_BRANCH: &str = "Other";

/// Derived views of one category tree. Rebuilt on every tree install,
/// never mutated in place.
#[derive(Debug, Default)]
pub struct Classification {
    /// Child id -> parent id back-reference map
    pub parent_index: HashMap<String, String>,
    /// All leaf ids, in traversal order
    pub leaves: Vec<String>,
    /// Ids of internal nodes whose direct children are all leaves
    pub last_level_parents: Vec<String>,
    /// Orphan leaf ids grouped by the name of their top-most ancestor
    /// below the root (the leaf's own name when it sits directly under
    /// the root)
    pub orphans_by_branch: BTreeMap<String, Vec<String>>,
    last_level_parent_set: HashSet<String>,
    orphan_set: HashSet<String>,
}

impl Classification {
    pub fn is_last_level_parent(&self, id: &str) -> bool {
        self.last_level_parent_set.contains(id)
    }

    pub fn is_orphan(&self, id: &str) -> bool {
        self.orphan_set.contains(id)
    }

    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parent_index.get(id).map(String::as_str)
    }
}

/// Classify every node of the tree in one explicit-stack traversal.
#[instrument(level = "debug", skip(tree))]
pub fn classify(tree: &CategoryTree) -> Classification {
    let mut result = Classification::default();

    // (node, branch name of its depth-1 ancestor; None for the root)
    let mut stack: Vec<(Index, Option<String>)> = Vec::new();
    if let Some(root) = tree.root() {
        stack.push((root, None));
    }

    while let Some((idx, branch)) = stack.pop() {
        let node = match tree.get_node(idx) {
            Some(n) => n,
            None => continue,
        };

        let all_children_are_leaves = !node.children.is_empty()
            && node.children.iter().all(|&c| {
                tree.get_node(c).map(|n| n.is_leaf()).unwrap_or(false)
            });
        if all_children_are_leaves {
            result.last_level_parent_set.insert(node.data.id.clone());
            result.last_level_parents.push(node.data.id.clone());
        }

        if node.is_leaf() {
            result.leaves.push(node.data.id.clone());

            // Orphan iff the direct parent is not a last-level parent.
            // Parents are visited before their children, so their status
            // is already recorded.
            let parent_is_llp = node
                .parent
                .and_then(|p| tree.get_node(p))
                .map(|p| result.last_level_parent_set.contains(&p.data.id))
                .unwrap_or(false);
            if !parent_is_llp {
                let bucket = branch
                    .clone()
                    .unwrap_or_else(|| OTHER_BRANCH.to_string());
                result.orphan_set.insert(node.data.id.clone());
                result
                    .orphans_by_branch
                    .entry(bucket)
                    .or_default()
                    .push(node.data.id.clone());
            }
        }

        for &child in node.children.iter().rev() {
            // Children of the root start their own branch
            let child_branch = match &branch {
                Some(b) => Some(b.clone()),
                None => tree.get_node(child).map(|c| c.data.name.clone()),
            };
            stack.push((child, child_branch));
            if let Some(child_node) = tree.get_node(child) {
                result
                    .parent_index
                    .insert(child_node.data.id.clone(), node.data.id.clone());
            }
        }
    }

    result
}
