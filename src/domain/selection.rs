//! Tri-state selection over the category tree.
//!
//! The selection set is the single source of truth for what goes into a
//! combo: a set of leaf ids. Node-level checked/indeterminate state is
//! recomputed from the live set on every query, never cached.

use std::collections::BTreeSet;

use tracing::{debug, instrument};

use crate::domain::arena::CategoryTree;

/// Tri-state answer for one node.
///
/// `all` and `some` are mutually exclusive; `{false, false}` means
/// unchecked (or no descendant leaves at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeState {
    pub all: bool,
    pub some: bool,
}

/// Set of selected leaf ids for one composition session.
#[derive(Debug, Default, Clone)]
pub struct SelectionStore {
    selected: BTreeSet<String>,
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_leaf_ids<I: IntoIterator<Item = String>>(ids: I) -> Self {
        Self {
            selected: ids.into_iter().collect(),
        }
    }

    pub fn is_selected(&self, leaf_id: &str) -> bool {
        self.selected.contains(leaf_id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected leaf ids in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.selected.iter().map(String::as_str)
    }

    /// Add one leaf id unconditionally.
    pub fn select(&mut self, leaf_id: &str) {
        self.selected.insert(leaf_id.to_string());
    }

    /// Flip membership of one leaf id.
    pub fn toggle_leaf(&mut self, leaf_id: &str) {
        if !self.selected.remove(leaf_id) {
            self.selected.insert(leaf_id.to_string());
        }
    }

    /// Check or uncheck every leaf under the given node.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn set_node(&mut self, tree: &CategoryTree, node_id: &str, checked: bool) {
        let Some(idx) = tree.find(node_id) else {
            return;
        };
        for leaf in tree.leaf_ids_under(idx) {
            if checked {
                self.selected.insert(leaf);
            } else {
                self.selected.remove(&leaf);
            }
        }
    }

    /// Tri-state query for any node, recomputed from the live set.
    ///
    /// For a leaf `all` is plain membership. For an internal node `all`
    /// holds iff every descendant leaf is selected, `some` iff at least
    /// one but not all are. A node with zero descendant leaves reports
    /// `{all: false, some: false}`.
    pub fn state_of(&self, tree: &CategoryTree, node_id: &str) -> NodeState {
        let Some(idx) = tree.find(node_id) else {
            return NodeState {
                all: false,
                some: false,
            };
        };
        let leaves = tree.leaf_ids_under(idx);
        let total = leaves.len();
        let n = leaves.iter().filter(|l| self.selected.contains(*l)).count();
        NodeState {
            all: n > 0 && n == total,
            some: n > 0 && n < total,
        }
    }

    /// Drop every id that is no longer a leaf of the current tree.
    ///
    /// Called on tree install so a reloaded or reshaped tree cannot leave
    /// stale ids behind. Not an error condition.
    #[instrument(level = "debug", skip(self, tree))]
    pub fn prune(&mut self, tree: &CategoryTree) {
        let before = self.selected.len();
        self.selected.retain(|id| {
            tree.find(id)
                .and_then(|idx| tree.get_node(idx))
                .map(|n| n.is_leaf())
                .unwrap_or(false)
        });
        if self.selected.len() != before {
            debug!(
                dropped = before - self.selected.len(),
                "pruned stale selection ids"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::arena::CategoryData;

    fn data(id: &str) -> CategoryData {
        CategoryData {
            id: id.to_string(),
            name: id.to_uppercase(),
            price: None,
        }
    }

    fn sample_tree() -> CategoryTree {
        let mut tree = CategoryTree::new();
        let root = tree.insert_node(data("root"), None);
        let a = tree.insert_node(data("a"), Some(root));
        tree.insert_node(data("a1"), Some(a));
        tree.insert_node(data("a2"), Some(a));
        tree.insert_node(data("b"), Some(root));
        tree
    }

    #[test]
    fn given_empty_selection_when_toggling_leaf_then_selects_and_deselects() {
        let mut sel = SelectionStore::new();

        sel.toggle_leaf("a1");
        assert!(sel.is_selected("a1"));

        sel.toggle_leaf("a1");
        assert!(!sel.is_selected("a1"));
    }

    #[test]
    fn given_node_toggle_when_checking_then_selects_all_descendant_leaves() {
        let tree = sample_tree();
        let mut sel = SelectionStore::new();

        sel.set_node(&tree, "a", true);
        assert!(sel.is_selected("a1"));
        assert!(sel.is_selected("a2"));
        assert!(!sel.is_selected("b"));

        sel.set_node(&tree, "a", false);
        assert!(sel.is_empty());
    }

    #[test]
    fn given_partial_selection_when_querying_parent_then_reports_some() {
        let tree = sample_tree();
        let mut sel = SelectionStore::new();

        sel.toggle_leaf("a1");
        assert_eq!(
            sel.state_of(&tree, "a"),
            NodeState {
                all: false,
                some: true
            }
        );

        sel.toggle_leaf("a2");
        assert_eq!(
            sel.state_of(&tree, "a"),
            NodeState {
                all: true,
                some: false
            }
        );
    }

    #[test]
    fn given_full_parent_when_unchecking_one_leaf_then_drops_to_some() {
        let tree = sample_tree();
        let mut sel = SelectionStore::new();

        sel.set_node(&tree, "a", true);
        assert!(sel.state_of(&tree, "a").all);

        sel.toggle_leaf("a2");
        let state = sel.state_of(&tree, "a");
        assert!(!state.all);
        assert!(state.some);
    }

    #[test]
    fn given_unknown_node_when_querying_then_reports_unchecked() {
        let tree = sample_tree();
        let sel = SelectionStore::new();

        assert_eq!(
            sel.state_of(&tree, "missing"),
            NodeState {
                all: false,
                some: false
            }
        );
    }

    #[test]
    fn given_stale_ids_when_pruning_then_keeps_only_current_leaves() {
        let tree = sample_tree();
        let mut sel =
            SelectionStore::from_leaf_ids(["a1".to_string(), "gone".to_string(), "a".to_string()]);

        sel.prune(&tree);

        // "gone" is absent, "a" exists but is not a leaf
        assert_eq!(sel.iter().collect::<Vec<_>>(), vec!["a1"]);
    }
}
