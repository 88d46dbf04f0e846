//! Catalog service: builds category trees from the remote source.
//!
//! Resolves a root category and its descendants through the
//! `CategorySource` boundary and assembles one arena tree per call, with
//! an explicit worklist instead of recursion. A failed child fetch
//! degrades that subtree to a leaf; a repeated category id (cyclic
//! source data) is inserted as a leaf and never expanded again.
//!
//! Every build carries a monotonically increasing generation so callers
//! can discard stale results when a newer build was requested
//! (last-request-wins, no cancellation token).

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{classify, CategoryData, CategoryTree, Classification};
use crate::infrastructure::traits::CategorySource;

/// One fully resolved tree, never observable half-built.
#[derive(Debug)]
pub struct BuiltTree {
    pub generation: u64,
    pub root_id: String,
    pub tree: CategoryTree,
    pub classification: Classification,
}

pub struct CatalogService {
    source: Arc<dyn CategorySource>,
    generation: AtomicU64,
}

impl CatalogService {
    pub fn new(source: Arc<dyn CategorySource>) -> Self {
        Self {
            source,
            generation: AtomicU64::new(0),
        }
    }

    /// Build the full tree rooted at `root_id`.
    ///
    /// Only a source that can neither label the root nor list its
    /// children fails the build; any deeper fetch failure degrades to a
    /// leaf and the build continues.
    #[instrument(level = "debug", skip(self))]
    pub fn build_tree(&self, root_id: &str) -> ApplicationResult<BuiltTree> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let root_label = self.source.get_category(root_id);
        let root_children = self.source.list_children(root_id);
        if root_label.is_err() {
            if let Err(e) = root_children {
                return Err(ApplicationError::SourceUnavailable {
                    context: format!("resolve category {root_id}"),
                    source: Box::new(e),
                });
            }
        }

        let root_data = match root_label {
            Ok(detail) => CategoryData {
                id: root_id.to_string(),
                name: detail.name,
                price: detail.price,
            },
            Err(e) => {
                warn!(root_id, error = %e, "root label fetch failed, using id");
                CategoryData {
                    id: root_id.to_string(),
                    name: root_id.to_string(),
                    price: None,
                }
            }
        };

        let mut tree = CategoryTree::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(root_id.to_string());
        let root_idx = tree.insert_node(root_data, None);

        // Worklist of nodes whose children still need resolving
        let mut stack = vec![(root_id.to_string(), root_idx, root_children.ok())];

        while let Some((id, idx, prefetched)) = stack.pop() {
            let children = match prefetched {
                Some(c) => c,
                None => match self.source.list_children(&id) {
                    Ok(c) => c,
                    Err(e) => {
                        warn!(category = %id, error = %e, "child fetch failed, degrading to leaf");
                        continue;
                    }
                },
            };

            for child in children {
                let data = CategoryData {
                    id: child.id.clone(),
                    name: child.name,
                    price: child.price,
                };
                if !visited.insert(child.id.clone()) {
                    warn!(category = %child.id, "repeated category id, breaking cycle");
                    tree.insert_node(data, Some(idx));
                    continue;
                }
                let child_idx = tree.insert_node(data, Some(idx));
                if child.has_children {
                    stack.push((child.id, child_idx, None));
                }
            }
        }

        let classification = classify(&tree);
        debug!(
            generation,
            nodes = tree.node_count(),
            leaves = classification.leaves.len(),
            "built category tree"
        );

        Ok(BuiltTree {
            generation,
            root_id: root_id.to_string(),
            tree,
            classification,
        })
    }
}
