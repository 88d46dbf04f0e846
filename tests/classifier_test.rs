//! Tests for leaf classification on non-uniform trees

use rstest::{fixture, rstest};

use rscombo::domain::{classify, CategoryData, CategoryTree, OTHER_BRANCH};
use rscombo::util::testing::init_test_setup;

fn data(id: &str, name: &str) -> CategoryData {
    CategoryData {
        id: id.to_string(),
        name: name.to_string(),
        price: None,
    }
}

/// A non-uniform tree:
///
/// root
/// ├── drinks            (last-level parent)
/// │   ├── cola
/// │   └── water
/// ├── food
/// │   ├── snacks        (last-level parent)
/// │   │   └── chips
/// │   └── bread         (orphan: parent "food" is not last-level)
/// └── misc              (orphan: direct child of the root)
#[fixture]
fn tree() -> CategoryTree {
    init_test_setup();
    let mut tree = CategoryTree::new();
    let root = tree.insert_node(data("root", "Root"), None);
    let drinks = tree.insert_node(data("drinks", "Drinks"), Some(root));
    tree.insert_node(data("cola", "Cola"), Some(drinks));
    tree.insert_node(data("water", "Water"), Some(drinks));
    let food = tree.insert_node(data("food", "Food"), Some(root));
    let snacks = tree.insert_node(data("snacks", "Snacks"), Some(food));
    tree.insert_node(data("chips", "Chips"), Some(snacks));
    tree.insert_node(data("bread", "Bread"), Some(food));
    tree.insert_node(data("misc", "Misc"), Some(root));
    tree
}

#[rstest]
fn given_non_uniform_tree_when_classifying_then_last_level_parents_found(tree: CategoryTree) {
    let c = classify(&tree);

    assert_eq!(c.last_level_parents, vec!["drinks", "snacks"]);
    // "food" has an internal child, the root has internal children
    assert!(!c.is_last_level_parent("food"));
    assert!(!c.is_last_level_parent("root"));
}

#[rstest]
fn given_non_uniform_tree_when_classifying_then_orphans_bucketed_by_top_branch(
    tree: CategoryTree,
) {
    let c = classify(&tree);

    // "bread" sits under the "Food" branch, "misc" starts its own
    assert_eq!(c.orphans_by_branch["Food"], vec!["bread"]);
    assert_eq!(c.orphans_by_branch["Misc"], vec!["misc"]);
    assert_eq!(c.orphans_by_branch.len(), 2);
}

#[rstest]
fn given_non_uniform_tree_when_classifying_then_partition_is_exact(tree: CategoryTree) {
    let c = classify(&tree);

    // Union of last-level-parent leaf sets and orphan leaves == leaves(T)
    let mut covered: Vec<String> = Vec::new();
    for id in &c.last_level_parents {
        covered.extend(tree.leaf_ids_under(tree.find(id).unwrap()));
    }
    for ids in c.orphans_by_branch.values() {
        covered.extend(ids.iter().cloned());
    }

    let mut sorted_covered = covered.clone();
    sorted_covered.sort();
    sorted_covered.dedup();
    // no overlap
    assert_eq!(sorted_covered.len(), covered.len());

    let mut leaves = c.leaves.clone();
    leaves.sort();
    // no omission
    assert_eq!(sorted_covered, leaves);
}

#[rstest]
fn given_non_uniform_tree_when_classifying_then_parent_index_complete(tree: CategoryTree) {
    let c = classify(&tree);

    assert_eq!(c.parent_of("chips"), Some("snacks"));
    assert_eq!(c.parent_of("snacks"), Some("food"));
    assert_eq!(c.parent_of("drinks"), Some("root"));
    assert_eq!(c.parent_of("root"), None);
}

#[test]
fn given_single_node_tree_when_classifying_then_root_is_other_orphan() {
    init_test_setup();
    let mut tree = CategoryTree::new();
    tree.insert_node(data("only", "Only"), None);

    let c = classify(&tree);

    assert_eq!(c.orphans_by_branch[OTHER_BRANCH], vec!["only"]);
    assert!(c.last_level_parents.is_empty());
}
