//! Tests for tri-state selection behavior through the session

use std::io;
use std::sync::Arc;

use rscombo::application::services::{CatalogService, ComposeSession};
use rscombo::infrastructure::traits::{CategoryDetail, CategorySource, ChildRecord};
use rscombo::util::testing::init_test_setup;

/// Root -> A -> [A1, A2], Root -> B(leaf), served in-memory.
struct StaticSource;

impl CategorySource for StaticSource {
    fn list_children(&self, parent_id: &str) -> io::Result<Vec<ChildRecord>> {
        let rows: Vec<(&str, &str, bool)> = match parent_id {
            "root" => vec![("a", "A", true), ("b", "B", false)],
            "a" => vec![("a1", "A1", false), ("a2", "A2", false)],
            _ => vec![],
        };
        Ok(rows
            .into_iter()
            .map(|(id, name, has_children)| ChildRecord {
                id: id.to_string(),
                name: name.to_string(),
                price: None,
                has_children,
            })
            .collect())
    }

    fn get_category(&self, id: &str) -> io::Result<CategoryDetail> {
        Ok(CategoryDetail {
            name: id.to_uppercase(),
            price: None,
            parent_id: None,
        })
    }
}

fn session() -> ComposeSession {
    init_test_setup();
    let catalog = CatalogService::new(Arc::new(StaticSource));
    let mut session = ComposeSession::new();
    session.install_tree(catalog.build_tree("root").unwrap());
    session
}

#[test]
fn given_checked_parent_when_querying_then_all_state() {
    // Arrange
    let mut s = session();

    // Act
    s.set_node("a", true).unwrap();

    // Assert
    let state = s.state_of("a").unwrap();
    assert!(state.all);
    assert!(!state.some);
}

#[test]
fn given_checked_parent_when_unchecking_one_leaf_then_some_never_all() {
    let mut s = session();
    s.set_node("a", true).unwrap();

    s.toggle_leaf("a2");

    let state = s.state_of("a").unwrap();
    assert!(!state.all);
    assert!(state.some);
}

#[test]
fn given_partial_selection_when_checking_root_then_everything_selected() {
    let mut s = session();
    s.toggle_leaf("a1");

    s.set_node("root", true).unwrap();

    assert!(s.state_of("root").unwrap().all);
    assert_eq!(s.selection().len(), 3);
}

#[test]
fn given_full_root_when_unchecking_subtree_then_root_drops_to_some() {
    let mut s = session();
    s.set_node("root", true).unwrap();

    s.set_node("a", false).unwrap();

    let root_state = s.state_of("root").unwrap();
    assert!(!root_state.all);
    assert!(root_state.some);
    assert!(s.state_of("b").unwrap().all);
}

#[test]
fn given_no_tree_when_mutating_node_then_recoverable_error() {
    init_test_setup();
    let mut s = ComposeSession::new();

    assert!(s.set_node("a", true).is_err());
    assert!(s.state_of("a").is_err());
}

#[test]
fn given_leaf_when_querying_then_all_equals_membership() {
    let mut s = session();

    assert!(!s.state_of("b").unwrap().all);
    s.toggle_leaf("b");
    let state = s.state_of("b").unwrap();
    assert!(state.all);
    assert!(!state.some);
}
