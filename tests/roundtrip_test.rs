//! Round-trip tests: compile -> persist -> load -> rehydrate must
//! reproduce the selection and the per-variant edit state.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tempfile::TempDir;

use rscombo::application::services::{rehydrate, PersistenceService};
use rscombo::domain::{
    classify, CategoryData, CategoryTree, ComboCompiler, ComboDraft, CustomEntry, ImageRef,
    ItemKey, SelectionStore, Sizing, VariantOverride,
};
use rscombo::infrastructure::traits::FileComboStore;
use rscombo::util::testing::init_test_setup;

fn data(id: &str, name: &str, price: Option<f64>) -> CategoryData {
    CategoryData {
        id: id.to_string(),
        name: name.to_string(),
        price,
    }
}

/// Root -> A(200) -> [A1, A2], Root -> B(50, leaf)
fn sample_tree() -> CategoryTree {
    let mut tree = CategoryTree::new();
    let root = tree.insert_node(data("root", "Root", None), None);
    let a = tree.insert_node(data("a", "A", Some(200.0)), Some(root));
    tree.insert_node(data("a1", "A1", None), Some(a));
    tree.insert_node(data("a2", "A2", None), Some(a));
    tree.insert_node(data("b", "B", Some(50.0)), Some(root));
    tree
}

fn persistence(temp: &TempDir) -> PersistenceService {
    PersistenceService::new(Arc::new(FileComboStore::new(temp.path().join("combos"))))
}

#[test]
fn given_uniform_combo_when_reloaded_then_selection_and_overrides_survive() {
    // Arrange: both leaves of A plus the orphan B, uniform two-size axis,
    // a discounted Small price on the shared axis
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids([
        "a1".to_string(),
        "a2".to_string(),
        "b".to_string(),
    ]);
    let mut overrides = BTreeMap::new();
    overrides.insert(
        0,
        VariantOverride {
            price: Some(100.0),
            terms: "weekdays only".to_string(),
            image: None,
        },
    );
    let draft = ComboDraft {
        name: "Lunch Deal".to_string(),
        base_price: Some(15.0),
        sizing: Sizing::Uniform {
            sizes: vec!["Small".to_string(), "Large".to_string()],
            overrides,
        },
        ..Default::default()
    };
    let compiled = ComboCompiler::new()
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    // Act
    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let loaded = service.load(&id).unwrap();
    let state = rehydrate(&id, &loaded, &tree);

    // Assert: same leaves end up selected
    let selected: Vec<&str> = state.selection.iter().collect();
    assert_eq!(selected, ["a1", "a2", "b"]);

    // the shared axis and its override come back as uniform sizing
    match &state.draft.sizing {
        Sizing::Uniform { sizes, overrides } => {
            assert_eq!(sizes, &["Small".to_string(), "Large".to_string()]);
            assert_eq!(overrides[&0].price, Some(100.0));
            assert_eq!(overrides[&0].terms, "weekdays only");
        }
        Sizing::PerItem { .. } => panic!("expected uniform sizing after rehydration"),
    }
    assert_eq!(state.draft.id.as_deref(), Some(id.as_str()));
    assert_eq!(state.draft.name, "Lunch Deal");
    assert_eq!(state.draft.base_price, Some(15.0));
}

#[test]
fn given_rehydrated_state_when_recompiled_then_same_document() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids([
        "a1".to_string(),
        "a2".to_string(),
        "b".to_string(),
    ]);
    let draft = ComboDraft {
        name: "Stable Deal".to_string(),
        terms: "No refunds".to_string(),
        sizing: Sizing::Uniform {
            sizes: vec!["Small".to_string(), "Large".to_string()],
            overrides: BTreeMap::new(),
        },
        ..Default::default()
    };
    let compiler = ComboCompiler::new();
    let compiled = compiler
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let loaded = service.load(&id).unwrap();
    let state = rehydrate(&id, &loaded, &tree);

    let recompiled = compiler
        .compile(&tree, &classification, &state.selection, &state.draft)
        .unwrap();

    assert_eq!(recompiled.combo, compiled.combo);
    assert!(recompiled.attachments.is_empty());
}

#[test]
fn given_per_item_sizes_when_reloaded_then_sizing_stays_per_item() {
    // items with different size axes must not be misdetected as uniform
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids([
        "a1".to_string(),
        "a2".to_string(),
        "b".to_string(),
    ]);
    let mut sizes = HashMap::new();
    sizes.insert(
        ItemKey::Category("a".to_string()),
        vec!["Small".to_string(), "Large".to_string()],
    );
    sizes.insert(ItemKey::Category("b".to_string()), vec!["Large".to_string()]);
    let draft = ComboDraft {
        name: "Mixed Deal".to_string(),
        sizing: Sizing::PerItem {
            sizes,
            overrides: HashMap::new(),
        },
        ..Default::default()
    };
    let compiled = ComboCompiler::new()
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let state = rehydrate(&id, &service.load(&id).unwrap(), &tree);

    match &state.draft.sizing {
        Sizing::PerItem { sizes, .. } => {
            assert_eq!(
                sizes[&ItemKey::Category("a".to_string())],
                vec!["Small".to_string(), "Large".to_string()]
            );
            assert_eq!(
                sizes[&ItemKey::Category("b".to_string())],
                vec!["Large".to_string()]
            );
        }
        Sizing::Uniform { .. } => panic!("expected per-item sizing after rehydration"),
    }
}

#[test]
fn given_custom_item_when_reloaded_then_entry_restored_with_fresh_key() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids(["b".to_string()]);
    let mut entry = CustomEntry::new("Fries");
    entry.price = Some(3.5);
    entry.terms = "while stocks last".to_string();
    let original_key = entry.key;
    let draft = ComboDraft {
        name: "Side Deal".to_string(),
        custom_items: vec![entry],
        ..Default::default()
    };
    let compiled = ComboCompiler::new()
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let state = rehydrate(&id, &service.load(&id).unwrap(), &tree);

    assert_eq!(state.draft.custom_items.len(), 1);
    let restored = &state.draft.custom_items[0];
    assert_eq!(restored.name, "Fries");
    assert_eq!(restored.price, Some(3.5));
    assert_eq!(restored.terms, "while stocks last");
    // edit keys are session-local, never persisted
    assert_ne!(restored.key, original_key);
}

#[test]
fn given_uploaded_image_when_reloaded_then_override_carries_assigned_url() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("promo.jpg");
    std::fs::write(&image, b"jpg-bytes").unwrap();

    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids(["b".to_string()]);
    let mut overrides = BTreeMap::new();
    overrides.insert(
        0,
        VariantOverride {
            image: Some(ImageRef::File(image)),
            ..Default::default()
        },
    );
    let draft = ComboDraft {
        name: "Promo Deal".to_string(),
        sizing: Sizing::Uniform {
            sizes: vec!["Small".to_string()],
            overrides,
        },
        ..Default::default()
    };
    let compiled = ComboCompiler::new()
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let state = rehydrate(&id, &service.load(&id).unwrap(), &tree);

    // the file became a stored URL; re-editing sees a URL reference
    match &state.draft.sizing {
        Sizing::Uniform { overrides, .. } => {
            assert_eq!(
                overrides[&0].image,
                Some(ImageRef::Url("images/variant_0_0.jpg".to_string()))
            );
        }
        Sizing::PerItem { .. } => panic!("expected uniform sizing after rehydration"),
    }
}

#[test]
fn given_category_gone_from_tree_when_rehydrating_then_item_dropped() {
    init_test_setup();
    let temp = TempDir::new().unwrap();
    let tree = sample_tree();
    let classification = classify(&tree);
    let selection = SelectionStore::from_leaf_ids([
        "a1".to_string(),
        "a2".to_string(),
        "b".to_string(),
    ]);
    let draft = ComboDraft {
        name: "Old Deal".to_string(),
        ..Default::default()
    };
    let compiled = ComboCompiler::new()
        .compile(&tree, &classification, &selection, &draft)
        .unwrap();

    let service = persistence(&temp);
    let id = service.submit(&compiled, None).unwrap();
    let loaded = service.load(&id).unwrap();

    // the catalog shrank since this combo was saved
    let mut smaller = CategoryTree::new();
    let root = smaller.insert_node(data("root", "Root", None), None);
    smaller.insert_node(data("b", "B", Some(50.0)), Some(root));

    let state = rehydrate(&id, &loaded, &smaller);

    let selected: Vec<&str> = state.selection.iter().collect();
    assert_eq!(selected, ["b"]);
}
