//! Combo compilation: selection + custom lines + overrides -> document.
//!
//! Turns the current selection into an ordered item list, expands every
//! item against its size axis into priced variants, and assembles the
//! final combo document. Pure: no I/O, all inputs passed in, so the
//! whole step is testable without a session harness.

use std::collections::BTreeMap;
use std::path::PathBuf;

use itertools::Itertools;
use regex::Regex;
use tracing::{debug, instrument};

use crate::domain::arena::CategoryTree;
use crate::domain::classify::Classification;
use crate::domain::combo::{
    Combo, ComboDraft, ComboItem, ItemKey, ImageRef, Sizing, Variant, VariantOverride,
};
use crate::domain::error::{DomainError, DomainResult};
use crate::domain::selection::SelectionStore;

/// Compilation output: the document plus the image files that still need
/// uploading, keyed by (item index, size index).
#[derive(Debug)]
pub struct CompiledCombo {
    pub combo: Combo,
    pub attachments: BTreeMap<(usize, usize), PathBuf>,
}

/// Item skeleton before variant expansion.
struct PendingItem<'a> {
    key: ItemKey,
    name: String,
    price: Option<f64>,
    terms: String,
    entry: Option<&'a crate::domain::combo::CustomEntry>,
}

pub struct ComboCompiler {
    /// Known size synonyms, matched against item labels when no explicit
    /// size list was entered
    size_synonyms: Vec<(Regex, &'static str)>,
}

impl Default for ComboCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl ComboCompiler {
    pub fn new() -> Self {
        let size_synonyms = vec![
            (Regex::new(r"(?i)^(s|sm|small)$").unwrap(), "Small"),
            (Regex::new(r"(?i)^(m|md|med|medium)$").unwrap(), "Medium"),
            (Regex::new(r"(?i)^(l|lg|large)$").unwrap(), "Large"),
            (Regex::new(r"(?i)^(xl|extra\s*large)$").unwrap(), "XL"),
        ];
        Self { size_synonyms }
    }

    /// Compile the current session state into a submittable document.
    ///
    /// Validation failures (missing name, zero items, duplicate sizes)
    /// come back as recoverable errors; nothing is ever sent onward.
    #[instrument(level = "debug", skip_all, fields(name = %draft.name))]
    pub fn compile(
        &self,
        tree: &CategoryTree,
        classification: &Classification,
        selection: &SelectionStore,
        draft: &ComboDraft,
    ) -> DomainResult<CompiledCombo> {
        if draft.name.trim().is_empty() {
            return Err(DomainError::Validation("combo name is required".into()));
        }

        let pending = self.select_items(tree, classification, selection, draft)?;
        if pending.is_empty() {
            return Err(DomainError::Validation(
                "a combo needs at least one item".into(),
            ));
        }
        debug!(items = pending.len(), "selected combo items");

        let mut items = Vec::with_capacity(pending.len());
        let mut attachments = BTreeMap::new();
        for (item_index, p) in pending.iter().enumerate() {
            let axis = self.size_axis(p, &draft.sizing)?;
            let mut variants = Vec::with_capacity(axis.len());
            for (size_index, size) in axis.into_iter().enumerate() {
                let ov = override_for(&draft.sizing, &p.key, size_index);
                variants.push(self.expand_variant(
                    p,
                    size,
                    ov,
                    item_index,
                    size_index,
                    &mut attachments,
                ));
            }
            items.push(materialize(p, variants));
        }

        let combo = Combo {
            name: draft.name.clone(),
            combo_type: draft.combo_type,
            base_price: draft.base_price,
            terms: draft.terms.clone(),
            heading: draft.heading.clone(),
            icon_url: draft.icon_url.clone(),
            image_url: draft.image_url.clone(),
            items,
        };
        Ok(CompiledCombo { combo, attachments })
    }

    /// Step 1: ordered item selection.
    ///
    /// Fully covered last-level parents first (classification order),
    /// then selected orphan leaves (classification order), then custom
    /// lines in input order. A selected leaf whose parent is a last-level
    /// parent with unselected siblings is suppressed: it does not qualify
    /// the parent and is not emitted on its own.
    fn select_items<'a>(
        &self,
        tree: &CategoryTree,
        classification: &Classification,
        selection: &SelectionStore,
        draft: &'a ComboDraft,
    ) -> DomainResult<Vec<PendingItem<'a>>> {
        let mut pending = Vec::new();

        for id in &classification.last_level_parents {
            let idx = tree
                .find(id)
                .ok_or_else(|| DomainError::UnknownCategory(id.clone()))?;
            let leaves = tree.leaf_ids_under(idx);
            if !leaves.is_empty() && leaves.iter().all(|l| selection.is_selected(l)) {
                pending.push(self.category_item(tree, id)?);
            }
        }

        for id in &classification.leaves {
            if classification.is_orphan(id) && selection.is_selected(id) {
                pending.push(self.category_item(tree, id)?);
            }
        }

        for entry in &draft.custom_items {
            if entry.name.trim().is_empty() {
                continue;
            }
            pending.push(PendingItem {
                key: ItemKey::Custom(entry.key),
                name: entry.name.clone(),
                price: entry.price,
                terms: entry.terms.clone(),
                entry: Some(entry),
            });
        }

        Ok(pending)
    }

    fn category_item(&self, tree: &CategoryTree, id: &str) -> DomainResult<PendingItem<'static>> {
        let name = tree
            .name_of(id)
            .ok_or_else(|| DomainError::UnknownCategory(id.to_string()))?;
        Ok(PendingItem {
            key: ItemKey::Category(id.to_string()),
            name: name.to_string(),
            price: tree.price_of(id),
            terms: String::new(),
            entry: None,
        })
    }

    /// Step 2a: determine the size axis for one item.
    fn size_axis(&self, item: &PendingItem, sizing: &Sizing) -> DomainResult<Vec<Option<String>>> {
        let axis: Vec<Option<String>> = match sizing {
            Sizing::Uniform { sizes, .. } => {
                if sizes.is_empty() {
                    vec![None]
                } else {
                    sizes.iter().cloned().map(Some).collect()
                }
            }
            Sizing::PerItem { sizes, .. } => {
                match sizes.get(&item.key).filter(|s| !s.is_empty()) {
                    Some(own) => own.iter().cloned().map(Some).collect(),
                    None => match self.infer_size(&item.name) {
                        Some(size) => vec![Some(size)],
                        None => vec![None],
                    },
                }
            }
        };

        if let Some(dup) = axis.iter().duplicates().next() {
            return Err(DomainError::DuplicateSize {
                item: item.name.clone(),
                size: dup.clone().unwrap_or_default(),
            });
        }
        Ok(axis)
    }

    /// Match an item label against the size synonym lexicon.
    fn infer_size(&self, label: &str) -> Option<String> {
        let trimmed = label.trim();
        self.size_synonyms
            .iter()
            .find(|(re, _)| re.is_match(trimmed))
            .map(|(_, canonical)| canonical.to_string())
    }

    /// Step 2b: build one variant with override precedence.
    ///
    /// price: override price if set, else item price, else None (an
    /// override record without a price means "fall back"). terms:
    /// non-empty override terms, else item terms. image: an override URL
    /// is used as-is; an override file is recorded as an attachment and
    /// the URL left empty until the persistence boundary assigns one.
    fn expand_variant(
        &self,
        item: &PendingItem,
        size: Option<String>,
        ov: Option<&VariantOverride>,
        item_index: usize,
        size_index: usize,
        attachments: &mut BTreeMap<(usize, usize), PathBuf>,
    ) -> Variant {
        let price = ov.and_then(|o| o.price).or(item.price);
        let terms = match ov {
            Some(o) if !o.terms.is_empty() => o.terms.clone(),
            _ => item.terms.clone(),
        };
        let image_url = match ov.and_then(|o| o.image.as_ref()) {
            Some(ImageRef::File(path)) => {
                attachments.insert((item_index, size_index), path.clone());
                String::new()
            }
            Some(ImageRef::Url(url)) => url.clone(),
            None => String::new(),
        };
        Variant {
            size,
            price,
            terms,
            image_url,
        }
    }
}

fn override_for<'a>(
    sizing: &'a Sizing,
    key: &ItemKey,
    size_index: usize,
) -> Option<&'a VariantOverride> {
    match sizing {
        Sizing::Uniform { overrides, .. } => overrides.get(&size_index),
        Sizing::PerItem { overrides, .. } => overrides.get(&(key.clone(), size_index)),
    }
}

fn materialize(item: &PendingItem, variants: Vec<Variant>) -> ComboItem {
    match (&item.key, item.entry) {
        (ItemKey::Custom(_), Some(entry)) => ComboItem::Custom {
            name: entry.name.clone(),
            size_options: entry.size_options.clone(),
            price: entry.price,
            terms: entry.terms.clone(),
            variants,
        },
        (ItemKey::Category(id), _) => ComboItem::Category {
            category_id: id.clone(),
            variants,
        },
        // A custom key without its entry cannot be constructed here
        (ItemKey::Custom(_), None) => ComboItem::Custom {
            name: item.name.clone(),
            size_options: Vec::new(),
            price: item.price,
            terms: item.terms.clone(),
            variants,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_size_synonym_labels_when_inferring_then_maps_to_canonical() {
        let compiler = ComboCompiler::new();
        assert_eq!(compiler.infer_size("Small"), Some("Small".to_string()));
        assert_eq!(compiler.infer_size(" s "), Some("Small".to_string()));
        assert_eq!(compiler.infer_size("LG"), Some("Large".to_string()));
        assert_eq!(compiler.infer_size("extra large"), Some("XL".to_string()));
        assert_eq!(compiler.infer_size("Pepperoni"), None);
    }
}
