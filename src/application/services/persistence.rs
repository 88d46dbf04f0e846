//! Persistence adapter: combo document <-> submission payload.
//!
//! Forward direction serializes a compiled combo into one multipart
//! payload: scalar text fields plus a JSON-encoded `items` field, with
//! per-variant image files attached out-of-band under
//! `variant_<itemIndex>_<sizeIndex>` keys. Reverse direction rehydrates a
//! persisted combo back into selection + draft state for editing.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    CategoryTree, Combo, ComboDraft, ComboItem, CompiledCombo, CustomEntry, ImageRef, ItemKey,
    SelectionStore, Sizing, VariantOverride,
};
use crate::infrastructure::traits::ComboStore;

/// Attachment key for the image of one (item, size) slot.
pub fn variant_key(item_index: usize, size_index: usize) -> String {
    format!("variant_{item_index}_{size_index}")
}

/// Parse a `variant_<i>_<j>` attachment key back into its indices.
pub fn parse_variant_key(key: &str) -> Option<(usize, usize)> {
    let rest = key.strip_prefix("variant_")?;
    let (item, size) = rest.split_once('_')?;
    Some((item.parse().ok()?, size.parse().ok()?))
}

/// One out-of-band image file in a submission.
#[derive(Debug, Clone)]
pub struct AttachmentPart {
    pub key: String,
    pub path: PathBuf,
}

/// One multipart submission: text fields plus keyed file attachments.
#[derive(Debug, Clone, Default)]
pub struct SubmitPayload {
    pub fields: Vec<(String, String)>,
    pub attachments: Vec<AttachmentPart>,
}

impl SubmitPayload {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Session state reconstructed from a persisted combo.
#[derive(Debug)]
pub struct EditState {
    pub selection: SelectionStore,
    pub draft: ComboDraft,
}

/// Service submitting compiled combos to, and loading them from, the
/// combo store.
pub struct PersistenceService {
    store: Arc<dyn ComboStore>,
}

impl PersistenceService {
    pub fn new(store: Arc<dyn ComboStore>) -> Self {
        Self { store }
    }

    /// Submit a compiled combo. Creates when no id is given, updates
    /// otherwise. Returns the stored combo id.
    #[instrument(level = "debug", skip(self, compiled))]
    pub fn submit(
        &self,
        compiled: &CompiledCombo,
        existing_id: Option<&str>,
    ) -> ApplicationResult<String> {
        let payload = build_payload(compiled)?;
        match existing_id {
            Some(id) => {
                self.store
                    .update(id, &payload)
                    .map_err(|e| ApplicationError::OperationFailed {
                        context: format!("update combo {id}"),
                        source: Box::new(e),
                    })?;
                Ok(id.to_string())
            }
            None => self
                .store
                .create(&payload)
                .map_err(|e| ApplicationError::OperationFailed {
                    context: "create combo".to_string(),
                    source: Box::new(e),
                }),
        }
    }

    /// Load a previously persisted combo document.
    pub fn load(&self, id: &str) -> ApplicationResult<Combo> {
        self.store.fetch(id).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ApplicationError::ComboNotFound(id.to_string())
            } else {
                ApplicationError::OperationFailed {
                    context: format!("fetch combo {id}"),
                    source: Box::new(e),
                }
            }
        })
    }
}

/// Serialize a compiled combo into one multipart payload.
fn build_payload(compiled: &CompiledCombo) -> ApplicationResult<SubmitPayload> {
    let combo = &compiled.combo;
    let items_json =
        serde_json::to_string(&combo.items).map_err(|e| ApplicationError::OperationFailed {
            context: "encode combo items".to_string(),
            source: Box::new(e),
        })?;

    let mut fields = vec![
        ("name".to_string(), combo.name.clone()),
        ("type".to_string(), combo.combo_type.to_string()),
        (
            "basePrice".to_string(),
            combo.base_price.map(|p| p.to_string()).unwrap_or_default(),
        ),
        ("terms".to_string(), combo.terms.clone()),
        ("heading".to_string(), combo.heading.clone()),
        ("iconUrl".to_string(), combo.icon_url.clone()),
        ("imageUrl".to_string(), combo.image_url.clone()),
    ];
    fields.push(("items".to_string(), items_json));

    let attachments = compiled
        .attachments
        .iter()
        .map(|(&(i, j), path)| AttachmentPart {
            key: variant_key(i, j),
            path: path.clone(),
        })
        .collect();

    Ok(SubmitPayload {
        fields,
        attachments,
    })
}

/// Reverse direction: rebuild selection + draft state from a persisted
/// combo against the *current* tree.
///
/// Category items expand to whatever leaves currently sit under their id
/// (the id itself when it is now childless); ids no longer in the tree
/// are dropped. When every item shares an identical, order-aligned size
/// sequence and one per-size override map explains every slot value, the
/// combo is treated as uniformly sized.
#[instrument(level = "debug", skip_all, fields(name = %combo.name))]
pub fn rehydrate(id: &str, combo: &Combo, tree: &CategoryTree) -> EditState {
    let mut selection = SelectionStore::new();
    let mut custom_items = Vec::new();
    let mut keys = Vec::with_capacity(combo.items.len());
    // each item's own fallback (price, terms), to tell edited variant
    // values apart from ones the compiler filled in
    let mut fallbacks = Vec::with_capacity(combo.items.len());

    for item in &combo.items {
        match item {
            ComboItem::Category { category_id, .. } => {
                match tree.find(category_id) {
                    Some(idx) => {
                        for leaf in tree.leaf_ids_under(idx) {
                            selection.select(&leaf);
                        }
                    }
                    None => {
                        warn!(category_id, "persisted category no longer in tree, dropping");
                    }
                }
                fallbacks.push((tree.price_of(category_id), String::new()));
                keys.push(ItemKey::Category(category_id.clone()));
            }
            ComboItem::Custom {
                name,
                size_options,
                price,
                terms,
                ..
            } => {
                let entry = CustomEntry {
                    key: Uuid::new_v4(),
                    name: name.clone(),
                    size_options: size_options.clone(),
                    price: *price,
                    terms: terms.clone(),
                };
                fallbacks.push((*price, terms.clone()));
                keys.push(ItemKey::Custom(entry.key));
                custom_items.push(entry);
            }
        }
    }

    let sizing = rebuild_sizing(combo, &keys, &fallbacks);
    debug!(selected = selection.len(), "rehydrated selection");

    EditState {
        selection,
        draft: ComboDraft {
            id: Some(id.to_string()),
            name: combo.name.clone(),
            combo_type: combo.combo_type,
            base_price: combo.base_price,
            terms: combo.terms.clone(),
            heading: combo.heading.clone(),
            icon_url: combo.icon_url.clone(),
            image_url: combo.image_url.clone(),
            custom_items,
            sizing,
        },
    }
}

fn rebuild_sizing(combo: &Combo, keys: &[ItemKey], fallbacks: &[(Option<f64>, String)]) -> Sizing {
    if let Some(shared) = shared_size_axis(combo) {
        if let Some(overrides) = shared_overrides(combo, fallbacks) {
            return Sizing::Uniform {
                sizes: shared,
                overrides,
            };
        }
    }

    let mut sizes = HashMap::new();
    let mut overrides = HashMap::new();
    for ((item, key), (base_price, base_terms)) in combo.items.iter().zip(keys).zip(fallbacks) {
        let own: Vec<String> = item
            .variants()
            .iter()
            .filter_map(|v| v.size.clone())
            .collect();
        if !own.is_empty() {
            sizes.insert(key.clone(), own);
        }
        for (j, v) in item.variants().iter().enumerate() {
            let mut ov = VariantOverride::default();
            if v.price != *base_price {
                ov.price = v.price;
            }
            if v.terms != *base_terms {
                ov.terms = v.terms.clone();
            }
            if !v.image_url.is_empty() {
                ov.image = Some(ImageRef::Url(v.image_url.clone()));
            }
            if ov != VariantOverride::default() {
                overrides.insert((key.clone(), j), ov);
            }
        }
    }
    Sizing::PerItem { sizes, overrides }
}

/// Shared per-size overrides, if the slot values can be explained by one
/// override map applied to every item. A variant value equal to its
/// item's own fallback needs no override; an edited value must agree
/// across all items. Store-assigned image URLs differ per item, so a
/// multi-item combo with uploaded images falls back to per-item
/// overrides.
fn shared_overrides(
    combo: &Combo,
    fallbacks: &[(Option<f64>, String)],
) -> Option<BTreeMap<usize, VariantOverride>> {
    let slots = combo.items.first().map_or(0, |i| i.variants().len());
    let mut overrides = BTreeMap::new();

    for j in 0..slots {
        let mut ov = VariantOverride::default();

        let price_explained = combo
            .items
            .iter()
            .zip(fallbacks)
            .all(|(item, (base, _))| item.variants()[j].price == *base);
        if !price_explained {
            let shared = combo.items.first()?.variants()[j].price?;
            if combo
                .items
                .iter()
                .any(|item| item.variants()[j].price != Some(shared))
            {
                return None;
            }
            ov.price = Some(shared);
        }

        let terms_explained = combo
            .items
            .iter()
            .zip(fallbacks)
            .all(|(item, (_, base))| item.variants()[j].terms == *base);
        if !terms_explained {
            let shared = &combo.items.first()?.variants()[j].terms;
            if shared.is_empty()
                || combo
                    .items
                    .iter()
                    .any(|item| &item.variants()[j].terms != shared)
            {
                return None;
            }
            ov.terms = shared.clone();
        }

        let urls: Vec<&str> = combo
            .items
            .iter()
            .map(|item| item.variants()[j].image_url.as_str())
            .collect();
        if urls.iter().any(|u| !u.is_empty()) {
            let shared = urls[0];
            if shared.is_empty() || urls.iter().any(|u| *u != shared) {
                return None;
            }
            ov.image = Some(ImageRef::Url(shared.to_string()));
        }

        if ov != VariantOverride::default() {
            overrides.insert(j, ov);
        }
    }
    Some(overrides)
}

/// The order-aligned size sequence shared by all items, if there is one.
/// Returns the sized axis (empty when the shared axis is the single
/// unsized slot).
fn shared_size_axis(combo: &Combo) -> Option<Vec<String>> {
    let first = combo.items.first()?;
    let axis: Vec<Option<String>> = first.variants().iter().map(|v| v.size.clone()).collect();
    for item in &combo.items[1..] {
        let other: Vec<Option<String>> = item.variants().iter().map(|v| v.size.clone()).collect();
        if other != axis {
            return None;
        }
    }
    match axis.as_slice() {
        [None] => Some(Vec::new()),
        _ if axis.iter().all(|s| s.is_some()) => {
            Some(axis.into_iter().flatten().collect())
        }
        _ => None,
    }
}
