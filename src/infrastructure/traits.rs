//! I/O boundary traits for testability
//!
//! These traits abstract the category subsystem and the combo store,
//! allowing services to be tested with mock implementations. The real
//! implementations here are file-backed; the persistence engine behind
//! `ComboStore` stays swappable.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use crate::application::services::persistence::{parse_variant_key, SubmitPayload};
use crate::domain::{Combo, ComboItem, ComboType};

/// One direct child as reported by the category subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRecord {
    pub id: String,
    pub name: String,
    pub price: Option<f64>,
    pub has_children: bool,
}

/// Label data for one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryDetail {
    pub name: String,
    pub price: Option<f64>,
    pub parent_id: Option<String>,
}

/// Read access to the merchant's category subsystem.
pub trait CategorySource: Send + Sync {
    /// List the direct children of a category.
    fn list_children(&self, parent_id: &str) -> io::Result<Vec<ChildRecord>>;

    /// Resolve one category's label data.
    fn get_category(&self, id: &str) -> io::Result<CategoryDetail>;
}

/// Write/read access to the combo persistence boundary.
pub trait ComboStore: Send + Sync {
    /// Persist a new combo, returning its assigned id.
    fn create(&self, payload: &SubmitPayload) -> io::Result<String>;

    /// Replace an existing combo.
    fn update(&self, id: &str, payload: &SubmitPayload) -> io::Result<()>;

    /// Load a persisted combo document.
    fn fetch(&self, id: &str) -> io::Result<Combo>;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

#[derive(Debug, Clone, Deserialize)]
struct CatalogRecord {
    id: String,
    name: String,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    parent: Option<String>,
}

/// Category source backed by a flat JSON catalog file: a top-level array
/// of `{id, name, price?, parent?}` records. Children are derived from
/// the parent pointers, mirroring the recursively fetched remote shape.
#[derive(Debug)]
pub struct JsonCatalogSource {
    records: HashMap<String, CatalogRecord>,
    children: HashMap<String, Vec<String>>,
}

impl JsonCatalogSource {
    pub fn load(path: &Path) -> io::Result<Self> {
        let content = fs::read_to_string(path)?;
        let list: Vec<CatalogRecord> = serde_json::from_str(&content)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        let mut records = HashMap::new();
        let mut children: HashMap<String, Vec<String>> = HashMap::new();
        for record in list {
            if let Some(parent) = &record.parent {
                children
                    .entry(parent.clone())
                    .or_default()
                    .push(record.id.clone());
            }
            records.insert(record.id.clone(), record);
        }
        Ok(Self { records, children })
    }

    fn has_children(&self, id: &str) -> bool {
        self.children.get(id).map(|c| !c.is_empty()).unwrap_or(false)
    }
}

impl CategorySource for JsonCatalogSource {
    fn list_children(&self, parent_id: &str) -> io::Result<Vec<ChildRecord>> {
        if !self.records.contains_key(parent_id) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("unknown category: {parent_id}"),
            ));
        }
        let ids = self.children.get(parent_id).cloned().unwrap_or_default();
        Ok(ids
            .iter()
            .filter_map(|id| self.records.get(id))
            .map(|r| ChildRecord {
                id: r.id.clone(),
                name: r.name.clone(),
                price: r.price,
                has_children: self.has_children(&r.id),
            })
            .collect())
    }

    fn get_category(&self, id: &str) -> io::Result<CategoryDetail> {
        self.records
            .get(id)
            .map(|r| CategoryDetail {
                name: r.name.clone(),
                price: r.price,
                parent_id: r.parent.clone(),
            })
            .ok_or_else(|| {
                io::Error::new(io::ErrorKind::NotFound, format!("unknown category: {id}"))
            })
    }
}

/// Combo store keeping one directory per combo id: `combo.json` for the
/// structured payload, attachments under `images/`. Uploading an
/// attachment assigns the variant's image URL; callers never guess it.
#[derive(Debug)]
pub struct FileComboStore {
    dir: PathBuf,
}

impl FileComboStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn combo_dir(&self, id: &str) -> PathBuf {
        self.dir.join(id)
    }

    fn persist(&self, id: &str, payload: &SubmitPayload) -> io::Result<()> {
        let mut combo = combo_from_payload(payload)?;
        let combo_dir = self.combo_dir(id);
        fs::create_dir_all(&combo_dir)?;

        for part in &payload.attachments {
            let Some((item, size)) = parse_variant_key(&part.key) else {
                warn!(key = %part.key, "unrecognized attachment key, skipping");
                continue;
            };
            let ext = part
                .path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("bin");
            let rel = format!("images/{}.{}", part.key, ext);
            let dest = combo_dir.join(&rel);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&part.path, &dest)?;

            match variant_mut(&mut combo, item, size) {
                Some(variant) => variant.image_url = rel,
                None => warn!(key = %part.key, "attachment points at no variant, skipping"),
            }
        }

        let json = serde_json::to_string_pretty(&combo)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(combo_dir.join("combo.json"), json)
    }
}

impl ComboStore for FileComboStore {
    fn create(&self, payload: &SubmitPayload) -> io::Result<String> {
        let id = Uuid::new_v4().to_string();
        self.persist(&id, payload)?;
        Ok(id)
    }

    fn update(&self, id: &str, payload: &SubmitPayload) -> io::Result<()> {
        if !self.combo_dir(id).is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no combo with id {id}"),
            ));
        }
        self.persist(id, payload)
    }

    fn fetch(&self, id: &str) -> io::Result<Combo> {
        let content = fs::read_to_string(self.combo_dir(id).join("combo.json"))?;
        serde_json::from_str(&content).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

/// Reassemble the combo document from the multipart text fields.
fn combo_from_payload(payload: &SubmitPayload) -> io::Result<Combo> {
    let items_json = payload
        .field("items")
        .ok_or_else(|| invalid("missing items field"))?;
    let items: Vec<ComboItem> = serde_json::from_str(items_json)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let combo_type: ComboType = payload
        .field("type")
        .unwrap_or("Standard")
        .parse()
        .map_err(invalid)?;
    let base_price = match payload.field("basePrice") {
        None | Some("") => None,
        Some(raw) => Some(
            raw.parse::<f64>()
                .map_err(|_| invalid(format!("invalid basePrice: {raw}")))?,
        ),
    };

    Ok(Combo {
        name: payload.field("name").unwrap_or_default().to_string(),
        combo_type,
        base_price,
        terms: payload.field("terms").unwrap_or_default().to_string(),
        heading: payload.field("heading").unwrap_or_default().to_string(),
        icon_url: payload.field("iconUrl").unwrap_or_default().to_string(),
        image_url: payload.field("imageUrl").unwrap_or_default().to_string(),
        items,
    })
}

fn variant_mut(combo: &mut Combo, item: usize, size: usize) -> Option<&mut crate::domain::Variant> {
    let variants = match combo.items.get_mut(item)? {
        ComboItem::Category { variants, .. } => variants,
        ComboItem::Custom { variants, .. } => variants,
    };
    variants.get_mut(size)
}
