//! Combo entities: the persisted document shape and the transient
//! edit-session state that feeds the compiler.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Combo flavor as shown to the storefront.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComboType {
    Standard,
    Custom,
}

impl Default for ComboType {
    fn default() -> Self {
        Self::Standard
    }
}

impl std::fmt::Display for ComboType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ComboType::Standard => write!(f, "Standard"),
            ComboType::Custom => write!(f, "Custom"),
        }
    }
}

impl std::str::FromStr for ComboType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" => Ok(ComboType::Standard),
            "Custom" => Ok(ComboType::Custom),
            other => Err(format!("unknown combo type: {other}")),
        }
    }
}

/// One priced size variant of a combo item.
///
/// `size = None` means "no sizing". All variants of one item carry
/// distinct sizes, including at most one `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub size: Option<String>,
    pub price: Option<f64>,
    pub terms: String,
    pub image_url: String,
}

/// One line of a combo: either a category reference (a fully selected
/// last-level parent, or an orphan leaf standing in for itself) or a
/// free-form custom line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComboItem {
    #[serde(rename_all = "camelCase")]
    Category {
        category_id: String,
        variants: Vec<Variant>,
    },
    #[serde(rename_all = "camelCase")]
    Custom {
        name: String,
        size_options: Vec<String>,
        price: Option<f64>,
        terms: String,
        variants: Vec<Variant>,
    },
}

impl ComboItem {
    pub fn variants(&self) -> &[Variant] {
        match self {
            ComboItem::Category { variants, .. } => variants,
            ComboItem::Custom { variants, .. } => variants,
        }
    }
}

/// The persisted combo document as it crosses the persistence
/// boundary; the store owns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Combo {
    pub name: String,
    #[serde(rename = "type")]
    pub combo_type: ComboType,
    pub base_price: Option<f64>,
    pub terms: String,
    pub heading: String,
    pub icon_url: String,
    pub image_url: String,
    pub items: Vec<ComboItem>,
}

/// Key addressing one combo item during an edit session.
///
/// Category items are stable under their category id; custom lines get a
/// fresh v4 key when created or rehydrated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemKey {
    Category(String),
    Custom(Uuid),
}

/// Image attached to one variant slot during editing.
///
/// A newly attached file takes precedence over a URL; its final URL is
/// assigned by the persistence boundary after upload, never guessed
/// locally.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageRef {
    File(PathBuf),
    Url(String),
}

/// Per-(item, size) edit overrides, consumed by the compiler and then
/// discarded. A present record with `price: None` means "fall back to
/// the item's own price".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantOverride {
    pub price: Option<f64>,
    pub terms: String,
    pub image: Option<ImageRef>,
}

/// Free-form custom line entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomEntry {
    pub key: Uuid,
    pub name: String,
    pub size_options: Vec<String>,
    pub price: Option<f64>,
    pub terms: String,
}

impl CustomEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: Uuid::new_v4(),
            name: name.into(),
            size_options: Vec::new(),
            price: None,
            terms: String::new(),
        }
    }
}

/// Size axis declaration for the whole draft.
#[derive(Debug, Clone, PartialEq)]
pub enum Sizing {
    /// One shared size list applied to every item; overrides are keyed
    /// by size index only.
    Uniform {
        sizes: Vec<String>,
        overrides: BTreeMap<usize, VariantOverride>,
    },
    /// Each item carries its own size list; overrides are keyed by
    /// (item, size index).
    PerItem {
        sizes: HashMap<ItemKey, Vec<String>>,
        overrides: HashMap<(ItemKey, usize), VariantOverride>,
    },
}

impl Default for Sizing {
    fn default() -> Self {
        Self::PerItem {
            sizes: HashMap::new(),
            overrides: HashMap::new(),
        }
    }
}

/// Everything the compiler consumes besides the tree-derived inputs.
/// Superseded wholesale on every re-submit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComboDraft {
    /// Present when editing an existing combo (update instead of create)
    pub id: Option<String>,
    pub name: String,
    pub combo_type: ComboType,
    pub base_price: Option<f64>,
    pub terms: String,
    pub heading: String,
    pub icon_url: String,
    pub image_url: String,
    pub custom_items: Vec<CustomEntry>,
    pub sizing: Sizing,
}
