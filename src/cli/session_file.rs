//! Composition session files (TOML).
//!
//! A session file captures one composition run for the `compile`
//! command: the root category, the selected leaf ids, custom lines,
//! sizing, and per-slot overrides. Parse errors (unknown fields,
//! non-numeric prices) are user-input validation failures and stop the
//! run before anything reaches the store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::cli::error::{CliError, CliResult};
use crate::domain::{
    ComboDraft, ComboType, CustomEntry, ImageRef, ItemKey, Sizing, VariantOverride,
};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionFile {
    /// Root category id to build the tree from
    pub root: String,
    pub name: String,
    #[serde(default)]
    pub combo_id: Option<String>,
    #[serde(rename = "type", default)]
    pub combo_type: Option<String>,
    #[serde(default)]
    pub base_price: Option<f64>,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub icon_url: String,
    #[serde(default)]
    pub image_url: String,
    /// Selected leaf ids
    #[serde(default)]
    pub selected: Vec<String>,
    #[serde(default)]
    pub custom: Vec<CustomSection>,
    #[serde(default)]
    pub sizing: SizingSection,
    #[serde(default, rename = "override")]
    pub overrides: Vec<OverrideSection>,
    #[serde(default)]
    pub item_sizes: Vec<ItemSizesSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomSection {
    pub name: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub terms: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizingSection {
    #[serde(default)]
    pub uniform: bool,
    #[serde(default)]
    pub sizes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideSection {
    /// Size index the override applies to
    pub size: usize,
    /// Item reference (category id or custom line name); ignored for
    /// uniform sizing
    #[serde(default)]
    pub item: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub terms: String,
    #[serde(default)]
    pub image_file: Option<PathBuf>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemSizesSection {
    /// Category id the sizes belong to
    pub item: String,
    pub sizes: Vec<String>,
}

impl SessionFile {
    pub fn parse(path: &Path, content: &str) -> CliResult<Self> {
        toml::from_str(content)
            .map_err(|e| CliError::Session(format!("{}: {e}", path.display())))
    }

    /// Convert the parsed file into compiler inputs.
    pub fn into_draft(self) -> CliResult<(String, Vec<String>, ComboDraft)> {
        let combo_type = match self.combo_type.as_deref() {
            None => ComboType::default(),
            Some(raw) => raw.parse().map_err(CliError::Session)?,
        };

        let custom_items: Vec<CustomEntry> = self
            .custom
            .into_iter()
            .map(|c| {
                let mut entry = CustomEntry::new(c.name);
                entry.size_options = c.sizes;
                entry.price = c.price;
                entry.terms = c.terms;
                entry
            })
            .collect();

        let sizing = build_sizing(
            self.sizing,
            self.overrides,
            self.item_sizes,
            &custom_items,
        )?;

        let draft = ComboDraft {
            id: self.combo_id,
            name: self.name,
            combo_type,
            base_price: self.base_price,
            terms: self.terms,
            heading: self.heading,
            icon_url: self.icon_url,
            image_url: self.image_url,
            custom_items,
            sizing,
        };
        Ok((self.root, self.selected, draft))
    }
}

fn build_sizing(
    section: SizingSection,
    overrides: Vec<OverrideSection>,
    item_sizes: Vec<ItemSizesSection>,
    custom_items: &[CustomEntry],
) -> CliResult<Sizing> {
    if section.uniform {
        let mut shared = std::collections::BTreeMap::new();
        for ov in overrides {
            shared.insert(ov.size, to_variant_override(ov));
        }
        return Ok(Sizing::Uniform {
            sizes: section.sizes,
            overrides: shared,
        });
    }

    let resolve = |reference: &str| -> ItemKey {
        custom_items
            .iter()
            .find(|e| e.name == reference)
            .map(|e| ItemKey::Custom(e.key))
            .unwrap_or_else(|| ItemKey::Category(reference.to_string()))
    };

    let mut sizes: HashMap<ItemKey, Vec<String>> = HashMap::new();
    for entry in item_sizes {
        sizes.insert(resolve(&entry.item), entry.sizes);
    }
    for entry in custom_items {
        if !entry.size_options.is_empty() {
            sizes
                .entry(ItemKey::Custom(entry.key))
                .or_insert_with(|| entry.size_options.clone());
        }
    }

    let mut keyed: HashMap<(ItemKey, usize), VariantOverride> = HashMap::new();
    for ov in overrides {
        let Some(reference) = ov.item.as_deref() else {
            return Err(CliError::Session(
                "override needs an item reference when sizing is not uniform".to_string(),
            ));
        };
        keyed.insert((resolve(reference), ov.size), to_variant_override(ov));
    }

    Ok(Sizing::PerItem {
        sizes,
        overrides: keyed,
    })
}

fn to_variant_override(ov: OverrideSection) -> VariantOverride {
    let image = match (ov.image_file, ov.image_url) {
        // A newly attached file wins over a URL
        (Some(file), _) => Some(ImageRef::File(file)),
        (None, Some(url)) => Some(ImageRef::Url(url)),
        (None, None) => None,
    };
    VariantOverride {
        price: ov.price,
        terms: ov.terms,
        image,
    }
}
