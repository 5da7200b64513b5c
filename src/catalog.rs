//! Catalog model: the purchasable items as fetched from the document store.
//!
//! Raw documents arrive with store field names (`_id`, `_key`, `_ref`) and
//! lots of optional fields. [`normalize_item`] is the one place where those
//! get defaulted; everything downstream works with [`CatalogItem`].

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::CatalogError;

// ── Normalized values ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeVariant {
    #[serde(rename = "_key")]
    pub key: String,
    pub label: String,
    pub price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtraOption {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: Decimal,
    #[serde(rename = "isAvailable", default = "default_true")]
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    #[serde(rename = "price", default)]
    pub price_delta: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "isRequired")]
    pub required: bool,
    #[serde(rename = "maxOptions")]
    pub max_selections: u32,
    pub options: Vec<ChoiceOption>,
}

impl ChoiceGroup {
    pub fn option(&self, key: &str) -> Option<&ChoiceOption> {
        self.options.iter().find(|option| option.key == key)
    }
}

/// Exactly one pricing mode per item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pricing {
    Flat(Decimal),
    Sized(Vec<SizeVariant>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    #[serde(rename = "_ref")]
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub asset: AssetRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub pricing: Pricing,
    pub extras: Vec<ExtraOption>,
    pub choices: Vec<ChoiceGroup>,
    pub available: bool,
    pub featured: bool,
    pub category: Option<CategoryRef>,
    pub image: Option<ImageRef>,
    pub notes: Option<String>,
}

impl CatalogItem {
    pub fn size(&self, key: &str) -> Option<&SizeVariant> {
        match &self.pricing {
            Pricing::Sized(sizes) => sizes.iter().find(|size| size.key == key),
            Pricing::Flat(_) => None,
        }
    }

    pub fn choice_group(&self, id: &str) -> Option<&ChoiceGroup> {
        self.choices.iter().find(|group| group.id == id)
    }

    /// Extras a customer can actually pick right now.
    pub fn offered_extras(&self) -> Vec<ExtraOption> {
        self.extras
            .iter()
            .filter(|extra| extra.available)
            .cloned()
            .collect()
    }

    /// Lowest price a customer can pay for the base item.
    pub fn starting_price(&self) -> Decimal {
        match &self.pricing {
            Pricing::Flat(price) => *price,
            Pricing::Sized(sizes) => sizes
                .iter()
                .map(|size| size.price)
                .min()
                .unwrap_or(Decimal::ZERO),
        }
    }
}

// ── Selection snapshots ──────────────────────────────────────────────────
// Copies of catalog values taken at add-to-cart time, so later catalog edits
// do not reprice what is already in a cart or an order.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedSize {
    pub label: String,
    pub price: Decimal,
    #[serde(rename = "_key")]
    pub key: String,
}

impl From<&SizeVariant> for SelectedSize {
    fn from(size: &SizeVariant) -> Self {
        Self {
            label: size.label.clone(),
            price: size.price,
            key: size.key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    #[serde(rename = "price", default)]
    pub price_delta: Decimal,
}

impl From<&ChoiceOption> for SelectedOption {
    fn from(option: &ChoiceOption) -> Self {
        Self {
            key: option.key.clone(),
            name: option.name.clone(),
            price_delta: option.price_delta,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectedChoiceGroup {
    #[serde(rename = "_ref")]
    pub group_id: String,
    pub choice_name: String,
    pub selected_options: Vec<SelectedOption>,
}

// ── Raw store documents ──────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub sizes: Option<Vec<SizeDocument>>,
    #[serde(default)]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub category: Option<CategoryField>,
    #[serde(default)]
    pub is_available: Option<bool>,
    #[serde(default)]
    pub featured: Option<bool>,
    #[serde(default)]
    pub extras: Option<Vec<Option<ExtraDocument>>>,
    #[serde(default)]
    pub choices: Option<Vec<Option<ChoiceDocument>>>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SizeDocument {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
    #[serde(default)]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_required: Option<bool>,
    #[serde(default)]
    pub max_options: Option<u32>,
    #[serde(default)]
    pub options: Option<Vec<ChoiceOptionDocument>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChoiceOptionDocument {
    #[serde(rename = "_key", default)]
    pub key: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlugDocument {
    pub current: String,
}

/// Category as either an unexpanded reference or the expanded document.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CategoryField {
    Expanded {
        #[serde(rename = "_id")]
        id: String,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        slug: Option<SlugDocument>,
    },
    Reference {
        #[serde(rename = "_ref")]
        reference: String,
    },
}

fn default_true() -> bool {
    true
}

// ── Normalization ────────────────────────────────────────────────────────

fn non_negative(id: &str, value: Decimal, context: impl Into<String>) -> Result<Decimal, CatalogError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(CatalogError::NegativePrice {
            id: id.to_string(),
            context: context.into(),
        });
    }
    Ok(value)
}

fn normalize_pricing(doc: &MealDocument) -> Result<Pricing, CatalogError> {
    let mut sizes = Vec::new();
    for (idx, size) in doc.sizes.iter().flatten().enumerate() {
        let Some(price) = size.price else {
            warn!(item = %doc.id, idx, "size variant without price skipped");
            continue;
        };
        let label = size.label.clone().unwrap_or_else(|| format!("Size {}", idx + 1));
        let key = size.key.clone().unwrap_or_else(|| format!("size-{idx}"));
        let price = non_negative(&doc.id, price, format!("size {label}"))?;
        sizes.push(SizeVariant { key, label, price });
    }

    if !sizes.is_empty() {
        if doc.price.is_some() {
            warn!(item = %doc.id, "flat price ignored for sized item");
        }
        return Ok(Pricing::Sized(sizes));
    }

    match doc.price {
        Some(price) => Ok(Pricing::Flat(non_negative(&doc.id, price, "flat price")?)),
        None => Err(CatalogError::MissingPrice { id: doc.id.clone() }),
    }
}

fn normalize_extra(item: &str, doc: ExtraDocument) -> Result<Option<ExtraOption>, CatalogError> {
    let Some(name) = doc.name.filter(|name| !name.trim().is_empty()) else {
        warn!(item, extra = %doc.id, "extra without name skipped");
        return Ok(None);
    };
    let price = non_negative(item, doc.price.unwrap_or(Decimal::ZERO), format!("extra {name}"))?;
    Ok(Some(ExtraOption {
        id: doc.id,
        name,
        price,
        available: doc.is_available.unwrap_or(true),
    }))
}

fn normalize_choice(item: &str, doc: ChoiceDocument) -> ChoiceGroup {
    let options = doc
        .options
        .unwrap_or_default()
        .into_iter()
        .filter_map(|option| {
            let (Some(key), Some(name)) = (option.key, option.name) else {
                warn!(item, group = %doc.id, "choice option without key or name skipped");
                return None;
            };
            Some(ChoiceOption {
                key,
                name,
                price_delta: option.price.unwrap_or(Decimal::ZERO),
            })
        })
        .collect();

    ChoiceGroup {
        name: doc.name.unwrap_or_else(|| doc.id.clone()),
        id: doc.id,
        description: doc.description,
        required: doc.is_required.unwrap_or(true),
        max_selections: doc.max_options.unwrap_or(1).max(1),
        options,
    }
}

/// Turn a raw meal document into a fully defaulted [`CatalogItem`].
pub fn normalize_item(doc: MealDocument) -> Result<CatalogItem, CatalogError> {
    let name = doc
        .name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or(CatalogError::MissingField { field: "name" })?;
    let pricing = normalize_pricing(&doc)?;

    let mut extras = Vec::new();
    for extra in doc.extras.into_iter().flatten().flatten() {
        if let Some(extra) = normalize_extra(&doc.id, extra)? {
            extras.push(extra);
        }
    }

    let choices = doc
        .choices
        .into_iter()
        .flatten()
        .flatten()
        .map(|choice| normalize_choice(&doc.id, choice))
        .collect();

    let category = doc.category.map(|field| match field {
        CategoryField::Expanded { id, title, slug } => CategoryRef {
            id,
            title,
            slug: slug.map(|slug| slug.current),
        },
        CategoryField::Reference { reference } => CategoryRef {
            id: reference,
            title: None,
            slug: None,
        },
    });

    Ok(CatalogItem {
        id: doc.id,
        name,
        description: doc.description,
        pricing,
        extras,
        choices,
        available: doc.is_available.unwrap_or(true),
        featured: doc.featured.unwrap_or(false),
        category,
        image: doc.image,
        notes: doc.notes,
    })
}

/// Normalize a batch of raw documents, skipping the ones that do not make a
/// usable item.
pub fn normalize_documents(docs: Vec<serde_json::Value>) -> Vec<CatalogItem> {
    let mut items = Vec::with_capacity(docs.len());
    for (idx, value) in docs.into_iter().enumerate() {
        let doc: MealDocument = match serde_json::from_value(value) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(idx, error = %err, "malformed catalog document skipped");
                continue;
            }
        };
        match normalize_item(doc) {
            Ok(item) => items.push(item),
            Err(err) => warn!(idx, error = %err, "catalog document rejected"),
        }
    }
    items
}

pub fn load_catalog(path: &Path) -> Result<Vec<CatalogItem>, CatalogError> {
    let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let docs: Vec<serde_json::Value> =
        serde_json::from_str(&data).map_err(|source| CatalogError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(normalize_documents(docs))
}

pub fn find_item<'a>(items: &'a [CatalogItem], id: &str) -> Option<&'a CatalogItem> {
    items.iter().find(|item| item.id == id)
}
