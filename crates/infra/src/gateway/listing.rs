use chrono::{DateTime, Utc};
use serde::Serialize;

use bakehouse_catalog::{SlicedItem, WholeItem};
use bakehouse_core::CatalogEntryId;

use crate::image::ImageEncoder;

/// Transport view of a whole item, image already encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WholeItemView {
    pub id: CatalogEntryId,
    pub name: String,
    pub description: String,
    pub small_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_price: Option<u64>,
    pub quantity_on_hand: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WholeItemView {
    pub fn new(item: &WholeItem, encoder: &impl ImageEncoder) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            small_price: item.small_price,
            large_price: item.large_price,
            quantity_on_hand: item.quantity_on_hand,
            image: item.image.as_deref().map(|bytes| encoder.encode(bytes)),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Transport view of a sliced item, image already encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlicedItemView {
    pub id: CatalogEntryId,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub quantity_on_hand: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SlicedItemView {
    pub fn new(item: &SlicedItem, encoder: &impl ImageEncoder) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
            quantity_on_hand: item.quantity_on_hand,
            image: item.image.as_deref().map(|bytes| encoder.encode(bytes)),
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

/// Every catalog entry, grouped by kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CatalogListing {
    pub whole_items: Vec<WholeItemView>,
    pub sliced_items: Vec<SlicedItemView>,
}

impl CatalogListing {
    pub fn len(&self) -> usize {
        self.whole_items.len() + self.sliced_items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
