use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bakehouse_core::{AggregateRoot, CatalogEntryId, DomainError, DomainResult, Entity};

use crate::patch::CatalogEntryPatch;

/// Which variant of a menu entry a catalog entry is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Whole,
    Sliced,
}

impl CatalogKind {
    /// Order in which id lookups probe the per-kind stores.
    pub const LOOKUP_ORDER: [CatalogKind; 2] = [CatalogKind::Whole, CatalogKind::Sliced];

    pub fn prefix(self) -> &'static str {
        match self {
            CatalogKind::Whole => "Whole",
            CatalogKind::Sliced => "Sliced",
        }
    }

    /// Kind-prefixed display name, e.g. `"Sliced Apple"`.
    pub fn derive_name(self, base_name: &str) -> String {
        format!("{} {}", self.prefix(), base_name.trim())
    }
}

impl core::fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Attributes for the whole-item half of a new pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewWholeItem {
    pub description: String,
    /// Price in smallest currency unit (e.g., cents).
    pub small_price: u64,
    pub large_price: Option<u64>,
    pub quantity_on_hand: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

/// Attributes for the sliced-item half of a new pair.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NewSlicedItem {
    pub description: String,
    /// Price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub quantity_on_hand: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
}

/// A whole item (e.g. an entire pie), sold in one or two sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WholeItem {
    pub id: CatalogEntryId,
    pub name: String,
    pub description: String,
    pub small_price: u64,
    pub large_price: Option<u64>,
    pub quantity_on_hand: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WholeItem {
    pub fn create(base_name: &str, attrs: NewWholeItem, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_base_name(base_name)?;
        Ok(Self {
            id: CatalogEntryId::new(),
            name: CatalogKind::Whole.derive_name(base_name),
            description: attrs.description,
            small_price: attrs.small_price,
            large_price: attrs.large_price,
            quantity_on_hand: attrs.quantity_on_hand,
            image: attrs.image,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A single slice of a menu entry, sold at one price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlicedItem {
    pub id: CatalogEntryId,
    pub name: String,
    pub description: String,
    pub price: u64,
    pub quantity_on_hand: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vec<u8>>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SlicedItem {
    pub fn create(base_name: &str, attrs: NewSlicedItem, now: DateTime<Utc>) -> DomainResult<Self> {
        ensure_base_name(base_name)?;
        Ok(Self {
            id: CatalogEntryId::new(),
            name: CatalogKind::Sliced.derive_name(base_name),
            description: attrs.description,
            price: attrs.price,
            quantity_on_hand: attrs.quantity_on_hand,
            image: attrs.image,
            version: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

fn ensure_base_name(base_name: &str) -> DomainResult<()> {
    if base_name.trim().is_empty() {
        return Err(DomainError::validation("base name cannot be empty"));
    }
    Ok(())
}

/// A catalog entry of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CatalogEntry {
    Whole(WholeItem),
    Sliced(SlicedItem),
}

impl CatalogEntry {
    pub fn kind(&self) -> CatalogKind {
        match self {
            CatalogEntry::Whole(_) => CatalogKind::Whole,
            CatalogEntry::Sliced(_) => CatalogKind::Sliced,
        }
    }

    pub fn id_typed(&self) -> CatalogEntryId {
        match self {
            CatalogEntry::Whole(e) => e.id,
            CatalogEntry::Sliced(e) => e.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            CatalogEntry::Whole(e) => &e.name,
            CatalogEntry::Sliced(e) => &e.name,
        }
    }

    /// Name without the kind prefix.
    pub fn base_name(&self) -> &str {
        let name = self.name();
        name.strip_prefix(self.kind().prefix())
            .map(str::trim_start)
            .unwrap_or(name)
    }

    pub fn description(&self) -> &str {
        match self {
            CatalogEntry::Whole(e) => &e.description,
            CatalogEntry::Sliced(e) => &e.description,
        }
    }

    pub fn quantity_on_hand(&self) -> u32 {
        match self {
            CatalogEntry::Whole(e) => e.quantity_on_hand,
            CatalogEntry::Sliced(e) => e.quantity_on_hand,
        }
    }

    pub fn image(&self) -> Option<&[u8]> {
        match self {
            CatalogEntry::Whole(e) => e.image.as_deref(),
            CatalogEntry::Sliced(e) => e.image.as_deref(),
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            CatalogEntry::Whole(e) => e.created_at,
            CatalogEntry::Sliced(e) => e.created_at,
        }
    }

    pub fn as_whole(&self) -> Option<&WholeItem> {
        match self {
            CatalogEntry::Whole(e) => Some(e),
            CatalogEntry::Sliced(_) => None,
        }
    }

    pub fn as_sliced(&self) -> Option<&SlicedItem> {
        match self {
            CatalogEntry::Sliced(e) => Some(e),
            CatalogEntry::Whole(_) => None,
        }
    }

    pub fn into_whole(self) -> Option<WholeItem> {
        match self {
            CatalogEntry::Whole(e) => Some(e),
            CatalogEntry::Sliced(_) => None,
        }
    }

    pub fn into_sliced(self) -> Option<SlicedItem> {
        match self {
            CatalogEntry::Sliced(e) => Some(e),
            CatalogEntry::Whole(_) => None,
        }
    }

    /// Record the version the store assigned on a successful write.
    pub fn mark_persisted(&mut self, version: u64) {
        match self {
            CatalogEntry::Whole(e) => e.version = version,
            CatalogEntry::Sliced(e) => e.version = version,
        }
    }

    /// Apply the provided attributes; absent fields are left untouched.
    ///
    /// Nothing is modified when the patch is rejected.
    pub fn apply_patch(
        &mut self,
        patch: &CatalogEntryPatch,
        image: Option<Vec<u8>>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        patch.validate_for(self.kind())?;
        let renamed = patch
            .base_name
            .as_deref()
            .map(|base| self.kind().derive_name(base));

        match self {
            CatalogEntry::Whole(e) => {
                if let Some(name) = renamed {
                    e.name = name;
                }
                if let Some(description) = &patch.description {
                    e.description = description.clone();
                }
                if let Some(price) = patch.price {
                    e.small_price = price;
                }
                if let Some(large) = patch.large_price {
                    e.large_price = Some(large);
                }
                if let Some(qty) = patch.quantity_on_hand {
                    e.quantity_on_hand = qty;
                }
                if image.is_some() {
                    e.image = image;
                }
                e.updated_at = now;
            }
            CatalogEntry::Sliced(e) => {
                if let Some(name) = renamed {
                    e.name = name;
                }
                if let Some(description) = &patch.description {
                    e.description = description.clone();
                }
                if let Some(price) = patch.price {
                    e.price = price;
                }
                if let Some(qty) = patch.quantity_on_hand {
                    e.quantity_on_hand = qty;
                }
                if image.is_some() {
                    e.image = image;
                }
                e.updated_at = now;
            }
        }
        Ok(())
    }
}

impl Entity for CatalogEntry {
    type Id = CatalogEntryId;

    fn id(&self) -> &Self::Id {
        match self {
            CatalogEntry::Whole(e) => &e.id,
            CatalogEntry::Sliced(e) => &e.id,
        }
    }
}

impl AggregateRoot for CatalogEntry {
    type Id = CatalogEntryId;

    fn id(&self) -> &Self::Id {
        Entity::id(self)
    }

    fn version(&self) -> u64 {
        match self {
            CatalogEntry::Whole(e) => e.version,
            CatalogEntry::Sliced(e) => e.version,
        }
    }
}

impl From<WholeItem> for CatalogEntry {
    fn from(value: WholeItem) -> Self {
        CatalogEntry::Whole(value)
    }
}

impl From<SlicedItem> for CatalogEntry {
    fn from(value: SlicedItem) -> Self {
        CatalogEntry::Sliced(value)
    }
}
