use serde::{Deserialize, Serialize};

use bakehouse_core::{DomainError, DomainResult};

use crate::entry::CatalogKind;

/// Partial update of a catalog entry. `None` means "leave as is".
///
/// `price` is the entry's base price: the small tier of a whole item, or the single
/// price of a sliced item. `large_price` only exists on whole items.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CatalogEntryPatch {
    #[serde(default)]
    pub base_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<u64>,
    #[serde(default)]
    pub large_price: Option<u64>,
    #[serde(default)]
    pub quantity_on_hand: Option<u32>,
}

impl CatalogEntryPatch {
    pub fn validate_for(&self, kind: CatalogKind) -> DomainResult<()> {
        if let Some(base) = &self.base_name {
            if base.trim().is_empty() {
                return Err(DomainError::validation("base name cannot be empty"));
            }
        }
        if kind == CatalogKind::Sliced && self.large_price.is_some() {
            return Err(DomainError::validation(
                "large_price only applies to whole items",
            ));
        }
        Ok(())
    }
}
