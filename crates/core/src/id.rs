//! Strongly-typed identifiers used across the marketplace.
//!
//! Every identifier wraps a time-ordered UUID (v7) and is rendered as a
//! 32-character lowercase hex string, both in `Display` and on the wire.

use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::DomainError;

macro_rules! impl_id_newtype {
    ($(#[$meta:meta])* $t:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $t(Uuid);

        impl $t {
            /// Generate a fresh identifier.
            ///
            /// Uses UUIDv7 (time-ordered), so ids sort by creation time.
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $t {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0.simple(), f)
            }
        }

        impl From<Uuid> for $t {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$t> for Uuid {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let uuid = Uuid::try_parse(s.trim())
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(uuid))
            }
        }

        impl Serialize for $t {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(&self.0.simple())
            }
        }

        impl<'de> Deserialize<'de> for $t {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

impl_id_newtype!(
    /// Identifier of an account (seller, customer or operational staff).
    AccountId,
    "AccountId"
);
impl_id_newtype!(
    /// Identifier of a top-level catalog category.
    CategoryId,
    "CategoryId"
);
impl_id_newtype!(
    /// Identifier of a catalog subcategory.
    SubcategoryId,
    "SubcategoryId"
);
impl_id_newtype!(
    /// Identifier of a catalog product (metadata record).
    ProductId,
    "ProductId"
);
impl_id_newtype!(
    /// Identifier of a seller's inventory header.
    InventoryId,
    "InventoryId"
);
impl_id_newtype!(
    /// Identifier of a single inventory line item.
    InventoryProductId,
    "InventoryProductId"
);
impl_id_newtype!(StoreId, "StoreId");
impl_id_newtype!(WarehouseId, "WarehouseId");
impl_id_newtype!(OrderId, "OrderId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_simple_hex() {
        let id = OrderId::new();
        let rendered = id.to_string();
        assert_eq!(rendered.len(), 32);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn parses_both_simple_and_hyphenated_forms() {
        let id = StoreId::new();
        let hyphenated = id.as_uuid().hyphenated().to_string();
        assert_eq!(id.to_string().parse::<StoreId>().unwrap(), id);
        assert_eq!(hyphenated.parse::<StoreId>().unwrap(), id);
    }

    #[test]
    fn invalid_input_names_the_id_kind() {
        let err = "not-an-id".parse::<ProductId>().unwrap_err();
        match err {
            DomainError::InvalidId(msg) => assert!(msg.starts_with("ProductId")),
            other => panic!("expected InvalidId, got {other:?}"),
        }
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = WarehouseId::new();
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::Value::String(id.to_string()));
        let back: WarehouseId = serde_json::from_value(json).unwrap();
        assert_eq!(back, id);
    }
}
