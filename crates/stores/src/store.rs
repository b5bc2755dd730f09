use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AccountId, DomainError, DomainResult, StoreId, WarehouseId, error::require_non_blank,
};

/// A seller's store inside a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    pub store_id: StoreId,
    pub seller_id: AccountId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub address: String,
    pub contact: Option<String>,
    pub number_of_racks: i64,
    pub occupied_racks: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Store {
    pub fn free_racks(&self) -> i64 {
        self.number_of_racks - self.occupied_racks
    }
}

/// The rack invariant: `0 <= occupied <= total`.
pub fn check_racks(number_of_racks: i64, occupied_racks: i64) -> DomainResult<()> {
    if number_of_racks < 0 {
        return Err(DomainError::validation("numberOfRacks cannot be negative"));
    }
    if occupied_racks < 0 {
        return Err(DomainError::validation("occupiedRacks cannot be negative"));
    }
    if occupied_racks > number_of_racks {
        return Err(DomainError::validation(format!(
            "occupiedRacks ({occupied_racks}) exceeds numberOfRacks ({number_of_racks})"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewStore {
    pub seller_id: AccountId,
    pub warehouse_id: WarehouseId,
    pub name: String,
    pub address: String,
    pub contact: Option<String>,
    pub number_of_racks: i64,
    #[serde(default)]
    pub occupied_racks: i64,
}

impl NewStore {
    pub fn into_store(self, now: DateTime<Utc>) -> DomainResult<Store> {
        require_non_blank("name", &self.name)?;
        require_non_blank("address", &self.address)?;
        check_racks(self.number_of_racks, self.occupied_racks)?;

        Ok(Store {
            store_id: StoreId::new(),
            seller_id: self.seller_id,
            warehouse_id: self.warehouse_id,
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            contact: self.contact,
            number_of_racks: self.number_of_racks,
            occupied_racks: self.occupied_racks,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial store update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
    pub number_of_racks: Option<i64>,
    pub occupied_racks: Option<i64>,
}

impl StoreUpdate {
    /// Only the occupied rack count, as sent by `PATCH /stores/:id/racks`.
    pub fn racks(occupied_racks: i64) -> Self {
        Self {
            occupied_racks: Some(occupied_racks),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.contact.is_none()
            && self.number_of_racks.is_none()
            && self.occupied_racks.is_none()
    }

    /// Validate against the store as currently persisted.
    ///
    /// The proposed occupied count is checked against the rack total from
    /// this same update when present, otherwise against the current total.
    pub fn validate_against(&self, current: &Store) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(address) = &self.address {
            require_non_blank("address", address)?;
        }
        check_racks(
            self.number_of_racks.unwrap_or(current.number_of_racks),
            self.occupied_racks.unwrap_or(current.occupied_racks),
        )
    }

    /// Validate, then write the changed fields and refresh `updated_at`.
    pub fn apply(&self, store: &mut Store, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate_against(store)?;

        if let Some(name) = &self.name {
            store.name = name.trim().to_string();
        }
        if let Some(address) = &self.address {
            store.address = address.trim().to_string();
        }
        if let Some(contact) = &self.contact {
            store.contact = Some(contact.clone());
        }
        if let Some(total) = self.number_of_racks {
            store.number_of_racks = total;
        }
        if let Some(occupied) = self.occupied_racks {
            store.occupied_racks = occupied;
        }
        store.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(total: i64, occupied: i64) -> Store {
        NewStore {
            seller_id: AccountId::new(),
            warehouse_id: WarehouseId::new(),
            name: "Fresh Mart".to_string(),
            address: "Bay 4".to_string(),
            contact: None,
            number_of_racks: total,
            occupied_racks: occupied,
        }
        .into_store(Utc::now())
        .unwrap()
    }

    #[test]
    fn new_store_rejects_overfull_racks() {
        let err = NewStore {
            seller_id: AccountId::new(),
            warehouse_id: WarehouseId::new(),
            name: "Fresh Mart".to_string(),
            address: "Bay 4".to_string(),
            contact: None,
            number_of_racks: 2,
            occupied_racks: 3,
        }
        .into_store(Utc::now())
        .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn rack_update_is_checked_against_current_total() {
        let mut s = store(10, 2);
        assert!(StoreUpdate::racks(11).apply(&mut s, Utc::now()).is_err());
        assert_eq!(s.occupied_racks, 2);

        StoreUpdate::racks(10).apply(&mut s, Utc::now()).unwrap();
        assert_eq!(s.occupied_racks, 10);
        assert_eq!(s.free_racks(), 0);
    }

    #[test]
    fn rack_update_uses_total_from_same_request() {
        let mut s = store(10, 2);
        let update = StoreUpdate {
            number_of_racks: Some(20),
            occupied_racks: Some(15),
            ..StoreUpdate::default()
        };
        update.apply(&mut s, Utc::now()).unwrap();
        assert_eq!((s.number_of_racks, s.occupied_racks), (20, 15));
    }

    #[test]
    fn shrinking_below_occupancy_is_rejected() {
        let mut s = store(10, 8);
        let update = StoreUpdate {
            number_of_racks: Some(5),
            ..StoreUpdate::default()
        };
        assert!(update.apply(&mut s, Utc::now()).is_err());
    }

    #[test]
    fn negative_occupancy_is_rejected() {
        let mut s = store(10, 2);
        assert!(StoreUpdate::racks(-1).apply(&mut s, Utc::now()).is_err());
    }

    #[test]
    fn update_refreshes_timestamp_only_on_success() {
        let mut s = store(10, 2);
        let before = s.updated_at;
        let later = before + chrono::Duration::seconds(5);
        StoreUpdate {
            name: Some("Fresh Mart Express".to_string()),
            ..StoreUpdate::default()
        }
        .apply(&mut s, later)
        .unwrap();
        assert_eq!(s.updated_at, later);
        assert_eq!(s.name, "Fresh Mart Express");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: a rack update succeeds iff 0 <= occupied <= current total.
            #[test]
            fn rack_update_respects_invariant(total in 0i64..100, occupied in -10i64..150) {
                let mut s = store(total, 0);
                let result = StoreUpdate::racks(occupied).apply(&mut s, Utc::now());
                if (0..=total).contains(&occupied) {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(s.occupied_racks, occupied);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert_eq!(s.occupied_racks, 0);
                }
            }
        }
    }
}
