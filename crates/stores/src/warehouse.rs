use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{
    AccountId, DomainError, DomainResult, WarehouseId,
    error::{require_non_blank, require_non_negative},
};

/// WGS84 position of a warehouse.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn validate(&self) -> DomainResult<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(DomainError::validation("latitude must be within [-90, 90]"));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(DomainError::validation("longitude must be within [-180, 180]"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: WarehouseId,
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub storage_capacity: i64,
    /// Operational staff member who registered the warehouse.
    pub operational_guy_id: AccountId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWarehouse {
    pub name: String,
    pub address: String,
    pub coordinates: Coordinates,
    pub storage_capacity: i64,
}

impl NewWarehouse {
    pub fn into_warehouse(
        self,
        operational_guy_id: AccountId,
        now: DateTime<Utc>,
    ) -> DomainResult<Warehouse> {
        require_non_blank("name", &self.name)?;
        require_non_blank("address", &self.address)?;
        require_non_negative("storageCapacity", self.storage_capacity)?;
        self.coordinates.validate()?;

        Ok(Warehouse {
            id: WarehouseId::new(),
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            coordinates: self.coordinates,
            storage_capacity: self.storage_capacity,
            operational_guy_id,
            created_at: now,
            updated_at: now,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub storage_capacity: Option<i64>,
}

impl WarehouseUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.address.is_none()
            && self.coordinates.is_none()
            && self.storage_capacity.is_none()
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.is_empty() {
            return Err(DomainError::validation("no fields to update"));
        }
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(address) = &self.address {
            require_non_blank("address", address)?;
        }
        if let Some(capacity) = self.storage_capacity {
            require_non_negative("storageCapacity", capacity)?;
        }
        if let Some(coordinates) = &self.coordinates {
            coordinates.validate()?;
        }
        Ok(())
    }

    pub fn apply(&self, warehouse: &mut Warehouse, now: DateTime<Utc>) -> DomainResult<()> {
        self.validate()?;

        if let Some(name) = &self.name {
            warehouse.name = name.trim().to_string();
        }
        if let Some(address) = &self.address {
            warehouse.address = address.trim().to_string();
        }
        if let Some(coordinates) = self.coordinates {
            warehouse.coordinates = coordinates;
        }
        if let Some(capacity) = self.storage_capacity {
            warehouse.storage_capacity = capacity;
        }
        warehouse.updated_at = now;
        Ok(())
    }
}
