//! Stores and warehouses.
//!
//! A warehouse hosts many seller stores; each store tracks its rack
//! occupancy and must keep `0 <= occupied_racks <= number_of_racks`.

pub mod store;
pub mod warehouse;

pub use store::{NewStore, Store, StoreUpdate, check_racks};
pub use warehouse::{Coordinates, NewWarehouse, Warehouse, WarehouseUpdate};
