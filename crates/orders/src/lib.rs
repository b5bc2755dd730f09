//! Orders domain module (the order ledger).
//!
//! An order is a header plus line items kept as separate records and joined
//! at read time. Orders are write-once: there is no status lifecycle.

pub mod order;

pub use order::{NewOrder, NewOrderItem, Order, OrderWithProducts, OrderedItem, group_by_order};
