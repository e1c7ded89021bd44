//! Shopping bag domain module.
//!
//! A bag is an ordered list of line items that point at catalog entries by id, plus a
//! cached total. The total is always recomputed from the items, never adjusted.

pub mod bag;

pub use bag::{Bag, LineItem};
