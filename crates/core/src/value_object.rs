//! Value object trait: equality by value, not identity.
//!
//! Line items and price tiers are value objects. A line item is a snapshot taken when
//! the bag was filled; replacing it means building a new one, never editing in place.

/// Marker trait for value objects.
///
/// Requires `Clone + PartialEq + Debug` so values can be copied into bags, compared in
/// assertions and logged.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
