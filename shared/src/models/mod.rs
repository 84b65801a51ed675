//! Inventory data models
//!
//! - [`ProductGroup`] / [`Variant`]: canonical in-memory records
//! - [`RawGroup`] / [`RawVariant`]: loose wire shapes, coerced on conversion
//! - [`FieldDiff`] / [`ChangedField`]: minimal delta between record and draft

pub mod diff;
pub mod group;
pub mod wire;

pub use diff::{ChangedField, FieldDiff};
pub use group::{ProductGroup, Variant};
pub use wire::{GroupListing, RawGroup, RawVariant};
