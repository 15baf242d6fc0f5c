//! Value object trait: equality by value, not identity.
//!
//! [`crate::DateRange`] and [`crate::Progress`] are value objects: two ranges
//! covering the same days are the same range. An [`crate::ExportJob`] is not, it
//! is identified by its job id.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one.
///
/// ```ignore
/// let a = DateRange::new(feb_1, feb_5)?;
/// let b = DateRange::new(feb_1, feb_5)?;
/// assert_eq!(a, b);
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
