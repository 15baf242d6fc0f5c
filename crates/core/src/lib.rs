//! `telexport-core`: export job model building blocks.
//!
//! This crate contains the **pure** job model (no I/O): identifiers, status
//! normalization and guards, the wire record, display projections and the
//! download filename policy.

pub mod error;
pub mod filename;
pub mod id;
pub mod job;
pub mod range;
pub mod status;
pub mod value_object;
pub mod view;

pub use error::{backend_message, ExportError, ExportResult};
pub use id::{JobId, TenantId};
pub use job::{ExportJob, Progress};
pub use range::DateRange;
pub use status::{JobStatus, StatusTone};
pub use value_object::ValueObject;
pub use view::ViewRow;
