//! `telexport-client`: keeps a local view of remote export jobs in sync and
//! drives user actions on them.
//!
//! - [`gateway`]: typed access to the export backend
//! - [`reconcile`]: poll-and-reconcile into a [`snapshot::JobSnapshot`]
//! - [`worker`]: the periodic poller
//! - [`actions`]: submit / download / cancel / delete with status guards
//! - [`table`]: sorting and pagination of the job table

pub mod actions;
pub mod config;
pub mod gateway;
pub mod reconcile;
pub mod snapshot;
pub mod table;
pub mod worker;

pub use actions::{
    ActionError, DeletePrompt, DownloadedFile, JobAction, JobActions, Notice, NoticeLevel,
    SubmitForm,
};
pub use config::{ClientSettings, SettingsError};
pub use gateway::{Ack, Download, HttpJobGateway, InMemoryJobGateway, JobGateway};
pub use reconcile::{Reconciler, RefreshMode, RefreshOutcome, RefreshSink};
pub use snapshot::JobSnapshot;
pub use table::{PageMarker, SortDirection, SortKey, TablePage, TableState};
pub use worker::{PollHandle, PollWorker};
