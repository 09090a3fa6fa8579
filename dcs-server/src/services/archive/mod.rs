//! Archive ingestion bridge
//!
//! Deposits are recorded as PENDING ingest records; the [`ArchiveWorker`]
//! moves them into an [`ArchiveStore`] in the background and clients poll
//! the record until it settles.

pub mod poll;
pub mod store;
pub mod worker;

pub use poll::{poll_until_complete, PollError};
pub use store::{
    ArchiveError, ArchivePackage, ArchiveStore, ArchivedFile, ArchivedUnit, FsArchiveStore,
    PackageFile,
};
pub use worker::ArchiveWorker;
