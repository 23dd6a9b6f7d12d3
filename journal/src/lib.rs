//! Memory-mapped single-producer / many-consumer journal
//!
//! A fixed-size page of cache-line-aligned frames used to ship engine
//! events to cooperating processes at sub-microsecond write latency.
//! The writer publishes with a release store on the page cursor; any
//! reader that observes the new cursor with an acquire load sees a
//! complete frame.

#![deny(clippy::all)]
#![deny(missing_docs)]
#![allow(unsafe_code)] // atomics living inside the mapped page header

pub mod codec;
pub mod error;
pub mod frame;
pub mod reader;
pub mod writer;

pub use error::JournalError;
pub use frame::{FrameHeader, FrameKind, PageHeader, align8};
pub use reader::{JournalReader, RawFrame, ReaderConfig};
pub use writer::JournalWriter;

/// Default page size when `TICKBUS_JOURNAL_SIZE_MB` is not set (128 MiB)
pub const DEFAULT_PAGE_SIZE: usize = 128 * 1024 * 1024;

/// Default command journal size (4 MiB)
pub const DEFAULT_COMMAND_PAGE_SIZE: usize = 4 * 1024 * 1024;
