//! Mirror every file referenced by a static MPEG-DASH manifest.
//!
//! The pipeline is strictly two-phase:
//!
//! 1. **Resolution** (single-threaded, no I/O after the manifest is loaded):
//!    [`fetch::load_manifest`] retrieves and parses the MPD, [`mpd`] walks the
//!    BaseURL override hierarchy and expands every segment addressing scheme
//!    into absolute URLs, and [`registry::ItemRegistry`] deduplicates them and
//!    derives each item's on-disk relative path.
//! 2. **Download**: [`download::ParallelDownloader`] fetches the item list with
//!    bounded concurrency, per-item retry with capped exponential backoff, and
//!    atomic temp-file writes.
//!
//! Resolution errors are fatal and stop the run before any fetch; download
//! errors are per-item and only show up in the final [`download::DownloadSummary`].

pub mod download;
pub mod error;
pub mod fetch;
pub mod mpd;
pub mod registry;

pub use download::{DownloadSummary, FailureReason, ParallelDownloader};
pub use error::{KagamiError, KagamiResult};
pub use registry::{DownloadItem, ItemRegistry};
