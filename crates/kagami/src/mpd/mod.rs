//! Static MPD processing.
//!
//! [`base`] reconstructs the effective base URL of every representation from
//! the MPD → Period → AdaptationSet → Representation `BaseURL` override
//! hierarchy. [`resolve`] then expands each selected representation's segment
//! addressing (explicit `SegmentList`, `SegmentTemplate` with or without a
//! timeline, or a bare file reference) into absolute item URLs, using the
//! `$...$` substitution rules in [`template`].

pub mod base;
pub mod resolve;
pub mod template;

pub use resolve::{resolve_items, ResolveOptions, SegmentFilter};
