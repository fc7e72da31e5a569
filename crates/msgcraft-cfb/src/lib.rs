#![warn(missing_docs)]
//! A from-scratch writer for the OLE Compound File Binary container (MS-CFB).
//!
//! This crate only writes MS-CFB v3 containers; it does not read them. The
//! caller builds a logical [`tree::Storage`] in memory (storages and streams,
//! already populated with their final bytes) and hands it to [`write`], which
//! serializes it as a single, deterministic byte sequence: header, FAT,
//! optional DIFAT overflow sectors, mini-FAT, directory sectors, then stream
//! data (mini-stream first).
//!
//! Directory siblings within a storage are emitted as a single left-leaning
//! chain rather than a balanced red-black tree; real-world readers (Outlook
//! included) accept this simplification, and it removes an entire class of
//! tree-balancing bugs from a writer that never needs to be read back and
//! mutated in place.

pub mod error;
pub mod tree;
pub mod writer;

pub use error::CfbError;
pub use tree::{Node, Storage};
pub use writer::write;
