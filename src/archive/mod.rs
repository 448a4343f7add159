//! Oldest-first archiving.
//!
//! A cycle counts the remaining rows, writes the oldest fraction of them to a
//! fresh backup artifact and then deletes them. The drain loop repeats cycles
//! until the table is empty.

mod artifact;
mod cycle;
mod error;

pub use artifact::ArtifactWriter;
pub use cycle::{Archiver, CycleOutcome, DrainSummary};
pub use error::{ArchiveError, ArchiveResult};
