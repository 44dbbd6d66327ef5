//! Data models.

mod entry;
mod range;

pub use entry::Entry;
pub use range::RangeRequest;
