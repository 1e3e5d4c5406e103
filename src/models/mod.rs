//! Data models for threadvault.

mod thread;

pub use thread::ThreadRecord;
