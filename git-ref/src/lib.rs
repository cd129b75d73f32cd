//! A store for reading and writing references: named refs, symbolic refs, a
//! reflog, and compare-and-swap updates, backed by loose files with a `packed-refs`
//! fallback.
#![deny(unsafe_code)]

mod error;
mod fullname;
mod packed;
mod reflog;
mod store;
mod target;

pub use error::Error;
pub use fullname::FullName;
pub use reflog::Entry as ReflogEntry;
pub use store::{Reference, Store};
pub use target::Target;
