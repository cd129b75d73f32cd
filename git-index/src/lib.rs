//! The staging index: a `(path, stage)`-keyed set of entries sitting between the
//! object store and the worktree, plus canonical tree (de)serialization.
#![deny(unsafe_code)]

mod entry;
mod error;
mod state;
mod tree;

pub use entry::{stage, Entry, MERGED};
pub use error::Error;
pub use state::{Builder, Editor, State};
pub use tree::{read_tree, write_tree};
