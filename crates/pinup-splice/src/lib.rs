//! Surgical rewriting of manifest values
//!
//! - [`replace_many`]: rewrite a set of string fragments in one pass
//! - [`replace_one`]: rewrite the fragment at a path, or leave the text alone if
//!   it does not exist
//!
//! Bytes outside the rewritten spans are never touched.

mod engine;
mod error;

pub use engine::{apply_splices, replace_many, replace_one, Replacement, Splice};
pub use error::SpliceError;
