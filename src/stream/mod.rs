//! Streaming readers and writers for footered deflate parts.
//!
//! The pieces compose in pipeline order: producers write through
//! [`DeflateWriter`], which appends a footer to every blob; [`FooteredReader`]
//! reads a blob back while hiding that footer; [`CombineReader`] chains many
//! footer-stripped blobs into one inflatable stream and folds their footers
//! into [`CombinedTotals`].
//!
//! None of these types is safe for concurrent use by multiple threads against
//! the same instance; parallelism comes from one instance per byte source with
//! external synchronization before combining.

mod combine;
mod deflate;
mod footered;

pub use combine::{CombineReader, CombinedTotals};
pub use deflate::DeflateWriter;
pub use footered::FooteredReader;
