//! In-memory search over loaded metadata: prefix tries with a fuzzy fallback.

pub mod fuzzy;
pub mod index;
pub mod trie;

pub use index::{SearchIndex, SearchResults};
pub use trie::Trie;
