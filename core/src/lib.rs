pub mod error;
pub mod index;
pub mod merge;
pub mod persist;
pub mod postings;
pub mod preprocess;
pub mod retrieval;
pub mod tokenizer;

pub use error::{Error, Result};
pub use index::{Document, InvertedIndex, TermId};
pub use merge::{daat_and, MergeOutcome, MergeStrategy, Scoring, Traversal};
pub use postings::{Cursor, DocId, Posting, PostingsList, SortKey};
pub use preprocess::Query;
pub use retrieval::{IndexOptions, RetrievalEngine, RetrievalResponse};
